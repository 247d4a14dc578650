//! Tenant identity and the names derived from it
//!
//! Every provider-side name this tool touches (directory user, group,
//! storage prefix, notification rule id, topic ARN) is a pure function of
//! the tenant triple plus the region. Keeping them here means the account
//! manager and the reconciler can never disagree about them.

/// Prefix under a client's storage namespace for files awaiting collection
pub const INPUT_PREFIX: &str = "INPUT/";

/// Resolved (region, account, integrator, client) for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tenant {
    pub region: String,
    pub account_id: String,
    pub integrator_id: String,
    pub client_id: String,
}

impl Tenant {
    /// Directory user name for the client
    pub fn user_name(&self) -> &str {
        &self.client_id
    }

    /// Directory path client users are created under
    pub fn user_path(&self) -> String {
        format!("/{}/", self.integrator_id)
    }

    /// Group granting client users their storage permissions
    pub fn client_group(&self) -> String {
        format!("{}-client", self.integrator_id)
    }

    /// Storage key prefix scoping all of the client's objects
    pub fn key_prefix(&self) -> String {
        format!("{}/", self.client_id)
    }

    /// Full storage key for a key relative to the client prefix
    pub fn object_key(&self, relative: &str) -> String {
        format!("{}/{}", self.client_id, relative)
    }

    pub fn notification_id(&self) -> String {
        format!("S3ObjectCreatedSNS-{}-{}", self.integrator_id, self.client_id)
    }

    /// Filter prefix of the upload notification rule
    pub fn notification_prefix(&self) -> String {
        format!("{}/INPUT", self.client_id)
    }

    pub fn topic_arn(&self) -> String {
        format!(
            "arn:aws:sns:{}:{}:S3NotifierTopic",
            self.region, self.account_id
        )
    }
}

#[cfg(test)]
pub(crate) fn fixture() -> Tenant {
    Tenant {
        region: "eu-west-1".to_string(),
        account_id: "609701658665".to_string(),
        integrator_id: "myintegrator".to_string(),
        client_id: "acme".to_string(),
    }
}
