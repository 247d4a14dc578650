//! In-memory storage backend for tests

use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use crate::errors::{Result, SchedLoadError};
use crate::storage::{StorageBackend, TopicRule};

#[derive(Default)]
struct State {
    /// Insertion ordered, like a provider listing
    objects: Vec<(String, Vec<u8>)>,
    rules: Vec<TopicRule>,
    delete_calls: usize,
    rule_writes: usize,
    fail_list: bool,
    fail_rules: bool,
    drop_puts: bool,
}

#[derive(Default)]
pub struct MemoryStorage {
    state: Mutex<State>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_objects(keys: &[&str]) -> Self {
        let storage = Self::new();
        for key in keys {
            storage.insert(key, b"");
        }
        storage
    }

    pub fn with_rules(rules: Vec<TopicRule>) -> Self {
        let storage = Self::new();
        storage.state.lock().unwrap().rules = rules;
        storage
    }

    pub fn insert(&self, key: &str, data: &[u8]) {
        let mut state = self.state.lock().unwrap();
        state.objects.retain(|(k, _)| k != key);
        state.objects.push((key.to_string(), data.to_vec()));
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        let state = self.state.lock().unwrap();
        state
            .objects
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, data)| data.clone())
    }

    pub fn keys(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.objects.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn rules(&self) -> Vec<TopicRule> {
        self.state.lock().unwrap().rules.clone()
    }

    pub fn delete_calls(&self) -> usize {
        self.state.lock().unwrap().delete_calls
    }

    pub fn rule_writes(&self) -> usize {
        self.state.lock().unwrap().rule_writes
    }

    /// Make every listing fail
    pub fn fail_list(&self) {
        self.state.lock().unwrap().fail_list = true;
    }

    /// Make reading notification rules fail
    pub fn fail_rules(&self) {
        self.state.lock().unwrap().fail_rules = true;
    }

    /// Accept puts without storing them, like a store that has not caught up
    pub fn drop_puts(&self) {
        self.state.lock().unwrap().drop_puts = true;
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Bytes> {
        self.object(key)
            .map(Bytes::from)
            .ok_or_else(|| SchedLoadError::storage("GetObject", format!("NoSuchKey: {}", key)))
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        if self.state.lock().unwrap().drop_puts {
            return Ok(());
        }
        self.insert(key, &data);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.delete_calls += 1;
        state.objects.retain(|(k, _)| k != key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let state = self.state.lock().unwrap();
        if state.fail_list {
            return Err(SchedLoadError::storage("ListObjectsV2", "connection refused"));
        }
        Ok(state
            .objects
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    async fn topic_rules(&self) -> Result<Vec<TopicRule>> {
        let state = self.state.lock().unwrap();
        if state.fail_rules {
            return Err(SchedLoadError::storage(
                "GetBucketNotificationConfiguration",
                "AccessDenied",
            ));
        }
        Ok(state.rules.clone())
    }

    async fn set_topic_rules(&self, rules: Vec<TopicRule>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.rule_writes += 1;
        state.rules = rules;
        Ok(())
    }
}
