//! In-memory adapter with delimiter listing semantics, used by router tests

use std::collections::BTreeMap;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use parking_lot::Mutex;

use super::{ListingPage, ObjectBody, ObjectEntry, StorageAdapter};
use crate::utils::object_key;

pub struct MemoryAdapter {
    domain: String,
    objects: Mutex<BTreeMap<String, Bytes>>,
}

impl MemoryAdapter {
    pub fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            objects: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().contains_key(key)
    }
}

#[async_trait]
impl StorageAdapter for MemoryAdapter {
    fn name(&self) -> &str {
        "memory"
    }

    fn custom_domain(&self) -> &str {
        &self.domain
    }

    fn default_endpoint(&self) -> String {
        "http://memory.local".to_string()
    }

    async fn list(&self, prefix: &str) -> Result<ListingPage> {
        let objects = self.objects.lock();
        let mut dirs: Vec<String> = Vec::new();
        let mut items = Vec::new();

        for (key, content) in objects.range(prefix.to_string()..) {
            let Some(rest) = key.strip_prefix(prefix) else { break };
            if rest.is_empty() {
                continue;
            }
            match rest.find('/') {
                Some(pos) => {
                    let dir = format!("{}{}", prefix, &rest[..=pos]);
                    if dirs.last() != Some(&dir) {
                        dirs.push(dir);
                    }
                }
                None => items.push(ObjectEntry::file(key, prefix, content.len() as u64, "2024-01-01T00:00:00.000Z".to_string())),
            }
        }

        let mut entries: Vec<ObjectEntry> = dirs.iter().map(|d| ObjectEntry::dir(d, prefix)).collect();
        entries.extend(items);
        Ok(ListingPage::complete(entries))
    }

    async fn put_object(&self, key: &str, body: ObjectBody) -> Result<()> {
        let key = object_key(key)?.to_string();
        let chunks: Vec<Bytes> = body.into_stream().try_collect().await?;
        self.objects.lock().insert(key, Bytes::from(chunks.concat()));
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let key = object_key(path)?;
        self.objects
            .lock()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| anyhow!("NoSuchKey: {}", path))
    }
}
