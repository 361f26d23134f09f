use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{validate_object_name, BlobError, BlobStore};

/// In-process store for tests. Writes to names matching a denied prefix
/// fail as if the backend refused them.
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<String, (Vec<u8>, String)>>,
    denied_prefixes: Mutex<Vec<String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deny_writes_to(&self, prefix: &str) {
        self.denied_prefixes
            .lock()
            .expect("denied prefixes lock")
            .push(prefix.to_owned());
    }

    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.objects.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn content_type(&self, name: &str) -> Option<String> {
        self.objects.read().await.get(name).map(|(_, ct)| ct.clone())
    }

    pub async fn put_text(&self, name: &str, text: &str) {
        self.objects
            .write()
            .await
            .insert(name.to_owned(), (text.as_bytes().to_vec(), "text/csv".into()));
    }

    fn is_denied(&self, name: &str) -> bool {
        self.denied_prefixes
            .lock()
            .expect("denied prefixes lock")
            .iter()
            .any(|p| name.starts_with(p.as_str()))
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(
        &self,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BlobError> {
        validate_object_name(name)?;
        if self.is_denied(name) {
            return Err(BlobError::Denied {
                operation: "upload",
                name: name.to_owned(),
                status: 403,
            });
        }
        self.objects
            .write()
            .await
            .insert(name.to_owned(), (bytes, content_type.to_owned()));
        Ok(self.public_url(name))
    }

    async fn download(&self, name: &str) -> Result<Option<Vec<u8>>, BlobError> {
        validate_object_name(name)?;
        Ok(self.objects.read().await.get(name).map(|(b, _)| b.clone()))
    }

    fn public_url(&self, name: &str) -> String {
        format!("memory://bucket/{name}")
    }
}
