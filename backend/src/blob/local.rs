use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use uuid::Uuid;

use super::{validate_object_name, BlobError, BlobStore};

/// Directory-backed store. Objects are files named after the object;
/// writes go through a temp file and a rename so readers never see a
/// partially written object.
pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalBlobStore {
    pub async fn new(
        root: impl AsRef<Path>,
        public_base_url: impl Into<String>,
    ) -> Result<Self, BlobError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            public_base_url: public_base_url.into(),
        })
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, BlobError> {
        validate_object_name(name)?;
        Ok(self.root.join(name))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn upload(
        &self,
        name: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, BlobError> {
        let target = self.path_for(name)?;
        let tmp = self
            .root
            .join(format!(".{name}.{}.tmp", Uuid::new_v4().simple()));

        if let Err(e) = fs::write(&tmp, &bytes).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&tmp, &target).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        tracing::debug!(object = %name, bytes = bytes.len(), "Stored local object");
        Ok(self.public_url(name))
    }

    async fn download(&self, name: &str) -> Result<Option<Vec<u8>>, BlobError> {
        let path = self.path_for(name)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn public_url(&self, name: &str) -> String {
        format!("{}/{}", self.public_base_url.trim_end_matches('/'), name)
    }
}
