use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, StatusCode, Url};

use super::gcs_auth::GcsAuth;
use super::{validate_object_name, BlobError, BlobStore};

const GCS_API_BASE: &str = "https://storage.googleapis.com";

/// Google Cloud Storage via the JSON API.
///
/// The bucket is expected to use uniform bucket-level access with public
/// read granted at the bucket, so objects are not made public one by one.
pub struct GcsBlobStore {
    client: reqwest::Client,
    bucket: String,
    api_base: String,
    public_base_url: String,
    auth: GcsAuth,
}

impl GcsBlobStore {
    pub fn new(bucket: impl Into<String>, public_base_url: impl Into<String>, auth: GcsAuth) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            bucket: bucket.into(),
            api_base: GCS_API_BASE.to_string(),
            public_base_url: public_base_url.into(),
            auth,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, BlobError> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| BlobError::Unreachable(format!("bad API base: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| BlobError::Unreachable("API base cannot carry a path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn upload_url(&self, name: &str) -> Result<Url, BlobError> {
        let mut url = self.endpoint(&["upload", "storage", "v1", "b", &self.bucket, "o"])?;
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", name);
        Ok(url)
    }

    fn media_url(&self, name: &str) -> Result<Url, BlobError> {
        let mut url = self.endpoint(&["storage", "v1", "b", &self.bucket, "o", name])?;
        url.query_pairs_mut().append_pair("alt", "media");
        Ok(url)
    }

    async fn authorize(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, BlobError> {
        Ok(match self.auth.bearer_token(&self.client).await? {
            Some(token) => request.bearer_auth(token),
            None => request,
        })
    }
}

#[async_trait]
impl BlobStore for GcsBlobStore {
    async fn upload(
        &self,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BlobError> {
        validate_object_name(name)?;
        let size = bytes.len();
        let request = self
            .client
            .post(self.upload_url(name)?)
            .header(CONTENT_TYPE, content_type)
            .body(bytes);
        let response = self
            .authorize(request)
            .await?
            .send()
            .await
            .map_err(|e| BlobError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(object = %name, status = %status, body = %body, "GCS upload refused");
            return Err(BlobError::Denied {
                operation: "upload",
                name: name.to_owned(),
                status: status.as_u16(),
            });
        }

        tracing::debug!(object = %name, bytes = size, "Uploaded object to GCS");
        Ok(self.public_url(name))
    }

    async fn download(&self, name: &str) -> Result<Option<Vec<u8>>, BlobError> {
        validate_object_name(name)?;
        let request = self.client.get(self.media_url(name)?);
        let response = self
            .authorize(request)
            .await?
            .send()
            .await
            .map_err(|e| BlobError::Unreachable(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| BlobError::Unreachable(e.to_string()))?;
                Ok(Some(bytes.to_vec()))
            }
            status => Err(BlobError::Denied {
                operation: "download",
                name: name.to_owned(),
                status: status.as_u16(),
            }),
        }
    }

    fn public_url(&self, name: &str) -> String {
        format!(
            "{}/{}/{}",
            self.public_base_url.trim_end_matches('/'),
            self.bucket,
            name
        )
    }
}
