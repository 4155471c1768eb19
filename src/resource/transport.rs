use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Byte transport used to fetch manifests, chunks and input images.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Bytes>;
}

/// Resolve `reference` against `base`. Absolute references (`scheme://...`)
/// replace the base entirely; everything else is joined onto it.
pub fn resolve_uri(reference: &str, base: &Url) -> Result<Url> {
    Ok(base.join(reference)?)
}

/// HTTP(S) transport. Timeouts are enforced here and nowhere else.
#[derive(Clone, Default)]
pub struct HttpTransport {
    client: Client,
    timeout: Option<Duration>,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &Url) -> Result<Bytes> {
        let mut req = self.client.get(url.clone());
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }
        let resp = req.send().await?.error_for_status()?;
        Ok(resp.bytes().await?)
    }
}

/// `file://` transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTransport;

#[async_trait]
impl Transport for FileTransport {
    async fn fetch(&self, url: &Url) -> Result<Bytes> {
        let path = url
            .to_file_path()
            .map_err(|_| Error::UnsupportedProtocol(format!("{url} is not a local file path")))?;
        let bytes = tokio::fs::read(&path).await?;
        Ok(Bytes::from(bytes))
    }
}

/// Dispatches on the URL scheme: `http`/`https` over HTTP, `file` from disk.
#[derive(Clone, Default)]
pub struct DefaultTransport {
    http: HttpTransport,
    file: FileTransport,
}

impl DefaultTransport {
    pub fn new(http: HttpTransport) -> Self {
        Self {
            http,
            file: FileTransport,
        }
    }
}

#[async_trait]
impl Transport for DefaultTransport {
    async fn fetch(&self, url: &Url) -> Result<Bytes> {
        tracing::debug!("Fetching {}", url);
        match url.scheme() {
            "http" | "https" => self.http.fetch(url).await,
            "file" => self.file.fetch(url).await,
            other => Err(Error::UnsupportedProtocol(format!("{other}:"))),
        }
    }
}
