//! Per-user audio and texture parameters from the HTTP service.
//!
//! GET {endpoint}/{user_id}/audio -> WAV bytes
//! GET {endpoint}/{user_id}/param -> {"chewiness": .., "firmness": ..}

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use bytes::Bytes;
use reqwest::Client;
use url::Url;

use crate::config::Config;
use crate::control::TextureParams;

pub struct RemoteClient {
    client: Client,
    base: Url,
}

impl RemoteClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let base = Url::parse(endpoint).with_context(|| format!("Invalid remote endpoint: {}", endpoint))?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.remote_endpoint, Duration::from_secs(config.remote_timeout_sec))
    }

    /// `{endpoint}/{user_id}/{resource}`; the user id is one path segment.
    pub fn resource_url(&self, user_id: &str, resource: &str) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Endpoint cannot be a base URL: {}", self.base))?
            .pop_if_empty()
            .push(user_id)
            .push(resource);
        Ok(url)
    }

    pub async fn fetch_audio(&self, user_id: &str) -> Result<Bytes> {
        let url = self.resource_url(user_id, "audio")?;
        log::info!("Downloading audio: {}", url);
        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            anyhow::bail!("HTTP Error: {}", resp.status());
        }
        Ok(resp.bytes().await?)
    }

    pub async fn fetch_params(&self, user_id: &str) -> Result<TextureParams> {
        let url = self.resource_url(user_id, "param")?;
        log::info!("Fetching parameters: {}", url);
        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            anyhow::bail!("HTTP Error: {}", resp.status());
        }
        let params = resp.json::<TextureParams>().await?;
        log::debug!("Parameters: {:?}", params);
        Ok(params)
    }
}

/// Replace `path` with `data` without leaving a half-written file behind.
pub async fn save_atomically(path: &Path, data: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".part");
    let tmp = Path::new(&tmp);

    tokio::fs::write(tmp, data)
        .await
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    tokio::fs::rename(tmp, path)
        .await
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_resource_urls() {
        let remote = RemoteClient::new("http://upiscium.f5.si:8001", Duration::from_secs(1)).unwrap();
        assert_eq!(
            remote.resource_url("u42", "audio").unwrap().as_str(),
            "http://upiscium.f5.si:8001/u42/audio"
        );

        let remote = RemoteClient::new("http://host/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            remote.resource_url("a b", "param").unwrap().as_str(),
            "http://host/api/a%20b/param"
        );
    }

    #[test]
    fn rejects_bad_endpoint() {
        assert!(RemoteClient::new("not a url", Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn save_replaces_existing_file() {
        let path = std::env::temp_dir().join(format!("interval_player_save_{}.wav", std::process::id()));
        tokio::fs::write(&path, b"old").await.unwrap();
        save_atomically(&path, b"new contents").await.unwrap();
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"new contents");
        let mut part = path.as_os_str().to_owned();
        part.push(".part");
        assert!(!Path::new(&part).exists());
        let _ = tokio::fs::remove_file(&path).await;
    }
}
