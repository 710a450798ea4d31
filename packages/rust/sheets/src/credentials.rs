//! Service-account key resolution.
//!
//! The key file either already exists on disk or is downloaded from Google
//! Drive by file id. Downloads are validated as a service-account key before
//! anything is written.

use std::path::{Path, PathBuf};

use reqwest::Client;
use serde::Deserialize;
use sheet2xml_shared::fs::write_atomic;
use sheet2xml_shared::{CredentialSource, Result, Settings, Sheet2XmlError};
use tracing::{debug, info, instrument};

use crate::ids::parse_drive_id;
use crate::{build_client, ensure_success, network_error};

// ---------------------------------------------------------------------------
// ServiceAccountKey
// ---------------------------------------------------------------------------

/// The fields of a Google service-account JSON key that sheet2xml uses.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    pub token_uri: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
}

impl ServiceAccountKey {
    /// Parse a key from its JSON text.
    pub fn from_json(input: &str) -> Result<Self> {
        let key: Self = serde_json::from_str(input).map_err(|e| {
            Sheet2XmlError::validation(format!("not a service-account key: {e}"))
        })?;

        if key.client_email.is_empty() || key.private_key.is_empty() {
            return Err(Sheet2XmlError::validation(
                "service-account key has an empty client_email or private_key",
            ));
        }
        Ok(key)
    }

    /// Read and parse a key file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Sheet2XmlError::io(path, e))?;
        Self::from_json(&content)
    }
}

// ---------------------------------------------------------------------------
// CredentialResolver
// ---------------------------------------------------------------------------

/// Produces a path to a usable key file, downloading it when necessary.
pub struct CredentialResolver {
    client: Client,
    drive_download_url: String,
    download_dir: PathBuf,
}

impl CredentialResolver {
    /// Create a resolver from runtime settings.
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            client: build_client(settings.http_timeout_secs)?,
            drive_download_url: settings.drive_download_url.clone(),
            download_dir: settings.creds_download_dir.clone(),
        })
    }

    /// Resolve `source` to a key file on disk.
    ///
    /// An existing local file is used as-is without any network call.
    #[instrument(skip_all)]
    pub async fn resolve(&self, source: &CredentialSource) -> Result<PathBuf> {
        match source {
            CredentialSource::File {
                path,
                fallback_drive_id,
            } => {
                if path.is_file() {
                    debug!(path = %path.display(), "using existing key file");
                    return Ok(path.clone());
                }
                match fallback_drive_id {
                    Some(id) => {
                        info!(path = %path.display(), "key file missing, downloading from Drive");
                        self.download(id).await
                    }
                    None => Err(Sheet2XmlError::io(
                        path,
                        std::io::Error::new(
                            std::io::ErrorKind::NotFound,
                            "service-account key file not found",
                        ),
                    )),
                }
            }
            CredentialSource::Drive { drive_id } => self.download(drive_id).await,
        }
    }

    /// Where a download of `drive_id` is written.
    pub fn download_path(&self, drive_id: &str) -> PathBuf {
        self.download_dir.join(format!("{drive_id}.json"))
    }

    /// Download the key keyed by `drive_id`, overwriting any earlier download.
    #[instrument(skip(self))]
    async fn download(&self, drive_id: &str) -> Result<PathBuf> {
        let drive_id = parse_drive_id(drive_id)?;
        let url = &self.drive_download_url;

        let response = self
            .client
            .get(url)
            .query(&[("export", "download"), ("id", drive_id.as_str())])
            .send()
            .await
            .map_err(|e| network_error(url, e))?;
        let response = ensure_success(response).await?;

        let body = response
            .text()
            .await
            .map_err(|e| network_error(url, e))?;

        // Drive answers unshared or missing files with an HTML page and a 200.
        ServiceAccountKey::from_json(&body).map_err(|e| {
            Sheet2XmlError::Fetch {
                url: url.clone(),
                status: 200,
                message: format!("Drive file {drive_id} did not contain a key ({e})"),
            }
        })?;

        let path = self.download_path(&drive_id);
        write_atomic(&path, body.as_bytes())?;
        info!(path = %path.display(), "downloaded service-account key");

        Ok(path)
    }
}
