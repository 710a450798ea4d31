//! Google Sheets access: credential resolution, service-account auth, and
//! worksheet fetching.
//!
//! This crate provides:
//! - [`CredentialResolver`] — finds or downloads the service-account key file
//! - [`auth`] — RS256 JWT assertion and OAuth token exchange
//! - [`SheetsClient`] — reads the first worksheet of a spreadsheet into a [`Table`]
//!
//! [`Table`]: sheet2xml_shared::Table

pub mod auth;
pub mod credentials;
pub mod fetch;
pub mod ids;

use std::time::Duration;

use reqwest::{Client, Response};
use sheet2xml_shared::{Result, Sheet2XmlError};

pub use auth::{AccessToken, fetch_access_token, sign_assertion};
pub use credentials::{CredentialResolver, ServiceAccountKey};
pub use fetch::{SheetsClient, table_from_values};
pub use ids::{parse_drive_id, parse_sheet_id};

/// User-Agent string for all outgoing requests.
const USER_AGENT: &str = concat!("sheet2xml/", env!("CARGO_PKG_VERSION"));

/// Maximum number of redirects to follow (Drive downloads redirect once or twice).
const MAX_REDIRECTS: usize = 5;

/// Longest error-body excerpt carried into a [`Sheet2XmlError::Fetch`].
const ERROR_BODY_EXCERPT: usize = 300;

/// Build a reqwest client with the workspace's standard settings.
pub fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Sheet2XmlError::Network(format!("failed to build HTTP client: {e}")))
}

/// Turn a non-success response into a [`Sheet2XmlError::Fetch`] carrying the
/// status and the start of the body.
pub(crate) async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    let mut message: String = body.trim().chars().take(ERROR_BODY_EXCERPT).collect();
    if message.is_empty() {
        message = status.canonical_reason().unwrap_or("no body").to_string();
    }

    Err(Sheet2XmlError::Fetch {
        url,
        status: status.as_u16(),
        message,
    })
}

/// Map a transport error to [`Sheet2XmlError::Network`].
pub(crate) fn network_error(url: &str, err: reqwest::Error) -> Sheet2XmlError {
    Sheet2XmlError::Network(format!("{url}: {err}"))
}
