//! Application configuration for sheet2xml.
//!
//! User config lives at `~/.sheet2xml/sheet2xml.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, Sheet2XmlError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "sheet2xml.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".sheet2xml";

// ---------------------------------------------------------------------------
// Config structs (matching sheet2xml.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Service-account credentials and OAuth scope.
    #[serde(default)]
    pub credentials: CredentialsConfig,

    /// Output destination and document shape.
    #[serde(default)]
    pub output: OutputConfig,

    /// Sheet column names.
    #[serde(default)]
    pub columns: ColumnNames,

    /// Remote endpoints and HTTP settings.
    #[serde(default)]
    pub endpoints: EndpointsConfig,
}

/// `[credentials]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Local service-account key file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creds_file: Option<String>,

    /// Prefer `creds_file` over `creds_gdrive_id` when both are set.
    #[serde(default = "default_true")]
    pub use_creds_file: bool,

    /// Google Drive file id of the service-account key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creds_gdrive_id: Option<String>,

    /// Where downloaded key files are written.
    #[serde(default = "default_download_dir")]
    pub download_dir: String,

    /// OAuth scopes requested for the access token.
    #[serde(default = "default_scope")]
    pub scope: Vec<String>,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            creds_file: None,
            use_creds_file: true,
            creds_gdrive_id: None,
            download_dir: default_download_dir(),
            scope: default_scope(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_download_dir() -> String {
    "~/.sheet2xml/credentials".into()
}
fn default_scope() -> Vec<String> {
    vec![
        "https://www.googleapis.com/auth/spreadsheets.readonly".into(),
        "https://www.googleapis.com/auth/drive.readonly".into(),
    ]
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Destination XML file.
    #[serde(default = "default_output_file")]
    pub output_file: String,

    /// Return the absolute output path instead of the document text.
    #[serde(default)]
    pub return_fpath: bool,

    /// Indent the XML body.
    #[serde(default)]
    pub pretty: bool,

    /// Order in which conversation and response groups are emitted.
    #[serde(default)]
    pub group_order: GroupOrder,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_file: default_output_file(),
            return_fpath: false,
            pretty: false,
            group_order: GroupOrder::default(),
        }
    }
}

fn default_output_file() -> String {
    "conversations.xml".into()
}

/// Group iteration order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupOrder {
    /// Ascending lexicographic key order.
    #[default]
    Sorted,
    /// Order of first appearance in the table.
    FirstSeen,
}

impl FromStr for GroupOrder {
    type Err = Sheet2XmlError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sorted" => Ok(Self::Sorted),
            "first-seen" => Ok(Self::FirstSeen),
            other => Err(Sheet2XmlError::config(format!(
                "invalid group order '{other}': expected 'sorted' or 'first-seen'"
            ))),
        }
    }
}

/// `[columns]` section: header names of the columns the transform reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnNames {
    #[serde(default = "default_conversation_id")]
    pub conversation_id: String,
    #[serde(default = "default_prompt")]
    pub prompt: String,
    #[serde(default = "default_classification")]
    pub classification: String,
    #[serde(default = "default_text")]
    pub text: String,
    #[serde(default = "default_feedback")]
    pub feedback: String,
    #[serde(default = "default_next_conversation_id")]
    pub next_conversation_id: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            conversation_id: default_conversation_id(),
            prompt: default_prompt(),
            classification: default_classification(),
            text: default_text(),
            feedback: default_feedback(),
            next_conversation_id: default_next_conversation_id(),
        }
    }
}

impl ColumnNames {
    /// All configured names, in transform order.
    pub fn all(&self) -> [&str; 6] {
        [
            &self.conversation_id,
            &self.prompt,
            &self.classification,
            &self.text,
            &self.feedback,
            &self.next_conversation_id,
        ]
    }
}

fn default_conversation_id() -> String {
    "Conversation ID".into()
}
fn default_prompt() -> String {
    "Prompt".into()
}
fn default_classification() -> String {
    "Classification".into()
}
fn default_text() -> String {
    "Text".into()
}
fn default_feedback() -> String {
    "Feedback".into()
}
fn default_next_conversation_id() -> String {
    "Next Conversation ID".into()
}

/// `[endpoints]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    /// Google Drive direct-download endpoint.
    #[serde(default = "default_drive_download_url")]
    pub drive_download_url: String,

    /// Google Sheets API root.
    #[serde(default = "default_sheets_api_url")]
    pub sheets_api_url: String,

    /// Per-request HTTP timeout.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            drive_download_url: default_drive_download_url(),
            sheets_api_url: default_sheets_api_url(),
            http_timeout_secs: default_http_timeout(),
        }
    }
}

fn default_drive_download_url() -> String {
    "https://drive.google.com/uc".into()
}
fn default_sheets_api_url() -> String {
    "https://sheets.googleapis.com".into()
}
fn default_http_timeout() -> u64 {
    30
}

// ---------------------------------------------------------------------------
// Settings (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime settings, merged from the config file and CLI flags.
#[derive(Debug, Clone)]
pub struct Settings {
    pub creds_file: Option<PathBuf>,
    pub use_creds_file: bool,
    pub creds_gdrive_id: Option<String>,
    pub creds_download_dir: PathBuf,
    pub scope: Vec<String>,
    pub output_file: PathBuf,
    pub return_fpath: bool,
    pub pretty: bool,
    pub group_order: GroupOrder,
    pub columns: ColumnNames,
    pub drive_download_url: String,
    pub sheets_api_url: String,
    pub http_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for Settings {
    fn from(config: &AppConfig) -> Self {
        let creds = &config.credentials;
        Self {
            creds_file: creds.creds_file.as_deref().map(expand_home),
            use_creds_file: creds.use_creds_file,
            creds_gdrive_id: creds.creds_gdrive_id.clone(),
            creds_download_dir: expand_home(&creds.download_dir),
            scope: creds.scope.clone(),
            output_file: expand_home(&config.output.output_file),
            return_fpath: config.output.return_fpath,
            pretty: config.output.pretty,
            group_order: config.output.group_order,
            columns: config.columns.clone(),
            drive_download_url: config.endpoints.drive_download_url.clone(),
            sheets_api_url: config.endpoints.sheets_api_url.clone(),
            http_timeout_secs: config.endpoints.http_timeout_secs,
        }
    }
}

/// Where the service-account key comes from, after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// A key file on disk, with an optional Drive id to download from if it is absent.
    File {
        path: PathBuf,
        fallback_drive_id: Option<String>,
    },
    /// A key file that must be downloaded from Drive.
    Drive { drive_id: String },
}

impl Settings {
    /// Validate everything that can be checked without touching the network.
    ///
    /// Returns the credential source the resolver should use.
    pub fn validate(&self) -> Result<CredentialSource> {
        if self.scope.is_empty() || self.scope.iter().any(|s| s.trim().is_empty()) {
            return Err(Sheet2XmlError::config(
                "scope must contain at least one non-empty entry",
            ));
        }
        if self.columns.all().iter().any(|c| c.is_empty()) {
            return Err(Sheet2XmlError::config("column names must not be empty"));
        }
        for (name, value) in [
            ("drive_download_url", &self.drive_download_url),
            ("sheets_api_url", &self.sheets_api_url),
        ] {
            Url::parse(value)
                .map_err(|e| Sheet2XmlError::config(format!("invalid {name} '{value}': {e}")))?;
        }
        self.credential_source()
    }

    /// Decide between the local key file and the Drive id.
    ///
    /// Exactly one must be configured, unless `use_creds_file` is set, in which
    /// case the local file wins and the Drive id is kept as a download fallback.
    pub fn credential_source(&self) -> Result<CredentialSource> {
        let drive_id = self
            .creds_gdrive_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty());

        match (&self.creds_file, drive_id) {
            (Some(path), Some(id)) if self.use_creds_file => {
                tracing::warn!(
                    path = %path.display(),
                    "use_creds_file is set: the existing key file will be used"
                );
                Ok(CredentialSource::File {
                    path: path.clone(),
                    fallback_drive_id: Some(id.to_string()),
                })
            }
            (Some(path), Some(id)) => Err(Sheet2XmlError::config(format!(
                "exactly one of creds_file ({}) and creds_gdrive_id ({id}) may be set \
                 unless use_creds_file is enabled",
                path.display()
            ))),
            (Some(path), None) => Ok(CredentialSource::File {
                path: path.clone(),
                fallback_drive_id: None,
            }),
            (None, Some(id)) => Ok(CredentialSource::Drive {
                drive_id: id.to_string(),
            }),
            (None, None) => Err(Sheet2XmlError::config(
                "no credentials configured: set creds_file or creds_gdrive_id",
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.sheet2xml/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| Sheet2XmlError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.sheet2xml/sheet2xml.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| Sheet2XmlError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| Sheet2XmlError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| Sheet2XmlError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| Sheet2XmlError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| Sheet2XmlError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(path),
        },
        None => PathBuf::from(path),
    }
}
