//! End-to-end `convert` pipeline: credentials → fetch → transform → XML file.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};
use tracing::{info, instrument};

use sheet2xml_sheets::{
    CredentialResolver, ServiceAccountKey, SheetsClient, build_client, fetch_access_token,
    parse_sheet_id,
};
use sheet2xml_shared::fs::write_atomic;
use sheet2xml_shared::{Result, Settings, Sheet2XmlError, Table};

use crate::transform::transform;
use crate::xml::to_xml;

/// What the caller gets back, per `return_fpath`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvertOutput {
    /// Absolute path of the written file.
    Path(PathBuf),
    /// Full text of the written file.
    Content(String),
}

impl std::fmt::Display for ConvertOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Content(content) => f.write_str(content),
        }
    }
}

/// Result of the `convert` pipeline.
#[derive(Debug)]
pub struct ConvertResult {
    pub output: ConvertOutput,
    /// Absolute path of the written file.
    pub output_path: PathBuf,
    /// Data rows read from the sheet.
    pub rows: usize,
    pub conversations: usize,
    pub responses: usize,
    pub size_bytes: usize,
    /// Hex SHA-256 of the written file.
    pub sha256: String,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when the pipeline completes.
    fn done(&self, result: &ConvertResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _result: &ConvertResult) {}
}

/// Run the full pipeline for one spreadsheet.
///
/// 1. Validate settings (no I/O happens before this succeeds)
/// 2. Resolve the service-account key, downloading it if needed
/// 3. Exchange it for an access token and read the first worksheet
/// 4. Transform and write the XML document
#[instrument(skip_all, fields(sheet = %sheet))]
pub async fn convert(
    sheet: &str,
    settings: &Settings,
    progress: &dyn ProgressReporter,
) -> Result<ConvertResult> {
    let start = Instant::now();
    let source = settings.validate()?;
    let sheet_id = parse_sheet_id(sheet)?;

    info!(%sheet_id, "starting convert pipeline");

    progress.phase("Resolving credentials");
    let key_path = CredentialResolver::new(settings)?.resolve(&source).await?;
    let key = ServiceAccountKey::load(&key_path)?;

    progress.phase("Authenticating");
    let client = build_client(settings.http_timeout_secs)?;
    let token = fetch_access_token(&client, &key, &settings.scope).await?;

    progress.phase("Fetching worksheet");
    let table = SheetsClient::new(client, &settings.sheets_api_url, token.access_token)?
        .fetch_table(&sheet_id)
        .await?;

    let result = write_table(table, settings, progress, start)?;
    progress.done(&result);
    Ok(result)
}

/// Transform an already fetched table and write it per `settings`.
pub fn convert_table(
    table: Table,
    settings: &Settings,
    progress: &dyn ProgressReporter,
) -> Result<ConvertResult> {
    let result = write_table(table, settings, progress, Instant::now())?;
    progress.done(&result);
    Ok(result)
}

fn write_table(
    table: Table,
    settings: &Settings,
    progress: &dyn ProgressReporter,
    start: Instant,
) -> Result<ConvertResult> {
    let rows = table.len();

    progress.phase("Grouping conversations");
    let document = transform(table, &settings.columns, settings.group_order)?;

    progress.phase("Writing XML");
    let xml = to_xml(&document, settings.pretty)?;
    write_atomic(&settings.output_file, xml.as_bytes())?;

    let output_path = std::path::absolute(&settings.output_file)
        .map_err(|e| Sheet2XmlError::io(&settings.output_file, e))?;
    let sha256 = format!("{:x}", Sha256::digest(xml.as_bytes()));
    let size_bytes = xml.len();

    info!(
        path = %output_path.display(),
        conversations = document.conversations.len(),
        responses = document.response_count(),
        size_bytes,
        "wrote XML document"
    );

    let output = if settings.return_fpath {
        ConvertOutput::Path(output_path.clone())
    } else {
        ConvertOutput::Content(xml)
    };

    Ok(ConvertResult {
        output,
        output_path,
        rows,
        conversations: document.conversations.len(),
        responses: document.response_count(),
        size_bytes,
        sha256,
        elapsed: start.elapsed(),
    })
}
