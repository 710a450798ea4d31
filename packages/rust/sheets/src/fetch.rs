//! Sheets API v4 client: open a spreadsheet by key and read its first
//! worksheet into a [`Table`].

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use sheet2xml_shared::{Cell, Result, Sheet2XmlError, Table};
use tracing::{debug, info, instrument};
use url::Url;

use crate::{ensure_success, network_error};

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
    #[serde(default)]
    index: u32,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Authenticated Sheets API client.
pub struct SheetsClient {
    client: Client,
    api_root: Url,
    access_token: String,
}

impl SheetsClient {
    /// Create a client for `api_root` (e.g. `https://sheets.googleapis.com`).
    pub fn new(client: Client, api_root: &str, access_token: impl Into<String>) -> Result<Self> {
        let api_root = Url::parse(api_root).map_err(|e| {
            Sheet2XmlError::config(format!("invalid sheets_api_url '{api_root}': {e}"))
        })?;
        Ok(Self {
            client,
            api_root,
            access_token: access_token.into(),
        })
    }

    /// Read the first worksheet of `spreadsheet_id` as a table.
    #[instrument(skip(self))]
    pub async fn fetch_table(&self, spreadsheet_id: &str) -> Result<Table> {
        let title = self.first_sheet_title(spreadsheet_id).await?;
        let values = self.sheet_values(spreadsheet_id, &title).await?;
        let table = table_from_values(values)?;

        info!(
            sheet = %title,
            columns = table.columns().len(),
            rows = table.len(),
            "fetched worksheet"
        );
        Ok(table)
    }

    /// Title of the worksheet with the lowest index.
    pub async fn first_sheet_title(&self, spreadsheet_id: &str) -> Result<String> {
        let url = self.endpoint(&[spreadsheet_id])?;
        let meta: SpreadsheetMeta = self
            .get_json(url, &[("fields", "sheets.properties")])
            .await?;

        let first = meta
            .sheets
            .into_iter()
            .map(|s| s.properties)
            .min_by_key(|p| p.index)
            .ok_or_else(|| {
                Sheet2XmlError::validation(format!("spreadsheet {spreadsheet_id} has no worksheets"))
            })?;

        debug!(title = %first.title, "selected first worksheet");
        Ok(first.title)
    }

    /// All populated rows of one worksheet, header row included.
    pub async fn sheet_values(&self, spreadsheet_id: &str, title: &str) -> Result<Vec<Vec<Value>>> {
        let range = format!("'{}'", title.replace('\'', "''"));
        let url = self.endpoint(&[spreadsheet_id, "values", &range])?;
        let range: ValueRange = self
            .get_json(
                url,
                &[
                    ("majorDimension", "ROWS"),
                    ("valueRenderOption", "FORMATTED_VALUE"),
                ],
            )
            .await?;
        Ok(range.values)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.api_root.clone();
        url.path_segments_mut()
            .map_err(|()| Sheet2XmlError::config(format!("invalid API root {}", self.api_root)))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets"])
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T>(&self, url: Url, query: &[(&str, &str)]) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let url_str = url.to_string();
        let response = self
            .client
            .get(url)
            .query(query)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| network_error(&url_str, e))?;
        let response = ensure_success(response).await?;

        response.json().await.map_err(|e| {
            Sheet2XmlError::validation(format!("{url_str}: unexpected response shape: {e}"))
        })
    }
}

/// Convert a Sheets `values` grid into a [`Table`].
///
/// The first row names the columns. Data rows are padded with empty cells
/// to the header width and cut to it. Empty cells stay as empty strings;
/// normalization to missing happens in the transform.
pub fn table_from_values(values: Vec<Vec<Value>>) -> Result<Table> {
    let mut rows = values.into_iter();
    let Some(header) = rows.next() else {
        return Table::new(Vec::new(), Vec::new());
    };

    let columns: Vec<String> = header.iter().map(render_value).collect();
    let width = columns.len();

    let rows = rows
        .map(|row| {
            let mut cells: Vec<Cell> = row
                .iter()
                .take(width)
                .map(|v| Some(render_value(v)))
                .collect();
            cells.resize(width, Some(String::new()));
            cells
        })
        .collect();

    Table::new(columns, rows)
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fixture(name: &str) -> Value {
        let content = std::fs::read_to_string(format!("../../../fixtures/sheets/{name}"))
            .unwrap_or_else(|_| panic!("missing fixture: {name}"));
        serde_json::from_str(&content).expect("fixture json")
    }

    #[test]
    fn pads_and_truncates_rows() {
        let table = table_from_values(vec![
            vec![json!("A"), json!("B"), json!("C")],
            vec![json!("1")],
            vec![json!("1"), json!("2"), json!("3"), json!("overflow")],
        ])
        .unwrap();

        assert_eq!(table.columns(), &["A", "B", "C"]);
        assert_eq!(
            table.rows()[0],
            vec![Some("1".into()), Some(String::new()), Some(String::new())]
        );
        assert_eq!(table.rows()[1].len(), 3);
    }

    #[test]
    fn renders_non_string_values() {
        let table = table_from_values(vec![
            vec![json!("n"), json!("b"), json!("z")],
            vec![json!(42), json!(true), Value::Null],
        ])
        .unwrap();
        assert_eq!(
            table.rows()[0],
            vec![Some("42".into()), Some("true".into()), Some(String::new())]
        );
    }

    #[test]
    fn empty_grid_is_empty_table() {
        let table = table_from_values(Vec::new()).unwrap();
        assert!(table.is_empty());
        assert!(table.columns().is_empty());
    }

    #[test]
    fn duplicate_headers_rejected() {
        let err = table_from_values(vec![vec![json!("Text"), json!("Text")]]).unwrap_err();
        assert!(matches!(err, Sheet2XmlError::Validation { .. }));
    }

    async fn mount_sheet(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/v4/spreadsheets/sheet-123"))
            .and(query_param("fields", "sheets.properties"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(fixture("metadata.fixture.json")))
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v4/spreadsheets/sheet-123/values/'Conversations'"))
            .and(query_param("majorDimension", "ROWS"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(fixture("values.fixture.json")))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn fetches_first_worksheet() {
        let server = MockServer::start().await;
        mount_sheet(&server).await;

        let client = SheetsClient::new(crate::build_client(5).unwrap(), &server.uri(), "tok").unwrap();
        let table = client.fetch_table("sheet-123").await.expect("fetch");

        assert_eq!(
            table.columns(),
            &[
                "Conversation ID",
                "Prompt",
                "Classification",
                "Text",
                "Feedback",
                "Next Conversation ID"
            ]
        );
        assert_eq!(table.len(), 7);
        let second = table.record(1).unwrap();
        assert_eq!(second.get("Text"), Some("Pretty good."));
        assert_eq!(second.get("Next Conversation ID"), Some(""));

        let classifications: Vec<&str> = table
            .records()
            .filter_map(|r| r.get("Classification"))
            .filter(|c| !c.is_empty())
            .collect();
        assert_eq!(
            classifications,
            vec!["Positive", "Negative", "Work", "Hobbies", "Yes", "No"]
        );
    }

    #[tokio::test]
    async fn permission_denied_is_fetch_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v4/spreadsheets/locked"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": { "code": 403, "status": "PERMISSION_DENIED" }
            })))
            .mount(&server)
            .await;

        let client = SheetsClient::new(crate::build_client(5).unwrap(), &server.uri(), "tok").unwrap();
        let err = client.fetch_table("locked").await.unwrap_err();

        match err {
            Sheet2XmlError::Fetch { status, message, .. } => {
                assert_eq!(status, 403);
                assert!(message.contains("PERMISSION_DENIED"));
            }
            other => panic!("expected fetch error, got {other}"),
        }
    }

    #[tokio::test]
    async fn spreadsheet_without_sheets_is_validation_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v4/spreadsheets/blank"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let client = SheetsClient::new(crate::build_client(5).unwrap(), &server.uri(), "tok").unwrap();
        let err = client.fetch_table("blank").await.unwrap_err();
        assert!(err.to_string().contains("has no worksheets"));
    }
}
