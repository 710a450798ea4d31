//! Spreadsheet and Drive identifier parsing.
//!
//! Both identifiers may be given bare or as the URL a browser shows.

use std::sync::LazyLock;

use regex::Regex;
use sheet2xml_shared::{Result, Sheet2XmlError};
use url::Url;

static BARE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid regex"));

static SHEET_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/spreadsheets/d/([A-Za-z0-9_-]+)").expect("valid regex"));

static DRIVE_FILE_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/file/d/([A-Za-z0-9_-]+)").expect("valid regex"));

/// Extract a spreadsheet key from a bare key or a `docs.google.com/spreadsheets/d/<key>` URL.
pub fn parse_sheet_id(input: &str) -> Result<String> {
    let input = input.trim();
    if BARE_ID_RE.is_match(input) {
        return Ok(input.to_string());
    }
    if let Some(caps) = SHEET_URL_RE.captures(input) {
        return Ok(caps[1].to_string());
    }
    Err(Sheet2XmlError::validation(format!(
        "'{input}' is not a spreadsheet id or URL"
    )))
}

/// Extract a Drive file id from a bare id, a `drive.google.com/file/d/<id>` URL,
/// or any URL carrying an `id=<id>` query parameter.
pub fn parse_drive_id(input: &str) -> Result<String> {
    let input = input.trim();
    if BARE_ID_RE.is_match(input) {
        return Ok(input.to_string());
    }
    if let Some(caps) = DRIVE_FILE_URL_RE.captures(input) {
        return Ok(caps[1].to_string());
    }
    if let Ok(url) = Url::parse(input) {
        if let Some((_, id)) = url.query_pairs().find(|(k, _)| k == "id") {
            if BARE_ID_RE.is_match(&id) {
                return Ok(id.into_owned());
            }
        }
    }
    Err(Sheet2XmlError::validation(format!(
        "'{input}' is not a Drive file id or URL"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_sheet_id() {
        assert_eq!(
            parse_sheet_id(" 1x9sIJcJ857u2V7GV9gdlgjzng6jyPpK9Hh4O-GOi8PE ").unwrap(),
            "1x9sIJcJ857u2V7GV9gdlgjzng6jyPpK9Hh4O-GOi8PE"
        );
    }

    #[test]
    fn sheet_id_from_url() {
        let url = "https://docs.google.com/spreadsheets/d/1x9sIJcJ857u2V7GV9gdl_gj/edit#gid=0";
        assert_eq!(parse_sheet_id(url).unwrap(), "1x9sIJcJ857u2V7GV9gdl_gj");
    }

    #[test]
    fn sheet_id_rejects_garbage() {
        assert!(parse_sheet_id("not a sheet").is_err());
        assert!(parse_sheet_id("").is_err());
    }

    #[test]
    fn drive_id_forms() {
        assert_eq!(parse_drive_id("1AbC-d_E").unwrap(), "1AbC-d_E");
        assert_eq!(
            parse_drive_id("https://drive.google.com/file/d/1AbC-d_E/view?usp=sharing").unwrap(),
            "1AbC-d_E"
        );
        assert_eq!(
            parse_drive_id("https://drive.google.com/uc?id=1AbC-d_E").unwrap(),
            "1AbC-d_E"
        );
    }

    #[test]
    fn drive_id_rejects_path_like_input() {
        assert!(parse_drive_id("../../etc/passwd").is_err());
        assert!(parse_drive_id("https://drive.google.com/uc?id=../x").is_err());
    }
}
