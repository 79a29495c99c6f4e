use super::auth::ServiceAccountKey;
use crate::config::SheetsSettings;
use crate::error::{Error, Result};
use crate::http::{Body, Request, Response, Transport};
use crate::retry::RetryPolicy;
use log::{debug, error};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use url::Url;

/// How the spreadsheet interprets written values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueInputOption {
    /// Stored as given.
    Raw,
    /// Parsed as if typed into the UI, so formulas are evaluated.
    UserEntered,
}

impl fmt::Display for ValueInputOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueInputOption::Raw => write!(f, "RAW"),
            ValueInputOption::UserEntered => write!(f, "USER_ENTERED"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dimension {
    Columns,
    Rows,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Columns => write!(f, "COLUMNS"),
            Dimension::Rows => write!(f, "ROWS"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct Spreadsheet {
    #[serde(default)]
    sheets: Vec<Sheet>,
}

#[derive(Debug, Deserialize)]
struct Sheet {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

pub struct SheetsClient {
    api_url: String,
    spreadsheet_id: String,
    access_token: String,
    transport: Box<dyn Transport>,
    retry: RetryPolicy,
}

impl SheetsClient {
    /// Authenticates with the service account key of `settings`.
    pub fn new(settings: &SheetsSettings, transport: Box<dyn Transport>) -> Result<Self> {
        let retry = RetryPolicy::google();
        let key = ServiceAccountKey::from_json(&settings.google_key_file)?;
        let access_token = key.access_token(transport.as_ref(), &retry)?;
        Ok(SheetsClient::with_token(settings, access_token, transport).with_retry(retry))
    }

    pub fn with_token(settings: &SheetsSettings, access_token: String, transport: Box<dyn Transport>) -> Self {
        SheetsClient {
            api_url: settings.api_url.trim_end_matches('/').to_owned(),
            spreadsheet_id: settings.spreadsheet_id.clone(),
            access_token,
            transport,
            retry: RetryPolicy::google(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// `https://sheets.googleapis.com/v4/spreadsheets/<id>` followed by `segments`,
    /// each percent-encoded as one path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let invalid = || Error::Configuration(format!("invalid spreadsheet API URL {}", self.api_url));
        let mut url = Url::parse(&self.api_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(&["v4", "spreadsheets"])
            .extend(segments);
        Ok(url)
    }

    fn execute(&self, request: Request) -> Result<Response> {
        let request = request.header("Authorization", format!("Bearer {}", self.access_token));
        debug!("Spreadsheet API request: {:?} {}", request.method, request.url);
        self.retry
            .run(|| self.transport.send(&request)?.error_for_status(&request.url))
            .map_err(|err| {
                if err.status() == Some(401) {
                    error!("HTTP Error 401 may be caused by providing an incorrect Google key file.");
                }
                err
            })
    }

    /// Numeric id of the sheet titled `sheet_name`.
    pub fn sheet_id(&self, sheet_name: &str) -> Result<i64> {
        let spreadsheet: Spreadsheet = self
            .execute(Request::get(self.endpoint(&[self.spreadsheet_id.as_str()])?))?
            .json("spreadsheet metadata")?;
        spreadsheet
            .sheets
            .into_iter()
            .find(|sheet| sheet.properties.title == sheet_name)
            .map(|sheet| sheet.properties.sheet_id)
            .ok_or_else(|| {
                Error::Configuration(format!(
                    "Spreadsheet ID: {} does not contain the sheet name: {} provided via the sheet-name input.",
                    self.spreadsheet_id, sheet_name
                ))
            })
    }

    /// Cell texts of `range`, row by row. Trailing empty cells and rows are not returned.
    pub fn values_get(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let url = self.endpoint(&[self.spreadsheet_id.as_str(), "values", range])?;
        let value_range: ValueRange = self.execute(Request::get(url))?.json(range)?;
        Ok(value_range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    pub fn values_update(&self, range: &str, values: Value, input: ValueInputOption) -> Result<()> {
        let mut url = self.endpoint(&[self.spreadsheet_id.as_str(), "values", range])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", &input.to_string());
        let response = self.execute(Request::put(url, Body::Json(json!({ "values": values }))))?;
        debug!("{}", String::from_utf8_lossy(&response.body));
        Ok(())
    }

    /// Grows the sheet by one column or row, new sheets only have room for a few.
    pub fn append_dimension(&self, sheet_id: i64, dimension: Dimension) -> Result<()> {
        let batch_update = format!("{}:batchUpdate", self.spreadsheet_id);
        let url = self.endpoint(&[batch_update.as_str()])?;
        let body = json!({
            "requests": [{
                "appendDimension": {
                    "sheetId": sheet_id,
                    "dimension": dimension.to_string(),
                    "length": 1
                }
            }]
        });
        self.execute(Request::post(url, Body::Json(body)))?;
        Ok(())
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::http::Method;
    use crate::testing::*;
    use pretty_assertions::assert_eq;
    use std::{path::PathBuf, time::Duration};

    pub fn settings() -> SheetsSettings {
        SheetsSettings {
            sketches_report_path: PathBuf::from("reports"),
            google_key_file: include_str!("testdata/service-account.json").to_owned(),
            spreadsheet_id: "1a2b3c".to_owned(),
            sheet_name: "Sheet1".to_owned(),
            api_url: "https://sheets.googleapis.com".to_owned(),
            workspace: None,
        }
    }

    pub fn sheets_client(transport: &FakeTransport) -> SheetsClient {
        SheetsClient::with_token(&settings(), "ya29.token".to_owned(), Box::new(transport.clone()))
            .with_retry(RetryPolicy::google().with_delay(Duration::from_millis(0)))
    }

    #[test]
    fn reads_values_with_bearer_token() {
        let transport = FakeTransport::new();
        transport.get(
            "/v4/spreadsheets/1a2b3c/values/Sheet1!1:1",
            ok_json(json!({"range": "Sheet1!A1:Z1", "values": [["Commit Timestamp", "Commit Hash", 42]]})),
        );
        let values = sheets_client(&transport).values_get("Sheet1!1:1").unwrap();
        assert_eq!(values, vec![vec!["Commit Timestamp", "Commit Hash", "42"]]);
        assert_eq!(
            transport.requests()[0].headers,
            vec![("Authorization", "Bearer ya29.token".to_owned())]
        );
    }

    #[test]
    fn empty_range_has_no_values() {
        let transport = FakeTransport::new();
        transport.get(
            "/v4/spreadsheets/1a2b3c/values/Sheet1!1:1",
            ok_json(json!({"range": "Sheet1!A1:Z1", "majorDimension": "ROWS"})),
        );
        assert!(sheets_client(&transport)
            .values_get("Sheet1!1:1")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn sheet_names_are_encoded_in_ranges() {
        let transport = FakeTransport::new();
        transport.on(
            Method::Put,
            "/v4/spreadsheets/1a2b3c/values/'Size%20trends'!A1:B1?valueInputOption=RAW",
            ok_json(json!({})),
        );
        sheets_client(&transport)
            .values_update("'Size trends'!A1:B1", json!([["a", "b"]]), ValueInputOption::Raw)
            .unwrap();
        assert_eq!(
            transport.requests()[0].body,
            Some(Body::Json(json!({"values": [["a", "b"]]})))
        );
    }

    #[test]
    fn appends_one_column() {
        let transport = FakeTransport::new();
        transport.on(Method::Post, "/v4/spreadsheets/1a2b3c:batchUpdate", ok_json(json!({})));
        sheets_client(&transport)
            .append_dimension(7, Dimension::Columns)
            .unwrap();
        assert_eq!(
            transport.requests()[0].body,
            Some(Body::Json(json!({"requests": [{"appendDimension": {
                "sheetId": 7, "dimension": "COLUMNS", "length": 1
            }}]})))
        );
    }

    #[test]
    fn finds_the_sheet_id_by_title() {
        let transport = FakeTransport::new();
        transport.get(
            "/v4/spreadsheets/1a2b3c",
            ok_json(json!({"sheets": [
                {"properties": {"sheetId": 0, "title": "Other"}},
                {"properties": {"sheetId": 1234, "title": "Sheet1"}}
            ]})),
        );
        let client = sheets_client(&transport);
        assert_eq!(client.sheet_id("Sheet1").unwrap(), 1234);
        assert!(matches!(
            client.sheet_id("Missing"),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn quota_errors_are_retried() {
        let transport = FakeTransport::new();
        let target = "/v4/spreadsheets/1a2b3c/values/Sheet1!B:B";
        transport
            .get(target, status(429))
            .get(target, ok_json(json!({"values": [["Commit Hash"]]})));
        let values = sheets_client(&transport).values_get("Sheet1!B:B").unwrap();
        assert_eq!(values, vec![vec!["Commit Hash"]]);
        assert_eq!(transport.requests().len(), 2);
    }

    #[test]
    fn unauthorized_is_not_retried() {
        let transport = FakeTransport::new();
        transport.get("/v4/spreadsheets/1a2b3c/values/Sheet1!1:1", status(401));
        let err = sheets_client(&transport)
            .values_get("Sheet1!1:1")
            .unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert_eq!(transport.requests().len(), 1);
    }

    #[test]
    fn authenticates_before_the_first_request() {
        let transport = FakeTransport::new();
        transport.on(
            Method::Post,
            "/token",
            ok_json(json!({"access_token": "ya29.fresh", "expires_in": 3599})),
        );
        transport.get("/v4/spreadsheets/1a2b3c", ok_json(json!({"sheets": [
            {"properties": {"sheetId": 9, "title": "Sheet1"}}
        ]})));
        let client = SheetsClient::new(&settings(), Box::new(transport.clone())).unwrap();
        assert_eq!(client.sheet_id("Sheet1").unwrap(), 9);
        assert_eq!(
            transport.requests()[1].headers,
            vec![("Authorization", "Bearer ya29.fresh".to_owned())]
        );
    }
}
