//! HTTP transport for the spreadsheet values API.

use std::time::Duration;

use reqwest::{Method, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::util::{compact_text, is_http_url};
use crate::{Error, Result};

/// Default API origin
pub const DEFAULT_API_BASE_URL: &str = "https://sheets.googleapis.com";

/// One contiguous block of cell values to write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRange {
    pub range: String,
    pub values: Vec<Vec<String>>,
}

impl ValueRange {
    /// A single-cell write.
    pub fn cell(range: String, value: impl Into<String>) -> Self {
        Self {
            range,
            values: vec![vec![value.into()]],
        }
    }
}

/// Spreadsheet properties returned by a connection check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpreadsheetMetadata {
    pub spreadsheet_id: String,
    pub title: String,
    pub locale: Option<String>,
    pub time_zone: Option<String>,
    pub sheets: Vec<SheetProperties>,
}

/// One tab of a spreadsheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetProperties {
    pub sheet_id: i64,
    pub title: String,
    pub index: i64,
    pub row_count: i64,
    pub column_count: i64,
}

/// Remote operations the sheet client needs.
///
/// Implementations map every failure to a typed [`Error`]: connectivity loss
/// to `Offline`, timeouts to `Timeout`, 401/403 to `Auth`, any other
/// non-success response to `Transport`.
#[allow(async_fn_in_trait)]
pub trait SheetsTransport {
    async fn get_spreadsheet(&self, spreadsheet_id: &str) -> Result<SpreadsheetMetadata>;

    /// Rows of the range; trailing empty cells may be omitted per row.
    async fn get_values(&self, spreadsheet_id: &str, range: &str) -> Result<Vec<Vec<String>>>;

    /// Write several ranges in one request with RAW value semantics.
    async fn batch_update_values(&self, spreadsheet_id: &str, data: &[ValueRange]) -> Result<()>;

    /// Overwrite one range with RAW value semantics.
    async fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> Result<()>;
}

/// `reqwest` implementation of [`SheetsTransport`]
#[derive(Clone)]
pub struct HttpSheetsTransport {
    base_url: String,
    api_key: String,
    access_token: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpSheetsTransport {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HttpSheetsTransport")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish_non_exhaustive()
    }
}

impl HttpSheetsTransport {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = normalize_base_url(&base_url.into())?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| Error::InvalidInput(format!("failed to build HTTP client: {error}")))?;
        Ok(Self {
            base_url,
            api_key: api_key.into(),
            access_token: None,
            client,
        })
    }

    /// Attach a bearer token to every subsequent request.
    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = Some(token.into());
    }

    pub fn clear_access_token(&mut self) {
        self.access_token = None;
    }

    pub fn has_access_token(&self) -> bool {
        self.access_token.is_some()
    }

    fn url(&self, path: &str) -> String {
        build_url(&self.base_url, path, &self.api_key)
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        tracing::debug!("{} {}", method, path);
        let request = self
            .client
            .request(method, self.url(path))
            .header(reqwest::header::ACCEPT, "application/json");
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

impl SheetsTransport for HttpSheetsTransport {
    async fn get_spreadsheet(&self, spreadsheet_id: &str) -> Result<SpreadsheetMetadata> {
        let path = format!("/v4/spreadsheets/{}", urlencoding::encode(spreadsheet_id));
        let response = check_status(self.request(Method::GET, &path).send().await?).await?;
        let payload = response.json::<SpreadsheetResponse>().await?;
        Ok(payload.into())
    }

    async fn get_values(&self, spreadsheet_id: &str, range: &str) -> Result<Vec<Vec<String>>> {
        let path = values_path(spreadsheet_id, range);
        let response = check_status(self.request(Method::GET, &path).send().await?).await?;
        let payload = response.json::<ValuesResponse>().await?;
        Ok(payload
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }

    async fn batch_update_values(&self, spreadsheet_id: &str, data: &[ValueRange]) -> Result<()> {
        let path = format!(
            "/v4/spreadsheets/{}/values:batchUpdate",
            urlencoding::encode(spreadsheet_id)
        );
        let body = BatchUpdateRequest {
            value_input_option: "RAW",
            data,
        };
        check_status(
            self.request(Method::POST, &path)
                .json(&body)
                .send()
                .await?,
        )
        .await?;
        Ok(())
    }

    async fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> Result<()> {
        let path = format!(
            "{}?valueInputOption=RAW",
            values_path(spreadsheet_id, range)
        );
        check_status(
            self.request(Method::PUT, &path)
                .json(&serde_json::json!({ "values": values }))
                .send()
                .await?,
        )
        .await?;
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchUpdateRequest<'a> {
    value_input_option: &'static str,
    data: &'a [ValueRange],
}

#[derive(Debug, Deserialize)]
struct ValuesResponse {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpreadsheetResponse {
    spreadsheet_id: String,
    properties: SpreadsheetProperties,
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpreadsheetProperties {
    title: String,
    locale: Option<String>,
    time_zone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetEntryProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetEntryProperties {
    sheet_id: i64,
    title: String,
    #[serde(default)]
    index: i64,
    #[serde(default)]
    grid_properties: GridProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridProperties {
    #[serde(default)]
    row_count: i64,
    #[serde(default)]
    column_count: i64,
}

impl From<SpreadsheetResponse> for SpreadsheetMetadata {
    fn from(value: SpreadsheetResponse) -> Self {
        Self {
            spreadsheet_id: value.spreadsheet_id,
            title: value.properties.title,
            locale: value.properties.locale,
            time_zone: value.properties.time_zone,
            sheets: value
                .sheets
                .into_iter()
                .map(|sheet| SheetProperties {
                    sheet_id: sheet.properties.sheet_id,
                    title: sheet.properties.title,
                    index: sheet.properties.index,
                    row_count: sheet.properties.grid_properties.row_count,
                    column_count: sheet.properties.grid_properties.column_count,
                })
                .collect(),
        }
    }
}

fn values_path(spreadsheet_id: &str, range: &str) -> String {
    format!(
        "/v4/spreadsheets/{}/values/{}",
        urlencoding::encode(spreadsheet_id),
        urlencoding::encode(range)
    )
}

/// Append the API key as a query parameter, respecting an existing query.
fn build_url(base_url: &str, path: &str, api_key: &str) -> String {
    let separator = if path.contains('?') { '&' } else { '?' };
    format!(
        "{base_url}{path}{separator}key={}",
        urlencoding::encode(api_key)
    )
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, &body))
}

fn status_error(status: StatusCode, body: &str) -> Error {
    let status_text = format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown Status")
    );
    let detail = compact_text(body);
    let message = if detail.is_empty() {
        status_text
    } else {
        format!("{status_text}: {detail}")
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Auth(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => Error::Timeout(message),
        _ => Error::Transport(message),
    }
}

fn cell_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn normalize_base_url(raw: &str) -> Result<String> {
    let base = raw.trim().trim_end_matches('/').to_string();
    if base.is_empty() {
        return Err(Error::InvalidInput("API base URL must not be empty".into()));
    }
    if !is_http_url(&base) {
        return Err(Error::InvalidInput(
            "API base URL must include http:// or https://".into(),
        ));
    }
    Ok(base)
}
