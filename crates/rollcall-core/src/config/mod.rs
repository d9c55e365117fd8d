//! Runtime configuration for reaching the participant sheet.
//!
//! Values come from `ROLLCALL_*` variables. Lookup goes through a closure so
//! front-ends can layer the durable config table over the process
//! environment, and tests can run without touching it.

use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;

use chrono::TimeDelta;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::services::DEFAULT_UNDO_TIME_LIMIT_MS;
use crate::sheets::{
    extract_spreadsheet_id, HttpSheetsTransport, SheetsClient, DEFAULT_API_BASE_URL,
    DEFAULT_SHEET_NAME,
};
use crate::util::{is_http_url, normalize_text_option};
use crate::{Error, Result};

pub const ENV_SPREADSHEET_ID: &str = "ROLLCALL_SPREADSHEET_ID";
pub const ENV_SHEET_NAME: &str = "ROLLCALL_SHEET_NAME";
pub const ENV_API_KEY: &str = "ROLLCALL_API_KEY";
pub const ENV_API_BASE_URL: &str = "ROLLCALL_API_BASE_URL";
pub const ENV_UNDO_TIME_LIMIT_MS: &str = "ROLLCALL_UNDO_TIME_LIMIT_MS";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "ROLLCALL_REQUEST_TIMEOUT_SECS";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

static BARE_SPREADSHEET_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("spreadsheet id pattern is valid"));

/// Connection settings for one event's sheet.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub spreadsheet_id: String,
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,
    pub api_key: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_undo_time_limit_ms")]
    pub undo_time_limit_ms: i64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AppConfig")
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("sheet_name", &self.sheet_name)
            .field("api_key", &"[REDACTED]")
            .field("api_base_url", &self.api_base_url)
            .field("undo_time_limit_ms", &self.undo_time_limit_ms)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl AppConfig {
    /// Config with every optional field at its default.
    pub fn new(spreadsheet_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            sheet_name: default_sheet_name(),
            api_key: api_key.into(),
            api_base_url: default_api_base_url(),
            undo_time_limit_ms: default_undo_time_limit_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    /// Read from the process environment.
    pub fn from_env() -> Result<Option<Self>> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read `ROLLCALL_*` values through `lookup`.
    ///
    /// Returns `Ok(None)` when neither the spreadsheet nor the API key is
    /// configured. Supplying only one of them is an error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<Self>> {
        let value = |key: &str| normalize_text_option(lookup(key));

        let (spreadsheet, api_key) = match (value(ENV_SPREADSHEET_ID), value(ENV_API_KEY)) {
            (None, None) => return Ok(None),
            (Some(spreadsheet), Some(api_key)) => (spreadsheet, api_key),
            (None, Some(_)) => return Err(missing(ENV_SPREADSHEET_ID)),
            (Some(_), None) => return Err(missing(ENV_API_KEY)),
        };

        let mut config = Self::new(Self::resolve_spreadsheet_id(&spreadsheet)?, api_key);
        if let Some(sheet_name) = value(ENV_SHEET_NAME) {
            config.sheet_name = sheet_name;
        }
        if let Some(api_base_url) = value(ENV_API_BASE_URL) {
            config.api_base_url = api_base_url;
        }
        if let Some(raw) = value(ENV_UNDO_TIME_LIMIT_MS) {
            config.undo_time_limit_ms = parse_number(ENV_UNDO_TIME_LIMIT_MS, &raw)?;
        }
        if let Some(raw) = value(ENV_REQUEST_TIMEOUT_SECS) {
            config.request_timeout_secs = parse_number(ENV_REQUEST_TIMEOUT_SECS, &raw)?;
        }

        config.validate()?;
        Ok(Some(config))
    }

    /// Accept either a bare spreadsheet id or a full sharing URL.
    pub fn resolve_spreadsheet_id(input: &str) -> Result<String> {
        let input = input.trim();
        if input.contains("/spreadsheets/d/") {
            return extract_spreadsheet_id(input);
        }
        if BARE_SPREADSHEET_ID.is_match(input) {
            Ok(input.to_string())
        } else {
            Err(Error::InvalidInput(format!(
                "not a spreadsheet id or URL: {input}"
            )))
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.sheet_name.trim().is_empty() {
            return Err(Error::InvalidInput("sheet name must not be empty".into()));
        }
        if !is_http_url(&self.api_base_url) {
            return Err(Error::InvalidInput(format!(
                "{ENV_API_BASE_URL} must include http:// or https://"
            )));
        }
        if self.undo_time_limit_ms < 0 {
            return Err(Error::InvalidInput(format!(
                "{ENV_UNDO_TIME_LIMIT_MS} must not be negative"
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::InvalidInput(format!(
                "{ENV_REQUEST_TIMEOUT_SECS} must be at least 1"
            )));
        }
        Ok(())
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn undo_time_limit(&self) -> TimeDelta {
        TimeDelta::milliseconds(self.undo_time_limit_ms)
    }

    /// HTTP client for the configured sheet, without credentials beyond the
    /// API key.
    pub fn sheets_client(&self) -> Result<SheetsClient<HttpSheetsTransport>> {
        let transport =
            HttpSheetsTransport::new(&self.api_base_url, &self.api_key, self.request_timeout())?;
        Ok(SheetsClient::new(
            &self.spreadsheet_id,
            &self.sheet_name,
            transport,
        ))
    }
}

fn missing(key: &str) -> Error {
    Error::InvalidInput(format!("{key} is required when the sheet is configured"))
}

fn parse_number<N: std::str::FromStr>(key: &str, raw: &str) -> Result<N> {
    raw.parse()
        .map_err(|_| Error::InvalidInput(format!("{key} must be a number, got '{raw}'")))
}

fn default_sheet_name() -> String {
    DEFAULT_SHEET_NAME.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

const fn default_undo_time_limit_ms() -> i64 {
    DEFAULT_UNDO_TIME_LIMIT_MS
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}
