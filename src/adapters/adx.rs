//! Azure Data Explorer telemetry store adapter.
//!
//! Implements [`TelemetryStore`] / [`QueryClient`] over the REST API with
//! a blocking `reqwest` client:
//!
//! 1. `open` acquires an OAuth2 token with the client-credentials grant at
//!    `<login_authority>/<tenant>/oauth2/token`.  A client exists only once
//!    a token does.
//! 2. `execute` posts `{"db": .., "csl": ..}` to `<instance>/v2/rest/query`
//!    with the bearer token and returns the `PrimaryResult` table rows.
//!
//! The v2 response is a JSON array of frames; only `DataTable` frames of
//! kind `PrimaryResult` carry rows.

use core::time::Duration;

use log::{debug, warn};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::app::ports::{QueryClient, QueryError, TelemetryStore};
use crate::config::{IdentityConfig, StoreConfig};
use crate::telemetry::row::{RawCell, RawRow};

/// Factory for authenticated ADX sessions.
#[derive(Debug, Default)]
pub struct AdxTelemetryStore;

impl AdxTelemetryStore {
    pub fn new() -> Self {
        Self
    }
}

/// One authenticated ADX session.  Dropping it releases the connection
/// pool and forgets the token.
pub struct AdxQueryClient {
    http: Client,
    query_url: String,
    database: String,
    token: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl TelemetryStore for AdxTelemetryStore {
    type Client = AdxQueryClient;

    fn open(
        &mut self,
        identity: &IdentityConfig,
        store: &StoreConfig,
        timeout: Duration,
    ) -> Result<AdxQueryClient, QueryError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QueryError::Unreachable(format!("http client: {}", e)))?;

        let token_url = format!(
            "{}/{}/oauth2/token",
            store.login_authority.trim_end_matches('/'),
            identity.tenant_id
        );
        debug!("ADX: requesting token from {}", token_url);

        let response = http
            .post(&token_url)
            .header("Accept", "application/json")
            .form(&[
                ("grant_type", "client_credentials"),
                ("resource", store.instance_url.as_str()),
                ("client_id", identity.application_id.as_str()),
                ("client_secret", identity.application_key.as_str()),
            ])
            .send()
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().map_err(transport_error)?;
        if !status.is_success() {
            return Err(QueryError::Auth(format!("token endpoint returned {}: {}", status.as_u16(), body)));
        }
        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| QueryError::Auth(format!("token response: {}", e)))?;

        Ok(AdxQueryClient {
            http,
            query_url: format!("{}/v2/rest/query", store.instance_url.trim_end_matches('/')),
            database: store.database.clone(),
            token: token.access_token,
        })
    }
}

impl QueryClient for AdxQueryClient {
    fn execute(&mut self, query: &str, timeout: Duration) -> Result<Vec<RawRow>, QueryError> {
        let response = self
            .http
            .post(&self.query_url)
            .bearer_auth(&self.token)
            .timeout(timeout)
            .json(&json!({ "db": self.database, "csl": query }))
            .send()
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().map_err(transport_error)?;
        match status {
            s if s.is_success() => parse_v2_response(&body),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(QueryError::Auth(format!("query rejected with {}", status.as_u16())))
            }
            _ => Err(QueryError::Rejected {
                status: status.as_u16(),
                body,
            }),
        }
    }
}

fn transport_error(e: reqwest::Error) -> QueryError {
    if e.is_timeout() {
        QueryError::Timeout
    } else {
        QueryError::Unreachable(e.to_string())
    }
}

// ───────────────────────────────────────────────────────────────
// v2 frame parsing
// ───────────────────────────────────────────────────────────────

/// Extract the primary result rows from a v2 query response body.
pub fn parse_v2_response(body: &str) -> Result<Vec<RawRow>, QueryError> {
    let frames: Vec<Value> =
        serde_json::from_str(body).map_err(|e| QueryError::Malformed(e.to_string()))?;

    let mut rows = Vec::new();
    for frame in &frames {
        if frame.get("FrameType").and_then(Value::as_str) == Some("DataSetCompletion")
            && frame.get("HasErrors").and_then(Value::as_bool) == Some(true)
        {
            warn!("ADX: query completed with errors");
        }
        if frame.get("FrameType").and_then(Value::as_str) != Some("DataTable")
            || frame.get("TableKind").and_then(Value::as_str) != Some("PrimaryResult")
        {
            continue;
        }
        rows.extend(parse_table(frame)?);
    }
    Ok(rows)
}

fn parse_table(frame: &Value) -> Result<Vec<RawRow>, QueryError> {
    let columns: Vec<&str> = frame
        .get("Columns")
        .and_then(Value::as_array)
        .ok_or_else(|| QueryError::Malformed("PrimaryResult without Columns".into()))?
        .iter()
        .map(|c| c.get("ColumnName").and_then(Value::as_str).unwrap_or(""))
        .collect();

    let raw_rows = frame
        .get("Rows")
        .and_then(Value::as_array)
        .ok_or_else(|| QueryError::Malformed("PrimaryResult without Rows".into()))?;

    let mut rows = Vec::with_capacity(raw_rows.len());
    for raw in raw_rows {
        // Inline errors arrive as objects in place of a row.
        let Some(cells) = raw.as_array() else {
            warn!("ADX: skipping non-row entry in PrimaryResult");
            continue;
        };
        let mut row = RawRow::new();
        for (i, name) in columns.iter().enumerate() {
            let cell = match cells.get(i) {
                Some(Value::Null) => RawCell::Null,
                Some(v) => RawCell::Value(v.clone()),
                None => RawCell::Unreadable(format!("row has {} cells", cells.len())),
            };
            row = row.with(*name, cell);
        }
        rows.push(row);
    }
    Ok(rows)
}
