//! Remote reservations table, reached over a PostgREST-style HTTP API.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tracing::debug;

use crate::dates::DateRange;
use crate::error::{Result, SyncError};
use crate::models::ReservationRecord;
use crate::settings::Settings;

/// Longest error body kept from a failed call.
pub const MAX_ERROR_BODY: usize = 200;

/// The two remote operations reconciliation needs.
pub trait RecordStore {
    /// Remove every record whose date lies in `range`.
    fn delete_range(&self, range: &DateRange) -> Result<()>;

    /// Insert `batch` as a single request. The store accepts or rejects it as a whole.
    fn insert_batch(&self, batch: &[ReservationRecord]) -> Result<()>;
}

pub struct RestStore {
    client: Client,
    base_url: String,
    table: String,
}

impl RestStore {
    /// Build a client for `settings.store_url` with a per-call timeout.
    pub fn new(settings: &Settings) -> Result<Self> {
        if settings.store_url.trim().is_empty() || settings.service_key.is_empty() {
            return Err(SyncError::Settings(
                "Store URL and service key are not configured. Run `roomsync init` first.".into(),
            ));
        }
        let client = Client::builder()
            .default_headers(auth_headers(&settings.service_key)?)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: settings.store_url.trim_end_matches('/').to_string(),
            table: settings.table.clone(),
        })
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn delete_url(&self, range: &DateRange) -> String {
        format!("{}?date=gte.{}&date=lte.{}", self.table_url(), range.start, range.end)
    }
}

impl RecordStore for RestStore {
    fn delete_range(&self, range: &DateRange) -> Result<()> {
        let url = self.delete_url(range);
        debug!(url = %url, "deleting range");
        let resp = self.client.delete(&url).send()?;
        check_status(resp, &[200, 204])
    }

    fn insert_batch(&self, batch: &[ReservationRecord]) -> Result<()> {
        let url = self.table_url();
        debug!(url = %url, count = batch.len(), "inserting batch");
        let resp = self.client.post(&url).json(batch).send()?;
        check_status(resp, &[200, 201])
    }
}

fn auth_headers(service_key: &str) -> Result<HeaderMap> {
    let invalid = |_| SyncError::Settings("Service key contains characters not allowed in a header".into());
    let mut key = HeaderValue::from_str(service_key).map_err(invalid)?;
    key.set_sensitive(true);
    let mut bearer = HeaderValue::from_str(&format!("Bearer {service_key}")).map_err(invalid)?;
    bearer.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert("apikey", key);
    headers.insert(AUTHORIZATION, bearer);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert("Prefer", HeaderValue::from_static("return=minimal"));
    Ok(headers)
}

fn check_status(resp: Response, accepted: &[u16]) -> Result<()> {
    let status = resp.status().as_u16();
    if accepted.contains(&status) {
        return Ok(());
    }
    let body = resp.text().unwrap_or_default();
    Err(SyncError::Server {
        status,
        body: truncate(&body, MAX_ERROR_BODY),
    })
}

/// Cut `s` to at most `max` characters without splitting a code point.
pub fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
