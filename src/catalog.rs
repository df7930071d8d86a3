//! Reference and clock fetches that seed the store outside the stream.

use crate::config::BoardConfig;
use crate::error::{BoardError, Result};
use crate::state::BoardStore;
use crate::types::Resource;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, error};

#[derive(Debug, Deserialize)]
struct StopsResponse {
    stops: StopsDocument,
}

#[derive(Debug, Deserialize)]
struct StopsDocument {
    data: Vec<Resource>,
}

#[derive(Debug, Deserialize)]
struct TimeResponse {
    time: String,
}

/// Client for `GET /get_stops` and `GET /get_time`. No retries.
#[derive(Clone, Debug)]
pub struct CatalogClient {
    stops_url: String,
    time_url: String,
    client: reqwest::blocking::Client,
}

impl CatalogClient {
    /// Create a client with the configured request timeout.
    pub fn new(config: &BoardConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Self::with_client(config, client)
    }

    /// Use a preconfigured HTTP client. The config's timeout is not applied.
    pub fn with_client(config: &BoardConfig, client: reqwest::blocking::Client) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            stops_url: config.stops_url(),
            time_url: config.time_url(),
            client,
        })
    }

    /// Fetch the full stop catalog.
    pub fn fetch_stops(&self) -> Result<Vec<Resource>> {
        let response: StopsResponse = self.get_json(&self.stops_url).map_err(|e| {
            error!(url = %self.stops_url, error = %e, "Failed to fetch stops");
            e
        })?;
        debug!(count = response.stops.data.len(), "Fetched stop catalog");
        Ok(response.stops.data)
    }

    /// Fetch the server clock.
    pub fn fetch_time(&self) -> Result<DateTime<Utc>> {
        let fetched = self
            .get_json::<TimeResponse>(&self.time_url)
            .and_then(|response| parse_server_time(&response.time));
        fetched.map_err(|e| {
            error!(url = %self.time_url, error = %e, "Failed to fetch time");
            e
        })
    }

    /// Fetch the catalog and store it as `all_stops`.
    pub fn seed_stops(&self, store: &mut BoardStore) -> Result<usize> {
        let stops = self.fetch_stops()?;
        let count = stops.len();
        store.set_all_stops(stops);
        Ok(count)
    }

    /// Fetch the server clock and store it.
    pub fn seed_time(&self, store: &mut BoardStore) -> Result<DateTime<Utc>> {
        let time = self.fetch_time()?;
        store.set_time(time);
        Ok(time)
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(BoardError::HttpStatus(status.as_u16()));
        }
        let body = response.text()?;
        serde_json::from_str(&body).map_err(BoardError::from)
    }
}

/// Parse an ISO-8601 timestamp with offset into UTC.
pub fn parse_server_time(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}
