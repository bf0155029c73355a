//! Reqwest-backed Google Places adapter.
//!
//! Owns transport details only: URL assembly, the bounded request timeout,
//! HTTP and API status mapping, and JSON decoding into the port's shapes.
//! The API key never appears in errors or logs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};

use crate::domain::ports::{GeocodingError, GeocodingSource, PlaceDetails, PlaceSuggestion};

use super::dto::{AutocompleteReplyDto, PlaceDetailsReplyDto, EMPTY_STATUSES};

/// Bounded timeout for every maps API call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const DETAILS_URL: &str = "https://maps.googleapis.com/maps/api/place/details/json";
const AUTOCOMPLETE_URL: &str = "https://maps.googleapis.com/maps/api/place/autocomplete/json";

/// Google Places adapter holding a shared HTTP client and the API key.
pub struct GoogleMapsSource {
    client: Client,
    api_key: String,
}

impl GoogleMapsSource {
    /// Build the adapter with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(api_key: impl Into<String>) -> Result<Self, reqwest::Error> {
        Self::with_timeout(api_key, DEFAULT_TIMEOUT)
    }

    /// Build the adapter with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn with_timeout(
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
        })
    }

    async fn fetch_json<T: serde::de::DeserializeOwned>(
        &self,
        base: &str,
        params: &[(&str, &str)],
    ) -> Result<T, GeocodingError> {
        let mut url = Url::parse(base)
            .map_err(|err| GeocodingError::remote(format!("maps API url invalid: {err}")))?;
        url.query_pairs_mut()
            .extend_pairs(params)
            .append_pair("key", &self.api_key);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_transport_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(map_status_error(status));
        }
        response
            .json::<T>()
            .await
            .map_err(|err| GeocodingError::decode(scrub(&err.to_string())))
    }
}

/// Strip URL detail (which would embed the key) from reqwest messages.
fn scrub(message: &str) -> String {
    message
        .split(" for url ")
        .next()
        .unwrap_or(message)
        .to_owned()
}

fn map_transport_error(error: reqwest::Error) -> GeocodingError {
    if error.is_timeout() {
        GeocodingError::timeout(scrub(&error.to_string()))
    } else {
        GeocodingError::remote(scrub(&error.to_string()))
    }
}

fn map_status_error(status: StatusCode) -> GeocodingError {
    GeocodingError::remote(format!("maps API returned HTTP {status}"))
}

fn map_api_status(status: &str, error_message: Option<String>) -> GeocodingError {
    let detail = error_message.unwrap_or_default();
    if detail.is_empty() {
        GeocodingError::remote(format!("maps API status {status}"))
    } else {
        GeocodingError::remote(format!("maps API status {status}: {detail}"))
    }
}

#[async_trait]
impl GeocodingSource for GoogleMapsSource {
    async fn place_details(
        &self,
        place_id: &str,
    ) -> Result<Option<PlaceDetails>, GeocodingError> {
        let reply: PlaceDetailsReplyDto = self
            .fetch_json(
                DETAILS_URL,
                &[
                    ("place_id", place_id),
                    ("fields", "formatted_address,geometry"),
                ],
            )
            .await?;

        if EMPTY_STATUSES.contains(&reply.status.as_str()) {
            return Ok(None);
        }
        if reply.status != "OK" {
            return Err(map_api_status(&reply.status, reply.error_message));
        }
        let result = reply.result.ok_or_else(|| {
            GeocodingError::decode("status OK but reply carried no result")
        })?;
        Ok(Some(result.into()))
    }

    async fn autocomplete(&self, input: &str) -> Result<Vec<PlaceSuggestion>, GeocodingError> {
        let reply: AutocompleteReplyDto = self
            .fetch_json(AUTOCOMPLETE_URL, &[("input", input)])
            .await?;

        if EMPTY_STATUSES.contains(&reply.status.as_str()) {
            return Ok(Vec::new());
        }
        if reply.status != "OK" {
            return Err(map_api_status(&reply.status, reply.error_message));
        }
        Ok(reply.predictions.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn http_failure_statuses_map_to_remote() {
        let err = map_status_error(StatusCode::INTERNAL_SERVER_ERROR);
        assert!(matches!(err, GeocodingError::Remote { .. }));
        assert!(err.to_string().contains("500"));
    }

    #[rstest]
    fn api_status_errors_carry_the_upstream_detail() {
        let err = map_api_status("REQUEST_DENIED", Some("expired credentials".to_owned()));
        assert!(err.to_string().contains("REQUEST_DENIED"));
        assert!(err.to_string().contains("expired credentials"));
    }

    #[rstest]
    fn scrub_drops_url_detail() {
        let scrubbed = scrub("error decoding response body for url https://x?key=secret");
        assert!(!scrubbed.contains("secret"));
        assert!(scrubbed.contains("error decoding response body"));
    }

    #[rstest]
    fn adapter_builds_with_defaults() {
        assert!(GoogleMapsSource::new("test-key").is_ok());
    }
}
