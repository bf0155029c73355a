//! Geocoding proxy endpoints.
//!
//! Thin pass-through over the maps port: validate the query, call the
//! upstream, reshape the reply. Upstream failures surface as 502 so callers
//! can tell a maps outage apart from a local fault.

use actix_web::{get, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::{GeocodingError, PlaceDetails, PlaceSuggestion};
use crate::domain::Error;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::ApiResult;

/// Minimum autocomplete fragment length forwarded upstream.
const AUTOCOMPLETE_MIN_CHARS: usize = 2;

fn map_geocoding_error(error: GeocodingError) -> Error {
    Error::bad_gateway(format!("maps API unavailable: {error}"))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PlaceQuery {
    /// Stable place identifier from a prior autocomplete call.
    pub place_id: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AutocompleteQuery {
    /// Address fragment to complete; at least two characters.
    pub input: String,
}

/// Resolved address and coordinates for one place.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaceResponse {
    pub formatted_address: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl From<PlaceDetails> for PlaceResponse {
    fn from(value: PlaceDetails) -> Self {
        Self {
            formatted_address: value.formatted_address,
            latitude: value.latitude,
            longitude: value.longitude,
        }
    }
}

/// One autocomplete suggestion, upstream order preserved.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionResponse {
    pub description: String,
    pub place_id: String,
}

impl From<PlaceSuggestion> for SuggestionResponse {
    fn from(value: PlaceSuggestion) -> Self {
        Self {
            description: value.description,
            place_id: value.place_id,
        }
    }
}

/// Resolve a place id to a formatted address and coordinates.
#[utoipa::path(
    get,
    path = "/location/place",
    params(PlaceQuery),
    responses(
        (status = 200, description = "Resolved place", body = PlaceResponse),
        (status = 400, description = "Missing or blank place id", body = Error),
        (status = 404, description = "Upstream reported no such place", body = Error),
        (status = 502, description = "Maps API unavailable", body = Error)
    ),
    tags = ["location"],
    operation_id = "getPlace"
)]
#[get("/location/place")]
pub async fn get_place(
    state: web::Data<HttpState>,
    query: web::Query<PlaceQuery>,
) -> ApiResult<web::Json<PlaceResponse>> {
    let place_id = query.place_id.trim();
    if place_id.is_empty() {
        return Err(Error::invalid_request("place_id must not be empty"));
    }
    let details = state
        .geocoding
        .place_details(place_id)
        .await
        .map_err(map_geocoding_error)?
        .ok_or_else(|| Error::not_found(format!("no place found for id {place_id}")))?;
    Ok(web::Json(details.into()))
}

/// Autocomplete an address fragment.
#[utoipa::path(
    get,
    path = "/location/autocomplete",
    params(AutocompleteQuery),
    responses(
        (status = 200, description = "Suggestions, possibly empty", body = [SuggestionResponse]),
        (status = 400, description = "Fragment shorter than two characters", body = Error),
        (status = 502, description = "Maps API unavailable", body = Error)
    ),
    tags = ["location"],
    operation_id = "autocompleteAddress"
)]
#[get("/location/autocomplete")]
pub async fn autocomplete(
    state: web::Data<HttpState>,
    query: web::Query<AutocompleteQuery>,
) -> ApiResult<web::Json<Vec<SuggestionResponse>>> {
    let input = query.input.trim();
    if input.chars().count() < AUTOCOMPLETE_MIN_CHARS {
        return Err(Error::invalid_request(
            "input must be at least two characters",
        ));
    }
    let suggestions = state
        .geocoding
        .autocomplete(input)
        .await
        .map_err(map_geocoding_error)?;
    Ok(web::Json(suggestions.into_iter().map(Into::into).collect()))
}
