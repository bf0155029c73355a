//! Wire DTOs for the Google Places API.
//!
//! Decoding targets only the fields the domain consumes; everything else in
//! the reply is ignored.

use serde::Deserialize;

use crate::domain::ports::{PlaceDetails, PlaceSuggestion};

/// Status values signalling an empty (not failed) reply.
pub(super) const EMPTY_STATUSES: [&str; 2] = ["ZERO_RESULTS", "NOT_FOUND"];

#[derive(Debug, Deserialize)]
pub(super) struct PlaceDetailsReplyDto {
    pub status: String,
    #[serde(default)]
    pub result: Option<PlaceResultDto>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct PlaceResultDto {
    pub formatted_address: String,
    pub geometry: GeometryDto,
}

#[derive(Debug, Deserialize)]
pub(super) struct GeometryDto {
    pub location: LocationDto,
}

#[derive(Debug, Deserialize)]
pub(super) struct LocationDto {
    pub lat: f64,
    pub lng: f64,
}

impl From<PlaceResultDto> for PlaceDetails {
    fn from(dto: PlaceResultDto) -> Self {
        Self {
            formatted_address: dto.formatted_address,
            latitude: dto.geometry.location.lat,
            longitude: dto.geometry.location.lng,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct AutocompleteReplyDto {
    pub status: String,
    #[serde(default)]
    pub predictions: Vec<PredictionDto>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct PredictionDto {
    pub description: String,
    pub place_id: String,
}

impl From<PredictionDto> for PlaceSuggestion {
    fn from(dto: PredictionDto) -> Self {
        Self {
            description: dto.description,
            place_id: dto.place_id,
        }
    }
}
