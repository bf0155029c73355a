//! HTTP adapter for the Google Places API.

pub mod http_source;

mod dto;

pub use http_source::{GoogleMapsSource, DEFAULT_TIMEOUT};
