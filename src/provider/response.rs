//! Provider response parsing
//!
//! Pure body-to-candidates functions, one per provider wire shape.
//! Each parser returns coordinates best-first; ranking policy lives
//! here and nowhere else (the resolver always takes the head of the
//! list). The deserialization structs mirror each provider's JSON
//! shape; anything that does not fit is a [`ParseError`].

use serde::Deserialize;
use std::cmp::Ordering;

use crate::error::ParseError;
use crate::models::Coordinate;

/// Maps a raw provider response body into ranked coordinates.
pub trait ResponseParser: Send + Sync {
    fn parse(&self, body: &str) -> Result<Vec<Coordinate>, ParseError>;
}

/// PTV `locations/by-text` response: candidates carry a quality
/// score; best score first.
pub struct PtvResponseParser;

#[derive(Deserialize)]
struct PtvResponse {
    locations: Vec<PtvLocation>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PtvLocation {
    reference_position: PtvPosition,
    quality: PtvQuality,
}

#[derive(Deserialize)]
struct PtvPosition {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PtvQuality {
    total_score: f64,
}

impl ResponseParser for PtvResponseParser {
    fn parse(&self, body: &str) -> Result<Vec<Coordinate>, ParseError> {
        let mut response: PtvResponse = serde_json::from_str(body)?;
        response.locations.sort_by(|a, b| {
            b.quality
                .total_score
                .partial_cmp(&a.quality.total_score)
                .unwrap_or(Ordering::Equal)
        });
        Ok(response
            .locations
            .into_iter()
            .map(|location| {
                Coordinate::new(
                    location.reference_position.latitude,
                    location.reference_position.longitude,
                )
            })
            .collect())
    }
}

/// Google Geocoding API response: results come pre-ranked.
pub struct GoogleResponseParser;

#[derive(Deserialize)]
struct GoogleResponse {
    results: Vec<GoogleResult>,
}

#[derive(Deserialize)]
struct GoogleResult {
    geometry: GoogleGeometry,
}

#[derive(Deserialize)]
struct GoogleGeometry {
    location: GoogleLocation,
}

#[derive(Deserialize)]
struct GoogleLocation {
    lat: f64,
    lng: f64,
}

impl ResponseParser for GoogleResponseParser {
    fn parse(&self, body: &str) -> Result<Vec<Coordinate>, ParseError> {
        let response: GoogleResponse = serde_json::from_str(body)?;
        Ok(response
            .results
            .into_iter()
            .map(|result| Coordinate::new(result.geometry.location.lat, result.geometry.location.lng))
            .collect())
    }
}

/// Bing Locations response: resources flattened across resource
/// sets, in response order.
pub struct BingResponseParser;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BingResponse {
    resource_sets: Vec<BingResourceSet>,
}

#[derive(Deserialize)]
struct BingResourceSet {
    resources: Vec<BingResource>,
}

#[derive(Deserialize)]
struct BingResource {
    point: BingPoint,
}

#[derive(Deserialize)]
struct BingPoint {
    /// `[latitude, longitude]` on the wire.
    coordinates: [f64; 2],
}

impl ResponseParser for BingResponseParser {
    fn parse(&self, body: &str) -> Result<Vec<Coordinate>, ParseError> {
        let response: BingResponse = serde_json::from_str(body)?;
        Ok(response
            .resource_sets
            .into_iter()
            .flat_map(|set| set.resources)
            .map(|resource| {
                Coordinate::new(resource.point.coordinates[0], resource.point.coordinates[1])
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ptv_single_location() {
        let body = r#"{"locations":[{"referencePosition":{"latitude":47.672508239746094,"longitude":-122.12815856933594},"quality":{"totalScore":90}}]}"#;
        let parsed = PtvResponseParser.parse(body).unwrap();
        assert_eq!(
            parsed,
            vec![Coordinate::new(47.672508239746094, -122.12815856933594)]
        );
    }

    #[test]
    fn test_ptv_ranks_by_total_score_descending() {
        let body = r#"{"locations":[
            {"referencePosition":{"latitude":0,"longitude":0},"quality":{"totalScore":1}},
            {"referencePosition":{"latitude":48.672508239746094,"longitude":-121.12815856933594},"quality":{"totalScore":89}}]}"#;
        let parsed = PtvResponseParser.parse(body).unwrap();
        assert_eq!(
            parsed,
            vec![
                Coordinate::new(48.672508239746094, -121.12815856933594),
                Coordinate::new(0.0, 0.0),
            ]
        );
    }

    #[test]
    fn test_ptv_empty_locations() {
        let parsed = PtvResponseParser.parse(r#"{"locations":[]}"#).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_google_results_in_response_order() {
        let body = r#"{"results":[
            {"geometry":{"location":{"lat":25.47,"lng":-80.47}}},
            {"geometry":{"location":{"lat":26.47,"lng":-81.47}}}]}"#;
        let parsed = GoogleResponseParser.parse(body).unwrap();
        assert_eq!(
            parsed,
            vec![
                Coordinate::new(25.47, -80.47),
                Coordinate::new(26.47, -81.47),
            ]
        );
    }

    #[test]
    fn test_bing_flattens_resource_sets() {
        let body = r#"{"resourceSets":[
            {"resources":[{"point":{"coordinates":[25.47,-80.47]}}]},
            {"resources":[{"point":{"coordinates":[26.47,-81.47]}}]}]}"#;
        let parsed = BingResponseParser.parse(body).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0], Coordinate::new(25.47, -80.47));
    }

    #[test]
    fn test_malformed_body_is_a_parse_error() {
        assert!(PtvResponseParser.parse("not json").is_err());
        assert!(GoogleResponseParser.parse(r#"{"wrong":"shape"}"#).is_err());
        assert!(BingResponseParser.parse(r#"{"resourceSets":[{}]}"#).is_err());
    }
}
