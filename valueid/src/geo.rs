//! WGS84 points packed into the 60 payload bits (30 bits per coordinate).

use std::fmt;

use crate::error::{Result, ValueError};
use crate::xsd::GEO_WKT_LITERAL;

const COORDINATE_BITS: u32 = 30;
const MAX_COORDINATE: u64 = (1 << COORDINATE_BITS) - 1;

/// A point with latitude in `[-90, 90]` and longitude in `[-180, 180]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    lat: f64,
    lng: f64,
}

impl GeoPoint {
    /// Create a point, rejecting coordinates outside the valid ranges.
    pub fn new(lat: f64, lng: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(ValueError::InvalidGeoPoint(format!(
                "latitude {} outside [-90, 90]",
                lat
            )));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(ValueError::InvalidGeoPoint(format!(
                "longitude {} outside [-180, 180]",
                lng
            )));
        }
        Ok(GeoPoint { lat, lng })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }

    /// Parse a WKT point literal such as `POINT(7.84 47.99)` (longitude first).
    pub fn parse_wkt(wkt: &str) -> Result<Self> {
        let err = || ValueError::InvalidGeoPoint(format!("not a WKT point: {}", wkt));
        let inner = wkt
            .trim()
            .strip_prefix("POINT")
            .map(str::trim_start)
            .and_then(|s| s.strip_prefix('('))
            .and_then(|s| s.strip_suffix(')'))
            .ok_or_else(err)?;
        let mut parts = inner.split_whitespace();
        let lng: f64 = parts.next().and_then(|p| p.parse().ok()).ok_or_else(err)?;
        let lat: f64 = parts.next().and_then(|p| p.parse().ok()).ok_or_else(err)?;
        if parts.next().is_some() {
            return Err(err());
        }
        GeoPoint::new(lat, lng)
    }

    /// Quantize both coordinates into a 60-bit payload (latitude in the high half).
    pub fn to_bits(&self) -> u64 {
        let lat = quantize(self.lat, 90.0);
        let lng = quantize(self.lng, 180.0);
        (lat << COORDINATE_BITS) | lng
    }

    /// Inverse of [`GeoPoint::to_bits`], up to the quantization error.
    pub fn from_bits(bits: u64) -> Self {
        let lat = dequantize((bits >> COORDINATE_BITS) & MAX_COORDINATE, 90.0);
        let lng = dequantize(bits & MAX_COORDINATE, 180.0);
        GeoPoint { lat, lng }
    }

    /// WKT text and the datatype IRI used when exporting the point.
    pub fn to_string_and_type(&self) -> (String, &'static str) {
        (self.to_string(), GEO_WKT_LITERAL)
    }
}

fn quantize(v: f64, bound: f64) -> u64 {
    (((v + bound) / (2.0 * bound)) * MAX_COORDINATE as f64).round() as u64
}

fn dequantize(bits: u64, bound: f64) -> f64 {
    (bits as f64 / MAX_COORDINATE as f64) * 2.0 * bound - bound
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "POINT({:.6} {:.6})", self.lng, self.lat)
    }
}
