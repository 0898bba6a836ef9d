//! # Polyline Codec
//!
//! Google polyline encoding and decoding for run routes.
//!
//! The encoded string is the wire format for a stored route: an opaque ASCII
//! representation every consumer (client and any server-side reader) agrees
//! on at [`PRECISION`] = 5 decimal digits, the same convention Strava and
//! Google Maps use.
//!
//! Encoding rounds each axis to `precision` digits, delta-encodes against the
//! previous point (the first point against 0,0), zigzag-transforms the delta,
//! and emits it five bits at a time, least-significant first, with the
//! continuation bit `0x20` set on all but the last chunk and every chunk
//! offset by ASCII 63.
//!
//! Decoding fails closed: malformed input returns a [`PolylineError`] rather
//! than corrupted coordinates.
//!
//! Reference: [Encoded Polyline Algorithm Format](https://developers.google.com/maps/documentation/utilities/polylinealgorithm)

use crate::Coordinate;
use thiserror::Error;

/// Decimal digits of coordinate precision used for stored routes.
///
/// Both sides of the wire must agree on this value to interoperate.
pub const PRECISION: u32 = 5;

/// Errors from decoding a malformed polyline string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "ffi", derive(uniffi::Error))]
#[cfg_attr(feature = "ffi", uniffi(flat_error))]
pub enum PolylineError {
    /// The string ended in the middle of a varint (a chunk with the
    /// continuation bit set was the last byte).
    #[error("polyline ends mid-value (unterminated 5-bit sequence)")]
    UnterminatedSequence,

    /// A byte outside the valid chunk range (ASCII 63..=126) was found.
    #[error("invalid polyline byte {byte:#04x} at index {index}")]
    InvalidCharacter { byte: u8, index: usize },

    /// A latitude was decoded but the string ended before its longitude.
    #[error("polyline ends after a latitude with no matching longitude")]
    OddTermination,

    /// A single value ran past 64 bits; no real coordinate delta does this.
    #[error("polyline value out of range at index {index}")]
    ValueOverflow { index: usize },
}

// =============================================================================
// Encoding
// =============================================================================

/// Encode a coordinate sequence as a polyline string.
///
/// Deterministic: the same input always yields the same string. An empty
/// sequence encodes to `""`.
///
/// # Example
///
/// ```rust
/// use run_tracker::{polyline, Coordinate};
///
/// let route = vec![
///     Coordinate::new(38.5, -120.2),
///     Coordinate::new(40.7, -120.95),
///     Coordinate::new(43.252, -126.453),
/// ];
/// assert_eq!(polyline::encode(&route, 5), "_p~iF~ps|U_ulLnnqC_mqNvxq`@");
/// ```
pub fn encode(points: &[Coordinate], precision: u32) -> String {
    let factor = 10_f64.powi(precision as i32);

    // Two varints per point, rarely more than 6 bytes each
    let mut out = String::with_capacity(points.len() * 8);
    let mut prev_lat: i64 = 0;
    let mut prev_lng: i64 = 0;

    for p in points {
        let lat = (p.latitude * factor).round() as i64;
        let lng = (p.longitude * factor).round() as i64;
        encode_value(lat - prev_lat, &mut out);
        encode_value(lng - prev_lng, &mut out);
        prev_lat = lat;
        prev_lng = lng;
    }

    out
}

/// [`encode`] at the standard [`PRECISION`] of 5.
#[inline]
pub fn encode_route(points: &[Coordinate]) -> String {
    encode(points, PRECISION)
}

/// Zigzag-transform a delta and emit it as offset 5-bit chunks.
fn encode_value(value: i64, out: &mut String) {
    let mut v = (if value < 0 { !(value << 1) } else { value << 1 }) as u64;

    while v >= 0x20 {
        out.push((((v & 0x1f) as u8 | 0x20) + 63) as char);
        v >>= 5;
    }
    out.push((v as u8 + 63) as char);
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode a polyline string back into a coordinate sequence.
///
/// Inverse of [`encode`] up to the integer rounding of the chosen precision:
/// `decode(encode(p, 5), 5)` is within `1e-5` degrees of `p` on each axis.
/// An empty string decodes to an empty sequence.
pub fn decode(s: &str, precision: u32) -> Result<Vec<Coordinate>, PolylineError> {
    let factor = 10_f64.powi(precision as i32);
    let bytes = s.as_bytes();

    let mut coords = Vec::new();
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;
    let mut index = 0;

    while index < bytes.len() {
        lat += decode_value(bytes, &mut index)?;

        if index >= bytes.len() {
            return Err(PolylineError::OddTermination);
        }
        lng += decode_value(bytes, &mut index)?;

        coords.push(Coordinate::new(lat as f64 / factor, lng as f64 / factor));
    }

    Ok(coords)
}

/// [`decode`] at the standard [`PRECISION`] of 5.
#[inline]
pub fn decode_route(s: &str) -> Result<Vec<Coordinate>, PolylineError> {
    decode(s, PRECISION)
}

/// Read one zigzag varint starting at `*index`, advancing it past the value.
fn decode_value(bytes: &[u8], index: &mut usize) -> Result<i64, PolylineError> {
    let mut result: u64 = 0;
    let mut shift: u32 = 0;

    loop {
        let Some(&byte) = bytes.get(*index) else {
            return Err(PolylineError::UnterminatedSequence);
        };
        if !(63..=126).contains(&byte) {
            return Err(PolylineError::InvalidCharacter { byte, index: *index });
        }
        // 12 chunks fill 60 bits; a 13th would shift payload bits past
        // bit 63 and silently truncate
        if shift > 59 {
            return Err(PolylineError::ValueOverflow { index: *index });
        }

        *index += 1;
        let chunk = (byte - 63) as u64;
        result |= (chunk & 0x1f) << shift;
        shift += 5;

        if chunk & 0x20 == 0 {
            break;
        }
    }

    // Undo the zigzag transform
    let value = if result & 1 == 1 {
        !(result >> 1) as i64
    } else {
        (result >> 1) as i64
    };
    Ok(value)
}

// =============================================================================
// Unit Tests
// =============================================================================
