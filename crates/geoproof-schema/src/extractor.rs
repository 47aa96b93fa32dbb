use geoproof_types::{Coordinate, SchemaVariant};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;

static GEO_POINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^geo:(-?\d+\.\d+),(-?\d+\.\d+)").expect("geo point pattern"));

/// Collect every coordinate a payload carries for the given variant.
///
/// Entries that do not match the expected string grammar are skipped at
/// per-entry granularity; malformed input lowers the count, it never
/// aborts the walk. Duplicates within one file collapse via the set.
pub fn extract_coordinates(payload: &Value, variant: SchemaVariant) -> HashSet<Coordinate> {
    let mut coordinates = HashSet::new();
    match variant {
        SchemaVariant::TimelineIos => extract_ios(payload, &mut coordinates),
        SchemaVariant::TimelineAndroid => extract_android(payload, &mut coordinates),
    }
    coordinates
}

fn extract_ios(payload: &Value, out: &mut HashSet<Coordinate>) {
    let entries = match payload.as_array() {
        Some(a) => a,
        None => return,
    };
    for entry in entries {
        if let Some(points) = entry.get("timelinePath").and_then(Value::as_array) {
            for point in points {
                if let Some(raw) = point.get("point").and_then(Value::as_str) {
                    if let Some(coordinate) = parse_geo_point(raw) {
                        out.insert(coordinate);
                    }
                }
            }
        }
        if let Some(raw) = entry
            .pointer("/visit/topCandidate/placeLocation")
            .and_then(Value::as_str)
        {
            if let Some(coordinate) = parse_geo_point(raw) {
                out.insert(coordinate);
            }
        }
    }
}

fn extract_android(payload: &Value, out: &mut HashSet<Coordinate>) {
    let segments = match payload.get("semanticSegments").and_then(Value::as_array) {
        Some(s) => s,
        None => return,
    };
    for segment in segments {
        if let Some(points) = segment.get("timelinePath").and_then(Value::as_array) {
            for point in points {
                if let Some(raw) = point.get("point").and_then(Value::as_str) {
                    if let Some(coordinate) = parse_lat_lng(raw) {
                        out.insert(coordinate);
                    }
                }
            }
        }
        if let Some(raw) = segment
            .pointer("/visit/topCandidate/placeLocation/latLng")
            .and_then(Value::as_str)
        {
            if let Some(coordinate) = parse_lat_lng(raw) {
                out.insert(coordinate);
            }
        }
        if let Some(activity) = segment.get("activity") {
            for leg in ["start", "end"] {
                if let Some(raw) = activity
                    .get(leg)
                    .and_then(|v| v.get("latLng"))
                    .and_then(Value::as_str)
                {
                    if let Some(coordinate) = parse_lat_lng(raw) {
                        out.insert(coordinate);
                    }
                }
            }
        }
    }
}

/// `geo:<lat>,<lng>` prefix grammar used by iOS exports.
fn parse_geo_point(raw: &str) -> Option<Coordinate> {
    let caps = GEO_POINT.captures(raw)?;
    let latitude = caps[1].parse().ok()?;
    let longitude = caps[2].parse().ok()?;
    Some(Coordinate::new(latitude, longitude))
}

/// Bare `<lat>,<lng>` grammar used by Android exports. Degree markers and
/// embedded whitespace are tolerated; anything else is rejected.
fn parse_lat_lng(raw: &str) -> Option<Coordinate> {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != '\u{00B0}' && !c.is_whitespace())
        .collect();
    let (lat, lng) = cleaned.split_once(',')?;
    if lng.contains(',') {
        return None;
    }
    Some(Coordinate::new(lat.parse().ok()?, lng.parse().ok()?))
}
