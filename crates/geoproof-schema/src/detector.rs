use geoproof_types::SchemaVariant;
use serde_json::Value;

/// Classify a decoded payload and check it against that variant's
/// structural schema.
///
/// Variant selection is purely structural: a top-level array is an iOS
/// export, anything else is treated as an Android export. The detected
/// variant is returned even when validation fails so callers can still
/// attribute the failure. This function is total; it never panics and
/// never returns an error.
pub fn detect_and_validate(payload: &Value) -> (SchemaVariant, bool) {
    if payload.is_array() {
        (SchemaVariant::TimelineIos, validate_ios(payload))
    } else {
        (SchemaVariant::TimelineAndroid, validate_android(payload))
    }
}

fn validate_ios(payload: &Value) -> bool {
    match payload.as_array() {
        Some(entries) => entries.iter().all(valid_ios_entry),
        None => false,
    }
}

fn valid_ios_entry(entry: &Value) -> bool {
    let obj = match entry.as_object() {
        Some(o) => o,
        None => return false,
    };
    if let Some(path) = obj.get("timelinePath") {
        match path.as_array() {
            Some(points) if points.iter().all(valid_path_point) => {}
            _ => return false,
        }
    }
    if let Some(visit) = obj.get("visit") {
        if !valid_visit(visit, PlaceLocation::GeoString) {
            return false;
        }
    }
    true
}

fn validate_android(payload: &Value) -> bool {
    let segments = match payload.get("semanticSegments").and_then(Value::as_array) {
        Some(s) => s,
        None => return false,
    };
    segments.iter().all(valid_segment)
}

fn valid_segment(segment: &Value) -> bool {
    let obj = match segment.as_object() {
        Some(o) => o,
        None => return false,
    };
    if let Some(path) = obj.get("timelinePath") {
        match path.as_array() {
            Some(points) if points.iter().all(valid_path_point) => {}
            _ => return false,
        }
    }
    if let Some(visit) = obj.get("visit") {
        if !valid_visit(visit, PlaceLocation::LatLngObject) {
            return false;
        }
    }
    if let Some(activity) = obj.get("activity") {
        if !valid_activity(activity) {
            return false;
        }
    }
    true
}

/// A path point is an object whose optional `point` field is a string.
fn valid_path_point(point: &Value) -> bool {
    match point.as_object() {
        Some(o) => o.get("point").map_or(true, Value::is_string),
        None => false,
    }
}

/// How a visit's place location is encoded per variant.
#[derive(Clone, Copy)]
enum PlaceLocation {
    /// iOS: `placeLocation` is a bare `geo:` string.
    GeoString,
    /// Android: `placeLocation` is an object with a `latLng` string.
    LatLngObject,
}

fn valid_visit(visit: &Value, encoding: PlaceLocation) -> bool {
    let obj = match visit.as_object() {
        Some(o) => o,
        None => return false,
    };
    let candidate = match obj.get("topCandidate") {
        Some(c) => c,
        None => return true,
    };
    let candidate = match candidate.as_object() {
        Some(o) => o,
        None => return false,
    };
    match candidate.get("placeLocation") {
        None => true,
        Some(location) => match encoding {
            PlaceLocation::GeoString => location.is_string(),
            PlaceLocation::LatLngObject => match location.as_object() {
                Some(o) => o.get("latLng").map_or(true, Value::is_string),
                None => false,
            },
        },
    }
}

fn valid_activity(activity: &Value) -> bool {
    let obj = match activity.as_object() {
        Some(o) => o,
        None => return false,
    };
    ["start", "end"].iter().all(|leg| match obj.get(*leg) {
        None => true,
        Some(end) => match end.as_object() {
            Some(o) => o.get("latLng").map_or(true, Value::is_string),
            None => false,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_array_payload_is_ios() {
        let payload = json!([
            {
                "timelinePath": [{"point": "geo:37.421955,-122.084058"}],
                "visit": {"topCandidate": {"placeLocation": "geo:37.4,-122.0"}}
            }
        ]);
        let (variant, ok) = detect_and_validate(&payload);
        assert_eq!(variant, SchemaVariant::TimelineIos);
        assert!(ok);
    }

    #[test]
    fn test_object_payload_is_android() {
        let payload = json!({
            "semanticSegments": [
                {
                    "timelinePath": [{"point": "37.421955, -122.084058"}],
                    "visit": {"topCandidate": {"placeLocation": {"latLng": "37.4, -122.0"}}},
                    "activity": {
                        "start": {"latLng": "37.1, -122.1"},
                        "end": {"latLng": "37.2, -122.2"}
                    }
                }
            ]
        });
        let (variant, ok) = detect_and_validate(&payload);
        assert_eq!(variant, SchemaVariant::TimelineAndroid);
        assert!(ok);
    }

    #[test]
    fn test_android_without_segments_fails_validation() {
        let payload = json!({"something": "else"});
        let (variant, ok) = detect_and_validate(&payload);
        assert_eq!(variant, SchemaVariant::TimelineAndroid);
        assert!(!ok);
    }

    #[test]
    fn test_ios_with_non_object_entry_fails_validation() {
        let payload = json!(["just a string"]);
        let (variant, ok) = detect_and_validate(&payload);
        assert_eq!(variant, SchemaVariant::TimelineIos);
        assert!(!ok);
    }

    #[test]
    fn test_ios_with_numeric_point_fails_validation() {
        let payload = json!([{"timelinePath": [{"point": 42}]}]);
        let (_, ok) = detect_and_validate(&payload);
        assert!(!ok);
    }

    #[test]
    fn test_optional_fields_may_be_absent() {
        let (_, ios_ok) = detect_and_validate(&json!([{}, {"timelinePath": []}]));
        assert!(ios_ok);

        let (_, android_ok) = detect_and_validate(&json!({"semanticSegments": [{}]}));
        assert!(android_ok);
    }

    #[test]
    fn test_android_visit_with_string_place_location_fails() {
        // Android place locations nest the string under `latLng`.
        let payload = json!({
            "semanticSegments": [
                {"visit": {"topCandidate": {"placeLocation": "geo:1.0,2.0"}}}
            ]
        });
        let (variant, ok) = detect_and_validate(&payload);
        assert_eq!(variant, SchemaVariant::TimelineAndroid);
        assert!(!ok);
    }
}
