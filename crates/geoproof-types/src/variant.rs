use serde::{Deserialize, Serialize};
use std::fmt;

/// Recognized structural shapes for a timeline export payload.
///
/// Selection is structural, not content-based: a top-level array is an
/// iOS export, a top-level object an Android export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchemaVariant {
    /// Top-level object carrying a `semanticSegments` array.
    TimelineAndroid,
    /// Top-level array of timeline entries.
    TimelineIos,
}

impl SchemaVariant {
    /// Stable tag reported in response attributes and on-chain metadata.
    pub fn as_tag(&self) -> &'static str {
        match self {
            SchemaVariant::TimelineAndroid => "google-timeline-android.json",
            SchemaVariant::TimelineIos => "google-timeline-ios.json",
        }
    }
}

impl fmt::Display for SchemaVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_tag())
    }
}
