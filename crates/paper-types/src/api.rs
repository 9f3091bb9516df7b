use std::fmt;

use serde::de::{self, Deserializer, Unexpected, Visitor};
use serde::{Deserialize, Serialize};

use crate::models::{Coordinate, DecoType, DeviceProfile, MemberId, Message, PagedCoordinate};

// -- Auth --

/// Bearer-token claims issued by the account service. Only verified here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: MemberId,
    pub nickname: String,
    pub exp: usize,
}

// -- Placement --

/// Raw coordinates are signed and saturating so any integer reaches bounds
/// validation instead of failing deserialization.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlaceMessageRequest {
    #[serde(deserialize_with = "saturating_i64")]
    pub x: i64,
    #[serde(deserialize_with = "saturating_i64")]
    pub y: i64,
    pub content: String,
    pub anonymous_nickname: String,
    pub deco_type: DecoType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PlacementResponse {
    Placed {
        message: Message,
    },
    Conflict {
        suggestions: Vec<Coordinate>,
    },
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field: Option<String>,
        reason: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<u8>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<u8>,
    },
}

impl PlacementResponse {
    pub fn error(field: Option<&str>, reason: impl Into<String>) -> Self {
        Self::Error {
            field: field.map(str::to_string),
            reason: reason.into(),
            min: None,
            max: None,
        }
    }
}

// -- Board views --

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BoardQuery {
    #[serde(default)]
    pub profile: DeviceProfile,
    /// 1-based page. Omit to list the whole board.
    pub page: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardMessage {
    #[serde(flatten)]
    pub message: Message,
    pub position: PagedCoordinate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardMessagesResponse {
    pub owner_id: MemberId,
    pub profile: DeviceProfile,
    pub page: Option<u8>,
    pub messages: Vec<BoardMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuggestionQuery {
    #[serde(deserialize_with = "saturating_i64")]
    pub x: i64,
    #[serde(deserialize_with = "saturating_i64")]
    pub y: i64,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionsResponse {
    pub target: Coordinate,
    pub suggestions: Vec<Coordinate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LayoutQuery {
    #[serde(default)]
    pub profile: DeviceProfile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutResponse {
    pub profile: DeviceProfile,
    pub columns_per_page: u8,
    pub page_count: u8,
    pub width: u8,
    pub height: u8,
}

/// Any integer, integral float or numeric string, clamped to the `i64` range.
/// Query strings arrive as text, JSON bodies as numbers.
fn saturating_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    struct SaturatingI64;

    impl Visitor<'_> for SaturatingI64 {
        type Value = i64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an integer")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
            Ok(i64::try_from(v).unwrap_or(i64::MAX))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<i64, E> {
            if v.is_nan() || v.fract() != 0.0 {
                return Err(E::invalid_value(Unexpected::Float(v), &self));
            }
            // Float-to-int casts saturate.
            Ok(v as i64)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<i64, E> {
            let digits = v.strip_prefix(['-', '+']).unwrap_or(v);
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(E::invalid_value(Unexpected::Str(v), &self));
            }
            let saturated = if v.starts_with('-') { i64::MIN } else { i64::MAX };
            Ok(v.parse().unwrap_or(saturated))
        }
    }

    deserializer.deserialize_any(SaturatingI64)
}
