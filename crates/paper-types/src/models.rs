use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Member id as issued by the account system. Boards are keyed by their owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub i64);

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An absolute slot on a board. Independent of how the board is paginated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: u8,
    pub y: u8,
}

impl Coordinate {
    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }
}

/// Row-major: smaller `y` first, then smaller `x`.
impl Ord for Coordinate {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.y, self.x).cmp(&(other.y, other.x))
    }
}

impl PartialOrd for Coordinate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A slot as seen on one page of a paginated board view. `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagedCoordinate {
    pub page: u8,
    pub col: u8,
    pub row: u8,
}

/// Display-time parameter controlling how many columns fit on one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceProfile {
    Mobile,
    #[default]
    Desktop,
}

impl DeviceProfile {
    pub const ALL: [DeviceProfile; 2] = [DeviceProfile::Mobile, DeviceProfile::Desktop];

    pub const fn columns_per_page(self) -> u8 {
        match self {
            Self::Mobile => 4,
            Self::Desktop => 6,
        }
    }
}

/// Decoration drawn behind a message. Opaque to placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecoType {
    Potato,
    Cheese,
    Carrot,
    Tomato,
    Mushroom,
    Onion,
}

impl DecoType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Potato => "POTATO",
            Self::Cheese => "CHEESE",
            Self::Carrot => "CARROT",
            Self::Tomato => "TOMATO",
            Self::Mushroom => "MUSHROOM",
            Self::Onion => "ONION",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "POTATO" => Some(Self::Potato),
            "CHEESE" => Some(Self::Cheese),
            "CARROT" => Some(Self::Carrot),
            "TOMATO" => Some(Self::Tomato),
            "MUSHROOM" => Some(Self::Mushroom),
            "ONION" => Some(Self::Onion),
            _ => None,
        }
    }
}

/// A message pinned to one slot of a rolling paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub owner_id: MemberId,
    pub x: u8,
    pub y: u8,
    pub deco_type: DecoType,
    pub anonymous_nickname: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.x, self.y)
    }
}
