//! Page identifiers.
//!
//! The remote service accepts ids both as 32 hex characters and in the dashed
//! `8-4-4-4-12` form. [`PageId`] stores the lowercase undashed form, so two
//! spellings of the same id are equal and hash identically.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::EpcError;

const ID_LEN: usize = 32;
const DASH_POSITIONS: [usize; 4] = [8, 12, 16, 20];

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(String);

impl PageId {
    /// Parse an id in dashed or undashed form, or a page URL ending in one.
    pub fn parse(value: &str) -> Result<Self, EpcError> {
        to_no_dash_id(value)
            .or_else(|| id_from_url(value))
            .map(PageId)
            .ok_or_else(|| EpcError::InvalidPageId(value.to_string()))
    }

    pub fn no_dash(&self) -> &str {
        &self.0
    }

    pub fn dashed(&self) -> String {
        let mut out = String::with_capacity(ID_LEN + DASH_POSITIONS.len());
        for (i, c) in self.0.chars().enumerate() {
            if DASH_POSITIONS.contains(&i) {
                out.push('-');
            }
            out.push(c);
        }
        out
    }
}

/// Normalize an id to its undashed lowercase form, or `None` when the input
/// is not an id in either spelling.
pub fn to_no_dash_id(value: &str) -> Option<String> {
    let value = value.trim();
    let stripped: String = match value.len() {
        ID_LEN => value.to_string(),
        36 => {
            let dashed_ok = value
                .char_indices()
                .filter(|(_, c)| *c == '-')
                .map(|(i, _)| i)
                .eq([8, 13, 18, 23]);
            if !dashed_ok {
                return None;
            }
            value.chars().filter(|c| *c != '-').collect()
        }
        _ => return None,
    };
    if stripped.len() != ID_LEN || !stripped.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(stripped.to_ascii_lowercase())
}

// Page URLs look like https://www.notion.so/Some-Title-<32 hex>?v=...
fn id_from_url(value: &str) -> Option<String> {
    let parsed = url::Url::parse(value.trim()).ok()?;
    let last = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    if last.len() < ID_LEN {
        return None;
    }
    let tail = &last[last.len() - ID_LEN..];
    to_no_dash_id(tail)
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PageId {
    type Err = EpcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PageId::parse(s)
    }
}

impl Serialize for PageId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PageId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        PageId::parse(&raw).map_err(serde::de::Error::custom)
    }
}
