//! Branch ("leg") names.
//!
//! Leg labels arrive from the server and from host calls in whatever casing the caller used
//! (`"Left"`, `"left"`, `" LEFT "`). Every comparison, map key and stored attribute goes through
//! [`Leg::new`], so there is exactly one spelling per leg inside the engine.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical name of the reserved "not placed" pseudo-branch.
pub const HOLDING_TANK: &str = "holding tank";

pub fn canonical_leg(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Leg(String);

impl Leg {
    pub fn new(raw: &str) -> Self {
        Self(canonical_leg(raw))
    }

    pub fn parse(raw: Option<&str>) -> Option<Self> {
        let leg = Self::new(raw?);
        (!leg.0.is_empty()).then_some(leg)
    }

    pub fn holding_tank() -> Self {
        Self(HOLDING_TANK.to_string())
    }

    pub fn is_holding_tank(&self) -> bool {
        self.0 == HOLDING_TANK
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Leg {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

impl From<&str> for Leg {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<Leg> for String {
    fn from(value: Leg) -> Self {
        value.0
    }
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The declared legs of a legged tree, in canonical display order.
///
/// An empty order means the tree is flat (unbounded fan-out, paginated).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegOrder {
    // canonical -> name as declared by the server
    legs: IndexMap<Leg, String>,
}

impl LegOrder {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut legs = IndexMap::new();
        for name in names {
            let name = name.as_ref();
            let Some(leg) = Leg::parse(Some(name)) else {
                continue;
            };
            if leg.is_holding_tank() {
                continue;
            }
            legs.entry(leg).or_insert_with(|| name.trim().to_string());
        }
        Self { legs }
    }

    pub fn is_legged(&self) -> bool {
        !self.legs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.legs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }

    pub fn contains(&self, leg: &Leg) -> bool {
        self.legs.contains_key(leg)
    }

    /// Sort rank of a leg. Undeclared legs (and nodes without a leg) sort after every
    /// declared one.
    pub fn rank(&self, leg: Option<&Leg>) -> usize {
        leg.and_then(|l| self.legs.get_index_of(l))
            .unwrap_or(self.legs.len())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Leg> {
        self.legs.keys()
    }

    /// Leg names exactly as the server declared them.
    pub fn declared_names(&self) -> Vec<String> {
        self.legs.values().cloned().collect()
    }
}
