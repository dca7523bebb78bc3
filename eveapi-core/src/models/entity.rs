//! Entity and feed addressing types.
//!
//! This module contains the types that address zKillboard feeds:
//! - [`EntityKind`] - Character, corporation or alliance
//! - [`EntityReference`] - A (kind, id) pair
//! - [`EntityGroups`] - Ids grouped by kind
//! - [`Direction`] - Kills or losses
//! - [`PageRequest`] - One page of one feed for one month

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ============================================================================
// Entity Kind
// ============================================================================

/// The kinds of EVE entity that own a killmail feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// A player character.
    Character,
    /// A player corporation.
    Corporation,
    /// An alliance of corporations.
    Alliance,
}

impl EntityKind {
    /// Returns the lowercase name used in URLs and cache keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Character => "character",
            Self::Corporation => "corporation",
            Self::Alliance => "alliance",
        }
    }

    /// Returns all kinds in aggregation order (corporation, alliance, character).
    pub fn all() -> &'static [EntityKind] {
        &[Self::Corporation, Self::Alliance, Self::Character]
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "character" | "char" => Ok(Self::Character),
            "corporation" | "corp" => Ok(Self::Corporation),
            "alliance" => Ok(Self::Alliance),
            other => Err(CoreError::UnknownEntityKind(other.to_string())),
        }
    }
}

// ============================================================================
// Entity Reference
// ============================================================================

/// A (kind, id) pair addressing one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityReference {
    /// The entity kind.
    pub kind: EntityKind,
    /// The EVE id of the entity.
    pub id: i64,
}

impl EntityReference {
    /// Creates a new entity reference.
    pub fn new(kind: EntityKind, id: i64) -> Self {
        Self { kind, id }
    }

    /// Shorthand for a character reference.
    pub fn character(id: i64) -> Self {
        Self::new(EntityKind::Character, id)
    }

    /// Shorthand for a corporation reference.
    pub fn corporation(id: i64) -> Self {
        Self::new(EntityKind::Corporation, id)
    }

    /// Shorthand for an alliance reference.
    pub fn alliance(id: i64) -> Self {
        Self::new(EntityKind::Alliance, id)
    }
}

impl fmt::Display for EntityReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

// ============================================================================
// Entity Groups
// ============================================================================

/// Entity ids grouped by kind.
///
/// Iteration always visits corporations, then alliances, then characters,
/// each group in the order the ids were supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityGroups {
    /// Corporation ids.
    #[serde(default)]
    pub corporations: Vec<i64>,
    /// Alliance ids.
    #[serde(default)]
    pub alliances: Vec<i64>,
    /// Character ids.
    #[serde(default)]
    pub characters: Vec<i64>,
}

impl EntityGroups {
    /// Creates an empty set of groups.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds corporation ids.
    pub fn with_corporations(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.corporations.extend(ids);
        self
    }

    /// Adds alliance ids.
    pub fn with_alliances(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.alliances.extend(ids);
        self
    }

    /// Adds character ids.
    pub fn with_characters(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.characters.extend(ids);
        self
    }

    /// Returns the ids for one kind.
    pub fn ids(&self, kind: EntityKind) -> &[i64] {
        match kind {
            EntityKind::Corporation => &self.corporations,
            EntityKind::Alliance => &self.alliances,
            EntityKind::Character => &self.characters,
        }
    }

    /// Iterates every entity in aggregation order.
    pub fn iter(&self) -> impl Iterator<Item = EntityReference> + '_ {
        EntityKind::all().iter().flat_map(move |&kind| {
            self.ids(kind)
                .iter()
                .map(move |&id| EntityReference::new(kind, id))
        })
    }

    /// Total number of entities across all groups.
    pub fn len(&self) -> usize {
        self.corporations.len() + self.alliances.len() + self.characters.len()
    }

    /// Returns true if no ids were supplied.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Direction
// ============================================================================

/// Whether the entity is an attacker (kills) or the victim (losses).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Killmails where the entity is on the attacker list.
    Kills,
    /// Killmails where the entity is the victim.
    Losses,
}

impl Direction {
    /// Returns the path segment used by the feed.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kills => "kills",
            Self::Losses => "losses",
        }
    }

    /// Both directions, kills first.
    pub fn both() -> [Direction; 2] {
        [Self::Kills, Self::Losses]
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Page Request
// ============================================================================

/// One page of one entity's feed for one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRequest {
    /// Feed owner.
    pub entity: EntityReference,
    /// Kills or losses.
    pub direction: Direction,
    /// Page index, starting at 1.
    pub page: u32,
    /// Calendar year.
    pub year: i32,
    /// Calendar month (1-12).
    pub month: u32,
}

impl PageRequest {
    /// Creates a page request.
    pub fn new(
        entity: EntityReference,
        direction: Direction,
        page: u32,
        year: i32,
        month: u32,
    ) -> Self {
        Self {
            entity,
            direction,
            page,
            year,
            month,
        }
    }

    /// Returns the request for the following page.
    pub fn next_page(&self) -> Self {
        Self {
            page: self.page + 1,
            ..*self
        }
    }

    /// Cache key, e.g. `zkill:kills:corporationID:9000000:2023:10:1`.
    pub fn cache_key(&self) -> String {
        format!(
            "zkill:{}:{}ID:{}:{}:{:02}:{}",
            self.direction, self.entity.kind, self.entity.id, self.year, self.month, self.page
        )
    }

    /// Feed path relative to the zKillboard base URL.
    pub fn path(&self) -> String {
        format!(
            "api/{}/{}ID/{}/year/{}/month/{}/page/{}/",
            self.direction, self.entity.kind, self.entity.id, self.year, self.month, self.page
        )
    }

    /// Returns true if this page belongs to the month containing `now`.
    ///
    /// Pages of the running month still change, older months are final.
    pub fn is_current_month(&self, now: DateTime<Utc>) -> bool {
        self.year == now.year() && self.month == now.month()
    }
}
