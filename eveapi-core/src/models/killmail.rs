//! Killmail types.
//!
//! A killmail reaches us from two sources that share the killmail id:
//! - [`SummaryRecord`] - zKillboard feed entry carrying the [`Zkb`] block
//! - [`DetailRecord`] - ESI killmail with the victim and attacker structure
//!
//! [`merge`] flattens both into a [`MergedRecord`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// zKillboard summary
// ============================================================================

/// The valuation and flag block zKillboard attaches to every killmail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Zkb {
    /// Nearest celestial / location id.
    #[serde(rename = "locationID")]
    pub location_id: i64,
    /// Killmail hash, required to fetch the ESI killmail.
    pub hash: String,
    /// Value of the fitted modules.
    #[serde(rename = "fittedValue")]
    pub fitted_value: f64,
    /// Value of items that dropped.
    #[serde(rename = "droppedValue")]
    pub dropped_value: f64,
    /// Value of items that were destroyed.
    #[serde(rename = "destroyedValue")]
    pub destroyed_value: f64,
    /// Total value of ship and cargo.
    #[serde(rename = "totalValue")]
    pub total_value: f64,
    /// zKillboard points.
    pub points: i64,
    /// Killed by NPCs only.
    pub npc: bool,
    /// Single attacker.
    pub solo: bool,
    /// Attacker and victim shared a corporation or alliance.
    pub awox: bool,
}

/// Minimal killmail entry returned by zKillboard feed pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    /// Killmail id shared with the ESI record.
    pub killmail_id: i64,
    /// zKillboard metadata.
    #[serde(default)]
    pub zkb: Zkb,
}

/// A single killmail as returned by zKillboard `api/killID/{id}/`.
///
/// Carries the full victim/attacker structure next to the [`Zkb`] block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZkillKillmail {
    /// Killmail id.
    pub killmail_id: i64,
    /// Solar system of the kill.
    #[serde(default)]
    pub solar_system_id: i64,
    /// Victim.
    #[serde(default)]
    pub victim: Victim,
    /// Attackers.
    #[serde(default)]
    pub attackers: Vec<Attacker>,
    /// zKillboard metadata.
    #[serde(default)]
    pub zkb: Zkb,
}

impl ZkillKillmail {
    /// The feed summary part of this killmail.
    pub fn summary(&self) -> SummaryRecord {
        SummaryRecord {
            killmail_id: self.killmail_id,
            zkb: self.zkb.clone(),
        }
    }
}

// ============================================================================
// ESI detail
// ============================================================================

/// Killmail as returned by ESI `killmails/{id}/{hash}/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailRecord {
    /// Killmail id.
    pub killmail_id: i64,
    /// Time of the kill.
    pub killmail_time: DateTime<Utc>,
    /// Solar system the kill happened in.
    pub solar_system_id: i64,
    /// The destroyed ship and its owner.
    pub victim: Victim,
    /// Everyone who got on the mail.
    #[serde(default)]
    pub attackers: Vec<Attacker>,
}

impl DetailRecord {
    /// Returns the attacker that landed the final blow, if recorded.
    pub fn final_blow(&self) -> Option<&Attacker> {
        self.attackers.iter().find(|a| a.final_blow)
    }
}

/// One attacker on a killmail. NPC attackers carry no character.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attacker {
    /// Alliance of the attacker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alliance_id: Option<i64>,
    /// Character id; absent for NPCs and structures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_id: Option<i64>,
    /// Corporation of the attacker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corporation_id: Option<i64>,
    /// Damage dealt.
    #[serde(default)]
    pub damage_done: i64,
    /// Landed the final blow.
    #[serde(default)]
    pub final_blow: bool,
    /// Security status at the time of the kill.
    #[serde(default)]
    pub security_status: f64,
    /// Ship type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ship_type_id: Option<i64>,
    /// Weapon type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weapon_type_id: Option<i64>,
}

/// The victim of a killmail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Victim {
    /// Character id; absent for structures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_id: Option<i64>,
    /// Corporation id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corporation_id: Option<i64>,
    /// Alliance id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alliance_id: Option<i64>,
    /// Total damage taken.
    #[serde(default)]
    pub damage_taken: i64,
    /// Fitted and cargo items, possibly nested in containers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<VictimItem>,
    /// Position in space.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// Ship type that was destroyed.
    #[serde(default)]
    pub ship_type_id: i64,
}

impl Victim {
    /// Counts every item in the tree, nested ones included.
    pub fn item_count(&self) -> usize {
        self.items.iter().map(VictimItem::tree_size).sum()
    }
}

/// Coordinates of the victim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

/// An item on the victim. Containers hold their contents in `items`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VictimItem {
    /// Inventory flag (slot or hold).
    #[serde(default)]
    pub flag: i64,
    /// Item type.
    pub item_type_id: i64,
    /// Destroyed quantity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity_destroyed: Option<i64>,
    /// Dropped quantity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity_dropped: Option<i64>,
    /// Singleton marker.
    #[serde(default)]
    pub singleton: i64,
    /// Nested contents.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<VictimItem>,
}

impl VictimItem {
    /// Number of items in this subtree, including this one.
    pub fn tree_size(&self) -> usize {
        1 + self.items.iter().map(Self::tree_size).sum::<usize>()
    }

    /// Nesting depth of this subtree; a leaf has depth 1.
    pub fn depth(&self) -> usize {
        1 + self.items.iter().map(Self::depth).max().unwrap_or(0)
    }

    /// Destroyed plus dropped quantity of this item alone.
    pub fn quantity(&self) -> i64 {
        self.quantity_destroyed.unwrap_or(0) + self.quantity_dropped.unwrap_or(0)
    }
}

// ============================================================================
// Merged record
// ============================================================================

/// ESI killmail flattened together with the zKillboard valuation block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    /// Killmail id.
    pub killmail_id: i64,
    /// Time of the kill.
    pub killmail_time: DateTime<Utc>,
    /// Solar system of the kill.
    pub solar_system_id: i64,
    /// Victim.
    pub victim: Victim,
    /// Attackers.
    pub attackers: Vec<Attacker>,

    /// Nearest location id.
    #[serde(rename = "locationID")]
    pub location_id: i64,
    /// Killmail hash.
    pub hash: String,
    /// Fitted value.
    #[serde(rename = "fittedValue")]
    pub fitted_value: f64,
    /// Dropped value.
    #[serde(rename = "droppedValue")]
    pub dropped_value: f64,
    /// Destroyed value.
    #[serde(rename = "destroyedValue")]
    pub destroyed_value: f64,
    /// Total value.
    #[serde(rename = "totalValue")]
    pub total_value: f64,
    /// zKillboard points.
    pub points: i64,
    /// NPC kill.
    pub npc: bool,
    /// Solo kill.
    pub solo: bool,
    /// Friendly fire.
    pub awox: bool,
}

/// Flattens an ESI killmail and its zKillboard summary into one record.
///
/// Identity and positional fields come from `detail`, valuation and flags
/// from the summary's [`Zkb`] block.
pub fn merge(detail: DetailRecord, summary: &SummaryRecord) -> MergedRecord {
    let zkb = &summary.zkb;
    MergedRecord {
        killmail_id: detail.killmail_id,
        killmail_time: detail.killmail_time,
        solar_system_id: detail.solar_system_id,
        victim: detail.victim,
        attackers: detail.attackers,
        location_id: zkb.location_id,
        hash: zkb.hash.clone(),
        fitted_value: zkb.fitted_value,
        dropped_value: zkb.dropped_value,
        destroyed_value: zkb.destroyed_value,
        total_value: zkb.total_value,
        points: zkb.points,
        npc: zkb.npc,
        solo: zkb.solo,
        awox: zkb.awox,
    }
}
