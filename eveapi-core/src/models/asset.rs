//! Asset types and cyno stash detection.
//!
//! A location counts as a cyno stash when it holds enough of at least one
//! [`cyno_items`] type. Only assets sitting directly in a station, structure
//! or solar system are considered; items nested in containers or ships
//! report another asset as their location and are skipped.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Item types looked for, with the quantity that counts as stocked.
const CYNO_TYPES: [(i64, &str, i64); 3] = [
    (16_273, "Liquid Ozone", 200),
    (32_880, "Venture", 1),
    (19_744, "Covetor", 1),
];

// ============================================================================
// Asset
// ============================================================================

/// One entry of an ESI character or corporation asset list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Item type.
    pub type_id: i64,
    /// Stack size.
    pub quantity: i64,
    /// Hangar, cargo, slot, etc.
    #[serde(default)]
    pub location_flag: String,
    /// `station`, `solar_system`, `structure` or `item`.
    #[serde(default)]
    pub location_type: String,
    /// Id of the station, structure, system or containing item.
    pub location_id: i64,
}

impl Asset {
    /// True when the asset sits directly in a station, structure or system.
    pub fn is_top_level(&self) -> bool {
        matches!(
            self.location_type.as_str(),
            "station" | "solar_system" | "structure"
        )
    }
}

// ============================================================================
// Item
// ============================================================================

/// An item type with a wanted quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Item type id.
    #[serde(rename = "item_id")]
    pub id: i64,
    /// Display name.
    #[serde(rename = "item_name")]
    pub name: String,
    /// Quantity.
    #[serde(rename = "item_qty")]
    pub quantity: i64,
}

/// The cyno-relevant item types and the quantity each one needs.
pub fn cyno_items() -> Vec<Item> {
    CYNO_TYPES
        .iter()
        .map(|&(id, name, quantity)| Item {
            id,
            name: name.to_string(),
            quantity,
        })
        .collect()
}

fn cyno_name(type_id: i64) -> Option<&'static str> {
    CYNO_TYPES
        .iter()
        .find(|(id, _, _)| *id == type_id)
        .map(|(_, name, _)| *name)
}

// ============================================================================
// Location Inventory
// ============================================================================

/// Cyno items held by one owner at one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationInventory {
    /// Character or corporation owning the assets.
    #[serde(rename = "Id")]
    pub owner_id: i64,
    /// Location flag of the last cyno item seen there.
    #[serde(rename = "LocFlag")]
    pub location_flag: String,
    /// Location type of the last cyno item seen there.
    #[serde(rename = "LocType")]
    pub location_type: String,
    /// Station, structure or system id.
    #[serde(rename = "LocID")]
    pub location_id: i64,
    /// Cyno item name to total quantity.
    #[serde(rename = "Items")]
    pub items: BTreeMap<String, i64>,
}

/// Groups `assets` by top-level location and keeps the cyno stashes.
///
/// Results are ordered by location id.
pub fn cyno_inventories(owner_id: i64, assets: &[Asset]) -> Vec<LocationInventory> {
    let mut by_location: BTreeMap<i64, Vec<&Asset>> = BTreeMap::new();
    for asset in assets.iter().filter(|a| a.is_top_level()) {
        by_location.entry(asset.location_id).or_default().push(asset);
    }

    by_location
        .into_iter()
        .filter(|(_, assets)| is_stocked(assets))
        .map(|(location_id, assets)| build_inventory(owner_id, location_id, &assets))
        .collect()
}

fn is_stocked(assets: &[&Asset]) -> bool {
    let mut counts: HashMap<i64, i64> = HashMap::new();
    for asset in assets {
        *counts.entry(asset.type_id).or_default() += asset.quantity;
    }
    CYNO_TYPES
        .iter()
        .any(|(id, _, needed)| counts.get(id).is_some_and(|have| have >= needed))
}

fn build_inventory(owner_id: i64, location_id: i64, assets: &[&Asset]) -> LocationInventory {
    let mut inventory = LocationInventory {
        owner_id,
        location_flag: String::new(),
        location_type: String::new(),
        location_id,
        items: BTreeMap::new(),
    };
    for asset in assets {
        if let Some(name) = cyno_name(asset.type_id) {
            *inventory.items.entry(name.to_string()).or_default() += asset.quantity;
            inventory.location_flag.clone_from(&asset.location_flag);
            inventory.location_type.clone_from(&asset.location_type);
        }
    }
    inventory
}

// ============================================================================
// Tests
// ============================================================================
