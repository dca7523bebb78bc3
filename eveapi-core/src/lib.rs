// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `eveapi` Core
//!
//! Core types, models, and traits shared by every `eveapi` crate.
//!
//! This crate provides the foundational abstractions used across the
//! workspace, including:
//!
//! - Domain models (entities, killmails, locations, credentials)
//! - The killmail merge function
//! - Error types
//! - Collaborator traits (cache backend, credential refresher)
//!
//! ## Key Types
//!
//! ### Entities
//! - [`EntityKind`] - Character, corporation or alliance
//! - [`EntityReference`] - A (kind, id) pair addressing a killmail feed
//! - [`EntityGroups`] - Ids grouped by kind, iterated in a fixed order
//! - [`Direction`] - Kills or losses
//! - [`PageRequest`] - One page of one feed for one month
//!
//! ### Killmails
//! - [`SummaryRecord`] - zKillboard feed entry with its [`Zkb`] block
//! - [`DetailRecord`] - ESI killmail with victim and attackers
//! - [`MergedRecord`] - The flattened union of both, built by [`merge`]
//!
//! ### Locations
//! - [`LocationReference`] - A station or structure id
//! - [`Station`], [`Structure`] - ESI universe records
//! - [`LocationInventory`] - Cyno items at one location, built by [`cyno_inventories`]
//!
//! ### Auth
//! - [`Credential`] - OAuth access/refresh token pair

pub mod error;
pub mod models;
pub mod traits;

// Re-export error types
pub use error::CoreError;

// Re-export all model types
pub use models::{
    // Entities
    Direction,
    EntityGroups,
    EntityKind,
    EntityReference,
    PageRequest,
    // Killmails
    Attacker,
    DetailRecord,
    MergedRecord,
    Position,
    SummaryRecord,
    Victim,
    VictimItem,
    Zkb,
    ZkillKillmail,
    merge,
    // Locations
    CharacterLocation,
    CloneLocations,
    HomeLocation,
    JumpClone,
    LocationKind,
    LocationReference,
    Station,
    Structure,
    SystemId,
    // Assets
    Asset,
    Item,
    LocationInventory,
    cyno_inventories,
    cyno_items,
    // Public info
    AllianceInfo,
    CharacterInfo,
    CharacterPortrait,
    CorporationInfo,
    SolarSystem,
    VerifiedUser,
    // Auth
    Credential,
};

// Re-export traits
pub use traits::{CacheRepository, CredentialRefresher};
