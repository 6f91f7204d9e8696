//! Result store and the output bundle handed back to the caller.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::hash::Hasher;
use twox_hash::XxHash64;

use crate::entity::{EntityId, Recipe, SpawnProfile};
use crate::shuffler::LocationAssignment;

/// One line of the human-readable spoiler log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SpoilerEntry {
    Resolved {
        iteration: u32,
        entity: EntityId,
        depth: i32,
        priority: bool,
    },
    DepthChanged {
        iteration: u32,
        from: i32,
        to: i32,
    },
}

/// Session statistics carried in the bundle.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunStats {
    pub iterations: u32,
    pub final_depth: i32,
    /// Every depth the session reached, starting with the initial depth.
    pub depth_history: Vec<i32>,
    pub rng_draws: u64,
    pub forced_admissions: Vec<EntityId>,
    pub skipped_records: usize,
}

/// Everything a session produced; returned only when the session completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultBundle {
    pub seed: u64,
    pub recipes: BTreeMap<EntityId, Recipe>,
    pub spawn_profiles: BTreeMap<EntityId, SpawnProfile>,
    pub locations: Vec<LocationAssignment>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub scan_counts: BTreeMap<EntityId, u32>,
    pub spoiler: Vec<SpoilerEntry>,
    pub stats: RunStats,
}

impl ResultBundle {
    /// Canonical JSON form of the bundle.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Stable 64-bit hash of the canonical JSON, for quick determinism checks.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = XxHash64::with_seed(0);
        if let Ok(json) = self.to_json() {
            hasher.write(json.as_bytes());
        }
        hasher.finish()
    }

    /// Entities whose resolution order is recorded in the spoiler log.
    pub fn resolution_order(&self) -> impl Iterator<Item = &EntityId> {
        self.spoiler.iter().filter_map(|entry| match entry {
            SpoilerEntry::Resolved { entity, .. } => Some(entity),
            SpoilerEntry::DepthChanged { .. } => None,
        })
    }
}

/// Write-once registry of session outputs.
#[derive(Debug, Clone, Default)]
pub struct ResultStore {
    recipes: BTreeMap<EntityId, Recipe>,
    spawn_profiles: BTreeMap<EntityId, SpawnProfile>,
    locations: Vec<LocationAssignment>,
    scan_counts: BTreeMap<EntityId, u32>,
    spoiler: Vec<SpoilerEntry>,
    pub stats: RunStats,
}

impl ResultStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a recipe; a second registration for the same owner is ignored.
    pub fn register_recipe(&mut self, recipe: Recipe) -> bool {
        if self.recipes.contains_key(&recipe.owner) {
            log::warn!("recipe for {} already registered; ignoring", recipe.owner);
            return false;
        }
        self.recipes.insert(recipe.owner.clone(), recipe);
        true
    }

    pub fn register_spawn(&mut self, profile: SpawnProfile) -> bool {
        if self.spawn_profiles.contains_key(&profile.fragment) {
            log::warn!(
                "spawn profile for {} already registered; ignoring",
                profile.fragment
            );
            return false;
        }
        self.spawn_profiles.insert(profile.fragment.clone(), profile);
        true
    }

    pub fn register_scan_count(&mut self, fragment: EntityId, scans: u32) -> bool {
        if self.scan_counts.contains_key(&fragment) {
            log::warn!("scan count for {fragment} already registered; ignoring");
            return false;
        }
        self.scan_counts.insert(fragment, scans);
        true
    }

    pub fn set_locations(&mut self, assignments: Vec<LocationAssignment>) {
        self.locations = assignments;
    }

    pub fn log(&mut self, entry: SpoilerEntry) {
        self.spoiler.push(entry);
    }

    #[must_use]
    pub fn recipe(&self, owner: &EntityId) -> Option<&Recipe> {
        self.recipes.get(owner)
    }

    pub fn recipes(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.values()
    }

    #[must_use]
    pub fn spawn_profile(&self, fragment: &EntityId) -> Option<&SpawnProfile> {
        self.spawn_profiles.get(fragment)
    }

    #[must_use]
    pub fn spoiler(&self) -> &[SpoilerEntry] {
        &self.spoiler
    }

    /// Seal the store into an output bundle.
    #[must_use]
    pub fn into_bundle(self, seed: u64) -> ResultBundle {
        ResultBundle {
            seed,
            recipes: self.recipes,
            spawn_profiles: self.spawn_profiles,
            locations: self.locations,
            scan_counts: self.scan_counts,
            spoiler: self.spoiler,
            stats: self.stats,
        }
    }
}
