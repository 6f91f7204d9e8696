//! Session context: every piece of mutable state one randomization run owns.
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};

use crate::config::RandomizerConfig;
use crate::data::WorldInputs;
use crate::entity::{Category, Entity, EntityId};
use crate::progression::ProgressionGraph;
use crate::reachability::ReachabilityModel;
use crate::result::{ResultStore, SpoilerEntry};
use crate::rng::SessionRng;
use crate::shuffler::{DerivedUnlock, LocationItem};
use crate::spawn::Biome;

/// Resolved entities currently usable as ingredients, in admission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReachablePool {
    order: Vec<EntityId>,
    members: BTreeSet<EntityId>,
}

impl ReachablePool {
    pub fn insert(&mut self, id: EntityId) -> bool {
        if !self.members.insert(id.clone()) {
            return false;
        }
        self.order.push(id);
        true
    }

    pub fn remove(&mut self, id: &EntityId) -> bool {
        if !self.members.remove(id) {
            return false;
        }
        self.order.retain(|member| member != id);
        true
    }

    #[must_use]
    pub fn contains(&self, id: &EntityId) -> bool {
        self.members.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityId> {
        self.order.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

pub struct Session {
    pub seed: u64,
    pub config: RandomizerConfig,
    pub graph: ProgressionGraph,
    pub rng: SessionRng,
    pub entities: BTreeMap<EntityId, Entity>,
    /// Entity ids in input order; drives every ordered walk.
    pub order: Vec<EntityId>,
    pub biomes: Vec<Biome>,
    pub locations: Vec<LocationItem>,
    pub pool: ReachablePool,
    pub results: ResultStore,
    pub depth: i32,
    pub derived: BTreeMap<EntityId, DerivedUnlock>,
    pub theme: Option<EntityId>,
    pub iteration: u32,
    reachability: ReachabilityModel,
}

impl Session {
    #[must_use]
    pub fn new(
        seed: u64,
        config: RandomizerConfig,
        graph: ProgressionGraph,
        inputs: WorldInputs,
    ) -> Self {
        let reachability = ReachabilityModel::new(&graph, config.max_depth_without_vehicle);
        let order: Vec<EntityId> = inputs.entities.iter().map(|e| e.id.clone()).collect();
        let entities = inputs
            .entities
            .into_iter()
            .map(|entity| (entity.id.clone(), entity))
            .collect();
        let mut results = ResultStore::new();
        results.stats.skipped_records = inputs.rejected.len();
        Self {
            seed,
            config,
            graph,
            rng: SessionRng::from_user_seed(seed),
            entities,
            order,
            biomes: inputs.biomes,
            locations: inputs.locations,
            pool: ReachablePool::default(),
            results,
            depth: 0,
            derived: BTreeMap::new(),
            theme: None,
            iteration: 0,
            reachability,
        }
    }

    #[must_use]
    pub fn entity(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    #[must_use]
    pub fn is_resolved(&self, id: &EntityId) -> bool {
        self.entities.get(id).is_some_and(|entity| entity.resolved)
    }

    /// Ids of every resolved entity.
    #[must_use]
    pub fn unlocked(&self) -> BTreeSet<EntityId> {
        self.entities
            .values()
            .filter(|entity| entity.resolved)
            .map(|entity| entity.id.clone())
            .collect()
    }

    /// Evaluate the depth model against the current unlocked set.
    #[must_use]
    pub fn compute_depth(&self) -> i32 {
        self.reachability
            .compute_depth(&self.unlocked(), self.config.depth_search_time)
    }

    /// Raise the session depth; lower values are ignored.
    pub fn raise_depth(&mut self, depth: i32) -> bool {
        if depth <= self.depth {
            return false;
        }
        log::info!("reachable depth {}m -> {depth}m", self.depth);
        self.results.log(SpoilerEntry::DepthChanged {
            iteration: self.iteration,
            from: self.depth,
            to: depth,
        });
        self.depth = depth;
        self.results.stats.depth_history.push(depth);
        true
    }

    /// Mark an entity resolved at the current depth and expose it as an ingredient.
    pub fn resolve(&mut self, id: &EntityId, priority: bool) -> bool {
        let depth = self.depth;
        let Some(entity) = self.entities.get_mut(id) else {
            return false;
        };
        if !entity.mark_resolved() {
            return false;
        }
        entity.accessible_depth = Some(depth);
        let usable = entity.category.can_be_ingredient() && !entity.is_exhausted();
        if usable {
            self.pool.insert(id.clone());
        }
        self.results.log(SpoilerEntry::Resolved {
            iteration: self.iteration,
            entity: id.clone(),
            depth,
            priority,
        });
        true
    }

    /// Admit every unscheduled entity whose base depth is now reachable.
    /// Returns how many were admitted.
    pub fn admit_reachable(&mut self) -> usize {
        let fragments = self.config.randomise_fragments;
        let depth = self.depth;
        let mut admitted = 0;
        for id in &self.order {
            let Some(entity) = self.entities.get_mut(id) else {
                continue;
            };
            if entity.resolved || entity.needs_scheduling(fragments) || entity.base_depth > depth
            {
                continue;
            }
            entity.resolved = true;
            entity.accessible_depth = Some(entity.base_depth);
            if entity.category.can_be_ingredient() && !entity.is_exhausted() {
                self.pool.insert(id.clone());
            }
            admitted += 1;
        }
        if admitted > 0 {
            log::debug!("admitted {admitted} gathered entities at {depth}m");
        }
        admitted
    }

    /// Entity ids the scheduler must randomize, in input order.
    #[must_use]
    pub fn schedulable(&self) -> Vec<EntityId> {
        let fragments = self.config.randomise_fragments;
        self.order
            .iter()
            .filter(|id| {
                self.entities
                    .get(*id)
                    .is_some_and(|entity| !entity.resolved && entity.needs_scheduling(fragments))
            })
            .cloned()
            .collect()
    }

    /// Effective blueprint depth: the derived databox depth when gated, else the blueprint's own.
    #[must_use]
    pub fn unlock_requirements(&self, entity: &Entity) -> Option<DerivedUnlock> {
        let blueprint = entity.blueprint.as_ref()?;
        if entity.needs_location_item()
            && let Some(derived) = self.derived.get(&entity.id)
        {
            return Some(*derived);
        }
        Some(DerivedUnlock {
            depth: blueprint.unlock_depth,
            needs_laser_cutter: false,
            needs_propulsion_cannon: false,
        })
    }

    /// Pick the shared theme ingredient for base pieces.
    pub fn choose_theme(&mut self) -> Option<EntityId> {
        let candidates: Vec<EntityId> = self
            .pool
            .iter()
            .filter(|id| {
                self.entities.get(*id).is_some_and(|entity| {
                    matches!(
                        entity.category,
                        Category::RawMaterial | Category::CraftedMaterial
                    ) && entity.max_uses == 0
                })
            })
            .cloned()
            .collect();
        if candidates.is_empty() {
            return None;
        }
        let index = self.rng.gen_range(0..candidates.len());
        let theme = candidates[index].clone();
        log::info!("theme ingredient: {theme}");
        self.theme = Some(theme.clone());
        Some(theme)
    }

    /// Remove an ingredient from the pool; when `dependents` is set, also
    /// remove every pooled item whose recipe references it.
    pub fn evict(&mut self, id: &EntityId, dependents: bool) {
        self.pool.remove(id);
        if !dependents {
            return;
        }
        let owners: Vec<EntityId> = self
            .results
            .recipes()
            .filter(|recipe| recipe.contains(id))
            .map(|recipe| recipe.owner.clone())
            .collect();
        for owner in owners {
            if self.pool.remove(&owner) {
                log::debug!("evicted {owner}: its recipe uses exhausted {id}");
            }
        }
    }
}
