//! Post-run invariants checked against every produced bundle.
use std::collections::{BTreeMap, BTreeSet, HashMap};

use thiserror::Error;
use tidegate_engine::{
    Category, EntityId, EntityRecord, RandomizerConfig, ResultBundle, SpoilerEntry, WorldData,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CheckFailure {
    #[error("recipe {owner} lists {ingredient} more than once")]
    DuplicateIngredient { owner: EntityId, ingredient: EntityId },
    #[error("recipe {owner} uses itself as an ingredient")]
    SelfIngredient { owner: EntityId },
    #[error("recipe {owner} has {count} ingredients (max {max})")]
    TooManyIngredients { owner: EntityId, count: usize, max: u32 },
    #[error("recipe {owner} asks for {amount}x {ingredient} (max {max})")]
    AmountOverCap {
        owner: EntityId,
        ingredient: EntityId,
        amount: u32,
        max: u32,
    },
    #[error("recipe {owner} needs {footprint} inventory cells (max {max})")]
    FootprintOverCap { owner: EntityId, footprint: u32, max: u32 },
    #[error("{ingredient} appears in {count} recipes (cap {cap})")]
    UseCapExceeded {
        ingredient: EntityId,
        count: u32,
        cap: u32,
    },
    #[error("{ingredient} resolved after {owner}, which needs it")]
    IngredientAfterOwner { owner: EntityId, ingredient: EntityId },
    #[error("reachable depth fell from {from}m to {to}m")]
    DepthRegressed { from: i32, to: i32 },
    #[error("fragment {fragment} has no biome placements")]
    EmptySpawn { fragment: EntityId },
    #[error("fragment {fragment} spawns at a zero total rate")]
    ZeroSpawnRate { fragment: EntityId },
    #[error("fragment {fragment} placement in {biome} has {rates} rates for {variants} variants")]
    VariantMismatch {
        fragment: EntityId,
        biome: String,
        rates: usize,
        variants: u32,
    },
    #[error("{assigned} databox locations assigned for {provided} provided")]
    LocationCount { assigned: usize, provided: usize },
}

/// Run every invariant over `bundle`; an empty result means the run is clean.
#[must_use]
pub fn check_bundle(
    bundle: &ResultBundle,
    world: &WorldData,
    config: &RandomizerConfig,
) -> Vec<CheckFailure> {
    let records: HashMap<&EntityId, &EntityRecord> = world
        .entities
        .iter()
        .map(|record| (&record.id, record))
        .collect();

    let mut failures = Vec::new();
    check_recipes(bundle, &records, config, &mut failures);
    check_use_caps(bundle, &records, config, &mut failures);
    check_resolution_order(bundle, &mut failures);
    check_depth(bundle, &mut failures);
    check_spawns(bundle, &records, &mut failures);
    if bundle.locations.len() != world.locations.len() {
        failures.push(CheckFailure::LocationCount {
            assigned: bundle.locations.len(),
            provided: world.locations.len(),
        });
    }
    failures
}

fn check_recipes(
    bundle: &ResultBundle,
    records: &HashMap<&EntityId, &EntityRecord>,
    config: &RandomizerConfig,
    failures: &mut Vec<CheckFailure>,
) {
    // Vanilla recipes are passed through untouched, so only identity rules apply.
    let randomized = config.randomise_recipes;
    for recipe in bundle.recipes.values() {
        let owner = &recipe.owner;
        let mut seen = BTreeSet::new();
        for line in &recipe.ingredients {
            if &line.id == owner {
                failures.push(CheckFailure::SelfIngredient {
                    owner: owner.clone(),
                });
            }
            if !seen.insert(&line.id) {
                failures.push(CheckFailure::DuplicateIngredient {
                    owner: owner.clone(),
                    ingredient: line.id.clone(),
                });
            }
            if randomized && line.amount > config.max_amount_per_ingredient {
                failures.push(CheckFailure::AmountOverCap {
                    owner: owner.clone(),
                    ingredient: line.id.clone(),
                    amount: line.amount,
                    max: config.max_amount_per_ingredient,
                });
            }
        }
        if !randomized {
            continue;
        }

        let count = recipe.ingredients.len();
        if u32::try_from(count).unwrap_or(u32::MAX) > config.max_ingredients {
            failures.push(CheckFailure::TooManyIngredients {
                owner: owner.clone(),
                count,
                max: config.max_ingredients,
            });
        }

        let max = match records.get(owner) {
            Some(record) if record.category == Category::BaseOutpost => {
                config.max_inventory_size.min(config.max_outpost_size)
            }
            _ => config.max_inventory_size,
        };
        let footprint =
            recipe.footprint(|id| records.get(id).map_or(1, |record| record.inventory_size.max(1)));
        if footprint > max {
            failures.push(CheckFailure::FootprintOverCap {
                owner: owner.clone(),
                footprint,
                max,
            });
        }
    }
}

fn check_use_caps(
    bundle: &ResultBundle,
    records: &HashMap<&EntityId, &EntityRecord>,
    config: &RandomizerConfig,
    failures: &mut Vec<CheckFailure>,
) {
    if !config.randomise_recipes {
        return;
    }
    let mut uses: BTreeMap<&EntityId, u32> = BTreeMap::new();
    for recipe in bundle.recipes.values() {
        for line in &recipe.ingredients {
            *uses.entry(&line.id).or_default() += 1;
        }
    }
    for (ingredient, count) in uses {
        let cap = records.get(ingredient).map_or(0, |record| record.max_uses);
        if cap > 0 && count > cap {
            failures.push(CheckFailure::UseCapExceeded {
                ingredient: ingredient.clone(),
                count,
                cap,
            });
        }
    }
}

fn check_resolution_order(bundle: &ResultBundle, failures: &mut Vec<CheckFailure>) {
    let position: HashMap<&EntityId, usize> = bundle
        .resolution_order()
        .enumerate()
        .map(|(index, id)| (id, index))
        .collect();
    for recipe in bundle.recipes.values() {
        let Some(owner_at) = position.get(&recipe.owner) else {
            continue;
        };
        for line in &recipe.ingredients {
            if position.get(&line.id).is_some_and(|at| at > owner_at) {
                failures.push(CheckFailure::IngredientAfterOwner {
                    owner: recipe.owner.clone(),
                    ingredient: line.id.clone(),
                });
            }
        }
    }
}

fn check_depth(bundle: &ResultBundle, failures: &mut Vec<CheckFailure>) {
    for pair in bundle.stats.depth_history.windows(2) {
        if pair[1] < pair[0] {
            failures.push(CheckFailure::DepthRegressed {
                from: pair[0],
                to: pair[1],
            });
        }
    }
    let mut last = i32::MIN;
    for entry in &bundle.spoiler {
        if let SpoilerEntry::DepthChanged { from, to, .. } = entry {
            if *to < *from || *from < last {
                failures.push(CheckFailure::DepthRegressed {
                    from: *from,
                    to: *to,
                });
            }
            last = *to;
        }
    }
}

fn check_spawns(
    bundle: &ResultBundle,
    records: &HashMap<&EntityId, &EntityRecord>,
    failures: &mut Vec<CheckFailure>,
) {
    for (fragment, profile) in &bundle.spawn_profiles {
        if profile.placements.is_empty() {
            failures.push(CheckFailure::EmptySpawn {
                fragment: fragment.clone(),
            });
        } else if profile.total_rate() <= 0.0 {
            failures.push(CheckFailure::ZeroSpawnRate {
                fragment: fragment.clone(),
            });
        }
        let variants = records
            .get(fragment)
            .map_or(1, |record| record.spawn_variants.max(1));
        for placement in &profile.placements {
            if u32::try_from(placement.rates.len()).unwrap_or(u32::MAX) != variants {
                failures.push(CheckFailure::VariantMismatch {
                    fragment: fragment.clone(),
                    biome: placement.biome.clone(),
                    rates: placement.rates.len(),
                    variants,
                });
            }
        }
    }
}
