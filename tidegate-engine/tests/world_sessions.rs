use std::collections::{BTreeMap, BTreeSet};

use tidegate_engine::{
    Category, EntityId, ProgressionGraph, RandomizerConfig, RandomizerError, RecipeMode,
    ResultBundle, ScanCountConfig, SpoilerEntry, WorldData, WorldInputs, randomize,
};

const WORLD: &str = include_str!("../assets/data/world.json");

fn load_world() -> WorldData {
    WorldData::from_json(WORLD).unwrap()
}

fn run(seed: u64, config: &RandomizerConfig) -> ResultBundle {
    let world = load_world();
    let graph = world.graph();
    randomize(seed, config, &graph, world.into_inputs().unwrap())
        .unwrap_or_else(|err| panic!("seed {seed} failed: {err}"))
}

fn records_by_id() -> BTreeMap<EntityId, tidegate_engine::EntityRecord> {
    load_world()
        .entities
        .into_iter()
        .map(|record| (record.id.clone(), record))
        .collect()
}

#[test]
fn bundled_world_validates_cleanly() {
    let inputs = load_world().into_inputs().unwrap();
    assert!(inputs.rejected.is_empty(), "{:?}", inputs.rejected);
    assert_eq!(inputs.entities.len(), 80);
    assert_eq!(inputs.biomes.len(), 12);
    assert_eq!(inputs.locations.len(), 11);
}

#[test]
fn same_seed_produces_identical_bundles() {
    let config = RandomizerConfig::default();
    let first = run(0x5EED, &config);
    let second = run(0x5EED, &config);
    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
    assert_eq!(first.fingerprint(), second.fingerprint());
    assert_eq!(first.stats.rng_draws, second.stats.rng_draws);

    let other = run(0x5EEE, &config);
    assert_ne!(first.fingerprint(), other.fingerprint());
}

#[test]
fn sessions_complete_and_reach_the_deepest_tier() {
    let config = RandomizerConfig::default();
    let records = records_by_id();
    let crafted = records
        .values()
        .filter(|record| !record.ingredients.is_empty())
        .count();
    for seed in 0..8 {
        let bundle = run(seed, &config);
        assert_eq!(bundle.recipes.len(), crafted, "seed {seed}");
        assert_eq!(bundle.spawn_profiles.len(), 10, "seed {seed}");
        assert!(bundle.stats.final_depth >= 900, "seed {seed}");
        assert!(bundle.stats.forced_admissions.is_empty(), "seed {seed}");
        assert!(bundle.stats.iterations <= config.max_iterations);
    }
}

#[test]
fn depth_never_decreases() {
    let bundle = run(42, &RandomizerConfig::default());
    let history = &bundle.stats.depth_history;
    assert!(history.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(history.last().copied(), Some(bundle.stats.final_depth));

    let mut last = i32::MIN;
    for entry in &bundle.spoiler {
        if let SpoilerEntry::Resolved { depth, .. } = entry {
            assert!(*depth >= last);
            last = *depth;
        }
    }
}

#[test]
fn recipes_stay_within_structural_limits() {
    let records = records_by_id();
    let size = |id: &EntityId| records.get(id).map_or(1, |record| record.inventory_size);
    for mode in [RecipeMode::Balanced, RecipeMode::Random] {
        let config = RandomizerConfig {
            recipe_mode: mode,
            ..RandomizerConfig::default()
        };
        for seed in 0..4 {
            let bundle = run(seed, &config);
            for recipe in bundle.recipes.values() {
                let ids: BTreeSet<&EntityId> =
                    recipe.ingredients.iter().map(|line| &line.id).collect();
                assert_eq!(ids.len(), recipe.ingredients.len(), "{}", recipe.owner);
                assert!(!ids.contains(&recipe.owner));
                assert!(recipe.ingredients.len() <= 7);
                assert!(recipe.ingredients.iter().all(|line| (1..=5).contains(&line.amount)));

                let owner = &records[&recipe.owner];
                let limit = if owner.category == Category::BaseOutpost { 12 } else { 24 };
                assert!(recipe.footprint(size) <= limit, "{}", recipe.owner);
            }
        }
    }
}

#[test]
fn use_caps_are_respected() {
    let records = records_by_id();
    for seed in 0..6 {
        let bundle = run(seed, &RandomizerConfig::default());
        let mut uses: BTreeMap<&EntityId, u32> = BTreeMap::new();
        for recipe in bundle.recipes.values() {
            for line in &recipe.ingredients {
                *uses.entry(&line.id).or_default() += 1;
            }
        }
        for (id, count) in uses {
            let cap = records[id].max_uses;
            assert!(cap == 0 || count <= cap, "seed {seed}: {id} used {count}/{cap}");
        }
    }
}

#[test]
fn disabled_databoxes_keep_vanilla_locations() {
    let config = RandomizerConfig {
        randomise_databoxes: false,
        ..RandomizerConfig::default()
    };
    let world = load_world();
    let expected: Vec<(EntityId, f64)> = world
        .locations
        .iter()
        .map(|item| (item.unlocks.clone(), item.position.y))
        .collect();
    let bundle = run(3, &config);
    let actual: Vec<(EntityId, f64)> = bundle
        .locations
        .iter()
        .map(|assignment| (assignment.unlocks.clone(), assignment.position.y))
        .collect();
    assert_eq!(actual, expected);
}

#[test]
fn shuffled_databoxes_reuse_every_coordinate() {
    let world = load_world();
    let mut expected: Vec<i64> = world
        .locations
        .iter()
        .map(|item| item.position.y as i64)
        .collect();
    expected.sort_unstable();
    let bundle = run(11, &RandomizerConfig::default());
    let mut actual: Vec<i64> = bundle
        .locations
        .iter()
        .map(|assignment| assignment.position.y as i64)
        .collect();
    actual.sort_unstable();
    assert_eq!(actual, expected);
}

#[test]
fn disabled_fragments_produce_no_spawn_profiles() {
    let config = RandomizerConfig {
        randomise_fragments: false,
        ..RandomizerConfig::default()
    };
    let bundle = run(5, &config);
    assert!(bundle.spawn_profiles.is_empty());
    assert!(bundle.scan_counts.is_empty());
}

#[test]
fn scan_counts_are_drawn_within_bounds() {
    let config = RandomizerConfig {
        scan_counts: ScanCountConfig {
            enabled: true,
            min: 2,
            max: 6,
            ..ScanCountConfig::default()
        },
        ..RandomizerConfig::default()
    };
    let bundle = run(9, &config);
    assert_eq!(bundle.scan_counts.len(), 10);
    assert!(bundle.scan_counts.values().all(|scans| (2..=6).contains(scans)));
    for (fragment, profile) in &bundle.spawn_profiles {
        assert_eq!(profile.scans_required, bundle.scan_counts.get(fragment).copied());
    }
}

#[test]
fn vanilla_recipes_pass_through_unchanged() {
    let config = RandomizerConfig {
        randomise_recipes: false,
        ..RandomizerConfig::default()
    };
    let records = records_by_id();
    let bundle = run(13, &config);
    for recipe in bundle.recipes.values() {
        let vanilla: Vec<(&EntityId, u32)> = records[&recipe.owner]
            .ingredients
            .iter()
            .map(|line| (&line.id, line.amount))
            .collect();
        let actual: Vec<(&EntityId, u32)> = recipe
            .ingredients
            .iter()
            .map(|line| (&line.id, line.amount))
            .collect();
        assert_eq!(actual, vanilla, "{}", recipe.owner);
    }
}

#[test]
fn unreachable_milestone_is_reported() {
    let world = load_world();
    let mut graph = world.graph();
    if let Some(milestone) = graph.milestones.last_mut() {
        milestone.depth = 5000;
    }
    let mut inputs: WorldInputs = world.into_inputs().unwrap();
    for entity in &mut inputs.entities {
        if matches!(entity.id.as_str(), "exosuit" | "cyclops")
            && let Some(blueprint) = entity.blueprint.as_mut()
        {
            blueprint.unlock_depth = 5000;
        }
    }
    let config = RandomizerConfig {
        max_iterations: 400,
        ..RandomizerConfig::default()
    };
    let err = randomize(1, &config, &graph, inputs).unwrap_err();
    match err {
        RandomizerError::Unsatisfiable { stuck, .. } => {
            assert!(
                stuck.iter().any(|id| id.as_str() == "exosuit" || id.as_str() == "cyclops"),
                "{stuck:?}"
            );
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn custom_progression_graph_is_accepted() {
    let world = load_world();
    let graph = ProgressionGraph::from_json(
        r#"{
            "milestones": [
                {"depth": 0, "essential": ["seaglide", "builder"]},
                {"depth": 100, "essential": ["seamoth", "rebreather"]},
                {"depth": 200, "essential": ["vehiclehullmodule1", "lasercutter"]},
                {"depth": 300, "essential": ["vehiclehullmodule2", "propulsioncannon"]}
            ],
            "vehicle_tiers": [
                {"requires": ["seamoth"], "depth": 200},
                {"requires": ["seamoth", "vehiclehullmodule1"], "depth": 300},
                {"requires": ["seamoth", "vehiclehullmodule1", "vehiclehullmodule2"], "depth": 500},
                {"requires": ["cyclops"], "depth": 500},
                {"requires": ["exosuit"], "depth": 900}
            ]
        }"#,
    )
    .unwrap();
    let bundle = randomize(
        21,
        &RandomizerConfig::default(),
        &graph,
        world.into_inputs().unwrap(),
    )
    .unwrap();
    assert!(bundle.stats.final_depth >= 500);
}
