//! Fragment spawn distribution across biomes.
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::{MIN_FRAGMENT_BIOMES, SCAN_RATE_BONUS};
use crate::entity::{BiomePlacement, EntityId, SpawnProfile};
use crate::error::RandomizerError;
use crate::session::Session;

/// A spawn region with its base fragment rate and saturation counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Biome {
    pub name: String,
    #[serde(default)]
    pub region_depth: i32,
    /// `None` marks a biome that never hosts fragments.
    #[serde(default)]
    pub fragment_rate: Option<f64>,
    /// Physical spawn slots; 0 leaves only the configured saturation cap.
    #[serde(default)]
    pub slots: u32,
    #[serde(default, skip_serializing)]
    pub used: u32,
}

impl Biome {
    #[must_use]
    pub fn base_rate(&self) -> Option<f64> {
        self.fragment_rate.filter(|rate| *rate > 0.0)
    }

    #[must_use]
    pub const fn capacity(&self, max_kinds: u32) -> u32 {
        if self.slots > 0 && self.slots < max_kinds {
            self.slots
        } else {
            max_kinds
        }
    }

    #[must_use]
    pub const fn is_saturated(&self, max_kinds: u32) -> bool {
        self.used >= self.capacity(max_kinds)
    }
}

pub struct SpawnDistributor;

impl SpawnDistributor {
    /// Pick biomes for one fragment and assign per-variant spawn rates.
    ///
    /// # Errors
    ///
    /// Returns `RandomizerError::NoEligibleBiome` when no biome carries a
    /// base fragment rate.
    pub fn distribute(
        fragment: &EntityId,
        depth: i32,
        scans_needed: u32,
        session: &mut Session,
    ) -> Result<SpawnProfile, RandomizerError> {
        let max_kinds = session.config.max_fragment_kinds_per_biome;
        let max_biomes = session
            .config
            .max_biomes_per_fragment
            .max(MIN_FRAGMENT_BIOMES);
        let multiplier = session.config.fragment_rate_multiplier;
        let default_scans = session.config.scan_counts.default_scans;
        let variants = session
            .entities
            .get(fragment)
            .map_or(1, |entity| entity.spawn_variants.max(1));

        let wanted = session.rng.gen_range(MIN_FRAGMENT_BIOMES..=max_biomes);
        let scan_bonus = if scans_needed > default_scans {
            1.0 + SCAN_RATE_BONUS * f64::from(scans_needed - default_scans)
        } else {
            1.0
        };

        let mut pool = Self::eligible(session, depth, max_kinds);
        let count = usize::try_from(wanted).map_or(pool.len(), |wanted| wanted.min(pool.len()));
        let mut placements = Vec::with_capacity(count);
        for _ in 0..count {
            let index = pool.swap_remove(session.rng.gen_range(0..pool.len()));
            let biome = &mut session.biomes[index];
            let base = biome.base_rate().unwrap_or(0.0);
            biome.used = biome.used.saturating_add(1);
            let rate = (multiplier + session.rng.r#gen::<f64>()) * base * scan_bonus;
            placements.push(BiomePlacement {
                biome: biome.name.clone(),
                rates: split_rate(rate, variants, &mut session.rng),
            });
        }

        if placements.is_empty() {
            return Err(RandomizerError::NoEligibleBiome {
                entity: fragment.clone(),
            });
        }
        log::debug!(
            "fragment {fragment} placed in {} biome(s) at depth {depth}m",
            placements.len()
        );
        Ok(SpawnProfile {
            fragment: fragment.clone(),
            placements,
            scans_required: session.config.scan_counts.enabled.then_some(scans_needed),
        })
    }

    /// Biome indices a fragment may land in: unsaturated biomes within
    /// `depth`, or every rated biome when none qualify.
    fn eligible(session: &Session, depth: i32, max_kinds: u32) -> Vec<usize> {
        let rated = || {
            session
                .biomes
                .iter()
                .enumerate()
                .filter(|(_, biome)| biome.base_rate().is_some())
        };
        let restricted: Vec<usize> = rated()
            .filter(|(_, biome)| biome.region_depth <= depth && !biome.is_saturated(max_kinds))
            .map(|(index, _)| index)
            .collect();
        if restricted.is_empty() {
            rated().map(|(index, _)| index).collect()
        } else {
            restricted
        }
    }
}

/// Split a rate across `variants` spawn variants with random weights.
pub fn split_rate<R: Rng + ?Sized>(rate: f64, variants: u32, rng: &mut R) -> Vec<f64> {
    if variants <= 1 {
        return vec![rate];
    }
    let weights: Vec<f64> = (0..variants).map(|_| rng.r#gen::<f64>()).collect();
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        let even = rate / f64::from(variants);
        return vec![even; weights.len()];
    }
    weights.iter().map(|weight| weight / total * rate).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RandomizerConfig;
    use crate::data::WorldInputs;
    use crate::entity::{Category, Entity};
    use crate::progression::ProgressionGraph;
    use crate::rng::SessionRng;
    use std::collections::BTreeSet;

    fn biome(name: &str, region_depth: i32, fragment_rate: Option<f64>) -> Biome {
        Biome {
            name: name.to_string(),
            region_depth,
            fragment_rate,
            slots: 0,
            used: 0,
        }
    }

    fn fragment() -> EntityId {
        EntityId::new("seaglidefragment")
    }

    fn session(seed: u64, config: RandomizerConfig, biomes: Vec<Biome>) -> Session {
        let inputs = WorldInputs {
            entities: vec![Entity::new(fragment(), Category::Fragment)],
            biomes,
            ..WorldInputs::default()
        };
        Session::new(seed, config, ProgressionGraph::vanilla(), inputs)
    }

    fn names(profile: &SpawnProfile) -> Vec<&str> {
        profile
            .placements
            .iter()
            .map(|placement| placement.biome.as_str())
            .collect()
    }

    #[test]
    fn biome_count_stays_within_bounds() {
        let biomes: Vec<Biome> = (0..8)
            .map(|index| biome(&format!("shallows{index}"), 0, Some(0.2)))
            .collect();
        let config = RandomizerConfig {
            max_biomes_per_fragment: 5,
            ..RandomizerConfig::default()
        };
        for seed in 0..30 {
            let mut session = session(seed, config.clone(), biomes.clone());
            let profile = SpawnDistributor::distribute(&fragment(), 0, 4, &mut session).unwrap();
            let chosen = names(&profile);
            assert!((3..=5).contains(&chosen.len()), "seed {seed}: {chosen:?}");
            let distinct: BTreeSet<&str> = chosen.iter().copied().collect();
            assert_eq!(distinct.len(), chosen.len());
        }
    }

    #[test]
    fn short_shallow_pool_never_spills_into_deep_biomes() {
        let biomes = vec![
            biome("shallow_a", 0, Some(0.2)),
            biome("shallow_b", 0, Some(0.2)),
            biome("deep_c", 800, Some(0.2)),
            biome("deep_d", 900, Some(0.2)),
        ];
        let config = RandomizerConfig {
            max_biomes_per_fragment: 3,
            ..RandomizerConfig::default()
        };
        for seed in 0..20 {
            let mut session = session(seed, config.clone(), biomes.clone());
            let profile = SpawnDistributor::distribute(&fragment(), 0, 4, &mut session).unwrap();
            let mut chosen = names(&profile);
            chosen.sort_unstable();
            assert_eq!(chosen, vec!["shallow_a", "shallow_b"], "seed {seed}");
        }
    }

    #[test]
    fn unreachable_biomes_are_used_when_nothing_shallow_qualifies() {
        let biomes = vec![
            biome("crashzone", 0, None),
            biome("lostriver", 500, Some(0.1)),
            biome("bloodkelp", 400, Some(0.1)),
            biome("dunes", 300, Some(0.1)),
        ];
        let mut session = session(2, RandomizerConfig::default(), biomes);
        let profile = SpawnDistributor::distribute(&fragment(), 0, 4, &mut session).unwrap();
        let mut chosen = names(&profile);
        chosen.sort_unstable();
        assert_eq!(chosen, vec!["bloodkelp", "dunes", "lostriver"]);
    }

    #[test]
    fn rateless_world_has_no_eligible_biome() {
        let biomes = vec![biome("crashzone", 0, None)];
        let mut session = session(2, RandomizerConfig::default(), biomes);
        assert!(matches!(
            SpawnDistributor::distribute(&fragment(), 0, 4, &mut session),
            Err(RandomizerError::NoEligibleBiome { entity }) if entity == fragment()
        ));
    }

    #[test]
    fn saturated_biomes_leave_the_pool() {
        let biomes: Vec<Biome> = [
            "safeshallows",
            "kelpforest",
            "grassyplateaus",
            "jellyshroom",
            "mushroomforest",
            "sparsereef",
        ]
        .iter()
        .map(|name| biome(name, 0, Some(0.2)))
        .collect();
        let config = RandomizerConfig {
            max_biomes_per_fragment: 3,
            max_fragment_kinds_per_biome: 1,
            ..RandomizerConfig::default()
        };
        let mut session = session(4, config, biomes);
        let first = SpawnDistributor::distribute(&fragment(), 0, 4, &mut session).unwrap();
        let second = SpawnDistributor::distribute(&fragment(), 0, 4, &mut session).unwrap();
        assert_eq!(first.placements.len(), 3);
        assert_eq!(second.placements.len(), 3);
        let first: BTreeSet<&str> = names(&first).into_iter().collect();
        assert!(names(&second).iter().all(|name| !first.contains(name)));
        assert!(session.biomes.iter().all(|biome| biome.used == 1));
    }

    #[test]
    fn slot_limited_biome_is_skipped_once_full() {
        let mut full = biome("safeshallows", 0, Some(0.2));
        full.slots = 1;
        full.used = 1;
        let biomes = vec![
            full,
            biome("kelpforest", 0, Some(0.2)),
            biome("grassyplateaus", 0, Some(0.2)),
            biome("sparsereef", 0, Some(0.2)),
        ];
        for seed in 0..10 {
            let mut session = session(seed, RandomizerConfig::default(), biomes.clone());
            let profile = SpawnDistributor::distribute(&fragment(), 0, 4, &mut session).unwrap();
            assert!(!names(&profile).contains(&"safeshallows"), "seed {seed}");
        }
    }

    #[test]
    fn extra_scans_raise_spawn_rates() {
        let biomes: Vec<Biome> = (0..4)
            .map(|index| biome(&format!("reef{index}"), 0, Some(0.25)))
            .collect();
        let mut vanilla = session(8, RandomizerConfig::default(), biomes.clone());
        let mut harder = session(8, RandomizerConfig::default(), biomes);
        let base = SpawnDistributor::distribute(&fragment(), 0, 4, &mut vanilla).unwrap();
        let boosted = SpawnDistributor::distribute(&fragment(), 0, 8, &mut harder).unwrap();
        assert_eq!(names(&base), names(&boosted));
        let expected = base.total_rate() * (1.0 + SCAN_RATE_BONUS * 4.0);
        assert!((boosted.total_rate() - expected).abs() < 1e-9);
    }

    #[test]
    fn split_rate_preserves_total() {
        let mut rng = SessionRng::from_user_seed(11);
        let parts = split_rate(0.6, 3, &mut rng);
        assert_eq!(parts.len(), 3);
        assert!(parts.iter().all(|part| *part >= 0.0));
        let total: f64 = parts.iter().sum();
        assert!((total - 0.6).abs() < 1e-6);
    }

    #[test]
    fn single_variant_keeps_rate() {
        let mut rng = SessionRng::from_user_seed(11);
        assert_eq!(split_rate(0.25, 1, &mut rng), vec![0.25]);
        assert_eq!(rng.draws(), 0);
    }

    #[test]
    fn slots_tighten_saturation_cap() {
        let mut biome = Biome {
            name: "kelpforest".into(),
            region_depth: 50,
            fragment_rate: Some(0.2),
            slots: 2,
            used: 0,
        };
        assert_eq!(biome.capacity(5), 2);
        biome.used = 2;
        assert!(biome.is_saturated(5));
        biome.slots = 0;
        assert!(!biome.is_saturated(5));
    }

    #[test]
    fn rateless_biomes_have_no_base_rate() {
        let biome = Biome {
            name: "crashzone".into(),
            region_depth: 0,
            fragment_rate: None,
            slots: 0,
            used: 0,
        };
        assert!(biome.base_rate().is_none());
    }
}
