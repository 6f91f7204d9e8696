use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tidegate_engine::{RandomizerConfig, RecipeMode, ResultBundle, WorldData, randomize};

use super::checks::check_bundle;

/// A named configuration swept across seeds.
#[derive(Debug, Clone)]
pub struct SessionPlan {
    pub name: String,
    pub config: RandomizerConfig,
}

impl SessionPlan {
    #[must_use]
    pub fn for_strategy(base: &RandomizerConfig, mode: RecipeMode) -> Self {
        let name = match mode {
            RecipeMode::Balanced => "balanced",
            RecipeMode::Random => "random",
        };
        Self {
            name: name.to_string(),
            config: RandomizerConfig {
                recipe_mode: mode,
                ..base.clone()
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedResult {
    pub plan_name: String,
    pub seed: u64,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    /// Deepest depth reached by the last successful run.
    pub final_depth: Option<i32>,
    pub fingerprint: Option<u64>,
}

#[derive(Clone)]
pub struct SessionTester {
    world: Arc<WorldData>,
    verbose: bool,
}

impl SessionTester {
    pub const fn new(world: Arc<WorldData>, verbose: bool) -> Self {
        Self { world, verbose }
    }

    /// Run `iterations` consecutive seeds starting at `seed`, each twice.
    pub fn run_plan(&self, plan: &SessionPlan, seed: u64, iterations: usize) -> SeedResult {
        if self.verbose {
            println!(
                "🧪 Testing plan: {} (seed: {seed})",
                plan.name.bright_white()
            );
        }

        let mut successes = 0;
        let mut failures = Vec::new();
        let mut performance_data = Vec::new();
        let mut last_bundle: Option<ResultBundle> = None;

        for i in 0..iterations {
            let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));
            let start_time = Instant::now();
            match self.run_iteration(plan, iteration_seed) {
                Ok(bundle) => {
                    successes += 1;
                    let duration = start_time.elapsed();
                    performance_data.push(duration);
                    if self.verbose {
                        println!(
                            "  ✅ Iteration {}/{iterations} passed ({duration:?}) depth:{}m steps:{}",
                            i + 1,
                            bundle.stats.final_depth,
                            bundle.stats.iterations
                        );
                    }
                    last_bundle = Some(bundle);
                }
                Err(err) => {
                    if self.verbose {
                        println!(
                            "  ❌ Iteration {}/{iterations} failed: {}",
                            i + 1,
                            err.clone().red()
                        );
                    }
                    failures.push(format!(
                        "Iteration {} (plan {}, seed {iteration_seed}): {err}",
                        i + 1,
                        plan.name
                    ));
                }
            }
        }

        let average_duration = if performance_data.is_empty() {
            Duration::ZERO
        } else {
            performance_data.iter().sum::<Duration>()
                / u32::try_from(performance_data.len()).unwrap_or(1)
        };

        SeedResult {
            plan_name: plan.name.clone(),
            seed,
            passed: failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: successes,
            failures,
            average_duration,
            final_depth: last_bundle.as_ref().map(|bundle| bundle.stats.final_depth),
            fingerprint: last_bundle.as_ref().map(ResultBundle::fingerprint),
        }
    }

    fn run_iteration(&self, plan: &SessionPlan, seed: u64) -> Result<ResultBundle, String> {
        let first = self.session(plan, seed)?;
        let second = self.session(plan, seed)?;
        if first.fingerprint() != second.fingerprint() {
            return Err(format!(
                "non-deterministic output: {:016x} vs {:016x}",
                first.fingerprint(),
                second.fingerprint()
            ));
        }

        let violations = check_bundle(&first, &self.world, &plan.config);
        if let Some(violation) = violations.first() {
            let extra = violations.len() - 1;
            return Err(if extra == 0 {
                violation.to_string()
            } else {
                format!("{violation} (+{extra} more)")
            });
        }
        Ok(first)
    }

    fn session(&self, plan: &SessionPlan, seed: u64) -> Result<ResultBundle, String> {
        let world = WorldData::clone(&self.world);
        let graph = world.graph();
        let inputs = world.into_inputs().map_err(|err| err.to_string())?;
        randomize(seed, &plan.config, &graph, inputs).map_err(|err| err.to_string())
    }
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}
