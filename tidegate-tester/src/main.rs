mod logic;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;

use logic::{SeedResult, SessionPlan, SessionTester, resolve_seed_inputs};
use tidegate_engine::{RandomizerConfig, RecipeMode, WorldData};

const BUNDLED_WORLD: &str = include_str!("../../tidegate-engine/assets/data/world.json");

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StrategyChoice {
    /// Value-targeting recipes
    Balanced,
    /// Unweighted recipes
    Random,
    /// Sweep both strategies
    Both,
}

impl StrategyChoice {
    fn modes(self) -> Vec<RecipeMode> {
        match self {
            Self::Balanced => vec![RecipeMode::Balanced],
            Self::Random => vec![RecipeMode::Random],
            Self::Both => vec![RecipeMode::Balanced, RecipeMode::Random],
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "tidegate-tester", version = "0.1.0")]
#[command(about = "Seed sweeps and invariant checks for the Tidegate randomizer")]
struct Args {
    /// Seeds to run (comma-separated; accepts 0x hex and a..b ranges)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Consecutive seeds run per listed seed
    #[arg(long, default_value_t = 3)]
    iterations: usize,

    /// Recipe strategy to sweep
    #[arg(long, value_enum, default_value_t = StrategyChoice::Both)]
    strategy: StrategyChoice,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// World document to randomize (defaults to the bundled sample world)
    #[arg(long)]
    world: Option<PathBuf>,

    /// Randomizer configuration JSON; missing fields take their defaults
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    announce_banner();

    let start_time = Instant::now();
    let seeds = resolve_seed_inputs(&split_csv(&args.seeds))?;
    let world = Arc::new(load_world(args.world.as_deref()).await?);
    let base = load_config(args.config.as_deref()).await?;
    base.validate()?;
    log::info!(
        "sweeping {} seeds x {} iterations over {} entities",
        seeds.len(),
        args.iterations,
        world.entities.len()
    );

    let plans: Vec<SessionPlan> = args
        .strategy
        .modes()
        .into_iter()
        .map(|mode| SessionPlan::for_strategy(&base, mode))
        .collect();
    let tester = SessionTester::new(world, args.verbose);

    let results = run_sweep(&tester, &plans, &seeds, args.iterations).await?;
    write_reports(&args, &results, start_time)?;

    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn announce_banner() {
    println!("{}", "🌊 Tidegate Seed Tester".bright_cyan().bold());
    println!("{}", "=======================".cyan());
}

fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

async fn load_world(path: Option<&Path>) -> Result<WorldData> {
    let Some(path) = path else {
        return WorldData::from_json(BUNDLED_WORLD).context("bundled world is malformed");
    };
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    WorldData::from_json(&json).with_context(|| format!("failed to parse {}", path.display()))
}

async fn load_config(path: Option<&Path>) -> Result<RandomizerConfig> {
    let Some(path) = path else {
        return Ok(RandomizerConfig::default());
    };
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("failed to parse {}", path.display()))
}

/// Run every plan and seed on the blocking pool, returning results in plan then seed order.
async fn run_sweep(
    tester: &SessionTester,
    plans: &[SessionPlan],
    seeds: &[u64],
    iterations: usize,
) -> Result<Vec<SeedResult>> {
    println!("{}", "🧠 Running Seed Sweeps".bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());

    let mut jobs = JoinSet::new();
    for (plan_index, plan) in plans.iter().enumerate() {
        for (seed_index, &seed) in seeds.iter().enumerate() {
            let tester = tester.clone();
            let plan = plan.clone();
            jobs.spawn_blocking(move || {
                (
                    (plan_index, seed_index),
                    tester.run_plan(&plan, seed, iterations),
                )
            });
        }
    }

    let mut finished = Vec::with_capacity(plans.len() * seeds.len());
    while let Some(joined) = jobs.join_next().await {
        let (order, result) = joined.context("seed worker panicked")?;
        let marker = if result.passed { "✅" } else { "❌" };
        println!("{marker} [{} seed {}]", result.plan_name, result.seed);
        finished.push((order, result));
    }
    finished.sort_by_key(|(order, _)| *order);
    Ok(finished.into_iter().map(|(_, result)| result).collect())
}

fn write_reports(args: &Args, results: &[SeedResult], start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => logic::reports::generate_json_report(&mut output_target, results)?,
        "markdown" => logic::reports::generate_markdown_report(&mut output_target, results)?,
        _ => {
            let duration = start_time.elapsed();
            logic::reports::generate_console_report(&mut output_target, results, duration)?;
            writeln!(&mut output_target)?;
            writeln!(&mut output_target, "🏁 Total time: {duration:?}")?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_csv_trims_and_skips_blanks() {
        assert_eq!(split_csv(" 1, ,0x2 ,3..5"), vec!["1", "0x2", "3..5"]);
    }

    #[test]
    fn strategy_choice_expands() {
        assert_eq!(StrategyChoice::Both.modes().len(), 2);
        assert_eq!(StrategyChoice::Random.modes(), vec![RecipeMode::Random]);
    }

    #[tokio::test]
    async fn bundled_world_and_default_config_load() {
        let world = load_world(None).await.unwrap();
        assert_eq!(world.entities.len(), 80);
        let config = load_config(None).await.unwrap();
        assert_eq!(config, RandomizerConfig::default());
    }

    #[tokio::test]
    async fn sweep_orders_results_by_plan_then_seed() {
        let world = Arc::new(load_world(None).await.unwrap());
        let tester = SessionTester::new(world, false);
        let base = RandomizerConfig::default();
        let plans = vec![
            SessionPlan::for_strategy(&base, RecipeMode::Balanced),
            SessionPlan::for_strategy(&base, RecipeMode::Random),
        ];
        let results = run_sweep(&tester, &plans, &[9, 4], 1).await.unwrap();
        let order: Vec<(&str, u64)> = results
            .iter()
            .map(|r| (r.plan_name.as_str(), r.seed))
            .collect();
        assert_eq!(
            order,
            vec![("balanced", 9), ("balanced", 4), ("random", 9), ("random", 4)]
        );
    }
}
