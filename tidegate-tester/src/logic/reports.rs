use anyhow::Result;
use colored::Colorize;
use std::io::Write;
use std::time::Duration;

use super::SeedResult;

pub fn generate_console_report<W: Write + ?Sized>(
    out: &mut W,
    results: &[SeedResult],
    total_duration: Duration,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Seed Sweep Results Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "==============================".cyan())?;

    let total = results.len();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = total - passed;

    writeln!(out, "Total seeds: {total}")?;
    writeln!(out, "Passed: {}", passed.to_string().green())?;
    writeln!(out, "Failed: {}", failed.to_string().red())?;
    #[allow(clippy::cast_precision_loss)]
    let success_rate = if total == 0 {
        0.0
    } else {
        (passed as f64 / total as f64) * 100.0
    };
    writeln!(out, "Success rate: {success_rate:.1}%")?;
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;

    for result in results {
        let status = if result.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };
        writeln!(
            out,
            "{status} {} seed {}",
            result.plan_name.bold(),
            result.seed
        )?;
        writeln!(
            out,
            "   Iterations: {}/{} successful",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(out, "   Average time: {:?}", result.average_duration)?;
        if let Some(depth) = result.final_depth {
            writeln!(out, "   Final depth: {depth}m")?;
        }
        if let Some(fingerprint) = result.fingerprint {
            writeln!(out, "   Fingerprint: {fingerprint:016x}")?;
        }
        if !result.failures.is_empty() {
            writeln!(out, "   Failures:")?;
            for failure in &result.failures {
                writeln!(out, "     • {}", failure.red())?;
            }
        }
        writeln!(out)?;
    }

    let fastest = results.iter().min_by_key(|r| r.average_duration);
    let slowest = results.iter().max_by_key(|r| r.average_duration);
    if let (Some(fastest), Some(slowest)) = (fastest, slowest) {
        writeln!(out, "{}", "⚡ Performance Summary".bright_yellow().bold())?;
        writeln!(out, "{}", "=====================".yellow())?;
        writeln!(
            out,
            "Fastest: {} seed {} ({:?})",
            fastest.plan_name.green(),
            fastest.seed,
            fastest.average_duration
        )?;
        writeln!(
            out,
            "Slowest: {} seed {} ({:?})",
            slowest.plan_name.yellow(),
            slowest.seed,
            slowest.average_duration
        )?;
    }
    Ok(())
}

pub fn generate_json_report<W: Write + ?Sized>(out: &mut W, results: &[SeedResult]) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, results)?;
    writeln!(out)?;
    Ok(())
}

pub fn generate_markdown_report<W: Write + ?Sized>(
    out: &mut W,
    results: &[SeedResult],
) -> Result<()> {
    writeln!(out, "# Tidegate Seed Sweep Results\n")?;

    let total = results.len();
    let passed = results.iter().filter(|r| r.passed).count();

    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Total seeds**: {total}")?;
    writeln!(out, "- **Passed**: {passed}")?;
    writeln!(out, "- **Failed**: {}\n", total - passed)?;

    writeln!(out, "## Detailed Results\n")?;
    writeln!(out, "| Status | Plan | Seed | Iterations | Final depth | Fingerprint |")?;
    writeln!(out, "|---|---|---|---|---|---|")?;
    for result in results {
        let status = if result.passed { "✅" } else { "❌" };
        let depth = result
            .final_depth
            .map_or_else(|| "-".to_string(), |depth| format!("{depth}m"));
        let fingerprint = result
            .fingerprint
            .map_or_else(|| "-".to_string(), |value| format!("`{value:016x}`"));
        writeln!(
            out,
            "| {status} | {} | {} | {}/{} | {depth} | {fingerprint} |",
            result.plan_name, result.seed, result.successful_iterations, result.iterations_run
        )?;
    }

    let failing: Vec<&SeedResult> = results.iter().filter(|r| !r.failures.is_empty()).collect();
    if !failing.is_empty() {
        writeln!(out, "\n## Failures\n")?;
        for result in failing {
            writeln!(out, "### {} seed {}\n", result.plan_name, result.seed)?;
            for failure in &result.failures {
                writeln!(out, "- {failure}")?;
            }
            writeln!(out)?;
        }
    }
    Ok(())
}
