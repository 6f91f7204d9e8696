use anyhow::{Context, Result, bail};
use std::collections::HashSet;

/// Seed used when no tokens are given.
pub const DEFAULT_SEED: u64 = 1337;

/// Largest range a single `a..b` token may expand to.
const MAX_RANGE_SEEDS: u64 = 10_000;

/// Resolve a list of CLI seed arguments into concrete session seeds.
///
/// Supports decimal integers (negative values use their magnitude),
/// `0x` hexadecimal literals, and half-open ranges such as `10..20`.
/// Duplicates are dropped while keeping first-seen order.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<u64>> {
    let mut pending: Vec<u64> = Vec::new();

    for token in tokens {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        if let Some((start, end)) = token.split_once("..") {
            pending.extend(expand_range(token, start, end)?);
            continue;
        }

        pending.push(parse_single(token)?);
    }

    let mut seen = HashSet::new();
    let mut deduped: Vec<u64> = pending.into_iter().filter(|seed| seen.insert(*seed)).collect();

    if deduped.is_empty() {
        deduped.push(DEFAULT_SEED);
    }

    Ok(deduped)
}

fn parse_single(token: &str) -> Result<u64> {
    if let Some(hex) = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
    {
        return u64::from_str_radix(hex, 16)
            .with_context(|| format!("invalid hexadecimal seed: {token}"));
    }

    if let Ok(value) = token.parse::<i64>() {
        return Ok(value.unsigned_abs());
    }

    if let Ok(value) = token.parse::<u64>() {
        return Ok(value);
    }

    bail!("Unrecognized seed token: {token}");
}

fn expand_range(token: &str, start: &str, end: &str) -> Result<Vec<u64>> {
    let start = parse_single(start).with_context(|| format!("bad range start in {token}"))?;
    let end = parse_single(end).with_context(|| format!("bad range end in {token}"))?;
    if end <= start {
        bail!("Empty seed range: {token}");
    }
    if end - start > MAX_RANGE_SEEDS {
        bail!("Seed range {token} exceeds {MAX_RANGE_SEEDS} seeds");
    }
    Ok((start..end).collect())
}
