//! Centralized tuning constants for the randomization engine.
//!
//! The locomotion and oxygen figures are balance values inherited from the
//! progression model; they are kept verbatim rather than derived, since any
//! change shifts every seed's depth curve.

// Scheduler ----------------------------------------------------------------
pub const MAX_SCHEDULER_ITERATIONS: u32 = 3000;
pub const CHECKPOINT_INTERVAL: u32 = 50;

// Locomotion ---------------------------------------------------------------
pub const BASE_SWIM_SPEED: f64 = 4.7;
pub const TRAVERSAL_AID_SPEED: f64 = 11.0;
pub const BASE_BREATH_TIME: f64 = 45.0;
pub const FIN_SPEED_BONUS: f64 = 1.41;
pub const ULTRA_FIN_SPEED_BONUS: f64 = 1.88;

pub const STANDARD_TANK_BREATH: f64 = 75.0;
pub const STANDARD_TANK_PENALTY: f64 = 0.4725;
pub const DOUBLE_TANK_BREATH: f64 = 135.0;
pub const DOUBLE_TANK_PENALTY: f64 = 0.945;
pub const PLASTEEL_TANK_BREATH: f64 = 135.0;
pub const PLASTEEL_TANK_PENALTY: f64 = 0.101_25;
pub const HIGH_CAPACITY_TANK_BREATH: f64 = 225.0;
pub const HIGH_CAPACITY_TANK_PENALTY: f64 = 0.6075;

// Oxygen consumption -------------------------------------------------------
pub const OXYGEN_TIER_ONE_DEPTH: f64 = 100.0;
pub const OXYGEN_TIER_ONE_MULTIPLIER: f64 = 3.0;
pub const OXYGEN_TIER_TWO_DEPTH: f64 = 200.0;
pub const OXYGEN_TIER_TWO_MULTIPLIER: f64 = 5.0;

// Recipes ------------------------------------------------------------------
pub const PRIMARY_VALUE_TOLERANCE: f64 = 0.1;

// Locations ----------------------------------------------------------------
pub const TOOL_MAJORITY_THRESHOLD: f64 = 0.5;

// Fragments ----------------------------------------------------------------
pub const MIN_FRAGMENT_BIOMES: u32 = 3;
pub const SCAN_RATE_BONUS: f64 = 0.05;
pub const DEFAULT_SCANS_TO_UNLOCK: u32 = 4;

// Seeds --------------------------------------------------------------------
pub(crate) const SESSION_STREAM_TAG: &[u8] = b"tidegate-session";
