//! Config validation: unknown-key detection with Levenshtein suggestions
//! and plausibility checks.
//!
//! Two-pass parse approach: first parse raw TOML into `toml::Value`, walk the
//! key tree, compare against known field names, and emit warnings with
//! "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for `CalibrationConfig`.
///
/// Maintained by hand to match the struct hierarchy in calibration.rs.
/// Any new field added there must be added here too.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [model]
        "model",
        "model.order_slope",
        "model.intercept",
        "model.residual_sigma",
        "model.critical_efficiency_factor",
        // [ratio]
        "ratio",
        "ratio.optimal_min",
        "ratio.optimal_max",
        "ratio.critical",
        "ratio.low_activation",
        // [peak]
        "peak",
        "peak.start_hour",
        "peak.end_hour",
        // [income]
        "income",
        "income.base_share",
        // [hops]
        "hops",
        "hops.trajectories",
        "hops.grid_points",
        "hops.orders_min",
        "hops.orders_max",
        "hops.seed",
        // [paths]
        "paths",
        "paths.raw",
        "paths.processed",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Closest known key within edit distance 3, ties broken alphabetically.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (levenshtein(unknown, k), k))
        .filter(|(dist, _)| *dist <= 3)
        .min()
        .map(|(_, k)| k.to_string())
}

/// Report every key in `raw_toml` that `CalibrationConfig` does not know.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are reported by serde later
    };

    let known = known_config_keys();
    let mut found = walk_toml_keys(&value, "");
    found.sort();

    found
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Plausibility Checks
// ============================================================================

/// Flag values that are legal but unlikely to be intended.
pub fn validate_plausible_ranges(config: &super::CalibrationConfig) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let mut push = |field: &str, message: String| {
        warnings.push(ValidationWarning {
            field: field.to_string(),
            message,
            suggestion: None,
        });
    };

    if config.model.order_slope <= 0.0 {
        push(
            "model.order_slope",
            format!(
                "model.order_slope = {} means extra orders never add profit",
                config.model.order_slope
            ),
        );
    }
    if config.ratio.optimal_min < 1.0 {
        push(
            "ratio.optimal_min",
            format!(
                "ratio.optimal_min = {:.2} is below parity (platform km shorter than real km)",
                config.ratio.optimal_min
            ),
        );
    }
    if config.peak.end_hour - config.peak.start_hour > 12 {
        push(
            "peak",
            format!(
                "peak window [{}, {}) spans more than half a day",
                config.peak.start_hour, config.peak.end_hour
            ),
        );
    }
    if config.hops.trajectories > 10_000 {
        push(
            "hops.trajectories",
            format!(
                "hops.trajectories = {} will make simulation output very large",
                config.hops.trajectories
            ),
        );
    }

    warnings
}
