//! Fixed confidence constants. This module is the single source of truth;
//! nothing downstream redeclares these values.

/// Literal URL with the service name present in the host.
pub const HIGH: f64 = 0.9;
/// Templated URL where the service-name fragment is derivable.
pub const MEDIUM: f64 = 0.7;
/// Call with a URL sourced from a variable whose value is known to the module.
pub const LOW: f64 = 0.5;
/// Heuristic only. Never used for linking, never admitted to the graph.
pub const GUESS: f64 = 0.3;

/// Minimum confidence for a relation/edge to be admitted to the graph store.
pub const MIN_FOR_GRAPH: f64 = 0.5;
/// Minimum confidence for a call to be eligible for linking at all.
pub const MIN_FOR_LINKING: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
    Guess,
}

impl ConfidenceTier {
    pub const fn as_f64(self) -> f64 {
        match self {
            ConfidenceTier::High => HIGH,
            ConfidenceTier::Medium => MEDIUM,
            ConfidenceTier::Low => LOW,
            ConfidenceTier::Guess => GUESS,
        }
    }
}

impl From<ConfidenceTier> for f64 {
    fn from(tier: ConfidenceTier) -> f64 {
        tier.as_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_match_constants() {
        assert_eq!(ConfidenceTier::High.as_f64(), HIGH);
        assert_eq!(ConfidenceTier::Medium.as_f64(), MEDIUM);
        assert_eq!(ConfidenceTier::Low.as_f64(), LOW);
        assert_eq!(ConfidenceTier::Guess.as_f64(), GUESS);
    }

    #[test]
    fn guess_is_below_linking_threshold() {
        assert!(GUESS < MIN_FOR_LINKING);
    }

    #[test]
    fn low_meets_graph_but_not_linking() {
        assert!(LOW >= MIN_FOR_GRAPH);
        assert!(LOW < MIN_FOR_LINKING);
    }
}
