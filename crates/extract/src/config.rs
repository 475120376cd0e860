use primitives::ConflictPolicy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Upper bound on generate/validate attempts in the repair loop.
    pub max_repair_attempts: usize,
    /// How the record fold resolves present/present conflicts.
    pub conflict_policy: ConflictPolicy,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_repair_attempts: 3,
            conflict_policy: ConflictPolicy::FirstWins,
        }
    }
}
