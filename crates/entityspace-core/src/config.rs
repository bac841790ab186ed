use serde::{Deserialize, Serialize};

///
/// CoreConfig
///
/// Tunables for the core. Every field has a default, so partial config
/// documents deserialize.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Deepest expansion nesting the parser accepts.
    pub max_expansion_depth: usize,
}

impl CoreConfig {
    pub const DEFAULT_MAX_EXPANSION_DEPTH: usize = 32;
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            max_expansion_depth: Self::DEFAULT_MAX_EXPANSION_DEPTH,
        }
    }
}
