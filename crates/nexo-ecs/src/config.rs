//! Coordinator construction parameters.

use serde::{Deserialize, Serialize};

use crate::EcsError;

/// Sizing knobs for a [`Coordinator`](crate::coordinator::Coordinator).
///
/// Deserializable so hosts can load it alongside their own settings:
///
/// ```
/// use nexo_ecs::config::EcsConfig;
///
/// let cfg: EcsConfig = serde_json::from_str(r#"{ "max_entities": 1000 }"#).unwrap();
/// assert_eq!(cfg.max_entities, 1000);
/// assert_eq!(cfg.initial_component_capacity, 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EcsConfig {
    /// Upper bound on simultaneously living entities.
    pub max_entities: u32,
    /// Slots reserved up front in every component array.
    pub initial_component_capacity: usize,
}

impl EcsConfig {
    pub const DEFAULT_MAX_ENTITIES: u32 = 500_000;
    pub const DEFAULT_INITIAL_COMPONENT_CAPACITY: usize = 1024;

    /// Check that the configuration describes a usable coordinator.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if `max_entities` is zero or the
    /// initial capacity exceeds `max_entities`.
    pub fn validate(&self) -> Result<(), EcsError> {
        if self.max_entities == 0 {
            return Err(EcsError::InvalidConfig {
                details: "max_entities must be at least 1".to_owned(),
            });
        }
        if self.initial_component_capacity > self.max_entities as usize {
            return Err(EcsError::InvalidConfig {
                details: format!(
                    "initial_component_capacity ({}) exceeds max_entities ({})",
                    self.initial_component_capacity, self.max_entities
                ),
            });
        }
        Ok(())
    }
}

impl Default for EcsConfig {
    fn default() -> Self {
        Self {
            max_entities: Self::DEFAULT_MAX_ENTITIES,
            initial_component_capacity: Self::DEFAULT_INITIAL_COMPONENT_CAPACITY,
        }
    }
}
