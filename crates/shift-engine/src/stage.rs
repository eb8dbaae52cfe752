//! Configuration pipeline stages
//!
//! A file moves through the stages strictly forward, one step at a time.

use crate::error::MigrateError;

/// Stage of one configuration file in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigStage {
    Raw,
    Preprocessed,
    Parsed,
    PerBlockTransformed,
    ReferenceRewritten,
    Serialized,
}

impl ConfigStage {
    /// Whether no further transition is possible
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        allowed_transitions(self).is_empty()
    }
}

/// Validates a stage transition
///
/// # Errors
/// Returns [`MigrateError::Stage`] for any transition other than the single
/// next stage.
pub fn validate_transition(from: ConfigStage, to: ConfigStage) -> Result<(), MigrateError> {
    if allowed(from, to) {
        Ok(())
    } else {
        Err(MigrateError::Stage { from, to })
    }
}

pub fn allowed_transitions(from: ConfigStage) -> Vec<ConfigStage> {
    use ConfigStage::*;
    match from {
        Raw => vec![Preprocessed],
        Preprocessed => vec![Parsed],
        Parsed => vec![PerBlockTransformed],
        PerBlockTransformed => vec![ReferenceRewritten],
        ReferenceRewritten => vec![Serialized],
        Serialized => vec![],
    }
}

fn allowed(from: ConfigStage, to: ConfigStage) -> bool {
    allowed_transitions(from).into_iter().any(|s| s == to)
}
