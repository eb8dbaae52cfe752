//! shift-engine - rule registry and migration pipelines
//!
//! Rules implement [`Rule`] and are registered on a [`RegistryBuilder`]. The
//! frozen [`RuleRegistry`] drives:
//! - the configuration pipeline ([`ConfigPipeline`], [`migrate_config`])
//! - the project runner ([`migrate_project`]) for cross-file reference rewrites
//! - the state pipeline ([`StatePipeline`], [`migrate_state`])
//!
//! # Example
//!
//! ```rust
//! use shift_core::{MigrationContext, MigrationSettings, VersionPair};
//! use shift_engine::{migrate_config, Rule, RuleError, RuleRegistry, TransformResult};
//! use shift_hcl::{toolkit, Block};
//!
//! struct Widget;
//!
//! impl Rule for Widget {
//!     fn name(&self) -> &str {
//!         "widget"
//!     }
//!
//!     fn resource_types(&self) -> &[&str] {
//!         &["acme_widget"]
//!     }
//!
//!     fn versions(&self) -> VersionPair {
//!         VersionPair::new(4, 5)
//!     }
//!
//!     fn transform_config(
//!         &self,
//!         block: &mut Block,
//!         _ctx: &mut MigrationContext,
//!     ) -> Result<TransformResult, RuleError> {
//!         toolkit::block_to_attribute(&mut block.body, "foo", "foo");
//!         Ok(TransformResult::in_place())
//!     }
//! }
//!
//! let registry = RuleRegistry::builder().with_rule(Widget).unwrap().build();
//! let settings = MigrationSettings::new(4, 5);
//! let src = "resource \"acme_widget\" \"w\" {\n  foo {\n    bar = 1\n  }\n}\n";
//!
//! let outcome = migrate_config(&registry, &settings, Some("main.tf"), src).unwrap();
//! assert_eq!(
//!     outcome.output,
//!     "resource \"acme_widget\" \"w\" {\n  foo = {\n    bar = 1\n  }\n}\n"
//! );
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config_pipeline;
pub mod error;
pub mod merge;
pub mod project;
pub mod registry;
pub mod rule;
pub mod stage;
pub mod state_pipeline;

pub use config_pipeline::{
    migrate_config, moved_block, ConfigOutcome, ConfigPipeline, ConfigStats, DispatchedFile,
};
pub use error::{MigrateError, RegistryError, Result, RuleError};
pub use merge::{apply_merge, MergeSpec, MergeStats};
pub use project::{migrate_project, FileFailure, ProjectOutcome, SourceFile};
pub use registry::{RegistryBuilder, RuleRegistry};
pub use rule::{Rule, TransformResult};
pub use stage::ConfigStage;
pub use state_pipeline::{migrate_state, StateOutcome, StatePipeline, StateStats};

/// Prelude module for rule authors
pub mod prelude {
    pub use crate::{MergeSpec, Rule, RuleError, TransformResult};
    pub use shift_core::prelude::*;
    pub use shift_hcl::prelude::*;
    pub use shift_state::prelude::*;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
