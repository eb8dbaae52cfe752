//! shift-core - shared vocabulary of the migration engine
//!
//! Everything a migration run carries between components lives here:
//! - [`Diagnostic`]s: the only channel used to report information loss
//! - [`MigrationContext`]: per-run session state threaded through every rule
//! - [`RenameTable`]: attribute renames and resource moves collected for
//!   cross-file rewrites
//! - [`MigrationSettings`]: run parameters, loadable from TOML
//!
//! # Example
//!
//! ```rust
//! use shift_core::{MigrationContext, MigrationSettings};
//!
//! let settings = MigrationSettings::new(4, 5).with_resources(["acme_zone"]);
//! let mut ctx = MigrationContext::from_settings(&settings).with_file("main.tf");
//!
//! ctx.warn_at("acme_zone.main", "field dropped", "`paused` has no equivalent");
//! assert_eq!(ctx.diagnostics().warnings(), 1);
//! assert!(ctx.allows("acme_zone"));
//! assert!(!ctx.allows("acme_record"));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod renames;
pub mod settings;
pub mod version;

// Re-exports for convenience
pub use context::MigrationContext;
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{RenameConflict, SettingsError};
pub use renames::{AttributeRename, RenameTable, ResourceMove};
pub use settings::{HashWidth, MigrationSettings, StateSettings};
pub use version::VersionPair;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for rule authors
    pub use crate::{
        AttributeRename, Diagnostic, Diagnostics, MigrationContext, MigrationSettings, Severity,
        VersionPair,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
