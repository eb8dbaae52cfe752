//! shift-state - state documents and their rewrite toolkit
//!
//! A state document is a JSON tree of resources, each with instances that
//! carry an attribute object and a schema version. This crate provides the
//! typed document model and the primitives rules use on instance attributes:
//! - [`normalize`]: path-addressed get/set/rename/remove and singleton
//!   array/object normalization
//! - [`coerce`]: string to number, boolean and duration coercions
//! - [`hash`]: the legacy string hash and reversal of hash-mixed values
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use shift_state::normalize::{rename, unwrap_singleton, EmptyPolicy};
//!
//! let mut attributes = json!({"zones": ["a"], "shield": [{"x": 1}]});
//! rename(&mut attributes, "zones", "result").unwrap();
//! unwrap_singleton(&mut attributes, "shield", EmptyPolicy::Null).unwrap();
//!
//! assert_eq!(attributes, json!({"result": ["a"], "shield": {"x": 1}}));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod coerce;
pub mod document;
pub mod error;
pub mod hash;
pub mod normalize;
pub mod path;

pub use coerce::{Coerced, DurationUnit};
pub use document::{StateDocument, StateInstance, StateResource, SUPPORTED_FORMAT_VERSION};
pub use error::{PathError, Result, StateError};
pub use hash::{legacy_hashcode, HashMix, Reversal};
pub use normalize::{EmptyPolicy, Singleton};
pub use path::{Segment, StatePath};

/// Prelude module for rule authors
pub mod prelude {
    pub use crate::{coerce, hash, normalize};
    pub use crate::{Coerced, DurationUnit, EmptyPolicy, HashMix, Reversal, Singleton, StateInstance};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
