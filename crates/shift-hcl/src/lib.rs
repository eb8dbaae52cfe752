//! shift-hcl - configuration trees and their rewrite toolkit
//!
//! Configuration files are parsed into a [`Document`] whose [`Body`] is the
//! `hcl-edit` tree: whitespace, comments and the exact text of every
//! expression travel with the nodes, so untouched structures are written
//! back byte-for-byte and rewritten ones keep their surroundings.
//!
//! # Example
//!
//! ```rust
//! use shift_hcl::{parse, toolkit};
//!
//! let src = "resource \"acme_widget\" \"w\" {\n  # settings\n  foo {\n    bar = 1\n  }\n}\n";
//! let mut doc = parse(src).unwrap();
//!
//! let widget = doc.body.get_blocks_mut("resource").next().unwrap();
//! assert!(toolkit::block_to_attribute(&mut widget.body, "foo", "foo").is_converted());
//!
//! assert_eq!(
//!     doc.to_string(),
//!     "resource \"acme_widget\" \"w\" {\n  # settings\n  foo = {\n    bar = 1\n  }\n}\n"
//! );
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod document;
pub mod error;
pub mod parse;
pub mod toolkit;
pub mod tree;
pub mod value;

pub use document::{Document, LineEnding};
pub use error::{HclError, InvalidExpression, Result};
pub use parse::{parse, parse_expression, validate_expression};
pub use tree::{
    identifier, is_identifier, new_block, reference, Attribute, Block, BlockExt, BlockLabel, Body, BodyExt,
    Decorate, Expression, Ident, Structure,
};
pub use value::Value;

/// Prelude module for rule authors
pub mod prelude {
    pub use crate::toolkit::{self, Conversion};
    pub use crate::{Attribute, Block, BlockExt, Body, BodyExt, Decorate, Expression, Ident, Structure, Value};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
