//! Tool registry: declarations, argument schemas, and atomic reload.
//!
//! The registry holds the set of tools the gateway advertises to the model
//! and is the single authority for resolving a tool-call name to its
//! declaration. Declarations are loaded from TOML at startup and can be
//! reloaded at runtime; a reload replaces the whole set atomically, so a
//! dispatch batch that took a snapshot keeps resolving against a
//! consistent view.
//!
//! # Example
//!
//! ```
//! use registry::Registry;
//!
//! let registry = Registry::parse(r#"
//!     [[tool]]
//!     name = "calculator"
//!     description = "Evaluate an arithmetic expression"
//!     backend = "math"
//!
//!     [tool.parameters]
//!     required = ["expr"]
//!
//!     [tool.parameters.properties.expr]
//!     type = "string"
//!     description = "Expression to evaluate"
//! "#).unwrap();
//!
//! assert!(registry.resolve("calculator").is_some());
//! assert!(registry.resolve("Calculator").is_none()); // case-sensitive
//! ```

mod declaration;
mod error;
mod registry;
mod schema;

pub use declaration::ToolDeclaration;
pub use error::{Error, Result};
pub use registry::{Registry, ToolSet};
pub use schema::{ParameterSchema, PropertySchema, Violation};
