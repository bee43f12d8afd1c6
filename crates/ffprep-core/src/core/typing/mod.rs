//! # Typing Module
//!
//! Hierarchical, rule-based assignment of force-field atom types.
//!
//! Rules pair a name with an opaque substructure pattern and are arranged in a forest below
//! a synthetic `UNDEFINED` root. An atom matching several rules is assigned the deepest one
//! reachable by repeatedly descending into the first matching child, so more specific types
//! are declared as children of the general ones they refine.
//!
//! ```text
//! TypeDefinition
//! H_1 [#1]
//! HC  [H][CX4]
//!
//! HierarchicalTree
//! H_1
//!     HC
//! ```
//!
//! ## Key Components
//!
//! - [`definition`] - Parser for the type-definition document
//! - [`forest`] - The rule arena and the resolution walk
//! - [`matcher`] - The pattern-matching capability supplied by the caller
//! - [`resolver`] - Per-molecule candidate collection and type assignment
//! - [`error`] - Validation, pattern and typing errors

pub mod definition;
pub mod error;
pub mod forest;
pub mod matcher;
pub mod resolver;
