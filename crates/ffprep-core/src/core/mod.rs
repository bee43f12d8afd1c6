//! # Core Module
//!
//! Stateless building blocks of force-field preparation.
//!
//! ## Architecture
//!
//! - **Molecular Representation** ([`models`]) - Particles, the bonded graph, and the
//!   structural elements derived from it
//! - **Force Field** ([`forcefield`]) - Canonical terms, the parameter registry and
//!   wildcard-aware parameter lookup
//! - **Atom Typing** ([`typing`]) - Hierarchical rule forest and per-molecule type resolution
//!
//! Everything in this layer is either immutable once built (registry, rule forest) or owned
//! by a single molecule, so it can be shared freely by the [`crate::engine`] and
//! [`crate::workflows`] layers.

pub mod forcefield;
pub mod models;
pub mod typing;
