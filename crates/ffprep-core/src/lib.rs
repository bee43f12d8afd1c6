//! # ffprep
//!
//! Force-field preparation for molecular simulation setup: canonical parameter terms,
//! hierarchical rule-based atom typing, and the nonbonded exclusion closure over real atoms,
//! satellite particles and virtual sites.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Molecular data models keyed by stable handles, the
//!   canonical force-field term model with its TOML-backed registry and wildcard-aware
//!   lookup, and the hierarchical atom typer.
//!
//! - **[`engine`]: The Logic Core.** Bonded pair classification and the exclusion closure,
//!   plus configuration, progress reporting and error aggregation.
//!
//! - **[`workflows`]: The Public API.** End-to-end preparation of one or many molecules
//!   against a shared, read-only force field and rule forest.
//!
//! Substructure matching is not part of this crate. Callers supply it by implementing
//! [`core::typing::matcher::PatternMatcher`].

pub mod core;
pub mod engine;
pub mod workflows;
