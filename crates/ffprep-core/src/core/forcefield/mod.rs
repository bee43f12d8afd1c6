//! # Force Field Module
//!
//! Canonical force-field terms, the registry that stores them and the lookup used to match
//! structural elements of a molecule against it.
//!
//! ## Overview
//!
//! A force field is a set of atom types plus interaction terms keyed by tuples of
//! equivalence-class names. Terms are normalized on construction so that every interaction
//! has exactly one canonical identity:
//!
//! - **Two-body terms** (vdW, bond, charge increment) sort their pair; a charge increment
//!   changes sign when its pair is swapped
//! - **Angles** sort their side slots around a fixed center
//! - **Dihedrals** take the smaller of the two orientations, keeping a single wildcard side
//!   in the last slot
//! - **Impropers** keep the center first and sort the named sides ahead of wildcards
//!
//! ## Key Components
//!
//! - [`term`] - Canonical keys and the closed set of term kinds
//! - [`atom_type`] - Atom types and their equivalence classes
//! - [`fields`] - Flat field-map persistence with fixed precision
//! - [`registry`] - Term storage, settings, and the TOML parameter file
//! - [`lookup`] - Exact and wildcard-aware parameter matching
//!
//! ## Usage
//!
//! ```ignore
//! use ffprep::core::forcefield::{lookup::ParameterLookup, registry::TermRegistry};
//!
//! let registry = TermRegistry::load(Path::new("ff.toml"))?;
//! let lookup = ParameterLookup::new(&registry);
//! let torsion = lookup.dihedral(["h_1", "c_4", "c_4", "h_1"])?;
//! ```

pub mod atom_type;
pub mod fields;
pub mod lookup;
pub mod registry;
pub mod term;
