//! # Core Models Module
//!
//! Data structures describing a single molecule as the preparation pipeline sees it.
//!
//! ## Key Components
//!
//! - [`particle`] - Particles and their role in the bonded topology (real atom, satellite,
//!   virtual site)
//! - [`topology`] - Bonds, angles, proper dihedrals and impropers between real atoms
//! - [`molecule`] - The per-molecule arena tying particles, the bonded graph and the
//!   satellite/virtual-site attachments together
//! - [`ids`] - Stable handle types for particles and structural elements
//!
//! ## Usage
//!
//! ```ignore
//! use ffprep::core::models::{molecule::Molecule, particle::Particle, topology::BondOrder};
//!
//! let mut molecule = Molecule::new("ethanol");
//! let c1 = molecule.add_atom(Particle::atom("C1", "C"))?;
//! let c2 = molecule.add_atom(Particle::atom("C2", "C"))?;
//! molecule.add_bond(c1, c2, BondOrder::Single)?;
//! molecule.generate_angles_and_dihedrals();
//! ```

pub mod ids;
pub mod molecule;
pub mod particle;
pub mod topology;
