use nalgebra::Point3;
use std::fmt;

/// Classifies a particle by how it takes part in the bonded topology.
///
/// Only [`ParticleKind::Atom`] particles are nodes of the bonded graph. Satellites and
/// virtual sites are attached to real atoms and inherit their nonbonded relationships
/// from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum ParticleKind {
    /// A real atom, a node of the bonded graph.
    #[default]
    Atom,
    /// A polarizable satellite (Drude) particle carried by exactly one real atom.
    Satellite,
    /// A massless interaction site placed from three real parent atoms.
    VirtualSite,
}

impl ParticleKind {
    /// Returns `true` for particles that are nodes of the bonded graph.
    #[inline]
    pub fn is_real(self) -> bool {
        matches!(self, ParticleKind::Atom)
    }
}

impl fmt::Display for ParticleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Atom => "atom",
                Self::Satellite => "satellite",
                Self::VirtualSite => "virtual-site",
            }
        )
    }
}

/// A single particle of a molecule.
///
/// The force-field type is empty until typing has run; charge and mass are either supplied
/// by the caller or filled in from the assigned atom type during preparation.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    /// The particle name (e.g., "C1", "H12", "DP1").
    pub name: String,
    /// Element symbol, or "DP"/"VS" style placeholders for auxiliary particles.
    pub symbol: String,
    /// Role of this particle in the bonded topology.
    pub kind: ParticleKind,
    /// The assigned force-field atom type name.
    pub atom_type: String,
    /// Partial charge in elementary charge units.
    pub charge: f64,
    /// Mass in atomic mass units.
    pub mass: f64,
    /// Cartesian position.
    pub position: Point3<f64>,
}

impl Particle {
    /// Creates a new particle of the given kind at the origin with an empty atom type.
    pub fn new(name: &str, symbol: &str, kind: ParticleKind) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            kind,
            atom_type: String::new(),
            charge: 0.0,
            mass: 0.0,
            position: Point3::origin(),
        }
    }

    /// Shorthand for a real atom.
    pub fn atom(name: &str, symbol: &str) -> Self {
        Self::new(name, symbol, ParticleKind::Atom)
    }

    pub fn with_position(mut self, position: Point3<f64>) -> Self {
        self.position = position;
        self
    }

    pub fn with_atom_type(mut self, atom_type: &str) -> Self {
        self.atom_type = atom_type.to_string();
        self
    }

    pub fn is_typed(&self) -> bool {
        !self.atom_type.is_empty()
    }
}
