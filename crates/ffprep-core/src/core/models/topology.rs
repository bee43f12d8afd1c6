use super::ids::ParticleId;

/// Bond multiplicity as read from the input structure. It does not affect term matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BondOrder {
    #[default]
    Single,
    Double,
    Triple,
    Aromatic,
}

/// A covalent bond between two real atoms.
///
/// Unlike a bond term, the two atoms keep their insertion order; canonical ordering is
/// applied only when force-field parameters are matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bond {
    pub atom1: ParticleId,
    pub atom2: ParticleId,
    pub order: BondOrder,
}

impl Bond {
    pub fn new(atom1: ParticleId, atom2: ParticleId, order: BondOrder) -> Self {
        Self {
            atom1,
            atom2,
            order,
        }
    }
}

/// An angle `atom1-center-atom3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Angle {
    pub atom1: ParticleId,
    pub center: ParticleId,
    pub atom3: ParticleId,
}

/// A proper dihedral `atom1-atom2-atom3-atom4` around the `atom2-atom3` bond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dihedral {
    pub atom1: ParticleId,
    pub atom2: ParticleId,
    pub atom3: ParticleId,
    pub atom4: ParticleId,
}

impl Dihedral {
    /// Two dihedrals with reversed sequence describe the same torsion.
    pub fn is_same_as(&self, other: &Dihedral) -> bool {
        (self.atom1, self.atom2, self.atom3, self.atom4)
            == (other.atom1, other.atom2, other.atom3, other.atom4)
            || (self.atom1, self.atom2, self.atom3, self.atom4)
                == (other.atom4, other.atom3, other.atom2, other.atom1)
    }
}

/// An improper torsion with the central atom first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Improper {
    pub center: ParticleId,
    pub sides: [ParticleId; 3],
}

impl Improper {
    /// Impropers with the same center and the same set of side atoms are equivalent.
    pub fn is_same_as(&self, other: &Improper) -> bool {
        if self.center != other.center {
            return false;
        }
        let mut a = self.sides;
        let mut b = other.sides;
        a.sort();
        b.sort();
        a == b
    }
}
