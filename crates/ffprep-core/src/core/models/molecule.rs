use super::ids::{AngleId, BondId, DihedralId, ImproperId, ParticleId};
use super::particle::{Particle, ParticleKind};
use super::topology::{Angle, Bond, BondOrder, Dihedral, Improper};
use itertools::Itertools;
use nalgebra::{Point3, Vector3};
use slotmap::{SecondaryMap, SlotMap};
use std::collections::HashMap;
use thiserror::Error;

/// Definition of a virtual site: three distinct real parent atoms and the weights that
/// place the site at `w1*r1 + w2*r2 + w3*r3`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VirtualSiteDef {
    pub parents: [ParticleId; 3],
    pub weights: [f64; 3],
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoleculeError {
    #[error("Particle {0:?} not found in molecule")]
    ParticleNotFound(ParticleId),
    #[error("Particle '{name}' is a {found}, expected a {expected}")]
    WrongKind {
        name: String,
        expected: ParticleKind,
        found: ParticleKind,
    },
    #[error("Particle '{0}' cannot be bonded to itself")]
    SelfBond(String),
    #[error("Atom '{0}' already carries a satellite particle")]
    SatelliteAlreadyAttached(String),
    #[error("Virtual site '{0}' must have three distinct parent atoms")]
    DuplicateVirtualSiteParent(String),
}

/// A single molecule: an arena of particles, the real-atom bonded graph, the structural
/// elements derived from it, and the satellite and virtual-site attachments.
///
/// All handles (`ParticleId`, `BondId`, ...) are assigned at insertion and stay valid for
/// the lifetime of the molecule. Nothing is ever removed, so arena iteration follows
/// insertion order and is reproducible across runs.
#[derive(Debug, Clone, Default)]
pub struct Molecule {
    name: String,
    particles: SlotMap<ParticleId, Particle>,
    bonds: SlotMap<BondId, Bond>,
    angles: SlotMap<AngleId, Angle>,
    dihedrals: SlotMap<DihedralId, Dihedral>,
    impropers: SlotMap<ImproperId, Improper>,
    /// Lookup from an unordered atom pair to its bond.
    bond_index: HashMap<(ParticleId, ParticleId), BondId>,
    /// Cached adjacency list of the real-atom bonded graph.
    bond_adjacency: SecondaryMap<ParticleId, Vec<ParticleId>>,
    /// Real atom -> its satellite.
    satellites: SecondaryMap<ParticleId, ParticleId>,
    /// Satellite -> its real atom.
    satellite_parents: SecondaryMap<ParticleId, ParticleId>,
    virtual_sites: SecondaryMap<ParticleId, VirtualSiteDef>,
}

fn unordered(a: ParticleId, b: ParticleId) -> (ParticleId, ParticleId) {
    if a <= b { (a, b) } else { (b, a) }
}

impl Molecule {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn particle(&self, id: ParticleId) -> Option<&Particle> {
        self.particles.get(id)
    }

    pub fn particle_mut(&mut self, id: ParticleId) -> Option<&mut Particle> {
        self.particles.get_mut(id)
    }

    pub fn particles_iter(&self) -> impl Iterator<Item = (ParticleId, &Particle)> {
        self.particles.iter()
    }

    pub fn particles_iter_mut(&mut self) -> impl Iterator<Item = (ParticleId, &mut Particle)> {
        self.particles.iter_mut()
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    /// Iterates over the real atoms (nodes of the bonded graph) in insertion order.
    pub fn atoms_iter(&self) -> impl Iterator<Item = (ParticleId, &Particle)> {
        self.particles.iter().filter(|(_, p)| p.kind.is_real())
    }

    pub fn atom_ids(&self) -> Vec<ParticleId> {
        self.atoms_iter().map(|(id, _)| id).collect()
    }

    pub fn bond(&self, id: BondId) -> Option<&Bond> {
        self.bonds.get(id)
    }

    pub fn bonds_iter(&self) -> impl Iterator<Item = (BondId, &Bond)> {
        self.bonds.iter()
    }

    pub fn angles_iter(&self) -> impl Iterator<Item = (AngleId, &Angle)> {
        self.angles.iter()
    }

    pub fn dihedrals_iter(&self) -> impl Iterator<Item = (DihedralId, &Dihedral)> {
        self.dihedrals.iter()
    }

    pub fn impropers_iter(&self) -> impl Iterator<Item = (ImproperId, &Improper)> {
        self.impropers.iter()
    }

    pub fn bond_count(&self) -> usize {
        self.bonds.len()
    }

    /// Finds the bond between two atoms regardless of their order.
    pub fn find_bond(&self, a: ParticleId, b: ParticleId) -> Option<BondId> {
        self.bond_index.get(&unordered(a, b)).copied()
    }

    /// Returns the bonded neighbors of a real atom, in bond insertion order.
    pub fn bonded_neighbors(&self, id: ParticleId) -> Option<&[ParticleId]> {
        self.bond_adjacency.get(id).map(|v| v.as_slice())
    }

    /// The satellite carried by a real atom, if any.
    pub fn satellite_of(&self, atom: ParticleId) -> Option<ParticleId> {
        self.satellites.get(atom).copied()
    }

    /// The real atom carrying a satellite.
    pub fn satellite_parent(&self, satellite: ParticleId) -> Option<ParticleId> {
        self.satellite_parents.get(satellite).copied()
    }

    /// Iterates over `(real atom, satellite)` pairs.
    pub fn satellites_iter(&self) -> impl Iterator<Item = (ParticleId, ParticleId)> + '_ {
        self.satellites.iter().map(|(parent, &sat)| (parent, sat))
    }

    pub fn virtual_site(&self, site: ParticleId) -> Option<&VirtualSiteDef> {
        self.virtual_sites.get(site)
    }

    pub fn virtual_sites_iter(&self) -> impl Iterator<Item = (ParticleId, &VirtualSiteDef)> {
        self.virtual_sites.iter()
    }

    fn require_real(&self, id: ParticleId) -> Result<&Particle, MoleculeError> {
        let particle = self
            .particles
            .get(id)
            .ok_or(MoleculeError::ParticleNotFound(id))?;
        if !particle.kind.is_real() {
            return Err(MoleculeError::WrongKind {
                name: particle.name.clone(),
                expected: ParticleKind::Atom,
                found: particle.kind,
            });
        }
        Ok(particle)
    }

    fn require_kind(particle: &Particle, expected: ParticleKind) -> Result<(), MoleculeError> {
        if particle.kind != expected {
            return Err(MoleculeError::WrongKind {
                name: particle.name.clone(),
                expected,
                found: particle.kind,
            });
        }
        Ok(())
    }

    /// Adds a real atom to the molecule.
    ///
    /// # Errors
    ///
    /// Returns `MoleculeError::WrongKind` if the particle is not a real atom.
    pub fn add_atom(&mut self, atom: Particle) -> Result<ParticleId, MoleculeError> {
        Self::require_kind(&atom, ParticleKind::Atom)?;
        let id = self.particles.insert(atom);
        self.bond_adjacency.insert(id, Vec::new());
        Ok(id)
    }

    /// Adds a bond between two real atoms.
    ///
    /// This method is idempotent: bonding an already bonded pair (in either order) returns
    /// the existing bond handle.
    pub fn add_bond(
        &mut self,
        atom1: ParticleId,
        atom2: ParticleId,
        order: BondOrder,
    ) -> Result<BondId, MoleculeError> {
        self.require_real(atom1)?;
        let name = self.require_real(atom2)?.name.clone();
        if atom1 == atom2 {
            return Err(MoleculeError::SelfBond(name));
        }
        if let Some(existing) = self.find_bond(atom1, atom2) {
            return Ok(existing);
        }

        let id = self.bonds.insert(Bond::new(atom1, atom2, order));
        self.bond_index.insert(unordered(atom1, atom2), id);
        self.bond_adjacency[atom1].push(atom2);
        self.bond_adjacency[atom2].push(atom1);
        Ok(id)
    }

    /// Attaches a satellite particle to a real atom.
    ///
    /// # Errors
    ///
    /// Fails if `parent` is not a real atom, if `satellite` is not of kind
    /// [`ParticleKind::Satellite`], or if the atom already carries a satellite.
    pub fn add_satellite(
        &mut self,
        parent: ParticleId,
        satellite: Particle,
    ) -> Result<ParticleId, MoleculeError> {
        let parent_name = self.require_real(parent)?.name.clone();
        Self::require_kind(&satellite, ParticleKind::Satellite)?;
        if self.satellites.contains_key(parent) {
            return Err(MoleculeError::SatelliteAlreadyAttached(parent_name));
        }
        let id = self.particles.insert(satellite);
        self.satellites.insert(parent, id);
        self.satellite_parents.insert(id, parent);
        Ok(id)
    }

    /// Adds a virtual site defined by three distinct real parent atoms.
    pub fn add_virtual_site(
        &mut self,
        site: Particle,
        parents: [ParticleId; 3],
        weights: [f64; 3],
    ) -> Result<ParticleId, MoleculeError> {
        Self::require_kind(&site, ParticleKind::VirtualSite)?;
        for &parent in &parents {
            self.require_real(parent)?;
        }
        if !parents.iter().all_unique() {
            return Err(MoleculeError::DuplicateVirtualSiteParent(site.name));
        }
        let id = self.particles.insert(site);
        self.virtual_sites
            .insert(id, VirtualSiteDef { parents, weights });
        Ok(id)
    }

    /// Adds an explicit angle; the three atoms must be real.
    ///
    /// [`Molecule::generate_angles_and_dihedrals`] discards explicit angles. Preparation
    /// only generates them for molecules that carry neither angles nor dihedrals.
    pub fn add_angle(
        &mut self,
        atom1: ParticleId,
        center: ParticleId,
        atom3: ParticleId,
    ) -> Result<AngleId, MoleculeError> {
        for id in [atom1, center, atom3] {
            self.require_real(id)?;
        }
        Ok(self.angles.insert(Angle {
            atom1,
            center,
            atom3,
        }))
    }

    /// Adds an explicit proper dihedral; the four atoms must be real. Like explicit angles,
    /// these are dropped by [`Molecule::generate_angles_and_dihedrals`].
    pub fn add_dihedral(&mut self, atoms: [ParticleId; 4]) -> Result<DihedralId, MoleculeError> {
        for id in atoms {
            self.require_real(id)?;
        }
        Ok(self.dihedrals.insert(Dihedral {
            atom1: atoms[0],
            atom2: atoms[1],
            atom3: atoms[2],
            atom4: atoms[3],
        }))
    }

    /// Adds an explicit improper with `center` as the central atom. Replaced by
    /// [`Molecule::generate_impropers`].
    pub fn add_improper(
        &mut self,
        center: ParticleId,
        sides: [ParticleId; 3],
    ) -> Result<ImproperId, MoleculeError> {
        self.require_real(center)?;
        for id in sides {
            self.require_real(id)?;
        }
        Ok(self.impropers.insert(Improper { center, sides }))
    }

    /// Rebuilds all angles and proper dihedrals from the bonded graph, discarding any that
    /// were added explicitly.
    ///
    /// Angles are enumerated per center atom over pairs of its neighbors. Dihedrals are
    /// enumerated per bond `j-k` over `i` in neighbors of `j` and `l` in neighbors of `k`,
    /// skipping `i == l` (three-membered rings).
    pub fn generate_angles_and_dihedrals(&mut self) {
        self.angles.clear();
        self.dihedrals.clear();

        let centers: Vec<ParticleId> = self.bond_adjacency.keys().collect();
        for center in centers {
            let neighbors = self.bond_adjacency[center].clone();
            for (atom1, atom3) in neighbors.into_iter().tuple_combinations() {
                self.angles.insert(Angle {
                    atom1,
                    center,
                    atom3,
                });
            }
        }

        let bonds: Vec<Bond> = self.bonds.values().copied().collect();
        for bond in bonds {
            let (j, k) = (bond.atom1, bond.atom2);
            for &i in &self.bond_adjacency[j] {
                if i == k {
                    continue;
                }
                for &l in &self.bond_adjacency[k] {
                    if l == j || l == i {
                        continue;
                    }
                    self.dihedrals.insert(Dihedral {
                        atom1: i,
                        atom2: j,
                        atom3: k,
                        atom4: l,
                    });
                }
            }
        }
    }

    /// Rebuilds impropers: one per real atom with exactly three bonded neighbors.
    pub fn generate_impropers(&mut self) {
        self.impropers.clear();
        let candidates: Vec<(ParticleId, [ParticleId; 3])> = self
            .bond_adjacency
            .iter()
            .filter_map(|(center, neighbors)| match neighbors.as_slice() {
                &[a, b, c] => Some((center, [a, b, c])),
                _ => None,
            })
            .collect();
        for (center, sides) in candidates {
            self.impropers.insert(Improper { center, sides });
        }
    }

    /// Places every virtual site at the weighted combination of its parents' positions.
    pub fn place_virtual_sites(&mut self) {
        let placements: Vec<(ParticleId, Point3<f64>)> = self
            .virtual_sites
            .iter()
            .map(|(site, def)| {
                let coords = def.parents.iter().zip(def.weights).fold(
                    Vector3::zeros(),
                    |acc, (&parent, weight)| acc + self.particles[parent].position.coords * weight,
                );
                (site, Point3::from(coords))
            })
            .collect();
        for (site, position) in placements {
            self.particles[site].position = position;
        }
    }
}
