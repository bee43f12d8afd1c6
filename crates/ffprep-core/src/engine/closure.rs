use super::config::ScaleFactors;
use super::pairs::{BondedPairs, bonded_distances, ordered_pair};
use crate::core::models::ids::ParticleId;
use crate::core::models::molecule::Molecule;
use itertools::Itertools;
use slotmap::SecondaryMap;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use thiserror::Error;
use tracing::debug;

/// How the nonbonded kernel treats one particle pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PairInteraction {
    Excluded,
    Scaled { coulomb: f64, vdw: f64 },
}

impl PairInteraction {
    pub fn is_excluded(&self) -> bool {
        matches!(self, Self::Excluded)
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClosureIssue {
    #[error("1-4 {category} scale factor {value} must be a finite value in [0, 1]")]
    InvalidScaleFactor { category: &'static str, value: f64 },
}

/// The finished nonbonded pair table of one molecule.
///
/// Holds exactly one entry per unordered pair that deviates from normal interaction.
/// Pairs absent from the table interact normally.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExclusionTable {
    rules: BTreeMap<(ParticleId, ParticleId), PairInteraction>,
}

impl ExclusionTable {
    pub fn get(&self, a: ParticleId, b: ParticleId) -> Option<PairInteraction> {
        self.rules.get(&ordered_pair(a, b)).copied()
    }

    pub fn is_excluded(&self, a: ParticleId, b: ParticleId) -> bool {
        self.get(a, b).is_some_and(|rule| rule.is_excluded())
    }

    pub fn iter(&self) -> impl Iterator<Item = ((ParticleId, ParticleId), PairInteraction)> + '_ {
        self.rules.iter().map(|(&pair, &rule)| (pair, rule))
    }

    pub fn excluded_pairs(&self) -> impl Iterator<Item = (ParticleId, ParticleId)> + '_ {
        self.iter()
            .filter(|(_, rule)| rule.is_excluded())
            .map(|(pair, _)| pair)
    }

    pub fn scaled_pairs(&self) -> impl Iterator<Item = ((ParticleId, ParticleId), f64, f64)> + '_ {
        self.iter().filter_map(|(pair, rule)| match rule {
            PairInteraction::Scaled { coulomb, vdw } => Some((pair, coulomb, vdw)),
            PairInteraction::Excluded => None,
        })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Builds the pair table of a molecule from its bonded graph and auxiliary particles.
///
/// Every particle is reduced to its anchors among the real atoms: a real atom anchors on
/// itself, a satellite on its parent, and a virtual site on its three parents. The relation
/// between two particles is decided by the shortest bonded distance between any of their
/// anchors, so the most restrictive relation always wins.
#[derive(Debug, Clone, Copy)]
pub struct NonbondedClosureBuilder {
    scale: ScaleFactors,
}

impl NonbondedClosureBuilder {
    pub fn new(scale: ScaleFactors) -> Self {
        Self { scale }
    }

    pub fn scale(&self) -> ScaleFactors {
        self.scale
    }

    pub fn validate(&self) -> Vec<ClosureIssue> {
        [("electrostatic", self.scale.coulomb), ("dispersion", self.scale.vdw)]
            .into_iter()
            .filter(|(_, value)| !value.is_finite() || !(0.0..=1.0).contains(value))
            .map(|(category, value)| ClosureIssue::InvalidScaleFactor { category, value })
            .collect()
    }

    pub fn pair_classes(&self, molecule: &Molecule) -> BondedPairs {
        BondedPairs::from_molecule(molecule)
    }

    /// Computes the pair table.
    ///
    /// # Errors
    ///
    /// Returns every problem with the scale factors at once.
    pub fn build(&self, molecule: &Molecule) -> Result<ExclusionTable, Vec<ClosureIssue>> {
        let issues = self.validate();
        if !issues.is_empty() {
            return Err(issues);
        }

        let attached = attached_particles(molecule);
        let mut nearest: BTreeMap<(ParticleId, ParticleId), u8> = BTreeMap::new();

        let self_pairs = molecule.atoms_iter().map(|(id, _)| ((id, id), 0u8));
        for ((a, b), distance) in self_pairs.chain(bonded_distances(molecule)) {
            let (Some(group_a), Some(group_b)) = (attached.get(a), attached.get(b)) else {
                continue;
            };
            for (&x, &y) in group_a.iter().cartesian_product(group_b) {
                if x == y {
                    continue;
                }
                match nearest.entry(ordered_pair(x, y)) {
                    Entry::Vacant(slot) => {
                        slot.insert(distance);
                    }
                    Entry::Occupied(mut slot) => {
                        if distance < *slot.get() {
                            slot.insert(distance);
                        }
                    }
                }
            }
        }

        let rules: BTreeMap<_, _> = nearest
            .into_iter()
            .filter_map(|(pair, distance)| self.interaction(distance).map(|rule| (pair, rule)))
            .collect();

        debug!(
            molecule = molecule.name(),
            excluded = rules.values().filter(|r| r.is_excluded()).count(),
            scaled = rules.values().filter(|r| !r.is_excluded()).count(),
            "Built nonbonded pair table"
        );
        Ok(ExclusionTable { rules })
    }

    fn interaction(&self, distance: u8) -> Option<PairInteraction> {
        match distance {
            0..=2 => Some(PairInteraction::Excluded),
            3 if self.scale.is_fully_excluded() => Some(PairInteraction::Excluded),
            3 if self.scale.is_unscaled() => None,
            3 => Some(PairInteraction::Scaled {
                coulomb: self.scale.coulomb,
                vdw: self.scale.vdw,
            }),
            _ => None,
        }
    }
}

/// For each real atom, itself followed by every auxiliary particle anchored on it.
fn attached_particles(molecule: &Molecule) -> SecondaryMap<ParticleId, Vec<ParticleId>> {
    let mut attached: SecondaryMap<ParticleId, Vec<ParticleId>> = molecule
        .atoms_iter()
        .map(|(id, _)| (id, vec![id]))
        .collect();

    for (parent, satellite) in molecule.satellites_iter() {
        if let Some(group) = attached.get_mut(parent) {
            group.push(satellite);
        }
    }
    for (site, def) in molecule.virtual_sites_iter() {
        for &parent in &def.parents {
            if let Some(group) = attached.get_mut(parent) {
                group.push(site);
            }
        }
    }
    attached
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::particle::{Particle, ParticleKind};
    use crate::core::models::topology::BondOrder;

    fn chain(molecule: &mut Molecule, names: &[&str]) -> Vec<ParticleId> {
        let ids: Vec<_> = names
            .iter()
            .map(|n| molecule.add_atom(Particle::atom(n, "C")).unwrap())
            .collect();
        for (a, b) in ids.iter().tuple_windows() {
            molecule.add_bond(*a, *b, BondOrder::Single).unwrap();
        }
        ids
    }

    fn builder(coulomb: f64, vdw: f64) -> NonbondedClosureBuilder {
        NonbondedClosureBuilder::new(ScaleFactors::new(coulomb, vdw))
    }

    #[test]
    fn chain_of_four_excludes_12_and_13_and_scales_14() {
        let mut molecule = Molecule::new("butane");
        let ids = chain(&mut molecule, &["A", "B", "C", "D"]);

        let table = builder(0.5, 0.5).build(&molecule).unwrap();

        assert!(table.is_excluded(ids[0], ids[1]));
        assert!(table.is_excluded(ids[1], ids[0]));
        assert!(table.is_excluded(ids[0], ids[2]));
        assert_eq!(
            table.get(ids[3], ids[0]),
            Some(PairInteraction::Scaled { coulomb: 0.5, vdw: 0.5 })
        );
        assert_eq!(table.len(), 6);
    }

    #[test]
    fn fourteen_pairs_follow_the_scale_factors() {
        let mut molecule = Molecule::new("butane");
        let ids = chain(&mut molecule, &["A", "B", "C", "D"]);

        let excluded = builder(0.0, 0.0).build(&molecule).unwrap();
        assert!(excluded.is_excluded(ids[0], ids[3]));

        let normal = builder(1.0, 1.0).build(&molecule).unwrap();
        assert_eq!(normal.get(ids[0], ids[3]), None);
        assert_eq!(normal.len(), 5);

        let mixed = builder(0.0, 1.0).build(&molecule).unwrap();
        assert_eq!(
            mixed.get(ids[0], ids[3]),
            Some(PairInteraction::Scaled { coulomb: 0.0, vdw: 1.0 })
        );
    }

    #[test]
    fn pairs_beyond_three_bonds_have_no_entry() {
        let mut molecule = Molecule::new("pentane");
        let ids = chain(&mut molecule, &["A", "B", "C", "D", "E"]);
        let table = builder(0.5, 0.5).build(&molecule).unwrap();
        assert_eq!(table.get(ids[0], ids[4]), None);
    }

    #[test]
    fn satellite_inherits_parent_relations_and_is_excluded_from_parent() {
        let mut molecule = Molecule::new("drude");
        let ids = chain(&mut molecule, &["P", "Q", "R", "S"]);
        let d = molecule
            .add_satellite(ids[0], Particle::new("DP", "DP", ParticleKind::Satellite))
            .unwrap();

        let table = builder(0.5, 0.5).build(&molecule).unwrap();

        assert!(table.is_excluded(ids[0], d));
        assert!(table.is_excluded(d, ids[1]));
        assert!(table.is_excluded(d, ids[2]));
        assert_eq!(
            table.get(d, ids[3]),
            Some(PairInteraction::Scaled { coulomb: 0.5, vdw: 0.5 })
        );
    }

    #[test]
    fn satellites_of_bonded_atoms_are_excluded_from_each_other() {
        let mut molecule = Molecule::new("drude");
        let ids = chain(&mut molecule, &["P", "Q"]);
        let dp = molecule
            .add_satellite(ids[0], Particle::new("DP", "DP", ParticleKind::Satellite))
            .unwrap();
        let dq = molecule
            .add_satellite(ids[1], Particle::new("DQ", "DP", ParticleKind::Satellite))
            .unwrap();

        let table = builder(0.5, 0.5).build(&molecule).unwrap();
        assert!(table.is_excluded(dp, dq));
        assert!(table.is_excluded(dp, ids[1]));
        assert!(table.is_excluded(dq, ids[0]));
    }

    #[test]
    fn virtual_site_takes_the_most_restrictive_parent_relation() {
        let mut molecule = Molecule::new("water");
        let ids = chain(&mut molecule, &["H1", "O", "H2", "X", "Y"]);
        let sat = molecule
            .add_satellite(ids[1], Particle::new("DO", "DP", ParticleKind::Satellite))
            .unwrap();
        let site = molecule
            .add_virtual_site(
                Particle::new("M", "", ParticleKind::VirtualSite),
                [ids[0], ids[1], ids[2]],
                [0.1, 0.8, 0.1],
            )
            .unwrap();

        let table = builder(0.5, 0.5).build(&molecule).unwrap();

        for parent in &ids[..3] {
            assert!(table.is_excluded(site, *parent));
        }
        assert!(table.is_excluded(site, sat));
        // X is 1-2 from H2, Y is 1-3 from H2.
        assert!(table.is_excluded(site, ids[3]));
        assert!(table.is_excluded(site, ids[4]));
    }

    #[test]
    fn virtual_site_three_bonds_from_nearest_parent_is_scaled() {
        let mut molecule = Molecule::new("heptane");
        let ids = chain(&mut molecule, &["A", "B", "C", "D", "E", "F", "G"]);
        let site = molecule
            .add_virtual_site(
                Particle::new("M", "", ParticleKind::VirtualSite),
                [ids[0], ids[1], ids[2]],
                [0.2, 0.3, 0.5],
            )
            .unwrap();
        let sat = molecule
            .add_satellite(ids[5], Particle::new("DF", "DP", ParticleKind::Satellite))
            .unwrap();

        let table = builder(0.5, 0.4).build(&molecule).unwrap();
        let scaled = Some(PairInteraction::Scaled {
            coulomb: 0.5,
            vdw: 0.4,
        });

        assert!(table.is_excluded(site, ids[4]));
        // C-F is the shortest parent path to F, three bonds.
        assert_eq!(table.get(site, ids[5]), scaled);
        assert_eq!(table.get(site, sat), scaled);
        assert_eq!(table.get(site, ids[6]), None);
    }

    #[test]
    fn virtual_sites_sharing_a_parent_exclude_each_other() {
        let mut molecule = Molecule::new("sites");
        let ids = chain(&mut molecule, &["A", "B", "C", "D", "E", "F", "G"]);
        let vs = |name: &str| Particle::new(name, "", ParticleKind::VirtualSite);
        let w = [1.0 / 3.0; 3];
        let s1 = molecule.add_virtual_site(vs("S1"), [ids[0], ids[1], ids[2]], w).unwrap();
        let s2 = molecule.add_virtual_site(vs("S2"), [ids[2], ids[3], ids[4]], w).unwrap();
        let s3 = molecule.add_virtual_site(vs("S3"), [ids[4], ids[5], ids[6]], w).unwrap();

        let table = builder(0.5, 0.5).build(&molecule).unwrap();

        assert!(table.is_excluded(s1, s2));
        assert!(table.is_excluded(s2, s3));
        // Nearest anchors C and E are two bonds apart.
        assert!(table.is_excluded(s1, s3));
    }

    #[test]
    fn build_is_idempotent() {
        let mut molecule = Molecule::new("butane");
        let ids = chain(&mut molecule, &["A", "B", "C", "D"]);
        molecule
            .add_satellite(ids[2], Particle::new("DC", "DP", ParticleKind::Satellite))
            .unwrap();
        let closure = builder(0.5, 0.8333);

        assert_eq!(closure.build(&molecule).unwrap(), closure.build(&molecule).unwrap());
    }

    #[test]
    fn table_is_independent_of_insertion_order() {
        fn named_table(order: &[&str]) -> Vec<(String, String, String)> {
            let mut molecule = Molecule::new("order");
            let ids: Vec<_> = order
                .iter()
                .map(|n| molecule.add_atom(Particle::atom(n, "C")).unwrap())
                .collect();
            let find = |name: &str| ids[order.iter().position(|n| *n == name).unwrap()];
            for (a, b) in [("A", "B"), ("B", "C"), ("C", "D"), ("D", "E")] {
                molecule.add_bond(find(a), find(b), BondOrder::Single).unwrap();
            }
            let table = builder(0.5, 0.5).build(&molecule).unwrap();
            table
                .iter()
                .map(|((a, b), rule)| {
                    let mut names = [
                        molecule.particle(a).unwrap().name.clone(),
                        molecule.particle(b).unwrap().name.clone(),
                    ];
                    names.sort();
                    let [x, y] = names;
                    (x, y, format!("{rule:?}"))
                })
                .sorted()
                .collect()
        }

        assert_eq!(
            named_table(&["A", "B", "C", "D", "E"]),
            named_table(&["E", "C", "A", "D", "B"])
        );
    }

    #[test]
    fn invalid_scale_factors_are_reported_together() {
        let mut molecule = Molecule::new("butane");
        chain(&mut molecule, &["A", "B", "C", "D"]);

        let issues = builder(1.5, f64::NAN).build(&molecule).unwrap_err();
        assert_eq!(issues.len(), 2);
        assert!(matches!(
            issues[0],
            ClosureIssue::InvalidScaleFactor { category: "electrostatic", value } if value == 1.5
        ));
        assert!(matches!(
            issues[1],
            ClosureIssue::InvalidScaleFactor { category: "dispersion", .. }
        ));
    }
}
