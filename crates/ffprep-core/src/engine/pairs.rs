use crate::core::models::ids::ParticleId;
use crate::core::models::molecule::Molecule;
use std::collections::{HashMap, VecDeque};

/// Largest bonded distance that carries a special nonbonded relationship.
pub const MAX_BONDED_DISTANCE: u8 = 3;

/// Orders a pair by handle so each unordered pair has one representation.
#[inline]
pub fn ordered_pair(a: ParticleId, b: ParticleId) -> (ParticleId, ParticleId) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Shortest bonded distance (1 to 3) for every pair of real atoms within three bonds,
/// keyed by ordered pair.
pub fn bonded_distances(molecule: &Molecule) -> HashMap<(ParticleId, ParticleId), u8> {
    let mut distances = HashMap::new();
    for (source, _) in molecule.atoms_iter() {
        let mut depth: HashMap<ParticleId, u8> = HashMap::from([(source, 0)]);
        let mut queue = VecDeque::from([source]);

        while let Some(current) = queue.pop_front() {
            let d = depth[&current];
            if d == MAX_BONDED_DISTANCE {
                continue;
            }
            for &next in molecule.bonded_neighbors(current).unwrap_or(&[]) {
                if depth.contains_key(&next) {
                    continue;
                }
                depth.insert(next, d + 1);
                queue.push_back(next);
            }
        }

        for (target, d) in depth {
            if source < target {
                distances.insert((source, target), d);
            }
        }
    }
    distances
}

/// Real-atom pairs classified by shortest bonded distance. The three classes are disjoint
/// and each list is sorted by ordered handle pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BondedPairs {
    pub pairs_12: Vec<(ParticleId, ParticleId)>,
    pub pairs_13: Vec<(ParticleId, ParticleId)>,
    pub pairs_14: Vec<(ParticleId, ParticleId)>,
}

impl BondedPairs {
    pub fn from_molecule(molecule: &Molecule) -> Self {
        let mut pairs = Self::default();
        for (pair, d) in bonded_distances(molecule) {
            match d {
                1 => pairs.pairs_12.push(pair),
                2 => pairs.pairs_13.push(pair),
                3 => pairs.pairs_14.push(pair),
                _ => {}
            }
        }
        pairs.pairs_12.sort_unstable();
        pairs.pairs_13.sort_unstable();
        pairs.pairs_14.sort_unstable();
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::particle::Particle;
    use crate::core::models::topology::BondOrder;
    use std::collections::HashSet;

    fn build(names: &[&str], bonds: &[(usize, usize)]) -> (Molecule, Vec<ParticleId>) {
        let mut molecule = Molecule::new("test");
        let ids: Vec<_> = names
            .iter()
            .map(|n| molecule.add_atom(Particle::atom(n, "C")).unwrap())
            .collect();
        for &(i, j) in bonds {
            molecule.add_bond(ids[i], ids[j], BondOrder::Single).unwrap();
        }
        (molecule, ids)
    }

    fn named(
        molecule: &Molecule,
        pairs: &[(ParticleId, ParticleId)],
    ) -> HashSet<(String, String)> {
        pairs
            .iter()
            .map(|&(a, b)| {
                let mut names = [
                    molecule.particle(a).unwrap().name.clone(),
                    molecule.particle(b).unwrap().name.clone(),
                ];
                names.sort();
                let [x, y] = names;
                (x, y)
            })
            .collect()
    }

    fn set(pairs: &[(&str, &str)]) -> HashSet<(String, String)> {
        pairs
            .iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect()
    }

    #[test]
    fn three_atom_chain_has_no_14_pairs() {
        let (molecule, _) = build(&["A", "B", "C"], &[(0, 1), (1, 2)]);
        let pairs = BondedPairs::from_molecule(&molecule);

        assert_eq!(named(&molecule, &pairs.pairs_12), set(&[("A", "B"), ("B", "C")]));
        assert_eq!(named(&molecule, &pairs.pairs_13), set(&[("A", "C")]));
        assert!(pairs.pairs_14.is_empty());
    }

    #[test]
    fn four_atom_chain_has_one_14_pair() {
        let (molecule, _) = build(&["A", "B", "C", "D"], &[(0, 1), (1, 2), (2, 3)]);
        let pairs = BondedPairs::from_molecule(&molecule);

        assert_eq!(
            named(&molecule, &pairs.pairs_12),
            set(&[("A", "B"), ("B", "C"), ("C", "D")])
        );
        assert_eq!(named(&molecule, &pairs.pairs_13), set(&[("A", "C"), ("B", "D")]));
        assert_eq!(named(&molecule, &pairs.pairs_14), set(&[("A", "D")]));
    }

    #[test]
    fn ring_pairs_use_shortest_path_and_stay_disjoint() {
        // Five-membered ring: every pair is 1-2 or 1-3.
        let (molecule, _) = build(
            &["A", "B", "C", "D", "E"],
            &[(0, 1), (1, 2), (2, 3), (3, 4), (4, 0)],
        );
        let pairs = BondedPairs::from_molecule(&molecule);

        assert_eq!(pairs.pairs_12.len(), 5);
        assert_eq!(pairs.pairs_13.len(), 5);
        assert!(pairs.pairs_14.is_empty());
        let all: HashSet<_> = pairs
            .pairs_12
            .iter()
            .chain(&pairs.pairs_13)
            .chain(&pairs.pairs_14)
            .collect();
        assert_eq!(all.len(), 10);
    }

    #[test]
    fn pairs_beyond_three_bonds_are_ignored() {
        let (molecule, ids) = build(&["A", "B", "C", "D", "E"], &[(0, 1), (1, 2), (2, 3), (3, 4)]);
        let distances = bonded_distances(&molecule);
        assert!(!distances.contains_key(&ordered_pair(ids[0], ids[4])));
        assert_eq!(distances[&ordered_pair(ids[4], ids[1])], 3);
    }
}
