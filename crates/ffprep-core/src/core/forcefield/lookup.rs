use super::atom_type::{AtomType, EquivalenceClass as Class};
use super::registry::{CombinationRule, RegisteredTerm, TermRegistry};
use super::term::{
    AngleKey, DihedralKey, ImproperKey, PairKey, Term, TermCategory, TermKey, VdwParams,
};
use thiserror::Error;

/// No term covers the requested class tuple.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("No {category} parameters for classes ({})", .classes.join(","))]
pub struct ParameterMissing {
    pub category: TermCategory,
    pub classes: Vec<String>,
}

impl ParameterMissing {
    fn new(category: TermCategory, classes: &[&str]) -> Self {
        Self {
            category,
            classes: classes.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Read-only index over a [`TermRegistry`].
///
/// Exact canonical matches always win. Dihedrals and impropers additionally fall back to
/// wildcard terms: the candidate with the fewest wildcards is chosen, ties going to the
/// term declared first.
#[derive(Debug, Clone)]
pub struct ParameterLookup<'a> {
    registry: &'a TermRegistry,
    dihedral_wildcards: Vec<&'a RegisteredTerm>,
    improper_wildcards: Vec<&'a RegisteredTerm>,
}

impl<'a> ParameterLookup<'a> {
    pub fn new(registry: &'a TermRegistry) -> Self {
        let mut dihedral_wildcards = Vec::new();
        let mut improper_wildcards = Vec::new();
        for registered in registry.terms() {
            match &registered.term {
                Term::Dihedral { key, .. } if key.wildcard_count() > 0 => {
                    dihedral_wildcards.push((key.wildcard_count(), registered))
                }
                Term::Improper { key, .. } if key.wildcard_count() > 0 => {
                    improper_wildcards.push((key.wildcard_count(), registered))
                }
                _ => {}
            }
        }
        let by_specificity = |mut list: Vec<(usize, &'a RegisteredTerm)>| {
            list.sort_by_key(|(wildcards, t)| (*wildcards, t.index));
            list.into_iter().map(|(_, t)| t).collect::<Vec<_>>()
        };

        Self {
            registry,
            dihedral_wildcards: by_specificity(dihedral_wildcards),
            improper_wildcards: by_specificity(improper_wildcards),
        }
    }

    pub fn registry(&self) -> &'a TermRegistry {
        self.registry
    }

    fn exact(&self, key: &TermKey) -> Option<&'a Term> {
        self.registry.term(key).map(|t| &t.term)
    }

    pub fn bond(&self, a: &str, b: &str) -> Result<&'a Term, ParameterMissing> {
        let missing = || ParameterMissing::new(TermCategory::Bond, &[a, b]);
        let key = PairKey::new(TermCategory::Bond, a, b).map_err(|_| missing())?;
        self.exact(&TermKey::Bond(key)).ok_or_else(missing)
    }

    pub fn angle(&self, side1: &str, center: &str, side2: &str) -> Result<&'a Term, ParameterMissing> {
        let missing = || ParameterMissing::new(TermCategory::Angle, &[side1, center, side2]);
        let key = AngleKey::new(side1, center, side2).map_err(|_| missing())?;
        self.exact(&TermKey::Angle(key)).ok_or_else(missing)
    }

    pub fn dihedral(&self, classes: [&str; 4]) -> Result<&'a Term, ParameterMissing> {
        let missing = || ParameterMissing::new(TermCategory::Dihedral, &classes);
        let key = DihedralKey::new(classes).map_err(|_| missing())?;
        if let Some(term) = self.exact(&TermKey::Dihedral(key)) {
            return Ok(term);
        }
        self.dihedral_wildcards
            .iter()
            .find(|t| matches!(&t.term, Term::Dihedral { key, .. } if key.covers(&classes)))
            .map(|t| &t.term)
            .ok_or_else(missing)
    }

    pub fn improper(&self, center: &str, sides: [&str; 3]) -> Result<&'a Term, ParameterMissing> {
        let missing = || {
            ParameterMissing::new(
                TermCategory::Improper,
                &[center, sides[0], sides[1], sides[2]],
            )
        };
        let key = ImproperKey::new(center, sides).map_err(|_| missing())?;
        if let Some(term) = self.exact(&TermKey::Improper(key)) {
            return Ok(term);
        }
        self.improper_wildcards
            .iter()
            .find(|t| matches!(&t.term, Term::Improper { key, .. } if key.covers(center, &sides)))
            .map(|t| &t.term)
            .ok_or_else(missing)
    }

    /// vdW parameters for a pair of vdW classes.
    ///
    /// An explicit pair term wins. Otherwise two `LJ126` self-terms are combined with the
    /// registry's combination rule.
    pub fn vdw(&self, a: &str, b: &str) -> Result<VdwParams, ParameterMissing> {
        let missing = || ParameterMissing::new(TermCategory::Vdw, &[a, b]);
        let self_term = |class: &str| {
            PairKey::new(TermCategory::Vdw, class, class)
                .ok()
                .and_then(|key| self.exact(&TermKey::Vdw(key)))
        };

        let key = PairKey::new(TermCategory::Vdw, a, b).map_err(|_| missing())?;
        if let Some(Term::Vdw { params, .. }) = self.exact(&TermKey::Vdw(key)) {
            return Ok(*params);
        }
        match (self_term(a), self_term(b)) {
            (
                Some(Term::Vdw {
                    params: VdwParams::LJ126 { epsilon: e1, sigma: s1 },
                    ..
                }),
                Some(Term::Vdw {
                    params: VdwParams::LJ126 { epsilon: e2, sigma: s2 },
                    ..
                }),
            ) => Ok(combine(
                self.registry.settings().combination_rule,
                (*e1, *s1),
                (*e2, *s2),
            )),
            _ => Err(missing()),
        }
    }

    /// Charge transferred to `from` when it is bonded to `to`, in the caller's orientation.
    /// The atom `to` receives the opposite amount.
    ///
    /// Identical classes carry no increment unless one is declared explicitly.
    pub fn charge_increment(&self, from: &str, to: &str) -> Result<f64, ParameterMissing> {
        let missing = || ParameterMissing::new(TermCategory::ChargeIncrement, &[from, to]);
        let (key, swapped) =
            PairKey::canonicalize(TermCategory::ChargeIncrement, from, to).map_err(|_| missing())?;
        match self.exact(&TermKey::ChargeIncrement(key)) {
            Some(Term::ChargeIncrement { value, .. }) => Ok(if swapped { -value } else { *value }),
            _ if from == to => Ok(0.0),
            _ => Err(missing()),
        }
    }

    pub fn bond_for(&self, t1: &AtomType, t2: &AtomType) -> Result<&'a Term, ParameterMissing> {
        self.bond(t1.class(Class::Bond), t2.class(Class::Bond))
    }

    pub fn angle_for(
        &self,
        side1: &AtomType,
        center: &AtomType,
        side2: &AtomType,
    ) -> Result<&'a Term, ParameterMissing> {
        self.angle(
            side1.class(Class::AngleSide),
            center.class(Class::AngleCenter),
            side2.class(Class::AngleSide),
        )
    }

    pub fn dihedral_for(&self, types: [&AtomType; 4]) -> Result<&'a Term, ParameterMissing> {
        self.dihedral([
            types[0].class(Class::DihedralSide),
            types[1].class(Class::DihedralCenter),
            types[2].class(Class::DihedralCenter),
            types[3].class(Class::DihedralSide),
        ])
    }

    pub fn improper_for(
        &self,
        center: &AtomType,
        sides: [&AtomType; 3],
    ) -> Result<&'a Term, ParameterMissing> {
        self.improper(
            center.class(Class::ImproperCenter),
            sides.map(|t| t.class(Class::ImproperSide)),
        )
    }

    pub fn vdw_for(&self, t1: &AtomType, t2: &AtomType) -> Result<VdwParams, ParameterMissing> {
        self.vdw(t1.class(Class::Vdw), t2.class(Class::Vdw))
    }

    pub fn charge_increment_for(&self, from: &AtomType, to: &AtomType) -> Result<f64, ParameterMissing> {
        self.charge_increment(from.class(Class::ChargeIncrement), to.class(Class::ChargeIncrement))
    }
}

fn combine(rule: CombinationRule, (e1, s1): (f64, f64), (e2, s2): (f64, f64)) -> VdwParams {
    let epsilon = (e1 * e2).sqrt();
    let sigma = match rule {
        CombinationRule::Geometric => (s1 * s2).sqrt(),
        CombinationRule::LorentzBerthelot => (s1 + s2) / 2.0,
    };
    VdwParams::LJ126 { epsilon, sigma }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::registry::ForcefieldSettings;
    use crate::core::forcefield::term::{DihedralParams, ImproperParams, PeriodicSeries};

    fn opls(k1: f64) -> DihedralParams {
        DihedralParams::Opls {
            k1,
            k2: 0.0,
            k3: 0.0,
            k4: 0.0,
        }
    }

    fn k1_of(term: &Term) -> f64 {
        match term {
            Term::Dihedral {
                params: DihedralParams::Opls { k1, .. },
                ..
            } => *k1,
            other => panic!("unexpected term {other}"),
        }
    }

    fn registry_with(terms: Vec<Term>) -> TermRegistry {
        let mut registry = TermRegistry::default();
        for term in terms {
            registry.add_term(term).unwrap();
        }
        registry
    }

    #[test]
    fn exact_dihedral_match_beats_wildcards() {
        let registry = registry_with(vec![
            Term::dihedral(["*", "b", "c", "*"], opls(1.0)).unwrap(),
            Term::dihedral(["a", "b", "c", "d"], opls(2.0)).unwrap(),
        ]);
        let lookup = ParameterLookup::new(&registry);

        assert_eq!(k1_of(lookup.dihedral(["d", "c", "b", "a"]).unwrap()), 2.0);
        assert_eq!(k1_of(lookup.dihedral(["x", "b", "c", "y"]).unwrap()), 1.0);
    }

    #[test]
    fn fewer_wildcards_win_regardless_of_declaration_order() {
        let registry = registry_with(vec![
            Term::dihedral(["*", "b", "c", "*"], opls(1.0)).unwrap(),
            Term::dihedral(["a", "b", "c", "*"], opls(3.0)).unwrap(),
        ]);
        let lookup = ParameterLookup::new(&registry);

        assert_eq!(k1_of(lookup.dihedral(["a", "b", "c", "z"]).unwrap()), 3.0);
        assert_eq!(k1_of(lookup.dihedral(["z", "c", "b", "a"]).unwrap()), 3.0);
        assert_eq!(k1_of(lookup.dihedral(["q", "b", "c", "z"]).unwrap()), 1.0);
    }

    #[test]
    fn equally_specific_wildcards_resolve_by_declaration_order() {
        let registry = registry_with(vec![
            Term::dihedral(["x", "b", "c", "*"], opls(5.0)).unwrap(),
            Term::dihedral(["*", "b", "c", "y"], opls(4.0)).unwrap(),
        ]);
        let lookup = ParameterLookup::new(&registry);

        assert_eq!(k1_of(lookup.dihedral(["x", "b", "c", "y"]).unwrap()), 5.0);
    }

    #[test]
    fn missing_dihedral_names_the_class_tuple() {
        let registry = registry_with(vec![]);
        let lookup = ParameterLookup::new(&registry);
        let err = lookup.dihedral(["a", "b", "c", "d"]).unwrap_err();

        assert_eq!(err.category, TermCategory::Dihedral);
        assert_eq!(err.to_string(), "No dihedral parameters for classes (a,b,c,d)");
    }

    #[test]
    fn improper_wildcard_fallback_matches_named_sides() {
        let registry = registry_with(vec![
            Term::improper("c", ["*", "*", "*"], ImproperParams::Harmonic { phi: 0.0, k: 1.0 })
                .unwrap(),
            Term::improper("c", ["o", "*", "*"], ImproperParams::Harmonic { phi: 0.0, k: 2.0 })
                .unwrap(),
        ]);
        let lookup = ParameterLookup::new(&registry);
        let k_of = |term: &Term| match term {
            Term::Improper {
                params: ImproperParams::Harmonic { k, .. },
                ..
            } => *k,
            other => panic!("unexpected term {other}"),
        };

        assert_eq!(k_of(lookup.improper("c", ["h", "o", "h"]).unwrap()), 2.0);
        assert_eq!(k_of(lookup.improper("c", ["h", "n", "h"]).unwrap()), 1.0);
        assert!(lookup.improper("n", ["h", "o", "h"]).is_err());
    }

    #[test]
    fn periodic_dihedral_lookup_returns_stored_series() {
        let series = PeriodicSeries::from_lists(&[3], &[0.6], &[0.0]).unwrap();
        let registry = registry_with(vec![
            Term::dihedral(["h", "c", "c", "h"], DihedralParams::Periodic(series.clone())).unwrap(),
        ]);
        let lookup = ParameterLookup::new(&registry);
        match lookup.dihedral(["h", "c", "c", "h"]).unwrap() {
            Term::Dihedral {
                params: DihedralParams::Periodic(found),
                ..
            } => assert_eq!(found, &series),
            other => panic!("unexpected term {other}"),
        }
    }

    #[test]
    fn vdw_combines_lj_self_terms_when_pair_is_missing() {
        let lj = |epsilon, sigma| VdwParams::LJ126 { epsilon, sigma };
        let mut registry = TermRegistry::new(ForcefieldSettings {
            combination_rule: CombinationRule::LorentzBerthelot,
            ..ForcefieldSettings::default()
        })
        .unwrap();
        registry.add_term(Term::vdw("a", "a", lj(0.4, 0.3)).unwrap()).unwrap();
        registry.add_term(Term::vdw("b", "b", lj(0.1, 0.5)).unwrap()).unwrap();
        registry.add_term(Term::vdw("a", "c", lj(9.0, 9.0)).unwrap()).unwrap();
        let lookup = ParameterLookup::new(&registry);

        match lookup.vdw("b", "a").unwrap() {
            VdwParams::LJ126 { epsilon, sigma } => {
                assert!((epsilon - 0.2).abs() < 1e-12);
                assert!((sigma - 0.4).abs() < 1e-12);
            }
            other => panic!("unexpected params {other:?}"),
        }
        assert_eq!(lookup.vdw("c", "a").unwrap(), lj(9.0, 9.0));
        assert!(lookup.vdw("a", "z").is_err());
    }

    #[test]
    fn charge_increment_is_signed_in_caller_orientation() {
        let registry = registry_with(vec![Term::charge_increment("c", "h", 0.06).unwrap()]);
        let lookup = ParameterLookup::new(&registry);

        assert_eq!(lookup.charge_increment("c", "h").unwrap(), 0.06);
        assert_eq!(lookup.charge_increment("h", "c").unwrap(), -0.06);
        assert_eq!(lookup.charge_increment("h", "h").unwrap(), 0.0);
        assert!(lookup.charge_increment("c", "o").is_err());
    }

    #[test]
    fn convenience_lookups_use_equivalence_classes() {
        let mut methyl = AtomType::new("c_4h3");
        methyl.set_class(Class::DihedralCenter, "c_4");
        methyl.set_class(Class::DihedralSide, "c_4");
        let hydrogen = AtomType::new("h_1");
        let registry = registry_with(vec![
            Term::dihedral(["h_1", "c_4", "c_4", "h_1"], opls(0.3)).unwrap(),
        ]);
        let lookup = ParameterLookup::new(&registry);

        let term = lookup
            .dihedral_for([&hydrogen, &methyl, &methyl, &hydrogen])
            .unwrap();
        assert_eq!(k1_of(term), 0.3);
        assert!(lookup.bond_for(&methyl, &hydrogen).is_err());
    }
}
