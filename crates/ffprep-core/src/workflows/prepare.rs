use crate::core::forcefield::atom_type::AtomType;
use crate::core::forcefield::lookup::{ParameterLookup, ParameterMissing};
use crate::core::forcefield::registry::TermRegistry;
use crate::core::forcefield::term::{Term, VdwParams};
use crate::core::models::ids::{AngleId, BondId, DihedralId, ImproperId, ParticleId};
use crate::core::models::molecule::{Molecule, VirtualSiteDef};
use crate::core::typing::matcher::PatternMatcher;
use crate::core::typing::resolver::HierarchicalTyper;
use crate::engine::closure::{ExclusionTable, NonbondedClosureBuilder};
use crate::engine::config::{PrepareConfig, ScaleFactors};
use crate::engine::error::{EngineError, PrepareProblem};
use crate::engine::progress::{Progress, ProgressReporter};
use itertools::Itertools;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use slotmap::SecondaryMap;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

/// The read-only inputs shared by every molecule of a run.
pub struct Resources<M: PatternMatcher> {
    pub registry: TermRegistry,
    pub typer: HierarchicalTyper<M>,
}

/// A molecule ready for export: typed, charged, with every structural element bound to
/// its canonical term and the nonbonded pair table computed.
#[derive(Debug, Clone)]
pub struct PreparedMolecule {
    pub molecule: Molecule,
    pub bond_terms: SecondaryMap<BondId, Term>,
    pub angle_terms: SecondaryMap<AngleId, Term>,
    pub dihedral_terms: SecondaryMap<DihedralId, Term>,
    pub improper_terms: SecondaryMap<ImproperId, Term>,
    /// Self vdW parameters of every typed particle.
    pub vdw: SecondaryMap<ParticleId, VdwParams>,
    pub pair_table: ExclusionTable,
    /// Unscaled vdW parameters of 1-4 pairs whose dispersion is partially scaled.
    pub pair_vdw: BTreeMap<(ParticleId, ParticleId), VdwParams>,
}

impl PreparedMolecule {
    /// `(real atom, satellite)` pairs.
    pub fn satellites(&self) -> impl Iterator<Item = (ParticleId, ParticleId)> + '_ {
        self.molecule.satellites_iter()
    }

    /// Virtual sites with their parents and weights.
    pub fn virtual_sites(&self) -> impl Iterator<Item = (ParticleId, &VirtualSiteDef)> {
        self.molecule.virtual_sites_iter()
    }
}

pub fn load_resources<M: PatternMatcher>(
    config: &PrepareConfig,
    matcher: M,
) -> Result<Resources<M>, EngineError> {
    let registry = TermRegistry::load(&config.parameter_path)?;
    let typer = HierarchicalTyper::load(&config.type_definition_path, matcher)?;
    Ok(Resources { registry, typer })
}

/// Prepares molecules against one set of shared resources.
pub struct MoleculePreparer<'a, M: PatternMatcher> {
    typer: &'a HierarchicalTyper<M>,
    lookup: ParameterLookup<'a>,
    closure: NonbondedClosureBuilder,
    config: &'a PrepareConfig,
}

impl<'a, M: PatternMatcher> MoleculePreparer<'a, M> {
    pub fn new(resources: &'a Resources<M>, config: &'a PrepareConfig) -> Self {
        let scale = config
            .scale_override
            .unwrap_or_else(|| ScaleFactors::from_settings(resources.registry.settings()));
        Self {
            typer: &resources.typer,
            lookup: ParameterLookup::new(&resources.registry),
            closure: NonbondedClosureBuilder::new(scale),
            config,
        }
    }

    /// Prepares one molecule. The input is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Preparation`] carrying every problem found in the molecule.
    #[instrument(skip_all, name = "prepare_molecule", fields(molecule = molecule.name()))]
    pub fn prepare(&self, molecule: &Molecule) -> Result<PreparedMolecule, EngineError> {
        let mut working = molecule.clone();
        let mut problems = Vec::new();

        let typed = match self.typer.type_molecule(&mut working) {
            Ok(()) => true,
            Err(incomplete) => {
                problems.push(PrepareProblem::from(incomplete));
                false
            }
        };

        // Explicit angles, dihedrals and impropers supplied with the input are kept.
        if working.angles_iter().next().is_none() && working.dihedrals_iter().next().is_none() {
            working.generate_angles_and_dihedrals();
        }
        if self.config.generate_impropers && working.impropers_iter().next().is_none() {
            working.generate_impropers();
        }
        working.place_virtual_sites();

        let pair_table = match self.closure.build(&working) {
            Ok(table) => table,
            Err(issues) => {
                problems.extend(issues.into_iter().map(PrepareProblem::from));
                ExclusionTable::default()
            }
        };

        let mut prepared = PreparedMolecule {
            molecule: Molecule::default(),
            bond_terms: SecondaryMap::new(),
            angle_terms: SecondaryMap::new(),
            dihedral_terms: SecondaryMap::new(),
            improper_terms: SecondaryMap::new(),
            vdw: SecondaryMap::new(),
            pair_table,
            pair_vdw: BTreeMap::new(),
        };

        if typed {
            let types = self.resolve_types(&working, &mut problems);
            if self.config.assign_charges {
                self.assign_charges(&mut working, &types, &mut problems);
            }
            self.assign_terms(&working, &types, &mut prepared, &mut problems);
            self.assign_pair_vdw(&working, &types, &mut prepared, &mut problems);
        }

        if !problems.is_empty() {
            warn!(problems = problems.len(), "Molecule preparation failed");
            return Err(EngineError::Preparation {
                molecule: working.name().to_string(),
                problems,
            });
        }

        debug!(
            bonds = prepared.bond_terms.len(),
            angles = prepared.angle_terms.len(),
            dihedrals = prepared.dihedral_terms.len(),
            impropers = prepared.improper_terms.len(),
            pairs = prepared.pair_table.len(),
            "Molecule prepared"
        );
        prepared.molecule = working;
        Ok(prepared)
    }

    /// Maps every typed particle to its force-field atom type.
    fn resolve_types(
        &self,
        molecule: &Molecule,
        problems: &mut Vec<PrepareProblem>,
    ) -> SecondaryMap<ParticleId, &'a AtomType> {
        let registry = self.lookup.registry();
        let mut types = SecondaryMap::new();
        for (id, particle) in molecule.particles_iter().filter(|(_, p)| p.is_typed()) {
            match registry.atom_type(&particle.atom_type) {
                Some(atom_type) => {
                    types.insert(id, atom_type);
                }
                None => problems.push(PrepareProblem::UnknownAtomType {
                    particle: particle.name.clone(),
                    atom_type: particle.atom_type.clone(),
                }),
            }
        }
        types
    }

    /// Sets mass and charge from the atom types; real atoms additionally receive the
    /// charge increment of every bond they take part in.
    fn assign_charges(
        &self,
        molecule: &mut Molecule,
        types: &SecondaryMap<ParticleId, &'a AtomType>,
        problems: &mut Vec<PrepareProblem>,
    ) {
        let mut updates = Vec::with_capacity(types.len());
        for (id, atom_type) in types {
            let mut charge = atom_type.charge;
            for &neighbor in molecule.bonded_neighbors(id).unwrap_or(&[]) {
                let Some(other) = types.get(neighbor) else {
                    continue;
                };
                match self.lookup.charge_increment_for(atom_type, other) {
                    Ok(increment) => charge += increment,
                    Err(source) => problems.push(PrepareProblem::MissingParameter {
                        element: format!(
                            "charge increment {}",
                            describe(molecule, &[id, neighbor])
                        ),
                        source,
                    }),
                }
            }
            updates.push((id, atom_type.mass, charge));
        }

        for (id, mass, charge) in updates {
            if let Some(particle) = molecule.particle_mut(id) {
                particle.mass = mass;
                particle.charge = charge;
            }
        }
    }

    fn assign_terms(
        &self,
        molecule: &Molecule,
        types: &SecondaryMap<ParticleId, &'a AtomType>,
        prepared: &mut PreparedMolecule,
        problems: &mut Vec<PrepareProblem>,
    ) {
        let mut record = |element: &str, ids: &[ParticleId], result: Result<&Term, ParameterMissing>| {
            result.map(Term::clone).map_err(|source| {
                problems.push(PrepareProblem::MissingParameter {
                    element: format!("{element} {}", describe(molecule, ids)),
                    source,
                })
            })
        };

        for (bond_id, bond) in molecule.bonds_iter() {
            let Some([t1, t2]) = types_of(types, [bond.atom1, bond.atom2]) else {
                continue;
            };
            if let Ok(term) = record("bond", &[bond.atom1, bond.atom2], self.lookup.bond_for(t1, t2)) {
                prepared.bond_terms.insert(bond_id, term);
            }
        }

        for (angle_id, angle) in molecule.angles_iter() {
            let ids = [angle.atom1, angle.center, angle.atom3];
            let Some([t1, t2, t3]) = types_of(types, ids) else {
                continue;
            };
            if let Ok(term) = record("angle", &ids, self.lookup.angle_for(t1, t2, t3)) {
                prepared.angle_terms.insert(angle_id, term);
            }
        }

        for (dihedral_id, dihedral) in molecule.dihedrals_iter() {
            let ids = [dihedral.atom1, dihedral.atom2, dihedral.atom3, dihedral.atom4];
            let Some(dihedral_types) = types_of(types, ids) else {
                continue;
            };
            if let Ok(term) = record("dihedral", &ids, self.lookup.dihedral_for(dihedral_types)) {
                prepared.dihedral_terms.insert(dihedral_id, term);
            }
        }

        for (improper_id, improper) in molecule.impropers_iter() {
            let [s1, s2, s3] = improper.sides;
            let ids = [improper.center, s1, s2, s3];
            let Some([center, t1, t2, t3]) = types_of(types, ids) else {
                continue;
            };
            if let Ok(term) = record(
                "improper",
                &ids,
                self.lookup.improper_for(center, [t1, t2, t3]),
            ) {
                prepared.improper_terms.insert(improper_id, term);
            }
        }

        for (id, atom_type) in types {
            match self.lookup.vdw_for(atom_type, atom_type) {
                Ok(params) => {
                    prepared.vdw.insert(id, params);
                }
                Err(source) => problems.push(PrepareProblem::MissingParameter {
                    element: format!("vdW of {}", describe(molecule, &[id])),
                    source,
                }),
            }
        }
    }

    /// Only real-atom 1-4 pairs with a dispersion factor strictly between 0 and 1 need
    /// explicit pair parameters.
    fn assign_pair_vdw(
        &self,
        molecule: &Molecule,
        types: &SecondaryMap<ParticleId, &'a AtomType>,
        prepared: &mut PreparedMolecule,
        problems: &mut Vec<PrepareProblem>,
    ) {
        let is_real = |id: ParticleId| molecule.particle(id).is_some_and(|p| p.kind.is_real());
        let pairs = prepared
            .pair_table
            .scaled_pairs()
            .filter(|&((a, b), _, vdw)| vdw > 0.0 && vdw < 1.0 && is_real(a) && is_real(b))
            .map(|(pair, _, _)| pair)
            .collect_vec();

        for (a, b) in pairs {
            let Some([t1, t2]) = types_of(types, [a, b]) else {
                continue;
            };
            match self.lookup.vdw_for(t1, t2) {
                Ok(params) => {
                    prepared.pair_vdw.insert((a, b), params);
                }
                Err(source) => problems.push(PrepareProblem::MissingParameter {
                    element: format!("1-4 vdW pair {}", describe(molecule, &[a, b])),
                    source,
                }),
            }
        }
    }
}

fn types_of<'a, const N: usize>(
    types: &SecondaryMap<ParticleId, &'a AtomType>,
    ids: [ParticleId; N],
) -> Option<[&'a AtomType; N]> {
    let found: Vec<&'a AtomType> = ids
        .iter()
        .map(|&id| types.get(id).copied())
        .collect::<Option<_>>()?;
    found.try_into().ok()
}

fn describe(molecule: &Molecule, ids: &[ParticleId]) -> String {
    ids.iter()
        .map(|&id| molecule.particle(id).map_or("?", |p| p.name.as_str()))
        .join("-")
}

#[instrument(skip_all, name = "prepare_molecules")]
pub fn prepare_molecules<M: PatternMatcher>(
    resources: &Resources<M>,
    config: &PrepareConfig,
    molecules: &[Molecule],
    reporter: &ProgressReporter,
) -> Vec<Result<PreparedMolecule, EngineError>> {
    let preparer = MoleculePreparer::new(resources, config);
    reporter.report(Progress::BatchStart {
        molecules: molecules.len() as u64,
    });

    let prepare_one = |molecule: &Molecule| {
        let result = preparer.prepare(molecule);
        reporter.report(Progress::MoleculeFinished {
            name: molecule.name().to_string(),
            succeeded: result.is_ok(),
        });
        result
    };

    #[cfg(feature = "parallel")]
    let results: Vec<_> = molecules.par_iter().map(prepare_one).collect();
    #[cfg(not(feature = "parallel"))]
    let results: Vec<_> = molecules.iter().map(prepare_one).collect();

    reporter.report(Progress::BatchFinish);
    info!(
        "Prepared {} of {} molecule(s).",
        results.iter().filter(|r| r.is_ok()).count(),
        molecules.len()
    );
    results
}

/// Loads the force field and type definitions named by `config`, then prepares every
/// molecule against them.
#[instrument(skip_all, name = "prepare_workflow")]
pub fn run<M: PatternMatcher>(
    config: &PrepareConfig,
    matcher: M,
    molecules: &[Molecule],
    reporter: &ProgressReporter,
) -> Result<Vec<Result<PreparedMolecule, EngineError>>, EngineError> {
    let resources = reporter.stage("Loading Resources", || {
        info!("Loading force field and type definitions.");
        load_resources(config, matcher)
    })?;

    Ok(reporter.stage("Preparing Molecules", || {
        prepare_molecules(&resources, config, molecules, reporter)
    }))
}
