use super::definition::parse_definitions;
use super::error::{PatternError, TyperError, TypingIncomplete};
use super::forest::{ForestBuilder, RuleForest, RuleId};
use super::matcher::PatternMatcher;
use crate::core::models::ids::ParticleId;
use crate::core::models::molecule::Molecule;
use slotmap::SecondaryMap;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Collects rule definitions and compiles their patterns before freezing them into a
/// [`HierarchicalTyper`].
pub struct TyperBuilder<M: PatternMatcher> {
    matcher: M,
    forest: ForestBuilder<M::Compiled>,
}

impl<M: PatternMatcher> TyperBuilder<M> {
    pub fn new(matcher: M) -> Self {
        Self {
            matcher,
            forest: ForestBuilder::new(),
        }
    }

    fn compile(&self, rule: &str, pattern: &str) -> Result<M::Compiled, PatternError> {
        self.matcher.compile(pattern).map_err(|e| PatternError {
            rule: rule.to_string(),
            pattern: pattern.to_string(),
            source: Box::new(e),
        })
    }

    /// Adds every rule of a type-definition document.
    pub fn with_definitions(mut self, content: &str) -> Result<Self, TyperError> {
        let file = parse_definitions(content)?;
        for definition in &file.definitions {
            let compiled = self.compile(&definition.name, &definition.pattern)?;
            self.forest.define(&definition.name, compiled)?;
        }
        for placement in &file.placements {
            self.forest
                .attach(&placement.name, placement.parent.as_deref())?;
        }
        debug!(
            definitions = file.definitions.len(),
            placements = file.placements.len(),
            "Parsed type definitions"
        );
        Ok(self)
    }

    /// Adds a single rule under `parent` (the root when `None`).
    pub fn add_rule(
        &mut self,
        name: &str,
        pattern: &str,
        parent: Option<&str>,
    ) -> Result<RuleId, TyperError> {
        let compiled = self.compile(name, pattern)?;
        Ok(self.forest.add_rule(name, compiled, parent)?)
    }

    pub fn build(self) -> HierarchicalTyper<M> {
        HierarchicalTyper {
            matcher: self.matcher,
            forest: self.forest.build(),
        }
    }
}

/// Assigns force-field atom types by descending a forest of pattern rules.
///
/// Every placed rule is matched against the molecule once. An atom's candidate set holds
/// each rule that reported it as a match anchor, and its type is the rule reached by
/// [`RuleForest::resolve`]. The typer is immutable after construction and can be shared
/// between threads typing different molecules.
pub struct HierarchicalTyper<M: PatternMatcher> {
    matcher: M,
    forest: RuleForest<M::Compiled>,
}

impl<M: PatternMatcher> HierarchicalTyper<M> {
    pub fn from_definitions(content: &str, matcher: M) -> Result<Self, TyperError> {
        Ok(TyperBuilder::new(matcher).with_definitions(content)?.build())
    }

    pub fn load(path: &Path, matcher: M) -> Result<Self, TyperError> {
        let content = std::fs::read_to_string(path).map_err(|e| TyperError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let typer = Self::from_definitions(&content, matcher)?;
        info!(
            path = %path.display(),
            rules = typer.forest.len() - 1,
            "Loaded type definitions"
        );
        Ok(typer)
    }

    pub fn forest(&self) -> &RuleForest<M::Compiled> {
        &self.forest
    }

    pub fn matcher(&self) -> &M {
        &self.matcher
    }

    /// Collects, for every real atom, the set of placed rules whose pattern anchors on it.
    pub fn candidates(&self, molecule: &Molecule) -> SecondaryMap<ParticleId, HashSet<RuleId>> {
        let mut candidates: SecondaryMap<ParticleId, HashSet<RuleId>> = molecule
            .atoms_iter()
            .map(|(id, _)| (id, HashSet::new()))
            .collect();

        for rule_id in self.forest.placed_rules() {
            let Some(pattern) = self.forest.rule(rule_id).and_then(|r| r.pattern.as_ref()) else {
                continue;
            };
            for anchor in self.matcher.match_anchors(pattern, molecule) {
                if let Some(set) = candidates.get_mut(anchor) {
                    set.insert(rule_id);
                }
            }
        }
        candidates
    }

    /// Resolves the type of every real atom without modifying the molecule.
    ///
    /// # Errors
    ///
    /// Returns [`TypingIncomplete`] listing every atom that matched no rule below the root.
    pub fn resolve_molecule(
        &self,
        molecule: &Molecule,
    ) -> Result<SecondaryMap<ParticleId, RuleId>, TypingIncomplete> {
        let candidates = self.candidates(molecule);
        let mut resolved = SecondaryMap::new();
        let mut unresolved = TypingIncomplete {
            molecule: molecule.name().to_string(),
            atoms: Vec::new(),
            particles: Vec::new(),
        };

        for (id, atom) in molecule.atoms_iter() {
            let rule = candidates
                .get(id)
                .and_then(|set| self.forest.resolve(set));
            match rule {
                Some(rule) => {
                    resolved.insert(id, rule);
                }
                None => {
                    unresolved.atoms.push(atom.name.clone());
                    unresolved.particles.push(id);
                }
            }
        }

        if unresolved.atoms.is_empty() {
            Ok(resolved)
        } else {
            Err(unresolved)
        }
    }

    /// Types every real atom of the molecule in place.
    ///
    /// The molecule is left untouched when any atom stays unresolved.
    #[instrument(skip_all, name = "type_molecule")]
    pub fn type_molecule(&self, molecule: &mut Molecule) -> Result<(), TypingIncomplete> {
        let resolved = self.resolve_molecule(molecule)?;
        for (id, rule) in &resolved {
            if let Some(particle) = molecule.particle_mut(id) {
                particle.atom_type = self.forest.name(*rule).to_string();
            }
        }
        debug!(
            molecule = molecule.name(),
            atoms = resolved.len(),
            "Assigned atom types"
        );
        Ok(())
    }
}
