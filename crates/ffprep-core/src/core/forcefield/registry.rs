use super::atom_type::AtomType;
use super::fields::{
    ATOM_TYPE_KIND, FieldError, FieldMap, atom_type_from_fields, atom_type_to_fields,
    term_from_fields, term_to_fields,
};
use super::term::{Term, TermCategory, TermKey};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

const SETTINGS_SECTION: &str = "settings";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CombinationRule {
    /// `sigma = sqrt(s1*s2)`, `epsilon = sqrt(e1*e2)`.
    #[default]
    Geometric,
    /// `sigma = (s1+s2)/2`, `epsilon = sqrt(e1*e2)`.
    LorentzBerthelot,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForcefieldSettings {
    pub scale_14_vdw: f64,
    pub scale_14_coulomb: f64,
    pub vdw_cutoff: f64,
    pub combination_rule: CombinationRule,
}

impl Default for ForcefieldSettings {
    fn default() -> Self {
        Self {
            scale_14_vdw: 0.5,
            scale_14_coulomb: 0.5,
            vdw_cutoff: 1.2,
            combination_rule: CombinationRule::Geometric,
        }
    }
}

impl ForcefieldSettings {
    pub fn validate(&self) -> Result<(), RegistryError> {
        for (name, value) in [
            ("scale_14_vdw", self.scale_14_vdw),
            ("scale_14_coulomb", self.scale_14_coulomb),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(RegistryError::InvalidSetting { name, value });
            }
        }
        if !(self.vdw_cutoff.is_finite() && self.vdw_cutoff > 0.0) {
            return Err(RegistryError::InvalidSetting {
                name: "vdw_cutoff",
                value: self.vdw_cutoff,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Duplicate term {0}")]
    DuplicateTerm(TermKey),
    #[error("Duplicate atom type '{0}'")]
    DuplicateAtomType(String),
    #[error("Invalid value {value} for setting '{name}'")]
    InvalidSetting { name: &'static str, value: f64 },
}

#[derive(Debug, Error)]
pub enum RegistryLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("TOML serialization error for '{path}': {source}")]
    TomlWrite {
        path: String,
        source: toml::ser::Error,
    },
    #[error("Section '{section}' must be an array of tables")]
    InvalidSection { section: String },
    #[error("Entry {index} of '{section}' has a non-scalar value for field '{field}'")]
    InvalidEntry {
        section: String,
        index: usize,
        field: String,
    },
    #[error("Entry {index} of '{section}': {source}")]
    Field {
        section: String,
        index: usize,
        source: FieldError,
    },
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// A term together with its position in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredTerm {
    pub term: Term,
    pub index: usize,
}

/// Storage of atom types and canonical terms for one force field.
///
/// Every term is stored under its canonical [`TermKey`]; a second term with the same key
/// is rejected. Iteration is in key order; the declaration index of each term breaks ties
/// between equally specific wildcard terms and is kept when the registry is saved.
#[derive(Debug, Clone, Default)]
pub struct TermRegistry {
    settings: ForcefieldSettings,
    atom_types: BTreeMap<String, AtomType>,
    terms: BTreeMap<TermKey, RegisteredTerm>,
    next_index: usize,
}

impl TermRegistry {
    pub fn new(settings: ForcefieldSettings) -> Result<Self, RegistryError> {
        settings.validate()?;
        Ok(Self {
            settings,
            ..Self::default()
        })
    }

    pub fn settings(&self) -> &ForcefieldSettings {
        &self.settings
    }

    pub fn add_atom_type(&mut self, atom_type: AtomType) -> Result<(), RegistryError> {
        if self.atom_types.contains_key(&atom_type.name) {
            return Err(RegistryError::DuplicateAtomType(atom_type.name));
        }
        self.atom_types.insert(atom_type.name.clone(), atom_type);
        Ok(())
    }

    /// Registers a term, assigning it the next declaration index.
    pub fn add_term(&mut self, term: Term) -> Result<(), RegistryError> {
        let key = term.key();
        if self.terms.contains_key(&key) {
            return Err(RegistryError::DuplicateTerm(key));
        }
        let index = self.next_index;
        self.next_index += 1;
        self.terms.insert(key, RegisteredTerm { term, index });
        Ok(())
    }

    pub fn atom_type(&self, name: &str) -> Option<&AtomType> {
        self.atom_types.get(name)
    }

    pub fn atom_types(&self) -> impl Iterator<Item = &AtomType> {
        self.atom_types.values()
    }

    pub fn term(&self, key: &TermKey) -> Option<&RegisteredTerm> {
        self.terms.get(key)
    }

    /// All terms in canonical order.
    pub fn terms(&self) -> impl Iterator<Item = &RegisteredTerm> {
        self.terms.values()
    }

    pub fn terms_of(&self, category: TermCategory) -> impl Iterator<Item = &RegisteredTerm> {
        self.terms
            .values()
            .filter(move |t| t.term.category() == category)
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    /// Loads a registry from a TOML parameter file.
    ///
    /// The file holds an optional `[settings]` table, an `[[AtomType]]` array and one array
    /// of tables per term kind (e.g. `[[HarmonicBondTerm]]`). Field values may be written as
    /// strings, numbers or booleans. Loading is all-or-nothing: the first invalid entry or
    /// duplicate canonical identity aborts the load.
    pub fn load(path: &Path) -> Result<Self, RegistryLoadError> {
        let path_str = path.to_string_lossy().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| RegistryLoadError::Io {
            path: path_str.clone(),
            source: e,
        })?;
        let registry = Self::from_toml_str(&content).map_err(|e| match e {
            RegistryLoadError::Toml { source, .. } => RegistryLoadError::Toml {
                path: path_str.clone(),
                source,
            },
            other => other,
        })?;
        info!(
            path = %path_str,
            atom_types = registry.atom_types.len(),
            terms = registry.terms.len(),
            "Loaded force-field parameters"
        );
        Ok(registry)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, RegistryLoadError> {
        let document: toml::Table =
            toml::from_str(content).map_err(|e| RegistryLoadError::Toml {
                path: "<string>".to_string(),
                source: e,
            })?;

        let settings = match document.get(SETTINGS_SECTION) {
            Some(value) => value
                .clone()
                .try_into::<ForcefieldSettings>()
                .map_err(|e| RegistryLoadError::Toml {
                    path: "<string>".to_string(),
                    source: e,
                })?,
            None => ForcefieldSettings::default(),
        };
        let mut registry = Self::new(settings)?;

        if let Some(value) = document.get(ATOM_TYPE_KIND) {
            let entries = section_entries(ATOM_TYPE_KIND, value.clone())?;
            for (index, fields) in entries.into_iter().enumerate() {
                let atom_type =
                    atom_type_from_fields(&fields).map_err(|source| RegistryLoadError::Field {
                        section: ATOM_TYPE_KIND.to_string(),
                        index,
                        source,
                    })?;
                registry.add_atom_type(atom_type)?;
            }
        }

        // Document order: section by first appearance, then array order.
        for (section, value) in document
            .into_iter()
            .filter(|(section, _)| section != SETTINGS_SECTION && section != ATOM_TYPE_KIND)
        {
            let entries = section_entries(&section, value)?;
            debug!(section = %section, count = entries.len(), "Reading term section");
            for (index, fields) in entries.into_iter().enumerate() {
                let term = term_from_fields(&section, &fields).map_err(|source| {
                    RegistryLoadError::Field {
                        section: section.clone(),
                        index,
                        source,
                    }
                })?;
                registry.add_term(term)?;
            }
        }
        Ok(registry)
    }

    /// Serializes the registry into the TOML layout accepted by [`TermRegistry::load`].
    /// Every field is written as a string with the fixed precision of its quantity.
    ///
    /// Term sections appear in the order of their first declared term and entries follow
    /// declaration order, so reloading a registry read from disk keeps every index.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        let mut document = toml::Table::new();
        document.insert(
            SETTINGS_SECTION.to_string(),
            toml::Value::try_from(self.settings)?,
        );

        let atom_types: Vec<toml::Value> = self
            .atom_types
            .values()
            .map(|t| fields_to_value(atom_type_to_fields(t)))
            .collect();
        if !atom_types.is_empty() {
            document.insert(ATOM_TYPE_KIND.to_string(), toml::Value::Array(atom_types));
        }

        let mut sections: Vec<(&'static str, Vec<toml::Value>)> = Vec::new();
        for registered in self.terms.values().sorted_by_key(|t| t.index) {
            let kind = registered.term.kind_name();
            let entry = fields_to_value(term_to_fields(&registered.term));
            match sections.iter_mut().find(|(k, _)| *k == kind) {
                Some((_, entries)) => entries.push(entry),
                None => sections.push((kind, vec![entry])),
            }
        }
        for (kind, entries) in sections {
            document.insert(kind.to_string(), toml::Value::Array(entries));
        }
        toml::to_string(&document)
    }

    pub fn save(&self, path: &Path) -> Result<(), RegistryLoadError> {
        let path_str = path.to_string_lossy().to_string();
        let content = self
            .to_toml_string()
            .map_err(|e| RegistryLoadError::TomlWrite {
                path: path_str.clone(),
                source: e,
            })?;
        std::fs::write(path, content).map_err(|e| RegistryLoadError::Io {
            path: path_str,
            source: e,
        })
    }
}

fn fields_to_value(fields: FieldMap) -> toml::Value {
    toml::Value::Table(
        fields
            .into_iter()
            .map(|(k, v)| (k, toml::Value::String(v)))
            .collect(),
    )
}

fn section_entries(section: &str, value: toml::Value) -> Result<Vec<FieldMap>, RegistryLoadError> {
    let toml::Value::Array(entries) = value else {
        return Err(RegistryLoadError::InvalidSection {
            section: section.to_string(),
        });
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let toml::Value::Table(table) = entry else {
                return Err(RegistryLoadError::InvalidSection {
                    section: section.to_string(),
                });
            };
            table
                .into_iter()
                .map(|(field, value)| {
                    let text = match value {
                        toml::Value::String(s) => s,
                        toml::Value::Integer(i) => i.to_string(),
                        toml::Value::Float(f) => f.to_string(),
                        toml::Value::Boolean(b) => b.to_string(),
                        _ => {
                            return Err(RegistryLoadError::InvalidEntry {
                                section: section.to_string(),
                                index,
                                field,
                            });
                        }
                    };
                    Ok((field, text))
                })
                .collect::<Result<FieldMap, _>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::lookup::ParameterLookup;
    use crate::core::forcefield::term::{BondParams, DihedralKey, VdwParams};
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    const PARAMS: &str = r#"
        [settings]
        scale_14_vdw = 0.5
        scale_14_coulomb = 0.8333
        vdw_cutoff = 1.0
        combination_rule = "lorentz-berthelot"

        [[AtomType]]
        name = "c_4"
        symbol = "C"
        mass = 12.011
        charge = -0.18

        [[AtomType]]
        name = "h_1"
        symbol = "H"
        mass = "1.0080"
        charge = 0.06

        [[LJ126Term]]
        type1 = "c_4"
        type2 = "c_4"
        epsilon = 0.27614
        sigma = 0.35

        [[HarmonicBondTerm]]
        type1 = "h_1"
        type2 = "c_4"
        length = 0.109
        k = 284512
        fixed = true

        [[PeriodicDihedralTerm]]
        type1 = "*"
        type2 = "c_4"
        type3 = "c_4"
        type4 = "h_1"
        n_list = "3"
        k_list = "0.6276"
        phi_list = "0"
    "#;

    #[test]
    fn from_toml_str_reads_settings_types_and_terms() {
        let registry = TermRegistry::from_toml_str(PARAMS).unwrap();

        assert_eq!(registry.settings().scale_14_coulomb, 0.8333);
        assert_eq!(
            registry.settings().combination_rule,
            CombinationRule::LorentzBerthelot
        );
        assert_eq!(registry.atom_type("h_1").unwrap().mass, 1.008);
        assert_eq!(registry.term_count(), 3);

        let bond = Term::bond(
            "c_4",
            "h_1",
            BondParams::Harmonic {
                length: 0.109,
                k: 284512.0,
                fixed: true,
            },
        )
        .unwrap();
        assert_eq!(registry.term(&bond.key()).unwrap().term, bond);

        let dihedral = TermKey::Dihedral(DihedralKey::new(["h_1", "c_4", "c_4", "*"]).unwrap());
        assert!(registry.term(&dihedral).is_some());
    }

    #[test]
    fn missing_settings_table_uses_defaults() {
        let registry = TermRegistry::from_toml_str("").unwrap();
        assert_eq!(*registry.settings(), ForcefieldSettings::default());
        assert_eq!(registry.term_count(), 0);
    }

    #[test]
    fn duplicate_canonical_identity_fails_the_whole_load() {
        let content = r#"
            [[HarmonicBondTerm]]
            type1 = "a"
            type2 = "b"
            length = 0.1
            k = 1.0

            [[HarmonicBondTerm]]
            type1 = "b"
            type2 = "a"
            length = 0.2
            k = 2.0
        "#;
        let result = TermRegistry::from_toml_str(content);
        assert!(matches!(
            result,
            Err(RegistryLoadError::Registry(RegistryError::DuplicateTerm(_)))
        ));
    }

    #[test]
    fn invalid_entry_reports_section_and_index() {
        let content = r#"
            [[LJ126Term]]
            type1 = "a"
            type2 = "a"
            epsilon = 0.1
            sigma = 0.3

            [[LJ126Term]]
            type1 = "b"
            type2 = "b"
            epsilon = 0.1
        "#;
        match TermRegistry::from_toml_str(content) {
            Err(RegistryLoadError::Field { section, index, .. }) => {
                assert_eq!(section, "LJ126Term");
                assert_eq!(index, 1);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn unknown_section_is_rejected() {
        let content = r#"
            [[MorseBondTerm]]
            type1 = "a"
            type2 = "b"
        "#;
        assert!(matches!(
            TermRegistry::from_toml_str(content),
            Err(RegistryLoadError::Field {
                source: FieldError::UnknownKind(_),
                ..
            })
        ));
    }

    #[test]
    fn out_of_range_scale_factor_is_rejected() {
        let content = "[settings]\nscale_14_vdw = 1.5\n";
        assert!(matches!(
            TermRegistry::from_toml_str(content),
            Err(RegistryLoadError::Registry(RegistryError::InvalidSetting {
                name: "scale_14_vdw",
                ..
            }))
        ));
    }

    #[test]
    fn declaration_index_follows_insertion() {
        let mut registry = TermRegistry::default();
        let lj = VdwParams::LJ126 {
            epsilon: 0.1,
            sigma: 0.3,
        };
        registry.add_term(Term::vdw("z", "z", lj).unwrap()).unwrap();
        registry.add_term(Term::vdw("a", "a", lj).unwrap()).unwrap();

        let indices: Vec<_> = registry.terms().map(|t| t.index).collect();
        assert_eq!(indices, vec![1, 0]);
        registry.add_atom_type(AtomType::new("x")).unwrap();
        assert_eq!(
            registry.add_atom_type(AtomType::new("x")),
            Err(RegistryError::DuplicateAtomType("x".to_string()))
        );
    }

    #[test]
    fn save_and_load_round_trip() {
        let original = TermRegistry::from_toml_str(PARAMS).unwrap();
        let dir = tempdir().unwrap();
        let path = dir.path().join("ff.toml");
        original.save(&path).unwrap();

        let reloaded = TermRegistry::load(&path).unwrap();
        assert_eq!(reloaded.settings(), original.settings());
        assert_eq!(reloaded.term_count(), original.term_count());
        for (a, b) in original.terms().zip(reloaded.terms()) {
            assert_eq!(a.term.key(), b.term.key());
            assert_eq!(a.term.kind_name(), b.term.kind_name());
        }
        assert_eq!(
            reloaded.atom_type("c_4").unwrap(),
            original.atom_type("c_4").unwrap()
        );
    }

    const COMPETING_WILDCARDS: &str = r#"
        [[PeriodicDihedralTerm]]
        type1 = "x"
        type2 = "b"
        type3 = "c"
        type4 = "*"
        n_list = "3"
        k_list = "1.0"
        phi_list = "0"

        [[OplsDihedralTerm]]
        type1 = "*"
        type2 = "b"
        type3 = "c"
        type4 = "y"
        k1 = 2.0
        k2 = 0.0
        k3 = 0.0
        k4 = 0.0
    "#;

    fn winning_kind(registry: &TermRegistry) -> &'static str {
        ParameterLookup::new(registry)
            .dihedral(["x", "b", "c", "y"])
            .unwrap()
            .kind_name()
    }

    #[test]
    fn term_sections_are_indexed_in_document_order() {
        let registry = TermRegistry::from_toml_str(COMPETING_WILDCARDS).unwrap();
        let mut by_index: Vec<_> = registry.terms().collect();
        by_index.sort_by_key(|t| t.index);
        let kinds: Vec<_> = by_index.iter().map(|t| t.term.kind_name()).collect();

        assert_eq!(kinds, vec!["PeriodicDihedralTerm", "OplsDihedralTerm"]);
        assert_eq!(winning_kind(&registry), "PeriodicDihedralTerm");
    }

    #[test]
    fn wildcard_tie_break_survives_save_and_load() {
        let original = TermRegistry::from_toml_str(COMPETING_WILDCARDS).unwrap();
        let dir = tempdir().unwrap();
        let path = dir.path().join("ff.toml");
        original.save(&path).unwrap();

        let reloaded = TermRegistry::load(&path).unwrap();
        for term in original.terms() {
            assert_eq!(reloaded.term(&term.term.key()).unwrap().index, term.index);
        }
        assert_eq!(winning_kind(&reloaded), "PeriodicDihedralTerm");
    }

    #[test]
    fn load_reports_path_for_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        match TermRegistry::load(&path) {
            Err(RegistryLoadError::Io { path: p, .. }) => assert!(p.ends_with("missing.toml")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn load_reports_path_for_malformed_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "[[HarmonicBondTerm]\ntype1 = ").unwrap();

        match TermRegistry::load(&path) {
            Err(RegistryLoadError::Toml { path: p, .. }) => assert!(p.ends_with("bad.toml")),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
