use super::atom_type::{AtomType, EquivalenceClass};
use super::term::{
    AngleParams, BondParams, CanonicalizationError, DihedralParams, ImproperParams,
    PeriodicSeries, Term, VdwParams,
};
use phf::{Map, phf_map};
use std::collections::BTreeMap;
use thiserror::Error;

/// Flat, string-keyed persistent form of a term or atom type.
pub type FieldMap = BTreeMap<String, String>;

pub const ATOM_TYPE_KIND: &str = "AtomType";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermKind {
    ChargeIncrement,
    LJ126,
    Mie,
    HarmonicBond,
    HarmonicAngle,
    SdkAngle,
    PeriodicDihedral,
    OplsDihedral,
    PeriodicImproper,
    HarmonicImproper,
}

static TERM_KINDS: Map<&'static str, TermKind> = phf_map! {
    "ChargeIncrementTerm" => TermKind::ChargeIncrement,
    "LJ126Term" => TermKind::LJ126,
    "MieTerm" => TermKind::Mie,
    "HarmonicBondTerm" => TermKind::HarmonicBond,
    "HarmonicAngleTerm" => TermKind::HarmonicAngle,
    "SDKAngleTerm" => TermKind::SdkAngle,
    "PeriodicDihedralTerm" => TermKind::PeriodicDihedral,
    "OplsDihedralTerm" => TermKind::OplsDihedral,
    "PeriodicImproperTerm" => TermKind::PeriodicImproper,
    "HarmonicImproperTerm" => TermKind::HarmonicImproper,
};

/// Resolves a persistent term kind name such as `HarmonicBondTerm`.
pub fn term_kind(name: &str) -> Option<TermKind> {
    TERM_KINDS.get(name).copied()
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FieldError {
    #[error("Unknown term kind '{0}'")]
    UnknownKind(String),
    #[error("Missing field '{field}' in {kind}")]
    MissingField { kind: String, field: String },
    #[error("Invalid value '{value}' for field '{field}' in {kind}")]
    InvalidValue {
        kind: String,
        field: String,
        value: String,
    },
    #[error("Invalid {kind} definition: {source}")]
    Canonicalization {
        kind: String,
        #[source]
        source: CanonicalizationError,
    },
}

struct Reader<'a> {
    kind: &'a str,
    fields: &'a FieldMap,
}

impl<'a> Reader<'a> {
    fn str(&self, field: &str) -> Result<&'a str, FieldError> {
        self.fields
            .get(field)
            .map(|s| s.trim())
            .ok_or_else(|| FieldError::MissingField {
                kind: self.kind.to_string(),
                field: field.to_string(),
            })
    }

    fn invalid(&self, field: &str, value: &str) -> FieldError {
        FieldError::InvalidValue {
            kind: self.kind.to_string(),
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    fn f64(&self, field: &str) -> Result<f64, FieldError> {
        let raw = self.str(field)?;
        raw.parse().map_err(|_| self.invalid(field, raw))
    }

    fn f64_or(&self, field: &str, default: f64) -> Result<f64, FieldError> {
        if self.fields.contains_key(field) {
            self.f64(field)
        } else {
            Ok(default)
        }
    }

    fn bool_or(&self, field: &str, default: bool) -> Result<bool, FieldError> {
        let Some(raw) = self.fields.get(field).map(|s| s.trim()) else {
            return Ok(default);
        };
        match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(self.invalid(field, raw)),
        }
    }

    fn list<T: std::str::FromStr>(&self, field: &str) -> Result<Vec<T>, FieldError> {
        let raw = self.str(field)?;
        if raw.is_empty() {
            return Ok(Vec::new());
        }
        raw.split(',')
            .map(|item| item.trim().parse().map_err(|_| self.invalid(field, raw)))
            .collect()
    }

    fn canonical<T>(&self, result: Result<T, CanonicalizationError>) -> Result<T, FieldError> {
        result.map_err(|source| FieldError::Canonicalization {
            kind: self.kind.to_string(),
            source,
        })
    }
}

fn join<T>(values: impl Iterator<Item = T>, fmt: impl Fn(T) -> String) -> String {
    values.map(fmt).collect::<Vec<_>>().join(",")
}

/// Serializes a term into its flat field map.
///
/// Precision is fixed per quantity: lengths, force constants, epsilon and sigma use five
/// decimals; angles, phases and Mie exponents three; charge increments six.
pub fn term_to_fields(term: &Term) -> FieldMap {
    let mut fields = FieldMap::new();
    for (i, class) in term.key().classes().iter().enumerate() {
        fields.insert(format!("type{}", i + 1), class.clone());
    }
    let mut put = |name: &str, value: String| {
        fields.insert(name.to_string(), value);
    };

    match term {
        Term::ChargeIncrement { value, .. } => put("value", format!("{value:.6}")),
        Term::Vdw { params, .. } => match *params {
            VdwParams::LJ126 { epsilon, sigma } => {
                put("epsilon", format!("{epsilon:.5}"));
                put("sigma", format!("{sigma:.5}"));
            }
            VdwParams::Mie {
                epsilon,
                sigma,
                repulsion,
                attraction,
            } => {
                put("epsilon", format!("{epsilon:.5}"));
                put("sigma", format!("{sigma:.5}"));
                put("repulsion", format!("{repulsion:.3}"));
                put("attraction", format!("{attraction:.3}"));
            }
        },
        Term::Bond { params, .. } => match *params {
            BondParams::Harmonic { length, k, fixed } => {
                put("length", format!("{length:.5}"));
                put("k", format!("{k:.5}"));
                put("fixed", fixed.to_string());
            }
        },
        Term::Angle { params, .. } => match *params {
            AngleParams::Harmonic { theta, k, fixed } => {
                put("theta", format!("{theta:.3}"));
                put("k", format!("{k:.5}"));
                put("fixed", fixed.to_string());
            }
            AngleParams::Sdk {
                theta,
                k,
                epsilon,
                sigma,
            } => {
                put("theta", format!("{theta:.3}"));
                put("k", format!("{k:.5}"));
                put("epsilon", format!("{epsilon:.5}"));
                put("sigma", format!("{sigma:.5}"));
            }
        },
        Term::Dihedral { params, .. } => match params {
            DihedralParams::Periodic(series) => {
                let components = series.components();
                put("n_list", join(components.iter(), |c| c.n.to_string()));
                put("k_list", join(components.iter(), |c| format!("{:.5}", c.k)));
                put("phi_list", join(components.iter(), |c| format!("{:.3}", c.phi)));
            }
            DihedralParams::Opls { k1, k2, k3, k4 } => {
                put("k1", format!("{k1:.5}"));
                put("k2", format!("{k2:.5}"));
                put("k3", format!("{k3:.5}"));
                put("k4", format!("{k4:.5}"));
            }
        },
        Term::Improper { params, .. } => match *params {
            ImproperParams::Periodic { phi, k } | ImproperParams::Harmonic { phi, k } => {
                put("phi", format!("{phi:.3}"));
                put("k", format!("{k:.5}"));
            }
        },
    }
    fields
}

/// Parses a term of the named kind from its flat field map.
///
/// The class tuple is canonicalized again, so field maps written by hand in any
/// orientation are accepted.
pub fn term_from_fields(kind_name: &str, fields: &FieldMap) -> Result<Term, FieldError> {
    let kind = term_kind(kind_name).ok_or_else(|| FieldError::UnknownKind(kind_name.to_string()))?;
    let r = Reader {
        kind: kind_name,
        fields,
    };

    let term = match kind {
        TermKind::ChargeIncrement => {
            Term::charge_increment(r.str("type1")?, r.str("type2")?, r.f64("value")?)
        }
        TermKind::LJ126 => Term::vdw(
            r.str("type1")?,
            r.str("type2")?,
            VdwParams::LJ126 {
                epsilon: r.f64("epsilon")?,
                sigma: r.f64("sigma")?,
            },
        ),
        TermKind::Mie => Term::vdw(
            r.str("type1")?,
            r.str("type2")?,
            VdwParams::Mie {
                epsilon: r.f64("epsilon")?,
                sigma: r.f64("sigma")?,
                repulsion: r.f64("repulsion")?,
                attraction: r.f64("attraction")?,
            },
        ),
        TermKind::HarmonicBond => Term::bond(
            r.str("type1")?,
            r.str("type2")?,
            BondParams::Harmonic {
                length: r.f64("length")?,
                k: r.f64("k")?,
                fixed: r.bool_or("fixed", false)?,
            },
        ),
        TermKind::HarmonicAngle => Term::angle(
            r.str("type1")?,
            r.str("type2")?,
            r.str("type3")?,
            AngleParams::Harmonic {
                theta: r.f64("theta")?,
                k: r.f64("k")?,
                fixed: r.bool_or("fixed", false)?,
            },
        ),
        TermKind::SdkAngle => Term::angle(
            r.str("type1")?,
            r.str("type2")?,
            r.str("type3")?,
            AngleParams::Sdk {
                theta: r.f64("theta")?,
                k: r.f64("k")?,
                epsilon: r.f64("epsilon")?,
                sigma: r.f64("sigma")?,
            },
        ),
        TermKind::PeriodicDihedral => {
            let series = r.canonical(PeriodicSeries::from_lists(
                &r.list::<i64>("n_list")?,
                &r.list::<f64>("k_list")?,
                &r.list::<f64>("phi_list")?,
            ))?;
            Term::dihedral(four_types(&r)?, DihedralParams::Periodic(series))
        }
        TermKind::OplsDihedral => Term::dihedral(
            four_types(&r)?,
            DihedralParams::Opls {
                k1: r.f64("k1")?,
                k2: r.f64("k2")?,
                k3: r.f64("k3")?,
                k4: r.f64("k4")?,
            },
        ),
        TermKind::PeriodicImproper | TermKind::HarmonicImproper => {
            let (phi, k) = (r.f64("phi")?, r.f64("k")?);
            let params = match kind {
                TermKind::PeriodicImproper => ImproperParams::Periodic { phi, k },
                _ => ImproperParams::Harmonic { phi, k },
            };
            Term::improper(
                r.str("type1")?,
                [r.str("type2")?, r.str("type3")?, r.str("type4")?],
                params,
            )
        }
    };
    r.canonical(term)
}

fn four_types<'a>(r: &Reader<'a>) -> Result<[&'a str; 4], FieldError> {
    Ok([
        r.str("type1")?,
        r.str("type2")?,
        r.str("type3")?,
        r.str("type4")?,
    ])
}

pub fn atom_type_to_fields(atom_type: &AtomType) -> FieldMap {
    let mut fields = FieldMap::new();
    fields.insert("name".to_string(), atom_type.name.clone());
    fields.insert("symbol".to_string(), atom_type.symbol.clone());
    fields.insert("mass".to_string(), format!("{:.4}", atom_type.mass));
    fields.insert("charge".to_string(), format!("{:.6}", atom_type.charge));
    for class in EquivalenceClass::ALL {
        fields.insert(
            class.field_name().to_string(),
            atom_type.class(class).to_string(),
        );
    }
    fields
}

/// Parses an atom type. Only `name` is required; missing equivalence classes default to
/// the type name.
pub fn atom_type_from_fields(fields: &FieldMap) -> Result<AtomType, FieldError> {
    let r = Reader {
        kind: ATOM_TYPE_KIND,
        fields,
    };
    let name = r.str("name")?;
    if name.is_empty() {
        return Err(r.invalid("name", name));
    }

    let mut atom_type = AtomType::new(name);
    if let Some(symbol) = fields.get("symbol") {
        atom_type.symbol = symbol.trim().to_string();
    }
    atom_type.mass = r.f64_or("mass", 0.0)?;
    atom_type.charge = r.f64_or("charge", 0.0)?;
    for class in EquivalenceClass::ALL {
        if let Some(value) = fields.get(class.field_name()).map(|s| s.trim()) {
            if value.is_empty() {
                return Err(r.invalid(class.field_name(), value));
            }
            atom_type.set_class(class, value);
        }
    }
    Ok(atom_type)
}
