use std::fmt;
use thiserror::Error;

/// Class name matching any equivalence class in the slot it occupies.
pub const WILDCARD: &str = "*";

#[inline]
fn is_wildcard(name: &str) -> bool {
    name == WILDCARD
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CanonicalizationError {
    #[error("Wildcard is not allowed in slot {slot} of a {category} term")]
    WildcardNotAllowed { category: TermCategory, slot: usize },
    #[error("Empty class name in slot {slot} of a {category} term")]
    EmptyClassName { category: TermCategory, slot: usize },
    #[error("Periodic multiplicity must be a positive integer, got {0}")]
    NonPositiveMultiplicity(i64),
    #[error("Periodic multiplicity {0} appears more than once")]
    DuplicateMultiplicity(u32),
    #[error(
        "Periodic component lists differ in length (n: {n}, k: {k}, phi: {phi})"
    )]
    ComponentLengthMismatch { n: usize, k: usize, phi: usize },
}

/// The interaction class of a term, in canonical export order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TermCategory {
    ChargeIncrement,
    Vdw,
    Bond,
    Angle,
    Dihedral,
    Improper,
}

impl fmt::Display for TermCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::ChargeIncrement => "charge-increment",
                Self::Vdw => "vdw",
                Self::Bond => "bond",
                Self::Angle => "angle",
                Self::Dihedral => "dihedral",
                Self::Improper => "improper",
            }
        )
    }
}

fn check_name(
    category: TermCategory,
    slot: usize,
    name: &str,
    wildcard_allowed: bool,
) -> Result<(), CanonicalizationError> {
    if name.is_empty() {
        return Err(CanonicalizationError::EmptyClassName { category, slot });
    }
    if !wildcard_allowed && is_wildcard(name) {
        return Err(CanonicalizationError::WildcardNotAllowed { category, slot });
    }
    Ok(())
}

/// Canonical two-body class tuple: the two names in sorted order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey([String; 2]);

impl PairKey {
    /// Canonicalizes a pair and reports whether the input order was reversed.
    pub fn canonicalize(
        category: TermCategory,
        a: &str,
        b: &str,
    ) -> Result<(Self, bool), CanonicalizationError> {
        check_name(category, 1, a, false)?;
        check_name(category, 2, b, false)?;
        if a <= b {
            Ok((Self([a.to_string(), b.to_string()]), false))
        } else {
            Ok((Self([b.to_string(), a.to_string()]), true))
        }
    }

    pub fn new(category: TermCategory, a: &str, b: &str) -> Result<Self, CanonicalizationError> {
        Self::canonicalize(category, a, b).map(|(key, _)| key)
    }

    pub fn classes(&self) -> &[String; 2] {
        &self.0
    }
}

/// Canonical angle tuple: side slots sorted, center fixed in slot 2.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AngleKey([String; 3]);

impl AngleKey {
    pub fn new(side1: &str, center: &str, side2: &str) -> Result<Self, CanonicalizationError> {
        let category = TermCategory::Angle;
        check_name(category, 1, side1, false)?;
        check_name(category, 2, center, false)?;
        check_name(category, 3, side2, false)?;
        let (s1, s2) = if side1 <= side2 {
            (side1, side2)
        } else {
            (side2, side1)
        };
        Ok(Self([s1.to_string(), center.to_string(), s2.to_string()]))
    }

    pub fn classes(&self) -> &[String; 3] {
        &self.0
    }
}

/// Canonical proper-dihedral tuple.
///
/// The two center slots never hold a wildcard. A tuple with exactly one wildcard side keeps
/// the wildcard in slot 4; any other tuple is the lexicographic minimum of itself and its
/// reversal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DihedralKey([String; 4]);

impl DihedralKey {
    pub fn new(classes: [&str; 4]) -> Result<Self, CanonicalizationError> {
        let category = TermCategory::Dihedral;
        for (slot, name) in classes.iter().enumerate() {
            check_name(category, slot + 1, name, slot == 0 || slot == 3)?;
        }

        let forward = classes;
        let reversed = [classes[3], classes[2], classes[1], classes[0]];
        let chosen = match (is_wildcard(classes[0]), is_wildcard(classes[3])) {
            (true, false) => reversed,
            (false, true) => forward,
            _ => forward.min(reversed),
        };
        Ok(Self(chosen.map(str::to_string)))
    }

    pub fn classes(&self) -> &[String; 4] {
        &self.0
    }

    pub fn wildcard_count(&self) -> usize {
        self.0.iter().filter(|c| is_wildcard(c)).count()
    }

    /// Whether this (possibly wildcarded) key covers the concrete tuple in either direction.
    pub fn covers(&self, classes: &[&str; 4]) -> bool {
        let matches = |query: [&str; 4]| {
            self.0
                .iter()
                .zip(query)
                .all(|(own, other)| is_wildcard(own) || own == other)
        };
        matches(*classes) || matches([classes[3], classes[2], classes[1], classes[0]])
    }
}

/// Canonical improper tuple: center in slot 1, named sides sorted, then wildcard padding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImproperKey([String; 4]);

impl ImproperKey {
    pub fn new(center: &str, sides: [&str; 3]) -> Result<Self, CanonicalizationError> {
        let category = TermCategory::Improper;
        check_name(category, 1, center, false)?;
        for (i, side) in sides.iter().enumerate() {
            check_name(category, i + 2, side, true)?;
        }

        let mut named: Vec<&str> = sides.into_iter().filter(|s| !is_wildcard(s)).collect();
        named.sort_unstable();
        let mut slots = [
            center.to_string(),
            WILDCARD.to_string(),
            WILDCARD.to_string(),
            WILDCARD.to_string(),
        ];
        for (slot, name) in slots[1..].iter_mut().zip(named) {
            *slot = name.to_string();
        }
        Ok(Self(slots))
    }

    pub fn classes(&self) -> &[String; 4] {
        &self.0
    }

    pub fn center(&self) -> &str {
        &self.0[0]
    }

    pub fn wildcard_count(&self) -> usize {
        self.0[1..].iter().filter(|c| is_wildcard(c)).count()
    }

    /// Whether this key covers a concrete improper: same center, and the named sides form a
    /// sub-multiset of the query's sides.
    pub fn covers(&self, center: &str, sides: &[&str; 3]) -> bool {
        if self.0[0] != center {
            return false;
        }
        let mut remaining: Vec<&str> = sides.to_vec();
        self.0[1..]
            .iter()
            .filter(|s| !is_wildcard(s))
            .all(|named| match remaining.iter().position(|s| s == named) {
                Some(pos) => {
                    remaining.swap_remove(pos);
                    true
                }
                None => false,
            })
    }
}

/// Canonical identity of a term within a registry. The derived ordering (category first,
/// then class tuple) is the export order of the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TermKey {
    ChargeIncrement(PairKey),
    Vdw(PairKey),
    Bond(PairKey),
    Angle(AngleKey),
    Dihedral(DihedralKey),
    Improper(ImproperKey),
}

impl TermKey {
    pub fn category(&self) -> TermCategory {
        match self {
            Self::ChargeIncrement(_) => TermCategory::ChargeIncrement,
            Self::Vdw(_) => TermCategory::Vdw,
            Self::Bond(_) => TermCategory::Bond,
            Self::Angle(_) => TermCategory::Angle,
            Self::Dihedral(_) => TermCategory::Dihedral,
            Self::Improper(_) => TermCategory::Improper,
        }
    }

    pub fn classes(&self) -> &[String] {
        match self {
            Self::ChargeIncrement(k) | Self::Vdw(k) | Self::Bond(k) => &k.classes()[..],
            Self::Angle(k) => &k.classes()[..],
            Self::Dihedral(k) => &k.classes()[..],
            Self::Improper(k) => &k.classes()[..],
        }
    }
}

impl fmt::Display for TermKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.category(), self.classes().join(","))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VdwParams {
    LJ126 {
        epsilon: f64,
        sigma: f64,
    },
    Mie {
        epsilon: f64,
        sigma: f64,
        repulsion: f64,
        attraction: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BondParams {
    Harmonic { length: f64, k: f64, fixed: bool },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AngleParams {
    Harmonic {
        theta: f64,
        k: f64,
        fixed: bool,
    },
    Sdk {
        theta: f64,
        k: f64,
        epsilon: f64,
        sigma: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodicComponent {
    pub n: u32,
    pub k: f64,
    pub phi: f64,
}

/// A Fourier series of periodic torsion components with distinct positive multiplicities.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PeriodicSeries {
    components: Vec<PeriodicComponent>,
}

impl PeriodicSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a series from parallel lists of multiplicities, force constants and phases.
    pub fn from_lists(n: &[i64], k: &[f64], phi: &[f64]) -> Result<Self, CanonicalizationError> {
        if n.len() != k.len() || n.len() != phi.len() {
            return Err(CanonicalizationError::ComponentLengthMismatch {
                n: n.len(),
                k: k.len(),
                phi: phi.len(),
            });
        }
        let mut series = Self::new();
        for ((&n, &k), &phi) in n.iter().zip(k).zip(phi) {
            series.add_component(n, k, phi)?;
        }
        Ok(series)
    }

    /// Appends a component, rejecting non-positive or repeated multiplicities.
    pub fn add_component(&mut self, n: i64, k: f64, phi: f64) -> Result<(), CanonicalizationError> {
        let n = u32::try_from(n)
            .ok()
            .filter(|&n| n > 0)
            .ok_or(CanonicalizationError::NonPositiveMultiplicity(n))?;
        if self.components.iter().any(|c| c.n == n) {
            return Err(CanonicalizationError::DuplicateMultiplicity(n));
        }
        self.components.push(PeriodicComponent { n, k, phi });
        Ok(())
    }

    pub fn components(&self) -> &[PeriodicComponent] {
        &self.components
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DihedralParams {
    Periodic(PeriodicSeries),
    Opls { k1: f64, k2: f64, k3: f64, k4: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImproperParams {
    Periodic { phi: f64, k: f64 },
    Harmonic { phi: f64, k: f64 },
}

/// A canonicalized force-field interaction term.
///
/// Terms can only be built through the constructors below, which normalize the class tuple
/// so that two terms describing the same interaction always carry the same [`TermKey`].
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    ChargeIncrement { key: PairKey, value: f64 },
    Vdw { key: PairKey, params: VdwParams },
    Bond { key: PairKey, params: BondParams },
    Angle { key: AngleKey, params: AngleParams },
    Dihedral { key: DihedralKey, params: DihedralParams },
    Improper { key: ImproperKey, params: ImproperParams },
}

impl Term {
    /// Builds a charge increment: `value` is transferred from `from` to `to` in the given
    /// orientation and is negated if canonicalization swaps the pair.
    pub fn charge_increment(from: &str, to: &str, value: f64) -> Result<Self, CanonicalizationError> {
        let (key, swapped) = PairKey::canonicalize(TermCategory::ChargeIncrement, from, to)?;
        let value = if swapped { -value } else { value };
        Ok(Self::ChargeIncrement { key, value })
    }

    pub fn vdw(a: &str, b: &str, params: VdwParams) -> Result<Self, CanonicalizationError> {
        Ok(Self::Vdw {
            key: PairKey::new(TermCategory::Vdw, a, b)?,
            params,
        })
    }

    pub fn bond(a: &str, b: &str, params: BondParams) -> Result<Self, CanonicalizationError> {
        Ok(Self::Bond {
            key: PairKey::new(TermCategory::Bond, a, b)?,
            params,
        })
    }

    pub fn angle(
        side1: &str,
        center: &str,
        side2: &str,
        params: AngleParams,
    ) -> Result<Self, CanonicalizationError> {
        Ok(Self::Angle {
            key: AngleKey::new(side1, center, side2)?,
            params,
        })
    }

    pub fn dihedral(classes: [&str; 4], params: DihedralParams) -> Result<Self, CanonicalizationError> {
        Ok(Self::Dihedral {
            key: DihedralKey::new(classes)?,
            params,
        })
    }

    pub fn improper(
        center: &str,
        sides: [&str; 3],
        params: ImproperParams,
    ) -> Result<Self, CanonicalizationError> {
        Ok(Self::Improper {
            key: ImproperKey::new(center, sides)?,
            params,
        })
    }

    pub fn key(&self) -> TermKey {
        match self {
            Self::ChargeIncrement { key, .. } => TermKey::ChargeIncrement(key.clone()),
            Self::Vdw { key, .. } => TermKey::Vdw(key.clone()),
            Self::Bond { key, .. } => TermKey::Bond(key.clone()),
            Self::Angle { key, .. } => TermKey::Angle(key.clone()),
            Self::Dihedral { key, .. } => TermKey::Dihedral(key.clone()),
            Self::Improper { key, .. } => TermKey::Improper(key.clone()),
        }
    }

    pub fn category(&self) -> TermCategory {
        match self {
            Self::ChargeIncrement { .. } => TermCategory::ChargeIncrement,
            Self::Vdw { .. } => TermCategory::Vdw,
            Self::Bond { .. } => TermCategory::Bond,
            Self::Angle { .. } => TermCategory::Angle,
            Self::Dihedral { .. } => TermCategory::Dihedral,
            Self::Improper { .. } => TermCategory::Improper,
        }
    }

    /// Persistent name of the concrete term kind, e.g. `HarmonicBondTerm`.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::ChargeIncrement { .. } => "ChargeIncrementTerm",
            Self::Vdw { params, .. } => match params {
                VdwParams::LJ126 { .. } => "LJ126Term",
                VdwParams::Mie { .. } => "MieTerm",
            },
            Self::Bond { params, .. } => match params {
                BondParams::Harmonic { .. } => "HarmonicBondTerm",
            },
            Self::Angle { params, .. } => match params {
                AngleParams::Harmonic { .. } => "HarmonicAngleTerm",
                AngleParams::Sdk { .. } => "SDKAngleTerm",
            },
            Self::Dihedral { params, .. } => match params {
                DihedralParams::Periodic(_) => "PeriodicDihedralTerm",
                DihedralParams::Opls { .. } => "OplsDihedralTerm",
            },
            Self::Improper { params, .. } => match params {
                ImproperParams::Periodic { .. } => "PeriodicImproperTerm",
                ImproperParams::Harmonic { .. } => "HarmonicImproperTerm",
            },
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}: {}>", self.kind_name(), self.key().classes().join(","))
    }
}
