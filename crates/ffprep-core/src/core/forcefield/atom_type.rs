use std::fmt;

/// The role an atom type plays when a class tuple is built for a structural element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EquivalenceClass {
    Vdw,
    ChargeIncrement,
    Bond,
    AngleCenter,
    AngleSide,
    DihedralCenter,
    DihedralSide,
    ImproperCenter,
    ImproperSide,
}

impl EquivalenceClass {
    pub const ALL: [EquivalenceClass; 9] = [
        Self::Vdw,
        Self::ChargeIncrement,
        Self::Bond,
        Self::AngleCenter,
        Self::AngleSide,
        Self::DihedralCenter,
        Self::DihedralSide,
        Self::ImproperCenter,
        Self::ImproperSide,
    ];

    /// Persistent field name of this class in an atom-type field map.
    pub fn field_name(self) -> &'static str {
        match self {
            Self::Vdw => "eqt_vdw",
            Self::ChargeIncrement => "eqt_inc",
            Self::Bond => "eqt_bond",
            Self::AngleCenter => "eqt_ang_c",
            Self::AngleSide => "eqt_ang_s",
            Self::DihedralCenter => "eqt_dih_c",
            Self::DihedralSide => "eqt_dih_s",
            Self::ImproperCenter => "eqt_imp_c",
            Self::ImproperSide => "eqt_imp_s",
        }
    }
}

impl fmt::Display for EquivalenceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// A force-field atom type.
///
/// Besides its own name, every type carries one equivalence class per interaction role.
/// Parameters are looked up by class names, so several types can share one term by
/// declaring the same class. Every class defaults to the type's own name.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomType {
    pub name: String,
    pub symbol: String,
    pub mass: f64,
    pub charge: f64,
    pub eqt_vdw: String,
    pub eqt_inc: String,
    pub eqt_bond: String,
    pub eqt_ang_c: String,
    pub eqt_ang_s: String,
    pub eqt_dih_c: String,
    pub eqt_dih_s: String,
    pub eqt_imp_c: String,
    pub eqt_imp_s: String,
}

impl AtomType {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            symbol: "UNK".to_string(),
            mass: 0.0,
            charge: 0.0,
            eqt_vdw: name.to_string(),
            eqt_inc: name.to_string(),
            eqt_bond: name.to_string(),
            eqt_ang_c: name.to_string(),
            eqt_ang_s: name.to_string(),
            eqt_dih_c: name.to_string(),
            eqt_dih_s: name.to_string(),
            eqt_imp_c: name.to_string(),
            eqt_imp_s: name.to_string(),
        }
    }

    pub fn class(&self, class: EquivalenceClass) -> &str {
        match class {
            EquivalenceClass::Vdw => &self.eqt_vdw,
            EquivalenceClass::ChargeIncrement => &self.eqt_inc,
            EquivalenceClass::Bond => &self.eqt_bond,
            EquivalenceClass::AngleCenter => &self.eqt_ang_c,
            EquivalenceClass::AngleSide => &self.eqt_ang_s,
            EquivalenceClass::DihedralCenter => &self.eqt_dih_c,
            EquivalenceClass::DihedralSide => &self.eqt_dih_s,
            EquivalenceClass::ImproperCenter => &self.eqt_imp_c,
            EquivalenceClass::ImproperSide => &self.eqt_imp_s,
        }
    }

    pub fn set_class(&mut self, class: EquivalenceClass, value: &str) {
        let slot = match class {
            EquivalenceClass::Vdw => &mut self.eqt_vdw,
            EquivalenceClass::ChargeIncrement => &mut self.eqt_inc,
            EquivalenceClass::Bond => &mut self.eqt_bond,
            EquivalenceClass::AngleCenter => &mut self.eqt_ang_c,
            EquivalenceClass::AngleSide => &mut self.eqt_ang_s,
            EquivalenceClass::DihedralCenter => &mut self.eqt_dih_c,
            EquivalenceClass::DihedralSide => &mut self.eqt_dih_s,
            EquivalenceClass::ImproperCenter => &mut self.eqt_imp_c,
            EquivalenceClass::ImproperSide => &mut self.eqt_imp_s,
        };
        *slot = value.to_string();
    }
}
