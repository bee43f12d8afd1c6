use crate::core::forcefield::registry::ForcefieldSettings;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
}

/// Scale factors applied to 1-4 pairs, per interaction category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactors {
    pub coulomb: f64,
    pub vdw: f64,
}

impl ScaleFactors {
    pub fn new(coulomb: f64, vdw: f64) -> Self {
        Self { coulomb, vdw }
    }

    pub fn from_settings(settings: &ForcefieldSettings) -> Self {
        Self {
            coulomb: settings.scale_14_coulomb,
            vdw: settings.scale_14_vdw,
        }
    }

    pub fn is_unscaled(&self) -> bool {
        self.coulomb == 1.0 && self.vdw == 1.0
    }

    pub fn is_fully_excluded(&self) -> bool {
        self.coulomb == 0.0 && self.vdw == 0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrepareConfig {
    pub parameter_path: PathBuf,
    pub type_definition_path: PathBuf,
    /// Assign charges from atom-type charges plus bond charge increments.
    pub assign_charges: bool,
    /// Derive impropers for every atom with exactly three bonded neighbors.
    pub generate_impropers: bool,
    /// Replaces the force field's own 1-4 scale factors.
    pub scale_override: Option<ScaleFactors>,
}

#[derive(Default)]
pub struct PrepareConfigBuilder {
    parameter_path: Option<PathBuf>,
    type_definition_path: Option<PathBuf>,
    assign_charges: Option<bool>,
    generate_impropers: Option<bool>,
    scale_override: Option<ScaleFactors>,
}

impl PrepareConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parameter_path(mut self, path: PathBuf) -> Self {
        self.parameter_path = Some(path);
        self
    }
    pub fn type_definition_path(mut self, path: PathBuf) -> Self {
        self.type_definition_path = Some(path);
        self
    }
    pub fn assign_charges(mut self, enabled: bool) -> Self {
        self.assign_charges = Some(enabled);
        self
    }
    pub fn generate_impropers(mut self, enabled: bool) -> Self {
        self.generate_impropers = Some(enabled);
        self
    }
    pub fn scale_factors(mut self, scale: ScaleFactors) -> Self {
        self.scale_override = Some(scale);
        self
    }

    pub fn build(self) -> Result<PrepareConfig, ConfigError> {
        Ok(PrepareConfig {
            parameter_path: self
                .parameter_path
                .ok_or(ConfigError::MissingParameter("parameter_path"))?,
            type_definition_path: self
                .type_definition_path
                .ok_or(ConfigError::MissingParameter("type_definition_path"))?,
            assign_charges: self.assign_charges.unwrap_or(true),
            generate_impropers: self.generate_impropers.unwrap_or(true),
            scale_override: self.scale_override,
        })
    }
}
