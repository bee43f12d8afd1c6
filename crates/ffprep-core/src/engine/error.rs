use thiserror::Error;

use super::closure::ClosureIssue;
use crate::core::forcefield::lookup::ParameterMissing;
use crate::core::forcefield::registry::RegistryLoadError;
use crate::core::typing::error::{TyperError, TypingIncomplete};

/// A single problem found while preparing one molecule.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PrepareProblem {
    #[error(transparent)]
    Typing(#[from] TypingIncomplete),

    #[error("Particle '{particle}' uses atom type '{atom_type}' which the force field does not define")]
    UnknownAtomType { particle: String, atom_type: String },

    #[error("{element}: {source}")]
    MissingParameter {
        element: String,
        source: ParameterMissing,
    },

    #[error(transparent)]
    Closure(#[from] ClosureIssue),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to load force field: {source}")]
    Forcefield {
        #[from]
        source: RegistryLoadError,
    },

    #[error("Failed to load type definitions: {source}")]
    TypeDefinitions {
        #[from]
        source: TyperError,
    },

    #[error("Preparation of molecule '{molecule}' failed with {} problem(s)", .problems.len())]
    Preparation {
        molecule: String,
        problems: Vec<PrepareProblem>,
    },
}
