use crate::core::models::ids::ParticleId;
use thiserror::Error;

/// A type-definition document or a programmatic rule insertion is malformed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("line {line}: content outside of any section: '{content}'")]
    OutsideSection { line: usize, content: String },

    #[error("line {line}: definition '{name}' has no pattern")]
    MissingPattern { line: usize, name: String },

    #[error("line {line}: rule '{name}' is defined more than once")]
    DuplicateDefinition { line: usize, name: String },

    #[error("line {line}: hierarchy indentation must be a multiple of 4 spaces")]
    Indentation { line: usize },

    #[error("line {line}: indentation jumps from level {previous} to level {level}")]
    IndentationJump {
        line: usize,
        previous: usize,
        level: usize,
    },

    #[error("line {line}: hierarchy entries hold exactly one rule name")]
    MalformedHierarchyLine { line: usize },

    #[error("line {line}: rule '{name}' is not defined")]
    UndefinedRule { line: usize, name: String },

    #[error("line {line}: rule '{name}' is placed more than once in the hierarchy")]
    DuplicatePlacement { line: usize, name: String },

    #[error("Rule '{0}' already exists")]
    DuplicateRule(String),

    #[error("Parent rule '{0}' does not exist")]
    UnknownParent(String),

    #[error("Rule '{0}' does not exist")]
    UnknownRule(String),

    #[error("Placing rule '{0}' would create a cycle")]
    CyclicPlacement(String),

    #[error("Rule '{0}' already has a parent")]
    AlreadyPlaced(String),
}

/// The pattern matcher rejected a rule's pattern.
#[derive(Debug, Error)]
#[error("Invalid pattern '{pattern}' for rule '{rule}': {source}")]
pub struct PatternError {
    pub rule: String,
    pub pattern: String,
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

/// One or more real atoms of a molecule matched no rule below the root.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error(
    "Typing incomplete for molecule '{molecule}': {} unresolved atom(s): {}",
    .atoms.len(),
    .atoms.join(", ")
)]
pub struct TypingIncomplete {
    pub molecule: String,
    /// Names of the unresolved atoms, in molecule order.
    pub atoms: Vec<String>,
    pub particles: Vec<ParticleId>,
}

#[derive(Debug, Error)]
pub enum TyperError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Pattern(#[from] PatternError),
}
