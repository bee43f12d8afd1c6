use crate::core::models::ids::ParticleId;
use crate::core::models::molecule::Molecule;

/// Substructure matching capability used by the hierarchical typer.
///
/// Patterns are opaque strings to the typer. Each rule's pattern is compiled exactly once
/// when the rule is created, so a malformed pattern fails at construction time rather than
/// while typing a molecule.
pub trait PatternMatcher: Sync {
    type Compiled: Send + Sync;
    type Error: std::error::Error + Send + Sync + 'static;

    fn compile(&self, pattern: &str) -> Result<Self::Compiled, Self::Error>;

    /// Returns the anchor atom of every match of `pattern` in `molecule`.
    fn match_anchors(&self, pattern: &Self::Compiled, molecule: &Molecule) -> Vec<ParticleId>;
}
