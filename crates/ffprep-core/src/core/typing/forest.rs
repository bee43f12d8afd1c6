use super::error::ValidationError;
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Name of the synthetic root every placed rule descends from.
pub const ROOT_NAME: &str = "UNDEFINED";

/// Index of a rule in its forest arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(usize);

impl RuleId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct RuleNode<P> {
    pub name: String,
    /// Compiled pattern; `None` only for the root.
    pub pattern: Option<P>,
    pub parent: Option<RuleId>,
    /// Children in declaration order. Resolution prefers earlier children.
    pub children: Vec<RuleId>,
}

/// Single-owner builder for a [`RuleForest`].
///
/// Rules are first defined and then attached under a parent. A rule may be defined without
/// ever being attached; such rules survive in the forest but are never queried.
#[derive(Debug, Clone)]
pub struct ForestBuilder<P> {
    nodes: Vec<RuleNode<P>>,
    by_name: HashMap<String, RuleId>,
}

impl<P> Default for ForestBuilder<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> ForestBuilder<P> {
    pub fn new() -> Self {
        let root = RuleNode {
            name: ROOT_NAME.to_string(),
            pattern: None,
            parent: None,
            children: Vec::new(),
        };
        let mut by_name = HashMap::new();
        by_name.insert(ROOT_NAME.to_string(), RuleId(0));
        Self {
            nodes: vec![root],
            by_name,
        }
    }

    pub fn root(&self) -> RuleId {
        RuleId(0)
    }

    pub fn id_of(&self, name: &str) -> Option<RuleId> {
        self.by_name.get(name).copied()
    }

    /// Defines a new, not yet attached rule.
    pub fn define(&mut self, name: &str, pattern: P) -> Result<RuleId, ValidationError> {
        if self.by_name.contains_key(name) {
            return Err(ValidationError::DuplicateRule(name.to_string()));
        }
        let id = RuleId(self.nodes.len());
        self.nodes.push(RuleNode {
            name: name.to_string(),
            pattern: Some(pattern),
            parent: None,
            children: Vec::new(),
        });
        self.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    /// Attaches a defined rule as the last child of `parent` (the root when `None`).
    pub fn attach(&mut self, name: &str, parent: Option<&str>) -> Result<RuleId, ValidationError> {
        let id = self
            .id_of(name)
            .filter(|&id| id != self.root())
            .ok_or_else(|| ValidationError::UnknownRule(name.to_string()))?;
        let parent_id = match parent {
            Some(parent) => self
                .id_of(parent)
                .ok_or_else(|| ValidationError::UnknownParent(parent.to_string()))?,
            None => self.root(),
        };
        if self.nodes[id.0].parent.is_some() {
            return Err(ValidationError::AlreadyPlaced(name.to_string()));
        }
        if self.is_descendant_or_self(parent_id, id) {
            return Err(ValidationError::CyclicPlacement(name.to_string()));
        }

        self.nodes[id.0].parent = Some(parent_id);
        self.nodes[parent_id.0].children.push(id);
        Ok(id)
    }

    /// Defines a rule and attaches it in one step.
    pub fn add_rule(
        &mut self,
        name: &str,
        pattern: P,
        parent: Option<&str>,
    ) -> Result<RuleId, ValidationError> {
        if let Some(parent) = parent {
            if self.id_of(parent).is_none() {
                return Err(ValidationError::UnknownParent(parent.to_string()));
            }
        }
        self.define(name, pattern)?;
        self.attach(name, parent)
    }

    fn is_descendant_or_self(&self, node: RuleId, ancestor: RuleId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes[id.0].parent;
        }
        false
    }

    /// Freezes the forest. Rules that were never attached are reported at `warn` level.
    pub fn build(self) -> RuleForest<P> {
        let forest = RuleForest {
            nodes: self.nodes,
            by_name: self.by_name,
        };
        for id in forest.unplaced_rules() {
            warn!(
                rule = %forest.nodes[id.0].name,
                "Rule is defined but not placed in the hierarchy; it will never be used"
            );
        }
        forest
    }
}

/// An immutable arena of typing rules rooted at a synthetic [`ROOT_NAME`] node.
#[derive(Debug, Clone)]
pub struct RuleForest<P> {
    nodes: Vec<RuleNode<P>>,
    by_name: HashMap<String, RuleId>,
}

impl<P> RuleForest<P> {
    pub fn root(&self) -> RuleId {
        RuleId(0)
    }

    pub fn rule(&self, id: RuleId) -> Option<&RuleNode<P>> {
        self.nodes.get(id.0)
    }

    pub fn name(&self, id: RuleId) -> &str {
        &self.nodes[id.0].name
    }

    pub fn id_of(&self, name: &str) -> Option<RuleId> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    fn is_placed(&self, id: RuleId) -> bool {
        let mut current = id;
        loop {
            if current == self.root() {
                return true;
            }
            match self.nodes[current.0].parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Rules reachable from the root, excluding the root itself, in arena order.
    pub fn placed_rules(&self) -> impl Iterator<Item = RuleId> + '_ {
        (1..self.nodes.len())
            .map(RuleId)
            .filter(|&id| self.is_placed(id))
    }

    pub fn unplaced_rules(&self) -> impl Iterator<Item = RuleId> + '_ {
        (1..self.nodes.len())
            .map(RuleId)
            .filter(|&id| !self.is_placed(id))
    }

    /// Resolves the deepest rule reachable through matched rules.
    ///
    /// Starting at the root, descends into the first child (in declaration order) that is
    /// in `candidates`, until no child matches. Returns `None` when no child of the root
    /// matches. Only membership in `candidates` matters, never its iteration order.
    pub fn resolve(&self, candidates: &HashSet<RuleId>) -> Option<RuleId> {
        let mut current = self.root();
        while let Some(&next) = self.nodes[current.0]
            .children
            .iter()
            .find(|child| candidates.contains(*child))
        {
            current = next;
        }
        (current != self.root()).then_some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_forest(rules: &[(&str, Option<&str>)]) -> RuleForest<()> {
        let mut builder = ForestBuilder::new();
        for &(name, parent) in rules {
            builder.add_rule(name, (), parent).unwrap();
        }
        builder.build()
    }

    fn candidates(forest: &RuleForest<()>, names: &[&str]) -> HashSet<RuleId> {
        names.iter().map(|n| forest.id_of(n).unwrap()).collect()
    }

    fn resolved_name(forest: &RuleForest<()>, names: &[&str]) -> Option<String> {
        forest
            .resolve(&candidates(forest, names))
            .map(|id| forest.name(id).to_string())
    }

    #[test]
    fn resolves_deepest_matching_rule() {
        let forest = build_forest(&[("H_1", None), ("HC", Some("H_1"))]);

        assert_eq!(resolved_name(&forest, &["H_1", "HC"]), Some("HC".to_string()));
        assert_eq!(resolved_name(&forest, &["H_1"]), Some("H_1".to_string()));
        assert_eq!(resolved_name(&forest, &[]), None);
    }

    #[test]
    fn child_matching_without_parent_is_not_reached() {
        let forest = build_forest(&[("H_1", None), ("HC", Some("H_1"))]);
        assert_eq!(resolved_name(&forest, &["HC"]), None);
    }

    #[test]
    fn first_declared_child_wins_ties() {
        let forest = build_forest(&[("C_4", None), ("CT", Some("C_4")), ("CS", Some("C_4"))]);
        assert_eq!(
            resolved_name(&forest, &["C_4", "CS", "CT"]),
            Some("CT".to_string())
        );

        let reordered = build_forest(&[("C_4", None), ("CS", Some("C_4")), ("CT", Some("C_4"))]);
        assert_eq!(
            resolved_name(&reordered, &["C_4", "CS", "CT"]),
            Some("CS".to_string())
        );
    }

    #[test]
    fn resolution_ignores_candidate_insertion_order() {
        let forest = build_forest(&[("A", None), ("B", Some("A")), ("C", Some("A")), ("D", Some("C"))]);
        let forward: HashSet<_> = ["A", "B", "C", "D"]
            .iter()
            .map(|n| forest.id_of(n).unwrap())
            .collect();
        let mut backward = HashSet::with_capacity(64);
        for name in ["D", "C", "B", "A"] {
            backward.insert(forest.id_of(name).unwrap());
        }
        assert_eq!(forest.resolve(&forward), forest.resolve(&backward));
        assert_eq!(forest.name(forest.resolve(&forward).unwrap()), "B");
    }

    #[test]
    fn add_rule_rejects_duplicates_and_unknown_parents() {
        let mut builder: ForestBuilder<()> = ForestBuilder::new();
        builder.add_rule("A", (), None).unwrap();

        assert_eq!(
            builder.add_rule("A", (), None),
            Err(ValidationError::DuplicateRule("A".to_string()))
        );
        assert_eq!(
            builder.add_rule("B", (), Some("Z")),
            Err(ValidationError::UnknownParent("Z".to_string()))
        );
        assert!(builder.id_of("B").is_none());
        assert_eq!(
            builder.add_rule(ROOT_NAME, (), None),
            Err(ValidationError::DuplicateRule(ROOT_NAME.to_string()))
        );
    }

    #[test]
    fn attach_rejects_second_parent() {
        let mut builder: ForestBuilder<()> = ForestBuilder::new();
        builder.add_rule("A", (), None).unwrap();
        builder.add_rule("B", (), None).unwrap();
        assert_eq!(
            builder.attach("B", Some("A")),
            Err(ValidationError::AlreadyPlaced("B".to_string()))
        );
    }

    #[test]
    fn unplaced_rules_are_kept_but_never_resolved() {
        let mut builder: ForestBuilder<()> = ForestBuilder::new();
        builder.add_rule("A", (), None).unwrap();
        builder.define("LOOSE", ()).unwrap();
        let forest = builder.build();

        let unplaced: Vec<_> = forest.unplaced_rules().collect();
        assert_eq!(unplaced, vec![forest.id_of("LOOSE").unwrap()]);
        assert_eq!(forest.placed_rules().count(), 1);
        assert_eq!(resolved_name(&forest, &["LOOSE"]), None);
    }
}
