use super::error::ValidationError;
use phf::{Map, phf_map};
use std::collections::HashSet;

const COMMENT_MARKER: &str = "##";
const INDENT_WIDTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Definitions,
    Hierarchy,
}

static SECTION_HEADERS: Map<&'static str, Section> = phf_map! {
    "PatternDefinition" => Section::Definitions,
    "TypeDefinition" => Section::Definitions,
    "HierarchicalTree" => Section::Hierarchy,
};

/// A `<name> <pattern>` line of the definition section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDefinition {
    pub name: String,
    pub pattern: String,
    pub line: usize,
}

/// A hierarchy entry with its resolved parent; `None` places the rule under the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RulePlacement {
    pub name: String,
    pub parent: Option<String>,
    pub line: usize,
}

/// The validated content of a type-definition document, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefinitionFile {
    pub definitions: Vec<RuleDefinition>,
    pub placements: Vec<RulePlacement>,
}

/// Parses a type-definition document.
///
/// The document has a definition section (`PatternDefinition` or `TypeDefinition`) with
/// one `<name> <pattern>` per line, and a `HierarchicalTree` section where each rule name
/// is indented by 4 spaces per level below its parent. `##` starts a comment and blank
/// lines are ignored.
///
/// # Errors
///
/// Returns the first [`ValidationError`] found, with its 1-based line number.
pub fn parse_definitions(content: &str) -> Result<DefinitionFile, ValidationError> {
    let mut file = DefinitionFile::default();
    let mut defined: HashSet<String> = HashSet::new();
    let mut tree_lines: Vec<(usize, &str)> = Vec::new();
    let mut section: Option<Section> = None;

    for (index, raw) in content.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.split(COMMENT_MARKER).next().unwrap_or("").trim_end();
        if line.trim().is_empty() {
            continue;
        }
        if let Some(&header) = SECTION_HEADERS.get(line.trim()) {
            section = Some(header);
            continue;
        }

        match section {
            None => {
                return Err(ValidationError::OutsideSection {
                    line: line_no,
                    content: line.trim().to_string(),
                });
            }
            Some(Section::Definitions) => {
                let mut tokens = line.split_whitespace();
                let name = tokens.next().unwrap_or_default();
                let Some(pattern) = tokens.next() else {
                    return Err(ValidationError::MissingPattern {
                        line: line_no,
                        name: name.to_string(),
                    });
                };
                if !defined.insert(name.to_string()) {
                    return Err(ValidationError::DuplicateDefinition {
                        line: line_no,
                        name: name.to_string(),
                    });
                }
                file.definitions.push(RuleDefinition {
                    name: name.to_string(),
                    pattern: pattern.to_string(),
                    line: line_no,
                });
            }
            Some(Section::Hierarchy) => tree_lines.push((line_no, line)),
        }
    }

    file.placements = parse_hierarchy(&tree_lines, &defined)?;
    Ok(file)
}

fn parse_hierarchy(
    lines: &[(usize, &str)],
    defined: &HashSet<String>,
) -> Result<Vec<RulePlacement>, ValidationError> {
    let mut placements = Vec::with_capacity(lines.len());
    let mut placed: HashSet<&str> = HashSet::new();
    // Names along the path from the root to the previous entry.
    let mut path: Vec<&str> = Vec::new();

    for &(line, text) in lines {
        let name = text.trim_start_matches(' ');
        let indent = text.len() - name.len();
        if indent % INDENT_WIDTH != 0 || name.starts_with(char::is_whitespace) {
            return Err(ValidationError::Indentation { line });
        }
        if name.split_whitespace().count() != 1 {
            return Err(ValidationError::MalformedHierarchyLine { line });
        }

        let level = indent / INDENT_WIDTH + 1;
        if level > path.len() + 1 {
            return Err(ValidationError::IndentationJump {
                line,
                previous: path.len(),
                level,
            });
        }
        if !defined.contains(name) {
            return Err(ValidationError::UndefinedRule {
                line,
                name: name.to_string(),
            });
        }
        if !placed.insert(name) {
            return Err(ValidationError::DuplicatePlacement {
                line,
                name: name.to_string(),
            });
        }

        path.truncate(level - 1);
        placements.push(RulePlacement {
            name: name.to_string(),
            parent: path.last().map(|p| p.to_string()),
            line,
        });
        path.push(name);
    }
    Ok(placements)
}
