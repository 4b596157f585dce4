//! # Input Specification Schema and Parsing
//!
//! This module defines the data structures that describe a pipeline's input:
//! a recursive tree whose leaves select files from a versioned repository and
//! whose inner nodes combine their children's datums.
//!
//! ## Key Components
//!
//! - **`Input`**: the tagged union of the four input kinds, `pfs`, `union`,
//!   `cross` and `join`.
//! - **`PfsInput`**: a leaf, naming a repository, a branch or commit, a glob
//!   pattern and, for join inputs, the key template.
//!
//! ## Format
//!
//! Each node is a single-key mapping whose key names its kind, which is the
//! same in YAML and JSON:
//!
//! ```yaml
//! cross:
//!   - pfs:
//!       repo: images
//!       glob: /*
//!   - join:
//!       - pfs: { repo: left, glob: "/(*).csv", join_on: "$1" }
//!       - pfs: { repo: right, glob: "/(*).json", join_on: "$1" }
//! ```
//!
//! Parsing only checks the shape of the document. `validate` checks the rules
//! a buildable specification must follow and is run by the builder before it
//! contacts the file source.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::path::{GlobPattern, KeyTemplate};

/// A leaf input: one glob over one repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PfsInput {
    /// Name of the input, defaults to the repository name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// The repository to read from.
    pub repo: String,
    /// Branch whose head is read when no commit is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Pin the input to a specific commit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    /// Glob pattern selecting the files, one datum per match.
    pub glob: String,
    /// Key template used when this input is joined (e.g. `$1`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_on: Option<String>,
}

impl PfsInput {
    pub fn new(repo: &str, glob: &str) -> Self {
        Self {
            name: None,
            repo: repo.to_string(),
            branch: None,
            commit: None,
            glob: glob.to_string(),
            join_on: None,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_branch(mut self, branch: &str) -> Self {
        self.branch = Some(branch.to_string());
        self
    }

    pub fn with_commit(mut self, commit: &str) -> Self {
        self.commit = Some(commit.to_string());
        self
    }

    pub fn with_join_on(mut self, template: &str) -> Self {
        self.join_on = Some(template.to_string());
        self
    }

    /// The input's name, falling back to the repository name
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.repo)
    }
}

/// All possible input kinds
///
/// A node names exactly one kind; a node naming none or several is rejected
/// when parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "InputNode", into = "InputNode")]
pub enum Input {
    /// Files matched by a glob, one datum per file.
    Pfs { pfs: PfsInput },
    /// The datums of every child, one child after the other.
    Union { union: Vec<Input> },
    /// Every combination of one datum from each child.
    Cross { cross: Vec<Input> },
    /// Files of every child that share a key.
    Join { join: Vec<Input> },
}

/// Wire shape of an `Input`: one optional field per kind
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct InputNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pfs: Option<PfsInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    union: Option<Vec<Input>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cross: Option<Vec<Input>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    join: Option<Vec<Input>>,
}

impl TryFrom<InputNode> for Input {
    type Error = Error;

    fn try_from(node: InputNode) -> Result<Self> {
        let kinds: Vec<&str> = [
            ("pfs", node.pfs.is_some()),
            ("union", node.union.is_some()),
            ("cross", node.cross.is_some()),
            ("join", node.join.is_some()),
        ]
        .iter()
        .filter(|(_, present)| *present)
        .map(|(kind, _)| *kind)
        .collect();

        match (kinds.len(), node) {
            (1, InputNode { pfs: Some(pfs), .. }) => Ok(Input::Pfs { pfs }),
            (1, InputNode { union: Some(union), .. }) => Ok(Input::Union { union }),
            (1, InputNode { cross: Some(cross), .. }) => Ok(Input::Cross { cross }),
            (1, InputNode { join: Some(join), .. }) => Ok(Input::Join { join }),
            (0, _) => Err(Error::config_with_hint(
                "input names no kind",
                "use one of `pfs`, `union`, `cross` or `join`",
            )),
            _ => Err(Error::config_with_hint(
                format!("input names more than one kind: {}", kinds.join(", ")),
                "nest the inputs under a `union` or `cross` instead",
            )),
        }
    }
}

impl From<Input> for InputNode {
    fn from(input: Input) -> Self {
        match input {
            Input::Pfs { pfs } => InputNode {
                pfs: Some(pfs),
                ..Default::default()
            },
            Input::Union { union } => InputNode {
                union: Some(union),
                ..Default::default()
            },
            Input::Cross { cross } => InputNode {
                cross: Some(cross),
                ..Default::default()
            },
            Input::Join { join } => InputNode {
                join: Some(join),
                ..Default::default()
            },
        }
    }
}

impl From<PfsInput> for Input {
    fn from(pfs: PfsInput) -> Self {
        Input::Pfs { pfs }
    }
}

impl Input {
    pub fn pfs(repo: &str, glob: &str) -> Self {
        PfsInput::new(repo, glob).into()
    }

    pub fn union(children: Vec<Input>) -> Self {
        Input::Union { union: children }
    }

    pub fn cross(children: Vec<Input>) -> Self {
        Input::Cross { cross: children }
    }

    pub fn join(children: Vec<Input>) -> Self {
        Input::Join { join: children }
    }

    /// The kind of the input as written in a specification
    pub fn kind(&self) -> &'static str {
        match self {
            Input::Pfs { .. } => "pfs",
            Input::Union { .. } => "union",
            Input::Cross { .. } => "cross",
            Input::Join { .. } => "join",
        }
    }

    /// Every leaf of the tree, left to right
    pub fn pfs_inputs(&self) -> Vec<&PfsInput> {
        let mut leaves = Vec::new();
        collect_leaves(self, &mut leaves);
        leaves
    }
}

fn collect_leaves<'a>(input: &'a Input, leaves: &mut Vec<&'a PfsInput>) {
    match input {
        Input::Pfs { pfs } => leaves.push(pfs),
        Input::Union { union: children }
        | Input::Cross { cross: children }
        | Input::Join { join: children } => {
            for child in children {
                collect_leaves(child, leaves);
            }
        }
    }
}

/// Parses a YAML string into an `Input`.
pub fn parse_yaml(yaml_content: &str) -> Result<Input> {
    serde_yaml::from_str(yaml_content).map_err(Error::Yaml)
}

/// Parses a JSON string into an `Input`.
pub fn parse_json(json_content: &str) -> Result<Input> {
    serde_json::from_str(json_content).map_err(Error::Json)
}

/// Parse an `Input` from a file, as JSON for `.json` files and YAML otherwise
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Input> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(Error::Io)?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => parse_json(&content),
        _ => parse_yaml(&content),
    }
}

/// Check that `input` can be built.
///
/// - every `pfs` input names a repository and a valid glob;
/// - `union` and `cross` have at least one child;
/// - `join` has at least two children, each a `pfs` input with a `join_on`
///   template referencing only groups its glob captures.
pub fn validate(input: &Input) -> Result<()> {
    match input {
        Input::Pfs { pfs } => validate_pfs(pfs).map(|_| ()),
        Input::Union { union } => validate_children("union", union),
        Input::Cross { cross } => validate_children("cross", cross),
        Input::Join { join } => {
            if join.len() < 2 {
                return Err(Error::config_with_hint(
                    format!("join requires at least two inputs, found {}", join.len()),
                    "use a plain pfs input to read a single repository",
                ));
            }
            for child in join {
                join_key(child)?;
            }
            Ok(())
        }
    }
}

/// The compiled glob and key template of a join child.
pub fn join_key(input: &Input) -> Result<(&PfsInput, GlobPattern, KeyTemplate)> {
    let pfs = match input {
        Input::Pfs { pfs } => pfs,
        other => {
            return Err(Error::config_with_hint(
                format!("join inputs must be pfs inputs, found {}", other.kind()),
                "cross or union the join with other inputs instead of nesting them in it",
            ))
        }
    };

    let pattern = validate_pfs(pfs)?;
    let join_on = pfs.join_on.as_deref().ok_or_else(|| {
        Error::config_with_hint(
            format!("join input '{}' has no join_on template", pfs.name()),
            "capture part of the path in the glob, e.g. glob: \"/(*).csv\", join_on: \"$1\"",
        )
    })?;
    let template = KeyTemplate::parse(join_on)?;
    template.check_groups(&pattern)?;
    Ok((pfs, pattern, template))
}

fn validate_pfs(pfs: &PfsInput) -> Result<GlobPattern> {
    if pfs.repo.trim().is_empty() {
        return Err(Error::config(format!(
            "pfs input with glob '{}' has no repo",
            pfs.glob
        )));
    }
    GlobPattern::new(&pfs.glob)
}

fn validate_children(kind: &str, children: &[Input]) -> Result<()> {
    if children.is_empty() {
        return Err(Error::config(format!("{} requires at least one input", kind)));
    }
    children.iter().try_for_each(validate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_pfs() {
        let yaml = r#"
pfs:
  repo: images
  glob: "/*"
"#;
        let input = parse_yaml(yaml).unwrap();
        assert_eq!(input, Input::pfs("images", "/*"));
        validate(&input).unwrap();
    }

    #[test]
    fn test_parse_nested_yaml() {
        let yaml = r#"
cross:
  - union:
      - pfs: { repo: data, glob: "/foo?1", commit: abc }
      - pfs: { repo: data, glob: "/foo*2", branch: staging }
  - join:
      - pfs: { repo: left, glob: "/(*).csv", join_on: "$1" }
      - pfs: { name: r, repo: right, glob: "/(*).json", join_on: "$1" }
"#;
        let input = parse_yaml(yaml).unwrap();
        assert_eq!(input.kind(), "cross");

        let leaves = input.pfs_inputs();
        assert_eq!(leaves.len(), 4);
        assert_eq!(leaves[0].commit.as_deref(), Some("abc"));
        assert_eq!(leaves[1].branch.as_deref(), Some("staging"));
        assert_eq!(leaves[2].join_on.as_deref(), Some("$1"));
        assert_eq!(leaves[2].name(), "left");
        assert_eq!(leaves[3].name(), "r");
        validate(&input).unwrap();
    }

    #[test]
    fn test_parse_json() {
        let json = r#"{"union": [
            {"pfs": {"repo": "a", "glob": "/*"}},
            {"pfs": {"repo": "b", "glob": "/**"}}
        ]}"#;
        let input = parse_json(json).unwrap();
        assert_eq!(
            input,
            Input::union(vec![Input::pfs("a", "/*"), Input::pfs("b", "/**")])
        );
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let result = parse_yaml("pfs: [unclosed");
        assert!(matches!(result, Err(Error::Yaml(_))));
    }

    #[test]
    fn test_parse_unknown_field() {
        let yaml = r#"
pfs:
  repo: images
  glob: "/*"
  lazy: true
"#;
        assert!(parse_yaml(yaml).is_err());
    }

    #[test]
    fn test_parse_rejects_node_with_two_kinds() {
        let json = r#"{
            "union": [{"pfs": {"repo": "a", "glob": "/*"}}],
            "cross": [{"pfs": {"repo": "b", "glob": "/*"}}]
        }"#;
        let err = parse_json(json).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
        assert!(err.to_string().contains("more than one kind: union, cross"));

        let err = parse_yaml("pfs: {repo: a, glob: /x}\njoin: []\n").unwrap_err();
        assert!(matches!(err, Error::Yaml(_)));
        assert!(err.to_string().contains("more than one kind: pfs, join"));

        // Nested nodes are checked too.
        let yaml = r#"
cross:
  - pfs: { repo: a, glob: /x }
    union: []
"#;
        assert!(parse_yaml(yaml).is_err());
    }

    #[test]
    fn test_parse_rejects_node_without_kind() {
        let err = parse_json("{}").unwrap_err();
        assert!(err.to_string().contains("input names no kind"));
    }

    #[test]
    fn test_serialized_node_names_one_kind() {
        let json = serde_json::to_string(&Input::union(vec![Input::pfs("a", "/*")])).unwrap();
        assert_eq!(json, r#"{"union":[{"pfs":{"repo":"a","glob":"/*"}}]}"#);
    }

    #[test]
    fn test_yaml_round_trip() {
        let input = Input::cross(vec![
            PfsInput::new("data", "/foo(?)(?)")
                .with_commit("abc")
                .with_join_on("$1$2")
                .into(),
            Input::pfs("other", "/*"),
        ]);
        let yaml = serde_yaml::to_string(&input).unwrap();
        assert_eq!(parse_yaml(&yaml).unwrap(), input);
    }

    #[test]
    fn test_from_file_dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("input.json");
        std::fs::write(&json_path, r#"{"pfs": {"repo": "a", "glob": "/*"}}"#).unwrap();
        assert_eq!(from_file(&json_path).unwrap(), Input::pfs("a", "/*"));

        let yaml_path = dir.path().join("input.yaml");
        std::fs::write(&yaml_path, "pfs:\n  repo: a\n  glob: /*\n").unwrap();
        assert_eq!(from_file(&yaml_path).unwrap(), Input::pfs("a", "/*"));
    }

    #[test]
    fn test_from_file_nonexistent() {
        let result = from_file("/nonexistent/input.yaml");
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_validate_rejects_empty_combinators() {
        let err = validate(&Input::union(vec![])).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("union requires at least one input"));

        let err = validate(&Input::cross(vec![Input::cross(vec![])])).unwrap_err();
        assert!(err.to_string().contains("cross requires at least one input"));
    }

    #[test]
    fn test_validate_rejects_bad_leaves() {
        assert!(validate(&Input::pfs("", "/*")).is_err());
        assert!(matches!(
            validate(&Input::pfs("data", "/foo(")).unwrap_err(),
            Error::Pattern { .. }
        ));
    }

    #[test]
    fn test_validate_join_rules() {
        let keyed =
            |glob: &str, key: &str| Input::from(PfsInput::new("data", glob).with_join_on(key));

        // Too few inputs
        let err = validate(&Input::join(vec![keyed("/(*)", "$1")])).unwrap_err();
        assert!(err.to_string().contains("at least two inputs"));

        // Non-leaf child
        let err = validate(&Input::join(vec![
            keyed("/(*)", "$1"),
            Input::cross(vec![Input::pfs("data", "/*")]),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("join inputs must be pfs inputs, found cross"));

        // Missing template
        let err = validate(&Input::join(vec![keyed("/(*)", "$1"), Input::pfs("data", "/*")]))
            .unwrap_err();
        assert!(err.to_string().contains("no join_on template"));

        // Template referencing an absent group
        let err = validate(&Input::join(vec![keyed("/(*)", "$1"), keyed("/(*)", "$2")]))
            .unwrap_err();
        assert!(matches!(err, Error::KeyTemplate { .. }));

        validate(&Input::join(vec![
            keyed("/foo(?)(?)", "$1$2"),
            keyed("/foo(?)(?)", "$2$1"),
        ]))
        .unwrap();
    }
}
