use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DiffError, DiffResult};

/// How children of two compared nodes are paired.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Pair by kind plus key attribute; unkeyed nodes pair only when equal.
    #[default]
    Keyed,
    /// Pair by position among nodes of the same kind and key.
    Ordered,
}

/// Sequence alignment algorithm behind [`SequenceDiffer`](crate::SequenceDiffer).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceAlgorithm {
    /// Classic longest common subsequence table.
    #[default]
    Lcs,
    /// Myers' O(ND) algorithm; faster on long, mostly similar sequences.
    Myers,
}

/// Configuration for a [`TreeDiffer`](crate::TreeDiffer).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// Child pairing strategy.
    pub mode: MatchMode,
    /// Attribute holding a node's identity key.
    pub key_attribute: String,
    /// Alignment algorithm for child lists.
    pub algorithm: SequenceAlgorithm,
    /// Emit `SetParent` for keyed nodes that changed parent.
    pub detect_moves: bool,
    /// Attributes never compared and never patched.
    pub ignored_attributes: BTreeSet<String>,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            mode: MatchMode::Keyed,
            key_attribute: "id".to_string(),
            algorithm: SequenceAlgorithm::Lcs,
            detect_moves: true,
            ignored_attributes: BTreeSet::new(),
        }
    }
}

impl DiffConfig {
    /// Positional pairing, no move detection.
    pub fn ordered() -> Self {
        Self {
            mode: MatchMode::Ordered,
            detect_moves: false,
            ..Default::default()
        }
    }

    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml(text: &str) -> DiffResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Builder: exclude an attribute from comparison.
    pub fn ignore(mut self, name: impl Into<String>) -> Self {
        self.ignored_attributes.insert(name.into());
        self
    }
}

impl FromStr for DiffConfig {
    type Err = DiffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_toml(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = DiffConfig::default();
        assert_eq!(c.mode, MatchMode::Keyed);
        assert_eq!(c.key_attribute, "id");
        assert_eq!(c.algorithm, SequenceAlgorithm::Lcs);
        assert!(c.detect_moves);
        assert!(c.ignored_attributes.is_empty());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = DiffConfig::from_toml(
            r#"
            mode = "ordered"
            ignored_attributes = ["modified", "etag"]
            "#,
        )
        .unwrap();
        assert_eq!(c.mode, MatchMode::Ordered);
        assert_eq!(c.key_attribute, "id");
        assert!(c.detect_moves);
        assert!(c.ignored_attributes.contains("etag"));
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!("".parse::<DiffConfig>().unwrap(), DiffConfig::default());
    }

    #[test]
    fn bad_toml_is_a_config_error() {
        let err = DiffConfig::from_toml("algorithm = \"quantum\"").unwrap_err();
        assert!(matches!(err, DiffError::Config(_)));
    }

    #[test]
    fn toml_round_trip() {
        let c = DiffConfig {
            algorithm: SequenceAlgorithm::Myers,
            key_attribute: "name".into(),
            ..DiffConfig::ordered()
        }
        .ignore("stamp");
        let text = toml::to_string(&c).unwrap();
        assert_eq!(DiffConfig::from_toml(&text).unwrap(), c);
    }
}
