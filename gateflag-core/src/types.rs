//! Domain types for the Gateflag provisioner.
//!
//! All types are serializable/deserializable via serde so they can appear in
//! the YAML configuration and in JSON reports.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed team name (e.g. `Team01`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamName(pub String);

impl fmt::Display for TeamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for TeamName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TeamName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Stack identity
// ---------------------------------------------------------------------------

/// The two kinds of stack the provisioner manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StackKind {
    Global,
    Team,
}

impl StackKind {
    /// Suffix inserted after the environment name in the stack name.
    pub fn suffix(self) -> &'static str {
        match self {
            StackKind::Global => "global",
            StackKind::Team => "team",
        }
    }
}

impl fmt::Display for StackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Which stack an operation targets.
///
/// A team stack always carries its team, so a `Team` identity without a
/// discriminator cannot be built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "team", rename_all = "lowercase")]
pub enum StackIdentity {
    Global,
    Team(TeamName),
}

impl StackIdentity {
    pub fn team(name: impl Into<TeamName>) -> Self {
        StackIdentity::Team(name.into())
    }

    pub fn kind(&self) -> StackKind {
        match self {
            StackIdentity::Global => StackKind::Global,
            StackIdentity::Team(_) => StackKind::Team,
        }
    }

    pub fn team_name(&self) -> Option<&TeamName> {
        match self {
            StackIdentity::Global => None,
            StackIdentity::Team(team) => Some(team),
        }
    }
}

impl fmt::Display for StackIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackIdentity::Global => f.write_str("global"),
            StackIdentity::Team(team) => write!(f, "team {team}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Teams
// ---------------------------------------------------------------------------

/// A participating team and the private address of its machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub name: TeamName,
    pub ip: String,
}

impl Team {
    pub fn new(name: impl Into<TeamName>, ip: impl Into<String>) -> Self {
        Self { name: name.into(), ip: ip.into() }
    }

    pub fn identity(&self) -> StackIdentity {
        StackIdentity::Team(self.name.clone())
    }
}

// ---------------------------------------------------------------------------
// Parameters and outputs
// ---------------------------------------------------------------------------

/// Stack parameters keyed by parameter name.
///
/// Backed by a `BTreeMap` so submission order is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(BTreeMap<String, String>);

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Insert or replace a value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    /// Overlay `other` onto `self`; keys in `other` win.
    pub fn overlay(&mut self, other: &ParameterSet) {
        for (key, value) in other.iter() {
            self.0.insert(key.to_owned(), value.to_owned());
        }
    }

    /// Fold stack outputs in, output key becoming the parameter key.
    pub fn fold_outputs(&mut self, outputs: &OutputSet) {
        for output in outputs.iter() {
            self.0.insert(output.key.clone(), output.value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// A single exported stack output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub key: String,
    pub value: String,
}

impl Output {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into() }
    }
}

/// Ordered outputs of a converged stack. Empty is a valid success value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputSet(Vec<Output>);

impl OutputSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|o| o.key == key).map(|o| o.value.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Output> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Output>> for OutputSet {
    fn from(outputs: Vec<Output>) -> Self {
        Self(outputs)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for OutputSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| Output::new(k, v)).collect())
    }
}

impl<'a> IntoIterator for &'a OutputSet {
    type Item = &'a Output;
    type IntoIter = std::slice::Iter<'a, Output>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
