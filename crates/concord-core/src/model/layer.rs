use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::errors::{ConcordError, Result};

/// How slot (link) features participate in equivalence
///
/// Always supplied by the caller: coreference-style slots care only about the
/// target, argument-structure slots usually care about the role too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkCompareBehavior {
    /// A slot matches when it points at an equivalent span, whatever its role
    TargetOnly,
    /// Role and target must both match
    IncludeRole,
}

impl std::str::FromStr for LinkCompareBehavior {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "target_only" | "target-only" => Ok(LinkCompareBehavior::TargetOnly),
            "include_role" | "include-role" => Ok(LinkCompareBehavior::IncludeRole),
            other => Err(format!(
                "unknown link compare behavior '{}' (expected target-only or include-role)",
                other
            )),
        }
    }
}

/// Comparison settings of one layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub name: String,
    /// Whether one source may legitimately hold several annotations at one position
    #[serde(default)]
    pub allow_stacking: bool,
    /// Features that take part in comparison; `None` means all of them
    #[serde(default)]
    pub compared_features: Option<BTreeSet<String>>,
}

impl LayerSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            allow_stacking: false,
            compared_features: None,
        }
    }

    pub fn with_stacking(mut self, allow: bool) -> Self {
        self.allow_stacking = allow;
        self
    }

    pub fn with_compared_features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.compared_features = Some(features.into_iter().map(Into::into).collect());
        self
    }

    /// Whether `feature` takes part in comparison on this layer
    pub fn compares(&self, feature: &str) -> bool {
        self.compared_features
            .as_ref()
            .map(|set| set.contains(feature))
            .unwrap_or(true)
    }
}

/// The layers requested for one diff run
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LayerSet {
    layers: BTreeMap<String, LayerSpec>,
}

impl LayerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from layer specs
    ///
    /// # Errors
    ///
    /// Returns `DuplicateLayer` if two specs share a name.
    pub fn from_specs(specs: impl IntoIterator<Item = LayerSpec>) -> Result<Self> {
        let mut layers = BTreeMap::new();
        for spec in specs {
            let name = spec.name.clone();
            if layers.insert(name.clone(), spec).is_some() {
                return Err(ConcordError::DuplicateLayer { layer: name });
            }
        }
        Ok(Self { layers })
    }

    /// Default-configured layers (no stacking, all features compared)
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let layers = names
            .into_iter()
            .map(|n| {
                let spec = LayerSpec::new(n);
                (spec.name.clone(), spec)
            })
            .collect();
        Self { layers }
    }

    pub fn contains(&self, layer: &str) -> bool {
        self.layers.contains_key(layer)
    }

    pub fn get(&self, layer: &str) -> Option<&LayerSpec> {
        self.layers.get(layer)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(|k| k.as_str())
    }

    pub fn specs(&self) -> impl Iterator<Item = &LayerSpec> {
        self.layers.values()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}
