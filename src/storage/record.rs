//! The persisted shape of a plan.
//!
//! Every keyed map of the in-memory tree is stored as a list of
//! [`Keyed`] pairs sorted by key, so that two equal plans always serialize
//! to the same bytes.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::domain::Item;

/// A key/value pair of a persisted map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Keyed<T> {
    /// Map key.
    pub key: String,
    /// Map value.
    pub value: T,
}

impl<T> Keyed<T> {
    /// Pairs a value with its key.
    pub fn new(key: impl Into<String>, value: T) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// A persisted sub-feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct PropRecord {
    /// Composite name.
    pub name: String,
    /// Sub-feature tag.
    pub tag: String,
    /// Next item ordinal.
    pub item_count: usize,
    /// Display-order hint.
    pub wid_order: usize,
    /// Items sorted by ordinal.
    pub items: Vec<Keyed<Item>>,
}

/// A persisted feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct IpRecord {
    /// Feature name.
    pub name: String,
    /// Feature ordinal.
    pub ip_num: usize,
    /// Next sub-feature ordinal.
    pub prop_count: usize,
    /// Display-order hint.
    pub wid_order: usize,
    /// Sub-features sorted by key.
    pub props: Vec<Keyed<PropRecord>>,
}

/// A persisted plan.
///
/// The YAML form carries a `_version` field so the layout can evolve; the
/// binary form records its version in the file header instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct PlanRecord {
    /// Next feature ordinal.
    pub next_feature: usize,
    /// Features sorted by name.
    pub features: Vec<Keyed<IpRecord>>,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        next_feature: usize,
        features: Vec<Keyed<IpRecord>>,
    },
}

impl From<Versions> for PlanRecord {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                next_feature,
                features,
            } => Self {
                next_feature,
                features,
            },
        }
    }
}

impl From<PlanRecord> for Versions {
    fn from(record: PlanRecord) -> Self {
        let PlanRecord {
            next_feature,
            features,
        } = record;
        Self::V1 {
            next_feature,
            features,
        }
    }
}
