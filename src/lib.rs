//! Hierarchical verification plans
//!
//! A verification plan breaks a hardware design down into features,
//! sub-features and verification items, each item identified by a stable
//! tag. Plans are saved as YAML or as a compact binary database.

pub mod domain;
pub use domain::{Config, Error, Ip, Item, Plan, Prop, Tag};

/// Saving and loading plans.
pub mod storage;
pub use storage::{LoadError, load, save};
