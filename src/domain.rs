//! Domain model of a verification plan.
//!
//! A plan is a three-level tree: features ([`Ip`]) contain sub-features
//! ([`Prop`]), which contain verification items ([`Item`]). Every item
//! carries a tag built from the ordinals of its ancestors.

mod config;
pub use config::{
    CONFIG_FILE_NAME, Config, DefaultValue, FieldConfig, InvalidProjectIdent, LabelledValue,
    ProjectIdent,
};

mod error;
pub use error::Error;

pub mod ip;
pub use ip::{Ip, NewProperty};

pub mod item;
pub use item::{Item, SharedItem, TextField};

pub mod lock;
pub use lock::{AuditSource, LockStatus, SystemAudit};

pub mod plan;
pub use plan::{OrdinalRegistry, Plan};

pub mod prop;
pub use prop::Prop;

pub mod tag;
pub use tag::{Error as TagError, Tag};
