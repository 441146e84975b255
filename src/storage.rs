mod database;
pub use database::{Format, LoadError, MAGIC, SaveError, fingerprint, load, save};

/// Markdown export of a plan.
pub mod markdown;

pub mod record;
pub use record::{IpRecord, Keyed, PlanRecord, PropRecord};
