//! Verification items, the leaves of a plan.

use std::{cell::RefCell, fmt, rc::Rc};

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::domain::{
    config::{self, Config},
    lock::{AuditSource, LockStatus, SystemAudit},
    tag::normalize_tag,
};

/// An item shared between sub-features.
///
/// Items are reference counted so that a cloned sub-feature keeps pointing at
/// the same items as its source.
pub type SharedItem = Rc<RefCell<Item>>;

/// A single verification case within a sub-feature.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub struct Item {
    /// Zero-padded ordinal, unique within the parent sub-feature.
    pub name: String,
    /// Globally unique verification tag.
    pub tag: String,
    /// Description of the feature to be tested.
    pub description: String,
    /// Location of the requirement being verified.
    pub purpose: String,
    /// Summary of the verification goals.
    pub verif_goals: String,
    /// Location of the coverage data.
    pub coverage_loc: String,
    /// Pass/fail criteria code.
    pub pfc: i64,
    /// Test type code.
    pub test_type: i64,
    /// Coverage method code.
    pub cov_method: i64,
    /// Bitmask of the cores the item applies to.
    pub cores: i64,
    /// Free-form notes.
    pub comments: String,
    /// Free-form progress status.
    pub status: String,
    /// Simulation targets the item runs on.
    #[serde(default)]
    pub simu_target_list: Vec<String>,
    /// Advisory lock.
    #[serde(default)]
    pub lock_status: LockStatus,
}

/// The free-text fields of an item that can hold cue text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    /// [`Item::description`].
    Description,
    /// [`Item::purpose`].
    Purpose,
    /// [`Item::verif_goals`].
    VerifGoals,
    /// [`Item::coverage_loc`].
    CoverageLoc,
    /// [`Item::comments`].
    Comments,
}

impl TextField {
    /// Every text field, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Description,
        Self::Purpose,
        Self::VerifGoals,
        Self::CoverageLoc,
        Self::Comments,
    ];

    /// The configuration key holding this field's cue text.
    #[must_use]
    pub const fn config_key(self) -> &'static str {
        match self {
            Self::Description => "feature_descr",
            Self::Purpose => "requirement_loc",
            Self::VerifGoals => "verif_goals",
            Self::CoverageLoc => "coverage_loc",
            Self::Comments => "comments",
        }
    }
}

impl Item {
    /// Creates an item with the configured default codes.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        tag: impl Into<String>,
        description: impl Into<String>,
        purpose: impl Into<String>,
        config: &Config,
    ) -> Self {
        Self {
            name: name.into(),
            tag: tag.into(),
            description: description.into(),
            purpose: purpose.into(),
            verif_goals: String::new(),
            coverage_loc: String::new(),
            pfc: config.default_code("pfc"),
            test_type: config.default_code("test_type"),
            cov_method: config.default_code("cov_method"),
            cores: config.default_code("cores"),
            comments: String::new(),
            status: String::new(),
            simu_target_list: Vec::new(),
            lock_status: LockStatus::Unlocked,
        }
    }

    /// Wraps the item for sharing.
    #[must_use]
    pub fn shared(self) -> SharedItem {
        Rc::new(RefCell::new(self))
    }

    /// The stored code of an enumerated field, by field name.
    #[must_use]
    pub fn code(&self, attr: &str) -> Option<i64> {
        match attr {
            "pfc" => Some(self.pfc),
            "test_type" => Some(self.test_type),
            "cov_method" => Some(self.cov_method),
            "cores" => Some(self.cores),
            _ => None,
        }
    }

    /// Renders an enumerated or bitmask field as a human-readable label.
    ///
    /// Never fails: missing configuration degrades to a marker string.
    #[must_use]
    pub fn attrval2str(&self, attr: &str, config: &Config) -> String {
        self.code(attr)
            .map_or_else(|| config::unsupported(attr), |code| config.describe(attr, code))
    }

    /// Borrows a text field.
    #[must_use]
    pub fn text(&self, field: TextField) -> &str {
        match field {
            TextField::Description => &self.description,
            TextField::Purpose => &self.purpose,
            TextField::VerifGoals => &self.verif_goals,
            TextField::CoverageLoc => &self.coverage_loc,
            TextField::Comments => &self.comments,
        }
    }

    /// Mutably borrows a text field.
    pub fn text_mut(&mut self, field: TextField) -> &mut String {
        match field {
            TextField::Description => &mut self.description,
            TextField::Purpose => &mut self.purpose,
            TextField::VerifGoals => &mut self.verif_goals,
            TextField::CoverageLoc => &mut self.coverage_loc,
            TextField::Comments => &mut self.comments,
        }
    }

    /// Whether the item is locked.
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.lock_status.is_locked()
    }

    /// The lock record, `"0"` when unlocked.
    #[must_use]
    pub fn get_lock_status(&self) -> String {
        self.lock_status.to_string()
    }

    /// Locks the item for the current user, replacing any existing lock.
    pub fn lock(&mut self) {
        self.lock_with(&SystemAudit);
    }

    /// Locks the item with a stamp from `audit`, replacing any existing lock.
    pub fn lock_with(&mut self, audit: &dyn AuditSource) {
        self.lock_status = LockStatus::Locked(audit.stamp());
    }

    /// Releases the lock.
    pub fn unlock(&mut self) {
        self.lock_status = LockStatus::Unlocked;
    }

    /// Toggles the lock, stamping a fresh record when locking.
    pub fn invert_lock(&mut self) {
        self.invert_lock_with(&SystemAudit);
    }

    /// Toggles the lock, stamping from `audit` when locking.
    pub fn invert_lock_with(&mut self, audit: &dyn AuditSource) {
        if self.is_locked() {
            self.unlock();
        } else {
            self.lock_with(audit);
        }
    }

    /// Sanitizes the item before it is persisted.
    ///
    /// Text fields still holding their configured cue text are emptied, and
    /// legacy tags are normalized.
    pub fn prep_to_save(&mut self, config: &Config) {
        for field in TextField::ALL {
            if config.cue_text(field.config_key()) == Some(self.text(field)) {
                self.text_mut(field).clear();
            }
        }
        let tag = normalize_tag(&self.tag, config.project_ident()).into_owned();
        if tag != self.tag {
            tracing::debug!(from = %self.tag, to = %tag, "normalized legacy tag");
            self.tag = tag;
        }
    }

    /// Returns a markdown rendering of the item using `config` for labels.
    #[must_use]
    pub const fn display<'a>(&'a self, config: &'a Config) -> ItemMarkdown<'a> {
        ItemMarkdown { item: self, config }
    }
}

/// Markdown rendering of an [`Item`].
///
/// Returned by [`Item::display`].
#[derive(Debug, Clone, Copy)]
pub struct ItemMarkdown<'a> {
    item: &'a Item,
    config: &'a Config,
}

/// Rewrites `text` so that markdown keeps its line breaks.
///
/// Every line, including the first, is preceded by two trailing spaces, a
/// newline and `indent`.
#[must_use]
pub fn preserve_linebreaks(text: &str, indent: &str) -> String {
    let linebreak = format!("  \n{indent}");
    let mut out = linebreak.clone();
    out.push_str(&text.split('\n').collect::<Vec<_>>().join(&linebreak));
    out
}

impl fmt::Display for ItemMarkdown<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let Self { item, config } = *self;
        let preserve = |text: &str| preserve_linebreaks(text, "  ");

        writeln!(f, "#### Item: {}\n", item.name)?;
        writeln!(f, "* **Requirement location:** {}", item.purpose)?;
        writeln!(f, "* **Feature Description**\n{}", preserve(&item.description))?;
        writeln!(f, "* **Verification Goals**\n{}", preserve(&item.verif_goals))?;
        writeln!(f, "* **Pass/Fail Criteria:** {}", item.attrval2str("pfc", config))?;
        writeln!(f, "* **Test Type:** {}", item.attrval2str("test_type", config))?;
        writeln!(f, "* **Coverage Method:** {}", item.attrval2str("cov_method", config))?;
        writeln!(f, "* **Applicable Cores:** {}", item.attrval2str("cores", config))?;
        writeln!(
            f,
            "* **Unique verification tag:** {}",
            normalize_tag(&item.tag, config.project_ident())
        )?;
        if !item.coverage_loc.is_empty() {
            writeln!(f, "* **Link to Coverage:** {}", item.coverage_loc)?;
        }
        if !item.comments.is_empty() {
            writeln!(f, "* **Comments**\n{}", preserve(&item.comments))?;
        }
        Ok(())
    }
}
