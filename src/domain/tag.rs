//! Verification tags and the label helpers used to build them.
//!
//! Tags follow the grammar `VP_<PROJECT>_F<nnn>_S<nnn>_I<nnn>`. Plans created
//! by early versions of the tool used `VP_IP<n>_P<n>_I<n>` instead;
//! [`normalize_tag`] migrates those one way.

use std::{borrow::Cow, fmt, str::FromStr, sync::LazyLock};

use regex::Regex;

/// Width of every ordinal embedded in names, keys and tags.
pub const ORDINAL_DIGITS: usize = 3;

static LEGACY_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^VP_IP([0-9]+)_P([0-9]+)_I([0-9]+)$").unwrap());

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^VP_(.+)_F([0-9]+)_S([0-9]+)(?:_I([0-9]+))?$").unwrap()
});

/// Removes every character whose code point is 128 or above.
///
/// ```
/// use vplan::domain::tag::remove_non_ascii;
///
/// assert_eq!(remove_non_ascii("café bus"), "caf bus");
/// ```
#[must_use]
pub fn remove_non_ascii(text: &str) -> String {
    text.chars().filter(char::is_ascii).collect()
}

/// Rewrites a legacy `VP_IP<n>_P<n>_I<n>` tag to
/// `VP_<project>_F<n>_S<n>_I<n>`.
///
/// Only a full match is rewritten. Anything else, including tags that merely
/// start like a legacy tag, is returned unchanged.
///
/// ```
/// use vplan::domain::tag::normalize_tag;
///
/// assert_eq!(normalize_tag("VP_IP002_P001_I004", "CVA6"), "VP_CVA6_F002_S001_I004");
/// assert_eq!(normalize_tag("VP_IP002_P001_I004x", "CVA6"), "VP_IP002_P001_I004x");
/// ```
#[must_use]
pub fn normalize_tag<'a>(tag: &'a str, project: &str) -> Cow<'a, str> {
    match LEGACY_TAG.captures(tag) {
        Some(groups) => Cow::Owned(format!(
            "VP_{project}_F{}_S{}_I{}",
            &groups[1], &groups[2], &groups[3]
        )),
        None => Cow::Borrowed(tag),
    }
}

/// Formats an ordinal zero-padded to [`ORDINAL_DIGITS`].
#[must_use]
pub fn pad_ordinal(ordinal: usize) -> String {
    format!("{ordinal:0width$}", width = ORDINAL_DIGITS)
}

/// Parses the trailing ordinal of a tag (its last three characters).
#[must_use]
pub fn trailing_ordinal(tag: &str) -> Option<usize> {
    let start = tag.char_indices().rev().nth(ORDINAL_DIGITS - 1)?.0;
    tag[start..].parse().ok()
}

/// Replaces the trailing three characters of `tag` with `ordinal`.
///
/// Tags shorter than three characters are replaced entirely.
#[must_use]
pub fn with_ordinal(tag: &str, ordinal: &str) -> String {
    let stem = tag
        .char_indices()
        .rev()
        .nth(ORDINAL_DIGITS - 1)
        .map_or("", |(start, _)| &tag[..start]);
    format!("{stem}{ordinal}")
}

/// A parsed verification tag.
///
/// Sub-feature tags carry no item ordinal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Tag {
    project: String,
    feature: usize,
    sub_feature: usize,
    item: Option<usize>,
}

impl Tag {
    /// Creates a sub-feature tag.
    #[must_use]
    pub fn sub_feature(project: impl Into<String>, feature: usize, sub_feature: usize) -> Self {
        Self {
            project: project.into(),
            feature,
            sub_feature,
            item: None,
        }
    }

    /// Returns this tag extended with an item ordinal.
    #[must_use]
    pub fn with_item(mut self, item: usize) -> Self {
        self.item = Some(item);
        self
    }

    /// The project identifier.
    #[must_use]
    pub fn project(&self) -> &str {
        &self.project
    }

    /// The feature ordinal.
    #[must_use]
    pub const fn feature(&self) -> usize {
        self.feature
    }

    /// The sub-feature ordinal.
    #[must_use]
    pub const fn sub_feature_ordinal(&self) -> usize {
        self.sub_feature
    }

    /// The item ordinal, if this is an item tag.
    #[must_use]
    pub const fn item(&self) -> Option<usize> {
        self.item
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "VP_{}_F{}_S{}",
            self.project,
            pad_ordinal(self.feature),
            pad_ordinal(self.sub_feature)
        )?;
        if let Some(item) = self.item {
            write!(f, "_I{}", pad_ordinal(item))?;
        }
        Ok(())
    }
}

/// Errors that can occur while parsing a tag.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    /// The tag uses the legacy `VP_IP<n>_P<n>_I<n>` grammar.
    #[error("Legacy tag '{0}': normalize it before parsing")]
    Legacy(String),

    /// The tag matches neither grammar.
    #[error("Invalid tag format: {0}")]
    Syntax(String),

    /// An ordinal does not fit in a `usize`.
    #[error("Invalid ordinal in tag '{0}'")]
    Ordinal(String),
}

impl FromStr for Tag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if LEGACY_TAG.is_match(s) {
            return Err(Error::Legacy(s.to_string()));
        }
        let groups = TAG.captures(s).ok_or_else(|| Error::Syntax(s.to_string()))?;
        let ordinal = |text: &str| {
            text.parse::<usize>()
                .map_err(|_| Error::Ordinal(s.to_string()))
        };

        Ok(Self {
            project: groups[1].to_string(),
            feature: ordinal(&groups[2])?,
            sub_feature: ordinal(&groups[3])?,
            item: groups.get(4).map(|m| ordinal(m.as_str())).transpose()?,
        })
    }
}

impl TryFrom<&str> for Tag {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::from_str(value)
    }
}
