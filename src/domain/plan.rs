//! The root of a verification plan.
//!
//! A [`Plan`] owns its features and the counter handing out feature
//! ordinals. Nothing is shared between plans, so two plans can be edited
//! side by side without their numbering interfering.

use std::{collections::BTreeMap, fmt, rc::Rc};

use tracing::instrument;

use crate::{
    domain::{
        Config, Error,
        ip::{Ip, NewProperty},
        item::SharedItem,
        lock::{AuditSource, SystemAudit},
        prop::Prop,
        tag::{Tag, normalize_tag},
    },
    storage::record::{Keyed, PlanRecord},
};

/// Hands out feature ordinals.
///
/// The counter only moves forward until it is cleared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrdinalRegistry {
    next: usize,
}

impl OrdinalRegistry {
    /// Starts counting from `next`.
    #[must_use]
    pub const fn starting_at(next: usize) -> Self {
        Self { next }
    }

    /// Returns the current ordinal and advances the counter.
    pub const fn allocate(&mut self) -> usize {
        let ordinal = self.next;
        self.next += 1;
        ordinal
    }

    /// The ordinal the next call to [`allocate`](Self::allocate) returns.
    #[must_use]
    pub const fn peek(&self) -> usize {
        self.next
    }

    /// Resets the counter to zero.
    pub const fn clear(&mut self) {
        self.next = 0;
    }
}

/// A verification plan: features keyed by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    config: Config,
    registry: OrdinalRegistry,
    features: BTreeMap<String, Ip>,
}

impl Plan {
    /// Creates an empty plan.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            registry: OrdinalRegistry::default(),
            features: BTreeMap::new(),
        }
    }

    /// The configuration the plan was created with.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The feature-ordinal counter.
    #[must_use]
    pub const fn registry(&self) -> &OrdinalRegistry {
        &self.registry
    }

    /// Adds a feature.
    ///
    /// The feature takes `index` as its ordinal if given, otherwise the next
    /// value of the counter. The counter advances either way.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateFeature`] if a feature with this name
    /// already exists.
    pub fn add_feature(&mut self, name: &str, index: Option<usize>) -> Result<&mut Ip, Error> {
        if self.features.contains_key(name) {
            return Err(Error::DuplicateFeature(name.to_string()));
        }
        let counted = self.registry.allocate();
        let ip_num = index.unwrap_or(counted);
        tracing::debug!(feature = name, ip_num, "added feature");

        Ok(self
            .features
            .entry(name.to_string())
            .or_insert_with(|| Ip::new(name, ip_num)))
    }

    /// Removes a feature and everything below it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FeatureNotFound`] if there is no such feature.
    pub fn del_feature(&mut self, name: &str) -> Result<Ip, Error> {
        let ip = self
            .features
            .remove(name)
            .ok_or_else(|| Error::FeatureNotFound(name.to_string()))?;
        tracing::debug!(feature = name, "deleted feature");
        Ok(ip)
    }

    /// Looks up a feature by name.
    #[must_use]
    pub fn feature(&self, name: &str) -> Option<&Ip> {
        self.features.get(name)
    }

    /// Looks up a feature by name for editing.
    pub fn feature_mut(&mut self, name: &str) -> Option<&mut Ip> {
        self.features.get_mut(name)
    }

    /// Iterates over the features in name order.
    pub fn features(&self) -> impl Iterator<Item = &Ip> {
        self.features.values()
    }

    /// Adds a sub-feature to the named feature.
    ///
    /// Returns `Ok(None)` if the sub-feature already exists; see
    /// [`Ip::add_property`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::FeatureNotFound`] if there is no such feature.
    pub fn add_sub_feature(
        &mut self,
        feature: &str,
        name: &str,
        custom_num: &str,
    ) -> Result<Option<NewProperty>, Error> {
        let ip = self
            .features
            .get_mut(feature)
            .ok_or_else(|| Error::FeatureNotFound(feature.to_string()))?;
        Ok(ip.add_property(name, custom_num, &self.config))
    }

    /// Adds an item to a sub-feature, tagged after the sub-feature.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FeatureNotFound`] or [`Error::SubFeatureNotFound`] if
    /// the path does not exist.
    pub fn add_item(
        &mut self,
        feature: &str,
        sub_feature: &str,
        description: &str,
        purpose: &str,
    ) -> Result<SharedItem, Error> {
        let prop = self
            .features
            .get_mut(feature)
            .ok_or_else(|| Error::FeatureNotFound(feature.to_string()))?
            .property_mut(sub_feature)
            .ok_or_else(|| Error::SubFeatureNotFound(sub_feature.to_string()))?;
        let prefix = prop.tag.clone();
        Ok(prop.add_item(&prefix, description, purpose, &self.config))
    }

    /// Looks up a sub-feature by feature name and sub-feature key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FeatureNotFound`] or [`Error::SubFeatureNotFound`] if
    /// the path does not exist.
    pub fn sub_feature(&self, feature: &str, sub_feature: &str) -> Result<&Prop, Error> {
        self.feature(feature)
            .ok_or_else(|| Error::FeatureNotFound(feature.to_string()))?
            .property(sub_feature)
            .ok_or_else(|| Error::SubFeatureNotFound(sub_feature.to_string()))
    }

    /// Looks up a sub-feature for editing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FeatureNotFound`] or [`Error::SubFeatureNotFound`] if
    /// the path does not exist.
    pub fn sub_feature_mut(
        &mut self,
        feature: &str,
        sub_feature: &str,
    ) -> Result<&mut Prop, Error> {
        self.feature_mut(feature)
            .ok_or_else(|| Error::FeatureNotFound(feature.to_string()))?
            .property_mut(sub_feature)
            .ok_or_else(|| Error::SubFeatureNotFound(sub_feature.to_string()))
    }

    /// Looks up an item by its path in the tree.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first level of the path that does not
    /// exist.
    pub fn item(&self, feature: &str, sub_feature: &str, index: &str) -> Result<SharedItem, Error> {
        self.sub_feature(feature, sub_feature)?
            .item_list
            .get(index)
            .map(Rc::clone)
            .ok_or_else(|| Error::ItemNotFound(index.to_string()))
    }

    /// Resets the feature-ordinal counter. Existing features are untouched.
    pub const fn clear(&mut self) {
        self.registry.clear();
    }

    /// Builds a tag → item index over the whole plan.
    ///
    /// If two items share a tag, the later one in key order wins; see
    /// [`duplicate_tags`](Self::duplicate_tags).
    #[must_use]
    pub fn tag_index(&self) -> BTreeMap<String, SharedItem> {
        self.items()
            .map(|item| (item.borrow().tag.clone(), Rc::clone(item)))
            .collect()
    }

    /// Tags carried by more than one item, in tag order.
    #[must_use]
    pub fn duplicate_tags(&self) -> Vec<String> {
        let mut seen = BTreeMap::<String, usize>::new();
        for item in self.items() {
            *seen.entry(item.borrow().tag.clone()).or_default() += 1;
        }
        seen.into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(tag, _)| tag)
            .collect()
    }

    /// Item tags that do not follow the tag grammar once normalized.
    #[must_use]
    pub fn malformed_tags(&self) -> Vec<String> {
        self.items()
            .filter_map(|item| {
                let tag = item.borrow().tag.clone();
                let malformed = normalize_tag(&tag, self.config.project_ident())
                    .parse::<Tag>()
                    .is_err();
                malformed.then_some(tag)
            })
            .collect()
    }

    /// Iterates over every item of the plan in key order.
    pub fn items(&self) -> impl Iterator<Item = &SharedItem> {
        self.features.values().flat_map(Ip::items)
    }

    /// Number of items currently in the plan.
    #[must_use]
    pub fn live_items(&self) -> usize {
        self.items().count()
    }

    /// Locks every item for the current user.
    pub fn lock_all(&self) {
        self.lock_all_with(&SystemAudit);
    }

    /// Locks every item with a stamp from `audit`.
    pub fn lock_all_with(&self, audit: &dyn AuditSource) {
        for ip in self.features.values() {
            ip.lock_properties_with(audit);
        }
    }

    /// Unlocks every item.
    pub fn unlock_all(&self) {
        for ip in self.features.values() {
            ip.unlock_ip();
        }
    }

    /// Strips unfilled cue text and normalizes legacy tags of every item.
    pub fn sanitize(&self) {
        for item in self.items() {
            item.borrow_mut().prep_to_save(&self.config);
        }
    }

    /// Sanitizes the whole tree, as [`Plan::sanitize`] does, and returns its
    /// persisted form.
    #[instrument(level = "debug", skip(self))]
    pub fn prep_to_save(&mut self) -> PlanRecord {
        let Self {
            config,
            registry,
            features,
        } = self;
        PlanRecord {
            next_feature: registry.peek(),
            features: features
                .iter_mut()
                .map(|(name, ip)| Keyed::new(name.clone(), ip.prep_to_save(config)))
                .collect(),
        }
    }

    /// Rebuilds a plan from its persisted form.
    #[must_use]
    pub fn post_load(record: PlanRecord, config: Config) -> Self {
        Self {
            config,
            registry: OrdinalRegistry::starting_at(record.next_feature),
            features: record
                .features
                .into_iter()
                .map(|Keyed { key, value }| (key, Ip::post_load(value)))
                .collect(),
        }
    }

    /// Renders the whole plan as markdown.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        self.display().to_string()
    }

    /// Returns a markdown rendering of the plan.
    #[must_use]
    pub const fn display(&self) -> PlanMarkdown<'_> {
        PlanMarkdown { plan: self }
    }
}

/// Markdown rendering of a [`Plan`].
///
/// Features appear in their display order (`wid_order`, then name), which
/// follows the feature ordinals in the tags. Sub-features and items appear in
/// key order.
#[derive(Debug, Clone, Copy)]
pub struct PlanMarkdown<'a> {
    plan: &'a Plan,
}

impl fmt::Display for PlanMarkdown<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let config = &self.plan.config;
        let mut features: Vec<_> = self.plan.features().collect();
        features.sort_by(|a, b| (a.wid_order, &a.name).cmp(&(b.wid_order, &b.name)));
        for ip in features {
            write!(f, "{ip}")?;
            for prop in ip.prop_list.values() {
                write!(f, "{prop}")?;
                for item in prop.item_list.values() {
                    writeln!(f, "{}", item.borrow().display(config))?;
                }
            }
        }
        Ok(())
    }
}
