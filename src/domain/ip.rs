//! Features: the chapters of a verification plan.

use std::{collections::BTreeMap, fmt, rc::Rc};

use crate::{
    domain::{
        Config, Error,
        item::SharedItem,
        lock::{AuditSource, SystemAudit},
        prop::Prop,
        tag::{pad_ordinal, remove_non_ascii, trailing_ordinal},
    },
    storage::record::{IpRecord, Keyed},
};

/// A feature: a design block or documentation chapter to be covered.
///
/// Sub-features are keyed by their composite name, which embeds their
/// ordinal, so key order is creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ip {
    /// Feature name.
    pub name: String,
    /// Feature ordinal, embedded in every tag below it.
    pub ip_num: usize,
    /// Sub-features keyed by composite name.
    pub prop_list: BTreeMap<String, Prop>,
    /// Ordinal given to the next sub-feature.
    pub prop_count: usize,
    /// Display-order hint for front-ends.
    pub wid_order: usize,
}

/// Identity of a newly added sub-feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProperty {
    /// The sub-feature tag.
    pub tag: String,
    /// The key the sub-feature was stored under.
    pub key: String,
}

impl Ip {
    /// Creates an empty feature with the given ordinal.
    #[must_use]
    pub fn new(name: impl Into<String>, ip_num: usize) -> Self {
        Self {
            name: name.into(),
            ip_num,
            wid_order: ip_num,
            ..Self::default()
        }
    }

    /// Adds a sub-feature.
    ///
    /// Non-ASCII characters are stripped from `name`; the sub-feature is stored
    /// under `<custom_num><ordinal>_<name>` and tagged
    /// `VP_<project>_F<ip_num>_S<ordinal>`.
    ///
    /// Returns `None`, logs a warning and changes nothing if `name` is already
    /// a key or the label of an existing sub-feature.
    pub fn add_property(
        &mut self,
        name: &str,
        custom_num: &str,
        config: &Config,
    ) -> Option<NewProperty> {
        let label = remove_non_ascii(name);
        if self.prop_list.contains_key(name)
            || self.prop_list.values().any(|prop| prop.label() == label)
        {
            tracing::warn!(feature = %self.name, "Property already exists: {name}");
            return None;
        }

        let ordinal = pad_ordinal(self.prop_count);
        let key = format!("{custom_num}{ordinal}_{label}");
        let tag = format!(
            "VP_{}_F{}_S{ordinal}",
            config.project_ident(),
            pad_ordinal(self.ip_num)
        );

        self.prop_list
            .insert(key.clone(), Prop::new(&key, &tag, self.prop_count));
        self.prop_count += 1;
        tracing::debug!(feature = %self.name, %key, %tag, "added sub-feature");

        Some(NewProperty { tag, key })
    }

    /// Removes the sub-feature stored under `name`.
    ///
    /// The ordinal counter is rewound only when the removed sub-feature holds
    /// the highest ordinal handed out; other deletions leave a gap.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SubFeatureNotFound`] if there is no such sub-feature.
    pub fn del_property(&mut self, name: &str) -> Result<Prop, Error> {
        let prop = self
            .prop_list
            .remove(name)
            .ok_or_else(|| Error::SubFeatureNotFound(name.to_string()))?;

        if trailing_ordinal(&prop.tag).is_some_and(|ordinal| ordinal + 1 == self.prop_count) {
            self.prop_count -= 1;
        }
        tracing::debug!(feature = %self.name, key = name, "deleted sub-feature");

        Ok(prop)
    }

    /// Looks up a sub-feature by key.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&Prop> {
        self.prop_list.get(key)
    }

    /// Looks up a sub-feature by key for editing.
    pub fn property_mut(&mut self, key: &str) -> Option<&mut Prop> {
        self.prop_list.get_mut(key)
    }

    /// Builds a tag → item index over every sub-feature.
    ///
    /// The index is derived on demand and never persisted.
    #[must_use]
    pub fn create_ip_tag_dict(&self) -> BTreeMap<String, SharedItem> {
        self.items()
            .map(|item| (item.borrow().tag.clone(), Rc::clone(item)))
            .collect()
    }

    /// Iterates over every item of the feature in key order.
    pub fn items(&self) -> impl Iterator<Item = &SharedItem> {
        self.prop_list
            .values()
            .flat_map(|prop| prop.item_list.values())
    }

    /// Unlocks every item of every sub-feature.
    pub fn unlock_properties(&self) {
        for prop in self.prop_list.values() {
            prop.unlock_items();
        }
    }

    /// Locks every item of every sub-feature for the current user.
    pub fn lock_properties(&self) {
        self.lock_properties_with(&SystemAudit);
    }

    /// Locks every item of every sub-feature with a stamp from `audit`.
    pub fn lock_properties_with(&self, audit: &dyn AuditSource) {
        for prop in self.prop_list.values() {
            prop.lock_items_with(audit);
        }
    }

    /// Unlocks the whole feature.
    pub fn unlock_ip(&self) {
        self.unlock_properties();
    }

    /// Sanitizes every sub-feature and returns the persisted form,
    /// sub-features sorted by key.
    pub fn prep_to_save(&mut self, config: &Config) -> IpRecord {
        IpRecord {
            name: self.name.clone(),
            ip_num: self.ip_num,
            prop_count: self.prop_count,
            wid_order: self.wid_order,
            props: self
                .prop_list
                .iter_mut()
                .map(|(key, prop)| Keyed::new(key.clone(), prop.prep_to_save(config)))
                .collect(),
        }
    }

    /// Rebuilds a feature from its persisted form.
    #[must_use]
    pub fn post_load(record: IpRecord) -> Self {
        let IpRecord {
            name,
            ip_num,
            prop_count,
            wid_order,
            props,
        } = record;

        Self {
            name,
            ip_num,
            prop_list: props
                .into_iter()
                .map(|Keyed { key, value }| (key, Prop::post_load(value)))
                .collect(),
            prop_count,
            wid_order,
        }
    }
}

impl fmt::Display for Ip {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "## Feature: {}\n\n", self.name)
    }
}
