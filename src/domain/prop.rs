//! Sub-features: ordered collections of verification items.

use std::{collections::BTreeMap, fmt, rc::Rc};

use tracing::instrument;

use crate::{
    domain::{
        Config, Error,
        item::{Item, SharedItem},
        lock::{AuditSource, SystemAudit},
        tag::{pad_ordinal, with_ordinal},
    },
    storage::record::{Keyed, PropRecord},
};

/// A sub-feature: a named behaviour or section of a feature.
///
/// Items are keyed by their zero-padded ordinal. Keys decide the order; they
/// need not be contiguous once items have been deleted.
///
/// Cloning a `Prop` copies its scalar fields but shares its items: editing an
/// item through the clone is visible through the original.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prop {
    /// Composite name: optional custom prefix, ordinal, `_`, label.
    pub name: String,
    /// `VP_<project>_F<nnn>_S<nnn>`; prefix of every item tag.
    pub tag: String,
    /// Items keyed by ordinal.
    pub item_list: BTreeMap<String, SharedItem>,
    /// Ordinal given to the next item.
    pub item_count: usize,
    /// Display-order hint for front-ends.
    pub wid_order: usize,
}

impl Prop {
    /// Creates an empty sub-feature.
    #[must_use]
    pub fn new(name: impl Into<String>, tag: impl Into<String>, wid_order: usize) -> Self {
        Self {
            name: name.into(),
            tag: tag.into(),
            wid_order,
            ..Self::default()
        }
    }

    /// The human label: the composite name without its numeric prefix.
    #[must_use]
    pub fn label(&self) -> &str {
        self.name
            .split_once('_')
            .map_or(self.name.as_str(), |(_, label)| label)
    }

    /// Adds an item under the next ordinal.
    ///
    /// The item is named after the ordinal and tagged
    /// `<tag_prefix>_I<ordinal>`. The ordinal counter always advances, so
    /// deleted ordinals are never handed out again.
    pub fn add_item(
        &mut self,
        tag_prefix: &str,
        description: &str,
        purpose: &str,
        config: &Config,
    ) -> SharedItem {
        let ordinal = pad_ordinal(self.item_count);
        let item = Item::new(
            &ordinal,
            format!("{tag_prefix}_I{ordinal}"),
            description,
            purpose,
            config,
        )
        .shared();

        if self
            .item_list
            .insert(ordinal.clone(), Rc::clone(&item))
            .is_some()
        {
            tracing::warn!(
                sub_feature = %self.name,
                "item {ordinal} replaced an existing item"
            );
        }
        self.item_count += 1;
        tracing::debug!(sub_feature = %self.name, tag = %item.borrow().tag, "added item");

        item
    }

    /// Removes the item stored under `index`.
    ///
    /// Remaining items keep their ordinals and the counter is not rewound.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ItemNotFound`] if there is no such item.
    pub fn del_item(&mut self, index: &str) -> Result<SharedItem, Error> {
        let item = self
            .item_list
            .remove(index)
            .ok_or_else(|| Error::ItemNotFound(index.to_string()))?;
        tracing::debug!(sub_feature = %self.name, index, "deleted item");
        Ok(item)
    }

    /// Moves the highest-keyed item to just after `item_name`.
    ///
    /// Every item from position `item_name + 1` upwards shifts up one
    /// ordinal, with its name and tag rewritten to match. The item that held
    /// the highest key lands at `item_name + 1`.
    ///
    /// Tags change, so this must not be used once tags have been referenced
    /// by simulation or coverage results.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOrdinal`] if `item_name` or a stored key is not
    /// a number or cannot be shifted up, and [`Error::EmptySubFeature`] if
    /// there is nothing to move.
    /// The sub-feature is left untouched on error.
    #[instrument(level = "debug", skip(self), fields(sub_feature = %self.name))]
    pub fn insert_item(&mut self, item_name: &str) -> Result<(), Error> {
        let insert_index = parse_ordinal(item_name)?
            .checked_add(1)
            .ok_or_else(|| Error::InvalidOrdinal(item_name.to_string()))?;
        if self.item_list.is_empty() {
            return Err(Error::EmptySubFeature(self.name.clone()));
        }

        // New ordinal of every item but the last, which is the one moved.
        let mut shifted = Vec::with_capacity(self.item_list.len() - 1);
        for key in self.item_list.keys().take(self.item_list.len() - 1) {
            let ordinal = parse_ordinal(key)?;
            shifted.push(if ordinal < insert_index {
                None
            } else {
                let next = ordinal
                    .checked_add(1)
                    .ok_or_else(|| Error::InvalidOrdinal(key.clone()))?;
                Some(pad_ordinal(next))
            });
        }
        let (_, moved) = self
            .item_list
            .pop_last()
            .ok_or_else(|| Error::EmptySubFeature(self.name.clone()))?;

        let mut renumbered = BTreeMap::new();
        for (new_key, (key, item)) in shifted.into_iter().zip(std::mem::take(&mut self.item_list)) {
            let key = match new_key {
                None => key,
                Some(new_key) => {
                    renumber(&item, &new_key);
                    new_key
                }
            };
            renumbered.insert(key, item);
        }

        let target = pad_ordinal(insert_index);
        renumber(&moved, &target);
        renumbered.insert(target, moved);
        self.item_list = renumbered;

        Ok(())
    }

    /// Returns a copy of this sub-feature sharing the same items.
    ///
    /// The sharing lasts only in memory: saving stores each sub-feature's
    /// items separately, so a loaded plan holds independent copies.
    #[must_use]
    pub fn prop_clone(&self) -> Self {
        self.clone()
    }

    /// Unlocks every item.
    pub fn unlock_items(&self) {
        for item in self.item_list.values() {
            item.borrow_mut().unlock();
        }
    }

    /// Locks every item for the current user.
    pub fn lock_items(&self) {
        self.lock_items_with(&SystemAudit);
    }

    /// Locks every item with a stamp from `audit`.
    pub fn lock_items_with(&self, audit: &dyn AuditSource) {
        for item in self.item_list.values() {
            item.borrow_mut().lock_with(audit);
        }
    }

    /// Sanitizes every item and returns the persisted form, items sorted by
    /// key.
    pub fn prep_to_save(&mut self, config: &Config) -> PropRecord {
        for item in self.item_list.values() {
            item.borrow_mut().prep_to_save(config);
        }
        PropRecord {
            name: self.name.clone(),
            tag: self.tag.clone(),
            item_count: self.item_count,
            wid_order: self.wid_order,
            items: self
                .item_list
                .iter()
                .map(|(key, item)| Keyed::new(key.clone(), item.borrow().clone()))
                .collect(),
        }
    }

    /// Rebuilds a sub-feature from its persisted form.
    #[must_use]
    pub fn post_load(record: PropRecord) -> Self {
        let PropRecord {
            name,
            tag,
            item_count,
            wid_order,
            items,
        } = record;

        Self {
            name,
            tag,
            item_list: items
                .into_iter()
                .map(|Keyed { key, value }| (key, value.shared()))
                .collect(),
            item_count,
            wid_order,
        }
    }
}

impl fmt::Display for Prop {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "### Sub-feature: {}\n\n", self.name)
    }
}

fn parse_ordinal(text: &str) -> Result<usize, Error> {
    text.trim()
        .parse()
        .map_err(|_| Error::InvalidOrdinal(text.to_string()))
}

fn renumber(item: &SharedItem, ordinal: &str) {
    let mut item = item.borrow_mut();
    item.tag = with_ordinal(&item.tag, ordinal);
    item.name = ordinal.to_string();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lock::tests::FixedAudit;

    const PREFIX: &str = "VP_PROJECT_F000_S001";

    fn prop_with_items(count: usize) -> Prop {
        let config = Config::default();
        let mut prop = Prop::new("001_bus", PREFIX, 1);
        for i in 0..count {
            prop.add_item(PREFIX, &format!("item {i}"), "", &config);
        }
        prop
    }

    fn names_and_tags(prop: &Prop) -> Vec<(String, String, String)> {
        prop.item_list
            .iter()
            .map(|(key, item)| {
                let item = item.borrow();
                (key.clone(), item.name.clone(), item.tag.clone())
            })
            .collect()
    }

    #[test]
    fn add_item_allocates_next_ordinal() {
        let config = Config::default();
        let mut prop = Prop::new("000_bus", "VP_PROJECT_F000_S000", 0);

        let item = prop.add_item("VP_PROJECT_F000_S000", "Reset", "Spec 1", &config);

        assert_eq!(item.borrow().name, "000");
        assert_eq!(item.borrow().tag, "VP_PROJECT_F000_S000_I000");
        assert_eq!(prop.item_count, 1);
        assert!(Rc::ptr_eq(&item, &prop.item_list["000"]));
    }

    #[test]
    fn ordinals_are_not_reused_after_deletion() {
        let config = Config::default();
        let mut prop = prop_with_items(3);

        prop.del_item("002").unwrap();
        assert_eq!(prop.item_count, 3);

        let item = prop.add_item(PREFIX, "", "", &config);
        assert_eq!(item.borrow().name, "003");
        assert_eq!(
            prop.item_list.keys().collect::<Vec<_>>(),
            vec!["000", "001", "003"]
        );
    }

    #[test]
    fn del_missing_item_is_an_error() {
        let mut prop = prop_with_items(1);
        assert_eq!(
            prop.del_item("005"),
            Err(Error::ItemNotFound("005".to_string()))
        );
        assert_eq!(prop.item_list.len(), 1);
    }

    #[test]
    fn insert_item_moves_last_item_after_target() {
        let mut prop = prop_with_items(3);
        let last = Rc::clone(&prop.item_list["002"]);
        let second = Rc::clone(&prop.item_list["001"]);

        prop.insert_item("000").unwrap();

        assert_eq!(
            names_and_tags(&prop),
            vec![
                ("000".into(), "000".into(), format!("{PREFIX}_I000")),
                ("001".into(), "001".into(), format!("{PREFIX}_I001")),
                ("002".into(), "002".into(), format!("{PREFIX}_I002")),
            ]
        );
        assert!(Rc::ptr_eq(&prop.item_list["001"], &last));
        assert!(Rc::ptr_eq(&prop.item_list["002"], &second));
        assert_eq!(last.borrow().description, "item 2");
        assert_eq!(prop.item_count, 3);
    }

    #[test]
    fn insert_item_with_gaps_shifts_only_upper_block() {
        let mut prop = prop_with_items(5);
        prop.del_item("001").unwrap();
        let last = Rc::clone(&prop.item_list["004"]);

        prop.insert_item("001").unwrap();

        assert_eq!(
            prop.item_list.keys().collect::<Vec<_>>(),
            vec!["000", "002", "003", "004"]
        );
        assert!(Rc::ptr_eq(&prop.item_list["002"], &last));
        assert_eq!(prop.item_list["003"].borrow().description, "item 2");
        assert_eq!(prop.item_list["004"].borrow().description, "item 3");
        assert_eq!(prop.item_list["004"].borrow().tag, format!("{PREFIX}_I004"));
    }

    #[test]
    fn insert_item_beyond_last_relocates_it() {
        let mut prop = prop_with_items(2);

        prop.insert_item("004").unwrap();

        assert_eq!(
            prop.item_list.keys().collect::<Vec<_>>(),
            vec!["000", "005"]
        );
        assert_eq!(prop.item_list["005"].borrow().name, "005");
    }

    #[test]
    fn insert_item_errors_leave_prop_untouched() {
        let mut empty = Prop::new("000_x", PREFIX, 0);
        assert_eq!(
            empty.insert_item("000"),
            Err(Error::EmptySubFeature("000_x".to_string()))
        );

        let mut prop = prop_with_items(2);
        let before = names_and_tags(&prop);
        assert_eq!(
            prop.insert_item("one"),
            Err(Error::InvalidOrdinal("one".to_string()))
        );
        assert_eq!(names_and_tags(&prop), before);

        let max = usize::MAX.to_string();
        assert_eq!(prop.insert_item(&max), Err(Error::InvalidOrdinal(max.clone())));
        assert_eq!(names_and_tags(&prop), before);
    }

    #[test]
    fn insert_item_refuses_to_shift_past_the_largest_ordinal() {
        let mut prop = prop_with_items(2);
        let max = usize::MAX.to_string();
        // Keys sort as text, so "9" is the item that gets moved.
        let first = prop.item_list.remove("000").unwrap();
        let second = prop.item_list.remove("001").unwrap();
        prop.item_list.insert(max.clone(), first);
        prop.item_list.insert("9".to_string(), second);
        let before = names_and_tags(&prop);

        assert_eq!(prop.insert_item("000"), Err(Error::InvalidOrdinal(max)));
        assert_eq!(names_and_tags(&prop), before);
    }

    #[test]
    fn clone_shares_items() {
        let prop = prop_with_items(2);
        let mut clone = prop.prop_clone();

        clone.item_list["000"].borrow_mut().status = "done".to_string();
        clone.name = "002_copy".to_string();
        clone.item_count = 10;

        assert_eq!(prop.item_list["000"].borrow().status, "done");
        assert_eq!(prop.name, "001_bus");
        assert_eq!(prop.item_count, 2);
        assert!(Rc::ptr_eq(&prop.item_list["001"], &clone.item_list["001"]));
    }

    #[test]
    fn loaded_clones_no_longer_share_items() {
        let config = Config::default();
        let mut prop = prop_with_items(1);
        let mut clone = prop.prop_clone();

        let prop = Prop::post_load(prop.prep_to_save(&config));
        let clone = Prop::post_load(clone.prep_to_save(&config));

        assert!(!Rc::ptr_eq(&prop.item_list["000"], &clone.item_list["000"]));
        clone.item_list["000"].borrow_mut().status = "done".to_string();
        assert_ne!(prop.item_list["000"].borrow().status, "done");
    }

    #[test]
    fn bulk_lock_and_unlock() {
        let prop = prop_with_items(3);

        prop.lock_items_with(&FixedAudit);
        assert!(prop.item_list.values().all(|item| item.borrow().is_locked()));

        prop.unlock_items();
        assert!(prop.item_list.values().all(|item| !item.borrow().is_locked()));
    }

    #[test]
    fn save_and_load_preserve_items_in_key_order() {
        let config = Config::default();
        let mut prop = prop_with_items(3);
        prop.del_item("001").unwrap();
        prop.item_list["000"].borrow_mut().comments = config.cue_text("comments").unwrap().into();

        let record = prop.prep_to_save(&config);

        assert_eq!(
            record.items.iter().map(|entry| entry.key.as_str()).collect::<Vec<_>>(),
            vec!["000", "002"]
        );
        assert!(prop.item_list["000"].borrow().comments.is_empty());

        let loaded = Prop::post_load(record);
        assert_eq!(loaded, prop);
    }

    #[test]
    fn label_and_header() {
        let prop = Prop::new("12003_load store", PREFIX, 3);
        assert_eq!(prop.label(), "load store");
        assert_eq!(prop.to_string(), "### Sub-feature: 12003_load store\n\n");
    }
}
