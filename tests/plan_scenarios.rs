//! End-to-end behaviour of plans built through the public API.

use std::{collections::BTreeSet, rc::Rc};

use proptest::prelude::*;
use tempfile::TempDir;
use vplan::{
    Config, Ip, Plan, Prop,
    domain::tag::{normalize_tag, pad_ordinal, remove_non_ascii},
    storage::Format,
};

#[test]
fn core_bus_scenario() {
    let config = Config::default();
    let mut core = Ip::new("core", 0);

    let added = core.add_property("bus", "", &config).unwrap();
    let item = core
        .property_mut(&added.key)
        .unwrap()
        .add_item(&added.tag, "Reset values", "", &config);
    assert!(item.borrow().tag.ends_with("_I000"));

    core.del_property(&added.key).unwrap();
    let again = core.add_property("bus", "", &config).unwrap();
    assert_eq!(again, added);
}

#[test]
fn insert_after_first_item() {
    let config = Config::default();
    let mut prop = Prop::new("000_bus", "VP_PROJECT_F000_S000", 0);
    let items: Vec<_> = (0..3)
        .map(|i| prop.add_item("VP_PROJECT_F000_S000", &format!("item {i}"), "", &config))
        .collect();

    prop.insert_item("000").unwrap();

    let order: Vec<_> = prop.item_list.values().cloned().collect();
    assert!(Rc::ptr_eq(&order[0], &items[0]));
    assert!(Rc::ptr_eq(&order[1], &items[2]));
    assert!(Rc::ptr_eq(&order[2], &items[1]));
    for (key, item) in &prop.item_list {
        assert_eq!(&item.borrow().name, key);
        assert_eq!(item.borrow().tag, format!("VP_PROJECT_F000_S000_I{key}"));
    }
}

#[test]
fn plan_survives_both_database_formats() {
    let dir = TempDir::new().unwrap();
    let mut plan = Plan::new(Config::default());
    plan.add_feature("core", None).unwrap();
    let bus = plan.add_sub_feature("core", "bus", "7").unwrap().unwrap();
    let item = plan.add_item("core", &bus.key, "Reset", "Section 3").unwrap();
    item.borrow_mut().comments = "multi\nline".to_string();
    item.borrow_mut().simu_target_list = vec!["rtl".to_string()];
    item.borrow_mut().lock();

    for file_name in ["plan.yml", "plan.db"] {
        let path = dir.path().join(file_name);
        vplan::save(&mut plan, &path).unwrap();
        let loaded = vplan::load(&path, Config::default()).unwrap();
        assert_eq!(loaded, plan, "{file_name}");
    }
}

/// A structural edit applied to a plan under test.
#[derive(Debug, Clone)]
enum Edit {
    AddSub(usize, String),
    AddItem(usize, usize),
    DelSub(usize, usize),
    DelItem(usize, usize, usize),
    Insert(usize, usize, usize),
}

fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (0..3usize, "[a-z]{1,6}").prop_map(|(f, name)| Edit::AddSub(f, name)),
        (0..3usize, 0..8usize).prop_map(|(f, s)| Edit::AddItem(f, s)),
        (0..3usize, 0..8usize).prop_map(|(f, s)| Edit::DelSub(f, s)),
        (0..3usize, 0..8usize, 0..8usize).prop_map(|(f, s, i)| Edit::DelItem(f, s, i)),
        (0..3usize, 0..8usize, 0..8usize).prop_map(|(f, s, i)| Edit::Insert(f, s, i)),
    ]
}

/// The `n`th sub-feature key of a feature, wrapping around.
fn nth_sub(plan: &Plan, feature: &str, n: usize) -> Option<String> {
    let ip = plan.feature(feature)?;
    let keys: Vec<_> = ip.prop_list.keys().cloned().collect();
    (!keys.is_empty()).then(|| keys[n % keys.len()].clone())
}

/// Applies edits, ignoring the ones whose target does not exist.
fn apply(edits: &[Edit]) -> Plan {
    const FEATURES: [&str; 3] = ["alu", "core", "mmu"];
    let mut plan = Plan::new(Config::default());
    for feature in FEATURES {
        plan.add_feature(feature, None).unwrap();
    }

    for edit in edits {
        match edit {
            Edit::AddSub(f, name) => {
                let _ = plan.add_sub_feature(FEATURES[*f], name, "");
            }
            Edit::AddItem(f, s) => {
                if let Some(key) = nth_sub(&plan, FEATURES[*f], *s) {
                    plan.add_item(FEATURES[*f], &key, "", "").unwrap();
                }
            }
            Edit::DelSub(f, s) => {
                if let Some(key) = nth_sub(&plan, FEATURES[*f], *s) {
                    plan.feature_mut(FEATURES[*f])
                        .unwrap()
                        .del_property(&key)
                        .unwrap();
                }
            }
            Edit::DelItem(f, s, i) => {
                if let Some(key) = nth_sub(&plan, FEATURES[*f], *s) {
                    let _ = plan
                        .sub_feature_mut(FEATURES[*f], &key)
                        .unwrap()
                        .del_item(&pad_ordinal(*i));
                }
            }
            Edit::Insert(f, s, i) => {
                if let Some(key) = nth_sub(&plan, FEATURES[*f], *s) {
                    let _ = plan
                        .sub_feature_mut(FEATURES[*f], &key)
                        .unwrap()
                        .insert_item(&pad_ordinal(*i));
                }
            }
        }
    }
    plan
}

fn encode(plan: &mut Plan, format: Format) -> Vec<u8> {
    let mut bytes = Vec::new();
    format.write(&plan.prep_to_save(), &mut bytes).unwrap();
    bytes
}

proptest! {
    #[test]
    fn remove_non_ascii_is_idempotent(text in "\\PC{0,24}") {
        let once = remove_non_ascii(&text);
        prop_assert!(once.is_ascii());
        prop_assert_eq!(remove_non_ascii(&once), once);
    }

    #[test]
    fn normalize_tag_rewrites_only_full_legacy_matches(
        ip in 0..2000u32,
        p in 0..2000u32,
        i in 0..2000u32,
        suffix in "[A-Za-z_]{0,3}",
    ) {
        let legacy = format!("VP_IP{ip}_P{p}_I{i}");
        prop_assert_eq!(
            normalize_tag(&legacy, "CVA6"),
            format!("VP_CVA6_F{ip}_S{p}_I{i}")
        );
        let other = format!("{legacy}{suffix}x");
        prop_assert_eq!(normalize_tag(&other, "CVA6"), other.as_str());
    }

    #[test]
    fn add_item_uses_and_advances_the_counter(count in 1..40usize) {
        let config = Config::default();
        let mut prop = Prop::new("000_bus", "VP_PROJECT_F000_S000", 0);
        for n in 0..count {
            let before = prop.item_count;
            let item = prop.add_item("VP_PROJECT_F000_S000", "", "", &config);
            prop_assert_eq!(&item.borrow().name, &pad_ordinal(before));
            prop_assert_eq!(prop.item_count, n + 1);
        }
    }

    #[test]
    fn add_property_once_per_name(names in prop::collection::btree_set("[a-z]{1,8}", 1..12)) {
        let config = Config::default();
        let mut ip = Ip::new("core", 4);
        for name in &names {
            let before = ip.prop_count;
            let added = ip.add_property(name, "", &config).unwrap();
            prop_assert_eq!(added.tag, format!("VP_PROJECT_F004_S{}", pad_ordinal(before)));
            prop_assert_eq!(ip.prop_count, before + 1);

            let snapshot = ip.clone();
            prop_assert!(ip.add_property(name, "", &config).is_none());
            prop_assert_eq!(&ip, &snapshot);
        }
    }

    #[test]
    fn tags_stay_unique(edits in prop::collection::vec(edit(), 0..60)) {
        let plan = apply(&edits);
        prop_assert!(plan.duplicate_tags().is_empty());
        prop_assert!(plan.malformed_tags().is_empty());
        for ip in plan.features() {
            for prop in ip.prop_list.values() {
                for item in prop.item_list.values() {
                    prop_assert!(item.borrow().tag.starts_with(&prop.tag));
                }
            }
        }
    }

    #[test]
    fn save_load_round_trip(edits in prop::collection::vec(edit(), 0..40)) {
        let mut plan = apply(&edits);
        for format in [Format::Yaml, Format::Binary] {
            let bytes = encode(&mut plan, format);
            let record = format.read(&mut bytes.as_slice()).unwrap();
            let loaded = Plan::post_load(record, Config::default());
            prop_assert_eq!(&loaded, &plan);

            let keys = |plan: &Plan| -> BTreeSet<String> {
                plan.features()
                    .flat_map(|ip| ip.prop_list.keys().cloned())
                    .collect()
            };
            prop_assert_eq!(keys(&loaded), keys(&plan));
        }
    }

    #[test]
    fn encoding_is_deterministic(edits in prop::collection::vec(edit(), 0..40)) {
        let mut first = apply(&edits);
        let mut second = apply(&edits);
        prop_assert_eq!(encode(&mut first, Format::Binary), encode(&mut second, Format::Binary));
        prop_assert_eq!(encode(&mut first, Format::Yaml), encode(&mut second, Format::Yaml));
    }
}
