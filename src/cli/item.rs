use tracing::instrument;
use vplan::domain::{Item as PlanItem, TextField};

use super::{
    Workspace,
    terminal::{Colorize, lock_marker},
};

/// Location of an item in the plan.
#[derive(Debug, clap::Args)]
pub struct ItemPath {
    /// Feature name
    feature: String,

    /// Sub-feature key, e.g. `000_bus`
    sub: String,

    /// Item ordinal, e.g. `003`
    index: String,
}

/// New values for the fields of an item; omitted fields are left alone.
#[derive(Debug, Default, clap::Args)]
pub struct Fields {
    /// Description of the feature to be tested
    #[arg(long)]
    description: Option<String>,

    /// Location of the requirement being verified
    #[arg(long)]
    purpose: Option<String>,

    /// Verification goals
    #[arg(long)]
    verif_goals: Option<String>,

    /// Location of the coverage data
    #[arg(long)]
    coverage_loc: Option<String>,

    /// Free-form notes
    #[arg(long)]
    comments: Option<String>,

    /// Progress status
    #[arg(long)]
    status: Option<String>,

    /// Pass/fail criteria code
    #[arg(long, allow_negative_numbers = true)]
    pfc: Option<i64>,

    /// Test type code
    #[arg(long, allow_negative_numbers = true)]
    test_type: Option<i64>,

    /// Coverage method code
    #[arg(long, allow_negative_numbers = true)]
    cov_method: Option<i64>,

    /// Bitmask of the applicable cores
    #[arg(long, allow_negative_numbers = true)]
    cores: Option<i64>,

    /// Simulation targets (replaces the current list)
    #[arg(long = "simu-target", value_name = "TARGET")]
    simu_targets: Vec<String>,
}

impl Fields {
    /// Writes every given value into `item`; returns how many were given.
    fn apply(self, item: &mut PlanItem) -> usize {
        let mut changed = 0;
        let texts = [
            (TextField::Description, self.description),
            (TextField::Purpose, self.purpose),
            (TextField::VerifGoals, self.verif_goals),
            (TextField::CoverageLoc, self.coverage_loc),
            (TextField::Comments, self.comments),
        ];
        for (field, value) in texts {
            if let Some(value) = value {
                *item.text_mut(field) = value;
                changed += 1;
            }
        }
        if let Some(status) = self.status {
            item.status = status;
            changed += 1;
        }
        for (slot, value) in [
            (&mut item.pfc, self.pfc),
            (&mut item.test_type, self.test_type),
            (&mut item.cov_method, self.cov_method),
            (&mut item.cores, self.cores),
        ] {
            if let Some(value) = value {
                *slot = value;
                changed += 1;
            }
        }
        if !self.simu_targets.is_empty() {
            item.simu_target_list = self.simu_targets;
            changed += 1;
        }
        changed
    }
}

#[derive(Debug, clap::Subcommand)]
pub enum Item {
    /// Add an item under the next ordinal of a sub-feature
    Add {
        /// Feature name
        feature: String,

        /// Sub-feature key
        sub: String,

        /// Description of the feature to be tested
        #[arg(short, long, default_value = "")]
        description: String,

        /// Location of the requirement being verified
        #[arg(short, long, default_value = "")]
        purpose: String,
    },

    /// Remove an item; the other items keep their ordinals
    Remove(ItemPath),

    /// Move the last item of a sub-feature to just after `index`
    ///
    /// Items after `index` shift up one ordinal and their tags change. Do not
    /// use this once tags are referenced by simulation or coverage results.
    Insert(ItemPath),

    /// Print an item as markdown
    Show(ItemPath),

    /// Set item fields
    Set {
        #[command(flatten)]
        path: ItemPath,

        #[command(flatten)]
        fields: Fields,
    },

    /// Lock an item for the current user
    Lock(ItemPath),

    /// Release the lock on an item
    Unlock(ItemPath),

    /// Lock an unlocked item or unlock a locked one
    Toggle(ItemPath),
}

impl Item {
    #[instrument(level = "debug", skip(workspace))]
    pub fn run(self, workspace: &Workspace) -> anyhow::Result<()> {
        match self {
            Self::Add {
                feature,
                sub,
                description,
                purpose,
            } => {
                let tag = workspace.edit(|plan| {
                    let item = plan.add_item(&feature, &sub, &description, &purpose)?;
                    let tag = item.borrow().tag.clone();
                    Ok(tag)
                })?;
                println!("Added item {}", tag.info());
            }
            Self::Remove(path) => {
                let removed = workspace.edit(|plan| {
                    Ok(plan
                        .sub_feature_mut(&path.feature, &path.sub)?
                        .del_item(&path.index)?)
                })?;
                println!("Removed item {}", removed.borrow().tag.info());
            }
            Self::Insert(path) => {
                workspace.edit(|plan| {
                    plan.sub_feature_mut(&path.feature, &path.sub)?
                        .insert_item(&path.index)?;
                    Ok(())
                })?;
                println!("Moved the last item of {} after {}", path.sub, path.index);
            }
            Self::Show(path) => {
                let plan = workspace.load()?;
                let item = plan.item(&path.feature, &path.sub, &path.index)?;
                let item = item.borrow();
                print!("{}", item.display(plan.config()));
                println!("{}", lock_marker(&item.lock_status));
            }
            Self::Set { path, fields } => {
                let changed = workspace.edit(|plan| {
                    let item = plan.item(&path.feature, &path.sub, &path.index)?;
                    let mut item = item.borrow_mut();
                    if let Some(owner) = item.lock_status.owner() {
                        tracing::warn!("Editing {} while it is locked by {owner}", item.tag);
                    }
                    Ok(fields.apply(&mut item))
                })?;
                println!("Updated {changed} fields");
            }
            Self::Lock(path) => {
                let record = edit_lock(workspace, &path, PlanItem::lock)?;
                println!("{} {record}", "Locked".success());
            }
            Self::Unlock(path) => {
                edit_lock(workspace, &path, PlanItem::unlock)?;
                println!("{}", "Unlocked".success());
            }
            Self::Toggle(path) => {
                let record = edit_lock(workspace, &path, PlanItem::invert_lock)?;
                println!("Lock status: {record}");
            }
        }
        Ok(())
    }
}

/// Applies a lock operation to one item and returns its new lock record.
fn edit_lock(
    workspace: &Workspace,
    path: &ItemPath,
    operation: fn(&mut PlanItem),
) -> anyhow::Result<String> {
    workspace.edit(|plan| {
        let item = plan.item(&path.feature, &path.sub, &path.index)?;
        operation(&mut item.borrow_mut());
        let record = item.borrow().get_lock_status();
        Ok(record)
    })
}
