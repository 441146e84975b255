use tracing::instrument;

use super::{
    Workspace,
    terminal::{Colorize, lock_marker},
};

#[derive(Debug, clap::Subcommand)]
pub enum Sub {
    /// Add a sub-feature to a feature
    Add {
        /// Feature name
        feature: String,

        /// Sub-feature label; non-ASCII characters are dropped
        name: String,

        /// Numeric prefix for the sub-feature key
        #[arg(long, default_value = "")]
        custom_num: String,
    },

    /// Remove a sub-feature with all its items
    Remove {
        /// Feature name
        feature: String,

        /// Sub-feature key, e.g. `000_bus`
        key: String,
    },

    /// List the items of a sub-feature
    Show {
        /// Feature name
        feature: String,

        /// Sub-feature key
        key: String,
    },

    /// Lock every item of a sub-feature
    Lock {
        /// Feature name
        feature: String,

        /// Sub-feature key
        key: String,
    },

    /// Unlock every item of a sub-feature
    Unlock {
        /// Feature name
        feature: String,

        /// Sub-feature key
        key: String,
    },
}

impl Sub {
    #[instrument(level = "debug", skip(workspace))]
    pub fn run(self, workspace: &Workspace) -> anyhow::Result<()> {
        match self {
            Self::Add {
                feature,
                name,
                custom_num,
            } => {
                let added =
                    workspace.edit(|plan| Ok(plan.add_sub_feature(&feature, &name, &custom_num)?))?;
                match added {
                    Some(added) => println!("Added sub-feature {} ({})", added.key, added.tag.info()),
                    None => anyhow::bail!("Sub-feature '{name}' already exists in '{feature}'"),
                }
            }
            Self::Remove { feature, key } => {
                let removed = workspace.edit(|plan| {
                    Ok(plan
                        .feature_mut(&feature)
                        .ok_or_else(|| vplan::Error::FeatureNotFound(feature.clone()))?
                        .del_property(&key)?)
                })?;
                println!(
                    "Removed sub-feature {key} with {} items",
                    removed.item_list.len()
                );
            }
            Self::Show { feature, key } => {
                let plan = workspace.load()?;
                let prop = plan.sub_feature(&feature, &key)?;
                println!("{} {}", prop.name, prop.tag.info());
                for item in prop.item_list.values() {
                    let item = item.borrow();
                    println!(
                        "  {} {} {}",
                        item.tag.info(),
                        item.description,
                        lock_marker(&item.lock_status)
                    );
                }
            }
            Self::Lock { feature, key } => {
                workspace.edit(|plan| {
                    plan.sub_feature(&feature, &key)?.lock_items();
                    Ok(())
                })?;
                println!("{}", "Locked".success());
            }
            Self::Unlock { feature, key } => {
                workspace.edit(|plan| {
                    plan.sub_feature(&feature, &key)?.unlock_items();
                    Ok(())
                })?;
                println!("{}", "Unlocked".success());
            }
        }
        Ok(())
    }
}
