use tracing::instrument;

use super::{Workspace, terminal::Colorize};

#[derive(Debug, clap::Subcommand)]
pub enum Feature {
    /// Add a feature
    Add {
        /// Feature name
        name: String,

        /// Use this ordinal instead of the next free one
        #[arg(long)]
        index: Option<usize>,
    },

    /// Remove a feature with all its sub-features and items
    Remove {
        /// Feature name
        name: String,
    },

    /// List features and their sub-features
    List,

    /// Lock every item of a feature, or of the whole plan
    Lock {
        /// Feature name (all features if omitted)
        name: Option<String>,
    },

    /// Unlock every item of a feature, or of the whole plan
    Unlock {
        /// Feature name (all features if omitted)
        name: Option<String>,
    },
}

impl Feature {
    #[instrument(level = "debug", skip(workspace))]
    pub fn run(self, workspace: &Workspace) -> anyhow::Result<()> {
        match self {
            Self::Add { name, index } => {
                let ip_num = workspace.edit(|plan| Ok(plan.add_feature(&name, index)?.ip_num))?;
                println!("Added feature '{name}' (F{ip_num:03})");
            }
            Self::Remove { name } => {
                let removed = workspace.edit(|plan| Ok(plan.del_feature(&name)?))?;
                println!(
                    "Removed feature '{name}' with {} sub-features",
                    removed.prop_list.len()
                );
            }
            Self::List => {
                let plan = workspace.load()?;
                if plan.features().next().is_none() {
                    println!("No features yet. Add one with 'vp feature add'.");
                }
                for ip in plan.features() {
                    println!("F{:03} {}", ip.ip_num, ip.name);
                    for (key, prop) in &ip.prop_list {
                        println!(
                            "  {key} {}",
                            format!("({} items)", prop.item_list.len()).dim()
                        );
                    }
                }
            }
            Self::Lock { name } => {
                workspace.edit(|plan| {
                    match &name {
                        Some(name) => plan
                            .feature(name)
                            .ok_or_else(|| vplan::Error::FeatureNotFound(name.clone()))?
                            .lock_properties(),
                        None => plan.lock_all(),
                    }
                    Ok(())
                })?;
                println!("{}", "Locked".success());
            }
            Self::Unlock { name } => {
                workspace.edit(|plan| {
                    match &name {
                        Some(name) => plan
                            .feature(name)
                            .ok_or_else(|| vplan::Error::FeatureNotFound(name.clone()))?
                            .unlock_ip(),
                        None => plan.unlock_all(),
                    }
                    Ok(())
                })?;
                println!("{}", "Unlocked".success());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use crate::cli::tests::{plan, run};

    #[test]
    fn add_remove_and_lock() {
        let dir = TempDir::new().unwrap();
        run(&dir, &["init"]).unwrap();
        run(&dir, &["feature", "add", "core", "--index", "5"]).unwrap();
        run(&dir, &["feature", "add", "alu"]).unwrap();
        assert!(run(&dir, &["feature", "add", "alu"]).is_err());

        let loaded = plan(&dir);
        assert_eq!(loaded.feature("core").unwrap().ip_num, 5);
        assert_eq!(loaded.feature("alu").unwrap().ip_num, 1);

        run(&dir, &["sub", "add", "alu", "adder"]).unwrap();
        run(&dir, &["item", "add", "alu", "000_adder"]).unwrap();
        run(&dir, &["feature", "lock"]).unwrap();
        assert!(plan(&dir).items().all(|item| item.borrow().is_locked()));
        run(&dir, &["feature", "unlock", "alu"]).unwrap();
        assert!(plan(&dir).items().all(|item| !item.borrow().is_locked()));
        assert!(run(&dir, &["feature", "lock", "fpu"]).is_err());

        run(&dir, &["feature", "remove", "core"]).unwrap();
        assert!(plan(&dir).feature("core").is_none());
    }
}
