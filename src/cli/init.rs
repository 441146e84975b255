use std::path::Path;

use tracing::instrument;
use vplan::{
    Config, Plan,
    domain::{CONFIG_FILE_NAME, ProjectIdent},
};

use super::Workspace;

#[derive(Debug, Default, clap::Parser)]
pub struct Init {
    /// Project identifier embedded in every tag
    ///
    /// Also writes a configuration file for the project, at `--config` if
    /// given, otherwise `./vp_config.yaml`.
    #[arg(long)]
    project: Option<String>,

    /// Overwrite an existing plan database or configuration file
    #[arg(long)]
    force: bool,
}

impl Init {
    #[instrument(level = "debug", skip(workspace))]
    pub fn run(self, workspace: &Workspace) -> anyhow::Result<()> {
        if workspace.db.exists() && !self.force {
            anyhow::bail!(
                "Plan already exists at {} (use --force to overwrite)",
                workspace.db.display()
            );
        }

        let config = match self.project {
            Some(project) => {
                let config = Config::for_project(ProjectIdent::new(project)?);
                let path = workspace
                    .config_path
                    .as_deref()
                    .unwrap_or_else(|| Path::new(CONFIG_FILE_NAME));
                if path.exists() && !self.force {
                    anyhow::bail!(
                        "Configuration already exists at {} (use --force to overwrite)",
                        path.display()
                    );
                }
                config
                    .save(path)
                    .map_err(|e| anyhow::anyhow!("Failed to create {}: {e}", path.display()))?;
                println!("  Created: {}", path.display());
                config
            }
            None => workspace.config.clone(),
        };

        workspace.save(&mut Plan::new(config))?;
        println!("Initialized empty plan in {}", workspace.db.display());
        println!();
        println!("Next steps:");
        println!("  vp feature add <NAME>");

        Ok(())
    }
}
