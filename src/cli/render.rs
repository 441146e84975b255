use std::{io, path::PathBuf};

use tracing::instrument;
use vplan::storage::markdown;

use super::Workspace;

#[derive(Debug, Default, clap::Parser)]
pub struct Render {
    /// Write the markdown to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Render {
    #[instrument(level = "debug", skip(workspace))]
    pub fn run(self, workspace: &Workspace) -> anyhow::Result<()> {
        let plan = workspace.load()?;
        match self.output {
            Some(path) => {
                markdown::save(&plan, &path)?;
                tracing::info!("Wrote {}", path.display());
            }
            None => markdown::write(&plan, &mut io::stdout().lock())?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use crate::cli::tests::{plan, run};

    #[test]
    fn renders_to_file() {
        let dir = TempDir::new().unwrap();
        run(&dir, &["init"]).unwrap();
        run(&dir, &["feature", "add", "core"]).unwrap();
        run(&dir, &["sub", "add", "core", "bus"]).unwrap();
        run(&dir, &["item", "add", "core", "000_bus", "-d", "Reset"]).unwrap();

        let out = dir.path().join("plan.md");
        run(&dir, &["render", "-o", out.to_str().unwrap()]).unwrap();

        let written = std::fs::read_to_string(&out).unwrap();
        assert_eq!(written, plan(&dir).to_markdown());
    }
}
