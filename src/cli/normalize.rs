use tracing::instrument;
use vplan::Plan;

use super::{Workspace, terminal::Colorize};

#[derive(Debug, Default, clap::Parser)]
pub struct Normalize {
    /// Report what would change without saving
    #[arg(long)]
    check: bool,
}

impl Normalize {
    #[instrument(level = "debug", skip(workspace))]
    pub fn run(self, workspace: &Workspace) -> anyhow::Result<()> {
        let mut plan = workspace.load()?;
        let before = tags(&plan);
        plan.sanitize();
        let renamed: Vec<_> = before
            .into_iter()
            .zip(tags(&plan))
            .filter(|(old, new)| old != new)
            .collect();

        for (old, new) in &renamed {
            println!("{} -> {}", old.dim(), new.info());
        }

        if renamed.is_empty() {
            println!("{}", "All tags are up to date".success());
        } else if self.check {
            println!("{} legacy tags would be rewritten", renamed.len());
            return Ok(());
        } else {
            println!("Rewrote {} legacy tags", renamed.len());
        }

        if !self.check {
            workspace.save(&mut plan)?;
        }
        Ok(())
    }
}

fn tags(plan: &Plan) -> Vec<String> {
    plan.items().map(|item| item.borrow().tag.clone()).collect()
}
