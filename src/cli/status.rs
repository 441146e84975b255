use std::process;

use clap::Parser;
use serde::Serialize;
use tracing::instrument;
use vplan::{Plan, storage::fingerprint};

use super::{Workspace, terminal::Colorize};

#[derive(Debug, Parser, Default)]
#[command(about = "Show plan totals and tag health")]
pub struct Status {
    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Suppress headers and format for scripting
    #[arg(long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// What `vp status` reports.
#[derive(Debug, Serialize)]
struct Summary {
    features: usize,
    sub_features: usize,
    items: usize,
    locked: usize,
    duplicate_tags: Vec<String>,
    malformed_tags: Vec<String>,
    fingerprint: String,
}

impl Summary {
    fn of(mut plan: Plan) -> Self {
        let locked = plan
            .items()
            .filter(|item| item.borrow().is_locked())
            .count();
        Self {
            features: plan.features().count(),
            sub_features: plan.features().map(|ip| ip.prop_list.len()).sum(),
            items: plan.live_items(),
            locked,
            duplicate_tags: plan.duplicate_tags(),
            malformed_tags: plan.malformed_tags(),
            fingerprint: fingerprint(&plan.prep_to_save()),
        }
    }
}

impl Status {
    #[instrument(level = "debug", skip(workspace))]
    pub fn run(self, workspace: &Workspace) -> anyhow::Result<()> {
        let summary = Summary::of(workspace.load()?);

        if summary.features == 0 && !self.quiet {
            println!("No features yet. Add one with 'vp feature add'.");
            return Ok(());
        }

        match self.output {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
            OutputFormat::Table if self.quiet => Self::output_quiet(&summary),
            OutputFormat::Table => Self::output_table(&summary),
        }

        // Exit with a non-zero code when tags need attention.
        let mut exit_code = 0;
        if !summary.malformed_tags.is_empty() {
            exit_code = exit_code.max(3);
        }
        if !summary.duplicate_tags.is_empty() {
            exit_code = exit_code.max(2);
        }

        if exit_code != 0 {
            process::exit(exit_code);
        }

        Ok(())
    }

    fn output_quiet(summary: &Summary) {
        println!(
            "features={} sub_features={} items={} locked={} duplicates={} malformed={}",
            summary.features,
            summary.sub_features,
            summary.items,
            summary.locked,
            summary.duplicate_tags.len(),
            summary.malformed_tags.len()
        );
    }

    fn output_table(summary: &Summary) {
        const MAX_TAG_DISPLAY: usize = 5;

        println!("Plan totals");
        println!("{}", "───────────".dim());
        println!("{:<14} {}", "Features", summary.features);
        println!("{:<14} {}", "Sub-features", summary.sub_features);
        println!("{:<14} {}", "Items", summary.items);
        println!("{:<14} {}", "Locked", summary.locked);
        println!("{:<14} {}", "Fingerprint", summary.fingerprint.dim());
        println!();

        for (title, tags) in [
            ("Duplicate tags", &summary.duplicate_tags),
            ("Malformed tags", &summary.malformed_tags),
        ] {
            if tags.is_empty() {
                println!("{title}: {} ✅", "0".success());
                continue;
            }
            println!("{title}: {} ⚠️", tags.len().to_string().warning());
            for tag in tags.iter().take(MAX_TAG_DISPLAY) {
                println!("  - {}", tag.info());
            }
            if tags.len() > MAX_TAG_DISPLAY {
                println!("  - ... and {} more", tags.len() - MAX_TAG_DISPLAY);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;
    use vplan::{Config, Plan};

    use super::Summary;
    use crate::cli::tests::run;

    #[test]
    fn summary_counts_every_level() {
        let mut plan = Plan::new(Config::default());
        plan.add_feature("core", None).unwrap();
        plan.add_sub_feature("core", "bus", "").unwrap();
        plan.add_sub_feature("core", "mmu", "").unwrap();
        plan.add_item("core", "000_bus", "", "").unwrap();
        plan.add_item("core", "001_mmu", "", "").unwrap()
            .borrow_mut()
            .lock_status = vplan::domain::LockStatus::Locked("now me".to_string());

        let summary = Summary::of(plan);

        assert_eq!(summary.features, 1);
        assert_eq!(summary.sub_features, 2);
        assert_eq!(summary.items, 2);
        assert_eq!(summary.locked, 1);
        assert!(summary.duplicate_tags.is_empty());
        assert!(summary.malformed_tags.is_empty());
        assert_eq!(summary.fingerprint.len(), 64);
    }

    #[test]
    fn healthy_plan_reports_in_every_format() {
        let dir = TempDir::new().unwrap();
        run(&dir, &["init"]).unwrap();
        run(&dir, &["status"]).unwrap();
        run(&dir, &["feature", "add", "core"]).unwrap();
        run(&dir, &["status"]).unwrap();
        run(&dir, &["status", "--quiet"]).unwrap();
        run(&dir, &["status", "--output", "json"]).unwrap();
    }
}
