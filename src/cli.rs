use std::path::PathBuf;

mod feature;
mod init;
mod item;
mod normalize;
mod render;
mod status;
mod sub;
mod terminal;

use anyhow::Context as _;
use clap::ArgAction;
use feature::Feature;
use init::Init;
use item::Item;
use normalize::Normalize;
use render::Render;
use status::Status;
use sub::Sub;
use vplan::{Config, LoadError, Plan};

/// Default location of the plan database.
const DEFAULT_DB: &str = "vplan.yaml";

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// The plan database (`.yaml`/`.yml` for YAML, anything else for binary)
    #[arg(long, default_value = DEFAULT_DB, global = true)]
    db: PathBuf,

    /// The project configuration file
    ///
    /// Defaults to `$PLATFORM_TOP_DIR/vptool/vp_config.yaml`, then
    /// `./vp_config.yaml`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        let workspace = Workspace {
            config: Config::discover(self.config.as_deref()),
            config_path: self.config,
            db: self.db,
        };

        self.command
            .unwrap_or_else(|| Command::Status(Status::default()))
            .run(&workspace)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Show plan totals and tag health (default)
    Status(Status),

    /// Create an empty plan database
    Init(Init),

    /// Add, remove, list and lock features
    #[command(subcommand)]
    Feature(Feature),

    /// Add, remove and lock sub-features
    #[command(subcommand)]
    Sub(Sub),

    /// Add, edit, move and lock verification items
    #[command(subcommand)]
    Item(Item),

    /// Render the plan as markdown
    Render(Render),

    /// Rewrite legacy tags and drop unfilled cue text
    Normalize(Normalize),
}

impl Command {
    fn run(self, workspace: &Workspace) -> anyhow::Result<()> {
        match self {
            Self::Status(command) => command.run(workspace)?,
            Self::Init(command) => command.run(workspace)?,
            Self::Feature(command) => command.run(workspace)?,
            Self::Sub(command) => command.run(workspace)?,
            Self::Item(command) => command.run(workspace)?,
            Self::Render(command) => command.run(workspace)?,
            Self::Normalize(command) => command.run(workspace)?,
        }
        Ok(())
    }
}

/// The plan database and configuration a command works on.
#[derive(Debug)]
pub struct Workspace {
    db: PathBuf,
    config: Config,
    config_path: Option<PathBuf>,
}

impl Workspace {
    /// Loads the plan database.
    fn load(&self) -> anyhow::Result<Plan> {
        match vplan::load(&self.db, self.config.clone()) {
            Ok(plan) => Ok(plan),
            Err(LoadError::NotFound) => anyhow::bail!(
                "No plan found at {}. Create one with 'vp init'.",
                self.db.display()
            ),
            Err(e) => Err(e).with_context(|| format!("Failed to load {}", self.db.display())),
        }
    }

    /// Saves the plan database.
    fn save(&self, plan: &mut Plan) -> anyhow::Result<()> {
        vplan::save(plan, &self.db)
            .with_context(|| format!("Failed to save {}", self.db.display()))
    }

    /// Loads the plan, applies `edit`, and saves it back.
    fn edit<T>(&self, edit: impl FnOnce(&mut Plan) -> anyhow::Result<T>) -> anyhow::Result<T> {
        let mut plan = self.load()?;
        let outcome = edit(&mut plan)?;
        self.save(&mut plan)?;
        Ok(outcome)
    }
}
