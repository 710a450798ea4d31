//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use sheet2xml_core::pipeline::{ConvertResult, ProgressReporter};
use sheet2xml_shared::{
    AppConfig, GroupOrder, Settings, expand_home, init_config, load_config, load_config_from,
};
use tracing::{error, info};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// sheet2xml: turn a conversation-design spreadsheet into XML.
#[derive(Parser)]
#[command(
    name = "sheet2xml",
    version,
    about = "Export the first worksheet of a Google Sheet as grouped conversation XML.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to load instead of ~/.sheet2xml/sheet2xml.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Fetch a sheet and write it as XML.
    Convert(ConvertArgs),

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Flags for `convert`. Every flag overrides the matching config value.
#[derive(clap::Args, Debug, Default)]
pub(crate) struct ConvertArgs {
    /// Spreadsheet key or URL.
    pub sheet: String,

    /// Local service-account key file.
    #[arg(long)]
    pub creds_file: Option<String>,

    /// Prefer an existing key file over the Drive id (true/false).
    #[arg(long)]
    pub use_creds_file: Option<bool>,

    /// Google Drive file id (or share link) of the service-account key.
    #[arg(long)]
    pub creds_gdrive_id: Option<String>,

    /// Output XML path.
    #[arg(short, long)]
    pub output: Option<String>,

    /// Print the written file's absolute path instead of its content
    /// (`--return-fpath` or `--return-fpath=false`).
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub return_fpath: Option<bool>,

    /// OAuth scope (repeatable). Replaces the configured list.
    #[arg(long)]
    pub scope: Vec<String>,

    /// Group order: sorted or first-seen.
    #[arg(long)]
    pub group_order: Option<GroupOrder>,

    /// Indent the XML body (`--pretty` or `--pretty=false`).
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub pretty: Option<bool>,
}

impl ConvertArgs {
    /// Layer these flags over settings loaded from config.
    fn apply(&self, settings: &mut Settings) {
        if let Some(path) = &self.creds_file {
            settings.creds_file = Some(expand_home(path));
        }
        if let Some(flag) = self.use_creds_file {
            settings.use_creds_file = flag;
        }
        if let Some(id) = &self.creds_gdrive_id {
            settings.creds_gdrive_id = Some(id.clone());
        }
        if let Some(path) = &self.output {
            settings.output_file = expand_home(path);
        }
        if !self.scope.is_empty() {
            settings.scope = self.scope.clone();
        }
        if let Some(order) = self.group_order {
            settings.group_order = order;
        }
        if let Some(flag) = self.return_fpath {
            settings.return_fpath = flag;
        }
        if let Some(flag) = self.pretty {
            settings.pretty = flag;
        }
    }
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr; stdout carries
/// the command's result.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "sheet2xml=info",
        1 => "sheet2xml=debug",
        _ => "sheet2xml=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command. Any failure is logged once here and returned.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let result = match cli.command {
        Command::Convert(args) => cmd_convert(cli.config.as_deref(), &args).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(cli.config.as_deref()),
        },
    };

    if let Err(err) = &result {
        error!(error = %err, "sheet2xml failed");
    }
    result
}

fn load(config_path: Option<&std::path::Path>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

async fn cmd_convert(config_path: Option<&std::path::Path>, args: &ConvertArgs) -> Result<()> {
    let mut settings = Settings::from(&load(config_path)?);
    args.apply(&mut settings);

    info!(sheet = %args.sheet, output = %settings.output_file.display(), "converting sheet");

    let reporter = CliProgress::new();
    let result = sheet2xml_core::pipeline::convert(&args.sheet, &settings, &reporter).await?;

    info!(
        rows = result.rows,
        conversations = result.conversations,
        responses = result.responses,
        size_bytes = result.size_bytes,
        sha256 = %result.sha256,
        elapsed_ms = result.elapsed.as_millis() as u64,
        "conversion complete"
    );
    println!("{}", result.output);

    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&std::path::Path>) -> Result<()> {
    let config = load(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner on stderr.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _result: &ConvertResult) {
        self.spinner.finish_and_clear();
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}
