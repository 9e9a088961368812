/// Version injected at compile time via HASTILY_VERSION env var (set by CI/CD),
/// or the crate version for local builds.
pub const VERSION: &str = match option_env!("HASTILY_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use hastily::api::{self, status_hint, ExportModel, HttpTransport, ModelApi, ResponseList};
use hastily::auth::Credentials;
use hastily::common::{Console, Generic, Outcome, Progress, StatusList, TableType};
use hastily::config::Config;
use hastily::model::{Meta, Model};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Command-line client for REST backends
#[derive(Parser, Debug)]
#[command(name = "hastily", version = VERSION, about, long_about = None)]
struct Args {
    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

/// Where and how results are printed
#[derive(clap::Args, Debug)]
struct OutputArgs {
    /// Table style
    #[arg(long, value_enum, default_value_t = TableType::Basic)]
    format: TableType,

    /// Write the table to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Do not truncate long cells
    #[arg(long)]
    wide: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Obtain an access token and save it
    Login {
        #[arg(short, long)]
        username: String,

        #[arg(short, long, env = "HASTILY_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// List objects of a model
    Get {
        model: String,

        /// Sparse filter file (JSON or YAML)
        #[arg(long)]
        filter: Option<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Create one object from a file
    Create {
        model: String,

        #[arg(long = "from")]
        from: PathBuf,
    },

    /// Delete matching objects
    Delete {
        model: String,

        #[arg(long)]
        filter: Option<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Apply a partial update to matching objects
    Update {
        model: String,

        /// Partial update (JSON or YAML)
        #[arg(long = "from")]
        from: PathBuf,

        #[arg(long)]
        filter: Option<PathBuf>,

        /// Merge locally and report, without sending anything
        #[arg(long)]
        dry_run: bool,

        #[command(flatten)]
        output: OutputArgs,
    },
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {:?}", log_path))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("hastily {} started with log level: {:?}", VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("hastily").join("hastily.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".hastily").join("hastily.log");
    }
    PathBuf::from("hastily.log")
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let console = Console::stdout();

    if let Err(err) = run(args, console).await {
        console.error(&format!("{:#}", err));
        std::process::exit(1);
    }
}

async fn run(args: Args, console: Console) -> Result<()> {
    let _log_guard = setup_logging(args.log_level)?;

    let config = Config::load()?;

    match args.command {
        Command::Login { username, password } => {
            login(&config, &username, &password, console).await
        }
        Command::Get {
            model,
            filter,
            output,
        } => {
            let api = model_api(&config, &model).await?;
            console.title(&format!("Fetching {}", api.name()));
            let filter = load_filter(filter.as_deref())?;
            let resources = api.get_filtered(filter.as_ref()).await?;
            console.subtitle(&format!("Found {} objects", resources.len()));
            export(&api, &resources, None, &output)
        }
        Command::Create { model, from } => {
            let api = model_api(&config, &model).await?;
            let meta = Meta::<Model>::load(&from)
                .with_context(|| format!("Failed to load {:?}", from))?;
            api.create(&meta.resource).await?;
            console.success(&format!("Created {} object", api.name()));
            Ok(())
        }
        Command::Delete {
            model,
            filter,
            output,
        } => {
            let api = model_api(&config, &model).await?;
            console.title(&format!("Deleting {}", api.name()));
            let filter = load_filter(filter.as_deref())?;
            let resources = api.get_filtered(filter.as_ref()).await?;
            console.subtitle(&format!("Found {} objects", resources.len()));

            let progress = console.progress("Deleting", resources.len());
            let results = tracked(&api, &progress).delete_many(&resources).await;
            progress.finish();

            report(console, "Deleted", &results);
            export(&api, &resources, Some(&results.to_generic()), &output)
        }
        Command::Update {
            model,
            from,
            filter,
            dry_run,
            output,
        } => {
            let api = model_api(&config, &model).await?;
            console.title(&format!("Updating {}", api.name()));
            let filter = load_filter(filter.as_deref())?;
            let meta = Meta::<Model>::load(&from)
                .with_context(|| format!("Failed to load {:?}", from))?;

            let resources = api.get_filtered(filter.as_ref()).await?;
            console.subtitle(&format!("Found {} objects", resources.len()));
            let (updated, statuses) = api.list_update(&resources, &meta).await;
            console.subtitle(&format!(
                "Merged {}/{} objects",
                statuses.successes(),
                statuses.size()
            ));

            let columns = if dry_run {
                report_statuses(console, &statuses);
                console.warn("Dry run, nothing was sent");
                statuses.to_generic()
            } else {
                let progress = console.progress("Updating", updated.len());
                let results = tracked(&api, &progress)
                    .update_many(&updated, Some(&statuses))
                    .await;
                progress.finish();
                report(console, "Updated", &results);
                results.to_generic()
            };
            export(&api, &updated, Some(&columns), &output)
        }
    }
}

async fn login(config: &Config, username: &str, password: &str, console: Console) -> Result<()> {
    let Some(endpoint) = config.login.as_deref() else {
        bail!("No login endpoint configured. Set `login` in config.yaml or HASTILY_LOGIN");
    };

    let mut credentials = Credentials::login(endpoint, username, password).await?;
    credentials.save().context("Failed to save credentials")?;
    console.success(&format!("Logged in as {} ({})", username, credentials.path));
    Ok(())
}

/// Build the handler for one model, checking credentials when required
async fn model_api(config: &Config, model: &str) -> Result<ModelApi<Model>> {
    config.validate()?;

    let token = if config.requires_login() {
        let credentials =
            Credentials::load().context("No usable credentials. Run 'hastily login' first")?;
        if credentials.is_expired() {
            bail!(api::INVALID_CREDENTIALS);
        }
        credentials.access_token
    } else {
        String::new()
    };

    let transport = Arc::new(HttpTransport::new()?);
    let client = api::Client::new(api::Context::new(&config.api, model, &token), transport);

    if config.requires_login() {
        match config.verify.as_deref() {
            Some(verify) => {
                let response = client.check_connection(verify).await;
                if !response.success {
                    bail!(response.message);
                }
            }
            None => tracing::warn!("No verify endpoint configured, skipping connection check"),
        }
    }

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling pending requests");
            trigger.cancel();
        }
        // second interrupt aborts outright
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });

    let options = config.bulk_options().with_cancel(cancel);
    Ok(ModelApi::new(client).with_options(options))
}

/// Same handler, ticking `progress` as units finish
fn tracked(api: &ModelApi<Model>, progress: &Progress) -> ModelApi<Model> {
    let options = api.options().clone().with_progress(progress.clone());
    api.clone().with_options(options)
}

fn load_filter(path: Option<&Path>) -> Result<Option<Model>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let meta = Meta::<Model>::load(path)
        .with_context(|| format!("Failed to load filter {:?}", path))?;
    Ok(Some(meta.resource))
}

fn report(console: Console, action: &str, results: &ResponseList) {
    console.tally(action, results.successes(), results.size());
    for (key, response) in results.failures() {
        if response.skipped {
            console.info(&format!("  {}: skipped ({})", key, response.message()));
            continue;
        }
        let text = match status_hint(response.status_code) {
            Some(hint) => format!("{}: {} - {}", key, response.message(), hint),
            None => format!("{}: {}", key, response.message()),
        };
        console.error(&text);
    }
}

fn report_statuses(console: Console, statuses: &StatusList) {
    for (key, status) in statuses.failures() {
        console.info(&format!("  {}: {}", key, status.message()));
    }
}

fn export(
    api: &ModelApi<Model>,
    resources: &[Model],
    columns: Option<&HashMap<String, Generic>>,
    output: &OutputArgs,
) -> Result<()> {
    let mut model = ExportModel::new(resources)
        .with_table_type(output.format)
        .wide(output.wide);
    if let Some(columns) = columns {
        model = model.with_extra_fields(columns);
    }
    if let Some(path) = &output.output {
        model = model.with_output_file(path);
    }
    api.export(&model)?;
    Ok(())
}
