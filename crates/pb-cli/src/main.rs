//! CLI entry point for the protobuf schema registry.
//!
//! Loads a project's `.proto` definitions the same way an embedding
//! application would, then prints ids, looks up nodes, exports the
//! annotated JSON tree or runs the configured code generator.
//!
//! # Usage
//!
//! ```bash
//! pbreg [OPTIONS] <COMMAND>
//!
//! # List every assigned id
//! pbreg --root ./my-app ids
//!
//! # Look a node up by dotted name or id
//! pbreg get app.User.Profile
//! pbreg get 4
//!
//! # Export a namespace as JSON
//! pbreg export app.User --output user.json
//!
//! # Generate code for two namespaces
//! pbreg compile -t static-module app.User app.Order -- -w commonjs
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::io::Write;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand, ValueEnum};
use pb_core::{IdPolicy, RegistryConfig};
use pb_registry::{LookupKey, ProtoRegistry};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Protobuf schema registry with stable numeric ids.
///
/// Loads every `.proto` file below the configured model folders, assigns
/// each namespace node an id and answers queries against the merged tree.
#[derive(Parser)]
#[command(name = "pbreg", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// JSON configuration file.
    #[arg(short, long, global = true, env = "PBREG_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Project root that relative paths are resolved against.
    ///
    /// Overrides `root` from the configuration file.
    #[arg(short, long, global = true, env = "PBREG_ROOT")]
    root: Option<Utf8PathBuf>,

    /// Model folder to load (repeatable).
    ///
    /// Replaces `path` from the configuration file. Defaults to `app/models`.
    #[arg(short, long, global = true)]
    path: Vec<Utf8PathBuf>,

    /// Id assignment policy.
    #[arg(long, global = true, value_enum)]
    ids: Option<IdPolicyArg>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// List every assigned id with its dotted name.
    Ids {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Look up a node by dotted name or id.
    Get {
        /// Dotted name (`app.User`) or numeric id.
        key: String,
    },

    /// Export the annotated JSON tree.
    Export {
        /// Namespace to export (the whole tree if omitted).
        key: Option<String>,

        /// Output file (defaults to stdout).
        #[arg(short, long)]
        output: Option<Utf8PathBuf>,

        /// Print on a single line.
        #[arg(long)]
        compact: bool,
    },

    /// Run the configured code generator over namespaces.
    Compile {
        /// Target format passed to the generator.
        #[arg(short = 't', long, default_value = "static-module")]
        target: String,

        /// Namespaces to compile (the whole tree if omitted).
        keys: Vec<String>,

        /// Extra flags passed through to the generator (after `--`).
        #[arg(last = true)]
        flags: Vec<String>,

        /// Output file (defaults to stdout).
        #[arg(short, long)]
        output: Option<Utf8PathBuf>,
    },
}

/// Id policy as accepted on the command line.
#[derive(Clone, Copy, ValueEnum)]
enum IdPolicyArg {
    /// Sequential ids in sorted pre-order.
    Auto,
    /// Ids from `{id}-{name}.proto` file names.
    File,
}

impl From<IdPolicyArg> for IdPolicy {
    fn from(arg: IdPolicyArg) -> Self {
        match arg {
            IdPolicyArg::Auto => Self::Auto,
            IdPolicyArg::File => Self::File,
        }
    }
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects the `RUST_LOG` environment variable if set. Otherwise, uses
/// `debug` level if `--verbose` is set, or `info` level by default. Logs go
/// to stderr so command output on stdout stays machine-readable.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},ignore=warn"))
    });

    // Check if colors should be disabled (flag or NO_COLOR env var)
    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(use_ansi)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

/// Builds a [`RegistryConfig`] from the configuration file and CLI overrides.
///
/// # Errors
///
/// Returns an error if the configuration file can't be read or is invalid,
/// or if the project root doesn't exist or isn't a directory.
fn build_config(cli: &Cli) -> color_eyre::Result<RegistryConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            debug!(path = %path, "Reading configuration");
            RegistryConfig::from_file(path)?
        }
        None => RegistryConfig::default(),
    };

    if let Some(root) = &cli.root {
        config.root.clone_from(root);
    }
    if !cli.path.is_empty() {
        config.path.clone_from(&cli.path);
    }
    if let Some(ids) = cli.ids {
        config.ids = ids.into();
    }
    if cli.verbose {
        config.debug = true;
    }

    config.check_root()?;
    config.validate()?;
    Ok(config)
}

/// Creates and starts a registry.
async fn start_registry(config: RegistryConfig) -> color_eyre::Result<ProtoRegistry> {
    info!(root = %config.root, ids = config.ids.label(), "Starting registry");
    let mut registry = ProtoRegistry::new(config);
    registry.run().await?;
    Ok(registry)
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Prints the id table.
fn run_ids(registry: &ProtoRegistry, json: bool) -> color_eyre::Result<()> {
    #[derive(serde::Serialize)]
    struct Entry<'a> {
        id: u32,
        name: &'a str,
    }

    let entries: Vec<Entry<'_>> = registry
        .ids()
        .iter()
        .map(|(id, name)| Entry { id: id.get(), name })
        .collect();

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    if json {
        serde_json::to_writer_pretty(&mut handle, &entries)?;
        writeln!(handle)?;
        return Ok(());
    }
    for entry in &entries {
        let name = if entry.name.is_empty() { "<root>" } else { entry.name };
        writeln!(handle, "{:>6}  {name}", entry.id)?;
    }
    Ok(())
}

/// Prints what a key resolves to.
fn run_get(registry: &ProtoRegistry, key: &str) -> color_eyre::Result<()> {
    let key = LookupKey::parse(key);
    let Some(ix) = registry.get(key.clone()) else {
        return Err(color_eyre::eyre::eyre!("Nothing found for '{key}'"));
    };

    let node = registry.node(ix);
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "name:     {}", registry.full_name(ix))?;
    writeln!(handle, "kind:     {}", node.kind())?;
    match node.assigned_id() {
        Some(id) => writeln!(handle, "id:       {id}")?,
        None => writeln!(handle, "id:       -")?,
    }
    if let Some(file) = node.source_file() {
        writeln!(handle, "file:     {file}")?;
    }
    writeln!(handle, "children: {}", node.children().len())?;
    Ok(())
}

/// Writes the exported JSON.
fn run_export(
    registry: &ProtoRegistry,
    key: Option<&str>,
    output: Option<&Utf8PathBuf>,
    compact: bool,
) -> color_eyre::Result<()> {
    let key = key.map(LookupKey::parse);
    let Some(value) = registry.export(key.clone()) else {
        return Err(color_eyre::eyre::eyre!(
            "Namespace [{}] does not exist",
            key.map(|k| k.to_string()).unwrap_or_default()
        ));
    };

    let content = if compact {
        serde_json::to_string(&value)?
    } else {
        serde_json::to_string_pretty(&value)?
    };
    write_output(&content, output)
}

/// Runs the generator and writes its output.
async fn run_compile(
    registry: &ProtoRegistry,
    target: &str,
    keys: &[String],
    flags: &[String],
    output: Option<&Utf8PathBuf>,
) -> color_eyre::Result<()> {
    let keys: Vec<LookupKey> = keys.iter().map(|key| LookupKey::parse(key)).collect();
    let generated = registry.compile(&keys, target, flags).await?;
    write_output(&generated, output)
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

/// Writes `content` to `output`, or stdout when `None`.
fn write_output(content: &str, output: Option<&Utf8PathBuf>) -> color_eyre::Result<()> {
    if let Some(path) = output {
        std::fs::write(path.as_std_path(), content)?;
        info!(path = %path, "Output written");
    } else {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        write!(handle, "{content}")?;
        if !content.ends_with('\n') {
            writeln!(handle)?;
        }
    }
    Ok(())
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // 1. Install color-eyre FIRST (before any potential panics)
    color_eyre::install()?;

    // 2. Parse CLI arguments
    let cli = Cli::parse();

    // 3. Initialize tracing (handles --no-color for log output)
    init_tracing(cli.verbose, cli.no_color);

    // 4. Load the registry
    let config = build_config(&cli)?;
    let registry = start_registry(config).await?;

    // 5. Route to appropriate command
    match &cli.command {
        Commands::Ids { json } => run_ids(&registry, *json),
        Commands::Get { key } => run_get(&registry, key),
        Commands::Export {
            key,
            output,
            compact,
        } => run_export(&registry, key.as_deref(), output.as_ref(), *compact),
        Commands::Compile {
            target,
            keys,
            flags,
            output,
        } => run_compile(&registry, target, keys, flags, output.as_ref()).await,
    }
}
