//! Chartwell CLI - manage chart repositories and search their indexes

use chartwell_repo::{AddOptions, RepoSettings, SearchOptions};
use clap::{Args, Parser, Subcommand};
use std::io::stderr;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;
mod display;
mod error;
mod exit_codes;

use display::OutputFormat;

#[derive(Parser)]
#[command(name = "chartwell")]
#[command(author = "Chartwell Contributors")]
#[command(version)]
#[command(about = "Manage chart repositories and search their indexes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the repositories file
    #[arg(long, global = true)]
    repository_config: Option<PathBuf>,

    /// Path to the directory of cached repository indexes
    #[arg(long, global = true)]
    repository_cache: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Add, list, remove, update and index chart repositories
    #[command(subcommand)]
    Repo(RepoCommands),

    /// Search for charts
    #[command(subcommand)]
    Search(SearchCommands),
}

#[derive(Subcommand)]
enum RepoCommands {
    /// Add a chart repository
    Add(AddArgs),

    /// Remove one or more chart repositories
    #[command(alias = "rm")]
    Remove {
        /// Repository names
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// List chart repositories
    #[command(alias = "ls")]
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// Update information of available charts locally from chart repositories
    #[command(alias = "up")]
    Update {
        /// Only update these repositories
        names: Vec<String>,
    },

    /// Generate an index file given a directory containing packaged charts
    Index {
        /// Directory of chart archives
        dir: PathBuf,

        /// URL of the chart repository
        #[arg(long)]
        url: Option<String>,

        /// Merge the generated index into the given index
        #[arg(long)]
        merge: Option<PathBuf>,
    },
}

#[derive(Args)]
struct AddArgs {
    /// Repository name
    name: String,

    /// Repository URL
    url: String,

    /// Chart repository username
    #[arg(long)]
    username: Option<String>,

    /// Chart repository password
    #[arg(long)]
    password: Option<String>,

    /// Pass credentials to all domains
    #[arg(long = "pass-credentials")]
    pass_credentials: bool,

    /// Replace (overwrite) the repo if it already exists
    #[arg(long)]
    force_update: bool,

    /// Allow adding official repos that have been deprecated
    #[arg(long)]
    allow_deprecated_repos: bool,

    /// Verify certificates of HTTPS-enabled servers using this CA bundle
    #[arg(long)]
    ca_file: Option<PathBuf>,

    /// Identify HTTPS client using this SSL certificate file
    #[arg(long)]
    cert_file: Option<PathBuf>,

    /// Identify HTTPS client using this SSL key file
    #[arg(long)]
    key_file: Option<PathBuf>,

    /// Skip tls certificate checks for the repository
    #[arg(long)]
    insecure_skip_tls_verify: bool,
}

impl From<AddArgs> for AddOptions {
    fn from(args: AddArgs) -> Self {
        AddOptions {
            name: args.name,
            url: args.url,
            username: args.username,
            password: args.password,
            pass_credentials_all: args.pass_credentials,
            ca_file: args.ca_file,
            cert_file: args.cert_file,
            key_file: args.key_file,
            insecure_skip_tls_verify: args.insecure_skip_tls_verify,
            force_update: args.force_update,
            allow_deprecated_repos: args.allow_deprecated_repos,
        }
    }
}

#[derive(Subcommand)]
enum SearchCommands {
    /// Search repositories for a keyword in charts
    Repo {
        /// Keywords to search for; lists every chart when empty
        keywords: Vec<String>,

        /// Use regular expressions for searching
        #[arg(short, long)]
        regexp: bool,

        /// Use development versions (alpha, beta, and release candidate releases) too
        #[arg(long)]
        devel: bool,

        /// Search using semantic versioning constraints
        #[arg(long)]
        version: Option<String>,

        /// Show the long listing, with each version of each chart on its own line
        #[arg(short = 'l', long)]
        versions: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t)]
        output: OutputFormat,

        /// Maximum column width for output table
        #[arg(long, default_value_t = commands::search::DEFAULT_MAX_COL_WIDTH)]
        max_col_width: usize,
    },
}

fn init_logging(debug: bool) {
    let filter = if let Ok(filter) = EnvFilter::try_from_default_env() {
        filter
    } else if debug {
        EnvFilter::new("chartwell=debug")
    } else {
        EnvFilter::new("chartwell=info")
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(stderr),
        )
        .with(filter)
        .init();
}

async fn run(cli: Cli) -> error::Result<()> {
    let settings = RepoSettings::resolve(cli.repository_config, cli.repository_cache)?;
    debug!(
        "Repository config {}, cache {}",
        settings.repository_config.display(),
        settings.repository_cache.display()
    );

    match cli.command {
        Commands::Repo(command) => match command {
            RepoCommands::Add(args) => commands::repo::add(&settings, &args.into()).await,
            RepoCommands::Remove { names } => commands::repo::remove(&settings, &names).await,
            RepoCommands::List { output } => commands::repo::list(&settings, output),
            RepoCommands::Update { names } => commands::repo::update(&settings, &names).await,
            RepoCommands::Index { dir, url, merge } => commands::repo::index(&dir, url, merge),
        },

        Commands::Search(SearchCommands::Repo {
            keywords,
            regexp,
            devel,
            version,
            versions,
            output,
            max_col_width,
        }) => {
            let options = SearchOptions {
                regexp,
                devel,
                version,
                versions,
                ..SearchOptions::new(keywords)
            };
            commands::search::run(&settings, &options, output, max_col_width)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    miette::set_panic_hook();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() {
                exit_codes::USAGE_ERROR
            } else {
                exit_codes::SUCCESS
            };
            // Nothing useful is left to report when stdout/stderr are gone
            let _ = e.print();
            return exit_code(code);
        }
    };

    init_logging(cli.debug);

    match run(cli).await {
        Ok(()) => exit_code(exit_codes::SUCCESS),
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            exit_code(code)
        }
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
