//! Command line arguments of the `tablesmith` binary

use std::{path::PathBuf, time::Duration};

use clap::{Parser, Subcommand, ValueEnum};
use tablesmith::{
    CompletionConfig, ConflictPolicy, KeyColumn, LoaderConfig, StoreLocation, TablesmithError,
    TabularSource, assistant::{DEFAULT_ENDPOINT, DEFAULT_MODEL},
};

/// Default directory for per-table store files
const DEFAULT_STORE_DIRECTORY: &str = ".";

/// Cli arguments related to logging
#[derive(Debug, clap::Args)]
pub(crate) struct LoggingArgs {
    /// Increase log verbosity (multiple uses increase verbosity further)
    #[arg(short, long, action = clap::builder::ArgAction::Count, group = "verbosity")]
    verbose: u8,
    /// Reduce log verbosity to show only errors (equivalent to --log error)
    #[arg(short, long, group = "verbosity")]
    quiet: bool,
    /// Set log verbosity (default is "warn")
    #[arg(long = "log", value_parser = clap::builder::PossibleValuesParser::new(["error", "warn", "info", "debug", "trace"]), group = "verbosity")]
    log_level: Option<String>,
}

impl LoggingArgs {
    /// Initialising Logging
    ///
    /// Sets the logging verbosity to the given log-level in the following order:
    ///  * `Info`, `Debug`, `Trace`; depending on the count of `-v`
    ///  * `Error` when `-q` is used
    ///  * The `TABLESMITH_LOG` environment variable value
    ///  * `Warn` otherwise
    pub(crate) fn initialize_logging(&self) {
        let mut builder = env_logger::Builder::new();

        builder.filter_level(log::LevelFilter::Warn);

        builder.parse_env("TABLESMITH_LOG");
        if let Some(ref level) = self.log_level {
            builder.parse_filters(level);
        } else if self.quiet {
            builder.filter_level(log::LevelFilter::Error);
        } else if self.verbose > 0 {
            builder.filter_level(match self.verbose {
                1 => log::LevelFilter::Info,
                2 => log::LevelFilter::Debug,
                _ => log::LevelFilter::Trace,
            });
        }
        builder.init();
    }
}

/// Cli arguments selecting the store
#[derive(Debug, clap::Args)]
pub(crate) struct StoreArgs {
    /// Directory holding one `<table>.db` file per table
    #[arg(long = "store-dir", env = "TABLESMITH_STORE_DIR", global = true)]
    store_dir: Option<PathBuf>,
    /// Single store file holding every table; takes precedence over --store-dir
    #[arg(long = "store-file", env = "TABLESMITH_STORE_FILE", global = true)]
    store_file: Option<PathBuf>,
}

impl StoreArgs {
    pub(crate) fn location(&self) -> StoreLocation {
        match (&self.store_file, &self.store_dir) {
            (Some(file), _) => StoreLocation::single_file(file),
            (None, Some(dir)) => StoreLocation::per_table(dir),
            (None, None) => StoreLocation::per_table(DEFAULT_STORE_DIRECTORY),
        }
    }
}

/// Policy names accepted by --on-conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum ConflictChoice {
    /// Insert the rows into the existing table
    Append,
    /// Replace the existing table
    Overwrite,
    /// Keep the existing table and create --new-name instead
    CreateNew,
}

/// Cli arguments of the load command
#[derive(Debug, clap::Args)]
pub(crate) struct LoadArgs {
    /// Delimited file to load
    pub(crate) csv: PathBuf,
    /// Target table; defaults to the file stem of the CSV
    pub(crate) table: Option<String>,
    /// What to do when the table exists; prompts when omitted
    #[arg(long = "on-conflict", value_enum)]
    on_conflict: Option<ConflictChoice>,
    /// Table created by --on-conflict create-new
    #[arg(long = "new-name")]
    new_name: Option<String>,
    /// Column given the primary key constraint: "none", "first" or a column name
    #[arg(long = "key-column", default_value = "none")]
    key_column: KeyColumn,
    /// Field delimiter
    #[arg(short, long, default_value_t = ',')]
    delimiter: char,
    /// The first line holds data rather than column names
    #[arg(long = "no-header")]
    no_header: bool,
    /// Rows per INSERT statement
    #[arg(long = "chunk-rows", default_value_t = 500)]
    chunk_rows: usize,
}

impl LoadArgs {
    pub(crate) fn loader_config(&self) -> Result<LoaderConfig, TablesmithError> {
        let delimiter = u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                TablesmithError::Validation(format!(
                    "Delimiter must be a single ASCII character, got {:?}",
                    self.delimiter
                ))
            })?;

        Ok(LoaderConfig::builder()
            .has_header(!self.no_header)
            .delimiter(delimiter)
            .insert_chunk_rows(self.chunk_rows)
            .key_column(self.key_column.clone())
            .build())
    }

    /// The policy given on the command line, if any.
    pub(crate) fn policy(&self) -> Result<Option<ConflictPolicy>, TablesmithError> {
        let policy = match self.on_conflict {
            None => return Ok(None),
            Some(ConflictChoice::Append) => ConflictPolicy::Append,
            Some(ConflictChoice::Overwrite) => ConflictPolicy::Overwrite,
            Some(ConflictChoice::CreateNew) => {
                ConflictPolicy::parse("create-new", self.new_name.as_deref())?
            }
        };

        Ok(Some(policy))
    }

    /// The table given on the command line, or else the file stem of the source.
    pub(crate) fn table_name(&self, source: &TabularSource) -> Result<String, TablesmithError> {
        self.table
            .clone()
            .or_else(|| source.name_hint().map(str::to_string))
            .ok_or_else(|| {
                TablesmithError::Validation(format!(
                    "No table name given and none can be derived from {}",
                    self.csv.display()
                ))
            })
    }
}

/// Cli arguments of the ask command
#[derive(Debug, clap::Args)]
pub(crate) struct AskArgs {
    /// Question for the completion model
    #[arg(required = true, num_args = 1..)]
    pub(crate) question: Vec<String>,
    /// API key of the completion service
    #[arg(long = "api-key", env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    /// Completion model
    #[arg(long, env = "TABLESMITH_MODEL", default_value = DEFAULT_MODEL)]
    model: String,
    /// Base URL of an OpenAI-compatible API
    #[arg(long, env = "TABLESMITH_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,
    /// Request timeout in seconds
    #[arg(long = "timeout", default_value_t = 60)]
    timeout_secs: u64,
}

impl AskArgs {
    pub(crate) fn completion_config(&self) -> CompletionConfig {
        CompletionConfig::builder()
            .endpoint(&self.endpoint)
            .model(&self.model)
            .api_key(self.api_key.clone().unwrap_or_default())
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
    }

    pub(crate) fn prompt(&self) -> String {
        self.question.join(" ")
    }
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Load a delimited file into a table and print the result
    Load(LoadArgs),
    /// Print every row of a table
    Show {
        /// Table to print
        table: String,
    },
    /// List the stored tables
    Tables,
    /// Ask the completion model a question about your data
    Ask(AskArgs),
}

/// Load CSV files into SQLite tables
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub(crate) struct CliApp {
    /// Arguments related to logging
    #[command(flatten)]
    pub(crate) logging: LoggingArgs,
    /// Arguments related to the store
    #[command(flatten)]
    pub(crate) store: StoreArgs,
    /// Operation to run
    #[command(subcommand)]
    pub(crate) command: Command,
}
