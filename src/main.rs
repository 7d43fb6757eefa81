/*!
  Binary for the CLI of tablesmith
*/

mod cli;

use std::io::{self, BufRead, Write};

use clap::Parser;
use cli::{AskArgs, CliApp, Command, LoadArgs};
use colored::Colorize;
use tablesmith::{
    CompletionClient, ConflictPolicy, StoreLocation, TableInspector, TableMaterializer,
    TablesmithError, TabularSource,
};

/// Reads one trimmed line from stdin after printing `prompt`.
fn read_answer(prompt: &str) -> Result<String, TablesmithError> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;

    Ok(line.trim().to_string())
}

/// Asks the operator how to resolve a name collision.
fn prompt_policy(table: &str) -> Result<ConflictPolicy, TablesmithError> {
    println!("Table {} already exists. What would you like to do?", table.bold());
    println!("  1. Append the rows to the existing table");
    println!("  2. Overwrite the existing table");
    println!("  3. Create a new table");

    let choice = read_answer("Enter your choice (1, 2 or 3): ")?;

    let new_name = if ConflictPolicy::needs_new_name(&choice) {
        Some(read_answer("Enter the new table name: ")?)
    } else {
        None
    };

    ConflictPolicy::parse(&choice, new_name.as_deref())
}

async fn load(location: StoreLocation, args: LoadArgs) -> Result<(), TablesmithError> {
    let config = args.loader_config()?;
    let source = TabularSource::from_csv(&args.csv, &config)?;

    log::info!(
        "Read {} rows x {} columns from {}",
        source.row_count(),
        source.column_count(),
        args.csv.display()
    );

    let table = args.table_name(&source)?;
    let materializer = TableMaterializer::new(location.clone(), config);

    let policy = match args.policy()? {
        Some(policy) => policy,
        None if materializer.table_exists(&table).await? => prompt_policy(&table)?,
        // not consulted for a fresh table
        None => ConflictPolicy::Append,
    };

    let materialized = materializer
        .materialize(&source, &table, policy)
        .await?;

    println!(
        "{} Table {} {} ({} rows written, {} rows total)",
        "ok:".green().bold(),
        materialized.table.name.bold(),
        materialized.resolution,
        materialized.rows_written,
        materialized.table.row_count
    );

    show(location, &materialized.table.name).await
}

async fn show(location: StoreLocation, table: &str) -> Result<(), TablesmithError> {
    let inspection = TableInspector::new(location).inspect(table).await?;

    println!("{}", inspection.render()?);

    Ok(())
}

async fn tables(location: StoreLocation) -> Result<(), TablesmithError> {
    let names = TableInspector::new(location.clone()).tables().await?;

    if names.is_empty() {
        println!("No tables in {}", location.layout);
    }

    for name in names {
        println!("{}", name);
    }

    Ok(())
}

async fn ask(args: AskArgs) -> Result<(), TablesmithError> {
    let client = CompletionClient::new(args.completion_config())?;

    let answer = client.ask(&args.prompt()).await?;

    println!("{}", answer);

    Ok(())
}

async fn run(cli: CliApp) -> Result<(), TablesmithError> {
    let location = cli.store.location();

    log::debug!("Store: {}", location.layout);

    match cli.command {
        Command::Load(args) => load(location, args).await,
        Command::Show { table } => show(location, &table).await,
        Command::Tables => tables(location).await,
        Command::Ask(args) => ask(args).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = CliApp::parse();

    cli.logging.initialize_logging();
    log::info!("Version: {}", clap::crate_version!());

    if let Err(err) = run(cli).await {
        eprintln!("{} {err}", "error:".red().bold());
        std::process::exit(1)
    }
}
