use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use estimate_data::CostTableLoader;
use estimate_db_sqlite::SqliteRepository;

/// Load unit-cost tables from a CSV file into the database.
///
/// The CSV file must have the columns
/// `version,effective_from,category,selector,unit,unit_cost`.
/// Every version found in the file replaces the stored version with the
/// same tag.
#[derive(Parser, Debug)]
#[command(name = "estimate-data-loader")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the CSV file containing unit costs
    #[arg(short, long)]
    file: PathBuf,

    /// SQLite database URL (e.g., sqlite:estimates.db?mode=rwc to create if missing)
    #[arg(short, long, default_value = "sqlite:estimates.db?mode=rwc")]
    database: String,

    /// Run database migrations before loading data
    #[arg(short, long, default_value_t = false)]
    migrate: bool,

    /// Run seed files from the specified directory after migrations
    #[arg(short, long)]
    seeds: Option<PathBuf>,

    /// Validate the file without writing anything
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    println!("Reading unit costs from: {}", args.file.display());

    let file = File::open(&args.file)
        .with_context(|| format!("Failed to open: {}", args.file.display()))?;

    let records = CostTableLoader::parse(file)
        .with_context(|| format!("Failed to parse CSV: {}", args.file.display()))?;

    println!("Parsed {} records from CSV", records.len());

    if args.dry_run {
        let tables = CostTableLoader::tables(&records).context("Invalid cost tables")?;
        for table in &tables {
            println!(
                "  {} (effective {}): {} unit costs",
                table.version(),
                table.effective_from(),
                table.len()
            );
        }
        println!("Dry run: nothing written.");
        return Ok(());
    }

    let repo = SqliteRepository::new(&args.database)
        .await
        .with_context(|| format!("Failed to connect to database: {}", args.database))?;

    if args.migrate {
        println!("Running migrations...");
        repo.run_migrations()
            .await
            .context("Failed to run migrations")?;
        println!("Migrations complete.");
    }

    if let Some(seeds_dir) = &args.seeds {
        println!("Running seeds from: {}", seeds_dir.display());
        repo.run_seeds(seeds_dir)
            .await
            .with_context(|| format!("Failed to run seeds from: {}", seeds_dir.display()))?;
        println!("Seeds complete.");
    }

    let inserted = CostTableLoader::load(&repo, &records)
        .await
        .context("Failed to load unit costs into database")?;

    let versions = CostTableLoader::versions(&records);
    println!(
        "Successfully loaded {} unit costs across {} version(s).",
        inserted,
        versions.len()
    );

    Ok(())
}
