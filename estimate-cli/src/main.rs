use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info, warn};

use estimate_cli::answers::load_answers;
use estimate_cli::config::EstimatorConfig;
use estimate_cli::{app, logging};
use estimate_core::calculations::CostTableSet;
use estimate_core::db::load_cost_table_set;
use estimate_core::export::{ExportRequest, LogExporter, hand_off};
use estimate_core::schema::StepRegistry;
use estimate_core::session::SubmittedEstimate;
use estimate_core::summary::{EstimateSummary, SummaryFormat};
use estimate_core::{AuthContext, EstimateRepository, Role};
use estimate_data::CostTableLoader;

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Construction cost estimator.
///
/// Drives the estimation wizard from an answers file, prices it against the
/// unit-cost table in force and records the result as a lead.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Configuration file. Missing files fall back to built-in defaults.
    #[arg(long, global = true, default_value = "estimator.toml")]
    config: PathBuf,

    /// Database backend, overriding the config file.
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Database connection string, overriding the config file.
    /// For SQLite: `sqlite:estimates.db?mode=rwc`, a bare path, or `:memory:`.
    #[arg(long, global = true)]
    db: Option<String>,

    /// Log filter (`info`, `debug`, `warn,estimate_core=debug`, ...).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Also append log records to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Signed-in user id.
    #[arg(long, global = true)]
    user: Option<String>,

    #[arg(long, global = true, value_enum, default_value_t = CliRole::Anonymous)]
    role: CliRole,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CliRole {
    Anonymous,
    Client,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ExportTarget {
    /// Write the export to the log.
    Log,
    /// Skip the handoff.
    Off,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Price an answers file and record it as a lead.
    Estimate {
        /// Answers as a `.toml` or `.json` table of field = value.
        #[arg(long)]
        answers: PathBuf,

        /// Price against cost tables from this CSV instead of the database.
        #[arg(long)]
        costs: Option<PathBuf>,

        /// Cost-table version to use, overriding the config file.
        #[arg(long)]
        table: Option<String>,

        /// Date used to pick the table in force (default: today).
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Print the summary as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// File the lead under the signed-in user's account.
        #[arg(long, default_value_t = false)]
        save: bool,

        #[arg(long, value_enum, default_value_t = ExportTarget::Log)]
        export: ExportTarget,
    },

    /// List the wizard steps, marking those visible for an answers file.
    Steps {
        #[arg(long)]
        answers: Option<PathBuf>,
    },

    /// List stored cost tables and the wizard options each one lacks.
    Tables,

    /// Show recorded leads (admin only).
    Leads {
        /// Show one lead in full.
        #[arg(long)]
        id: Option<i64>,

        /// Only leads filed under this account.
        #[arg(long)]
        owner: Option<String>,
    },

    /// Price a recorded lead again with the table it was submitted under.
    Recompute {
        #[arg(long)]
        id: i64,
    },
}

impl Cli {
    fn auth(&self) -> AuthContext {
        let role = match self.role {
            CliRole::Anonymous => Role::Anonymous,
            CliRole::Client => Role::Client,
            CliRole::Admin => Role::Admin,
        };
        AuthContext {
            user_id: self.user.clone(),
            role,
        }
    }
}

// ─── entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init_logging(cli.log_level.as_deref().unwrap_or("info"))?;

    let mut config = EstimatorConfig::load(&cli.config)
        .with_context(|| format!("Failed to load config: {}", cli.config.display()))?;
    if cli.log_level.is_none() {
        logging::set_log_level(&config.logging.level)?;
    }
    if let Some(log_file) = cli.log_file.as_ref().or(config.logging.file.as_ref()) {
        logging::enable_file_logging(log_file)?;
    }
    if let Some(backend) = &cli.backend {
        config.database.backend = backend.clone();
    }
    if let Some(db) = &cli.db {
        config.database.connection = db.clone();
    }

    let db_config = config.db_config();
    debug!(backend = %db_config.backend, "connecting");
    let registry = app::build_registry();
    let repo = registry
        .open(&db_config)
        .await
        .with_context(|| format!("Failed to open {} database", db_config.backend))?;

    let auth = cli.auth();
    let format = SummaryFormat::new(config.pricing.currency_symbol.clone());

    match cli.command {
        Command::Estimate {
            answers,
            costs,
            table,
            date,
            json,
            save,
            export,
        } => {
            let pinned = table.or(config.pricing.cost_table_version);
            let options = EstimateOptions {
                answers,
                costs,
                pinned,
                date: date.unwrap_or_else(|| Local::now().date_naive()),
                json,
                save,
                export,
            };
            run_estimate(&*repo, &auth, &format, options).await
        }
        Command::Steps { answers } => show_steps(answers.as_deref()),
        Command::Tables => show_tables(&*repo).await,
        Command::Leads { id, owner } => show_leads(&*repo, &auth, &format, id, owner).await,
        Command::Recompute { id } => recompute_lead(&*repo, &auth, &format, id).await,
    }
}

// ─── commands ────────────────────────────────────────────────────────────────

struct EstimateOptions {
    answers: PathBuf,
    costs: Option<PathBuf>,
    pinned: Option<String>,
    date: NaiveDate,
    json: bool,
    save: bool,
    export: ExportTarget,
}

async fn cost_tables(
    repo: &dyn EstimateRepository,
    csv: Option<&Path>,
) -> Result<CostTableSet> {
    match csv {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open: {}", path.display()))?;
            let records = CostTableLoader::parse(file)
                .with_context(|| format!("Failed to parse CSV: {}", path.display()))?;
            Ok(CostTableLoader::into_table_set(&records)
                .with_context(|| format!("Invalid cost tables in {}", path.display()))?)
        }
        None => Ok(load_cost_table_set(repo)
            .await
            .context("Failed to read cost tables")?),
    }
}

async fn run_estimate(
    repo: &dyn EstimateRepository,
    auth: &AuthContext,
    format: &SummaryFormat,
    options: EstimateOptions,
) -> Result<()> {
    let answers = load_answers(&options.answers)
        .with_context(|| format!("Failed to read answers: {}", options.answers.display()))?;

    let tables = cost_tables(repo, options.costs.as_deref()).await?;
    let table = app::select_table(&tables, options.pinned.as_deref(), options.date)
        .context("No usable cost table")?;
    info!(version = table.version(), "pricing with cost table");

    let registry = StepRegistry::standard();
    let unmapped = registry.unmapped_selectors(table).len();
    if unmapped > 0 {
        warn!(unmapped, version = table.version(), "some options will be priced at zero");
    }
    let estimate =
        app::run_wizard(&registry, &answers, table).context("The answers were not accepted")?;

    let new_lead = estimate
        .to_lead(auth, options.save, options.date)
        .context("Cannot record the estimate")?;
    let contact = new_lead.contact.clone();
    let lead = repo
        .create_lead(new_lead)
        .await
        .context("Failed to record the lead")?;
    info!(lead = lead.id, owner = ?lead.owner_id, "lead recorded");

    let summary = EstimateSummary::new(&estimate.breakdown).with_contact(&contact);
    let summary_text = summary.render_text(format);
    if options.json {
        println!("{}", summary.to_json().context("Failed to serialise summary")?);
    } else {
        print!("{summary_text}");
    }

    if options.export == ExportTarget::Log {
        let request = ExportRequest {
            contact: contact.clone(),
            breakdown: estimate.breakdown.clone(),
            summary_text,
        };
        if !hand_off(&LogExporter, &request).await {
            warn!(lead = lead.id, "estimate kept but not exported");
        }
    }

    Ok(())
}

fn show_steps(answers: Option<&Path>) -> Result<()> {
    let answers = match answers {
        Some(path) => load_answers(path)
            .with_context(|| format!("Failed to read answers: {}", path.display()))?,
        None => Default::default(),
    };

    let registry = StepRegistry::standard();
    for step in registry.steps() {
        let marker = if step.is_visible(&answers) { "*" } else { " " };
        println!("{marker} {:>2}. {:<22} {}", step.ordinal, step.id, step.title);
        for rule in &step.fields {
            let required = if rule.required { "required" } else { "optional" };
            println!("        {:<24} {required}", rule.name);
        }
    }
    Ok(())
}

async fn show_tables(repo: &dyn EstimateRepository) -> Result<()> {
    let registry = StepRegistry::standard();
    let versions = repo
        .list_cost_table_versions()
        .await
        .context("Failed to list cost tables")?;

    if versions.is_empty() {
        println!("No cost tables stored.");
        return Ok(());
    }

    for header in versions {
        let table = repo
            .get_cost_table(&header.version)
            .await
            .with_context(|| format!("Failed to read cost table {}", header.version))?;
        let missing = registry.unmapped_selectors(&table);
        println!(
            "{} (effective {}): {} unit costs",
            header.version,
            header.effective_from,
            table.len()
        );
        for (category, selector) in missing {
            println!("    missing: {category}/{selector}");
        }
    }
    Ok(())
}

fn require_admin(auth: &AuthContext) -> Result<()> {
    if auth.role != Role::Admin || !auth.is_authenticated() {
        bail!("this command requires --role admin and --user");
    }
    Ok(())
}

async fn show_leads(
    repo: &dyn EstimateRepository,
    auth: &AuthContext,
    format: &SummaryFormat,
    id: Option<i64>,
    owner: Option<String>,
) -> Result<()> {
    require_admin(auth)?;

    if let Some(id) = id {
        let lead = repo
            .get_lead(id)
            .await
            .with_context(|| format!("Failed to read lead {id}"))?;
        println!(
            "Lead {} submitted {} (owner: {})",
            lead.id,
            lead.submitted_on,
            lead.owner_id.as_deref().unwrap_or("-")
        );
        let summary = EstimateSummary::new(&lead.breakdown).with_contact(&lead.contact);
        print!("{}", summary.render_text(format));
        return Ok(());
    }

    let leads = repo
        .list_leads(owner.as_deref())
        .await
        .context("Failed to list leads")?;
    for lead in &leads {
        println!(
            "{:>5}  {}  {:<24} {:<32} {:>8}  {:>16}",
            lead.id,
            lead.submitted_on,
            lead.contact.name,
            lead.contact.email,
            lead.breakdown.cost_table_version,
            format.whole_amount(lead.breakdown.total)
        );
    }
    println!("{} lead(s)", leads.len());
    Ok(())
}

async fn recompute_lead(
    repo: &dyn EstimateRepository,
    auth: &AuthContext,
    format: &SummaryFormat,
    id: i64,
) -> Result<()> {
    require_admin(auth)?;

    let lead = repo
        .get_lead(id)
        .await
        .with_context(|| format!("Failed to read lead {id}"))?;
    let tables = cost_tables(repo, None).await?;

    let estimate = SubmittedEstimate {
        answers: lead.answers,
        breakdown: lead.breakdown,
    };
    let recomputed = estimate
        .recompute(&tables)
        .with_context(|| format!("Failed to recompute lead {id}"))?;

    println!(
        "Lead {id}: stored {}, recomputed {} with cost table {}",
        format.amount(estimate.breakdown.total),
        format.amount(recomputed.total),
        recomputed.cost_table_version
    );
    if recomputed != estimate.breakdown {
        warn!(lead = id, "recomputed breakdown differs from the stored one");
        bail!("lead {id} no longer reproduces; its cost table has changed");
    }
    println!("Identical.");
    Ok(())
}
