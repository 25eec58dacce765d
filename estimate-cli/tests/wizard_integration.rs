//! End-to-end runs of the wizard: answers files from `tests/fixtures`,
//! seeded SQLite cost tables, lead recording and recomputation.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use estimate_cli::answers::load_answers;
use estimate_cli::app::{build_registry, run_wizard, select_table};
use estimate_cli::config::EstimatorConfig;
use estimate_core::db::{DbConfig, load_cost_table_set};
use estimate_core::schema::StepRegistry;
use estimate_core::session::{LeadError, SubmittedEstimate};
use estimate_core::summary::{EstimateSummary, SummaryFormat};
use estimate_core::{AccessError, AuthContext, CostCategory, EstimateRepository};
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn mid_2025() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date")
}

async fn seeded_repo() -> Box<dyn EstimateRepository> {
    build_registry()
        .open(&DbConfig::default())
        .await
        .expect("seeded in-memory repository")
}

async fn price_fixture(
    repo: &dyn EstimateRepository,
    name: &str,
) -> SubmittedEstimate {
    let answers = load_answers(&fixture(name)).expect("fixture answers load");
    let tables = load_cost_table_set(repo).await.expect("cost tables load");
    let table = select_table(&tables, None, mid_2025()).expect("table in force");

    run_wizard(&StepRegistry::standard(), &answers, table).expect("estimate submitted")
}

#[tokio::test]
async fn renovation_fixture_is_priced_with_2025_table() {
    let repo = seeded_repo().await;

    let estimate = price_fixture(&*repo, "renovation.toml").await;
    let breakdown = &estimate.breakdown;

    assert_eq!(breakdown.cost_table_version, "2025-01");
    assert_eq!(breakdown.subtotal(CostCategory::Groundwork), dec!(0));
    assert_eq!(breakdown.subtotal(CostCategory::Walls), dec!(26500));
    // plaster 40 × 55, stone 20 × 180, remaining 20 at base 45
    assert_eq!(breakdown.subtotal(CostCategory::Facade), dec!(6700));
    // footprint 100 / 2 = 50 × 80
    assert_eq!(breakdown.subtotal(CostCategory::Roof), dec!(4000));
    assert_eq!(breakdown.subtotal(CostCategory::Flooring), dec!(6300));
    assert_eq!(breakdown.subtotal(CostCategory::Openings), dec!(5700));
    assert_eq!(breakdown.total, dec!(63000));
    assert!(!breakdown.has_warnings());
}

#[tokio::test]
async fn construction_fixture_includes_terrain_and_landscaping() {
    let repo = seeded_repo().await;

    let estimate = price_fixture(&*repo, "construction.json").await;
    let breakdown = &estimate.breakdown;

    assert_eq!(breakdown.subtotal(CostCategory::Groundwork), dec!(9750));
    assert_eq!(breakdown.subtotal(CostCategory::Flooring), dec!(4500));
    assert_eq!(breakdown.subtotal(CostCategory::Landscaping), dec!(8600));
    assert_eq!(breakdown.subtotal(CostCategory::Options), dec!(37500));
    assert_eq!(breakdown.total, dec!(171900));
    assert_eq!(estimate.answers.text("company_name"), Some("Hopper Developments"));
}

#[tokio::test]
async fn anonymous_lead_is_recorded_and_recomputes_identically() {
    let repo = seeded_repo().await;
    let estimate = price_fixture(&*repo, "renovation.toml").await;

    let new_lead = estimate
        .to_lead(&AuthContext::anonymous(), false, mid_2025())
        .expect("anonymous leads need no account");
    let lead = repo.create_lead(new_lead).await.expect("lead stored");
    let stored = repo.get_lead(lead.id).await.expect("lead read back");

    assert_eq!(stored.owner_id, None);
    assert_eq!(stored.contact.email, "grace@example.com");

    let tables = load_cost_table_set(&*repo).await.expect("cost tables load");
    let recomputed = SubmittedEstimate {
        answers: stored.answers,
        breakdown: stored.breakdown.clone(),
    }
    .recompute(&tables)
    .expect("recomputes");
    assert_eq!(recomputed, stored.breakdown);
}

#[tokio::test]
async fn saving_to_account_needs_a_signed_in_client() {
    let repo = seeded_repo().await;
    let estimate = price_fixture(&*repo, "construction.json").await;

    assert_eq!(
        estimate.to_lead(&AuthContext::anonymous(), true, mid_2025()),
        Err(LeadError::Access(AccessError::NotAuthenticated))
    );

    let new_lead = estimate
        .to_lead(&AuthContext::client("client-7"), true, mid_2025())
        .expect("client may save");
    repo.create_lead(new_lead).await.expect("lead stored");

    let owned = repo
        .list_leads(Some("client-7"))
        .await
        .expect("leads listed");
    assert_eq!(owned.len(), 1);
    assert_eq!(owned[0].breakdown.total, dec!(171900));
}

#[tokio::test]
async fn summary_uses_configured_currency() {
    let repo = seeded_repo().await;
    let config = EstimatorConfig::load(&fixture("estimator.toml")).expect("fixture config");
    let estimate = price_fixture(&*repo, "renovation.toml").await;

    let format = SummaryFormat::new(config.pricing.currency_symbol.clone());
    let contact = estimate.contact().expect("fixture has contact details");
    let text = EstimateSummary::new(&estimate.breakdown)
        .with_contact(&contact)
        .render_text(&format);

    assert!(text.contains("63,000 CHF"), "summary was:\n{text}");
}

#[test]
fn fixture_config_overrides_defaults() {
    let config = EstimatorConfig::load(&fixture("estimator.toml")).expect("fixture config");

    assert_eq!(config.db_config(), DbConfig::default());
    assert_eq!(config.pricing.cost_table_version.as_deref(), Some("2025-01"));
    assert_eq!(config.logging.level, "warn,estimate_core=debug");
    assert_eq!(config.logging.file, None);
}
