use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use estimate_core::calculations::UnitCostTable;
use estimate_core::{
    ContactDetails, CostCategory, CostTableVersion, EstimateRepository, Lead, NewLead,
    PricingUnit, RepositoryError, UnitCostEntry,
};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use tracing::debug;

use crate::decimal::{decimal_to_text, get_decimal};

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Opens `database_url`, which is either a sqlx URL
    /// (`sqlite:estimates.db?mode=rwc`, `sqlite::memory:`), `:memory:`, or a
    /// bare file path that is created if missing.
    pub async fn new(database_url: &str) -> Result<Self> {
        let in_memory = database_url.contains(":memory:");
        let options = if database_url.starts_with("sqlite:") || in_memory {
            SqliteConnectOptions::from_str(database_url)
                .with_context(|| format!("Invalid database URL: {database_url}"))?
        } else {
            SqliteConnectOptions::new()
                .filename(database_url)
                .create_if_missing(true)
        };

        // Every connection to an in-memory database sees its own copy.
        let max_connections = if in_memory { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to database: {database_url}"))?;

        Ok(Self { pool })
    }

    pub async fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    /// Executes every `.sql` file in `seeds_dir`, in file-name order.
    pub async fn run_seeds(
        &self,
        seeds_dir: &Path,
    ) -> Result<()> {
        let mut entries: Vec<_> = std::fs::read_dir(seeds_dir)
            .with_context(|| format!("Failed to read seeds directory '{}'", seeds_dir.display()))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "sql"))
            .collect();

        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            let sql = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read seed file '{}'", path.display()))?;

            sqlx::raw_sql(&sql)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Failed to execute seed file '{}'", path.display()))?;
            debug!(file = %path.display(), "seed applied");
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn db_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Database(e.to_string())
}

fn get<'r, T>(
    row: &'r SqliteRow,
    column: &str,
) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(column)
        .map_err(|e| RepositoryError::Database(format!("Failed to get {column}: {e}")))
}

fn row_to_unit_cost(row: &SqliteRow) -> Result<UnitCostEntry, RepositoryError> {
    let category: String = get(row, "category")?;
    let unit: String = get(row, "unit")?;

    Ok(UnitCostEntry {
        category: CostCategory::parse(&category).ok_or_else(|| {
            RepositoryError::InvalidData(format!("unknown cost category '{category}'"))
        })?,
        selector: get(row, "selector")?,
        unit: PricingUnit::parse(&unit)
            .ok_or_else(|| RepositoryError::InvalidData(format!("unknown unit '{unit}'")))?,
        unit_cost: get_decimal(row, "unit_cost")?,
    })
}

fn row_to_lead(row: &SqliteRow) -> Result<Lead, RepositoryError> {
    let answers: String = get(row, "answers")?;
    let breakdown: String = get(row, "breakdown")?;

    Ok(Lead {
        id: get(row, "id")?,
        owner_id: get(row, "owner_id")?,
        contact: ContactDetails {
            name: get(row, "contact_name")?,
            email: get(row, "contact_email")?,
            phone: get(row, "contact_phone")?,
        },
        answers: serde_json::from_str(&answers)
            .map_err(|e| RepositoryError::InvalidData(format!("answers: {e}")))?,
        breakdown: serde_json::from_str(&breakdown)
            .map_err(|e| RepositoryError::InvalidData(format!("breakdown: {e}")))?,
        submitted_on: get::<NaiveDate>(row, "submitted_on")?,
        created_at: get::<DateTime<Utc>>(row, "created_at")?,
    })
}

const LEAD_COLUMNS: &str = "SELECT id, owner_id, contact_name, contact_email, contact_phone,
        answers, breakdown, submitted_on, created_at
 FROM lead";

#[async_trait]
impl EstimateRepository for SqliteRepository {
    async fn list_cost_table_versions(&self) -> Result<Vec<CostTableVersion>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT version, effective_from FROM cost_table ORDER BY effective_from, version",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter()
            .map(|row| {
                Ok(CostTableVersion {
                    version: get(row, "version")?,
                    effective_from: get(row, "effective_from")?,
                })
            })
            .collect()
    }

    async fn get_cost_table(
        &self,
        version: &str,
    ) -> Result<UnitCostTable, RepositoryError> {
        let header = sqlx::query("SELECT effective_from FROM cost_table WHERE version = ?")
            .bind(version)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or(RepositoryError::NotFound)?;
        let effective_from: NaiveDate = get(&header, "effective_from")?;

        let rows = sqlx::query(
            "SELECT category, selector, unit, unit_cost FROM unit_cost
             WHERE version = ? ORDER BY category, selector",
        )
        .bind(version)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let entries = rows
            .iter()
            .map(row_to_unit_cost)
            .collect::<Result<Vec<_>, _>>()?;

        UnitCostTable::new(version, effective_from, entries)
            .map_err(|e| RepositoryError::InvalidData(e.to_string()))
    }

    async fn insert_cost_table(
        &self,
        header: &CostTableVersion,
    ) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO cost_table (version, effective_from) VALUES (?, ?)")
            .bind(&header.version)
            .bind(header.effective_from)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(())
    }

    async fn insert_unit_cost(
        &self,
        version: &str,
        entry: &UnitCostEntry,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO unit_cost (version, category, selector, unit, unit_cost)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(version)
        .bind(entry.category.as_str())
        .bind(&entry.selector)
        .bind(entry.unit.as_str())
        .bind(decimal_to_text(entry.unit_cost))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn delete_cost_table(
        &self,
        version: &str,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query("DELETE FROM unit_cost WHERE version = ?")
            .bind(version)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        sqlx::query("DELETE FROM cost_table WHERE version = ?")
            .bind(version)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn replace_cost_table(
        &self,
        table: &UnitCostTable,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query("DELETE FROM unit_cost WHERE version = ?")
            .bind(table.version())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        sqlx::query("DELETE FROM cost_table WHERE version = ?")
            .bind(table.version())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        sqlx::query("INSERT INTO cost_table (version, effective_from) VALUES (?, ?)")
            .bind(table.version())
            .bind(table.effective_from())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        for entry in table.entries() {
            sqlx::query(
                "INSERT INTO unit_cost (version, category, selector, unit, unit_cost)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(table.version())
            .bind(entry.category.as_str())
            .bind(&entry.selector)
            .bind(entry.unit.as_str())
            .bind(decimal_to_text(entry.unit_cost))
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        debug!(version = table.version(), entries = table.len(), "cost table replaced");
        Ok(())
    }

    async fn create_lead(
        &self,
        lead: NewLead,
    ) -> Result<Lead, RepositoryError> {
        let answers = serde_json::to_string(&lead.answers)
            .map_err(|e| RepositoryError::InvalidData(format!("answers: {e}")))?;
        let breakdown = serde_json::to_string(&lead.breakdown)
            .map_err(|e| RepositoryError::InvalidData(format!("breakdown: {e}")))?;

        let result = sqlx::query(
            "INSERT INTO lead (
                owner_id, contact_name, contact_email, contact_phone,
                answers, breakdown, cost_table_version, total,
                submitted_on, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&lead.owner_id)
        .bind(&lead.contact.name)
        .bind(&lead.contact.email)
        .bind(&lead.contact.phone)
        .bind(answers)
        .bind(breakdown)
        .bind(&lead.breakdown.cost_table_version)
        .bind(decimal_to_text(lead.breakdown.total))
        .bind(lead.submitted_on)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        self.get_lead(result.last_insert_rowid()).await
    }

    async fn get_lead(
        &self,
        id: i64,
    ) -> Result<Lead, RepositoryError> {
        let row = sqlx::query(&format!("{LEAD_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or(RepositoryError::NotFound)?;

        row_to_lead(&row)
    }

    async fn list_leads(
        &self,
        owner_id: Option<&str>,
    ) -> Result<Vec<Lead>, RepositoryError> {
        let rows = match owner_id {
            Some(owner) => {
                sqlx::query(&format!(
                    "{LEAD_COLUMNS} WHERE owner_id = ? ORDER BY created_at DESC, id DESC"
                ))
                .bind(owner)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(&format!("{LEAD_COLUMNS} ORDER BY created_at DESC, id DESC"))
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(db_err)?;

        rows.iter().map(row_to_lead).collect()
    }
}

#[cfg(test)]
mod tests {
    use estimate_core::schema::StepRegistry;
    use estimate_core::{AnswerValue, CategorySubtotal, FormAnswers, PriceBreakdown};
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::*;

    async fn setup_test_db() -> SqliteRepository {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");

        let repo = SqliteRepository::new_with_pool(pool).await;
        repo.run_migrations()
            .await
            .expect("Failed to run migrations");
        repo
    }

    fn date(
        y: i32,
        m: u32,
        d: u32,
    ) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn unit_cost(
        category: CostCategory,
        selector: &str,
        unit_cost: Decimal,
    ) -> UnitCostEntry {
        UnitCostEntry {
            category,
            selector: selector.to_string(),
            unit: PricingUnit::SquareMetre,
            unit_cost,
        }
    }

    async fn insert_table(
        repo: &SqliteRepository,
        version: &str,
        effective_from: NaiveDate,
        entries: &[UnitCostEntry],
    ) {
        repo.insert_cost_table(&CostTableVersion {
            version: version.to_string(),
            effective_from,
        })
        .await
        .expect("Should insert cost table");
        for entry in entries {
            repo.insert_unit_cost(version, entry)
                .await
                .expect("Should insert unit cost");
        }
    }

    fn new_lead(owner_id: Option<&str>) -> NewLead {
        let mut answers = FormAnswers::new();
        answers.set("floor_area", AnswerValue::number(dec!(120)));
        answers.set("options", AnswerValue::selection(["pool", "alarm"]));
        answers.set("contact_name", AnswerValue::text("Ada Lovelace"));

        NewLead {
            owner_id: owner_id.map(str::to_string),
            contact: ContactDetails {
                name: "Ada Lovelace".to_string(),
                email: "ada@example.com".to_string(),
                phone: Some("+44 20 7946 0000".to_string()),
            },
            answers,
            breakdown: PriceBreakdown {
                cost_table_version: "2025-01".to_string(),
                line_items: vec![],
                subtotals: vec![CategorySubtotal {
                    category: CostCategory::Options,
                    amount: dec!(29800.125),
                }],
                total: dec!(29800.125),
                warnings: vec![],
            },
            submitted_on: date(2025, 3, 14),
        }
    }

    #[tokio::test]
    async fn test_cost_table_round_trip() {
        let repo = setup_test_db().await;
        insert_table(
            &repo,
            "2025-01",
            date(2025, 1, 1),
            &[
                unit_cost(CostCategory::Walls, "brick", dec!(310.00)),
                unit_cost(CostCategory::Flooring, "standard", dec!(45.125)),
            ],
        )
        .await;

        let table = repo.get_cost_table("2025-01").await.expect("Should load table");

        assert_eq!(table.version(), "2025-01");
        assert_eq!(table.effective_from(), date(2025, 1, 1));
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.unit_cost(CostCategory::Flooring, "standard"),
            Some(dec!(45.125))
        );
    }

    #[tokio::test]
    async fn test_get_cost_table_not_found() {
        let repo = setup_test_db().await;

        assert_eq!(
            repo.get_cost_table("1999-01").await,
            Err(RepositoryError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_list_versions_by_effective_date() {
        let repo = setup_test_db().await;
        insert_table(&repo, "2026-01", date(2026, 1, 1), &[]).await;
        insert_table(&repo, "2025-01", date(2025, 1, 1), &[]).await;

        let versions = repo
            .list_cost_table_versions()
            .await
            .expect("Should list versions");

        let tags: Vec<_> = versions.iter().map(|v| v.version.as_str()).collect();
        assert_eq!(tags, vec!["2025-01", "2026-01"]);
    }

    #[tokio::test]
    async fn test_duplicate_unit_cost_is_rejected() {
        let repo = setup_test_db().await;
        let brick = unit_cost(CostCategory::Walls, "brick", dec!(310));
        insert_table(&repo, "2025-01", date(2025, 1, 1), &[brick.clone()]).await;

        let result = repo.insert_unit_cost("2025-01", &brick).await;

        assert!(matches!(result, Err(RepositoryError::Database(_))));
    }

    #[tokio::test]
    async fn test_delete_cost_table() {
        let repo = setup_test_db().await;
        insert_table(
            &repo,
            "2025-01",
            date(2025, 1, 1),
            &[unit_cost(CostCategory::Walls, "brick", dec!(310))],
        )
        .await;

        repo.delete_cost_table("2025-01")
            .await
            .expect("Should delete");

        assert_eq!(
            repo.get_cost_table("2025-01").await,
            Err(RepositoryError::NotFound)
        );
        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM unit_cost")
            .fetch_one(repo.pool())
            .await
            .expect("Should count");
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn test_delete_missing_cost_table_is_ok() {
        let repo = setup_test_db().await;

        assert_eq!(repo.delete_cost_table("nope").await, Ok(()));
    }

    #[tokio::test]
    async fn test_replace_cost_table_swaps_entries() {
        let repo = setup_test_db().await;
        insert_table(
            &repo,
            "2025-01",
            date(2025, 1, 1),
            &[
                unit_cost(CostCategory::Walls, "brick", dec!(310)),
                unit_cost(CostCategory::Roof, "tile", dec!(95)),
            ],
        )
        .await;
        let revised = UnitCostTable::new(
            "2025-01",
            date(2025, 2, 1),
            vec![unit_cost(CostCategory::Walls, "brick", dec!(325))],
        )
        .expect("valid table");

        repo.replace_cost_table(&revised)
            .await
            .expect("Should replace");

        assert_eq!(repo.get_cost_table("2025-01").await, Ok(revised));
    }

    #[tokio::test]
    async fn test_failed_replace_keeps_previous_table() {
        let repo = setup_test_db().await;
        insert_table(
            &repo,
            "2025-01",
            date(2025, 1, 1),
            &[unit_cost(CostCategory::Walls, "brick", dec!(310))],
        )
        .await;
        let before = repo.get_cost_table("2025-01").await.expect("Should load");
        sqlx::query(
            "CREATE TRIGGER reject_roof BEFORE INSERT ON unit_cost
             WHEN NEW.category = 'roof'
             BEGIN SELECT RAISE(ABORT, 'roof rejected'); END",
        )
        .execute(repo.pool())
        .await
        .expect("Should create trigger");
        let revised = UnitCostTable::new(
            "2025-01",
            date(2025, 1, 1),
            vec![
                unit_cost(CostCategory::Walls, "brick", dec!(325)),
                unit_cost(CostCategory::Roof, "tile", dec!(95)),
            ],
        )
        .expect("valid table");

        let result = repo.replace_cost_table(&revised).await;

        assert!(matches!(result, Err(RepositoryError::Database(_))));
        assert_eq!(repo.get_cost_table("2025-01").await, Ok(before));
    }

    #[tokio::test]
    async fn test_create_and_get_lead() {
        let repo = setup_test_db().await;
        let lead = new_lead(Some("client-42"));

        let created = repo
            .create_lead(lead.clone())
            .await
            .expect("Should create lead");

        assert!(created.id > 0);
        assert_eq!(created.owner_id.as_deref(), Some("client-42"));
        assert_eq!(created.contact, lead.contact);
        assert_eq!(created.answers, lead.answers);
        assert_eq!(created.breakdown, lead.breakdown);
        assert_eq!(created.submitted_on, date(2025, 3, 14));

        let fetched = repo.get_lead(created.id).await.expect("Should get lead");
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_stored_total_keeps_full_precision() {
        let repo = setup_test_db().await;
        let created = repo
            .create_lead(new_lead(None))
            .await
            .expect("Should create lead");

        let row = sqlx::query("SELECT total FROM lead WHERE id = ?")
            .bind(created.id)
            .fetch_one(repo.pool())
            .await
            .expect("Should fetch");

        assert_eq!(get_decimal(&row, "total"), Ok(dec!(29800.125)));
    }

    #[tokio::test]
    async fn test_get_lead_not_found() {
        let repo = setup_test_db().await;

        assert_eq!(repo.get_lead(999).await, Err(RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_list_leads_by_owner() {
        let repo = setup_test_db().await;
        repo.create_lead(new_lead(Some("client-42")))
            .await
            .expect("Should create");
        repo.create_lead(new_lead(None)).await.expect("Should create");
        repo.create_lead(new_lead(Some("client-7")))
            .await
            .expect("Should create");

        let all = repo.list_leads(None).await.expect("Should list");
        let owned = repo
            .list_leads(Some("client-42"))
            .await
            .expect("Should list");

        assert_eq!(all.len(), 3);
        assert_eq!(all[0].owner_id.as_deref(), Some("client-7"));
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].owner_id.as_deref(), Some("client-42"));
    }

    #[tokio::test]
    async fn test_run_seeds() {
        let repo = setup_test_db().await;

        repo.run_seeds(Path::new("./seeds"))
            .await
            .expect("Should run seeds successfully");

        let versions = repo
            .list_cost_table_versions()
            .await
            .expect("Should list versions");
        assert_eq!(versions.len(), 2);

        let table = repo
            .get_cost_table("2025-01")
            .await
            .expect("Should find 2025 table");
        assert_eq!(
            table.unit_cost(CostCategory::Walls, "brick"),
            Some(dec!(310))
        );
        assert_eq!(
            StepRegistry::standard().unmapped_selectors(&table),
            vec![]
        );
        assert!(table.contains(CostCategory::Openings, "door"));
    }

    #[tokio::test]
    async fn test_run_seeds_twice_is_harmless() {
        let repo = setup_test_db().await;

        repo.run_seeds(Path::new("./seeds")).await.expect("first run");
        repo.run_seeds(Path::new("./seeds")).await.expect("second run");

        let table = repo
            .get_cost_table("2026-01")
            .await
            .expect("Should find 2026 table");
        assert_eq!(table.len(), 39);
    }

    #[tokio::test]
    async fn test_run_seeds_nonexistent_directory() {
        let repo = setup_test_db().await;

        let result = repo.run_seeds(Path::new("./nonexistent")).await;

        let err = result.expect_err("Should fail for nonexistent directory");
        assert_eq!(
            err.to_string(),
            "Failed to read seeds directory './nonexistent'"
        );
    }

    #[tokio::test]
    async fn test_new_accepts_memory_url() {
        let repo = SqliteRepository::new(":memory:")
            .await
            .expect("Should open in-memory database");
        repo.run_migrations().await.expect("Should migrate");

        assert_eq!(
            repo.list_cost_table_versions().await,
            Ok(vec![])
        );
    }
}
