use chrono::NaiveDate;
use estimate_core::calculations::{CostTableError, CostTableSet, UnitCostTable};
use estimate_core::db::RepositoryRegistry;
use estimate_core::schema::StepRegistry;
use estimate_core::session::{EstimationSession, SessionError, SubmittedEstimate};
use estimate_core::{FormAnswers, ValidationError};
use estimate_db_sqlite::SqliteRepositoryFactory;
use thiserror::Error;
use tracing::{debug, warn};

/// Builds the registry of every storage backend compiled into the binary.
pub fn build_registry() -> RepositoryRegistry {
    RepositoryRegistry::new().with_backend(Box::new(SqliteRepositoryFactory))
}

/// The pinned version when one is configured, otherwise the table in force
/// on `today`.
pub fn select_table<'a>(
    tables: &'a CostTableSet,
    pinned: Option<&str>,
    today: NaiveDate,
) -> Result<&'a UnitCostTable, CostTableError> {
    match pinned {
        Some(version) => tables.get(version),
        None => tables.effective_on(today),
    }
}

#[derive(Debug, Error)]
pub enum WizardError {
    #[error("step '{step}': {}", join_errors(.errors))]
    Step {
        step: &'static str,
        errors: Vec<ValidationError>,
    },

    #[error(transparent)]
    Session(#[from] SessionError),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Walks a fresh session through every visible step, answering each from
/// `answers`, and submits it against `table`.
///
/// Answers are handed to the session one step at a time, so visibility is
/// decided exactly as it would be for a visitor filling in the form.
/// Answers for fields no step declares are ignored.
pub fn run_wizard(
    registry: &StepRegistry,
    answers: &FormAnswers,
    table: &UnitCostTable,
) -> Result<SubmittedEstimate, WizardError> {
    for (field, _) in answers.iter() {
        if !registry.steps().iter().any(|s| s.field(field).is_some()) {
            warn!(field, "answer for unknown field ignored");
        }
    }

    let mut session = EstimationSession::new(registry).map_err(SessionError::from)?;

    loop {
        let step = session.current_step();
        for rule in &step.fields {
            if let Some(value) = answers.get(rule.name) {
                session.set_answer(rule.name, value.clone())?;
            }
        }

        if session.is_terminal() {
            return session.submit(table).map_err(|e| at_step(step.id, e));
        }

        let next = session.go_next().map_err(|e| at_step(step.id, e))?;
        debug!(step = next.id, "wizard reached step");
    }
}

fn at_step(
    step: &'static str,
    error: SessionError,
) -> WizardError {
    match error {
        SessionError::Invalid(errors) => WizardError::Step { step, errors },
        other => WizardError::Session(other),
    }
}
