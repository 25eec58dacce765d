//! Form State Controller: one user's pass through the wizard.
//!
//! An [`EstimationSession`] owns the accumulated [`FormAnswers`] and the step
//! cursor. It is `InProgress` until the terminal step is submitted, after
//! which it is `Submitted` and refuses further changes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::calculations::{CostTableError, CostTableSet, PricingCalculator, UnitCostTable};
use crate::error::ValidationError;
use crate::models::{
    AccessError, AnswerValue, AuthContext, ContactDetails, FormAnswers, NewLead, PriceBreakdown,
};
use crate::schema::{StepDefinition, StepRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Submitted,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    #[error("'{0}' is the first step")]
    AtFirstStep(&'static str),

    #[error("'{0}' is the last step; submit the estimate instead")]
    AtLastStep(&'static str),

    #[error("'{0}' is not the last step; the estimate cannot be submitted yet")]
    NotTerminal(&'static str),

    #[error("no step applies to the current answers")]
    NoVisibleSteps,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("{} field(s) need attention", .0.len())]
    Invalid(Vec<ValidationError>),

    #[error(transparent)]
    Navigation(#[from] NavigationError),

    #[error("the estimate has already been submitted")]
    Closed,
}

impl SessionError {
    /// Field errors to show inline, empty for non-validation failures.
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            Self::Invalid(errors) => errors,
            _ => &[],
        }
    }
}

/// In-memory state of one estimation.
#[derive(Debug, Clone)]
pub struct EstimationSession<'r> {
    registry: &'r StepRegistry,
    answers: FormAnswers,
    current: &'r StepDefinition,
    status: SessionStatus,
    dirty: bool,
    submitted: Option<SubmittedEstimate>,
}

impl<'r> EstimationSession<'r> {
    /// Starts a session on the first step visible with no answers.
    pub fn new(registry: &'r StepRegistry) -> Result<Self, NavigationError> {
        let answers = FormAnswers::new();
        let current = registry
            .visible_steps(&answers)
            .first()
            .copied()
            .ok_or(NavigationError::NoVisibleSteps)?;

        Ok(Self {
            registry,
            answers,
            current,
            status: SessionStatus::InProgress,
            dirty: false,
            submitted: None,
        })
    }

    pub fn registry(&self) -> &'r StepRegistry {
        self.registry
    }

    pub fn current_step(&self) -> &'r StepDefinition {
        self.current
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn answers(&self) -> &FormAnswers {
        &self.answers
    }

    pub fn submitted(&self) -> Option<&SubmittedEstimate> {
        self.submitted.as_ref()
    }

    /// Steps applicable to the answers given so far.
    pub fn visible_steps(&self) -> Vec<&'r StepDefinition> {
        self.registry.visible_steps(&self.answers)
    }

    /// Whether no visible step follows the current one.
    pub fn is_terminal(&self) -> bool {
        self.next_visible().is_none()
    }

    /// Stores or overwrites one answer. Validation waits for [`Self::go_next`].
    pub fn set_answer(
        &mut self,
        field: impl Into<String>,
        value: AnswerValue,
    ) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.answers.set(field, value);
        self.dirty = true;
        Ok(())
    }

    pub fn clear_answer(
        &mut self,
        field: &str,
    ) -> Result<Option<AnswerValue>, SessionError> {
        self.ensure_open()?;
        let previous = self.answers.remove(field);
        if previous.is_some() {
            self.dirty = true;
        }
        Ok(previous)
    }

    /// Validates the current step and moves to the next visible one.
    ///
    /// The next step is picked from the visible sequence as it stands with
    /// the answers just given, so a step revealed by this step's answers is
    /// never skipped. A current step that later answers have hidden is left
    /// without validation.
    pub fn go_next(&mut self) -> Result<&'r StepDefinition, SessionError> {
        self.ensure_open()?;

        let Some(next) = self.next_visible() else {
            return Err(NavigationError::AtLastStep(self.current.id).into());
        };

        if !self.current.is_visible(&self.answers) {
            debug!(from = self.current.id, to = next.id, "leaving hidden step");
            self.current = next;
            return Ok(next);
        }

        let result = self.current.validate(&self.answers);
        if !result.is_valid() {
            debug!(
                step = self.current.id,
                errors = result.errors().len(),
                "step invalid; staying"
            );
            return Err(SessionError::Invalid(result.into_errors()));
        }

        debug!(from = self.current.id, to = next.id, "advancing");
        self.current = next;
        Ok(next)
    }

    /// Moves back to the closest visible step before the current one.
    /// Answers are kept and not validated.
    pub fn go_previous(&mut self) -> Result<&'r StepDefinition, SessionError> {
        self.ensure_open()?;

        let ordinal = self.current.ordinal;
        let previous = self
            .visible_steps()
            .into_iter()
            .rev()
            .find(|step| step.ordinal < ordinal)
            .ok_or(NavigationError::AtFirstStep(self.current.id))?;

        debug!(from = self.current.id, to = previous.id, "going back");
        self.current = previous;
        Ok(previous)
    }

    /// Finalises the estimate from the terminal step.
    ///
    /// Every visible step is validated, answers left on hidden steps are
    /// dropped, and the breakdown is priced against `table`. On success the
    /// session is closed for good.
    pub fn submit(
        &mut self,
        table: &UnitCostTable,
    ) -> Result<SubmittedEstimate, SessionError> {
        self.ensure_open()?;

        if !self.is_terminal() {
            return Err(NavigationError::NotTerminal(self.current.id).into());
        }

        let errors: Vec<ValidationError> = self
            .visible_steps()
            .into_iter()
            .flat_map(|step| step.validate(&self.answers).into_errors())
            .collect();
        if !errors.is_empty() {
            return Err(SessionError::Invalid(errors));
        }

        let answers = self.registry.normalize(&self.answers);
        let breakdown = PricingCalculator::new(table)
            .calculate(&answers)
            .map_err(|e| SessionError::Invalid(vec![e]))?;

        info!(
            version = %breakdown.cost_table_version,
            total = %breakdown.total,
            warnings = breakdown.warnings.len(),
            "estimate submitted"
        );

        let estimate = SubmittedEstimate { answers, breakdown };
        self.status = SessionStatus::Submitted;
        self.submitted = Some(estimate.clone());
        Ok(estimate)
    }

    /// Replaces this session with a fresh one on the same registry.
    pub fn reset(&mut self) -> Result<(), NavigationError> {
        *self = Self::new(self.registry)?;
        Ok(())
    }

    fn next_visible(&self) -> Option<&'r StepDefinition> {
        let ordinal = self.current.ordinal;
        self.visible_steps()
            .into_iter()
            .find(|step| step.ordinal > ordinal)
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        match self.status {
            SessionStatus::InProgress => Ok(()),
            SessionStatus::Submitted => Err(SessionError::Closed),
        }
    }
}

#[derive(Debug, Error)]
pub enum RecomputeError {
    #[error(transparent)]
    CostTable(#[from] CostTableError),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LeadError {
    #[error(transparent)]
    Access(#[from] AccessError),

    #[error("the estimate has no contact details")]
    MissingContact,
}

/// A finalised estimate: the normalised answers and their breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedEstimate {
    pub answers: FormAnswers,
    pub breakdown: PriceBreakdown,
}

impl SubmittedEstimate {
    pub fn cost_table_version(&self) -> &str {
        &self.breakdown.cost_table_version
    }

    pub fn contact(&self) -> Option<ContactDetails> {
        ContactDetails::from_answers(&self.answers)
    }

    /// Prices the stored answers again with the table version they were
    /// submitted under.
    pub fn recompute(
        &self,
        tables: &CostTableSet,
    ) -> Result<PriceBreakdown, RecomputeError> {
        let table = tables.get(self.cost_table_version())?;
        Ok(PricingCalculator::new(table).calculate(&self.answers)?)
    }

    /// The record handed to the lead store.
    ///
    /// With `save_to_account` the lead is owned by the signed-in user, which
    /// requires an authenticated client or admin. Otherwise it is stored
    /// without an owner.
    pub fn to_lead(
        &self,
        auth: &AuthContext,
        save_to_account: bool,
        submitted_on: NaiveDate,
    ) -> Result<NewLead, LeadError> {
        let owner_id = if save_to_account {
            Some(auth.account_owner()?.to_string())
        } else {
            None
        };
        let contact = self.contact().ok_or(LeadError::MissingContact)?;

        Ok(NewLead {
            owner_id,
            contact,
            answers: self.answers.clone(),
            breakdown: self.breakdown.clone(),
            submitted_on,
        })
    }
}
