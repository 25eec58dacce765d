//! Handoff of a finished estimate to whatever sends it on (e-mail, CRM,
//! file drop).
//!
//! The handoff is fire-and-forget from the engine's side: a failed export is
//! logged and reported to the caller, but the estimate itself stands and the
//! export is not retried.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{ContactDetails, PriceBreakdown};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExportError {
    #[error("export rejected: {0}")]
    Rejected(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// What an exporter receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRequest {
    pub contact: ContactDetails,
    pub breakdown: PriceBreakdown,
    /// Pre-rendered text summary.
    pub summary_text: String,
}

#[async_trait]
pub trait EstimateExporter: Send + Sync {
    fn name(&self) -> &str;

    async fn export(
        &self,
        request: &ExportRequest,
    ) -> Result<(), ExportError>;
}

/// Hands `request` to `exporter` once. Returns whether it was accepted.
pub async fn hand_off(
    exporter: &dyn EstimateExporter,
    request: &ExportRequest,
) -> bool {
    match exporter.export(request).await {
        Ok(()) => {
            info!(
                exporter = exporter.name(),
                recipient = %request.contact.email,
                "estimate exported"
            );
            true
        }
        Err(e) => {
            warn!(
                exporter = exporter.name(),
                recipient = %request.contact.email,
                error = %e,
                "estimate export failed; not retrying"
            );
            false
        }
    }
}

/// Writes the export to the log instead of sending it anywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogExporter;

#[async_trait]
impl EstimateExporter for LogExporter {
    fn name(&self) -> &str {
        "log"
    }

    async fn export(
        &self,
        request: &ExportRequest,
    ) -> Result<(), ExportError> {
        info!(
            recipient = %request.contact.email,
            total = %request.breakdown.total,
            "\n{}",
            request.summary_text
        );
        Ok(())
    }
}
