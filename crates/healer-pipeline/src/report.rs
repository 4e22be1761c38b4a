//! What a pipeline run did, phase by phase.

use healer_export::ExportResult;
use healer_outreach::DailyOutreach;
use serde::Serialize;

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The emergency stop was latched; nothing ran
    Refused {
        /// The latched reason
        reason: String,
    },
    /// A precondition said not today; nothing ran
    Skipped {
        /// Why
        reason: String,
    },
    /// Every enabled phase ran, possibly with phase errors
    Completed,
}

/// Candidates one source produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    /// Source name
    pub source: String,
    /// Candidates returned
    pub found: usize,
    /// Failure, if the source errored
    pub error: Option<String>,
}

/// Discovery totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveryReport {
    /// Candidates across all sources
    pub total: usize,
    /// Per-source breakdown, in run order
    pub sources: Vec<SourceReport>,
}

/// Enrichment and persistence totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EnrichmentReport {
    /// Candidates enriched
    pub processed: usize,
    /// Candidates with an email or phone afterwards
    pub with_contacts: usize,
    /// Upserts that succeeded
    pub saved: usize,
    /// Upserts that failed and were skipped
    pub failed: usize,
}

/// What the outreach phase did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutreachReport {
    /// Phase did not run
    NotRun {
        /// Why
        reason: String,
    },
    /// Phase ran
    Ran(DailyOutreach),
}

impl Default for OutreachReport {
    fn default() -> Self {
        Self::NotRun {
            reason: "not reached".to_string(),
        }
    }
}

impl OutreachReport {
    /// Messages sent.
    #[must_use]
    pub fn sent(&self) -> usize {
        match self {
            Self::Ran(DailyOutreach::Ran { batch, .. }) => batch.summary.successful,
            _ => 0,
        }
    }

    /// Sends attempted that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        match self {
            Self::Ran(DailyOutreach::Ran { batch, .. }) => batch.summary.failed,
            _ => 0,
        }
    }
}

/// A phase failure that was caught so later phases could run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseError {
    /// `discovery`, `enrichment`, `outreach` or `export`
    pub phase: &'static str,
    /// Error text
    pub message: String,
}

/// Full account of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Ramp week the run used
    pub week: u32,
    /// How the run ended
    pub outcome: RunOutcome,
    /// Discovery totals
    pub discovery: DiscoveryReport,
    /// Enrichment totals
    pub enrichment: EnrichmentReport,
    /// Outreach result
    pub outreach: OutreachReport,
    /// Export written, if the phase ran and succeeded
    pub export: Option<ExportResult>,
    /// Caught phase failures
    pub errors: Vec<PhaseError>,
}

impl RunReport {
    pub(crate) fn new(week: u32, outcome: RunOutcome) -> Self {
        Self {
            week,
            outcome,
            discovery: DiscoveryReport::default(),
            enrichment: EnrichmentReport::default(),
            outreach: OutreachReport::default(),
            export: None,
            errors: Vec::new(),
        }
    }

    pub(crate) fn phase_error(&mut self, phase: &'static str, message: impl Into<String>) {
        self.errors.push(PhaseError {
            phase,
            message: message.into(),
        });
    }

    /// Whether the phases ran.
    #[must_use]
    pub fn completed(&self) -> bool {
        self.outcome == RunOutcome::Completed
    }
}
