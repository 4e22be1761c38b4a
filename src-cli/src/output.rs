//! Human-readable rendering of command results.

use healer_export::ExportResult;
use healer_outreach::DailyOutreach;
use healer_pipeline::{OutreachReport, PipelineStatus, RunOutcome, RunReport};
use std::fmt::Write;

/// Text for a finished `run`.
#[must_use]
pub fn run_report(report: &RunReport) -> String {
    let mut out = String::new();
    match &report.outcome {
        RunOutcome::Refused { reason } => {
            let _ = writeln!(out, "Run refused: emergency stop is active ({reason})");
            let _ = writeln!(out, "Clear it with: healer-search resume");
            return out;
        }
        RunOutcome::Skipped { reason } => {
            let _ = writeln!(out, "Run skipped: {reason}");
            return out;
        }
        RunOutcome::Completed => {}
    }

    let _ = writeln!(out, "Pipeline complete (week {})", report.week);
    let _ = writeln!(out, "  Discovered:  {}", report.discovery.total);
    for source in &report.discovery.sources {
        match &source.error {
            Some(error) => {
                let _ = writeln!(out, "    {:<24} failed: {error}", source.source);
            }
            None => {
                let _ = writeln!(out, "    {:<24} {}", source.source, source.found);
            }
        }
    }
    let _ = writeln!(
        out,
        "  Enriched:    {} ({} with contacts)",
        report.enrichment.processed, report.enrichment.with_contacts
    );
    let _ = writeln!(out, "  Saved:       {}", report.enrichment.saved);
    let _ = writeln!(out, "  Outreach:    {}", outreach_line(&report.outreach));
    if let Some(export) = &report.export {
        let _ = writeln!(
            out,
            "  Export:      {} ({} records)",
            export.file_path.display(),
            export.record_count
        );
    }
    if !report.errors.is_empty() {
        let _ = writeln!(out, "  Errors:");
        for error in &report.errors {
            let _ = writeln!(out, "    [{}] {}", error.phase, error.message);
        }
    }
    out
}

fn outreach_line(report: &OutreachReport) -> String {
    match report {
        OutreachReport::NotRun { reason } => format!("not run ({reason})"),
        OutreachReport::Ran(outcome) => daily_outreach(outcome),
    }
}

/// One line for a daily outreach outcome.
#[must_use]
pub fn daily_outreach(outcome: &DailyOutreach) -> String {
    match outcome {
        DailyOutreach::Skipped { reason } => format!("skipped ({reason})"),
        DailyOutreach::Ran {
            batch,
            daily_target,
            available,
        } => format!(
            "{} sent, {} failed (target {daily_target}, {available} eligible)",
            batch.summary.successful, batch.summary.failed
        ),
    }
}

/// Text for `discover`.
#[must_use]
pub fn discovered(total: usize, with_contacts: usize) -> String {
    format!("Discovered {total} healers ({with_contacts} with contact details)\n")
}

/// Text for `export`.
#[must_use]
pub fn export(result: &ExportResult) -> String {
    let mut out = format!(
        "Exported {} healers to {}\n",
        result.record_count,
        result.file_path.display()
    );
    if let Some(summary) = &result.summary_path {
        let _ = writeln!(out, "Summary: {}", summary.display());
    }
    out
}

/// Text for `status`.
#[must_use]
pub fn status(status: &PipelineStatus) -> String {
    let mut out = String::new();
    let limiter = &status.limiter;

    if let Some(reason) = &limiter.emergency_reason {
        let _ = writeln!(out, "EMERGENCY STOP ACTIVE: {reason}");
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "Healers:          {}", status.stats.total_healers);
    for (state, count) in &status.stats.by_status {
        let _ = writeln!(out, "  {state:<16}{count}");
    }
    if !status.stats.by_platform.is_empty() {
        let _ = writeln!(out, "By platform:");
        for (platform, count) in &status.stats.by_platform {
            let _ = writeln!(out, "  {platform:<24}{count}");
        }
    }
    let _ = writeln!(
        out,
        "Campaigns:        {} sent, {} responses ({}%)",
        status.stats.campaigns_sent, status.stats.responses_received, status.stats.response_rate
    );

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Week {}: daily limit {}",
        limiter.week, limiter.progressive_limit
    );
    let _ = writeln!(
        out,
        "Weekend mode:     {}{}",
        on_off(limiter.weekend_mode_enabled),
        if limiter.weekend_active { " (active now)" } else { "" }
    );
    let _ = writeln!(
        out,
        "Manual approval:  {}",
        on_off(limiter.manual_approval_required)
    );
    let _ = writeln!(out, "Dry run:          {}", on_off(status.dry_run));
    let _ = writeln!(out, "Outreach:         {}", on_off(status.outreach_enabled));
    let _ = writeln!(out, "Sources:          {}", status.sources.join(", "));

    let _ = writeln!(out, "Today's usage:");
    for usage in &limiter.platforms {
        let hourly = usage
            .hourly_limit
            .map(|h| format!(", {h}/hour"))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "  {:<24}{}/{}{hourly}",
            usage.platform, usage.used, usage.limit
        );
    }
    out
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}
