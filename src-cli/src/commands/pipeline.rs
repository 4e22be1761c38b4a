//! `run`, `discover` and `outreach`.

use crate::output;
use crate::state::AppState;
use anyhow::Context;
use serde_json::json;

pub async fn run(state: &mut AppState, json: bool) -> anyhow::Result<String> {
    let report = state
        .pipeline
        .run_full()
        .await
        .context("pipeline run failed")?;
    if json {
        return Ok(serde_json::to_string_pretty(&report)?);
    }
    Ok(output::run_report(&report))
}

pub async fn discover(state: &mut AppState, json: bool) -> anyhow::Result<String> {
    let healers = state
        .pipeline
        .run_discovery_only()
        .await
        .context("discovery failed")?;
    let with_contacts = healers
        .iter()
        .filter(|h| h.has_email() || h.has_phone())
        .count();
    if json {
        return Ok(serde_json::to_string_pretty(&json!({
            "discovered": healers.len(),
            "with_contacts": with_contacts,
        }))?);
    }
    Ok(output::discovered(healers.len(), with_contacts))
}

pub async fn outreach(state: &mut AppState, json: bool) -> anyhow::Result<String> {
    let outcome = state
        .pipeline
        .run_outreach_only()
        .await
        .context("outreach failed")?;
    if json {
        return Ok(serde_json::to_string_pretty(&outcome)?);
    }
    Ok(format!("Outreach: {}\n", output::daily_outreach(&outcome)))
}
