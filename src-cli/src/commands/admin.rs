//! `export`, `status`, `week`, `resume` and `approval`.

use crate::output;
use crate::state::AppState;
use anyhow::Context;
use healer_core::HealerFilter;
use healer_export::ExportFormat;

pub async fn export(
    state: &mut AppState,
    format: Option<ExportFormat>,
    json: bool,
) -> anyhow::Result<String> {
    let result = state
        .pipeline
        .export(&HealerFilter::default(), format)
        .await
        .context("export failed")?;
    if json {
        return Ok(serde_json::to_string_pretty(&result)?);
    }
    Ok(output::export(&result))
}

pub async fn status(state: &mut AppState, json: bool) -> anyhow::Result<String> {
    let status = state
        .pipeline
        .status()
        .await
        .context("failed to read status")?;
    if json {
        return Ok(serde_json::to_string_pretty(&status)?);
    }
    Ok(output::status(&status))
}

pub async fn week(state: &mut AppState, week: u32) -> anyhow::Result<String> {
    let limit = state
        .pipeline
        .advance_week(week)
        .await
        .context("failed to update week")?;
    Ok(format!("Week set to {week}; daily outreach limit is now {limit}\n"))
}

pub async fn resume(state: &mut AppState) -> anyhow::Result<String> {
    let stopped = state
        .pipeline
        .limiter()
        .is_emergency_stopped()
        .await
        .context("failed to read emergency stop")?;
    state
        .pipeline
        .resume()
        .await
        .context("failed to clear emergency stop")?;
    Ok(match stopped {
        Some(stop) => format!("Emergency stop cleared (was: {})\n", stop.reason),
        None => "No emergency stop was active\n".to_string(),
    })
}

pub async fn approval(state: &mut AppState, required: bool) -> anyhow::Result<String> {
    state
        .pipeline
        .set_manual_approval(required)
        .await
        .context("failed to update manual approval")?;
    Ok(if required {
        "Manual approval is on; outreach will not send until it is turned off\n".to_string()
    } else {
        "Manual approval is off; outreach will send within the rate limits\n".to_string()
    })
}
