//! Client for the audio metadata service and the cohort maintenance tasks
//! built on it.

mod client;

pub use client::{AudioServiceApi, AudioServiceClient};

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;

/// Cohort keys dropped so the service regenerates them.
pub const REGENERATED_KEYS: [&str; 2] = ["playList", "versionId"];

/// Duration the service stores for one cohort file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortDuration {
    pub checksum: String,
    /// `None` when the service has no metadata for the checksum.
    pub duration: Option<Value>,
}

/// Remove the playlist and version id from a cohort document.
pub fn strip_playlist(cohort: &mut Value) -> Result<()> {
    let map = cohort
        .as_object_mut()
        .context("Cohort is not a JSON object")?;
    for key in REGENERATED_KEYS {
        if map.remove(key).is_none() {
            tracing::debug!("Cohort has no '{}' to remove", key);
        }
    }
    Ok(())
}

/// Fetch a cohort, strip its playlist and replace it.
pub async fn replace_without_playlist(
    api: &dyn AudioServiceApi,
    content_id: &str,
) -> Result<Option<Value>> {
    let Some(mut cohort) = api.get_cohort(content_id).await? else {
        return Ok(None);
    };
    strip_playlist(&mut cohort)?;
    api.put_cohort(content_id, &cohort).await
}

/// Durations for every file listed in a cohort, in list order.
pub async fn cohort_durations(
    api: &dyn AudioServiceApi,
    content_id: &str,
) -> Result<Option<Vec<CohortDuration>>> {
    let Some(cohort) = api.get_cohort(content_id).await? else {
        return Ok(None);
    };

    let files = cohort
        .get("fileList")
        .and_then(Value::as_array)
        .context("Cohort has no fileList")?;

    let mut durations = Vec::with_capacity(files.len());
    for file in files {
        let checksum = file
            .get("checksum")
            .and_then(Value::as_str)
            .context("Cohort file has no checksum")?;
        let duration = api
            .get_audio_metadata(checksum)
            .await?
            .and_then(|m| m.get("duration").cloned());
        durations.push(CohortDuration {
            checksum: checksum.to_string(),
            duration,
        });
    }
    Ok(Some(durations))
}
