//! Column settings dialog pass
//!
//! The table toolbar's settings button opens a personalisation dialog listing
//! every available column, including ones hidden from the current layout.
//! The labels read here are merged into the table descriptor as label-only
//! columns.

use anyhow::Result;
use log::{debug, warn};
use serde_json::{json, Value};

use super::{ids, scripts};
use crate::driver::common::{poll_for, PollConfig};
use crate::driver::traits::PageDriver;

/// Open the settings dialog of `table_id`, read its column labels and close it
///
/// Returns an empty list when the table has no settings button or the
/// dialog never shows a column list within `timeout_ms`.
pub async fn read_column_labels(
    driver: &dyn PageDriver,
    table_id: &str,
    timeout_ms: u64,
    interval_ms: u64,
) -> Result<Vec<String>> {
    let settings_id = format!("{}{}", table_id, ids::SETTINGS_SUFFIX);

    let fired = driver
        .evaluate(scripts::FIRE_PRESS, json!({ "id": settings_id }))
        .await?
        .as_bool()
        .unwrap_or(false);
    if !fired {
        if let Err(e) = driver.click(&ids::css_id(&settings_id)).await {
            debug!("No settings button for {}: {:#}", table_id, e);
            return Ok(Vec::new());
        }
    }

    let config = PollConfig::with_timeout(timeout_ms, interval_ms);
    let labels = poll_for(
        || async {
            let value = driver
                .evaluate(scripts::READ_SETTINGS_COLUMNS, Value::Null)
                .await?;
            Ok::<Option<Vec<String>>, anyhow::Error>(serde_json::from_value(value).ok().flatten())
        },
        &config,
    )
    .await?;

    driver
        .evaluate(scripts::CLOSE_TOP_DIALOG, Value::Null)
        .await?;

    match labels {
        Some(labels) => {
            debug!("Settings dialog of {} lists {} columns", table_id, labels.len());
            Ok(labels)
        }
        None => {
            warn!("Settings dialog of {} showed no column list", table_id);
            Ok(Vec::new())
        }
    }
}
