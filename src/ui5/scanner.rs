//! Control scanner
//!
//! Walks the live UI5 element registry (not the raw DOM, which carries no
//! role metadata or bindings) and materialises [`Control`]s.

use anyhow::Result;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::control::{is_interactive_type, is_internal_type, Control, RawEntry};
use super::scripts;
use crate::driver::traits::PageDriver;

#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    /// Keep launchpad shell and framework-internal controls
    pub include_framework_internals: bool,
}

/// Output of one scan; `ready == false` means no UI5 runtime was found
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub ready: bool,
    pub controls: Vec<Control>,
    /// Entries dropped because their extraction failed
    pub skipped: usize,
}

#[derive(Deserialize)]
struct RawScan {
    #[serde(default)]
    ready: bool,
    #[serde(default)]
    entries: Vec<Value>,
}

/// Scan the page
///
/// A page without the framework root yields `ready: false` and no controls
/// rather than an error.
pub async fn scan(driver: &dyn PageDriver, options: ScanOptions) -> Result<ScanResult> {
    let value = driver
        .evaluate(
            scripts::SCAN_REGISTRY,
            json!({ "includeInternals": options.include_framework_internals }),
        )
        .await?;

    let raw: RawScan = serde_json::from_value(value).unwrap_or(RawScan {
        ready: false,
        entries: Vec::new(),
    });

    if !raw.ready {
        info!("UI5 runtime not present, nothing to scan");
        return Ok(ScanResult::default());
    }

    let result = build_controls(raw.entries, options);
    info!(
        "Scanned {} controls ({} skipped)",
        result.controls.len(),
        result.skipped
    );
    Ok(result)
}

/// Turn raw registry entries into controls
///
/// Entries without a render anchor are dropped silently. Entries that fail
/// to parse or carry an extraction error are counted in `skipped`.
pub fn build_controls(entries: Vec<Value>, options: ScanOptions) -> ScanResult {
    let mut controls = Vec::new();
    let mut skipped = 0;

    for value in entries {
        let entry: RawEntry = match serde_json::from_value(value) {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable registry entry: {}", e);
                skipped += 1;
                continue;
            }
        };

        if let Some(ref error) = entry.error {
            debug!("Skipping {}: {}", entry.id, error);
            skipped += 1;
            continue;
        }

        if !options.include_framework_internals
            && is_internal_type(&entry.type_name)
            && !is_interactive_type(&entry.type_name)
        {
            continue;
        }

        if let Some(control) = Control::from_raw(entry) {
            controls.push(control);
        }
    }

    ScanResult {
        ready: true,
        controls,
        skipped,
    }
}
