//! Scenario classification
//!
//! After any state-changing interaction the page is probed and the outcome
//! classified in a fixed order: popup dialog, then error messages, then form
//! opened, else action completed. A dialog can carry error text itself, so
//! it is checked before the generic message surface. Messages and object
//! pages only count when they are new relative to the probe taken before
//! the interaction, so refreshing a table while already on an object page
//! is not reported as a form opening. A message is new when its element id
//! or text was not on the page before, so a re-raised error with the same
//! count still classifies as error messages.

use anyhow::Result;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::driver::common::{collapse_whitespace, poll_for, PollConfig};
use crate::driver::traits::PageDriver;
use crate::ui5::{ids, scripts};

/// Snapshot of the page signals the classifier looks at
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageProbe {
    pub dialog_with_form_and_footer: bool,
    pub message_surface: bool,
    pub message_count: u32,
    /// `id|text` of every visible message element
    pub message_keys: Vec<String>,
    pub object_page: bool,
}

impl PageProbe {
    fn has_new_messages(&self, before: &PageProbe) -> bool {
        self.message_surface
            && (!before.message_surface
                || self.message_count > before.message_count
                || self
                    .message_keys
                    .iter()
                    .any(|key| !before.message_keys.contains(key)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    PopupDialog,
    ErrorMessages,
    FormOpened,
    ActionCompleted,
}

/// Classify the page state after an interaction
pub fn classify(before: &PageProbe, after: &PageProbe) -> ScenarioKind {
    if after.dialog_with_form_and_footer {
        ScenarioKind::PopupDialog
    } else if after.has_new_messages(before) {
        ScenarioKind::ErrorMessages
    } else if after.object_page && !before.object_page {
        ScenarioKind::FormOpened
    } else {
        ScenarioKind::ActionCompleted
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Success,
    Information,
}

impl Severity {
    /// Severity from the CSS classes of a message element
    pub fn from_classes(classes: &str) -> Self {
        if classes.contains("Error") {
            Severity::Error
        } else if classes.contains("Warning") {
            Severity::Warning
        } else if classes.contains("Success") {
            Severity::Success
        } else {
            Severity::Information
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub severity: Severity,
    pub text: String,
}

/// An input field found in a dialog or on the page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub selector: String,
}

impl FormField {
    /// The `name` attribute, or the view-relative id
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| ids::local_id(&self.id))
    }
}

/// Classified outcome of one interaction
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "scenario", rename_all = "snake_case")]
pub enum ActionResult {
    PopupDialog { fields: Vec<FormField> },
    ErrorMessages { messages: Vec<Message> },
    FormOpened { fields: Vec<FormField> },
    ActionCompleted,
}

impl ActionResult {
    pub fn kind(&self) -> ScenarioKind {
        match self {
            ActionResult::PopupDialog { .. } => ScenarioKind::PopupDialog,
            ActionResult::ErrorMessages { .. } => ScenarioKind::ErrorMessages,
            ActionResult::FormOpened { .. } => ScenarioKind::FormOpened,
            ActionResult::ActionCompleted => ScenarioKind::ActionCompleted,
        }
    }
}

// ============================================================================
// Page access
// ============================================================================

pub async fn probe(driver: &dyn PageDriver) -> Result<PageProbe> {
    let value = driver.evaluate(scripts::PROBE_SCENARIO, Value::Null).await?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

#[derive(Deserialize)]
struct RawMessage {
    #[serde(default)]
    classes: String,
    #[serde(default)]
    text: String,
}

pub async fn extract_messages(driver: &dyn PageDriver) -> Result<Vec<Message>> {
    let value = driver.evaluate(scripts::EXTRACT_MESSAGES, Value::Null).await?;
    let raw: Vec<RawMessage> = serde_json::from_value(value).unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter(|m| !m.text.trim().is_empty())
        .map(|m| Message {
            severity: Severity::from_classes(&m.classes),
            text: collapse_whitespace(&m.text),
        })
        .collect())
}

/// Visible input fields of the top dialog (`in_dialog`) or the page
pub async fn extract_form_fields(driver: &dyn PageDriver, in_dialog: bool) -> Result<Vec<FormField>> {
    let scope = if in_dialog { "dialog" } else { "page" };
    let value = driver
        .evaluate(scripts::EXTRACT_FORM_FIELDS, json!({ "scope": scope }))
        .await?;
    let mut fields: Vec<FormField> = serde_json::from_value(value).unwrap_or_default();
    for field in &mut fields {
        field.selector = ids::css_id(&field.id);
    }
    Ok(fields)
}

/// Wait up to `settle_ms` for a terminal signal, then extract its payload
///
/// No signal within the bound classifies as `action_completed`.
pub async fn observe(
    driver: &dyn PageDriver,
    before: &PageProbe,
    settle_ms: u64,
    interval_ms: u64,
) -> Result<ActionResult> {
    let config = PollConfig::with_timeout(settle_ms, interval_ms);
    let kind = poll_for(
        || async {
            let after = probe(driver).await?;
            let kind = classify(before, &after);
            Ok::<Option<ScenarioKind>, anyhow::Error>(
                (kind != ScenarioKind::ActionCompleted).then_some(kind),
            )
        },
        &config,
    )
    .await?
    .unwrap_or(ScenarioKind::ActionCompleted);

    debug!("Interaction classified as {:?}", kind);

    Ok(match kind {
        ScenarioKind::PopupDialog => ActionResult::PopupDialog {
            fields: extract_form_fields(driver, true).await?,
        },
        ScenarioKind::ErrorMessages => ActionResult::ErrorMessages {
            messages: extract_messages(driver).await?,
        },
        ScenarioKind::FormOpened => ActionResult::FormOpened {
            fields: extract_form_fields(driver, false).await?,
        },
        ScenarioKind::ActionCompleted => ActionResult::ActionCompleted,
    })
}
