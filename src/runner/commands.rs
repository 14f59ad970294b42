//! The command surface
//!
//! Every entry point (CLI, shell, YAML scripts, tool server) funnels into
//! [`execute`] with an explicit [`Session`].

use anyhow::Result;
use colored::Colorize;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

use super::executor;
use super::scenario;
use super::session::Session;
use crate::error::FioriError;
use crate::metadata::reconciler;
use crate::metadata::rows;
use crate::metadata::{store, Metadata, TableDescriptor};
use crate::resolver;
use crate::ui5::readiness::{self, RowsState};
use crate::ui5::{column_dialog, scan, scripts, ScanOptions};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum Command {
    Start {
        #[serde(default)]
        url: Option<String>,
    },
    PressGo,
    GetRows,
    #[serde(rename_all = "camelCase")]
    SetFilter { property_key: String, value: String },
    ExecuteAction { action: String },
    SelectRow { index: usize },
    OpenObjectPage { index: usize },
    GetObjectActions,
    GetObjectFields,
    ExecuteObjectAction { action: String },
    FillFormField { name: String, value: String },
    SubmitForm,
    DiscardDraft,
    GetMessages,
    Close,
    /// Scan, read column dialogs, reconcile and persist
    #[serde(rename_all = "camelCase")]
    Extract {
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        skip_dialog: bool,
        /// Merge into the existing metadata file instead of replacing it
        #[serde(default)]
        merge: bool,
    },
    #[serde(rename_all = "camelCase")]
    Scan {
        #[serde(default)]
        include_internals: bool,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Start { .. } => "start",
            Command::PressGo => "pressGo",
            Command::GetRows => "getRows",
            Command::SetFilter { .. } => "setFilter",
            Command::ExecuteAction { .. } => "executeAction",
            Command::SelectRow { .. } => "selectRow",
            Command::OpenObjectPage { .. } => "openObjectPage",
            Command::GetObjectActions => "getObjectActions",
            Command::GetObjectFields => "getObjectFields",
            Command::ExecuteObjectAction { .. } => "executeObjectAction",
            Command::FillFormField { .. } => "fillFormField",
            Command::SubmitForm => "submitForm",
            Command::DiscardDraft => "discardDraft",
            Command::GetMessages => "getMessages",
            Command::Close => "close",
            Command::Extract { .. } => "extract",
            Command::Scan { .. } => "scan",
        }
    }

    /// Human readable one-liner for progress output
    pub fn display_name(&self) -> String {
        match self {
            Command::Start { url: Some(url) } => format!("start {}", url),
            Command::SetFilter { property_key, value } => {
                format!("setFilter {} = {}", property_key, value)
            }
            Command::ExecuteAction { action } | Command::ExecuteObjectAction { action } => {
                format!("{} {}", self.name(), action)
            }
            Command::SelectRow { index } | Command::OpenObjectPage { index } => {
                format!("{} {}", self.name(), index)
            }
            Command::FillFormField { name, value } => format!("fillFormField {} = {}", name, value),
            _ => self.name().to_string(),
        }
    }

    /// Whether the command reads the reconciled metadata file
    pub fn needs_metadata(&self) -> bool {
        matches!(
            self,
            Command::PressGo
                | Command::GetRows
                | Command::SetFilter { .. }
                | Command::ExecuteAction { .. }
                | Command::SelectRow { .. }
                | Command::OpenObjectPage { .. }
        )
    }
}

fn primary_table(metadata: &Metadata) -> Result<&TableDescriptor> {
    metadata
        .primary_table()
        .ok_or_else(|| FioriError::not_found("table", "line item table", Vec::new()).into())
}

/// Run one command against the session and return its payload
pub async fn execute(session: &mut Session, command: &Command) -> Result<Value> {
    info!("Executing {}", command.display_name());

    let metadata = if command.needs_metadata() {
        Some(session.metadata()?)
    } else {
        None
    };
    let metadata = metadata.as_ref();
    let t = session.timeouts().clone();

    match command {
        Command::Start { url } => {
            let url = session.start(url.as_deref()).await?;
            Ok(json!({ "url": url }))
        }

        Command::Close => {
            session.close().await?;
            Ok(json!({ "closed": true }))
        }

        Command::Extract {
            url,
            skip_dialog,
            merge,
        } => {
            if url.is_some() || !session.is_started() {
                session.start(url.as_deref()).await?;
            }
            extract(session, *skip_dialog, *merge).await
        }

        Command::Scan { include_internals } => {
            let result = scan(
                session.driver()?,
                ScanOptions {
                    include_framework_internals: *include_internals,
                },
            )
            .await?;
            Ok(serde_json::to_value(result)?)
        }

        Command::PressGo => {
            let metadata = metadata.ok_or(FioriError::NoSession)?;
            let list_id = metadata.primary_table().map(|t| t.list_ul_id.as_str());
            let state = executor::press_go(session.driver()?, list_id, &t).await?;
            Ok(json!({ "rows": state == RowsState::Rows, "noData": state == RowsState::NoData }))
        }

        Command::GetRows => {
            let metadata = metadata.ok_or(FioriError::NoSession)?;
            let driver = session.driver()?;
            let list_id = metadata.primary_table().map(|t| t.list_ul_id.as_str());
            let state = readiness::wait_for_rows(driver, list_id, t.rows_ms, t.poll_interval_ms).await?;

            let mut snapshots = Vec::new();
            for table in &metadata.tables {
                if state == RowsState::NoData && Some(table.list_ul_id.as_str()) == list_id {
                    snapshots.push(rows::RowSnapshot {
                        table_id: table.table_id.clone(),
                        ..Default::default()
                    });
                    continue;
                }
                snapshots.push(rows::read_rows(driver, table).await?);
            }
            Ok(json!({ "tables": snapshots }))
        }

        Command::SetFilter {
            property_key,
            value,
        } => {
            let metadata = metadata.ok_or(FioriError::NoSession)?;
            let filter = resolver::resolve_filter(metadata, property_key)?;
            executor::set_filter(session.driver()?, filter, value, &t).await?;
            Ok(json!({ "propertyKey": filter.property_key, "label": filter.label, "value": value }))
        }

        Command::ExecuteAction { action } => {
            let metadata = metadata.ok_or(FioriError::NoSession)?;
            let target = resolver::resolve_table_action(metadata, action)?;
            println!("  {} {}", "▶".green(), target.text.cyan());
            let result =
                executor::invoke_action(session.driver()?, &target.id, &target.selector, &t).await?;
            Ok(serde_json::to_value(result)?)
        }

        Command::SelectRow { index } => {
            let metadata = metadata.ok_or(FioriError::NoSession)?;
            let table = primary_table(metadata)?;
            let selection = executor::select_row(session.driver()?, &table.list_ul_id, *index, &t).await?;
            Ok(serde_json::to_value(selection)?)
        }

        Command::OpenObjectPage { index } => {
            let metadata = metadata.ok_or(FioriError::NoSession)?;
            let table = primary_table(metadata)?;
            let driver = session.driver()?;
            let signal = executor::open_object_page(driver, &table.list_ul_id, *index, &t).await?;
            let url = driver.current_url().await?;
            Ok(json!({ "signal": signal, "url": url }))
        }

        Command::GetObjectActions => {
            let result = scan(session.driver()?, ScanOptions::default()).await?;
            let actions = reconciler::object_actions(&result.controls);
            Ok(json!({ "actions": actions }))
        }

        Command::ExecuteObjectAction { action } => {
            let driver = session.driver()?;
            let result = scan(driver, ScanOptions::default()).await?;
            let actions = reconciler::object_actions(&result.controls);
            let target = resolver::resolve_action(&actions, action)?;
            println!("  {} {}", "▶".green(), target.text.cyan());
            let outcome = executor::invoke_action(driver, &target.id, &target.selector, &t).await?;
            Ok(serde_json::to_value(outcome)?)
        }

        Command::GetObjectFields => {
            let value = session
                .driver()?
                .evaluate(scripts::READ_OBJECT_FIELDS, Value::Null)
                .await?;
            let fields: Vec<ObjectField> = serde_json::from_value(value).unwrap_or_default();
            Ok(json!({ "fields": fields }))
        }

        Command::FillFormField { name, value } => {
            let driver = session.driver()?;
            let probe = scenario::probe(driver).await?;
            let in_dialog = probe.dialog_with_form_and_footer;
            let fields = scenario::extract_form_fields(driver, in_dialog).await?;
            let field = resolver::resolve_form_field(name, &fields, probe.object_page && !in_dialog)?;
            executor::fill_field(driver, field, value).await?;
            Ok(json!({ "field": field.display_name(), "label": field.label, "value": value }))
        }

        Command::SubmitForm => {
            let result = executor::submit_form(session.driver()?, &t).await?;
            Ok(serde_json::to_value(result)?)
        }

        Command::DiscardDraft => {
            let result = executor::discard_draft(session.driver()?, &t).await?;
            Ok(serde_json::to_value(result)?)
        }

        Command::GetMessages => {
            let messages = scenario::extract_messages(session.driver()?).await?;
            Ok(json!({ "messages": messages }))
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectField {
    pub label: String,
    pub value: String,
}

async fn extract(session: &mut Session, skip_dialog: bool, merge: bool) -> Result<Value> {
    let t = session.timeouts().clone();
    let path = session.config.metadata_path.clone();
    let driver = session.driver()?;

    println!("{} Scanning controls...", "🔍".blue());
    let result = scan(driver, ScanOptions::default()).await?;
    if !result.ready {
        anyhow::bail!("UI5 runtime not found on {}", driver.current_url().await?);
    }

    let mut dialog_columns: HashMap<String, Vec<String>> = HashMap::new();
    if !skip_dialog {
        for table in reconciler::reconcile_tables(&result.controls) {
            println!(
                "{} Reading column settings of {}",
                "📋".blue(),
                crate::ui5::ids::local_id(&table.table_id)
            );
            match column_dialog::read_column_labels(driver, &table.table_id, t.element_ms, t.poll_interval_ms)
                .await
            {
                Ok(labels) => {
                    dialog_columns.insert(table.table_id, labels);
                }
                Err(e) => {
                    warn!("Skipping column settings of {}: {:#}", table.table_id, e);
                    if let Err(e) = driver.evaluate(scripts::CLOSE_TOP_DIALOG, Value::Null).await {
                        warn!("Could not close settings dialog: {:#}", e);
                    }
                }
            }
        }
    }

    let mut metadata = reconciler::reconcile(&result.controls, &dialog_columns);
    if merge {
        match store::load(&path) {
            Ok(existing) => metadata = reconciler::merge_metadata(existing, metadata),
            Err(e) => info!("Nothing to merge with: {:#}", e),
        }
    }

    store::save(&path, &metadata)?;
    println!(
        "{} Saved {} filters and {} tables to {}",
        "💾".green(),
        metadata.filters.len(),
        metadata.tables.len(),
        path.display()
    );

    let summary = json!({
        "path": path.display().to_string(),
        "controls": result.controls.len(),
        "skipped": result.skipped,
        "filters": metadata.filters.len(),
        "tables": metadata.tables.iter().map(|t| json!({
            "tableId": t.table_id,
            "columns": t.columns.len(),
            "actions": t.actions.len(),
            "customActions": t.custom_actions.len(),
        })).collect::<Vec<_>>(),
    });
    session.set_metadata(metadata);
    Ok(summary)
}
