//! Row extraction
//!
//! Always a fresh pass over the rendered table; snapshots are never
//! persisted.

use anyhow::Result;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

use super::types::TableDescriptor;
use crate::driver::common::collapse_whitespace;
use crate::driver::traits::PageDriver;
use crate::ui5::{ids, scripts};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawRows {
    pub header: Vec<RawHeader>,
    pub rows: Vec<Vec<RawCell>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawHeader {
    pub column_id: String,
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawCell {
    pub column_id: String,
    pub direct: String,
    pub nested: Vec<String>,
}

impl RawCell {
    /// Direct text, or the nested inline texts joined by a space
    pub fn display_text(&self) -> String {
        if !self.direct.trim().is_empty() {
            collapse_whitespace(&self.direct)
        } else {
            collapse_whitespace(&self.nested.join(" "))
        }
    }
}

pub type Row = BTreeMap<String, String>;

/// Rows of one table, keyed by column property key
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowSnapshot {
    pub table_id: String,
    /// Column keys in header order
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

/// Map raw header and cells to property keys
///
/// Header columns whose key cannot be derived, either structurally or from
/// the table's known columns, are skipped along with their cells.
pub fn build_snapshot(raw: RawRows, table: &TableDescriptor) -> RowSnapshot {
    let mut key_by_column: BTreeMap<String, String> = BTreeMap::new();
    let mut columns = Vec::new();

    for header in &raw.header {
        let key = ids::derive_column_key(&header.column_id, &table.table_id)
            .or_else(|| table.key_for_column(&header.column_id).map(str::to_string));
        match key {
            Some(key) => {
                if !columns.contains(&key) {
                    columns.push(key.clone());
                }
                key_by_column.insert(header.column_id.clone(), key);
            }
            None => debug!(
                "Skipping unlabelable column {} ({})",
                header.column_id, header.text
            ),
        }
    }

    let rows = raw
        .rows
        .iter()
        .map(|cells| {
            cells
                .iter()
                .filter_map(|cell| {
                    let key = key_by_column
                        .get(&cell.column_id)
                        .cloned()
                        .or_else(|| ids::derive_column_key(&cell.column_id, &table.table_id))?;
                    Some((key, cell.display_text()))
                })
                .collect::<Row>()
        })
        .collect();

    RowSnapshot {
        table_id: table.table_id.clone(),
        columns,
        rows,
    }
}

/// Read the currently rendered rows of `table`
pub async fn read_rows(driver: &dyn PageDriver, table: &TableDescriptor) -> Result<RowSnapshot> {
    let value = driver
        .evaluate(scripts::READ_ROWS, json!({ "listId": table.list_ul_id }))
        .await?;
    let raw: RawRows = serde_json::from_value(value).unwrap_or_default();
    let snapshot = build_snapshot(raw, table);
    debug!(
        "Read {} rows from {}",
        snapshot.rows.len(),
        snapshot.table_id
    );
    Ok(snapshot)
}
