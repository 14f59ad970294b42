//! Control model and role classification
//!
//! The in-page scan returns one neutral [`RawEntry`] per registry element.
//! Classification and filtering happen here, in plain Rust, so they can be
//! tested without a browser.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ids;

/// Functional category of a control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ControlRole {
    Button,
    Input,
    Select,
    Table,
    FilterBar,
    Dialog,
    Link,
    Other,
}

/// Ordered (type prefix, role) table; the first matching prefix wins
///
/// Order follows role priority: button, input, select, table/list,
/// filter bar, dialog, link.
pub const ROLE_TABLE: &[(&str, ControlRole)] = &[
    ("sap.m.Button", ControlRole::Button),
    ("sap.m.ToggleButton", ControlRole::Button),
    ("sap.m.MenuButton", ControlRole::Button),
    ("sap.m.OverflowToolbarButton", ControlRole::Button),
    ("sap.m.SegmentedButton", ControlRole::Button),
    ("sap.ushell.ui.shell.ShellHeadItem", ControlRole::Button),
    ("sap.m.Input", ControlRole::Input),
    ("sap.m.TextArea", ControlRole::Input),
    ("sap.m.SearchField", ControlRole::Input),
    ("sap.m.DatePicker", ControlRole::Input),
    ("sap.m.DateRangeSelection", ControlRole::Input),
    ("sap.m.DateTimePicker", ControlRole::Input),
    ("sap.m.TimePicker", ControlRole::Input),
    ("sap.m.StepInput", ControlRole::Input),
    ("sap.m.CheckBox", ControlRole::Input),
    ("sap.ui.mdc.FilterField", ControlRole::Input),
    ("sap.ui.mdc.Field", ControlRole::Input),
    ("sap.ui.mdc.MultiValueField", ControlRole::Input),
    ("sap.ui.comp.smartfield.SmartField", ControlRole::Input),
    ("sap.m.Select", ControlRole::Select),
    ("sap.m.ComboBox", ControlRole::Select),
    ("sap.m.MultiComboBox", ControlRole::Select),
    ("sap.m.MultiInput", ControlRole::Select),
    ("sap.ui.mdc.Table", ControlRole::Table),
    ("sap.m.Table", ControlRole::Table),
    ("sap.m.List", ControlRole::Table),
    ("sap.m.Tree", ControlRole::Table),
    ("sap.ui.table.Table", ControlRole::Table),
    ("sap.ui.table.TreeTable", ControlRole::Table),
    ("sap.ui.table.AnalyticalTable", ControlRole::Table),
    ("sap.ui.comp.smarttable.SmartTable", ControlRole::Table),
    ("sap.ui.mdc.FilterBar", ControlRole::FilterBar),
    ("sap.fe.core.controls.FilterBar", ControlRole::FilterBar),
    ("sap.fe.macros.filterBar.FilterBarAPI", ControlRole::FilterBar),
    ("sap.ui.comp.filterbar.FilterBar", ControlRole::FilterBar),
    ("sap.ui.comp.smartfilterbar.SmartFilterBar", ControlRole::FilterBar),
    ("sap.m.Dialog", ControlRole::Dialog),
    ("sap.m.Popover", ControlRole::Dialog),
    ("sap.m.ResponsivePopover", ControlRole::Dialog),
    ("sap.m.MessagePopover", ControlRole::Dialog),
    ("sap.m.Link", ControlRole::Link),
];

/// Namespaces of the launchpad shell and framework internals
pub const INTERNAL_NAMESPACES: &[&str] = &[
    "sap.ushell.",
    "sap.ui.core.",
    "sap.ui.unified.",
    "sap.ui.fl.",
    "sap.ui.dt.",
    "sap.ui.layout.",
];

/// Role of a type name, `Other` when no prefix matches
pub fn classify_role(type_name: &str) -> ControlRole {
    ROLE_TABLE
        .iter()
        .find(|(prefix, _)| type_name.starts_with(prefix))
        .map(|(_, role)| *role)
        .unwrap_or(ControlRole::Other)
}

/// Whether the type is on the interactive allowlist
pub fn is_interactive_type(type_name: &str) -> bool {
    classify_role(type_name) != ControlRole::Other
}

pub fn is_internal_type(type_name: &str) -> bool {
    INTERNAL_NAMESPACES
        .iter()
        .any(|ns| type_name.starts_with(ns))
}

/// Filter-field typed controls that can stand alone outside a filter bar
pub fn is_filter_field(type_name: &str, id: &str) -> bool {
    type_name.ends_with("FilterField") || id.contains(ids::FILTER_FIELD_INFIX)
}

// ============================================================================
// Raw scan records
// ============================================================================

/// One registry element as returned by the in-page scan
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawEntry {
    pub id: String,
    pub type_name: String,
    pub dom_present: bool,
    pub visible: bool,
    pub enabled: bool,
    pub aria_role: Option<String>,
    pub aria_label: Option<String>,
    pub aria_described_by: Option<String>,
    pub placeholder: Option<String>,
    pub value: Option<String>,
    pub text: Option<String>,
    pub title: Option<String>,
    pub label: Option<String>,
    pub tooltip: Option<String>,
    pub bindings: BTreeMap<String, String>,
    pub row_count: Option<u32>,
    pub column_count: Option<u32>,
    pub filter_items: Option<Vec<RawFilterItem>>,
    /// Set when the in-page extraction threw for this entry
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawFilterItem {
    pub id: String,
    pub label: Option<String>,
    pub property_key: Option<String>,
    pub field_path: Option<String>,
    pub inner_input_id: Option<String>,
    pub inner_select_id: Option<String>,
    pub inner_date_id: Option<String>,
}

// ============================================================================
// Controls
// ============================================================================

/// Inner control kind sniffed inside a filter item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InnerHint {
    Input,
    Select,
    Date,
    Field,
}

/// One filter-bar item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterItem {
    pub id: String,
    pub local_id: String,
    pub label: Option<String>,
    pub property_key: Option<String>,
    pub hint: InnerHint,
    pub inner_input_id: Option<String>,
    pub inner_select_id: Option<String>,
    pub inner_date_id: Option<String>,
}

impl FilterItem {
    fn from_raw(raw: RawFilterItem) -> Self {
        let property_key = non_empty(raw.property_key)
            .or_else(|| non_empty(raw.field_path))
            .or_else(|| ids::derive_field_key(&raw.id));

        let inner_input_id = non_empty(raw.inner_input_id);
        let inner_select_id = non_empty(raw.inner_select_id);
        let inner_date_id = non_empty(raw.inner_date_id);

        let hint = if inner_input_id.is_some() {
            InnerHint::Input
        } else if inner_select_id.is_some() {
            InnerHint::Select
        } else if inner_date_id.is_some() {
            InnerHint::Date
        } else {
            InnerHint::Field
        };

        Self {
            local_id: ids::local_id(&raw.id).to_string(),
            id: raw.id,
            label: non_empty(raw.label),
            property_key,
            hint,
            inner_input_id,
            inner_select_id,
            inner_date_id,
        }
    }
}

/// Role-specific nested data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ControlDetail {
    None,
    Table { rows: u32, columns: u32 },
    FilterBar { items: Vec<FilterItem> },
}

/// A live control with a render anchor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Control {
    pub id: String,
    pub local_id: String,
    pub type_name: String,
    pub role: ControlRole,
    pub visible: bool,
    pub enabled: bool,
    pub aria_role: Option<String>,
    pub aria_label: Option<String>,
    pub aria_described_by: Option<String>,
    pub placeholder: Option<String>,
    pub value: Option<String>,
    /// Display text from the first non-empty of text, title, label
    pub text: Option<String>,
    pub tooltip: Option<String>,
    pub bindings: BTreeMap<String, String>,
    pub detail: ControlDetail,
}

impl Control {
    /// Materialise a control, or `None` if the entry has no render anchor or
    /// failed extraction
    pub fn from_raw(raw: RawEntry) -> Option<Self> {
        if !raw.dom_present || raw.error.is_some() || raw.id.is_empty() {
            return None;
        }

        let role = classify_role(&raw.type_name);
        let detail = match role {
            ControlRole::Table => ControlDetail::Table {
                rows: raw.row_count.unwrap_or(0),
                columns: raw.column_count.unwrap_or(0),
            },
            ControlRole::FilterBar => ControlDetail::FilterBar {
                items: raw
                    .filter_items
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|item| !item.id.is_empty())
                    .map(FilterItem::from_raw)
                    .collect(),
            },
            _ => ControlDetail::None,
        };

        let text = non_empty(raw.text)
            .or_else(|| non_empty(raw.title))
            .or_else(|| non_empty(raw.label));

        Some(Self {
            local_id: ids::local_id(&raw.id).to_string(),
            id: raw.id,
            type_name: raw.type_name,
            role,
            visible: raw.visible,
            enabled: raw.enabled,
            aria_role: non_empty(raw.aria_role),
            aria_label: non_empty(raw.aria_label),
            aria_described_by: non_empty(raw.aria_described_by),
            placeholder: non_empty(raw.placeholder),
            value: raw.value,
            text,
            tooltip: non_empty(raw.tooltip),
            bindings: raw.bindings,
            detail,
        })
    }

    /// Best human-facing label: display text, then aria label, then tooltip
    pub fn display_label(&self) -> Option<&str> {
        self.text
            .as_deref()
            .or(self.aria_label.as_deref())
            .or(self.tooltip.as_deref())
    }

    pub fn filter_items(&self) -> &[FilterItem] {
        match &self.detail {
            ControlDetail::FilterBar { items } => items,
            _ => &[],
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
