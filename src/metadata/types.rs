use serde::{Deserialize, Serialize};

/// Canonical reconciled model, persisted as JSON
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default)]
    pub filters: Vec<FilterDescriptor>,
    #[serde(default)]
    pub tables: Vec<TableDescriptor>,
}

impl Metadata {
    /// The table action commands operate on
    pub fn primary_table(&self) -> Option<&TableDescriptor> {
        self.tables.first()
    }

    /// `key (label)` pairs, used to enumerate alternatives
    pub fn filter_pairs(&self) -> Vec<String> {
        self.filters
            .iter()
            .map(|f| format!("{} ({})", f.property_key, f.label))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSelectors {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_field_css: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_css: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select_css: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_css: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterDescriptor {
    /// Stable key, never the volatile raw id
    pub property_key: String,
    pub label: String,
    pub filter_field_id: String,
    pub local_id: String,
    pub selectors: FilterSelectors,
}

/// How a filter is driven, picked by selector precedence
#[derive(Debug, Clone, PartialEq)]
pub enum FilterTarget<'a> {
    Input(&'a str),
    Select(&'a str),
    Date(&'a str),
    Field(&'a str),
}

impl FilterDescriptor {
    /// Direct input first, then dropdown trigger, then date input, then the
    /// generic field container
    pub fn target(&self) -> Option<FilterTarget<'_>> {
        let s = &self.selectors;
        if let Some(css) = s.input_css.as_deref() {
            Some(FilterTarget::Input(css))
        } else if let Some(css) = s.select_css.as_deref() {
            Some(FilterTarget::Select(css))
        } else if let Some(css) = s.date_css.as_deref() {
            Some(FilterTarget::Date(css))
        } else {
            s.filter_field_css.as_deref().map(FilterTarget::Field)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSelectors {
    pub table: String,
    pub inner_table: String,
    pub row_list: String,
    pub select_all: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDescriptor {
    pub table_id: String,
    pub inner_table_id: String,
    pub list_ul_id: String,
    pub selectors: TableSelectors,
    #[serde(default)]
    pub actions: Vec<ActionDescriptor>,
    /// Subset of `actions` that are not framework standard actions
    #[serde(default)]
    pub custom_actions: Vec<ActionDescriptor>,
    #[serde(default)]
    pub columns: Vec<ColumnDescriptor>,
}

impl TableDescriptor {
    /// Column key for a header column id, if it maps to a key-bearing column
    pub fn key_for_column(&self, column_id: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.header_column_id.as_deref() == Some(column_id))
            .and_then(|c| c.property_key.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    /// Absent for columns only known from the settings dialog
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_key: Option<String>,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_column_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_column_css: Option<String>,
    /// Cannot be used for row-key mapping
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub label_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Standard,
    Custom,
    CustomCandidate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDescriptor {
    pub id: String,
    pub text: String,
    pub action_type: ActionType,
    pub selector: String,
}
