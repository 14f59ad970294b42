//! Metadata reconciler
//!
//! Folds one or more scans, plus the labels read from each table's column
//! settings dialog, into the canonical [`Metadata`]. Every merge is
//! "first discovered wins, later sources only add", expressed once in
//! [`merge_by_key`].

use log::debug;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use super::types::*;
use crate::ui5::control::{is_filter_field, Control, ControlRole, FilterItem, InnerHint};
use crate::ui5::ids;

/// `existing ∪ (incoming \ keysOf(existing))`
///
/// Order is preserved: existing items first, then novel incoming items in
/// their original order. Duplicates inside `incoming` collapse to their
/// first occurrence as well.
pub fn merge_by_key<T, K, F>(existing: Vec<T>, incoming: impl IntoIterator<Item = T>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen: HashSet<K> = HashSet::new();
    let mut merged = Vec::with_capacity(existing.len());
    for item in existing.into_iter().chain(incoming) {
        if seen.insert(key(&item)) {
            merged.push(item);
        }
    }
    merged
}

/// Build the canonical model from a scan and the per-table dialog labels
///
/// `dialog_columns` maps a table root id to the labels its settings dialog
/// listed; tables without an entry are left as scanned.
pub fn reconcile(controls: &[Control], dialog_columns: &HashMap<String, Vec<String>>) -> Metadata {
    let filters = reconcile_filters(controls);
    let tables = reconcile_tables(controls)
        .into_iter()
        .map(|mut table| {
            if let Some(labels) = dialog_columns.get(&table.table_id) {
                table.columns = merge_dialog_columns(table.columns, labels);
            }
            table
        })
        .collect();

    Metadata { filters, tables }
}

/// Merge a later extraction into an earlier one without overwriting
pub fn merge_metadata(existing: Metadata, incoming: Metadata) -> Metadata {
    let filters = merge_by_key(existing.filters, incoming.filters, |f| f.property_key.clone());

    let mut incoming_tables: HashMap<String, TableDescriptor> = incoming
        .tables
        .iter()
        .map(|t| (t.table_id.clone(), t.clone()))
        .collect();

    let mut tables: Vec<TableDescriptor> = existing
        .tables
        .into_iter()
        .map(|mut table| {
            if let Some(newer) = incoming_tables.remove(&table.table_id) {
                table.actions = merge_by_key(table.actions, newer.actions, |a| a.id.clone());
                table.custom_actions =
                    merge_by_key(table.custom_actions, newer.custom_actions, |a| a.id.clone());
                table.columns = merge_by_key(table.columns, newer.columns, column_key);
            }
            table
        })
        .collect();

    // Novel tables keep their discovery order
    for table in incoming.tables {
        if incoming_tables.contains_key(&table.table_id) {
            tables.push(table);
        }
    }

    Metadata { filters, tables }
}

// ============================================================================
// Filters
// ============================================================================

pub fn reconcile_filters(controls: &[Control]) -> Vec<FilterDescriptor> {
    // Primary bar: most items, first seen on ties
    let primary = controls
        .iter()
        .filter(|c| c.role == ControlRole::FilterBar)
        .fold(None::<&Control>, |best, c| match best {
            Some(b) if b.filter_items().len() >= c.filter_items().len() => Some(b),
            _ => Some(c),
        });

    let bar_items: Vec<FilterItem> = primary
        .map(|bar| bar.filter_items().to_vec())
        .unwrap_or_default();
    if let Some(bar) = primary {
        debug!("Primary filter bar {} with {} items", bar.id, bar_items.len());
    }

    let standalone: Vec<FilterItem> = controls
        .iter()
        .filter(|c| c.role != ControlRole::FilterBar && is_filter_field(&c.type_name, &c.id))
        .map(standalone_item)
        .collect();

    let items = merge_by_key(bar_items, standalone, |item| item.id.clone());
    let items = merge_by_key(Vec::new(), items, item_key);

    let descriptors = items.into_iter().map(filter_descriptor);
    merge_by_key(Vec::new(), descriptors, |f| f.property_key.clone())
}

/// Dedup key: property key, else local id, else raw id
fn item_key(item: &FilterItem) -> String {
    item.property_key
        .clone()
        .or_else(|| Some(item.local_id.clone()).filter(|l| !l.is_empty()))
        .unwrap_or_else(|| item.id.clone())
}

/// Filter-field controls outside the bar's item aggregation
///
/// Inner field parts (`...::FilterField::Plant-inner`) carry the same field
/// key and are folded together by the later key dedup.
fn standalone_item(control: &Control) -> FilterItem {
    FilterItem {
        id: control.id.clone(),
        local_id: control.local_id.clone(),
        label: control.display_label().map(str::to_string),
        property_key: ids::derive_field_key(&control.id)
            .or_else(|| control.bindings.get("value").map(|p| p.trim_start_matches('/').to_string())),
        hint: InnerHint::Field,
        inner_input_id: None,
        inner_select_id: None,
        inner_date_id: None,
    }
}

fn filter_descriptor(item: FilterItem) -> FilterDescriptor {
    let property_key = item_key(&item);
    let label = item.label.clone().unwrap_or_else(|| property_key.clone());

    let selectors = FilterSelectors {
        filter_field_css: Some(ids::css_id(&item.id)),
        input_css: item.inner_input_id.as_deref().map(ids::css_id),
        select_css: item.inner_select_id.as_deref().map(ids::css_id),
        date_css: item.inner_date_id.as_deref().map(ids::css_id),
    };

    FilterDescriptor {
        property_key,
        label,
        filter_field_id: item.id,
        local_id: item.local_id,
        selectors,
    }
}

// ============================================================================
// Tables
// ============================================================================

const STANDARD_ACTION_MARKER: &str = "::StandardAction::";
const CUSTOM_ACTION_MARKERS: &[&str] = &[
    "::CustomAction::",
    "::DataFieldForAction::",
    "::DataFieldForIntentBasedNavigation::",
];
const OVERFLOW_MARKERS: &[&str] = &["-overflowButton", "overflowToggle", "-moreButton"];

/// Best-effort id-pattern classification of a button
///
/// The framework does not tag developer-added buttons, so anything that
/// matches neither the standard nor the custom conventions is a candidate.
pub fn classify_action(id: &str) -> ActionType {
    if id.contains(STANDARD_ACTION_MARKER)
        || id.ends_with(ids::EXPORT_SUFFIX)
        || id.ends_with(ids::SETTINGS_SUFFIX)
        || OVERFLOW_MARKERS.iter().any(|m| id.contains(m))
    {
        ActionType::Standard
    } else if CUSTOM_ACTION_MARKERS.iter().any(|m| id.contains(m)) {
        ActionType::Custom
    } else {
        ActionType::CustomCandidate
    }
}

pub fn action_descriptor(control: &Control) -> ActionDescriptor {
    let text = control
        .display_label()
        .map(str::to_string)
        .unwrap_or_else(|| action_name_from_id(&control.id));
    ActionDescriptor {
        id: control.id.clone(),
        text,
        action_type: classify_action(&control.id),
        selector: ids::css_id(&control.id),
    }
}

/// Last structural segment of an action id, e.g. `Create` for
/// `...::StandardAction::Create`
fn action_name_from_id(id: &str) -> String {
    let local = ids::local_id(id);
    local
        .rsplit("::")
        .next()
        .unwrap_or(local)
        .trim_start_matches('-')
        .to_string()
}

pub fn reconcile_tables(controls: &[Control]) -> Vec<TableDescriptor> {
    let roots = merge_by_key(
        Vec::new(),
        controls
            .iter()
            .filter(|c| ids::is_line_item_table(&c.id))
            .map(|c| c.id.clone()),
        |id| id.clone(),
    );

    roots
        .into_iter()
        .map(|root| table_descriptor(&root, controls))
        .collect()
}

fn table_descriptor(root: &str, controls: &[Control]) -> TableDescriptor {
    let (inner_table_id, list_ul_id) = ids::table_companions(root);
    let toolbar_prefix = format!("{}{}", root, ids::TOOLBAR_SUFFIX);
    let column_prefix = format!("{}{}", root, ids::COLUMN_INFIX);

    let candidates = controls.iter().filter(|c| {
        c.role == ControlRole::Button
            && !c.id.contains(&column_prefix)
            && (c.id.starts_with(&toolbar_prefix)
                || c.id.starts_with(&format!("{}::", root))
                || c.id == format!("{}{}", root, ids::EXPORT_SUFFIX)
                || c.id == format!("{}{}", root, ids::SETTINGS_SUFFIX))
    });
    let actions = merge_by_key(Vec::new(), candidates.map(action_descriptor), |a| a.id.clone());
    let custom_actions = actions
        .iter()
        .filter(|a| a.action_type != ActionType::Standard)
        .cloned()
        .collect();

    let columns = controls.iter().filter_map(|c| {
        let key = ids::derive_column_key(&c.id, root)?;
        Some(ColumnDescriptor {
            label: c.display_label().map(str::to_string).unwrap_or_else(|| key.clone()),
            property_key: Some(key),
            header_column_id: Some(c.id.clone()),
            header_column_css: Some(ids::css_id(&c.id)),
            label_only: false,
        })
    });
    let columns = merge_by_key(Vec::new(), columns, column_key);

    debug!(
        "Table {}: {} actions, {} columns",
        root,
        actions.len(),
        columns.len()
    );

    TableDescriptor {
        selectors: TableSelectors {
            table: ids::css_id(root),
            inner_table: ids::css_id(&inner_table_id),
            row_list: ids::css_id(&list_ul_id),
            select_all: ids::css_id(&format!("{}{}", inner_table_id, ids::SELECT_ALL_SUFFIX)),
        },
        table_id: root.to_string(),
        inner_table_id,
        list_ul_id,
        actions,
        custom_actions,
        columns,
    }
}

/// Object page actions: visible buttons outside any table scope that follow
/// the standard or custom action id conventions
pub fn object_actions(controls: &[Control]) -> Vec<ActionDescriptor> {
    let actions = controls
        .iter()
        .filter(|c| {
            c.role == ControlRole::Button
                && c.visible
                && !c.id.contains(ids::TABLE_MARKER)
                && (c.id.contains(STANDARD_ACTION_MARKER)
                    || CUSTOM_ACTION_MARKERS.iter().any(|m| c.id.contains(m)))
        })
        .map(action_descriptor);
    merge_by_key(Vec::new(), actions, |a| a.id.clone())
}

fn column_key(column: &ColumnDescriptor) -> String {
    column
        .property_key
        .clone()
        .unwrap_or_else(|| format!("label:{}", column.label))
}

/// Append dialog-sourced labels that no existing column carries
pub fn merge_dialog_columns(columns: Vec<ColumnDescriptor>, labels: &[String]) -> Vec<ColumnDescriptor> {
    let known: HashSet<String> = columns.iter().map(|c| c.label.clone()).collect();
    let novel = labels
        .iter()
        .filter(|label| !known.contains(label.as_str()))
        .map(|label| ColumnDescriptor {
            property_key: None,
            label: label.clone(),
            header_column_id: None,
            header_column_css: None,
            label_only: true,
        });
    let mut out = columns;
    out.extend(merge_by_key(Vec::new(), novel, |c| c.label.clone()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui5::control::{ControlDetail, InnerHint};
    use std::collections::BTreeMap;

    const TABLE: &str = "app--fe::table::Orders::LineItem";
    const BAR: &str = "app--fe::FilterBar::Orders";

    fn control(id: &str, type_name: &str, role: ControlRole, text: Option<&str>) -> Control {
        Control {
            id: id.to_string(),
            local_id: ids::local_id(id).to_string(),
            type_name: type_name.to_string(),
            role,
            visible: true,
            enabled: true,
            aria_role: None,
            aria_label: None,
            aria_described_by: None,
            placeholder: None,
            value: None,
            text: text.map(str::to_string),
            tooltip: None,
            bindings: BTreeMap::new(),
            detail: ControlDetail::None,
        }
    }

    fn item(key: &str, label: &str, hint: InnerHint) -> FilterItem {
        let id = format!("{}::FilterField::{}", BAR, key);
        FilterItem {
            local_id: ids::local_id(&id).to_string(),
            id: id.clone(),
            label: Some(label.to_string()),
            property_key: Some(key.to_string()),
            hint,
            inner_input_id: (hint == InnerHint::Input).then(|| format!("{}-inner", id)),
            inner_select_id: (hint == InnerHint::Select).then(|| format!("{}-arrow", id)),
            inner_date_id: None,
        }
    }

    fn bar(id: &str, items: Vec<FilterItem>) -> Control {
        let mut c = control(id, "sap.ui.mdc.FilterBar", ControlRole::FilterBar, None);
        c.detail = ControlDetail::FilterBar { items };
        c
    }

    fn button(id: &str, text: &str) -> Control {
        control(id, "sap.m.Button", ControlRole::Button, Some(text))
    }

    fn column(key: &str, label: &str) -> Control {
        control(
            &format!("{}::C::{}", TABLE, key),
            "sap.ui.mdc.table.Column",
            ControlRole::Other,
            Some(label),
        )
    }

    fn page() -> Vec<Control> {
        vec![
            bar(BAR, vec![
                item("CompanyCode", "Company Code", InnerHint::Input),
                item("Plant", "Plant", InnerHint::Select),
            ]),
            bar("app--small", vec![item("Other", "Other", InnerHint::Field)]),
            control(
                "app--fe::FilterBar::Orders::FilterField::Plant",
                "sap.ui.mdc.FilterField",
                ControlRole::Input,
                Some("Plant"),
            ),
            control(
                "app--fe::FilterField::Region",
                "sap.ui.mdc.FilterField",
                ControlRole::Input,
                Some("Region"),
            ),
            control(TABLE, "sap.ui.mdc.Table", ControlRole::Table, None),
            column("OrderID", "Order"),
            column("NetAmount", "Net Amount"),
            control(
                &format!("{}::C::NetAmount-innerColumnHeader", TABLE),
                "sap.m.Label",
                ControlRole::Other,
                Some("Net Amount (header)"),
            ),
            button(&format!("{}::StandardAction::Create", TABLE), "Create"),
            button(&format!("{}::CustomAction::Approve", TABLE), "Approve"),
            button(&format!("{}::DataFieldForAction::Srv.Reject", TABLE), "Reject"),
            button(&format!("{}-toolbar-refresh", TABLE), "Refresh"),
            button(&format!("{}-export", TABLE), "Export"),
            button("app--unrelated", "Elsewhere"),
        ]
    }

    #[test]
    fn test_merge_by_key_first_wins_and_appends() {
        let merged = merge_by_key(vec![(1, "a"), (2, "b")], vec![(2, "x"), (3, "c"), (3, "y")], |p| p.0);
        assert_eq!(merged, vec![(1, "a"), (2, "b"), (3, "c")]);
    }

    #[test]
    fn test_filters_use_primary_bar_and_standalone_fields() {
        let filters = reconcile_filters(&page());
        let keys: Vec<_> = filters.iter().map(|f| f.property_key.as_str()).collect();
        assert_eq!(keys, vec!["CompanyCode", "Plant", "Region"]);

        let company = &filters[0];
        assert_eq!(company.label, "Company Code");
        assert!(company.selectors.input_css.is_some());
        let plant = &filters[1];
        assert!(plant.selectors.input_css.is_none());
        assert!(plant.selectors.select_css.is_some());
        assert_eq!(filters[2].selectors.filter_field_css.as_deref(), Some("#app--fe\\:\\:FilterField\\:\\:Region"));
    }

    #[test]
    fn test_primary_bar_tie_goes_to_first_seen() {
        let controls = vec![
            bar("app--first", vec![item("A", "A", InnerHint::Input)]),
            bar("app--second", vec![item("B", "B", InnerHint::Input)]),
        ];
        let keys: Vec<_> = reconcile_filters(&controls)
            .into_iter()
            .map(|f| f.property_key)
            .collect();
        assert_eq!(keys, vec!["A"]);
    }

    #[test]
    fn test_filter_keys_are_stable_across_discovery_order() {
        let forward: HashSet<_> = reconcile_filters(&page())
            .into_iter()
            .map(|f| f.property_key)
            .collect();
        let mut reversed = page();
        reversed.reverse();
        let backward: HashSet<_> = reconcile_filters(&reversed)
            .into_iter()
            .map(|f| f.property_key)
            .collect();
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let first = reconcile(&page(), &HashMap::new());
        let second = reconcile(&page(), &HashMap::new());
        assert_eq!(first, second);
    }

    #[test]
    fn test_table_actions_and_classification() {
        let tables = reconcile_tables(&page());
        assert_eq!(tables.len(), 1);
        let table = &tables[0];
        assert_eq!(table.inner_table_id, format!("{}-innerTable", TABLE));
        assert_eq!(table.list_ul_id, format!("{}-innerTable-listUl", TABLE));

        let kinds: Vec<_> = table
            .actions
            .iter()
            .map(|a| (a.text.as_str(), a.action_type))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("Create", ActionType::Standard),
                ("Approve", ActionType::Custom),
                ("Reject", ActionType::Custom),
                ("Refresh", ActionType::CustomCandidate),
                ("Export", ActionType::Standard),
            ]
        );
        assert_eq!(table.custom_actions.len(), 3);
    }

    #[test]
    fn test_columns_dedup_by_derived_key() {
        let table = &reconcile_tables(&page())[0];
        let cols: Vec<_> = table
            .columns
            .iter()
            .map(|c| (c.property_key.as_deref(), c.label.as_str()))
            .collect();
        assert_eq!(cols, vec![(Some("OrderID"), "Order"), (Some("NetAmount"), "Net Amount")]);
    }

    #[test]
    fn test_dialog_columns_only_add_novel_labels() {
        let mut dialog = HashMap::new();
        dialog.insert(
            TABLE.to_string(),
            vec!["Order".to_string(), "Created On".to_string(), "Created On".to_string()],
        );
        let metadata = reconcile(&page(), &dialog);
        let columns = &metadata.tables[0].columns;
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0].property_key.as_deref(), Some("OrderID"));
        assert!(!columns[0].label_only);
        assert_eq!(columns[2].label, "Created On");
        assert!(columns[2].label_only);
        assert!(columns[2].property_key.is_none());
    }

    #[test]
    fn test_dialog_merge_keeps_key_columns_sharing_a_label() {
        let mut controls = page();
        controls.push(column("TaxAmount", "Net Amount"));
        let mut dialog = HashMap::new();
        dialog.insert(
            TABLE.to_string(),
            vec!["Net Amount".to_string(), "Created On".to_string()],
        );
        let metadata = reconcile(&controls, &dialog);
        let cols: Vec<_> = metadata.tables[0]
            .columns
            .iter()
            .map(|c| (c.property_key.as_deref(), c.label.as_str(), c.label_only))
            .collect();
        assert_eq!(
            cols,
            vec![
                (Some("OrderID"), "Order", false),
                (Some("NetAmount"), "Net Amount", false),
                (Some("TaxAmount"), "Net Amount", false),
                (None, "Created On", true),
            ]
        );
    }

    #[test]
    fn test_no_duplicate_keys_after_merge() {
        let first = reconcile(&page(), &HashMap::new());
        let second = reconcile(&page(), &HashMap::new());
        let merged = merge_metadata(first, second);

        let keys: Vec<_> = merged.filters.iter().map(|f| &f.property_key).collect();
        let unique: HashSet<_> = keys.iter().collect();
        assert_eq!(keys.len(), unique.len());

        let cols: Vec<_> = merged.tables[0]
            .columns
            .iter()
            .filter_map(|c| c.property_key.as_ref())
            .collect();
        let unique: HashSet<_> = cols.iter().collect();
        assert_eq!(cols.len(), unique.len());
        assert_eq!(merged.tables.len(), 1);
    }

    #[test]
    fn test_merge_metadata_appends_new_tables() {
        let first = reconcile(&page(), &HashMap::new());
        let other = "app--fe::table::Items::LineItem";
        let second = reconcile(
            &[control(other, "sap.ui.mdc.Table", ControlRole::Table, None)],
            &HashMap::new(),
        );
        let merged = merge_metadata(first, second);
        let ids: Vec<_> = merged.tables.iter().map(|t| t.table_id.as_str()).collect();
        assert_eq!(ids, vec![TABLE, other]);
    }

    #[test]
    fn test_object_actions_skip_table_scope() {
        let mut hidden = button("app--op::StandardAction::Delete", "Delete");
        hidden.visible = false;
        let controls = vec![
            button("app--op::StandardAction::Edit", "Edit"),
            button("app--op::CustomAction::Release", "Release"),
            button("app--op::FooterBar::StandardAction::Save", "Save"),
            button(&format!("{}::StandardAction::Create", TABLE), "Create"),
            button("app--op--someButton", "Other"),
            hidden,
        ];
        let actions = object_actions(&controls);
        let texts: Vec<_> = actions.iter().map(|a| a.text.as_str()).collect();
        assert_eq!(texts, vec!["Edit", "Release", "Save"]);
        assert_eq!(actions[1].action_type, ActionType::Custom);
    }

    #[test]
    fn test_classify_action_patterns() {
        assert_eq!(classify_action("x::StandardAction::Delete"), ActionType::Standard);
        assert_eq!(classify_action("x-settings"), ActionType::Standard);
        assert_eq!(classify_action("x-overflowButton"), ActionType::Standard);
        assert_eq!(classify_action("x::CustomAction::Go"), ActionType::Custom);
        assert_eq!(
            classify_action("x::DataFieldForIntentBasedNavigation::Nav"),
            ActionType::Custom
        );
        assert_eq!(classify_action("x--myButton"), ActionType::CustomCandidate);
    }
}
