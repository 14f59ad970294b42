//! Identifier codec
//!
//! UI5 element ids are generated and change between sessions, but their
//! structure follows fixed conventions: a view prefix separated by `--`, a
//! table scope `::table::<Entity>::LineItem`, column ids `<table>::C::<key>`
//! and filter fields `::FilterField::<key>`. These helpers turn raw ids into
//! CSS selectors and extract the stable segments.

/// Separator between the view prefix and the view-relative part of an id
pub const NAMESPACE_SEPARATOR: &str = "--";

/// Marks an id as living inside a table building block
pub const TABLE_MARKER: &str = "::table::";
/// Suffix of the line-item table root
pub const LINE_ITEM_SUFFIX: &str = "::LineItem";
/// Infix between a table root and a column key
pub const COLUMN_INFIX: &str = "::C::";
/// Infix before a filter field key
pub const FILTER_FIELD_INFIX: &str = "::FilterField::";

pub const INNER_TABLE_SUFFIX: &str = "-innerTable";
pub const ROW_LIST_SUFFIX: &str = "-listUl";
pub const SELECT_ALL_SUFFIX: &str = "-sa";
pub const TOOLBAR_SUFFIX: &str = "-toolbar";
pub const EXPORT_SUFFIX: &str = "-export";
pub const SETTINGS_SUFFIX: &str = "-settings";

/// Characters that must be escaped inside a CSS id selector
const SPECIAL_CHARS: &[char] = &[
    ' ', '#', '.', ';', '?', '+', '*', '~', '\'', '"', '!', '^', '$', '[', ']', '(', ')', '=',
    '>', '|', '/', '@', ':', '%', '&', ',',
];

/// Escape every structurally significant character with a backslash
///
/// Ids without any such character are returned unchanged.
pub fn escape_selector(raw_id: &str) -> String {
    let mut escaped = String::with_capacity(raw_id.len() + 8);
    for c in raw_id.chars() {
        if SPECIAL_CHARS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// `#<escaped id>`
pub fn css_id(raw_id: &str) -> String {
    format!("#{}", escape_selector(raw_id))
}

/// View-relative part of an id (after the last `--`)
pub fn local_id(raw_id: &str) -> &str {
    match raw_id.rsplit_once(NAMESPACE_SEPARATOR) {
        Some((_, local)) => local,
        None => raw_id,
    }
}

/// Whether the id belongs to a view (carries a namespace prefix)
pub fn is_view_scoped(raw_id: &str) -> bool {
    raw_id.contains(NAMESPACE_SEPARATOR)
}

/// Whether the id is the root of a line-item table
pub fn is_line_item_table(raw_id: &str) -> bool {
    raw_id.contains(TABLE_MARKER) && raw_id.ends_with(LINE_ITEM_SUFFIX)
}

/// Column key from `<tableBase>::C::<key>[-suffix]`
///
/// Returns `None` when the id does not carry the table's column infix; such
/// columns cannot be labelled and are skipped by callers.
pub fn derive_column_key(column_id: &str, table_base_id: &str) -> Option<String> {
    let infix = format!("{}{}", table_base_id, COLUMN_INFIX);
    let start = column_id.find(&infix)? + infix.len();
    first_segment(&column_id[start..])
}

/// Field key from `...::FilterField::<key>[-suffix]`
pub fn derive_field_key(field_id: &str) -> Option<String> {
    let start = field_id.rfind(FILTER_FIELD_INFIX)? + FILTER_FIELD_INFIX.len();
    first_segment(&field_id[start..])
}

fn first_segment(rest: &str) -> Option<String> {
    let key = rest.split('-').next().unwrap_or_default();
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}

/// Structural segments of a composite id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdSegments {
    /// Table root the id is scoped to
    pub table_base: Option<String>,
    pub column_key: Option<String>,
    pub field_key: Option<String>,
}

/// Split a composite id into its table, column and field segments
pub fn split_segments(raw_id: &str) -> IdSegments {
    let table_base = if is_line_item_table(raw_id) {
        Some(raw_id.to_string())
    } else {
        raw_id
            .find(LINE_ITEM_SUFFIX)
            .filter(|_| raw_id.contains(TABLE_MARKER))
            .map(|pos| raw_id[..pos + LINE_ITEM_SUFFIX.len()].to_string())
    };

    let column_key = table_base
        .as_deref()
        .and_then(|base| derive_column_key(raw_id, base));

    IdSegments {
        table_base,
        column_key,
        field_key: derive_field_key(raw_id),
    }
}

/// Companion ids of a table root: (inner table, row list)
pub fn table_companions(table_id: &str) -> (String, String) {
    let inner = format!("{}{}", table_id, INNER_TABLE_SUFFIX);
    let list = format!("{}{}", inner, ROW_LIST_SUFFIX);
    (inner, list)
}
