//! Selector/action resolver
//!
//! Maps the human-facing name a caller passes (property key, label, action
//! text) to a concrete target in the reconciled metadata or the live form.
//! Matching is tiered and the first tier with a hit wins:
//!
//! - filters: exact key, exact label, normalised substring on either
//! - actions: exact id, exact text, normalised text
//! - form fields: normalised name, normalised label, normalised substring on
//!   name, label or id
//!
//! A miss is a [`FioriError::NotFound`] listing every valid alternative.

use anyhow::Result;

use crate::driver::common::normalize_name;
use crate::error::FioriError;
use crate::metadata::types::{ActionDescriptor, FilterDescriptor, Metadata, TableDescriptor};
use crate::runner::scenario::FormField;
use crate::ui5::ids;

pub fn resolve_filter<'a>(metadata: &'a Metadata, query: &str) -> Result<&'a FilterDescriptor> {
    let filters = &metadata.filters;
    let wanted = normalize_name(query);

    filters
        .iter()
        .find(|f| f.property_key == query)
        .or_else(|| filters.iter().find(|f| f.label == query))
        .or_else(|| {
            if wanted.is_empty() {
                return None;
            }
            filters.iter().find(|f| {
                normalize_name(&f.property_key).contains(&wanted)
                    || normalize_name(&f.label).contains(&wanted)
            })
        })
        .ok_or_else(|| FioriError::not_found("filter", query, metadata.filter_pairs()).into())
}

/// Resolve against the primary table's actions
pub fn resolve_table_action<'a>(metadata: &'a Metadata, query: &str) -> Result<&'a ActionDescriptor> {
    let table: Option<&TableDescriptor> = metadata.primary_table();
    let actions = table.map(|t| t.actions.as_slice()).unwrap_or_default();
    resolve_action(actions, query)
}

pub fn resolve_action<'a>(actions: &'a [ActionDescriptor], query: &str) -> Result<&'a ActionDescriptor> {
    let wanted = normalize_name(query);

    actions
        .iter()
        .find(|a| a.id == query)
        .or_else(|| actions.iter().find(|a| a.text == query))
        .or_else(|| {
            if wanted.is_empty() {
                return None;
            }
            actions.iter().find(|a| normalize_name(&a.text) == wanted)
        })
        .ok_or_else(|| {
            let alternatives = actions
                .iter()
                .map(|a| format!("{} ({})", a.text, a.id))
                .collect();
            FioriError::not_found("action", query, alternatives).into()
        })
}

/// Resolve a live form field
///
/// On an object page, filter-field inputs (the list report's filter bar can
/// stay rendered behind it) are only tried after every other field missed.
pub fn resolve_form_field<'a>(
    query: &str,
    fields: &'a [FormField],
    object_page: bool,
) -> Result<&'a FormField> {
    let wanted = normalize_name(query);

    let hit = if object_page {
        let (primary, fallback): (Vec<&FormField>, Vec<&FormField>) = fields
            .iter()
            .partition(|f| !f.id.contains(ids::FILTER_FIELD_INFIX));
        match_field(&primary, &wanted).or_else(|| match_field(&fallback, &wanted))
    } else {
        let all: Vec<&FormField> = fields.iter().collect();
        match_field(&all, &wanted)
    };

    hit.ok_or_else(|| {
        let alternatives = fields
            .iter()
            .map(|f| match &f.label {
                Some(label) => format!("{} ({})", f.display_name(), label),
                None => f.display_name().to_string(),
            })
            .collect();
        FioriError::not_found("field", query, alternatives).into()
    })
}

fn match_field<'a>(fields: &[&'a FormField], wanted: &str) -> Option<&'a FormField> {
    if wanted.is_empty() {
        return None;
    }
    fields
        .iter()
        .find(|f| normalize_name(f.display_name()) == wanted)
        .or_else(|| fields.iter().find(|f| normalized_label(f) == wanted))
        .or_else(|| {
            fields.iter().find(|f| {
                normalize_name(f.display_name()).contains(wanted)
                    || normalized_label(f).contains(wanted)
                    || normalize_name(&f.id).contains(wanted)
            })
        })
        .copied()
}

fn normalized_label(field: &FormField) -> String {
    field.label.as_deref().map(normalize_name).unwrap_or_default()
}
