//! Tool descriptors for the command surface
//!
//! Parameters that name reconciled entities (filter keys and labels, table actions)
//! carry the known values as a JSON schema `enum`, so a caller can only
//! pick what extraction found.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::metadata::Metadata;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

enum Param {
    Text(&'static str, &'static str),
    Index(&'static str),
    Flag(&'static str, &'static str),
    Choice(&'static str, String, Vec<String>),
}

fn schema(params: Vec<Param>, required: &[&str]) -> Value {
    let mut properties = Map::new();
    for param in params {
        let (name, spec) = match param {
            Param::Text(name, description) => {
                (name, json!({ "type": "string", "description": description }))
            }
            Param::Index(description) => (
                "index",
                json!({ "type": "integer", "minimum": 0, "description": description }),
            ),
            Param::Flag(name, description) => {
                (name, json!({ "type": "boolean", "description": description }))
            }
            Param::Choice(name, description, values) if values.is_empty() => {
                (name, json!({ "type": "string", "description": description }))
            }
            Param::Choice(name, description, values) => (
                name,
                json!({ "type": "string", "description": description, "enum": values }),
            ),
        };
        properties.insert(name.to_string(), spec);
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn tool(name: &str, description: &str, input_schema: Value) -> ToolDescriptor {
    ToolDescriptor {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
    }
}

/// Ids and texts of the primary table's actions, first seen wins
fn action_choices(metadata: &Metadata) -> Vec<String> {
    let mut choices: Vec<String> = Vec::new();
    if let Some(table) = metadata.primary_table() {
        for action in &table.actions {
            for value in [&action.text, &action.id] {
                if !value.is_empty() && !choices.contains(value) {
                    choices.push(value.clone());
                }
            }
        }
    }
    choices
}

/// Property keys and labels of the filters, first seen wins
fn filter_choices(metadata: &Metadata) -> Vec<String> {
    let mut choices: Vec<String> = Vec::new();
    for filter in &metadata.filters {
        for value in [&filter.property_key, &filter.label] {
            if !value.is_empty() && !choices.contains(value) {
                choices.push(value.clone());
            }
        }
    }
    choices
}

/// Descriptors for every command, enriched with the reconciled metadata
pub fn generate_tools(metadata: &Metadata) -> Vec<ToolDescriptor> {
    let filter_help = if metadata.filters.is_empty() {
        "Filter property key or label".to_string()
    } else {
        format!("Filter property key or label. Known: {}", metadata.filter_pairs().join(", "))
    };

    vec![
        tool(
            "start",
            "Open the application and wait until the UI5 runtime and view are rendered",
            schema(vec![Param::Text("url", "Start URL; the configured URL when omitted")], &[]),
        ),
        tool("pressGo", "Press the filter bar Go button and wait for rows or the no-data text", schema(vec![], &[])),
        tool("getRows", "Read the rendered rows of every table, keyed by column property key", schema(vec![], &[])),
        tool(
            "setFilter",
            "Set a filter bar value",
            schema(
                vec![
                    Param::Choice("propertyKey", filter_help, filter_choices(metadata)),
                    Param::Text("value", "Value to enter or option to pick"),
                ],
                &["propertyKey", "value"],
            ),
        ),
        tool(
            "executeAction",
            "Press a toolbar action of the primary table and classify the outcome",
            schema(
                vec![Param::Choice(
                    "action",
                    "Action id or text".to_string(),
                    action_choices(metadata),
                )],
                &["action"],
            ),
        ),
        tool(
            "selectRow",
            "Toggle the selection checkbox of a row",
            schema(vec![Param::Index("Zero-based row index")], &["index"]),
        ),
        tool(
            "openObjectPage",
            "Navigate from a row to its object page",
            schema(vec![Param::Index("Zero-based row index")], &["index"]),
        ),
        tool("getObjectActions", "List the actions available on the current object page", schema(vec![], &[])),
        tool("getObjectFields", "Read label/value pairs of the current object page", schema(vec![], &[])),
        tool(
            "executeObjectAction",
            "Press an object page action and classify the outcome",
            schema(vec![Param::Text("action", "Action id or text")], &["action"]),
        ),
        tool(
            "fillFormField",
            "Fill a field of the open dialog or object page form",
            schema(
                vec![
                    Param::Text("name", "Field name or label"),
                    Param::Text("value", "Value to type"),
                ],
                &["name", "value"],
            ),
        ),
        tool("submitForm", "Press the dialog's primary button or the object page save action", schema(vec![], &[])),
        tool("discardDraft", "Cancel the current draft and confirm the discard", schema(vec![], &[])),
        tool("getMessages", "Read the messages currently shown", schema(vec![], &[])),
        tool("close", "Close the browser", schema(vec![], &[])),
        tool(
            "extract",
            "Scan the page, reconcile filters and tables, and save the metadata file",
            schema(
                vec![
                    Param::Text("url", "Navigate here first"),
                    Param::Flag("skipDialog", "Skip the column settings dialog pass"),
                    Param::Flag("merge", "Merge into the existing metadata file"),
                ],
                &[],
            ),
        ),
        tool(
            "scan",
            "List the UI5 controls on the current page",
            schema(
                vec![Param::Flag("includeInternals", "Keep launchpad shell controls")],
                &[],
            ),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::types::{ActionDescriptor, ActionType, FilterDescriptor, TableDescriptor};

    fn metadata() -> Metadata {
        Metadata {
            filters: vec![FilterDescriptor {
                property_key: "CompanyCode".into(),
                label: "Company Code".into(),
                filter_field_id: "app--fb::FilterField::CompanyCode".into(),
                local_id: "fb::FilterField::CompanyCode".into(),
                selectors: Default::default(),
            }],
            tables: vec![TableDescriptor {
                table_id: "app--fe::table::Orders::LineItem".into(),
                inner_table_id: String::new(),
                list_ul_id: String::new(),
                selectors: Default::default(),
                actions: vec![ActionDescriptor {
                    id: "app--fe::table::Orders::LineItem::CustomAction::Approve".into(),
                    text: "Approve".into(),
                    action_type: ActionType::Custom,
                    selector: String::new(),
                }],
                custom_actions: vec![],
                columns: vec![],
            }],
        }
    }

    fn find<'a>(tools: &'a [ToolDescriptor], name: &str) -> &'a ToolDescriptor {
        tools.iter().find(|t| t.name == name).unwrap()
    }

    #[test]
    fn test_every_command_has_a_tool() {
        let tools = generate_tools(&Metadata::default());
        for name in crate::parser::command_names() {
            assert!(tools.iter().any(|t| t.name == name), "missing tool {}", name);
        }
    }

    #[test]
    fn test_enumerates_known_values() {
        let tools = generate_tools(&metadata());
        let set_filter = find(&tools, "setFilter");
        assert_eq!(
            set_filter.input_schema["properties"]["propertyKey"]["enum"],
            json!(["CompanyCode", "Company Code"])
        );
        let action = find(&tools, "executeAction");
        assert_eq!(
            action.input_schema["properties"]["action"]["enum"],
            json!(["Approve", "app--fe::table::Orders::LineItem::CustomAction::Approve"])
        );
        assert_eq!(find(&tools, "selectRow").input_schema["required"], json!(["index"]));
    }

    #[test]
    fn test_filter_enum_accepts_labels_that_resolve() {
        let mut metadata = metadata();
        metadata.filters.push(FilterDescriptor {
            property_key: "Plant".into(),
            label: "Plant".into(),
            filter_field_id: "app--fb::FilterField::Plant".into(),
            local_id: "fb::FilterField::Plant".into(),
            selectors: Default::default(),
        });
        let tools = generate_tools(&metadata);
        let choices = find(&tools, "setFilter").input_schema["properties"]["propertyKey"]["enum"].clone();
        assert_eq!(choices, json!(["CompanyCode", "Company Code", "Plant"]));

        let company = crate::resolver::resolve_filter(&metadata, "Company Code").unwrap();
        assert_eq!(company.property_key, "CompanyCode");
    }

    #[test]
    fn test_no_enum_without_metadata() {
        let tools = generate_tools(&Metadata::default());
        let set_filter = find(&tools, "setFilter");
        assert!(set_filter.input_schema["properties"]["propertyKey"].get("enum").is_none());
    }
}
