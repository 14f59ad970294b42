//! Command parsing
//!
//! Two syntaxes feed the same [`Command`] type:
//!
//! * shell lines: `setFilter CompanyCode 1000`, `executeAction "Mass Change"`
//! * YAML steps: `- pressGo`, `- selectRow: 0`,
//!   `- setFilter: { propertyKey: CompanyCode, value: "1000" }`

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::path::Path;

use crate::runner::commands::Command;

/// Every command name with its positional parameters
///
/// The last parameter swallows the remaining words of a shell line.
const COMMANDS: &[(&str, &[&str])] = &[
    ("start", &["url"]),
    ("pressGo", &[]),
    ("getRows", &[]),
    ("setFilter", &["propertyKey", "value"]),
    ("executeAction", &["action"]),
    ("selectRow", &["index"]),
    ("openObjectPage", &["index"]),
    ("getObjectActions", &[]),
    ("getObjectFields", &[]),
    ("executeObjectAction", &["action"]),
    ("fillFormField", &["name", "value"]),
    ("submitForm", &[]),
    ("discardDraft", &[]),
    ("getMessages", &[]),
    ("close", &[]),
    ("extract", &["url"]),
    ("scan", &[]),
];

const NUMERIC_PARAMS: &[&str] = &["index"];

/// Known command names, for help output
pub fn command_names() -> impl Iterator<Item = &'static str> {
    COMMANDS.iter().map(|(name, _)| *name)
}

/// Canonical name and positional parameters; matching ignores case
fn lookup(name: &str) -> Option<(&'static str, &'static [&'static str])> {
    COMMANDS
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .copied()
}

fn param_value(param: &str, raw: &str) -> Result<Value> {
    if NUMERIC_PARAMS.contains(&param) {
        let n: u64 = raw
            .parse()
            .with_context(|| format!("{} must be a non-negative number, got '{}'", param, raw))?;
        Ok(Value::from(n))
    } else {
        Ok(Value::String(raw.to_string()))
    }
}

fn to_command(name: &str, params: Map<String, Value>) -> Result<Command> {
    let mut object = params;
    object.insert("command".to_string(), Value::String(name.to_string()));
    serde_json::from_value(Value::Object(object))
        .with_context(|| format!("Invalid parameters for '{}'", name))
}

/// Split a line on whitespace, keeping quoted sections together
pub fn tokenize(line: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut in_token = false;

    for ch in line.chars() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                in_token = true;
            }
            None if ch.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                current.push(ch);
                in_token = true;
            }
        }
    }

    if quote.is_some() {
        anyhow::bail!("Unterminated quote in: {}", line);
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Parse one shell line
///
/// Flags (`--skip-dialog`, `--merge`, `--internals`) switch booleans on;
/// lines containing a `:` after the name are read as YAML.
pub fn parse_line(line: &str) -> Result<Command> {
    let line = line.trim();
    let first = line.split_whitespace().next().unwrap_or_default();
    if first.ends_with(':') || line.starts_with('{') {
        let value: serde_yaml::Value = serde_yaml::from_str(line)?;
        return parse_command_value(&value);
    }

    parse_tokens(&tokenize(line)?)
}

/// Parse already split words, e.g. command line arguments
pub fn parse_tokens(tokens: &[String]) -> Result<Command> {
    let (name, rest) = tokens
        .split_first()
        .ok_or_else(|| anyhow::anyhow!("Empty command"))?;
    let (canonical, positional) = lookup(name).ok_or_else(|| unknown(name))?;

    let mut params = Map::new();
    let mut words = Vec::new();
    for token in rest {
        match token.strip_prefix("--") {
            Some(flag) => {
                params.insert(flag_key(flag), Value::Bool(true));
            }
            None => words.push(token.as_str()),
        }
    }

    for (i, param) in positional.iter().enumerate() {
        let raw = if i + 1 == positional.len() {
            if words.len() <= i {
                None
            } else {
                Some(words[i..].join(" "))
            }
        } else {
            words.get(i).map(|w| w.to_string())
        };
        if let Some(raw) = raw {
            params.insert(param.to_string(), param_value(param, &raw)?);
        }
    }
    if positional.is_empty() && !words.is_empty() {
        anyhow::bail!("'{}' takes no arguments", canonical);
    }

    to_command(canonical, params)
}

/// `skip-dialog` -> `skipDialog`, `internals` -> `includeInternals`
fn flag_key(flag: &str) -> String {
    if flag == "internals" {
        return "includeInternals".to_string();
    }
    let mut key = String::new();
    let mut upper = false;
    for ch in flag.chars() {
        if ch == '-' || ch == '_' {
            upper = true;
        } else if upper {
            key.extend(ch.to_uppercase());
            upper = false;
        } else {
            key.push(ch);
        }
    }
    key
}

fn unknown(name: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "Unknown command '{}'. Known: {}",
        name,
        command_names().collect::<Vec<_>>().join(", ")
    )
}

/// Parse one YAML step
pub fn parse_command_value(value: &serde_yaml::Value) -> Result<Command> {
    match value {
        serde_yaml::Value::String(s) => parse_line(s),

        serde_yaml::Value::Mapping(map) => {
            let mut entries = map.iter();
            let (key, params) = match (entries.next(), entries.next()) {
                (Some(entry), None) => entry,
                _ => anyhow::bail!("Invalid step: expected a single key mapping"),
            };
            let name = key
                .as_str()
                .ok_or_else(|| anyhow::anyhow!("Command name must be a string"))?;
            let (canonical, positional) = lookup(name).ok_or_else(|| unknown(name))?;

            let params = match params {
                serde_yaml::Value::Null => Map::new(),
                serde_yaml::Value::Mapping(_) => match serde_json::to_value(params)? {
                    Value::Object(object) => object,
                    _ => Map::new(),
                },
                // Shorthand: `selectRow: 0`, `executeAction: Approve`
                scalar => {
                    let first = positional
                        .first()
                        .ok_or_else(|| anyhow::anyhow!("'{}' takes no arguments", canonical))?;
                    let raw = match scalar {
                        serde_yaml::Value::String(s) => s.clone(),
                        serde_yaml::Value::Number(n) => n.to_string(),
                        serde_yaml::Value::Bool(b) => b.to_string(),
                        other => anyhow::bail!("Unsupported value for '{}': {:?}", canonical, other),
                    };
                    let mut object = Map::new();
                    object.insert(first.to_string(), param_value(first, &raw)?);
                    object
                }
            };
            to_command(canonical, params)
        }

        other => anyhow::bail!("Invalid step: {:?}", other),
    }
}

/// A script: optional start URL followed by steps
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub url: Option<String>,
    pub steps: Vec<Command>,
}

/// Parse a script document
///
/// Accepts either a bare step list or a mapping with `url` and `steps`.
pub fn parse_script(content: &str) -> Result<Script> {
    let doc: serde_yaml::Value = serde_yaml::from_str(content)?;
    let (url, steps) = match &doc {
        serde_yaml::Value::Sequence(seq) => (None, seq.clone()),
        serde_yaml::Value::Mapping(map) => {
            let url = map
                .get("url")
                .and_then(|u| u.as_str())
                .map(str::to_string);
            let steps = map
                .get("steps")
                .and_then(|s| s.as_sequence())
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("Script mapping needs a 'steps' list"))?;
            (url, steps)
        }
        serde_yaml::Value::Null => (None, Vec::new()),
        other => anyhow::bail!("Invalid script: {:?}", other),
    };

    let steps = steps
        .iter()
        .enumerate()
        .map(|(i, step)| parse_command_value(step).with_context(|| format!("Step {}", i + 1)))
        .collect::<Result<Vec<_>>>()?;

    Ok(Script { url, steps })
}

pub fn parse_script_file(path: &Path) -> Result<Script> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script: {}", path.display()))?;
    parse_script(&content).with_context(|| format!("Failed to parse script: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line_positional() {
        assert_eq!(
            parse_line("setFilter CompanyCode 1000").unwrap(),
            Command::SetFilter {
                property_key: "CompanyCode".into(),
                value: "1000".into()
            }
        );
        assert_eq!(
            parse_line("executeaction Mass Change").unwrap(),
            Command::ExecuteAction {
                action: "Mass Change".into()
            }
        );
        assert_eq!(parse_line("selectRow 2").unwrap(), Command::SelectRow { index: 2 });
        assert_eq!(parse_line("pressGo").unwrap(), Command::PressGo);
    }

    #[test]
    fn test_parse_line_quotes_and_flags() {
        assert_eq!(
            parse_line("fillFormField \"Rejection Reason\" 'Duplicate entry'").unwrap(),
            Command::FillFormField {
                name: "Rejection Reason".into(),
                value: "Duplicate entry".into()
            }
        );
        assert_eq!(
            parse_line("extract --skip-dialog --merge").unwrap(),
            Command::Extract {
                url: None,
                skip_dialog: true,
                merge: true
            }
        );
        assert_eq!(
            parse_line("scan --internals").unwrap(),
            Command::Scan {
                include_internals: true
            }
        );
    }

    #[test]
    fn test_parse_line_errors() {
        assert!(parse_line("selectRow first").is_err());
        assert!(parse_line("pressGo now").is_err());
        assert!(parse_line("setFilter \"Company").is_err());
        let err = parse_line("tap Login").unwrap_err();
        assert!(err.to_string().contains("getRows"));
    }

    #[test]
    fn test_parse_line_yaml_form() {
        assert_eq!(
            parse_line("setFilter: { propertyKey: Plant, value: '1010' }").unwrap(),
            Command::SetFilter {
                property_key: "Plant".into(),
                value: "1010".into()
            }
        );
    }

    #[test]
    fn test_parse_script() {
        let script = parse_script(
            r#"
url: https://host/ui#PurchaseOrder-manage
steps:
  - setFilter:
      propertyKey: CompanyCode
      value: "1000"
  - pressGo
  - getRows
  - openObjectPage: 0
  - executeObjectAction: Edit
"#,
        )
        .unwrap();
        assert_eq!(script.url.as_deref(), Some("https://host/ui#PurchaseOrder-manage"));
        assert_eq!(script.steps.len(), 5);
        assert_eq!(script.steps[3], Command::OpenObjectPage { index: 0 });
        assert_eq!(
            script.steps[4],
            Command::ExecuteObjectAction {
                action: "Edit".into()
            }
        );
    }

    #[test]
    fn test_parse_script_reports_step() {
        let err = parse_script("- pressGo\n- bogus\n").unwrap_err();
        assert!(format!("{:#}", err).contains("Step 2"));
    }
}
