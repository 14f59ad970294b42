use anyhow::Result;
use serde::Serialize;
use std::path::Path;

/// Pretty JSON to a file, or to stdout without one
pub fn write<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;

    if let Some(path) = output {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        println!("Report saved to: {}", path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}
