use anyhow::{Context, Result};
use std::path::Path;

use super::types::Metadata;
use crate::error::FioriError;

/// Load the reconciled metadata file
///
/// A missing file is [`FioriError::MetadataMissing`] so commands can tell the
/// caller to run extraction first.
pub fn load(path: &Path) -> Result<Metadata> {
    if !path.exists() {
        return Err(FioriError::MetadataMissing {
            path: path.display().to_string(),
        }
        .into());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read metadata: {}", path.display()))?;
    let metadata = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse metadata: {}", path.display()))?;
    Ok(metadata)
}

/// Write the metadata file, creating parent directories as needed
pub fn save(path: &Path, metadata: &Metadata) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(metadata)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write metadata: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::types::{FilterDescriptor, FilterSelectors};

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir()
            .join(format!("fiori-pilot-{}", uuid::Uuid::new_v4()))
            .join(name)
    }

    #[test]
    fn test_missing_file_is_metadata_missing() {
        let path = temp_path("metadata.json");
        let err = load(&path).unwrap_err();
        let fiori = err.downcast_ref::<FioriError>().unwrap();
        assert_eq!(fiori.kind(), "metadata_missing");
        assert!(err.to_string().contains("run extraction first"));
    }

    #[test]
    fn test_save_then_load() {
        let path = temp_path("nested/metadata.json");
        let metadata = Metadata {
            filters: vec![FilterDescriptor {
                property_key: "Plant".into(),
                label: "Plant".into(),
                filter_field_id: "app--ff::Plant".into(),
                local_id: "ff::Plant".into(),
                selectors: FilterSelectors::default(),
            }],
            tables: vec![],
        };
        save(&path, &metadata).unwrap();
        assert_eq!(load(&path).unwrap(), metadata);
        std::fs::remove_dir_all(path.parent().unwrap().parent().unwrap()).ok();
    }
}
