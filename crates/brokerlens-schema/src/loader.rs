use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::SchemaConfig;
use crate::entry::SchemaEntry;
use crate::error::{Result, SchemaError};

/// Load every `*.json` schema document in `path`.
///
/// Files are read in file-name order; subdirectories and symlinks are
/// skipped. A file that is not UTF-8 JSON is skipped with a warning,
/// and when two documents claim the same name the first one wins. Exceeding
/// the configured count or size limit fails the whole load.
pub fn load_schema_dir(path: &Path, config: &SchemaConfig) -> Result<Vec<SchemaEntry>> {
    let read_dir = std::fs::read_dir(path)
        .map_err(|err| SchemaError::LoadFailed(format!("{}: {err}", path.display())))?;

    let mut candidates: Vec<PathBuf> = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|err| SchemaError::LoadFailed(err.to_string()))?;
        let entry_path = entry.path();
        let is_json = entry_path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            candidates.push(entry_path);
        }
    }
    candidates.sort();

    let mut entries = Vec::new();
    let mut seen = HashSet::new();
    let mut loaded_count = 0usize;
    for candidate in candidates {
        let path_metadata = std::fs::symlink_metadata(&candidate)
            .map_err(|err| SchemaError::LoadFailed(err.to_string()))?;
        let file_type = path_metadata.file_type();
        if file_type.is_symlink() {
            warn!(path = %candidate.display(), "skipping symlinked schema");
            continue;
        }
        if !file_type.is_file() {
            continue;
        }

        loaded_count = loaded_count.saturating_add(1);
        if loaded_count > config.max_schemas_from_directory {
            return Err(SchemaError::LoadFailed(format!(
                "schema count exceeds configured max ({}): {}",
                config.max_schemas_from_directory, loaded_count
            )));
        }

        let bytes = read_limited(&candidate, &path_metadata, config.max_schema_file_size)?;
        let content = match std::str::from_utf8(&bytes) {
            Ok(content) => content,
            Err(err) => {
                warn!(path = %candidate.display(), error = %err, "skipping schema that is not UTF-8");
                continue;
            }
        };
        let document: Value = match serde_json::from_str(content) {
            Ok(document) => document,
            Err(err) => {
                warn!(path = %candidate.display(), error = %err, "skipping unparsable schema");
                continue;
            }
        };

        let stem = candidate
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = stem.strip_suffix(".schema").unwrap_or(&stem);
        let entry = SchemaEntry::from_document(stem, document);

        if !seen.insert(entry.name.clone()) {
            warn!(
                schema = %entry.name,
                path = %candidate.display(),
                "duplicate schema name, keeping the first"
            );
            continue;
        }
        debug!(schema = %entry.name, version = %entry.version, "schema loaded");
        entries.push(entry);
    }

    Ok(entries)
}

fn read_limited(
    path: &Path,
    path_metadata: &std::fs::Metadata,
    max_bytes: usize,
) -> Result<Vec<u8>> {
    let file_name = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file = std::fs::File::open(path).map_err(|err| {
        SchemaError::LoadFailed(format!("failed opening schema {}: {err}", path.display()))
    })?;
    let opened_metadata = file
        .metadata()
        .map_err(|err| SchemaError::LoadFailed(err.to_string()))?;

    #[cfg(unix)]
    {
        if !same_file_identity(path_metadata, &opened_metadata) {
            return Err(SchemaError::LoadFailed(format!(
                "schema file changed during load: {file_name}"
            )));
        }
    }
    #[cfg(not(unix))]
    let _ = path_metadata;

    if opened_metadata.len() > max_bytes as u64 {
        return Err(SchemaError::LoadFailed(format!(
            "schema file too large ({} bytes): {file_name}",
            opened_metadata.len()
        )));
    }

    let read_limit = u64::try_from(max_bytes.saturating_add(1)).unwrap_or(u64::MAX);
    let mut content = Vec::new();
    file.take(read_limit)
        .read_to_end(&mut content)
        .map_err(|err| {
            SchemaError::LoadFailed(format!("failed reading schema {}: {err}", path.display()))
        })?;
    if content.len() > max_bytes {
        return Err(SchemaError::LoadFailed(format!(
            "schema file too large while reading: {file_name}"
        )));
    }
    Ok(content)
}

#[cfg(unix)]
fn same_file_identity(
    path_metadata: &std::fs::Metadata,
    opened_metadata: &std::fs::Metadata,
) -> bool {
    use std::os::unix::fs::MetadataExt;
    path_metadata.dev() == opened_metadata.dev() && path_metadata.ino() == opened_metadata.ino()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDER_SCHEMA: &str = r#"{
        "$id": "order.created",
        "title": "Order created",
        "version": "1.2.0",
        "type": "object",
        "properties": { "orderId": { "type": "string" } },
        "required": ["orderId"]
    }"#;

    fn make_temp_schema_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "brokerlens-schema-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_schema(dir: &Path, file_name: &str, contents: &str) {
        std::fs::write(dir.join(file_name), contents.as_bytes()).unwrap();
    }

    #[test]
    fn loads_sorted_with_id_and_stem_names() {
        let dir = make_temp_schema_dir("names");
        write_schema(&dir, "b-order.json", ORDER_SCHEMA);
        write_schema(&dir, "a-payment.schema.json", r#"{"type":"object"}"#);
        write_schema(&dir, "notes.txt", "ignored");

        let entries = load_schema_dir(&dir, &SchemaConfig::default()).unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a-payment", "order.created"]);
        assert_eq!(entries[1].version, "1.2.0");
        assert_eq!(entries[1].title.as_deref(), Some("Order created"));
        assert_eq!(entries[0].version, "1.0.0");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn duplicate_names_keep_first() {
        let dir = make_temp_schema_dir("duplicates");
        write_schema(&dir, "1.json", ORDER_SCHEMA);
        write_schema(&dir, "2.json", &ORDER_SCHEMA.replace("1.2.0", "9.9.9"));

        let entries = load_schema_dir(&dir, &SchemaConfig::default()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].version, "1.2.0");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn unparsable_file_is_skipped() {
        let dir = make_temp_schema_dir("unparsable");
        write_schema(&dir, "bad.json", "{ not json");
        write_schema(&dir, "good.json", ORDER_SCHEMA);

        let entries = load_schema_dir(&dir, &SchemaConfig::default()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "order.created");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn non_utf8_file_is_skipped() {
        let dir = make_temp_schema_dir("non-utf8");
        std::fs::write(dir.join("a-latin1.json"), b"{\"title\": \"caf\xe9\"}").unwrap();
        write_schema(&dir, "b-order.json", ORDER_SCHEMA);

        let entries = load_schema_dir(&dir, &SchemaConfig::default()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "order.created");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_directory_fails() {
        let dir = std::env::temp_dir().join("brokerlens-schema-does-not-exist-7f3a");
        let result = load_schema_dir(&dir, &SchemaConfig::default());
        assert!(matches!(result, Err(SchemaError::LoadFailed(_))));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_schema_is_skipped() {
        let dir = make_temp_schema_dir("symlink");
        let target_dir = make_temp_schema_dir("symlink-target");
        let target = target_dir.join("target.json");
        std::fs::write(&target, ORDER_SCHEMA.as_bytes()).unwrap();
        std::os::unix::fs::symlink(&target, dir.join("linked.json")).unwrap();

        let entries = load_schema_dir(&dir, &SchemaConfig::default()).unwrap();
        assert!(entries.is_empty());

        let _ = std::fs::remove_dir_all(&dir);
        let _ = std::fs::remove_dir_all(&target_dir);
    }

    #[test]
    fn schema_count_limit_is_enforced() {
        let dir = make_temp_schema_dir("count-limit");
        write_schema(&dir, "1.json", ORDER_SCHEMA);
        write_schema(&dir, "2.json", r#"{"type":"object"}"#);

        let config = SchemaConfig {
            max_schemas_from_directory: 1,
            ..SchemaConfig::default()
        };
        let result = load_schema_dir(&dir, &config);
        assert!(matches!(result, Err(SchemaError::LoadFailed(_))));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn schema_file_size_limit_is_enforced() {
        let dir = make_temp_schema_dir("size-limit");
        write_schema(&dir, "1.json", ORDER_SCHEMA);

        let config = SchemaConfig {
            max_schema_file_size: 8,
            ..SchemaConfig::default()
        };
        let result = load_schema_dir(&dir, &config);
        assert!(matches!(result, Err(SchemaError::LoadFailed(_))));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
