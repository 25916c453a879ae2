//! Resource definition files
//!
//! Index and source definitions are JSON or YAML files on disk. Loading one
//! parses it, normalizes it into the JSON payload the Quickwit API expects,
//! and extracts its identifier.

use super::kind::ResourceKind;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

/// On-disk format of a definition file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionFormat {
    Json,
    Yaml,
}

impl DefinitionFormat {
    /// Decide the format from the file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(DefinitionFormat::Json),
            "yml" | "yaml" => Some(DefinitionFormat::Yaml),
            _ => None,
        }
    }
}

/// A discovered definition file, before it is parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionFile {
    pub path: PathBuf,
    /// Index the resource belongs to, for sources
    pub parent_id: Option<String>,
}

/// A definition file that cannot be applied
#[derive(Debug, Clone)]
pub struct MalformedDefinition {
    pub path: PathBuf,
    pub reason: String,
}

impl MalformedDefinition {
    fn new(path: &Path, reason: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for MalformedDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.reason)
    }
}

impl std::error::Error for MalformedDefinition {}

/// A parsed definition, ready to be submitted
#[derive(Debug, Clone)]
pub struct ResourceDefinition {
    pub kind: ResourceKind,
    pub path: PathBuf,
    pub format: DefinitionFormat,
    pub resource_id: String,
    pub parent_id: Option<String>,
    /// Canonical JSON request body
    pub payload: Value,
}

impl ResourceDefinition {
    /// Read and parse a definition file
    pub fn load(kind: ResourceKind, file: &DefinitionFile) -> Result<Self, MalformedDefinition> {
        let content = std::fs::read_to_string(&file.path)
            .map_err(|e| MalformedDefinition::new(&file.path, format!("unreadable: {}", e)))?;
        Self::parse(kind, file, &content)
    }

    /// Parse definition content already read from `file.path`
    pub fn parse(
        kind: ResourceKind,
        file: &DefinitionFile,
        content: &str,
    ) -> Result<Self, MalformedDefinition> {
        let path = &file.path;
        let format = DefinitionFormat::from_path(path)
            .ok_or_else(|| MalformedDefinition::new(path, "unsupported file extension"))?;

        let mut payload = match format {
            DefinitionFormat::Json => serde_json::from_str::<Value>(content)
                .map_err(|e| MalformedDefinition::new(path, format!("invalid JSON: {}", e)))?,
            DefinitionFormat::Yaml => {
                let mut value = serde_yaml::from_str::<Value>(content)
                    .map_err(|e| MalformedDefinition::new(path, format!("invalid YAML: {}", e)))?;
                requote_string_fields(&mut value, content);
                value
            }
        };

        if !payload.is_object() {
            return Err(MalformedDefinition::new(path, "top level is not a mapping"));
        }

        let resource_id = extract_resource_id(&payload, kind.id_field())
            .ok_or_else(|| {
                MalformedDefinition::new(path, format!("missing or empty '{}'", kind.id_field()))
            })?
            .to_string();
        // The id checked against the listing is the id submitted
        payload[kind.id_field()] = Value::String(resource_id.clone());

        if kind.has_parent() && file.parent_id.is_none() {
            return Err(MalformedDefinition::new(
                path,
                "source definitions must live in a directory named after their index",
            ));
        }

        Ok(Self {
            kind,
            path: path.clone(),
            format,
            resource_id,
            parent_id: file.parent_id.clone(),
            payload,
        })
    }
}

/// Read the identifier field, rejecting empty and null-like values
pub fn extract_resource_id<'a>(payload: &'a Value, field: &str) -> Option<&'a str> {
    let id = payload.get(field)?.as_str()?.trim();
    if id.is_empty() || id == "null" {
        return None;
    }
    Some(id)
}

/// Fields that must reach the API as strings, read as YAML strings so plain
/// scalars keep their literal text (`0.10` stays `"0.10"`)
#[derive(Debug, Default, Deserialize)]
struct StringFields {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    index_id: Option<String>,
    #[serde(default)]
    source_id: Option<String>,
}

/// Turn numeric or boolean values of string-typed fields back into strings
fn requote_string_fields(value: &mut Value, raw: &str) {
    let Value::Object(map) = value else {
        return;
    };

    // Non-scalar values fail here; the id check rejects them later
    let fields = match serde_yaml::from_str::<StringFields>(raw) {
        Ok(fields) => fields,
        Err(e) => {
            tracing::trace!("Not re-quoting string fields: {}", e);
            return;
        }
    };

    for (field, literal) in [
        ("version", fields.version),
        ("index_id", fields.index_id),
        ("source_id", fields.source_id),
    ] {
        let Some(literal) = literal else {
            continue;
        };
        if let Some(current) = map.get_mut(field) {
            if matches!(current, Value::Number(_) | Value::Bool(_)) {
                tracing::trace!("Re-quoting '{}' as \"{}\"", field, literal);
                *current = Value::String(literal);
            }
        }
    }
}

/// Definition files directly inside `dir`, sorted by path
///
/// Files with an unknown extension are ignored. Sub-directories are not
/// descended into.
pub fn discover_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && DefinitionFormat::from_path(&path).is_some() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Index definitions: the definition files at the top of `dir`
pub fn discover_index_definitions(dir: &Path) -> std::io::Result<Vec<DefinitionFile>> {
    Ok(discover_files(dir)?
        .into_iter()
        .map(|path| DefinitionFile {
            path,
            parent_id: None,
        })
        .collect())
}

/// Source definitions: `<dir>/<index_id>/<file>`
///
/// A missing directory means there are no sources. Files placed directly in
/// `dir` are returned without a parent so they get reported as malformed.
pub fn discover_source_definitions(dir: &Path) -> std::io::Result<Vec<DefinitionFile>> {
    if !dir.exists() {
        tracing::debug!("No source definitions directory at {}", dir.display());
        return Ok(Vec::new());
    }

    let mut files: Vec<DefinitionFile> = discover_files(dir)?
        .into_iter()
        .map(|path| DefinitionFile {
            path,
            parent_id: None,
        })
        .collect();

    let mut index_dirs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            index_dirs.push(path);
        }
    }
    index_dirs.sort();

    for index_dir in index_dirs {
        let Some(index_id) = index_dir.file_name().and_then(|n| n.to_str()) else {
            tracing::warn!("Skipping non UTF-8 directory {}", index_dir.display());
            continue;
        };
        let index_id = index_id.to_string();
        for path in discover_files(&index_dir)? {
            files.push(DefinitionFile {
                path,
                parent_id: Some(index_id.clone()),
            });
        }
    }

    Ok(files)
}
