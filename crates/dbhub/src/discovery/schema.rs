//! Schema file lookup and provider extraction
//!
//! Extraction is a text-pattern heuristic, not a parser: the first
//! `datasource <name> { ... }` block wins and only its `provider = "..."`
//! assignment is read. Line comments are ignored. Nested braces inside the
//! datasource block are not supported.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::provider::Provider;

/// Extension of schema definition files
pub const SCHEMA_EXTENSION: &str = "prisma";

/// Conventional colocated schema locations, relative to a client directory
pub const COLOCATED_SCHEMAS: [&str; 2] = ["schema.prisma", "prisma/schema.prisma"];

static DATASOURCE_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\bdatasource\s+\w+\s*\{(.*?)\}").expect("valid datasource regex")
});

static PROVIDER_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\bprovider\s*=\s*"([^"]+)""#).expect("valid provider regex"));

/// Infers the provider a schema declares
pub trait ProviderExtractor: Send + Sync {
    fn extract(&self, schema: &str) -> Option<Provider>;

    fn extract_from_file(&self, path: &Path) -> Option<Provider> {
        match std::fs::read_to_string(path) {
            Ok(content) => self.extract(&content),
            Err(e) => {
                tracing::warn!("Cannot read schema {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// Regex-based extractor reading the first datasource block
#[derive(Debug, Clone, Copy, Default)]
pub struct DatasourceProviderExtractor;

impl ProviderExtractor for DatasourceProviderExtractor {
    fn extract(&self, schema: &str) -> Option<Provider> {
        let stripped = strip_line_comments(schema);
        let block = DATASOURCE_BLOCK.captures(&stripped)?.get(1)?.as_str();
        let literal = PROVIDER_FIELD.captures(block)?.get(1)?.as_str();
        Some(Provider::from(literal))
    }
}

fn strip_line_comments(schema: &str) -> String {
    schema
        .lines()
        .map(|line| &line[..comment_start(line).unwrap_or(line.len())])
        .collect::<Vec<_>>()
        .join("\n")
}

/// Byte offset of a `//` comment outside string literals
fn comment_start(line: &str) -> Option<usize> {
    let mut in_string = false;
    let mut escaped = false;
    let mut chars = line.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '/' if matches!(chars.peek(), Some((_, '/'))) => return Some(idx),
            _ => {}
        }
    }
    None
}

/// Schema files directly under `root`, sorted by file name
pub fn list_schema_files(root: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!("No schemas root at {}: {}", root.display(), e);
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file() && path.extension().map_or(false, |ext| ext == SCHEMA_EXTENSION)
        })
        .collect();
    files.sort();
    files
}

/// Pick the schema file for database `name`
///
/// An exact stem match wins. Otherwise the first file (in sorted order) whose
/// stem contains, or is contained by, the name is used, with a warning when
/// more than one file qualifies.
pub fn match_schema_file(name: &str, files: &[PathBuf]) -> Option<PathBuf> {
    let name = name.to_lowercase();
    let stem = |path: &PathBuf| {
        path.file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default()
    };

    if let Some(exact) = files.iter().find(|path| stem(path) == name) {
        return Some(exact.clone());
    }

    let partial: Vec<&PathBuf> = files
        .iter()
        .filter(|path| {
            let stem = stem(path);
            !stem.is_empty() && (stem.contains(&name) || name.contains(&stem))
        })
        .collect();

    match partial.as_slice() {
        [] => None,
        [only] => {
            tracing::info!("Matched schema {} to '{}' by name overlap", only.display(), name);
            Some((*only).clone())
        }
        [first, rest @ ..] => {
            tracing::warn!(
                "Ambiguous schema match for '{}': using {} over {}",
                name,
                first.display(),
                rest.iter()
                    .map(|path| path.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            Some((*first).clone())
        }
    }
}
