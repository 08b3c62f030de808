//! Migration Manager - File system operations for migrations
//!
//! Creates timestamped placeholder migrations and lists the ones already on
//! disk for a database's migrations directory.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

use crate::error::{HubError, HubResult};

/// Timestamp prefix format of migration files
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// A migration found on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationFile {
    /// Directory name, `{timestamp}_{label}`
    pub id: String,
    pub label: String,
    pub path: PathBuf,
    pub created_at: Option<DateTime<Utc>>,
}

/// File holding the SQL of one migration inside its directory
pub const MIGRATION_FILE: &str = "migration.sql";

/// Create a placeholder migration at `{yyyymmddhhmmss}_{label}/migration.sql`
///
/// When that directory already exists, `_2`, `_3`, ... is appended to the id
/// until a free one is found.
pub fn create_migration(migrations_dir: &Path, database: &str, label: &str) -> HubResult<PathBuf> {
    let label = normalize_label(label)?;
    fs::create_dir_all(migrations_dir)?;

    let now = Utc::now();
    let base = format!("{}_{}", now.format(TIMESTAMP_FORMAT), label);
    let mut id = base.clone();
    let mut attempt = 1;
    let dir = loop {
        let dir = migrations_dir.join(&id);
        match fs::create_dir(&dir) {
            Ok(()) => break dir,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                attempt += 1;
                id = format!("{}_{}", base, attempt);
            }
            Err(e) => return Err(e.into()),
        }
    };

    let path = dir.join(MIGRATION_FILE);
    let mut file = OpenOptions::new().write(true).create_new(true).open(&path)?;
    file.write_all(migration_template(database, &label, &id, now).as_bytes())?;

    tracing::info!("Created migration {} for '{}'", path.display(), database);
    Ok(path)
}

/// Migrations in `migrations_dir`, oldest first
///
/// A migration is a directory holding `migration.sql`; anything else is
/// skipped.
pub fn list_migrations(migrations_dir: &Path) -> HubResult<Vec<MigrationFile>> {
    if !migrations_dir.exists() {
        return Ok(Vec::new());
    }

    let mut migrations = Vec::new();
    for entry in fs::read_dir(migrations_dir)? {
        let dir = entry?.path();
        let path = dir.join(MIGRATION_FILE);
        if !path.is_file() {
            continue;
        }
        let Some(id) = dir.file_name().and_then(|s| s.to_str()).map(str::to_string) else {
            continue;
        };
        let (timestamp, label) = id.split_once('_').unwrap_or((id.as_str(), ""));
        let created_at = NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
            .ok()
            .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc));

        migrations.push(MigrationFile {
            label: label.to_string(),
            created_at,
            path,
            id,
        });
    }

    migrations.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(migrations)
}

/// Lowercase the label and replace anything outside `[a-z0-9_]` with `_`
fn normalize_label(label: &str) -> HubResult<String> {
    let label = label.trim();
    if label.is_empty() {
        return Err(HubError::invalid_argument("migration label must not be empty"));
    }
    Ok(label
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect())
}

fn migration_template(database: &str, label: &str, id: &str, now: DateTime<Utc>) -> String {
    format!(
        "-- Migration: {}\n\
         -- Database: {}\n\
         -- ID: {}\n\
         -- Created: {}\n\n\
         -- Add your schema changes here\n",
        label,
        database,
        id,
        now.format("%Y-%m-%d %H:%M:%S UTC")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_and_list() {
        let dir = TempDir::new().unwrap();
        let migrations_dir = dir.path().join("orders");

        let path = create_migration(&migrations_dir, "orders", "Add Users").unwrap();
        assert!(path.ends_with(MIGRATION_FILE));
        let id = path.parent().unwrap().file_name().unwrap().to_str().unwrap().to_string();
        let (timestamp, label) = id.split_once('_').unwrap();
        assert_eq!(timestamp.len(), 14);
        assert!(timestamp.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(label, "add_users");

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("-- Database: orders"));

        fs::write(migrations_dir.join("notes.txt"), "ignored").unwrap();
        fs::create_dir(migrations_dir.join("20240101000000_empty")).unwrap();
        let listed = list_migrations(&migrations_dir).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].label, "add_users");
        assert!(listed[0].created_at.is_some());
    }

    #[test]
    fn test_empty_label_rejected() {
        let dir = TempDir::new().unwrap();
        let err = create_migration(dir.path(), "orders", "   ").unwrap_err();
        assert!(matches!(err, HubError::InvalidArgument { .. }));
    }

    #[test]
    fn test_missing_directory_lists_nothing() {
        let dir = TempDir::new().unwrap();
        assert!(list_migrations(&dir.path().join("absent")).unwrap().is_empty());
    }

    #[test]
    fn test_create_twice_in_same_second() {
        let dir = TempDir::new().unwrap();

        let first = create_migration(dir.path(), "orders", "init").unwrap();
        let second = create_migration(dir.path(), "orders", "init").unwrap();
        assert_ne!(first, second);

        let listed = list_migrations(dir.path()).unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|m| m.id.contains("_init")));
        assert!(listed.iter().all(|m| m.created_at.is_some()));
    }

    #[cfg(unix)]
    #[test]
    fn test_unwritable_directory_propagates() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o500)).unwrap();

        let writable = fs::write(locked.join(".write-check"), b"").is_ok();
        let result = create_migration(&locked, "orders", "init");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o700)).unwrap();

        // Permission bits are not enforced for privileged users.
        if !writable {
            assert!(matches!(result, Err(HubError::Io(_))));
        }
    }
}
