pub mod health;
pub mod info;
pub mod lifecycle;
pub mod list;
pub mod migrate;
pub mod output;
pub mod scan;

use anyhow::anyhow;

use crate::context::Hub;

/// Databases a command applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    One(String),
    All,
}

impl Selection {
    /// An explicit name, every database with `--all`, else the default database
    pub fn resolve(hub: &Hub, name: Option<String>, all: bool) -> anyhow::Result<Self> {
        Self::pick(name, all, || hub.registry.default_database())
    }

    fn pick(
        name: Option<String>,
        all: bool,
        default: impl FnOnce() -> Option<String>,
    ) -> anyhow::Result<Self> {
        match (name, all) {
            (Some(_), true) => Err(anyhow!("pass either a database name or --all, not both")),
            (Some(name), false) => Ok(Selection::One(name)),
            (None, true) => Ok(Selection::All),
            (None, false) => default()
                .map(Selection::One)
                .ok_or_else(|| anyhow!("no database given and no default database is registered")),
        }
    }
}
