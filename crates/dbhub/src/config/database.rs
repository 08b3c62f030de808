//! Logical database declarations

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{HubError, HubResult};
use crate::provider::Provider;

/// Log categories a client may emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogCategory {
    Query,
    Info,
    Warn,
    Error,
}

/// How to reach a logical database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConnectionParams {
    /// Pre-built connection URL
    Url { url: String },
    /// Structured connection bundle
    Params {
        host: String,
        #[serde(default)]
        port: Option<u16>,
        #[serde(default)]
        username: Option<String>,
        #[serde(default)]
        password: Option<String>,
        database: String,
        #[serde(default)]
        ssl: bool,
    },
}

impl ConnectionParams {
    pub fn url(url: impl Into<String>) -> Self {
        ConnectionParams::Url { url: url.into() }
    }

    /// Render the connection target as a provider URL
    pub fn to_url(&self, provider: &Provider) -> HubResult<String> {
        let (host, port, username, password, database, ssl) = match self {
            ConnectionParams::Url { url } => return Ok(url.clone()),
            ConnectionParams::Params {
                host,
                port,
                username,
                password,
                database,
                ssl,
            } => (host, *port, username, password, database, *ssl),
        };

        let port = port.or_else(|| provider.default_port());
        match provider {
            Provider::SQLite => Ok(format!("file:{}", database)),
            Provider::SqlServer => {
                let mut url = format!(
                    "sqlserver://{}:{};database={}",
                    host,
                    port.unwrap_or(1433),
                    database
                );
                if let Some(user) = username {
                    url.push_str(&format!(";user={}", user));
                }
                if let Some(password) = password {
                    url.push_str(&format!(";password={}", password));
                }
                if ssl {
                    url.push_str(";encrypt=true");
                }
                Ok(url)
            }
            Provider::Other(literal) => Err(HubError::configuration(format!(
                "cannot build a connection URL for provider '{}' from structured parameters",
                literal
            ))),
            _ => {
                let scheme = match provider {
                    Provider::MySQL => "mysql",
                    Provider::MongoDB => "mongodb",
                    _ => "postgresql",
                };
                let mut url = Url::parse(&format!("{}://{}", scheme, host)).map_err(|e| {
                    HubError::configuration(format!("invalid host '{}': {}", host, e))
                })?;
                url.set_port(port).map_err(|_| {
                    HubError::configuration(format!("cannot set port on '{}'", host))
                })?;
                if let Some(user) = username {
                    url.set_username(user)
                        .map_err(|_| HubError::configuration("cannot set username"))?;
                }
                if password.is_some() {
                    url.set_password(password.as_deref())
                        .map_err(|_| HubError::configuration("cannot set password"))?;
                }
                url.set_path(database);
                if ssl {
                    let (key, value) = match provider {
                        Provider::MySQL => ("ssl-mode", "REQUIRED"),
                        Provider::MongoDB => ("tls", "true"),
                        _ => ("sslmode", "require"),
                    };
                    url.query_pairs_mut().append_pair(key, value);
                }
                Ok(url.to_string())
            }
        }
    }
}

/// Identity and connection intent for one logical database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub name: String,
    #[serde(default)]
    pub provider: Provider,
    #[serde(flatten)]
    pub connection: ConnectionParams,
    #[serde(default, rename = "log")]
    pub logging: BTreeSet<LogCategory>,
    /// Registered client factory; the hub default is used when absent
    #[serde(default)]
    pub factory: Option<String>,
}

impl DatabaseConfig {
    pub fn new(name: impl Into<String>, provider: Provider, connection: ConnectionParams) -> Self {
        Self {
            name: name.into(),
            provider,
            connection,
            logging: [LogCategory::Error].into_iter().collect(),
            factory: None,
        }
    }

    pub fn with_url(name: impl Into<String>, provider: Provider, url: impl Into<String>) -> Self {
        Self::new(name, provider, ConnectionParams::url(url))
    }

    pub fn with_factory(mut self, factory: impl Into<String>) -> Self {
        self.factory = Some(factory.into());
        self
    }

    pub fn logs(&self, category: LogCategory) -> bool {
        self.logging.contains(&category)
    }

    pub fn connection_url(&self) -> HubResult<String> {
        self.connection.to_url(&self.provider)
    }
}
