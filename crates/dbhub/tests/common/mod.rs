#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dbhub::{ClientFactory, DatabaseClient, DatabaseConfig, HubError, HubResult};

pub const COUNTING_FACTORY: &str = "counting";

/// Factory that counts constructions and takes a while to connect
///
/// Clients named in `failing_disconnects` error when disposed.
pub struct CountingFactory {
    pub connects: AtomicUsize,
    pub disconnects: Arc<AtomicUsize>,
    pub delay: Duration,
    pub failing_disconnects: Vec<String>,
}

impl CountingFactory {
    pub fn new(delay: Duration) -> Self {
        Self {
            connects: AtomicUsize::new(0),
            disconnects: Arc::new(AtomicUsize::new(0)),
            delay,
            failing_disconnects: Vec::new(),
        }
    }

    pub fn failing_disconnect(mut self, name: &str) -> Self {
        self.failing_disconnects.push(name.to_string());
        self
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

pub struct CountingClient {
    name: String,
    pub url: String,
    disconnects: Arc<AtomicUsize>,
    fail_disconnect: bool,
}

#[async_trait]
impl DatabaseClient for CountingClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn ping(&self) -> HubResult<()> {
        Ok(())
    }

    async fn disconnect(&self) -> HubResult<()> {
        if self.fail_disconnect {
            return Err(HubError::connection(&self.name, "connection already reset"));
        }
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl ClientFactory for CountingFactory {
    async fn connect(
        &self,
        config: &DatabaseConfig,
        url: &str,
    ) -> HubResult<Arc<dyn DatabaseClient>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(Arc::new(CountingClient {
            name: config.name.clone(),
            url: url.to_string(),
            disconnects: Arc::clone(&self.disconnects),
            fail_disconnect: self.failing_disconnects.contains(&config.name),
        }))
    }
}

pub fn write(path: impl AsRef<Path>, content: &str) {
    let path = path.as_ref();
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

pub fn datasource(provider: &str) -> String {
    format!(
        "// generated\n\
         datasource db {{\n  provider = \"{}\"\n  url      = env(\"DATABASE_URL\")\n}}\n\n\
         model Order {{\n  id Int @id\n}}\n",
        provider
    )
}
