mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{write, CountingFactory, COUNTING_FACTORY};
use dbhub::{
    ClientDiscovery, ClientRegistry, ConfigResolver, DatabaseConfig, FactoryTable, HealthChecker,
    MapEnv, Provider,
};
use tempfile::TempDir;

fn registry(factory: Arc<CountingFactory>, env: MapEnv) -> ClientRegistry {
    let mut factories = FactoryTable::with_defaults();
    factories.register(COUNTING_FACTORY, factory);
    ClientRegistry::new(Arc::new(factories), ConfigResolver::new(Arc::new(env)))
}

async fn connect_counting(registry: &ClientRegistry, name: &str) {
    let url = format!("postgresql://localhost/{}", name);
    registry.add_database(
        DatabaseConfig::with_url(name, Provider::PostgreSQL, url).with_factory(COUNTING_FACTORY),
    );
    registry.get_client(name).await.unwrap();
}

#[tokio::test]
async fn concurrent_first_access_connects_once() {
    let factory = Arc::new(CountingFactory::new(Duration::from_millis(50)));
    let registry = Arc::new(registry(Arc::clone(&factory), MapEnv::new()));
    registry.add_database(
        DatabaseConfig::with_url("orders", Provider::PostgreSQL, "postgresql://localhost/orders")
            .with_factory(COUNTING_FACTORY),
    );

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                registry
                    .get_client("orders")
                    .await
                    .map(|client| client.name().to_string())
            })
        })
        .collect();

    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap(), "orders");
    }
    assert_eq!(factory.connects(), 1);
    assert!(registry.is_connected("orders"));

    registry.get_client("orders").await.unwrap();
    assert_eq!(factory.connects(), 1);
}

#[tokio::test]
async fn discovered_client_connects_through_resolver() {
    let root = TempDir::new().unwrap();
    write(
        root.path().join("clients/billing/client.toml"),
        &format!("factory = \"{}\"\nprovider = \"mysql\"\n", COUNTING_FACTORY),
    );

    let factory = Arc::new(CountingFactory::new(Duration::ZERO));
    let registry = registry(
        Arc::clone(&factory),
        MapEnv::new().with("DATABASE_URL_BILLING", "mysql://billing.internal/billing"),
    );
    let mut factories = FactoryTable::new();
    factories.register(COUNTING_FACTORY, Arc::clone(&factory) as _);
    let discovery = ClientDiscovery::new(
        root.path().join("clients"),
        root.path().join("schemas"),
        Arc::new(factories),
    );

    let snapshot = discovery.scan().await.unwrap();
    registry.set_discovered(snapshot);

    assert!(registry.get_database_names().is_empty());
    assert_eq!(registry.all_database_names(), vec!["billing"]);

    let (config, url) = registry.connection_target("billing").unwrap();
    assert_eq!(config.provider, Provider::MySQL);
    assert_eq!(url, "mysql://billing.internal/billing");

    registry.get_client("billing").await.unwrap();
    assert_eq!(factory.connects(), 1);
}

#[tokio::test]
async fn disconnect_all_disposes_every_handle() {
    let factory = Arc::new(CountingFactory::new(Duration::ZERO));
    let registry = registry(Arc::clone(&factory), MapEnv::new());
    for name in ["a", "b", "c"] {
        connect_counting(&registry, name).await;
    }

    let outcomes = registry.disconnect_all().await;
    let names: Vec<&str> = outcomes.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert!(outcomes.iter().all(|o| o.error.is_none()));
    assert_eq!(factory.disconnects.load(Ordering::SeqCst), 3);
    assert!(!registry.is_connected("a"));

    // A fresh handle is built after disposal.
    registry.get_client("a").await.unwrap();
    assert_eq!(factory.connects(), 4);
}

#[tokio::test]
async fn disconnect_all_continues_past_failing_handle() {
    let factory = Arc::new(CountingFactory::new(Duration::ZERO).failing_disconnect("b"));
    let registry = registry(Arc::clone(&factory), MapEnv::new());
    for name in ["a", "b", "c"] {
        connect_counting(&registry, name).await;
    }

    let outcomes = registry.disconnect_all().await;
    assert_eq!(outcomes.len(), 3);
    for outcome in &outcomes {
        match outcome.name.as_str() {
            "b" => {
                let error = outcome.error.as_deref().unwrap();
                assert!(error.contains("connection already reset"), "{}", error);
            }
            _ => assert!(outcome.error.is_none(), "{:?}", outcome),
        }
    }

    assert_eq!(factory.disconnects.load(Ordering::SeqCst), 2);
    for name in ["a", "b", "c"] {
        assert!(!registry.is_connected(name));
    }
}

#[tokio::test]
async fn health_check_covers_discovered_and_manual_databases() {
    let factory = Arc::new(CountingFactory::new(Duration::ZERO));
    let registry = Arc::new(registry(Arc::clone(&factory), MapEnv::new()));
    registry.add_database(
        DatabaseConfig::with_url("main", Provider::PostgreSQL, "postgresql://localhost/main")
            .with_factory(COUNTING_FACTORY),
    );
    registry.add_database(DatabaseConfig::with_url(
        "mongo",
        Provider::MongoDB,
        "mongodb://localhost/mongo",
    ));

    let health = HealthChecker::new(Arc::clone(&registry), Duration::from_millis(500))
        .check()
        .await;

    assert_eq!(health.len(), 2);
    assert!(health["main"]);
    // The bundled sqlx factory has no MongoDB driver.
    assert!(!health["mongo"]);
}
