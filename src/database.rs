use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::{AppConfig, AuthConfig};
use crate::error::{DbError, DbResult};
use crate::metrics::Metrics;
use crate::routing::{ModelRegistry, Router};
use crate::store::{DocumentAdapter, PostgresAdapter, StoreKey, Stores};
use crate::sync::{SyncEngine, SyncRule};

// ============================================================================
// Composition Root
// ============================================================================
//
// Built once per process from `AppConfig`:
// 1. store adapters (nothing is connected yet)
// 2. model registry bound to those adapters
// 3. router over the routing table
// 4. sync engine over the parsed rules
//
// Rules are validated against the routing table and the registry here, so a
// misconfigured rule fails startup instead of failing every sync call.
//
// ============================================================================

pub struct Database {
    stores: Arc<Stores>,
    router: Arc<Router>,
    sync: Arc<SyncEngine>,
    metrics: Arc<Metrics>,
    auth: AuthConfig,
}

impl Database {
    pub fn build(config: &AppConfig) -> DbResult<Self> {
        let stores = Stores::new(
            Arc::new(PostgresAdapter::new(config.postgres_profile().clone())),
            Arc::new(DocumentAdapter::new(config.firebase.clone())),
        );
        Self::with_stores(config, stores)
    }

    /// Wire everything around caller-provided adapters.
    pub fn with_stores(config: &AppConfig, stores: Stores) -> DbResult<Self> {
        let metrics = Arc::new(
            Metrics::new().map_err(|e| DbError::Internal(format!("failed to create metrics: {e}")))?,
        );
        let stores = Arc::new(stores.with_metrics(metrics.clone()));

        let registry = ModelRegistry::with_default_models(&stores);
        let rules = config
            .sync
            .rules
            .iter()
            .map(SyncRule::from_config)
            .collect::<DbResult<Vec<_>>>()?;
        validate_rules(&rules, &config.routing, &registry)?;

        let router = Arc::new(Router::new(config.routing.clone(), registry, stores.clone()));
        let sync = Arc::new(
            SyncEngine::new(config.sync.enabled, rules, router.clone()).with_metrics(metrics.clone()),
        );

        tracing::info!(
            environment = %config.environment,
            entities = config.routing.len(),
            sync_rules = sync.rules().len(),
            sync_enabled = sync.is_enabled(),
            "Data layer assembled"
        );

        Ok(Self {
            stores,
            router,
            sync,
            metrics,
            auth: config.auth.clone(),
        })
    }

    /// Connect every store. Never fails; see `Stores::connect_all`.
    pub async fn connect_all(&self) {
        self.stores.connect_all().await;
    }

    pub async fn shutdown(&self) {
        self.stores.disconnect_all().await;
        tracing::info!("Data layer shut down");
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn sync(&self) -> &Arc<SyncEngine> {
        &self.sync
    }

    pub fn stores(&self) -> &Arc<Stores> {
        &self.stores
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn auth(&self) -> &AuthConfig {
        &self.auth
    }
}

fn validate_rules(
    rules: &[SyncRule],
    routing: &BTreeMap<String, StoreKey>,
    registry: &ModelRegistry,
) -> DbResult<()> {
    for rule in rules {
        for side in [&rule.from, &rule.to] {
            if !routing.contains_key(&side.entity) {
                return Err(DbError::Config(format!(
                    "sync rule {} names unrouted entity '{}'",
                    rule.label(),
                    side.entity
                )));
            }
        }
        if !registry.contains(rule.to.store, &rule.to.entity) {
            return Err(DbError::Config(format!(
                "sync rule {} has no destination model in store '{}'",
                rule.label(),
                rule.to.store
            )));
        }
        if routing.get(&rule.from.entity) != Some(&rule.from.store) {
            tracing::warn!(rule = %rule.label(), "Sync rule source is not the owning store, it will never fire");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PostgresConfig, SyncRuleConfig};
    use crate::sync::SyncTrigger;

    fn memory_stores() -> Stores {
        Stores::new(
            Arc::new(PostgresAdapter::new(PostgresConfig::default())),
            Arc::new(DocumentAdapter::in_memory()),
        )
    }

    #[test]
    fn test_default_config_builds() {
        let db = Database::with_stores(&AppConfig::default(), memory_stores()).unwrap();
        assert_eq!(db.sync().rules().len(), 2);
        assert_eq!(db.router().store_for("users"), Some(StoreKey::Postgres));
    }

    #[test]
    fn test_rule_with_unrouted_entity_rejected() {
        let mut config = AppConfig::default();
        config.sync.rules.push(SyncRuleConfig {
            from: "postgres.certificates".to_string(),
            to: "firebase.notifications".to_string(),
            fields: None,
            trigger: SyncTrigger::OnCreate,
        });
        let err = Database::with_stores(&config, memory_stores()).err().unwrap();
        assert!(matches!(err, DbError::Config(_)));
    }

    #[test]
    fn test_rule_without_destination_model_rejected() {
        let mut config = AppConfig::default();
        config.sync.rules.push(SyncRuleConfig {
            from: "postgres.courses".to_string(),
            to: "firebase.media".to_string(),
            fields: None,
            trigger: SyncTrigger::OnCreate,
        });
        let err = Database::with_stores(&config, memory_stores()).err().unwrap();
        assert!(matches!(err, DbError::Config(msg) if msg.contains("firebase.media")));
    }

    #[tokio::test]
    async fn test_resolve_connects_document_store_lazily() {
        let db = Database::with_stores(&AppConfig::default(), memory_stores()).unwrap();
        assert!(!db.stores().is_connected(StoreKey::Firebase).await);

        let model = db.router().resolve("comments").await.unwrap();
        assert_eq!(model.store(), StoreKey::Firebase);
        assert!(db.stores().is_connected(StoreKey::Firebase).await);

        db.shutdown().await;
        assert!(!db.stores().is_connected(StoreKey::Firebase).await);
    }
}
