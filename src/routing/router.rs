use std::collections::BTreeMap;
use std::sync::Arc;

use super::ModelRegistry;
use crate::error::{DbError, DbResult};
use crate::models::{AsAnyModel, EntityModel};
use crate::store::{StoreConnector, StoreKey};

/// One row of the routing table, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteStatus {
    pub entity: String,
    pub store: StoreKey,
    pub attached: bool,
}

pub struct Router {
    routing: BTreeMap<String, StoreKey>,
    registry: ModelRegistry,
    connector: Arc<dyn StoreConnector>,
}

impl Router {
    pub fn new(
        routing: BTreeMap<String, StoreKey>,
        registry: ModelRegistry,
        connector: Arc<dyn StoreConnector>,
    ) -> Self {
        for (entity, store) in &routing {
            if !registry.contains(*store, entity) {
                tracing::warn!(entity = %entity, store = %store, "Routed entity has no model attached");
            }
        }
        Self {
            routing,
            registry,
            connector,
        }
    }

    /// Store owning `entity`, per the routing table.
    pub fn store_for(&self, entity: &str) -> Option<StoreKey> {
        self.routing.get(entity).copied()
    }

    /// Model for `entity` in the store the routing table assigns it to.
    pub async fn resolve(&self, entity: &str) -> DbResult<Arc<dyn EntityModel>> {
        let store = self
            .store_for(entity)
            .ok_or_else(|| DbError::UnroutedEntity(entity.to_string()))?;
        self.resolve_in(store, entity).await
    }

    /// Model for `entity` in an explicitly named store. Makes sure the store
    /// is connected; a connection failure is logged and the model is still
    /// returned, so the failure surfaces on the model's first operation.
    pub async fn resolve_in(&self, store: StoreKey, entity: &str) -> DbResult<Arc<dyn EntityModel>> {
        let model = self
            .registry
            .get(store, entity)
            .ok_or_else(|| DbError::UnattachedModel {
                store,
                entity: entity.to_string(),
            })?;

        if let Err(e) = self.connector.ensure_connected(store).await {
            tracing::warn!(entity = %entity, store = %store, error = %e, "Store connection failed during resolve");
        }
        Ok(model)
    }

    /// Typed resolve: `router.resolve_as::<UserModel>("users")`.
    pub async fn resolve_as<T>(&self, entity: &str) -> DbResult<Arc<T>>
    where
        T: EntityModel + 'static,
    {
        self.resolve(entity)
            .await?
            .into_any()
            .downcast::<T>()
            .map_err(|_| DbError::ModelMismatch(entity.to_string()))
    }

    pub fn routed_entities(&self) -> Vec<RouteStatus> {
        self.routing
            .iter()
            .map(|(entity, store)| RouteStatus {
                entity: entity.clone(),
                store: *store,
                attached: self.registry.contains(*store, entity),
            })
            .collect()
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }
}
