use std::collections::HashMap;
use std::sync::Arc;

use crate::models::{
    CommentModel, CourseModel, EnrollmentModel, EntityModel, LessonModel, NotificationModel, ProgressModel,
    ProgressSnapshotModel, QuizModel, UserMirrorModel, UserModel,
};
use crate::store::{StoreKey, Stores};

/// Models by (store, entity). The same entity name may exist in both stores
/// (`users` is relational and mirrored in the document store).
#[derive(Default)]
pub struct ModelRegistry {
    models: HashMap<(StoreKey, String), Arc<dyn EntityModel>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in model, bound to the adapters in `stores`.
    pub fn with_default_models(stores: &Stores) -> Self {
        let pg = &stores.postgres;
        let doc = &stores.document;

        let mut registry = Self::new();
        registry.register(Arc::new(UserModel::new(pg.clone())));
        registry.register(Arc::new(CourseModel::new(pg.clone())));
        registry.register(Arc::new(LessonModel::new(pg.clone())));
        registry.register(Arc::new(QuizModel::new(pg.clone())));
        registry.register(Arc::new(EnrollmentModel::new(pg.clone())));
        registry.register(Arc::new(ProgressSnapshotModel::new(pg.clone())));

        registry.register(Arc::new(ProgressModel::new(doc.clone())));
        registry.register(Arc::new(CommentModel::new(doc.clone())));
        registry.register(Arc::new(NotificationModel::new(doc.clone())));
        registry.register(Arc::new(UserMirrorModel::new(doc.clone())));
        registry
    }

    /// Add `model` under its own store and entity name, replacing any
    /// previous model there.
    pub fn register(&mut self, model: Arc<dyn EntityModel>) {
        let key = (model.store(), model.entity().to_string());
        if self.models.insert(key.clone(), model).is_some() {
            tracing::warn!(store = %key.0, entity = %key.1, "Model registered twice, keeping the latest");
        }
    }

    pub fn get(&self, store: StoreKey, entity: &str) -> Option<Arc<dyn EntityModel>> {
        self.models.get(&(store, entity.to_string())).cloned()
    }

    pub fn contains(&self, store: StoreKey, entity: &str) -> bool {
        self.models.contains_key(&(store, entity.to_string()))
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PostgresConfig;
    use crate::store::{DocumentAdapter, PostgresAdapter};

    #[test]
    fn test_default_models_cover_both_stores() {
        let stores = Stores::new(
            Arc::new(PostgresAdapter::new(PostgresConfig::default())),
            Arc::new(DocumentAdapter::in_memory()),
        );
        let registry = ModelRegistry::with_default_models(&stores);

        assert_eq!(registry.len(), 10);
        for entity in ["users", "courses", "lessons", "quizzes", "enrollments", "progress_snapshots"] {
            assert!(registry.contains(StoreKey::Postgres, entity), "{entity}");
        }
        for entity in ["progress", "comments", "notifications", "users"] {
            assert!(registry.contains(StoreKey::Firebase, entity), "{entity}");
        }
        assert!(!registry.contains(StoreKey::Firebase, "media"));
        assert!(registry.get(StoreKey::Postgres, "progress").is_none());
    }
}
