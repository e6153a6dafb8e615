use serde_json::Value;
use std::sync::Arc;

use super::{SyncRule, SyncTrigger};
use crate::config::SyncConfig;
use crate::error::{DbError, DbResult};
use crate::metrics::Metrics;
use crate::models::Record;
use crate::routing::Router;
use crate::store::EntityRef;

/// Outcome of one sync invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub trigger: SyncTrigger,
    /// Rules whose source and trigger matched
    pub matched: usize,
    pub applied: usize,
    pub failed: usize,
}

impl SyncReport {
    fn new(trigger: SyncTrigger) -> Self {
        Self {
            trigger,
            matched: 0,
            applied: 0,
            failed: 0,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

pub struct SyncEngine {
    enabled: bool,
    rules: Vec<SyncRule>,
    router: Arc<Router>,
    metrics: Option<Arc<Metrics>>,
}

impl SyncEngine {
    pub fn new(enabled: bool, rules: Vec<SyncRule>, router: Arc<Router>) -> Self {
        Self {
            enabled,
            rules,
            router,
            metrics: None,
        }
    }

    pub fn from_config(config: &SyncConfig, router: Arc<Router>) -> DbResult<Self> {
        let rules = config
            .rules
            .iter()
            .map(SyncRule::from_config)
            .collect::<DbResult<Vec<_>>>()?;
        Ok(Self::new(config.enabled, rules, router))
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn rules(&self) -> &[SyncRule] {
        &self.rules
    }

    /// Propagate a newly created record. Destinations are upserted, keyed by
    /// the record's `id`.
    pub async fn on_create(&self, entity: &str, record: &Record) -> SyncReport {
        self.run(SyncTrigger::OnCreate, entity, record).await
    }

    /// Propagate a completion fact. Destinations get a new appended entry.
    pub async fn on_complete(&self, entity: &str, record: &Record) -> SyncReport {
        self.run(SyncTrigger::OnComplete, entity, record).await
    }

    async fn run(&self, trigger: SyncTrigger, entity: &str, record: &Record) -> SyncReport {
        let mut report = SyncReport::new(trigger);

        if !self.enabled {
            tracing::debug!(entity, trigger = %trigger, "Sync disabled, skipping");
            self.skipped("disabled");
            return report;
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_sync_invocation(trigger);
        }

        let Some(store) = self.router.store_for(entity) else {
            tracing::debug!(entity, trigger = %trigger, "Entity not routed, no sync source");
            self.skipped("no_rules");
            return report;
        };
        let source = EntityRef::new(store, entity);

        for rule in self.rules.iter().filter(|r| r.trigger == trigger && r.from == source) {
            report.matched += 1;
            let label = rule.label();

            let applied = match self.apply(rule, record).await {
                Ok(()) => {
                    tracing::debug!(rule = %label, "Sync rule applied");
                    true
                }
                Err(e) => {
                    tracing::error!(rule = %label, entity, error = %e, "❌ Sync write failed");
                    false
                }
            };
            if applied {
                report.applied += 1;
            } else {
                report.failed += 1;
            }
            if let Some(metrics) = &self.metrics {
                metrics.record_rule_write(&label, applied);
            }
        }

        if report.matched == 0 {
            self.skipped("no_rules");
        }
        report
    }

    async fn apply(&self, rule: &SyncRule, record: &Record) -> DbResult<()> {
        let data = project_fields(record, rule.fields.as_deref());
        let destination = self.router.resolve_in(rule.to.store, &rule.to.entity).await?;

        match rule.trigger {
            SyncTrigger::OnCreate => {
                let key = record_key(record).ok_or_else(|| {
                    DbError::validation(&rule.from.entity, "record has no string or numeric 'id' to key the sync write")
                })?;
                destination.upsert_record(&key, data).await
            }
            SyncTrigger::OnComplete => destination.append_record(data).await.map(|_| ()),
        }
    }

    fn skipped(&self, reason: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_sync_skipped(reason);
        }
    }
}

/// Copy of `record` restricted to `fields`. Fields missing from the record
/// are left out, never written as null. `None` keeps every field.
pub fn project_fields(record: &Record, fields: Option<&[String]>) -> Record {
    match fields {
        None => record.clone(),
        Some(fields) => fields
            .iter()
            .filter_map(|field| record.get(field).map(|value| (field.clone(), value.clone())))
            .collect(),
    }
}

fn record_key(record: &Record) -> Option<String> {
    match record.get("id")? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}
