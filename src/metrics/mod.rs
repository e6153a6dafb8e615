use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

use crate::store::StoreKey;
use crate::sync::SyncTrigger;

// ============================================================================
// Metrics Module - Prometheus metrics for the data layer
// ============================================================================
//
// Provides metrics for:
// - Sync invocations per trigger
// - Per-rule destination writes (applied / failed)
// - Skipped sync calls (engine disabled, no matching rule)
// - Store connection attempts
//
// Rendered in the Prometheus text format by `lms-data status`.
// ============================================================================

/// Central metrics registry for the data layer
pub struct Metrics {
    registry: Registry,

    pub sync_invocations: IntCounterVec,
    pub sync_rule_writes: IntCounterVec,
    pub sync_skipped: IntCounterVec,
    pub store_connects: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let sync_invocations = IntCounterVec::new(
            Opts::new("sync_invocations_total", "Sync engine invocations"),
            &["trigger"],
        )?;
        registry.register(Box::new(sync_invocations.clone()))?;

        let sync_rule_writes = IntCounterVec::new(
            Opts::new("sync_rule_writes_total", "Destination writes attempted per sync rule"),
            &["rule", "outcome"],
        )?;
        registry.register(Box::new(sync_rule_writes.clone()))?;

        let sync_skipped = IntCounterVec::new(
            Opts::new("sync_skipped_total", "Sync invocations that wrote nothing"),
            &["reason"],
        )?;
        registry.register(Box::new(sync_skipped.clone()))?;

        let store_connects = IntCounterVec::new(
            Opts::new("store_connect_total", "Store connection attempts"),
            &["store", "outcome"],
        )?;
        registry.register(Box::new(store_connects.clone()))?;

        Ok(Self {
            registry,
            sync_invocations,
            sync_rule_writes,
            sync_skipped,
            store_connects,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_sync_invocation(&self, trigger: SyncTrigger) {
        self.sync_invocations.with_label_values(&[trigger.as_str()]).inc();
    }

    pub fn record_rule_write(&self, rule: &str, applied: bool) {
        let outcome = if applied { "applied" } else { "failed" };
        self.sync_rule_writes.with_label_values(&[rule, outcome]).inc();
    }

    pub fn record_sync_skipped(&self, reason: &str) {
        self.sync_skipped.with_label_values(&[reason]).inc();
    }

    pub fn record_store_connect(&self, store: StoreKey, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.store_connects.with_label_values(&[store.as_str(), outcome]).inc();
    }

    /// Text exposition of everything registered.
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            tracing::error!(error = %e, "Failed to encode metrics");
            return String::new();
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_rule_writes() {
        let metrics = Metrics::new().unwrap();
        metrics.record_rule_write("postgres.users->firebase.users", true);
        metrics.record_rule_write("postgres.users->firebase.users", false);
        metrics.record_rule_write("postgres.users->firebase.users", true);

        let gathered = metrics.registry.gather();
        let writes = gathered.iter().find(|m| m.name() == "sync_rule_writes_total").unwrap();
        assert_eq!(writes.metric.len(), 2); // applied + failed label sets
    }

    #[test]
    fn test_record_store_connect() {
        let metrics = Metrics::new().unwrap();
        metrics.record_store_connect(StoreKey::Postgres, false);

        let gathered = metrics.registry.gather();
        let connects = gathered.iter().find(|m| m.name() == "store_connect_total").unwrap();
        assert_eq!(connects.metric[0].counter.value, Some(1.0));
    }

    #[test]
    fn test_render_text_format() {
        let metrics = Metrics::new().unwrap();
        metrics.record_sync_invocation(SyncTrigger::OnCreate);
        metrics.record_sync_skipped("disabled");

        let text = metrics.render();
        assert!(text.contains("sync_invocations_total{trigger=\"onCreate\"} 1"));
        assert!(text.contains("sync_skipped_total{reason=\"disabled\"} 1"));
    }
}
