use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::SyncRuleConfig;
use crate::error::DbResult;
use crate::store::EntityRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncTrigger {
    #[serde(rename = "onCreate")]
    OnCreate,
    #[serde(rename = "onComplete")]
    OnComplete,
}

impl SyncTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncTrigger::OnCreate => "onCreate",
            SyncTrigger::OnComplete => "onComplete",
        }
    }
}

impl fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed sync rule. `fields: None` copies the whole record.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncRule {
    pub from: EntityRef,
    pub to: EntityRef,
    pub fields: Option<Vec<String>>,
    pub trigger: SyncTrigger,
}

impl SyncRule {
    pub fn from_config(config: &SyncRuleConfig) -> DbResult<Self> {
        Ok(Self {
            from: config.from.parse()?,
            to: config.to.parse()?,
            fields: config.fields.clone(),
            trigger: config.trigger,
        })
    }

    /// `postgres.users->firebase.users`, used in logs and metric labels.
    pub fn label(&self) -> String {
        format!("{}->{}", self.from, self.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::store::StoreKey;

    fn config(from: &str, to: &str) -> SyncRuleConfig {
        SyncRuleConfig {
            from: from.to_string(),
            to: to.to_string(),
            fields: Some(vec!["id".to_string()]),
            trigger: SyncTrigger::OnCreate,
        }
    }

    #[test]
    fn test_rule_from_config() {
        let rule = SyncRule::from_config(&config("postgres.users", "firebase.users")).unwrap();
        assert_eq!(rule.from, EntityRef::new(StoreKey::Postgres, "users"));
        assert_eq!(rule.to, EntityRef::new(StoreKey::Firebase, "users"));
        assert_eq!(rule.label(), "postgres.users->firebase.users");
    }

    #[test]
    fn test_malformed_rule_is_config_error() {
        let err = SyncRule::from_config(&config("users", "firebase.users")).unwrap_err();
        assert!(matches!(err, DbError::Config(_)));
        let err = SyncRule::from_config(&config("postgres.users", "mongo.users")).unwrap_err();
        assert!(matches!(err, DbError::Config(_)));
    }

    #[test]
    fn test_trigger_names() {
        assert_eq!(SyncTrigger::OnCreate.to_string(), "onCreate");
        assert_eq!(serde_json::to_string(&SyncTrigger::OnComplete).unwrap(), "\"onComplete\"");
    }
}
