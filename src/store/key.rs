use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DbError;

/// Backends an entity can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKey {
    /// Relational store (PostgreSQL)
    Postgres,
    /// Document / real-time store (Firebase Realtime Database)
    Firebase,
}

impl StoreKey {
    pub const ALL: [StoreKey; 2] = [StoreKey::Postgres, StoreKey::Firebase];

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKey::Postgres => "postgres",
            StoreKey::Firebase => "firebase",
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreKey {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "postgres" => Ok(StoreKey::Postgres),
            "firebase" => Ok(StoreKey::Firebase),
            other => Err(DbError::Config(format!("unknown store key '{other}'"))),
        }
    }
}

/// A store-qualified entity name, written `<store>.<entity>` in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityRef {
    pub store: StoreKey,
    pub entity: String,
}

impl EntityRef {
    pub fn new(store: StoreKey, entity: impl Into<String>) -> Self {
        Self {
            store,
            entity: entity.into(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.store, self.entity)
    }
}

impl FromStr for EntityRef {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (store, entity) = s
            .split_once('.')
            .ok_or_else(|| DbError::Config(format!("expected '<store>.<entity>', got '{s}'")))?;
        if entity.is_empty() || entity.contains('.') {
            return Err(DbError::Config(format!("invalid entity in '{s}'")));
        }
        Ok(EntityRef::new(store.parse()?, entity))
    }
}
