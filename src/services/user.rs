use serde::Serialize;
use std::sync::Arc;

use crate::database::Database;
use crate::error::{DbError, DbResult};
use crate::models::postgres::{NewUser, User};
use crate::models::{to_record, UserModel};
use crate::sync::SyncEngine;

use super::TokenIssuer;

/// A successful login: a signed session token and the user it was issued for.
#[derive(Debug, Clone, Serialize)]
pub struct LoginSession {
    pub token: String,
    pub user: User,
}

pub struct UserService {
    users: Arc<UserModel>,
    sync: Arc<SyncEngine>,
    tokens: Option<TokenIssuer>,
}

impl UserService {
    pub async fn new(db: &Database) -> DbResult<Self> {
        Ok(Self {
            users: db.router().resolve_as::<UserModel>("users").await?,
            sync: db.sync().clone(),
            tokens: TokenIssuer::from_config(db.auth())?,
        })
    }

    /// Create an account and mirror its public fields. A sync failure does
    /// not undo the registration.
    pub async fn register(&self, input: NewUser) -> DbResult<User> {
        if let Some(email) = input.email.as_deref() {
            if self.users.find_by_email(email).await?.is_some() {
                return Err(DbError::Conflict {
                    entity: "users".to_string(),
                    field: "email".to_string(),
                });
            }
        }

        let user = self.users.create(input).await?;
        let report = self.sync.on_create("users", &to_record(&user)?).await;
        if !report.is_clean() {
            tracing::warn!(user_id = %user.id, failed = report.failed, "User registered but not fully synced");
        }
        Ok(user)
    }

    /// `None` for an unknown email or a wrong password.
    pub async fn login(&self, email: &str, password: &str) -> DbResult<Option<LoginSession>> {
        let tokens = self
            .tokens
            .as_ref()
            .ok_or_else(|| DbError::Config("JWT_SECRET not configured, cannot issue session tokens".to_string()))?;

        let Some(user) = self.users.verify_password(email, password).await? else {
            tracing::debug!("Login rejected");
            return Ok(None);
        };

        let token = tokens.issue(&user)?;
        tracing::info!(user_id = %user.id, "Login succeeded");
        Ok(Some(LoginSession { token, user }))
    }
}
