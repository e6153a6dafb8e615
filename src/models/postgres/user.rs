use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::models::{require, EntityModel};
use crate::store::{PostgresAdapter, StoreAdapter, StoreKey};

const ENTITY: &str = "users";

/// Public view of a user; the password hash never leaves this module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub email: String,
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub role: String,
    pub two_factor_enabled: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewUser {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub tenant_id: Option<Uuid>,
    pub role: Option<String>,
    pub two_factor_enabled: bool,
}

#[derive(FromRow)]
struct UserCredentials {
    #[sqlx(flatten)]
    user: User,
    password_hash: String,
}

const USER_COLUMNS: &str = "id, tenant_id, email, name, avatar, role, two_factor_enabled, created_at";

pub struct UserModel {
    adapter: Arc<PostgresAdapter>,
}

impl UserModel {
    pub fn new(adapter: Arc<PostgresAdapter>) -> Self {
        Self { adapter }
    }

    pub async fn find_by_id(&self, id: Uuid) -> DbResult<Option<User>> {
        let db = self.adapter.get_instance().await?;
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL");
        Ok(sqlx::query_as::<_, User>(&sql).bind(id).fetch_optional(&db).await?)
    }

    pub async fn find_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let db = self.adapter.get_instance().await?;
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND deleted_at IS NULL");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(normalize_email(email))
            .fetch_optional(&db)
            .await?)
    }

    pub async fn find_all(&self) -> DbResult<Vec<User>> {
        let db = self.adapter.get_instance().await?;
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE deleted_at IS NULL ORDER BY created_at, id");
        Ok(sqlx::query_as::<_, User>(&sql).fetch_all(&db).await?)
    }

    /// Insert a user. The email must be unique; on conflict nothing is written.
    pub async fn create(&self, input: NewUser) -> DbResult<User> {
        let email = normalize_email(require(ENTITY, "email", &input.email)?);
        if !email.contains('@') {
            return Err(DbError::validation(ENTITY, format!("invalid email '{email}'")));
        }
        let password = require(ENTITY, "password", &input.password)?.to_string();
        let password_hash = hash_password(password).await?;

        let db = self.adapter.get_instance().await?;
        let sql = format!(
            "INSERT INTO users (email, password_hash, name, avatar, tenant_id, role, two_factor_enabled)
             VALUES ($1, $2, $3, $4, $5, COALESCE($6, 'student'), $7)
             RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(&email)
            .bind(&password_hash)
            .bind(&input.name)
            .bind(&input.avatar)
            .bind(input.tenant_id)
            .bind(&input.role)
            .bind(input.two_factor_enabled)
            .fetch_one(&db)
            .await
            .map_err(|e| DbError::from_insert(ENTITY, "email", e))?;

        tracing::info!(user_id = %user.id, "User created");
        Ok(user)
    }

    /// The user when `password` matches, `None` for unknown email or wrong password.
    pub async fn verify_password(&self, email: &str, password: &str) -> DbResult<Option<User>> {
        let db = self.adapter.get_instance().await?;
        let sql = format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = $1 AND deleted_at IS NULL"
        );
        let Some(row) = sqlx::query_as::<_, UserCredentials>(&sql)
            .bind(normalize_email(email))
            .fetch_optional(&db)
            .await?
        else {
            return Ok(None);
        };

        let matches = check_password(password.to_string(), row.password_hash).await?;
        Ok(matches.then_some(row.user))
    }
}

impl EntityModel for UserModel {
    fn entity(&self) -> &str {
        ENTITY
    }

    fn store(&self) -> StoreKey {
        StoreKey::Postgres
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

async fn hash_password(password: String) -> DbResult<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| DbError::Internal(format!("password hashing failed: {e}")))
    })
    .await
    .map_err(|e| DbError::Internal(format!("password hashing task failed: {e}")))?
}

async fn check_password(password: String, stored_hash: String) -> DbResult<bool> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&stored_hash)
            .map_err(|e| DbError::Internal(format!("stored password hash unreadable: {e}")))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| DbError::Internal(format!("password check task failed: {e}")))?
}
