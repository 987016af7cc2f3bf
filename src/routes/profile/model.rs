use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

pub const LANGUAGES: &[&str] = &["en", "ar", "hi", "ur"];
pub const USER_TYPES: &[&str] = &["resident", "tourist", "business"];

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub language: Option<String>,
    pub user_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub language: Option<String>,
    pub user_type: Option<String>,
}

impl UpdateProfileRequest {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.full_name {
            if name.trim().is_empty() || name.chars().count() > 120 {
                return Err("full_name must be 1-120 characters".into());
            }
        }
        if let Some(language) = &self.language {
            if !LANGUAGES.contains(&language.as_str()) {
                return Err(format!("language must be one of {}", LANGUAGES.join(", ")));
            }
        }
        if let Some(user_type) = &self.user_type {
            if !USER_TYPES.contains(&user_type.as_str()) {
                return Err(format!("user_type must be one of {}", USER_TYPES.join(", ")));
            }
        }
        Ok(())
    }
}

impl Profile {
    pub async fn find_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, full_name, avatar_url, language, user_type, created_at, updated_at
            FROM profiles
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// 未提供的字段保留原值
    pub async fn upsert(
        pool: &PgPool,
        user_id: Uuid,
        req: UpdateProfileRequest,
    ) -> Result<Self, sqlx::Error> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (id, full_name, avatar_url, language, user_type, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, now(), now())
            ON CONFLICT (id) DO UPDATE SET
                full_name = COALESCE(EXCLUDED.full_name, profiles.full_name),
                avatar_url = COALESCE(EXCLUDED.avatar_url, profiles.avatar_url),
                language = COALESCE(EXCLUDED.language, profiles.language),
                user_type = COALESCE(EXCLUDED.user_type, profiles.user_type),
                updated_at = now()
            RETURNING id, full_name, avatar_url, language, user_type, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(req.full_name.map(|n| n.trim().to_string()))
        .bind(req.avatar_url)
        .bind(req.language)
        .bind(req.user_type)
        .fetch_one(pool)
        .await?;

        tracing::info!("Updated profile for user {}", user_id);
        Ok(profile)
    }
}
