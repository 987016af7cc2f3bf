use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

pub const ITEM_TYPES: &[&str] = &["article", "news", "service", "event", "place"];

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Bookmark {
    pub id: Uuid,
    pub user_id: Uuid,
    pub item_id: String,
    pub item_type: String,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBookmarkRequest {
    pub item_id: String,
    pub item_type: String,
    pub title: Option<String>,
}

impl CreateBookmarkRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.item_id.trim().is_empty() {
            return Err("item_id is required".into());
        }
        if !ITEM_TYPES.contains(&self.item_type.as_str()) {
            return Err(format!("item_type must be one of {}", ITEM_TYPES.join(", ")));
        }
        Ok(())
    }
}

impl Bookmark {
    pub async fn list(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Bookmark>(
            r#"
            SELECT id, user_id, item_id, item_type, title, created_at
            FROM bookmarks
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// 同一用户重复收藏同一条目时返回已有记录
    pub async fn add(
        pool: &PgPool,
        user_id: Uuid,
        req: CreateBookmarkRequest,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Bookmark>(
            r#"
            INSERT INTO bookmarks (id, user_id, item_id, item_type, title, created_at)
            VALUES ($1, $2, $3, $4, $5, now())
            ON CONFLICT (user_id, item_id, item_type)
                DO UPDATE SET title = COALESCE(EXCLUDED.title, bookmarks.title)
            RETURNING id, user_id, item_id, item_type, title, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(req.item_id.trim())
        .bind(req.item_type)
        .bind(req.title)
        .fetch_one(pool)
        .await
    }

    pub async fn remove(pool: &PgPool, user_id: Uuid, bookmark_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM bookmarks WHERE id = $1 AND user_id = $2")
            .bind(bookmark_id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
