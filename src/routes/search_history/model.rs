use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, types::Json};
use uuid::Uuid;

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 50;
const MAX_QUERY_CHARS: usize = 200;

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct SearchHistoryEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub query: String,
    pub filters: Option<Json<serde_json::Value>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ListHistoryQuery {
    pub limit: Option<i64>,
}

impl ListHistoryQuery {
    pub fn effective_limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

#[derive(Debug, Deserialize)]
pub struct RecordSearchRequest {
    pub query: String,
    pub filters: Option<serde_json::Value>,
}

impl RecordSearchRequest {
    /// 返回规整后的查询词
    pub fn normalized_query(&self) -> Result<String, String> {
        let query = self.query.split_whitespace().collect::<Vec<_>>().join(" ");
        if query.is_empty() {
            return Err("query is required".into());
        }
        Ok(query.chars().take(MAX_QUERY_CHARS).collect())
    }
}

impl SearchHistoryEntry {
    pub async fn list(pool: &PgPool, user_id: Uuid, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, SearchHistoryEntry>(
            r#"
            SELECT id, user_id, query, filters, created_at
            FROM search_history
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    pub async fn record(
        pool: &PgPool,
        user_id: Uuid,
        query: String,
        filters: Option<serde_json::Value>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, SearchHistoryEntry>(
            r#"
            INSERT INTO search_history (id, user_id, query, filters, created_at)
            VALUES ($1, $2, $3, $4, now())
            RETURNING id, user_id, query, filters, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(query)
        .bind(filters.map(Json))
        .fetch_one(pool)
        .await
    }

    pub async fn clear(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM search_history WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_query_text() {
        let req = RecordSearchRequest {
            query: "  visa   renewal \n dubai ".into(),
            filters: None,
        };
        assert_eq!(req.normalized_query().unwrap(), "visa renewal dubai");

        let empty = RecordSearchRequest {
            query: "   ".into(),
            filters: None,
        };
        assert!(empty.normalized_query().is_err());

        let long = RecordSearchRequest {
            query: "a".repeat(500),
            filters: None,
        };
        assert_eq!(long.normalized_query().unwrap().len(), MAX_QUERY_CHARS);
    }

    #[test]
    fn clamps_list_limit() {
        assert_eq!(ListHistoryQuery { limit: None }.effective_limit(), DEFAULT_LIMIT);
        assert_eq!(ListHistoryQuery { limit: Some(500) }.effective_limit(), MAX_LIMIT);
        assert_eq!(ListHistoryQuery { limit: Some(0) }.effective_limit(), 1);
    }
}
