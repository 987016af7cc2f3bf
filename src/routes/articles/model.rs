use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use thiserror::Error;
use uuid::Uuid;

/// 文章审核流程状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArticleStatus {
    Draft,
    Submitted,
    InReview,
    Approved,
    Published,
    Rejected,
    Archived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArticleAction {
    Submit,
    StartReview,
    Approve,
    Reject,
    Publish,
    Revise,
    Archive,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArticleError {
    #[error("unknown article status `{0}`")]
    UnknownStatus(String),
    #[error("cannot {action} an article in status {from}")]
    IllegalTransition {
        from: ArticleStatus,
        action: ArticleAction,
    },
}

impl ArticleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleStatus::Draft => "draft",
            ArticleStatus::Submitted => "submitted",
            ArticleStatus::InReview => "in_review",
            ArticleStatus::Approved => "approved",
            ArticleStatus::Published => "published",
            ArticleStatus::Rejected => "rejected",
            ArticleStatus::Archived => "archived",
        }
    }

    pub fn apply(self, action: ArticleAction) -> Result<ArticleStatus, ArticleError> {
        use ArticleAction::*;
        use ArticleStatus::*;

        let next = match (self, action) {
            (Draft, Submit) => Submitted,
            (Submitted, StartReview) => InReview,
            (InReview, Approve) => Approved,
            (Submitted | InReview, Reject) => Rejected,
            (Approved, Publish) => Published,
            (Rejected, Revise) => Draft,
            (from, Archive) if from != Archived => Archived,
            (from, action) => return Err(ArticleError::IllegalTransition { from, action }),
        };
        Ok(next)
    }
}

impl ArticleAction {
    /// 路由中使用的动作名
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleAction::Submit => "submit",
            ArticleAction::StartReview => "start-review",
            ArticleAction::Approve => "approve",
            ArticleAction::Reject => "reject",
            ArticleAction::Publish => "publish",
            ArticleAction::Revise => "revise",
            ArticleAction::Archive => "archive",
        }
    }
}

impl fmt::Display for ArticleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArticleStatus {
    type Err = ArticleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "draft" => ArticleStatus::Draft,
            "submitted" => ArticleStatus::Submitted,
            "in_review" => ArticleStatus::InReview,
            "approved" => ArticleStatus::Approved,
            "published" => ArticleStatus::Published,
            "rejected" => ArticleStatus::Rejected,
            "archived" => ArticleStatus::Archived,
            other => return Err(ArticleError::UnknownStatus(other.to_string())),
        })
    }
}

impl TryFrom<String> for ArticleStatus {
    type Error = ArticleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Article {
    pub id: Uuid,
    pub title: String,
    pub summary: Option<String>,
    pub content: String,
    pub category: String,
    #[sqlx(try_from = "String")]
    pub status: ArticleStatus,
    pub author_id: Uuid,
    pub reviewer_id: Option<Uuid>,
    pub review_notes: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CreateArticleRequest {
    pub title: String,
    pub summary: Option<String>,
    pub content: String,
    pub category: String,
    pub image_url: Option<String>,
}

impl CreateArticleRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title is required".into());
        }
        if self.content.trim().is_empty() {
            return Err("content is required".into());
        }
        if self.category.trim().is_empty() {
            return Err("category is required".into());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct ListArticlesQuery {
    pub status: Option<ArticleStatus>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TransitionRequest {
    pub notes: Option<String>,
}

const ARTICLE_COLUMNS: &str = "id, title, summary, content, category, status, author_id, \
    reviewer_id, review_notes, image_url, created_at, updated_at, published_at";

pub enum TransitionOutcome {
    Updated(Article),
    NotFound,
    Illegal(ArticleError),
    /// 状态已被并发修改
    Conflict,
}

impl Article {
    pub async fn create(
        pool: &PgPool,
        author_id: Uuid,
        req: CreateArticleRequest,
    ) -> Result<Self, sqlx::Error> {
        let article = sqlx::query_as::<_, Article>(&format!(
            r#"
            INSERT INTO news_articles
                (id, title, summary, content, category, status, author_id, image_url, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now(), now())
            RETURNING {ARTICLE_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(req.title.trim())
        .bind(req.summary)
        .bind(req.content)
        .bind(req.category.trim())
        .bind(ArticleStatus::Draft.as_str())
        .bind(author_id)
        .bind(req.image_url)
        .fetch_one(pool)
        .await?;

        tracing::info!("Created draft article {} by {}", article.id, author_id);
        Ok(article)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Article>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM news_articles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn list(
        pool: &PgPool,
        status: Option<ArticleStatus>,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Article>(&format!(
            r#"
            SELECT {ARTICLE_COLUMNS} FROM news_articles
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY updated_at DESC
            LIMIT $2
            "#
        ))
        .bind(status.map(|s| s.as_str()))
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// 以当前状态为条件更新，避免覆盖并发修改
    pub async fn transition(
        pool: &PgPool,
        id: Uuid,
        action: ArticleAction,
        actor: Uuid,
        notes: Option<String>,
    ) -> Result<TransitionOutcome, sqlx::Error> {
        let Some(current) = Self::find_by_id(pool, id).await? else {
            return Ok(TransitionOutcome::NotFound);
        };

        let next = match current.status.apply(action) {
            Ok(next) => next,
            Err(e) => return Ok(TransitionOutcome::Illegal(e)),
        };

        let reviewing = matches!(
            action,
            ArticleAction::StartReview | ArticleAction::Approve | ArticleAction::Reject
        );

        let updated = sqlx::query_as::<_, Article>(&format!(
            r#"
            UPDATE news_articles SET
                status = $1,
                reviewer_id = CASE WHEN $4 THEN $5 ELSE reviewer_id END,
                review_notes = COALESCE($6, review_notes),
                published_at = CASE WHEN $1 = 'published' THEN now() ELSE published_at END,
                updated_at = now()
            WHERE id = $2 AND status = $3
            RETURNING {ARTICLE_COLUMNS}
            "#
        ))
        .bind(next.as_str())
        .bind(id)
        .bind(current.status.as_str())
        .bind(reviewing)
        .bind(actor)
        .bind(notes)
        .fetch_optional(pool)
        .await?;

        Ok(match updated {
            Some(article) => {
                tracing::info!(
                    "Article {} moved {} -> {} by {}",
                    id,
                    current.status,
                    next,
                    actor
                );
                TransitionOutcome::Updated(article)
            }
            None => TransitionOutcome::Conflict,
        })
    }
}
