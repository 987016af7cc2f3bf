pub mod articles;
pub mod bookmarks;
pub mod chat;
pub mod exchange;
pub mod news;
pub mod preferences;
pub mod profile;
pub mod search_history;
pub mod weather;

use axum::Json;
use serde_json::{Value, json};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
