use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use sqlx::{FromRow, PgPool, types::Json};
use uuid::Uuid;

#[derive(Debug, FromRow)]
struct PreferencesRow {
    preferences: Json<Value>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserPreferences {
    pub user_id: Uuid,
    pub preferences: Map<String, Value>,
    pub updated_at: Option<DateTime<Utc>>,
}

pub fn default_preferences() -> Map<String, Value> {
    match json!({
        "language": "en",
        "theme": "system",
        "units": "metric",
        "currency": "AED",
        "news_categories": ["News", "Things to Do", "Food & Drink"],
        "notifications": { "news": true, "weather": false, "government": true }
    }) {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// 顶层按键覆盖；值为 null 时删除该键
pub fn merge_preferences(base: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, value) in patch {
        if value.is_null() {
            base.remove(key);
        } else {
            base.insert(key.clone(), value.clone());
        }
    }
}

impl UserPreferences {
    pub async fn get(pool: &PgPool, user_id: Uuid) -> Result<Self, sqlx::Error> {
        let row = sqlx::query_as::<_, PreferencesRow>(
            "SELECT preferences, updated_at FROM user_preferences WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        let mut preferences = default_preferences();
        let updated_at = match row {
            Some(PreferencesRow {
                preferences: Json(Value::Object(stored)),
                updated_at,
            }) => {
                merge_preferences(&mut preferences, &stored);
                Some(updated_at)
            }
            Some(row) => Some(row.updated_at),
            None => None,
        };

        Ok(Self {
            user_id,
            preferences,
            updated_at,
        })
    }

    pub async fn update(
        pool: &PgPool,
        user_id: Uuid,
        patch: Map<String, Value>,
    ) -> Result<Self, sqlx::Error> {
        let current = Self::get(pool, user_id).await?;
        let mut preferences = current.preferences;
        merge_preferences(&mut preferences, &patch);

        let row = sqlx::query_as::<_, PreferencesRow>(
            r#"
            INSERT INTO user_preferences (user_id, preferences, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (user_id) DO UPDATE SET
                preferences = EXCLUDED.preferences,
                updated_at = now()
            RETURNING preferences, updated_at
            "#,
        )
        .bind(user_id)
        .bind(Json(Value::Object(preferences.clone())))
        .fetch_one(pool)
        .await?;

        Ok(Self {
            user_id,
            preferences,
            updated_at: Some(row.updated_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_overrides_and_removes_keys() {
        let mut prefs = default_preferences();
        let patch = match json!({ "theme": "dark", "units": null, "currency": "USD" }) {
            Value::Object(m) => m,
            _ => unreachable!(),
        };
        merge_preferences(&mut prefs, &patch);

        assert_eq!(prefs["theme"], "dark");
        assert_eq!(prefs["currency"], "USD");
        assert!(!prefs.contains_key("units"));
        assert_eq!(prefs["language"], "en");
    }
}
