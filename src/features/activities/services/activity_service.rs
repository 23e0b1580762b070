use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::core::error::Result;
use crate::features::activities::models::{Activity, ActivityType};

/// Activity log reads; writes happen inside the transaction of the action
/// being logged via [`ActivityService::record`].
pub struct ActivityService {
    pool: PgPool,
}

impl ActivityService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn record(
        conn: &mut PgConnection,
        user_id: Uuid,
        activity_type: ActivityType,
        file_name: &str,
    ) -> Result<()> {
        sqlx::query("INSERT INTO activities (user_id, activity_type, file_name) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(activity_type.as_str())
            .bind(file_name)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Most recent entries first
    pub async fn recent(&self, user_id: Uuid, limit: i64) -> Result<Vec<Activity>> {
        let activities = sqlx::query_as::<_, Activity>(
            r#"
            SELECT id, user_id, activity_type, file_name, occurred_at
            FROM activities
            WHERE user_id = $1
            ORDER BY occurred_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(activities)
    }
}
