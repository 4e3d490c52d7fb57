// ABOUTME: Append-only robot liveness log
// ABOUTME: Records a ping per claim attempt and answers "which robots were seen recently"

use chrono::{DateTime, Duration, Utc};
use hill_core::format_timestamp;
use sqlx::{Row, SqlitePool};

use crate::{Result, StorageError};

#[derive(Clone)]
pub struct ActivityStorage {
    pool: SqlitePool,
}

impl ActivityStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn record_ping(&self, robot_id: &str) -> Result<()> {
        self.record_ping_at(robot_id, Utc::now()).await
    }

    pub async fn record_ping_at(&self, robot_id: &str, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("INSERT INTO activity_pings (robot_id, pinged_at) VALUES (?1, ?2)")
            .bind(robot_id)
            .bind(format_timestamp(&at))
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Distinct robots with a ping newer than `now - window_seconds`, sorted by name.
    /// A window reaching past the representable time range matches every ping.
    pub async fn active_robots(&self, window_seconds: i64) -> Result<Vec<String>> {
        let cutoff = Duration::try_seconds(window_seconds.max(0))
            .and_then(|window| Utc::now().checked_sub_signed(window))
            .map(|cutoff| format_timestamp(&cutoff));

        let rows = sqlx::query(
            r#"
            SELECT DISTINCT robot_id
            FROM activity_pings
            WHERE ?1 IS NULL OR pinged_at > ?1
            ORDER BY robot_id ASC
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("robot_id").map_err(StorageError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connect_in_memory;

    #[tokio::test]
    async fn test_active_robots_respects_window() {
        let pool = connect_in_memory().await.unwrap();
        let activity = ActivityStorage::new(pool);

        activity.record_ping("r1").await.unwrap();
        activity.record_ping("r1").await.unwrap();
        activity
            .record_ping_at("r2", Utc::now() - Duration::seconds(600))
            .await
            .unwrap();
        activity.record_ping("r3").await.unwrap();

        let recent = activity.active_robots(60).await.unwrap();
        assert_eq!(recent, vec!["r1".to_string(), "r3".to_string()]);

        let all = activity.active_robots(3600).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_huge_window_matches_every_ping() {
        let pool = connect_in_memory().await.unwrap();
        let activity = ActivityStorage::new(pool);

        activity
            .record_ping_at("r_old", Utc::now() - Duration::days(3650))
            .await
            .unwrap();
        activity.record_ping("r_new").await.unwrap();

        for window in [10_000_000_000_000, i64::MAX] {
            let robots = activity.active_robots(window).await.unwrap();
            assert_eq!(robots, vec!["r_new".to_string(), "r_old".to_string()]);
        }
    }

    #[tokio::test]
    async fn test_active_robots_empty() {
        let pool = connect_in_memory().await.unwrap();
        let activity = ActivityStorage::new(pool);

        assert!(activity.active_robots(60).await.unwrap().is_empty());
    }
}
