use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use crate::models::{Shot, ShotFilter, ShotRow};

/// A shot with unknown brick status counts as made when both of these are exceeded.
pub const MADE_SHORT_QUALITY_MIN: f64 = -0.1;
pub const MADE_LONG_QUALITY_MIN: f64 = -0.3;

/// Open a connection pool, creating the database file if needed
pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    SqlitePoolOptions::new().connect_with(options).await
}

/// Create the users and shots tables if they don't exist yet
pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS users (
               id TEXT PRIMARY KEY NOT NULL
           )"#
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS shots (
               id INTEGER PRIMARY KEY AUTOINCREMENT,
               arcQuality REAL NOT NULL,
               shortQuality REAL NOT NULL,
               longQuality REAL NOT NULL,
               brick INTEGER NULL,
               timestamp INTEGER NOT NULL,
               user_id TEXT NOT NULL,
               FOREIGN KEY (user_id) REFERENCES users(id)
           )"#
    )
    .execute(pool)
    .await?;

    sqlx::query(r#"CREATE INDEX IF NOT EXISTS idx_user_id ON shots(user_id)"#)
        .execute(pool)
        .await?;

    Ok(())
}

// Shot writes

/// Store a shot and, if this is the user's first shot, the user.
/// Both inserts commit together or not at all. Returns the new shot id.
pub async fn insert_shot(pool: &SqlitePool, shot: &Shot) -> Result<i64, sqlx::Error> {
    // Take the write lock up front so concurrent writers wait on the busy timeout
    let mut tx = pool.begin_with("BEGIN IMMEDIATE").await?;

    match insert_shot_in(&mut tx, shot).await {
        Ok(shot_id) => {
            tx.commit().await?;
            Ok(shot_id)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!("Rollback after failed shot insert also failed: {}", rollback_err);
            }
            Err(e)
        }
    }
}

async fn insert_shot_in(tx: &mut Transaction<'_, Sqlite>, shot: &Shot) -> Result<i64, sqlx::Error> {
    let existing = sqlx::query_scalar::<_, String>(r#"SELECT id FROM users WHERE id = ?"#)
        .bind(&shot.user_id)
        .fetch_optional(&mut **tx)
        .await?;

    if existing.is_none() {
        // Another writer may have created the user since the lookup
        sqlx::query(r#"INSERT INTO users (id) VALUES (?) ON CONFLICT(id) DO NOTHING"#)
            .bind(&shot.user_id)
            .execute(&mut **tx)
            .await?;
    }

    let result = sqlx::query(
        r#"INSERT INTO shots (arcQuality, shortQuality, longQuality, brick, timestamp, user_id)
           VALUES (?, ?, ?, ?, ?, ?)"#
    )
    .bind(shot.arc_quality)
    .bind(shot.short_quality)
    .bind(shot.long_quality)
    .bind(shot.brick)
    .bind(shot.timestamp)
    .bind(&shot.user_id)
    .execute(&mut **tx)
    .await?;

    Ok(result.last_insert_rowid())
}

// Shot reads

/// Shots for one user inside an inclusive time window, newest first
pub async fn get_shots(pool: &SqlitePool, filter: &ShotFilter) -> Result<Vec<ShotRow>, sqlx::Error> {
    let mut sql = String::from(
        r#"SELECT id, arcQuality, shortQuality, longQuality, brick, timestamp
           FROM shots
           WHERE user_id = ?
             AND timestamp >= ?
             AND timestamp <= ?"#
    );

    if filter.made_only {
        sql.push_str(
            r#" AND (brick = 0 OR (brick IS NULL AND shortQuality > ? AND longQuality > ?))"#
        );
    }

    sql.push_str(" ORDER BY timestamp DESC");

    let mut query = sqlx::query_as::<_, ShotRow>(&sql)
        .bind(&filter.user_id)
        .bind(filter.start_time)
        .bind(filter.end_time);

    if filter.made_only {
        query = query.bind(MADE_SHORT_QUALITY_MIN).bind(MADE_LONG_QUALITY_MIN);
    }

    query.fetch_all(pool).await
}

#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    // One long-lived connection, otherwise every connection sees its own empty database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None::<std::time::Duration>)
        .max_lifetime(None::<std::time::Duration>)
        .connect_with(
            SqliteConnectOptions::from_str("sqlite::memory:")
                .unwrap()
                .foreign_keys(true),
        )
        .await
        .unwrap();

    init_schema(&pool).await.unwrap();
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shot(user_id: &str, short_quality: f64, long_quality: f64, brick: Option<bool>, timestamp: i64) -> Shot {
        Shot {
            arc_quality: 0.5,
            short_quality,
            long_quality,
            brick,
            timestamp,
            user_id: user_id.to_string(),
        }
    }

    async fn count_users(pool: &SqlitePool, user_id: &str) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    fn all_of(user_id: &str, made_only: bool) -> ShotFilter {
        ShotFilter {
            user_id: user_id.to_string(),
            start_time: 0,
            end_time: i64::MAX,
            made_only,
        }
    }

    #[tokio::test]
    async fn init_schema_is_idempotent() {
        let pool = test_pool().await;
        init_schema(&pool).await.unwrap();

        let index = sqlx::query_scalar::<_, String>(
            "SELECT name FROM sqlite_master WHERE type = 'index' AND name = 'idx_user_id'",
        )
        .fetch_optional(&pool)
        .await
        .unwrap();
        assert_eq!(index.as_deref(), Some("idx_user_id"));
    }

    #[tokio::test]
    async fn insert_creates_user_once() {
        let pool = test_pool().await;

        let first = insert_shot(&pool, &shot("u1", 0.0, 0.0, None, 100)).await.unwrap();
        let second = insert_shot(&pool, &shot("u1", 0.0, 0.0, Some(true), 101)).await.unwrap();

        assert!(second > first);
        assert_eq!(count_users(&pool, "u1").await, 1);
    }

    #[tokio::test]
    async fn brick_is_stored_as_nullable_integer() {
        let pool = test_pool().await;
        insert_shot(&pool, &shot("u1", 0.0, 0.0, None, 1)).await.unwrap();
        insert_shot(&pool, &shot("u1", 0.0, 0.0, Some(false), 2)).await.unwrap();
        insert_shot(&pool, &shot("u1", 0.0, 0.0, Some(true), 3)).await.unwrap();

        let raw = sqlx::query_scalar::<_, Option<i64>>("SELECT brick FROM shots ORDER BY timestamp")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(raw, vec![None, Some(0), Some(1)]);
    }

    #[tokio::test]
    async fn failed_shot_insert_rolls_back_new_user() {
        let pool = test_pool().await;
        sqlx::query(
            "CREATE TRIGGER reject_shots BEFORE INSERT ON shots
             BEGIN SELECT RAISE(ABORT, 'simulated storage failure'); END",
        )
        .execute(&pool)
        .await
        .unwrap();

        let err = insert_shot(&pool, &shot("ghost", 0.0, 0.0, None, 1)).await.unwrap_err();

        assert!(err.to_string().contains("simulated storage failure"));
        assert_eq!(count_users(&pool, "ghost").await, 0);
    }

    #[tokio::test]
    async fn get_shots_filters_by_user_and_inclusive_window() {
        let pool = test_pool().await;
        for ts in [10, 20, 30] {
            insert_shot(&pool, &shot("u1", 0.0, 0.0, None, ts)).await.unwrap();
        }
        insert_shot(&pool, &shot("u2", 0.0, 0.0, None, 20)).await.unwrap();

        let rows = get_shots(
            &pool,
            &ShotFilter {
                user_id: "u1".to_string(),
                start_time: 10,
                end_time: 20,
                made_only: false,
            },
        )
        .await
        .unwrap();

        let timestamps: Vec<i64> = rows.iter().map(|r| r.timestamp).collect();
        assert_eq!(timestamps, vec![20, 10]);
    }

    #[tokio::test]
    async fn made_filter_applies_brick_and_quality_thresholds() {
        let pool = test_pool().await;
        insert_shot(&pool, &shot("u1", 0.0, 0.0, Some(false), 1)).await.unwrap();
        insert_shot(&pool, &shot("u1", 0.0, 0.0, Some(true), 2)).await.unwrap();
        insert_shot(&pool, &shot("u1", 0.0, 0.0, None, 3)).await.unwrap();
        insert_shot(&pool, &shot("u1", -0.2, 0.0, None, 4)).await.unwrap();
        insert_shot(&pool, &shot("u1", 0.0, -0.3, None, 5)).await.unwrap();

        let made: Vec<i64> = get_shots(&pool, &all_of("u1", true))
            .await
            .unwrap()
            .iter()
            .map(|r| r.timestamp)
            .collect();
        assert_eq!(made, vec![3, 1]);

        let everything = get_shots(&pool, &all_of("u1", false)).await.unwrap();
        assert_eq!(everything.len(), 5);
    }

    #[tokio::test]
    async fn get_shots_restores_brick_values() {
        let pool = test_pool().await;
        insert_shot(&pool, &shot("u1", 0.0, 0.0, Some(true), 1)).await.unwrap();
        insert_shot(&pool, &shot("u1", 0.0, 0.0, None, 2)).await.unwrap();

        let rows = get_shots(&pool, &all_of("u1", false)).await.unwrap();
        assert_eq!(rows[0].brick, None);
        assert_eq!(rows[1].brick, Some(true));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_inserts_on_file_database_all_commit() {
        let path = std::env::temp_dir().join(format!(
            "shot_quality_concurrent_{}_{}.sqlite",
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        let pool = connect(&format!("sqlite:{}", path.display())).await.unwrap();
        init_schema(&pool).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..100 {
            let pool = pool.clone();
            handles.push(tokio::spawn(async move {
                let user_id = format!("user-{}", i % 7);
                insert_shot(&pool, &shot(&user_id, 0.0, 0.0, None, i)).await
            }));
        }

        let mut failures = Vec::new();
        for handle in handles {
            if let Err(e) = handle.await.unwrap() {
                failures.push(e.to_string());
            }
        }
        assert!(failures.is_empty(), "failed inserts: {failures:?}");

        let shots: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shots")
            .fetch_one(&pool)
            .await
            .unwrap();
        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(shots, 100);
        assert_eq!(users, 7);

        pool.close().await;
        let _ = std::fs::remove_file(&path);
    }
}
