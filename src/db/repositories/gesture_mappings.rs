use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_function, parse_gesture},
    models::GestureMappingRow,
};
use crate::dispatch::GestureMapping;

pub struct GestureMappingRepository<'a> {
    conn: &'a Connection,
}

impl<'a> GestureMappingRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn rows_for_user(&self, user_id: &str) -> Result<Vec<GestureMappingRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, gesture, function, updated_at
             FROM gesture_mappings
             WHERE user_id = ?1
             ORDER BY gesture",
        )?;

        let raw = stmt
            .query_map(params![user_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(|(user_id, gesture, function, updated_at)| {
                Ok(GestureMappingRow {
                    user_id,
                    gesture: parse_gesture(&gesture)?,
                    function: parse_function(&function)?,
                    updated_at: parse_datetime(&updated_at, "gesture_mappings.updated_at")?,
                })
            })
            .collect()
    }

    /// Replaces every row for the user with the 13 pairs of `mapping`.
    /// Callers wrap this in a transaction.
    pub fn replace_for_user(
        &self,
        user_id: &str,
        mapping: &GestureMapping,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        self.conn.execute(
            "DELETE FROM gesture_mappings WHERE user_id = ?1",
            params![user_id],
        )?;

        let mut stmt = self.conn.prepare(
            "INSERT INTO gesture_mappings (user_id, gesture, function, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        let updated_at = updated_at.to_rfc3339();
        for (gesture, function) in mapping.iter() {
            stmt.execute(params![user_id, gesture.as_str(), function.as_str(), updated_at])?;
        }
        Ok(())
    }
}

// Database async wrappers for mapping operations
impl Database {
    /// The user's mapping. Users without stored rows get the default mapping;
    /// gestures missing from the stored rows map to UNUSED.
    pub async fn load_mapping(&self, user_id: &str) -> Result<GestureMapping> {
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            let rows = GestureMappingRepository::new(conn)
                .rows_for_user(&user_id)
                .with_context(|| format!("failed to load mapping for '{user_id}'"))?;
            if rows.is_empty() {
                return Ok(GestureMapping::default());
            }
            Ok(GestureMapping::from_pairs(
                rows.into_iter().map(|row| (row.gesture, row.function)),
            ))
        })
        .await
    }

    /// Stores the whole mapping for the user in one transaction.
    pub async fn save_mapping(&self, user_id: &str, mapping: &GestureMapping) -> Result<()> {
        let user_id = user_id.to_string();
        let mapping = mapping.clone();
        self.execute(move |conn| {
            let now = Utc::now();
            let tx = conn.transaction().context("failed to open mapping transaction")?;
            tx.execute(
                "INSERT OR IGNORE INTO users (id, created_at) VALUES (?1, ?2)",
                params![user_id, now.to_rfc3339()],
            )?;
            GestureMappingRepository::new(&tx).replace_for_user(&user_id, &mapping, now)?;
            tx.commit().context("failed to commit mapping")?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::FunctionType;
    use crate::gesture::GestureType;
    use std::path::PathBuf;
    use uuid::Uuid;

    fn temp_db_path() -> PathBuf {
        std::env::temp_dir().join(format!("presto-test-{}.sqlite3", Uuid::new_v4()))
    }

    fn cleanup(path: &PathBuf) {
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
        }
    }

    #[tokio::test]
    async fn test_create_user_seeds_default_mapping() {
        let path = temp_db_path();
        let db = Database::new(path.clone()).unwrap();

        let user = db.create_user("alice").await.unwrap();
        assert_eq!(user.id, "alice");
        assert!(db.create_user("alice").await.is_err());

        let mapping = db.load_mapping("alice").await.unwrap();
        assert_eq!(mapping, GestureMapping::default());

        let rows = db
            .execute(|conn| GestureMappingRepository::new(conn).rows_for_user("alice"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 13);

        drop(db);
        cleanup(&path);
    }

    #[tokio::test]
    async fn test_unknown_user_gets_default_mapping() {
        let path = temp_db_path();
        let db = Database::new(path.clone()).unwrap();
        assert_eq!(db.load_mapping("nobody").await.unwrap(), GestureMapping::default());
        assert!(db.get_user("nobody").await.unwrap().is_none());
        drop(db);
        cleanup(&path);
    }

    #[tokio::test]
    async fn test_save_mapping_round_trips_and_survives_reopen() {
        let path = temp_db_path();
        let mut mapping = GestureMapping::default();
        mapping.assign(GestureType::ILoveYou, FunctionType::Draw);
        mapping.assign(GestureType::Victory, FunctionType::Filter);

        {
            let db = Database::new(path.clone()).unwrap();
            db.ensure_user("bob").await.unwrap();
            db.save_mapping("bob", &mapping).await.unwrap();
        }

        let db = Database::new(path.clone()).unwrap();
        let loaded = db.load_mapping("bob").await.unwrap();
        assert_eq!(loaded, mapping);
        assert_eq!(loaded.get(GestureType::ClosedFist), FunctionType::Unused);
        assert!(db.get_user("bob").await.unwrap().is_some());

        drop(db);
        cleanup(&path);
    }

    #[tokio::test]
    async fn test_missing_rows_load_as_unused() {
        let path = temp_db_path();
        let db = Database::new(path.clone()).unwrap();
        db.create_user("carol").await.unwrap();
        db.execute(|conn| {
            conn.execute(
                "DELETE FROM gesture_mappings WHERE user_id = 'carol' AND gesture != 'PINCH'",
                [],
            )?;
            Ok(())
        })
        .await
        .unwrap();

        let mapping = db.load_mapping("carol").await.unwrap();
        assert_eq!(mapping.get(GestureType::Pinch), FunctionType::Click);
        assert_eq!(mapping.get(GestureType::ClosedFist), FunctionType::Unused);
        assert_eq!(mapping.iter().count(), 13);

        drop(db);
        cleanup(&path);
    }
}
