use anyhow::{bail, Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::{connection::Database, helpers::parse_datetime, models::User};
use crate::dispatch::GestureMapping;

use super::gesture_mappings::GestureMappingRepository;

pub struct UserRepository<'a> {
    conn: &'a Connection,
}

impl<'a> UserRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Inserts the user. Returns false if the id is already taken.
    pub fn insert(&self, user: &User) -> Result<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO users (id, created_at) VALUES (?1, ?2)",
            params![user.id, user.created_at.to_rfc3339()],
        )?;
        Ok(inserted == 1)
    }

    pub fn get(&self, user_id: &str) -> Result<Option<User>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, created_at FROM users WHERE id = ?1",
                params![user_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        row.map(|(id, created_at)| {
            Ok(User {
                id,
                created_at: parse_datetime(&created_at, "users.created_at")?,
            })
        })
        .transpose()
    }
}

// Database async wrappers for user operations
impl Database {
    /// Creates a user and seeds the default gesture mapping.
    pub async fn create_user(&self, user_id: &str) -> Result<User> {
        let user = User {
            id: user_id.to_string(),
            created_at: Utc::now(),
        };

        self.execute(move |conn| {
            let tx = conn.transaction().context("failed to open user transaction")?;
            if !UserRepository::new(&tx).insert(&user)? {
                bail!("user '{}' already exists", user.id);
            }
            GestureMappingRepository::new(&tx).replace_for_user(
                &user.id,
                &GestureMapping::default(),
                user.created_at,
            )?;
            tx.commit().context("failed to commit new user")?;
            Ok(user)
        })
        .await
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let user_id = user_id.to_string();
        self.execute(move |conn| UserRepository::new(conn).get(&user_id))
            .await
    }

    /// Returns the user, creating it with the default mapping on first use.
    pub async fn ensure_user(&self, user_id: &str) -> Result<User> {
        match self.get_user(user_id).await? {
            Some(user) => Ok(user),
            None => self.create_user(user_id).await,
        }
    }
}
