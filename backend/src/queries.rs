use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;
use time::OffsetDateTime;
use shared::models::*;
use shared::tally::VoteChange;
use crate::store::{StoreError, UserStore, VoteStore};

const USER_COLUMNS: &str = "id, username, email, password_hash, is_admin, created_at, updated_at";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn lock_user(tx: &mut Transaction<'_, Postgres>, user_id: Uuid) -> Result<(), StoreError> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
            .bind(user_id.to_string())
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn decrement_option(tx: &mut Transaction<'_, Postgres>, name: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE vote_options SET count = count - 1 WHERE name = $1")
            .bind(name)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn increment_option(tx: &mut Transaction<'_, Postgres>, name: &str) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO vote_options (id, name, count) VALUES ($1, $2, 1)
             ON CONFLICT (name) DO UPDATE SET count = vote_options.count + 1"
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

fn map_user_error(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::DuplicateEmail,
        _ => StoreError::Database(e),
    }
}

#[rocket::async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, username, email, password_hash, is_admin)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.is_admin)
        .fetch_one(&self.pool)
        .await
        .map_err(map_user_error)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at, id"))
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_user(&self, id: Uuid, changes: &UserChanges) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET
                username = COALESCE($2, username),
                email = COALESCE($3, email),
                is_admin = COALESCE($4, is_admin),
                updated_at = $5
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.username.as_deref())
        .bind(changes.email.as_deref())
        .bind(changes.is_admin)
        .bind(OffsetDateTime::now_utc())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_user_error)
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        Self::lock_user(&mut tx, id).await?;

        let retracted: Option<String> = sqlx::query_scalar("DELETE FROM votes WHERE user_id = $1 RETURNING option")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        if let Some(option) = retracted {
            Self::decrement_option(&mut tx, &option).await?;
        }

        let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(deleted > 0)
    }
}

#[rocket::async_trait]
impl VoteStore for PgStore {
    async fn find_vote(&self, user_id: Uuid) -> Result<Option<Vote>, StoreError> {
        Ok(sqlx::query_as::<_, Vote>(
            "SELECT id, user_id, option, created_at, updated_at FROM votes WHERE user_id = $1"
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn record_vote(&self, user_id: Uuid, option: &str) -> Result<VoteChange, StoreError> {
        let mut tx = self.pool.begin().await?;
        Self::lock_user(&mut tx, user_id).await?;

        let previous: Option<String> = sqlx::query_scalar("SELECT option FROM votes WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;

        let change = VoteChange::plan(previous.as_deref(), option);

        match previous {
            Some(_) => {
                sqlx::query("UPDATE votes SET option = $2, updated_at = $3 WHERE user_id = $1")
                    .bind(user_id)
                    .bind(option)
                    .bind(OffsetDateTime::now_utc())
                    .execute(&mut *tx)
                    .await?;
            }
            None => {
                sqlx::query("INSERT INTO votes (id, user_id, option) VALUES ($1, $2, $3)")
                    .bind(Uuid::new_v4())
                    .bind(user_id)
                    .bind(option)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        for (name, delta) in change.adjustments() {
            if delta < 0 {
                Self::decrement_option(&mut tx, name).await?;
            } else {
                Self::increment_option(&mut tx, name).await?;
            }
        }

        tx.commit().await?;
        Ok(change)
    }

    async fn ensure_option(&self, name: &str) -> Result<VoteOption, StoreError> {
        sqlx::query("INSERT INTO vote_options (id, name, count) VALUES ($1, $2, 0) ON CONFLICT (name) DO NOTHING")
            .bind(Uuid::new_v4())
            .bind(name)
            .execute(&self.pool)
            .await?;

        Ok(sqlx::query_as::<_, VoteOption>("SELECT id, name, count FROM vote_options WHERE name = $1")
            .bind(name)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn list_options(&self) -> Result<Vec<VoteOption>, StoreError> {
        Ok(sqlx::query_as::<_, VoteOption>("SELECT id, name, count FROM vote_options")
            .fetch_all(&self.pool)
            .await?)
    }

    async fn ranked_options(&self) -> Result<Vec<VoteOption>, StoreError> {
        Ok(sqlx::query_as::<_, VoteOption>(
            r#"SELECT id, name, count FROM vote_options ORDER BY count DESC, name COLLATE "C" ASC"#
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn count_votes(&self) -> Result<i64, StoreError> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM votes")
            .fetch_one(&self.pool)
            .await?)
    }
}
