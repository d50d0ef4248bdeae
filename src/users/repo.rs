use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::listings::repo::{Listing, LISTING_COLUMNS};

/// User record as stored. `favorites` holds listing ids in the order they
/// were added; entries may go stale when a listing is deleted and are
/// dropped on read, never eagerly.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub avatar: String,
    pub favorites: Vec<Uuid>,
    pub created_at: OffsetDateTime,
}

const USER_COLUMNS: &str = "id, username, email, password_hash, avatar, favorites, created_at";

/// Snapshot taken before a favorites toggle, so the handler can tell a
/// stale entry (fine to remove) from a listing that never existed.
#[derive(Debug, FromRow)]
pub struct FavoriteStatus {
    pub is_favorite: bool,
    pub listing_exists: bool,
}

/// Membership flip as one statement: the UPDATE's row lock serializes
/// concurrent toggles on the same user, and RETURNING reports the
/// post-flip state, so two rapid clicks land as two clean flips instead
/// of a duplicate array entry.
const TOGGLE_FAVORITE_SQL: &str = r#"
    UPDATE users
    SET favorites = CASE
        WHEN $2 = ANY(favorites) THEN array_remove(favorites, $2)
        ELSE array_append(favorites, $2)
    END
    WHERE id = $1
    RETURNING ($2 = ANY(favorites)) AS is_favorite
"#;

impl User {
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        let sql = format!(r#"SELECT {USER_COLUMNS} FROM users WHERE id = $1"#);
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        let sql = format!(r#"SELECT {USER_COLUMNS} FROM users WHERE email = $1"#);
        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(db)
            .await
    }

    /// Inserts a new account. Without an avatar the column default (a stock
    /// profile icon) applies.
    pub async fn create(
        db: &PgPool,
        username: &str,
        email: &str,
        password_hash: &str,
        avatar: Option<&str>,
    ) -> Result<User, sqlx::Error> {
        match avatar {
            Some(avatar) => {
                let sql = format!(
                    r#"
                    INSERT INTO users (username, email, password_hash, avatar)
                    VALUES ($1, $2, $3, $4)
                    RETURNING {USER_COLUMNS}
                    "#
                );
                sqlx::query_as::<_, User>(&sql)
                    .bind(username)
                    .bind(email)
                    .bind(password_hash)
                    .bind(avatar)
                    .fetch_one(db)
                    .await
            }
            None => {
                let sql = format!(
                    r#"
                    INSERT INTO users (username, email, password_hash)
                    VALUES ($1, $2, $3)
                    RETURNING {USER_COLUMNS}
                    "#
                );
                sqlx::query_as::<_, User>(&sql)
                    .bind(username)
                    .bind(email)
                    .bind(password_hash)
                    .fetch_one(db)
                    .await
            }
        }
    }

    /// Partial profile update; `None` keeps the stored value.
    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        username: Option<&str>,
        email: Option<&str>,
        password_hash: Option<&str>,
        avatar: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE users
            SET username = COALESCE($2, username),
                email = COALESCE($3, email),
                password_hash = COALESCE($4, password_hash),
                avatar = COALESCE($5, avatar)
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(username)
            .bind(email)
            .bind(password_hash)
            .bind(avatar)
            .fetch_optional(db)
            .await
    }

    pub async fn set_password(
        db: &PgPool,
        id: Uuid,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(r#"UPDATE users SET password_hash = $2 WHERE id = $1"#)
            .bind(id)
            .bind(password_hash)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(r#"DELETE FROM users WHERE id = $1"#)
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn favorite_status(
        db: &PgPool,
        user_id: Uuid,
        listing_id: Uuid,
    ) -> Result<Option<FavoriteStatus>, sqlx::Error> {
        sqlx::query_as::<_, FavoriteStatus>(
            r#"
            SELECT ($2 = ANY(favorites)) AS is_favorite,
                   EXISTS (SELECT 1 FROM listings WHERE id = $2) AS listing_exists
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(listing_id)
        .fetch_optional(db)
        .await
    }

    /// Flips membership of `listing_id` in the favorites array. Returns
    /// the membership state after the flip, or `None` when the user row
    /// is gone.
    pub async fn toggle_favorite(
        db: &PgPool,
        user_id: Uuid,
        listing_id: Uuid,
    ) -> Result<Option<bool>, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(TOGGLE_FAVORITE_SQL)
            .bind(user_id)
            .bind(listing_id)
            .fetch_optional(db)
            .await
    }

    /// Resolves the favorites array to full listings, preserving the order
    /// entries were added. Ids whose listing has since been deleted simply
    /// drop out of the join.
    pub async fn favorite_listings(
        db: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<Listing>, sqlx::Error> {
        let sql = format!(
            r#"
            WITH fav AS (
                SELECT f.listing_id, f.ord
                FROM users u, unnest(u.favorites) WITH ORDINALITY AS f(listing_id, ord)
                WHERE u.id = $1
            )
            SELECT {LISTING_COLUMNS}
            FROM listings
            JOIN fav ON fav.listing_id = listings.id
            ORDER BY fav.ord
            "#
        );
        sqlx::query_as::<_, Listing>(&sql)
            .bind(user_id)
            .fetch_all(db)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_is_a_single_statement() {
        // one UPDATE, no statement separators: both toggle directions must
        // ride the same row lock
        assert_eq!(TOGGLE_FAVORITE_SQL.matches("UPDATE").count(), 1);
        assert!(!TOGGLE_FAVORITE_SQL.contains(';'));
    }

    #[test]
    fn toggle_covers_both_directions_and_reports_post_state() {
        assert!(TOGGLE_FAVORITE_SQL.contains("array_remove(favorites, $2)"));
        assert!(TOGGLE_FAVORITE_SQL.contains("array_append(favorites, $2)"));
        assert!(TOGGLE_FAVORITE_SQL.contains("RETURNING ($2 = ANY(favorites))"));
    }
}
