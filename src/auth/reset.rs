use rand::{distributions::Alphanumeric, Rng};
use sqlx::PgPool;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

const RESET_TOKEN_LEN: usize = 40;

fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RESET_TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Issues a fresh single-use reset token for the user, replacing any
/// outstanding one. Returns the raw token for the delivery seam.
pub async fn issue(db: &PgPool, user_id: Uuid, ttl_minutes: i64) -> Result<String, sqlx::Error> {
    sqlx::query(r#"DELETE FROM password_reset_tokens WHERE user_id = $1"#)
        .bind(user_id)
        .execute(db)
        .await?;

    let token = generate_token();
    let expires_at = OffsetDateTime::now_utc() + Duration::minutes(ttl_minutes);
    sqlx::query(
        r#"
        INSERT INTO password_reset_tokens (user_id, token, expires_at)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(user_id)
    .bind(&token)
    .bind(expires_at)
    .execute(db)
    .await?;

    Ok(token)
}

/// Consumes the token if it is known and unexpired, returning the bound
/// user id. Deletion and lookup are one statement, so a token can be
/// redeemed at most once even under concurrent resets.
pub async fn consume(db: &PgPool, token: &str) -> Result<Option<Uuid>, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        DELETE FROM password_reset_tokens
        WHERE token = $1 AND expires_at > now()
        RETURNING user_id
        "#,
    )
    .bind(token)
    .fetch_optional(db)
    .await
}
