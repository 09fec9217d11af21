use anyhow::{Context, Result, anyhow};
use sqlx::MySqlPool;
use tracing::info;

use crate::{auth::password::hash_password, config::AdminSeed, model::role::Role};

/// Username, argon2 hash and role id of the seeded admin.
fn admin_row(seed: &AdminSeed) -> Result<(String, String, u8)> {
    let hashed = hash_password(&seed.password)
        .map_err(|e| anyhow!("failed to hash admin password: {e}"))?;
    Ok((seed.username.clone(), hashed, Role::Admin.id()))
}

/// Creates the configured admin unless the username already exists.
///
/// Returns whether a row was inserted. An existing account is left alone,
/// including its password.
pub async fn seed_admin(pool: &MySqlPool, seed: &AdminSeed) -> Result<bool> {
    let (username, hashed, role_id) = admin_row(seed)?;
    let inserted = sqlx::query(
        "INSERT IGNORE INTO users (username, password, role_id) VALUES (?, ?, ?)",
    )
    .bind(&username)
    .bind(&hashed)
    .bind(role_id)
    .execute(pool)
    .await
    .context("Failed to seed admin user")?
    .rows_affected()
        == 1;

    if inserted {
        info!(%username, "Admin user created");
    }
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;

    #[test]
    fn admin_row_is_hashed_with_admin_role() {
        let seed = AdminSeed {
            username: "admin".to_string(),
            password: "s3cret".to_string(),
        };
        let (username, hashed, role_id) = admin_row(&seed).unwrap();

        assert_eq!(username, "admin");
        assert_ne!(hashed, "s3cret");
        assert!(verify_password("s3cret", &hashed).is_ok());
        assert_eq!(Role::from_id(role_id), Some(Role::Admin));
    }
}
