//! Admin identity bootstrap inside a tenant database.
//!
//! Every step is get-or-create so a re-run after a partial failure converges
//! instead of tripping uniqueness constraints: the `CompanyAdmin` role by
//! name, the user by case-insensitive email, and the (user, role) assignment
//! by the pair.

use anyhow::{Context, Result};
use rand::RngExt;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::tenant::seed::COMPANY_ADMIN_ROLE;

/// Generate a 16-byte random salt, hex-encoded. One per user.
pub fn generate_salt() -> String {
    let mut buf = [0u8; 16];
    rand::rng().fill(&mut buf);
    hex::encode(buf)
}

/// Hash a password: SHA-256(salt || password), returned as hex string.
pub fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Verify a password candidate against a stored hash using constant-time
/// comparison.
pub fn verify_password(salt: &str, candidate: &str, stored_hash: &str) -> bool {
    let candidate_hash = hash_password(salt, candidate);
    candidate_hash
        .as_bytes()
        .ct_eq(stored_hash.as_bytes())
        .into()
}

#[derive(Debug)]
pub struct AdminBootstrap {
    pub user_id: String,
    pub role_id: String,
    /// False when the user already existed (re-run after partial failure).
    pub created_user: bool,
}

/// Ensure the tenant's administrative identity exists: the `CompanyAdmin`
/// role, the admin user, and the assignment linking them.
pub fn ensure_admin(
    conn: &Connection,
    email: &str,
    password: &str,
    full_name: Option<&str>,
) -> Result<AdminBootstrap> {
    let role_id = ensure_role(conn, COMPANY_ADMIN_ROLE)
        .context("failed to locate or create the admin role")?;

    // The email column is COLLATE NOCASE, so equality is case-insensitive.
    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM users WHERE email = ?1",
            [email],
            |row| row.get(0),
        )
        .optional()?;

    let (user_id, created_user) = match existing {
        Some(id) => (id, false),
        None => {
            let id = uuid::Uuid::new_v4().to_string();
            let salt = generate_salt();
            let hash = hash_password(&salt, password);
            conn.execute(
                "INSERT INTO users (id, email, full_name, password_hash, password_salt)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, email, full_name, hash, salt],
            )
            .context("failed to create the admin user")?;
            (id, true)
        }
    };

    // Keyed on the (user, role) pair, not on the user's existence.
    let assigned: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM user_roles WHERE user_id = ?1 AND role_id = ?2)",
        params![user_id, role_id],
        |row| row.get(0),
    )?;
    if !assigned {
        conn.execute(
            "INSERT INTO user_roles (user_id, role_id) VALUES (?1, ?2)",
            params![user_id, role_id],
        )
        .context("failed to assign the admin role")?;
    }

    Ok(AdminBootstrap {
        user_id,
        role_id,
        created_user,
    })
}

fn ensure_role(conn: &Connection, name: &str) -> Result<String> {
    let existing: Option<String> = conn
        .query_row("SELECT id FROM roles WHERE name = ?1", [name], |row| {
            row.get(0)
        })
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }
    let id = uuid::Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO roles (id, name, is_system) VALUES (?1, ?2, 1)",
        params![id, name],
    )?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenant::schema;

    fn tenant_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        schema::apply(&conn).unwrap();
        conn
    }

    fn user_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap()
    }

    fn assignment_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM user_roles", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_bootstrap_creates_user_with_admin_role() {
        let conn = tenant_db();
        let result = ensure_admin(&conn, "root@acme.test", "Sup3rSecret!", Some("Root Admin"))
            .unwrap();
        assert!(result.created_user);
        assert_eq!(user_count(&conn), 1);
        assert_eq!(assignment_count(&conn), 1);

        let role_name: String = conn
            .query_row(
                "SELECT r.name FROM user_roles ur JOIN roles r ON r.id = ur.role_id
                 WHERE ur.user_id = ?1",
                [&result.user_id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(role_name, COMPANY_ADMIN_ROLE);
    }

    #[test]
    fn test_bootstrap_is_idempotent() {
        let conn = tenant_db();
        let first = ensure_admin(&conn, "root@acme.test", "Sup3rSecret!", None).unwrap();
        let second = ensure_admin(&conn, "root@acme.test", "Sup3rSecret!", None).unwrap();
        assert!(first.created_user);
        assert!(!second.created_user);
        assert_eq!(first.user_id, second.user_id);
        assert_eq!(user_count(&conn), 1);
        assert_eq!(assignment_count(&conn), 1);
    }

    #[test]
    fn test_email_lookup_is_case_insensitive() {
        let conn = tenant_db();
        let first = ensure_admin(&conn, "Root@Acme.Test", "Sup3rSecret!", None).unwrap();
        let second = ensure_admin(&conn, "ROOT@ACME.TEST", "other", None).unwrap();
        assert!(!second.created_user);
        assert_eq!(first.user_id, second.user_id);
        assert_eq!(user_count(&conn), 1);
    }

    #[test]
    fn test_missing_role_is_recreated() {
        let conn = tenant_db();
        conn.execute("DELETE FROM role_permissions", []).unwrap();
        conn.execute("DELETE FROM roles WHERE name = ?1", [COMPANY_ADMIN_ROLE])
            .unwrap();
        let result = ensure_admin(&conn, "root@acme.test", "Sup3rSecret!", None).unwrap();
        let exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM roles WHERE id = ?1 AND name = ?2)",
                params![result.role_id, COMPANY_ADMIN_ROLE],
                |row| row.get(0),
            )
            .unwrap();
        assert!(exists);
    }

    #[test]
    fn test_password_hash_verify_roundtrip() {
        let salt = generate_salt();
        let hash = hash_password(&salt, "Sup3rSecret!");
        assert!(verify_password(&salt, "Sup3rSecret!", &hash));
        assert!(!verify_password(&salt, "wrong", &hash));
    }

    #[test]
    fn test_per_user_salts_differ() {
        let conn = tenant_db();
        ensure_admin(&conn, "one@acme.test", "same-password", None).unwrap();
        // A second admin is not a normal flow, but salts must differ per user.
        let salt2 = generate_salt();
        conn.execute(
            "INSERT INTO users (id, email, password_hash, password_salt)
             VALUES ('u2', 'two@acme.test', ?1, ?2)",
            params![hash_password(&salt2, "same-password"), salt2],
        )
        .unwrap();
        let salts: Vec<String> = conn
            .prepare("SELECT password_salt FROM users")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();
        assert_eq!(salts.len(), 2);
        assert_ne!(salts[0], salts[1]);
    }
}
