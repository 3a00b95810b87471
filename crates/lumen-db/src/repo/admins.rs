use tracing::info;
use uuid::Uuid;

use lumen_types::models::Admin;

use crate::error::{DbError, Result};
use crate::mapper::{self, Entity, EntitySchema, col};
use crate::repo::Repo;

const ADMIN_SCHEMA: EntitySchema = EntitySchema {
    entity: "admin",
    table: "admins",
    primary_key: "id",
    columns: &[col("id"), col("username"), col("password_hash"), col("created_at")],
};

impl Entity for Admin {
    const SCHEMA: &'static EntitySchema = &ADMIN_SCHEMA;
}

/// Admin accounts. Only a username and an already-hashed credential are
/// stored; hashing and verification happen in the auth layer.
#[derive(Clone)]
pub struct AdminRepository {
    repo: Repo,
}

impl AdminRepository {
    pub fn new(repo: Repo) -> Self {
        Self { repo }
    }

    /// Provision an admin if the username is not taken yet. Safe to call on
    /// every startup; an existing account is returned untouched.
    pub fn ensure_admin(&self, username: &str, password_hash: &str) -> Result<Admin> {
        let username = mapper::required("username", username)?;
        let password_hash = mapper::required("password_hash", password_hash)?;

        if let Some(existing) = self.find_by_username(&username)? {
            info!("Admin '{}' already provisioned", username);
            return Ok(existing);
        }

        let admin = Admin {
            id: Uuid::new_v4(),
            username,
            password_hash,
            created_at: mapper::now(),
        };
        self.repo.write(|conn| {
            mapper::insert(
                conn,
                &ADMIN_SCHEMA,
                &[
                    ("id", mapper::text(admin.id.to_string())),
                    ("username", mapper::text(admin.username.as_str())),
                    ("password_hash", mapper::text(admin.password_hash.as_str())),
                    ("created_at", mapper::stamp(admin.created_at)),
                ],
            )
        })?;

        info!("Admin '{}' provisioned", admin.username);
        Ok(admin)
    }

    pub fn find_by_username(&self, username: &str) -> Result<Option<Admin>> {
        self.repo
            .read(|conn| mapper::find_one(conn, "username", &username))
    }

    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Admin>> {
        self.repo
            .read(|conn| mapper::find_one(conn, "id", &id.to_string()))
    }

    pub fn find_all(&self) -> Result<Vec<Admin>> {
        self.repo
            .read(|conn| mapper::find_many(conn, "ORDER BY created_at DESC, rowid DESC", &[]))
    }

    pub fn update_password_hash(&self, id: Uuid, password_hash: &str) -> Result<Admin> {
        let password_hash = mapper::required("password_hash", password_hash)?;
        self.repo
            .write(|conn| {
                let fields = [("password_hash", mapper::text(password_hash))];
                if !mapper::update_fields(conn, &ADMIN_SCHEMA, &id.to_string(), &fields)? {
                    return Ok(None);
                }
                mapper::find_one(conn, "id", &id.to_string())
            })?
            .ok_or_else(|| DbError::not_found(ADMIN_SCHEMA.entity, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::testing::repositories;

    #[test]
    fn ensure_admin_is_idempotent() {
        let (_dir, repos) = repositories();
        let first = repos.admins.ensure_admin("root", "$argon2id$one").unwrap();
        let second = repos.admins.ensure_admin("root", "$argon2id$two").unwrap();

        assert_eq!(first, second);
        assert_eq!(second.password_hash, "$argon2id$one");
        assert_eq!(repos.admins.find_all().unwrap().len(), 1);
    }

    #[test]
    fn password_hash_is_not_serialized() {
        let (_dir, repos) = repositories();
        let admin = repos.admins.ensure_admin("root", "$argon2id$secret").unwrap();
        let json = serde_json::to_string(&admin).unwrap();
        assert!(!json.contains("secret"));
    }

    #[test]
    fn update_password_hash_on_missing_admin() {
        let (_dir, repos) = repositories();
        let err = repos
            .admins
            .update_password_hash(Uuid::new_v4(), "$argon2id$x")
            .unwrap_err();
        assert!(err.is_not_found());

        let admin = repos.admins.ensure_admin("root", "$argon2id$old").unwrap();
        let updated = repos.admins.update_password_hash(admin.id, "$argon2id$new").unwrap();
        assert_eq!(updated.password_hash, "$argon2id$new");
    }
}
