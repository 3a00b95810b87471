use rusqlite::params;
use tracing::info;
use uuid::Uuid;

use lumen_types::api::UpsertMedia;
use lumen_types::models::{Media, MediaType};

use crate::error::{DbError, Result};
use crate::mapper::{self, Entity, EntitySchema, col};
use crate::repo::Repo;

const MEDIA_SCHEMA: EntitySchema = EntitySchema {
    entity: "media",
    table: "media",
    primary_key: "id",
    columns: &[
        col("id"),
        col("type"),
        col("public_id"),
        col("url"),
        col("format"),
        col("created_at"),
        col("updated_at"),
    ],
};

impl Entity for Media {
    const SCHEMA: &'static EntitySchema = &MEDIA_SCHEMA;
}

/// One row per media slot. The uploaded binary itself lives in external
/// object storage, managed by the caller.
#[derive(Clone)]
pub struct MediaRepository {
    repo: Repo,
}

impl MediaRepository {
    pub fn new(repo: Repo) -> Self {
        Self { repo }
    }

    /// Insert or replace the reference for a slot.
    pub fn upsert(&self, input: UpsertMedia) -> Result<Media> {
        let public_id = mapper::required("public_id", &input.public_id)?;
        let url = mapper::required("url", &input.url)?;
        let format = mapper::optional(input.format.as_deref());
        let media_type = input.media_type;

        let media = self.repo.write(|conn| {
            let now = mapper::stamp(mapper::now());
            conn.execute(
                "INSERT INTO media (id, type, public_id, url, format, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                 ON CONFLICT(type) DO UPDATE SET
                    public_id = excluded.public_id,
                    url = excluded.url,
                    format = excluded.format,
                    updated_at = excluded.updated_at",
                params![
                    Uuid::new_v4().to_string(),
                    media_type.as_str(),
                    public_id,
                    url,
                    format,
                    now,
                ],
            )?;
            mapper::find_one::<Media>(conn, "type", &media_type.as_str())?
                .ok_or_else(|| DbError::not_found(MEDIA_SCHEMA.entity, media_type))
        })?;

        info!("Media '{}' set to {}", media_type, media.public_id);
        Ok(media)
    }

    pub fn find_by_type(&self, media_type: MediaType) -> Result<Option<Media>> {
        self.repo
            .read(|conn| mapper::find_one(conn, "type", &media_type.as_str()))
    }

    pub fn find_all(&self) -> Result<Vec<Media>> {
        self.repo
            .read(|conn| mapper::find_many(conn, "ORDER BY created_at DESC, rowid DESC", &[]))
    }

    /// Drop a slot's reference, returning it so the caller can remove the
    /// externally stored copy.
    pub fn delete(&self, media_type: MediaType) -> Result<Option<Media>> {
        let Some(existing) = self.find_by_type(media_type)? else {
            return Ok(None);
        };
        self.repo.write(|conn| {
            mapper::delete_where(conn, &MEDIA_SCHEMA, "type", &media_type.as_str())
        })?;
        info!("Media '{}' removed", media_type);
        Ok(Some(existing))
    }
}
