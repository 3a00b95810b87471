use rusqlite::ToSql;
use rusqlite::types::Value;
use tracing::info;
use uuid::Uuid;

use lumen_types::api::{CommentFilter, CommentPatch, NewComment};
use lumen_types::models::{Comment, CurationState, CurationUpdate};

use crate::codec::normalize_lang;
use crate::error::{DbError, Result};
use crate::mapper::{self, Entity, EntitySchema, Field, col, flag};
use crate::repo::Repo;
use crate::repo::messages::curation_fields;

const COMMENT_SCHEMA: EntitySchema = EntitySchema {
    entity: "comment",
    table: "comments",
    primary_key: "id",
    columns: &[
        col("id"),
        col("name"),
        col("body"),
        col("language"),
        flag("is_positive"),
        flag("is_published"),
        col("created_at"),
    ],
};

impl Entity for Comment {
    const SCHEMA: &'static EntitySchema = &COMMENT_SCHEMA;
}

const NEWEST_FIRST: &str = "ORDER BY created_at DESC, rowid DESC";

#[derive(Clone)]
pub struct CommentRepository {
    repo: Repo,
}

impl CommentRepository {
    pub fn new(repo: Repo) -> Self {
        Self { repo }
    }

    pub fn create(&self, input: NewComment) -> Result<Comment> {
        let state = CurationState::UNREVIEWED;
        let comment = Comment {
            id: Uuid::new_v4(),
            name: mapper::required("name", &input.name)?,
            body: mapper::required("body", &input.body)?,
            language: normalize_lang(input.language.as_deref()),
            is_positive: state.is_positive,
            is_published: state.is_published,
            created_at: mapper::now(),
        };

        self.repo.write(|conn| {
            mapper::insert(
                conn,
                &COMMENT_SCHEMA,
                &[
                    ("id", mapper::text(comment.id.to_string())),
                    ("name", mapper::text(comment.name.as_str())),
                    ("body", mapper::text(comment.body.as_str())),
                    ("language", mapper::opt_text(comment.language.clone())),
                    ("is_positive", Value::from(state.is_positive)),
                    ("is_published", Value::from(state.is_published)),
                    ("created_at", mapper::stamp(comment.created_at)),
                ],
            )
        })?;

        info!("Comment {} submitted", comment.id);
        Ok(comment)
    }

    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>> {
        self.repo
            .read(|conn| mapper::find_one(conn, "id", &id.to_string()))
    }

    pub fn find_all(&self, filter: &CommentFilter) -> Result<Vec<Comment>> {
        let mut clauses = Vec::new();
        if let Some(positive) = filter.is_positive {
            clauses.push(format!("is_positive = {}", positive as i32));
        }
        if let Some(published) = filter.is_published {
            clauses.push(format!("is_published = {}", published as i32));
        }
        let language = normalize_lang(filter.language.as_deref());
        if language.is_some() {
            clauses.push("language = ?1".to_string());
        }
        let tail = if clauses.is_empty() {
            NEWEST_FIRST.to_string()
        } else {
            format!("WHERE {} {}", clauses.join(" AND "), NEWEST_FIRST)
        };

        let params: Vec<&dyn ToSql> = language.iter().map(|l| l as &dyn ToSql).collect();
        self.repo
            .read(|conn| mapper::find_many(conn, &tail, params.as_slice()))
    }

    /// Positive and published comments. With a language, untagged comments
    /// are included alongside those tagged with it.
    pub fn find_public(&self, lang: Option<&str>) -> Result<Vec<Comment>> {
        let public = "WHERE is_positive = 1 AND is_published = 1";
        match normalize_lang(lang) {
            Some(lang) => self.repo.read(|conn| {
                mapper::find_many(
                    conn,
                    &format!("{} AND (language = ?1 OR language IS NULL) {}", public, NEWEST_FIRST),
                    rusqlite::params![lang],
                )
            }),
            None => self
                .repo
                .read(|conn| mapper::find_many(conn, &format!("{} {}", public, NEWEST_FIRST), &[])),
        }
    }

    /// Sparse update; only fields present in the patch are written.
    pub fn update(&self, id: Uuid, patch: &CommentPatch) -> Result<Option<Comment>> {
        let mut fields: Vec<Field> = Vec::new();
        if let Some(name) = &patch.name {
            fields.push(("name", mapper::text(mapper::required("name", name)?)));
        }
        if let Some(body) = &patch.body {
            fields.push(("body", mapper::text(mapper::required("body", body)?)));
        }
        if let Some(language) = &patch.language {
            fields.push(("language", mapper::opt_text(normalize_lang(Some(language.as_str())))));
        }
        let curation = CurationUpdate {
            is_positive: patch.is_positive,
            is_published: patch.is_published,
        };

        if fields.is_empty() && curation.is_empty() {
            return self.find_by_id(id);
        }

        self.repo.write(|conn| {
            let key = id.to_string();
            let Some(current) = mapper::find_one::<Comment>(conn, "id", &key)? else {
                return Ok(None);
            };
            let mut fields = fields;
            if !curation.is_empty() {
                fields.extend(curation_fields(current.curation().apply(&curation)));
            }
            mapper::update_fields(conn, &COMMENT_SCHEMA, &key, &fields)?;
            mapper::find_one(conn, "id", &key)
        })
    }

    pub fn curate(&self, id: Uuid, update: &CurationUpdate) -> Result<Comment> {
        let patch = CommentPatch {
            is_positive: update.is_positive,
            is_published: update.is_published,
            ..CommentPatch::default()
        };
        let comment = self
            .update(id, &patch)?
            .ok_or_else(|| DbError::not_found(COMMENT_SCHEMA.entity, id))?;
        info!(
            "Comment {} curated (positive={}, published={})",
            id, comment.is_positive, comment.is_published
        );
        Ok(comment)
    }

    /// Remove a comment, returning what was removed.
    pub fn delete(&self, id: Uuid) -> Result<Option<Comment>> {
        let Some(existing) = self.find_by_id(id)? else {
            return Ok(None);
        };
        self.repo
            .write(|conn| mapper::delete_where(conn, &COMMENT_SCHEMA, "id", &id.to_string()))?;
        info!("Comment {} deleted", id);
        Ok(Some(existing))
    }
}
