use rusqlite::{Connection, params};
use tracing::{info, warn};
use uuid::Uuid;

use lumen_types::models::Content;

use crate::codec::{self, DEFAULT_LANG, LanguageMap};
use crate::error::{DbError, Result};
use crate::mapper::{self, Entity, EntitySchema, col};
use crate::repo::Repo;

const CONTENT_SCHEMA: EntitySchema = EntitySchema {
    entity: "content",
    table: "content",
    primary_key: "id",
    columns: &[
        col("id"),
        col("page_id"),
        col("content"),
        col("updated_at"),
        col("updated_by"),
    ],
};

impl Entity for Content {
    const SCHEMA: &'static EntitySchema = &CONTENT_SCHEMA;
}

/// Text for one page in one language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedContent {
    pub page_id: String,
    pub lang: String,
    pub text: String,
    /// Storage failed and the built-in default was served instead.
    pub degraded: bool,
}

fn upsert(conn: &Connection, page_id: &str, payload: &str, editor: Option<&str>) -> Result<Content> {
    conn.execute(
        "INSERT INTO content (id, page_id, content, updated_at, updated_by)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(page_id) DO UPDATE SET
            content = excluded.content,
            updated_at = excluded.updated_at,
            updated_by = excluded.updated_by",
        params![
            Uuid::new_v4().to_string(),
            page_id,
            payload,
            mapper::stamp(mapper::now()),
            editor,
        ],
    )?;
    mapper::find_one(conn, "page_id", &page_id)?
        .ok_or_else(|| DbError::not_found(CONTENT_SCHEMA.entity, page_id))
}

#[derive(Clone)]
pub struct ContentRepository {
    repo: Repo,
}

impl ContentRepository {
    pub fn new(repo: Repo) -> Self {
        Self { repo }
    }

    /// Public read path. Never fails: on any storage error the built-in
    /// default is returned and marked degraded.
    pub fn get_page(&self, page_id: &str, lang: Option<&str>) -> ResolvedContent {
        let lang = codec::normalize_lang(lang).unwrap_or_else(|| DEFAULT_LANG.to_string());
        match self.try_get_page(page_id, &lang) {
            Ok(text) => ResolvedContent {
                page_id: page_id.to_string(),
                lang,
                text,
                degraded: false,
            },
            Err(e) => {
                warn!("Serving default content for '{}' ({}): {}", page_id, lang, e);
                ResolvedContent {
                    page_id: page_id.to_string(),
                    text: codec::default_text(page_id, &lang),
                    lang,
                    degraded: true,
                }
            }
        }
    }

    fn try_get_page(&self, page_id: &str, lang: &str) -> Result<String> {
        let raw = match self.find_by_page(page_id)? {
            Some(row) => row.content,
            None => match self.seed_default(page_id)? {
                Some(row) => row.content,
                None => return Ok(String::new()),
            },
        };
        let variants = codec::decode(&raw);
        Ok(codec::resolve(&variants, lang).to_string())
    }

    /// Persist the built-in default for a page that has never been stored.
    fn seed_default(&self, page_id: &str) -> Result<Option<Content>> {
        let Some(defaults) = codec::default_map(page_id) else {
            return Ok(None);
        };
        let payload = codec::encode(&defaults)?;
        let row = self.repo.write(|conn| {
            // Another writer may have stored the page since the read.
            if let Some(existing) = mapper::find_one::<Content>(conn, "page_id", &page_id)? {
                return Ok(existing);
            }
            upsert(conn, page_id, &payload, None)
        })?;
        info!("Seeded default content for '{}'", page_id);
        Ok(Some(row))
    }

    pub fn find_by_page(&self, page_id: &str) -> Result<Option<Content>> {
        self.repo
            .read(|conn| mapper::find_one(conn, "page_id", &page_id))
    }

    /// All stored language variants of a page.
    pub fn get_variants(&self, page_id: &str) -> Result<Option<LanguageMap>> {
        Ok(self
            .find_by_page(page_id)?
            .map(|row| codec::decode(&row.content)))
    }

    /// Write page text. Without a language the stored payload is replaced;
    /// with one, only that language's variant changes.
    pub fn update_content(
        &self,
        page_id: &str,
        lang: Option<&str>,
        text: &str,
        editor: Option<&str>,
    ) -> Result<Content> {
        let page_id = mapper::required("page_id", page_id)?;
        let lang = codec::normalize_lang(lang);

        let row = self.repo.write(|conn| {
            let existing = mapper::find_one::<Content>(conn, "page_id", &page_id)?;
            let payload = codec::with_variant(
                existing.as_ref().map(|row| row.content.as_str()),
                lang.as_deref(),
                text,
            )?;
            upsert(conn, &page_id, &payload, editor)
        })?;

        info!(
            "Content '{}' updated ({}) by {}",
            page_id,
            lang.as_deref().unwrap_or("all languages"),
            editor.unwrap_or("unknown")
        );
        Ok(row)
    }

    pub fn list_pages(&self) -> Result<Vec<Content>> {
        self.repo
            .read(|conn| mapper::find_many(conn, "ORDER BY page_id", &[]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::testing::repositories;

    #[test]
    fn language_variants_coexist() {
        let (_dir, repos) = repositories();
        repos
            .content
            .update_content("landing", Some("nl"), "Welkom", Some("admin"))
            .unwrap();
        repos
            .content
            .update_content("landing", Some("en"), "Welcome", Some("admin"))
            .unwrap();

        assert_eq!(repos.content.get_page("landing", Some("nl")).text, "Welkom");
        assert_eq!(repos.content.get_page("landing", Some("en")).text, "Welcome");
        assert_eq!(repos.content.get_page("landing", Some("fr")).text, "Welcome");
    }

    #[test]
    fn first_read_seeds_and_persists_defaults() {
        let (_dir, repos) = repositories();
        assert!(repos.content.find_by_page("about").unwrap().is_none());

        let page = repos.content.get_page("about", Some("nl"));
        assert!(!page.degraded);
        assert!(page.text.starts_with("Wij zijn"));

        let stored = repos.content.get_variants("about").unwrap().unwrap();
        assert_eq!(stored, codec::default_map("about").unwrap());
        assert_eq!(repos.content.get_page("about", Some("nl")), page);
    }

    #[test]
    fn unknown_page_is_empty_and_not_stored() {
        let (_dir, repos) = repositories();
        let page = repos.content.get_page("imprint", None);
        assert_eq!(page.text, "");
        assert_eq!(page.lang, "en");
        assert!(repos.content.find_by_page("imprint").unwrap().is_none());
    }

    #[test]
    fn plain_write_replaces_everything() {
        let (_dir, repos) = repositories();
        repos
            .content
            .update_content("support", Some("nl"), "Steun ons", None)
            .unwrap();
        let row = repos
            .content
            .update_content("support", None, "Support us", Some("editor"))
            .unwrap();

        assert_eq!(row.content, "Support us");
        assert_eq!(row.updated_by.as_deref(), Some("editor"));
        // Plain text answers every language.
        assert_eq!(repos.content.get_page("support", Some("nl")).text, "Support us");
    }

    #[test]
    fn language_write_keeps_seeded_variants() {
        let (_dir, repos) = repositories();
        repos.content.get_page("landing", None);
        repos
            .content
            .update_content("landing", Some("nl"), "Hallo", None)
            .unwrap();

        let variants = repos.content.get_variants("landing").unwrap().unwrap();
        assert_eq!(variants.get("nl").map(String::as_str), Some("Hallo"));
        assert_eq!(variants.get("en"), codec::default_map("landing").unwrap().get("en"));
    }

    #[test]
    fn blank_english_falls_back_to_stored_text_not_json() {
        let (_dir, repos) = repositories();
        repos
            .content
            .update_content("campaign", None, r#"{"en":"","nl":"Welkom"}"#, None)
            .unwrap();

        let page = repos.content.get_page("campaign", Some("fr"));
        assert_eq!(page.text, "Welkom");
        assert!(!page.degraded);
    }

    #[test]
    fn blank_page_key_is_rejected() {
        let (_dir, repos) = repositories();
        assert!(matches!(
            repos.content.update_content(" ", None, "x", None),
            Err(DbError::Validation(_))
        ));
        assert!(repos.content.list_pages().unwrap().is_empty());
    }

    #[test]
    fn storage_failure_serves_degraded_default() {
        let dir = tempfile::TempDir::new().unwrap();
        // The data dir is a regular file, so the engine can never be created.
        let blocker = dir.path().join("data");
        std::fs::write(&blocker, b"x").unwrap();
        let pm = std::sync::Arc::new(crate::persistence::PersistenceManager::new(
            crate::persistence::StorageConfig::new(None, &blocker),
        ));
        let repos = crate::repo::Repositories::new(pm);

        let page = repos.content.get_page("landing", Some("nl"));
        assert!(page.degraded);
        assert!(page.text.starts_with("Welkom"));
    }
}
