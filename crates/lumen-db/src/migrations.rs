use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::engine::Engine;
use crate::error::Result;

/// One additive schema step. Every statement must be `IF NOT EXISTS`.
pub struct Migration {
    pub name: &'static str,
    pub sql: &'static str,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub applied: usize,
    pub failed: Vec<&'static str>,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        name: "messages",
        sql: "CREATE TABLE IF NOT EXISTS messages (
                id              TEXT PRIMARY KEY,
                name            TEXT NOT NULL,
                email           TEXT NOT NULL,
                message         TEXT NOT NULL,
                is_positive     INTEGER NOT NULL DEFAULT 0,
                is_published    INTEGER NOT NULL DEFAULT 0,
                donation_amount REAL,
                donation_id     TEXT,
                created_at      TEXT NOT NULL
            )",
    },
    Migration {
        name: "idx_messages_created",
        sql: "CREATE INDEX IF NOT EXISTS idx_messages_created ON messages(created_at)",
    },
    Migration {
        name: "idx_messages_curation",
        sql: "CREATE INDEX IF NOT EXISTS idx_messages_curation
                ON messages(is_positive, is_published)",
    },
    Migration {
        name: "donations",
        sql: "CREATE TABLE IF NOT EXISTS donations (
                id              TEXT PRIMARY KEY,
                amount          REAL NOT NULL,
                currency        TEXT NOT NULL DEFAULT 'EUR',
                donor_email     TEXT NOT NULL,
                donor_name      TEXT NOT NULL,
                transaction_id  TEXT,
                message_id      TEXT,
                created_at      TEXT NOT NULL
            )",
    },
    Migration {
        name: "idx_donations_message",
        sql: "CREATE INDEX IF NOT EXISTS idx_donations_message ON donations(message_id)",
    },
    Migration {
        name: "idx_donations_created",
        sql: "CREATE INDEX IF NOT EXISTS idx_donations_created ON donations(created_at)",
    },
    Migration {
        name: "comments",
        sql: "CREATE TABLE IF NOT EXISTS comments (
                id              TEXT PRIMARY KEY,
                name            TEXT NOT NULL,
                body            TEXT NOT NULL,
                language        TEXT,
                is_positive     INTEGER NOT NULL DEFAULT 0,
                is_published    INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL
            )",
    },
    Migration {
        name: "idx_comments_created",
        sql: "CREATE INDEX IF NOT EXISTS idx_comments_created ON comments(created_at)",
    },
    Migration {
        name: "idx_comments_curation",
        sql: "CREATE INDEX IF NOT EXISTS idx_comments_curation
                ON comments(is_positive, is_published)",
    },
    Migration {
        name: "content",
        sql: "CREATE TABLE IF NOT EXISTS content (
                id              TEXT PRIMARY KEY,
                page_id         TEXT NOT NULL,
                content         TEXT NOT NULL,
                updated_at      TEXT NOT NULL,
                updated_by      TEXT
            )",
    },
    Migration {
        name: "idx_content_page",
        sql: "CREATE UNIQUE INDEX IF NOT EXISTS idx_content_page ON content(page_id)",
    },
    Migration {
        name: "admins",
        sql: "CREATE TABLE IF NOT EXISTS admins (
                id              TEXT PRIMARY KEY,
                username        TEXT NOT NULL,
                password_hash   TEXT NOT NULL,
                created_at      TEXT NOT NULL
            )",
    },
    Migration {
        name: "idx_admins_username",
        sql: "CREATE UNIQUE INDEX IF NOT EXISTS idx_admins_username ON admins(username)",
    },
    Migration {
        name: "media",
        sql: "CREATE TABLE IF NOT EXISTS media (
                id              TEXT PRIMARY KEY,
                type            TEXT NOT NULL,
                public_id       TEXT NOT NULL,
                url             TEXT NOT NULL,
                format          TEXT,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            )",
    },
    Migration {
        name: "idx_media_type",
        sql: "CREATE UNIQUE INDEX IF NOT EXISTS idx_media_type ON media(type)",
    },
    Migration {
        name: "app_projects",
        sql: "CREATE TABLE IF NOT EXISTS app_projects (
                id              TEXT PRIMARY KEY,
                name            TEXT NOT NULL,
                url             TEXT NOT NULL,
                description     TEXT,
                created_at      TEXT NOT NULL
            )",
    },
    Migration {
        name: "outreach",
        sql: "CREATE TABLE IF NOT EXISTS outreach (
                id              TEXT PRIMARY KEY,
                name            TEXT NOT NULL,
                category        TEXT NOT NULL,
                url             TEXT,
                contact         TEXT,
                sent_message    TEXT,
                sent_at         TEXT,
                reply_message   TEXT,
                replied_at      TEXT,
                created_at      TEXT NOT NULL
            )",
    },
    Migration {
        name: "idx_outreach_sent",
        sql: "CREATE INDEX IF NOT EXISTS idx_outreach_sent ON outreach(sent_at)",
    },
];

pub fn run(engine: &Engine) -> Result<MigrationReport> {
    engine.with_conn(|conn| Ok(apply(conn, MIGRATIONS)))
}

/// Apply each step independently. A failing step is logged and skipped so
/// one bad statement never blocks startup.
pub fn apply(conn: &Connection, migrations: &[Migration]) -> MigrationReport {
    let mut report = MigrationReport::default();

    for migration in migrations {
        match conn.execute_batch(migration.sql) {
            Ok(()) => report.applied += 1,
            Err(e) if e.to_string().contains("already exists") => {
                debug!("Migration '{}' already present", migration.name);
                report.applied += 1;
            }
            Err(e) => {
                warn!("Migration '{}' failed: {}", migration.name, e);
                report.failed.push(migration.name);
            }
        }
    }

    info!(
        "Database migrations complete ({} applied, {} failed)",
        report.applied,
        report.failed.len()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema_objects(conn: &Connection) -> Vec<(String, String)> {
        let mut stmt = conn
            .prepare("SELECT type, name FROM sqlite_master WHERE name NOT LIKE 'sqlite_%' ORDER BY name")
            .unwrap();
        stmt.query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn running_twice_is_a_no_op() {
        let conn = Connection::open_in_memory().unwrap();

        let first = apply(&conn, MIGRATIONS);
        assert_eq!(first.applied, MIGRATIONS.len());
        assert!(first.failed.is_empty());
        let before = schema_objects(&conn);

        let second = apply(&conn, MIGRATIONS);
        assert!(second.failed.is_empty());
        assert_eq!(schema_objects(&conn), before);
    }

    #[test]
    fn adds_new_tables_without_touching_rows() {
        let conn = Connection::open_in_memory().unwrap();
        // An older file that only knew about messages.
        apply(&conn, &MIGRATIONS[..1]);
        conn.execute(
            "INSERT INTO messages (id, name, email, message, created_at)
             VALUES ('m1', 'Ana', 'a@x.com', 'hi', '2026-01-01T00:00:00.000000Z')",
            [],
        )
        .unwrap();

        apply(&conn, MIGRATIONS);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM messages", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'outreach'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(tables, 1);
    }

    #[test]
    fn bad_step_is_skipped_not_fatal() {
        let conn = Connection::open_in_memory().unwrap();
        let steps = [
            Migration {
                name: "broken",
                sql: "CREATE INDEX IF NOT EXISTS idx_missing ON nowhere(col)",
            },
            Migration {
                name: "notes",
                sql: "CREATE TABLE IF NOT EXISTS notes (id TEXT PRIMARY KEY)",
            },
        ];

        let report = apply(&conn, &steps);
        assert_eq!(report.applied, 1);
        assert_eq!(report.failed, vec!["broken"]);
    }
}
