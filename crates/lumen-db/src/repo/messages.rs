use rusqlite::types::Value;
use tracing::info;
use uuid::Uuid;

use lumen_types::api::{MessageFilter, NewMessage};
use lumen_types::models::{CurationState, CurationUpdate, Message};

use crate::error::{DbError, Result};
use crate::mapper::{self, Entity, EntitySchema, Field, col, flag};
use crate::repo::Repo;

const MESSAGE_SCHEMA: EntitySchema = EntitySchema {
    entity: "message",
    table: "messages",
    primary_key: "id",
    columns: &[
        col("id"),
        col("name"),
        col("email"),
        col("message"),
        flag("is_positive"),
        flag("is_published"),
        col("donation_amount"),
        col("donation_id"),
        col("created_at"),
    ],
};

impl Entity for Message {
    const SCHEMA: &'static EntitySchema = &MESSAGE_SCHEMA;
}

const NEWEST_FIRST: &str = "ORDER BY created_at DESC, rowid DESC";

pub(crate) fn curation_fields(state: CurationState) -> [Field; 2] {
    [
        ("is_positive", Value::from(state.is_positive)),
        ("is_published", Value::from(state.is_published)),
    ]
}

pub(crate) fn positive_amount(amount: f64) -> Result<f64> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(DbError::validation("amount must be a positive number"));
    }
    Ok(amount)
}

#[derive(Clone)]
pub struct MessageRepository {
    repo: Repo,
}

impl MessageRepository {
    pub fn new(repo: Repo) -> Self {
        Self { repo }
    }

    /// Store a submission as unreviewed.
    pub fn create(&self, input: NewMessage) -> Result<Message> {
        let name = mapper::required("name", &input.name)?;
        let email = mapper::required("email", &input.email)?;
        let body = mapper::required("message", &input.message)?;
        let donation_amount = input.donation_amount.map(positive_amount).transpose()?;
        let state = CurationState::UNREVIEWED;

        let message = Message {
            id: Uuid::new_v4(),
            name,
            email,
            message: body,
            is_positive: state.is_positive,
            is_published: state.is_published,
            donation_amount,
            donation_id: None,
            created_at: mapper::now(),
        };

        self.repo.write(|conn| {
            mapper::insert(
                conn,
                &MESSAGE_SCHEMA,
                &[
                    ("id", mapper::text(message.id.to_string())),
                    ("name", mapper::text(message.name.as_str())),
                    ("email", mapper::text(message.email.as_str())),
                    ("message", mapper::text(message.message.as_str())),
                    ("is_positive", Value::from(state.is_positive)),
                    ("is_published", Value::from(state.is_published)),
                    ("donation_amount", Value::from(message.donation_amount)),
                    ("created_at", mapper::stamp(message.created_at)),
                ],
            )
        })?;

        info!("Message {} submitted", message.id);
        Ok(message)
    }

    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Message>> {
        self.repo
            .read(|conn| mapper::find_one(conn, "id", &id.to_string()))
    }

    pub fn find_all(&self, filter: &MessageFilter) -> Result<Vec<Message>> {
        let mut clauses = Vec::new();
        if let Some(positive) = filter.is_positive {
            clauses.push(format!("is_positive = {}", positive as i32));
        }
        if let Some(published) = filter.is_published {
            clauses.push(format!("is_published = {}", published as i32));
        }
        let tail = if clauses.is_empty() {
            NEWEST_FIRST.to_string()
        } else {
            format!("WHERE {} {}", clauses.join(" AND "), NEWEST_FIRST)
        };

        self.repo.read(|conn| mapper::find_many(conn, &tail, &[]))
    }

    /// Messages that are both positive and published.
    pub fn find_public(&self) -> Result<Vec<Message>> {
        self.repo.read(|conn| {
            mapper::find_many(
                conn,
                &format!("WHERE is_positive = 1 AND is_published = 1 {}", NEWEST_FIRST),
                &[],
            )
        })
    }

    /// Unreviewed submissions waiting for a curator.
    pub fn count_pending(&self) -> Result<u64> {
        self.repo.read(|conn| {
            mapper::count(conn, &MESSAGE_SCHEMA, "WHERE is_positive = 0 AND is_published = 0")
        })
    }

    /// Sparse flag update. `Ok(None)` when the id does not exist.
    pub fn update(&self, id: Uuid, update: &CurationUpdate) -> Result<Option<Message>> {
        if update.is_empty() {
            return self.find_by_id(id);
        }

        self.repo.write(|conn| {
            let key = id.to_string();
            let Some(current) = mapper::find_one::<Message>(conn, "id", &key)? else {
                return Ok(None);
            };
            let next = current.curation().apply(update);
            mapper::update_fields(conn, &MESSAGE_SCHEMA, &key, &curation_fields(next))?;
            mapper::find_one(conn, "id", &key)
        })
    }

    /// Like [`update`](Self::update), but a missing id is an error.
    pub fn curate(&self, id: Uuid, update: &CurationUpdate) -> Result<Message> {
        let message = self
            .update(id, update)?
            .ok_or_else(|| DbError::not_found(MESSAGE_SCHEMA.entity, id))?;
        info!(
            "Message {} curated (positive={}, published={})",
            id, message.is_positive, message.is_published
        );
        Ok(message)
    }

    /// Record the donation a message led to.
    pub fn attach_donation(&self, id: Uuid, donation_id: Uuid, amount: f64) -> Result<Message> {
        let fields = [
            ("donation_id", mapper::text(donation_id.to_string())),
            ("donation_amount", Value::from(amount)),
        ];
        self.repo
            .write(|conn| {
                if !mapper::update_fields(conn, &MESSAGE_SCHEMA, &id.to_string(), &fields)? {
                    return Ok(None);
                }
                mapper::find_one(conn, "id", &id.to_string())
            })?
            .ok_or_else(|| DbError::not_found(MESSAGE_SCHEMA.entity, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::testing::repositories;

    fn submission(name: &str) -> NewMessage {
        NewMessage {
            name: name.to_string(),
            email: format!("{}@x.com", name.to_lowercase()),
            message: "hi".to_string(),
            donation_amount: None,
        }
    }

    #[test]
    fn new_message_is_unreviewed() {
        let (_dir, repos) = repositories();
        let msg = repos.messages.create(submission("Ana")).unwrap();
        assert!(!msg.is_positive);
        assert!(!msg.is_published);

        let stored = repos.messages.find_by_id(msg.id).unwrap().unwrap();
        assert_eq!(stored, msg);
        assert_eq!(repos.messages.count_pending().unwrap(), 1);
    }

    #[test]
    fn blank_fields_are_rejected_before_writing() {
        let (_dir, repos) = repositories();
        let mut input = submission("Ana");
        input.email = "  ".to_string();

        assert!(matches!(repos.messages.create(input), Err(DbError::Validation(_))));
        assert!(repos.messages.find_all(&MessageFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn curate_to_public_and_back() {
        let (_dir, repos) = repositories();
        let msg = repos.messages.create(submission("Ana")).unwrap();

        let both = CurationUpdate {
            is_positive: Some(true),
            is_published: Some(true),
        };
        repos.messages.curate(msg.id, &both).unwrap();
        let public = repos.messages.find_public().unwrap();
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].id, msg.id);

        // Same values again: same state, no error.
        let again = repos.messages.curate(msg.id, &both).unwrap();
        assert!(again.is_positive && again.is_published);

        repos
            .messages
            .curate(
                msg.id,
                &CurationUpdate {
                    is_positive: None,
                    is_published: Some(false),
                },
            )
            .unwrap();
        assert!(repos.messages.find_public().unwrap().is_empty());
    }

    #[test]
    fn partial_update_leaves_the_other_flag() {
        let (_dir, repos) = repositories();
        let msg = repos.messages.create(submission("Ana")).unwrap();

        let updated = repos
            .messages
            .update(
                msg.id,
                &CurationUpdate {
                    is_positive: Some(true),
                    is_published: None,
                },
            )
            .unwrap()
            .unwrap();
        assert!(updated.is_positive);
        assert!(!updated.is_published);

        let updated = repos
            .messages
            .update(
                msg.id,
                &CurationUpdate {
                    is_positive: None,
                    is_published: Some(true),
                },
            )
            .unwrap()
            .unwrap();
        assert!(updated.is_positive);
        assert!(updated.is_published);
    }

    #[test]
    fn empty_update_returns_current_row() {
        let (_dir, repos) = repositories();
        let msg = repos.messages.create(submission("Ana")).unwrap();
        let same = repos
            .messages
            .update(msg.id, &CurationUpdate::default())
            .unwrap()
            .unwrap();
        assert_eq!(same, msg);
    }

    #[test]
    fn curating_unknown_id_is_not_found() {
        let (_dir, repos) = repositories();
        let err = repos
            .messages
            .curate(
                Uuid::new_v4(),
                &CurationUpdate {
                    is_positive: Some(true),
                    is_published: None,
                },
            )
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(repos.messages.find_all(&MessageFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn public_listing_matches_the_flag_conjunction() {
        let (_dir, repos) = repositories();
        let combos = [(false, false), (true, false), (false, true), (true, true)];
        let mut ids = Vec::new();
        for (i, (positive, published)) in combos.iter().enumerate() {
            let msg = repos.messages.create(submission(&format!("User{}", i))).unwrap();
            repos
                .messages
                .curate(
                    msg.id,
                    &CurationUpdate {
                        is_positive: Some(*positive),
                        is_published: Some(*published),
                    },
                )
                .unwrap();
            ids.push(msg.id);
        }

        let public = repos.messages.find_public().unwrap();
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].id, ids[3]);
        assert!(public.iter().all(|m| m.curation().is_public()));

        let unpublished = repos
            .messages
            .find_all(&MessageFilter {
                is_positive: None,
                is_published: Some(false),
            })
            .unwrap();
        assert_eq!(unpublished.len(), 2);
    }

    #[test]
    fn find_all_is_newest_first() {
        let (_dir, repos) = repositories();
        let first = repos.messages.create(submission("Ana")).unwrap();
        let second = repos.messages.create(submission("Bo")).unwrap();

        let all = repos.messages.find_all(&MessageFilter::default()).unwrap();
        assert_eq!(all.iter().map(|m| m.id).collect::<Vec<_>>(), vec![second.id, first.id]);
    }
}
