use tracing::info;
use uuid::Uuid;

use lumen_types::api::{NewOutreachContact, OutreachPatch};
use lumen_types::models::OutreachContact;

use crate::error::{DbError, Result};
use crate::mapper::{self, Entity, EntitySchema, Field, col};
use crate::repo::Repo;

const OUTREACH_SCHEMA: EntitySchema = EntitySchema {
    entity: "outreach contact",
    table: "outreach",
    primary_key: "id",
    columns: &[
        col("id"),
        col("name"),
        col("category"),
        col("url"),
        col("contact"),
        col("sent_message"),
        col("sent_at"),
        col("reply_message"),
        col("replied_at"),
        col("created_at"),
    ],
};

impl Entity for OutreachContact {
    const SCHEMA: &'static EntitySchema = &OUTREACH_SCHEMA;
}

/// Most recently contacted first; never-contacted entries follow, newest first.
const OUTREACH_ORDER: &str =
    "ORDER BY sent_at IS NULL, sent_at DESC, created_at DESC, rowid DESC";

#[derive(Clone)]
pub struct OutreachRepository {
    repo: Repo,
}

impl OutreachRepository {
    pub fn new(repo: Repo) -> Self {
        Self { repo }
    }

    pub fn create(&self, input: NewOutreachContact) -> Result<OutreachContact> {
        let contact = OutreachContact {
            id: Uuid::new_v4(),
            name: mapper::required("name", &input.name)?,
            category: input.category,
            url: mapper::optional(input.url.as_deref()),
            contact: mapper::optional(input.contact.as_deref()),
            sent_message: None,
            sent_at: None,
            reply_message: None,
            replied_at: None,
            created_at: mapper::now(),
        };

        self.repo.write(|conn| {
            mapper::insert(
                conn,
                &OUTREACH_SCHEMA,
                &[
                    ("id", mapper::text(contact.id.to_string())),
                    ("name", mapper::text(contact.name.as_str())),
                    ("category", mapper::text(contact.category.as_str())),
                    ("url", mapper::opt_text(contact.url.clone())),
                    ("contact", mapper::opt_text(contact.contact.clone())),
                    ("created_at", mapper::stamp(contact.created_at)),
                ],
            )
        })?;

        info!("Outreach contact '{}' added ({})", contact.name, contact.category);
        Ok(contact)
    }

    pub fn find_by_id(&self, id: Uuid) -> Result<Option<OutreachContact>> {
        self.repo
            .read(|conn| mapper::find_one(conn, "id", &id.to_string()))
    }

    pub fn find_all(&self) -> Result<Vec<OutreachContact>> {
        self.repo
            .read(|conn| mapper::find_many(conn, OUTREACH_ORDER, &[]))
    }

    /// Field-by-field update. Setting a sent or reply message also stamps
    /// its timestamp.
    pub fn update(&self, id: Uuid, patch: &OutreachPatch) -> Result<Option<OutreachContact>> {
        let mut fields: Vec<Field> = Vec::new();
        if let Some(name) = &patch.name {
            fields.push(("name", mapper::text(mapper::required("name", name)?)));
        }
        if let Some(category) = patch.category {
            fields.push(("category", mapper::text(category.as_str())));
        }
        if let Some(url) = &patch.url {
            fields.push(("url", mapper::opt_text(mapper::optional(Some(url.as_str())))));
        }
        if let Some(contact) = &patch.contact {
            fields.push(("contact", mapper::opt_text(mapper::optional(Some(contact.as_str())))));
        }
        if let Some(sent) = &patch.sent_message {
            fields.push(("sent_message", mapper::text(sent.as_str())));
            fields.push(("sent_at", mapper::stamp(mapper::now())));
        }
        if let Some(reply) = &patch.reply_message {
            fields.push(("reply_message", mapper::text(reply.as_str())));
            fields.push(("replied_at", mapper::stamp(mapper::now())));
        }
        if fields.is_empty() {
            return self.find_by_id(id);
        }

        self.repo.write(|conn| {
            if !mapper::update_fields(conn, &OUTREACH_SCHEMA, &id.to_string(), &fields)? {
                return Ok(None);
            }
            mapper::find_one(conn, "id", &id.to_string())
        })
    }

    pub fn mark_sent(&self, id: Uuid, message: &str) -> Result<OutreachContact> {
        let patch = OutreachPatch {
            sent_message: Some(mapper::required("message", message)?),
            ..OutreachPatch::default()
        };
        self.update(id, &patch)?
            .ok_or_else(|| DbError::not_found(OUTREACH_SCHEMA.entity, id))
    }

    pub fn mark_replied(&self, id: Uuid, message: &str) -> Result<OutreachContact> {
        let patch = OutreachPatch {
            reply_message: Some(mapper::required("message", message)?),
            ..OutreachPatch::default()
        };
        self.update(id, &patch)?
            .ok_or_else(|| DbError::not_found(OUTREACH_SCHEMA.entity, id))
    }

    pub fn delete(&self, id: Uuid) -> Result<Option<OutreachContact>> {
        let Some(existing) = self.find_by_id(id)? else {
            return Ok(None);
        };
        self.repo
            .write(|conn| mapper::delete_where(conn, &OUTREACH_SCHEMA, "id", &id.to_string()))?;
        info!("Outreach contact '{}' removed", existing.name);
        Ok(Some(existing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::testing::repositories;
    use lumen_types::models::OutreachCategory;

    fn contact(name: &str) -> NewOutreachContact {
        NewOutreachContact {
            name: name.to_string(),
            category: OutreachCategory::Press,
            url: None,
            contact: Some(format!("{}@news.example", name.to_lowercase())),
        }
    }

    #[test]
    fn sent_contacts_come_first() {
        let (_dir, repos) = repositories();
        let a = repos.outreach.create(contact("A")).unwrap();
        let b = repos.outreach.create(contact("B")).unwrap();
        let c = repos.outreach.create(contact("C")).unwrap();

        repos.outreach.mark_sent(b.id, "Hello B").unwrap();
        repos.outreach.mark_sent(a.id, "Hello A").unwrap();

        let order: Vec<Uuid> = repos.outreach.find_all().unwrap().into_iter().map(|o| o.id).collect();
        assert_eq!(order, vec![a.id, b.id, c.id]);
    }

    #[test]
    fn reply_is_stamped() {
        let (_dir, repos) = repositories();
        let o = repos.outreach.create(contact("A")).unwrap();
        let replied = repos.outreach.mark_replied(o.id, "Thanks, we'll cover it").unwrap();

        assert_eq!(replied.reply_message.as_deref(), Some("Thanks, we'll cover it"));
        assert!(replied.replied_at.is_some());
        assert!(replied.sent_at.is_none());
    }

    #[test]
    fn update_by_field() {
        let (_dir, repos) = repositories();
        let o = repos.outreach.create(contact("A")).unwrap();
        let updated = repos
            .outreach
            .update(
                o.id,
                &OutreachPatch {
                    category: Some(OutreachCategory::Influencer),
                    url: Some("https://a.example".into()),
                    ..OutreachPatch::default()
                },
            )
            .unwrap()
            .unwrap();

        assert_eq!(updated.category, OutreachCategory::Influencer);
        assert_eq!(updated.url.as_deref(), Some("https://a.example"));
        assert_eq!(updated.contact, o.contact);
    }

    #[test]
    fn mark_sent_on_missing_contact() {
        let (_dir, repos) = repositories();
        assert!(repos.outreach.mark_sent(Uuid::new_v4(), "Hi").unwrap_err().is_not_found());
    }
}
