use rusqlite::types::Value;
use tracing::{error, info};
use uuid::Uuid;

use lumen_types::api::{CurrencyTotal, DonationSummary, NewDonation};
use lumen_types::models::{Donation, Message};

use crate::error::{DbError, Result};
use crate::mapper::{self, Entity, EntitySchema, col};
use crate::repo::Repo;
use crate::repo::messages::{MessageRepository, positive_amount};

pub const DEFAULT_CURRENCY: &str = "EUR";

const DONATION_SCHEMA: EntitySchema = EntitySchema {
    entity: "donation",
    table: "donations",
    primary_key: "id",
    columns: &[
        col("id"),
        col("amount"),
        col("currency"),
        col("donor_email"),
        col("donor_name"),
        col("transaction_id"),
        col("message_id"),
        col("created_at"),
    ],
};

impl Entity for Donation {
    const SCHEMA: &'static EntitySchema = &DONATION_SCHEMA;
}

fn normalize_currency(currency: &str) -> Result<String> {
    let code = currency.trim().to_ascii_uppercase();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(DbError::validation(format!("invalid currency code '{}'", currency)));
    }
    Ok(code)
}

/// Outcome of copying a donation onto its message. Only a failed snapshot is
/// surfaced: the link then lives in memory but not on disk. Anything else
/// leaves the donation stored and the message untouched, and is logged.
fn settle_link(donation_id: Uuid, message_id: Uuid, linked: Result<Message>) -> Result<()> {
    match linked {
        Ok(_) => Ok(()),
        Err(e @ DbError::Durability { .. }) => Err(e),
        Err(e) => {
            error!(
                "Donation {} stored but message {} was not updated: {}",
                donation_id, message_id, e
            );
            Ok(())
        }
    }
}

#[derive(Clone)]
pub struct DonationRepository {
    repo: Repo,
    messages: MessageRepository,
    default_currency: String,
}

impl DonationRepository {
    pub fn new(repo: Repo, messages: MessageRepository) -> Self {
        Self {
            repo,
            messages,
            default_currency: DEFAULT_CURRENCY.to_string(),
        }
    }

    pub fn with_default_currency(mut self, currency: &str) -> Self {
        self.default_currency = currency.trim().to_ascii_uppercase();
        self
    }

    /// Store a donation and, when it references a message, copy the amount
    /// and donation id onto that message.
    ///
    /// The two writes are not atomic. If the message write-back fails the
    /// donation is kept and the mismatch is logged; a failed snapshot of the
    /// write-back is returned as [`DbError::Durability`].
    pub fn create(&self, input: NewDonation) -> Result<Donation> {
        let amount = positive_amount(input.amount)?;
        let donor_name = mapper::required("donor_name", &input.donor_name)?;
        let donor_email = mapper::required("donor_email", &input.donor_email)?;
        if !donor_email.contains('@') {
            return Err(DbError::validation("donor_email is not an email address"));
        }
        let currency = match mapper::optional(input.currency.as_deref()) {
            Some(code) => normalize_currency(&code)?,
            None => self.default_currency.clone(),
        };

        if let Some(message_id) = input.message_id {
            if self.messages.find_by_id(message_id)?.is_none() {
                return Err(DbError::not_found("message", message_id));
            }
        }

        let donation = Donation {
            id: Uuid::new_v4(),
            amount,
            currency,
            donor_email,
            donor_name,
            transaction_id: mapper::optional(input.transaction_id.as_deref()),
            message_id: input.message_id,
            created_at: mapper::now(),
        };

        self.repo.write(|conn| {
            mapper::insert(
                conn,
                &DONATION_SCHEMA,
                &[
                    ("id", mapper::text(donation.id.to_string())),
                    ("amount", Value::from(donation.amount)),
                    ("currency", mapper::text(donation.currency.as_str())),
                    ("donor_email", mapper::text(donation.donor_email.as_str())),
                    ("donor_name", mapper::text(donation.donor_name.as_str())),
                    ("transaction_id", mapper::opt_text(donation.transaction_id.clone())),
                    ("message_id", mapper::opt_text(donation.message_id.map(|id| id.to_string()))),
                    ("created_at", mapper::stamp(donation.created_at)),
                ],
            )
        })?;
        info!(
            "Donation {} recorded ({} {})",
            donation.id, donation.amount, donation.currency
        );

        if let Some(message_id) = donation.message_id {
            let linked = self
                .messages
                .attach_donation(message_id, donation.id, donation.amount);
            settle_link(donation.id, message_id, linked)?;
        }

        Ok(donation)
    }

    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Donation>> {
        self.repo
            .read(|conn| mapper::find_one(conn, "id", &id.to_string()))
    }

    pub fn find_all(&self) -> Result<Vec<Donation>> {
        self.repo
            .read(|conn| mapper::find_many(conn, "ORDER BY created_at DESC, rowid DESC", &[]))
    }

    pub fn find_by_message(&self, message_id: Uuid) -> Result<Vec<Donation>> {
        self.repo.read(|conn| {
            mapper::find_many(
                conn,
                "WHERE message_id = ?1 ORDER BY created_at DESC, rowid DESC",
                rusqlite::params![message_id.to_string()],
            )
        })
    }

    /// Donation count and per-currency totals.
    pub fn summary(&self) -> Result<DonationSummary> {
        self.repo.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT currency, COUNT(*), COALESCE(SUM(amount), 0)
                 FROM donations GROUP BY currency ORDER BY currency",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?, row.get::<_, f64>(2)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let count: u64 = rows.iter().map(|(_, n, _)| *n as u64).sum();
            let totals = rows
                .into_iter()
                .map(|(currency, _, total)| CurrencyTotal { currency, total })
                .collect();
            Ok(DonationSummary { count, totals })
        })
    }
}
