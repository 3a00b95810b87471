use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{MediaType, Message, OutreachCategory};

// -- JWT Claims --

/// Admin token claims, shared by the login handler and the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub admin_id: Uuid,
    pub username: String,
    pub token: String,
}

// -- Messages --

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewMessage {
    pub name: String,
    pub email: String,
    pub message: String,
    #[serde(default)]
    pub donation_amount: Option<f64>,
}

/// What the public wall shows of a message: no contact details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicMessage {
    pub id: Uuid,
    pub name: String,
    pub message: String,
    pub donation_amount: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl From<Message> for PublicMessage {
    fn from(m: Message) -> Self {
        Self {
            id: m.id,
            name: m.name,
            message: m.message,
            donation_amount: m.donation_amount,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MessageFilter {
    pub is_positive: Option<bool>,
    pub is_published: Option<bool>,
}

// -- Donations --

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewDonation {
    pub amount: f64,
    #[serde(default)]
    pub currency: Option<String>,
    pub donor_email: String,
    pub donor_name: String,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub message_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrencyTotal {
    pub currency: String,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DonationSummary {
    pub count: u64,
    pub totals: Vec<CurrencyTotal>,
}

// -- Comments --

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewComment {
    pub name: String,
    pub body: String,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommentPatch {
    pub name: Option<String>,
    pub body: Option<String>,
    pub language: Option<String>,
    pub is_positive: Option<bool>,
    pub is_published: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentFilter {
    pub is_positive: Option<bool>,
    pub is_published: Option<bool>,
    pub language: Option<String>,
}

// -- Content --

#[derive(Debug, Deserialize)]
pub struct ContentQuery {
    pub lang: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateContentRequest {
    #[serde(default)]
    pub lang: Option<String>,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ContentResponse {
    pub page_id: String,
    pub lang: String,
    pub content: String,
}

// -- Media --

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpsertMedia {
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub public_id: String,
    pub url: String,
    #[serde(default)]
    pub format: Option<String>,
}

// -- App projects --

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewAppProject {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppProjectPatch {
    pub name: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
}

// -- Outreach --

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewOutreachContact {
    pub name: String,
    pub category: OutreachCategory,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutreachPatch {
    pub name: Option<String>,
    pub category: Option<OutreachCategory>,
    pub url: Option<String>,
    pub contact: Option<String>,
    pub sent_message: Option<String>,
    pub reply_message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutreachMessageRequest {
    pub message: String,
}
