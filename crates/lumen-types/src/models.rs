use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Support message submitted through the public form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub message: String,
    pub is_positive: bool,
    pub is_published: bool,
    pub donation_amount: Option<f64>,
    pub donation_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn curation(&self) -> CurationState {
        CurationState {
            is_positive: self.is_positive,
            is_published: self.is_published,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Donation {
    pub id: Uuid,
    pub amount: f64,
    pub currency: String,
    pub donor_email: String,
    pub donor_name: String,
    pub transaction_id: Option<String>,
    pub message_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Storytelling testimonial. Curated the same way as messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub name: String,
    pub body: String,
    pub language: Option<String>,
    pub is_positive: bool,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn curation(&self) -> CurationState {
        CurationState {
            is_positive: self.is_positive,
            is_published: self.is_published,
        }
    }
}

/// A page's stored payload. `content` is either plain text or an encoded
/// language map; use the content codec to read it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub id: Uuid,
    pub page_id: String,
    pub content: String,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Admin {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Media slot reference. The binary lives in external object storage;
/// only its identifiers are kept here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Media {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub public_id: String,
    pub url: String,
    pub format: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    HeroVideo,
    HeroImage,
    AboutImage,
    StoryVideo,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::HeroVideo => "hero_video",
            MediaType::HeroImage => "hero_image",
            MediaType::AboutImage => "about_image",
            MediaType::StoryVideo => "story_video",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppProject {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutreachContact {
    pub id: Uuid,
    pub name: String,
    pub category: OutreachCategory,
    pub url: Option<String>,
    pub contact: Option<String>,
    pub sent_message: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub reply_message: Option<String>,
    pub replied_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutreachCategory {
    Press,
    Organization,
    Influencer,
    Other,
}

impl OutreachCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutreachCategory::Press => "press",
            OutreachCategory::Organization => "organization",
            OutreachCategory::Influencer => "influencer",
            OutreachCategory::Other => "other",
        }
    }
}

impl fmt::Display for OutreachCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// -- Curation --

/// The positive/published flag pair. Both flags are freely reversible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CurationState {
    pub is_positive: bool,
    pub is_published: bool,
}

impl CurationState {
    pub const UNREVIEWED: CurationState = CurationState {
        is_positive: false,
        is_published: false,
    };

    /// Visible on the public surface only when both flags are set.
    pub fn is_public(&self) -> bool {
        self.is_positive && self.is_published
    }

    pub fn apply(self, update: &CurationUpdate) -> CurationState {
        CurationState {
            is_positive: update.is_positive.unwrap_or(self.is_positive),
            is_published: update.is_published.unwrap_or(self.is_published),
        }
    }
}

/// Sparse curation change; absent flags are left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CurationUpdate {
    pub is_positive: Option<bool>,
    pub is_published: Option<bool>,
}

impl CurationUpdate {
    pub fn is_empty(&self) -> bool {
        self.is_positive.is_none() && self.is_published.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_requires_both_flags() {
        for positive in [false, true] {
            for published in [false, true] {
                let state = CurationState {
                    is_positive: positive,
                    is_published: published,
                };
                assert_eq!(state.is_public(), positive && published);
            }
        }
    }

    #[test]
    fn apply_only_touches_present_flags() {
        let state = CurationState {
            is_positive: true,
            is_published: false,
        };
        let next = state.apply(&CurationUpdate {
            is_positive: None,
            is_published: Some(true),
        });
        assert!(next.is_positive);
        assert!(next.is_published);

        let back = next.apply(&CurationUpdate {
            is_positive: Some(false),
            is_published: None,
        });
        assert!(!back.is_positive);
        assert!(back.is_published);
    }
}
