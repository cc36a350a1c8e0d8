//! Campaign document schema

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::models::{Campaign, VerificationConfig};

pub const CAMPAIGN_COLLECTION: &str = "campaigns";

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CampaignDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Ledger-assigned id
    pub campaign_id: i64,
    pub title: String,
    pub description: String,
    pub requirements: String,
    #[serde(default)]
    pub verification: VerificationConfig,
    pub created_at: DateTime,
}

impl From<&Campaign> for CampaignDoc {
    fn from(c: &Campaign) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            campaign_id: c.campaign_id as i64,
            title: c.title.clone(),
            description: c.description.clone(),
            requirements: c.requirements.clone(),
            verification: c.verification.clone(),
            created_at: DateTime::from_chrono(c.created_at),
        }
    }
}

impl From<CampaignDoc> for Campaign {
    fn from(d: CampaignDoc) -> Self {
        Self {
            campaign_id: d.campaign_id as u64,
            title: d.title,
            description: d.description,
            requirements: d.requirements,
            verification: d.verification,
            created_at: d.created_at.to_chrono(),
        }
    }
}

impl IntoIndexes for CampaignDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "campaign_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("campaign_id_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "created_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("created_at_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for CampaignDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
