//! Influencer document schema

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::models::{ChannelVerificationMethod, Influencer};

pub const INFLUENCER_COLLECTION: &str = "influencers";

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct InfluencerDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub influencer_id: String,

    /// Lower-cased wallet address
    pub wallet_address: String,

    // Absent rather than null so the sparse unique indexes ignore them
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default)]
    pub channel_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_method: Option<ChannelVerificationMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime>,

    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl From<&Influencer> for InfluencerDoc {
    fn from(i: &Influencer) -> Self {
        Self {
            _id: None,
            metadata: Metadata::default(),
            influencer_id: i.influencer_id.clone(),
            wallet_address: i.wallet_address.clone(),
            channel_id: i.channel_id.clone(),
            channel_name: i.channel_name.clone(),
            email: i.email.clone(),
            channel_verified: i.channel_verified,
            verification_method: i.verification_method,
            verification_code: i.verification_code.clone(),
            verified_at: i.verified_at.map(DateTime::from_chrono),
            created_at: DateTime::from_chrono(i.created_at),
            updated_at: DateTime::from_chrono(i.updated_at),
        }
    }
}

impl From<InfluencerDoc> for Influencer {
    fn from(d: InfluencerDoc) -> Self {
        Self {
            influencer_id: d.influencer_id,
            wallet_address: d.wallet_address,
            channel_id: d.channel_id,
            channel_name: d.channel_name,
            email: d.email,
            channel_verified: d.channel_verified,
            verification_method: d.verification_method,
            verification_code: d.verification_code,
            verified_at: d.verified_at.map(|t| t.to_chrono()),
            created_at: d.created_at.to_chrono(),
            updated_at: d.updated_at.to_chrono(),
        }
    }
}

impl IntoIndexes for InfluencerDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "wallet_address": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("wallet_address_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "influencer_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("influencer_id_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "channel_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .sparse(true)
                        .name("channel_id_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "email": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .sparse(true)
                        .name("email_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for InfluencerDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
