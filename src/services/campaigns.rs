//! Campaign registration and lookup

use std::sync::Arc;

use tracing::info;

use crate::clock::Clock;
use crate::models::{Campaign, NewCampaign};
use crate::store::CampaignStore;
use crate::types::{EngineError, Result};

pub struct CampaignService {
    campaigns: Arc<dyn CampaignStore>,
    clock: Arc<dyn Clock>,
}

impl CampaignService {
    pub fn new(campaigns: Arc<dyn CampaignStore>, clock: Arc<dyn Clock>) -> Self {
        Self { campaigns, clock }
    }

    /// Register a campaign created on the ledger
    pub async fn create(&self, request: NewCampaign) -> Result<Campaign> {
        let campaign = request.into_campaign(self.clock.now())?;
        self.campaigns.insert(&campaign).await?;
        info!(
            campaign_id = campaign.campaign_id,
            verification = campaign.verification.enabled,
            "Campaign registered"
        );
        Ok(campaign)
    }

    pub async fn get(&self, campaign_id: u64) -> Result<Campaign> {
        self.campaigns
            .get(campaign_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("campaign {}", campaign_id)))
    }

    pub async fn list(&self) -> Result<Vec<Campaign>> {
        self.campaigns.list().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::store::InMemoryCampaignStore;

    fn request(id: u64) -> NewCampaign {
        NewCampaign {
            campaign_id: id,
            title: "Launch".into(),
            description: "Promote".into(),
            requirements: "Mention".into(),
            verification: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let service = CampaignService::new(Arc::new(InMemoryCampaignStore::new()), Arc::new(SystemClock));

        let created = service.create(request(4)).await.unwrap();
        assert_eq!(service.get(4).await.unwrap(), created);
        assert!(matches!(service.get(5).await, Err(EngineError::NotFound(_))));
        assert!(matches!(
            service.create(request(4)).await,
            Err(EngineError::Validation(_))
        ));
        assert_eq!(service.list().await.unwrap().len(), 1);
    }
}
