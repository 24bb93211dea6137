use std::sync::Arc;

use chrono::NaiveDate;
use mongodb::bson::oid::ObjectId;

use crate::{error::StoreError, models::PriceObservation};

use super::store::Store;

/// Read-only price queries for one (crop, market) pair.
#[derive(Clone)]
pub struct PriceLookup {
    store: Arc<dyn Store>,
}

impl PriceLookup {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Observation with the greatest date for the pair.
    pub async fn latest(
        &self,
        crop_id: ObjectId,
        market_id: ObjectId,
    ) -> Result<Option<PriceObservation>, StoreError> {
        self.store.latest_price(crop_id, market_id).await
    }

    /// Observation with the greatest date <= `cutoff`.
    pub async fn as_of(
        &self,
        crop_id: ObjectId,
        market_id: ObjectId,
        cutoff: NaiveDate,
    ) -> Result<Option<PriceObservation>, StoreError> {
        self.store.price_as_of(crop_id, market_id, cutoff).await
    }
}
