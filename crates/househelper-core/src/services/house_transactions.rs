use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::auth::KeyValueStore;
use crate::config::Endpoints;
use crate::http::{ApiClient, HttpTransport, RequestDescriptor};

use super::{fetch_json, ServiceResult};

/// Daily transaction volume for one city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseTransaction {
    pub id: i64,
    pub city: String,
    pub transaction_date: NaiveDate,
    #[serde(default)]
    pub new_house_count: i64,
    #[serde(default)]
    pub new_house_area: f64,
    #[serde(default)]
    pub second_hand_count: i64,
    #[serde(default)]
    pub second_hand_area: f64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseTransactionList {
    pub total: u64,
    pub items: Vec<HouseTransaction>,
}

/// Optional filters for listing transactions.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub city: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

impl TransactionFilter {
    fn apply(self, mut descriptor: RequestDescriptor) -> RequestDescriptor {
        if let Some(city) = self.city {
            descriptor = descriptor.query("city", city);
        }
        if let Some(start) = self.start_date {
            descriptor = descriptor.query("start_date", start.to_string());
        }
        if let Some(end) = self.end_date {
            descriptor = descriptor.query("end_date", end.to_string());
        }
        if let Some(skip) = self.skip {
            descriptor = descriptor.query("skip", skip.to_string());
        }
        if let Some(limit) = self.limit {
            descriptor = descriptor.query("limit", limit.to_string());
        }
        descriptor
    }
}

pub struct HouseTransactionService<T, S> {
    client: ApiClient<T, S>,
}

impl<T, S> HouseTransactionService<T, S>
where
    T: HttpTransport,
    S: KeyValueStore,
{
    pub fn new(client: ApiClient<T, S>) -> Self {
        Self { client }
    }

    pub async fn list(&self, filter: TransactionFilter) -> ServiceResult<HouseTransactionList> {
        let endpoint = format!("{}/", Endpoints::HOUSE_TRANSACTIONS);
        let descriptor = filter.apply(RequestDescriptor::get(endpoint));
        fetch_json(&self.client, descriptor).await
    }

    pub async fn get(&self, id: i64) -> ServiceResult<HouseTransaction> {
        let endpoint = format!("{}/{id}", Endpoints::HOUSE_TRANSACTIONS);
        fetch_json(&self.client, RequestDescriptor::get(endpoint)).await
    }
}
