//! Record store client: reservations in, snapshots out, over the store's
//! REST interface. Every call is a remote call that can fail independently
//! of browser state; failures are reported to the caller, never retried
//! here.

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{PriceQuote, PriceSnapshot, Reservation};

const RESERVATIONS_TABLE: &str = "bookings";
const SNAPSHOTS_TABLE: &str = "price_history";

pub struct RecordStore {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl RecordStore {
    pub fn new(base_url: impl Into<String>, service_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            service_key: service_key.into(),
        })
    }

    /// Ids of every reservation currently in the store.
    pub async fn list_reservations(&self) -> Result<Vec<String>> {
        #[derive(serde::Deserialize)]
        struct IdRow {
            id: String,
        }
        let rows: Vec<IdRow> = self
            .get_json(RESERVATIONS_TABLE, &[("select", "id")])
            .await?;
        Ok(rows.into_iter().map(|row| row.id).collect())
    }

    pub async fn get_reservation(&self, id: &str) -> Result<Reservation> {
        let filter = format!("eq.{id}");
        let rows: Vec<Reservation> = self
            .get_json(RESERVATIONS_TABLE, &[("select", "*"), ("id", &filter)])
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| Error::ReservationNotFound(id.to_owned()))
    }

    /// Append a snapshot row. The history is append-only: existing rows are
    /// never updated or deleted.
    pub async fn insert_snapshot(&self, snapshot: &PriceSnapshot) -> Result<()> {
        let url = self.endpoint(SNAPSHOTS_TABLE);
        let response = self
            .client
            .post(&url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .header("Prefer", "return=minimal")
            .json(snapshot)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::StoreStatus {
                status: status.as_u16(),
                url,
            });
        }
        Ok(())
    }

    /// Snapshot Recorder: derive the minimum over the quote and append the
    /// snapshot. Refuses an empty quote before touching the store, so a
    /// failed record is a no-op there.
    pub async fn record_snapshot(
        &self,
        reservation_id: &str,
        quote: PriceQuote,
    ) -> Result<PriceSnapshot> {
        let snapshot = PriceSnapshot::compute(reservation_id, quote)?;
        self.insert_snapshot(&snapshot).await?;
        debug!(
            reservation = reservation_id,
            lowest_category = %snapshot.lowest_category,
            lowest_price = snapshot.lowest_price,
            "snapshot appended"
        );
        Ok(snapshot)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = self.endpoint(table);
        let response = self
            .client
            .get(&url)
            .query(query)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::StoreStatus {
                status: status.as_u16(),
                url,
            });
        }
        Ok(response.json().await?)
    }

    fn endpoint(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }
}
