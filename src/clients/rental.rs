//! Client for the rental service.

use uuid::Uuid;

use crate::clients::{check_status, into_json, CallError};
use crate::model::{BackendRentalCreate, Rental};

pub struct RentalClient {
    http: reqwest::Client,
    base_url: String,
}

impl RentalClient {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn create(&self, payload: &BackendRentalCreate) -> Result<Rental, CallError> {
        let response = self
            .http
            .post(format!("{}/api/v1/rental", self.base_url))
            .json(payload)
            .send()
            .await
            .map_err(CallError::from_transport)?;
        into_json(response).await
    }

    pub async fn list(&self, username: &str) -> Result<Vec<Rental>, CallError> {
        let response = self
            .http
            .get(format!("{}/api/v1/rental", self.base_url))
            .query(&[("username", username)])
            .send()
            .await
            .map_err(CallError::from_transport)?;
        into_json(response).await
    }

    pub async fn get(&self, rental_uid: Uuid, username: &str) -> Result<Rental, CallError> {
        let response = self
            .http
            .get(format!("{}/api/v1/rental/{}", self.base_url, rental_uid))
            .query(&[("username", username)])
            .send()
            .await
            .map_err(CallError::from_transport)?;
        into_json(response).await
    }

    /// Cancel a rental. Re-cancelling an already canceled rental answers
    /// success on the backend side, so replays are safe.
    pub async fn cancel(&self, rental_uid: Uuid) -> Result<(), CallError> {
        let response = self
            .http
            .delete(format!("{}/api/v1/rental/{}", self.base_url, rental_uid))
            .send()
            .await
            .map_err(CallError::from_transport)?;
        check_status(response).await.map(|_| ())
    }

    pub async fn finish(&self, rental_uid: Uuid) -> Result<(), CallError> {
        let response = self
            .http
            .post(format!(
                "{}/api/v1/rental/{}/finish",
                self.base_url, rental_uid
            ))
            .send()
            .await
            .map_err(CallError::from_transport)?;
        check_status(response).await.map(|_| ())
    }
}
