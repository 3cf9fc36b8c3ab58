//! Client for the cars service.

use uuid::Uuid;

use crate::clients::{check_status, into_json, CallError};
use crate::model::{Car, CarPage};

pub struct CarsClient {
    http: reqwest::Client,
    base_url: String,
}

impl CarsClient {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn list(&self, page: u32, size: u32, show_all: bool) -> Result<CarPage, CallError> {
        let response = self
            .http
            .get(format!("{}/api/v1/cars", self.base_url))
            .query(&[
                ("page", page.to_string()),
                ("size", size.to_string()),
                ("showAll", show_all.to_string()),
            ])
            .send()
            .await
            .map_err(CallError::from_transport)?;
        into_json(response).await
    }

    pub async fn get(&self, car_uid: Uuid) -> Result<Car, CallError> {
        let response = self
            .http
            .get(format!("{}/api/v1/cars/{}", self.base_url, car_uid))
            .send()
            .await
            .map_err(CallError::from_transport)?;
        into_json(response).await
    }

    /// Flip the availability flag. Idempotent: the backend stores the
    /// absolute value, so replays are safe.
    pub async fn set_availability(&self, car_uid: Uuid, available: bool) -> Result<(), CallError> {
        let response = self
            .http
            .patch(format!(
                "{}/api/v1/cars/{}/availability",
                self.base_url, car_uid
            ))
            .query(&[("available", available.to_string())])
            .send()
            .await
            .map_err(CallError::from_transport)?;
        check_status(response).await.map(|_| ())
    }
}
