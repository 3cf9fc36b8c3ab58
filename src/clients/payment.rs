//! Client for the payment service.

use uuid::Uuid;

use crate::clients::{check_status, into_json, CallError};
use crate::model::{CreatePaymentRequest, Payment};

pub struct PaymentClient {
    http: reqwest::Client,
    base_url: String,
}

impl PaymentClient {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn create(&self, request: &CreatePaymentRequest) -> Result<Payment, CallError> {
        let response = self
            .http
            .post(format!("{}/api/v1/payment", self.base_url))
            .json(request)
            .send()
            .await
            .map_err(CallError::from_transport)?;
        into_json(response).await
    }

    pub async fn get(&self, payment_uid: Uuid) -> Result<Payment, CallError> {
        let response = self
            .http
            .get(format!("{}/api/v1/payment/{}", self.base_url, payment_uid))
            .send()
            .await
            .map_err(CallError::from_transport)?;
        into_json(response).await
    }

    pub async fn cancel(&self, payment_uid: Uuid) -> Result<(), CallError> {
        let response = self
            .http
            .delete(format!("{}/api/v1/payment/{}", self.base_url, payment_uid))
            .send()
            .await
            .map_err(CallError::from_transport)?;
        check_status(response).await.map(|_| ())
    }
}
