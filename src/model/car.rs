//! Car shapes owned by the cars service.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Car category, a closed set enforced by the cars service schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CarType {
    Sedan,
    Suv,
    Minivan,
    Roadster,
}

/// A car as returned by the cars service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Car {
    pub car_uid: Uuid,
    pub brand: String,
    pub model: String,
    pub registration_number: String,
    #[serde(default)]
    pub power: Option<i32>,
    pub price: i64,
    #[serde(rename = "type")]
    pub car_type: CarType,
    pub available: bool,
}

/// Abbreviated car info embedded in rental views.
///
/// Fields other than the uid are empty strings when the cars service is
/// unreachable and the car was never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarInfo {
    pub car_uid: Uuid,
    pub brand: String,
    pub model: String,
    pub registration_number: String,
}

impl From<&Car> for CarInfo {
    fn from(car: &Car) -> Self {
        Self {
            car_uid: car.car_uid,
            brand: car.brand.clone(),
            model: car.model.clone(),
            registration_number: car.registration_number.clone(),
        }
    }
}

/// One page of the car listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarPage {
    pub page: u32,
    pub page_size: u32,
    pub total_elements: u64,
    pub items: Vec<Car>,
}
