//! Last-known car catalog entries, kept for degraded reads.

use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use crate::model::Car;
use crate::observability::metrics;

/// A thread-safe cache of cars seen in live responses.
///
/// Entries are never expired: a stale brand or plate number beats an
/// empty placeholder, and the catalog is small enough to hold whole.
#[derive(Clone, Default)]
pub struct CarCache {
    inner: Arc<DashMap<Uuid, Car>>,
}

impl CarCache {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
        }
    }

    pub fn insert(&self, car: Car) {
        self.inner.insert(car.car_uid, car);
        metrics::cache_size(self.inner.len());
    }

    /// Store every car of a listing page.
    pub fn insert_all<'a>(&self, cars: impl IntoIterator<Item = &'a Car>) {
        for car in cars {
            self.inner.insert(car.car_uid, car.clone());
        }
        metrics::cache_size(self.inner.len());
    }

    pub fn get(&self, car_uid: Uuid) -> Option<Car> {
        self.inner.get(&car_uid).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// All cached cars in a stable order, for the manage endpoint.
    pub fn snapshot(&self) -> Vec<Car> {
        let mut cars: Vec<Car> = self
            .inner
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        cars.sort_by_key(|car| car.car_uid);
        cars
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CarType;

    fn car(uid: Uuid, brand: &str) -> Car {
        Car {
            car_uid: uid,
            brand: brand.into(),
            model: "M5".into(),
            registration_number: "A111AA".into(),
            power: Some(600),
            price: 500,
            car_type: CarType::Sedan,
            available: true,
        }
    }

    #[test]
    fn insert_replaces_existing_entry() {
        let cache = CarCache::new();
        let uid = Uuid::new_v4();
        cache.insert(car(uid, "BMW"));
        cache.insert(car(uid, "Audi"));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(uid).unwrap().brand, "Audi");
    }

    #[test]
    fn snapshot_is_ordered_by_uid() {
        let cache = CarCache::new();
        let mut uids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        for uid in &uids {
            cache.insert(car(*uid, "BMW"));
        }
        uids.sort();

        let snapshot: Vec<Uuid> = cache.snapshot().iter().map(|c| c.car_uid).collect();
        assert_eq!(snapshot, uids);
    }

    #[test]
    fn miss_returns_none() {
        assert!(CarCache::new().get(Uuid::new_v4()).is_none());
    }
}
