use std::{
    collections::HashSet,
    sync::{PoisonError, RwLock},
};

use crate::model::{Address, SubscribeOutcome};

/// Set of watched addresses shared between the API surface (writer) and the
/// block processor (reader). Entries are never evicted.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    watched: RwLock<HashSet<Address>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the address was not watched before.
    pub fn add(&self, address: &Address) -> bool {
        let mut watched = self
            .watched
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        watched.insert(address.clone())
    }

    pub fn subscribe(&self, address: &Address) -> SubscribeOutcome {
        if self.add(address) {
            SubscribeOutcome::Subscribed
        } else {
            SubscribeOutcome::AlreadySubscribed
        }
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.watched
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(address)
    }

    pub fn len(&self) -> usize {
        self.watched
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
