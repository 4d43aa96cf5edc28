//! Bundle Aggregate

use chrono::{DateTime, Utc};
use uuid::Uuid;
use crate::domain::value_objects::Money;
use crate::domain::events::{DomainEvent, BundleEvent};

/// A priced, sellable product grouping offered by a single store.
#[derive(Clone, Debug)]
pub struct Bundle {
    id: Uuid,
    store_id: Uuid,
    name: String,
    description: String,
    price: Money,
    status: BundleStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    events: Vec<DomainEvent>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)] pub enum BundleStatus { #[default] Draft, Active, Archived }

impl BundleStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Draft => "draft", Self::Active => "active", Self::Archived => "archived" }
    }
}

impl Bundle {
    pub fn create(store_id: Uuid, name: impl Into<String>, price: Money) -> Self {
        let id = Uuid::now_v7();
        let now = Utc::now();
        let mut bundle = Self {
            id, store_id, name: name.into(), description: String::new(),
            price, status: BundleStatus::Draft, created_at: now, updated_at: now, events: vec![],
        };
        bundle.raise_event(DomainEvent::Bundle(BundleEvent::Created { bundle_id: id, store_id }));
        bundle
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn store_id(&self) -> Uuid { self.store_id }
    pub fn name(&self) -> &str { &self.name }
    pub fn description(&self) -> &str { &self.description }
    pub fn price(&self) -> Money { self.price }
    pub fn status(&self) -> BundleStatus { self.status }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }
    pub fn is_orderable(&self) -> bool { self.status == BundleStatus::Active }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
        self.touch();
    }

    /// Only a named, non-negatively priced bundle may go on sale.
    pub fn publish(&mut self) -> Result<(), BundleError> {
        if self.name.trim().is_empty() { return Err(BundleError::MissingName); }
        if self.price.is_negative() { return Err(BundleError::NegativePrice); }
        self.status = BundleStatus::Active;
        self.touch();
        self.raise_event(DomainEvent::Bundle(BundleEvent::Published { bundle_id: self.id, store_id: self.store_id }));
        Ok(())
    }

    pub fn archive(&mut self) {
        self.status = BundleStatus::Archived;
        self.touch();
        self.raise_event(DomainEvent::Bundle(BundleEvent::Archived { bundle_id: self.id, store_id: self.store_id }));
    }

    pub fn update_price(&mut self, new_price: Money) -> Result<(), BundleError> {
        if new_price.is_negative() { return Err(BundleError::NegativePrice); }
        self.price = new_price;
        self.touch();
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone)] pub enum BundleError { MissingName, NegativePrice }
impl std::error::Error for BundleError {}
impl std::fmt::Display for BundleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self { Self::MissingName => write!(f, "Missing name"), Self::NegativePrice => write!(f, "Negative price") }
    }
}
