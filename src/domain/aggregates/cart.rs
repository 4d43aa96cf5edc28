//! Cart Aggregate

use chrono::{DateTime, Utc};
use uuid::Uuid;
use crate::checkout::CheckoutItem;
use crate::domain::value_objects::Money;

/// Client-held selection of bundles, keyed by a browser session until
/// checkout turns it into an order.
#[derive(Clone, Debug)]
pub struct Cart {
    session_id: String,
    items: Vec<CartItem>,
    subtotal: Money,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct CartItem {
    pub bundle_id: Uuid,
    pub store_id: Uuid,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl CartItem {
    pub fn line_total(&self) -> Money { self.unit_price.multiply(self.quantity) }
}

impl Cart {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(), items: vec![], subtotal: Money::ZERO,
            created_at: Utc::now(), updated_at: Utc::now(),
        }
    }

    pub fn session_id(&self) -> &str { &self.session_id }
    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn subtotal(&self) -> Money { self.subtotal }
    pub fn item_count(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn add_item(&mut self, item: CartItem) {
        if let Some(existing) = self.items.iter_mut().find(|i| i.bundle_id == item.bundle_id) {
            existing.quantity += item.quantity;
        } else {
            self.items.push(item);
        }
        self.recalculate();
    }

    pub fn update_quantity(&mut self, bundle_id: Uuid, quantity: u32) -> Result<(), CartError> {
        let item = self.items.iter_mut().find(|i| i.bundle_id == bundle_id).ok_or(CartError::ItemNotFound)?;
        if quantity == 0 { self.items.retain(|i| i.bundle_id != bundle_id); }
        else { item.quantity = quantity; }
        self.recalculate();
        Ok(())
    }

    pub fn remove_item(&mut self, bundle_id: Uuid) -> Result<(), CartError> {
        let before = self.items.len();
        self.items.retain(|i| i.bundle_id != bundle_id);
        if self.items.len() == before { return Err(CartError::ItemNotFound); }
        self.recalculate();
        Ok(())
    }

    pub fn clear(&mut self) { self.items.clear(); self.recalculate(); }

    /// Lines in cart order, ready for the order total calculator.
    pub fn checkout_items(&self) -> Vec<CheckoutItem> {
        self.items
            .iter()
            .map(|i| CheckoutItem { bundle_id: i.bundle_id, quantity: i.quantity, unit_price: i.unit_price })
            .collect()
    }

    fn recalculate(&mut self) {
        self.subtotal = self.items.iter().fold(Money::ZERO, |acc, i| acc.add(&i.line_total()));
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone)] pub enum CartError { ItemNotFound }
impl std::error::Error for CartError {}
impl std::fmt::Display for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "Item not found") }
}
