//! Entity store capability.
//!
//! The engine never owns persistence: callers open a store at start-up and
//! pass it in. Every write below is expected to be atomic per call (one
//! transaction per batch); a failed write is fatal for the request.

use crate::entities::{Courier, CourierPatch, Order};
use anyhow::Result;
use chrono::{DateTime, Utc};

/// Which of a courier's linked orders to load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionFilter {
    Any,
    Completed,
    Incomplete,
}

pub trait EntityStore {
    fn courier_by_id(&self, id: i64) -> Result<Option<Courier>>;

    fn order_by_id(&self, id: i64) -> Result<Option<Order>>;

    fn courier_ids(&self) -> Result<Vec<i64>>;

    fn order_ids(&self) -> Result<Vec<i64>>;

    /// Orders not bound to any courier, in id order
    fn free_orders(&self) -> Result<Vec<Order>>;

    fn assigned_orders(&self, courier_id: i64, filter: CompletionFilter) -> Result<Vec<Order>>;

    fn insert_couriers(&mut self, couriers: &[Courier]) -> Result<()>;

    fn insert_orders(&mut self, orders: &[Order]) -> Result<()>;

    fn update_courier(&mut self, id: i64, patch: &CourierPatch) -> Result<()>;

    /// Bind every order to the courier with one shared timestamp.
    /// Fails (and writes nothing) if any order is no longer free.
    fn assign_orders(
        &mut self,
        courier_id: i64,
        order_ids: &[i64],
        assign_time: DateTime<Utc>,
    ) -> Result<()>;

    /// Return orders to the free pool
    fn dismiss_orders(&mut self, order_ids: &[i64]) -> Result<()>;

    /// Mark an order completed. Fails if it already is.
    fn complete_order(&mut self, order_id: i64, complete_time: DateTime<Utc>) -> Result<()>;
}
