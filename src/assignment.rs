// 📋 Assignment Manager - binds orders to couriers and tracks completion
//
// Every operation is one store call, so a batch either lands whole or not
// at all. Empty batches never reach the store.

use crate::entities::{Courier, Order};
use crate::error::{DispatchError, Result};
use crate::store::EntityStore;
use crate::temporal::{batch_timestamp, serialize_opt_timestamp};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderRef {
    pub id: i64,
}

/// `{"orders": [{"id": ..}], "assign_time": ".."}`; the timestamp key is
/// absent when nothing was assigned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignmentResult {
    pub orders: Vec<OrderRef>,

    #[serde(
        serialize_with = "serialize_opt_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub assign_time: Option<DateTime<Utc>>,
}

impl AssignmentResult {
    pub fn empty() -> Self {
        AssignmentResult {
            orders: Vec::new(),
            assign_time: None,
        }
    }

    pub fn order_ids(&self) -> Vec<i64> {
        self.orders.iter().map(|o| o.id).collect()
    }
}

pub struct AssignmentManager<'s> {
    store: &'s mut dyn EntityStore,
}

impl<'s> AssignmentManager<'s> {
    pub fn new(store: &'s mut dyn EntityStore) -> Self {
        AssignmentManager { store }
    }

    /// Assign the whole batch now, under one shared timestamp
    pub fn assign(&mut self, courier: &Courier, orders: &[Order]) -> Result<AssignmentResult> {
        self.assign_at(courier, orders, batch_timestamp())
    }

    pub fn assign_at(
        &mut self,
        courier: &Courier,
        orders: &[Order],
        assign_time: DateTime<Utc>,
    ) -> Result<AssignmentResult> {
        if orders.is_empty() {
            return Ok(AssignmentResult::empty());
        }

        let ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
        self.store.assign_orders(courier.id, &ids, assign_time)?;

        tracing::info!(courier_id = courier.id, orders = ?ids, "orders assigned");
        Ok(AssignmentResult {
            orders: ids.into_iter().map(|id| OrderRef { id }).collect(),
            assign_time: Some(assign_time),
        })
    }

    /// Return orders to the free pool; returns how many were dismissed
    pub fn dismiss(&mut self, orders: &[Order]) -> Result<usize> {
        if orders.is_empty() {
            return Ok(0);
        }

        let ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
        self.store.dismiss_orders(&ids)?;

        tracing::info!(orders = ?ids, "orders dismissed");
        Ok(ids.len())
    }

    /// Mark an order delivered by `courier_id` at `complete_time`.
    pub fn complete(
        &mut self,
        courier_id: i64,
        order_id: i64,
        complete_time: DateTime<Utc>,
    ) -> Result<i64> {
        let order = self
            .store
            .order_by_id(order_id)?
            .ok_or_else(|| DispatchError::NotFound("Order not found".to_string()))?;
        if self.store.courier_by_id(courier_id)?.is_none() {
            return Err(DispatchError::NotFound("Courier not found".to_string()));
        }

        if order.completed {
            return Err(DispatchError::Conflict("Order already completed".to_string()));
        }
        if !order.is_assigned_to(courier_id) {
            return Err(DispatchError::Conflict(
                "Order not assigned to the given courier".to_string(),
            ));
        }

        self.store.complete_order(order_id, complete_time)?;

        tracing::info!(courier_id, order_id, "order completed");
        Ok(order_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteStore;
    use crate::entities::CourierType;
    use crate::store::recording::RecordingStore;
    use crate::temporal::{parse_timestamp, TimePeriod};

    fn hours(raw: &[&str]) -> Vec<TimePeriod> {
        raw.iter().map(|s| TimePeriod::parse(s).unwrap()).collect()
    }

    fn create_test_store() -> RecordingStore<SqliteStore> {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store
            .insert_couriers(&[
                Courier::new(1, CourierType::Foot, vec![1], hours(&["09:00-18:00"])),
                Courier::new(2, CourierType::Bike, vec![1], hours(&["09:00-18:00"])),
            ])
            .unwrap();
        store
            .insert_orders(&[
                Order::new(10, 5.0, 1, hours(&["10:00-11:00"])),
                Order::new(11, 2.0, 1, hours(&["12:00-13:00"])),
            ])
            .unwrap();
        RecordingStore::new(store)
    }

    fn courier(store: &RecordingStore<SqliteStore>, id: i64) -> Courier {
        store.courier_by_id(id).unwrap().unwrap()
    }

    fn orders(store: &RecordingStore<SqliteStore>) -> Vec<Order> {
        store.free_orders().unwrap()
    }

    #[test]
    fn test_empty_assignment_is_a_no_op() {
        let mut store = create_test_store();
        let courier = courier(&store, 1);

        let result = AssignmentManager::new(&mut store).assign(&courier, &[]).unwrap();

        assert!(result.orders.is_empty());
        assert!(result.assign_time.is_none());
        assert!(store.writes.is_empty());
        assert_eq!(serde_json::to_value(&result).unwrap(), serde_json::json!({"orders": []}));
    }

    #[test]
    fn test_assign_shares_one_timestamp() {
        let mut store = create_test_store();
        let courier = courier(&store, 1);
        let batch = orders(&store);
        let ts = parse_timestamp("2021-01-10T09:32:14.42Z").unwrap();

        let result = AssignmentManager::new(&mut store)
            .assign_at(&courier, &batch, ts)
            .unwrap();

        assert_eq!(result.order_ids(), vec![10, 11]);
        assert_eq!(store.writes, vec!["assign_orders"]);
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            serde_json::json!({
                "orders": [{"id": 10}, {"id": 11}],
                "assign_time": "2021-01-10T09:32:14.42Z"
            })
        );
        for order in store.assigned_orders(1, crate::store::CompletionFilter::Any).unwrap() {
            assert_eq!(order.assign_time, Some(ts));
        }
    }

    #[test]
    fn test_dismiss_empty_and_non_empty() {
        let mut store = create_test_store();
        let courier = courier(&store, 1);
        let batch = orders(&store);

        let mut manager = AssignmentManager::new(&mut store);
        assert_eq!(manager.dismiss(&[]).unwrap(), 0);
        manager.assign(&courier, &batch).unwrap();
        assert_eq!(manager.dismiss(&batch[..1]).unwrap(), 1);

        assert_eq!(store.writes, vec!["assign_orders", "dismiss_orders"]);
        assert!(store.order_by_id(10).unwrap().unwrap().is_free());
    }

    #[test]
    fn test_complete_twice_is_a_conflict() {
        let mut store = create_test_store();
        let courier = courier(&store, 1);
        let batch = orders(&store);
        let first = parse_timestamp("2021-01-10T10:33:01.42Z").unwrap();
        let second = parse_timestamp("2021-01-10T11:00:00.00Z").unwrap();

        let mut manager = AssignmentManager::new(&mut store);
        manager.assign(&courier, &batch).unwrap();
        assert_eq!(manager.complete(1, 10, first).unwrap(), 10);

        let err = manager.complete(1, 10, second).unwrap_err();
        assert!(matches!(err, DispatchError::Conflict(ref m) if m == "Order already completed"));
        assert_eq!(store.order_by_id(10).unwrap().unwrap().complete_time, Some(first));
    }

    #[test]
    fn test_complete_foreign_order() {
        let mut store = create_test_store();
        let courier = courier(&store, 1);
        let batch = orders(&store);
        let ts = parse_timestamp("2021-01-10T10:33:01.42Z").unwrap();

        let mut manager = AssignmentManager::new(&mut store);
        let err = manager.complete(1, 10, ts).unwrap_err();
        assert_eq!(err.to_string(), "Order not assigned to the given courier");

        manager.assign(&courier, &batch).unwrap();
        let err = manager.complete(2, 10, ts).unwrap_err();
        assert_eq!(err.to_string(), "Order not assigned to the given courier");

        assert!(matches!(
            manager.complete(1, 99, ts),
            Err(DispatchError::NotFound(_))
        ));
        assert!(!store.writes.contains(&"complete_order".to_string()));
    }

    #[test]
    fn test_complete_by_unknown_courier() {
        let mut store = create_test_store();
        let courier = courier(&store, 1);
        let batch = orders(&store);
        let ts = parse_timestamp("2021-01-10T10:33:01.42Z").unwrap();

        let mut manager = AssignmentManager::new(&mut store);
        manager.assign(&courier, &batch).unwrap();

        let err = manager.complete(999, 10, ts).unwrap_err();
        assert!(matches!(err, DispatchError::NotFound(ref m) if m == "Courier not found"));

        // Unknown order is reported before the courier lookup
        let err = manager.complete(999, 99, ts).unwrap_err();
        assert!(matches!(err, DispatchError::NotFound(ref m) if m == "Order not found"));

        assert!(!store.order_by_id(10).unwrap().unwrap().completed);
        assert!(!store.writes.contains(&"complete_order".to_string()));
    }
}
