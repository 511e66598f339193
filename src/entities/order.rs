// 📦 Order Entity - a parcel with a weight, a region and delivery windows
//
// Lifecycle (never leaves `completed`):
//
//   free ──assign──▶ assigned ──complete──▶ completed
//     ▲                 │
//     └────dismiss──────┘

use crate::temporal::TimePeriod;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: i64,

    /// Weight in kg, within [0.01, 50]
    pub weight: f64,

    pub region: i64,

    /// Windows in which the order may be delivered (non-empty)
    pub delivery_hours: Vec<TimePeriod>,

    // ========================================================================
    // LIFECYCLE (written only by assignment.rs)
    // ========================================================================
    /// Courier currently holding the order
    pub courier_id: Option<i64>,

    pub assigned: bool,

    pub completed: bool,

    /// Shared by every order of one assignment batch
    pub assign_time: Option<DateTime<Utc>>,

    pub complete_time: Option<DateTime<Utc>>,
}

impl Order {
    /// Create a free order, as it looks right after import
    pub fn new(id: i64, weight: f64, region: i64, delivery_hours: Vec<TimePeriod>) -> Self {
        Order {
            id,
            weight,
            region,
            delivery_hours,
            courier_id: None,
            assigned: false,
            completed: false,
            assign_time: None,
            complete_time: None,
        }
    }

    pub fn is_free(&self) -> bool {
        !self.assigned && !self.completed
    }

    pub fn is_assigned_to(&self, courier_id: i64) -> bool {
        self.assigned && self.courier_id == Some(courier_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_order_is_free() {
        let order = Order::new(1, 0.23, 12, vec![TimePeriod::parse("09:00-18:00").unwrap()]);

        assert!(order.is_free());
        assert!(!order.is_assigned_to(1));
        assert!(order.assign_time.is_none());
        assert!(order.complete_time.is_none());
    }

    #[test]
    fn test_is_assigned_to_checks_courier() {
        let mut order = Order::new(1, 0.23, 12, vec![TimePeriod::parse("09:00-18:00").unwrap()]);
        order.assigned = true;
        order.courier_id = Some(7);

        assert!(!order.is_free());
        assert!(order.is_assigned_to(7));
        assert!(!order.is_assigned_to(8));
    }
}
