// 🎯 Matcher - which orders can a courier carry?
//
// Three checks, evaluated in order and short-circuited:
// 1. Weight:  order.weight <= courier lift capacity
// 2. Region:  order.region is one of the courier's regions
// 3. Time:    some delivery window overlaps some working window
//
// The same checks run in reverse after a courier patch: held orders that
// now fail any of them are handed back for dismissal.

use crate::entities::{Courier, Order};
use std::fmt;

/// First check an order failed for a courier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mismatch {
    Overweight,
    OutOfRegion,
    NoOverlap,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Mismatch::Overweight => "weight exceeds lift capacity",
            Mismatch::OutOfRegion => "region not served",
            Mismatch::NoOverlap => "no delivery window overlaps working hours",
        };
        f.write_str(reason)
    }
}

/// True iff any delivery window overlaps any working window
pub fn assignable(order: &Order, courier: &Courier) -> bool {
    order.delivery_hours.iter().any(|delivery| {
        courier
            .working_hours
            .iter()
            .any(|working| delivery.overlaps(working))
    })
}

pub fn check(order: &Order, courier: &Courier) -> Result<(), Mismatch> {
    if order.weight > courier.lift_capacity() {
        return Err(Mismatch::Overweight);
    }
    if !courier.serves_region(order.region) {
        return Err(Mismatch::OutOfRegion);
    }
    if !assignable(order, courier) {
        return Err(Mismatch::NoOverlap);
    }
    Ok(())
}

pub fn eligible(order: &Order, courier: &Courier) -> bool {
    check(order, courier).is_ok()
}

/// First-fit: every eligible candidate, in candidate order
pub fn select_eligible(courier: &Courier, candidates: Vec<Order>) -> Vec<Order> {
    candidates
        .into_iter()
        .filter(|order| eligible(order, courier))
        .collect()
}

/// Held orders the courier can no longer carry
pub fn find_ineligible(courier: &Courier, held: Vec<Order>) -> Vec<Order> {
    held.into_iter()
        .filter(|order| match check(order, courier) {
            Ok(()) => false,
            Err(reason) => {
                tracing::debug!(order_id = order.id, courier_id = courier.id, %reason, "order no longer fits courier");
                true
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::CourierType;
    use crate::temporal::TimePeriod;

    fn hours(raw: &[&str]) -> Vec<TimePeriod> {
        raw.iter().map(|s| TimePeriod::parse(s).unwrap()).collect()
    }

    fn create_test_courier() -> Courier {
        Courier::new(1, CourierType::Foot, vec![1], hours(&["09:00-18:00"]))
    }

    fn ids(orders: &[Order]) -> Vec<i64> {
        orders.iter().map(|o| o.id).collect()
    }

    #[test]
    fn test_inside_working_hours_is_eligible() {
        let order = Order::new(10, 5.0, 1, hours(&["10:00-11:00"]));
        assert!(eligible(&order, &create_test_courier()));
    }

    #[test]
    fn test_outside_working_hours_is_not_eligible() {
        let order = Order::new(10, 5.0, 1, hours(&["19:00-20:00"]));
        assert!(!assignable(&order, &create_test_courier()));
        assert_eq!(check(&order, &create_test_courier()), Err(Mismatch::NoOverlap));
    }

    #[test]
    fn test_overweight_wins_regardless_of_region_and_time() {
        let courier = create_test_courier();
        for order in [
            Order::new(1, 10.5, 1, hours(&["10:00-11:00"])),
            Order::new(2, 10.5, 7, hours(&["10:00-11:00"])),
            Order::new(3, 10.5, 7, hours(&["20:00-21:00"])),
        ] {
            assert!(!eligible(&order, &courier));
            assert_eq!(check(&order, &courier), Err(Mismatch::Overweight));
        }
    }

    #[test]
    fn test_capacity_boundary_is_inclusive() {
        let order = Order::new(1, 10.0, 1, hours(&["10:00-11:00"]));
        assert!(eligible(&order, &create_test_courier()));
    }

    #[test]
    fn test_region_must_be_served() {
        let order = Order::new(1, 1.0, 2, hours(&["10:00-11:00"]));
        assert_eq!(check(&order, &create_test_courier()), Err(Mismatch::OutOfRegion));
    }

    #[test]
    fn test_any_window_pair_suffices() {
        let courier = Courier::new(1, CourierType::Bike, vec![1], hours(&["06:00-07:00", "20:00-22:00"]));
        let order = Order::new(1, 1.0, 1, hours(&["12:00-13:00", "21:30-23:00"]));
        assert!(assignable(&order, &courier));
    }

    #[test]
    fn test_select_eligible_keeps_candidate_order() {
        let candidates = vec![
            Order::new(3, 1.0, 1, hours(&["17:00-19:00"])),
            Order::new(1, 20.0, 1, hours(&["10:00-11:00"])),
            Order::new(2, 1.0, 1, hours(&["08:00-09:30"])),
            Order::new(4, 1.0, 5, hours(&["10:00-11:00"])),
        ];

        let selected = select_eligible(&create_test_courier(), candidates);
        assert_eq!(ids(&selected), vec![3, 2]);
    }

    #[test]
    fn test_find_ineligible_flags_any_failing_check() {
        let courier = create_test_courier();
        let held = vec![
            Order::new(1, 1.0, 1, hours(&["10:00-11:00"])),
            Order::new(2, 12.0, 1, hours(&["10:00-11:00"])),
            Order::new(3, 1.0, 9, hours(&["10:00-11:00"])),
            Order::new(4, 1.0, 1, hours(&["18:00-19:00"])),
        ];

        assert_eq!(ids(&find_ineligible(&courier, held)), vec![2, 3, 4]);
    }
}
