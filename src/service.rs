//! Request orchestration, independent of any transport.
//!
//! Each method is one logical operation (import batch, patch, assign,
//! complete, info) run against the injected store. The HTTP shell and the
//! CLI only translate payloads in and results out.

use crate::assignment::{AssignmentManager, AssignmentResult};
use crate::deduplication::DeduplicationEngine;
use crate::entities::{Courier, EntityKind, Identified};
use crate::error::{DispatchError, Result};
use crate::matching;
use crate::metrics::{self, CourierInfo};
use crate::schema::{self, ValidationResult};
use crate::store::{CompletionFilter, EntityStore};
use crate::temporal::parse_timestamp;
use serde::Deserialize;
use serde_json::Value;

/// Body of a completion request; every field is required.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompleteRequest {
    pub courier_id: Option<i64>,
    pub order_id: Option<i64>,
    pub complete_time: Option<String>,
}

pub struct DispatchService<'s> {
    store: &'s mut dyn EntityStore,
}

impl<'s> DispatchService<'s> {
    pub fn new(store: &'s mut dyn EntityStore) -> Self {
        DispatchService { store }
    }

    // ========================================================================
    // IMPORT
    // ========================================================================

    /// Validate, de-duplicate and insert a courier batch. All or nothing.
    pub fn import_couriers(&mut self, records: &[Value]) -> Result<Vec<i64>> {
        let existing = self.store.courier_ids()?;
        let accepted = check_batch(
            EntityKind::Couriers,
            records,
            "courier_id",
            schema::validate_courier,
            existing,
        )?;

        self.store.insert_couriers(&accepted)?;
        Ok(accepted.iter().map(Identified::id).collect())
    }

    /// Validate, de-duplicate and insert an order batch. All or nothing.
    pub fn import_orders(&mut self, records: &[Value]) -> Result<Vec<i64>> {
        let existing = self.store.order_ids()?;
        let accepted = check_batch(
            EntityKind::Orders,
            records,
            "order_id",
            schema::validate_order,
            existing,
        )?;

        self.store.insert_orders(&accepted)?;
        Ok(accepted.iter().map(Identified::id).collect())
    }

    // ========================================================================
    // COURIERS
    // ========================================================================

    /// Apply a partial update, then dismiss held orders the courier can no
    /// longer carry. Returns the updated courier.
    pub fn patch_courier(&mut self, courier_id: i64, payload: &Value) -> Result<Courier> {
        let mut courier = self
            .store
            .courier_by_id(courier_id)?
            .ok_or(DispatchError::PatchRejected { id: courier_id })?;

        let patch = schema::validate_courier_patch(payload).map_err(|errors| {
            for error in &errors {
                tracing::warn!(courier_id, %error, "patch field rejected");
            }
            DispatchError::PatchRejected { id: courier_id }
        })?;

        self.store.update_courier(courier_id, &patch)?;
        patch.apply(&mut courier);

        let held = self
            .store
            .assigned_orders(courier_id, CompletionFilter::Incomplete)?;
        let unfit = matching::find_ineligible(&courier, held);
        AssignmentManager::new(&mut *self.store).dismiss(&unfit)?;

        Ok(courier)
    }

    pub fn courier_info(&self, courier_id: i64) -> Result<CourierInfo> {
        let courier = self
            .store
            .courier_by_id(courier_id)?
            .ok_or_else(|| DispatchError::NotFound("Courier not found".to_string()))?;

        let completed = self
            .store
            .assigned_orders(courier_id, CompletionFilter::Completed)?;
        let metrics = metrics::compute(&courier, &completed);

        Ok(CourierInfo::new(courier, metrics))
    }

    // ========================================================================
    // ORDERS
    // ========================================================================

    /// First-fit: assign every free order the courier is eligible for.
    pub fn assign_orders(&mut self, courier_id: i64) -> Result<AssignmentResult> {
        let courier = self
            .store
            .courier_by_id(courier_id)?
            .ok_or_else(|| DispatchError::NotFound("Courier not found".to_string()))?;

        let selected = matching::select_eligible(&courier, self.store.free_orders()?);
        AssignmentManager::new(&mut *self.store).assign(&courier, &selected)
    }

    pub fn complete_order(&mut self, request: &CompleteRequest) -> Result<i64> {
        let (Some(courier_id), Some(order_id), Some(raw_time)) = (
            request.courier_id,
            request.order_id,
            request.complete_time.as_deref(),
        ) else {
            return Err(DispatchError::InvalidRequest(
                "courier_id, order_id and complete_time are required".to_string(),
            ));
        };

        let complete_time = parse_timestamp(raw_time).map_err(|e| {
            DispatchError::InvalidRequest(format!("Invalid complete_time {:?}: {}", raw_time, e))
        })?;

        AssignmentManager::new(&mut *self.store).complete(courier_id, order_id, complete_time)
    }
}

/// Field validation followed by de-duplication; any rejection fails the batch.
fn check_batch<T, F>(
    entity: EntityKind,
    records: &[Value],
    id_field: &str,
    validate_one: F,
    existing: Vec<i64>,
) -> Result<Vec<T>>
where
    T: Identified,
    F: Fn(&Value) -> ValidationResult<T>,
{
    let outcome = schema::validate_batch(records, id_field, validate_one);
    let partition = DeduplicationEngine::new(existing).partition(outcome.valid);

    let mut invalid = outcome.invalid;
    invalid.extend(partition.duplicates.iter().copied().map(Some));

    if !invalid.is_empty() {
        tracing::warn!(%entity, ?invalid, "import batch rejected");
        return Err(DispatchError::Validation { entity, invalid });
    }

    Ok(partition.accepted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteStore;
    use crate::store::recording::RecordingStore;
    use serde_json::json;

    fn courier_record(id: i64, hours: &str) -> Value {
        json!({
            "courier_id": id,
            "courier_type": "foot",
            "regions": [1],
            "working_hours": [hours]
        })
    }

    fn order_record(id: i64, weight: f64, hours: &str) -> Value {
        json!({
            "order_id": id,
            "weight": weight,
            "region": 1,
            "delivery_hours": [hours]
        })
    }

    fn create_test_store() -> SqliteStore {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut service = DispatchService::new(&mut store);
        service
            .import_couriers(&[courier_record(1, "09:00-18:00")])
            .unwrap();
        store
    }

    #[test]
    fn test_import_returns_ids_in_order() {
        let mut store = create_test_store();
        let mut service = DispatchService::new(&mut store);

        let ids = service
            .import_orders(&[order_record(3, 1.0, "10:00-11:00"), order_record(1, 2.0, "10:00-11:00")])
            .unwrap();

        assert_eq!(ids, vec![3, 1]);
    }

    #[test]
    fn test_import_with_existing_id_rejects_whole_batch() {
        let mut store = create_test_store();
        let mut service = DispatchService::new(&mut store);

        let err = service
            .import_couriers(&[courier_record(2, "09:00-18:00"), courier_record(1, "10:00-12:00")])
            .unwrap_err();

        match err {
            DispatchError::Validation { entity, invalid } => {
                assert_eq!(entity, EntityKind::Couriers);
                assert_eq!(invalid, vec![Some(1)]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(store.courier_ids().unwrap(), vec![1]);
    }

    #[test]
    fn test_import_reports_field_and_duplicate_failures_together() {
        let mut store = create_test_store();
        let mut service = DispatchService::new(&mut store);
        service.import_orders(&[order_record(1, 1.0, "10:00-11:00")]).unwrap();

        let err = service
            .import_orders(&[
                order_record(2, 1.0, "10:00-11:00"),
                order_record(3, 70.0, "10:00-11:00"),
                order_record(1, 1.0, "10:00-11:00"),
                json!({"weight": 1.0}),
            ])
            .unwrap_err();

        assert!(matches!(
            err,
            DispatchError::Validation { ref invalid, .. } if *invalid == vec![Some(3), None, Some(1)]
        ));
        assert_eq!(store.order_ids().unwrap(), vec![1]);
    }

    #[test]
    fn test_assign_inside_and_outside_working_hours() {
        let mut store = create_test_store();
        let mut service = DispatchService::new(&mut store);
        service
            .import_orders(&[order_record(10, 5.0, "10:00-11:00"), order_record(11, 5.0, "19:00-20:00")])
            .unwrap();

        let first = service.assign_orders(1).unwrap();
        assert_eq!(first.order_ids(), vec![10]);
        assert!(first.assign_time.is_some());

        let second = service.assign_orders(1).unwrap();
        assert!(second.orders.is_empty());
        assert_eq!(serde_json::to_value(&second).unwrap(), json!({"orders": []}));
    }

    #[test]
    fn test_assign_unknown_courier() {
        let mut store = create_test_store();
        let err = DispatchService::new(&mut store).assign_orders(404).unwrap_err();
        assert!(matches!(err, DispatchError::NotFound(_)));
    }

    #[test]
    fn test_patch_dismisses_orders_that_no_longer_fit() {
        let mut store = create_test_store();
        let mut service = DispatchService::new(&mut store);
        service
            .import_orders(&[order_record(10, 5.0, "10:00-11:00"), order_record(11, 9.0, "16:00-17:00")])
            .unwrap();
        service.assign_orders(1).unwrap();

        let courier = service
            .patch_courier(1, &json!({"working_hours": ["15:00-18:00"]}))
            .unwrap();

        assert_eq!(courier.working_hours[0].to_string(), "15:00-18:00");
        assert!(store.order_by_id(10).unwrap().unwrap().is_free());
        assert!(store.order_by_id(11).unwrap().unwrap().is_assigned_to(1));
    }

    #[test]
    fn test_patch_writes_update_before_dismissal() {
        let mut store = RecordingStore::new(create_test_store());
        let mut service = DispatchService::new(&mut store);
        service
            .import_orders(&[order_record(10, 5.0, "10:00-11:00")])
            .unwrap();
        service.assign_orders(1).unwrap();

        service.patch_courier(1, &json!({"regions": [1, 2]})).unwrap();
        service.patch_courier(1, &json!({"regions": [2]})).unwrap();

        assert_eq!(
            store.writes,
            vec![
                "insert_orders",
                "assign_orders",
                "update_courier",
                "update_courier",
                "dismiss_orders"
            ]
        );
        assert!(store.order_by_id(10).unwrap().unwrap().is_free());
    }

    #[test]
    fn test_patch_rejections() {
        let mut store = create_test_store();
        let mut service = DispatchService::new(&mut store);

        assert!(matches!(
            service.patch_courier(1, &json!({"name": "Bob"})),
            Err(DispatchError::PatchRejected { id: 1 })
        ));
        assert!(matches!(
            service.patch_courier(7, &json!({"regions": [1]})),
            Err(DispatchError::PatchRejected { id: 7 })
        ));
    }

    #[test]
    fn test_complete_then_courier_info() {
        let mut store = create_test_store();
        let mut service = DispatchService::new(&mut store);
        service.import_orders(&[order_record(10, 5.0, "10:00-11:00")]).unwrap();
        let assigned = service.assign_orders(1).unwrap();
        let assign_time = assigned.assign_time.unwrap();

        let info = service.courier_info(1).unwrap();
        assert_eq!(info.rating, None);
        assert_eq!(info.earnings, 0);

        let request = CompleteRequest {
            courier_id: Some(1),
            order_id: Some(10),
            complete_time: Some(crate::temporal::format_timestamp(&assign_time)),
        };
        assert_eq!(service.complete_order(&request).unwrap(), 10);

        let info = service.courier_info(1).unwrap();
        assert_eq!(info.rating, Some(5.0));
        assert_eq!(info.earnings, 1000);
    }

    #[test]
    fn test_complete_requires_every_field() {
        let mut store = create_test_store();
        let mut service = DispatchService::new(&mut store);

        let request = CompleteRequest {
            courier_id: Some(1),
            order_id: Some(10),
            complete_time: None,
        };
        assert!(matches!(
            service.complete_order(&request),
            Err(DispatchError::InvalidRequest(_))
        ));

        let request = CompleteRequest {
            complete_time: Some("yesterday".to_string()),
            ..request
        };
        assert!(matches!(
            service.complete_order(&request),
            Err(DispatchError::InvalidRequest(_))
        ));
    }
}
