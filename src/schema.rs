// 📐 Shape Layer - Record Validation
// Validates raw courier/order JSON records before they become entities

use crate::entities::{Courier, CourierPatch, CourierType, Order};
use crate::temporal::TimePeriod;
use serde_json::{Map, Value};

/// Inclusive weight bounds (kg)
pub const MIN_WEIGHT: f64 = 0.01;
pub const MAX_WEIGHT: f64 = 50.0;

// ============================================================================
// VALIDATION RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub context: String,
}

impl ValidationError {
    fn new(context: &str, field: &str, message: impl Into<String>) -> Self {
        ValidationError {
            field: field.to_string(),
            message: message.into(),
            context: context.to_string(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.context, self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult<T> = Result<T, Vec<ValidationError>>;

/// Outcome of validating a batch: constructed entities and rejected ids.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome<T> {
    pub valid: Vec<T>,
    /// `None` when the record's own id was missing or malformed
    pub invalid: Vec<Option<i64>>,
}

impl<T> BatchOutcome<T> {
    pub fn is_clean(&self) -> bool {
        self.invalid.is_empty()
    }
}

// ============================================================================
// SINGLE RECORDS
// ============================================================================

const COURIER: &str = "Courier";
const ORDER: &str = "Order";
const PATCH: &str = "CourierPatch";

/// Validate one courier record. Every failing field is reported.
pub fn validate_courier(record: &Value) -> ValidationResult<Courier> {
    let fields = as_object(record, COURIER)?;
    let mut errors = Vec::new();

    let id = collect(&mut errors, positive_id(fields, "courier_id", COURIER));
    let courier_type = collect(&mut errors, courier_type(fields, COURIER));
    let regions = collect(&mut errors, regions(fields, COURIER));
    let working_hours = collect(&mut errors, hours(fields, "working_hours", COURIER));

    match (id, courier_type, regions, working_hours) {
        (Some(id), Some(courier_type), Some(regions), Some(working_hours)) if errors.is_empty() => {
            Ok(Courier::new(id, courier_type, regions, working_hours))
        }
        _ => Err(errors),
    }
}

/// Validate one order record. Every failing field is reported.
pub fn validate_order(record: &Value) -> ValidationResult<Order> {
    let fields = as_object(record, ORDER)?;
    let mut errors = Vec::new();

    let id = collect(&mut errors, positive_id(fields, "order_id", ORDER));
    let weight = collect(&mut errors, weight(fields));
    let region = collect(&mut errors, positive_id(fields, "region", ORDER));
    let delivery_hours = collect(&mut errors, hours(fields, "delivery_hours", ORDER));

    match (id, weight, region, delivery_hours) {
        (Some(id), Some(weight), Some(region), Some(delivery_hours)) if errors.is_empty() => {
            Ok(Order::new(id, weight, region, delivery_hours))
        }
        _ => Err(errors),
    }
}

/// Validate a partial courier update.
///
/// Only the fields present are checked; an unknown field or an empty patch
/// rejects the whole operation.
pub fn validate_courier_patch(payload: &Value) -> ValidationResult<CourierPatch> {
    let fields = as_object(payload, PATCH)?;
    let mut errors = Vec::new();
    let mut patch = CourierPatch::default();

    for key in fields.keys() {
        match key.as_str() {
            "courier_type" => patch.courier_type = collect(&mut errors, courier_type(fields, PATCH)),
            "regions" => patch.regions = collect(&mut errors, regions(fields, PATCH)),
            "working_hours" => {
                patch.working_hours = collect(&mut errors, hours(fields, "working_hours", PATCH))
            }
            unknown => errors.push(ValidationError::new(PATCH, unknown, "Unknown field")),
        }
    }

    if fields.is_empty() {
        errors.push(ValidationError::new(PATCH, "*", "Patch has no fields"));
    }

    if errors.is_empty() {
        Ok(patch)
    } else {
        Err(errors)
    }
}

// ============================================================================
// BATCHES
// ============================================================================

/// Validate every record independently with `validate_one`.
///
/// Rejected records contribute their `id_field` value (if it is a usable id)
/// to `invalid`; accepted ones keep their input order in `valid`.
pub fn validate_batch<T, F>(records: &[Value], id_field: &str, validate_one: F) -> BatchOutcome<T>
where
    F: Fn(&Value) -> ValidationResult<T>,
{
    let mut outcome = BatchOutcome {
        valid: Vec::with_capacity(records.len()),
        invalid: Vec::new(),
    };

    for record in records {
        match validate_one(record) {
            Ok(entity) => outcome.valid.push(entity),
            Err(errors) => {
                let id = record_id(record, id_field);
                for error in &errors {
                    tracing::debug!(?id, %error, "record rejected");
                }
                outcome.invalid.push(id);
            }
        }
    }

    outcome
}

/// The record's id if it is a positive integer, regardless of other fields
pub fn record_id(record: &Value, id_field: &str) -> Option<i64> {
    record
        .get(id_field)
        .and_then(Value::as_i64)
        .filter(|id| *id > 0)
}

// ============================================================================
// FIELD CHECKS
// ============================================================================

fn collect<T>(errors: &mut Vec<ValidationError>, result: Result<T, ValidationError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            errors.push(error);
            None
        }
    }
}

fn as_object<'a>(record: &'a Value, context: &str) -> ValidationResult<&'a Map<String, Value>> {
    record
        .as_object()
        .ok_or_else(|| vec![ValidationError::new(context, "*", "Record must be a JSON object")])
}

/// Present and not `null`
fn required<'a>(
    fields: &'a Map<String, Value>,
    field: &str,
    context: &str,
) -> Result<&'a Value, ValidationError> {
    match fields.get(field) {
        None | Some(Value::Null) => Err(ValidationError::new(context, field, "Required field is missing")),
        Some(value) => Ok(value),
    }
}

fn positive_id(
    fields: &Map<String, Value>,
    field: &str,
    context: &str,
) -> Result<i64, ValidationError> {
    let value = required(fields, field, context)?;
    match value.as_i64() {
        Some(id) if id > 0 => Ok(id),
        _ => Err(ValidationError::new(
            context,
            field,
            format!("Must be a positive integer, got {}", value),
        )),
    }
}

fn courier_type(fields: &Map<String, Value>, context: &str) -> Result<CourierType, ValidationError> {
    let value = required(fields, "courier_type", context)?;
    value
        .as_str()
        .ok_or_else(|| ValidationError::new(context, "courier_type", "Must be a string"))?
        .parse::<CourierType>()
        .map_err(|e| ValidationError::new(context, "courier_type", e.to_string()))
}

fn regions(fields: &Map<String, Value>, context: &str) -> Result<Vec<i64>, ValidationError> {
    let items = non_empty_array(fields, "regions", context)?;
    items
        .iter()
        .map(|item| match item.as_i64() {
            Some(region) if region > 0 => Ok(region),
            _ => Err(ValidationError::new(
                context,
                "regions",
                format!("Every region must be a positive integer, got {}", item),
            )),
        })
        .collect()
}

fn hours(
    fields: &Map<String, Value>,
    field: &str,
    context: &str,
) -> Result<Vec<TimePeriod>, ValidationError> {
    let items = non_empty_array(fields, field, context)?;
    items
        .iter()
        .map(|item| {
            let raw = item
                .as_str()
                .ok_or_else(|| ValidationError::new(context, field, "Every window must be a string"))?;
            TimePeriod::parse(raw).map_err(|e| ValidationError::new(context, field, e.to_string()))
        })
        .collect()
}

fn weight(fields: &Map<String, Value>) -> Result<f64, ValidationError> {
    let value = required(fields, "weight", ORDER)?;
    let weight = value
        .as_f64()
        .ok_or_else(|| ValidationError::new(ORDER, "weight", "Must be a number"))?;

    if (MIN_WEIGHT..=MAX_WEIGHT).contains(&weight) {
        Ok(weight)
    } else {
        Err(ValidationError::new(
            ORDER,
            "weight",
            format!("Must be between {} and {}, got {}", MIN_WEIGHT, MAX_WEIGHT, weight),
        ))
    }
}

fn non_empty_array<'a>(
    fields: &'a Map<String, Value>,
    field: &str,
    context: &str,
) -> Result<&'a Vec<Value>, ValidationError> {
    let items = required(fields, field, context)?
        .as_array()
        .ok_or_else(|| ValidationError::new(context, field, "Must be a list"))?;

    if items.is_empty() {
        return Err(ValidationError::new(context, field, "Must not be empty"));
    }
    Ok(items)
}

// ============================================================================
// TESTS
// ============================================================================
