// 🚴 Courier Entity - who can carry what, where, and when
//
// "Courier type is a VALUE (can be patched), courier id is IDENTITY (never changes)"
//
// The type decides two derived numbers:
// - lift capacity (max weight of a single order)
// - earnings coefficient (paid per completed delivery trip)

use crate::temporal::TimePeriod;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// COURIER TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourierType {
    /// Walking courier
    Foot,

    /// Bicycle courier
    Bike,

    /// Car courier
    Auto,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown courier type {0:?} (expected foot, bike or auto)")]
pub struct UnknownCourierType(pub String);

impl CourierType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourierType::Foot => "foot",
            CourierType::Bike => "bike",
            CourierType::Auto => "auto",
        }
    }

    /// Maximum weight (kg) of an order this courier type may carry
    pub fn lift_capacity(&self) -> f64 {
        match self {
            CourierType::Foot => 10.0,
            CourierType::Bike => 15.0,
            CourierType::Auto => 50.0,
        }
    }

    pub fn earnings_coefficient(&self) -> u64 {
        match self {
            CourierType::Foot => 2,
            CourierType::Bike => 5,
            CourierType::Auto => 9,
        }
    }
}

impl FromStr for CourierType {
    type Err = UnknownCourierType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "foot" => Ok(CourierType::Foot),
            "bike" => Ok(CourierType::Bike),
            "auto" => Ok(CourierType::Auto),
            other => Err(UnknownCourierType(other.to_string())),
        }
    }
}

// ============================================================================
// COURIER ENTITY
// ============================================================================

/// Courier as stored and as returned on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Courier {
    #[serde(rename = "courier_id")]
    pub id: i64,

    pub courier_type: CourierType,

    /// Regions the courier works in (non-empty)
    pub regions: Vec<i64>,

    /// Working windows, in the order the client sent them (non-empty)
    pub working_hours: Vec<TimePeriod>,
}

impl Courier {
    pub fn new(
        id: i64,
        courier_type: CourierType,
        regions: Vec<i64>,
        working_hours: Vec<TimePeriod>,
    ) -> Self {
        Courier {
            id,
            courier_type,
            regions,
            working_hours,
        }
    }

    pub fn lift_capacity(&self) -> f64 {
        self.courier_type.lift_capacity()
    }

    pub fn serves_region(&self, region: i64) -> bool {
        self.regions.contains(&region)
    }
}

// ============================================================================
// PARTIAL UPDATE
// ============================================================================

/// Already-validated subset of courier fields from a PATCH request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CourierPatch {
    pub courier_type: Option<CourierType>,
    pub regions: Option<Vec<i64>>,
    pub working_hours: Option<Vec<TimePeriod>>,
}

impl CourierPatch {
    pub fn is_empty(&self) -> bool {
        self.courier_type.is_none() && self.regions.is_none() && self.working_hours.is_none()
    }

    /// Apply the present fields, leaving the others untouched
    pub fn apply(&self, courier: &mut Courier) {
        if let Some(courier_type) = self.courier_type {
            courier.courier_type = courier_type;
        }
        if let Some(regions) = &self.regions {
            courier.regions = regions.clone();
        }
        if let Some(working_hours) = &self.working_hours {
            courier.working_hours = working_hours.clone();
        }
    }
}
