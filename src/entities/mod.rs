// Entity Models - couriers and the orders they carry
//
// Each entity has:
// - Stable integer identity chosen by the client, never reassigned
// - Values validated on the way in (see schema.rs)
// - Derived data (capacity, rating, earnings) computed, never stored

pub mod courier;
pub mod order;

pub use courier::{Courier, CourierPatch, CourierType, UnknownCourierType};
pub use order::Order;

/// Anything carrying a client-supplied integer id.
pub trait Identified {
    fn id(&self) -> i64;
}

impl Identified for Courier {
    fn id(&self) -> i64 {
        self.id
    }
}

impl Identified for Order {
    fn id(&self) -> i64 {
        self.id
    }
}

/// The two imported entity kinds; the name doubles as the wire key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Couriers,
    Orders,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Couriers => "couriers",
            EntityKind::Orders => "orders",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
