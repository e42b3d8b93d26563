//! Domain layer: catalog value objects and the inventory aggregate
pub mod aggregates;
pub mod value_objects;
