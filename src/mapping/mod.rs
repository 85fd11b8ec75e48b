//! Binding between record types and source columns.
//!
//! A [`ClassMap`] describes, for one target type, how every settable member
//! and constructor parameter binds to columns: by name, by index, by
//! collection range or suffix pattern, as a constant, or not at all. Maps
//! are auto-derived from a type's introspected [`TypeShape`] and customized
//! through [`ClassMapBuilder`]; they are immutable after `build()` and
//! shared read-only across every row of a stream.

pub mod auto;
pub(crate) mod bind;
pub mod class_map;
mod macros;
pub mod shape;

pub use class_map::{ClassMap, ClassMapBuilder, MemberMap, ParameterMap};
pub use shape::{ConstructorDescriptor, CsvRecord, MemberDescriptor, TypeShape};
