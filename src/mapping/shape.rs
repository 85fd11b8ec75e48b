use crate::convert::value::{DataType, ValueMap};

/// Descriptor for one settable member or constructor parameter: its name and
/// declared type.
#[derive(Debug, Clone)]
pub struct MemberDescriptor {
    pub name: &'static str,
    pub data_type: DataType,
}

impl MemberDescriptor {
    pub fn new(name: &'static str, data_type: DataType) -> Self {
        Self { name, data_type }
    }
}

/// One constructor signature: its parameters in declaration order.
#[derive(Debug, Clone)]
pub struct ConstructorDescriptor {
    pub params: Vec<MemberDescriptor>,
}

/// The capability-set description of a record type, as produced by member
/// introspection: an ordered list of settable members and an ordered list of
/// constructor signatures.
///
/// Shapes come from the [`csv_record!`](crate::csv_record) registration
/// macro, which emits one constructor mirroring the fields, so the
/// single-constructor rule of auto-mapping applies.
#[derive(Debug, Clone)]
pub struct TypeShape {
    pub name: &'static str,
    pub members: Vec<MemberDescriptor>,
    pub constructors: Vec<ConstructorDescriptor>,
}

impl TypeShape {
    pub fn member(&self, name: &str) -> Option<&MemberDescriptor> {
        self.members.iter().find(|m| m.name == name)
    }

    /// The constructor designated for parameter binding. With exactly one
    /// constructor declared, that one; otherwise the index must be chosen
    /// explicitly on the class map.
    pub fn constructor(&self, index: usize) -> Option<&ConstructorDescriptor> {
        self.constructors.get(index)
    }
}

/// A type that can be read from and written to delimited records.
///
/// Implemented by the [`csv_record!`](crate::csv_record) macro; hand-written
/// implementations are possible but rarely needed. `from_values` has
/// constructor semantics: it either builds a complete value or fails; a
/// partially initialized record never escapes.
pub trait CsvRecord: Sized {
    /// The introspected shape of this type.
    fn shape() -> TypeShape;

    /// Constructs an instance from converted member values. The error is a
    /// bare reason; callers add row context.
    fn from_values(values: &mut ValueMap) -> std::result::Result<Self, String>;

    /// Extracts current member values for writing. Never re-invokes any
    /// constructor logic.
    fn to_values(&self) -> ValueMap;
}
