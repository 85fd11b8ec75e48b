use crate::mapping::class_map::{ClassMap, MemberMap, ParameterMap};
use crate::mapping::shape::TypeShape;

/// Derives a [`ClassMap`] from a type's introspected shape.
///
/// Every settable member gets a member map whose single candidate name is
/// the member's own name; the first declared constructor contributes a
/// parameter map per parameter the same way. Members of nested record type
/// are recursively auto-mapped; their candidate names are prefixed with the
/// parent member name at bind time, so a rename of the parent binding
/// renames the whole group.
pub(crate) fn auto_map_shape(shape: &TypeShape) -> ClassMap {
    let member_maps = shape
        .members
        .iter()
        .map(|member| {
            let nested = member
                .data_type
                .as_nested()
                .map(|nested| auto_map_shape(&(nested.shape)()));
            MemberMap::from_descriptor(member, nested)
        })
        .collect();

    let parameter_maps = shape
        .constructors
        .first()
        .map(|constructor| {
            constructor
                .params
                .iter()
                .map(ParameterMap::from_descriptor)
                .collect()
        })
        .unwrap_or_default();

    ClassMap {
        type_name: shape.name,
        member_maps,
        parameter_maps,
        use_constructor: false,
        options: Default::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_record;
    use crate::mapping::CsvRecord;

    csv_record! {
        #[derive(Debug, Clone, PartialEq)]
        struct Address {
            street: String,
            city: String,
        }
    }

    csv_record! {
        #[derive(Debug, Clone, PartialEq)]
        struct Customer {
            id: i64,
            address: Address,
        }
    }

    #[test]
    fn nested_members_get_their_own_map() {
        let map = auto_map_shape(&Customer::shape());
        let address = map.member_map("address").unwrap();
        let nested = address.nested.as_ref().expect("nested map");
        assert_eq!(nested.type_name, "Address");
        assert_eq!(nested.member_maps.len(), 2);
        assert!(map.member_map("id").unwrap().nested.is_none());
    }

    #[test]
    fn parameters_mirror_the_constructor() {
        let map = auto_map_shape(&Customer::shape());
        let names: Vec<_> = map.parameter_maps.iter().map(|p| p.param.name).collect();
        assert_eq!(names, vec!["id", "address"]);
    }
}
