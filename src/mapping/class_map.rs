use std::marker::PhantomData;
use std::sync::Arc;

use crate::convert::{DateStyles, NumberStyles, TypeConverter, TypeConverterOptions, Value};
use crate::core::culture::Culture;
use crate::error::{CsvError, Result};
use crate::mapping::auto::auto_map_shape;
use crate::mapping::shape::{CsvRecord, MemberDescriptor};

/// Binding specification for one settable member.
///
/// Exactly one binding source applies: candidate names, an explicit index,
/// a collection range or suffix pattern, a constant, or the ignore flag.
/// The fluent methods are used inside [`ClassMapBuilder::member`] closures;
/// each replaces the auto-mapped default for that aspect of the binding.
#[derive(Debug, Clone)]
pub struct MemberMap {
    pub member: MemberDescriptor,
    /// Candidate column names in priority order; first header match wins.
    pub names: Vec<String>,
    /// Explicit column index; takes precedence over names.
    pub index: Option<usize>,
    /// Inclusive column index range for collection members.
    pub range: Option<(usize, usize)>,
    /// Collection columns matched by name prefix plus numeric suffix
    /// (`leg` matches `leg1`, `leg2`, …).
    pub indexed_prefix: Option<String>,
    /// Fixed value used for every row, read and write alike.
    pub constant: Option<Value>,
    /// Value used when the column is absent or the raw text fails to
    /// convert.
    pub default: Option<Value>,
    pub ignore_read: bool,
    pub ignore_write: bool,
    /// Absent column is tolerated instead of raising `MissingColumns`.
    pub optional: bool,
    pub options: TypeConverterOptions,
    /// Per-binding converter override.
    pub converter: Option<Arc<dyn TypeConverter>>,
    /// Recursively mapped nested record, present for nested member types.
    pub nested: Option<Box<ClassMap>>,
}

impl MemberMap {
    pub(crate) fn from_descriptor(member: &MemberDescriptor, nested: Option<ClassMap>) -> Self {
        Self {
            names: vec![member.name.to_string()],
            member: member.clone(),
            index: None,
            range: None,
            indexed_prefix: None,
            constant: None,
            default: None,
            ignore_read: false,
            ignore_write: false,
            optional: false,
            options: TypeConverterOptions::default(),
            converter: None,
            nested: nested.map(Box::new),
        }
    }

    /// Binds to a single candidate column name, replacing the defaults.
    pub fn name(mut self, name: &str) -> Self {
        self.names = vec![name.to_string()];
        self
    }

    /// Binds to several candidate names tried in order; the first one found
    /// in the header wins.
    pub fn candidate_names(mut self, names: &[&str]) -> Self {
        self.names = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Binds a collection member to the inclusive column index range.
    pub fn range(mut self, start: usize, end: usize) -> Self {
        self.range = Some((start, end));
        self
    }

    /// Binds a collection member to every header column whose name is
    /// `prefix` followed by a number, ordered by that number.
    pub fn indexed(mut self, prefix: &str) -> Self {
        self.indexed_prefix = Some(prefix.to_string());
        self
    }

    pub fn constant(mut self, value: Value) -> Self {
        self.constant = Some(value);
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Excludes the member from reading and writing.
    pub fn ignore(mut self) -> Self {
        self.ignore_read = true;
        self.ignore_write = true;
        self
    }

    /// Excludes the member from reading only; it is still written.
    pub fn ignore_on_read(mut self) -> Self {
        self.ignore_read = true;
        self
    }

    /// Excludes the member from writing only.
    pub fn ignore_on_write(mut self) -> Self {
        self.ignore_write = true;
        self
    }

    /// Tolerates an absent column; the member gets its default (or null for
    /// `Option` members) instead of raising `MissingColumns`.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn culture(mut self, culture: Culture) -> Self {
        self.options.culture = Some(culture);
        self
    }

    pub fn formats(mut self, formats: &[&str]) -> Self {
        self.options.formats = formats.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn date_styles(mut self, styles: DateStyles) -> Self {
        self.options.date_styles = Some(styles);
        self
    }

    pub fn number_styles(mut self, styles: NumberStyles) -> Self {
        self.options.number_styles = Some(styles);
        self
    }

    pub fn boolean_literals(mut self, true_literals: &[&str], false_literals: &[&str]) -> Self {
        self.options.true_literals = true_literals.iter().map(|l| l.to_string()).collect();
        self.options.false_literals = false_literals.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn null_literals(mut self, literals: &[&str]) -> Self {
        self.options.null_literals = literals.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn float_precision(mut self, precision: usize) -> Self {
        self.options.float_precision = Some(precision);
        self
    }

    pub fn converter(mut self, converter: Arc<dyn TypeConverter>) -> Self {
        self.converter = Some(converter);
        self
    }

    fn has_explicit_binding(&self) -> bool {
        self.index.is_some()
            || self.range.is_some()
            || self.indexed_prefix.is_some()
            || self.constant.is_some()
    }

    fn is_fully_ignored(&self) -> bool {
        self.ignore_read && self.ignore_write
    }
}

/// Binding specification for one constructor parameter. Parameters only
/// participate in reading; writing always extracts member values.
#[derive(Debug, Clone)]
pub struct ParameterMap {
    pub param: MemberDescriptor,
    pub names: Vec<String>,
    pub index: Option<usize>,
    pub default: Option<Value>,
    pub ignore: bool,
    pub optional: bool,
    pub options: TypeConverterOptions,
    pub converter: Option<Arc<dyn TypeConverter>>,
}

impl ParameterMap {
    pub(crate) fn from_descriptor(param: &MemberDescriptor) -> Self {
        Self {
            names: vec![param.name.to_string()],
            param: param.clone(),
            index: None,
            default: None,
            ignore: false,
            optional: false,
            options: TypeConverterOptions::default(),
            converter: None,
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.names = vec![name.to_string()];
        self
    }

    pub fn candidate_names(mut self, names: &[&str]) -> Self {
        self.names = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Excludes the parameter from binding; it receives its default (or
    /// null) at construction and consumes no position in headerless
    /// streams.
    pub fn ignore(mut self) -> Self {
        self.ignore = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn culture(mut self, culture: Culture) -> Self {
        self.options.culture = Some(culture);
        self
    }

    pub fn formats(mut self, formats: &[&str]) -> Self {
        self.options.formats = formats.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn date_styles(mut self, styles: DateStyles) -> Self {
        self.options.date_styles = Some(styles);
        self
    }

    pub fn number_styles(mut self, styles: NumberStyles) -> Self {
        self.options.number_styles = Some(styles);
        self
    }

    pub fn converter(mut self, converter: Arc<dyn TypeConverter>) -> Self {
        self.converter = Some(converter);
        self
    }
}

/// The compiled binding specification for one target type: member maps for
/// every settable member and parameter maps for the designated constructor.
///
/// Built once per type per configuration, either fully automatically via
/// [`ClassMap::auto`] or through [`ClassMapBuilder`], then shared read-only
/// across all rows of a stream.
#[derive(Debug, Clone)]
pub struct ClassMap {
    pub type_name: &'static str,
    pub member_maps: Vec<MemberMap>,
    pub parameter_maps: Vec<ParameterMap>,
    /// Read through the constructor's parameter maps instead of the member
    /// maps.
    pub use_constructor: bool,
    /// Class-level converter option defaults, below per-binding overrides
    /// and above the global configuration.
    pub options: TypeConverterOptions,
}

impl ClassMap {
    /// Auto-maps `T` with no overrides.
    pub fn auto<T: CsvRecord>() -> Self {
        auto_map_shape(&T::shape())
    }

    pub fn builder<T: CsvRecord>() -> ClassMapBuilder<T> {
        ClassMapBuilder::new()
    }

    pub fn member_map(&self, name: &str) -> Option<&MemberMap> {
        self.member_maps.iter().find(|m| m.member.name == name)
    }

    pub fn parameter_map(&self, name: &str) -> Option<&ParameterMap> {
        self.parameter_maps.iter().find(|p| p.param.name == name)
    }
}

/// Builds a [`ClassMap`] for `T`: starts from the auto-mapped defaults and
/// applies declarative overrides, validating the binding invariants at
/// [`build`](Self::build) time.
///
/// # Examples
///
/// ```
/// use csvbind::csv_record;
/// use csvbind::mapping::ClassMap;
///
/// csv_record! {
///     #[derive(Debug, Clone, PartialEq)]
///     pub struct Trade {
///         pub id: i64,
///         pub price: f64,
///         pub venue: Option<String>,
///     }
/// }
///
/// let map = ClassMap::builder::<Trade>()
///     .member("price", |m| m.name("px"))
///     .member("venue", |m| m.optional())
///     .build()
///     .unwrap();
/// assert_eq!(map.member_map("price").unwrap().names, vec!["px"]);
/// assert!(map.member_map("venue").unwrap().optional);
/// ```
pub struct ClassMapBuilder<T: CsvRecord> {
    map: ClassMap,
    errors: Vec<String>,
    _marker: PhantomData<T>,
}

impl<T: CsvRecord> Default for ClassMapBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: CsvRecord> ClassMapBuilder<T> {
    pub fn new() -> Self {
        Self {
            map: ClassMap::auto::<T>(),
            errors: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Customizes the binding of the member called `name`. Unknown names are
    /// reported at [`build`](Self::build) time.
    pub fn member(mut self, name: &str, configure: impl FnOnce(MemberMap) -> MemberMap) -> Self {
        match self
            .map
            .member_maps
            .iter()
            .position(|m| m.member.name == name)
        {
            Some(position) => {
                let member = self.map.member_maps.remove(position);
                self.map.member_maps.insert(position, configure(member));
            }
            None => self.errors.push(format!("unknown member `{}`", name)),
        }
        self
    }

    /// Customizes the binding of the constructor parameter called `name`.
    pub fn parameter(
        mut self,
        name: &str,
        configure: impl FnOnce(ParameterMap) -> ParameterMap,
    ) -> Self {
        match self
            .map
            .parameter_maps
            .iter()
            .position(|p| p.param.name == name)
        {
            Some(position) => {
                let param = self.map.parameter_maps.remove(position);
                self.map.parameter_maps.insert(position, configure(param));
            }
            None => self
                .errors
                .push(format!("unknown constructor parameter `{}`", name)),
        }
        self
    }

    /// Reads through the constructor's parameter maps instead of the member
    /// maps. Writing is unaffected.
    pub fn use_constructor(mut self) -> Self {
        self.map.use_constructor = true;
        self
    }

    /// Class-level converter option defaults, overridden per binding.
    pub fn defaults(mut self, options: TypeConverterOptions) -> Self {
        self.map.options = options;
        self
    }

    /// Validates and returns the map.
    ///
    /// Build-time failures: unknown member names, a member both bound and
    /// ignored, conflicting binding sources, duplicate explicit indices or
    /// candidate names, an ignored or optional non-`Option` member without a
    /// default.
    pub fn build(self) -> Result<ClassMap> {
        let mut errors = self.errors;
        let map = self.map;

        for member in &map.member_maps {
            if member.is_fully_ignored() && member.has_explicit_binding() {
                errors.push(format!(
                    "member `{}` is both bound and ignored",
                    member.member.name
                ));
            }
            if member.constant.is_some() && (member.index.is_some() || member.range.is_some()) {
                errors.push(format!(
                    "member `{}` has both a constant and a column binding",
                    member.member.name
                ));
            }
            let needs_value_source = (member.ignore_read || member.optional)
                && member.constant.is_none()
                && member.default.is_none()
                && !member.member.data_type.is_optional();
            if needs_value_source && !map.use_constructor {
                errors.push(format!(
                    "member `{}` may be left without a value; make it Option or give it a default",
                    member.member.name
                ));
            }
        }

        if map.use_constructor {
            for param in &map.parameter_maps {
                let needs_value_source = (param.ignore || param.optional)
                    && param.default.is_none()
                    && !param.param.data_type.is_optional();
                if needs_value_source {
                    errors.push(format!(
                        "parameter `{}` may be left without a value; make it Option or give it a default",
                        param.param.name
                    ));
                }
            }
        }

        if !errors.is_empty() {
            return Err(CsvError::Configuration {
                type_name: map.type_name.to_string(),
                reason: errors.join("; "),
            });
        }

        check_duplicates(&map)?;
        Ok(map)
    }
}

/// Duplicate claims detectable before any header exists: two bindings with
/// the same explicit index or the same primary candidate name.
fn check_duplicates(map: &ClassMap) -> Result<()> {
    let bindings: Vec<(&str, Option<usize>, Option<&String>)> = if map.use_constructor {
        map.parameter_maps
            .iter()
            .filter(|p| !p.ignore)
            .map(|p| (p.param.name, p.index, p.names.first()))
            .collect()
    } else {
        map.member_maps
            .iter()
            .filter(|m| !m.ignore_read && m.constant.is_none())
            .map(|m| (m.member.name, m.index, m.names.first()))
            .collect()
    };

    for (position, (name, index, primary)) in bindings.iter().enumerate() {
        for (other_name, other_index, other_primary) in &bindings[position + 1..] {
            if index.is_some() && index == other_index {
                return Err(CsvError::DuplicateBinding {
                    column: format!("#{}", index.unwrap()),
                    first: (*name).to_string(),
                    second: (*other_name).to_string(),
                });
            }
            if let (Some(a), Some(b)) = (primary, other_primary) {
                if a.eq_ignore_ascii_case(b) {
                    return Err(CsvError::DuplicateBinding {
                        column: (*a).clone(),
                        first: (*name).to_string(),
                        second: (*other_name).to_string(),
                    });
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::Value;
    use crate::csv_record;

    csv_record! {
        #[derive(Debug, Clone, PartialEq)]
        struct Order {
            id: i64,
            symbol: String,
            qty: u32,
            note: Option<String>,
        }
    }

    #[test]
    fn auto_map_covers_every_member_and_parameter() {
        let map = ClassMap::auto::<Order>();
        assert_eq!(map.member_maps.len(), 4);
        assert_eq!(map.parameter_maps.len(), 4);
        assert_eq!(map.member_map("symbol").unwrap().names, vec!["symbol"]);
        assert!(!map.use_constructor);
    }

    #[test]
    fn overrides_replace_auto_defaults() {
        let map = ClassMap::builder::<Order>()
            .member("qty", |m| m.candidate_names(&["quantity", "qty"]))
            .member("note", |m| m.ignore())
            .build()
            .unwrap();

        assert_eq!(
            map.member_map("qty").unwrap().names,
            vec!["quantity", "qty"]
        );
        assert!(map.member_map("note").unwrap().ignore_read);
        assert!(map.member_map("note").unwrap().ignore_write);
    }

    #[test]
    fn unknown_member_fails_at_build_time() {
        let err = ClassMap::builder::<Order>()
            .member("missing", |m| m)
            .build()
            .unwrap_err();
        assert!(matches!(err, CsvError::Configuration { .. }));
    }

    #[test]
    fn bound_and_ignored_is_rejected() {
        let err = ClassMap::builder::<Order>()
            .member("symbol", |m| m.index(2).ignore())
            .build()
            .unwrap_err();
        assert!(matches!(err, CsvError::Configuration { .. }));
    }

    #[test]
    fn ignored_member_without_default_must_be_optional_typed() {
        let err = ClassMap::builder::<Order>()
            .member("symbol", |m| m.ignore_on_read())
            .build()
            .unwrap_err();
        assert!(matches!(err, CsvError::Configuration { .. }));

        let map = ClassMap::builder::<Order>()
            .member("symbol", |m| {
                m.ignore_on_read()
                    .default_value(Value::Str("UNKNOWN".to_string()))
            })
            .build();
        assert!(map.is_ok());
    }

    #[test]
    fn duplicate_explicit_index_is_rejected() {
        let err = ClassMap::builder::<Order>()
            .member("id", |m| m.index(0))
            .member("qty", |m| m.index(0))
            .build()
            .unwrap_err();
        assert!(matches!(err, CsvError::DuplicateBinding { .. }));
    }

    #[test]
    fn duplicate_candidate_name_is_rejected() {
        let err = ClassMap::builder::<Order>()
            .member("symbol", |m| m.name("ticker"))
            .member("note", |m| m.name("Ticker"))
            .build()
            .unwrap_err();
        assert!(matches!(err, CsvError::DuplicateBinding { .. }));
    }

    #[test]
    fn parameter_overrides_apply_in_constructor_mode() {
        let map = ClassMap::builder::<Order>()
            .use_constructor()
            .parameter("note", |p| p.ignore())
            .build()
            .unwrap();
        assert!(map.use_constructor);
        assert!(map.parameter_map("note").unwrap().ignore);
    }
}
