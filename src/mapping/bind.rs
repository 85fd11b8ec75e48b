use std::sync::Arc;

use log::debug;

use crate::convert::{TypeConverter, TypeConverterOptions, Value, ValueMap};
use crate::core::config::{CsvConfig, MissingFieldPolicy};
use crate::error::{CsvError, Result};
use crate::mapping::auto::auto_map_shape;
use crate::mapping::class_map::{ClassMap, MemberMap, ParameterMap};
use crate::reader::header::Header;
use crate::tokenizer::Record;

/// Column assignment of one leaf after header resolution or positional
/// fallback.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ColumnBinding {
    Unresolved,
    /// No column: ignored, constant, or absent-but-tolerated.
    None,
    Single(usize),
    Multi(Vec<usize>),
}

/// One flattened binding: a scalar member, a collection member, or a leaf of
/// a nested record, with its converter and fully merged options resolved.
#[derive(Clone)]
pub(crate) struct BoundLeaf {
    /// Member path from the root record, e.g. `["address", "street"]`.
    pub path: Vec<&'static str>,
    /// Candidate column names, nested prefixes applied, priority order.
    pub column_names: Vec<String>,
    pub index: Option<usize>,
    pub range: Option<(usize, usize)>,
    pub indexed_prefix: Option<String>,
    pub constant: Option<Value>,
    pub default: Option<Value>,
    pub optional: bool,
    pub ignored: bool,
    pub is_seq: bool,
    pub target_name: String,
    /// Absent only for read-ignored leaves, which never convert anything.
    pub converter: Option<Arc<dyn TypeConverter>>,
    pub options: TypeConverterOptions,
    pub columns: ColumnBinding,
}

impl BoundLeaf {
    /// Column label used in error messages.
    pub(crate) fn label(&self) -> String {
        if let Some(name) = self.column_names.first() {
            name.clone()
        } else if let Some(index) = self.index {
            format!("#{}", index)
        } else {
            self.path.join(".")
        }
    }
}

enum LeafOutcome {
    Value(Value),
    SkipRow,
}

/// A class map flattened against a configuration: converters resolved
/// eagerly (fail fast on `NoConverterFound`), columns resolved lazily once
/// the header is known.
#[derive(Clone)]
pub(crate) struct BoundClassMap {
    pub type_name: &'static str,
    pub leaves: Vec<BoundLeaf>,
}

/// Binds the read view of `map`: parameter maps in constructor mode, member
/// maps otherwise. Nested members recurse depth-first in declaration order,
/// their candidate names prefixed with the parent binding's primary name.
pub(crate) fn bind_for_read(map: &ClassMap, config: &CsvConfig) -> Result<BoundClassMap> {
    let class_options = map.options.merged_over(&config.effective_options());
    let mut leaves = Vec::new();

    if map.use_constructor {
        for param in &map.parameter_maps {
            collect_param_leaf(&mut leaves, param, &class_options, config)?;
        }
    } else {
        collect_member_leaves(&mut leaves, map, &[], None, &class_options, config, true)?;
    }

    debug!(
        "bound {} leaf binding(s) for {} (read)",
        leaves.len(),
        map.type_name
    );
    Ok(BoundClassMap {
        type_name: map.type_name,
        leaves,
    })
}

/// Binds the write view of `map`: always the member maps (writing never
/// consults parameter maps), with write-ignored members omitted entirely.
pub(crate) fn bind_for_write(map: &ClassMap, config: &CsvConfig) -> Result<BoundClassMap> {
    let class_options = map.options.merged_over(&config.effective_options());
    let mut leaves = Vec::new();
    collect_member_leaves(&mut leaves, map, &[], None, &class_options, config, false)?;

    debug!(
        "bound {} leaf binding(s) for {} (write)",
        leaves.len(),
        map.type_name
    );
    Ok(BoundClassMap {
        type_name: map.type_name,
        leaves,
    })
}

fn prefixed(prefix: Option<&str>, name: &str, separator: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}{}{}", prefix, separator, name),
        None => name.to_string(),
    }
}

fn collect_member_leaves(
    leaves: &mut Vec<BoundLeaf>,
    map: &ClassMap,
    path: &[&'static str],
    name_prefix: Option<&str>,
    parent_options: &TypeConverterOptions,
    config: &CsvConfig,
    read_view: bool,
) -> Result<()> {
    for member in &map.member_maps {
        let ignored = if read_view {
            member.ignore_read
        } else {
            member.ignore_write
        };
        if !read_view && ignored {
            continue;
        }

        let mut member_path = path.to_vec();
        member_path.push(member.member.name);
        let options = member.options.merged_over(parent_options);

        let recurse = member.nested.is_some()
            && member.converter.is_none()
            && !config
                .registry
                .has_custom(&member.member.data_type.type_name())
            && !ignored;

        if recurse {
            let nested = member.nested.as_deref().expect("nested map present");
            let prefix = prefixed(
                name_prefix,
                member.names.first().map(String::as_str).unwrap_or(member.member.name),
                &config.nested_separator,
            );
            let nested_options = nested.options.merged_over(&options);
            collect_member_leaves(
                leaves,
                nested,
                &member_path,
                Some(prefix.as_str()),
                &nested_options,
                config,
                read_view,
            )?;
            continue;
        }

        leaves.push(make_leaf(
            member_path,
            member,
            name_prefix,
            options,
            config,
            ignored,
        )?);
    }
    Ok(())
}

fn make_leaf(
    path: Vec<&'static str>,
    member: &MemberMap,
    name_prefix: Option<&str>,
    options: TypeConverterOptions,
    config: &CsvConfig,
    ignored: bool,
) -> Result<BoundLeaf> {
    let data_type = &member.member.data_type;
    let converter = if ignored {
        None
    } else {
        match &member.converter {
            Some(converter) => Some(converter.clone()),
            None => Some(config.registry.resolve(data_type)?),
        }
    };

    let target_name = match data_type.as_seq() {
        Some(element) => element.type_name(),
        None => data_type.type_name(),
    };

    Ok(BoundLeaf {
        column_names: member
            .names
            .iter()
            .map(|name| prefixed(name_prefix, name, &config.nested_separator))
            .collect(),
        index: member.index,
        range: member.range,
        indexed_prefix: member
            .indexed_prefix
            .as_ref()
            .map(|prefix| prefixed(name_prefix, prefix, &config.nested_separator)),
        constant: member.constant.clone(),
        default: member.default.clone(),
        optional: member.optional,
        ignored,
        is_seq: data_type.as_seq().is_some(),
        target_name,
        converter,
        options,
        columns: ColumnBinding::Unresolved,
        path,
    })
}

fn collect_param_leaf(
    leaves: &mut Vec<BoundLeaf>,
    param: &ParameterMap,
    class_options: &TypeConverterOptions,
    config: &CsvConfig,
) -> Result<()> {
    let data_type = &param.param.data_type;
    let options = param.options.merged_over(class_options);

    // A nested parameter is auto-mapped on the fly, exactly like a nested
    // member.
    if let Some(nested_type) = data_type.as_nested() {
        if !param.ignore
            && param.converter.is_none()
            && !config.registry.has_custom(&data_type.type_name())
        {
            let nested = auto_map_shape(&(nested_type.shape)());
            let prefix = param
                .names
                .first()
                .cloned()
                .unwrap_or_else(|| param.param.name.to_string());
            let path = vec![param.param.name];
            return collect_member_leaves(
                leaves,
                &nested,
                &path,
                Some(prefix.as_str()),
                &options,
                config,
                true,
            );
        }
    }

    let converter = if param.ignore {
        None
    } else {
        match &param.converter {
            Some(converter) => Some(converter.clone()),
            None => Some(config.registry.resolve(data_type)?),
        }
    };

    let target_name = match data_type.as_seq() {
        Some(element) => element.type_name(),
        None => data_type.type_name(),
    };

    leaves.push(BoundLeaf {
        path: vec![param.param.name],
        column_names: param.names.clone(),
        index: param.index,
        range: None,
        indexed_prefix: None,
        constant: None,
        default: param.default.clone(),
        optional: param.optional,
        ignored: param.ignore,
        is_seq: data_type.as_seq().is_some(),
        target_name,
        converter,
        options,
        columns: ColumnBinding::Unresolved,
    });
    Ok(())
}

impl BoundClassMap {
    /// Resolves every leaf to concrete columns.
    ///
    /// With a header: explicit index > candidate names (first match wins) >
    /// tolerated absence for optional or defaulted bindings; every missing
    /// required binding is collected and reported together. Without a
    /// header: positional fallback in declaration order, ignored and
    /// constant bindings consuming no position. Two leaves claiming one
    /// column is a duplicate-binding error either way.
    pub(crate) fn resolve_columns(
        &mut self,
        header: Option<&Header>,
        _config: &CsvConfig,
    ) -> Result<()> {
        let mut claimed: Vec<(usize, String)> = Vec::new();
        let mut missing: Vec<String> = Vec::new();

        match header {
            Some(header) => {
                for leaf in &mut self.leaves {
                    if leaf.ignored || leaf.constant.is_some() {
                        leaf.columns = ColumnBinding::None;
                        continue;
                    }
                    if let Some(index) = leaf.index {
                        claim(&mut claimed, index, leaf.label(), header)?;
                        leaf.columns = ColumnBinding::Single(index);
                    } else if let Some((start, end)) = leaf.range {
                        let columns: Vec<usize> = (start..=end).collect();
                        for column in &columns {
                            claim(&mut claimed, *column, leaf.label(), header)?;
                        }
                        leaf.columns = ColumnBinding::Multi(columns);
                    } else if let Some(prefix) = &leaf.indexed_prefix {
                        let columns = header.indexed_columns(prefix);
                        if columns.is_empty() {
                            if leaf.optional || leaf.default.is_some() {
                                leaf.columns = ColumnBinding::None;
                            } else {
                                missing.push(format!("{}<n>", prefix));
                            }
                            continue;
                        }
                        for column in &columns {
                            claim(&mut claimed, *column, leaf.label(), header)?;
                        }
                        leaf.columns = ColumnBinding::Multi(columns);
                    } else {
                        match leaf
                            .column_names
                            .iter()
                            .find_map(|name| header.index_of(name))
                        {
                            Some(index) => {
                                claim(&mut claimed, index, leaf.label(), header)?;
                                leaf.columns = ColumnBinding::Single(index);
                            }
                            None => {
                                if leaf.optional || leaf.default.is_some() {
                                    leaf.columns = ColumnBinding::None;
                                } else {
                                    missing.push(leaf.label());
                                }
                            }
                        }
                    }
                }
                if !missing.is_empty() {
                    return Err(CsvError::MissingColumns { columns: missing });
                }
            }
            None => {
                let mut cursor = 0usize;
                for leaf in &mut self.leaves {
                    if leaf.ignored || leaf.constant.is_some() {
                        leaf.columns = ColumnBinding::None;
                        continue;
                    }
                    if let Some(prefix) = &leaf.indexed_prefix {
                        if leaf.range.is_none() {
                            return Err(CsvError::Configuration {
                                type_name: self.type_name.to_string(),
                                reason: format!(
                                    "suffix-pattern binding `{}` requires a header",
                                    prefix
                                ),
                            });
                        }
                    }
                    if let Some(index) = leaf.index {
                        claim_positional(&mut claimed, index, leaf.label())?;
                        leaf.columns = ColumnBinding::Single(index);
                        cursor = cursor.max(index + 1);
                    } else if let Some((start, end)) = leaf.range {
                        for column in start..=end {
                            claim_positional(&mut claimed, column, leaf.label())?;
                        }
                        leaf.columns = ColumnBinding::Multi((start..=end).collect());
                        cursor = cursor.max(end + 1);
                    } else {
                        claim_positional(&mut claimed, cursor, leaf.label())?;
                        leaf.columns = ColumnBinding::Single(cursor);
                        cursor += 1;
                    }
                }
            }
        }
        Ok(())
    }

    /// Converts one raw record into a member value map, ready for
    /// `from_values`. `Ok(None)` means the row is dropped under the
    /// missing-field `Skip` policy.
    pub(crate) fn materialize(
        &self,
        record: &Record,
        config: &CsvConfig,
    ) -> Result<Option<ValueMap>> {
        let mut root = ValueMap::new();
        for leaf in &self.leaves {
            let value = match self.leaf_value(leaf, record, config)? {
                LeafOutcome::Value(value) => value,
                LeafOutcome::SkipRow => return Ok(None),
            };
            insert_path(&mut root, &leaf.path, value);
        }
        Ok(Some(root))
    }

    fn leaf_value(
        &self,
        leaf: &BoundLeaf,
        record: &Record,
        config: &CsvConfig,
    ) -> Result<LeafOutcome> {
        if let Some(constant) = &leaf.constant {
            return Ok(LeafOutcome::Value(constant.clone()));
        }
        match &leaf.columns {
            ColumnBinding::None | ColumnBinding::Unresolved => Ok(LeafOutcome::Value(
                leaf.default.clone().unwrap_or(Value::Null),
            )),
            ColumnBinding::Single(index) => match record.get(*index) {
                Some(raw) => self.parse_leaf(leaf, raw, record.line),
                None => self.missing_field(leaf, *index, record.line, config),
            },
            ColumnBinding::Multi(indices) => {
                let mut items = Vec::with_capacity(indices.len());
                for index in indices {
                    match record.get(*index) {
                        Some(raw) => match self.parse_leaf(leaf, raw, record.line)? {
                            LeafOutcome::Value(value) => items.push(value),
                            LeafOutcome::SkipRow => return Ok(LeafOutcome::SkipRow),
                        },
                        None => match self.missing_field(leaf, *index, record.line, config)? {
                            LeafOutcome::Value(value) => items.push(value),
                            LeafOutcome::SkipRow => return Ok(LeafOutcome::SkipRow),
                        },
                    }
                }
                Ok(LeafOutcome::Value(Value::Seq(items)))
            }
        }
    }

    fn parse_leaf(&self, leaf: &BoundLeaf, raw: &str, line: u64) -> Result<LeafOutcome> {
        let converter = leaf
            .converter
            .as_ref()
            .expect("non-ignored leaf has a converter");
        match converter.parse(raw, &leaf.options) {
            Ok(value) => Ok(LeafOutcome::Value(value)),
            Err(reason) => {
                // An explicitly configured default absorbs the failure;
                // nothing is ever coerced silently.
                if let Some(default) = &leaf.default {
                    return Ok(LeafOutcome::Value(default.clone()));
                }
                Err(CsvError::Conversion {
                    line,
                    column: leaf.label(),
                    raw: raw.to_string(),
                    target: leaf.target_name.clone(),
                    reason,
                })
            }
        }
    }

    fn missing_field(
        &self,
        leaf: &BoundLeaf,
        index: usize,
        line: u64,
        config: &CsvConfig,
    ) -> Result<LeafOutcome> {
        match config.missing_field {
            MissingFieldPolicy::Error => Err(CsvError::Conversion {
                line,
                column: leaf.label(),
                raw: String::new(),
                target: leaf.target_name.clone(),
                reason: format!("record has no field at column index {}", index),
            }),
            MissingFieldPolicy::ReturnDefault => Ok(LeafOutcome::Value(
                leaf.default.clone().unwrap_or(Value::Null),
            )),
            MissingFieldPolicy::Skip => Ok(LeafOutcome::SkipRow),
        }
    }

    /// Column names for the header row, in declared order, collection
    /// bindings expanded.
    pub(crate) fn header_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for leaf in &self.leaves {
            if leaf.is_seq {
                let (start, end) = leaf.range.ok_or_else(|| CsvError::Configuration {
                    type_name: self.type_name.to_string(),
                    reason: format!(
                        "collection binding `{}` needs an index range to write a header",
                        leaf.label()
                    ),
                })?;
                let count = end - start + 1;
                let prefix = leaf
                    .indexed_prefix
                    .clone()
                    .unwrap_or_else(|| leaf.label());
                for ordinal in 1..=count {
                    names.push(format!("{}{}", prefix, ordinal));
                }
            } else {
                names.push(leaf.label());
            }
        }
        Ok(names)
    }

    /// Formats one record's member values into raw fields, in declared
    /// column order.
    pub(crate) fn extract(&self, values: &ValueMap, row: u64) -> Result<Vec<String>> {
        let mut fields = Vec::with_capacity(self.leaves.len());
        for leaf in &self.leaves {
            let value = match &leaf.constant {
                Some(constant) => constant.clone(),
                None => value_at(values, &leaf.path).cloned().unwrap_or(Value::Null),
            };
            let converter = leaf
                .converter
                .as_ref()
                .expect("write leaves always carry a converter");

            if leaf.is_seq {
                let items = match value {
                    Value::Seq(items) => items,
                    Value::Null => Vec::new(),
                    other => {
                        return Err(self.format_error(
                            leaf,
                            row,
                            format!("expected sequence, got {} value", other.kind()),
                        ));
                    }
                };
                if let Some((start, end)) = leaf.range {
                    let expected = end - start + 1;
                    if items.len() != expected {
                        return Err(self.format_error(
                            leaf,
                            row,
                            format!(
                                "sequence has {} element(s), binding covers {} column(s)",
                                items.len(),
                                expected
                            ),
                        ));
                    }
                }
                for item in &items {
                    let rendered = converter
                        .format(item, &leaf.options)
                        .map_err(|reason| self.format_error(leaf, row, reason))?;
                    fields.push(rendered);
                }
            } else {
                let rendered = converter
                    .format(&value, &leaf.options)
                    .map_err(|reason| self.format_error(leaf, row, reason))?;
                fields.push(rendered);
            }
        }
        Ok(fields)
    }

    fn format_error(&self, leaf: &BoundLeaf, row: u64, reason: String) -> CsvError {
        CsvError::Conversion {
            line: row,
            column: leaf.label(),
            raw: String::new(),
            target: leaf.target_name.clone(),
            reason,
        }
    }
}

fn claim(
    claimed: &mut Vec<(usize, String)>,
    column: usize,
    label: String,
    header: &Header,
) -> Result<()> {
    if let Some((_, first)) = claimed.iter().find(|(index, _)| *index == column) {
        let column_name = header
            .names()
            .get(column)
            .cloned()
            .unwrap_or_else(|| format!("#{}", column));
        return Err(CsvError::DuplicateBinding {
            column: column_name,
            first: first.clone(),
            second: label,
        });
    }
    claimed.push((column, label));
    Ok(())
}

fn claim_positional(claimed: &mut Vec<(usize, String)>, column: usize, label: String) -> Result<()> {
    if let Some((_, first)) = claimed.iter().find(|(index, _)| *index == column) {
        return Err(CsvError::DuplicateBinding {
            column: format!("#{}", column),
            first: first.clone(),
            second: label,
        });
    }
    claimed.push((column, label));
    Ok(())
}

fn insert_path(root: &mut ValueMap, path: &[&'static str], value: Value) {
    if path.len() == 1 {
        root.insert(path[0], value);
        return;
    }
    if root.get(path[0]).is_none() {
        root.insert(path[0], Value::Record(ValueMap::new()));
    }
    if let Some(Value::Record(inner)) = root.get_mut(path[0]) {
        insert_path(inner, &path[1..], value);
    }
}

fn value_at<'a>(values: &'a ValueMap, path: &[&'static str]) -> Option<&'a Value> {
    let first = values.get(path[0])?;
    if path.len() == 1 {
        return Some(first);
    }
    match first {
        Value::Record(inner) => value_at(inner, &path[1..]),
        _ => None,
    }
}
