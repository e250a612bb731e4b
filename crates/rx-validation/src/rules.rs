//! Compiled Rx core type checks

use crate::reporter::ValidationIssue;
use crate::value_kind;
use serde_yaml::{Mapping, Value};
use std::sync::Arc;

/// Numeric bounds used by `range` and `length` parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Range {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub min_ex: Option<f64>,
    pub max_ex: Option<f64>,
}

impl Range {
    #[must_use]
    pub fn contains(&self, n: f64) -> bool {
        self.min.is_none_or(|min| n >= min)
            && self.max.is_none_or(|max| n <= max)
            && self.min_ex.is_none_or(|min| n > min)
            && self.max_ex.is_none_or(|max| n < max)
    }

    fn describe(&self) -> String {
        let mut bounds = Vec::new();
        if let Some(min) = self.min {
            bounds.push(format!(">= {min}"));
        }
        if let Some(min) = self.min_ex {
            bounds.push(format!("> {min}"));
        }
        if let Some(max) = self.max {
            bounds.push(format!("<= {max}"));
        }
        if let Some(max) = self.max_ex {
            bounds.push(format!("< {max}"));
        }
        bounds.join(" and ")
    }
}

/// A compiled type definition
#[derive(Debug, Clone, PartialEq)]
pub enum Checker {
    /// `//any`, optionally restricted to alternatives
    Any(Option<Vec<Checker>>),
    /// `//all`
    All(Vec<Checker>),
    /// `//arr`
    Arr {
        contents: Box<Checker>,
        length: Option<Range>,
    },
    /// `//bool`
    Bool,
    /// `//def`
    Def,
    /// `//fail`
    Fail,
    /// `//int`
    Int {
        range: Option<Range>,
        value: Option<f64>,
    },
    /// `//map`
    Map { values: Box<Checker> },
    /// `//nil`
    Nil,
    /// `//num`
    Num {
        range: Option<Range>,
        value: Option<f64>,
    },
    /// `//one`
    One,
    /// `//rec`
    Rec {
        required: Vec<(String, Checker)>,
        optional: Vec<(String, Checker)>,
        rest: Option<Box<Checker>>,
    },
    /// `//seq`
    Seq {
        contents: Vec<Checker>,
        tail: Option<Box<Checker>>,
    },
    /// `//str`
    Str {
        value: Option<String>,
        length: Option<Range>,
    },
    /// A registered type, shared with the registry
    Custom { uri: String, inner: Arc<Checker> },
}

impl Checker {
    /// Name of the type as written in schemas
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Checker::Any(_) => "//any",
            Checker::All(_) => "//all",
            Checker::Arr { .. } => "//arr",
            Checker::Bool => "//bool",
            Checker::Def => "//def",
            Checker::Fail => "//fail",
            Checker::Int { .. } => "//int",
            Checker::Map { .. } => "//map",
            Checker::Nil => "//nil",
            Checker::Num { .. } => "//num",
            Checker::One => "//one",
            Checker::Rec { .. } => "//rec",
            Checker::Seq { .. } => "//seq",
            Checker::Str { .. } => "//str",
            Checker::Custom { uri, .. } => uri,
        }
    }

    /// Whether the value matches, without collecting issues
    #[must_use]
    pub fn is_valid(&self, value: &Value) -> bool {
        self.check(value, "$").is_empty()
    }

    /// Every mismatch between `value` and this type, rooted at `path`
    #[must_use]
    pub fn check(&self, value: &Value, path: &str) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        self.check_into(value, path, &mut issues);
        issues
    }

    fn check_into(&self, value: &Value, path: &str, issues: &mut Vec<ValidationIssue>) {
        if let Value::Tagged(tagged) = value {
            self.check_into(&tagged.value, path, issues);
            return;
        }

        match self {
            Checker::Any(None) => {}
            Checker::Any(Some(alternatives)) => {
                if !alternatives.iter().any(|alt| alt.is_valid(value)) {
                    let names: Vec<&str> = alternatives.iter().map(Checker::type_name).collect();
                    issues.push(ValidationIssue::new(
                        path,
                        format!(
                            "{} matches none of the alternatives [{}]",
                            value_kind(value),
                            names.join(", ")
                        ),
                    ));
                }
            }
            Checker::All(schemas) => {
                for schema in schemas {
                    schema.check_into(value, path, issues);
                }
            }
            Checker::Arr { contents, length } => {
                let Some(items) = value.as_sequence() else {
                    issues.push(mismatch(self, value, path));
                    return;
                };
                if let Some(length) = length {
                    check_length(items.len(), length, "entries", path, issues);
                }
                for (idx, item) in items.iter().enumerate() {
                    contents.check_into(item, &index_path(path, idx), issues);
                }
            }
            Checker::Bool => {
                if !value.is_bool() {
                    issues.push(mismatch(self, value, path));
                }
            }
            Checker::Def => {
                if value.is_null() {
                    issues.push(ValidationIssue::new(path, "expected a defined value, found null"));
                }
            }
            Checker::Fail => {
                issues.push(ValidationIssue::new(path, "no value is allowed here (//fail)"));
            }
            Checker::Int { range, value: exact } => {
                match value.as_f64() {
                    Some(n) if is_integral(value) => {
                        check_number(n, range.as_ref(), *exact, path, issues);
                    }
                    _ => issues.push(mismatch(self, value, path)),
                }
            }
            Checker::Map { values } => {
                let Some(mapping) = value.as_mapping() else {
                    issues.push(mismatch(self, value, path));
                    return;
                };
                for (key, entry) in mapping {
                    values.check_into(entry, &key_path(path, key), issues);
                }
            }
            Checker::Nil => {
                if !value.is_null() {
                    issues.push(mismatch(self, value, path));
                }
            }
            Checker::Num { range, value: exact } => match value.as_f64() {
                Some(n) => check_number(n, range.as_ref(), *exact, path, issues),
                None => issues.push(mismatch(self, value, path)),
            },
            Checker::One => {
                if !(value.is_bool() || value.is_number() || value.is_string()) {
                    issues.push(mismatch(self, value, path));
                }
            }
            Checker::Rec {
                required,
                optional,
                rest,
            } => {
                let Some(mapping) = value.as_mapping() else {
                    issues.push(mismatch(self, value, path));
                    return;
                };
                check_record(mapping, required, optional, rest.as_deref(), path, issues);
            }
            Checker::Seq { contents, tail } => {
                let Some(items) = value.as_sequence() else {
                    issues.push(mismatch(self, value, path));
                    return;
                };
                check_sequence(items, contents, tail.as_deref(), path, issues);
            }
            Checker::Str { value: exact, length } => {
                let Some(text) = value.as_str() else {
                    issues.push(mismatch(self, value, path));
                    return;
                };
                if let Some(exact) = exact {
                    if text != exact {
                        issues.push(ValidationIssue::new(
                            path,
                            format!(
                                "expected the string '{}', found '{}'",
                                exact.escape_debug(),
                                text.escape_debug()
                            ),
                        ));
                    }
                }
                if let Some(length) = length {
                    check_length(text.chars().count(), length, "characters", path, issues);
                }
            }
            Checker::Custom { inner, .. } => inner.check_into(value, path, issues),
        }
    }
}

fn check_record(
    mapping: &Mapping,
    required: &[(String, Checker)],
    optional: &[(String, Checker)],
    rest: Option<&Checker>,
    path: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    for (key, schema) in required {
        match mapping.get(key.as_str()) {
            Some(entry) => schema.check_into(entry, &field_path(path, key), issues),
            None => issues.push(ValidationIssue::new(
                path,
                format!("missing required entry '{}'", key.escape_debug()),
            )),
        }
    }
    for (key, schema) in optional {
        if let Some(entry) = mapping.get(key.as_str()) {
            schema.check_into(entry, &field_path(path, key), issues);
        }
    }

    let known = |key: &Value| {
        key.as_str().is_some_and(|k| {
            required.iter().any(|(name, _)| name == k) || optional.iter().any(|(name, _)| name == k)
        })
    };
    let leftover: Mapping = mapping
        .iter()
        .filter(|(key, _)| !known(key))
        .map(|(key, entry)| (key.clone(), entry.clone()))
        .collect();

    if leftover.is_empty() {
        return;
    }
    match rest {
        Some(rest) => rest.check_into(&Value::Mapping(leftover), path, issues),
        None => {
            for key in leftover.keys() {
                issues.push(ValidationIssue::new(
                    path,
                    format!("unexpected entry '{}'", key_label(key)),
                ));
            }
        }
    }
}

fn check_sequence(
    items: &[Value],
    contents: &[Checker],
    tail: Option<&Checker>,
    path: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    if items.len() < contents.len() {
        issues.push(ValidationIssue::new(
            path,
            format!(
                "expected at least {} entries, found {}",
                contents.len(),
                items.len()
            ),
        ));
    }
    for (idx, (item, schema)) in items.iter().zip(contents).enumerate() {
        schema.check_into(item, &index_path(path, idx), issues);
    }

    if items.len() > contents.len() {
        match tail {
            Some(tail) => {
                let remaining = Value::Sequence(items[contents.len()..].to_vec());
                tail.check_into(&remaining, path, issues);
            }
            None => issues.push(ValidationIssue::new(
                path,
                format!(
                    "expected at most {} entries, found {}",
                    contents.len(),
                    items.len()
                ),
            )),
        }
    }
}

#[allow(clippy::float_cmp)]
fn check_number(
    n: f64,
    range: Option<&Range>,
    exact: Option<f64>,
    path: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    if let Some(range) = range {
        if !range.contains(n) {
            issues.push(ValidationIssue::new(
                path,
                format!("{n} is out of range ({})", range.describe()),
            ));
        }
    }
    if let Some(exact) = exact {
        if n != exact {
            issues.push(ValidationIssue::new(path, format!("expected {exact}, found {n}")));
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn check_length(len: usize, range: &Range, unit: &str, path: &str, issues: &mut Vec<ValidationIssue>) {
    if !range.contains(len as f64) {
        issues.push(ValidationIssue::new(
            path,
            format!("{len} {unit} is out of range ({})", range.describe()),
        ));
    }
}

fn is_integral(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0),
        _ => false,
    }
}

fn mismatch(checker: &Checker, value: &Value, path: &str) -> ValidationIssue {
    ValidationIssue::new(
        path,
        format!("expected {}, found {}", checker.type_name(), value_kind(value)),
    )
}

fn field_path(path: &str, key: &str) -> String {
    format!("{path}.{}", key.escape_debug())
}

fn index_path(path: &str, idx: usize) -> String {
    format!("{path}[{idx}]")
}

fn key_path(path: &str, key: &Value) -> String {
    match key.as_str() {
        Some(key) => field_path(path, key),
        None => format!("{path}[{}]", key_label(key)),
    }
}

fn key_label(key: &Value) -> String {
    match key {
        Value::String(s) => s.escape_debug().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "~".to_string(),
        other => value_kind(other).to_string(),
    }
}
