//! Type registry and validation engine

use crate::reporter::ValidationIssue;
use crate::rules::{Checker, Range};
use crate::{value_kind, Error, Result};
use regex::Regex;
use rx_schema::registry::CORE_URI;
use rx_schema::NamespaceRegistry;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};
use tracing::{debug, trace};

static URI_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w+:").expect("uri pattern is valid"));

static TYPE_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/([-._A-Za-z0-9]*)/([-._A-Za-z0-9]+)$").expect("type name pattern is valid")
});

/// Validation configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Continue validation after errors (collect all)
    pub continue_on_error: bool,
    /// Maximum errors before stopping (0 = unlimited)
    pub max_errors: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            continue_on_error: true,
            max_errors: 0,
        }
    }
}

/// Validation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    /// Whether validation passed
    pub is_valid: bool,
    /// List of errors found
    pub errors: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Create a new valid result
    #[must_use]
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    /// Check if there are any errors
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, error: ValidationIssue) {
        self.errors.push(error);
        self.is_valid = false;
    }
}

/// Registry of learned types, keyed by fully qualified URI
///
/// A definition can only reference types that are registered already, so types
/// must be registered leaves first.
#[derive(Debug)]
pub struct TypeRegistry<'ns> {
    namespaces: &'ns NamespaceRegistry,
    types: BTreeMap<String, Arc<Checker>>,
}

impl<'ns> TypeRegistry<'ns> {
    /// Create an empty registry resolving prefixes through `namespaces`
    #[must_use]
    pub fn new(namespaces: &'ns NamespaceRegistry) -> Self {
        Self {
            namespaces,
            types: BTreeMap::new(),
        }
    }

    /// Register a declared type such as `/app/Tag`; returns its qualified URI
    ///
    /// # Errors
    ///
    /// Fails if the definition is invalid, references a type that is not yet
    /// registered, or the URI is already taken.
    pub fn register_type(&mut self, name: &str, definition: &Value) -> Result<String> {
        let uri = self.namespaces.qualify(name);
        self.learn_type(&uri, definition)?;
        Ok(uri)
    }

    /// Register a definition under an explicit URI
    ///
    /// # Errors
    ///
    /// See [`TypeRegistry::register_type`].
    pub fn learn_type(&mut self, uri: &str, definition: &Value) -> Result<()> {
        if self.types.contains_key(uri) {
            return Err(Error::AlreadyRegistered(uri.to_string()));
        }

        let checker = self.compile_checker(definition)?;
        debug!("Registered type {} as {}", uri, checker.type_name());
        self.types.insert(uri.to_string(), Arc::new(checker));
        Ok(())
    }

    /// Compile a definition into a validator
    ///
    /// # Errors
    ///
    /// Fails if the definition is invalid or references an unknown type.
    pub fn compile(&self, definition: &Value) -> Result<Validator> {
        Ok(Validator::new(self.compile_checker(definition)?))
    }

    /// Resolve a type name (`//str`, `/app/Tag` or a full URI) to its URI
    ///
    /// # Errors
    ///
    /// Fails for malformed names and unregistered prefixes.
    pub fn expand(&self, type_name: &str) -> Result<String> {
        if URI_PATTERN.is_match(type_name) {
            return Ok(type_name.to_string());
        }

        let captures = TYPE_NAME_PATTERN
            .captures(type_name)
            .ok_or_else(|| Error::InvalidTypeName(type_name.to_string()))?;
        let prefix = &captures[1];
        let suffix = &captures[2];

        let base = self
            .namespaces
            .get(prefix)
            .ok_or_else(|| Error::UnknownPrefix {
                prefix: prefix.to_string(),
                name: type_name.to_string(),
            })?;
        Ok(format!("{base}{suffix}"))
    }

    #[must_use]
    pub fn contains(&self, uri: &str) -> bool {
        self.types.contains_key(uri)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Registered URIs in lexical order
    pub fn uris(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// The namespaces this registry resolves prefixes through
    #[must_use]
    pub fn namespaces(&self) -> &NamespaceRegistry {
        self.namespaces
    }

    fn compile_checker(&self, schema: &Value) -> Result<Checker> {
        let (type_name, params) = match schema {
            Value::String(name) => (name.as_str(), None),
            Value::Mapping(mapping) => {
                let name = mapping
                    .get("type")
                    .and_then(Value::as_str)
                    .ok_or_else(|| Error::invalid_schema("type definition has no 'type' name"))?;
                (name, Some(mapping))
            }
            Value::Tagged(tagged) => return self.compile_checker(&tagged.value),
            other => {
                return Err(Error::invalid_schema(format!(
                    "expected a type name or mapping, found {}",
                    value_kind(other)
                )));
            }
        };

        let uri = self.expand(type_name)?;
        trace!("Compiling {} ({})", type_name, uri);

        if let Some(core) = uri.strip_prefix(CORE_URI) {
            let empty = Mapping::new();
            return self.compile_core(core, params.unwrap_or(&empty));
        }

        match self.types.get(&uri) {
            Some(inner) => {
                if params.is_some_and(|p| p.len() > 1) {
                    return Err(Error::invalid_schema(format!(
                        "composed type '{type_name}' does not take check arguments"
                    )));
                }
                Ok(Checker::Custom {
                    uri,
                    inner: Arc::clone(inner),
                })
            }
            None => Err(Error::UnknownType { uri }),
        }
    }

    fn compile_core(&self, name: &str, params: &Mapping) -> Result<Checker> {
        let checker = match name {
            "any" => {
                allow_params(name, params, &["of"])?;
                match params.get("of") {
                    Some(of) => Checker::Any(Some(self.compile_list(name, "of", of)?)),
                    None => Checker::Any(None),
                }
            }
            "all" => {
                allow_params(name, params, &["of"])?;
                let of = required_param(name, params, "of")?;
                Checker::All(self.compile_list(name, "of", of)?)
            }
            "arr" => {
                allow_params(name, params, &["contents", "length"])?;
                Checker::Arr {
                    contents: Box::new(self.compile_checker(required_param(name, params, "contents")?)?),
                    length: params.get("length").map(|l| parse_length(name, l)).transpose()?,
                }
            }
            "bool" | "def" | "fail" | "nil" | "one" => {
                allow_params(name, params, &[])?;
                match name {
                    "bool" => Checker::Bool,
                    "def" => Checker::Def,
                    "fail" => Checker::Fail,
                    "nil" => Checker::Nil,
                    _ => Checker::One,
                }
            }
            "int" | "num" => {
                allow_params(name, params, &["range", "value"])?;
                let range = params.get("range").map(|r| parse_range(name, r)).transpose()?;
                let value = params.get("value").map(|v| parse_number(name, "value", v)).transpose()?;
                if name == "int" {
                    if value.is_some_and(|v| v.fract() != 0.0) {
                        return Err(Error::invalid_schema("//int 'value' must be an integer"));
                    }
                    Checker::Int { range, value }
                } else {
                    Checker::Num { range, value }
                }
            }
            "map" => {
                allow_params(name, params, &["values"])?;
                Checker::Map {
                    values: Box::new(self.compile_checker(required_param(name, params, "values")?)?),
                }
            }
            "rec" => {
                allow_params(name, params, &["required", "optional", "rest"])?;
                let required = self.compile_fields(name, "required", params.get("required"))?;
                let optional = self.compile_fields(name, "optional", params.get("optional"))?;
                if let Some((key, _)) = required
                    .iter()
                    .find(|(key, _)| optional.iter().any(|(other, _)| other == key))
                {
                    return Err(Error::invalid_schema(format!(
                        "//rec entry '{key}' is both required and optional"
                    )));
                }
                let rest = params
                    .get("rest")
                    .map(|r| self.compile_checker(r).map(Box::new))
                    .transpose()?;
                Checker::Rec {
                    required,
                    optional,
                    rest,
                }
            }
            "seq" => {
                allow_params(name, params, &["contents", "tail"])?;
                let contents = required_param(name, params, "contents")?
                    .as_sequence()
                    .ok_or_else(|| Error::invalid_schema("//seq 'contents' must be a sequence"))?
                    .iter()
                    .map(|schema| self.compile_checker(schema))
                    .collect::<Result<Vec<_>>>()?;
                let tail = params
                    .get("tail")
                    .map(|t| self.compile_checker(t).map(Box::new))
                    .transpose()?;
                Checker::Seq { contents, tail }
            }
            "str" => {
                allow_params(name, params, &["value", "length"])?;
                let value = params
                    .get("value")
                    .map(|v| {
                        v.as_str()
                            .map(str::to_string)
                            .ok_or_else(|| Error::invalid_schema("//str 'value' must be a string"))
                    })
                    .transpose()?;
                Checker::Str {
                    value,
                    length: params.get("length").map(|l| parse_length(name, l)).transpose()?,
                }
            }
            other => {
                return Err(Error::UnknownType {
                    uri: format!("{CORE_URI}{other}"),
                });
            }
        };
        Ok(checker)
    }

    fn compile_list(&self, type_name: &str, param: &str, schemas: &Value) -> Result<Vec<Checker>> {
        let items = schemas.as_sequence().ok_or_else(|| {
            Error::invalid_schema(format!("//{type_name} '{param}' must be a sequence"))
        })?;
        if items.is_empty() {
            return Err(Error::invalid_schema(format!(
                "//{type_name} '{param}' must not be empty"
            )));
        }
        items.iter().map(|schema| self.compile_checker(schema)).collect()
    }

    fn compile_fields(
        &self,
        type_name: &str,
        param: &str,
        fields: Option<&Value>,
    ) -> Result<Vec<(String, Checker)>> {
        let Some(fields) = fields else {
            return Ok(Vec::new());
        };
        let mapping = fields.as_mapping().ok_or_else(|| {
            Error::invalid_schema(format!("//{type_name} '{param}' must be a mapping"))
        })?;

        mapping
            .iter()
            .map(|(key, schema)| {
                let key = key.as_str().ok_or_else(|| {
                    Error::invalid_schema(format!("//{type_name} '{param}' keys must be strings"))
                })?;
                Ok((key.to_string(), self.compile_checker(schema)?))
            })
            .collect()
    }
}

/// A compiled root type ready to check data
#[derive(Debug, Clone)]
pub struct Validator {
    checker: Checker,
    config: ValidationConfig,
}

impl Validator {
    #[must_use]
    pub fn new(checker: Checker) -> Self {
        Self {
            checker,
            config: ValidationConfig::default(),
        }
    }

    /// Create with specific configuration
    #[must_use]
    pub fn with_config(mut self, config: ValidationConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn checker(&self) -> &Checker {
        &self.checker
    }

    /// Validate a data value, honouring the error limits of the configuration
    #[must_use]
    pub fn validate(&self, value: &Value) -> ValidationResult {
        let mut issues = self.checker.check(value, "$");

        if !self.config.continue_on_error {
            issues.truncate(1);
        }
        if self.config.max_errors > 0 {
            issues.truncate(self.config.max_errors);
        }

        let mut result = ValidationResult::valid();
        for issue in issues {
            result.add_error(issue);
        }
        result
    }

    #[must_use]
    pub fn is_valid(&self, value: &Value) -> bool {
        self.checker.is_valid(value)
    }
}

fn allow_params(type_name: &str, params: &Mapping, allowed: &[&str]) -> Result<()> {
    for key in params.keys() {
        let Some(key) = key.as_str() else {
            return Err(Error::invalid_schema(format!(
                "//{type_name} parameters must be named by strings"
            )));
        };
        if key != "type" && !allowed.contains(&key) {
            return Err(Error::invalid_schema(format!(
                "unknown parameter '{key}' for //{type_name}"
            )));
        }
    }
    Ok(())
}

fn required_param<'a>(type_name: &str, params: &'a Mapping, param: &str) -> Result<&'a Value> {
    params.get(param).ok_or_else(|| {
        Error::invalid_schema(format!("//{type_name} requires the '{param}' parameter"))
    })
}

fn parse_number(type_name: &str, param: &str, value: &Value) -> Result<f64> {
    value.as_f64().ok_or_else(|| {
        Error::invalid_schema(format!("//{type_name} '{param}' must be a number"))
    })
}

fn parse_range(type_name: &str, value: &Value) -> Result<Range> {
    let mapping = value
        .as_mapping()
        .ok_or_else(|| Error::invalid_schema(format!("//{type_name} 'range' must be a mapping")))?;
    allow_params(type_name, mapping, &["min", "max", "min-ex", "max-ex"])?;

    let bound = |key: &str| {
        mapping
            .get(key)
            .map(|v| parse_number(type_name, key, v))
            .transpose()
    };
    Ok(Range {
        min: bound("min")?,
        max: bound("max")?,
        min_ex: bound("min-ex")?,
        max_ex: bound("max-ex")?,
    })
}

fn parse_length(type_name: &str, value: &Value) -> Result<Range> {
    let mapping = value
        .as_mapping()
        .ok_or_else(|| Error::invalid_schema(format!("//{type_name} 'length' must be a mapping")))?;
    allow_params(type_name, mapping, &["min", "max"])?;

    let bound = |key: &str| -> Result<Option<f64>> {
        match mapping.get(key) {
            None => Ok(None),
            Some(v) => match v.as_u64() {
                #[allow(clippy::cast_precision_loss)]
                Some(n) => Ok(Some(n as f64)),
                None => Err(Error::invalid_schema(format!(
                    "//{type_name} length '{key}' must be a non-negative integer"
                ))),
            },
        }
    };
    Ok(Range {
        min: bound("min")?,
        max: bound("max")?,
        ..Range::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    fn namespaces() -> NamespaceRegistry {
        let mut namespaces = NamespaceRegistry::default();
        namespaces.register_tag("/app");
        namespaces
    }

    #[test]
    fn test_expand() {
        let ns = namespaces();
        let types = TypeRegistry::new(&ns);

        assert_eq!(types.expand("//str").unwrap(), format!("{CORE_URI}str"));
        assert_eq!(types.expand("/app/Tag").unwrap(), "tag:local:app/Tag");
        assert_eq!(types.expand("tag:local:app/Tag").unwrap(), "tag:local:app/Tag");
        assert!(matches!(
            types.expand("/nope/Tag"),
            Err(Error::UnknownPrefix { .. })
        ));
        assert!(matches!(types.expand("Tag"), Err(Error::InvalidTypeName(_))));
    }

    #[test]
    fn test_register_in_dependency_order() {
        let ns = namespaces();
        let mut types = TypeRegistry::new(&ns);

        let uri = types.register_type("/app/Tag", &yaml("type: //str")).unwrap();
        assert_eq!(uri, "tag:local:app/Tag");
        types
            .register_type("/app", &yaml("{type: //rec, required: {name: //str, tag: /app/Tag}}"))
            .unwrap();

        assert_eq!(types.len(), 2);
        assert_eq!(
            types.uris().collect::<Vec<_>>(),
            vec!["tag:local:app", "tag:local:app/Tag"]
        );
    }

    #[test]
    fn test_out_of_order_registration_is_rejected() {
        let ns = namespaces();
        let mut types = TypeRegistry::new(&ns);

        let result = types.register_type(
            "/app",
            &yaml("{type: //rec, required: {tag: /app/Tag}}"),
        );
        assert_eq!(
            result.unwrap_err(),
            Error::UnknownType {
                uri: "tag:local:app/Tag".to_string()
            }
        );
        assert!(types.is_empty());
    }

    #[test]
    fn test_duplicate_registration() {
        let ns = namespaces();
        let mut types = TypeRegistry::new(&ns);
        types.register_type("/app/Tag", &yaml("type: //str")).unwrap();
        assert!(matches!(
            types.register_type("/app/Tag", &yaml("type: //int")),
            Err(Error::AlreadyRegistered(_))
        ));
    }

    #[test]
    fn test_invalid_definitions() {
        let ns = namespaces();
        let types = TypeRegistry::new(&ns);

        for (definition, expected) in [
            ("type: //str\nbogus: 1", "unknown parameter 'bogus' for //str"),
            ("type: //arr", "//arr requires the 'contents' parameter"),
            ("{type: //all, of: []}", "//all 'of' must not be empty"),
            ("{type: //int, value: 1.5}", "//int 'value' must be an integer"),
            ("{type: //str, length: {min: -1}}", "//str length 'min' must be a non-negative integer"),
            ("{type: //rec, required: {a: //str}, optional: {a: //int}}", "//rec entry 'a' is both required and optional"),
            ("{required: {a: //str}}", "type definition has no 'type' name"),
            ("42", "expected a type name or mapping, found integer"),
        ] {
            match types.compile(&yaml(definition)) {
                Err(Error::InvalidSchema(message)) => assert_eq!(message, expected),
                other => panic!("Expected InvalidSchema for {definition:?}, got {other:?}"),
            }
        }

        assert!(matches!(
            types.compile(&yaml("//nope")),
            Err(Error::UnknownType { .. })
        ));
    }

    #[test]
    fn test_custom_type_takes_no_arguments() {
        let ns = namespaces();
        let mut types = TypeRegistry::new(&ns);
        types.register_type("/app/Tag", &yaml("type: //str")).unwrap();

        assert!(types.compile(&yaml("type: /app/Tag")).is_ok());
        assert!(matches!(
            types.compile(&yaml("{type: /app/Tag, length: {max: 2}}")),
            Err(Error::InvalidSchema(_))
        ));
    }

    #[test]
    fn test_validate_root_and_tag() {
        let ns = namespaces();
        let mut types = TypeRegistry::new(&ns);
        let root = yaml("{type: //rec, required: {name: //str, tag: /app/Tag}}");
        types.register_type("/app/Tag", &yaml("type: //str")).unwrap();
        types.register_type("/app", &root).unwrap();

        let validator = types.compile(&root).unwrap();

        let good = serde_yaml::to_value(json!({"name": "x", "tag": "v1"})).unwrap();
        assert!(validator.validate(&good).is_valid);

        let bad = serde_yaml::to_value(json!({"name": "x", "tag": 5})).unwrap();
        let result = validator.validate(&bad);
        assert!(!result.is_valid);
        assert_eq!(result.errors[0].path, "$.tag");
        assert_eq!(result.errors[0].message, "expected //str, found integer");
    }

    #[test]
    fn test_error_limits() {
        let ns = namespaces();
        let types = TypeRegistry::new(&ns);
        let validator = types
            .compile(&yaml("{type: //rec, required: {a: //int, b: //int, c: //int}}"))
            .unwrap();
        let data = yaml("{a: x, b: y, c: z}");

        assert_eq!(validator.validate(&data).errors.len(), 3);

        let first_only = validator.clone().with_config(ValidationConfig {
            continue_on_error: false,
            ..ValidationConfig::default()
        });
        assert_eq!(first_only.validate(&data).errors.len(), 1);

        let capped = validator.with_config(ValidationConfig {
            max_errors: 2,
            ..ValidationConfig::default()
        });
        assert_eq!(capped.validate(&data).errors.len(), 2);
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: ValidationConfig = serde_yaml::from_str("max_errors: 5").unwrap();
        assert!(config.continue_on_error);
        assert_eq!(config.max_errors, 5);
    }
}
