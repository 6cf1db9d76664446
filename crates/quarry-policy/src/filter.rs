//! Structured predicate and sort-key grammar.
//!
//! Callers never send SQL text. A `where` argument is a JSON tree whose every
//! node maps to exactly one parameter-bound fragment:
//!
//! ```json
//! {"all": [
//!   {"field": "user_id", "op": "=", "value": 42},
//!   {"any": [
//!     {"field": "status", "op": "in", "value": ["paid", "shipped"]},
//!     {"field": "refunded_at", "op": "is_null"}
//!   ]}
//! ]}
//! ```
//!
//! A JSON array is shorthand for `all`, and a plain `{column: value}` object is
//! an equality conjunction.

use quarry_core::is_valid_identifier;
use serde_json::{Map, Value};

use crate::compiler::SqlValue;
use crate::error::ValidationError;

/// Bounds on the size of a predicate tree.
#[derive(Debug, Clone, Copy)]
pub struct FilterLimits {
    pub max_depth: usize,
    pub max_predicates: usize,
    pub max_in_values: usize,
}

impl Default for FilterLimits {
    fn default() -> Self {
        Self {
            max_depth: 8,
            max_predicates: 64,
            max_in_values: 256,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
}

impl CompareOp {
    pub fn sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Like => "LIKE",
        }
    }
}

/// Operator as written by the caller, before the value shape is checked.
enum OpToken {
    Compare(CompareOp),
    In,
    IsNull,
    IsNotNull,
}

fn parse_op(op: &str) -> Option<OpToken> {
    let token = match op.to_ascii_lowercase().as_str() {
        "=" | "==" | "eq" => OpToken::Compare(CompareOp::Eq),
        "!=" | "<>" | "ne" => OpToken::Compare(CompareOp::Ne),
        ">" | "gt" => OpToken::Compare(CompareOp::Gt),
        ">=" | "gte" => OpToken::Compare(CompareOp::Gte),
        "<" | "lt" => OpToken::Compare(CompareOp::Lt),
        "<=" | "lte" => OpToken::Compare(CompareOp::Lte),
        "like" => OpToken::Compare(CompareOp::Like),
        "in" => OpToken::In,
        "is_null" => OpToken::IsNull,
        "is_not_null" => OpToken::IsNotNull,
        _ => return None,
    };
    Some(token)
}

/// Predicate tree. Field names have passed the identifier charset but not
/// yet the table whitelist; the compiler checks that.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Compare {
        field: String,
        op: CompareOp,
        value: SqlValue,
    },
    In {
        field: String,
        values: Vec<SqlValue>,
    },
    IsNull {
        field: String,
    },
    IsNotNull {
        field: String,
    },
    All(Vec<Filter>),
    Any(Vec<Filter>),
}

impl Filter {
    /// Parse a `where` argument. `null` and `{}` mean no filter.
    pub fn from_json(value: &Value, limits: &FilterLimits) -> Result<Option<Filter>, ValidationError> {
        match value {
            Value::Null => Ok(None),
            Value::Object(map) if map.is_empty() => Ok(None),
            _ => {
                let mut parser = Parser {
                    limits,
                    predicates: 0,
                };
                parser.parse(value, 1).map(Some)
            }
        }
    }

    /// Every field referenced anywhere in the tree.
    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Filter::Compare { field, .. }
            | Filter::In { field, .. }
            | Filter::IsNull { field }
            | Filter::IsNotNull { field } => out.push(field),
            Filter::All(children) | Filter::Any(children) => {
                for child in children {
                    child.collect_fields(out);
                }
            }
        }
    }
}

struct Parser<'a> {
    limits: &'a FilterLimits,
    predicates: usize,
}

impl Parser<'_> {
    fn parse(&mut self, value: &Value, depth: usize) -> Result<Filter, ValidationError> {
        if depth > self.limits.max_depth {
            return Err(ValidationError::invalid_filter(format!(
                "filter nesting exceeds {} levels",
                self.limits.max_depth
            )));
        }
        match value {
            Value::Array(items) => Ok(Filter::All(self.parse_group(items, depth)?)),
            Value::Object(map) => {
                if map.contains_key("all") || map.contains_key("any") {
                    self.parse_combinator(map, depth)
                } else if is_predicate_object(map) {
                    self.parse_predicate(map)
                } else {
                    self.parse_equality_map(map)
                }
            }
            _ => Err(ValidationError::invalid_filter(
                "filter must be an object or an array of filters",
            )),
        }
    }

    fn parse_group(&mut self, items: &[Value], depth: usize) -> Result<Vec<Filter>, ValidationError> {
        if items.is_empty() {
            return Err(ValidationError::invalid_filter("filter group must not be empty"));
        }
        items.iter().map(|item| self.parse(item, depth + 1)).collect()
    }

    fn parse_combinator(&mut self, map: &Map<String, Value>, depth: usize) -> Result<Filter, ValidationError> {
        if map.len() != 1 {
            return Err(ValidationError::invalid_filter(
                "'all'/'any' must be the only key of its object",
            ));
        }
        let (key, children) = map
            .iter()
            .next()
            .ok_or_else(|| ValidationError::invalid_filter("empty filter object"))?;
        let Value::Array(items) = children else {
            return Err(ValidationError::invalid_filter(format!(
                "'{}' expects an array of filters",
                key
            )));
        };
        let children = self.parse_group(items, depth)?;
        Ok(if key == "all" {
            Filter::All(children)
        } else {
            Filter::Any(children)
        })
    }

    fn parse_predicate(&mut self, map: &Map<String, Value>) -> Result<Filter, ValidationError> {
        let field = map
            .get("field")
            .and_then(Value::as_str)
            .ok_or_else(|| ValidationError::invalid_filter("'field' must be a string"))?;
        let field = checked_field(field)?;

        let op = match map.get("op") {
            None => OpToken::Compare(CompareOp::Eq),
            Some(Value::String(op)) => parse_op(op).ok_or_else(|| {
                ValidationError::invalid_filter(
                    "unsupported operator; expected one of =, !=, >, >=, <, <=, like, in, is_null, is_not_null",
                )
            })?,
            Some(_) => return Err(ValidationError::invalid_filter("'op' must be a string")),
        };
        let value = map.get("value").unwrap_or(&Value::Null);

        let filter = match op {
            OpToken::IsNull | OpToken::IsNotNull => {
                if !value.is_null() {
                    return Err(ValidationError::invalid_filter(
                        "is_null/is_not_null take no value",
                    ));
                }
                if matches!(op, OpToken::IsNull) {
                    Filter::IsNull { field }
                } else {
                    Filter::IsNotNull { field }
                }
            }
            OpToken::In => {
                let Value::Array(items) = value else {
                    return Err(ValidationError::invalid_filter("'in' expects an array value"));
                };
                if items.is_empty() || items.len() > self.limits.max_in_values {
                    return Err(ValidationError::invalid_filter(format!(
                        "'in' expects between 1 and {} values",
                        self.limits.max_in_values
                    )));
                }
                let values = items.iter().map(scalar).collect::<Result<Vec<_>, _>>()?;
                Filter::In { field, values }
            }
            OpToken::Compare(op) => {
                let value = scalar(value)?;
                if op == CompareOp::Like && !matches!(value, SqlValue::Text(_)) {
                    return Err(ValidationError::invalid_filter("'like' expects a string pattern"));
                }
                Filter::Compare { field, op, value }
            }
        };
        self.count(1)?;
        Ok(filter)
    }

    fn parse_equality_map(&mut self, map: &Map<String, Value>) -> Result<Filter, ValidationError> {
        let mut children = Vec::with_capacity(map.len());
        for (field, value) in map {
            children.push(Filter::Compare {
                field: checked_field(field)?,
                op: CompareOp::Eq,
                value: scalar(value)?,
            });
        }
        self.count(children.len())?;
        Ok(if children.len() == 1 {
            children.remove(0)
        } else {
            Filter::All(children)
        })
    }

    fn count(&mut self, n: usize) -> Result<(), ValidationError> {
        self.predicates += n;
        if self.predicates > self.limits.max_predicates {
            return Err(ValidationError::invalid_filter(format!(
                "filter has more than {} predicates",
                self.limits.max_predicates
            )));
        }
        Ok(())
    }
}

/// `{"field": "...", "op": ..., "value": ...}` as opposed to a `{column: value}` map.
fn is_predicate_object(map: &Map<String, Value>) -> bool {
    matches!(map.get("field"), Some(Value::String(_)))
        && map.keys().all(|k| matches!(k.as_str(), "field" | "op" | "value"))
}

fn checked_field(field: &str) -> Result<String, ValidationError> {
    if is_valid_identifier(field) {
        Ok(field.to_string())
    } else {
        Err(ValidationError::invalid_filter(
            "filter field is not a valid column name",
        ))
    }
}

fn scalar(value: &Value) -> Result<SqlValue, ValidationError> {
    match value {
        Value::Null => Err(ValidationError::invalid_filter(
            "null values are not comparable; use the is_null operator",
        )),
        other => SqlValue::from_json(other).ok_or_else(|| {
            ValidationError::invalid_filter("filter values must be strings, numbers or booleans")
        }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub direction: SortDirection,
}

impl OrderBy {
    /// Parse an `order_by` argument: `"col"`, `"-col"`, `"col desc"`,
    /// `{"column": "col", "direction": "desc"}`, or a list of those.
    pub fn from_json(value: &Value) -> Result<Vec<OrderBy>, ValidationError> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => items.iter().map(Self::parse_one).collect(),
            other => Ok(vec![Self::parse_one(other)?]),
        }
    }

    fn parse_one(value: &Value) -> Result<OrderBy, ValidationError> {
        match value {
            Value::String(s) => Self::parse_str(s),
            Value::Object(map) => {
                let column = map
                    .get("column")
                    .and_then(Value::as_str)
                    .ok_or_else(|| ValidationError::invalid_order_by("sort key needs a 'column' string"))?;
                let direction = match map.get("direction") {
                    None | Some(Value::Null) => SortDirection::Asc,
                    Some(Value::String(d)) => parse_direction(d)?,
                    Some(_) => {
                        return Err(ValidationError::invalid_order_by("'direction' must be a string"));
                    }
                };
                Ok(OrderBy {
                    column: checked_sort_column(column)?,
                    direction,
                })
            }
            _ => Err(ValidationError::invalid_order_by(
                "sort key must be a column name or an object",
            )),
        }
    }

    fn parse_str(s: &str) -> Result<OrderBy, ValidationError> {
        let s = s.trim();
        let mut parts = s.split_whitespace();
        let head = parts.next().unwrap_or_default();
        let explicit = parts.next();
        if parts.next().is_some() {
            return Err(ValidationError::invalid_order_by("sort key has unexpected tokens"));
        }

        let (column, mut direction) = if let Some(rest) = head.strip_prefix('-') {
            (rest, SortDirection::Desc)
        } else if let Some(rest) = head.strip_prefix('+') {
            (rest, SortDirection::Asc)
        } else {
            (head, SortDirection::Asc)
        };
        if let Some(d) = explicit {
            direction = parse_direction(d)?;
        }
        Ok(OrderBy {
            column: checked_sort_column(column)?,
            direction,
        })
    }
}

fn parse_direction(d: &str) -> Result<SortDirection, ValidationError> {
    if d.eq_ignore_ascii_case("asc") {
        Ok(SortDirection::Asc)
    } else if d.eq_ignore_ascii_case("desc") {
        Ok(SortDirection::Desc)
    } else {
        Err(ValidationError::invalid_order_by("direction must be 'asc' or 'desc'"))
    }
}

fn checked_sort_column(column: &str) -> Result<String, ValidationError> {
    if is_valid_identifier(column) {
        Ok(column.to_string())
    } else {
        Err(ValidationError::invalid_order_by(
            "sort key is not a valid column name",
        ))
    }
}
