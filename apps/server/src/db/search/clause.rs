//! Clause composer: validates one raw filter parameter into typed clauses.
//!
//! Every raw parameter (a JSON string as received from the client) is parsed and
//! validated in full before any clause is returned, so a malformed entry for
//! one field rejects the whole parameter. The resulting clauses are
//! self-contained; the storage layer renders or evaluates each one without
//! looking at the others.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Map, Value as JsonValue};

use super::text::tokenize;
use crate::{Error, Result};

/// One fragment of the combined search predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Collection(CollectionClause),
    Contains(ContainsClause),
    Range(RangeClause),
    FullText(FullTextClause),
    Phrase(PhraseClause),
    Deleted(DeletedMode),
}

impl Clause {
    /// Label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Clause::Collection(_) => "collection",
            Clause::Contains(_) => "contains",
            Clause::Range(_) => "range",
            Clause::FullText(_) => "fts",
            Clause::Phrase(_) => "fts_phrase",
            Clause::Deleted(_) => "deleted",
        }
    }
}

/// Restricts to annotations whose collection slug equals `slug` exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionClause {
    pub slug: String,
}

/// Restricts to annotations whose document structurally contains `pattern`.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainsClause {
    pub pattern: JsonValue,
}

/// Dot-separated path into the annotation document, e.g. `body.source`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPath(Vec<String>);

impl DataPath {
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(Error::invalid_query("field path must not be empty"));
        }
        let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(Error::invalid_query(format!(
                "field path '{raw}' has an empty segment"
            )));
        }
        Ok(Self(segments))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Resolve the path against a document.
    pub fn lookup<'a>(&self, data: &'a JsonValue) -> Option<&'a JsonValue> {
        self.0
            .iter()
            .try_fold(data, |current, segment| current.get(segment.as_str()))
    }
}

impl std::fmt::Display for DataPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// Field addressed by a range constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeField {
    /// The record's creation timestamp
    Created,
    /// The record's modification timestamp (records never modified do not match)
    Modified,
    Data(DataPath),
}

impl RangeField {
    fn parse(raw: &str) -> Result<Self> {
        match raw {
            "created" => Ok(Self::Created),
            "modified" => Ok(Self::Modified),
            _ => Ok(Self::Data(DataPath::parse(raw)?)),
        }
    }

    fn is_timestamp(&self) -> bool {
        matches!(self, Self::Created | Self::Modified)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOp {
    Gt,
    Gte,
    Lt,
    Lte,
}

impl RangeOp {
    pub fn parse(key: &str) -> Option<Self> {
        match key {
            "gt" => Some(Self::Gt),
            "gte" => Some(Self::Gte),
            "lt" => Some(Self::Lt),
            "lte" => Some(Self::Lte),
            _ => None,
        }
    }

    pub fn sql_operator(&self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
        }
    }

    /// Apply the operator to an already computed ordering of `stored` vs `bound`.
    pub fn accepts(&self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            Self::Gt => ordering == Greater,
            Self::Gte => ordering != Less,
            Self::Lt => ordering == Less,
            Self::Lte => ordering != Greater,
        }
    }
}

/// Typed comparison bound. A stored value only matches a bound of its own type.
#[derive(Debug, Clone, PartialEq)]
pub enum RangeBound {
    Number(Decimal),
    Text(String),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

impl RangeBound {
    fn for_field(field: &RangeField, value: &JsonValue) -> Result<Self> {
        if field.is_timestamp() {
            let raw = value.as_str().ok_or_else(|| {
                Error::invalid_query(format!("bound for '{field:?}' must be an RFC 3339 string"))
            })?;
            let ts = DateTime::parse_from_rfc3339(raw).map_err(|e| {
                Error::invalid_query(format!("invalid timestamp bound '{raw}': {e}"))
            })?;
            return Ok(Self::Timestamp(ts.with_timezone(&Utc)));
        }

        match value {
            JsonValue::Number(n) => decimal_from_number(n)
                .map(Self::Number)
                .ok_or_else(|| Error::invalid_query(format!("numeric bound {n} is out of range"))),
            JsonValue::String(s) => Ok(Self::Text(s.clone())),
            JsonValue::Bool(b) => Ok(Self::Bool(*b)),
            other => Err(Error::invalid_query(format!(
                "range bound must be a number, string or boolean, got {other}"
            ))),
        }
    }
}

/// Exact decimal form of a JSON number, `None` when it cannot be represented.
pub fn decimal_from_number(n: &serde_json::Number) -> Option<Decimal> {
    let raw = n.to_string();
    Decimal::from_str_exact(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .ok()
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeClause {
    pub field: RangeField,
    pub op: RangeOp,
    pub bound: RangeBound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextOperator {
    /// Every term must match
    #[default]
    And,
    /// At least one term must match
    Or,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullTextClause {
    pub field: DataPath,
    /// Lowercased query words, in query order
    pub terms: Vec<String>,
    pub operator: TextOperator,
    /// Terms match as left-anchored prefixes of indexed words
    pub prefix: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhraseClause {
    pub field: DataPath,
    /// Lowercased phrase words, in order
    pub terms: Vec<String>,
    /// Word positions from one term to the next; 0 means adjacent
    pub distance: u32,
}

/// Soft-delete visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeletedMode {
    #[default]
    Exclude,
    Include,
    Only,
}

impl DeletedMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "exclude" => Some(Self::Exclude),
            "include" => Some(Self::Include),
            "only" => Some(Self::Only),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exclude => "exclude",
            Self::Include => "include",
            Self::Only => "only",
        }
    }

    /// Whether a record with the given flag is visible under this mode.
    pub fn admits(&self, deleted: bool) -> bool {
        match self {
            Self::Exclude => !deleted,
            Self::Include => true,
            Self::Only => deleted,
        }
    }
}

/// Restrict to one collection.
pub fn collection_clause(collection_id: &str) -> Clause {
    Clause::Collection(CollectionClause {
        slug: collection_id.to_string(),
    })
}

/// Restrict to documents containing `json_pattern`.
pub fn contains_clause(json_pattern: &str) -> Result<Clause> {
    let pattern = parse_json("contains", json_pattern)?;
    Ok(Clause::Contains(ContainsClause { pattern }))
}

/// One clause per operator of every field in `{field: {gte|lte|gt|lt: value}}`.
pub fn range_clauses(spec: &str) -> Result<Vec<Clause>> {
    let value = parse_json("range", spec)?;
    range_clauses_from_value(&value)
}

pub(crate) fn range_clauses_from_value(value: &JsonValue) -> Result<Vec<Clause>> {
    let fields = top_level_object("range", value)?;
    let mut clauses = Vec::new();
    for (raw_field, ops) in fields {
        let field = RangeField::parse(raw_field)?;
        let ops = ops.as_object().ok_or_else(|| {
            Error::invalid_query(format!(
                "range for '{raw_field}' must be an object of gte/lte/gt/lt bounds"
            ))
        })?;
        if ops.is_empty() {
            return Err(Error::invalid_query(format!(
                "range for '{raw_field}' has no operators"
            )));
        }
        for (key, bound) in ops {
            let op = RangeOp::parse(key).ok_or_else(|| {
                Error::invalid_query(format!(
                    "unknown range operator '{key}' for '{raw_field}' (expected gte, lte, gt or lt)"
                ))
            })?;
            clauses.push(Clause::Range(RangeClause {
                field: field.clone(),
                op,
                bound: RangeBound::for_field(&field, bound)?,
            }));
        }
    }
    Ok(clauses)
}

/// One clause per field of `{field: {query, operator?, prefix?}}`.
pub fn full_text_clauses(spec: &str) -> Result<Vec<Clause>> {
    let value = parse_json("fts", spec)?;
    full_text_clauses_from_value(&value)
}

pub(crate) fn full_text_clauses_from_value(value: &JsonValue) -> Result<Vec<Clause>> {
    let fields = top_level_object("fts", value)?;
    let mut clauses = Vec::new();
    for (raw_field, settings) in fields {
        let settings = field_settings("fts", raw_field, settings, &["query", "operator", "prefix"])?;
        let terms = query_terms("fts", raw_field, settings)?;

        let operator = match settings.get("operator") {
            None => TextOperator::default(),
            Some(JsonValue::String(op)) => match op.to_ascii_lowercase().as_str() {
                "and" => TextOperator::And,
                "or" => TextOperator::Or,
                _ => {
                    return Err(Error::invalid_query(format!(
                        "fts operator for '{raw_field}' must be 'and' or 'or', got '{op}'"
                    )))
                }
            },
            Some(other) => {
                return Err(Error::invalid_query(format!(
                    "fts operator for '{raw_field}' must be a string, got {other}"
                )))
            }
        };

        let prefix = match settings.get("prefix") {
            None => true,
            Some(JsonValue::Bool(b)) => *b,
            Some(other) => {
                return Err(Error::invalid_query(format!(
                    "fts prefix for '{raw_field}' must be a boolean, got {other}"
                )))
            }
        };

        clauses.push(Clause::FullText(FullTextClause {
            field: DataPath::parse(raw_field)?,
            terms,
            operator,
            prefix,
        }));
    }
    Ok(clauses)
}

/// One clause per field of `{field: {query, distance?}}`.
pub fn phrase_clauses(spec: &str) -> Result<Vec<Clause>> {
    let value = parse_json("fts_phrase", spec)?;
    phrase_clauses_from_value(&value)
}

pub(crate) fn phrase_clauses_from_value(value: &JsonValue) -> Result<Vec<Clause>> {
    let fields = top_level_object("fts_phrase", value)?;
    let mut clauses = Vec::new();
    for (raw_field, settings) in fields {
        let settings = field_settings("fts_phrase", raw_field, settings, &["query", "distance"])?;
        let terms = query_terms("fts_phrase", raw_field, settings)?;

        let distance = match settings.get("distance") {
            None => 0,
            Some(JsonValue::Number(n)) => n
                .as_u64()
                .and_then(|d| u32::try_from(d).ok())
                .ok_or_else(|| {
                    Error::invalid_query(format!(
                        "fts_phrase distance for '{raw_field}' must be a non-negative integer, got {n}"
                    ))
                })?,
            Some(other) => {
                return Err(Error::invalid_query(format!(
                    "fts_phrase distance for '{raw_field}' must be a number, got {other}"
                )))
            }
        };

        clauses.push(Clause::Phrase(PhraseClause {
            field: DataPath::parse(raw_field)?,
            terms,
            distance,
        }));
    }
    Ok(clauses)
}

/// Soft-delete visibility clause.
pub fn deleted_clause(mode: &str) -> Result<Clause> {
    DeletedMode::parse(mode).map(Clause::Deleted).ok_or_else(|| {
        Error::invalid_query(format!(
            "deleted must be one of exclude, include, only (got '{mode}')"
        ))
    })
}

fn parse_json(param: &str, raw: &str) -> Result<JsonValue> {
    serde_json::from_str(raw)
        .map_err(|e| Error::invalid_query(format!("{param} is not valid JSON: {e}")))
}

fn top_level_object<'a>(param: &str, value: &'a JsonValue) -> Result<&'a Map<String, JsonValue>> {
    value.as_object().ok_or_else(|| {
        Error::invalid_query(format!("{param} must be a JSON object keyed by field"))
    })
}

fn field_settings<'a>(
    param: &str,
    field: &str,
    settings: &'a JsonValue,
    allowed: &[&str],
) -> Result<&'a Map<String, JsonValue>> {
    let settings = settings.as_object().ok_or_else(|| {
        Error::invalid_query(format!("{param} settings for '{field}' must be an object"))
    })?;
    if let Some(unknown) = settings.keys().find(|k| !allowed.contains(&k.as_str())) {
        return Err(Error::invalid_query(format!(
            "unknown {param} setting '{unknown}' for '{field}'"
        )));
    }
    Ok(settings)
}

fn query_terms(param: &str, field: &str, settings: &Map<String, JsonValue>) -> Result<Vec<String>> {
    let query = match settings.get("query") {
        Some(JsonValue::String(q)) => q,
        Some(other) => {
            return Err(Error::invalid_query(format!(
                "{param} query for '{field}' must be a string, got {other}"
            )))
        }
        None => {
            return Err(Error::invalid_query(format!(
                "{param} settings for '{field}' are missing 'query'"
            )))
        }
    };
    let terms = tokenize(query);
    if terms.is_empty() {
        return Err(Error::invalid_query(format!(
            "{param} query for '{field}' contains no words"
        )));
    }
    Ok(terms)
}
