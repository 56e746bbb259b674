//! Query descriptors and filter predicates.
//!
//! The paging helpers treat a [`Query`] as opaque. Stores interpret its
//! [`Filter`]: the HTTP store renders it as an OData `$filter` expression and
//! the file store evaluates it against each entity.

use std::cmp::Ordering;
use std::fmt;

use chrono::SecondsFormat;

use crate::entity::{Entity, PropertyValue};
use crate::types::TableName;

/// A comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    /// The OData keyword for this operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "eq",
            CompareOp::Ne => "ne",
            CompareOp::Gt => "gt",
            CompareOp::Ge => "ge",
            CompareOp::Lt => "lt",
            CompareOp::Le => "le",
        }
    }

    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
        }
    }
}

/// A predicate over entity properties.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Compare a property against a literal.
    Compare {
        property: String,
        op: CompareOp,
        value: PropertyValue,
    },
    /// Both sides must hold.
    And(Box<Filter>, Box<Filter>),
    /// Either side must hold.
    Or(Box<Filter>, Box<Filter>),
    /// Negation.
    Not(Box<Filter>),
}

impl Filter {
    /// Compare `property` against `value` with `op`.
    pub fn compare(property: impl Into<String>, op: CompareOp, value: impl Into<PropertyValue>) -> Self {
        Filter::Compare {
            property: property.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(property: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Self::compare(property, CompareOp::Eq, value)
    }

    pub fn gt(property: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Self::compare(property, CompareOp::Gt, value)
    }

    pub fn ge(property: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Self::compare(property, CompareOp::Ge, value)
    }

    pub fn lt(property: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Self::compare(property, CompareOp::Lt, value)
    }

    pub fn le(property: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Self::compare(property, CompareOp::Le, value)
    }

    /// Combine with `other` so that both must hold.
    pub fn and(self, other: Filter) -> Self {
        Filter::And(Box::new(self), Box::new(other))
    }

    /// Combine with `other` so that either may hold.
    pub fn or(self, other: Filter) -> Self {
        Filter::Or(Box::new(self), Box::new(other))
    }

    /// Negate this filter.
    pub fn negate(self) -> Self {
        Filter::Not(Box::new(self))
    }

    /// Evaluate against an entity.
    ///
    /// A comparison on a missing property, or against a value of an
    /// unrelated type, does not match.
    pub fn matches(&self, entity: &Entity) -> bool {
        match self {
            Filter::Compare {
                property,
                op,
                value,
            } => entity
                .resolve(property)
                .and_then(|actual| actual.compare(value))
                .is_some_and(|ordering| op.accepts(ordering)),
            Filter::And(a, b) => a.matches(entity) && b.matches(entity),
            Filter::Or(a, b) => a.matches(entity) || b.matches(entity),
            Filter::Not(inner) => !inner.matches(entity),
        }
    }

    /// Render as an OData `$filter` expression.
    pub fn to_odata(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Compare {
                property,
                op,
                value,
            } => write!(f, "{} {} {}", property, op.as_str(), ODataLiteral(value)),
            Filter::And(a, b) => write!(f, "({}) and ({})", a, b),
            Filter::Or(a, b) => write!(f, "({}) or ({})", a, b),
            Filter::Not(inner) => write!(f, "not ({})", inner),
        }
    }
}

struct ODataLiteral<'a>(&'a PropertyValue);

impl fmt::Display for ODataLiteral<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            PropertyValue::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            PropertyValue::DateTime(dt) => write!(
                f,
                "datetime'{}'",
                dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
            ),
            PropertyValue::Int32(v) => write!(f, "{}", v),
            PropertyValue::Int64(v) => write!(f, "{}L", v),
            PropertyValue::Double(v) => write!(f, "{:?}", v),
            PropertyValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// A query against one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Table to read from.
    pub table: TableName,

    /// Optional predicate; `None` selects every entity.
    pub filter: Option<Filter>,

    /// Maximum number of entities per page.
    pub take: Option<u32>,
}

impl Query {
    /// Select every entity of `table`.
    pub fn new(table: TableName) -> Self {
        Self {
            table,
            filter: None,
            take: None,
        }
    }

    /// Restrict the query with a filter.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Limit the page size.
    pub fn with_take(mut self, take: u32) -> Self {
        self.take = Some(take);
        self
    }

    /// Check an entity against the filter.
    pub fn matches(&self, entity: &Entity) -> bool {
        self.filter.as_ref().is_none_or(|filter| filter.matches(entity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn entity_with_date(year: i32) -> Entity {
        let mut entity = Entity::new("Sample", format!("row{}", year)).unwrap();
        entity
            .insert("NextDate", Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap())
            .unwrap();
        entity
    }

    #[test]
    fn renders_date_filter() {
        let filter = Filter::gt("NextDate", Utc.with_ymd_and_hms(2019, 2, 22, 0, 0, 0).unwrap());
        assert_eq!(filter.to_odata(), "NextDate gt datetime'2019-02-22T00:00:00Z'");
    }

    #[test]
    fn renders_combinators_and_literals() {
        let filter = Filter::eq("PartitionKey", "O'Brien")
            .and(Filter::lt("Count", 10i64))
            .or(Filter::eq("Done", true).negate());
        assert_eq!(
            filter.to_odata(),
            "((PartitionKey eq 'O''Brien') and (Count lt 10L)) or (not (Done eq true))"
        );
    }

    #[test]
    fn renders_double_with_fraction() {
        assert_eq!(Filter::ge("Score", 2.0).to_odata(), "Score ge 2.0");
    }

    #[test]
    fn evaluates_date_range() {
        let after = Filter::gt("NextDate", Utc.with_ymd_and_hms(2000, 6, 1, 0, 0, 0).unwrap());
        let before = Filter::lt("NextDate", Utc.with_ymd_and_hms(2010, 1, 1, 0, 0, 0).unwrap());
        let range = after.and(before);

        assert!(!range.matches(&entity_with_date(1999)));
        assert!(range.matches(&entity_with_date(2005)));
        assert!(!range.matches(&entity_with_date(2010)));
    }

    #[test]
    fn missing_property_does_not_match() {
        let entity = Entity::new("Sample", "1").unwrap();
        assert!(!Filter::eq("Absent", "x").matches(&entity));
        assert!(Filter::eq("Absent", "x").negate().matches(&entity));
    }

    #[test]
    fn filters_on_keys() {
        let entity = entity_with_date(2001);
        assert!(Filter::eq("RowKey", "row2001").matches(&entity));
    }

    #[test]
    fn query_without_filter_matches_everything() {
        let query = Query::new(TableName::new("Test").unwrap());
        assert!(query.matches(&entity_with_date(1900)));
    }
}
