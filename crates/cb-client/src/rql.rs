//! RQL filter construction.
//!
//! The platform filters collections with RQL expressions passed in the query
//! string. Only the small predicate set this tool needs is modeled; the
//! pipeline treats a built filter as an opaque descriptor.

use std::fmt;

/// An ordered conjunction of RQL predicates.
///
/// Renders as a single predicate, or `and(...)` when more than one was
/// added. An empty filter renders as an empty string and is omitted from
/// request URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RqlFilter {
    exprs: Vec<String>,
}

impl RqlFilter {
    /// Creates an empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality predicate.
    pub fn eq(mut self, field: &str, value: impl fmt::Display) -> Self {
        self.exprs.push(format!("eq({},{})", field, value));
        self
    }

    /// Adds an inequality predicate.
    pub fn ne(mut self, field: &str, value: impl fmt::Display) -> Self {
        self.exprs.push(format!("ne({},{})", field, value));
        self
    }

    /// Adds a greater-or-equal predicate.
    pub fn ge(mut self, field: &str, value: impl fmt::Display) -> Self {
        self.exprs.push(format!("ge({},{})", field, value));
        self
    }

    /// Adds a less-or-equal predicate.
    pub fn le(mut self, field: &str, value: impl fmt::Display) -> Self {
        self.exprs.push(format!("le({},{})", field, value));
        self
    }

    /// Adds a membership predicate over a list of accepted values.
    pub fn one_of(mut self, field: &str, values: &[&str]) -> Self {
        self.exprs
            .push(format!("in({},({}))", field, values.join(",")));
        self
    }

    /// Whether any predicate has been added.
    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    /// Renders the filter as an RQL query string.
    pub fn to_query(&self) -> String {
        match self.exprs.len() {
            0 => String::new(),
            1 => self.exprs[0].clone(),
            _ => format!("and({})", self.exprs.join(",")),
        }
    }
}

impl fmt::Display for RqlFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_query())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter() {
        assert!(RqlFilter::new().is_empty());
        assert_eq!(RqlFilter::new().to_query(), "");
    }

    #[test]
    fn test_single_predicate() {
        let filter = RqlFilter::new().eq("status", "approved");
        assert_eq!(filter.to_query(), "eq(status,approved)");
    }

    #[test]
    fn test_conjunction_preserves_order() {
        let filter = RqlFilter::new()
            .eq("status", "approved")
            .ge("created", "2024-01-01T00:00:00")
            .ne("asset.product.id", "PRD-000-000-001");
        assert_eq!(
            filter.to_query(),
            "and(eq(status,approved),ge(created,2024-01-01T00:00:00),\
             ne(asset.product.id,PRD-000-000-001))"
        );
    }

    #[test]
    fn test_one_of() {
        let filter = RqlFilter::new().one_of("type", &["purchase", "change", "cancel"]);
        assert_eq!(filter.to_query(), "in(type,(purchase,change,cancel))");
    }
}
