//! Table query parameters (`column=op.value` filters).

use std::fmt::Display;

/// Filters, projection, ordering and limit of one table request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    params: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a column projection.
    pub fn select(columns: &str) -> Self {
        Self::new().param("select", columns)
    }

    pub fn eq(self, column: &str, value: impl Display) -> Self {
        self.param(column, format!("eq.{value}"))
    }

    pub fn gte(self, column: &str, value: impl Display) -> Self {
        self.param(column, format!("gte.{value}"))
    }

    pub fn lt(self, column: &str, value: impl Display) -> Self {
        self.param(column, format!("lt.{value}"))
    }

    pub fn is_null(self, column: &str) -> Self {
        self.param(column, "is.null")
    }

    pub fn not_null(self, column: &str) -> Self {
        self.param(column, "not.is.null")
    }

    /// Case-insensitive pattern; `*` is the wildcard.
    pub fn ilike(self, column: &str, pattern: &str) -> Self {
        self.param(column, format!("ilike.{pattern}"))
    }

    pub fn order_asc(self, column: &str) -> Self {
        self.param("order", format!("{column}.asc"))
    }

    pub fn order_desc(self, column: &str) -> Self {
        self.param("order", format!("{column}.desc"))
    }

    pub fn limit(self, n: usize) -> Self {
        self.param("limit", n.to_string())
    }

    /// Apply `obra_id=eq.<id>` when a site is given.
    pub fn site(self, work_id: Option<i64>) -> Self {
        match work_id {
            Some(id) => self.eq("obra_id", id),
            None => self,
        }
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    fn param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.push((key.to_string(), value.into()));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_filters_in_order() {
        let query = Query::select("id,nome")
            .eq("obra_id", 3)
            .is_null("saida")
            .order_desc("entrada")
            .limit(10);

        let params: Vec<(&str, &str)> = query.params().iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(
            params,
            vec![
                ("select", "id,nome"),
                ("obra_id", "eq.3"),
                ("saida", "is.null"),
                ("order", "entrada.desc"),
                ("limit", "10"),
            ]
        );
    }

    #[test]
    fn test_site_filter_optional() {
        assert_eq!(Query::new().site(None), Query::new());
        assert_eq!(Query::new().site(Some(2)).params()[0].1, "eq.2");
    }
}
