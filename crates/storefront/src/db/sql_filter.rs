//! Translation of [`Filter`] into a parameterised `WHERE` clause over the
//! JSONB `data` column.
//!
//! Field names and values are always bound, never interpolated. A missing
//! field is read as JSON `null`, and range operators additionally require
//! both sides to have the same JSON type, matching `Filter::matches`.

use serde_json::Value;

use abc_retail_core::{CompareOp, Filter};

/// A bind parameter of a translated filter.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SqlParam {
    Field(String),
    Json(Value),
}

/// A translated filter: the clause text plus its parameters in `$n` order.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct SqlFilter {
    pub clause: String,
    pub params: Vec<SqlParam>,
}

impl SqlFilter {
    /// Translate `filter`, numbering placeholders from `$1`.
    pub fn build(filter: &Filter) -> Self {
        let mut out = Self::default();
        out.clause = out.push_filter(filter);
        out
    }

    fn bind(&mut self, param: SqlParam) -> String {
        self.params.push(param);
        format!("${}", self.params.len())
    }

    fn push_filter(&mut self, filter: &Filter) -> String {
        match filter {
            Filter::All => "TRUE".to_owned(),
            Filter::Compare { field, op, value } => {
                let field = self.bind(SqlParam::Field(field.clone()));
                let value = self.bind(SqlParam::Json(value.clone()));
                let actual = format!("COALESCE(data -> {field}, 'null'::jsonb)");
                match op {
                    CompareOp::Eq => format!("({actual} = {value})"),
                    CompareOp::Ne => format!("({actual} <> {value})"),
                    range => format!(
                        "(jsonb_typeof({actual}) = jsonb_typeof({value}) AND {actual} {} {value})",
                        range.as_sql()
                    ),
                }
            }
            Filter::And(parts) => self.push_group(parts, " AND ", "TRUE"),
            Filter::Or(parts) => self.push_group(parts, " OR ", "FALSE"),
        }
    }

    fn push_group(&mut self, parts: &[Filter], joiner: &str, empty: &str) -> String {
        if parts.is_empty() {
            return empty.to_owned();
        }
        let clauses: Vec<String> = parts.iter().map(|part| self.push_filter(part)).collect();
        format!("({})", clauses.join(joiner))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_all() {
        let sql = SqlFilter::build(&Filter::All);
        assert_eq!(sql.clause, "TRUE");
        assert!(sql.params.is_empty());
    }

    #[test]
    fn test_equality_binds_field_and_value() {
        let sql = SqlFilter::build(&Filter::eq("email", "a@b.co"));
        assert_eq!(sql.clause, "(COALESCE(data -> $1, 'null'::jsonb) = $2)");
        assert_eq!(
            sql.params,
            vec![
                SqlParam::Field("email".to_owned()),
                SqlParam::Json(json!("a@b.co"))
            ]
        );
    }

    #[test]
    fn test_range_checks_type() {
        let sql = SqlFilter::build(&Filter::gt("price", 10));
        assert_eq!(
            sql.clause,
            "(jsonb_typeof(COALESCE(data -> $1, 'null'::jsonb)) = jsonb_typeof($2) \
             AND COALESCE(data -> $1, 'null'::jsonb) > $2)"
        );
    }

    #[test]
    fn test_nested_groups_number_placeholders() {
        let filter = Filter::Or(vec![
            Filter::eq("name", "Runner"),
            Filter::And(vec![Filter::ge("price", 1), Filter::le("price", 5)]),
        ]);
        let sql = SqlFilter::build(&filter);
        assert_eq!(sql.params.len(), 6);
        assert!(sql.clause.starts_with("((COALESCE(data -> $1"));
        assert!(sql.clause.contains(" OR (("));
        assert!(sql.clause.contains("<= $6"));
        assert_eq!(SqlFilter::build(&Filter::Or(vec![])).clause, "FALSE");
    }
}
