//! Query Executor
//!
//! Runs a parsed [`QueryModel`] against a table. Filters become a
//! parameterized `WHERE` clause typed by each column's [`ColumnKind`],
//! `sort_by` becomes `ORDER BY`, and `limit`/`offset` page the result. A
//! `COUNT(*)` over the same predicate fills in the total for pagination.
//!
//! Properties a resource does not expose, and values that cannot be read as
//! the column's type, compile to `FALSE` rather than being ignored.

use sf_core::traits::Id;
use sf_queries::{build_conditions, Condition, FilterOperator, FilterValue, QueryModel, QueryResponse};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use crate::repository::RepositoryResult;

/// Storage type of a filterable column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Numeric,
    Timestamp,
    Boolean,
}

/// Maps an API property name onto a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub property: &'static str,
    pub column: &'static str,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    pub const fn new(property: &'static str, column: &'static str, kind: ColumnKind) -> Self {
        Self {
            property,
            column,
            kind,
        }
    }
}

/// A row type that can be listed and filtered through the executor
pub trait Resource: for<'r> FromRow<'r, PgRow> + Send + Unpin {
    const TABLE: &'static str;

    /// Column list for `SELECT`
    const SELECT: &'static str;

    /// Filterable and sortable properties
    const COLUMNS: &'static [ColumnSpec];

    /// Ordering used when the request names no known sort field
    const DEFAULT_SORT: &'static str = "id ASC";

    fn column(property: &str) -> Option<&'static ColumnSpec> {
        Self::COLUMNS.iter().find(|spec| spec.property == property)
    }
}

/// Executes query models against the pool
pub struct QueryExecutor<'a> {
    pool: &'a PgPool,
    default_limit: u64,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(pool: &'a PgPool, default_limit: u64) -> Self {
        Self {
            pool,
            default_limit,
        }
    }

    /// List rows matching `model`. The response always carries an offset
    /// (0 when the request gave none) and the effective limit.
    pub async fn execute<R: Resource>(&self, model: &QueryModel) -> RepositoryResult<QueryResponse<R>> {
        let predicate = compile_model::<R>(model);
        let limit = model.limit_or(self.default_limit);
        let offset = model.offset.unwrap_or(0);

        let mut count_builder = count_query::<R>(predicate.as_ref());
        let count: i64 = count_builder
            .build_query_scalar()
            .fetch_one(self.pool)
            .await?;

        let mut select_builder = select_query::<R>(predicate.as_ref(), model, limit, offset);
        let rows: Vec<R> = select_builder
            .build_query_as::<R>()
            .fetch_all(self.pool)
            .await?;

        tracing::debug!(
            table = R::TABLE,
            count,
            page_count = rows.len(),
            offset,
            limit,
            "Executed list query"
        );

        let mut response = QueryResponse::many(rows);
        response
            .set_count(u64::try_from(count).unwrap_or(0))
            .set_offset(offset)
            .set_limit(limit);
        Ok(response)
    }

    /// Fetch a single row through the same pipeline, filtered on `id`
    pub async fn find_one<R: Resource>(&self, id: Id) -> RepositoryResult<Option<R>> {
        let model = QueryModel::for_id(id);
        let predicate = compile_model::<R>(&model);
        let mut builder = select_query::<R>(predicate.as_ref(), &model, 1, 0);
        let row = builder
            .build_query_as::<R>()
            .fetch_optional(self.pool)
            .await?;
        Ok(row)
    }
}

/// Bound parameter value, typed for the column it is compared against
#[derive(Debug, Clone, PartialEq)]
enum SqlValue {
    Text(String),
    Integer(i64),
    Numeric(f64),
    Timestamp(DateTime<Utc>),
    Boolean(bool),
}

#[derive(Debug, Clone, PartialEq)]
enum Predicate {
    Group {
        and: Vec<Predicate>,
        or: Vec<Predicate>,
    },
    Compare {
        column: &'static str,
        cast_text: bool,
        operator: FilterOperator,
        value: SqlValue,
    },
    Never,
}

fn compile_model<R: Resource>(model: &QueryModel) -> Option<Predicate> {
    compile(&build_conditions(model), R::COLUMNS)
}

fn compile(condition: &Condition, columns: &'static [ColumnSpec]) -> Option<Predicate> {
    match condition {
        Condition::Group { and, or } => {
            let and: Vec<Predicate> = and.iter().filter_map(|c| compile(c, columns)).collect();
            let or: Vec<Predicate> = or.iter().filter_map(|c| compile(c, columns)).collect();
            match (and.len(), or.len()) {
                (0, 0) => None,
                (1, 0) => and.into_iter().next(),
                _ => Some(Predicate::Group { and, or }),
            }
        }
        Condition::Compare {
            property,
            operator,
            value,
        } => {
            let Some(spec) = columns.iter().find(|spec| spec.property == property) else {
                tracing::debug!(property = %property, "Filter on unknown property");
                return Some(Predicate::Never);
            };

            let cast_text = *operator == FilterOperator::Like;
            let bound = if cast_text {
                Some(SqlValue::Text(value.as_text()))
            } else {
                typed_value(spec.kind, value)
            };

            Some(match bound {
                Some(value) => Predicate::Compare {
                    column: spec.column,
                    cast_text,
                    operator: *operator,
                    value,
                },
                None => {
                    tracing::debug!(property = %property, value = %value, "Filter value does not fit column type");
                    Predicate::Never
                }
            })
        }
    }
}

fn typed_value(kind: ColumnKind, value: &FilterValue) -> Option<SqlValue> {
    match (kind, value) {
        (ColumnKind::Text, value) => Some(SqlValue::Text(value.as_text())),
        (ColumnKind::Integer, FilterValue::Integer(i)) => Some(SqlValue::Integer(*i)),
        (ColumnKind::Integer, FilterValue::Text(s)) => s.parse().ok().map(SqlValue::Integer),
        (ColumnKind::Numeric, FilterValue::Integer(i)) => Some(SqlValue::Numeric(*i as f64)),
        (ColumnKind::Numeric, FilterValue::Text(s)) => s.parse().ok().map(SqlValue::Numeric),
        (ColumnKind::Timestamp, FilterValue::Date(d)) => Some(SqlValue::Timestamp(*d)),
        (ColumnKind::Boolean, FilterValue::Text(s)) => match s.as_str() {
            "true" => Some(SqlValue::Boolean(true)),
            "false" => Some(SqlValue::Boolean(false)),
            _ => None,
        },
        _ => None,
    }
}

fn push_where(builder: &mut QueryBuilder<'_, Postgres>, predicate: Option<&Predicate>) {
    if let Some(predicate) = predicate {
        builder.push(" WHERE ");
        push_predicate(builder, predicate);
    }
}

fn push_predicate(builder: &mut QueryBuilder<'_, Postgres>, predicate: &Predicate) {
    match predicate {
        Predicate::Group { and, or } => {
            builder.push("(");
            for (i, child) in and.iter().enumerate() {
                if i > 0 {
                    builder.push(" AND ");
                }
                push_predicate(builder, child);
            }
            if !or.is_empty() {
                if !and.is_empty() {
                    builder.push(" AND ");
                }
                builder.push("(");
                for (i, child) in or.iter().enumerate() {
                    if i > 0 {
                        builder.push(" OR ");
                    }
                    push_predicate(builder, child);
                }
                builder.push(")");
            }
            builder.push(")");
        }
        Predicate::Compare {
            column,
            cast_text,
            operator,
            value,
        } => {
            if *cast_text {
                builder.push("CAST(").push(*column).push(" AS TEXT)");
            } else {
                builder.push(*column);
            }
            builder.push(" ").push(operator.sql_operator()).push(" ");
            match value {
                SqlValue::Text(v) => builder.push_bind(v.clone()),
                SqlValue::Integer(v) => builder.push_bind(*v),
                SqlValue::Numeric(v) => builder.push_bind(*v),
                SqlValue::Timestamp(v) => builder.push_bind(*v),
                SqlValue::Boolean(v) => builder.push_bind(*v),
            };
        }
        Predicate::Never => {
            builder.push("FALSE");
        }
    }
}

/// `ORDER BY` body; unknown fields are skipped
pub fn order_clause(model: &QueryModel, columns: &[ColumnSpec], default_sort: &str) -> String {
    let parts: Vec<String> = model
        .sort_list
        .iter()
        .flat_map(|entry| {
            entry.fields.iter().filter_map(move |field| {
                let spec = columns.iter().find(|spec| spec.property == field)?;
                let nulls = match entry.direction {
                    sf_queries::SortDirection::Asc => "NULLS LAST",
                    sf_queries::SortDirection::Desc => "NULLS FIRST",
                };
                Some(format!("{} {} {}", spec.column, entry.direction.as_sql(), nulls))
            })
        })
        .collect();

    if parts.is_empty() {
        default_sort.to_string()
    } else {
        parts.join(", ")
    }
}

fn count_query<R: Resource>(predicate: Option<&Predicate>) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", R::TABLE));
    push_where(&mut builder, predicate);
    builder
}

fn select_query<R: Resource>(
    predicate: Option<&Predicate>,
    model: &QueryModel,
    limit: u64,
    offset: u64,
) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("SELECT {} FROM {}", R::SELECT, R::TABLE));
    push_where(&mut builder, predicate);
    builder
        .push(" ORDER BY ")
        .push(order_clause(model, R::COLUMNS, R::DEFAULT_SORT))
        .push(" LIMIT ")
        .push_bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .push(" OFFSET ")
        .push_bind(i64::try_from(offset).unwrap_or(i64::MAX));
    builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use sf_queries::ParameterProcessor;

    #[derive(Debug, FromRow)]
    #[allow(dead_code)]
    struct ItemRow {
        id: i64,
        name: String,
    }

    impl Resource for ItemRow {
        const TABLE: &'static str = "items";
        const SELECT: &'static str = "id, name";
        const COLUMNS: &'static [ColumnSpec] = &[
            ColumnSpec::new("id", "id", ColumnKind::Integer),
            ColumnSpec::new("name", "name", ColumnKind::Text),
            ColumnSpec::new("price", "price", ColumnKind::Numeric),
            ColumnSpec::new("active", "active", ColumnKind::Boolean),
            ColumnSpec::new("createdAt", "created_at", ColumnKind::Timestamp),
        ];
    }

    fn model(params: &[(&str, &str)]) -> QueryModel {
        ParameterProcessor::default().process(params.iter().copied())
    }

    fn select_sql(params: &[(&str, &str)]) -> String {
        let model = model(params);
        let predicate = compile_model::<ItemRow>(&model);
        let limit = model.limit_or(200);
        let offset = model.offset.unwrap_or(0);
        select_query::<ItemRow>(predicate.as_ref(), &model, limit, offset)
            .sql()
            .to_string()
    }

    fn where_sql(params: &[(&str, &str)]) -> String {
        let predicate = compile_model::<ItemRow>(&model(params));
        count_query::<ItemRow>(predicate.as_ref()).sql().to_string()
    }

    #[test]
    fn test_unfiltered_select() {
        assert_eq!(
            select_sql(&[]),
            "SELECT id, name FROM items ORDER BY id ASC LIMIT $1 OFFSET $2"
        );
        assert_eq!(where_sql(&[]), "SELECT COUNT(*) FROM items");
    }

    #[test]
    fn test_single_filter() {
        assert_eq!(
            where_sql(&[("name", "desk")]),
            "SELECT COUNT(*) FROM items WHERE name = $1"
        );
        assert_eq!(
            where_sql(&[("price[lt]", "100")]),
            "SELECT COUNT(*) FROM items WHERE price < $1"
        );
    }

    #[test]
    fn test_like_casts_column() {
        assert_eq!(
            where_sql(&[("id[like]", "42")]),
            "SELECT COUNT(*) FROM items WHERE CAST(id AS TEXT) LIKE $1"
        );
    }

    #[test]
    fn test_and_with_or_bucket() {
        assert_eq!(
            where_sql(&[("id", "1"), ("name", "desk"), ("[or]name", "chair")]),
            "SELECT COUNT(*) FROM items WHERE (id = $1 AND (name = $2 OR name = $3))"
        );
    }

    #[test]
    fn test_chained_group() {
        assert_eq!(
            where_sql(&[("price[gte]", "10[or]name=lamp")]),
            "SELECT COUNT(*) FROM items WHERE ((price >= $1 OR name = $2))"
        );
    }

    #[test]
    fn test_unknown_property_and_bad_value_match_nothing() {
        assert_eq!(
            where_sql(&[("nickname", "x")]),
            "SELECT COUNT(*) FROM items WHERE FALSE"
        );
        assert_eq!(
            where_sql(&[("active", "maybe"), ("name", "desk")]),
            "SELECT COUNT(*) FROM items WHERE (FALSE AND name = $1)"
        );
        assert_eq!(
            where_sql(&[("createdAt", "yesterday")]),
            "SELECT COUNT(*) FROM items WHERE FALSE"
        );
    }

    #[test]
    fn test_typed_values() {
        let date = ParameterProcessor::default().coerce("2024-01-01");
        assert!(matches!(
            typed_value(ColumnKind::Timestamp, &date),
            Some(SqlValue::Timestamp(_))
        ));
        assert_eq!(
            typed_value(ColumnKind::Numeric, &FilterValue::text("9.5")),
            Some(SqlValue::Numeric(9.5))
        );
        assert_eq!(
            typed_value(ColumnKind::Text, &FilterValue::Integer(5)),
            Some(SqlValue::Text("5".to_string()))
        );
        assert_eq!(typed_value(ColumnKind::Integer, &FilterValue::text("abc")), None);
        assert_eq!(
            typed_value(ColumnKind::Boolean, &FilterValue::text("true")),
            Some(SqlValue::Boolean(true))
        );
    }

    #[test]
    fn test_order_clause() {
        let sorted = model(&[("sort_by", "desc(price,name)asc(id)")]);
        assert_eq!(
            order_clause(&sorted, ItemRow::COLUMNS, ItemRow::DEFAULT_SORT),
            "price DESC NULLS FIRST, name DESC NULLS FIRST, id ASC NULLS LAST"
        );

        let unknown = model(&[("sort_by", "asc(nickname)")]);
        assert_eq!(
            order_clause(&unknown, ItemRow::COLUMNS, ItemRow::DEFAULT_SORT),
            "id ASC"
        );
    }

    #[test]
    fn test_paged_select() {
        assert_eq!(
            select_sql(&[("sort_by", "desc(name)"), ("limit", "2"), ("offset", "1")]),
            "SELECT id, name FROM items ORDER BY name DESC NULLS FIRST LIMIT $1 OFFSET $2"
        );
    }

    #[test]
    fn test_primary_id_predicate() {
        let model = QueryModel::for_id(9);
        let predicate = compile_model::<ItemRow>(&model);
        assert_eq!(
            predicate,
            Some(Predicate::Compare {
                column: "id",
                cast_text: false,
                operator: FilterOperator::Eq,
                value: SqlValue::Integer(9),
            })
        );
    }
}
