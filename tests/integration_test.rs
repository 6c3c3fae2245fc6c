use sqlexpr::catalog::{Catalog, ColumnInfo, TableInfo};
use sqlexpr::compiler::{Backend, SqlCompiler};
use sqlexpr::expression::func::lower;
use sqlexpr::expression::{Aggregate, Expression, ExpressionError, FieldRef, Literal, OrderBy};
use sqlexpr::query::{FilterClause, Query};
use sqlexpr::request::QueryRequest;
use sqlexpr::types::{DataType, Value};
use std::collections::{BTreeMap, HashSet};

fn catalog() -> Catalog {
    let person = TableInfo::new("person")
        .with_column(ColumnInfo::new("id", DataType::Integer))
        .and_then(|t| t.with_column(ColumnInfo::new("name", DataType::Text)))
        .unwrap();
    let company = TableInfo::new("company")
        .with_column(ColumnInfo::new("id", DataType::Integer))
        .and_then(|t| t.with_column(ColumnInfo::new("name", DataType::Text)))
        .and_then(|t| t.with_column(ColumnInfo::new("num_employees", DataType::Integer)))
        .and_then(|t| t.with_column(ColumnInfo::new("num_chairs", DataType::Integer)))
        .and_then(|t| t.with_column(ColumnInfo::new("rating", DataType::Float)))
        .and_then(|t| t.with_column(ColumnInfo::new("budget", DataType::Decimal)))
        .and_then(|t| t.with_column(ColumnInfo::foreign_key("ceo", "person", "id")))
        .unwrap();

    let mut catalog = Catalog::new();
    catalog.add_table(person).unwrap();
    catalog.add_table(company).unwrap();
    catalog.validate().unwrap();
    catalog
}

fn compile(query: &mut Query, expr: Expression, backend: Backend) -> (String, Vec<Value>) {
    let resolved = expr.resolve_expression(query, true, None, false).unwrap();
    let fragment = SqlCompiler::new(backend).compile(&resolved).unwrap();
    (fragment.sql, fragment.params)
}

#[test]
fn test_literal_compiles_to_one_placeholder() {
    let catalog = catalog();
    let mut query = Query::new(&catalog, "company").unwrap();
    let (sql, params) = compile(
        &mut query,
        Expression::Literal(Literal::int(5)),
        Backend::Postgres,
    );
    assert_eq!(sql, "?");
    assert_eq!(params, vec![Value::Integer(5)]);
}

#[test]
fn test_lower_of_field() {
    let catalog = catalog();
    let mut query = Query::new(&catalog, "company").unwrap();
    let (sql, params) = compile(&mut query, lower("name"), Backend::Postgres);
    assert_eq!(sql, "LOWER(\"company\".\"name\")");
    assert!(params.is_empty());
}

#[test]
fn test_count_distinct() {
    let catalog = catalog();
    let mut query = Query::new(&catalog, "company").unwrap();
    let agg = Aggregate::count(FieldRef::new("num_employees"))
        .distinct()
        .unwrap();
    let (sql, params) = compile(&mut query, agg.into(), Backend::Sqlite);
    assert_eq!(sql, "COUNT(DISTINCT \"company\".\"num_employees\")");
    assert!(params.is_empty());
}

#[test]
fn test_field_plus_literal() {
    let catalog = catalog();
    let mut query = Query::new(&catalog, "company").unwrap();
    let (sql, params) = compile(
        &mut query,
        Expression::field("num_employees") + 1,
        Backend::Postgres,
    );
    assert_eq!(sql, "\"company\".\"num_employees\" + ?");
    assert_eq!(params, vec![Value::Integer(1)]);
}

#[test]
fn test_mixed_types_need_output_field() {
    let catalog = catalog();
    let mut query = Query::new(&catalog, "company").unwrap();
    let mixed = Expression::field("rating") * Expression::field("budget");
    let resolved = mixed
        .clone()
        .resolve_expression(&mut query, true, None, false)
        .unwrap();

    let err = SqlCompiler::new(Backend::Postgres)
        .compile(&resolved)
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Cannot infer type of '*' expression involving these types: float, decimal. \
         You must set output_field."
    );

    let declared = mixed
        .with_output_field(DataType::Decimal)
        .resolve_expression(&mut query, true, None, false)
        .unwrap();
    assert_eq!(declared.output_field(), Ok(Some(DataType::Decimal)));
    assert!(SqlCompiler::new(Backend::Postgres).compile(&declared).is_ok());
}

#[test]
fn test_routing_after_annotation() {
    let catalog = catalog();
    let mut query = Query::new(&catalog, "company").unwrap();
    query
        .annotate("chairs", Aggregate::sum("num_chairs"))
        .unwrap();

    assert_eq!(
        query.filter(Expression::gt("chairs", 100)).unwrap(),
        vec![FilterClause::PostGrouping]
    );
    assert_eq!(
        query.filter(Expression::lt("num_employees", 50)).unwrap(),
        vec![FilterClause::PreGrouping]
    );

    let fragment = query
        .compile(&SqlCompiler::new(Backend::Postgres))
        .unwrap()
        .numbered(Backend::Postgres);
    assert!(fragment
        .sql
        .contains("WHERE \"company\".\"num_employees\" < $1"));
    assert!(fragment
        .sql
        .ends_with("HAVING SUM(\"company\".\"num_chairs\") > $2"));
    assert_eq!(fragment.params, vec![Value::Integer(50), Value::Integer(100)]);
}

#[test]
fn test_refs_aggregate_on_resolved_trees() {
    let catalog = catalog();
    let mut query = Query::new(&catalog, "company").unwrap();
    query
        .annotate("staff", Aggregate::max("num_employees"))
        .unwrap();
    let existing: BTreeMap<String, Expression> = query.existing_aggregates();

    let plain = Expression::eq(lower("name"), Expression::value("acme"))
        .resolve_expression(&mut query, true, None, false)
        .unwrap();
    assert_eq!(plain.refs_aggregate(&existing), None);

    let referencing = Expression::ge(Expression::field("num_chairs") * 2, "staff")
        .resolve_expression(&mut query, true, None, false)
        .unwrap();
    let found = referencing.refs_aggregate(&existing).unwrap();
    assert_eq!(found.alias, "staff");
    assert_eq!(found.path, vec![1]);
}

#[test]
fn test_reverse_ordering_swaps_nulls() {
    let ordering = OrderBy::new(
        Expression::field("name"),
        sqlexpr::expression::Direction::Descending,
    )
    .nulls_last();
    let reversed = Expression::from(ordering).reverse_ordering();
    let expected = OrderBy::new(
        Expression::field("name"),
        sqlexpr::expression::Direction::Ascending,
    )
    .nulls_first();
    assert_eq!(reversed, Expression::from(expected));
}

#[test]
fn test_unresolved_tree_is_reusable() {
    let catalog = catalog();
    let tree = Expression::field("ceo.name");

    let mut first = Query::new(&catalog, "company").unwrap();
    let mut second = Query::new(&catalog, "company").unwrap();
    let a = tree.resolve_expression(&mut first, true, None, false).unwrap();
    let b = tree
        .resolve_expression(&mut second, true, Some(&HashSet::new()), false)
        .unwrap();

    assert_eq!(a, b);
    assert_eq!(tree, Expression::field("ceo.name"));
    assert_eq!(first.joins().len(), 1);
}

#[test]
fn test_vendor_dispatch_per_backend() {
    let catalog = catalog();
    let mut query = Query::new(&catalog, "company").unwrap();
    let stddev: Expression = Aggregate::std_dev("rating").into();
    let resolved = stddev
        .resolve_expression(&mut query, true, None, false)
        .unwrap();

    assert_eq!(
        SqlCompiler::new(Backend::Mysql).compile(&resolved).unwrap().sql,
        "STDDEV_POP(`company`.`rating`)"
    );
    assert!(matches!(
        SqlCompiler::new(Backend::Sqlite).compile(&resolved),
        Err(ExpressionError::NotSupported { .. })
    ));
}

#[test]
fn test_expression_from_json() {
    let json = r#"{
        "combined": {
            "lhs": {"field": {"name": "num_employees"}},
            "op": "mul",
            "rhs": {"literal": {"value": {"Integer": 3}}}
        }
    }"#;
    let expr: Expression = serde_json::from_str(json).unwrap();
    assert_eq!(expr, Expression::field("num_employees") * 3);

    let catalog = catalog();
    let mut query = Query::new(&catalog, "company").unwrap();
    let (sql, params) = compile(&mut query, expr, Backend::Mysql);
    assert_eq!(sql, "`company`.`num_employees` * ?");
    assert_eq!(params, vec![Value::Integer(3)]);
}

#[test]
fn test_summary_query() {
    let catalog = catalog();
    let mut query = Query::new(&catalog, "company").unwrap();
    query
        .aggregate("total", Aggregate::sum("num_employees"))
        .unwrap();
    query.aggregate("companies", Aggregate::count_all()).unwrap();

    let fragment = query.compile(&SqlCompiler::new(Backend::Sqlite)).unwrap();
    assert_eq!(
        fragment.sql,
        "SELECT SUM(\"company\".\"num_employees\") AS \"total\", COUNT(*) AS \"companies\" \
         FROM \"company\""
    );
    assert!(fragment.params.is_empty());
}

fn demo_catalog() -> Catalog {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/catalog.json");
    let text = std::fs::read_to_string(path).unwrap();
    let catalog: Catalog = serde_json::from_str(&text).unwrap();
    catalog.validate().unwrap();
    catalog
}

#[test]
fn test_demo_catalog_loads() {
    let catalog = demo_catalog();

    let mut query = Query::new(&catalog, "company").unwrap();
    let (sql, _) = compile(&mut query, Expression::field("ceo.name"), Backend::Postgres);
    assert_eq!(sql, "\"person\".\"name\"");
    assert_eq!(query.joins().len(), 1);
}

#[test]
fn test_demo_query_end_to_end() {
    let catalog = demo_catalog();
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/staff_by_ceo.json");
    let text = std::fs::read_to_string(path).unwrap();
    let request: QueryRequest = serde_json::from_str(&text).unwrap();

    let query = request.build(&catalog).unwrap();
    let fragment = query
        .compile(&SqlCompiler::new(Backend::Postgres))
        .unwrap()
        .numbered(Backend::Postgres);
    assert_eq!(
        fragment.sql,
        "SELECT \"person\".\"name\", SUM(\"company\".\"num_employees\") AS \"staff\" \
         FROM \"company\" INNER JOIN \"person\" ON (\"company\".\"ceo_id\" = \"person\".\"id\") \
         WHERE \"company\".\"num_employees\" >= $1 \
         GROUP BY \"person\".\"name\" \
         HAVING SUM(\"company\".\"num_employees\") > $2 \
         ORDER BY SUM(\"company\".\"num_employees\") DESC NULLS LAST"
    );
    assert_eq!(fragment.params, vec![Value::Integer(10), Value::Integer(100)]);
}

#[test]
fn test_annotation_reused_in_arithmetic_keeps_grouping() {
    let catalog = catalog();
    let mut query = Query::new(&catalog, "company").unwrap();
    query
        .annotate(
            "seats",
            Expression::field("num_employees") + Expression::field("num_chairs"),
        )
        .unwrap();
    let (sql, params) = compile(&mut query, Expression::field("seats") * 2, Backend::Postgres);
    assert_eq!(
        sql,
        "(\"company\".\"num_employees\" + \"company\".\"num_chairs\") * ?"
    );
    assert_eq!(params, vec![Value::Integer(2)]);
}
