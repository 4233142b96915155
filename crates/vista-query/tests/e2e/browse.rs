//! Paged browsing tests: filters, ordering, paging and validation.

use super::common::*;
use std::collections::HashSet;
use std::sync::Arc;
use vista_core::{ExportPolicyConfig, FilterSpec, FilterValue, GrantTableConfig, Principal, Role};
use vista_policy::{AccessError, AccessGate, GrantStore};
use vista_query::{PgGrantStore, QueryError, QueryRequest, ValidatedTable};

pub async fn test_eq_filter_first_page(ctx: &TestContext) {
    println!("  🧪 test_eq_filter_first_page");

    let plan = ctx
        .plan(
            QueryRequest::new("public.bookings")
                .with_filters(vec![filter("status", "eq", "done")])
                .with_page(1, 50),
        )
        .await;
    let result = ctx.executor.execute(&plan).await.expect("execute");

    let expected = ctx
        .scalar_count("SELECT COUNT(*) FROM public.bookings WHERE status = 'done'")
        .await;
    assert_eq!(result.total_count, expected);
    assert_eq!(result.rows.len() as u64, expected.min(50));
    assert!(result.rows.iter().all(|r| r["status"] == "done"));
    assert_eq!(result.total_pages, expected.div_ceil(50) as u32);

    println!("     ✓ {} matching rows, first page of {}", expected, result.rows.len());
}

pub async fn test_pagination_is_complete(ctx: &TestContext) {
    println!("  🧪 test_pagination_is_complete");

    let request = QueryRequest::new("public.bookings")
        .with_filters(vec![filter("amount", "gte", "100")])
        .with_page(1, 7);
    let first = ctx.executor.execute(&ctx.plan(request.clone()).await).await.unwrap();

    let mut seen = HashSet::new();
    let mut total_rows = 0u64;
    for page in 1..=first.total_pages {
        let plan = ctx.plan(request.clone().with_page(page, 7)).await;
        let result = ctx.executor.execute(&plan).await.unwrap();
        for row in &result.rows {
            assert!(seen.insert(row["id"].as_i64().unwrap()), "duplicate row {}", row["id"]);
        }
        total_rows += result.rows.len() as u64;
    }
    assert_eq!(total_rows, first.total_count);
    assert_eq!(seen.len() as u64, first.total_count);

    // No primary key: ordered by row identity instead.
    let notes = ctx.plan(QueryRequest::new("public.notes").with_page(1, 2)).await;
    let first = ctx.executor.execute(&notes).await.unwrap();
    let mut collected = Vec::new();
    for page in 1..=first.total_pages {
        let plan = ctx.plan(QueryRequest::new("public.notes").with_page(page, 2)).await;
        collected.extend(ctx.executor.execute(&plan).await.unwrap().rows);
    }
    assert_eq!(collected.len(), 5);

    println!("     ✓ every page visited once, {} rows total", total_rows);
}

pub async fn test_page_clamped_into_range(ctx: &TestContext) {
    println!("  🧪 test_page_clamped_into_range");

    let plan = ctx
        .plan(
            QueryRequest::new("public.bookings")
                .with_filters(vec![filter("status", "eq", "no-such-status")])
                .with_page(9, 50),
        )
        .await;
    let result = ctx.executor.execute(&plan).await.unwrap();
    assert_eq!(result.total_count, 0);
    assert_eq!(result.total_pages, 1);
    assert_eq!(result.page, 1);
    assert!(result.rows.is_empty());

    println!("     ✓ out-of-range page clamped to 1");
}

pub async fn test_contains_on_numeric_column(ctx: &TestContext) {
    println!("  🧪 test_contains_on_numeric_column");

    let plan = ctx
        .plan(
            QueryRequest::new("public.bookings")
                .with_filters(vec![filter("amount", "contains", "5")])
                .with_page(1, 500),
        )
        .await;
    let result = ctx.executor.execute(&plan).await.unwrap();

    let expected = ctx
        .scalar_count("SELECT COUNT(*) FROM public.bookings WHERE amount::text ILIKE '%5%'")
        .await;
    assert!(expected > 0);
    assert_eq!(result.total_count, expected);

    println!("     ✓ numeric contains matched textually ({} rows)", expected);
}

pub async fn test_between_on_timestamps(ctx: &TestContext) {
    println!("  🧪 test_between_on_timestamps");

    let plan = ctx
        .plan(QueryRequest::new("public.bookings").with_filters(vec![FilterSpec::new(
            "created_at",
            "between",
            FilterValue::Range(
                "2024-01-01T10:00:00Z".to_string(),
                "2024-01-01T19:00:00Z".to_string(),
            ),
        )]))
        .await;
    let result = ctx.executor.execute(&plan).await.unwrap();
    assert_eq!(result.total_count, 10);

    println!("     ✓ inclusive range on timestamptz");
}

pub async fn test_hostile_values_stay_values(ctx: &TestContext) {
    println!("  🧪 test_hostile_values_stay_values");

    let plan = ctx
        .plan(
            QueryRequest::new("public.bookings")
                .with_filters(vec![filter("guest", "eq", "x' OR '1'='1")]),
        )
        .await;
    let result = ctx.executor.execute(&plan).await.unwrap();
    assert_eq!(result.total_count, 0);

    // A value the column type cannot take is a client error.
    let plan = ctx
        .plan(QueryRequest::new("public.bookings").with_filters(vec![filter("amount", "eq", "abc")]))
        .await;
    let err = ctx.executor.execute(&plan).await.unwrap_err();
    assert!(matches!(err, QueryError::InvalidValue(_)), "got {:?}", err);

    println!("     ✓ injection attempt matched nothing, bad value rejected");
}

pub async fn test_unknown_column_rejected(ctx: &TestContext) {
    println!("  🧪 test_unknown_column_rejected");

    let err = ctx
        .planner
        .plan(
            DB,
            &QueryRequest::new("public.bookings").with_filters(vec![filter("nope", "eq", "1")]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::InvalidColumn { ref column, .. } if column == "nope"));

    let err = ctx
        .planner
        .plan(DB, &QueryRequest::new("public.missing_table"))
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::TableNotFound { .. }));

    let err = ctx
        .planner
        .plan("warehouse", &QueryRequest::new("public.bookings"))
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::DatabaseNotFound(_)));

    println!("     ✓ unknown column, table and database rejected");
}

pub async fn test_catalog_lists_tables(ctx: &TestContext) {
    println!("  🧪 test_catalog_lists_tables");

    let catalog = ctx.planner.catalog();
    let tables = catalog.tables(DB).await.unwrap();
    assert!(tables.contains(&"public.bookings".to_string()));
    assert!(tables.contains(&"public.notes".to_string()));

    let columns = catalog
        .columns(DB, &ValidatedTable::parse("public.bookings").unwrap())
        .await
        .unwrap();
    assert_eq!(columns.primary_key, vec!["id"]);
    assert_eq!(columns.get("amount").unwrap().data_type, "numeric");
    assert!(columns.get("guest").unwrap().nullable);

    println!("     ✓ {} tables visible", tables.len());
}

pub async fn test_grants_from_table(ctx: &TestContext) {
    println!("  🧪 test_grants_from_table");

    let store = PgGrantStore::new(
        ctx.registry.clone(),
        &GrantTableConfig {
            database: DB.to_string(),
            table: "public.user_table_access".to_string(),
            principal_column: "user_id".to_string(),
            database_column: "database_name".to_string(),
            table_column: "table_name".to_string(),
        },
    )
    .unwrap();
    let grants = store.grants_for("cust-1").await.unwrap();
    assert_eq!(grants.len(), 1);

    let gate = AccessGate::new(Arc::new(store), ExportPolicyConfig::default());
    let customer = Principal::new("cust-1", Role::Customer);
    assert!(gate.authorize(&customer, DB, "public.bookings").await.is_ok());
    let err = gate.authorize(&customer, DB, "public.ledger").await.unwrap_err();
    assert!(matches!(err, AccessError::AccessDenied { .. }));

    println!("     ✓ grant table honoured");
}

pub async fn test_numeric_values_keep_precision(ctx: &TestContext) {
    println!("  🧪 test_numeric_values_keep_precision");

    let plan = ctx.plan(QueryRequest::new("public.prices")).await;
    let result = ctx.executor.execute(&plan).await.unwrap();
    assert_eq!(result.rows.len(), 2);
    assert_eq!(result.rows[0]["amount"], "14.50");
    assert_eq!(result.rows[1]["amount"], "1234567890123456789.99");
    assert_eq!(result.rows[0]["id"], 1);

    println!("     ✓ numeric(30, 2) values returned exactly");
}

pub async fn test_money_column_filters(ctx: &TestContext) {
    println!("  🧪 test_money_column_filters");

    let plan = ctx
        .plan(QueryRequest::new("public.prices").with_filters(vec![filter("fee", "eq", "3")]))
        .await;
    let result = ctx.executor.execute(&plan).await.expect("money comparison");
    assert_eq!(result.total_count, 1);
    assert_eq!(result.rows[0]["id"], 1);

    let plan = ctx
        .plan(QueryRequest::new("public.prices").with_filters(vec![filter("fee", "gt", "5")]))
        .await;
    assert_eq!(ctx.executor.count(&plan).await.unwrap(), 1);

    println!("     ✓ money column compared as money");
}

pub async fn test_views_are_not_browsable(ctx: &TestContext) {
    println!("  🧪 test_views_are_not_browsable");

    let err = ctx
        .planner
        .plan(DB, &QueryRequest::new("public.v_prices"))
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::TableNotFound { .. }), "got {:?}", err);

    let tables = ctx.planner.catalog().tables(DB).await.unwrap();
    assert!(!tables.contains(&"public.v_prices".to_string()));

    println!("     ✓ view rejected as an unknown table");
}

pub async fn run_all_tests(ctx: &TestContext) {
    println!("\n📂 Browse Tests");
    test_eq_filter_first_page(ctx).await;
    test_pagination_is_complete(ctx).await;
    test_page_clamped_into_range(ctx).await;
    test_contains_on_numeric_column(ctx).await;
    test_between_on_timestamps(ctx).await;
    test_hostile_values_stay_values(ctx).await;
    test_unknown_column_rejected(ctx).await;
    test_catalog_lists_tables(ctx).await;
    test_grants_from_table(ctx).await;
    test_numeric_values_keep_precision(ctx).await;
    test_money_column_filters(ctx).await;
    test_views_are_not_browsable(ctx).await;
}
