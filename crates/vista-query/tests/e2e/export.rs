//! Export tests: quota checks, cursor streaming, CSV shape and rollback.

use super::common::*;
use std::collections::HashMap;
use vista_core::{ExportPolicyConfig, Role};
use vista_policy::ExportQuota;
use vista_query::{ChannelSink, QueryError, QueryRequest};

fn quota(role: Role) -> ExportQuota {
    ExportQuota::for_role(&ExportPolicyConfig::default(), role)
}

pub async fn test_full_export_streams_every_row(ctx: &TestContext) {
    println!("  🧪 test_full_export_streams_every_row");

    let plan = ctx.plan(QueryRequest::new("public.ledger")).await;
    let staff = quota(Role::Staff);

    let check = ctx.streamer.check_quota(&plan, &staff).await.unwrap();
    assert_eq!(check.total_count, 2_500);
    assert!(check.needs_warning);
    assert!(!check.exceeds_limit);

    let mut out = Vec::new();
    let written = ctx.streamer.stream(&plan, &staff, &mut out).await.unwrap();
    assert_eq!(written, 2_500);

    let csv = String::from_utf8(out).unwrap();
    assert_eq!(csv.lines().count(), 2_501);
    assert_eq!(csv.lines().next(), Some("id,label"));
    assert_eq!(csv.lines().nth(1), Some("1,entry 1"));
    assert_eq!(csv.lines().last(), Some("2500,entry 2500"));

    println!("     ✓ header + 2500 rows across three cursor batches");
}

pub async fn test_export_refused_over_quota(ctx: &TestContext) {
    println!("  🧪 test_export_refused_over_quota");

    let policy = ExportPolicyConfig {
        tier_limits: HashMap::from([(Role::Customer, 2_000)]),
        ..ExportPolicyConfig::default()
    };
    let customer = ExportQuota::for_role(&policy, Role::Customer);
    let plan = ctx.plan(QueryRequest::new("public.ledger")).await;

    let mut out = Vec::new();
    let err = ctx.streamer.stream(&plan, &customer, &mut out).await.unwrap_err();
    assert!(
        matches!(err, QueryError::ExportQuotaExceeded { total_count: 2_500, limit: 2_000 }),
        "got {:?}",
        err
    );
    assert!(out.is_empty(), "nothing may be written before the quota passes");

    let tiny_cap = ExportQuota {
        warn_threshold: 10,
        max_rows_for_role: 100,
        absolute_cap: 1_000,
    };
    let err = ctx.streamer.stream(&plan, &tiny_cap, &mut out).await.unwrap_err();
    assert!(matches!(err, QueryError::ExportTooLarge { cap: 1_000, .. }));

    println!("     ✓ tier limit and absolute cap enforced before streaming");
}

pub async fn test_page_export_round_trips(ctx: &TestContext) {
    println!("  🧪 test_page_export_round_trips");

    let plan = ctx.plan(QueryRequest::new("public.notes").with_page(1, 50)).await;
    let mut out = Vec::new();
    let written = ctx.streamer.export_page(&plan, &mut out).await.unwrap();
    assert_eq!(written, 5);

    let records = parse_csv(&String::from_utf8(out).unwrap());
    assert_eq!(records[0], vec!["body", "author"]);
    let bodies: Vec<&str> = records[1..].iter().map(|r| r[0].as_str()).collect();
    let authors: Vec<&str> = records[1..].iter().map(|r| r[1].as_str()).collect();
    assert!(bodies.contains(&"Smith, John"));
    assert!(bodies.contains(&"first\nsecond"));
    assert!(bodies.contains(&""), "NULL renders as an empty field");
    assert!(authors.contains(&"He said \"no\""));

    println!("     ✓ comma, quote and newline survive the round trip");
}

pub async fn test_filtered_export_matches_count(ctx: &TestContext) {
    println!("  🧪 test_filtered_export_matches_count");

    let plan = ctx
        .plan(QueryRequest::new("public.bookings").with_filters(vec![filter("status", "eq", "done")]))
        .await;
    let mut out = Vec::new();
    let written = ctx
        .streamer
        .stream(&plan, &quota(Role::Customer), &mut out)
        .await
        .unwrap();

    let expected = ctx
        .scalar_count("SELECT COUNT(*) FROM public.bookings WHERE status = 'done'")
        .await;
    assert_eq!(written, expected);
    assert_eq!(parse_csv(&String::from_utf8(out).unwrap()).len() as u64, expected + 1);

    println!("     ✓ {} filtered rows exported", expected);
}

pub async fn test_disconnect_rolls_back(ctx: &TestContext) {
    println!("  🧪 test_disconnect_rolls_back");

    let plan = ctx.plan(QueryRequest::new("public.ledger")).await;
    let cursor = ctx.streamer.open(&plan, &quota(Role::Staff)).await.unwrap();

    let (mut sink, mut rx) = ChannelSink::channel(1);
    let reader = tokio::spawn(async move {
        // Take the header, then hang up.
        let first = rx.recv().await;
        drop(rx);
        first
    });

    let err = cursor.pump(&mut sink).await.unwrap_err();
    assert!(matches!(err, QueryError::StreamingFailure(_)), "got {:?}", err);
    assert!(reader.await.unwrap().is_some());

    let open_transactions = ctx
        .scalar_count(
            "SELECT COUNT(*) FROM pg_stat_activity WHERE state LIKE 'idle in transaction%'",
        )
        .await;
    assert_eq!(open_transactions, 0);

    // The pool is still usable afterwards.
    let mut out = Vec::new();
    let page = ctx.plan(QueryRequest::new("public.ledger").with_page(1, 10)).await;
    assert_eq!(ctx.streamer.export_page(&page, &mut out).await.unwrap(), 10);

    println!("     ✓ transaction released after client hang-up");
}

pub async fn test_cursor_sees_only_counted_rows(ctx: &TestContext) {
    println!("  🧪 test_cursor_sees_only_counted_rows");

    let plan = ctx.plan(QueryRequest::new("public.ledger")).await;
    let cursor = ctx.streamer.open(&plan, &quota(Role::Staff)).await.unwrap();
    assert_eq!(cursor.quota_check().total_count, 2_500);

    // Committed after the count, so outside the cursor's snapshot.
    sqlx::query("INSERT INTO public.ledger (id, label) VALUES (2501, 'late entry')")
        .execute(&ctx.pool)
        .await
        .unwrap();

    let mut out = Vec::new();
    let written = cursor.pump(&mut out).await.unwrap();
    assert_eq!(written, 2_500);
    assert!(!String::from_utf8(out).unwrap().contains("late entry"));

    sqlx::query("DELETE FROM public.ledger WHERE id = 2501")
        .execute(&ctx.pool)
        .await
        .unwrap();

    println!("     ✓ rows committed after the count are not streamed");
}

pub async fn test_export_keeps_numeric_precision(ctx: &TestContext) {
    println!("  🧪 test_export_keeps_numeric_precision");

    let plan = ctx.plan(QueryRequest::new("public.prices")).await;
    let mut out = Vec::new();
    let written = ctx
        .streamer
        .stream(&plan, &quota(Role::Staff), &mut out)
        .await
        .unwrap();
    assert_eq!(written, 2);

    let records = parse_csv(&String::from_utf8(out).unwrap());
    assert_eq!(records[0], vec!["id", "amount", "fee"]);
    assert_eq!(records[1][..2], ["1", "14.50"]);
    assert_eq!(records[2][..2], ["2", "1234567890123456789.99"]);

    println!("     ✓ numeric values exported exactly");
}

pub async fn run_all_tests(ctx: &TestContext) {
    println!("\n📦 Export Tests");
    test_full_export_streams_every_row(ctx).await;
    test_export_refused_over_quota(ctx).await;
    test_page_export_round_trips(ctx).await;
    test_filtered_export_matches_count(ctx).await;
    test_disconnect_rolls_back(ctx).await;
    test_cursor_sees_only_counted_rows(ctx).await;
    test_export_keeps_numeric_precision(ctx).await;
}
