//! Shared test infrastructure for Vista end-to-end tests.
//!
//! This module provides:
//! - Docker container management for PostgreSQL
//! - Seed data for the browse and export scenarios
//! - A CSV reader for checking exported bytes

use sqlx::PgPool;
use std::collections::HashMap;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;
use vista_core::{DatabaseConfig, FilterSpec, FilterValue};
use vista_query::{
    ConnectionRegistry, ExportStreamer, PgCatalog, QueryExecutor, QueryPlan, QueryPlanner,
    QueryRequest,
};

// =============================================================================
// DOCKER CONTAINER CONFIGURATION
// =============================================================================

pub const CONTAINER_NAME: &str = "vista_test_postgres";
pub const POSTGRES_PORT: u16 = 5434;
pub const POSTGRES_PASSWORD: &str = "vista_test_password";
pub const DATABASE_NAME: &str = "vista_test";

/// Logical name the registry knows the test database by.
pub const DB: &str = "sales";

pub fn database_url() -> String {
    format!(
        "postgres://postgres:{}@localhost:{}/{}",
        POSTGRES_PASSWORD, POSTGRES_PORT, DATABASE_NAME
    )
}

// =============================================================================
// DOCKER CONTAINER MANAGEMENT
// =============================================================================

/// Start a PostgreSQL container for testing
pub fn start_postgres_container() -> Result<(), String> {
    let output = Command::new("docker")
        .args(["ps", "-a", "-q", "-f", &format!("name={}", CONTAINER_NAME)])
        .output()
        .map_err(|e| format!("Failed to check existing container: {}", e))?;

    if !String::from_utf8_lossy(&output.stdout).trim().is_empty() {
        let _ = Command::new("docker")
            .args(["rm", "-f", CONTAINER_NAME])
            .output();
    }

    let status = Command::new("docker")
        .args([
            "run",
            "-d",
            "--name",
            CONTAINER_NAME,
            "-e",
            &format!("POSTGRES_PASSWORD={}", POSTGRES_PASSWORD),
            "-e",
            &format!("POSTGRES_DB={}", DATABASE_NAME),
            "-p",
            &format!("{}:5432", POSTGRES_PORT),
            "postgres:16-alpine",
        ])
        .status()
        .map_err(|e| format!("Failed to start container: {}", e))?;

    if !status.success() {
        return Err("Failed to start PostgreSQL container".to_string());
    }
    Ok(())
}

pub fn stop_postgres_container() {
    let _ = Command::new("docker")
        .args(["rm", "-f", CONTAINER_NAME])
        .output();
}

pub async fn wait_for_postgres() -> Result<PgPool, String> {
    for attempt in 1..=30 {
        if let Ok(pool) = PgPool::connect(&database_url()).await
            && sqlx::query("SELECT 1").fetch_one(&pool).await.is_ok()
        {
            println!("✅ PostgreSQL ready after {} attempts", attempt);
            return Ok(pool);
        }
        if attempt % 5 == 0 {
            println!("⏳ Waiting for PostgreSQL... (attempt {})", attempt);
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    Err("PostgreSQL did not become ready in time".to_string())
}

// =============================================================================
// DATABASE INITIALIZATION
// =============================================================================

const SEED_SQL: &str = r#"
CREATE TABLE public.bookings (
    id          integer PRIMARY KEY,
    status      text NOT NULL,
    guest       text,
    amount      numeric(10, 2) NOT NULL,
    created_at  timestamptz NOT NULL
);

INSERT INTO public.bookings (id, status, guest, amount, created_at)
SELECT i,
       (ARRAY['done', 'pending', 'cancelled'])[1 + i % 3],
       CASE WHEN i % 10 = 0 THEN NULL ELSE 'guest ' || i END,
       (i * 7.25)::numeric(10, 2),
       timestamptz '2024-01-01 00:00:00+00' + (i || ' hours')::interval
FROM generate_series(1, 240) AS i;

CREATE TABLE public.notes (
    body   text,
    author text
);

INSERT INTO public.notes (body, author) VALUES
    ('Smith, John', 'plain'),
    ('plain', 'He said "no"'),
    (E'first\nsecond', 'multi'),
    (NULL, 'nobody'),
    ('plain', 'plain');

CREATE TABLE public.ledger (
    id    integer PRIMARY KEY,
    label text NOT NULL
);

INSERT INTO public.ledger (id, label)
SELECT i, 'entry ' || i FROM generate_series(1, 2500) AS i;

CREATE TABLE public.prices (
    id     integer PRIMARY KEY,
    amount numeric(30, 2) NOT NULL,
    fee    money NOT NULL
);

INSERT INTO public.prices (id, amount, fee) VALUES
    (1, 14.50, 3),
    (2, 1234567890123456789.99, 12.75);

CREATE VIEW public.v_prices AS SELECT id, amount FROM public.prices;

CREATE TABLE public.user_table_access (
    user_id       text NOT NULL,
    database_name text NOT NULL,
    table_name    text NOT NULL
);

INSERT INTO public.user_table_access VALUES
    ('cust-1', 'sales', 'public.bookings');
"#;

pub async fn initialize_database(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SEED_SQL).execute(pool).await?;
    println!("✅ Database initialized with seed data");
    Ok(())
}

// =============================================================================
// TEST CONTEXT
// =============================================================================

pub struct TestContext {
    pub pool: PgPool,
    pub registry: Arc<ConnectionRegistry>,
    pub planner: QueryPlanner,
    pub executor: Arc<QueryExecutor>,
    pub streamer: ExportStreamer,
}

impl TestContext {
    pub async fn setup() -> Result<Self, String> {
        start_postgres_container()?;
        let pool = wait_for_postgres().await?;
        initialize_database(&pool)
            .await
            .map_err(|e| format!("Failed to initialize database: {}", e))?;

        let config = DatabaseConfig {
            database_url: Some(database_url()),
            ..DatabaseConfig::default()
        };
        let registry = Arc::new(ConnectionRegistry::new(HashMap::from([(
            DB.to_string(),
            config,
        )])));
        let planner = QueryPlanner::new(Arc::new(PgCatalog::new(registry.clone())));
        let executor = Arc::new(QueryExecutor::new(registry.clone()));
        let streamer = ExportStreamer::new(executor.clone(), 1_000);

        Ok(Self {
            pool,
            registry,
            planner,
            executor,
            streamer,
        })
    }

    pub async fn plan(&self, request: QueryRequest) -> QueryPlan {
        self.planner
            .plan(DB, &request)
            .await
            .expect("plan should succeed")
    }

    pub async fn scalar_count(&self, sql: &str) -> u64 {
        let n: i64 = sqlx::query_scalar(sql)
            .fetch_one(&self.pool)
            .await
            .expect("count query");
        n as u64
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        stop_postgres_container();
        println!("🧹 Cleaned up PostgreSQL container");
    }
}

// =============================================================================
// HELPERS
// =============================================================================

pub fn filter(column: &str, operator: &str, value: &str) -> FilterSpec {
    FilterSpec::new(column, operator, FilterValue::Single(value.to_string()))
}

/// Read RFC4180 records back out of exported bytes.
pub fn parse_csv(input: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut chars = input.chars().peekable();
    let mut quoted = false;

    while let Some(c) = chars.next() {
        if quoted {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => quoted = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' => quoted = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }
    records
}
