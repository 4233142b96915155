//! Plan execution: a count with the plan's filters, then one bounded page.

use crate::error::QueryError;
use crate::plan::QueryPlan;
use crate::registry::ConnectionRegistry;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// One page of rows plus what a client needs to page through the rest.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult {
    pub rows: Vec<Value>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

/// `max(1, ceil(total / page_size))`.
pub fn total_pages(total_count: u64, page_size: u32) -> u32 {
    let page_size = u64::from(page_size.max(1));
    let pages = total_count.div_ceil(page_size).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

pub struct QueryExecutor {
    registry: Arc<ConnectionRegistry>,
}

impl QueryExecutor {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Count the rows matching the plan's filters. Never cached.
    pub async fn count(&self, plan: &QueryPlan) -> Result<u64, QueryError> {
        let pool = self.registry.get_pool(&plan.database).await?;
        let sql = plan.count_sql();
        let total: i64 = sqlx::query_scalar_with(&sql, plan.arguments()?)
            .fetch_one(&pool)
            .await?;
        Ok(u64::try_from(total).unwrap_or(0))
    }

    /// Count, clamp the requested page into range, then fetch it.
    pub async fn execute(&self, plan: &QueryPlan) -> Result<PageResult, QueryError> {
        let total_count = self.count(plan).await?;
        let total_pages = total_pages(total_count, plan.page_size);
        let page = plan.page.clamp(1, total_pages);

        let pool = self.registry.get_pool(&plan.database).await?;
        let sql = plan.page_sql();
        let rows: Vec<Value> = sqlx::query_scalar_with(&sql, plan.page_arguments(page)?)
            .fetch_all(&pool)
            .await?;

        tracing::debug!(
            database = %plan.database,
            table = %plan.table,
            total_count,
            page,
            rows = rows.len(),
            "Fetched page"
        );

        Ok(PageResult {
            rows,
            total_count,
            page,
            page_size: plan.page_size,
            total_pages,
        })
    }
}
