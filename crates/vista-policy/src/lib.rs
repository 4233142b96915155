//! # vista-policy
//!
//! Table-level access control and export quota tiers.
//!
//! - Customers are restricted to the union of their explicit grants; every
//!   other role sees every table.
//! - Export quotas derive from the role tier: a warning threshold, a
//!   per-role row limit and an absolute cap that binds everyone.

pub mod error;
pub mod gate;
pub mod grants;
pub mod quota;

pub use error::AccessError;
pub use gate::{AccessGate, Decision};
pub use grants::{GrantStore, StaticGrantStore, TableGrant};
pub use quota::{ExportQuota, QuotaCheck, QuotaVerdict};
