//! # vista-server
//!
//! HTTP API over the Vista query core.
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `GET /healthz` | Liveness |
//! | `GET /api/databases` | Configured databases |
//! | `GET /api/databases/{database}/tables` | Tables the caller may see |
//! | `GET /api/databases/{database}/tables/{table}/columns` | Column catalog |
//! | `POST /api/rows` | One filtered, sorted page |
//! | `POST /api/export/check` | Fresh count against the caller's export quota |
//! | `GET/POST /api/export` | CSV download, one page or the full filtered set |

pub mod api_types;
pub mod error;
pub mod handlers;
pub mod principal;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
