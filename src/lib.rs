//! dbresult - A driver-agnostic result-handle contract for database access
//!
//! Every backend driver hands out a `ResultHandle` for each statement it
//! executes. The handle follows one lifecycle regardless of the backend:
//! dispatch, optional rebinding of parameters, incremental fetch until the
//! result has completed, and exactly one `dispose()`.
//!
//! # Example
//! ```ignore
//! use dbresult::{BindingSet, Client, Diagnostics, SqlValue};
//!
//! let client = Client::connect("postgres://localhost/mydb").await?;
//!
//! let mut res = client.send_query("SELECT id, name FROM users WHERE id > $1", None).await?;
//! res.bind(&BindingSet::single([SqlValue::Int32(10)])).await?;
//! while !res.has_completed()? {
//!     let batch = res.fetch(100).await?;
//!     for row in batch.rows() {
//!         println!("{:?}", row.get("name")?);
//!     }
//! }
//! println!("{}", Diagnostics::new(res.as_ref()));
//! res.dispose().await?;
//! ```

pub mod binder;
pub mod config;
pub mod display;
pub mod drivers;
pub mod error;
pub mod info;
pub mod result;
pub mod traits;
pub mod types;

mod client;

// Re-export main types for convenient access
pub use binder::{bind, Placeholders};
pub use client::Client;
pub use config::ClientConfig;
pub use display::Diagnostics;
pub use error::{DbResultError, Result};
pub use info::{result_info, ResultInfo};
pub use traits::{DatabaseDriver, ResultHandle, Validity};
pub use types::{BindingSet, ColumnDescriptor, HostType, Row, RowBatch, SqlValue};
