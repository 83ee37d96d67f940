//! MapReduce applications runnable on the [`standalone`](crate::standalone)
//! engine.
//!
//! # Example
//!
//! ```
//! use mrbill::workload;
//!
//! let app = workload::billing_workload();
//! # let _ = app.map_fn;
//! ```

use crate::Workload;

pub mod billing;

/// The per-user billing application.
pub fn billing_workload() -> Workload {
    Workload {
        map_fn: billing::map,
        reduce_fn: billing::reduce,
    }
}
