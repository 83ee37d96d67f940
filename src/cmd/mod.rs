//! Command-line arguments for the binaries in `src/app`.

pub mod job;
pub mod naive;
