//! Pipeline entry points for change detection.
//!
//! - `Pipeline::run_one`: fetch → extract → signature → cache for one source
//! - `Pipeline::run_batch`: the same over many sources with bounded
//!   concurrency and per-source error isolation

mod batch;
pub mod diff;
mod run;

pub use run::Pipeline;
