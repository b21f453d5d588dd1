pub mod camera;
pub mod config;
pub mod dedup;
pub mod elevation;
pub mod error;
pub mod image;
pub mod inspect;
pub mod io;
pub mod linker;
pub mod pipeline;
pub mod rewrite;
pub mod synthetic;
pub mod tracks;
pub mod triangulate;
pub mod types;
pub mod validate;

pub use config::ConsolidationConfig;
pub use error::{Error, Result};
pub use pipeline::{ConsolidationReport, consolidate, run};
