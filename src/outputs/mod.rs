//! Output writers.
//!
//! - [`json`]: writes collection and analysis reports to dated JSON files
//!
//! # Output Structure
//!
//! ```text
//! json_output_dir/
//! └── 2026-02-16/
//!     ├── collection-081500.json
//!     └── analysis-120003.json
//! ```

pub mod json;
