//! Input tree walking
//!
//! Sizes the build input so the planner can decide how many chunks each
//! node gets.
//!
//! # Architecture
//!
//! ```text
//!          ┌──────────────────────┐
//!          │    pending stack     │ ◄──── subdirectories pushed
//!          └──────────┬───────────┘
//!                     │ pop
//!                     ▼
//!          ┌──────────────────────┐
//!          │  FileSystem listing  │
//!          └──────────┬───────────┘
//!                     │ files
//!                     ▼
//!          ┌──────────────────────┐
//!          │  ScanStats (bytes)   │
//!          └──────────────────────┘
//! ```

pub mod size;

pub use size::{scan_path, size_of_path, ScanStats};
