//! # Analytics Feature
//!
//! Host diagnostics for administrators.
//!
//! - **Version**: 2.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod system_info;

pub use system_info::{db_file_size, format_bytes, format_duration, DiskInfo, SystemSnapshot};
