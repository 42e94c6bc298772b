//! Utility modules: developer logging, logger setup, numeric conversions.
pub mod devlog;
pub mod logger;
pub mod num;
