//! On-disk persistence.

pub mod config;
