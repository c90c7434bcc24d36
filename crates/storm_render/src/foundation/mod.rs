//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the renderer:
//! - Math types and operations
//! - Collections and data structures
//! - Logging utilities

pub mod math;
pub mod collections;
pub mod logging;
