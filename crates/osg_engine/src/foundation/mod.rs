//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Math types and matrix helpers
//! - The per-pass matrix arena
//! - Frame timing
//! - Logging setup

pub mod math;
pub mod memory;
pub mod time;
pub mod logging;
