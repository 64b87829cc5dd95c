//! Matrix assembly for canonicalized expressions.
//!
//! This module provides:
//! - Index tables mapping variables to columns and roots to rows
//! - Matrix stuffing of lowered expressions into `A` and `b`
//! - Build settings

pub mod index;
pub mod settings;
pub mod stuffing;

pub use index::{IdToCol, OffsetMode, RowOffsets};
pub use settings::BuildSettings;
pub use stuffing::Stuffing;
