//! Common types and utilities shared across the NWP data-source crates.

pub mod time;

pub use time::{
    cycle_range, format_cycle, parse_cycle, round_time, TimeError, ValidTime,
};
