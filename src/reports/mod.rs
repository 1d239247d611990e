//! Read-only reporting: balance aggregation and stock valuation

pub mod balance;
pub mod stock;

pub use balance::*;
pub use stock::*;
