//! Wire message types

pub mod market_data;

pub use market_data::{RawLevel, RawSnapshot};
