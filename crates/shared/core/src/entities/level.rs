use serde::{Deserialize, Serialize};

/// Order book level (price + quantity)
///
/// `repr(C)` keeps a side's levels as one contiguous run of `f64` pairs so
/// book walks stay cache- and SIMD-friendly.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[repr(C)]
pub struct PriceLevel {
    pub price: f64,
    pub quantity: f64,
}

impl PriceLevel {
    /// Create a new price level
    #[inline]
    pub const fn new(price: f64, quantity: f64) -> Self {
        Self { price, quantity }
    }

    /// Notional value of the level
    #[inline]
    pub fn notional(&self) -> f64 {
        self.price * self.quantity
    }

    /// Check if this level has been deleted (quantity == 0)
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.quantity == 0.0
    }
}

impl From<(f64, f64)> for PriceLevel {
    fn from((price, quantity): (f64, f64)) -> Self {
        Self::new(price, quantity)
    }
}
