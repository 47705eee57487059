use crate::CDF_PROB_TOP;
use serde::Serialize;

/// Per-encoder accounting of the ideal cost of every coded symbol, compared
/// against what the range coder actually spent.
#[derive(Debug, Clone, Default)]
pub struct OverheadMeter {
    ideal_bits: f64,
    symbols: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverheadReport {
    pub symbols: u64,
    pub ideal_bits: f64,
    pub actual_bits: u64,
    pub overhead_percent: f64,
    pub bits_per_symbol: f64,
}

impl OverheadMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a symbol whose share of the probability space was `width`
    /// out of 32768.
    pub fn record(&mut self, width: u32) {
        debug_assert!(width > 0 && width <= CDF_PROB_TOP);
        self.ideal_bits -= (f64::from(width) / f64::from(CDF_PROB_TOP)).log2();
        self.symbols += 1;
    }

    pub fn record_raw(&mut self, nbits: u32) {
        self.ideal_bits += f64::from(nbits);
        self.symbols += 1;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// `tell` is the encoder's bit count; one bit of it is the stream
    /// terminator and is not charged to the symbols.
    pub fn report(&self, tell: u64) -> OverheadReport {
        let actual_bits = tell.saturating_sub(1);
        let overhead_percent = if self.ideal_bits > 0.0 {
            100.0 * (actual_bits as f64 - self.ideal_bits) / self.ideal_bits
        } else {
            0.0
        };
        let bits_per_symbol = if self.symbols > 0 {
            actual_bits as f64 / self.symbols as f64
        } else {
            0.0
        };
        OverheadReport {
            symbols: self.symbols,
            ideal_bits: self.ideal_bits,
            actual_bits,
            overhead_percent,
            bits_per_symbol,
        }
    }
}
