//! Rotary encoder detent accumulation
//!
//! The quadrature decoder counts four transitions per mechanical detent,
//! but a report may arrive after any number of them. Pulses are summed
//! into a signed accumulator and only whole detents are handed out; the
//! remainder carries over to the next report.

use radiopanel_hal::QuadratureDecoder;

/// Quadrature transitions per detent
pub const PULSES_PER_DETENT: i32 = 4;

/// Sub-detent carry
///
/// The remainder always satisfies `|remainder| < PULSES_PER_DETENT` and
/// has the sign of the rotation that produced it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DetentAccumulator {
    remainder: i32,
}

impl DetentAccumulator {
    pub const fn new() -> Self {
        Self { remainder: 0 }
    }

    /// Add `pulses` and return the number of whole detents completed
    ///
    /// Division truncates toward zero, so the carry keeps the sign of the
    /// accumulated rotation in both directions. When no detent completes
    /// the accumulator keeps the pulses.
    pub fn accumulate(&mut self, pulses: i32) -> i32 {
        let total = self.remainder.saturating_add(pulses);
        let detents = total / PULSES_PER_DETENT;
        self.remainder = total - detents * PULSES_PER_DETENT;
        detents
    }

    /// Pulses not yet converted into detents
    pub const fn remainder(&self) -> i32 {
        self.remainder
    }
}

/// Quadrature decoder plus its accumulator
pub struct Rotary<Q> {
    decoder: Q,
    accumulator: DetentAccumulator,
}

impl<Q: QuadratureDecoder> Rotary<Q> {
    pub fn new(decoder: Q) -> Self {
        Self {
            decoder,
            accumulator: DetentAccumulator::new(),
        }
    }

    /// Consume the decoder's report-ready flag
    pub fn has_report(&mut self) -> bool {
        self.decoder.take_report()
    }

    /// Read and clear the hardware pulse counter
    pub fn sample(&mut self) -> i32 {
        self.decoder.read_and_clear()
    }

    /// Sample the hardware and return completed detents
    pub fn detents(&mut self) -> i32 {
        let pulses = self.sample();
        self.accumulator.accumulate(pulses)
    }

    pub fn accumulator(&self) -> &DetentAccumulator {
        &self.accumulator
    }

    pub fn decoder(&self) -> &Q {
        &self.decoder
    }

    pub fn decoder_mut(&mut self) -> &mut Q {
        &mut self.decoder
    }
}
