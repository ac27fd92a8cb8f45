//! Quadrature decoder abstraction

/// Hardware quadrature decoder
///
/// The hardware keeps a running count of quadrature transitions and raises
/// a periodic "report ready" interrupt while the count is nonzero.
pub trait QuadratureDecoder {
    /// Consume the report-ready flag
    fn take_report(&mut self) -> bool;

    /// Read and clear the hardware pulse accumulator
    ///
    /// Positive counts are clockwise rotation.
    fn read_and_clear(&mut self) -> i32;
}
