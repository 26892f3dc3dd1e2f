//! LED strip output trait

use rgb::RGB8;

/// Trait for addressable LED strips
///
/// Implementations push one full frame to the physical strip. Colors are
/// already brightness-scaled and in strip order.
pub trait PixelSink {
    /// Number of physical pixels
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Transmit a frame; extra colors are ignored, missing ones are dark
    fn write(&mut self, colors: &[RGB8]) -> impl core::future::Future<Output = ()>;
}
