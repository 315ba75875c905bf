//! Global layout parameters.

/// Default gap between stacked comment cards, in pixels.
pub const DEFAULT_GAP: f64 = 20.0;

/// Default spacing from the top of the page to the first card, in pixels.
pub const DEFAULT_TOP_MARGIN: f64 = 100.0;

/// Default shift applied to every annotation's desired position, in pixels.
pub const DEFAULT_OFFSET: f64 = -50.0;

/// Parameters that affect the computed layout.
///
/// Changing them invalidates every calculated position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutParams {
    /// Minimum vertical gap between two cards.
    pub gap: f64,
    /// Spacing kept free at the top when nothing is pinned.
    pub top_margin: f64,
    /// Added to each annotation's desired position.
    pub offset: f64,
}

impl LayoutParams {
    /// Create new layout params.
    pub fn new(gap: f64, top_margin: f64, offset: f64) -> Self {
        Self {
            gap,
            top_margin,
            offset,
        }
    }

    /// Smallest offset a card may take when nothing is pinned.
    pub fn min_top(&self) -> f64 {
        self.top_margin + self.offset
    }
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self::new(DEFAULT_GAP, DEFAULT_TOP_MARGIN, DEFAULT_OFFSET)
    }
}
