//! Host document anchor objects.
//!
//! The host document owns its annotations; comments and the layout only hold
//! weak handles to them.

use std::cell::Cell;
use std::fmt;

/// An anchor in the host document that a comment is attached to.
pub trait Annotation {
    /// Vertical position (pixels from page top) the comment card would ideally take.
    fn desired_position(&self) -> f64;

    /// The comment was removed; the anchor should remove itself from the document.
    fn on_delete(&self);

    /// The comment card is on screen; highlight the anchor.
    fn show(&self);

    /// The comment card left the screen; remove the highlight.
    fn hide(&self);
}

impl fmt::Debug for dyn Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Annotation")
            .field("desired_position", &self.desired_position())
            .finish()
    }
}

/// Annotation with a settable position and observable visibility.
///
/// Useful for hosts with static anchors, for replaying layouts, and in tests.
#[derive(Debug, Default)]
pub struct FixedAnnotation {
    position: Cell<f64>,
    visible: Cell<bool>,
    deleted: Cell<bool>,
}

impl FixedAnnotation {
    /// Anchor at `position`.
    pub fn new(position: f64) -> Self {
        Self {
            position: Cell::new(position),
            visible: Cell::new(false),
            deleted: Cell::new(false),
        }
    }

    /// Move the anchor (e.g. after the host content reflowed).
    pub fn move_to(&self, position: f64) {
        self.position.set(position);
    }

    /// Whether `show` was called more recently than `hide`.
    pub fn is_visible(&self) -> bool {
        self.visible.get()
    }

    /// Whether `on_delete` was called.
    pub fn is_deleted(&self) -> bool {
        self.deleted.get()
    }
}

impl Annotation for FixedAnnotation {
    fn desired_position(&self) -> f64 {
        self.position.get()
    }

    fn on_delete(&self) {
        self.deleted.set(true);
        self.visible.set(false);
    }

    fn show(&self) {
        self.visible.set(true);
    }

    fn hide(&self) {
        self.visible.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_annotation_tracks_visibility() {
        let annotation = FixedAnnotation::new(10.0);
        assert!(!annotation.is_visible());

        annotation.show();
        assert!(annotation.is_visible());

        annotation.hide();
        assert!(!annotation.is_visible());
    }

    #[test]
    fn fixed_annotation_moves() {
        let annotation = FixedAnnotation::new(10.0);
        annotation.move_to(42.0);
        assert_eq!(annotation.desired_position(), 42.0);
    }

    #[test]
    fn delete_hides() {
        let annotation = FixedAnnotation::new(0.0);
        annotation.show();
        annotation.on_delete();
        assert!(annotation.is_deleted());
        assert!(!annotation.is_visible());
    }
}
