//! Layout layer - vertical placement of comment cards.
//!
//! # Module Structure
//!
//! - `params`: LayoutParams - gap, top margin and anchor offset
//! - `annotation`: Annotation trait for host document anchors, FixedAnnotation
//! - `controller`: LayoutController - lazy, collision-free block layout

pub mod annotation;
pub mod controller;
pub mod params;

pub use annotation::{Annotation, FixedAnnotation};
pub use controller::LayoutController;
pub use params::LayoutParams;
