//! The renderer the layer draws onto.
//!
//! The actual drawing happens elsewhere. The layer only needs to hand over
//! shapes, ask for a repaint, and keep track of which shapes are currently
//! hovered. This is what the [`Renderer`] trait captures.

use std::sync::Arc;
use kurbo::Point;
use crate::shape::Shape;


//------------ Renderer ------------------------------------------------------

pub trait Renderer {
    /// Registers a shape for drawing.
    fn add_shape(&mut self, shape: Arc<Shape>);

    /// Removes all registered shapes.
    ///
    /// This also drops the hover state.
    fn clear_all(&mut self);

    /// Draws all registered shapes.
    fn render(&mut self);

    /// Redraws the current state without any changes to the shapes.
    fn refresh(&mut self);

    /// Returns all registered shapes in registration order.
    fn all_shapes(&self) -> Vec<Arc<Shape>>;

    /// Returns the shape currently hovered, if any.
    fn hover_one(&self) -> Option<Arc<Shape>>;

    /// Marks the given shapes as hovered.
    fn update_hover_shapes(&mut self, shapes: Vec<Arc<Shape>>);
}


//------------ ShapeRegistry -------------------------------------------------

/// A renderer that only keeps track of shapes.
///
/// The registry keeps the registered shapes and the hover state and counts
/// repaints. It is used by the server, which hands the registered shapes
/// to clients for drawing.
#[derive(Debug, Default)]
pub struct ShapeRegistry {
    shapes: Vec<Arc<Shape>>,
    hovered: Vec<Arc<Shape>>,

    /// The number of `render` calls.
    renders: usize,

    /// The number of `refresh` calls.
    refreshes: usize,

    /// The minimum width in pixels of lines when picking shapes.
    pick_tolerance: f64,
}

impl ShapeRegistry {
    pub fn new() -> Self {
        ShapeRegistry {
            pick_tolerance: 4.,
            .. Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn shapes(&self) -> &[Arc<Shape>] {
        &self.shapes
    }

    pub fn hovered(&self) -> &[Arc<Shape>] {
        &self.hovered
    }

    pub fn renders(&self) -> usize {
        self.renders
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes
    }

    /// Hovers the topmost hoverable shape at the given world pixel.
    ///
    /// Returns the shape now hovered. If there is no such shape, the hover
    /// state is cleared.
    pub fn hover_at(&mut self, pt: Point) -> Option<Arc<Shape>> {
        let shape = self.shapes.iter().rev().find(|shape| {
            shape.hoverable && shape.contains(pt, self.pick_tolerance)
        }).cloned();
        self.hovered = shape.iter().cloned().collect();
        shape
    }

    pub fn clear_hover(&mut self) {
        self.hovered.clear()
    }
}

impl Renderer for ShapeRegistry {
    fn add_shape(&mut self, shape: Arc<Shape>) {
        self.shapes.push(shape)
    }

    fn clear_all(&mut self) {
        self.shapes.clear();
        self.hovered.clear();
    }

    fn render(&mut self) {
        self.renders += 1;
    }

    fn refresh(&mut self) {
        self.refreshes += 1;
    }

    fn all_shapes(&self) -> Vec<Arc<Shape>> {
        self.shapes.clone()
    }

    fn hover_one(&self) -> Option<Arc<Shape>> {
        self.hovered.first().cloned()
    }

    fn update_hover_shapes(&mut self, shapes: Vec<Arc<Shape>>) {
        self.hovered = shapes
    }
}


//============ Tests =========================================================
