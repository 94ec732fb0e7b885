//! Keeping the hover state across redraws.
//!
//! A redraw removes all shapes from the renderer and with them the hover
//! state. The feature behind the hovered shape is noted before and its new
//! shapes are hovered again afterwards.

use std::sync::Arc;
use crate::builder::BuildOptions;
use crate::feature::FeatureId;
use crate::render::Renderer;
use crate::shape::Shape;


//------------ HoverState ----------------------------------------------------

#[derive(Clone, Debug, Default)]
pub struct HoverState(Option<FeatureId>);

impl HoverState {
    /// Notes the feature of the currently hovered shape.
    ///
    /// Nothing is noted if hovering is disabled.
    pub fn capture<R: Renderer + ?Sized>(
        renderer: &R, options: &BuildOptions
    ) -> Self {
        if !options.hoverable {
            return HoverState(None)
        }
        HoverState(renderer.hover_one().map(|shape| shape.ref_data_id.clone()))
    }

    pub fn feature_id(&self) -> Option<&FeatureId> {
        self.0.as_ref()
    }

    /// Hovers all shapes of the noted feature again.
    ///
    /// This only happens if both hovering and multi-hovering are enabled.
    /// Returns the number of shapes hovered.
    pub fn reapply<R: Renderer + ?Sized>(
        self, renderer: &mut R, options: &BuildOptions
    ) -> usize {
        let id = match self.0 {
            Some(id) if options.hoverable && options.multi_hover => id,
            _ => return 0
        };
        let shapes = shapes_by_feature_id(renderer, Some(&id));
        let res = shapes.len();
        renderer.update_hover_shapes(shapes);
        res
    }
}


//------------ shapes_by_feature_id ------------------------------------------

/// Returns the registered shapes of a feature.
///
/// If `id` is `None`, all registered shapes are returned.
pub fn shapes_by_feature_id<R: Renderer + ?Sized>(
    renderer: &R, id: Option<&FeatureId>
) -> Vec<Arc<Shape>> {
    let shapes = renderer.all_shapes();
    match id {
        Some(id) => {
            shapes.into_iter().filter(|shape| {
                shape.ref_data_id == *id
            }).collect()
        }
        None => shapes
    }
}
