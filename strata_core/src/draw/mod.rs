// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Draw property resolution.
//!
//! [`resolve`] walks a [`LayerSource`] once and produces a [`ResolvedTree`]:
//! per-layer [`DrawProperties`], the [`RenderSurface`]s the tree needs, and
//! the *render surface layer list* that orders them.
//!
//! # Render surfaces
//!
//! A render surface is an offscreen target. The layer that owns it is its
//! *target* layer, and every layer drawn into it has that layer as its
//! [`render_target`](DrawProperties::render_target). Surfaces appear in the
//! render surface layer list before any surface they draw into is
//! finished, which is the order they must be rendered in.
//!
//! The root always owns a surface. Other layers get one when the effects on
//! them cannot be applied layer by layer; [`SurfaceReason`] names the cases.
//!
//! # Reuse
//!
//! [`resolve_into`] overwrites an existing [`ResolvedTree`], keeping its
//! allocations and the depth sorter's buffers between frames.
//!
//! [`LayerSource`]: crate::layer::LayerSource

use alloc::vec::Vec;

use kurbo::{Rect, Size, Vec2};

use crate::geometry::{map_clipped_rect, union_rect};
use crate::iter::{BackToFront, FrontToBack, LayerIterator};
use crate::layer::LayerId;
use crate::sort::{LayerSorter, SorterConfig};
use crate::transform::Transform3d;

mod resolve;
mod scroll;
mod surface;

pub use resolve::{resolve, resolve_into, resolve_traced};
pub use surface::{SkipReason, SurfaceReason, SurfaceRemoval};

/// Global inputs to a resolve pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolveInputs {
    /// The layer to resolve from. It must not have a parent.
    pub root: LayerId,
    /// Size of the device viewport, which clips the root surface.
    pub viewport: Size,
    /// Transform from the root's space to device space.
    pub device_transform: Transform3d,
    /// Device pixels per layout pixel.
    pub device_scale_factor: f64,
    /// Pinch zoom, applied below [`page_scale_layer`](Self::page_scale_layer).
    pub page_scale_factor: f64,
    /// The layer whose children are scaled by the page scale factor.
    pub page_scale_layer: Option<LayerId>,
    /// Upper bound on the side of a surface's content rect.
    pub max_texture_size: u32,
    /// Whether subpixel text may be used anywhere.
    pub can_use_lcd_text: bool,
    /// When `false`, only the root gets a surface.
    pub can_render_to_separate_surface: bool,
    /// When `false`, contents scales come from the device and page scale
    /// alone rather than from each layer's transform.
    pub can_adjust_raster_scales: bool,
    /// Tuning for 3D depth sorting.
    pub sorter: SorterConfig,
}

impl ResolveInputs {
    /// Inputs for `root` in a `viewport` with an identity device transform
    /// and unit scales.
    #[must_use]
    pub fn new(root: LayerId, viewport: Size) -> Self {
        Self {
            root,
            viewport,
            device_transform: Transform3d::IDENTITY,
            device_scale_factor: 1.0,
            page_scale_factor: 1.0,
            page_scale_layer: None,
            max_texture_size: 4096,
            can_use_lcd_text: false,
            can_render_to_separate_surface: true,
            can_adjust_raster_scales: true,
            sorter: SorterConfig::default(),
        }
    }
}

/// Per-layer output of a resolve pass.
///
/// Transforms map the layer's content space; rects are in the space of the
/// layer's render target unless noted.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DrawProperties {
    /// Content space to render target space.
    pub target_space_transform: Transform3d,
    /// Content space to device space.
    pub screen_space_transform: Transform3d,
    /// Whether an animation may change `target_space_transform`.
    pub target_space_transform_is_animating: bool,
    /// Whether an animation may change `screen_space_transform`.
    pub screen_space_transform_is_animating: bool,
    /// Opacity to draw with, relative to the render target.
    pub opacity: f32,
    /// Whether an animation may change `opacity`.
    pub opacity_is_animating: bool,
    /// Whether an animation may change opacity anywhere up to the screen.
    pub screen_space_opacity_is_animating: bool,
    /// Whether subpixel text may be used for this layer.
    pub can_use_lcd_text: bool,
    /// Whether `clip_rect` actually clips.
    pub is_clipped: bool,
    /// Clip inherited from ancestors and the layer itself.
    pub clip_rect: Rect,
    /// Target-space bounds of what the layer draws, after clipping.
    pub drawable_content_rect: Rect,
    /// The part of the layer's own bounds that can be seen, in content space.
    pub visible_content_rect: Rect,
    /// The layer owning the surface this layer draws into. `None` when the
    /// layer was skipped or its surface was removed.
    pub render_target: Option<LayerId>,
    /// Scale at which the layer's contents should be rasterized.
    pub ideal_contents_scale: f64,
    /// Largest scale an animation may reach, or 0 when unknown.
    pub maximum_animation_contents_scale: f64,
    /// Page scale applying to this layer, 1 outside the page scale subtree.
    pub page_scale_factor: f64,
    /// Device scale factor, including any scale in the device transform.
    pub device_scale_factor: f64,
}

/// An offscreen target owned by a layer.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderSurface {
    /// The layer that owns the surface.
    pub owner: LayerId,
    /// Surface space to the space of the surface it draws into.
    pub draw_transform: Transform3d,
    /// Surface space to device space.
    pub screen_space_transform: Transform3d,
    /// Draw transform for the reflection replica, when there is one.
    pub replica_draw_transform: Transform3d,
    /// Screen space transform for the reflection replica.
    pub replica_screen_space_transform: Transform3d,
    /// Opacity the surface is composited with.
    pub draw_opacity: f32,
    /// Whether an animation may change `draw_opacity`.
    pub draw_opacity_is_animating: bool,
    /// Whether an animation may change `draw_transform`.
    pub target_surface_transforms_are_animating: bool,
    /// Whether an animation may change `screen_space_transform`.
    pub screen_space_transforms_are_animating: bool,
    /// Whether `clip_rect` clips the surface.
    pub is_clipped: bool,
    /// Clip in the space of the target the surface draws into.
    pub clip_rect: Rect,
    /// Bounds of everything drawn into the surface, in surface space.
    pub content_rect: Rect,
    /// Whether the surface ends up on screen through its ancestors.
    pub contributes_to_drawn_surface: bool,
    /// Whether a reflection replica is drawn alongside.
    pub has_replica: bool,
    /// Raster scale baked into the surface's content space.
    pub sublayer_scale: Vec2,
    /// Layers drawn into this surface, in draw order.
    ///
    /// The owner comes first when it draws content. Entries that own a
    /// surface of their own stand for that surface.
    pub layer_list: Vec<LayerId>,
}

impl RenderSurface {
    pub(crate) fn new(owner: LayerId) -> Self {
        Self {
            owner,
            draw_transform: Transform3d::IDENTITY,
            screen_space_transform: Transform3d::IDENTITY,
            replica_draw_transform: Transform3d::IDENTITY,
            replica_screen_space_transform: Transform3d::IDENTITY,
            draw_opacity: 1.0,
            draw_opacity_is_animating: false,
            target_surface_transforms_are_animating: false,
            screen_space_transforms_are_animating: false,
            is_clipped: false,
            clip_rect: Rect::ZERO,
            content_rect: Rect::ZERO,
            contributes_to_drawn_surface: false,
            has_replica: false,
            sublayer_scale: Vec2::new(1.0, 1.0),
            layer_list: Vec::new(),
        }
    }

    /// Bounds of the surface and its replica in the target it draws into.
    #[must_use]
    pub fn drawable_content_rect(&self) -> Rect {
        let rect = map_clipped_rect(&self.draw_transform, self.content_rect);
        if self.has_replica {
            let replica = map_clipped_rect(&self.replica_draw_transform, self.content_rect);
            union_rect(rect, replica)
        } else {
            rect
        }
    }
}

/// Per-pass working state kept between passes for its allocations.
#[derive(Debug, Default)]
pub(crate) struct Scratch {
    pub(crate) sorter: LayerSorter,
    pub(crate) drawing_descendants: Vec<u32>,
    pub(crate) unclipped_descendants: Vec<u32>,
    pub(crate) clip_children: Vec<u32>,
    pub(crate) subtree_has_copy_request: Vec<bool>,
    pub(crate) subtree_has_input_handler: Vec<bool>,
    pub(crate) has_child_with_scroll_parent: Vec<bool>,
    pub(crate) queued_for_recursion: Vec<bool>,
    pub(crate) accumulated: Vec<AccumulatedSurfaceState>,
}

/// Drawable bounds gathered so far for one surface under construction.
#[derive(Clone, Copy, Debug)]
pub(crate) struct AccumulatedSurfaceState {
    pub(crate) render_target: LayerId,
    pub(crate) drawable_content_rect: Rect,
}

impl Scratch {
    pub(crate) fn reset(&mut self, slots: usize) {
        fn refill<V: Clone>(v: &mut Vec<V>, slots: usize, value: V) {
            v.clear();
            v.resize(slots, value);
        }
        refill(&mut self.drawing_descendants, slots, 0);
        refill(&mut self.unclipped_descendants, slots, 0);
        refill(&mut self.clip_children, slots, 0);
        refill(&mut self.subtree_has_copy_request, slots, false);
        refill(&mut self.subtree_has_input_handler, slots, false);
        refill(&mut self.has_child_with_scroll_parent, slots, false);
        refill(&mut self.queued_for_recursion, slots, false);
        self.accumulated.clear();
    }
}

/// The result of a resolve pass.
///
/// Indexed by [`LayerId`]. Layers outside the resolved subtree, or skipped
/// by it, report default draw properties and no render target.
#[derive(Debug, Default)]
pub struct ResolvedTree {
    pub(crate) root: Option<LayerId>,
    pub(crate) draw_properties: Vec<DrawProperties>,
    pub(crate) surfaces: Vec<Option<RenderSurface>>,
    pub(crate) surface_index: Vec<Option<usize>>,
    pub(crate) render_surface_layer_list: Vec<LayerId>,
    pub(crate) drawn: Vec<bool>,
    pub(crate) drawn_count: usize,
    pub(crate) scratch: Scratch,
}

impl ResolvedTree {
    /// Creates an empty result, ready for [`resolve_into`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The root of the last pass.
    #[must_use]
    pub fn root(&self) -> Option<LayerId> {
        self.root
    }

    /// Draw properties of `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is beyond the slot count of the resolved tree.
    #[must_use]
    pub fn draw_properties(&self, id: LayerId) -> &DrawProperties {
        &self.draw_properties[id.slot()]
    }

    /// The surface owned by `id`, if it owns one.
    #[must_use]
    pub fn render_surface(&self, id: LayerId) -> Option<&RenderSurface> {
        self.surfaces.get(id.slot()).and_then(Option::as_ref)
    }

    /// The layer owning the surface `id` draws into.
    #[must_use]
    pub fn render_target(&self, id: LayerId) -> Option<LayerId> {
        self.draw_properties
            .get(id.slot())
            .and_then(|p| p.render_target)
    }

    /// Surface-owning layers in the order their surfaces are rendered.
    ///
    /// The root comes first, and every surface precedes the surfaces it
    /// contains.
    #[must_use]
    pub fn render_surface_layer_list(&self) -> &[LayerId] {
        &self.render_surface_layer_list
    }

    /// Returns `true` if `id` draws its own content into some surface.
    #[must_use]
    pub fn is_drawn(&self, id: LayerId) -> bool {
        self.drawn.get(id.slot()).copied().unwrap_or(false)
    }

    /// Number of layers that draw their own content.
    #[must_use]
    pub fn drawn_layer_count(&self) -> usize {
        self.drawn_count
    }

    /// Iterates layers and surfaces front to back, for hit testing and
    /// occlusion.
    #[must_use]
    pub fn front_to_back(&self) -> LayerIterator<'_, FrontToBack> {
        LayerIterator::new(self)
    }

    /// Iterates layers and surfaces in paint order.
    #[must_use]
    pub fn back_to_front(&self) -> LayerIterator<'_, BackToFront> {
        LayerIterator::new(self)
    }

    /// Position of `id`'s surface in the render surface layer list.
    pub(crate) fn surface_position(&self, id: LayerId) -> Option<usize> {
        self.surface_index.get(id.slot()).copied().flatten()
    }

    /// The layer list of the surface at `index` in the render surface
    /// layer list.
    pub(crate) fn layer_list_at(&self, index: usize) -> &[LayerId] {
        self.render_surface_layer_list
            .get(index)
            .and_then(|&owner| self.render_surface(owner))
            .map_or(&[][..], |s| s.layer_list.as_slice())
    }

    pub(crate) fn reset(&mut self, root: LayerId, slots: usize) {
        self.root = Some(root);
        self.draw_properties.clear();
        self.draw_properties
            .resize(slots, DrawProperties::default());
        self.surfaces.clear();
        self.surfaces.resize(slots, None);
        self.surface_index.clear();
        self.surface_index.resize(slots, None);
        self.drawn.clear();
        self.drawn.resize(slots, false);
        self.drawn_count = 0;
        self.render_surface_layer_list.clear();
    }

    /// Indexes the finished surfaces and marks the layers they draw.
    /// Targets left pointing at removed surfaces are cleared.
    pub(crate) fn finish(&mut self) {
        for props in &mut self.draw_properties {
            if props
                .render_target
                .is_some_and(|t| self.surfaces[t.slot()].is_none())
            {
                props.render_target = None;
            }
        }
        for (index, &owner) in self.render_surface_layer_list.iter().enumerate() {
            self.surface_index[owner.slot()] = Some(index);
            let Some(surface) = self.surfaces[owner.slot()].as_ref() else {
                continue;
            };
            for &layer in &surface.layer_list {
                let itself = layer == owner || self.surfaces[layer.slot()].is_none();
                if itself && !self.drawn[layer.slot()] {
                    self.drawn[layer.slot()] = true;
                    self.drawn_count += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerStore;

    #[test]
    fn surface_drawable_rect_includes_replica() {
        let mut store = LayerStore::new();
        let owner = store.create_layer();
        let mut surface = RenderSurface::new(owner);
        surface.content_rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        surface.draw_transform = Transform3d::from_translation(5.0, 0.0, 0.0);
        assert_eq!(
            surface.drawable_content_rect(),
            Rect::new(5.0, 0.0, 15.0, 10.0)
        );

        surface.has_replica = true;
        surface.replica_draw_transform = Transform3d::from_translation(5.0, 20.0, 0.0);
        assert_eq!(
            surface.drawable_content_rect(),
            Rect::new(5.0, 0.0, 15.0, 30.0)
        );
    }

    #[test]
    fn empty_result_answers_queries() {
        let mut store = LayerStore::new();
        let layer = store.create_layer();
        let resolved = ResolvedTree::new();
        assert_eq!(resolved.root(), None);
        assert!(resolved.render_surface(layer).is_none());
        assert_eq!(resolved.render_target(layer), None);
        assert!(!resolved.is_drawn(layer));
        assert!(resolved.render_surface_layer_list().is_empty());
    }

    #[test]
    fn inputs_defaults() {
        let mut store = LayerStore::new();
        let root = store.create_layer();
        let inputs = ResolveInputs::new(root, Size::new(800.0, 600.0));
        assert!(inputs.device_transform.is_identity());
        assert_eq!(inputs.device_scale_factor, 1.0);
        assert!(inputs.can_render_to_separate_surface);
        assert!(!inputs.can_use_lcd_text);
    }
}
