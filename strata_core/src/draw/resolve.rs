// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The resolve pass.
//!
//! A pre-pass gathers per-subtree facts (drawing descendants, unclipped
//! descendants, copy requests, input handlers, scroll children). The main
//! pass then walks the tree depth first. On the way down it accumulates
//! transforms, opacity and clips and decides on surfaces. On the way up it
//! computes drawable and visible rects, sizes surfaces, drops empty ones and
//! depth-sorts 3D rendering contexts.

use alloc::vec::Vec;

use kurbo::{Point, Rect, Vec2};

use super::scroll::{self, effective_scroll_delta, effective_total_scroll_offset};
use super::surface::{
    is_surface_backface_visible, layer_should_be_skipped, skip_reason, surface_reason,
};
use super::{
    AccumulatedSurfaceState, DrawProperties, RenderSurface, ResolveInputs, ResolvedTree, Scratch,
    SurfaceReason, SurfaceRemoval,
};
use crate::geometry::{
    calculate_visible_rect, clamp_rect_size, enclosed_rect, enclosing_rect, intersect_rect,
    map_enclosing_clipped_rect, project_enclosing_clipped_rect, rect_is_empty, union_rect,
    visible_rect_with_cached_layer_rect,
};
use crate::layer::{AnimationState, LayerId, LayerSource};
use crate::sort::LayerShape;
use crate::trace::{
    LayersSortedEvent, ResolveBeginEvent, ResolveEndEvent, ResolveSummaryBuilder,
    SurfaceCreatedEvent, SurfaceRemovedEvent, Tracer,
};
use crate::transform::Transform3d;

/// Scales at or below this are treated as degenerate for sublayer scaling.
const MIN_SUBLAYER_SCALE: f64 = 1e-6;

/// Resolves draw properties for the tree under `inputs.root`.
///
/// Convenience wrapper around [`resolve_into`] that allocates a fresh
/// [`ResolvedTree`].
///
/// # Panics
///
/// Panics if `inputs.root` has a parent.
#[must_use]
pub fn resolve<T: LayerSource + ?Sized>(tree: &T, inputs: &ResolveInputs) -> ResolvedTree {
    let mut out = ResolvedTree::new();
    resolve_into(tree, inputs, &mut out);
    out
}

/// Resolves draw properties into an existing [`ResolvedTree`].
///
/// Everything in `out` is overwritten; its buffers are reused.
///
/// # Panics
///
/// Panics if `inputs.root` has a parent.
pub fn resolve_into<T: LayerSource + ?Sized>(
    tree: &T,
    inputs: &ResolveInputs,
    out: &mut ResolvedTree,
) {
    resolve_traced(tree, inputs, out, &mut Tracer::none());
}

/// Like [`resolve_into`], reporting pass events to `tracer`.
///
/// # Panics
///
/// Panics if `inputs.root` has a parent.
pub fn resolve_traced<T: LayerSource + ?Sized>(
    tree: &T,
    inputs: &ResolveInputs,
    out: &mut ResolvedTree,
    tracer: &mut Tracer<'_>,
) {
    let root = inputs.root;
    assert!(
        tree.parent(root).is_none(),
        "resolve root {root:?} must not have a parent"
    );

    let slots = tree.slot_count();
    tracer.resolve_begin(&ResolveBeginEvent {
        root,
        slot_count: slots,
    });

    out.reset(root, slots);
    let mut scratch = core::mem::take(&mut out.scratch);
    scratch.reset(slots);
    scratch.sorter.set_config(inputs.sorter);

    let mut summary = ResolveSummaryBuilder::new();
    {
        let globals = Globals::new(inputs);
        let root_data = DataForRecursion::for_root(root, inputs);
        let mut pass = Pass {
            tree,
            globals,
            out: &mut *out,
            scratch: &mut scratch,
            tracer: &mut *tracer,
            summary: &mut summary,
        };
        pass.precalculate(root);
        pass.calculate(root, &root_data, root);
    }
    out.scratch = scratch;
    out.finish();

    let end = ResolveEndEvent {
        root,
        render_surfaces: out.render_surface_layer_list.len(),
        drawn_layers: out.drawn_layer_count(),
    };
    tracer.resolve_end(&end);
    tracer.resolve_summary(&summary.finish(&end));
}

/// Inputs that stay fixed for the whole pass.
#[derive(Clone, Copy, Debug)]
struct Globals {
    device_scale_factor: f64,
    page_scale_factor: f64,
    page_scale_layer: Option<LayerId>,
    max_texture_size: f64,
    can_render_to_separate_surface: bool,
    can_adjust_raster_scales: bool,
}

impl Globals {
    fn new(inputs: &ResolveInputs) -> Self {
        // A scale in the device transform counts as device scale too.
        let device_scales = inputs.device_transform.scale_components_2d(1.0);
        Self {
            device_scale_factor: inputs.device_scale_factor * device_scales.x.max(device_scales.y),
            page_scale_factor: inputs.page_scale_factor,
            page_scale_layer: inputs.page_scale_layer,
            max_texture_size: f64::from(inputs.max_texture_size),
            can_render_to_separate_surface: inputs.can_render_to_separate_surface,
            can_adjust_raster_scales: inputs.can_adjust_raster_scales,
        }
    }
}

/// State handed from a layer to each of its children.
#[derive(Clone, Copy, Debug)]
struct DataForRecursion {
    /// Transform from the parent's space to the current render target.
    parent_matrix: Transform3d,
    /// Transform from the current render target to the screen.
    full_hierarchy: Transform3d,
    /// Undoes uncommitted scroll deltas for fixed-position layers.
    scroll_compensation: Transform3d,
    fixed_container: LayerId,
    /// Clip in the current render target's space.
    clip_rect_in_target_space: Rect,
    /// The current target surface's own clip, in that surface's space.
    clip_rect_of_target_surface: Rect,
    maximum_animation_contents_scale: f64,
    ancestor_is_animating_scale: bool,
    ancestor_clips_subtree: bool,
    in_page_scale_subtree: bool,
    subtree_can_use_lcd_text: bool,
    subtree_is_visible: bool,
}

impl DataForRecursion {
    fn for_root(root: LayerId, inputs: &ResolveInputs) -> Self {
        let viewport = Rect::from_origin_size(Point::ZERO, inputs.viewport);
        let dsf = inputs.device_scale_factor;
        Self {
            parent_matrix: inputs.device_transform * Transform3d::from_scale_2d(dsf, dsf),
            full_hierarchy: Transform3d::IDENTITY,
            scroll_compensation: Transform3d::IDENTITY,
            fixed_container: root,
            clip_rect_in_target_space: viewport,
            clip_rect_of_target_surface: viewport,
            maximum_animation_contents_scale: 0.0,
            ancestor_is_animating_scale: false,
            ancestor_clips_subtree: true,
            in_page_scale_subtree: false,
            subtree_can_use_lcd_text: inputs.can_use_lcd_text,
            subtree_is_visible: true,
        }
    }
}

/// What the pre-pass reports about a subtree.
#[derive(Clone, Copy, Debug, Default)]
struct SubtreeMeta {
    unclipped_descendants: u32,
    has_copy_request: bool,
    has_input_handler: bool,
}

impl SubtreeMeta {
    fn merge(&mut self, child: Self) {
        self.unclipped_descendants += child.unclipped_descendants;
        self.has_copy_request |= child.has_copy_request;
        self.has_input_handler |= child.has_input_handler;
    }
}

struct Pass<'p, 's, T: ?Sized> {
    tree: &'p T,
    globals: Globals,
    out: &'p mut ResolvedTree,
    scratch: &'p mut Scratch,
    tracer: &'p mut Tracer<'s>,
    summary: &'p mut ResolveSummaryBuilder,
}

impl<T: LayerSource + ?Sized> Pass<'_, '_, T> {
    /// Fills the per-subtree side-tables for `id` and its descendants.
    ///
    /// Subtrees under a singular, non-animating transform are never drawn,
    /// so they contribute nothing.
    fn precalculate(&mut self, id: LayerId) -> SubtreeMeta {
        let tree = self.tree;
        let slot = id.slot();
        let mut meta = SubtreeMeta::default();

        if !tree.transform_is_invertible(id) && !tree.animation(id).transform_is_animating() {
            return meta;
        }

        if let Some(clip_parent) = tree.clip_parent(id) {
            meta.unclipped_descendants += 1;
            if let Some(count) = self.scratch.clip_children.get_mut(clip_parent.slot()) {
                *count += 1;
            }
        }

        let mut drawing = 0_u32;
        for child in tree.children(id) {
            let child_meta = self.precalculate(child);
            drawing += u32::from(tree.flags(child).draws_content)
                + self.scratch.drawing_descendants[child.slot()];
            if tree.scroll_parent(child).is_some() {
                self.scratch.has_child_with_scroll_parent[slot] = true;
            }
            meta.merge(child_meta);
        }

        // Clip children of this layer are clipped again once they reach it.
        meta.unclipped_descendants = meta
            .unclipped_descendants
            .saturating_sub(self.scratch.clip_children[slot]);

        let flags = tree.flags(id);
        meta.has_copy_request |= flags.has_copy_request;
        meta.has_input_handler |= flags.has_input_handler;

        self.scratch.drawing_descendants[slot] = drawing;
        self.scratch.unclipped_descendants[slot] = meta.unclipped_descendants;
        self.scratch.subtree_has_copy_request[slot] = meta.has_copy_request;
        self.scratch.subtree_has_input_handler[slot] = meta.has_input_handler;
        meta
    }

    /// Resolves `id` and its subtree.
    ///
    /// `list_owner` is the surface-owning layer whose layer list receives
    /// `id` if it draws without a surface of its own.
    fn calculate(&mut self, id: LayerId, from: &DataForRecursion, list_owner: LayerId) {
        let tree = self.tree;
        let slot = id.slot();
        let parent = tree.parent(id);
        let is_root = parent.is_none();
        let flags = tree.flags(id);
        let animation = tree.animation(id);

        let layer_is_visible = from.subtree_is_visible && !flags.hidden;
        let layer_is_drawn = layer_is_visible || flags.has_copy_request;

        if !is_root
            && let Some(reason) = skip_reason(
                tree,
                id,
                layer_is_drawn,
                self.scratch.subtree_has_copy_request[slot],
                self.scratch.subtree_has_input_handler[slot],
            )
        {
            self.summary.subtree_skipped();
            #[cfg(feature = "trace-rich")]
            self.tracer
                .subtree_skipped(&crate::trace::SubtreeSkippedEvent { layer: id, reason });
            #[cfg(not(feature = "trace-rich"))]
            let _ = reason;
            return;
        }

        let (ancestor_clip, ancestor_clips) = self.clip_for_clip_child(
            id,
            parent,
            from.clip_rect_in_target_space,
            from.ancestor_clips_subtree,
        );

        // Opacity and animation state accumulate down the tree.
        let mut draw_opacity = tree.opacity(id);
        let mut opacity_animating_to_target = animation.opacity;
        let mut opacity_animating_to_screen = animation.opacity;
        let mut transform_animating_to_target = animation.transform_is_animating();
        let mut transform_animating_to_screen = transform_animating_to_target;
        if let Some(p) = parent {
            let pp = &self.out.draw_properties[p.slot()];
            draw_opacity *= pp.opacity;
            opacity_animating_to_target |= pp.opacity_is_animating;
            opacity_animating_to_screen |= pp.screen_space_opacity_is_animating;
            transform_animating_to_target |= pp.target_space_transform_is_animating;
            transform_animating_to_screen |= pp.screen_space_transform_is_animating;
        }

        // Parent space to layer space, around the transform origin.
        let origin = tree.transform_origin(id);
        let position = tree.position(id) - effective_total_scroll_offset(tree, id);
        let local = tree.transform(id);
        let mut combined = if local.is_identity() {
            from.parent_matrix * Transform3d::from_translation(position.x, position.y, 0.0)
        } else {
            let (px, py) = (position.x + origin.x, position.y + origin.y);
            from.parent_matrix
                * Transform3d::from_translation(px, py, origin.z)
                * local
                * Transform3d::from_translation(-origin.x, -origin.y, -origin.z)
        };

        let mut scroll_delta = effective_scroll_delta(tree, id);
        let snaps_to_pixels = flags.scrollable
            && !transform_animating_to_target
            && combined.is_scale_or_translation();
        if snaps_to_pixels {
            // Snap scrolled content to whole pixels and hide the snap from
            // fixed-position descendants.
            let before = combined.translation_2d();
            combined = combined.round_translation_2d();
            let moved = combined.translation_2d() - before;
            let parent_scales = from.parent_matrix.scale_components_2d(1.0);
            scroll_delta -= Vec2::new(
                divide_or_zero(moved.x, parent_scales.x),
                divide_or_zero(moved.y, parent_scales.y),
            );
        }

        scroll::apply_position_adjustment(
            tree,
            self.out,
            id,
            from.fixed_container,
            &from.scroll_compensation,
            &mut combined,
        );

        let (animating_scale, maximum_animation_scale) = if self.globals.can_adjust_raster_scales {
            animation_contents_scale(
                &local,
                &animation,
                from.ancestor_is_animating_scale,
                from.maximum_animation_contents_scale,
                &from.parent_matrix,
                &combined,
            )
        } else {
            (false, 0.0)
        };

        let page_scale = if from.in_page_scale_subtree {
            self.globals.page_scale_factor
        } else {
            1.0
        };
        let layer_scale_factors = self.globals.device_scale_factor * page_scale;
        let combined_scales = combined.scale_components_2d(layer_scale_factors);
        let ideal_contents_scale = if self.globals.can_adjust_raster_scales {
            combined_scales.x.max(combined_scales.y)
        } else {
            layer_scale_factors
        };

        let mut screen_from_target = from.full_hierarchy;
        if flags.should_flatten_transform {
            screen_from_target = screen_from_target.flatten_to_2d();
        }

        let mut props = DrawProperties {
            target_space_transform: combined,
            screen_space_transform: screen_from_target * combined,
            ideal_contents_scale,
            maximum_animation_contents_scale: maximum_animation_scale,
            page_scale_factor: page_scale,
            device_scale_factor: self.globals.device_scale_factor,
            ..DrawProperties::default()
        };

        let adjust_text_aa = !opacity_animating_to_screen && !transform_animating_to_screen;
        let layer_can_use_lcd_text = from.subtree_can_use_lcd_text
            && draw_opacity == 1.0
            && combined.is_identity_or_integer_translation();

        let reason = if self.globals.can_render_to_separate_surface {
            surface_reason(
                tree,
                id,
                is_root,
                self.scratch.drawing_descendants[slot],
                combined.preserves_2d_axis_alignment(),
            )
        } else if is_root {
            Some(SurfaceReason::Root)
        } else {
            None
        };

        let owns_surface = reason.is_some();
        let mut layer_or_ancestor_clips = false;
        let mut clip_rect = Rect::ZERO;
        let mut clip_of_target_surface = from.clip_rect_of_target_surface;
        let mut child_lcd = from.subtree_can_use_lcd_text;
        let child_parent_matrix;
        let child_full_hierarchy;

        if let Some(reason) = reason {
            if !is_root && !flags.double_sided && is_surface_backface_visible(tree, id, &combined) {
                self.out.draw_properties[slot] = props;
                self.summary.surface_removed();
                self.tracer.surface_removed(&SurfaceRemovedEvent {
                    layer: id,
                    reason: SurfaceRemoval::BackFaceVisible,
                });
                return;
            }
            self.summary.surface_created();
            self.tracer
                .surface_created(&SurfaceCreatedEvent { layer: id, reason });

            let raster_scales = if self.globals.can_adjust_raster_scales {
                combined_scales
            } else {
                Vec2::new(layer_scale_factors, layer_scale_factors)
            };
            let sublayer_scale = sanitize_sublayer_scale(raster_scales);

            let mut surface = RenderSurface::new(id);
            surface.sublayer_scale = sublayer_scale;
            if is_root {
                // The root surface is the viewport; its transform goes to the
                // children instead.
                child_parent_matrix = combined;
            } else {
                surface.draw_transform = combined
                    * Transform3d::from_scale_2d(1.0 / sublayer_scale.x, 1.0 / sublayer_scale.y);
                props.target_space_transform =
                    Transform3d::from_scale_2d(sublayer_scale.x, sublayer_scale.y);
                child_parent_matrix = props.target_space_transform;
                surface.contributes_to_drawn_surface = layer_is_visible;
            }

            // Opacity moves onto the surface.
            surface.draw_opacity = draw_opacity;
            surface.draw_opacity_is_animating = opacity_animating_to_target;
            props.opacity = 1.0;
            props.opacity_is_animating = false;
            props.screen_space_opacity_is_animating = opacity_animating_to_screen;

            surface.target_surface_transforms_are_animating = transform_animating_to_target;
            surface.screen_space_transforms_are_animating = transform_animating_to_screen;
            props.target_space_transform_is_animating = false;
            props.screen_space_transform_is_animating = transform_animating_to_screen;

            child_full_hierarchy = from.full_hierarchy * surface.draw_transform;

            let mut clipped_by_surface_bounds = false;
            if ancestor_clips && let Some(inverse) = surface.draw_transform.inverse() {
                let projected = project_enclosing_clipped_rect(&inverse, ancestor_clip);
                if self.scratch.unclipped_descendants[slot] > 0 {
                    // Some descendant escapes the ancestor clip, so the
                    // surface itself cannot be clipped.
                    layer_or_ancestor_clips = true;
                    clip_rect = projected;
                } else {
                    surface.clip_rect = ancestor_clip;
                    clip_of_target_surface = projected;
                    clipped_by_surface_bounds = true;
                }
            }
            surface.is_clipped = clipped_by_surface_bounds;
            if !clipped_by_surface_bounds {
                surface.clip_rect = Rect::ZERO;
            }

            self.scratch.accumulated.push(AccumulatedSurfaceState {
                render_target: id,
                drawable_content_rect: Rect::ZERO,
            });
            child_lcd = layer_can_use_lcd_text;
            props.render_target = Some(id);
            self.out.surfaces[slot] = Some(surface);
            self.out.render_surface_layer_list.push(id);
        } else {
            props.target_space_transform_is_animating = transform_animating_to_target;
            props.screen_space_transform_is_animating = transform_animating_to_screen;
            props.opacity = draw_opacity;
            props.opacity_is_animating = opacity_animating_to_target;
            props.screen_space_opacity_is_animating = opacity_animating_to_screen;

            child_parent_matrix = combined;
            child_full_hierarchy = from.full_hierarchy;

            layer_or_ancestor_clips = ancestor_clips;
            if ancestor_clips {
                clip_rect = ancestor_clip;
            }
            props.render_target = parent.and_then(|p| self.out.render_target(p));
        }

        if adjust_text_aa {
            props.can_use_lcd_text = layer_can_use_lcd_text;
        }

        let bounds = tree.bounds(id);
        let content_rect = Rect::from_origin_size(Point::ZERO, bounds);
        let rect_in_target =
            map_enclosing_clipped_rect(&props.target_space_transform, content_rect);

        if flags.clips_subtree() {
            clip_rect = if ancestor_clips && !owns_surface {
                intersect_rect(ancestor_clip, rect_in_target)
            } else {
                rect_in_target
            };
            layer_or_ancestor_clips = true;
        }
        props.is_clipped = layer_or_ancestor_clips;
        props.clip_rect = if layer_or_ancestor_clips {
            clip_rect
        } else {
            rect_in_target
        };
        self.out.draw_properties[slot] = props;

        let owner = if owns_surface { id } else { list_owner };
        let sorting_start = self.list_len(owner);
        let out = &*self.out;
        if !layer_should_be_skipped(tree, id, layer_is_drawn, |l| {
            out.draw_properties[l.slot()].target_space_transform
        }) {
            self.push_to_list(owner, id);
        }

        let mut child_parent_matrix = child_parent_matrix;
        let mut in_page_scale_subtree = from.in_page_scale_subtree;
        if self.globals.page_scale_layer == Some(id) {
            let s = self.globals.page_scale_factor;
            child_parent_matrix = child_parent_matrix * Transform3d::from_scale_2d(s, s);
            in_page_scale_subtree = true;
        }
        if flags.should_flatten_transform {
            child_parent_matrix = child_parent_matrix.flatten_to_2d();
        }

        let surface_draw = self.out.render_surface(id).map(|s| s.draw_transform);
        let for_children = DataForRecursion {
            parent_matrix: child_parent_matrix,
            full_hierarchy: child_full_hierarchy,
            scroll_compensation: scroll::compensation_for_children(
                tree,
                id,
                &from.parent_matrix,
                &from.scroll_compensation,
                scroll_delta,
                surface_draw.as_ref(),
            ),
            fixed_container: if flags.is_container_for_fixed_position_layers {
                id
            } else {
                from.fixed_container
            },
            clip_rect_in_target_space: clip_rect,
            clip_rect_of_target_surface: clip_of_target_surface,
            maximum_animation_contents_scale: maximum_animation_scale,
            ancestor_is_animating_scale: animating_scale,
            ancestor_clips_subtree: layer_or_ancestor_clips,
            in_page_scale_subtree,
            subtree_can_use_lcd_text: child_lcd,
            subtree_is_visible: layer_is_drawn,
        };

        if self.scratch.has_child_with_scroll_parent[slot] {
            for child in self.children_in_scroll_order(id) {
                self.visit_child(child, &for_children, owner);
            }
        } else {
            for child in tree.children(id) {
                self.visit_child(child, &for_children, owner);
            }
        }

        // Post-order: everything below has been placed.
        let mut subtree_rect = self
            .scratch
            .accumulated
            .last()
            .map_or(Rect::ZERO, |s| s.drawable_content_rect);
        if owns_surface {
            self.scratch.accumulated.pop();
        }

        if owns_surface && !is_root && self.list_len(id) == 0 {
            self.remove_surfaces_from(id, SurfaceRemoval::EmptyLayerList);
            return;
        }

        let mut drawable = rect_in_target;
        if layer_or_ancestor_clips {
            drawable = intersect_rect(drawable, clip_rect);
        }
        if flags.draws_content {
            subtree_rect = union_rect(subtree_rect, drawable);
        }
        let visible = self.visible_content_rect(
            id,
            content_rect,
            rect_in_target,
            drawable,
            clip_of_target_surface,
        );
        {
            let props = &mut self.out.draw_properties[slot];
            props.drawable_content_rect = drawable;
            props.visible_content_rect = visible;
        }

        if is_root {
            if let Some(surface) = self.out.surfaces[slot].as_mut() {
                surface.content_rect = ancestor_clip;
            }
        } else if owns_surface && !self.finish_surface(id, subtree_rect) {
            return;
        }

        if sorting_start == self.list_len(owner) {
            return;
        }
        if tree.is_3d_sorted(id) && !tree.is_in_existing_3d_context(id) {
            self.sort_context(owner, sorting_start, id);
        }
        self.update_accumulated_surface_state(id, parent, subtree_rect);
    }

    fn visit_child(&mut self, child: LayerId, data: &DataForRecursion, owner: LayerId) {
        self.calculate(child, data, owner);
        let contributes = self
            .out
            .render_surface(child)
            .is_some_and(|s| !s.layer_list.is_empty() && !rect_is_empty(s.content_rect));
        if contributes {
            self.push_to_list(owner, child);
        }
    }

    /// Sizes the surface owned by `id` and fills in its screen and replica
    /// transforms. Returns `false` if the surface turned out empty and was
    /// removed.
    fn finish_surface(&mut self, id: LayerId, subtree_rect: Rect) -> bool {
        let tree = self.tree;
        let slot = id.slot();
        let reflection = tree.reflection(id);
        let max_texture_size = self.globals.max_texture_size;
        let layer_screen = self.out.draw_properties[slot].screen_space_transform;
        let Some(surface) = self.out.surfaces[slot].as_mut() else {
            return false;
        };

        let mut content = subtree_rect;
        if reflection.is_none() && surface.is_clipped && !rect_is_empty(content) {
            // Reflections may show what the surface clip hides, so only
            // unreflected surfaces shrink to their clip.
            let visible =
                calculate_visible_rect(surface.clip_rect, content, &surface.draw_transform);
            content = intersect_rect(content, visible);
        }
        content = clamp_rect_size(content, max_texture_size);
        if rect_is_empty(content) {
            self.remove_surfaces_from(id, SurfaceRemoval::EmptyContent);
            return false;
        }
        surface.content_rect = content;

        let s = surface.sublayer_scale;
        let unscale = Transform3d::from_scale_2d(1.0 / s.x, 1.0 / s.y);
        surface.screen_space_transform = layer_screen * unscale;

        if let Some(reflection) = reflection {
            let o = reflection.transform_origin;
            let p = reflection.position;
            let replica_origin_to_owner = Transform3d::from_scale_2d(s.x, s.y)
                * Transform3d::from_translation(p.x + o.x, p.y + o.y, 0.0)
                * reflection.transform
                * Transform3d::from_translation(-o.x, -o.y, 0.0)
                * unscale;
            surface.has_replica = true;
            surface.replica_draw_transform = surface.draw_transform * replica_origin_to_owner;
            surface.replica_screen_space_transform =
                surface.screen_space_transform * replica_origin_to_owner;
        }
        true
    }

    /// Computes the visible part of `id`'s own bounds, in content space.
    fn visible_content_rect(
        &self,
        id: LayerId,
        content_rect: Rect,
        rect_in_target: Rect,
        drawable: Rect,
        clip_of_target_surface: Rect,
    ) -> Rect {
        if !self.tree.flags(id).draws_content
            || rect_is_empty(content_rect)
            || rect_is_empty(drawable)
        {
            return Rect::ZERO;
        }
        let props = &self.out.draw_properties[id.slot()];
        let target_clip = props
            .render_target
            .and_then(|t| self.out.render_surface(t))
            .map_or(Rect::ZERO, |s| s.clip_rect);
        let mut visible_in_target = drawable;
        if !rect_is_empty(target_clip) {
            visible_in_target = intersect_rect(visible_in_target, clip_of_target_surface);
        }
        if rect_is_empty(visible_in_target) {
            return Rect::ZERO;
        }
        visible_rect_with_cached_layer_rect(
            visible_in_target,
            content_rect,
            rect_in_target,
            &props.target_space_transform,
        )
    }

    /// Picks the clip a layer inherits when its scroll or clip parent is
    /// not its structural parent.
    fn clip_for_clip_child(
        &self,
        id: LayerId,
        parent: Option<LayerId>,
        clip: Rect,
        clips: bool,
    ) -> (Rect, bool) {
        let tree = self.tree;
        let Some(parent) = parent else {
            return (clip, clips);
        };
        let clip_parent = tree.clip_parent(id);
        let Some(source) = tree.scroll_parent(id).or(clip_parent) else {
            return (clip, clips);
        };
        if source == parent {
            return (clip, clips);
        }

        let source_props = &self.out.draw_properties[source.slot()];
        let rect = if Some(source) == clip_parent {
            // The clip parent is an ancestor, so its clip moves down.
            let offset = self.change_of_basis_translation(source, parent);
            enclosing_rect(source_props.clip_rect - offset)
        } else {
            let offset = self.change_of_basis_translation(parent, source);
            enclosing_rect(source_props.clip_rect + offset)
        };
        (rect, source_props.is_clipped)
    }

    /// Translation from the render target of `descendant` to that of
    /// `ancestor`, summing the surface offsets in between.
    fn change_of_basis_translation(&self, ancestor: LayerId, descendant: LayerId) -> Vec2 {
        let ancestor_target = self.out.render_target(ancestor);
        let mut translation = Vec2::ZERO;
        let mut current = self.out.render_target(descendant);
        while let Some(target) = current {
            if Some(target) == ancestor_target {
                break;
            }
            if let Some(surface) = self.out.render_surface(target) {
                translation += surface.draw_transform.translation_2d();
            }
            current = self
                .tree
                .parent(target)
                .and_then(|p| self.out.render_target(p));
        }
        translation
    }

    /// Children of `parent` with every scroll parent placed before the
    /// layers it scrolls.
    fn children_in_scroll_order(&mut self, parent: LayerId) -> Vec<LayerId> {
        let tree = self.tree;
        let mut order = Vec::new();
        for child in tree.children(parent) {
            self.queue_scroll_chain(&mut order, parent, child);
        }
        order
    }

    fn queue_scroll_chain(&mut self, order: &mut Vec<LayerId>, parent: LayerId, layer: LayerId) {
        let tree = self.tree;
        let Some(child) = child_containing(tree, parent, layer) else {
            return;
        };
        let queued = &mut self.scratch.queued_for_recursion[child.slot()];
        if *queued {
            return;
        }
        *queued = true;
        if let Some(scroll_parent) = tree.scroll_parent(child) {
            self.queue_scroll_chain(order, parent, scroll_parent);
        }
        order.push(child);
    }

    /// Grows the drawable rect of every open surface up to the one `id`
    /// draws into.
    fn update_accumulated_surface_state(
        &mut self,
        id: LayerId,
        parent: Option<LayerId>,
        subtree_rect: Rect,
    ) {
        let clip_parent = self.tree.clip_parent(id);
        let Some(render_target) = clip_parent
            .or(parent)
            .and_then(|l| self.out.render_target(l))
        else {
            return;
        };

        let mut target_rect = match self.out.render_surface(id) {
            Some(surface) => enclosed_rect(surface.drawable_content_rect()),
            None => subtree_rect,
        };
        let target_props = &self.out.draw_properties[render_target.slot()];
        if target_props.is_clipped {
            let mut clip = target_props.clip_rect;
            if let Some(clip_parent) = clip_parent {
                clip = enclosing_rect(clip - self.change_of_basis_translation(clip_parent, id));
            }
            target_rect = intersect_rect(target_rect, clip);
        }

        let out = &*self.out;
        for state in self.scratch.accumulated.iter_mut().rev() {
            state.drawable_content_rect = union_rect(state.drawable_content_rect, target_rect);
            if state.render_target == render_target {
                break;
            }
            let draw = out
                .render_surface(state.render_target)
                .map_or(Transform3d::IDENTITY, |s| s.draw_transform);
            target_rect = map_enclosing_clipped_rect(&draw, target_rect);
        }
    }

    /// Depth-sorts the part of `owner`'s layer list added under
    /// `context_root`.
    fn sort_context(&mut self, owner: LayerId, start: usize, context_root: LayerId) {
        let tree = self.tree;
        let Some(mut list) = self.out.surfaces[owner.slot()]
            .as_mut()
            .map(|s| core::mem::take(&mut s.layer_list))
        else {
            return;
        };

        let out = &*self.out;
        let stats = self.scratch.sorter.sort(&mut list[start..], |layer| {
            Some(match out.render_surface(layer) {
                Some(surface) if layer != owner => {
                    LayerShape::new(surface.content_rect, &surface.draw_transform)
                }
                _ => LayerShape::new(
                    Rect::from_origin_size(Point::ZERO, tree.bounds(layer)),
                    &out.draw_properties[layer.slot()].target_space_transform,
                ),
            })
        });

        if let Some(surface) = self.out.surfaces[owner.slot()].as_mut() {
            surface.layer_list = list;
        }
        self.summary.layers_sorted(&stats);
        self.tracer.layers_sorted(&LayersSortedEvent {
            context_root,
            stats,
        });
    }

    /// Pops surfaces off the render surface layer list down to and
    /// including the one owned by `id`.
    fn remove_surfaces_from(&mut self, id: LayerId, reason: SurfaceRemoval) {
        while let Some(last) = self.out.render_surface_layer_list.pop() {
            self.out.surfaces[last.slot()] = None;
            self.summary.surface_removed();
            self.tracer.surface_removed(&SurfaceRemovedEvent {
                layer: last,
                reason,
            });
            if last == id {
                break;
            }
        }
    }

    fn list_len(&self, owner: LayerId) -> usize {
        self.out
            .render_surface(owner)
            .map_or(0, |s| s.layer_list.len())
    }

    fn push_to_list(&mut self, owner: LayerId, id: LayerId) {
        if let Some(surface) = self.out.surfaces[owner.slot()].as_mut() {
            surface.layer_list.push(id);
        }
    }
}

/// The child of `parent` on the path up from `layer`, if `layer` is below
/// `parent` at all.
fn child_containing<T: LayerSource + ?Sized>(
    tree: &T,
    parent: LayerId,
    layer: LayerId,
) -> Option<LayerId> {
    let mut current = layer;
    loop {
        let up = tree.parent(current)?;
        if up == parent {
            return Some(current);
        }
        current = up;
    }
}

/// Whether the layer's scale may be animating, and the largest contents
/// scale it can reach (0 when unknown).
fn animation_contents_scale(
    local: &Transform3d,
    animation: &AnimationState,
    ancestor_is_animating_scale: bool,
    ancestor_maximum_scale: f64,
    ancestor_transform: &Transform3d,
    combined: &Transform3d,
) -> (bool, f64) {
    if ancestor_is_animating_scale && ancestor_maximum_scale == 0.0 {
        return (true, 0.0);
    }
    if !combined.is_scale_or_translation() {
        return (true, 0.0);
    }

    let layer_is_animating_scale = !animation.has_only_translation_transforms();
    match (layer_is_animating_scale, ancestor_is_animating_scale) {
        (false, false) => (false, 0.0),
        (true, true) => (true, 0.0),
        (false, true) => {
            let s = local.scale_components_2d(0.0);
            (true, ancestor_maximum_scale * s.x.max(s.y))
        }
        (true, false) => match animation.maximum_scale() {
            Some(layer_maximum_scale) => {
                let s = ancestor_transform.scale_components_2d(0.0);
                (true, layer_maximum_scale * s.x.max(s.y))
            }
            None => (true, 0.0),
        },
    }
}

fn sanitize_sublayer_scale(scale: Vec2) -> Vec2 {
    let fix = |v: f64| {
        if v.is_finite() && v > MIN_SUBLAYER_SCALE {
            v
        } else {
            1.0
        }
    };
    Vec2::new(fix(scale.x), fix(scale.y))
}

fn divide_or_zero(n: f64, d: f64) -> f64 {
    if d == 0.0 { 0.0 } else { n / d }
}
