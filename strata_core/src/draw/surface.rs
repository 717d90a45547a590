// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render-surface promotion, subtree skipping and back-face rules.

use crate::layer::{BlendMode, LayerId, LayerSource};
use crate::transform::Transform3d;

/// Why a layer was given its own render surface.
///
/// Rules are checked in declaration order and the first match is reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SurfaceReason {
    /// The layer is masked.
    Mask,
    /// The layer has a reflection.
    Reflection,
    /// The layer has filters.
    Filters,
    /// The layer flattens its subtree while its parent is part of a 3D
    /// rendering context.
    Flattening,
    /// The layer blends with a non-default mode.
    Blending,
    /// The layer clips drawing descendants and is not axis-aligned with its
    /// target.
    Clipping,
    /// The layer is translucent and at least two layers of its subtree draw.
    Opacity,
    /// The root always owns a surface.
    Root,
    /// The layer isolates blending descendants from what is behind it.
    Isolation,
    /// The host asked for a surface.
    Forced,
    /// A copy of the layer's output was requested.
    CopyRequest,
}

/// Why a subtree was left out of a pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// The local transform is singular and not animating.
    SingularTransform,
    /// The layer or an ancestor is hidden.
    Hidden,
    /// The layer is fully transparent and its opacity is not animating.
    Transparent,
}

/// Why a surface was dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SurfaceRemoval {
    /// No layer ended up drawing into the surface.
    EmptyLayerList,
    /// The surface's clipped content rectangle is empty.
    EmptyContent,
    /// The surface is single-sided and faces away from the viewer.
    BackFaceVisible,
}

/// Decides whether `id` gets a render surface.
///
/// `drawing_descendants` counts descendants that draw content plus every
/// descendant of those, as gathered by the pre-pass.
pub(crate) fn surface_reason<T: LayerSource + ?Sized>(
    tree: &T,
    id: LayerId,
    is_root: bool,
    drawing_descendants: u32,
    axis_aligned_with_target: bool,
) -> Option<SurfaceReason> {
    let flags = tree.flags(id);

    if flags.has_mask {
        debug_assert!(!is_root, "the root layer cannot be masked");
        return Some(SurfaceReason::Mask);
    }
    if tree.reflection(id).is_some() {
        debug_assert!(!is_root, "the root layer cannot be reflected");
        return Some(SurfaceReason::Reflection);
    }
    if flags.has_filters {
        return Some(SurfaceReason::Filters);
    }
    if tree.is_in_existing_3d_context(id)
        && flags.should_flatten_transform
        && drawing_descendants > 0
    {
        return Some(SurfaceReason::Flattening);
    }
    if tree.blend_mode(id) != BlendMode::Normal {
        return Some(SurfaceReason::Blending);
    }
    if flags.clips_subtree() && !axis_aligned_with_target && drawing_descendants > 0 {
        return Some(SurfaceReason::Clipping);
    }

    // Overlap between the drawing layers is what actually needs the surface,
    // but counting two drawing layers is a cheap superset.
    let two_layers_draw =
        drawing_descendants > 0 && (flags.draws_content || drawing_descendants > 1);
    if tree.opacity(id) != 1.0 && flags.should_flatten_transform && two_layers_draw {
        return Some(SurfaceReason::Opacity);
    }

    if is_root {
        return Some(SurfaceReason::Root);
    }

    // These also hold for the root, whose surface never contributes to another
    // target, so they come after it.
    if flags.is_isolation_root {
        return Some(SurfaceReason::Isolation);
    }
    if flags.force_render_surface {
        return Some(SurfaceReason::Forced);
    }
    if flags.has_copy_request {
        return Some(SurfaceReason::CopyRequest);
    }
    None
}

/// Decides whether a non-root subtree is left out of the pass.
///
/// `is_drawn` folds in hidden ancestors and the layer's own copy request;
/// `subtree_has_copy_request` and `subtree_has_input_handler` come from the
/// pre-pass.
pub(crate) fn skip_reason<T: LayerSource + ?Sized>(
    tree: &T,
    id: LayerId,
    is_drawn: bool,
    subtree_has_copy_request: bool,
    subtree_has_input_handler: bool,
) -> Option<SkipReason> {
    let animation = tree.animation(id);
    if !tree.transform_is_invertible(id) && !animation.transform_is_animating() {
        return Some(SkipReason::SingularTransform);
    }
    // Readbacks need the whole path down to the copied layer, and hit testing
    // needs fresh transforms under input handlers.
    if subtree_has_copy_request || subtree_has_input_handler {
        return None;
    }
    if !is_drawn {
        return Some(SkipReason::Hidden);
    }
    if tree.opacity(id) == 0.0 && !animation.opacity {
        return Some(SkipReason::Transparent);
    }
    None
}

/// Returns `true` if the layer's back face is showing.
///
/// Inside an existing 3D rendering context the accumulated draw transform
/// decides; otherwise only the local transform counts.
pub(crate) fn is_layer_backface_visible<T: LayerSource + ?Sized>(
    tree: &T,
    id: LayerId,
    draw_transform: &Transform3d,
) -> bool {
    if tree.is_in_existing_3d_context(id) {
        draw_transform.is_backface_visible()
    } else {
        tree.transform(id).is_backface_visible()
    }
}

/// Returns `true` if the surface owned by `id` shows its back face.
///
/// Surfaces outside any 3D rendering context leave the decision to the layers
/// that draw into them.
pub(crate) fn is_surface_backface_visible<T: LayerSource + ?Sized>(
    tree: &T,
    id: LayerId,
    draw_transform: &Transform3d,
) -> bool {
    if tree.is_in_existing_3d_context(id) {
        draw_transform.is_backface_visible()
    } else if tree.is_root_of_3d_context(id) {
        tree.transform(id).is_backface_visible()
    } else {
        false
    }
}

/// Returns `true` if a layer that would otherwise draw is left out of its
/// target's layer list.
pub(crate) fn layer_should_be_skipped<T: LayerSource + ?Sized>(
    tree: &T,
    id: LayerId,
    is_drawn: bool,
    draw_transform_of: impl Fn(LayerId) -> Transform3d,
) -> bool {
    if !is_drawn {
        return true;
    }
    let flags = tree.flags(id);
    let bounds = tree.bounds(id);
    if !flags.draws_content || bounds.width <= 0.0 || bounds.height <= 0.0 {
        return true;
    }

    let backface_layer = if flags.use_parent_backface_visibility {
        tree.parent(id).unwrap_or(id)
    } else {
        id
    };
    !tree.flags(backface_layer).double_sided
        && is_layer_backface_visible(tree, backface_layer, &draw_transform_of(backface_layer))
}

#[cfg(test)]
mod tests {
    use core::f64::consts::PI;

    use kurbo::Size;

    use super::*;
    use crate::layer::{AnimationState, LayerFlags, LayerStore, Reflection, TransformAnimation};

    fn store_with_child() -> (LayerStore, LayerId, LayerId) {
        let mut store = LayerStore::new();
        let root = store.create_layer();
        let child = store.create_layer();
        store.add_child(root, child);
        (store, root, child)
    }

    fn set_flags(store: &mut LayerStore, id: LayerId, f: impl FnOnce(&mut LayerFlags)) {
        let mut flags = store.flags(id);
        f(&mut flags);
        store.set_flags(id, flags);
    }

    #[test]
    fn root_always_gets_a_surface() {
        let (store, root, child) = store_with_child();
        assert_eq!(
            surface_reason(&store, root, true, 0, true),
            Some(SurfaceReason::Root)
        );
        assert_eq!(surface_reason(&store, child, false, 0, true), None);
    }

    #[test]
    fn mask_and_reflection_come_first() {
        let (mut store, _, child) = store_with_child();
        store.set_reflection(child, Some(Reflection::default()));
        assert_eq!(
            surface_reason(&store, child, false, 0, true),
            Some(SurfaceReason::Reflection)
        );
        set_flags(&mut store, child, |f| f.has_mask = true);
        assert_eq!(
            surface_reason(&store, child, false, 0, true),
            Some(SurfaceReason::Mask)
        );
    }

    #[test]
    fn translucency_needs_two_drawing_layers() {
        let (mut store, _, child) = store_with_child();
        store.set_opacity(child, 0.5);
        assert_eq!(surface_reason(&store, child, false, 1, true), None);
        set_flags(&mut store, child, |f| f.draws_content = true);
        assert_eq!(
            surface_reason(&store, child, false, 1, true),
            Some(SurfaceReason::Opacity)
        );
        set_flags(&mut store, child, |f| f.draws_content = false);
        assert_eq!(
            surface_reason(&store, child, false, 2, true),
            Some(SurfaceReason::Opacity)
        );
        // A preserve-3d layer hands its opacity to its children instead.
        set_flags(&mut store, child, |f| f.should_flatten_transform = false);
        assert_eq!(surface_reason(&store, child, false, 2, true), None);
    }

    #[test]
    fn rotated_clip_needs_drawing_descendants() {
        let (mut store, _, child) = store_with_child();
        set_flags(&mut store, child, |f| f.masks_to_bounds = true);
        assert_eq!(surface_reason(&store, child, false, 1, true), None);
        assert_eq!(surface_reason(&store, child, false, 0, false), None);
        assert_eq!(
            surface_reason(&store, child, false, 1, false),
            Some(SurfaceReason::Clipping)
        );
    }

    #[test]
    fn flattening_inside_a_3d_context() {
        let (mut store, root, child) = store_with_child();
        store.set_sorting_context(root, 1);
        store.set_sorting_context(child, 1);
        assert_eq!(
            surface_reason(&store, child, false, 1, true),
            Some(SurfaceReason::Flattening)
        );
        assert_eq!(surface_reason(&store, child, false, 0, true), None);
    }

    #[test]
    fn host_requested_surfaces() {
        let (mut store, _, child) = store_with_child();
        set_flags(&mut store, child, |f| f.has_copy_request = true);
        assert_eq!(
            surface_reason(&store, child, false, 0, true),
            Some(SurfaceReason::CopyRequest)
        );
        set_flags(&mut store, child, |f| f.force_render_surface = true);
        assert_eq!(
            surface_reason(&store, child, false, 0, true),
            Some(SurfaceReason::Forced)
        );
        set_flags(&mut store, child, |f| f.is_isolation_root = true);
        assert_eq!(
            surface_reason(&store, child, false, 0, true),
            Some(SurfaceReason::Isolation)
        );
        store.set_blend_mode(child, BlendMode::Multiply);
        assert_eq!(
            surface_reason(&store, child, false, 0, true),
            Some(SurfaceReason::Blending)
        );
    }

    #[test]
    fn skip_rules() {
        let (mut store, _, child) = store_with_child();
        assert_eq!(skip_reason(&store, child, true, false, false), None);
        assert_eq!(
            skip_reason(&store, child, false, false, false),
            Some(SkipReason::Hidden)
        );

        store.set_opacity(child, 0.0);
        assert_eq!(
            skip_reason(&store, child, true, false, false),
            Some(SkipReason::Transparent)
        );
        store.set_animation(
            child,
            AnimationState {
                opacity: true,
                transform: TransformAnimation::None,
            },
        );
        assert_eq!(skip_reason(&store, child, true, false, false), None);

        store.set_transform(child, Transform3d::from_scale(0.0, 1.0, 1.0));
        assert_eq!(
            skip_reason(&store, child, true, true, true),
            Some(SkipReason::SingularTransform)
        );
    }

    #[test]
    fn copy_requests_and_input_handlers_keep_subtrees() {
        let (mut store, _, child) = store_with_child();
        store.set_opacity(child, 0.0);
        assert_eq!(skip_reason(&store, child, false, true, false), None);
        assert_eq!(skip_reason(&store, child, false, false, true), None);
    }

    #[test]
    fn single_sided_back_face_is_skipped() {
        let (mut store, _, child) = store_with_child();
        store.set_bounds(child, Size::new(10.0, 10.0));
        set_flags(&mut store, child, |f| f.draws_content = true);
        let id = |_: LayerId| Transform3d::IDENTITY;
        assert!(!layer_should_be_skipped(&store, child, true, id));
        assert!(layer_should_be_skipped(&store, child, false, id));

        store.set_transform(child, Transform3d::from_rotation_y(PI));
        assert!(!layer_should_be_skipped(&store, child, true, id));
        set_flags(&mut store, child, |f| f.double_sided = false);
        assert!(layer_should_be_skipped(&store, child, true, id));
    }

    #[test]
    fn surface_back_face_outside_3d_context_is_never_visible() {
        let (mut store, _, child) = store_with_child();
        store.set_transform(child, Transform3d::from_rotation_y(PI));
        let flipped = Transform3d::from_rotation_y(PI);
        assert!(!is_surface_backface_visible(&store, child, &flipped));
        store.set_sorting_context(child, 7);
        assert!(is_surface_backface_visible(&store, child, &Transform3d::IDENTITY));
    }
}
