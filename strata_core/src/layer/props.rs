// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-layer property types.

use kurbo::{Point, Vec2};

use crate::geometry::Point3;
use crate::transform::Transform3d;

/// Per-layer boolean flags.
///
/// The defaults describe a plain grouping layer: visible, two-sided,
/// flattening, and drawing nothing of its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LayerFlags {
    /// Hides the layer and its entire subtree.
    pub hidden: bool,
    /// The layer has content of its own to draw.
    pub draws_content: bool,
    /// Descendants are clipped to this layer's bounds.
    pub masks_to_bounds: bool,
    /// The layer is masked; implies clipping to its bounds.
    pub has_mask: bool,
    /// Always give this layer its own render surface.
    pub force_render_surface: bool,
    /// The back face is drawn when facing the viewer.
    pub double_sided: bool,
    /// The layer's subtree is flattened into its plane.
    pub should_flatten_transform: bool,
    /// Back-face visibility is decided by the parent instead.
    pub use_parent_backface_visibility: bool,
    /// Fixed-position descendants are positioned relative to this layer.
    pub is_container_for_fixed_position_layers: bool,
    /// Blending descendants may not see content behind this layer.
    pub is_isolation_root: bool,
    /// A copy of this layer's output has been requested.
    pub has_copy_request: bool,
    /// The layer receives wheel or touch input and must keep fresh
    /// transforms even when invisible.
    pub has_input_handler: bool,
    /// The layer scrolls its children.
    pub scrollable: bool,
    /// The layer has a non-empty filter chain.
    pub has_filters: bool,
}

impl Default for LayerFlags {
    fn default() -> Self {
        Self {
            hidden: false,
            draws_content: false,
            masks_to_bounds: false,
            has_mask: false,
            force_render_surface: false,
            double_sided: true,
            should_flatten_transform: true,
            use_parent_backface_visibility: false,
            is_container_for_fixed_position_layers: false,
            is_isolation_root: false,
            has_copy_request: false,
            has_input_handler: false,
            scrollable: false,
            has_filters: false,
        }
    }
}

impl LayerFlags {
    /// Whether descendants are clipped to this layer's bounds.
    #[inline]
    #[must_use]
    pub const fn clips_subtree(&self) -> bool {
        self.masks_to_bounds || self.has_mask
    }
}

/// How a layer's pixels combine with the content behind it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[expect(missing_docs, reason = "standard separable and non-separable blend modes")]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

/// Scroll state of a layer.
///
/// The total scroll offset is `offset + delta`. The delta is the part that
/// has been applied locally but not yet folded into `offset`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScrollState {
    /// Committed scroll offset.
    pub offset: Vec2,
    /// Uncommitted scroll delta.
    pub delta: Vec2,
    /// How much this layer has grown since layout, as seen by fixed-position
    /// descendants that use it as their container.
    pub size_delta: Vec2,
}

impl ScrollState {
    /// Returns `offset + delta`.
    #[inline]
    #[must_use]
    pub fn total_offset(&self) -> Vec2 {
        self.offset + self.delta
    }
}

/// How a layer is pinned relative to its fixed-position container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PositionConstraint {
    /// Scrolls with its ancestors.
    #[default]
    Unconstrained,
    /// Held still relative to the container while ancestors scroll.
    ///
    /// An edge flag pins the layer to the container's right or bottom edge,
    /// so it also follows changes to the container's size.
    Fixed {
        /// Pinned to the right edge instead of the left.
        right_edge: bool,
        /// Pinned to the bottom edge instead of the top.
        bottom_edge: bool,
    },
}

impl PositionConstraint {
    /// Pinned to the container's top-left corner.
    pub const FIXED_TOP_LEFT: Self = Self::Fixed {
        right_edge: false,
        bottom_edge: false,
    };

    /// Returns `true` for any fixed constraint.
    #[inline]
    #[must_use]
    pub const fn is_fixed(self) -> bool {
        matches!(self, Self::Fixed { .. })
    }

    /// The part of a container size change this layer follows.
    #[must_use]
    pub fn size_delta_offset(self, size_delta: Vec2) -> Vec2 {
        match self {
            Self::Unconstrained => Vec2::ZERO,
            Self::Fixed {
                right_edge,
                bottom_edge,
            } => Vec2::new(
                if right_edge { size_delta.x } else { 0.0 },
                if bottom_edge { size_delta.y } else { 0.0 },
            ),
        }
    }
}

/// What a running transform animation is known to do.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum TransformAnimation {
    /// No transform animation.
    #[default]
    None,
    /// Only translations are animated.
    TranslationOnly,
    /// Scale (or anything else) may change. `maximum_scale` is the largest
    /// scale the animation reaches, when that can be determined.
    Scaling {
        /// Upper bound on the animated scale, if known.
        maximum_scale: Option<f64>,
    },
}

/// Which properties are currently driven by animations.
///
/// Only the existence of animations is consumed; their values are already
/// reflected in the layer's current properties.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AnimationState {
    /// Opacity is animating.
    pub opacity: bool,
    /// Transform animation, if any.
    pub transform: TransformAnimation,
}

impl AnimationState {
    /// Returns `true` if any transform animation is running.
    #[inline]
    #[must_use]
    pub const fn transform_is_animating(&self) -> bool {
        !matches!(self.transform, TransformAnimation::None)
    }

    /// Returns `true` unless a running animation may change scale.
    #[inline]
    #[must_use]
    pub const fn has_only_translation_transforms(&self) -> bool {
        matches!(
            self.transform,
            TransformAnimation::None | TransformAnimation::TranslationOnly
        )
    }

    /// The largest scale reached by the transform animation, if known.
    ///
    /// Translation-only and absent animations report a scale of 1.
    #[must_use]
    pub fn maximum_scale(&self) -> Option<f64> {
        match self.transform {
            TransformAnimation::None | TransformAnimation::TranslationOnly => Some(1.0),
            TransformAnimation::Scaling { maximum_scale } => maximum_scale,
        }
    }
}

/// A reflection of a layer's subtree, drawn as a replica of its surface.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Reflection {
    /// Position of the replica relative to the owning layer.
    pub position: Point,
    /// Replica transform, applied about `transform_origin`.
    pub transform: Transform3d,
    /// Origin for `transform`, in the owning layer's space.
    pub transform_origin: Point3,
}
