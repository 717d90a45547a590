// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structural JSON dump of a resolve result.
//!
//! [`resolved_to_json`] lists the render surfaces in render surface layer
//! list order. Each surface carries its transforms, rects and the layers
//! drawn into it, with per-layer draw properties. Layers are written as
//! `"index:generation"` strings.

use std::io::{self, Write};

use kurbo::Rect;
use serde_json::{Value, json};

use strata_core::draw::{RenderSurface, ResolvedTree};
use strata_core::layer::{LayerId, LayerSource};
use strata_core::transform::Transform3d;

/// Builds a JSON description of `resolved`, the result of resolving `tree`.
pub fn resolved_to_json<T: LayerSource>(tree: &T, resolved: &ResolvedTree) -> Value {
    let surfaces: Vec<Value> = resolved
        .render_surface_layer_list()
        .iter()
        .filter_map(|&owner| resolved.render_surface(owner))
        .map(|surface| surface_json(tree, resolved, surface))
        .collect();

    json!({
        "root": resolved.root().map(layer_json),
        "drawn_layers": resolved.drawn_layer_count(),
        "surfaces": surfaces,
    })
}

/// Writes [`resolved_to_json`] to `writer` as pretty-printed JSON.
pub fn write_json<T: LayerSource>(
    tree: &T,
    resolved: &ResolvedTree,
    writer: &mut dyn Write,
) -> io::Result<()> {
    serde_json::to_writer_pretty(writer, &resolved_to_json(tree, resolved))?;
    Ok(())
}

fn surface_json<T: LayerSource>(
    tree: &T,
    resolved: &ResolvedTree,
    surface: &RenderSurface,
) -> Value {
    let layers: Vec<Value> = surface
        .layer_list
        .iter()
        .map(|&id| {
            let represents_surface = id != surface.owner && resolved.render_surface(id).is_some();
            let role = if represents_surface {
                "surface"
            } else {
                "self"
            };
            let props = resolved.draw_properties(id);
            json!({
                "layer": layer_json(id),
                "role": role,
                "bounds": [tree.bounds(id).width, tree.bounds(id).height],
                "target_space_transform": transform_json(&props.target_space_transform),
                "opacity": props.opacity,
                "is_clipped": props.is_clipped,
                "clip_rect": rect_json(props.clip_rect),
                "drawable_content_rect": rect_json(props.drawable_content_rect),
                "visible_content_rect": rect_json(props.visible_content_rect),
                "ideal_contents_scale": props.ideal_contents_scale,
            })
        })
        .collect();

    let mut value = json!({
        "owner": layer_json(surface.owner),
        "draw_transform": transform_json(&surface.draw_transform),
        "screen_space_transform": transform_json(&surface.screen_space_transform),
        "draw_opacity": surface.draw_opacity,
        "is_clipped": surface.is_clipped,
        "clip_rect": rect_json(surface.clip_rect),
        "content_rect": rect_json(surface.content_rect),
        "drawable_content_rect": rect_json(surface.drawable_content_rect()),
        "contributes_to_drawn_surface": surface.contributes_to_drawn_surface,
        "sublayer_scale": [surface.sublayer_scale.x, surface.sublayer_scale.y],
        "layers": layers,
    });
    if surface.has_replica {
        value["replica_draw_transform"] = transform_json(&surface.replica_draw_transform);
    }
    value
}

fn layer_json(id: LayerId) -> Value {
    Value::String(format!("{}:{}", id.index(), id.generation()))
}

fn rect_json(r: Rect) -> Value {
    json!([r.x0, r.y0, r.x1, r.y1])
}

/// Column-major, one array per column.
fn transform_json(t: &Transform3d) -> Value {
    json!(t.cols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::{Point, Size};
    use strata_core::draw::{ResolveInputs, resolve};
    use strata_core::layer::{LayerFlags, LayerStore};

    fn translucent_scene() -> (LayerStore, ResolvedTree) {
        let mut store = LayerStore::new();
        let flags = LayerFlags {
            draws_content: true,
            ..LayerFlags::default()
        };
        let root = store.create_layer();
        store.set_bounds(root, Size::new(200.0, 200.0));
        store.set_flags(root, flags);
        let group = store.create_layer();
        store.add_child(root, group);
        store.set_position(group, Point::new(10.0, 10.0));
        store.set_bounds(group, Size::new(50.0, 50.0));
        store.set_flags(group, flags);
        store.set_opacity(group, 0.5);
        for _ in 0..2 {
            let child = store.create_layer();
            store.add_child(group, child);
            store.set_bounds(child, Size::new(20.0, 20.0));
            store.set_flags(child, flags);
        }
        let resolved = resolve(&store, &ResolveInputs::new(root, Size::new(200.0, 200.0)));
        (store, resolved)
    }

    #[test]
    fn dump_lists_surfaces_in_order() {
        let (store, resolved) = translucent_scene();
        let value = resolved_to_json(&store, &resolved);

        assert_eq!(value["root"], "0:0");
        assert_eq!(value["drawn_layers"], 4);
        let surfaces = value["surfaces"].as_array().unwrap();
        assert_eq!(surfaces.len(), 2);
        assert_eq!(surfaces[0]["owner"], "0:0");
        assert_eq!(surfaces[1]["owner"], "1:0");
        assert_eq!(surfaces[1]["draw_opacity"], 0.5);
        assert_eq!(surfaces[1]["content_rect"], json!([0.0, 0.0, 50.0, 50.0]));

        let root_layers = surfaces[0]["layers"].as_array().unwrap();
        assert_eq!(root_layers.len(), 2);
        assert_eq!(root_layers[1]["role"], "surface");
        assert_eq!(surfaces[1]["layers"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn write_json_round_trips_through_parser() {
        let (store, resolved) = translucent_scene();
        let mut out = Vec::new();
        write_json(&store, &resolved, &mut out).unwrap();
        let parsed: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed, resolved_to_json(&store, &resolved));
        assert_eq!(
            parsed["surfaces"][1]["draw_transform"][3],
            json!([10.0, 10.0, 0.0, 1.0])
        );
    }
}
