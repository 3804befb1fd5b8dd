use std::collections::HashMap;

use crate::diagram::{Position, Size};

use super::{Direction, LayoutOptions};

/// Turn ordered layers into concrete coordinates.
///
/// Internally everything is center-anchored: each layer occupies a band
/// sized by its tallest (or widest) node, nodes are stacked along the
/// cross axis with `node_gap` between them and each layer is centered on
/// the overall cross extent. The returned positions are converted to
/// top-left anchors, which is what the render surface consumes.
pub fn assign_positions(
    order: &[Vec<String>],
    sizes: &HashMap<String, Size>,
    options: &LayoutOptions,
) -> HashMap<String, Position> {
    let vertical = matches!(
        options.direction,
        Direction::TopToBottom | Direction::BottomToTop
    );
    let main_size = |id: &String| -> f64 {
        let s = sizes[id];
        if vertical {
            s.height
        } else {
            s.width
        }
    };
    let cross_size = |id: &String| -> f64 {
        let s = sizes[id];
        if vertical {
            s.width
        } else {
            s.height
        }
    };

    let layer_extent: Vec<f64> = order
        .iter()
        .map(|layer| layer.iter().map(&main_size).fold(0.0, f64::max))
        .collect();
    let cross_extent: Vec<f64> = order
        .iter()
        .map(|layer| {
            let widths: f64 = layer.iter().map(&cross_size).sum();
            let gaps = options.node_gap * layer.len().saturating_sub(1) as f64;
            widths + gaps
        })
        .collect();
    let total_cross = cross_extent.iter().copied().fold(0.0, f64::max);

    // Band start along the main axis for each layer index. Layer 0 holds
    // the dependents (query root); BottomToTop draws it last.
    let sequence: Vec<usize> = if options.direction == Direction::BottomToTop {
        (0..order.len()).rev().collect()
    } else {
        (0..order.len()).collect()
    };
    let mut band_start: Vec<f64> = vec![0.0; order.len()];
    let mut cursor = 0.0;
    for &layer in &sequence {
        band_start[layer] = cursor;
        cursor += layer_extent[layer] + options.layer_gap;
    }

    let mut positions = HashMap::new();
    for (layer_index, layer) in order.iter().enumerate() {
        let main_center = band_start[layer_index] + layer_extent[layer_index] / 2.0;
        let mut cross_cursor = (total_cross - cross_extent[layer_index]) / 2.0;
        for id in layer {
            let size = sizes[id];
            let cross_center = cross_cursor + cross_size(id) / 2.0;
            let (cx, cy) = if vertical {
                (cross_center, main_center)
            } else {
                (main_center, cross_center)
            };
            positions.insert(
                id.clone(),
                Position {
                    x: cx - size.width / 2.0,
                    y: cy - size.height / 2.0,
                },
            );
            cross_cursor += cross_size(id) + options.node_gap;
        }
    }
    positions
}
