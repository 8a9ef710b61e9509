//! Band polygonization
//!
//! Groups 4-connected pixels of equal value into regions and traces each
//! region's boundary into rings along pixel edges. Output rings are in pixel
//! corner coordinates; the caller maps them to world coordinates.

use std::collections::{HashMap, VecDeque};

use crate::coordinate::Point;

use super::shapefile::signed_area;

/// One polygonized region
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// Pixel value shared by the region
    pub value: f64,
    /// Outer ring first, then holes; closed, in pixel corner coordinates
    pub rings: Vec<Vec<Point>>,
}

type Vertex = (i64, i64);

/// Directed boundary edge with the region pixel on its right (y down)
#[derive(Debug, Clone, Copy)]
struct Edge {
    from: Vertex,
    to: Vertex,
}

impl Edge {
    fn direction(&self) -> Vertex {
        (self.to.0 - self.from.0, self.to.1 - self.from.1)
    }
}

/// Labels 4-connected components of equal value among masked pixels
///
/// Returns the label image (`None` outside the mask) and the value of each
/// label.
fn label_components(values: &[f64], width: usize, height: usize, mask: &dyn Fn(f64) -> bool)
    -> (Vec<Option<usize>>, Vec<f64>)
{
    let mut labels = vec![None; values.len()];
    let mut label_values = Vec::new();
    let mut queue = VecDeque::new();

    for start in 0..values.len() {
        if labels[start].is_some() || !mask(values[start]) {
            continue;
        }
        let label = label_values.len();
        let value = values[start];
        label_values.push(value);
        labels[start] = Some(label);
        queue.push_back(start);

        while let Some(index) = queue.pop_front() {
            let (x, y) = (index % width, index / width);
            let mut neighbours = [None; 4];
            if x > 0 { neighbours[0] = Some(index - 1); }
            if x + 1 < width { neighbours[1] = Some(index + 1); }
            if y > 0 { neighbours[2] = Some(index - width); }
            if y + 1 < height { neighbours[3] = Some(index + width); }

            for n in neighbours.into_iter().flatten() {
                if labels[n].is_none() && values[n] == value && mask(values[n]) {
                    labels[n] = Some(label);
                    queue.push_back(n);
                }
            }
        }
    }

    (labels, label_values)
}

/// Emits the boundary edges of every labelled pixel, grouped by label
fn boundary_edges(labels: &[Option<usize>], width: usize, height: usize, count: usize) -> Vec<Vec<Edge>> {
    let mut edges = vec![Vec::new(); count];
    let label_at = |x: i64, y: i64| -> Option<usize> {
        if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
            None
        } else {
            labels[y as usize * width + x as usize]
        }
    };

    for y in 0..height as i64 {
        for x in 0..width as i64 {
            let label = match label_at(x, y) {
                Some(l) => l,
                None => continue,
            };
            let list = &mut edges[label];
            if label_at(x, y - 1) != Some(label) {
                list.push(Edge { from: (x, y), to: (x + 1, y) });
            }
            if label_at(x + 1, y) != Some(label) {
                list.push(Edge { from: (x + 1, y), to: (x + 1, y + 1) });
            }
            if label_at(x, y + 1) != Some(label) {
                list.push(Edge { from: (x + 1, y + 1), to: (x, y + 1) });
            }
            if label_at(x - 1, y) != Some(label) {
                list.push(Edge { from: (x, y + 1), to: (x, y) });
            }
        }
    }
    edges
}

/// Preference of the next edge after arriving with `incoming`
///
/// Left turns come first, so a hole touching the outer boundary at a
/// corner becomes a ring of its own.
fn turn_rank(incoming: Vertex, outgoing: Vertex) -> u8 {
    let left = (incoming.1, -incoming.0);
    if outgoing == left {
        0
    } else if outgoing == incoming {
        1
    } else {
        2
    }
}

/// Links one region's edges into closed rings
fn link_rings(edges: &[Edge]) -> Vec<Vec<Point>> {
    let mut by_start: HashMap<Vertex, Vec<usize>> = HashMap::new();
    for (i, edge) in edges.iter().enumerate() {
        by_start.entry(edge.from).or_default().push(i);
    }

    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();

    for first in 0..edges.len() {
        if used[first] {
            continue;
        }
        used[first] = true;
        let mut vertices = vec![edges[first].from];
        let mut current = first;

        loop {
            let edge = edges[current];
            let next = by_start
                .get(&edge.to)
                .into_iter()
                .flatten()
                .copied()
                .filter(|&i| !used[i] || i == first)
                .min_by_key(|&i| turn_rank(edge.direction(), edges[i].direction()));

            match next {
                Some(i) if i == first => break,
                Some(i) => {
                    used[i] = true;
                    if edges[i].direction() != edge.direction() {
                        vertices.push(edge.to);
                    }
                    current = i;
                }
                None => break,
            }
        }

        // Drop the start vertex when it lies inside a straight run
        if vertices.len() > 2 && edges[current].direction() == edges[first].direction() {
            vertices.remove(0);
        }
        let start = vertices[0];
        vertices.push(start);
        rings.push(vertices.into_iter().map(|(x, y)| Point::new(x as f64, y as f64)).collect());
    }

    rings
}

/// Polygonizes a band
///
/// `values` is a row-major `width * height` band; only pixels accepted by
/// `mask` take part. Regions come out in scan order of their first pixel.
pub fn polygonize(values: &[f64], width: usize, height: usize, mask: &dyn Fn(f64) -> bool) -> Vec<Region> {
    let (labels, label_values) = label_components(values, width, height, mask);
    let edges = boundary_edges(&labels, width, height, label_values.len());

    edges
        .iter()
        .zip(label_values)
        .map(|(region_edges, value)| {
            let mut rings = link_rings(region_edges);
            // The outer boundary encloses the largest area
            if let Some(outer) = rings
                .iter()
                .enumerate()
                .max_by(|a, b| signed_area(a.1).abs().total_cmp(&signed_area(b.1).abs()))
                .map(|(i, _)| i)
            {
                rings.swap(0, outer);
            }
            Region { value, rings }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positive(v: f64) -> bool {
        v > 0.0
    }

    fn area(ring: &[Point]) -> f64 {
        signed_area(ring).abs() / 2.0
    }

    #[test]
    fn test_single_pixel() {
        let regions = polygonize(&[5.0], 1, 1, &positive);
        std::assert_eq!(regions.len(), 1);
        std::assert_eq!(regions[0].value, 5.0);
        std::assert_eq!(regions[0].rings.len(), 1);
        std::assert_eq!(regions[0].rings[0].len(), 5);
        std::assert_eq!(area(&regions[0].rings[0]), 1.0);
    }

    #[test]
    fn test_equal_values_merge_and_masked_pixels_skip() {
        #[rustfmt::skip]
        let values = [
            1.0, 1.0, 2.0,
            1.0, 0.0, 2.0,
        ];
        let regions = polygonize(&values, 3, 2, &positive);
        std::assert_eq!(regions.len(), 2);
        std::assert_eq!(regions[0].value, 1.0);
        std::assert_eq!(area(&regions[0].rings[0]), 3.0);
        // L-shape: 6 corners plus closing point
        std::assert_eq!(regions[0].rings[0].len(), 7);
        std::assert_eq!(regions[1].value, 2.0);
        std::assert_eq!(area(&regions[1].rings[0]), 2.0);
        std::assert_eq!(regions[1].rings[0].len(), 5);
    }

    #[test]
    fn test_hole() {
        #[rustfmt::skip]
        let values = [
            1.0, 1.0, 1.0,
            1.0, 0.0, 1.0,
            1.0, 1.0, 1.0,
        ];
        let regions = polygonize(&values, 3, 3, &positive);
        std::assert_eq!(regions.len(), 1);
        let rings = &regions[0].rings;
        std::assert_eq!(rings.len(), 2);
        std::assert_eq!(area(&rings[0]), 9.0);
        std::assert_eq!(area(&rings[1]), 1.0);
    }

    #[test]
    fn test_diagonal_pixels_are_separate() {
        #[rustfmt::skip]
        let values = [
            1.0, 0.0,
            0.0, 1.0,
        ];
        let regions = polygonize(&values, 2, 2, &positive);
        std::assert_eq!(regions.len(), 2);
        for region in &regions {
            std::assert_eq!(region.rings.len(), 1);
            std::assert_eq!(area(&region.rings[0]), 1.0);
        }
    }

    #[test]
    fn test_hole_touching_outer_corner() {
        #[rustfmt::skip]
        let values = [
            1.0, 1.0, 1.0,
            1.0, 0.0, 1.0,
            1.0, 1.0, 0.0,
        ];
        let regions = polygonize(&values, 3, 3, &positive);
        std::assert_eq!(regions.len(), 1);
        let rings = &regions[0].rings;
        std::assert_eq!(rings.len(), 2);
        std::assert_eq!(area(&rings[0]), 8.0);
        std::assert_eq!(area(&rings[1]), 1.0);
        std::assert!(signed_area(&rings[0]).signum() != signed_area(&rings[1]).signum());
    }
}
