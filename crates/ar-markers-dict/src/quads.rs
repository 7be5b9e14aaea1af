//! Quad candidate extraction from a binarized frame.
//!
//! Connected dark regions are traced along their outer boundary (Moore
//! neighborhood tracing), the boundary is simplified with Douglas-Peucker,
//! and convex four-vertex polygons within the perimeter bounds survive as
//! candidates for bit decoding.

use nalgebra::Point2;

/// One convex quad candidate, corners ordered clockwise in image coordinates
/// (y down), arbitrary starting corner.
#[derive(Clone, Copy, Debug)]
pub struct QuadCandidate {
    pub corners: [Point2<f32>; 4],
    /// Boundary length of the traced contour in pixels.
    pub perimeter: f32,
}

/// Limits applied while filtering contours into quads.
#[derive(Clone, Copy, Debug)]
pub(crate) struct QuadLimits {
    pub min_perimeter: f32,
    pub max_perimeter: f32,
    /// Douglas-Peucker tolerance as a fraction of the contour perimeter.
    pub approx_eps_frac: f32,
    /// Minimum distance from any corner to the image border, in pixels.
    pub min_border_distance: f32,
    /// Minimum quad side length in pixels.
    pub min_side: f32,
}

// Eight neighbors, clockwise in image coordinates (y down), starting East.
const DIRS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

/// Extract quad candidates from a 0/1 foreground mask.
pub(crate) fn find_quads(
    mask: &[u8],
    width: usize,
    height: usize,
    limits: &QuadLimits,
    visited: &mut Vec<u8>,
    out: &mut Vec<QuadCandidate>,
) {
    out.clear();
    visited.clear();
    visited.resize(width * height, 0);

    let mut fill_stack: Vec<(i32, i32)> = Vec::new();
    let mut contour: Vec<(i32, i32)> = Vec::new();

    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            if mask[idx] == 0 || visited[idx] != 0 {
                continue;
            }

            // First pixel of this component in raster order, so the pixel to
            // its west and the whole row above the component are background.
            trace_boundary(mask, width, height, (x as i32, y as i32), &mut contour);
            flood_mark(mask, width, height, (x as i32, y as i32), visited, &mut fill_stack);

            if let Some(quad) = quad_from_contour(&contour, width, height, limits) {
                out.push(quad);
            }
        }
    }
}

#[inline]
fn at(mask: &[u8], width: usize, height: usize, x: i32, y: i32) -> bool {
    x >= 0 && y >= 0 && (x as usize) < width && (y as usize) < height && mask[y as usize * width + x as usize] != 0
}

/// Moore-neighbor boundary tracing with the true backtrack pixel.
fn trace_boundary(
    mask: &[u8],
    width: usize,
    height: usize,
    start: (i32, i32),
    contour: &mut Vec<(i32, i32)>,
) {
    contour.clear();
    contour.push(start);

    let start_prev = (start.0 - 1, start.1);
    let mut cur = start;
    let mut prev = start_prev;

    // Worst-case boundary length; anything longer is a tracing defect.
    let limit = 4 * (width * height + 1);

    for _ in 0..limit {
        // Direction from cur to the backtrack pixel.
        let d0 = DIRS
            .iter()
            .position(|&(dx, dy)| (cur.0 + dx, cur.1 + dy) == prev)
            .unwrap_or(4);

        let mut found = None;
        let mut last_bg = prev;
        for i in 1..=8 {
            let d = (d0 + i) % 8;
            let n = (cur.0 + DIRS[d].0, cur.1 + DIRS[d].1);
            if at(mask, width, height, n.0, n.1) {
                found = Some(n);
                break;
            }
            last_bg = n;
        }

        let Some(next) = found else {
            return; // isolated pixel
        };

        prev = last_bg;
        cur = next;
        if cur == start && prev == start_prev {
            return;
        }
        contour.push(cur);
    }
}

fn flood_mark(
    mask: &[u8],
    width: usize,
    height: usize,
    start: (i32, i32),
    visited: &mut [u8],
    stack: &mut Vec<(i32, i32)>,
) {
    stack.clear();
    stack.push(start);
    visited[start.1 as usize * width + start.0 as usize] = 1;

    while let Some((x, y)) = stack.pop() {
        for &(dx, dy) in &DIRS {
            let (nx, ny) = (x + dx, y + dy);
            if !at(mask, width, height, nx, ny) {
                continue;
            }
            let idx = ny as usize * width + nx as usize;
            if visited[idx] == 0 {
                visited[idx] = 1;
                stack.push((nx, ny));
            }
        }
    }
}

fn contour_perimeter(contour: &[(i32, i32)]) -> f32 {
    let mut p = 0.0f32;
    for i in 0..contour.len() {
        let a = contour[i];
        let b = contour[(i + 1) % contour.len()];
        p += (((a.0 - b.0).pow(2) + (a.1 - b.1).pow(2)) as f32).sqrt();
    }
    p
}

fn quad_from_contour(
    contour: &[(i32, i32)],
    width: usize,
    height: usize,
    limits: &QuadLimits,
) -> Option<QuadCandidate> {
    if contour.len() < 4 {
        return None;
    }
    let perimeter = contour_perimeter(contour);
    if perimeter < limits.min_perimeter || perimeter > limits.max_perimeter {
        return None;
    }

    let eps = limits.approx_eps_frac * perimeter;
    let poly = approx_closed_polygon(contour, eps);
    if poly.len() != 4 {
        return None;
    }

    let mut corners = [Point2::new(0.0f32, 0.0); 4];
    for (i, &(x, y)) in poly.iter().enumerate() {
        corners[i] = Point2::new(x as f32, y as f32);
    }

    // Clockwise in y-down coordinates: positive cross products all around.
    let cross = |a: Point2<f32>, b: Point2<f32>, c: Point2<f32>| {
        (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
    };
    let c0 = cross(corners[0], corners[1], corners[2]);
    if c0 < 0.0 {
        corners.swap(1, 3);
    }
    for i in 0..4 {
        let c = cross(corners[i], corners[(i + 1) % 4], corners[(i + 2) % 4]);
        if c <= 0.0 {
            return None; // concave or collinear
        }
    }

    for i in 0..4 {
        let a = corners[i];
        let b = corners[(i + 1) % 4];
        if (a - b).norm() < limits.min_side {
            return None;
        }
        if a.x < limits.min_border_distance
            || a.y < limits.min_border_distance
            || a.x > width as f32 - 1.0 - limits.min_border_distance
            || a.y > height as f32 - 1.0 - limits.min_border_distance
        {
            return None;
        }
    }

    Some(QuadCandidate { corners, perimeter })
}

/// Douglas-Peucker simplification of a closed contour.
///
/// The contour is split at the two mutually farthest of its extreme points,
/// each open chain is simplified, and the halves are rejoined.
fn approx_closed_polygon(contour: &[(i32, i32)], eps: f32) -> Vec<(i32, i32)> {
    let far_from = |anchor: (i32, i32)| {
        let mut best = 0usize;
        let mut best_d = -1i64;
        for (i, &p) in contour.iter().enumerate() {
            let d = ((p.0 - anchor.0) as i64).pow(2) + ((p.1 - anchor.1) as i64).pow(2);
            if d > best_d {
                best_d = d;
                best = i;
            }
        }
        best
    };

    let a = far_from(contour[0]);
    let b = far_from(contour[a]);
    let (a, b) = (a.min(b), a.max(b));

    let first: Vec<(i32, i32)> = contour[a..=b].to_vec();
    let mut second: Vec<(i32, i32)> = contour[b..].to_vec();
    second.extend_from_slice(&contour[..=a]);

    let mut out = Vec::new();
    simplify_chain(&first, eps, &mut out);
    out.pop(); // endpoint shared with the second chain
    let mut tail = Vec::new();
    simplify_chain(&second, eps, &mut tail);
    tail.pop();
    out.extend(tail);
    out
}

fn simplify_chain(chain: &[(i32, i32)], eps: f32, out: &mut Vec<(i32, i32)>) {
    if chain.len() <= 2 {
        out.extend_from_slice(chain);
        return;
    }

    let (s, e) = (chain[0], chain[chain.len() - 1]);
    let (ex, ey) = ((e.0 - s.0) as f32, (e.1 - s.1) as f32);
    let len = (ex * ex + ey * ey).sqrt().max(1e-6);

    let mut worst = 0usize;
    let mut worst_d = -1.0f32;
    for (i, &p) in chain.iter().enumerate().skip(1).take(chain.len() - 2) {
        let (px, py) = ((p.0 - s.0) as f32, (p.1 - s.1) as f32);
        let d = (px * ey - py * ex).abs() / len;
        if d > worst_d {
            worst_d = d;
            worst = i;
        }
    }

    if worst_d > eps {
        simplify_chain(&chain[..=worst], eps, out);
        out.pop();
        simplify_chain(&chain[worst..], eps, out);
    } else {
        out.push(s);
        out.push(e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_limits() -> QuadLimits {
        QuadLimits {
            min_perimeter: 40.0,
            max_perimeter: 100_000.0,
            approx_eps_frac: 0.04,
            min_border_distance: 1.0,
            min_side: 8.0,
        }
    }

    fn mask_with_rect(w: usize, h: usize, x0: usize, y0: usize, side: usize) -> Vec<u8> {
        let mut mask = vec![0u8; w * h];
        for y in y0..y0 + side {
            for x in x0..x0 + side {
                mask[y * w + x] = 1;
            }
        }
        mask
    }

    #[test]
    fn filled_square_yields_one_quad() {
        let (w, h) = (64, 64);
        let mask = mask_with_rect(w, h, 12, 16, 24);
        let mut visited = Vec::new();
        let mut quads = Vec::new();
        find_quads(&mask, w, h, &default_limits(), &mut visited, &mut quads);

        assert_eq!(quads.len(), 1);
        let q = &quads[0];
        let min_x = q.corners.iter().map(|c| c.x).fold(f32::MAX, f32::min);
        let max_x = q.corners.iter().map(|c| c.x).fold(f32::MIN, f32::max);
        assert!((min_x - 12.0).abs() <= 1.5, "min_x = {min_x}");
        assert!((max_x - 35.0).abs() <= 1.5, "max_x = {max_x}");
    }

    #[test]
    fn small_specks_are_filtered() {
        let (w, h) = (64, 64);
        let mask = mask_with_rect(w, h, 30, 30, 3);
        let mut visited = Vec::new();
        let mut quads = Vec::new();
        find_quads(&mask, w, h, &default_limits(), &mut visited, &mut quads);
        assert!(quads.is_empty());
    }

    #[test]
    fn circle_is_not_a_quad() {
        let (w, h) = (96, 96);
        let mut mask = vec![0u8; w * h];
        for y in 0..h {
            for x in 0..w {
                let dx = x as f32 - 48.0;
                let dy = y as f32 - 48.0;
                if (dx * dx + dy * dy).sqrt() < 25.0 {
                    mask[y * w + x] = 1;
                }
            }
        }
        let mut visited = Vec::new();
        let mut quads = Vec::new();
        find_quads(&mask, w, h, &default_limits(), &mut visited, &mut quads);
        assert!(quads.is_empty());
    }

    #[test]
    fn corners_come_out_clockwise() {
        let (w, h) = (64, 64);
        let mask = mask_with_rect(w, h, 10, 10, 30);
        let mut visited = Vec::new();
        let mut quads = Vec::new();
        find_quads(&mask, w, h, &default_limits(), &mut visited, &mut quads);
        let c = quads[0].corners;
        let cross = (c[1].x - c[0].x) * (c[2].y - c[0].y) - (c[1].y - c[0].y) * (c[2].x - c[0].x);
        assert!(cross > 0.0);
    }
}
