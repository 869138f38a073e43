use crate::braille::BrailleCanvas;

/// 4x4 ordered-dither thresholds, used to stipple fills by opacity
const BAYER4: [[u8; 4]; 4] = [[0, 8, 2, 10], [12, 4, 14, 6], [3, 11, 1, 9], [15, 7, 13, 5]];

/// Draw a line using Bresenham's algorithm
pub fn draw_line(canvas: &mut BrailleCanvas, x0: i32, y0: i32, x1: i32, y1: i32) {
    draw_pattern_line(canvas, x0, y0, x1, y1, |_| true);
}

/// Draw a dashed line: `on` pixels drawn, `off` pixels skipped, repeating
pub fn draw_dashed_line(canvas: &mut BrailleCanvas, x0: i32, y0: i32, x1: i32, y1: i32, on: u32, off: u32) {
    let period = (on + off).max(1);
    draw_pattern_line(canvas, x0, y0, x1, y1, |step| step % period < on);
}

fn draw_pattern_line<F>(canvas: &mut BrailleCanvas, x0: i32, y0: i32, x1: i32, y1: i32, mut draw: F)
where
    F: FnMut(u32) -> bool,
{
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut x = x0;
    let mut y = y0;
    let mut step = 0u32;

    loop {
        if draw(step) {
            canvas.set_pixel_signed(x, y);
        }
        step = step.wrapping_add(1);

        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;

        if e2 >= dy {
            if x == x1 {
                break;
            }
            err += dy;
            x += sx;
        }

        if e2 <= dx {
            if y == y1 {
                break;
            }
            err += dx;
            y += sy;
        }
    }
}

/// Draw a filled circle (for point markers)
pub fn draw_circle(canvas: &mut BrailleCanvas, cx: i32, cy: i32, radius: i32) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                canvas.set_pixel_signed(cx + dx, cy + dy);
            }
        }
    }
}

/// Stipple the interior of a projected polygon. `density` in [0, 1] picks
/// how many of each 4x4 block of pixels are set.
pub fn fill_polygon(canvas: &mut BrailleCanvas, points: &[(i32, i32)], density: f64) {
    if points.len() < 3 || density <= 0.0 {
        return;
    }
    let level = (density.clamp(0.0, 1.0) * 16.0).round() as u8;
    if level == 0 {
        return;
    }
    let (w, h) = canvas.pixel_size();
    let min_y = points.iter().map(|p| p.1).min().unwrap_or(0).max(0);
    let max_y = points.iter().map(|p| p.1).max().unwrap_or(0).min(h as i32 - 1);

    let mut crossings = Vec::new();
    for y in min_y..=max_y {
        crossings.clear();
        let scan = y as f64 + 0.5;
        for (i, &(x0, y0)) in points.iter().enumerate() {
            let (x1, y1) = points[(i + 1) % points.len()];
            let (fy0, fy1) = (y0 as f64, y1 as f64);
            if (fy0 <= scan) != (fy1 <= scan) {
                let t = (scan - fy0) / (fy1 - fy0);
                crossings.push(x0 as f64 + t * (x1 - x0) as f64);
            }
        }
        crossings.sort_by(|a, b| a.total_cmp(b));

        for span in crossings.chunks_exact(2) {
            let start = (span[0].ceil() as i32).max(0);
            let end = (span[1].floor() as i32).min(w as i32 - 1);
            for x in start..=end {
                if BAYER4[(y & 3) as usize][(x & 3) as usize] < level {
                    canvas.set_pixel_signed(x, y);
                }
            }
        }
    }
}

/// Even-odd point-in-polygon test in pixel space
pub fn polygon_contains(points: &[(i32, i32)], px: i32, py: i32) -> bool {
    if points.len() < 3 {
        return false;
    }
    let (x, y) = (px as f64 + 0.5, py as f64 + 0.5);
    let mut inside = false;
    let mut j = points.len() - 1;
    for i in 0..points.len() {
        let (xi, yi) = (points[i].0 as f64, points[i].1 as f64);
        let (xj, yj) = (points[j].0 as f64, points[j].1 as f64);
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Squared distance from a pixel to a segment
pub fn segment_distance_sq(p: (i32, i32), a: (i32, i32), b: (i32, i32)) -> f64 {
    let (px, py) = (p.0 as f64, p.1 as f64);
    let (ax, ay) = (a.0 as f64, a.1 as f64);
    let (bx, by) = (b.0 as f64, b.1 as f64);
    let (dx, dy) = (bx - ax, by - ay);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq == 0.0 {
        0.0
    } else {
        (((px - ax) * dx + (py - ay) * dy) / len_sq).clamp(0.0, 1.0)
    };
    let (cx, cy) = (ax + t * dx, ay + t * dy);
    (px - cx).powi(2) + (py - cy).powi(2)
}
