use crate::types::Point;

/// Output range of [`distance`].
pub const DISTANCE_SCALE: (f32, f32) = (0.0, 1000.0);

/// Angle at vertex `b` between the rays `b -> a` and `b -> c`, in degrees.
///
/// Computed as the absolute difference of the two ray headings. The result is
/// not folded back into `[0, 180]`, so some configurations report more than
/// 180.
pub fn angle(a: Point, b: Point, c: Point) -> f32 {
    let (a, b, c) = (wide(a), wide(b), wide(c));
    let radians = (c.1 - b.1).atan2(c.0 - b.0) - (a.1 - b.1).atan2(a.0 - b.0);
    radians.to_degrees().abs() as f32
}

/// Euclidean distance between `p` and `q`, rescaled from `[0, 1]` onto
/// [`DISTANCE_SCALE`]. Separations past 1 saturate at the top of the scale.
pub fn distance(p: Point, q: Point) -> f32 {
    let (p, q) = (wide(p), wide(q));
    let raw = (q.0 - p.0).hypot(q.1 - p.1);
    let (lo, hi) = DISTANCE_SCALE;
    interp_f64(raw, (0.0, 1.0), (lo as f64, hi as f64)) as f32
}

/// Measurements are taken in `f64` and narrowed once at the end.
fn wide(p: Point) -> (f64, f64) {
    (p.x as f64, p.y as f64)
}

/// Piecewise-linear map of `x` from `domain` onto `range`, clamping to the
/// range ends outside the domain.
pub fn interp(x: f32, domain: (f32, f32), range: (f32, f32)) -> f32 {
    let (x0, x1) = domain;
    let (y0, y1) = range;
    interp_f64(
        x as f64,
        (x0 as f64, x1 as f64),
        (y0 as f64, y1 as f64),
    ) as f32
}

fn interp_f64(x: f64, domain: (f64, f64), range: (f64, f64)) -> f64 {
    let (x0, x1) = domain;
    let (y0, y1) = range;
    if x <= x0 {
        return y0;
    }
    if x >= x1 {
        return y1;
    }
    y0 + (x - x0) * (y1 - y0) / (x1 - x0)
}
