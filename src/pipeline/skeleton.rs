//! Overlay drawing for annotated still images.

use image::{Rgba, RgbaImage};

use super::recognizer::common::PalmRegion;
use crate::types::GestureKind;

pub const CONNECTIONS: &[(usize, usize)] = &[
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 4),
    (0, 5),
    (5, 6),
    (6, 7),
    (7, 8),
    (0, 9),
    (9, 10),
    (10, 11),
    (11, 12),
    (0, 13),
    (13, 14),
    (14, 15),
    (15, 16),
    (0, 17),
    (17, 18),
    (18, 19),
    (19, 20),
    (5, 9),
    (9, 13),
    (13, 17),
];

const LINE_COLOR: Rgba<u8> = Rgba([56, 189, 248, 255]);
const JOINT_COLOR: Rgba<u8> = Rgba([248, 113, 113, 255]);
const PALM_BOX_COLOR: Rgba<u8> = Rgba([16, 185, 129, 255]);
const PALM_SCORE_THRESHOLD: f32 = 0.25;
const BANNER_ORIGIN: (i32, i32) = (50, 30);
const BANNER_SIZE: (i32, i32) = (160, 28);

/// Thickness scaled to the image so overlays stay visible on large frames.
fn line_thickness(img: &RgbaImage) -> i32 {
    (img.width().max(img.height()) as i32 / 160).clamp(2, 12)
}

/// Hand skeleton from landmarks in image pixels.
pub fn draw_skeleton(img: &mut RgbaImage, points: &[(f32, f32)]) {
    if points.len() < 2 {
        return;
    }
    let thickness = line_thickness(img);

    for &(a, b) in CONNECTIONS {
        if let (Some(&pa), Some(&pb)) = (points.get(a), points.get(b)) {
            draw_line(img, pa, pb, LINE_COLOR, thickness);
        }
    }

    let radius = thickness / 2 + 3;
    for &(x, y) in points {
        fill_circle(img, (x as i32, y as i32), radius, JOINT_COLOR);
    }
}

pub fn draw_palm_regions(img: &mut RgbaImage, regions: &[PalmRegion]) {
    let thickness = (line_thickness(img) / 2).max(1);
    for region in regions.iter().filter(|r| r.score >= PALM_SCORE_THRESHOLD) {
        let [x1, y1, x2, y2] = region.bbox;
        let corners = [(x1, y1), (x2, y1), (x2, y2), (x1, y2)];
        for i in 0..corners.len() {
            let next = corners[(i + 1) % corners.len()];
            draw_line(img, corners[i], next, PALM_BOX_COLOR, thickness);
        }
    }
}

/// Filled block in the gesture's colour near the top-left corner.
pub fn draw_gesture_banner(img: &mut RgbaImage, gesture: GestureKind) {
    let (x0, y0) = BANNER_ORIGIN;
    let (w, h) = BANNER_SIZE;
    let color = Rgba(gesture.overlay_color());
    for y in y0..y0 + h {
        for x in x0..x0 + w {
            put_pixel_safe(img, x, y, color);
        }
    }
}

fn draw_line(img: &mut RgbaImage, p0: (f32, f32), p1: (f32, f32), color: Rgba<u8>, thickness: i32) {
    let (mut x0, mut y0) = (p0.0 as i32, p0.1 as i32);
    let (x1, y1) = (p1.0 as i32, p1.1 as i32);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let radius = (thickness.max(1) - 1) / 2;

    loop {
        fill_circle(img, (x0, y0), radius, color);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

fn fill_circle(img: &mut RgbaImage, (cx, cy): (i32, i32), radius: i32, color: Rgba<u8>) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                put_pixel_safe(img, cx + dx, cy + dy, color);
            }
        }
    }
}

fn put_pixel_safe(img: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>) {
    if x < 0 || y < 0 {
        return;
    }
    let (ux, uy) = (x as u32, y as u32);
    if ux < img.width() && uy < img.height() {
        img.put_pixel(ux, uy, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_covers_both_endpoints() {
        let mut img = RgbaImage::new(20, 20);
        draw_line(&mut img, (2.0, 3.0), (17.0, 12.0), LINE_COLOR, 1);
        assert_eq!(*img.get_pixel(2, 3), LINE_COLOR);
        assert_eq!(*img.get_pixel(17, 12), LINE_COLOR);
        assert_eq!(*img.get_pixel(17, 3), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn drawing_off_canvas_is_clipped() {
        let mut img = RgbaImage::new(10, 10);
        draw_skeleton(&mut img, &[(-50.0, -50.0), (500.0, 500.0)]);
        fill_circle(&mut img, (-3, 12), 4, JOINT_COLOR);
        assert_eq!(*img.get_pixel(0, 0), LINE_COLOR);
    }

    #[test]
    fn banner_uses_gesture_colour() {
        let mut img = RgbaImage::new(320, 240);
        draw_gesture_banner(&mut img, GestureKind::LeftClick);
        assert_eq!(img.get_pixel(60, 40).0, GestureKind::LeftClick.overlay_color());
        assert_eq!(img.get_pixel(5, 5).0, [0, 0, 0, 0]);
    }

    #[test]
    fn weak_palms_are_not_drawn() {
        let mut img = RgbaImage::new(50, 50);
        let weak = PalmRegion {
            bbox: [5.0, 5.0, 40.0, 40.0],
            landmarks: Vec::new(),
            score: 0.1,
        };
        draw_palm_regions(&mut img, std::slice::from_ref(&weak));
        assert!(img.pixels().all(|p| p.0 == [0, 0, 0, 0]));

        let strong = PalmRegion { score: 0.9, ..weak };
        draw_palm_regions(&mut img, &[strong]);
        assert_eq!(*img.get_pixel(5, 5), PALM_BOX_COLOR);
    }
}
