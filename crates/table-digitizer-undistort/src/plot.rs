//! Raster diagnostic plots for checking a calibration by eye.

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

use crate::grouping::DotLine;
use crate::residual::ResidualPoint;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([40, 40, 40]);
const PALETTE: [Rgb<u8>; 4] = [
    Rgb([31, 119, 180]),
    Rgb([214, 39, 40]),
    Rgb([44, 160, 44]),
    Rgb([148, 103, 189]),
];

/// Grouped lines drawn over a blank canvas of the image size, one colour per
/// line.
pub fn render_line_plot(lines: &[DotLine], width: u32, height: u32) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(width.max(1), height.max(1), WHITE);
    for (i, line) in lines.iter().enumerate() {
        let color = PALETTE[i % PALETTE.len()];
        for w in line.windows(2) {
            draw_line_segment_mut(
                &mut canvas,
                (w[0].x as f32, w[0].y as f32),
                (w[1].x as f32, w[1].y as f32),
                color,
            );
        }
        for p in line {
            draw_filled_circle_mut(&mut canvas, (p.x.round() as i32, p.y.round() as i32), 2, color);
        }
    }
    canvas
}

pub const RESIDUAL_PLOT_SIZE: (u32, u32) = (640, 480);
const MARGIN: u32 = 40;

/// Scatter of residual against radius on a fixed-size canvas.
pub fn render_residual_plot(points: &[ResidualPoint]) -> RgbImage {
    let (w, h) = RESIDUAL_PLOT_SIZE;
    let mut canvas = RgbImage::from_pixel(w, h, WHITE);
    let (pw, ph) = (w - 2 * MARGIN, h - 2 * MARGIN);
    draw_hollow_rect_mut(&mut canvas, Rect::at(MARGIN as i32, MARGIN as i32).of_size(pw, ph), AXIS);

    let max_r = points.iter().fold(0.0f64, |m, p| m.max(p.radius)).max(1e-9);
    let max_res = points.iter().fold(0.0f64, |m, p| m.max(p.residual)).max(1e-9);
    for p in points {
        let x = MARGIN as f64 + p.radius / max_r * pw as f64;
        let y = (MARGIN + ph) as f64 - p.residual / max_res * ph as f64;
        draw_filled_circle_mut(&mut canvas, (x.round() as i32, y.round() as i32), 2, PALETTE[0]);
    }
    canvas
}
