//! Drawing detections onto RGB frames.

mod font;

use crate::markers::DetectedMarker;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

pub const OUTLINE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const FIRST_CORNER_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
pub const LABEL_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
/// Colour of the small `id=K` tag drawn under the label.
pub const ID_TAG_COLOR: Rgb<u8> = Rgb([0, 0, 255]);

/// Label glyph scale (each font pixel becomes `LABEL_SCALE` x `LABEL_SCALE`).
const LABEL_SCALE: u32 = 2;
const ID_TAG_SCALE: u32 = 1;
/// Half side of the square drawn on `corners[0]`.
const CORNER_MARK: i32 = 2;

/// Label drawn for a marker.
pub fn marker_label(id: u32) -> String {
    format!("ID: {id}")
}

/// Outline every marker, mark its first corner, tag it `id=K` and write
/// `ID: K` over the tag. Both texts have their lower-left at the marker
/// centre.
pub fn annotate(frame: &mut RgbImage, markers: &[DetectedMarker]) {
    for m in markers {
        draw_outline(frame, m);
        let c0 = m.corners[0];
        draw_filled_rect_mut(
            frame,
            Rect::at(c0.x as i32 - CORNER_MARK, c0.y as i32 - CORNER_MARK)
                .of_size(2 * CORNER_MARK as u32 + 1, 2 * CORNER_MARK as u32 + 1),
            FIRST_CORNER_COLOR,
        );
        let (cx, cy) = (m.center().x as i32, m.center().y as i32);
        let tag = format!("id={}", m.id);
        draw_text(frame, cx, cy, &tag, ID_TAG_SCALE, ID_TAG_COLOR);
        draw_text(frame, cx, cy, &marker_label(m.id), LABEL_SCALE, LABEL_COLOR);
    }
}

fn draw_outline(frame: &mut RgbImage, m: &DetectedMarker) {
    for k in 0..4 {
        let a = m.corners[k];
        let b = m.corners[(k + 1) % 4];
        // two pixels wide
        for (dx, dy) in [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)] {
            draw_line_segment_mut(
                frame,
                (a.x + dx, a.y + dy),
                (b.x + dx, b.y + dy),
                OUTLINE_COLOR,
            );
        }
    }
}

/// Draw `text` with the bitmap font magnified `scale` times; `(x, baseline)`
/// is the lower-left corner of the text. Unknown characters advance without
/// drawing.
pub fn draw_text(
    frame: &mut RgbImage,
    x: i32,
    baseline: i32,
    text: &str,
    scale: u32,
    color: Rgb<u8>,
) {
    let s = scale.max(1);
    let top = baseline - (font::GLYPH_HEIGHT * s) as i32;
    let mut pen = x;
    for c in text.chars() {
        if let Some(rows) = font::glyph(c) {
            for (row, &bits) in rows.iter().enumerate() {
                for col in 0..font::GLYPH_WIDTH {
                    if bits >> (font::GLYPH_WIDTH - 1 - col) & 1 == 0 {
                        continue;
                    }
                    let px = pen + (col * s) as i32;
                    let py = top + (row as u32 * s) as i32;
                    draw_filled_rect_mut(frame, Rect::at(px, py).of_size(s, s), color);
                }
            }
        }
        pen += ((font::GLYPH_WIDTH + font::GLYPH_SPACING) * s) as i32;
    }
}
