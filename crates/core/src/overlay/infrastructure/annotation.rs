//! CPU overlay rendering: face box plus emotion and learning-state labels
//! drawn with a built-in 5×7 bitmap font.
use crate::analysis::analysis_result::AnalysisResult;
use crate::shared::frame::Frame;

const BOX_COLOR: [u8; 3] = [255, 0, 0];
const LABEL_COLOR: [u8; 3] = [255, 0, 0];
const STATE_COLOR: [u8; 3] = [255, 255, 0];

const GLYPH_WIDTH: i64 = 5;
const GLYPH_HEIGHT: i64 = 7;
const GLYPH_ADVANCE: i64 = GLYPH_WIDTH + 1;
const LINE_ADVANCE: i64 = GLYPH_HEIGHT + 2;

/// Returns an annotated copy of `frame`; the input is never modified.
///
/// Draws a 1-px box around the face region, the dominant emotion at
/// `(x, y - 10)` and the learning state on the line below it. Without an
/// analysis, or without a detected face, the copy is unchanged.
pub fn annotate(frame: &Frame, analysis: Option<&AnalysisResult>) -> Frame {
    let mut out = frame.clone();
    let Some(analysis) = analysis else {
        return out;
    };
    let Some(region) = analysis.face_region() else {
        return out;
    };

    draw_rectangle(
        &mut out,
        region.x as i64,
        region.y as i64,
        region.right() as i64 - 1,
        region.bottom() as i64 - 1,
        BOX_COLOR,
    );

    if let Some(label) = analysis.dominant_label() {
        let (anchor_x, anchor_y) = region.label_anchor();
        let (x, y) = clamp_label(&out, anchor_x, anchor_y, label.as_str());
        draw_label(&mut out, x, y, label.as_str(), LABEL_COLOR);

        if let Some(state) = analysis.learning_state() {
            let (sx, sy) = clamp_label(&out, anchor_x, y + LINE_ADVANCE, state.as_str());
            draw_label(&mut out, sx, sy, state.as_str(), STATE_COLOR);
        }
    }

    out
}

/// Keeps a label's glyph box inside the frame where it fits.
fn clamp_label(frame: &Frame, x: i64, y: i64, text: &str) -> (i64, i64) {
    let text_width = text.chars().count() as i64 * GLYPH_ADVANCE;
    let max_x = (frame.width() as i64 - text_width).max(0);
    let max_y = (frame.height() as i64 - GLYPH_HEIGHT).max(0);
    (x.clamp(0, max_x), y.clamp(0, max_y))
}

fn put_pixel(frame: &mut Frame, x: i64, y: i64, color: [u8; 3]) {
    if x < 0 || y < 0 || x >= frame.width() as i64 || y >= frame.height() as i64 {
        return;
    }
    let channels = frame.channels() as usize;
    let offset = (y as usize * frame.width() as usize + x as usize) * channels;
    let pixel = &mut frame.data_mut()[offset..offset + channels];
    if channels >= 3 {
        pixel[..3].copy_from_slice(&color);
    } else {
        pixel[0] = color.iter().copied().max().unwrap_or(0);
    }
}

fn draw_rectangle(frame: &mut Frame, left: i64, top: i64, right: i64, bottom: i64, color: [u8; 3]) {
    let width = frame.width() as i64;
    let height = frame.height() as i64;
    if width == 0 || height == 0 || right < left || bottom < top {
        return;
    }
    let left = left.clamp(0, width - 1);
    let right = right.clamp(0, width - 1);
    let top = top.clamp(0, height - 1);
    let bottom = bottom.clamp(0, height - 1);

    for x in left..=right {
        put_pixel(frame, x, top, color);
        put_pixel(frame, x, bottom, color);
    }
    for y in top..=bottom {
        put_pixel(frame, left, y, color);
        put_pixel(frame, right, y, color);
    }
}

fn draw_label(frame: &mut Frame, mut x: i64, y: i64, text: &str, color: [u8; 3]) {
    for ch in text.chars().flat_map(|c| c.to_uppercase()) {
        if let Some(glyph) = glyph_bits(ch) {
            for (row, pattern) in glyph.iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if (pattern >> (GLYPH_WIDTH - 1 - col)) & 1 == 1 {
                        put_pixel(frame, x + col, y + row as i64, color);
                    }
                }
            }
        }
        x += GLYPH_ADVANCE;
    }
}

/// Rows of a 5×7 glyph, most significant of the low 5 bits leftmost.
/// Covers the letters of every emotion and learning-state label.
fn glyph_bits(ch: char) -> Option<[u8; 7]> {
    match ch {
        'A' => Some([0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001]),
        'C' => Some([0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110]),
        'D' => Some([0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110]),
        'E' => Some([0b11111, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000, 0b11111]),
        'F' => Some([0b11111, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000, 0b10000]),
        'G' => Some([0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111]),
        'H' => Some([0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001]),
        'I' => Some([0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110]),
        'L' => Some([0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111]),
        'N' => Some([0b10001, 0b11001, 0b10101, 0b10101, 0b10011, 0b10001, 0b10001]),
        'O' => Some([0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110]),
        'P' => Some([0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000]),
        'R' => Some([0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001]),
        'S' => Some([0b01111, 0b10000, 0b01110, 0b00001, 0b00001, 0b10001, 0b01110]),
        'T' => Some([0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100]),
        'U' => Some([0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110]),
        'Y' => Some([0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b00100]),
        ' ' => Some([0; 7]),
        _ => None,
    }
}
