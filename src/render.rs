//! Text renderer - shirt text onto a fixed-size PNG canvas
//!
//! Block lettering from an embedded 5x7 font: words wrap onto multiple
//! lines, and the glyph scale steps down until the text fits, so long text
//! never fails a render. Empty text produces a blank canvas.

use image::{Rgba, RgbaImage};
use std::path::Path;

use crate::error::{ForgeError, Result};

const GLYPH_ROWS: usize = 7;
/// Horizontal advance per character, in glyph units (5px glyph + 1px gap).
const CELL_ADVANCE: u32 = 6;
/// Vertical advance per line, in glyph units (7px glyph + 2px gap).
const LINE_ADVANCE: u32 = 9;

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Trait implemented by renderers (block font, test doubles).
pub trait TextRenderer {
    /// Draw `text` onto a `width` x `height` canvas, text color given as a
    /// `#RRGGBB` hex string, and write a PNG to `dest`. Missing parent
    /// directories are created.
    fn render(&self, text: &str, width: u32, height: u32, color: &str, dest: &Path) -> Result<()>;
}

/// Renderer drawing uppercase block lettering, centered on the canvas.
#[derive(Debug, Default)]
pub struct BlockTextRenderer;

impl BlockTextRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl TextRenderer for BlockTextRenderer {
    fn render(&self, text: &str, width: u32, height: u32, color: &str, dest: &Path) -> Result<()> {
        let ink = parse_hex_color(color)?;
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut canvas = RgbaImage::from_pixel(width, height, BACKGROUND);

        let text = text.trim().to_uppercase();
        if !text.is_empty() {
            // A tenth of the canvas as margin on every side.
            let margin_x = width / 10;
            let margin_y = height / 10;
            let usable_w = width.saturating_sub(2 * margin_x).max(CELL_ADVANCE);
            let usable_h = height.saturating_sub(2 * margin_y).max(LINE_ADVANCE);

            let (scale, lines) = layout(&text, usable_w, usable_h);
            let block_h = lines.len() as u32 * LINE_ADVANCE * scale;
            let mut y = margin_y + usable_h.saturating_sub(block_h) / 2;

            for line in &lines {
                let line_w = line.chars().count() as u32 * CELL_ADVANCE * scale;
                let mut x = margin_x + usable_w.saturating_sub(line_w) / 2;
                for c in line.chars() {
                    draw_glyph(&mut canvas, c, x, y, scale, ink);
                    x += CELL_ADVANCE * scale;
                }
                y += LINE_ADVANCE * scale;
            }
        }

        canvas
            .save(dest)
            .map_err(|e| ForgeError::Io(std::io::Error::other(e)))?;
        Ok(())
    }
}

/// Pick the largest glyph scale whose word-wrapped lines fit the usable
/// area; at scale 1 overflowing rows are truncated rather than failing.
fn layout(text: &str, usable_w: u32, usable_h: u32) -> (u32, Vec<String>) {
    let max_scale = (usable_w / CELL_ADVANCE).min(usable_h / LINE_ADVANCE).max(1);
    for scale in (1..=max_scale).rev() {
        let cols = (usable_w / (CELL_ADVANCE * scale)).max(1) as usize;
        let rows = (usable_h / (LINE_ADVANCE * scale)).max(1) as usize;
        let lines = wrap_words(text, cols);
        if lines.len() <= rows && lines.iter().all(|l| l.chars().count() <= cols) {
            return (scale, lines);
        }
    }

    let cols = (usable_w / CELL_ADVANCE).max(1) as usize;
    let rows = (usable_h / LINE_ADVANCE).max(1) as usize;
    let mut lines = wrap_words(text, cols);
    lines.truncate(rows);
    (1, lines)
}

/// Greedy word wrap to at most `cols` characters per line. Words longer
/// than a full line are hard-broken.
fn wrap_words(text: &str, cols: usize) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut current: Vec<char> = Vec::new();

    for word in text.split_whitespace() {
        let chars: Vec<char> = word.chars().collect();
        let mut start = 0;
        while chars.len() - start > cols {
            if !current.is_empty() {
                lines.push(current.iter().collect());
                current.clear();
            }
            lines.push(chars[start..start + cols].iter().collect());
            start += cols;
        }
        let rest = &chars[start..];
        if current.is_empty() {
            current.extend_from_slice(rest);
        } else if current.len() + 1 + rest.len() <= cols {
            current.push(' ');
            current.extend_from_slice(rest);
        } else {
            lines.push(current.iter().collect());
            current.clear();
            current.extend_from_slice(rest);
        }
    }
    if !current.is_empty() {
        lines.push(current.iter().collect());
    }
    lines
}

fn draw_glyph(canvas: &mut RgbaImage, c: char, x0: u32, y0: u32, scale: u32, ink: Rgba<u8>) {
    let rows = glyph(c);
    for (row, bits) in rows.iter().enumerate() {
        for col in 0..5u32 {
            if bits & (1 << (4 - col)) != 0 {
                fill_block(
                    canvas,
                    x0 + col * scale,
                    y0 + row as u32 * scale,
                    scale,
                    ink,
                );
            }
        }
    }
}

fn fill_block(canvas: &mut RgbaImage, x0: u32, y0: u32, scale: u32, ink: Rgba<u8>) {
    for dy in 0..scale {
        for dx in 0..scale {
            let (x, y) = (x0 + dx, y0 + dy);
            if x < canvas.width() && y < canvas.height() {
                canvas.put_pixel(x, y, ink);
            }
        }
    }
}

fn parse_hex_color(color: &str) -> Result<Rgba<u8>> {
    let hex = color.strip_prefix('#').unwrap_or(color);
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ForgeError::Config(format!(
            "invalid color {:?}, expected #RRGGBB",
            color
        )));
    }
    let r = u8::from_str_radix(&hex[0..2], 16).unwrap_or(0);
    let g = u8::from_str_radix(&hex[2..4], 16).unwrap_or(0);
    let b = u8::from_str_radix(&hex[4..6], 16).unwrap_or(0);
    Ok(Rgba([r, g, b, 255]))
}

/// 5x7 bitmap rows, bit 4 is the leftmost column. Unknown characters fall
/// back to a hollow box.
fn glyph(c: char) -> [u8; GLYPH_ROWS] {
    match c {
        ' ' => [0x00; 7],
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1C, 0x12, 0x11, 0x11, 0x11, 0x12, 0x1C],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0E],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x19, 0x15, 0x13, 0x11, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x1B, 0x11],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x0A, 0x04, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        '!' => [0x04, 0x04, 0x04, 0x04, 0x04, 0x00, 0x04],
        '?' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x00, 0x04],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        ',' => [0x00, 0x00, 0x00, 0x00, 0x0C, 0x04, 0x08],
        '\'' => [0x0C, 0x04, 0x08, 0x00, 0x00, 0x00, 0x00],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        '&' => [0x08, 0x14, 0x14, 0x08, 0x15, 0x12, 0x0D],
        _ => [0x1F, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1F],
    }
}
