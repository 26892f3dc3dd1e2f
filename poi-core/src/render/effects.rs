//! Pixel mapping onto the physical strip
//!
//! The strip is mounted so that logical row 0 sits at the far end; every
//! draw function writes row `j` to pixel `len - 1 - j`.

use rgb::RGB8;

use poi_protocol::BYTES_PER_PIXEL;

/// Scanner head color (dim blue)
const SCANNER_HEAD: u8 = 150;
/// Scanner tail length in pixels
const SCANNER_TAIL: usize = 4;

#[inline]
fn scale_channel(value: u8, brightness: u8) -> u8 {
    ((u16::from(value) * u16::from(brightness)) / 255) as u8
}

/// Scale a color by `brightness / 255`
pub fn scale(color: RGB8, brightness: u8) -> RGB8 {
    RGB8::new(
        scale_channel(color.r, brightness),
        scale_channel(color.g, brightness),
        scale_channel(color.b, brightness),
    )
}

fn pixel_at(rgb: &[u8], row: usize) -> RGB8 {
    let i = row * BYTES_PER_PIXEL;
    RGB8::new(rgb[i], rgb[i + 1], rgb[i + 2])
}

/// Draw one stream frame, mirrored
///
/// Rows past the strip are ignored; pixels without a row are dark.
pub fn draw_stream(frame: &[u8], brightness: u8, out: &mut [RGB8]) {
    let len = out.len();
    out.fill(RGB8::default());
    let rows = (frame.len() / BYTES_PER_PIXEL).min(len);
    for j in 0..rows {
        out[len - 1 - j] = scale(pixel_at(frame, j), brightness);
    }
}

/// Draw one pattern column, mirrored and tiled over the whole strip
pub fn draw_column(column: &[u8], brightness: u8, out: &mut [RGB8]) {
    let len = out.len();
    let rows = column.len() / BYTES_PER_PIXEL;
    if rows == 0 {
        out.fill(RGB8::default());
        return;
    }
    for j in 0..len {
        out[len - 1 - j] = scale(pixel_at(column, j % rows), brightness);
    }
}

/// Color wheel: red to green to blue and back
pub fn wheel(pos: u8) -> RGB8 {
    let pos = 255 - pos;
    if pos < 85 {
        RGB8::new(255 - pos * 3, 0, pos * 3)
    } else if pos < 170 {
        let pos = pos - 85;
        RGB8::new(0, pos * 3, 255 - pos * 3)
    } else {
        let pos = pos - 170;
        RGB8::new(pos * 3, 255 - pos * 3, 0)
    }
}

/// Generated fallback pattern for when no file or stream is available
pub fn draw_rainbow(frame: u32, brightness: u8, out: &mut [RGB8]) {
    for (i, px) in out.iter_mut().enumerate() {
        let pos = (i as u32 * 8).wrapping_add(frame) as u8;
        *px = scale(wheel(pos), brightness);
    }
}

/// Bouncing scanner shown while an upload is in progress
#[derive(Debug, Clone, Copy, Default)]
pub struct Scanner {
    pos: usize,
    reverse: bool,
}

impl Scanner {
    pub const fn new() -> Self {
        Self {
            pos: 0,
            reverse: false,
        }
    }

    /// Draw the current position and advance one step
    pub fn step(&mut self, out: &mut [RGB8]) {
        let len = out.len();
        out.fill(RGB8::default());
        if len == 0 {
            return;
        }
        self.pos = self.pos.min(len - 1);

        for i in 0..SCANNER_TAIL {
            let p = if self.reverse {
                self.pos.checked_add(i)
            } else {
                self.pos.checked_sub(i)
            };
            if let Some(p) = p.filter(|p| *p < len) {
                let level = SCANNER_HEAD / (i as u8 + 1);
                out[p] = RGB8::new(0, level / 2, level);
            }
        }

        if len > 1 {
            if self.reverse {
                self.pos -= 1;
                if self.pos == 0 {
                    self.reverse = false;
                }
            } else {
                self.pos += 1;
                if self.pos == len - 1 {
                    self.reverse = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale() {
        assert_eq!(scale(RGB8::new(255, 128, 0), 255), RGB8::new(255, 128, 0));
        assert_eq!(scale(RGB8::new(255, 128, 0), 0), RGB8::new(0, 0, 0));
        assert_eq!(scale(RGB8::new(255, 100, 10), 128), RGB8::new(128, 50, 5));
    }

    #[test]
    fn test_stream_is_mirrored() {
        let mut out = [RGB8::default(); 4];
        draw_stream(&[1, 2, 3, 4, 5, 6], 255, &mut out);
        assert_eq!(out[3], RGB8::new(1, 2, 3));
        assert_eq!(out[2], RGB8::new(4, 5, 6));
        assert_eq!(out[1], RGB8::default());
        assert_eq!(out[0], RGB8::default());
    }

    #[test]
    fn test_stream_rows_past_strip_ignored() {
        let mut out = [RGB8::default(); 2];
        draw_stream(&[1, 1, 1, 2, 2, 2, 3, 3, 3], 255, &mut out);
        assert_eq!(out, [RGB8::new(2, 2, 2), RGB8::new(1, 1, 1)]);
    }

    #[test]
    fn test_column_tiles() {
        let mut out = [RGB8::default(); 5];
        draw_column(&[9, 9, 9, 7, 7, 7], 255, &mut out);
        assert_eq!(out[4], RGB8::new(9, 9, 9));
        assert_eq!(out[3], RGB8::new(7, 7, 7));
        assert_eq!(out[2], RGB8::new(9, 9, 9));
        assert_eq!(out[0], RGB8::new(9, 9, 9));
    }

    #[test]
    fn test_wheel_primaries() {
        assert_eq!(wheel(255), RGB8::new(255, 0, 0));
        assert_eq!(wheel(170), RGB8::new(0, 0, 255));
        assert_eq!(wheel(85), RGB8::new(0, 255, 0));
    }

    #[test]
    fn test_rainbow_respects_brightness() {
        let mut out = [RGB8::new(1, 1, 1); 8];
        draw_rainbow(3, 0, &mut out);
        assert!(out.iter().all(|c| *c == RGB8::default()));
    }

    #[test]
    fn test_scanner_bounces() {
        let mut scanner = Scanner::new();
        let mut out = [RGB8::default(); 3];
        let mut heads = [0usize; 6];
        for head in heads.iter_mut() {
            scanner.step(&mut out);
            *head = out
                .iter()
                .position(|c| c.b == SCANNER_HEAD)
                .unwrap();
        }
        assert_eq!(heads, [0, 1, 2, 1, 0, 1]);
    }

    #[test]
    fn test_scanner_empty_strip() {
        let mut scanner = Scanner::new();
        scanner.step(&mut []);
    }
}
