//! Colour sampling from a captured face photo.
//!
//! Skin is sampled from the centre of the frame and hair from a strip at
//! the top. Geometry is not measured; those fields keep their defaults.

use crate::clone::profile::{FaceFeatures, HairStyle};
use crate::error::{CloneVoiceError, Result};

const SKIN_WINDOW: i64 = 60;
const MIN_SKIN_PIXELS: usize = 100;
const DEFAULT_SKIN: &str = "#f5c6a5";
const DEFAULT_HAIR: &str = "#2a2a2a";
const DEFAULT_EYES: &str = "#4a3728";

/// An RGBA image, row-major, four bytes per pixel.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    width: u32,
    height: u32,
    rgba: &'a [u8],
}

impl<'a> Frame<'a> {
    pub fn new(width: u32, height: u32, rgba: &'a [u8]) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(CloneVoiceError::InvalidFrame {
                message: format!("empty frame {width}x{height}"),
            });
        }
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(CloneVoiceError::InvalidFrame {
                message: format!(
                    "expected {expected} bytes for {width}x{height} RGBA, got {}",
                    rgba.len()
                ),
            });
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn rgb(&self, x: u32, y: u32) -> Rgb {
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        Rgb {
            r: self.rgba[idx] as u32,
            g: self.rgba[idx + 1] as u32,
            b: self.rgba[idx + 2] as u32,
        }
    }

    fn pixels(&self) -> impl Iterator<Item = Rgb> + '_ {
        self.rgba.chunks_exact(4).map(|p| Rgb {
            r: p[0] as u32,
            g: p[1] as u32,
            b: p[2] as u32,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rgb {
    r: u32,
    g: u32,
    b: u32,
}

impl Rgb {
    fn sum(&self) -> u32 {
        self.r + self.g + self.b
    }

    fn is_skin_like(&self) -> bool {
        let Rgb { r, g, b } = *self;
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        r > 80 && g > 50 && b > 30 && r > g && r > b && r - g < 100 && max - min < 150
    }

    fn css(&self) -> String {
        format!("rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

fn average(pixels: &[Rgb]) -> Option<Rgb> {
    if pixels.is_empty() {
        return None;
    }
    let n = pixels.len() as u64;
    let (r, g, b) = pixels.iter().fold((0u64, 0u64, 0u64), |(r, g, b), p| {
        (r + p.r as u64, g + p.g as u64, b + p.b as u64)
    });
    Some(Rgb {
        r: (r / n) as u32,
        g: (g / n) as u32,
        b: (b / n) as u32,
    })
}

fn skin_tone(frame: &Frame<'_>) -> Option<String> {
    let cx = (frame.width / 2) as i64;
    let cy = (frame.height / 2) as i64;
    let (w, h) = (frame.width as i64, frame.height as i64);

    let mut skin = Vec::new();
    for y in (cy - SKIN_WINDOW)..(cy + SKIN_WINDOW) {
        for x in (cx - SKIN_WINDOW)..(cx + SKIN_WINDOW) {
            if x < 0 || x >= w || y < 0 || y >= h {
                continue;
            }
            let px = frame.rgb(x as u32, y as u32);
            if px.is_skin_like() {
                skin.push(px);
            }
        }
    }
    if skin.len() <= MIN_SKIN_PIXELS {
        return None;
    }

    // middle half by brightness
    skin.sort_by_key(Rgb::sum);
    let start = skin.len() / 4;
    let end = skin.len() * 3 / 4;
    let mut tone = average(&skin[start..end])?;

    let brightness = tone.sum() as f64 / 3.0;
    if brightness < 120.0 {
        let boost = 140.0 / brightness;
        let lift = |c: u32| ((c as f64 * boost).floor() as u32).min(255);
        tone = Rgb {
            r: lift(tone.r),
            g: lift(tone.g),
            b: lift(tone.b),
        };
    }
    Some(tone.css())
}

fn hair_color(frame: &Frame<'_>) -> Option<String> {
    let (w, h) = (frame.width as f64, frame.height as f64);
    let mut hair = Vec::new();
    let mut y = 0.0;
    while y < h * 0.15 {
        let mut x = w * 0.35;
        while x < w * 0.65 {
            hair.push(frame.rgb(x.floor() as u32, y as u32));
            x += 1.0;
        }
        y += 1.0;
    }
    let avg = average(&hair)?;
    // very dark means we sampled background
    (avg.sum() as f64 / 3.0 > 30.0).then(|| avg.css())
}

fn mean_brightness(frame: &Frame<'_>) -> f64 {
    let (total, count) = frame
        .pixels()
        .fold((0.0, 0u64), |(t, n), p| (t + p.sum() as f64 / 3.0, n + 1));
    total / count.max(1) as f64
}

/// Estimate avatar colours from a face photo.
pub fn analyze_frame(frame: &Frame<'_>) -> FaceFeatures {
    FaceFeatures {
        skin_tone: skin_tone(frame).unwrap_or_else(|| DEFAULT_SKIN.to_string()),
        hair_color: hair_color(frame).unwrap_or_else(|| DEFAULT_HAIR.to_string()),
        eye_color: DEFAULT_EYES.to_string(),
        hair_style: if mean_brightness(frame) > 100.0 {
            HairStyle::Short
        } else {
            HairStyle::Long
        },
        ..FaceFeatures::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
        (0..width * height)
            .flat_map(|_| [rgb[0], rgb[1], rgb[2], 255])
            .collect()
    }

    #[test]
    fn test_frame_size_is_checked() {
        assert!(Frame::new(2, 2, &[0; 15]).is_err());
        assert!(Frame::new(0, 2, &[]).is_err());
        assert!(Frame::new(2, 2, &[0; 16]).is_ok());
    }

    #[test]
    fn test_skin_tone_from_uniform_face() {
        let data = solid(200, 200, [200, 150, 120]);
        let frame = Frame::new(200, 200, &data).unwrap();
        let features = analyze_frame(&frame);
        assert_eq!(features.skin_tone, "rgb(200, 150, 120)");
        assert_eq!(features.hair_color, "rgb(200, 150, 120)");
        assert_eq!(features.eye_color, "#4a3728");
        assert_eq!(features.hair_style, HairStyle::Short);
    }

    #[test]
    fn test_dark_skin_is_brightened() {
        let data = solid(200, 200, [100, 80, 60]);
        let frame = Frame::new(200, 200, &data).unwrap();
        // mean 80, boosted by 140/80
        assert_eq!(analyze_frame(&frame).skin_tone, "rgb(175, 140, 105)");
    }

    #[test]
    fn test_defaults_without_skin_or_hair() {
        let data = solid(200, 200, [10, 10, 10]);
        let frame = Frame::new(200, 200, &data).unwrap();
        let features = analyze_frame(&frame);
        assert_eq!(features.skin_tone, "#f5c6a5");
        assert_eq!(features.hair_color, "#2a2a2a");
        assert_eq!(features.hair_style, HairStyle::Long);
    }

    #[test]
    fn test_tiny_frame_has_too_few_skin_pixels() {
        let data = solid(8, 8, [200, 150, 120]);
        let frame = Frame::new(8, 8, &data).unwrap();
        assert_eq!(analyze_frame(&frame).skin_tone, "#f5c6a5");
    }

    #[test]
    fn test_geometry_keeps_defaults() {
        let data = solid(50, 50, [200, 150, 120]);
        let frame = Frame::new(50, 50, &data).unwrap();
        let features = analyze_frame(&frame);
        let defaults = FaceFeatures::default();
        assert_eq!(features.face_shape, defaults.face_shape);
        assert_eq!(features.face_width, defaults.face_width);
        assert!(!features.has_glasses);
    }
}
