//! # Watermark Module
//!
//! Lays out and composites the multi-line branded overlay: a semi-transparent
//! backdrop anchored to the bottom-right corner with the brand name, a UTC
//! timestamp, and an identity line stacked inside it. Font size scales with
//! the smaller frame dimension so the overlay stays proportional across
//! resolutions.

use chrono::Utc;
use imageproc::drawing::{draw_text_mut, text_size};
use rusttype::{Font, Scale};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{LuminaError, Result};
use crate::video::types::Frame;

static FONT_BYTES: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans-Bold.ttf");

/// Base font size as a fraction of the smaller frame dimension
const FONT_SIZE_RATIO: f32 = 1.0 / 30.0;

/// Smallest usable base font size in pixels
const MIN_FONT_SIZE: f32 = 10.0;

/// One line of watermark text with its relative size
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatermarkLine {
    pub text: String,

    /// Multiplier applied to the frame-derived base font size
    pub scale: f32,
}

impl WatermarkLine {
    pub fn new<S: Into<String>>(text: S, scale: f32) -> Self {
        Self {
            text: text.into(),
            scale,
        }
    }
}

/// Watermark content and styling, fixed for the lifetime of a job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatermarkSpec {
    /// Text lines drawn top to bottom
    pub lines: Vec<WatermarkLine>,

    /// Backdrop opacity (0.0 transparent, 1.0 opaque)
    pub alpha: f32,

    /// Text color
    pub text_color: [u8; 3],

    /// Backdrop fill color
    pub backdrop_color: [u8; 3],

    /// Inner padding around the text block, pixels
    pub padding: u32,

    /// Vertical gap between lines, pixels
    pub line_spacing: u32,

    /// Distance from the frame edges, pixels
    pub margin: u32,

    /// Draw a one-pixel full-opacity outline around the backdrop
    pub border: bool,
}

impl WatermarkSpec {
    /// Standard three-line branded watermark with a fresh UTC timestamp
    pub fn branded<S: Into<String>>(brand: S, identity: S) -> Self {
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        Self {
            lines: vec![
                WatermarkLine::new(brand.into(), 1.5),
                WatermarkLine::new(format!("UTC: {}", timestamp), 0.6),
                WatermarkLine::new(format!("Created by: {}", identity.into()), 0.6),
            ],
            ..Self::default_style()
        }
    }

    fn default_style() -> Self {
        Self {
            lines: Vec::new(),
            alpha: 0.5,
            text_color: [255, 255, 255],
            backdrop_color: [0, 0, 0],
            padding: 20,
            line_spacing: 5,
            margin: 20,
            border: false,
        }
    }
}

impl Default for WatermarkSpec {
    fn default() -> Self {
        Self::branded("Mansio", "lumina")
    }
}

/// Resolved pixel geometry for one frame size
#[derive(Debug, Clone, Copy)]
pub struct WatermarkLayout {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

/// Draws a [`WatermarkSpec`] onto frames
pub struct WatermarkCompositor {
    spec: WatermarkSpec,
    font: Font<'static>,
}

impl WatermarkCompositor {
    pub fn new(spec: WatermarkSpec) -> Result<Self> {
        let font = Font::try_from_bytes(FONT_BYTES)
            .ok_or_else(|| LuminaError::generic("embedded watermark font failed to parse"))?;
        Ok(Self { spec, font })
    }

    pub fn spec(&self) -> &WatermarkSpec {
        &self.spec
    }

    /// Compute the overlay block for a frame size
    ///
    /// Returns `None` when the block cannot fit inside the frame; callers
    /// then leave the frame untouched. The block never extends past the
    /// bottom-right margin by construction.
    pub fn layout(&self, width: u32, height: u32) -> Option<WatermarkLayout> {
        if self.spec.lines.is_empty() || width == 0 || height == 0 {
            return None;
        }

        let base = self.base_font_size(width, height);
        let mut max_w = 0i32;
        let mut total_h = 0i32;
        for line in &self.spec.lines {
            let scale = Scale::uniform(base * line.scale);
            let (w, h) = text_size(scale, &self.font, &line.text);
            max_w = max_w.max(w);
            total_h += h;
        }
        total_h += (self.spec.line_spacing * (self.spec.lines.len() as u32 - 1)) as i32;

        let block_w = max_w as u32 + 2 * self.spec.padding;
        let block_h = total_h as u32 + 2 * self.spec.padding;

        let x1 = width.checked_sub(self.spec.margin)?;
        let y1 = height.checked_sub(self.spec.margin)?;
        let x0 = x1.checked_sub(block_w)?;
        let y0 = y1.checked_sub(block_h)?;

        Some(WatermarkLayout { x0, y0, x1, y1 })
    }

    /// Composite the watermark onto a copy of `frame`
    ///
    /// Layout failures degrade to returning the input unchanged.
    pub fn apply(&self, frame: &Frame) -> Frame {
        let layout = match self.layout(frame.width(), frame.height()) {
            Some(layout) => layout,
            None => {
                warn!(
                    "watermark does not fit {}x{} frame, leaving it unmarked",
                    frame.width(),
                    frame.height()
                );
                return frame.clone();
            }
        };

        let mut output = frame.clone();
        self.blend_backdrop(&mut output, layout);
        if self.spec.border {
            self.draw_border(&mut output, layout);
        }
        self.draw_lines(&mut output, layout);
        output
    }

    fn base_font_size(&self, width: u32, height: u32) -> f32 {
        (width.min(height) as f32 * FONT_SIZE_RATIO).max(MIN_FONT_SIZE)
    }

    /// out = overlay * alpha + original * (1 - alpha)
    fn blend_backdrop(&self, frame: &mut Frame, layout: WatermarkLayout) {
        let alpha = self.spec.alpha.clamp(0.0, 1.0);
        let backdrop = self.spec.backdrop_color;
        for y in layout.y0..layout.y1 {
            for x in layout.x0..layout.x1 {
                let pixel = frame.get_pixel_mut(x, y);
                for c in 0..3 {
                    pixel[c] = (backdrop[c] as f32 * alpha + pixel[c] as f32 * (1.0 - alpha))
                        .round() as u8;
                }
            }
        }
    }

    fn draw_border(&self, frame: &mut Frame, layout: WatermarkLayout) {
        let color = self.spec.text_color;
        for x in layout.x0..layout.x1 {
            frame.set_pixel(x, layout.y0, color);
            frame.set_pixel(x, layout.y1 - 1, color);
        }
        for y in layout.y0..layout.y1 {
            frame.set_pixel(layout.x0, y, color);
            frame.set_pixel(layout.x1 - 1, y, color);
        }
    }

    fn draw_lines(&self, frame: &mut Frame, layout: WatermarkLayout) {
        let base = self.base_font_size(frame.width(), frame.height());
        let color = image::Rgb(self.spec.text_color);
        let x = (layout.x0 + self.spec.padding) as i32;
        let mut y = (layout.y0 + self.spec.padding) as i32;

        for line in &self.spec.lines {
            let scale = Scale::uniform(base * line.scale);
            let (_, h) = text_size(scale, &self.font, &line.text);
            draw_text_mut(frame.as_image_mut(), color, x, y, scale, &self.font, &line.text);
            y += h + self.spec.line_spacing as i32;
        }
    }
}
