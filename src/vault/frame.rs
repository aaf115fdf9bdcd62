//! In-memory 8-bit rasters handed to the vault.

use crate::error::{Result, ToolsError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorLayout {
    Rgb,
    Rgba,
}

impl ColorLayout {
    pub fn channels(&self) -> usize {
        match self {
            ColorLayout::Rgb => 3,
            ColorLayout::Rgba => 4,
        }
    }

    fn from_channels(channels: usize) -> Option<Self> {
        match channels {
            3 => Some(ColorLayout::Rgb),
            4 => Some(ColorLayout::Rgba),
            _ => None,
        }
    }
}

/// One image, row-major, interleaved channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    layout: ColorLayout,
    pixels: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, layout: ColorLayout, pixels: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ToolsError::Encoding(format!(
                "image has empty dimensions {}x{}",
                width, height
            )));
        }
        let expected = width as usize * height as usize * layout.channels();
        if pixels.len() != expected {
            return Err(ToolsError::Encoding(format!(
                "expected {} bytes for {}x{} {:?}, got {}",
                expected,
                width,
                height,
                layout,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            layout,
            pixels,
        })
    }

    /// Build a frame from single-channel data by replicating it into RGB.
    pub fn from_gray(width: u32, height: u32, gray: &[u8], alpha: Option<&[u8]>) -> Result<Self> {
        let layout = if alpha.is_some() {
            ColorLayout::Rgba
        } else {
            ColorLayout::Rgb
        };
        let mut pixels = Vec::with_capacity(gray.len() * layout.channels());
        for (i, &g) in gray.iter().enumerate() {
            pixels.extend_from_slice(&[g, g, g]);
            if let Some(alpha) = alpha {
                pixels.push(alpha.get(i).copied().unwrap_or(u8::MAX));
            }
        }
        Self::new(width, height, layout, pixels)
    }

    /// Convert a host float tensor with values in `[0, 1]` into frames.
    ///
    /// Accepted shapes are `[B, H, W, C]`, `[H, W, C]`, `[C, H, W]` and
    /// `[H, W]`, with `C` being 3 or 4 (or 1 for grayscale). Values are
    /// clamped before scaling to 8 bit.
    pub fn from_unit_floats(shape: &[usize], data: &[f32]) -> Result<Vec<Frame>> {
        let expected = shape
            .iter()
            .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
            .ok_or_else(|| {
                ToolsError::Encoding(format!("tensor shape {:?} is too large", shape))
            })?;
        if data.len() != expected {
            return Err(ToolsError::Encoding(format!(
                "tensor shape {:?} needs {} values, got {}",
                shape,
                expected,
                data.len()
            )));
        }

        match *shape {
            [batch, height, width, channels] => {
                let stride = height * width * channels;
                (0..batch)
                    .map(|b| {
                        let slice = &data[b * stride..(b + 1) * stride];
                        Self::from_hwc(height, width, channels, slice)
                    })
                    .collect()
            }
            [first, second, last] => {
                let channels_last = matches!(last, 1 | 3 | 4);
                if !channels_last && matches!(first, 1 | 3 | 4) {
                    let hwc = chw_to_hwc(first, second, last, data);
                    Ok(vec![Self::from_hwc(second, last, first, &hwc)?])
                } else {
                    Ok(vec![Self::from_hwc(first, second, last, data)?])
                }
            }
            [height, width] => Ok(vec![Self::from_hwc(height, width, 1, data)?]),
            _ => Err(ToolsError::Encoding(format!(
                "unsupported tensor shape {:?}",
                shape
            ))),
        }
    }

    fn from_hwc(height: usize, width: usize, channels: usize, data: &[f32]) -> Result<Self> {
        let (w, h) = (dimension(width)?, dimension(height)?);
        let bytes: Vec<u8> = data.iter().map(|v| unit_to_byte(*v)).collect();
        if channels == 1 {
            return Self::from_gray(w, h, &bytes, None);
        }
        let layout = ColorLayout::from_channels(channels).ok_or_else(|| {
            ToolsError::Encoding(format!("unsupported channel count {}", channels))
        })?;
        Self::new(w, h, layout, bytes)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn layout(&self) -> ColorLayout {
        self.layout
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Downscale so both sides fit in `max_side`, keeping the aspect ratio.
    /// Frames that already fit are returned unchanged.
    pub fn thumbnail(&self, max_side: u32) -> Frame {
        let max_side = max_side.max(1);
        if self.width <= max_side && self.height <= max_side {
            return self.clone();
        }

        let scale = f64::min(
            max_side as f64 / self.width as f64,
            max_side as f64 / self.height as f64,
        );
        let new_w = ((self.width as f64 * scale).round() as u32).clamp(1, max_side);
        let new_h = ((self.height as f64 * scale).round() as u32).clamp(1, max_side);
        self.resize_area(new_w, new_h)
    }

    /// Area-average resampling for downscaling.
    fn resize_area(&self, new_w: u32, new_h: u32) -> Frame {
        let channels = self.layout.channels();
        let (src_w, src_h) = (self.width as usize, self.height as usize);
        let (dst_w, dst_h) = (new_w as usize, new_h as usize);
        let mut out = Vec::with_capacity(dst_w * dst_h * channels);

        for dy in 0..dst_h {
            let y0 = dy * src_h / dst_h;
            let y1 = ((dy + 1) * src_h / dst_h).max(y0 + 1);
            for dx in 0..dst_w {
                let x0 = dx * src_w / dst_w;
                let x1 = ((dx + 1) * src_w / dst_w).max(x0 + 1);
                let mut sums = [0u64; 4];
                for y in y0..y1 {
                    let row = y * src_w * channels;
                    for x in x0..x1 {
                        let px = row + x * channels;
                        for (c, sum) in sums.iter_mut().enumerate().take(channels) {
                            *sum += u64::from(self.pixels[px + c]);
                        }
                    }
                }
                let count = ((y1 - y0) * (x1 - x0)) as u64;
                for sum in sums.iter().take(channels) {
                    out.push(((sum + count / 2) / count) as u8);
                }
            }
        }

        Frame {
            width: new_w,
            height: new_h,
            layout: self.layout,
            pixels: out,
        }
    }
}

fn dimension(value: usize) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| ToolsError::Encoding(format!("dimension {} too large", value)))
}

fn unit_to_byte(value: f32) -> u8 {
    // NaN saturates to 0
    (value.clamp(0.0, 1.0) * 255.0) as u8
}

fn chw_to_hwc(channels: usize, height: usize, width: usize, data: &[f32]) -> Vec<f32> {
    let mut out = Vec::with_capacity(data.len());
    for y in 0..height {
        for x in 0..width {
            for c in 0..channels {
                out.push(data[c * height * width + y * width + x]);
            }
        }
    }
    out
}
