//! Image encoding seam and the built-in PNG codec.

use std::io::{Read, Write};

use crate::error::{Result, ToolsError};

use super::frame::{ColorLayout, Frame};

/// Keyword/text pair stored in an image's metadata fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEntry {
    pub keyword: String,
    pub text: String,
}

impl TextEntry {
    pub fn new(keyword: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            text: text.into(),
        }
    }
}

/// Something that can turn a [`Frame`] into file bytes.
///
/// Hosts with their own encoders plug in here; [`PngEncoder`] is the default.
pub trait ImageEncoder {
    /// File extension without the dot.
    fn extension(&self) -> &'static str;

    fn encode(&self, frame: &Frame, text: &[TextEntry], out: &mut dyn Write) -> Result<()>;
}

/// PNG writer storing metadata as `tEXt` (Latin-1) or `iTXt` (UTF-8) chunks.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngEncoder;

impl ImageEncoder for PngEncoder {
    fn extension(&self) -> &'static str {
        "png"
    }

    fn encode(&self, frame: &Frame, text: &[TextEntry], out: &mut dyn Write) -> Result<()> {
        let mut encoder = png::Encoder::new(out, frame.width(), frame.height());
        encoder.set_color(match frame.layout() {
            ColorLayout::Rgb => png::ColorType::Rgb,
            ColorLayout::Rgba => png::ColorType::Rgba,
        });
        encoder.set_depth(png::BitDepth::Eight);

        for entry in text {
            if is_latin1(&entry.text) {
                encoder.add_text_chunk(entry.keyword.clone(), entry.text.clone())?;
            } else {
                encoder.add_itxt_chunk(entry.keyword.clone(), entry.text.clone())?;
            }
        }

        let mut writer = encoder.write_header()?;
        writer.write_image_data(frame.pixels())?;
        writer.finish()?;
        Ok(())
    }
}

fn is_latin1(text: &str) -> bool {
    text.chars().all(|c| (c as u32) <= 0xFF)
}

/// A decoded PNG with its textual metadata.
#[derive(Debug)]
pub struct DecodedPng {
    pub frame: Frame,
    pub text: Vec<TextEntry>,
}

impl DecodedPng {
    /// First text entry with the given keyword.
    pub fn text_for(&self, keyword: &str) -> Option<&str> {
        self.text
            .iter()
            .find(|e| e.keyword == keyword)
            .map(|e| e.text.as_str())
    }
}

/// Decode any 8/16-bit PNG into an 8-bit RGB(A) frame.
pub fn decode_png<R: Read>(input: R) -> Result<DecodedPng> {
    let mut decoder = png::Decoder::new(input);
    decoder.set_transformations(png::Transformations::normalize_to_color8());
    let mut reader = decoder.read_info()?;

    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf)?;
    buf.truncate(info.buffer_size());

    let frame = match info.color_type {
        png::ColorType::Rgb => Frame::new(info.width, info.height, ColorLayout::Rgb, buf)?,
        png::ColorType::Rgba => Frame::new(info.width, info.height, ColorLayout::Rgba, buf)?,
        png::ColorType::Grayscale => Frame::from_gray(info.width, info.height, &buf, None)?,
        png::ColorType::GrayscaleAlpha => {
            let gray: Vec<u8> = buf.iter().step_by(2).copied().collect();
            let alpha: Vec<u8> = buf.iter().skip(1).step_by(2).copied().collect();
            Frame::from_gray(info.width, info.height, &gray, Some(&alpha))?
        }
        other => {
            return Err(ToolsError::Encoding(format!(
                "unsupported PNG color type {:?}",
                other
            )))
        }
    };

    let png_info = reader.info();
    let mut text: Vec<TextEntry> = png_info
        .uncompressed_latin1_text
        .iter()
        .map(|chunk| TextEntry::new(chunk.keyword.clone(), chunk.text.clone()))
        .collect();
    for chunk in &png_info.utf8_text {
        text.push(TextEntry::new(chunk.keyword.clone(), chunk.get_text()?));
    }

    Ok(DecodedPng { frame, text })
}
