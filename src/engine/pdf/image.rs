//! Image XObjects: colour space resolution, sample decoding and PNG output.
//!
//! Decoding is deferred until [`ImageSource::encode_png`] is called, so
//! pages serialized without image data never touch the pixels.

use std::fmt;

use lopdf::{Document, Object, Stream};

use super::{get_number, resolve, stream_data};
use crate::error::{Error, Result};
use crate::model::ImageSource;

/// Colour space of the samples, resolved against the document when the
/// image is drawn.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ColorSpec {
    Gray,
    Rgb,
    Cmyk,
    Indexed {
        base: Box<ColorSpec>,
        hival: u8,
        lookup: Vec<u8>,
    },
    /// Stencil mask: 1-bit samples, painted where the decoded value is 0.
    Mask { inverted: bool },
    Unsupported(String),
}

impl ColorSpec {
    /// Resolve a `/ColorSpace` entry.
    pub fn resolve(doc: &Document, obj: Option<&Object>) -> Self {
        let Some(obj) = obj.map(|o| resolve(doc, o)) else {
            return ColorSpec::Gray;
        };
        match obj {
            Object::Name(name) => Self::from_family(name),
            Object::Array(arr) => {
                let family = arr.first().and_then(|o| resolve(doc, o).as_name().ok());
                match family {
                    Some(b"ICCBased") => {
                        let n = arr
                            .get(1)
                            .and_then(|o| resolve(doc, o).as_stream().ok())
                            .and_then(|s| s.dict.get(b"N").ok())
                            .and_then(|n| n.as_i64().ok());
                        match n {
                            Some(1) => ColorSpec::Gray,
                            Some(3) => ColorSpec::Rgb,
                            Some(4) => ColorSpec::Cmyk,
                            other => ColorSpec::Unsupported(format!("ICCBased with N={:?}", other)),
                        }
                    }
                    Some(b"Indexed") | Some(b"I") => Self::indexed(doc, arr),
                    Some(name) => Self::from_family(name),
                    None => ColorSpec::Unsupported("empty colour space array".to_string()),
                }
            }
            _ => ColorSpec::Unsupported("malformed colour space".to_string()),
        }
    }

    fn from_family(name: &[u8]) -> Self {
        match name {
            b"DeviceGray" | b"G" | b"CalGray" => ColorSpec::Gray,
            b"DeviceRGB" | b"RGB" | b"CalRGB" => ColorSpec::Rgb,
            b"DeviceCMYK" | b"CMYK" => ColorSpec::Cmyk,
            other => ColorSpec::Unsupported(String::from_utf8_lossy(other).to_string()),
        }
    }

    fn indexed(doc: &Document, arr: &[Object]) -> Self {
        let base = Self::resolve(doc, arr.get(1));
        if !matches!(base, ColorSpec::Gray | ColorSpec::Rgb | ColorSpec::Cmyk) {
            return ColorSpec::Unsupported("Indexed over unsupported base".to_string());
        }
        let hival = arr
            .get(2)
            .and_then(|o| get_number(resolve(doc, o)))
            .unwrap_or(0.0)
            .clamp(0.0, 255.0) as u8;
        let lookup = match arr.get(3).map(|o| resolve(doc, o)) {
            Some(Object::String(bytes, _)) => bytes.clone(),
            Some(Object::Stream(s)) => match stream_data(s) {
                Ok(data) => data,
                Err(e) => return ColorSpec::Unsupported(e.to_string()),
            },
            _ => return ColorSpec::Unsupported("Indexed without lookup table".to_string()),
        };
        ColorSpec::Indexed {
            base: Box::new(base),
            hival,
            lookup,
        }
    }

    fn components(&self) -> usize {
        match self {
            ColorSpec::Rgb => 3,
            ColorSpec::Cmyk => 4,
            _ => 1,
        }
    }
}

/// How the sample bytes are stored in the stream.
#[derive(Clone)]
enum Samples {
    /// Filters lopdf can undo (or none), applied at encode time.
    Stream(Stream),
    Jpeg(Vec<u8>),
    Unsupported(String),
}

/// An image XObject drawn on a page.
#[derive(Clone)]
pub struct PdfImage {
    width: u32,
    height: u32,
    bits: u8,
    color: ColorSpec,
    samples: Samples,
}

impl fmt::Debug for PdfImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PdfImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bits", &self.bits)
            .field("color", &self.color)
            .finish_non_exhaustive()
    }
}

impl PdfImage {
    /// Read an image XObject's dictionary; pixels are decoded lazily.
    pub(crate) fn from_stream(doc: &Document, stream: &Stream) -> Self {
        let dict = &stream.dict;
        let int = |key: &[u8]| {
            dict.get(key)
                .ok()
                .and_then(|o| get_number(resolve(doc, o)))
                .map(|n| n.max(0.0) as u32)
        };

        let width = int(b"Width").unwrap_or(0);
        let height = int(b"Height").unwrap_or(0);
        let is_mask = dict
            .get(b"ImageMask")
            .ok()
            .and_then(|o| o.as_bool().ok())
            .unwrap_or(false);

        let (bits, color) = if is_mask {
            let inverted = dict
                .get(b"Decode")
                .ok()
                .and_then(|o| resolve(doc, o).as_array().ok())
                .and_then(|arr| arr.first())
                .and_then(get_number)
                .is_some_and(|first| first >= 1.0);
            (1, ColorSpec::Mask { inverted })
        } else {
            let bits = int(b"BitsPerComponent").unwrap_or(8).min(16) as u8;
            (bits, ColorSpec::resolve(doc, dict.get(b"ColorSpace").ok()))
        };

        let filters = filter_names(doc, stream);
        let samples = match filters.last().map(String::as_str) {
            _ if filters
                .iter()
                .any(|f| matches!(f.as_str(), "JPXDecode" | "JBIG2Decode" | "CCITTFaxDecode")) =>
            {
                Samples::Unsupported(format!("unsupported image filter {}", filters.join(",")))
            }
            Some("DCTDecode") | Some("DCT") if filters.len() == 1 => {
                Samples::Jpeg(stream.content.clone())
            }
            Some("DCTDecode") | Some("DCT") => {
                Samples::Unsupported("chained DCTDecode".to_string())
            }
            _ => Samples::Stream(stream.clone()),
        };

        Self {
            width,
            height,
            bits,
            color,
            samples,
        }
    }

    /// Raw pixels as 8-bit gray or RGB.
    fn decode(&self) -> Result<(png::ColorType, u32, u32, Vec<u8>)> {
        match &self.samples {
            Samples::Unsupported(reason) => Err(Error::ImageEncode(reason.clone())),
            Samples::Jpeg(data) => {
                let img = image::load_from_memory_with_format(data, image::ImageFormat::Jpeg)?;
                let (w, h) = (img.width(), img.height());
                match img.color() {
                    image::ColorType::L8 | image::ColorType::L16 => {
                        Ok((png::ColorType::Grayscale, w, h, img.to_luma8().into_raw()))
                    }
                    _ => Ok((png::ColorType::Rgb, w, h, img.to_rgb8().into_raw())),
                }
            }
            Samples::Stream(stream) => {
                let data = stream_data(stream)?;
                let (color, pixels) = unpack(&self.color, self.bits, self.width, self.height, &data)?;
                Ok((color, self.width, self.height, pixels))
            }
        }
    }
}

impl ImageSource for PdfImage {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn encode_png(&self) -> Result<Vec<u8>> {
        let (color, width, height, pixels) = self.decode()?;
        write_png(color, width, height, &pixels)
    }
}

fn filter_names(doc: &Document, stream: &Stream) -> Vec<String> {
    let name = |o: &Object| {
        resolve(doc, o)
            .as_name()
            .ok()
            .map(|n| String::from_utf8_lossy(n).to_string())
    };
    match stream.dict.get(b"Filter").map(|o| resolve(doc, o)) {
        Ok(Object::Array(arr)) => arr.iter().filter_map(name).collect(),
        Ok(other) => name(other).into_iter().collect(),
        Err(_) => Vec::new(),
    }
}

/// Unpack `bits`-deep samples into 8-bit gray or RGB rows.
fn unpack(
    color: &ColorSpec,
    bits: u8,
    width: u32,
    height: u32,
    data: &[u8],
) -> Result<(png::ColorType, Vec<u8>)> {
    if let ColorSpec::Unsupported(name) = color {
        return Err(Error::ImageEncode(format!("unsupported colour space {}", name)));
    }
    if !matches!(bits, 1 | 2 | 4 | 8 | 16) {
        return Err(Error::ImageEncode(format!("unsupported bit depth {}", bits)));
    }
    if width == 0 || height == 0 {
        return Err(Error::ImageEncode("image has no pixels".to_string()));
    }

    let n = color.components();
    let (w, h) = (width as usize, height as usize);
    let overflow = || Error::ImageEncode("image dimensions overflow".to_string());
    let row_bytes = w
        .checked_mul(n)
        .and_then(|v| v.checked_mul(bits as usize))
        .and_then(|v| v.checked_add(7))
        .ok_or_else(overflow)?
        / 8;
    let total = row_bytes.checked_mul(h).ok_or_else(overflow)?;
    if data.len() < total {
        return Err(Error::ImageEncode(format!(
            "image data truncated: {} of {} bytes",
            data.len(),
            total
        )));
    }

    let max = (1u32 << bits.min(8)) - 1;
    let out_type = match color {
        ColorSpec::Gray | ColorSpec::Mask { .. } => png::ColorType::Grayscale,
        ColorSpec::Indexed { base, .. } if **base == ColorSpec::Gray => png::ColorType::Grayscale,
        _ => png::ColorType::Rgb,
    };
    let out_n = if out_type == png::ColorType::Rgb { 3 } else { 1 };

    let out_len = w
        .checked_mul(h)
        .and_then(|v| v.checked_mul(out_n))
        .ok_or_else(overflow)?;
    let mut out = Vec::new();
    out.try_reserve_exact(out_len)?;
    let mut sample = vec![0u32; n];

    for row in data.chunks(row_bytes).take(h) {
        for x in 0..w {
            for (k, s) in sample.iter_mut().enumerate() {
                *s = read_sample(row, x * n + k, bits);
            }
            match color {
                ColorSpec::Gray => out.push(scale(sample[0], max)),
                ColorSpec::Rgb => out.extend(sample.iter().map(|s| scale(*s, max))),
                ColorSpec::Cmyk => {
                    let cmyk = [0, 1, 2, 3].map(|k| scale(sample[k], max));
                    out.extend_from_slice(&cmyk_to_rgb(cmyk));
                }
                ColorSpec::Mask { inverted } => {
                    let painted = (sample[0] == 0) != *inverted;
                    out.push(if painted { 0 } else { 255 });
                }
                ColorSpec::Indexed {
                    base,
                    hival,
                    lookup,
                } => {
                    let index = sample[0].min(u32::from(*hival)) as usize;
                    let bn = base.components();
                    let entry = lookup.get(index * bn..index * bn + bn).unwrap_or(&[]);
                    match (&**base, entry) {
                        (ColorSpec::Gray, [g]) => out.push(*g),
                        (ColorSpec::Rgb, [r, g, b]) => out.extend_from_slice(&[*r, *g, *b]),
                        (ColorSpec::Cmyk, [c, m, y, k]) => {
                            out.extend_from_slice(&cmyk_to_rgb([*c, *m, *y, *k]))
                        }
                        _ => out.extend(std::iter::repeat(0).take(out_n)),
                    }
                }
                ColorSpec::Unsupported(_) => {}
            }
        }
    }

    Ok((out_type, out))
}

/// Read sample `index` of a row; 16-bit samples keep their high byte.
fn read_sample(row: &[u8], index: usize, bits: u8) -> u32 {
    match bits {
        8 => u32::from(row[index]),
        16 => u32::from(row[index * 2]),
        _ => {
            let bit = index * bits as usize;
            let byte = row[bit / 8];
            let shift = 8 - bits as usize - (bit % 8);
            (u32::from(byte) >> shift) & ((1 << bits) - 1)
        }
    }
}

fn scale(value: u32, max: u32) -> u8 {
    if max == 255 {
        value as u8
    } else {
        (value * 255 / max) as u8
    }
}

fn cmyk_to_rgb([c, m, y, k]: [u8; 4]) -> [u8; 3] {
    let inv = |v: u8| (255 - u32::from(v)) * (255 - u32::from(k)) / 255;
    [inv(c) as u8, inv(m) as u8, inv(y) as u8]
}

/// Write 8-bit pixels as a PNG file.
pub(crate) fn write_png(
    color: png::ColorType,
    width: u32,
    height: u32,
    pixels: &[u8],
) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(color);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(pixels)?;
        writer.finish()?;
    }
    Ok(out)
}
