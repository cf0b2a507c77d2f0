use image::error::{ImageFormatHint, UnsupportedError, UnsupportedErrorKind};
use image::imageops::FilterType;
use image::{DynamicImage, ImageError, ImageFormat};
use ndarray::Array4;

use crate::error::ServiceError;

pub const ALLOWED_CONTENT_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/gif"];

const DECODABLE_FORMATS: [ImageFormat; 3] =
    [ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::Gif];

/// Batch of one image, laid out `[1, height, width, 3]` with values in [0, 1].
#[derive(Debug, Clone)]
pub struct InputTensor(Array4<f32>);

impl InputTensor {
    /// All-black input, used to probe the model at startup.
    pub fn zeros(size: u32) -> Self {
        let side = size as usize;
        InputTensor(Array4::zeros((1, side, side, 3)))
    }

    pub fn shape(&self) -> &[usize] {
        self.0.shape()
    }

    pub fn as_array(&self) -> &Array4<f32> {
        &self.0
    }

}

/// Checks a declared content type against the allow-list. Parameters such as
/// `; charset=` are ignored.
pub fn is_allowed_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    ALLOWED_CONTENT_TYPES.contains(&essence.as_str())
}

/// Decodes `bytes` and stretches the result to `size`x`size`, ignoring aspect ratio.
pub fn decode_and_preprocess(
    bytes: &[u8],
    content_type: &str,
    size: u32,
) -> Result<InputTensor, ServiceError> {
    if !is_allowed_content_type(content_type) {
        return Err(ServiceError::UnsupportedMediaType(content_type.to_string()));
    }

    // the format is sniffed from the bytes, the declared type only gates the request
    let format = image::guess_format(bytes)?;
    if !DECODABLE_FORMATS.contains(&format) {
        return Err(ServiceError::Decode(ImageError::Unsupported(
            UnsupportedError::from_format_and_kind(
                ImageFormatHint::Exact(format),
                UnsupportedErrorKind::Format(ImageFormatHint::Exact(format)),
            ),
        )));
    }
    let img = image::load_from_memory_with_format(bytes, format)?;
    Ok(preprocess(&img, size))
}

pub fn preprocess(img: &DynamicImage, size: u32) -> InputTensor {
    let rgb = img.resize_exact(size, size, FilterType::Triangle).to_rgb8();

    let side = size as usize;
    let tensor = Array4::from_shape_fn((1, side, side, 3), |(_, y, x, c)| {
        rgb.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
    });

    InputTensor(tensor)
}
