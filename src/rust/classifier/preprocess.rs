use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use ndarray::Array4;

use super::error::ClassifierError;

/// Default model input edge, in pixels.
pub const DEFAULT_INPUT_SIZE: u32 = 150;

/// Memory layout of the model's image input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TensorLayout {
    /// `[batch, height, width, channels]`, as exported from Keras
    #[default]
    Nhwc,
    /// `[batch, channels, height, width]`
    Nchw,
}

/// How an image file is turned into a model input tensor.
///
/// The defaults reproduce what the fire model saw at training time: RGB
/// pixels resized to 150x150 with nearest-neighbour sampling, left in the
/// raw `0..=255` range and laid out channels-last.
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessConfig {
    pub width: u32,
    pub height: u32,
    /// Multiplier applied to every channel value (use `1.0 / 255.0` for models trained on `[0, 1]` input)
    pub scale: f32,
    pub layout: TensorLayout,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_INPUT_SIZE,
            height: DEFAULT_INPUT_SIZE,
            scale: 1.0,
            layout: TensorLayout::Nhwc,
        }
    }
}

impl PreprocessConfig {
    pub fn validate(&self) -> Result<(), ClassifierError> {
        if self.width == 0 || self.height == 0 {
            return Err(ClassifierError::ValidationError(format!(
                "Input size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if !self.scale.is_finite() {
            return Err(ClassifierError::ValidationError(format!(
                "Pixel scale must be finite, got {}",
                self.scale
            )));
        }
        Ok(())
    }

    /// Shape of the tensor produced for one image.
    pub fn input_shape(&self) -> [usize; 4] {
        let (w, h) = (self.width as usize, self.height as usize);
        match self.layout {
            TensorLayout::Nhwc => [1, h, w, 3],
            TensorLayout::Nchw => [1, 3, h, w],
        }
    }
}

/// Reads and decodes `path`, sniffing the format from the file contents
/// rather than trusting the extension.
pub fn load_image(path: &Path) -> Result<DynamicImage, ClassifierError> {
    let reader = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| {
            ClassifierError::ImageDecodeError(format!("Failed to open {}: {}", path.display(), e))
        })?;

    reader.decode().map_err(|e| {
        ClassifierError::ImageDecodeError(format!("Failed to decode {}: {}", path.display(), e))
    })
}

/// Converts a decoded image into a single-image batch tensor.
pub fn image_to_tensor(image: &DynamicImage, config: &PreprocessConfig) -> Array4<f32> {
    let rgb = image
        .resize_exact(config.width, config.height, FilterType::Nearest)
        .to_rgb8();

    let mut tensor = Array4::<f32>::zeros(config.input_shape());
    for (x, y, pixel) in rgb.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        for channel in 0..3 {
            let value = pixel[channel] as f32 * config.scale;
            match config.layout {
                TensorLayout::Nhwc => tensor[[0, y, x, channel]] = value,
                TensorLayout::Nchw => tensor[[0, channel, y, x]] = value,
            }
        }
    }
    tensor
}

/// Loads `path` and converts it into a model input tensor.
pub fn preprocess_file(path: &Path, config: &PreprocessConfig) -> Result<Array4<f32>, ClassifierError> {
    let image = load_image(path)?;
    Ok(image_to_tensor(&image, config))
}
