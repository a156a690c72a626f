use image::ImageOutputFormat;
use log::debug;
use std::io::Cursor;

use super::ExtractionError;

pub trait OcrEngine: Send + Sync {
    /// Recognizes text in a PNG-encoded image.
    fn recognize(&self, png: &[u8]) -> Result<String, ExtractionError>;
}

/// Tesseract bound per call; the handle is not `Send`.
pub struct TesseractOcr {
    tessdata_dir: Option<String>,
    language: String,
    dpi: u32,
}

impl TesseractOcr {
    pub fn new(tessdata_dir: Option<String>, language: String, dpi: u32) -> Self {
        Self {
            tessdata_dir,
            language,
            dpi,
        }
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, png: &[u8]) -> Result<String, ExtractionError> {
        let tess = tesseract::Tesseract::new(self.tessdata_dir.as_deref(), Some(self.language.as_str()))
            .map_err(|e| ExtractionError::OcrInit(format!("{e:?}")))?;

        let mut tess = tess
            .set_variable("user_defined_dpi", &self.dpi.to_string())
            .map_err(|e| ExtractionError::OcrInit(format!("{e:?}")))?
            .set_image_from_mem(png)
            .map_err(|e| ExtractionError::Ocr(format!("{e:?}")))?;

        let text = tess
            .get_text()
            .map_err(|e| ExtractionError::Ocr(format!("{e:?}")))?;

        debug!("OCR produced {} chars", text.chars().count());
        Ok(text)
    }
}

/// Decodes any supported raster format and re-encodes it as PNG for the OCR engine.
pub fn normalize_to_png(bytes: &[u8]) -> Result<Vec<u8>, ExtractionError> {
    let img = image::load_from_memory(bytes).map_err(|e| ExtractionError::Image(e.to_string()))?;

    let mut cursor = Cursor::new(Vec::new());
    img.write_to(&mut cursor, ImageOutputFormat::Png)
        .map_err(|e| ExtractionError::Image(format!("PNG encoding failed: {e}")))?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    #[test]
    fn jpeg_input_is_reencoded_as_png() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(4, 4));
        let mut jpeg = Cursor::new(Vec::new());
        img.write_to(&mut jpeg, ImageOutputFormat::Jpeg(90)).unwrap();

        let png = normalize_to_png(jpeg.get_ref()).unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }
}
