//! PDF text extraction with a per-page OCR fallback.
//!
//! Each page's native text layer is tried first. Pages whose layer is empty
//! after trimming are rasterized through PDFium and passed to the OCR engine,
//! so a document mixing digital and scanned pages is read in full.

use image::ImageOutputFormat;
use log::{debug, warn};
use pdfium_render::prelude::*;
use std::io::Cursor;
use std::sync::Arc;

use super::ocr::OcrEngine;
use super::ExtractionError;

const POINTS_PER_INCH: f32 = 72.0;

/// Rendered pages larger than this on either side are scaled down.
const MAX_DIMENSION_PX: u32 = 6000;

pub trait PdfTextLayer: Send + Sync {
    /// Native text of every page, in page order.
    fn page_texts(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractionError>;
}

pub trait PageRenderer: Send + Sync {
    fn page_count(&self, bytes: &[u8]) -> Result<usize, ExtractionError>;

    /// Renders the zero-based `index` page to PNG at `dpi`.
    fn render_page(&self, bytes: &[u8], index: usize, dpi: u32) -> Result<Vec<u8>, ExtractionError>;
}

pub struct PdfExtractTextLayer;

impl PdfTextLayer for PdfExtractTextLayer {
    fn page_texts(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
            .map_err(|e| ExtractionError::PdfParsing(e.to_string()))
    }
}

/// Loads PDFium from `PDFIUM_DYNAMIC_LIB_PATH`, then the executable's
/// directory, then the system library path.
fn load_pdfium() -> Result<Pdfium, ExtractionError> {
    if let Ok(path) = std::env::var("PDFIUM_DYNAMIC_LIB_PATH") {
        let bindings = Pdfium::bind_to_library(&path).map_err(|e| ExtractionError::PdfRendering {
            page: 0,
            reason: format!("failed to load PDFium from {path}: {e}"),
        })?;
        return Ok(Pdfium::new(bindings));
    }

    if let Some(dir) = std::env::current_exe().ok().and_then(|exe| exe.parent().map(|p| p.to_path_buf())) {
        let lib_path = Pdfium::pdfium_platform_library_name_at_path(dir.to_string_lossy().as_ref());
        if let Ok(bindings) = Pdfium::bind_to_library(&lib_path) {
            return Ok(Pdfium::new(bindings));
        }
    }

    let bindings = Pdfium::bind_to_system_library().map_err(|e| ExtractionError::PdfRendering {
        page: 0,
        reason: format!("PDFium library not found, set PDFIUM_DYNAMIC_LIB_PATH: {e}"),
    })?;
    Ok(Pdfium::new(bindings))
}

fn render_dimensions(width_points: f32, height_points: f32, dpi: u32) -> (u32, u32) {
    let scale = dpi as f32 / POINTS_PER_INCH;
    let w = (width_points * scale).max(1.0);
    let h = (height_points * scale).max(1.0);

    let largest = w.max(h);
    if largest > MAX_DIMENSION_PX as f32 {
        let ratio = MAX_DIMENSION_PX as f32 / largest;
        (((w * ratio) as u32).max(1), ((h * ratio) as u32).max(1))
    } else {
        (w as u32, h as u32)
    }
}

/// PDFium-backed rasterizer. The library handle is loaded per call.
pub struct PdfiumRenderer;

impl PageRenderer for PdfiumRenderer {
    fn page_count(&self, bytes: &[u8]) -> Result<usize, ExtractionError> {
        let pdfium = load_pdfium()?;
        let document = pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(|e| ExtractionError::PdfParsing(e.to_string()))?;
        Ok(document.pages().len() as usize)
    }

    fn render_page(&self, bytes: &[u8], index: usize, dpi: u32) -> Result<Vec<u8>, ExtractionError> {
        let page_number = index + 1;
        let pdfium = load_pdfium()?;
        let document = pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(|e| ExtractionError::PdfParsing(e.to_string()))?;

        let page_index = u16::try_from(index).map_err(|_| ExtractionError::PdfRendering {
            page: page_number,
            reason: "page index out of range".to_string(),
        })?;
        let page = document
            .pages()
            .get(page_index)
            .map_err(|e| ExtractionError::PdfRendering {
                page: page_number,
                reason: e.to_string(),
            })?;

        let (width, height) = render_dimensions(page.width().value, page.height().value, dpi);
        let config = PdfRenderConfig::new()
            .set_target_width(width as i32)
            .set_maximum_height(height as i32);

        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| ExtractionError::PdfRendering {
                page: page_number,
                reason: e.to_string(),
            })?;

        let mut cursor = Cursor::new(Vec::new());
        bitmap
            .as_image()
            .write_to(&mut cursor, ImageOutputFormat::Png)
            .map_err(|e| ExtractionError::Image(format!("PNG encoding failed: {e}")))?;

        debug!("Rendered page {} at {}x{}", page_number, width, height);
        Ok(cursor.into_inner())
    }
}

pub struct PdfExtractor {
    text_layer: Box<dyn PdfTextLayer>,
    renderer: Box<dyn PageRenderer>,
    ocr: Arc<dyn OcrEngine>,
    dpi: u32,
}

impl PdfExtractor {
    pub fn new(
        text_layer: Box<dyn PdfTextLayer>,
        renderer: Box<dyn PageRenderer>,
        ocr: Arc<dyn OcrEngine>,
        dpi: u32,
    ) -> Self {
        Self {
            text_layer,
            renderer,
            ocr,
            dpi,
        }
    }

    /// Concatenates every page in order, each under a `--- Page N ---` marker.
    pub fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let pages = match self.text_layer.page_texts(bytes) {
            Ok(pages) => pages,
            Err(e) => {
                // Unparseable text layer: treat every page as scanned.
                warn!("Text layer unreadable ({}), falling back to OCR for all pages", e);
                vec![String::new(); self.renderer.page_count(bytes)?]
            }
        };

        let mut text = String::new();
        for (index, native) in pages.into_iter().enumerate() {
            let content = if native.trim().is_empty() {
                debug!("Page {} has no text layer, running OCR", index + 1);
                let png = self.renderer.render_page(bytes, index, self.dpi)?;
                self.ocr.recognize(&png)?
            } else {
                native
            };
            text.push_str(&format!("\n--- Page {} ---\n{}", index + 1, content));
        }
        Ok(text)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use parking_lot::Mutex;

    pub(crate) struct FixedPages(pub Vec<String>);

    impl PdfTextLayer for FixedPages {
        fn page_texts(&self, _bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
            Ok(self.0.clone())
        }
    }

    struct BrokenLayer;

    impl PdfTextLayer for BrokenLayer {
        fn page_texts(&self, _bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
            Err(ExtractionError::PdfParsing("xref table missing".to_string()))
        }
    }

    /// Records requested pages and encodes the page index into the fake PNG.
    #[derive(Default)]
    pub(crate) struct FixedRenderer {
        pub pages: usize,
        pub rendered: Arc<Mutex<Vec<(usize, u32)>>>,
    }

    impl PageRenderer for FixedRenderer {
        fn page_count(&self, _bytes: &[u8]) -> Result<usize, ExtractionError> {
            Ok(self.pages)
        }

        fn render_page(&self, _bytes: &[u8], index: usize, dpi: u32) -> Result<Vec<u8>, ExtractionError> {
            self.rendered.lock().push((index, dpi));
            Ok(vec![index as u8])
        }
    }

    /// Pretends page index 1 is a scan of the word "World".
    struct ScannedWorld;

    impl OcrEngine for ScannedWorld {
        fn recognize(&self, png: &[u8]) -> Result<String, ExtractionError> {
            match png {
                [1] => Ok("World\n".to_string()),
                _ => Ok(String::new()),
            }
        }
    }

    #[test]
    fn mixed_pdf_uses_ocr_only_for_the_scanned_page() {
        let rendered = Arc::new(Mutex::new(Vec::new()));
        let renderer = FixedRenderer {
            pages: 2,
            rendered: rendered.clone(),
        };
        let extractor = PdfExtractor::new(
            Box::new(FixedPages(vec!["Hello".to_string(), "  \n".to_string()])),
            Box::new(renderer),
            Arc::new(ScannedWorld),
            300,
        );

        let text = extractor.extract(b"%PDF").unwrap();

        assert_eq!(text, "\n--- Page 1 ---\nHello\n--- Page 2 ---\nWorld\n");
        assert_eq!(*rendered.lock(), vec![(1, 300)]);
    }

    #[test]
    fn unreadable_text_layer_falls_back_to_ocr_for_every_page() {
        let rendered = Arc::new(Mutex::new(Vec::new()));
        let renderer = FixedRenderer {
            pages: 2,
            rendered: rendered.clone(),
        };
        let extractor =
            PdfExtractor::new(Box::new(BrokenLayer), Box::new(renderer), Arc::new(ScannedWorld), 300);

        let text = extractor.extract(b"%PDF").unwrap();

        assert!(text.contains("--- Page 1 ---"));
        assert!(text.ends_with("--- Page 2 ---\nWorld\n"));
        assert_eq!(rendered.lock().len(), 2);
    }

    #[test]
    fn render_dimensions_follow_dpi_and_cap_large_pages() {
        // US Letter at 300 DPI.
        assert_eq!(render_dimensions(612.0, 792.0, 300), (2550, 3300));

        let (w, h) = render_dimensions(5000.0, 2500.0, 300);
        assert_eq!(w, MAX_DIMENSION_PX);
        assert_eq!(h, MAX_DIMENSION_PX / 2);
    }
}
