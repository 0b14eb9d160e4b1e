use crate::error::ExtractError;
use lopdf::Document;
use std::path::Path;
use tracing::warn;

pub const MIN_PAGE_TEXT_CHARS: usize = 10;

#[derive(Debug, Clone)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct PageExtraction {
    pub pages: Vec<PageText>,
    pub failed_pages: Vec<u32>,
}

pub trait PageSource: Send + Sync {
    fn extract_pages(&self, path: &Path) -> Result<PageExtraction, ExtractError>;
}

pub struct PdfPageSource {
    min_page_chars: usize,
}

impl Default for PdfPageSource {
    fn default() -> Self {
        Self {
            min_page_chars: MIN_PAGE_TEXT_CHARS,
        }
    }
}

impl PdfPageSource {
    pub fn with_min_page_chars(min_page_chars: usize) -> Self {
        Self { min_page_chars }
    }
}

impl PageSource for PdfPageSource {
    fn extract_pages(&self, path: &Path) -> Result<PageExtraction, ExtractError> {
        let bytes = std::fs::read(path)?;
        let document = Document::load_mem(&bytes)
            .map_err(|error| ExtractError::PdfParse(error.to_string()))?;

        let mut extraction = PageExtraction::default();

        for (page_number, _page_id) in document.get_pages() {
            match document.extract_text(&[page_number]) {
                Ok(text) if text.trim().chars().count() >= self.min_page_chars => {
                    extraction.pages.push(PageText {
                        number: page_number,
                        text,
                    });
                }
                Ok(_) => {
                    extraction.failed_pages.push(page_number);
                }
                Err(error) => {
                    warn!(page = page_number, error = %error, "page text extraction failed");
                    extraction.failed_pages.push(page_number);
                }
            }
        }

        Ok(extraction)
    }
}
