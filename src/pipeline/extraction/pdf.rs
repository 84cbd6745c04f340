use super::types::PdfExtractor;
use super::ExtractionError;

/// PDF text extractor using the pdf-extract crate.
/// Reads embedded text layers only; scanned pages come back empty.
pub struct PdfTextExtractor;

impl PdfExtractor for PdfTextExtractor {
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
        pdf_extract::extract_text_from_mem_by_pages(pdf_bytes)
            .map_err(|e| ExtractionError::PdfParsing(e.to_string()))
    }
}

/// Mock PDF extractor returning fixed pages.
pub struct MockPdfExtractor {
    pages: Result<Vec<String>, String>,
}

impl MockPdfExtractor {
    pub fn new(pages: &[&str]) -> Self {
        Self {
            pages: Ok(pages.iter().map(|p| p.to_string()).collect()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            pages: Err(message.to_string()),
        }
    }
}

impl PdfExtractor for MockPdfExtractor {
    fn extract_pages(&self, _pdf_bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
        self.pages
            .clone()
            .map_err(ExtractionError::PdfParsing)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Generate a PDF with one text page per entry using lopdf
    /// (the library pdf-extract uses internally).
    pub(crate) fn make_test_pdf(pages: &[&str]) -> Vec<u8> {
        use lopdf::dictionary;
        use lopdf::{Document, Object, Stream};

        let mut doc = Document::with_version("1.4");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in pages {
            let content = format!("BT /F1 12 Tf 100 700 Td ({text}) Tj ET");
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                },
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn extract_text_from_digital_pdf() {
        let pdf_bytes = make_test_pdf(&["Hello World from Docent"]);
        let pages = PdfTextExtractor.extract_pages(&pdf_bytes).unwrap();

        assert_eq!(pages.len(), 1);
        assert!(
            pages[0].contains("Hello") || pages[0].contains("World"),
            "Expected text to contain 'Hello' or 'World', got: {}",
            pages[0]
        );
    }

    #[test]
    fn pages_come_back_in_order() {
        let pdf_bytes = make_test_pdf(&["Alpha", "Bravo", "Charlie"]);
        let pages = PdfTextExtractor.extract_pages(&pdf_bytes).unwrap();
        assert_eq!(pages.len(), 3);
        assert!(pages[0].contains("Alpha"));
        assert!(pages[2].contains("Charlie"));
    }

    #[test]
    fn invalid_pdf_returns_error() {
        let result = PdfTextExtractor.extract_pages(b"not a pdf");
        assert!(matches!(result, Err(ExtractionError::PdfParsing(_))));
    }

    #[test]
    fn mock_returns_configured_pages() {
        let pages = MockPdfExtractor::new(&["a", "b"]).extract_pages(b"").unwrap();
        assert_eq!(pages, vec!["a".to_string(), "b".to_string()]);
        assert!(MockPdfExtractor::failing("bad xref").extract_pages(b"").is_err());
    }
}
