use std::io::Write;
use std::path::Path;

use image::DynamicImage;

use super::confidence::{
    aggregate_confidence, analyze_ocr_quality, pdf_confidence, recognized_word_count,
};
use super::enhance::{decode_image, encode_png, enhance};
use super::ocr::TesseractCli;
use super::pdf::PdfTextExtractor;
use super::types::{
    BatchImage, ExtractionResult, ExtractionStats, ExtractionWarning, NamedExtraction, OcrEngine,
    PdfExtractor, VideoProbe,
};
use super::video::FfprobeCli;
use super::ExtractionError;
use crate::config::ToolPaths;
use crate::models::EnhancementProfile;
use crate::pipeline::import::{MediaInput, MediaKind};
use crate::pipeline::progress::{report, ProgressFn};

pub const NO_TEXT_DETECTED: &str = "No text detected";
pub const NO_PDF_TEXT: &str = "No text extracted from PDF";

const DEFAULT_VIDEO_SUFFIX: &str = ".mp4";

/// Extracts text or metadata from images, PDFs and videos.
/// Backends are trait objects, so tests inject mocks.
pub struct ContentExtractor {
    ocr_engine: Box<dyn OcrEngine + Send + Sync>,
    pdf_extractor: Box<dyn PdfExtractor + Send + Sync>,
    video_probe: Box<dyn VideoProbe + Send + Sync>,
}

impl ContentExtractor {
    pub fn new(
        ocr_engine: Box<dyn OcrEngine + Send + Sync>,
        pdf_extractor: Box<dyn PdfExtractor + Send + Sync>,
        video_probe: Box<dyn VideoProbe + Send + Sync>,
    ) -> Self {
        Self {
            ocr_engine,
            pdf_extractor,
            video_probe,
        }
    }

    /// Production backends: tesseract and ffprobe binaries, pdf-extract.
    pub fn from_tools(tools: &ToolPaths) -> Self {
        Self::new(
            Box::new(TesseractCli::new(&tools.tesseract, &tools.ocr_language)),
            Box::new(PdfTextExtractor),
            Box::new(FfprobeCli::new(&tools.ffprobe)),
        )
    }

    /// Dispatch on the media kind decided at the boundary.
    pub fn extract(
        &self,
        input: &MediaInput,
        profile: EnhancementProfile,
        progress_fn: ProgressFn<'_>,
    ) -> ExtractionResult {
        let span = tracing::info_span!(
            "extract",
            file = %input.file_name,
            kind = input.kind().as_str()
        );
        let _enter = span.enter();

        match input.kind() {
            MediaKind::Image => self.extract_image_bytes(&input.bytes, profile),
            MediaKind::Pdf => self.extract_pdf(&input.bytes, progress_fn),
            MediaKind::Video => self.extract_video(&input.bytes, &input.file_name),
            MediaKind::Unsupported => ExtractionResult::failed(&ExtractionError::UnsupportedMedia(
                input.declared_type.clone(),
            )),
        }
    }

    /// Enhance then OCR a decoded image.
    pub fn extract_image(
        &self,
        image: &DynamicImage,
        profile: EnhancementProfile,
    ) -> ExtractionResult {
        match self.ocr_enhanced(image, profile) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, profile = profile.as_str(), "Image extraction failed");
                ExtractionResult::failed(&e)
            }
        }
    }

    /// Decode (with EXIF orientation) then extract.
    pub fn extract_image_bytes(
        &self,
        image_bytes: &[u8],
        profile: EnhancementProfile,
    ) -> ExtractionResult {
        match decode_image(image_bytes) {
            Ok(image) => self.extract_image(&image, profile),
            Err(e) => {
                tracing::warn!(error = %e, "Image decode failed");
                ExtractionResult::failed(&e)
            }
        }
    }

    fn ocr_enhanced(
        &self,
        image: &DynamicImage,
        profile: EnhancementProfile,
    ) -> Result<ExtractionResult, ExtractionError> {
        let enhanced = enhance(image, profile);
        let png = encode_png(&enhanced)?;
        let page = self.ocr_engine.ocr_image(&png)?;

        let stats = ExtractionStats::Image {
            word_count: page.tokens.len(),
            recognized_words: recognized_word_count(&page.tokens),
            enhancement_profile: profile,
        };

        let text = page.text.trim();
        if text.is_empty() {
            tracing::info!(profile = profile.as_str(), "OCR found no text");
            return Ok(ExtractionResult::empty(stats, NO_TEXT_DETECTED));
        }

        let confidence = aggregate_confidence(&page.tokens);
        let warnings = analyze_ocr_quality(&page.tokens, confidence);

        tracing::info!(
            profile = profile.as_str(),
            confidence,
            text_length = text.len(),
            "Image extraction complete"
        );

        Ok(ExtractionResult::success(text.to_string(), confidence, stats).with_warnings(warnings))
    }

    /// Text layer of every page, in order, joined by newlines.
    /// Reports one progress update per page.
    pub fn extract_pdf(&self, pdf_bytes: &[u8], progress_fn: ProgressFn<'_>) -> ExtractionResult {
        let pages = match self.pdf_extractor.extract_pages(pdf_bytes) {
            Ok(pages) => pages,
            Err(e) => {
                tracing::warn!(error = %e, "PDF extraction failed");
                return ExtractionResult::failed(&e);
            }
        };

        let page_count = pages.len();
        let mut texts = Vec::with_capacity(page_count);
        let mut warnings = Vec::new();
        for (i, page) in pages.iter().enumerate() {
            if page.trim().is_empty() {
                warnings.push(ExtractionWarning::LowConfidencePage {
                    page: i + 1,
                    confidence: 0.0,
                });
            }
            texts.push(page.as_str());
            report(progress_fn, i + 1, page_count);
        }

        let pages_with_text = page_count - warnings.len();
        let stats = ExtractionStats::Pdf {
            page_count,
            pages_with_text,
        };

        let full_text = texts.join("\n");
        let full_text = full_text.trim();
        if full_text.is_empty() {
            return ExtractionResult::empty(stats, NO_PDF_TEXT);
        }

        let confidence = pdf_confidence(page_count, pages_with_text);
        tracing::info!(
            pages = page_count,
            pages_with_text,
            confidence,
            "PDF extraction complete"
        );

        ExtractionResult::success(full_text.to_string(), confidence, stats).with_warnings(warnings)
    }

    /// Container metadata of a video. The bytes are written to a temp file
    /// that is removed when this returns, on every path.
    pub fn extract_video(&self, video_bytes: &[u8], file_name: &str) -> ExtractionResult {
        match self.probe_video(video_bytes, file_name) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, file = file_name, "Video extraction failed");
                ExtractionResult::failed(&e)
            }
        }
    }

    fn probe_video(
        &self,
        video_bytes: &[u8],
        file_name: &str,
    ) -> Result<ExtractionResult, ExtractionError> {
        let suffix = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_else(|| DEFAULT_VIDEO_SUFFIX.to_string());

        let mut file = tempfile::Builder::new()
            .prefix("docent-video-")
            .suffix(&suffix)
            .tempfile()?;
        file.write_all(video_bytes)?;
        file.flush()?;

        let metadata = self.video_probe.probe(file.path())?;
        let text = format!(
            "Video processed successfully. Duration: {:.2} seconds",
            metadata.duration_secs
        );

        tracing::info!(
            duration_secs = metadata.duration_secs,
            width = metadata.width,
            height = metadata.height,
            has_audio = metadata.has_audio,
            "Video extraction complete"
        );

        Ok(ExtractionResult::success(
            text,
            100.0,
            ExtractionStats::Video(metadata),
        ))
    }

    /// Extract each image in order. A failure stays in its own result.
    pub fn extract_batch_images(
        &self,
        images: &[BatchImage],
        progress_fn: ProgressFn<'_>,
    ) -> Vec<NamedExtraction> {
        let total = images.len();
        let mut results = Vec::with_capacity(total);

        for (i, item) in images.iter().enumerate() {
            let result = self.extract_image_bytes(&item.bytes, item.profile);
            if let Some(err) = &result.error {
                tracing::debug!(name = %item.name, error = %err, "Batch image without text");
            }
            results.push(NamedExtraction {
                name: item.name.clone(),
                result,
            });
            report(progress_fn, i + 1, total);
        }

        tracing::info!(
            total,
            with_text = results.iter().filter(|r| r.result.has_text()).count(),
            "Batch image extraction complete"
        );

        results
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::sync::Arc;

    use image::{ImageOutputFormat, Rgb, RgbImage};

    use super::*;
    use crate::pipeline::extraction::ocr::MockOcrEngine;
    use crate::pipeline::extraction::pdf::MockPdfExtractor;
    use crate::pipeline::extraction::types::{OcrPageResult, OcrToken, VideoMetadata};
    use crate::pipeline::extraction::video::MockVideoProbe;
    use crate::pipeline::progress::Progress;

    fn sample_metadata() -> VideoMetadata {
        VideoMetadata {
            duration_secs: 12.5,
            fps: Some(30.0),
            width: 640,
            height: 360,
            has_audio: true,
            codec: Some("h264".into()),
            container: Some("mp4".into()),
        }
    }

    fn extractor_with_ocr(ocr: MockOcrEngine) -> ContentExtractor {
        ContentExtractor::new(
            Box::new(ocr),
            Box::new(MockPdfExtractor::new(&[])),
            Box::new(MockVideoProbe::new(sample_metadata())),
        )
    }

    fn extractor_with_pdf(pdf: MockPdfExtractor) -> ContentExtractor {
        ContentExtractor::new(
            Box::new(MockOcrEngine::blank()),
            Box::new(pdf),
            Box::new(MockVideoProbe::new(sample_metadata())),
        )
    }

    fn test_image() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(24, 16, Rgb([240, 240, 240])))
    }

    fn test_png() -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        test_image()
            .write_to(&mut cursor, ImageOutputFormat::Png)
            .unwrap();
        cursor.into_inner()
    }

    // ── images ──

    #[test]
    fn image_text_and_mean_confidence() {
        let ocr = MockOcrEngine::with_tokens(
            "Total due 42",
            vec![
                OcrToken::new("", -1.0),
                OcrToken::new("Total", 90.0),
                OcrToken::new("due", 80.0),
                OcrToken::new("42", 70.0),
            ],
        );
        let extractor = extractor_with_ocr(ocr);
        let result = extractor.extract_image(&test_image(), EnhancementProfile::Document);

        assert_eq!(result.text.as_deref(), Some("Total due 42"));
        assert_eq!(result.confidence, 80.0);
        assert!(result.error.is_none());
        assert_eq!(
            result.stats,
            ExtractionStats::Image {
                word_count: 4,
                recognized_words: 3,
                enhancement_profile: EnhancementProfile::Document,
            }
        );
    }

    #[test]
    fn blank_image_reports_no_text() {
        let extractor = extractor_with_ocr(MockOcrEngine::blank());
        let result = extractor.extract_image(&test_image(), EnhancementProfile::Default);

        assert!(result.text.is_none());
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.error.as_deref(), Some(NO_TEXT_DETECTED));
    }

    #[test]
    fn whitespace_only_text_is_no_text() {
        let ocr = MockOcrEngine::with_tokens("  \n\t ", vec![OcrToken::new(" ", 60.0)]);
        let result = extractor_with_ocr(ocr).extract_image(&test_image(), EnhancementProfile::Default);
        assert!(result.text.is_none());
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn ocr_receives_binarized_png() {
        let ocr = Arc::new(MockOcrEngine::new("x", 90.0));
        let extractor = ContentExtractor::new(
            Box::new(SharedOcr(ocr.clone())),
            Box::new(MockPdfExtractor::new(&[])),
            Box::new(MockVideoProbe::new(sample_metadata())),
        );

        extractor.extract_image(&test_image(), EnhancementProfile::Handwriting);

        let seen = image::load_from_memory(&ocr.last_input().unwrap())
            .unwrap()
            .to_luma8();
        assert_eq!(seen.dimensions(), (24, 16));
        assert!(seen.as_raw().iter().all(|&p| p == 0 || p == 255));
    }

    struct SharedOcr(Arc<MockOcrEngine>);

    impl OcrEngine for SharedOcr {
        fn ocr_image(&self, image_bytes: &[u8]) -> Result<OcrPageResult, ExtractionError> {
            self.0.ocr_image(image_bytes)
        }
    }

    #[test]
    fn ocr_failure_becomes_result_error() {
        let extractor = extractor_with_ocr(MockOcrEngine::failing("tesseract crashed"));
        let result = extractor.extract_image(&test_image(), EnhancementProfile::Default);
        assert!(result.text.is_none());
        assert!(result.error.unwrap().contains("tesseract crashed"));
    }

    #[test]
    fn undecodable_bytes_become_result_error() {
        let extractor = extractor_with_ocr(MockOcrEngine::new("x", 90.0));
        let result = extractor.extract_image_bytes(&[0u8; 128], EnhancementProfile::Default);
        assert!(result.text.is_none());
        assert_eq!(result.confidence, 0.0);
        assert!(result.error.is_some());
    }

    #[test]
    fn low_confidence_scan_carries_warning() {
        let extractor = extractor_with_ocr(MockOcrEngine::new("faint scribble", 25.0));
        let result = extractor.extract_image(&test_image(), EnhancementProfile::Handwriting);
        assert!(result.warnings.contains(&ExtractionWarning::BlurryImage));
        assert!(result.warnings.contains(&ExtractionWarning::HandwritingDetected));
    }

    // ── PDFs ──

    #[test]
    fn pdf_pages_joined_in_order_with_progress() {
        let extractor = extractor_with_pdf(MockPdfExtractor::new(&["one", "two", "three", "four"]));
        let seen = RefCell::new(Vec::new());
        let sink = |p: Progress| seen.borrow_mut().push(p);

        let result = extractor.extract_pdf(b"%PDF", Some(&sink));

        assert_eq!(result.text.as_deref(), Some("one\ntwo\nthree\nfour"));
        assert_eq!(result.confidence, 95.0);
        let fractions: Vec<f32> = seen.borrow().iter().map(|p| p.fraction()).collect();
        assert_eq!(fractions, vec![0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn pdf_without_text_layer() {
        let extractor = extractor_with_pdf(MockPdfExtractor::new(&["  ", "\n"]));
        let seen = RefCell::new(Vec::new());
        let sink = |p: Progress| seen.borrow_mut().push(p);

        let result = extractor.extract_pdf(b"%PDF", Some(&sink));

        assert!(result.text.is_none());
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.error.as_deref(), Some(NO_PDF_TEXT));
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn pdf_partial_text_scales_confidence() {
        let extractor = extractor_with_pdf(MockPdfExtractor::new(&["content", ""]));
        let result = extractor.extract_pdf(b"%PDF", None);
        assert_eq!(result.confidence, 47.5);
        assert_eq!(
            result.stats,
            ExtractionStats::Pdf {
                page_count: 2,
                pages_with_text: 1
            }
        );
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn pdf_parse_failure_becomes_result_error() {
        let extractor = extractor_with_pdf(MockPdfExtractor::failing("broken xref"));
        let result = extractor.extract_pdf(b"junk", None);
        assert!(result.text.is_none());
        assert!(result.error.unwrap().contains("broken xref"));
    }

    #[test]
    fn real_pdf_through_pdf_extract() {
        let bytes = crate::pipeline::extraction::pdf::tests::make_test_pdf(&["Alpha page", "Bravo page"]);
        let extractor = ContentExtractor::new(
            Box::new(MockOcrEngine::blank()),
            Box::new(PdfTextExtractor),
            Box::new(MockVideoProbe::new(sample_metadata())),
        );
        let seen = RefCell::new(Vec::new());
        let sink = |p: Progress| seen.borrow_mut().push(p);

        let result = extractor.extract_pdf(&bytes, Some(&sink));

        let text = result.text.unwrap();
        assert!(text.find("Alpha").unwrap() < text.find("Bravo").unwrap());
        assert_eq!(seen.borrow().len(), 2);
        assert_eq!(seen.borrow().last().unwrap().fraction(), 1.0);
    }

    // ── videos ──

    #[test]
    fn video_metadata_and_temp_cleanup() {
        let probe = Arc::new(MockVideoProbe::new(sample_metadata()));
        let extractor = ContentExtractor::new(
            Box::new(MockOcrEngine::blank()),
            Box::new(MockPdfExtractor::new(&[])),
            Box::new(SharedProbe(probe.clone())),
        );

        let result = extractor.extract_video(b"fake video bytes", "clip.mov");

        assert_eq!(
            result.text.as_deref(),
            Some("Video processed successfully. Duration: 12.50 seconds")
        );
        assert_eq!(result.confidence, 100.0);
        match &result.stats {
            ExtractionStats::Video(meta) => {
                assert_eq!((meta.width, meta.height), (640, 360));
                assert!(meta.has_audio);
            }
            other => panic!("expected video stats, got {other:?}"),
        }

        let seen = probe.seen();
        assert_eq!(seen.len(), 1);
        let (path, existed) = &seen[0];
        assert!(existed, "temp file should exist while probing");
        assert!(path.to_string_lossy().ends_with(".mov"));
        assert!(!path.exists(), "temp file should be removed afterwards");
    }

    #[test]
    fn video_probe_failure_still_cleans_up() {
        let probe = Arc::new(MockVideoProbe::failing("moov atom not found"));
        let extractor = ContentExtractor::new(
            Box::new(MockOcrEngine::blank()),
            Box::new(MockPdfExtractor::new(&[])),
            Box::new(SharedProbe(probe.clone())),
        );

        let result = extractor.extract_video(b"corrupt", "broken");

        assert!(result.text.is_none());
        assert!(result.error.unwrap().contains("moov atom"));
        let seen = probe.seen();
        assert!(seen[0].0.to_string_lossy().ends_with(".mp4"));
        assert!(!seen[0].0.exists());
    }

    struct SharedProbe(Arc<MockVideoProbe>);

    impl VideoProbe for SharedProbe {
        fn probe(&self, path: &Path) -> Result<VideoMetadata, ExtractionError> {
            self.0.probe(path)
        }
    }

    // ── batch ──

    #[test]
    fn batch_isolates_failures_and_reports_progress() {
        let extractor = extractor_with_ocr(MockOcrEngine::new("page text", 88.0));
        let images = vec![
            BatchImage {
                name: "first.png".into(),
                bytes: test_png(),
                profile: EnhancementProfile::Document,
            },
            BatchImage {
                name: "corrupt.png".into(),
                bytes: vec![0u8; 64],
                profile: EnhancementProfile::Default,
            },
            BatchImage {
                name: "third.png".into(),
                bytes: test_png(),
                profile: EnhancementProfile::Handwriting,
            },
        ];
        let seen = RefCell::new(Vec::new());
        let sink = |p: Progress| seen.borrow_mut().push(p);

        let results = extractor.extract_batch_images(&images, Some(&sink));

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].name, "first.png");
        assert_eq!(results[0].result.text.as_deref(), Some("page text"));
        assert!(results[1].result.text.is_none());
        assert!(results[1].result.error.is_some());
        assert_eq!(results[2].result.text.as_deref(), Some("page text"));
        let completed: Vec<usize> = seen.borrow().iter().map(|p| p.completed).collect();
        assert_eq!(completed, vec![1, 2, 3]);
    }

    #[test]
    fn empty_batch_is_empty() {
        let extractor = extractor_with_ocr(MockOcrEngine::new("x", 90.0));
        assert!(extractor.extract_batch_images(&[], None).is_empty());
    }

    // ── dispatch ──

    #[test]
    fn dispatch_by_declared_type() {
        let extractor = ContentExtractor::new(
            Box::new(MockOcrEngine::new("scanned words", 90.0)),
            Box::new(MockPdfExtractor::new(&["pdf words"])),
            Box::new(MockVideoProbe::new(sample_metadata())),
        );

        let image = MediaInput::new("a.png", "image/png", test_png());
        let pdf = MediaInput::new("a.pdf", "application/pdf", b"%PDF".to_vec());
        let video = MediaInput::new("a.mp4", "video/mp4", b"....".to_vec());
        let svg = MediaInput::new("a.svg", "image/svg+xml", b"<svg/>".to_vec());

        let p = EnhancementProfile::Default;
        assert_eq!(extractor.extract(&image, p, None).text.as_deref(), Some("scanned words"));
        assert_eq!(extractor.extract(&pdf, p, None).text.as_deref(), Some("pdf words"));
        assert!(extractor
            .extract(&video, p, None)
            .text
            .unwrap()
            .starts_with("Video processed successfully"));

        let unsupported = extractor.extract(&svg, p, None);
        assert!(unsupported.text.is_none());
        assert!(unsupported.error.unwrap().contains("image/svg+xml"));
    }
}
