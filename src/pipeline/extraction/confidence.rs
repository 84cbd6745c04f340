use super::types::{ExtractionWarning, OcrToken};

/// Confidence thresholds on the 0–100 scale
pub mod thresholds {
    /// Below this: significant uncertainty, probably a blurry capture.
    pub const LOW: f32 = 50.0;

    /// Words below this look like handwriting to the OCR engine.
    pub const HANDWRITING_WORD: f32 = 40.0;

    /// Extracted from a digital text layer rather than recognized.
    pub const DIGITAL_TEXT: f32 = 95.0;
}

/// Mean confidence over tokens that carry one. Sentinel rows (-1) are
/// excluded; with nothing left the confidence is 0.
pub fn aggregate_confidence(tokens: &[OcrToken]) -> f32 {
    let scored: Vec<f32> = tokens
        .iter()
        .filter(|t| !t.is_sentinel())
        .map(|t| t.confidence)
        .collect();
    if scored.is_empty() {
        return 0.0;
    }
    (scored.iter().sum::<f32>() / scored.len() as f32).clamp(0.0, 100.0)
}

/// Tokens that actually carry text.
pub fn recognized_word_count(tokens: &[OcrToken]) -> usize {
    tokens.iter().filter(|t| !t.text.trim().is_empty()).count()
}

/// Confidence for text read from a PDF text layer, scaled by how many pages had text.
pub fn pdf_confidence(page_count: usize, pages_with_text: usize) -> f32 {
    if page_count == 0 {
        return 0.0;
    }
    thresholds::DIGITAL_TEXT * (pages_with_text as f32 / page_count as f32)
}

/// Analyze OCR tokens and generate warnings
pub fn analyze_ocr_quality(tokens: &[OcrToken], confidence: f32) -> Vec<ExtractionWarning> {
    let mut warnings = Vec::new();

    let words: Vec<&OcrToken> = tokens
        .iter()
        .filter(|t| !t.is_sentinel() && !t.text.trim().is_empty())
        .collect();
    if words.is_empty() {
        return warnings;
    }

    if confidence < thresholds::LOW {
        warnings.push(ExtractionWarning::BlurryImage);
    }

    let low_conf_words = words
        .iter()
        .filter(|t| t.confidence < thresholds::HANDWRITING_WORD)
        .count();
    if low_conf_words as f64 / words.len() as f64 > 0.50 {
        warnings.push(ExtractionWarning::HandwritingDetected);
    }

    warnings
}
