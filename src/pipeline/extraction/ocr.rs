use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Mutex;

use tracing::debug;

use super::types::{OcrEngine, OcrPageResult, OcrToken};
use super::ExtractionError;

/// Tesseract OCR through its command-line interface.
///
/// The image is written to a temporary PNG (removed on drop) and recognized
/// with TSV output so every row carries its own confidence.
pub struct TesseractCli {
    binary: PathBuf,
    language: String,
}

impl TesseractCli {
    pub fn new(binary: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            language: language.into(),
        }
    }
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self::new("tesseract", "eng")
    }
}

impl OcrEngine for TesseractCli {
    fn ocr_image(&self, image_bytes: &[u8]) -> Result<OcrPageResult, ExtractionError> {
        let mut file = tempfile::Builder::new()
            .prefix("docent-ocr-")
            .suffix(".png")
            .tempfile()?;
        file.write_all(image_bytes)?;
        file.flush()?;

        let output = Command::new(&self.binary)
            .arg(file.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .arg("tsv")
            .output();

        let output = match output {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ExtractionError::OcrInit(format!(
                    "tesseract not found at {}",
                    self.binary.display()
                )));
            }
            Err(e) => return Err(ExtractionError::Io(e)),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractionError::OcrProcessing(format!(
                "tesseract failed: {}",
                stderr.trim()
            )));
        }

        let tsv = String::from_utf8_lossy(&output.stdout);
        let rows = parse_tsv(&tsv);
        debug!(rows = rows.len(), language = %self.language, "Tesseract TSV parsed");
        Ok(page_from_rows(&rows))
    }
}

/// Mock OCR engine for unit testing without Tesseract.
pub struct MockOcrEngine {
    text: String,
    tokens: Vec<OcrToken>,
    failure: Option<String>,
    last_input: Mutex<Option<Vec<u8>>>,
}

impl MockOcrEngine {
    /// Recognizes `text` with every word at `confidence`, preceded by one
    /// structural page row like real engines emit.
    pub fn new(text: &str, confidence: f32) -> Self {
        let mut tokens = vec![OcrToken::new("", -1.0)];
        tokens.extend(
            text.split_whitespace()
                .map(|w| OcrToken::new(w, confidence)),
        );
        Self::with_tokens(text, tokens)
    }

    pub fn with_tokens(text: &str, tokens: Vec<OcrToken>) -> Self {
        Self {
            text: text.to_string(),
            tokens,
            failure: None,
            last_input: Mutex::new(None),
        }
    }

    /// A page with layout rows but no recognized words.
    pub fn blank() -> Self {
        Self::with_tokens(
            "",
            vec![
                OcrToken::new("", -1.0),
                OcrToken::new("", -1.0),
                OcrToken::new("", -1.0),
                OcrToken::new(" ", 95.0),
            ],
        )
    }

    pub fn failing(message: &str) -> Self {
        let mut engine = Self::with_tokens("", vec![]);
        engine.failure = Some(message.to_string());
        engine
    }

    /// Bytes handed to the most recent `ocr_image` call.
    pub fn last_input(&self) -> Option<Vec<u8>> {
        self.last_input.lock().ok().and_then(|g| g.clone())
    }
}

impl OcrEngine for MockOcrEngine {
    fn ocr_image(&self, image_bytes: &[u8]) -> Result<OcrPageResult, ExtractionError> {
        if let Ok(mut last) = self.last_input.lock() {
            *last = Some(image_bytes.to_vec());
        }
        if let Some(msg) = &self.failure {
            return Err(ExtractionError::OcrProcessing(msg.clone()));
        }
        Ok(OcrPageResult {
            text: self.text.clone(),
            tokens: self.tokens.clone(),
        })
    }
}

/// One row of Tesseract TSV output.
/// Columns: level page_num block_num par_num line_num word_num left top width height conf text
#[derive(Debug, Clone, PartialEq)]
pub struct TsvRow {
    pub level: u32,
    pub block: u32,
    pub paragraph: u32,
    pub line: u32,
    pub confidence: f32,
    pub text: String,
}

const WORD_LEVEL: u32 = 5;

/// Parse Tesseract TSV output, keeping every row (structural rows included).
/// Malformed rows are skipped. The text column may be absent on structural rows.
pub fn parse_tsv(tsv: &str) -> Vec<TsvRow> {
    let mut rows = Vec::new();

    for line in tsv.lines().skip(1) {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 11 {
            continue;
        }

        let parse_u32 = |i: usize| fields[i].trim().parse::<u32>().ok();
        let (Some(level), Some(block), Some(paragraph), Some(line_num)) =
            (parse_u32(0), parse_u32(2), parse_u32(3), parse_u32(4))
        else {
            continue;
        };
        let confidence: f32 = match fields[10].trim().parse() {
            Ok(c) => c,
            Err(_) => continue,
        };

        rows.push(TsvRow {
            level,
            block,
            paragraph,
            line: line_num,
            confidence,
            text: fields.get(11).map(|t| t.to_string()).unwrap_or_default(),
        });
    }

    rows
}

/// Build the page result: one token per row, text rebuilt from word rows.
/// Words on a line are joined with spaces, lines with newlines, and
/// paragraphs separated by a blank line.
pub fn page_from_rows(rows: &[TsvRow]) -> OcrPageResult {
    let tokens = rows
        .iter()
        .map(|r| OcrToken::new(r.text.clone(), r.confidence))
        .collect();

    let mut text = String::new();
    let mut current: Option<(u32, u32, u32)> = None;
    for row in rows.iter().filter(|r| r.level == WORD_LEVEL) {
        let word = row.text.trim();
        if word.is_empty() {
            continue;
        }
        let key = (row.block, row.paragraph, row.line);
        match current {
            None => {}
            Some(prev) if prev == key => text.push(' '),
            Some((block, paragraph, _)) if block == key.0 && paragraph == key.1 => {
                text.push('\n')
            }
            Some(_) => text.push_str("\n\n"),
        }
        text.push_str(word);
        current = Some(key);
    }

    OcrPageResult { text, tokens }
}
