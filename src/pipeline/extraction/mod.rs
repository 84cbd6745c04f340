pub mod types;
pub mod confidence;
pub mod enhance;
pub mod ocr;
pub mod pdf;
pub mod video;
pub mod orchestrator;

pub use types::*;
pub use confidence::*;
pub use enhance::*;
pub use ocr::*;
pub use pdf::*;
pub use video::*;
pub use orchestrator::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("OCR engine unavailable: {0}")]
    OcrInit(String),

    #[error("OCR processing failed: {0}")]
    OcrProcessing(String),

    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Video probe unavailable: {0}")]
    ProbeInit(String),

    #[error("Video probe failed: {0}")]
    VideoProbe(String),

    #[error("No video stream found")]
    NoVideoStream,

    #[error("Unsupported media type: {0}")]
    UnsupportedMedia(String),
}
