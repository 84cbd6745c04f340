use std::path::Path;

use serde::{Deserialize, Serialize};

/// Closed set of media kinds, decided once from the declared media type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Pdf,
    Video,
    Unsupported,
}

impl MediaKind {
    /// Map a declared media type (`image/png`, `application/pdf; charset=binary`, ...)
    /// to a kind. Vector images are not rasterized and count as unsupported.
    pub fn from_declared_type(declared: &str) -> Self {
        let essence = declared
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();

        match essence.split_once('/') {
            Some(("image", "svg+xml")) => Self::Unsupported,
            Some(("image", sub)) if !sub.is_empty() => Self::Image,
            Some(("application", "pdf")) => Self::Pdf,
            Some(("video", sub)) if !sub.is_empty() => Self::Video,
            _ => Self::Unsupported,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Pdf => "pdf",
            Self::Video => "video",
            Self::Unsupported => "unsupported",
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported)
    }
}

/// An uploaded file as it arrives at the boundary.
#[derive(Debug, Clone)]
pub struct MediaInput {
    pub file_name: String,
    pub declared_type: String,
    pub bytes: Vec<u8>,
    kind: MediaKind,
}

impl MediaInput {
    pub fn new(file_name: &str, declared_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        let declared_type = declared_type.into();
        let kind = MediaKind::from_declared_type(&declared_type);
        Self {
            file_name: sanitize_filename(file_name),
            declared_type,
            bytes,
            kind,
        }
    }

    /// Read a file from disk, declaring its type from the extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path.to_string_lossy();
        Ok(Self::new(&name, declared_type_for_path(path), bytes))
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }
}

/// Declared media type for a path, by extension.
pub fn declared_type_for_path(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Sanitize a filename: strip path components, limit length.
pub fn sanitize_filename(original: &str) -> String {
    let name = Path::new(original)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload");

    let clean: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '\0'))
        .take(255)
        .collect();

    if clean.is_empty() {
        "upload".to_string()
    } else {
        clean
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raster_images_are_images() {
        for t in ["image/png", "image/jpeg", "image/tiff", "IMAGE/PNG"] {
            assert_eq!(MediaKind::from_declared_type(t), MediaKind::Image, "{t}");
        }
    }

    #[test]
    fn svg_is_unsupported() {
        assert_eq!(
            MediaKind::from_declared_type("image/svg+xml"),
            MediaKind::Unsupported
        );
    }

    #[test]
    fn pdf_with_parameters() {
        assert_eq!(
            MediaKind::from_declared_type("application/pdf; charset=binary"),
            MediaKind::Pdf
        );
    }

    #[test]
    fn videos_by_top_level_type() {
        assert_eq!(MediaKind::from_declared_type("video/mp4"), MediaKind::Video);
        assert_eq!(MediaKind::from_declared_type("video/quicktime"), MediaKind::Video);
    }

    #[test]
    fn everything_else_unsupported() {
        for t in ["text/plain", "application/zip", "", "image", "image/", "audio/mpeg"] {
            assert_eq!(MediaKind::from_declared_type(t), MediaKind::Unsupported, "{t:?}");
        }
        assert!(!MediaKind::Unsupported.is_supported());
    }

    #[test]
    fn media_input_decides_kind_once() {
        let input = MediaInput::new("scan.png", "image/png", vec![1, 2, 3]);
        assert_eq!(input.kind(), MediaKind::Image);
        assert_eq!(input.file_name, "scan.png");
    }

    #[test]
    fn declared_type_from_extension() {
        assert_eq!(declared_type_for_path(Path::new("a/b/report.pdf")), "application/pdf");
        assert_eq!(declared_type_for_path(Path::new("clip.mp4")), "video/mp4");
        assert_eq!(declared_type_for_path(Path::new("photo.JPG")), "image/jpeg");
        assert_eq!(
            declared_type_for_path(Path::new("noext")),
            "application/octet-stream"
        );
    }

    #[test]
    fn from_path_reads_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();
        let input = MediaInput::from_path(&path).unwrap();
        assert_eq!(input.kind(), MediaKind::Pdf);
        assert_eq!(input.file_name, "notes.pdf");
        assert_eq!(input.bytes, b"%PDF-1.4");
    }

    #[test]
    fn sanitize_strips_path_traversal() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("normal.pdf"), "normal.pdf");
    }

    #[test]
    fn sanitize_handles_empty() {
        assert_eq!(sanitize_filename(""), "upload");
    }

    #[test]
    fn sanitize_truncates_long_names() {
        let long_name = "a".repeat(300);
        assert!(sanitize_filename(&long_name).len() <= 255);
    }
}
