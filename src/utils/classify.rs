//! Media-type classification for discovered files.

use std::path::Path;

use super::encoding::is_binary_sample;

pub const MEDIA_PDF: &str = "application/pdf";
pub const MEDIA_OCTET_STREAM: &str = "application/octet-stream";
pub const MEDIA_TEXT_PLAIN: &str = "text/plain";

/// Extraction route implied by a media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Text,
    Document,
    Image,
}

/// Magic numbers checked when the extension says nothing.
const SIGNATURES: &[(&[u8], &str)] = &[
    (b"%PDF-", MEDIA_PDF),
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
];

/// Determine a media type from the file name, sniffing `head` when the
/// extension is unknown.
pub fn detect_media_type(path: &Path, head: &[u8]) -> String {
    if let Some(mime) = mime_guess::from_path(path).first() {
        return mime.essence_str().to_string();
    }

    for (magic, media_type) in SIGNATURES {
        if head.starts_with(magic) {
            return (*media_type).to_string();
        }
    }
    if head.len() >= 12 && &head[..4] == b"RIFF" && &head[8..12] == b"WEBP" {
        return "image/webp".to_string();
    }

    if is_binary_sample(head) {
        MEDIA_OCTET_STREAM.to_string()
    } else {
        MEDIA_TEXT_PLAIN.to_string()
    }
}

/// Map a media type (parameters allowed) to its extraction route.
///
/// SVG is XML source, so it stays on the text route.
pub fn kind_for_media_type(media_type: &str) -> FileKind {
    let essence = media_type.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    if essence == MEDIA_PDF {
        FileKind::Document
    } else if essence.starts_with("image/") && essence != "image/svg+xml" {
        FileKind::Image
    } else {
        FileKind::Text
    }
}

/// Detect both the media type and the extraction route.
pub fn classify_file(path: &Path, head: &[u8]) -> (String, FileKind) {
    let media_type = detect_media_type(path, head);
    let kind = kind_for_media_type(&media_type);
    (media_type, kind)
}
