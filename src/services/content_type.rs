//! Content-type inference from object names.

use mime::Mime;
use std::path::Path;

/// Guesses a MIME type for an object from its name.
pub trait ContentTypeResolver: Send + Sync {
    fn infer_type(&self, object_name: &str) -> Option<Mime>;
}

/// Extension lookup over a fixed table of common types.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionTypes;

/// Types without a `mime` constant.
const EXTRA_TYPES: [(&str, &str); 14] = [
    ("md", "text/markdown"),
    ("yaml", "application/yaml"),
    ("yml", "application/yaml"),
    ("zip", "application/zip"),
    ("gz", "application/gzip"),
    ("tgz", "application/gzip"),
    ("tar", "application/x-tar"),
    ("wasm", "application/wasm"),
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("mp4", "video/mp4"),
    ("webm", "video/webm"),
    ("webp", "image/webp"),
    ("ico", "image/x-icon"),
];

impl ContentTypeResolver for ExtensionTypes {
    fn infer_type(&self, object_name: &str) -> Option<Mime> {
        let extension = Path::new(object_name)
            .extension()?
            .to_str()?
            .to_ascii_lowercase();

        let known = match extension.as_str() {
            "txt" | "text" | "log" => mime::TEXT_PLAIN,
            "html" | "htm" => mime::TEXT_HTML,
            "css" => mime::TEXT_CSS,
            "csv" => mime::TEXT_CSV,
            "xml" => mime::TEXT_XML,
            "js" | "mjs" => mime::APPLICATION_JAVASCRIPT,
            "json" => mime::APPLICATION_JSON,
            "pdf" => mime::APPLICATION_PDF,
            "png" => mime::IMAGE_PNG,
            "jpg" | "jpeg" => mime::IMAGE_JPEG,
            "gif" => mime::IMAGE_GIF,
            "svg" => mime::IMAGE_SVG,
            "bmp" => mime::IMAGE_BMP,
            "woff" => mime::FONT_WOFF,
            "woff2" => mime::FONT_WOFF2,
            other => {
                return EXTRA_TYPES
                    .iter()
                    .find(|(ext, _)| *ext == other)
                    .and_then(|(_, essence)| essence.parse().ok());
            }
        };
        Some(known)
    }
}
