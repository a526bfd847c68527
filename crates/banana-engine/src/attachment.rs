use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::generation::ContentPart;

/// An image the user attached to a conversation turn, held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn to_data_url(&self) -> String {
        data_url(&self.mime_type, &self.bytes)
    }

    pub fn to_content_part(&self) -> ContentPart {
        ContentPart::inline(&self.mime_type, &self.bytes)
    }
}

/// Reads an image file into memory. The media type is sniffed from the
/// content, falling back to the extension; anything else is rejected.
pub fn read_attachment(path: &Path) -> Result<Attachment> {
    let bytes = fs::read(path).with_context(|| format!("failed reading {}", path.display()))?;
    let mime_type = sniff_image_mime(&bytes)
        .or_else(|| mime_for_path(path))
        .ok_or_else(|| anyhow!("{} is not a supported image", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    tracing::debug!(file = %file_name, mime_type, size = bytes.len(), "attachment read");
    Ok(Attachment::new(file_name, mime_type, bytes))
}

pub fn data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", BASE64.encode(bytes))
}

fn sniff_image_mime(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes)
        .ok()
        .map(|format| format.to_mime_type())
}

fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_string_lossy().to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        _ => None,
    }
}
