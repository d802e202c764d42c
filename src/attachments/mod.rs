//! Attachment types for files sent along with a prompt.
//!
//! A user-selected file is turned into an [`EncodedAttachment`]: inline
//! base64 data for images, extracted text for text files. See
//! [`encode_attachment`].

mod encoder;

use std::path::PathBuf;

use thiserror::Error;

pub use encoder::{encode_attachment, mime_type_for_path};

/// Hard size ceiling for an attachment (10 MiB).
pub const MAX_ATTACHMENT_BYTES: u64 = 10 * 1024 * 1024;

/// Fallback MIME type for unknown extensions.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// A file selected by the user, before encoding.
#[derive(Debug, Clone)]
pub struct AttachmentSource {
    /// Filename for display
    pub file_name: String,
    pub mime_type: String,
    /// Size in bytes as reported by the source (checked before reading)
    pub size: u64,
    pub content: AttachmentContent,
}

/// Where the bytes of an attachment live.
#[derive(Debug, Clone)]
pub enum AttachmentContent {
    /// Already in memory
    Bytes(Vec<u8>),
    /// On disk, read lazily by the encoder
    Path(PathBuf),
}

impl AttachmentSource {
    /// An in-memory attachment.
    pub fn from_bytes(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            size: bytes.len() as u64,
            content: AttachmentContent::Bytes(bytes),
        }
    }

    /// An attachment backed by a file on disk.
    ///
    /// Only the metadata is read here; the MIME type comes from the
    /// extension.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, AttachmentError> {
        let path = path.into();
        let metadata = std::fs::metadata(&path)?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("attachment")
            .to_string();

        Ok(Self {
            file_name,
            mime_type: mime_type_for_path(&path).to_string(),
            size: metadata.len(),
            content: AttachmentContent::Path(path),
        })
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    pub fn is_text(&self) -> bool {
        self.mime_type.starts_with("text/")
    }
}

/// An attachment ready to be placed in a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedAttachment {
    /// An image, sent as base64 inline data
    Image {
        file_name: String,
        mime_type: String,
        data: String,
    },
    /// A text document, embedded in the prompt
    Text { file_name: String, content: String },
}

impl EncodedAttachment {
    /// Get display name for the attachment
    pub fn file_name(&self) -> &str {
        match self {
            EncodedAttachment::Image { file_name, .. } => file_name,
            EncodedAttachment::Text { file_name, .. } => file_name,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, EncodedAttachment::Image { .. })
    }
}

/// Errors raised while encoding an attachment.
#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("File is too large: {file_name} is {} (limit is {})", format_size(.size), format_size(.limit))]
    TooLarge {
        file_name: String,
        size: u64,
        limit: u64,
    },
    #[error("Unsupported file type: {mime_type} ({file_name}). Please attach an image or a text file.")]
    Unsupported {
        file_name: String,
        mime_type: String,
    },
    #[error("Failed to read attachment: {0}")]
    Io(#[from] std::io::Error),
}

/// Human-readable byte size.
pub fn format_size(bytes: &u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    let b = *bytes as f64;
    if b >= MIB {
        format!("{:.1} MB", b / MIB)
    } else if b >= KIB {
        format!("{:.1} KB", b / KIB)
    } else {
        format!("{} B", bytes)
    }
}
