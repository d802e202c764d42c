//! Attachment encoding
//!
//! Turns an [`AttachmentSource`] into an [`EncodedAttachment`]:
//! - enforces the size ceiling before any bytes are read
//! - base64-encodes `image/*` content
//! - decodes `text/*` content as UTF-8
//!
//! Anything else is rejected.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;
use tracing::debug;

use super::{
    AttachmentContent, AttachmentError, AttachmentSource, EncodedAttachment,
    MAX_ATTACHMENT_BYTES, OCTET_STREAM,
};

/// Extensions treated as text documents, with their MIME types.
const TEXT_EXTENSIONS: &[(&str, &str)] = &[
    ("txt", "text/plain"),
    ("text", "text/plain"),
    ("log", "text/plain"),
    ("md", "text/markdown"),
    ("markdown", "text/markdown"),
    ("csv", "text/csv"),
    ("tsv", "text/tab-separated-values"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("css", "text/css"),
    ("xml", "text/xml"),
    ("json", "text/plain"),
    ("yaml", "text/yaml"),
    ("yml", "text/yaml"),
    ("toml", "text/plain"),
    ("ini", "text/plain"),
    ("js", "text/javascript"),
    ("ts", "text/plain"),
    ("py", "text/x-python"),
    ("rs", "text/x-rust"),
    ("go", "text/x-go"),
    ("java", "text/x-java"),
    ("c", "text/x-c"),
    ("h", "text/x-c"),
    ("cpp", "text/x-c++"),
    ("sh", "text/x-shellscript"),
    ("sql", "text/x-sql"),
];

/// Guess a MIME type from the file extension.
///
/// Image formats come from the `image` crate's format table; a fixed table
/// covers text documents. Unknown extensions map to
/// `application/octet-stream`.
pub fn mime_type_for_path(path: &Path) -> &'static str {
    let ext = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => ext.to_lowercase(),
        None => return OCTET_STREAM,
    };

    if let Some(format) = ImageFormat::from_extension(&ext) {
        return format.to_mime_type();
    }

    TEXT_EXTENSIONS
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
        .unwrap_or(OCTET_STREAM)
}

/// Encode an attachment for sending.
///
/// The size ceiling is enforced against the declared size first, then again
/// against the bytes actually read. Files are read with `tokio::fs`.
pub async fn encode_attachment(source: &AttachmentSource) -> Result<EncodedAttachment, AttachmentError> {
    check_size(&source.file_name, source.size)?;

    let is_image = source.is_image();
    if !is_image && !source.is_text() {
        return Err(AttachmentError::Unsupported {
            file_name: source.file_name.clone(),
            mime_type: source.mime_type.clone(),
        });
    }

    let bytes = match &source.content {
        AttachmentContent::Bytes(bytes) => bytes.clone(),
        AttachmentContent::Path(path) => tokio::fs::read(path).await?,
    };
    check_size(&source.file_name, bytes.len() as u64)?;

    debug!(
        file_name = %source.file_name,
        mime_type = %source.mime_type,
        size = bytes.len(),
        "Encoding attachment"
    );

    if is_image {
        Ok(EncodedAttachment::Image {
            file_name: source.file_name.clone(),
            mime_type: source.mime_type.clone(),
            data: STANDARD.encode(&bytes),
        })
    } else {
        Ok(EncodedAttachment::Text {
            file_name: source.file_name.clone(),
            content: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

fn check_size(file_name: &str, size: u64) -> Result<(), AttachmentError> {
    if size > MAX_ATTACHMENT_BYTES {
        return Err(AttachmentError::TooLarge {
            file_name: file_name.to_string(),
            size,
            limit: MAX_ATTACHMENT_BYTES,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_mime_type_for_images() {
        assert_eq!(mime_type_for_path(Path::new("photo.jpg")), "image/jpeg");
        assert_eq!(mime_type_for_path(Path::new("photo.JPEG")), "image/jpeg");
        assert_eq!(mime_type_for_path(Path::new("image.png")), "image/png");
        assert_eq!(mime_type_for_path(Path::new("anim.gif")), "image/gif");
        assert_eq!(mime_type_for_path(Path::new("photo.webp")), "image/webp");
    }

    #[test]
    fn test_mime_type_for_text() {
        assert_eq!(mime_type_for_path(Path::new("notes.txt")), "text/plain");
        assert_eq!(mime_type_for_path(Path::new("README.md")), "text/markdown");
        assert_eq!(mime_type_for_path(Path::new("main.rs")), "text/x-rust");
    }

    #[test]
    fn test_mime_type_unknown() {
        assert_eq!(mime_type_for_path(Path::new("doc.pdf")), OCTET_STREAM);
        assert_eq!(mime_type_for_path(Path::new("Makefile")), OCTET_STREAM);
    }

    #[tokio::test]
    async fn test_encode_image_as_base64() {
        let src = AttachmentSource::from_bytes("dot.png", "image/png", vec![1, 2, 3]);
        let encoded = encode_attachment(&src).await.unwrap();
        assert_eq!(
            encoded,
            EncodedAttachment::Image {
                file_name: "dot.png".into(),
                mime_type: "image/png".into(),
                data: "AQID".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_encode_text_extracts_utf8() {
        let src = AttachmentSource::from_bytes("notes.md", "text/markdown", "héllo".as_bytes().to_vec());
        let encoded = encode_attachment(&src).await.unwrap();
        assert_eq!(
            encoded,
            EncodedAttachment::Text {
                file_name: "notes.md".into(),
                content: "héllo".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_encode_rejects_unsupported_type() {
        let src = AttachmentSource::from_bytes("doc.pdf", "application/pdf", vec![0; 10]);
        let err = encode_attachment(&src).await.unwrap_err();
        match err {
            AttachmentError::Unsupported { mime_type, .. } => assert_eq!(mime_type, "application/pdf"),
            other => panic!("expected Unsupported, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_encode_rejects_oversized_before_type_check() {
        let src = AttachmentSource::from_bytes(
            "huge.bin",
            "application/zip",
            vec![0; MAX_ATTACHMENT_BYTES as usize + 1],
        );
        assert!(matches!(
            encode_attachment(&src).await,
            Err(AttachmentError::TooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn test_encode_accepts_exactly_the_ceiling() {
        let src = AttachmentSource::from_bytes(
            "edge.txt",
            "text/plain",
            vec![b'a'; MAX_ATTACHMENT_BYTES as usize],
        );
        assert!(encode_attachment(&src).await.is_ok());
    }

    #[tokio::test]
    async fn test_oversized_file_on_disk_is_rejected_from_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.txt");
        let file = std::fs::File::create(&path).unwrap();
        file.set_len(MAX_ATTACHMENT_BYTES + 1).unwrap();

        let src = AttachmentSource::from_path(&path).unwrap();
        let err = encode_attachment(&src).await.unwrap_err();
        assert!(matches!(err, AttachmentError::TooLarge { size, .. } if size == MAX_ATTACHMENT_BYTES + 1));
    }

    #[tokio::test]
    async fn test_encode_text_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"Quarterly numbers are up.").unwrap();

        let src = AttachmentSource::from_path(&path).unwrap();
        match encode_attachment(&src).await.unwrap() {
            EncodedAttachment::Text { file_name, content } => {
                assert_eq!(file_name, "report.txt");
                assert_eq!(content, "Quarterly numbers are up.");
            }
            other => panic!("expected Text, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_image_file_from_disk_is_read_async() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixel.png");
        tokio::fs::write(&path, [0x89, b'P', b'N', b'G']).await.unwrap();

        let src = AttachmentSource::from_path(&path).unwrap();
        let encoded = encode_attachment(&src).await.unwrap();
        assert_eq!(
            encoded,
            EncodedAttachment::Image {
                file_name: "pixel.png".into(),
                mime_type: "image/png".into(),
                data: "iVBORw==".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_file_removed_after_selection_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.txt");
        std::fs::write(&path, b"soon gone").unwrap();

        let src = AttachmentSource::from_path(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(
            encode_attachment(&src).await,
            Err(AttachmentError::Io(_))
        ));
    }
}
