//! Generated images, kept apart from the message log.

use serde::{Deserialize, Serialize};

/// An image returned by the image-generation backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub prompt: String,
    pub mime_type: String,
    /// Base64 payload
    pub data: String,
}

impl GeneratedImage {
    /// Render as a `data:` URL.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// Generated images, newest first.
#[derive(Debug, Clone, Default)]
pub struct Gallery {
    images: Vec<GeneratedImage>,
}

impl Gallery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an image in front of the older ones.
    pub fn push_newest(&mut self, image: GeneratedImage) {
        self.images.insert(0, image);
    }

    pub fn images(&self) -> &[GeneratedImage] {
        &self.images
    }

    pub fn latest(&self) -> Option<&GeneratedImage> {
        self.images.first()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn clear(&mut self) {
        self.images.clear();
    }
}
