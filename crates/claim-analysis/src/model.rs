//! Language model seam

use crate::Result;
use async_trait::async_trait;

/// Binary content sent alongside a prompt (images, PDFs)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineData {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl InlineData {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    pub fn jpeg(data: Vec<u8>) -> Self {
        Self::new("image/jpeg", data)
    }
}

/// A text generation backend
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn name(&self) -> &str;

    /// Generate text for `prompt`, optionally grounded on one attachment
    async fn generate(&self, prompt: &str, attachment: Option<&InlineData>) -> Result<String>;
}
