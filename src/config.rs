//! Serializable translator configuration, as supplied by a front-end.

use serde::{Deserialize, Serialize};

use crate::{Result, Translator};

/// Everything a front-end can configure about a translation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TranslatorConfig {
    /// Name of the source encoding
    pub source_encoding: String,
    /// Name of the target encoding
    pub target_encoding: String,
    /// Write unmappable characters as numeric character references
    #[serde(default)]
    pub reference_substitution: bool,
    /// Characters decoded per chunk, if not the default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_size: Option<usize>,
}

impl TranslatorConfig {
    /// Configuration for a plain strict translation between two encodings
    pub fn new(source_encoding: impl Into<String>, target_encoding: impl Into<String>) -> Self {
        Self {
            source_encoding: source_encoding.into(),
            target_encoding: target_encoding.into(),
            reference_substitution: false,
            buffer_size: None,
        }
    }

    /// Resolve the encodings and build a translator.
    pub fn build(&self) -> Result<Translator> {
        let mut translator = Translator::new(&self.source_encoding, &self.target_encoding)?;
        translator.set_reference_substitution(self.reference_substitution);
        if let Some(size) = self.buffer_size {
            translator.set_buffer_size(size)?;
        }
        Ok(translator)
    }
}
