//! Lemma module for turning text into index terms
//!
//! This module handles:
//! - Morphological analysis (dictionary-backed or built-in English)
//! - Per-document lemma counting with function-word filtering
//! - Query normalization

mod lemmatizer;
mod morphology;

pub use lemmatizer::Lemmatizer;
pub use morphology::{
    DictionaryMorphology, EnglishMorphology, Morphology, MorphologyError, PartOfSpeech,
    WordAnalysis,
};

use crate::config::MorphologyConfig;
use std::path::Path;
use std::sync::Arc;

/// Builds the morphology selected by the configuration
pub fn load_morphology(config: &MorphologyConfig) -> Result<Arc<dyn Morphology>, MorphologyError> {
    match &config.dictionary_path {
        Some(path) => {
            let dictionary = DictionaryMorphology::load(Path::new(path))?;
            tracing::info!("Loaded morphology dictionary {} ({} forms)", path, dictionary.len());
            Ok(Arc::new(dictionary))
        }
        None => Ok(Arc::new(EnglishMorphology::new())),
    }
}

/// Builds a lemmatizer from the configuration
pub fn load_lemmatizer(config: &MorphologyConfig) -> Result<Lemmatizer, MorphologyError> {
    Ok(Lemmatizer::new(load_morphology(config)?))
}
