//! Text to lemma normalization

use crate::lemma::morphology::Morphology;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Turns free text into lemma counts using a [`Morphology`]
#[derive(Clone)]
pub struct Lemmatizer {
    morphology: Arc<dyn Morphology>,
}

impl Lemmatizer {
    pub fn new(morphology: Arc<dyn Morphology>) -> Self {
        Self { morphology }
    }

    /// Counts the lemmas of a document
    ///
    /// Function words and words without an analysis are skipped.
    ///
    /// # Returns
    ///
    /// A map from lemma to its number of occurrences in `text`
    pub fn extract_lemmas(&self, text: &str) -> HashMap<String, u32> {
        let mut counts = HashMap::new();
        for lemma in self.lemmas(text) {
            *counts.entry(lemma).or_insert(0) += 1;
        }
        counts
    }

    /// Returns the distinct lemmas of a query in first-seen order
    pub fn extract_query_lemmas(&self, text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.lemmas(text)
            .filter(|lemma| seen.insert(lemma.clone()))
            .collect()
    }

    /// Returns the candidate words of a text, lowercased and stripped of edge punctuation
    pub fn words<'a>(&'a self, text: &'a str) -> impl Iterator<Item = String> + 'a {
        text.split_whitespace()
            .map(|token| {
                token
                    .trim_matches(|c: char| !c.is_alphanumeric())
                    .to_lowercase()
            })
            .filter(move |token| self.morphology.is_word(token))
    }

    fn lemmas<'a>(&'a self, text: &'a str) -> impl Iterator<Item = String> + 'a {
        self.words(text).filter_map(move |word| {
            let analyses = self.morphology.analyze(&word);
            let first = analyses.into_iter().next()?;
            if first.part_of_speech.is_function_word() {
                None
            } else {
                Some(first.normal_form)
            }
        })
    }
}

impl std::fmt::Debug for Lemmatizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lemmatizer").finish_non_exhaustive()
    }
}
