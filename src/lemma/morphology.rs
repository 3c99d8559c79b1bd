//! Morphological analysis backends
//!
//! A [`Morphology`] answers two questions about a lowercase token: does it
//! belong to the indexed alphabet, and what are its dictionary forms and
//! grammatical category.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading a morphology dictionary
#[derive(Debug, Error)]
pub enum MorphologyError {
    #[error("Failed to read dictionary: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed dictionary line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// Grammatical category of a word form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartOfSpeech {
    Noun,
    Verb,
    Adjective,
    Adverb,
    Numeral,
    Preposition,
    Conjunction,
    Particle,
    Interjection,
    Pronoun,
    Other,
}

impl PartOfSpeech {
    /// Returns true for the closed categories that never get indexed
    pub fn is_function_word(&self) -> bool {
        matches!(
            self,
            PartOfSpeech::Preposition
                | PartOfSpeech::Conjunction
                | PartOfSpeech::Particle
                | PartOfSpeech::Interjection
                | PartOfSpeech::Pronoun
        )
    }

    /// Parses a dictionary tag such as `NOUN` or `prep`
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_uppercase().as_str() {
            "NOUN" | "N" => PartOfSpeech::Noun,
            "VERB" | "V" => PartOfSpeech::Verb,
            "ADJ" | "ADJECTIVE" => PartOfSpeech::Adjective,
            "ADV" | "ADVERB" => PartOfSpeech::Adverb,
            "NUM" | "NUMERAL" => PartOfSpeech::Numeral,
            "PREP" | "PREPOSITION" => PartOfSpeech::Preposition,
            "CONJ" | "CONJUNCTION" => PartOfSpeech::Conjunction,
            "PART" | "PARTICLE" | "DET" => PartOfSpeech::Particle,
            "INTJ" | "INTERJECTION" => PartOfSpeech::Interjection,
            "PRON" | "PRONOUN" => PartOfSpeech::Pronoun,
            _ => PartOfSpeech::Other,
        }
    }
}

/// One reading of a word form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordAnalysis {
    /// Dictionary (normal) form
    pub normal_form: String,
    pub part_of_speech: PartOfSpeech,
}

impl WordAnalysis {
    pub fn new(normal_form: impl Into<String>, part_of_speech: PartOfSpeech) -> Self {
        Self {
            normal_form: normal_form.into(),
            part_of_speech,
        }
    }
}

/// Morphological lookup used by the lemmatizer
pub trait Morphology: Send + Sync {
    /// Returns true if the lowercase token is written in the indexed alphabet
    fn is_word(&self, token: &str) -> bool;

    /// Returns every reading of a lowercase word, first reading preferred
    ///
    /// An empty vector means the word is unknown.
    fn analyze(&self, word: &str) -> Vec<WordAnalysis>;
}

/// Morphology backed by a tab-separated dictionary file
///
/// Each non-comment line holds `form<TAB>normal form<TAB>tag`. A form may
/// appear on several lines; readings keep file order.
#[derive(Debug, Default)]
pub struct DictionaryMorphology {
    entries: HashMap<String, Vec<WordAnalysis>>,
}

impl DictionaryMorphology {
    /// Loads a dictionary from disk
    pub fn load(path: &Path) -> Result<Self, MorphologyError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parses dictionary text
    pub fn parse(content: &str) -> Result<Self, MorphologyError> {
        let mut entries: HashMap<String, Vec<WordAnalysis>> = HashMap::new();

        for (index, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
            if fields.len() != 3 || fields.iter().any(|f| f.is_empty()) {
                return Err(MorphologyError::Parse {
                    line: index + 1,
                    message: format!("expected 3 tab-separated fields, got {:?}", line),
                });
            }

            entries
                .entry(fields[0].to_lowercase())
                .or_default()
                .push(WordAnalysis::new(
                    fields[1].to_lowercase(),
                    PartOfSpeech::from_tag(fields[2]),
                ));
        }

        Ok(Self { entries })
    }

    /// Number of distinct word forms
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Morphology for DictionaryMorphology {
    fn is_word(&self, token: &str) -> bool {
        !token.is_empty() && token.chars().all(char::is_alphabetic)
    }

    fn analyze(&self, word: &str) -> Vec<WordAnalysis> {
        self.entries.get(word).cloned().unwrap_or_default()
    }
}

const PREPOSITIONS: &[&str] = &[
    "about", "above", "across", "after", "against", "along", "among", "around", "at", "before",
    "behind", "below", "beneath", "beside", "between", "beyond", "by", "despite", "down",
    "during", "except", "for", "from", "in", "inside", "into", "near", "of", "off", "on", "onto",
    "out", "outside", "over", "past", "since", "through", "throughout", "toward", "towards",
    "under", "underneath", "until", "up", "upon", "via", "with", "within", "without",
];

const CONJUNCTIONS: &[&str] = &[
    "although", "and", "because", "but", "either", "if", "neither", "nor", "or", "so", "than",
    "though", "unless", "whereas", "whether", "while", "yet",
];

const PARTICLES: &[&str] = &["a", "an", "the", "to", "not", "no", "as", "just", "only"];

const INTERJECTIONS: &[&str] = &["ah", "alas", "hey", "hello", "oh", "oops", "ouch", "wow"];

const PRONOUNS: &[&str] = &[
    "all", "any", "anybody", "anyone", "anything", "each", "every", "everybody", "everyone",
    "everything", "he", "her", "hers", "herself", "him", "himself", "his", "i", "it", "its",
    "itself", "me", "mine", "my", "myself", "none", "nobody", "nothing", "our", "ours",
    "ourselves", "she", "some", "somebody", "someone", "something", "that", "their", "theirs",
    "them", "themselves", "these", "they", "this", "those", "us", "we", "what", "which", "who",
    "whom", "whose", "you", "your", "yours", "yourself", "yourselves",
];

const IRREGULAR_FORMS: &[(&str, &str, PartOfSpeech)] = &[
    ("am", "be", PartOfSpeech::Verb),
    ("is", "be", PartOfSpeech::Verb),
    ("are", "be", PartOfSpeech::Verb),
    ("was", "be", PartOfSpeech::Verb),
    ("were", "be", PartOfSpeech::Verb),
    ("been", "be", PartOfSpeech::Verb),
    ("has", "have", PartOfSpeech::Verb),
    ("had", "have", PartOfSpeech::Verb),
    ("does", "do", PartOfSpeech::Verb),
    ("did", "do", PartOfSpeech::Verb),
    ("men", "man", PartOfSpeech::Noun),
    ("women", "woman", PartOfSpeech::Noun),
    ("children", "child", PartOfSpeech::Noun),
    ("people", "person", PartOfSpeech::Noun),
    ("mice", "mouse", PartOfSpeech::Noun),
    ("feet", "foot", PartOfSpeech::Noun),
    ("teeth", "tooth", PartOfSpeech::Noun),
    ("geese", "goose", PartOfSpeech::Noun),
];

/// Built-in English morphology
///
/// Closed-class words are tagged from fixed tables; every other ASCII word
/// is accepted with its plural suffix folded away.
#[derive(Debug)]
pub struct EnglishMorphology {
    closed_class: HashMap<&'static str, PartOfSpeech>,
    irregular: HashMap<&'static str, (&'static str, PartOfSpeech)>,
}

impl EnglishMorphology {
    pub fn new() -> Self {
        let mut closed_class = HashMap::new();
        let tables = [
            (PREPOSITIONS, PartOfSpeech::Preposition),
            (CONJUNCTIONS, PartOfSpeech::Conjunction),
            (PARTICLES, PartOfSpeech::Particle),
            (INTERJECTIONS, PartOfSpeech::Interjection),
            (PRONOUNS, PartOfSpeech::Pronoun),
        ];
        for (words, pos) in tables {
            for word in words {
                closed_class.entry(*word).or_insert(pos);
            }
        }

        let irregular = IRREGULAR_FORMS
            .iter()
            .map(|(form, normal, pos)| (*form, (*normal, *pos)))
            .collect();

        Self {
            closed_class,
            irregular,
        }
    }
}

impl Default for EnglishMorphology {
    fn default() -> Self {
        Self::new()
    }
}

/// Folds a regular English plural to its singular
fn fold_plural(word: &str) -> String {
    if word.len() <= 3 {
        return word.to_string();
    }
    if let Some(stem) = word.strip_suffix("ies") {
        if word.len() > 4 {
            return format!("{}y", stem);
        }
        return word[..word.len() - 1].to_string();
    }
    if word.ends_with("sses") || ["ches", "shes", "xes", "zes"].iter().any(|s| word.ends_with(s)) {
        return word[..word.len() - 2].to_string();
    }
    if word.ends_with('s') && !["ss", "us", "is"].iter().any(|end| word.ends_with(end)) {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}

impl Morphology for EnglishMorphology {
    fn is_word(&self, token: &str) -> bool {
        !token.is_empty() && token.bytes().all(|b| b.is_ascii_lowercase())
    }

    fn analyze(&self, word: &str) -> Vec<WordAnalysis> {
        if !self.is_word(word) {
            return Vec::new();
        }

        if let Some(pos) = self.closed_class.get(word) {
            return vec![WordAnalysis::new(word, *pos)];
        }

        if let Some((normal, pos)) = self.irregular.get(word) {
            return vec![WordAnalysis::new(*normal, *pos)];
        }

        vec![WordAnalysis::new(fold_plural(word), PartOfSpeech::Other)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normal(morphology: &dyn Morphology, word: &str) -> Option<String> {
        morphology
            .analyze(word)
            .first()
            .map(|analysis| analysis.normal_form.clone())
    }

    #[test]
    fn test_function_word_categories() {
        assert!(PartOfSpeech::Preposition.is_function_word());
        assert!(PartOfSpeech::Pronoun.is_function_word());
        assert!(!PartOfSpeech::Noun.is_function_word());
        assert!(!PartOfSpeech::Other.is_function_word());
    }

    #[test]
    fn test_from_tag() {
        assert_eq!(PartOfSpeech::from_tag("noun"), PartOfSpeech::Noun);
        assert_eq!(PartOfSpeech::from_tag("PREP"), PartOfSpeech::Preposition);
        assert_eq!(PartOfSpeech::from_tag("???"), PartOfSpeech::Other);
    }

    #[test]
    fn test_english_plural_folding() {
        let morphology = EnglishMorphology::new();
        assert_eq!(normal(&morphology, "foxes").as_deref(), Some("fox"));
        assert_eq!(normal(&morphology, "cats").as_deref(), Some("cat"));
        assert_eq!(normal(&morphology, "stories").as_deref(), Some("story"));
        assert_eq!(normal(&morphology, "classes").as_deref(), Some("class"));
        assert_eq!(normal(&morphology, "churches").as_deref(), Some("church"));
        assert_eq!(normal(&morphology, "glass").as_deref(), Some("glass"));
        assert_eq!(normal(&morphology, "status").as_deref(), Some("status"));
        assert_eq!(normal(&morphology, "gas").as_deref(), Some("gas"));
    }

    #[test]
    fn test_english_closed_class() {
        let morphology = EnglishMorphology::new();
        let analysis = morphology.analyze("the");
        assert_eq!(analysis.len(), 1);
        assert!(analysis[0].part_of_speech.is_function_word());

        let analysis = morphology.analyze("with");
        assert_eq!(analysis[0].part_of_speech, PartOfSpeech::Preposition);
    }

    #[test]
    fn test_english_irregular() {
        let morphology = EnglishMorphology::new();
        assert_eq!(normal(&morphology, "children").as_deref(), Some("child"));
        assert_eq!(normal(&morphology, "was").as_deref(), Some("be"));
    }

    #[test]
    fn test_english_rejects_non_ascii() {
        let morphology = EnglishMorphology::new();
        assert!(!morphology.is_word("café"));
        assert!(!morphology.is_word("abc123"));
        assert!(morphology.analyze("123").is_empty());
    }

    #[test]
    fn test_dictionary_parse() {
        let dictionary = DictionaryMorphology::parse(
            "# comment\n\
             кошки\tкошка\tNOUN\n\
             и\tи\tCONJ\n\
             стали\tстать\tVERB\n\
             стали\tсталь\tNOUN\n",
        )
        .unwrap();

        assert_eq!(dictionary.len(), 3);
        assert!(dictionary.is_word("кошки"));
        assert_eq!(normal(&dictionary, "кошки").as_deref(), Some("кошка"));

        let readings = dictionary.analyze("стали");
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].normal_form, "стать");

        assert!(dictionary.analyze("собака").is_empty());
        assert!(dictionary.analyze("и")[0].part_of_speech.is_function_word());
    }

    #[test]
    fn test_dictionary_rejects_malformed_line() {
        let result = DictionaryMorphology::parse("word\tonly_two\n");
        assert!(matches!(
            result,
            Err(MorphologyError::Parse { line: 1, .. })
        ));
    }
}
