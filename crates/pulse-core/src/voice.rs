//! Learned writing-style profile.
//!
//! The style analyser (a generative-text backend) returns a loosely-shaped
//! JSON descriptor. Every field is validated and defaulted *individually*:
//! a partially-valid analysis still yields a usable profile, and an invalid
//! enum value never poisons its neighbours.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default words-per-sentence when the samples contain no sentence
/// terminators at all.
pub const DEFAULT_AVG_SENTENCE_LENGTH: u32 = 15;

/// Characters of each training sample retained for storage.
pub const TRAINING_EXAMPLE_MAX_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Casual,
    Professional,
    Friendly,
    Technical,
    Humorous,
    Authoritative,
    Conversational,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VocabularyLevel {
    Simple,
    Intermediate,
    Advanced,
    Technical,
}

/// Shared never/rare/moderate/frequent scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageFrequency {
    Never,
    Rare,
    Moderate,
    Frequent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParagraphStyle {
    Short,
    Medium,
    Long,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpeningStyle {
    Question,
    Statement,
    Hook,
    Anecdote,
    Direct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClosingStyle {
    Cta,
    Summary,
    Question,
    Thought,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructurePreference {
    Narrative,
    Informational,
    Conversational,
    Analytical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PunctuationStyle {
    Minimal,
    Moderate,
    Expressive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PersonalVoice {
    FirstPerson,
    SecondPerson,
    ThirdPerson,
    Mix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyLevel {
    Calm,
    Moderate,
    Energetic,
    Intense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    Minimal,
    Balanced,
    Detailed,
    Exhaustive,
}

/// The fixed-shape style parameter set steering generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleParameters {
    pub tone: Tone,
    pub avg_sentence_length: u32,
    pub vocabulary_level: VocabularyLevel,
    pub use_emojis: bool,
    pub emoji_frequency: UsageFrequency,
    pub use_lists: bool,
    pub list_frequency: UsageFrequency,
    pub paragraph_style: ParagraphStyle,
    pub opening_style: OpeningStyle,
    pub closing_style: ClosingStyle,
    pub structure_preference: StructurePreference,
    pub punctuation_style: PunctuationStyle,
    pub use_questions: bool,
    pub personal_voice: PersonalVoice,
    pub energy_level: EnergyLevel,
    pub detail_level: DetailLevel,
    pub example_usage: UsageFrequency,
}

impl Default for StyleParameters {
    fn default() -> Self {
        Self {
            tone: Tone::Professional,
            avg_sentence_length: DEFAULT_AVG_SENTENCE_LENGTH,
            vocabulary_level: VocabularyLevel::Intermediate,
            use_emojis: false,
            emoji_frequency: UsageFrequency::Never,
            use_lists: true,
            list_frequency: UsageFrequency::Moderate,
            paragraph_style: ParagraphStyle::Medium,
            opening_style: OpeningStyle::Statement,
            closing_style: ClosingStyle::Summary,
            structure_preference: StructurePreference::Informational,
            punctuation_style: PunctuationStyle::Moderate,
            use_questions: false,
            personal_voice: PersonalVoice::ThirdPerson,
            energy_level: EnergyLevel::Moderate,
            detail_level: DetailLevel::Balanced,
            example_usage: UsageFrequency::Moderate,
        }
    }
}

impl StyleParameters {
    /// Build style parameters from an analysis payload, defaulting each
    /// field independently when it is missing or outside its value set.
    ///
    /// `avg_sentence_length` is always the locally-computed metric, never
    /// taken from the payload; the analyser's estimate of it is unreliable.
    #[must_use]
    pub fn from_analysis(analysis: &Value, avg_sentence_length: u32) -> Self {
        let defaults = Self::default();
        Self {
            tone: field_or(analysis, "tone", defaults.tone),
            avg_sentence_length,
            vocabulary_level: field_or(analysis, "vocabularyLevel", defaults.vocabulary_level),
            use_emojis: field_or(analysis, "useEmojis", defaults.use_emojis),
            emoji_frequency: field_or(analysis, "emojiFrequency", defaults.emoji_frequency),
            use_lists: field_or(analysis, "useLists", defaults.use_lists),
            list_frequency: field_or(analysis, "listFrequency", defaults.list_frequency),
            paragraph_style: field_or(analysis, "paragraphStyle", defaults.paragraph_style),
            opening_style: field_or(analysis, "openingStyle", defaults.opening_style),
            closing_style: field_or(analysis, "closingStyle", defaults.closing_style),
            structure_preference: field_or(
                analysis,
                "structurePreference",
                defaults.structure_preference,
            ),
            punctuation_style: field_or(analysis, "punctuationStyle", defaults.punctuation_style),
            use_questions: field_or(analysis, "useQuestions", defaults.use_questions),
            personal_voice: field_or(analysis, "personalVoice", defaults.personal_voice),
            energy_level: field_or(analysis, "energyLevel", defaults.energy_level),
            detail_level: field_or(analysis, "detailLevel", defaults.detail_level),
            example_usage: field_or(analysis, "exampleUsage", defaults.example_usage),
        }
    }
}

/// Deserialize one field of the payload, falling back to `default` when the
/// key is absent or its value does not belong to the declared set.
fn field_or<T: DeserializeOwned>(analysis: &Value, key: &str, default: T) -> T {
    analysis
        .get(key)
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or(default)
}

/// Signature words, common phrases, and words the author avoids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub common_phrases: Vec<String>,
    pub signature_words: Vec<String>,
    pub avoided_words: Vec<String>,
}

impl Vocabulary {
    /// Extract the vocabulary bag from an analysis payload; any list that
    /// is missing or malformed becomes empty.
    #[must_use]
    pub fn from_analysis(analysis: &Value) -> Self {
        Self {
            common_phrases: string_list(analysis, "commonPhrases"),
            signature_words: string_list(analysis, "signatureWords"),
            avoided_words: string_list(analysis, "avoidedWords"),
        }
    }
}

fn string_list(analysis: &Value, key: &str) -> Vec<String> {
    analysis
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(ToOwned::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

/// One training sample, truncated for storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub text: String,
    pub added_at: DateTime<Utc>,
}

/// A user's learned writing-style profile.
///
/// Absent until the first training run; replaced wholesale on retraining.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceProfile {
    pub trained: bool,
    pub last_trained: DateTime<Utc>,
    pub sample_count: usize,
    pub total_characters: usize,
    pub style_parameters: StyleParameters,
    pub vocabulary: Vocabulary,
    pub training_examples: Vec<TrainingExample>,
}

/// Average words per sentence across the combined sample text.
///
/// Sentences are split on `.`, `!`, and `?`; fragments that contain no
/// word characters do not count. Returns
/// [`DEFAULT_AVG_SENTENCE_LENGTH`] when no sentence terminator is present.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn avg_words_per_sentence(text: &str) -> u32 {
    let sentences = text
        .split(['.', '!', '?'])
        .filter(|s| s.split_whitespace().next().is_some())
        .count();
    if sentences == 0 || !text.contains(['.', '!', '?']) {
        return DEFAULT_AVG_SENTENCE_LENGTH;
    }
    let words = text.split_whitespace().count();
    (words as f64 / sentences as f64).round() as u32
}
