//! Voice-profile training.
//!
//! Samples are concatenated and sent to the generative backend with a
//! fixed-shape JSON descriptor request. The response is free text; the
//! descriptor is recovered as the first balanced `{...}` block, then every
//! field is defaulted individually by the core model.

use chrono::Utc;
use serde_json::{json, Value};
use sqlx::PgPool;

use pulse_core::voice::{
    avg_words_per_sentence, StyleParameters, TrainingExample, Vocabulary,
    TRAINING_EXAMPLE_MAX_CHARS,
};
use pulse_core::VoiceProfile;

use crate::client::GenTextClient;
use crate::error::ComposeError;

const SAMPLE_DIVIDER: &str = "\n\n---SAMPLE DIVIDER---\n\n";

const ANALYSIS_SYSTEM: &str = "You are a writing style analyst. You respond with a single JSON \
     object and no additional text.";

/// Analyse writing samples and replace the user's voice profile.
///
/// The previous profile is only overwritten after a successful analysis;
/// a backend failure or an unparseable payload leaves it untouched.
///
/// # Errors
///
/// - [`ComposeError::VoiceAnalysisFailed`] when the response contains no
///   parseable JSON object.
/// - [`ComposeError::GenerationFailed`] / [`ComposeError::Http`] when the
///   backend call itself fails.
/// - [`ComposeError::Db`] when persistence fails.
pub async fn train_voice(
    pool: &PgPool,
    client: &GenTextClient,
    user_id: i64,
    samples: &[String],
) -> Result<VoiceProfile, ComposeError> {
    let combined = samples.join(SAMPLE_DIVIDER);
    let prompt = build_analysis_prompt(&combined);

    let response = client.complete(ANALYSIS_SYSTEM, &prompt).await?;

    let payload = extract_json_object(&response).ok_or(ComposeError::VoiceAnalysisFailed)?;
    let analysis: Value =
        serde_json::from_str(payload).map_err(|_| ComposeError::VoiceAnalysisFailed)?;

    let avg_sentence_length = avg_words_per_sentence(&combined);
    let style_parameters = StyleParameters::from_analysis(&analysis, avg_sentence_length);
    let vocabulary = Vocabulary::from_analysis(&analysis);

    let now = Utc::now();
    let profile = VoiceProfile {
        trained: true,
        last_trained: now,
        sample_count: samples.len(),
        total_characters: combined.chars().count(),
        style_parameters,
        vocabulary,
        training_examples: samples
            .iter()
            .map(|sample| TrainingExample {
                text: sample.chars().take(TRAINING_EXAMPLE_MAX_CHARS).collect(),
                added_at: now,
            })
            .collect(),
    };

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    let sample_count = samples.len() as i32;
    pulse_db::upsert_voice_profile(pool, user_id, &serde_json::to_value(&profile)?, sample_count)
        .await?;

    pulse_db::insert_activity_event(
        pool,
        user_id,
        "voice_trained",
        "Voice profile updated",
        &format!("Trained with {} writing samples", samples.len()),
        json!({ "sample_count": samples.len() }),
    )
    .await?;

    tracing::info!(user_id, samples = samples.len(), "train: voice profile replaced");
    Ok(profile)
}

fn build_analysis_prompt(combined: &str) -> String {
    format!(
        "Analyze the following writing samples and extract the author's unique \
         voice characteristics.\n\nWRITING SAMPLES:\n{combined}\n\n\
         Respond with a JSON object of this exact shape:\n\
         {{\n\
           \"tone\": \"<casual|professional|friendly|technical|humorous|authoritative|conversational>\",\n\
           \"vocabularyLevel\": \"<simple|intermediate|advanced|technical>\",\n\
           \"useEmojis\": <boolean>,\n\
           \"emojiFrequency\": \"<never|rare|moderate|frequent>\",\n\
           \"useLists\": <boolean>,\n\
           \"listFrequency\": \"<never|rare|moderate|frequent>\",\n\
           \"paragraphStyle\": \"<short|medium|long>\",\n\
           \"openingStyle\": \"<question|statement|hook|anecdote|direct>\",\n\
           \"closingStyle\": \"<cta|summary|question|thought>\",\n\
           \"commonPhrases\": [\"<phrase>\", ...],\n\
           \"avoidedWords\": [\"<word>\", ...],\n\
           \"signatureWords\": [\"<word>\", ...],\n\
           \"structurePreference\": \"<narrative|informational|conversational|analytical>\",\n\
           \"punctuationStyle\": \"<minimal|moderate|expressive>\",\n\
           \"useQuestions\": <boolean>,\n\
           \"personalVoice\": \"<first-person|second-person|third-person|mix>\",\n\
           \"energyLevel\": \"<calm|moderate|energetic|intense>\",\n\
           \"detailLevel\": \"<minimal|balanced|detailed|exhaustive>\",\n\
           \"exampleUsage\": \"<never|rare|moderate|frequent>\"\n\
         }}\n\n\
         Base the analysis ONLY on the provided samples. Return ONLY the JSON."
    )
}

/// Find the first balanced `{...}` block in free text, skipping braces that
/// appear inside JSON string literals.
///
/// Returns the block as a slice of the input, or `None` when no balanced
/// object exists.
#[must_use]
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_a_plain_object() {
        assert_eq!(
            extract_json_object(r#"{"tone": "casual"}"#),
            Some(r#"{"tone": "casual"}"#)
        );
    }

    #[test]
    fn extracts_from_markdown_fences_and_prose() {
        let text = "Here is the analysis:\n```json\n{\"tone\": \"casual\"}\n```\nHope it helps!";
        assert_eq!(extract_json_object(text), Some(r#"{"tone": "casual"}"#));
    }

    #[test]
    fn stops_at_the_balanced_end_despite_trailing_braces() {
        let text = r#"{"a": {"b": 1}} and also {"c": 2}"#;
        assert_eq!(extract_json_object(text), Some(r#"{"a": {"b": 1}}"#));
    }

    #[test]
    fn braces_inside_strings_do_not_count() {
        let text = r#"{"phrase": "use {curly} braces"} trailing"#;
        assert_eq!(
            extract_json_object(text),
            Some(r#"{"phrase": "use {curly} braces"}"#)
        );
    }

    #[test]
    fn escaped_quotes_inside_strings_are_handled() {
        let text = r#"{"quote": "she said \"hi\" {x}"}"#;
        assert_eq!(extract_json_object(text), Some(text));
    }

    #[test]
    fn no_object_yields_none() {
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("unbalanced { only"), None);
    }

    #[test]
    fn analysis_prompt_embeds_the_samples() {
        let prompt = build_analysis_prompt("first sample text");
        assert!(prompt.contains("first sample text"));
        assert!(prompt.contains("personalVoice"));
        assert!(prompt.contains("Return ONLY the JSON"));
    }
}
