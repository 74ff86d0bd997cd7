//! Prompt construction: the style directive (system message) and the
//! content brief (user message).

use chrono::{DateTime, Utc};
use std::fmt::Write as _;

use pulse_core::voice::StyleParameters;
use pulse_core::VoiceProfile;
use pulse_db::ContentPoolItem;

use crate::categorize::Tiers;

const PRIMARY_SNIPPET_CHARS: usize = 300;
const EVERGREEN_SNIPPET_CHARS: usize = 200;

/// Build the system message steering tone and structure.
///
/// Untrained (or absent) profiles fall back to the documented default
/// style: professional tone, no emoji, lists allowed.
#[must_use]
pub fn build_style_directive(profile: Option<&VoiceProfile>) -> String {
    let default_style = StyleParameters::default();
    let style = profile
        .filter(|p| p.trained)
        .map_or(&default_style, |p| &p.style_parameters);

    let mut directive = String::from(
        "You are an expert newsletter writer creating engaging, timely, \
         well-structured newsletters for a content creator.\n\n",
    );

    let tone = enum_name(style.tone);
    let energy = enum_name(style.energy_level);
    let voice = enum_name(style.personal_voice);

    let _ = writeln!(directive, "Writing style:");
    let _ = writeln!(directive, "- Tone: {tone}");
    let _ = writeln!(directive, "- Energy: {energy}");
    let _ = writeln!(directive, "- Narrative voice: {voice}");
    let _ = writeln!(
        directive,
        "- Target sentence length: about {} words",
        style.avg_sentence_length
    );
    let _ = writeln!(
        directive,
        "- Use emojis: {}",
        if style.use_emojis { "yes" } else { "no" }
    );
    let _ = writeln!(
        directive,
        "- Format: {}",
        if style.use_lists {
            "use bullet points and lists for readability"
        } else {
            "use flowing paragraphs"
        }
    );

    if let Some(profile) = profile.filter(|p| p.trained) {
        let words = &profile.vocabulary.signature_words;
        if !words.is_empty() {
            let _ = writeln!(
                directive,
                "- Work in the author's signature words where natural: {}",
                words.join(", ")
            );
        }
        let avoided = &profile.vocabulary.avoided_words;
        if !avoided.is_empty() {
            let _ = writeln!(directive, "- Never use these words: {}", avoided.join(", "));
        }
    }

    directive.push_str(
        "\nNewsletter structure:\n\
         1. Subject line as the very first line of output - max 60 characters, \
         creates curiosity, no clickbait.\n\
         2. Hook opening: 2-3 sentences teasing the most exciting content.\n\
         3. \"What's Hot Right Now\" - roughly 70% of the newsletter, covering the \
         PRIMARY CONTENT items: headline, 2-3 sentence summary, key takeaway, link.\n\
         4. \"Worth Your Time\" - roughly 20%, covering the EVERGREEN CONTENT \
         items with a more analytical framing.\n\
         5. \"On The Radar\" - roughly 10%, brief bullets on the TRENDING TOPICS.\n\
         6. Closing call-to-action encouraging a reply or share, teasing the next issue.\n\n\
         Quality rules: write in Markdown with ## section headers; link every claim \
         inline to its source URL; mention engagement numbers when notable; never \
         fabricate content that is not in the brief.\n",
    );

    directive
}

/// Serialize the three tiers into the user message.
#[must_use]
pub fn build_content_brief(tiers: &Tiers, now: DateTime<Utc>) -> String {
    let mut brief = String::from("Generate a newsletter using this content:\n\n");

    if !tiers.primary.is_empty() {
        brief.push_str("## PRIMARY CONTENT (last 48 hours - 70% of newsletter)\n\n");
        for (index, item) in tiers.primary.iter().enumerate() {
            push_item(&mut brief, index, item, now, PRIMARY_SNIPPET_CHARS, true);
        }
    }

    if !tiers.evergreen.is_empty() {
        brief.push_str("## EVERGREEN CONTENT (last 7 days - 20% of newsletter)\n\n");
        for (index, item) in tiers.evergreen.iter().enumerate() {
            push_item(&mut brief, index, item, now, EVERGREEN_SNIPPET_CHARS, false);
        }
    }

    if !tiers.trending.is_empty() {
        brief.push_str("## TRENDING TOPICS (last 72 hours - 10% of newsletter)\n\n");
        for item in &tiers.trending {
            let _ = writeln!(
                brief,
                "- {} ({}) - {}",
                item.title,
                item.source_type,
                format_engagement(item)
            );
        }
        brief.push('\n');
    }

    brief.push_str(
        "\nIMPORTANT: structure the newsletter with proper sections and engaging \
         copy, and keep the content distribution close to the 70/20/10 split.",
    );

    brief
}

fn push_item(
    brief: &mut String,
    index: usize,
    item: &ContentPoolItem,
    now: DateTime<Utc>,
    snippet_chars: usize,
    with_engagement: bool,
) {
    let _ = writeln!(brief, "### Item {}", index + 1);
    let _ = writeln!(brief, "- Title: {}", item.title);
    let _ = writeln!(brief, "- Source: {}", item.source_type);
    let _ = writeln!(brief, "- Author: {}", item.author);
    let _ = writeln!(
        brief,
        "- Published: {}",
        time_since_published(item.published_at, now)
    );
    let _ = writeln!(brief, "- Content: {}...", snippet(&item.content_text, snippet_chars));
    let _ = writeln!(brief, "- URL: {}", item.url);
    if with_engagement {
        let _ = writeln!(brief, "- Engagement: {}", format_engagement(item));
    }
    brief.push('\n');
}

/// The serde rename of a style enum value: the same lowercase token the
/// analysis payload uses.
fn enum_name<T: serde::Serialize>(value: T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(ToOwned::to_owned))
        .unwrap_or_default()
}

/// First `max` characters of a body, on a char boundary.
#[must_use]
pub fn snippet(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Humanise how long ago an item was published.
#[must_use]
pub fn time_since_published(published_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(published_at);
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();

    if hours < 1 {
        "Less than 1 hour ago".to_string()
    } else if hours < 24 {
        format!("{hours} hours ago")
    } else if days == 1 {
        "1 day ago".to_string()
    } else if days < 7 {
        format!("{days} days ago")
    } else {
        format!("{} weeks ago", days / 7)
    }
}

/// Summarise engagement, mentioning only non-zero counters with abbreviated
/// numbers. Shares are excluded: reposts double-count the likes signal in
/// practice and read oddly in a brief.
#[must_use]
pub fn format_engagement(item: &ContentPoolItem) -> String {
    let mut parts = Vec::new();

    if item.engagement_views > 0 {
        parts.push(format!("{} views", format_count(item.engagement_views)));
    }
    if item.engagement_likes > 0 {
        parts.push(format!("{} likes", format_count(item.engagement_likes)));
    }
    if item.engagement_comments > 0 {
        parts.push(format!("{} comments", format_count(item.engagement_comments)));
    }

    if parts.is_empty() {
        "No engagement data".to_string()
    } else {
        parts.join(", ")
    }
}

/// Abbreviate large counts: 1500 → "1.5K", 2_100_000 → "2.1M".
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_count(count: i64) -> String {
    if count >= 1_000_000 {
        format!("{:.1}M", count as f64 / 1_000_000.0)
    } else if count >= 1_000 {
        format!("{:.1}K", count as f64 / 1_000.0)
    } else {
        count.to_string()
    }
}
