//! Recognition result parsing and transcript reassembly
//!
//! The result endpoint streams one JSON object per line. Each line may carry
//! a raw `final` block or a `finalRefinement` with normalized text; within a
//! line the refinement is preferred, across lines the first fragment seen for
//! a given `finalIndex` wins. Fragments are reassembled in numeric index
//! order regardless of arrival order.

use crate::SpeechResult;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

/// Channel carrying the lecture audio; other channels are ignored
const PRIMARY_CHANNEL: &str = "0";

/// One recognized utterance, positioned by its index in the recording
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptFragment {
    pub final_index: u64,
    pub text: String,
}

#[derive(Debug, Deserialize)]
struct RecognitionLine {
    result: Option<LineResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LineResult {
    channel_tag: Option<String>,
    final_refinement: Option<FinalRefinement>,
    #[serde(rename = "final")]
    final_block: Option<FinalBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinalRefinement {
    normalized_text: Option<AlternativeList>,
    #[serde(default, deserialize_with = "index_from_string_or_number")]
    final_index: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinalBlock {
    #[serde(default)]
    alternatives: Vec<Alternative>,
    #[serde(default, deserialize_with = "index_from_string_or_number")]
    final_index: u64,
}

#[derive(Debug, Deserialize)]
struct AlternativeList {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    text: Option<String>,
}

/// The service emits `finalIndex` as either a JSON number or a string
fn index_from_string_or_number<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(value) => Ok(value),
        Raw::Text(text) => text.parse().map_err(serde::de::Error::custom),
    }
}

fn first_text(alternatives: &[Alternative]) -> Option<String> {
    alternatives
        .iter()
        .find_map(|alternative| alternative.text.clone())
}

/// Parse a newline-delimited recognition payload into ordered fragments
///
/// # Errors
///
/// Returns an error when a line is not valid JSON or carries an index that
/// is neither a number nor a numeric string.
pub fn parse_recognition_lines(body: &str) -> SpeechResult<Vec<TranscriptFragment>> {
    let mut fragments = Vec::new();

    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parsed: RecognitionLine = serde_json::from_str(line)?;
        let Some(result) = parsed.result else {
            continue;
        };

        if result.channel_tag.as_deref() != Some(PRIMARY_CHANNEL) {
            continue;
        }

        if let Some(refinement) = result.final_refinement {
            let Some(normalized) = refinement.normalized_text else {
                continue;
            };
            if let Some(text) = first_text(&normalized.alternatives) {
                fragments.push(TranscriptFragment {
                    final_index: refinement.final_index,
                    text,
                });
            }
        } else if let Some(final_block) = result.final_block {
            if let Some(text) = first_text(&final_block.alternatives) {
                fragments.push(TranscriptFragment {
                    final_index: final_block.final_index,
                    text,
                });
            }
        }
    }

    Ok(fragments)
}

/// Join fragments into one transcript: first fragment per index wins,
/// indices ascend numerically
#[must_use]
pub fn assemble_transcript(fragments: &[TranscriptFragment]) -> String {
    let mut by_index: BTreeMap<u64, &str> = BTreeMap::new();
    for fragment in fragments {
        by_index.entry(fragment.final_index).or_insert(&fragment.text);
    }

    by_index
        .values()
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(final_index: u64, text: &str) -> TranscriptFragment {
        TranscriptFragment {
            final_index,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_assemble_sorts_by_numeric_index() {
        let fragments = vec![
            fragment(10, "last"),
            fragment(2, "middle"),
            fragment(1, "first"),
        ];

        assert_eq!(assemble_transcript(&fragments), "first middle last");
    }

    #[test]
    fn test_assemble_first_fragment_per_index_wins() {
        let fragments = vec![
            fragment(1, "kept"),
            fragment(1, "discarded"),
            fragment(2, "tail"),
        ];

        assert_eq!(assemble_transcript(&fragments), "kept tail");
    }

    #[test]
    fn test_assemble_empty_input() {
        assert_eq!(assemble_transcript(&[]), "");
    }

    #[test]
    fn test_parse_takes_raw_final_alternatives() {
        let body = r#"{"result":{"channelTag":"0","final":{"alternatives":[{"text":"hello"}],"finalIndex":0}}}
{"result":{"channelTag":"0","final":{"alternatives":[{"text":"world"}],"finalIndex":1}}}"#;

        let fragments = parse_recognition_lines(body).unwrap();
        assert_eq!(fragments, vec![fragment(0, "hello"), fragment(1, "world")]);
    }

    #[test]
    fn test_parse_prefers_refinement_within_line() {
        let body = r#"{"result":{"channelTag":"0","finalRefinement":{"normalizedText":{"alternatives":[{"text":"Normalized."}]},"finalIndex":0},"final":{"alternatives":[{"text":"raw"}],"finalIndex":0}}}"#;

        let fragments = parse_recognition_lines(body).unwrap();
        assert_eq!(fragments, vec![fragment(0, "Normalized.")]);
    }

    #[test]
    fn test_parse_keeps_earlier_line_for_same_index() {
        let body = r#"{"result":{"channelTag":"0","final":{"alternatives":[{"text":"raw first"}],"finalIndex":3}}}
{"result":{"channelTag":"0","finalRefinement":{"normalizedText":{"alternatives":[{"text":"Refined later."}]},"finalIndex":3}}}"#;

        let fragments = parse_recognition_lines(body).unwrap();
        assert_eq!(
            assemble_transcript(&fragments),
            "raw first",
        );
    }

    #[test]
    fn test_parse_skips_other_channels_and_missing_results() {
        let body = r#"{"result":{"channelTag":"1","final":{"alternatives":[{"text":"other channel"}],"finalIndex":0}}}
{"sessionUuid":{"uuid":"abc"}}
{"result":{"final":{"alternatives":[{"text":"untagged"}],"finalIndex":0}}}
{"result":{"channelTag":"0","final":{"alternatives":[{"text":"kept"}],"finalIndex":0}}}"#;

        let fragments = parse_recognition_lines(body).unwrap();
        assert_eq!(fragments, vec![fragment(0, "kept")]);
    }

    #[test]
    fn test_parse_accepts_string_and_numeric_indices() {
        let body = r#"{"result":{"channelTag":"0","final":{"alternatives":[{"text":"two"}],"finalIndex":"2"}}}
{"result":{"channelTag":"0","final":{"alternatives":[{"text":"one"}],"finalIndex":1}}}"#;

        let fragments = parse_recognition_lines(body).unwrap();
        assert_eq!(assemble_transcript(&fragments), "one two");
    }

    #[test]
    fn test_parse_missing_index_defaults_to_zero() {
        let body = r#"{"result":{"channelTag":"0","final":{"alternatives":[{"text":"solo"}]}}}"#;

        let fragments = parse_recognition_lines(body).unwrap();
        assert_eq!(fragments, vec![fragment(0, "solo")]);
    }

    #[test]
    fn test_parse_refinement_without_normalized_text_is_skipped() {
        let body = r#"{"result":{"channelTag":"0","finalRefinement":{"finalIndex":5}}}
{"result":{"channelTag":"0","final":{"alternatives":[{"text":"kept"}],"finalIndex":6}}}"#;

        let fragments = parse_recognition_lines(body).unwrap();
        assert_eq!(fragments, vec![fragment(6, "kept")]);
    }

    #[test]
    fn test_parse_first_alternative_with_text_wins() {
        let body = r#"{"result":{"channelTag":"0","final":{"alternatives":[{"confidence":1.0},{"text":"second"},{"text":"third"}],"finalIndex":0}}}"#;

        let fragments = parse_recognition_lines(body).unwrap();
        assert_eq!(fragments, vec![fragment(0, "second")]);
    }

    #[test]
    fn test_parse_rejects_malformed_line() {
        let body = "{\"result\":{\"channelTag\":\"0\"}}\nnot json";
        assert!(parse_recognition_lines(body).is_err());
    }

    #[test]
    fn test_parse_rejects_non_numeric_string_index() {
        let body = r#"{"result":{"channelTag":"0","final":{"alternatives":[{"text":"x"}],"finalIndex":"abc"}}}"#;
        assert!(parse_recognition_lines(body).is_err());
    }
}
