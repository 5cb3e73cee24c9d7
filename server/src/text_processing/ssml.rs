/// SSML document construction for podcast narration
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SENTENCE_REGEX: Regex = Regex::new(r"[^.!?]+[.!?]").unwrap();
    static ref KEYWORD_REGEX: Regex =
        Regex::new(r"(?i)\b(important|key|critical|remember|core)\b").unwrap();
    /// Case-sensitive on purpose: "Is" opening a question reads differently
    static ref DEFINITION_REGEX: Regex = Regex::new(r"\b(is|are|refers to|means)\b").unwrap();
}

/// Sentences this short that define something are read slightly slower
const DEFINITION_MAX_CHARS: usize = 160;
const PAUSE_EVERY: usize = 2;
const PAUSE_TAG: &str = r#"<break time="400ms"/>"#;

/// Split text into sentences ending in `.`, `!` or `?`
///
/// Text with no terminator at all is one sentence. A trailing fragment
/// without a terminator is kept as the final sentence so no words are lost.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut last_end = 0;

    for m in SENTENCE_REGEX.find_iter(text) {
        sentences.push(m.as_str());
        last_end = m.end();
    }

    if sentences.is_empty() {
        return vec![text];
    }

    let rest = text[last_end..].trim_start_matches(&['.', '!', '?'][..]);
    if !rest.trim().is_empty() {
        sentences.push(rest);
    }

    sentences
}

/// Build the `<speak>` document for `text`
pub fn build_ssml(text: &str) -> String {
    let mut ssml = String::with_capacity(text.len() + text.len() / 4 + 16);
    ssml.push_str("<speak>");

    for (i, sentence) in split_sentences(text).into_iter().enumerate() {
        let trimmed = sentence.trim();
        if trimmed.is_empty() {
            continue;
        }

        let escaped = escape_xml(trimmed);
        let mut line = KEYWORD_REGEX
            .replace_all(&escaped, r#"<emphasis level="moderate">$0</emphasis>"#)
            .into_owned();

        if DEFINITION_REGEX.is_match(&line) && line.chars().count() < DEFINITION_MAX_CHARS {
            line = format!(r#"<prosody rate="95%">{}</prosody>"#, line);
        }

        ssml.push_str(&line);
        if (i + 1) % PAUSE_EVERY == 0 {
            ssml.push_str(PAUSE_TAG);
        } else {
            ssml.push(' ');
        }
    }

    ssml.push_str("</speak>");
    ssml
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sentences() {
        assert_eq!(
            split_sentences("One. Two! Three?"),
            vec!["One.", " Two!", " Three?"]
        );
    }

    #[test]
    fn test_split_without_terminator_is_single_sentence() {
        assert_eq!(split_sentences("no punctuation here"), vec!["no punctuation here"]);
    }

    #[test]
    fn test_split_keeps_trailing_fragment() {
        assert_eq!(
            split_sentences("Complete sentence. And a tail"),
            vec!["Complete sentence.", " And a tail"]
        );
    }

    #[test]
    fn test_split_ignores_trailing_punctuation_run() {
        assert_eq!(split_sentences("Wait... what"), vec!["Wait.", " what"]);
        assert_eq!(split_sentences("Really?!"), vec!["Really?"]);
    }

    #[test]
    fn test_wraps_in_speak() {
        let ssml = build_ssml("Hello there.");
        assert_eq!(ssml, "<speak>Hello there. </speak>");
    }

    #[test]
    fn test_break_after_every_second_sentence() {
        let ssml = build_ssml("One. Two. Three. Four.");
        assert_eq!(
            ssml,
            r#"<speak>One. Two.<break time="400ms"/>Three. Four.<break time="400ms"/></speak>"#
        );
    }

    #[test]
    fn test_emphasis_on_keywords() {
        let ssml = build_ssml("Remember this KEY fact.");
        assert_eq!(
            ssml,
            r#"<speak><emphasis level="moderate">Remember</emphasis> this <emphasis level="moderate">KEY</emphasis> fact. </speak>"#
        );
    }

    #[test]
    fn test_emphasis_requires_whole_word() {
        let ssml = build_ssml("The keyboard has keys.");
        assert!(!ssml.contains("emphasis"));
    }

    #[test]
    fn test_prosody_on_short_definitions() {
        let ssml = build_ssml("Osmosis is the movement of water.");
        assert_eq!(
            ssml,
            r#"<speak><prosody rate="95%">Osmosis is the movement of water.</prosody> </speak>"#
        );
    }

    #[test]
    fn test_no_prosody_for_long_definitions() {
        let long = format!("A cell is {} long.", "very ".repeat(40));
        let ssml = build_ssml(&long);
        assert!(!ssml.contains("prosody"));
    }

    #[test]
    fn test_definition_match_is_case_sensitive() {
        let ssml = build_ssml("Is this right?");
        assert!(!ssml.contains("prosody"));
    }

    #[test]
    fn test_escapes_markup_characters() {
        let ssml = build_ssml("Use <b> & enjoy.");
        assert_eq!(ssml, "<speak>Use &lt;b&gt; &amp; enjoy. </speak>");
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(build_ssml(""), "<speak></speak>");
        assert_eq!(build_ssml("   "), "<speak></speak>");
    }

    #[test]
    fn test_deterministic() {
        let text = "The core idea is simple. Remember it! What means more?";
        assert_eq!(build_ssml(text), build_ssml(text));
    }
}
