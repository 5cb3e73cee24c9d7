//! Prompt templates sent to the text provider.

/// Study-guide prompt for the summary endpoint
pub fn summary_prompt(notes: &str) -> String {
    format!(
        "You are an AI tutor that transforms student lecture notes into comprehensive, in-depth study guides. \
Your summaries should be detailed, educational, and help students learn the material thoroughly.

Transform these lecture notes into a detailed study guide:

{notes}

Format your response using markdown with:
- **Bold headers** for main sections
- Clear explanations with examples
- Key points highlighted
- Relevant details that help students understand and remember the material

Make the summary comprehensive and study-worthy - students should be able to learn from this summary alone."
    )
}

/// Spoken-script prompt for the podcast endpoint
pub fn podcast_script_prompt(summary: &str) -> String {
    format!(
        "You are an engaging tutor creating a high-quality spoken podcast script from the study summary.

REQUIREMENTS:
- Plain host dialogue only (no labels, no brackets, no markdown).
- Target length: 700-900 words (balanced depth, not rambling).
- Conversational, varied sentence lengths, rhetorical questions for engagement.
- Include 2-3 concise examples or analogies when helpful.
- Use natural phrasing with contractions (it's, we're, don't).
- Avoid filler openings; start directly with the topic.
- No lists, bullets, headings, stage directions, or meta commentary.

Summary:
{summary}

Return ONLY the host's spoken words."
    )
}

/// JSON flashcard prompt asking for exactly `count` cards
pub fn flashcards_prompt(notes: &str, count: u32) -> String {
    format!(
        r#"Generate exactly {count} flashcards from these lecture notes:

{notes}

Format your response as a JSON array of objects with "q" (question) and "a" (answer) properties. Make questions specific and answers concise but complete.

Example format:
[
  {{"q": "What is...", "a": "It is..."}},
  {{"q": "How does...", "a": "It works by..."}}
]

Return ONLY the JSON array, no other text."#
    )
}
