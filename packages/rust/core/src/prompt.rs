//! Extraction prompts and search-result context assembly.

use hazfill_shared::schema;

use crate::capability::SearchHit;

/// Hard cap on the tiered extraction context.
pub const MAX_CONTEXT_CHARS: usize = 12_000;

/// Hard cap on fields listed in one prompt.
pub const MAX_PROMPT_FIELDS: usize = 30;

/// Results folded into a general-phase context.
pub const GENERAL_MAX_RESULTS: usize = 5;

/// Per-result cap in the general phase.
pub const GENERAL_SNIPPET_CHARS: usize = 800;

/// Overall cap on a general-phase context.
pub const GENERAL_CONTEXT_CHARS: usize = 3000;

/// Context used when a general search produced nothing.
pub const NO_RESULTS_CONTEXT: &str =
    "No search results available. Provide estimates based on chemical knowledge.";

const RESULT_SEPARATOR: &str = "\n\n---\n\n";

pub const EXTRACTION_SYSTEM_PROMPT: &str = r#"You are an expert in chemical safety and HMIS data extraction.

Extract field values from web search results. Output ONLY valid JSON.

Format:
{"updates": [{"field": "field_name", "value": "extracted value", "confidence": 0.0-1.0, "source_url": "url or null"}]}

Confidence scoring:
- 0.9-1.0: Multiple authoritative sources agree
- 0.7-0.9: One clear authoritative source
- 0.5-0.7: Source found but ambiguous
- 0.3-0.5: Reasonable estimate based on chemical properties
- 0.1-0.3: Best guess when no data available

Rules:
- Extract values found in search results with appropriate confidence
- Provide reasonable estimates when direct data unavailable
- Keep values concise (word/phrase/number+unit)
- ALWAYS provide a value, even if confidence is low"#;

const GENERAL_INSTRUCTION: &str = "IMPORTANT: These are remaining unfilled fields. You MUST provide a value for each field.
- If found in search results: extract with appropriate confidence
- If not found: provide your best estimate based on chemical properties/knowledge
- Mark uncertain estimates with lower confidence (0.1-0.4)
- NEVER leave a field without a value

Fields to fill:";

/// Which phase a prompt is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMode {
    Tier,
    General,
}

/// User prompt listing `fields` (capped) with their descriptions.
pub fn build_extraction_prompt(
    chemical: &str,
    fields: &[&str],
    context: &str,
    mode: PromptMode,
) -> String {
    let field_descs = fields
        .iter()
        .take(MAX_PROMPT_FIELDS)
        .map(|f| format!("- {f}: {}", schema::description(f)))
        .collect::<Vec<_>>()
        .join("\n");

    let instruction = match mode {
        PromptMode::Tier => "Fields to extract:",
        PromptMode::General => GENERAL_INSTRUCTION,
    };

    format!(
        "Chemical: {chemical}\n\n{instruction}\n{field_descs}\n\nSearch results:\n{context}\n\nExtract or estimate ALL field values. Output JSON only."
    )
}

/// Tiered context: `[url]` headed snippets joined by a visible separator.
pub fn build_context(hits: &[SearchHit], max_results: usize, max_snippet_chars: usize) -> String {
    let joined = hits
        .iter()
        .take(max_results)
        .map(|h| format!("[{}]\n{}", h.url, truncate_chars(&h.content, max_snippet_chars)))
        .collect::<Vec<_>>()
        .join(RESULT_SEPARATOR);
    truncate_chars(&joined, MAX_CONTEXT_CHARS).to_string()
}

/// General-phase context; falls back to [`NO_RESULTS_CONTEXT`].
pub fn build_general_context(hits: &[SearchHit]) -> String {
    let parts: Vec<&str> = hits
        .iter()
        .take(GENERAL_MAX_RESULTS)
        .map(|h| truncate_chars(&h.content, GENERAL_SNIPPET_CHARS))
        .filter(|c| !c.is_empty())
        .collect();

    if parts.is_empty() {
        return NO_RESULTS_CONTEXT.to_string();
    }
    truncate_chars(&parts.join("\n\n"), GENERAL_CONTEXT_CHARS).to_string()
}

/// Query terms for a general search: first word of each description.
pub fn general_query(chemical: &str, pending: &[&str]) -> String {
    let terms = pending
        .iter()
        .take(5)
        .filter_map(|f| schema::description(f).split_whitespace().next())
        .collect::<Vec<_>>()
        .join(" ");
    format!("{chemical} chemical properties {terms} SDS")
}

/// Query for a tier search; domain-restricted tiers get the longer form.
pub fn tier_query(chemical: &str, restricted: bool) -> String {
    if restricted {
        format!("{chemical} safety data sheet properties hazards")
    } else {
        format!("{chemical} SDS MSDS")
    }
}

/// Prefix of `s` holding at most `max` characters.
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
