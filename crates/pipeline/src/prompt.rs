//! Prompt rendering — turns nested knowledge documents into system prompt text.
//!
//! Rendering rules, applied recursively:
//!
//! - **mapping** → one markdown heading per key (`#` at the top, one more `#`
//!   per nesting level, capped at `######`), followed by the rendered value
//! - **sequence of text** → bullet list
//! - **sequence of mappings** → per item, a bold sub-heading taken from its
//!   `name`/`title`/`type` key (when present) followed by the other pairs as
//!   bullets
//! - **text** → paragraph
//!
//! Output order mirrors document order, and rendering is a pure function of
//! the document: the same input always yields byte-identical text.

use concierge_config::PrimaryDocument;
use concierge_config::knowledge::FALLBACK_SYSTEM_PROMPT;
use concierge_core::KnowledgeConfig;
use serde::Serialize;

/// Nesting beyond this depth is dropped from the output.
pub const MAX_DEPTH: usize = 12;

/// Keys whose value titles a sequence item, checked in this order.
const TITLE_KEYS: &[&str] = &["name", "title", "type"];

const MAX_HEADING_LEVEL: usize = 6;

/// The rendered system prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedPrompt {
    /// Behaviour prompt; never empty
    pub primary: String,
    /// Knowledge-base prompt, when a secondary document is loaded
    pub secondary: Option<String>,
}

impl RenderedPrompt {
    /// The built-in prompt with no secondary document.
    pub fn fallback() -> Self {
        Self {
            primary: FALLBACK_SYSTEM_PROMPT.to_string(),
            secondary: None,
        }
    }

    /// Prompts in message order.
    pub fn system_prompts(&self) -> Vec<String> {
        std::iter::once(self.primary.clone())
            .chain(self.secondary.clone())
            .collect()
    }
}

/// Render a primary and an optional secondary document.
///
/// A primary document that renders to nothing yields the built-in prompt.
pub fn render(primary: &KnowledgeConfig, secondary: Option<&KnowledgeConfig>) -> RenderedPrompt {
    render_parts(&[primary], secondary)
}

/// Render a loaded primary document: its behaviour rules, then any other keys.
pub fn render_document(
    document: &PrimaryDocument,
    secondary: Option<&KnowledgeConfig>,
) -> RenderedPrompt {
    render_parts(&document.prompt_parts(), secondary)
}

fn render_parts(primary: &[&KnowledgeConfig], secondary: Option<&KnowledgeConfig>) -> RenderedPrompt {
    let primary = primary
        .iter()
        .map(|part| render_value(part))
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    RenderedPrompt {
        primary: if primary.is_empty() {
            FALLBACK_SYSTEM_PROMPT.to_string()
        } else {
            primary
        },
        secondary: secondary.map(render_value).filter(|text| !text.is_empty()),
    }
}

/// Render a single value as a standalone block of text.
pub fn render_value(value: &KnowledgeConfig) -> String {
    let mut blocks = Vec::new();
    write_value(value, 1, 0, &mut blocks);
    blocks.join("\n\n")
}

fn write_value(value: &KnowledgeConfig, level: usize, depth: usize, blocks: &mut Vec<String>) {
    if depth > MAX_DEPTH {
        tracing::debug!(depth, "Knowledge document nested too deeply, truncating");
        return;
    }

    match value {
        KnowledgeConfig::Text(text) => {
            let text = text.trim();
            if !text.is_empty() {
                blocks.push(text.to_string());
            }
        }
        KnowledgeConfig::Mapping(entries) => {
            for (key, value) in entries {
                if value.is_empty() {
                    continue;
                }
                blocks.push(heading(level, key));
                write_value(value, level + 1, depth + 1, blocks);
            }
        }
        KnowledgeConfig::Sequence(items) => write_sequence(items, level, depth, blocks),
    }
}

fn write_sequence(
    items: &[KnowledgeConfig],
    level: usize,
    depth: usize,
    blocks: &mut Vec<String>,
) {
    // Consecutive text items share one bullet list.
    let mut bullets: Vec<String> = Vec::new();

    for item in items {
        match item {
            KnowledgeConfig::Text(text) => {
                let text = text.trim();
                if !text.is_empty() {
                    bullets.push(format!("- {text}"));
                }
            }
            KnowledgeConfig::Mapping(entries) => {
                flush(&mut bullets, blocks);
                write_item(entries, level, depth + 1, blocks);
            }
            KnowledgeConfig::Sequence(inner) => {
                flush(&mut bullets, blocks);
                if depth < MAX_DEPTH {
                    write_sequence(inner, level, depth + 1, blocks);
                }
            }
        }
    }

    flush(&mut bullets, blocks);
}

/// One sequence item: optional bold title, then its pairs as bullets.
fn write_item(
    entries: &[(String, KnowledgeConfig)],
    level: usize,
    depth: usize,
    blocks: &mut Vec<String>,
) {
    if depth > MAX_DEPTH {
        return;
    }

    let title = title_entry(entries);
    let mut lines: Vec<String> = Vec::new();

    if let Some((_, title)) = title {
        lines.push(format!("**{title}**"));
    }

    for (index, (key, value)) in entries.iter().enumerate() {
        if title.is_some_and(|(i, _)| i == index) || value.is_empty() {
            continue;
        }
        let label = humanize_key(key);
        match value {
            KnowledgeConfig::Text(text) => lines.push(format!("- {label}: {}", text.trim())),
            KnowledgeConfig::Sequence(items) if items.iter().all(is_text) => {
                let joined = items
                    .iter()
                    .filter_map(KnowledgeConfig::as_text)
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
                    .join(", ");
                lines.push(format!("- {label}: {joined}"));
            }
            nested => {
                lines.push(format!("- {label}:"));
                flush(&mut lines, blocks);
                write_value(nested, level, depth + 1, blocks);
            }
        }
    }

    flush(&mut lines, blocks);
}

/// Index and text of the first `name`/`title`/`type` entry with a text value.
fn title_entry(entries: &[(String, KnowledgeConfig)]) -> Option<(usize, &str)> {
    TITLE_KEYS.iter().find_map(|wanted| {
        entries.iter().enumerate().find_map(|(index, (key, value))| {
            let text = value.as_text().map(str::trim).filter(|t| !t.is_empty())?;
            key.eq_ignore_ascii_case(wanted).then_some((index, text))
        })
    })
}

fn is_text(value: &KnowledgeConfig) -> bool {
    matches!(value, KnowledgeConfig::Text(_))
}

fn flush(lines: &mut Vec<String>, blocks: &mut Vec<String>) {
    if !lines.is_empty() {
        blocks.push(lines.join("\n"));
        lines.clear();
    }
}

fn heading(level: usize, key: &str) -> String {
    format!("{} {}", "#".repeat(level.min(MAX_HEADING_LEVEL)), humanize_key(key))
}

/// `openingHours` → `Opening Hours`, `opening_hours` → `Opening hours`.
pub fn humanize_key(key: &str) -> String {
    let mut spaced = String::with_capacity(key.len() + 4);
    let mut prev: Option<char> = None;

    for c in key.chars() {
        if matches!(c, '_' | '-' | '.') || c.is_whitespace() {
            spaced.push(' ');
        } else {
            if c.is_uppercase() && prev.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit()) {
                spaced.push(' ');
            }
            spaced.push(c);
        }
        prev = Some(c);
    }

    let collapsed = spaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(json: &str) -> KnowledgeConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn humanize_keys() {
        assert_eq!(humanize_key("openingHours"), "Opening Hours");
        assert_eq!(humanize_key("opening_hours"), "Opening hours");
        assert_eq!(humanize_key("menu-items"), "Menu items");
        assert_eq!(humanize_key("faq"), "Faq");
        assert_eq!(humanize_key("top10Dishes"), "Top10 Dishes");
        assert_eq!(humanize_key("__"), "");
    }

    #[test]
    fn three_level_document_with_named_items() {
        let config = doc(
            r#"{"restaurant": {"menu": {"mains": [
                {"name": "Picanha", "price": "22€"},
                {"title": "Feijoada", "price": "18€", "tags": ["tradizionale", "piccante"]},
                {"price": "5€"}
            ]}}}"#,
        );
        let rendered = render_value(&config);
        assert_eq!(
            rendered,
            "# Restaurant\n\n## Menu\n\n### Mains\n\n\
             **Picanha**\n- Price: 22€\n\n\
             **Feijoada**\n- Price: 18€\n- Tags: tradizionale, piccante\n\n\
             - Price: 5€"
        );
    }

    #[test]
    fn text_sequence_is_bullet_list() {
        let rendered = render_value(&doc(r#"{"tone": ["Cortese", "Conciso"]}"#));
        assert_eq!(rendered, "# Tone\n\n- Cortese\n- Conciso");
    }

    #[test]
    fn bare_text_is_paragraph() {
        assert_eq!(render_value(&KnowledgeConfig::from("  Sii gentile.  ")), "Sii gentile.");
    }

    #[test]
    fn order_follows_document() {
        let rendered = render_value(&doc(r#"{"zeta": "z", "alpha": "a"}"#));
        assert!(rendered.find("# Zeta").unwrap() < rendered.find("# Alpha").unwrap());
    }

    #[test]
    fn rendering_is_idempotent() {
        let config = doc(r#"{"a": {"b": ["x", {"type": "t", "c": "d"}]}, "e": "f"}"#);
        let first = render(&config, Some(&config));
        let second = render(&config, Some(&config));
        assert_eq!(first, second);
    }

    #[test]
    fn empty_values_are_skipped() {
        let rendered = render_value(&doc(r#"{"empty": "", "none": null, "list": [], "kept": "k"}"#));
        assert_eq!(rendered, "# Kept\n\nk");
    }

    #[test]
    fn heading_level_caps_at_six() {
        let config = doc(r#"{"a":{"b":{"c":{"d":{"e":{"f":{"g":"deep"}}}}}}}"#);
        let rendered = render_value(&config);
        assert!(rendered.contains("###### F"));
        assert!(rendered.contains("###### G"));
        assert!(!rendered.contains("#######"));
    }

    #[test]
    fn excessive_depth_is_truncated_not_fatal() {
        let mut value = KnowledgeConfig::from("bottom");
        for i in 0..40 {
            value = KnowledgeConfig::Mapping(vec![(format!("level{i}"), value)]);
        }
        let rendered = render_value(&value);
        assert!(rendered.contains("# Level39"));
        assert!(!rendered.contains("bottom"));
    }

    #[test]
    fn empty_primary_uses_fallback() {
        let rendered = render(&KnowledgeConfig::Mapping(Vec::new()), None);
        assert_eq!(rendered, RenderedPrompt::fallback());
    }

    #[test]
    fn secondary_is_rendered_when_present() {
        let rendered = render(
            &KnowledgeConfig::from("Regole"),
            Some(&doc(r#"{"hours": "12:30-15:00"}"#)),
        );
        assert_eq!(rendered.primary, "Regole");
        assert_eq!(rendered.secondary.as_deref(), Some("# Hours\n\n12:30-15:00"));
        assert_eq!(rendered.system_prompts().len(), 2);
    }

    #[test]
    fn document_renders_rules_then_extra_keys() {
        let document = PrimaryDocument::from_json(
            r#"{"modelId": "m", "systemPrompt": "Sii gentile.", "contacts": {"phone": "0123"}}"#,
        )
        .unwrap();
        let rendered = render_document(&document, None);
        assert_eq!(rendered.primary, "Sii gentile.\n\n# Contacts\n\n## Phone\n\n0123");
        assert!(!rendered.primary.contains("Model Id"));
    }
}
