//! Message assembly — the final ordered sequence sent to the completion endpoint.
//!
//! Ordering is fixed:
//!
//! 1. **System prompts**, in the order given
//! 2. **History**, chronological, untouched
//! 3. **Temporal context** system message (if any)
//! 4. **Search context** system message (if any)
//! 5. **The user message**, always exactly one and always last
//!
//! # Determinism
//!
//! Assembly never reads the clock or mutates its inputs: identical inputs
//! always produce identical outputs.

use concierge_core::message::Message;

/// All inputs required to assemble one completion request.
#[derive(Debug, Clone, Copy)]
pub struct AssemblyInput<'a> {
    /// Rendered system prompts (behaviour, then knowledge base)
    pub system_prompts: &'a [String],
    /// Prior turns in chronological order
    pub history: &'a [Message],
    /// Operational-status text
    pub temporal_context: Option<&'a str>,
    /// Web-search augmentation text
    pub search_context: Option<&'a str>,
    /// The current user turn
    pub user_message: &'a str,
}

pub fn assemble(input: &AssemblyInput<'_>) -> Vec<Message> {
    let mut messages = Vec::with_capacity(
        input.system_prompts.len() + input.history.len() + 3,
    );

    messages.extend(input.system_prompts.iter().map(Message::system));
    messages.extend(input.history.iter().cloned());
    messages.extend(input.temporal_context.map(Message::system));
    messages.extend(input.search_context.map(Message::system));
    messages.push(Message::user(input.user_message));

    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_core::message::Role;

    fn history() -> Vec<Message> {
        vec![
            Message::user("Ciao"),
            Message::assistant("Benvenuto!"),
            Message::user("Siete aperti?"),
            Message::assistant("Sì, fino al 15 settembre."),
        ]
    }

    #[test]
    fn full_ordering() {
        let prompts = vec!["behaviour".to_string(), "knowledge".to_string()];
        let history = history();
        let messages = assemble(&AssemblyInput {
            system_prompts: &prompts,
            history: &history,
            temporal_context: Some("temporal"),
            search_context: Some("search"),
            user_message: "Che tempo fa oggi?",
        });

        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(
            contents,
            vec![
                "behaviour",
                "knowledge",
                "Ciao",
                "Benvenuto!",
                "Siete aperti?",
                "Sì, fino al 15 settembre.",
                "temporal",
                "search",
                "Che tempo fa oggi?",
            ]
        );
        assert_eq!(messages[6].role, Role::System);
        assert_eq!(messages[7].role, Role::System);
    }

    #[test]
    fn exactly_one_trailing_user_message() {
        let history = history();
        let messages = assemble(&AssemblyInput {
            system_prompts: &[],
            history: &history,
            temporal_context: None,
            search_context: None,
            user_message: "E domani?",
        });

        assert_eq!(messages.len(), history.len() + 1);
        let last = messages.last().unwrap();
        assert_eq!(last.role, Role::User);
        assert_eq!(last.content, "E domani?");
        assert_eq!(&messages[..history.len()], history.as_slice());
    }

    #[test]
    fn search_without_temporal_sits_before_user() {
        let prompts = vec!["behaviour".to_string()];
        let messages = assemble(&AssemblyInput {
            system_prompts: &prompts,
            history: &[],
            temporal_context: None,
            search_context: Some("search"),
            user_message: "news",
        });
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].content, "search");
        assert!(messages[2].is_user());
    }

    #[test]
    fn inputs_are_untouched_and_output_is_stable() {
        let prompts = vec!["p".to_string()];
        let history = history();
        let input = AssemblyInput {
            system_prompts: &prompts,
            history: &history,
            temporal_context: Some("t"),
            search_context: None,
            user_message: "u",
        };
        let first = assemble(&input);
        let second = assemble(&input);
        assert_eq!(first, second);
        assert_eq!(history, self::history());
    }
}
