//! Conversation context for code mode.
//!
//! The Exa answer endpoint is single-turn, so prior turns are folded into the
//! query text itself. Only the most recent [`HISTORY_WINDOW`] entries are
//! kept to bound the prompt size.
//!
//! ```text
//! Based on our previous conversation:
//!
//! User: how do I read a file in rust?
//!
//! Assistant: Use std::fs::read_to_string ...
//!
//! Current question: and asynchronously?
//!
//! Please answer considering the context above.
//! ```

use crate::models::ConversationEntry;

/// Maximum number of history entries (three user/assistant exchanges).
pub const HISTORY_WINDOW: usize = 6;

/// Renders the last [`HISTORY_WINDOW`] entries as `"<Role>: <content>"`
/// blocks separated by blank lines, oldest first.
pub fn format_history(history: &[ConversationEntry]) -> String {
    recent(history)
        .iter()
        .map(|entry| format!("{}: {}", entry.role.label(), entry.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Builds the effective query for a code-mode turn.
///
/// Returns `query` unchanged when there is no history.
pub fn build_query_with_context(query: &str, history: &[ConversationEntry]) -> String {
    if recent(history).is_empty() {
        return query.to_string();
    }

    format!(
        "Based on our previous conversation:\n\n{}\n\nCurrent question: {}\n\nPlease answer considering the context above.",
        format_history(history),
        query
    )
}

fn recent(history: &[ConversationEntry]) -> &[ConversationEntry] {
    let start = history.len().saturating_sub(HISTORY_WINDOW);
    &history[start..]
}
