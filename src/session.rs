//! Client-side conversation state.
//!
//! A [`Session`] owns the append-only message log of one interactive run.
//! Each submission appends a pending [`Message`]; when its call settles the
//! message is patched in place by id. Several messages may be pending at once
//! and settle in any order, so callers always address messages by
//! [`MessageId`], never by position.
//!
//! ```text
//! submit ──▶ Pending ──┬──▶ Resolved(Payload)
//!                      └──▶ Errored(String)
//! ```

use std::fmt;

use uuid::Uuid;

use crate::models::{AnswerResponse, ConversationEntry, Mode, ResearchReport, SearchResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(Uuid);

impl MessageId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Settled result of a mode call.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Results(SearchResponse),
    Answer(AnswerResponse),
    Research(ResearchReport),
}

impl Payload {
    /// Text that represents this payload as an assistant turn, if any.
    pub fn answer_text(&self) -> Option<&str> {
        match self {
            Payload::Answer(answer) => Some(&answer.answer),
            Payload::Research(report) => report.output.as_ref().map(|o| o.content.as_str()),
            Payload::Results(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessageState {
    Pending,
    Resolved(Payload),
    Errored(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub mode: Mode,
    pub query: String,
    pub state: MessageState,
}

impl Message {
    pub fn is_pending(&self) -> bool {
        matches!(self.state, MessageState::Pending)
    }
}

#[derive(Debug, Default)]
pub struct Session {
    messages: Vec<Message>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a pending message. Blank queries are ignored.
    pub fn submit(&mut self, mode: Mode, query: impl Into<String>) -> Option<MessageId> {
        let query = query.into();
        if query.trim().is_empty() {
            return None;
        }

        let id = MessageId::new();
        self.messages.push(Message {
            id,
            mode,
            query,
            state: MessageState::Pending,
        });
        Some(id)
    }

    /// Patches a pending message with its outcome.
    ///
    /// Returns `false` if the id is unknown or the message already settled.
    pub fn settle(&mut self, id: MessageId, outcome: Result<Payload, String>) -> bool {
        let Some(message) = self.messages.iter_mut().find(|m| m.id == id) else {
            return false;
        };
        if !message.is_pending() {
            return false;
        }

        message.state = match outcome {
            Ok(payload) => MessageState::Resolved(payload),
            Err(error) => MessageState::Errored(error),
        };
        true
    }

    /// Resubmits an errored message as a new pending one.
    pub fn retry(&mut self, id: MessageId) -> Option<MessageId> {
        let message = self.get(id)?;
        if !matches!(message.state, MessageState::Errored(_)) {
            return None;
        }
        let (mode, query) = (message.mode, message.query.clone());
        self.submit(mode, query)
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn pending_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_pending()).count()
    }

    /// Most recent errored message, the target of a bare "try again".
    pub fn last_errored(&self) -> Option<MessageId> {
        self.messages
            .iter()
            .rev()
            .find(|m| matches!(m.state, MessageState::Errored(_)))
            .map(|m| m.id)
    }

    /// Conversation history for `mode` made of the messages before `before`
    /// (or all of them when `None`).
    ///
    /// Every earlier query of the mode becomes a user entry; an assistant
    /// entry follows when that message resolved with answer text.
    pub fn history(&self, mode: Mode, before: Option<MessageId>) -> Vec<ConversationEntry> {
        let mut entries = Vec::new();
        for message in &self.messages {
            if Some(message.id) == before {
                break;
            }
            if message.mode != mode {
                continue;
            }
            entries.push(ConversationEntry::user(message.query.clone()));
            if let MessageState::Resolved(payload) = &message.state {
                if let Some(text) = payload.answer_text() {
                    entries.push(ConversationEntry::assistant(text));
                }
            }
        }
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn answer(text: &str) -> Payload {
        Payload::Answer(AnswerResponse {
            answer: text.to_string(),
            citations: Vec::new(),
        })
    }

    #[test]
    fn test_blank_submission_ignored() {
        let mut session = Session::new();
        assert!(session.submit(Mode::Answer, "   ").is_none());
        assert!(session.messages().is_empty());
    }

    #[test]
    fn test_out_of_order_settlement_keeps_order() {
        let mut session = Session::new();
        let first = session.submit(Mode::Answer, "slow").unwrap();
        let second = session.submit(Mode::Search, "fast").unwrap();
        assert_eq!(session.pending_count(), 2);

        assert!(session.settle(second, Err("boom".into())));
        assert!(session.settle(first, Ok(answer("done"))));

        let queries: Vec<&str> = session.messages().iter().map(|m| m.query.as_str()).collect();
        assert_eq!(queries, vec!["slow", "fast"]);
        assert_eq!(session.get(second).unwrap().state, MessageState::Errored("boom".into()));
        assert_eq!(session.pending_count(), 0);
    }

    #[test]
    fn test_settle_only_once() {
        let mut session = Session::new();
        let id = session.submit(Mode::Answer, "q").unwrap();
        assert!(session.settle(id, Ok(answer("a"))));
        assert!(!session.settle(id, Err("late".into())));
        assert_eq!(session.get(id).unwrap().state, MessageState::Resolved(answer("a")));
    }

    #[test]
    fn test_retry_appends_new_message() {
        let mut session = Session::new();
        let id = session.submit(Mode::Code, "borrow checker?").unwrap();
        assert!(session.retry(id).is_none(), "pending messages cannot be retried");

        session.settle(id, Err("Exa API error".into()));
        assert_eq!(session.last_errored(), Some(id));
        let again = session.retry(id).unwrap();
        assert_ne!(again, id);
        let retried = session.get(again).unwrap();
        assert_eq!(retried.mode, Mode::Code);
        assert_eq!(retried.query, "borrow checker?");
        assert!(retried.is_pending());
    }

    #[test]
    fn test_history_for_mode() {
        let mut session = Session::new();
        let a = session.submit(Mode::Code, "first").unwrap();
        session.settle(a, Ok(answer("first answer")));
        let s = session.submit(Mode::Search, "unrelated").unwrap();
        session.settle(s, Err("x".into()));
        let b = session.submit(Mode::Code, "second").unwrap();
        session.settle(b, Err("failed".into()));
        let c = session.submit(Mode::Code, "third").unwrap();

        let history = session.history(Mode::Code, Some(c));
        assert_eq!(history.len(), 3);
        assert_eq!(history[0], ConversationEntry::user("first"));
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[1].content, "first answer");
        assert_eq!(history[2], ConversationEntry::user("second"));
    }
}
