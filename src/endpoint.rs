//! Classification of captured request URLs
//!
//! A transcript source sees every network response of the page. Only two
//! endpoints carry the reply stream: starting a conversation, and posting
//! a response into an existing one.

use regex::Regex;
use std::sync::OnceLock;

/// Endpoint that carries a reply stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// `.../conversations/new`; the conversation id arrives in the body
    NewConversation,
    /// `.../conversations/<id>/responses`
    Responses { conversation_id: String },
}

impl Endpoint {
    /// Classify a URL, returning `None` for untracked endpoints
    pub fn from_url(url: &str) -> Option<Self> {
        static NEW: OnceLock<Regex> = OnceLock::new();
        static RESPONSES: OnceLock<Regex> = OnceLock::new();

        let new = NEW.get_or_init(|| {
            Regex::new(r"/conversations/new(?:[/?#]|$)").expect("valid regex literal")
        });
        let responses = RESPONSES.get_or_init(|| {
            Regex::new(r"/conversations/([^/?#]+)/responses(?:[/?#]|$)")
                .expect("valid regex literal")
        });

        if new.is_match(url) {
            return Some(Endpoint::NewConversation);
        }
        responses
            .captures(url)
            .and_then(|caps| caps.get(1))
            .filter(|id| id.as_str() != "new")
            .map(|id| Endpoint::Responses {
                conversation_id: id.as_str().to_string(),
            })
    }

    /// Known conversation id; `None` until the new-conversation body names one
    pub fn conversation_id(&self) -> Option<&str> {
        match self {
            Endpoint::NewConversation => None,
            Endpoint::Responses { conversation_id } => Some(conversation_id.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_conversation() {
        assert_eq!(
            Endpoint::from_url("https://grok.com/rest/app-chat/conversations/new"),
            Some(Endpoint::NewConversation)
        );
        assert_eq!(
            Endpoint::from_url("https://grok.com/rest/app-chat/conversations/new?x=1"),
            Some(Endpoint::NewConversation)
        );
    }

    #[test]
    fn test_responses_extracts_id() {
        let endpoint = Endpoint::from_url(
            "https://grok.com/rest/app-chat/conversations/8a60082c-d206/responses",
        )
        .unwrap();
        assert_eq!(endpoint.conversation_id(), Some("8a60082c-d206"));
    }

    #[test]
    fn test_untracked_urls() {
        assert_eq!(Endpoint::from_url("https://grok.com/rest/app-chat/conversations"), None);
        assert_eq!(
            Endpoint::from_url("https://grok.com/rest/app-chat/conversations/abc/share"),
            None
        );
        assert_eq!(
            Endpoint::from_url("https://grok.com/rest/app-chat/conversations/newest"),
            None
        );
        assert_eq!(Endpoint::from_url(""), None);
    }
}
