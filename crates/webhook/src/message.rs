use tracing::{info, warn};

use crate::{
    error::ItemError,
    types::{InboundMessage, MessageContent, Metadata, OutboundMessage},
};

/// Keyword rule producing an automatic text reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoReplyRule {
    pub name: &'static str,
    /// Lowercase substrings, any of which triggers the rule
    pub keywords: &'static [&'static str],
    pub reply: &'static str,
}

pub const GREETING_RULE: AutoReplyRule = AutoReplyRule {
    name: "greeting",
    keywords: &["hello", "hi"],
    reply: "Hello! Thank you for contacting us. 👋",
};

pub const HELP_RULE: AutoReplyRule =
    AutoReplyRule { name: "help", keywords: &["help"], reply: "How can I assist you today?" };

/// Type-switches inbound messages and decides on auto-replies.
///
/// The handler never performs I/O. Replies are returned to the caller, which owns delivery.
#[derive(Debug, Clone)]
pub struct MessageHandler {
    rules: Vec<AutoReplyRule>,
}

impl Default for MessageHandler {
    fn default() -> Self {
        Self::new(vec![GREETING_RULE, HELP_RULE])
    }
}

impl MessageHandler {
    /// Rules are tried in order, the first match wins
    pub fn new(rules: Vec<AutoReplyRule>) -> Self {
        Self { rules }
    }

    /// First rule whose keyword occurs in the lowercased text
    pub fn match_rule(&self, text: &str) -> Option<&AutoReplyRule> {
        let text = text.to_lowercase();
        self.rules.iter().find(|rule| rule.keywords.iter().any(|k| text.contains(k)))
    }

    /// Handle one inbound message, returning the reply to send if any
    pub fn handle(
        &self,
        message: &InboundMessage,
        metadata: &Metadata,
    ) -> Result<Option<OutboundMessage>, ItemError> {
        match message.content()? {
            MessageContent::Text(text) => {
                info!(from = %message.from, message_id = %message.id, body = %text.body, "Text message");

                Ok(self.match_rule(&text.body).map(|rule| {
                    info!(rule = rule.name, to = %message.from, "Auto-reply triggered");
                    OutboundMessage::new(&metadata.phone_number_id, &message.from, rule.reply)
                }))
            }
            MessageContent::Image(media) => {
                info!(from = %message.from, media_id = %media.id, mime_type = ?media.mime_type, caption = ?media.caption, "Image message");
                Ok(None)
            }
            MessageContent::Video(media) => {
                info!(from = %message.from, media_id = %media.id, mime_type = ?media.mime_type, "Video message");
                Ok(None)
            }
            MessageContent::Audio(media) => {
                info!(from = %message.from, media_id = %media.id, mime_type = ?media.mime_type, "Audio message");
                Ok(None)
            }
            MessageContent::Document(media) => {
                info!(from = %message.from, media_id = %media.id, filename = ?media.filename, "Document message");
                Ok(None)
            }
            MessageContent::Location(location) => {
                info!(
                    from = %message.from,
                    latitude = location.latitude,
                    longitude = location.longitude,
                    name = ?location.name,
                    "Location message"
                );
                Ok(None)
            }
            MessageContent::Interactive(interactive) => {
                let reply = interactive.button_reply.as_ref().or(interactive.list_reply.as_ref());
                info!(
                    from = %message.from,
                    interactive_type = %interactive.kind,
                    reply_id = ?reply.map(|r| r.id.as_str()),
                    reply_title = ?reply.map(|r| r.title.as_str()),
                    "Interactive message"
                );
                Ok(None)
            }
            MessageContent::Unsupported(kind) => {
                warn!(from = %message.from, message_id = %message.id, message_type = kind, "Unsupported message type");
                Ok(None)
            }
        }
    }
}
