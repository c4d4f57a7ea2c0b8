//! Webhook payload structures for the WhatsApp Business Cloud API.
//!
//! Only the envelope itself is decoded strictly. Entries, changes, contacts, messages and
//! statuses are decoded per item so one malformed item never hides its siblings.

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::ItemError;

/// `object` discriminator of WhatsApp Business webhooks
pub const WHATSAPP_OBJECT: &str = "whatsapp_business_account";

/// `field` of changes carrying messages and statuses
pub const MESSAGES_FIELD: &str = "messages";

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    pub object: String,
    pub entry: Vec<Lenient<Entry>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Entry {
    /// WhatsApp Business Account id
    #[serde(default)]
    pub id: Option<String>,
    pub changes: Vec<Lenient<Change>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Change {
    pub field: String,
    /// Shape depends on `field`, decoded with [`Change::messages_value`]
    #[serde(default)]
    pub value: Value,
}

impl Change {
    /// Decode the value of a `messages` change
    pub fn messages_value(&self) -> Result<ChangeValue, ItemError> {
        ChangeValue::deserialize(&self.value).map_err(|e| ItemError::MalformedChange(e.to_string()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub messaging_product: Option<String>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub contacts: Vec<Lenient<Contact>>,
    #[serde(default)]
    pub messages: Option<Vec<Lenient<InboundMessage>>>,
    #[serde(default)]
    pub statuses: Option<Vec<Lenient<StatusUpdate>>>,
}

impl ChangeValue {
    /// Profile name of a sender, if the change carried one
    pub fn contact_name(&self, wa_id: &str) -> Option<&str> {
        self.contacts
            .iter()
            .filter_map(Lenient::as_valid)
            .find(|c| c.wa_id.as_deref() == Some(wa_id))
            .and_then(|c| c.profile.as_ref())
            .and_then(|p| p.name.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Metadata {
    pub phone_number_id: String,
    #[serde(default)]
    pub display_phone_number: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub wa_id: Option<String>,
    #[serde(default)]
    pub profile: Option<Profile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub name: Option<String>,
}

/// An item that either decoded into `T` or is kept as raw JSON with the decode error
#[derive(Debug, Clone)]
pub enum Lenient<T> {
    Valid(T),
    Malformed { raw: Value, reason: String },
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Lenient<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Ok(match T::deserialize(&raw) {
            Ok(item) => Self::Valid(item),
            Err(e) => Self::Malformed { raw, reason: e.to_string() },
        })
    }
}

impl<T> Lenient<T> {
    pub fn as_valid(&self) -> Option<&T> {
        match self {
            Self::Valid(item) => Some(item),
            Self::Malformed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    pub from: String,
    pub id: String,
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<TextPayload>,
    #[serde(default)]
    pub image: Option<MediaPayload>,
    #[serde(default)]
    pub video: Option<MediaPayload>,
    #[serde(default)]
    pub audio: Option<MediaPayload>,
    #[serde(default)]
    pub document: Option<MediaPayload>,
    #[serde(default)]
    pub location: Option<LocationPayload>,
    #[serde(default)]
    pub interactive: Option<InteractivePayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextPayload {
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaPayload {
    pub id: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationPayload {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractivePayload {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub button_reply: Option<InteractiveReply>,
    #[serde(default)]
    pub list_reply: Option<InteractiveReply>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractiveReply {
    pub id: String,
    pub title: String,
}

/// Typed view of an inbound message keyed on its `type`
#[derive(Debug, Clone, Copy)]
pub enum MessageContent<'a> {
    Text(&'a TextPayload),
    Image(&'a MediaPayload),
    Video(&'a MediaPayload),
    Audio(&'a MediaPayload),
    Document(&'a MediaPayload),
    Location(&'a LocationPayload),
    Interactive(&'a InteractivePayload),
    Unsupported(&'a str),
}

impl InboundMessage {
    /// Resolve the `type` discriminator to its payload.
    ///
    /// Unknown types map to [`MessageContent::Unsupported`]. A known type without its payload
    /// object is an error.
    pub fn content(&self) -> Result<MessageContent<'_>, ItemError> {
        fn require<'a, P>(
            payload: &'a Option<P>,
            message: &InboundMessage,
        ) -> Result<&'a P, ItemError> {
            payload.as_ref().ok_or_else(|| ItemError::MissingPayload {
                message_id: message.id.clone(),
                kind: message.kind.clone(),
            })
        }

        Ok(match self.kind.as_str() {
            "text" => MessageContent::Text(require(&self.text, self)?),
            "image" => MessageContent::Image(require(&self.image, self)?),
            "video" => MessageContent::Video(require(&self.video, self)?),
            "audio" => MessageContent::Audio(require(&self.audio, self)?),
            "document" => MessageContent::Document(require(&self.document, self)?),
            "location" => MessageContent::Location(require(&self.location, self)?),
            "interactive" => MessageContent::Interactive(require(&self.interactive, self)?),
            other => MessageContent::Unsupported(other),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub recipient_id: Option<String>,
    #[serde(default)]
    pub errors: Vec<StatusError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusError {
    pub code: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_data: Option<Value>,
}

/// Delivery status discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind<'a> {
    Sent,
    Delivered,
    Read,
    Failed,
    Unknown(&'a str),
}

impl StatusUpdate {
    pub fn kind(&self) -> StatusKind<'_> {
        match self.status.as_str() {
            "sent" => StatusKind::Sent,
            "delivered" => StatusKind::Delivered,
            "read" => StatusKind::Read,
            "failed" => StatusKind::Failed,
            other => StatusKind::Unknown(other),
        }
    }
}

/// A text reply addressed from one of our phone numbers to a WhatsApp user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub phone_number_id: String,
    pub to: String,
    pub body: String,
}

impl OutboundMessage {
    pub fn new(
        phone_number_id: impl Into<String>,
        to: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self { phone_number_id: phone_number_id.into(), to: to.into(), body: body.into() }
    }

    /// Request body for the Graph API messages endpoint
    pub fn request(&self) -> SendMessageRequest<'_> {
        SendMessageRequest {
            messaging_product: "whatsapp",
            to: &self.to,
            kind: "text",
            text: TextBody { body: &self.body },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SendMessageRequest<'a> {
    pub messaging_product: &'static str,
    pub to: &'a str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: TextBody<'a>,
}

#[derive(Debug, Serialize)]
pub struct TextBody<'a> {
    pub body: &'a str,
}
