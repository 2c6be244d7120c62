//! Header-only message records.

use mail_parser::{HeaderValue, MessageParser};

/// The headers of one message, decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMessage {
    pub uid: u32,
    /// Decoded subject, empty if the header is missing.
    pub subject: String,
    /// First entry of the `References` header.
    pub references: Option<String>,
    pub message_id: Option<String>,
}

impl HeaderMessage {
    /// Decode a raw RFC 5322 header block.
    pub fn from_headers(uid: u32, raw: &[u8]) -> Self {
        let Some(parsed) = MessageParser::default().parse_headers(raw) else {
            return Self {
                uid,
                subject: String::new(),
                references: None,
                message_id: None,
            };
        };

        let references = match parsed.references() {
            HeaderValue::Text(id) => Some(id.to_string()),
            HeaderValue::TextList(ids) => ids.first().map(|id| id.to_string()),
            _ => None,
        };

        Self {
            uid,
            subject: parsed.subject().unwrap_or_default().to_string(),
            references,
            message_id: parsed.message_id().map(str::to_string),
        }
    }

    /// The header that identifies the GitHub object: `References`, else `Message-Id`.
    pub fn reference_header(&self) -> Option<&str> {
        self.references
            .as_deref()
            .or(self.message_id.as_deref())
            .filter(|r| !r.trim().is_empty())
    }
}
