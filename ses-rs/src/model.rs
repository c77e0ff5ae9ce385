//! Request and response shapes for the send API
//!
//! Field names follow the provider's PascalCase JSON layout so existing
//! clients can point at the simulator unchanged.

use serde::{Deserialize, Serialize};

/// Outgoing email request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EmailRequest {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub destination: Destination,
    #[serde(default)]
    pub message: Message,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration_set_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reply_to_addresses: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_path_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

impl EmailRequest {
    /// Body text of the message
    pub fn body_text(&self) -> &str {
        &self.message.body.text.data
    }

    /// Subject line of the message
    pub fn subject(&self) -> &str {
        &self.message.subject.data
    }
}

/// Recipient lists
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    #[serde(rename = "ToAddresses", default)]
    pub to: Vec<String>,
    #[serde(rename = "CcAddresses", default)]
    pub cc: Vec<String>,
    #[serde(rename = "BccAddresses", default)]
    pub bcc: Vec<String>,
}

impl Destination {
    /// All recipients in to, cc, bcc order. Duplicates are kept.
    pub fn all(&self) -> Vec<&str> {
        self.to
            .iter()
            .chain(self.cc.iter())
            .chain(self.bcc.iter())
            .map(String::as_str)
            .collect()
    }

    /// Total recipient count, duplicates included
    pub fn len(&self) -> usize {
        self.to.len() + self.cc.len() + self.bcc.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Message {
    #[serde(default)]
    pub subject: Content,
    #[serde(default)]
    pub body: Body,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Body {
    #[serde(default)]
    pub text: Content,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Content {
    #[serde(default)]
    pub data: String,
}

/// Opaque message tag, passed through untouched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub name: String,
    pub value: String,
}

/// Successful send result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendEmailResponse {
    #[serde(rename = "MessageId")]
    pub message_id: String,
}
