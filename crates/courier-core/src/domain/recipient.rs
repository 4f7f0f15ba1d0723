// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification recipients.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How a recipient is addressed. Channel types may define their own kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum RecipientType {
    #[default]
    To,
    Cc,
    Bcc,
    Custom(String),
}

impl fmt::Display for RecipientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecipientType::To => f.write_str("to"),
            RecipientType::Cc => f.write_str("cc"),
            RecipientType::Bcc => f.write_str("bcc"),
            RecipientType::Custom(kind) => f.write_str(kind),
        }
    }
}

impl FromStr for RecipientType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "" => Err("recipient type must not be empty".to_string()),
            "to" => Ok(RecipientType::To),
            "cc" => Ok(RecipientType::Cc),
            "bcc" => Ok(RecipientType::Bcc),
            _ => Ok(RecipientType::Custom(trimmed.to_string())),
        }
    }
}

impl From<RecipientType> for String {
    fn from(value: RecipientType) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for RecipientType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A single addressee of a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Address in the channel's native format (email, phone number, channel name).
    pub target: String,
    #[serde(rename = "type", default)]
    pub kind: RecipientType,
}

impl Recipient {
    /// A `to` recipient without a display name.
    pub fn to(target: impl Into<String>) -> Self {
        Self {
            name: None,
            target: target.into(),
            kind: RecipientType::To,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_kind(mut self, kind: RecipientType) -> Self {
        self.kind = kind;
        self
    }
}

/// Concatenates recipient lists, keeping the first occurrence of each target.
pub fn merge_recipients<'a, I>(lists: I) -> Vec<Recipient>
where
    I: IntoIterator<Item = &'a [Recipient]>,
{
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for list in lists {
        for recipient in list {
            if seen.insert(recipient.target.clone()) {
                merged.push(recipient.clone());
            }
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipient_type_parses_known_and_custom() {
        assert_eq!("TO".parse::<RecipientType>().unwrap(), RecipientType::To);
        assert_eq!("bcc".parse::<RecipientType>().unwrap(), RecipientType::Bcc);
        assert_eq!(
            "thread".parse::<RecipientType>().unwrap(),
            RecipientType::Custom("thread".into())
        );
        assert!("".parse::<RecipientType>().is_err());
    }

    #[test]
    fn recipient_json_uses_type_key() {
        let r = Recipient::to("a@example.com").with_kind(RecipientType::Cc);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["type"], "cc");
        assert!(json.get("name").is_none());

        let parsed: Recipient = serde_json::from_str(r#"{"target":"b@example.com"}"#).unwrap();
        assert_eq!(parsed.kind, RecipientType::To);
    }

    #[test]
    fn merge_keeps_first_occurrence() {
        let a = vec![Recipient::to("x").with_name("first"), Recipient::to("y")];
        let b = vec![Recipient::to("x").with_name("second"), Recipient::to("z")];
        let merged = merge_recipients([a.as_slice(), b.as_slice()]);
        let targets: Vec<_> = merged.iter().map(|r| r.target.as_str()).collect();
        assert_eq!(targets, ["x", "y", "z"]);
        assert_eq!(merged[0].name.as_deref(), Some("first"));
    }
}
