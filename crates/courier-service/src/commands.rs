// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Write-side request types.
//!
//! Each command deserializes from the camelCase JSON used by the HTTP and
//! broker adapters and checks its own payload. Checks that need storage or
//! the registry live in the handlers.

use std::collections::BTreeMap;

use courier_bus::Command;
use courier_core::{
    Channel, ChannelId, ChannelOverride, ChannelPatch, CommonSettings, CourierError, Message,
    MessageSettings, Recipient, RequestId, Template, TemplateId, TemplatePatch, TemplateVariable,
    Timestamp, Variables, now_millis,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

macro_rules! command {
    ($ty:ty, $tag:literal) => {
        impl Command for $ty {
            const COMMAND_TYPE: &'static str = $tag;

            fn id(&self) -> &RequestId {
                &self.id
            }

            fn timestamp(&self) -> Timestamp {
                self.timestamp
            }

            fn validate(&self) -> Result<(), CourierError> {
                self.check()
            }
        }
    };
}

fn default_enabled() -> bool {
    true
}

fn require_id(field: &str, empty: bool) -> Result<(), CourierError> {
    if empty {
        return Err(CourierError::validation(field, "must not be empty"));
    }
    Ok(())
}

fn check_recipients(field: &str, recipients: &[Recipient]) -> Result<(), CourierError> {
    match recipients.iter().position(|r| r.target.trim().is_empty()) {
        Some(i) => Err(CourierError::validation(
            format!("{field}[{i}].target"),
            "must not be empty",
        )),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChannelCommand {
    #[serde(default, rename = "requestId")]
    pub id: RequestId,
    #[serde(default = "now_millis")]
    pub timestamp: Timestamp,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub channel_type: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub template_id: Option<TemplateId>,
    #[serde(default)]
    pub settings: CommonSettings,
    #[serde(default)]
    pub config: Map<String, Value>,
    #[serde(default)]
    pub recipients: Vec<Recipient>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CreateChannelCommand {
    pub fn new(name: impl Into<String>, channel_type: impl Into<String>) -> Self {
        Self {
            id: RequestId::new(),
            timestamp: now_millis(),
            name: name.into(),
            description: None,
            channel_type: channel_type.into(),
            enabled: true,
            template_id: None,
            settings: CommonSettings::default(),
            config: Map::new(),
            recipients: Vec::new(),
            tags: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: Map<String, Value>) -> Self {
        self.config = config;
        self
    }

    pub fn with_recipients(mut self, recipients: Vec<Recipient>) -> Self {
        self.recipients = recipients;
        self
    }

    pub fn with_template(mut self, template_id: TemplateId) -> Self {
        self.template_id = Some(template_id);
        self
    }

    pub fn with_settings(mut self, settings: CommonSettings) -> Self {
        self.settings = settings;
        self
    }

    /// The channel this command would create, with a fresh id.
    pub fn to_channel(&self) -> Channel {
        let mut channel = Channel::new(self.name.trim(), self.channel_type.trim())
            .with_config(self.config.clone())
            .with_recipients(self.recipients.clone())
            .with_settings(self.settings.clone())
            .with_enabled(self.enabled);
        channel.description = self.description.clone();
        channel.template_id = self.template_id.clone();
        channel.tags = self.tags.clone();
        channel
    }

    fn check(&self) -> Result<(), CourierError> {
        require_id("name", self.name.trim().is_empty())?;
        require_id("channelType", self.channel_type.trim().is_empty())?;
        if let Some(template_id) = &self.template_id {
            require_id("templateId", template_id.is_empty())?;
        }
        self.settings.validate()?;
        check_recipients("recipients", &self.recipients)
    }
}

command!(CreateChannelCommand, "channel.create");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChannelCommand {
    #[serde(default, rename = "requestId")]
    pub id: RequestId,
    #[serde(default = "now_millis")]
    pub timestamp: Timestamp,
    pub channel_id: ChannelId,
    #[serde(flatten)]
    pub patch: ChannelPatch,
}

impl UpdateChannelCommand {
    pub fn new(channel_id: ChannelId, patch: ChannelPatch) -> Self {
        Self {
            id: RequestId::new(),
            timestamp: now_millis(),
            channel_id,
            patch,
        }
    }

    fn check(&self) -> Result<(), CourierError> {
        require_id("channelId", self.channel_id.is_empty())?;
        if self.patch.is_empty() {
            return Err(CourierError::validation("patch", "no fields to update"));
        }
        if let Some(name) = &self.patch.name {
            require_id("name", name.trim().is_empty())?;
        }
        if let Some(settings) = &self.patch.settings {
            settings.validate()?;
        }
        if let Some(recipients) = &self.patch.recipients {
            check_recipients("recipients", recipients)?;
        }
        Ok(())
    }
}

command!(UpdateChannelCommand, "channel.update");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteChannelCommand {
    #[serde(default, rename = "requestId")]
    pub id: RequestId,
    #[serde(default = "now_millis")]
    pub timestamp: Timestamp,
    pub channel_id: ChannelId,
}

impl DeleteChannelCommand {
    pub fn new(channel_id: ChannelId) -> Self {
        Self {
            id: RequestId::new(),
            timestamp: now_millis(),
            channel_id,
        }
    }

    fn check(&self) -> Result<(), CourierError> {
        require_id("channelId", self.channel_id.is_empty())
    }
}

command!(DeleteChannelCommand, "channel.delete");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplateCommand {
    #[serde(default, rename = "requestId")]
    pub id: RequestId,
    #[serde(default = "now_millis")]
    pub timestamp: Timestamp,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub channel_type: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub body: String,
    #[serde(default)]
    pub variables: Vec<TemplateVariable>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub settings: Map<String, Value>,
}

impl CreateTemplateCommand {
    pub fn new(
        name: impl Into<String>,
        channel_type: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: RequestId::new(),
            timestamp: now_millis(),
            name: name.into(),
            description: None,
            channel_type: channel_type.into(),
            subject: None,
            body: body.into(),
            variables: Vec::new(),
            tags: Vec::new(),
            settings: Map::new(),
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_variables(mut self, variables: Vec<TemplateVariable>) -> Self {
        self.variables = variables;
        self
    }

    pub fn to_template(&self) -> Template {
        let mut template = Template::new(self.name.trim(), self.channel_type.trim(), self.body.clone())
            .with_variables(self.variables.clone());
        template.subject = self.subject.clone();
        template.description = self.description.clone();
        template.tags = self.tags.clone();
        template.settings = self.settings.clone();
        template
    }

    fn check(&self) -> Result<(), CourierError> {
        self.to_template().validate_shape()
    }
}

command!(CreateTemplateCommand, "template.create");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTemplateCommand {
    #[serde(default, rename = "requestId")]
    pub id: RequestId,
    #[serde(default = "now_millis")]
    pub timestamp: Timestamp,
    pub template_id: TemplateId,
    #[serde(flatten)]
    pub patch: TemplatePatch,
}

impl UpdateTemplateCommand {
    pub fn new(template_id: TemplateId, patch: TemplatePatch) -> Self {
        Self {
            id: RequestId::new(),
            timestamp: now_millis(),
            template_id,
            patch,
        }
    }

    fn check(&self) -> Result<(), CourierError> {
        require_id("templateId", self.template_id.is_empty())?;
        if self.patch == TemplatePatch::default() {
            return Err(CourierError::validation("patch", "no fields to update"));
        }
        if let Some(name) = &self.patch.name {
            require_id("name", name.trim().is_empty())?;
        }
        if let Some(body) = &self.patch.body {
            require_id("body", body.trim().is_empty())?;
        }
        Ok(())
    }
}

command!(UpdateTemplateCommand, "template.update");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTemplateCommand {
    #[serde(default, rename = "requestId")]
    pub id: RequestId,
    #[serde(default = "now_millis")]
    pub timestamp: Timestamp,
    pub template_id: TemplateId,
}

impl DeleteTemplateCommand {
    pub fn new(template_id: TemplateId) -> Self {
        Self {
            id: RequestId::new(),
            timestamp: now_millis(),
            template_id,
        }
    }

    fn check(&self) -> Result<(), CourierError> {
        require_id("templateId", self.template_id.is_empty())
    }
}

command!(DeleteTemplateCommand, "template.delete");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageCommand {
    #[serde(default, rename = "requestId")]
    pub id: RequestId,
    #[serde(default = "now_millis")]
    pub timestamp: Timestamp,
    pub channel_ids: Vec<ChannelId>,
    pub template_id: TemplateId,
    #[serde(default)]
    pub variables: Variables,
    #[serde(default)]
    pub recipients: Vec<Recipient>,
    #[serde(default)]
    pub overrides: BTreeMap<ChannelId, ChannelOverride>,
    #[serde(default)]
    pub settings: MessageSettings,
}

impl SendMessageCommand {
    pub fn new(channel_ids: Vec<ChannelId>, template_id: TemplateId) -> Self {
        Self {
            id: RequestId::new(),
            timestamp: now_millis(),
            channel_ids,
            template_id,
            variables: Variables::new(),
            recipients: Vec::new(),
            overrides: BTreeMap::new(),
            settings: MessageSettings::default(),
        }
    }

    pub fn with_variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_recipients(mut self, recipients: Vec<Recipient>) -> Self {
        self.recipients = recipients;
        self
    }

    pub fn with_override(mut self, channel_id: ChannelId, patch: ChannelOverride) -> Self {
        self.overrides.insert(channel_id, patch);
        self
    }

    pub fn with_settings(mut self, settings: MessageSettings) -> Self {
        self.settings = settings;
        self
    }

    /// A pending message aggregate for this request.
    pub fn to_message(&self) -> Result<Message, CourierError> {
        Ok(Message::new(&self.channel_ids, self.template_id.clone())?
            .with_variables(self.variables.clone())
            .with_recipients(self.recipients.clone())
            .with_overrides(self.overrides.clone())
            .with_settings(self.settings.clone()))
    }

    fn check(&self) -> Result<(), CourierError> {
        if self.channel_ids.is_empty() {
            return Err(CourierError::validation(
                "channelIds",
                "at least one channel is required",
            ));
        }
        if let Some(i) = self.channel_ids.iter().position(ChannelId::is_empty) {
            return Err(CourierError::validation(
                format!("channelIds[{i}]"),
                "must not be empty",
            ));
        }
        require_id("templateId", self.template_id.is_empty())?;
        self.settings.validate()?;
        check_recipients("recipients", &self.recipients)?;
        for (channel_id, patch) in &self.overrides {
            if !self.channel_ids.contains(channel_id) {
                return Err(CourierError::validation(
                    "overrides",
                    format!("channel {channel_id} is not part of this message"),
                ));
            }
            check_recipients("overrides.recipients", &patch.recipients)?;
        }
        Ok(())
    }
}

command!(SendMessageCommand, "message.send");

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn send_requires_channels() {
        let cmd = SendMessageCommand::new(vec![], TemplateId::from("t"));
        let err = cmd.validate().unwrap_err();
        assert!(matches!(err, CourierError::Validation { field, .. } if field == "channelIds"));
    }

    #[test]
    fn send_rejects_override_for_foreign_channel() {
        let cmd = SendMessageCommand::new(vec![ChannelId::from("a")], TemplateId::from("t"))
            .with_override(ChannelId::from("b"), ChannelOverride::default());
        assert!(cmd.validate().is_err());
    }

    #[test]
    fn send_deserializes_from_wire_json() {
        let cmd: SendMessageCommand = serde_json::from_value(json!({
            "channelIds": ["c1", "c1", "c2"],
            "templateId": "t1",
            "variables": {"n": "Jo"},
            "settings": {"retryAttempts": 2, "retryDelay": 0}
        }))
        .unwrap();
        assert!(cmd.validate().is_ok());
        assert_eq!(cmd.settings.retry_attempts, Some(2));
        let msg = cmd.to_message().unwrap();
        assert_eq!(msg.channel_ids.len(), 2);
    }

    #[test]
    fn update_channel_flattens_patch() {
        let cmd: UpdateChannelCommand = serde_json::from_value(json!({
            "channelId": "c1",
            "name": "renamed",
            "enabled": false
        }))
        .unwrap();
        assert_eq!(cmd.patch.name.as_deref(), Some("renamed"));
        assert_eq!(cmd.patch.enabled, Some(false));
        assert!(cmd.validate().is_ok());
    }

    #[test]
    fn empty_patch_is_rejected() {
        let cmd = UpdateTemplateCommand::new(TemplateId::from("t"), TemplatePatch::default());
        assert!(cmd.validate().is_err());
    }

    #[test]
    fn create_template_checks_shape() {
        let cmd = CreateTemplateCommand::new("t", "email", "  ");
        assert!(matches!(
            cmd.validate().unwrap_err(),
            CourierError::Validation { field, .. } if field == "body"
        ));
        assert_eq!(CreateTemplateCommand::COMMAND_TYPE, "template.create");
    }

    #[test]
    fn create_channel_builds_entity() {
        let cmd = CreateChannelCommand::new(" ops ", "email")
            .with_recipients(vec![Recipient::to("a@x")]);
        assert!(cmd.validate().is_ok());
        let channel = cmd.to_channel();
        assert_eq!(channel.name, "ops");
        assert_eq!(channel.recipients.len(), 1);
    }
}
