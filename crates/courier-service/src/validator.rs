// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic validation for channel and template writes.
//!
//! These checks need repositories or the channel-type registry, so they run
//! inside handlers rather than in `Command::validate`.

use std::sync::Arc;

use courier_core::query::MAX_LIMIT;
use courier_core::traits::{ChannelRepository, TemplateRepository};
use courier_core::{Channel, ChannelPatch, CourierError, Filter, ListQuery, Template, TemplateId, TemplatePatch};
use courier_registry::ChannelTypeRegistry;
use tracing::warn;

use crate::render::undeclared_placeholders;

/// Checks channel writes against the registry and the stored state.
#[derive(Clone)]
pub struct ChannelValidator {
    channels: Arc<dyn ChannelRepository>,
    templates: Arc<dyn TemplateRepository>,
    registry: Arc<ChannelTypeRegistry>,
}

impl ChannelValidator {
    pub fn new(
        channels: Arc<dyn ChannelRepository>,
        templates: Arc<dyn TemplateRepository>,
        registry: Arc<ChannelTypeRegistry>,
    ) -> Self {
        Self {
            channels,
            templates,
            registry,
        }
    }

    pub async fn validate_for_create(&self, channel: &Channel) -> Result<(), CourierError> {
        check_channel_shape(channel)?;
        self.check_type_and_config(channel)?;
        self.check_name_free(&channel.name, None).await?;
        self.check_template(channel).await
    }

    /// Validates `patch` against `existing` and returns the patched channel.
    pub async fn validate_for_update(
        &self,
        existing: &Channel,
        patch: &ChannelPatch,
    ) -> Result<Channel, CourierError> {
        if let Some(channel_type) = &patch.channel_type {
            if *channel_type != existing.channel_type {
                return Err(CourierError::validation(
                    "channelType",
                    format!(
                        "cannot change from `{}` to `{channel_type}` after creation",
                        existing.channel_type
                    ),
                ));
            }
        }
        let next = existing.apply(patch);
        check_channel_shape(&next)?;
        self.check_type_and_config(&next)?;
        if next.name != existing.name {
            self.check_name_free(&next.name, Some(existing)).await?;
        }
        self.check_template(&next).await?;
        Ok(next)
    }

    /// Nothing blocks a channel delete beyond the channel being live.
    pub async fn validate_for_delete(&self, channel: &Channel) -> Result<(), CourierError> {
        if channel.is_deleted() {
            return Err(CourierError::not_found("channel", channel.id.as_str()));
        }
        Ok(())
    }

    fn check_type_and_config(&self, channel: &Channel) -> Result<(), CourierError> {
        let entry = self.registry.get(&channel.channel_type).map_err(|_| {
            CourierError::validation(
                "channelType",
                format!("unknown channel type `{}`", channel.channel_type),
            )
        })?;
        let channel_type = entry.channel_type();
        channel_type.validate_config(&channel.config)?;

        let accepted = channel_type.recipient_types();
        if let Some((i, r)) = channel
            .recipients
            .iter()
            .enumerate()
            .find(|(_, r)| !accepted.contains(&r.kind))
        {
            return Err(CourierError::validation(
                format!("recipients[{i}].type"),
                format!("`{}` is not accepted by channel type `{}`", r.kind, channel.channel_type),
            ));
        }
        Ok(())
    }

    async fn check_name_free(&self, name: &str, current: Option<&Channel>) -> Result<(), CourierError> {
        let page = self
            .channels
            .list(
                &ListQuery::new()
                    .filter(Filter::eq("name", name))
                    .paginate(MAX_LIMIT, 0),
            )
            .await?;
        let taken = page
            .items
            .iter()
            .any(|c| current.is_none_or(|cur| cur.id != c.id));
        if taken {
            return Err(CourierError::conflict(
                "channel",
                format!("a channel named `{name}` already exists"),
            ));
        }
        Ok(())
    }

    async fn check_template(&self, channel: &Channel) -> Result<(), CourierError> {
        let Some(template_id) = &channel.template_id else {
            return Ok(());
        };
        let template = self
            .templates
            .find_by_id(template_id)
            .await?
            .ok_or_else(|| CourierError::not_found("template", template_id.as_str()))?;
        if template.channel_type != channel.channel_type {
            return Err(CourierError::type_mismatch(
                &channel.channel_type,
                &template.channel_type,
            ));
        }
        Ok(())
    }
}

fn check_channel_shape(channel: &Channel) -> Result<(), CourierError> {
    if channel.name.trim().is_empty() {
        return Err(CourierError::validation("name", "must not be empty"));
    }
    if channel.channel_type.trim().is_empty() {
        return Err(CourierError::validation("channelType", "must not be empty"));
    }
    channel.settings.validate()?;
    if let Some(i) = channel.recipients.iter().position(|r| r.target.trim().is_empty()) {
        return Err(CourierError::validation(
            format!("recipients[{i}].target"),
            "must not be empty",
        ));
    }
    Ok(())
}

fn warn_undeclared(template: &Template) {
    let undeclared = undeclared_placeholders(template);
    if !undeclared.is_empty() {
        warn!(
            template = %template.name,
            variables = ?undeclared,
            "template uses undeclared variables"
        );
    }
}

/// Checks template writes, including references held by live channels.
#[derive(Clone)]
pub struct TemplateValidator {
    channels: Arc<dyn ChannelRepository>,
    templates: Arc<dyn TemplateRepository>,
    registry: Arc<ChannelTypeRegistry>,
}

impl TemplateValidator {
    pub fn new(
        channels: Arc<dyn ChannelRepository>,
        templates: Arc<dyn TemplateRepository>,
        registry: Arc<ChannelTypeRegistry>,
    ) -> Self {
        Self {
            channels,
            templates,
            registry,
        }
    }

    pub async fn validate_for_create(&self, template: &Template) -> Result<(), CourierError> {
        template.validate_shape()?;
        self.check_type(template)?;
        self.check_name_free(&template.name, None).await?;
        warn_undeclared(template);
        Ok(())
    }

    /// Validates `patch` against `existing` and returns the patched template
    /// with its version bumped.
    pub async fn validate_for_update(
        &self,
        existing: &Template,
        patch: &TemplatePatch,
    ) -> Result<Template, CourierError> {
        let next = existing.apply(patch);
        next.validate_shape()?;
        self.check_type(&next)?;
        if next.name != existing.name {
            self.check_name_free(&next.name, Some(&existing.id)).await?;
        }
        if next.channel_type != existing.channel_type {
            let users = self.referencing_channels(&existing.id).await?;
            if !users.is_empty() {
                return Err(CourierError::conflict(
                    "template",
                    format!(
                        "cannot change channel type while referenced by {} channel(s)",
                        users.len()
                    ),
                ));
            }
        }
        warn_undeclared(&next);
        Ok(next)
    }

    /// Deletion is refused while any live channel references the template.
    pub async fn validate_for_delete(&self, template: &Template) -> Result<(), CourierError> {
        let users = self.referencing_channels(&template.id).await?;
        if let Some(first) = users.first() {
            return Err(CourierError::conflict(
                "template",
                format!(
                    "template {} is referenced by channel `{}` ({} total)",
                    template.id,
                    first.name,
                    users.len()
                ),
            ));
        }
        Ok(())
    }

    async fn referencing_channels(&self, id: &TemplateId) -> Result<Vec<Channel>, CourierError> {
        let page = self
            .channels
            .list(
                &ListQuery::new()
                    .filter(Filter::eq("templateId", id.as_str()))
                    .paginate(MAX_LIMIT, 0),
            )
            .await?;
        Ok(page.items)
    }

    fn check_type(&self, template: &Template) -> Result<(), CourierError> {
        if self.registry.contains(&template.channel_type) {
            Ok(())
        } else {
            Err(CourierError::validation(
                "channelType",
                format!("unknown channel type `{}`", template.channel_type),
            ))
        }
    }

    async fn check_name_free(&self, name: &str, current: Option<&TemplateId>) -> Result<(), CourierError> {
        let page = self
            .templates
            .list(
                &ListQuery::new()
                    .filter(Filter::eq("name", name))
                    .paginate(MAX_LIMIT, 0),
            )
            .await?;
        if page.items.iter().any(|t| current != Some(&t.id)) {
            return Err(CourierError::conflict(
                "template",
                format!("a template named `{name}` already exists"),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Fixture, StubType, fixture};
    use courier_core::{Recipient, RecipientType};
    use serde_json::json;

    fn channel_validator(fx: &Fixture) -> ChannelValidator {
        ChannelValidator::new(fx.channels.clone(), fx.templates.clone(), Arc::clone(&fx.registry))
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn undeclared_template_variables_are_logged() {
        let fx = fixture(vec![StubType::new("email")]).await;
        let validator = TemplateValidator::new(
            fx.channels.clone(),
            fx.templates.clone(),
            Arc::clone(&fx.registry),
        );
        let t = Template::new("t", "email", "Hi {{name}}");
        validator.validate_for_create(&t).await.unwrap();
        assert!(logs_contain("template uses undeclared variables"));
    }

    #[tokio::test]
    async fn config_is_checked_against_schema() {
        let fx = fixture(vec![StubType::new("email")]).await;
        let config = json!({"region": 5}).as_object().cloned().unwrap();
        let ch = Channel::new("ops", "email").with_config(config);
        assert!(channel_validator(&fx).validate_for_create(&ch).await.is_err());
    }

    #[tokio::test]
    async fn unsupported_recipient_kind_is_rejected() {
        let fx = fixture(vec![StubType::new("email")]).await;
        let ch = Channel::new("ops", "email")
            .with_recipients(vec![Recipient::to("a").with_kind(RecipientType::Bcc)]);
        let err = channel_validator(&fx).validate_for_create(&ch).await.unwrap_err();
        assert!(matches!(err, CourierError::Validation { field, .. } if field == "recipients[0].type"));
    }

    #[tokio::test]
    async fn template_of_other_type_is_mismatch() {
        let fx = fixture(vec![StubType::new("email"), StubType::new("sms")]).await;
        let t = fx.template(Template::new("t", "sms", "b")).await;
        let ch = Channel::new("ops", "email").with_template(t.id);
        let err = channel_validator(&fx).validate_for_create(&ch).await.unwrap_err();
        assert!(matches!(err, CourierError::TypeMismatch { .. }));
    }

    #[tokio::test]
    async fn missing_template_is_not_found() {
        let fx = fixture(vec![StubType::new("email")]).await;
        let ch = Channel::new("ops", "email").with_template(TemplateId::from("ghost"));
        let err = channel_validator(&fx).validate_for_create(&ch).await.unwrap_err();
        assert!(matches!(err, CourierError::NotFound { .. }));
    }

    #[tokio::test]
    async fn rename_to_own_name_is_allowed() {
        let fx = fixture(vec![StubType::new("email")]).await;
        let ch = fx.channel(Channel::new("ops", "email")).await;
        let patch = ChannelPatch {
            name: Some("ops".into()),
            enabled: Some(false),
            ..ChannelPatch::default()
        };
        let next = channel_validator(&fx)
            .validate_for_update(&ch, &patch)
            .await
            .unwrap();
        assert!(!next.enabled);
    }

    #[tokio::test]
    async fn template_names_are_unique() {
        let fx = fixture(vec![StubType::new("email")]).await;
        fx.template(Template::new("welcome", "email", "b")).await;
        let v = TemplateValidator::new(fx.channels.clone(), fx.templates.clone(), Arc::clone(&fx.registry));
        let err = v
            .validate_for_create(&Template::new("welcome", "email", "c"))
            .await
            .unwrap_err();
        assert!(matches!(err, CourierError::Conflict { .. }));
    }
}
