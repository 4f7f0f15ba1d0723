// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use courier_bus::{CommandHandler, CommandOutcome, QueryHandler};
use courier_core::traits::TemplateRepository;
use courier_core::{Context, CourierError, Page, Template, TemplateId};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::info;

use super::to_data;
use crate::commands::{CreateTemplateCommand, DeleteTemplateCommand, UpdateTemplateCommand};
use crate::events;
use crate::queries::{GetTemplateQuery, ListTemplatesQuery};
use crate::validator::TemplateValidator;

/// Handles template writes and reads.
pub struct TemplateHandlers {
    templates: Arc<dyn TemplateRepository>,
    validator: TemplateValidator,
    writes: Arc<Mutex<()>>,
}

impl TemplateHandlers {
    /// `writes` is shared by every channel and template writer so that a
    /// check and the save that follows it see the same stored state.
    pub fn new(
        templates: Arc<dyn TemplateRepository>,
        validator: TemplateValidator,
        writes: Arc<Mutex<()>>,
    ) -> Self {
        Self {
            templates,
            validator,
            writes,
        }
    }

    async fn load(&self, id: &TemplateId) -> Result<Template, CourierError> {
        self.templates
            .find_by_id(id)
            .await?
            .ok_or_else(|| CourierError::not_found("template", id.as_str()))
    }
}

#[async_trait]
impl CommandHandler<CreateTemplateCommand> for TemplateHandlers {
    async fn handle(
        &self,
        _ctx: &Context,
        command: &CreateTemplateCommand,
    ) -> Result<CommandOutcome, CourierError> {
        let _writes = self.writes.lock().await;
        let template = command.to_template();
        self.validator.validate_for_create(&template).await?;
        self.templates.save(&template).await?;
        info!(template_id = %template.id, channel_type = %template.channel_type, "template created");
        Ok(CommandOutcome::new()
            .with_data(to_data(&template)?)
            .with_event(events::template_created(&template)))
    }
}

#[async_trait]
impl CommandHandler<UpdateTemplateCommand> for TemplateHandlers {
    async fn handle(
        &self,
        _ctx: &Context,
        command: &UpdateTemplateCommand,
    ) -> Result<CommandOutcome, CourierError> {
        let _writes = self.writes.lock().await;
        let existing = self.load(&command.template_id).await?;
        let template = self
            .validator
            .validate_for_update(&existing, &command.patch)
            .await?;
        self.templates.save(&template).await?;
        info!(template_id = %template.id, version = template.version, "template updated");
        Ok(CommandOutcome::new()
            .with_data(to_data(&template)?)
            .with_event(events::template_updated(&template)))
    }
}

#[async_trait]
impl CommandHandler<DeleteTemplateCommand> for TemplateHandlers {
    async fn handle(
        &self,
        _ctx: &Context,
        command: &DeleteTemplateCommand,
    ) -> Result<CommandOutcome, CourierError> {
        let _writes = self.writes.lock().await;
        let existing = self.load(&command.template_id).await?;
        self.validator.validate_for_delete(&existing).await?;
        self.templates.delete(&existing.id).await?;
        info!(template_id = %existing.id, "template deleted");
        Ok(CommandOutcome::new()
            .with_data(json!({ "id": existing.id }))
            .with_event(events::template_deleted(&existing)))
    }
}

#[async_trait]
impl QueryHandler<GetTemplateQuery> for TemplateHandlers {
    async fn handle(
        &self,
        _ctx: &Context,
        query: &GetTemplateQuery,
    ) -> Result<Template, CourierError> {
        self.load(&query.template_id).await
    }
}

#[async_trait]
impl QueryHandler<ListTemplatesQuery> for TemplateHandlers {
    async fn handle(
        &self,
        _ctx: &Context,
        query: &ListTemplatesQuery,
    ) -> Result<Page<Template>, CourierError> {
        self.templates.list(&query.query).await
    }
}
