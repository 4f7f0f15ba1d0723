// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message template entity.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CourierError;
use crate::ids::{TemplateId, Timestamp, now_millis};

/// A variable a template declares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateVariable {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    /// Used when the caller omits the variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TemplateVariable {
    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
            default: None,
            description: None,
        }
    }

    pub fn required(name: impl Into<String>) -> Self {
        Self {
            required: true,
            ..Self::optional(name)
        }
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }
}

/// A reusable, versioned message body for one channel type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: TemplateId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub channel_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub body: String,
    #[serde(default)]
    pub variables: Vec<TemplateVariable>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub settings: Map<String, Value>,
    /// Starts at 1 and increments on every update.
    pub version: u32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<Timestamp>,
}

impl Template {
    pub fn new(
        name: impl Into<String>,
        channel_type: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        let now = now_millis();
        Self {
            id: TemplateId::new(),
            name: name.into(),
            description: None,
            channel_type: channel_type.into(),
            subject: None,
            body: body.into(),
            variables: Vec::new(),
            tags: Vec::new(),
            settings: Map::new(),
            version: 1,
            created_at: now,
            updated_at: now,
            deleted_at: None,
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

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn mark_deleted(&mut self) {
        let now = now_millis();
        self.deleted_at = Some(now);
        self.updated_at = now;
    }

    /// Checks the fields that need no outside knowledge.
    pub fn validate_shape(&self) -> Result<(), CourierError> {
        if self.name.trim().is_empty() {
            return Err(CourierError::validation("name", "must not be empty"));
        }
        if self.channel_type.trim().is_empty() {
            return Err(CourierError::validation("channelType", "must not be empty"));
        }
        if self.body.trim().is_empty() {
            return Err(CourierError::validation("body", "must not be empty"));
        }
        let mut seen = HashSet::new();
        for var in &self.variables {
            if var.name.trim().is_empty() {
                return Err(CourierError::validation(
                    "variables",
                    "variable name must not be empty",
                ));
            }
            if !seen.insert(var.name.as_str()) {
                return Err(CourierError::validation(
                    "variables",
                    format!("variable `{}` declared twice", var.name),
                ));
            }
        }
        Ok(())
    }

    /// Returns a copy with the patch applied and the version incremented.
    pub fn apply(&self, patch: &TemplatePatch) -> Template {
        let mut next = self.clone();
        if let Some(name) = &patch.name {
            next.name = name.clone();
        }
        if let Some(description) = &patch.description {
            next.description = Some(description.clone());
        }
        if let Some(channel_type) = &patch.channel_type {
            next.channel_type = channel_type.clone();
        }
        if let Some(subject) = &patch.subject {
            next.subject = Some(subject.clone());
        }
        if let Some(body) = &patch.body {
            next.body = body.clone();
        }
        if let Some(variables) = &patch.variables {
            next.variables = variables.clone();
        }
        if let Some(tags) = &patch.tags {
            next.tags = tags.clone();
        }
        if let Some(settings) = &patch.settings {
            next.settings = settings.clone();
        }
        next.version = self.version.saturating_add(1);
        next.updated_at = now_millis().max(self.updated_at);
        next
    }
}

/// Replacement values for a template update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TemplatePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub channel_type: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub variables: Option<Vec<TemplateVariable>>,
    pub tags: Option<Vec<String>>,
    pub settings: Option<Map<String, Value>>,
}
