// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-side request types.

use courier_bus::Query;
use courier_core::{
    Channel, ChannelId, CourierError, ListQuery, Message, MessageId, Page, RequestId, Template,
    TemplateId, Timestamp, now_millis,
};
use serde::{Deserialize, Serialize};

macro_rules! query {
    ($ty:ty, $tag:literal, $out:ty) => {
        impl Query for $ty {
            const QUERY_TYPE: &'static str = $tag;

            type Output = $out;

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

macro_rules! get_query {
    ($name:ident, $field:ident, $id:ty, $label:literal) => {
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct $name {
            #[serde(default, rename = "requestId")]
            pub id: RequestId,
            #[serde(default = "now_millis")]
            pub timestamp: Timestamp,
            pub $field: $id,
        }

        impl $name {
            pub fn new($field: $id) -> Self {
                Self {
                    id: RequestId::new(),
                    timestamp: now_millis(),
                    $field,
                }
            }

            fn check(&self) -> Result<(), CourierError> {
                if self.$field.is_empty() {
                    return Err(CourierError::validation($label, "must not be empty"));
                }
                Ok(())
            }
        }
    };
}

macro_rules! list_query {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            #[serde(default, rename = "requestId")]
            pub id: RequestId,
            #[serde(default = "now_millis")]
            pub timestamp: Timestamp,
            #[serde(flatten)]
            pub query: ListQuery,
        }

        impl $name {
            pub fn new(query: ListQuery) -> Self {
                Self {
                    id: RequestId::new(),
                    timestamp: now_millis(),
                    query,
                }
            }

            fn check(&self) -> Result<(), CourierError> {
                self.query.validate()
            }
        }
    };
}

get_query!(GetChannelQuery, channel_id, ChannelId, "channelId");
query!(GetChannelQuery, "channel.get", Channel);

list_query!(ListChannelsQuery);
query!(ListChannelsQuery, "channel.list", Page<Channel>);

get_query!(GetTemplateQuery, template_id, TemplateId, "templateId");
query!(GetTemplateQuery, "template.get", Template);

list_query!(ListTemplatesQuery);
query!(ListTemplatesQuery, "template.list", Page<Template>);

get_query!(GetMessageQuery, message_id, MessageId, "messageId");
query!(GetMessageQuery, "message.get", Message);

list_query!(ListMessagesQuery);
query!(ListMessagesQuery, "message.list", Page<Message>);
