// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel-type registry.
//!
//! The `ChannelTypeRegistry` stores `ChannelTypeEntry` records keyed by
//! channel-type name. It is built mutably at startup and then shared behind an
//! `Arc`; the only interior mutability is each entry's sender cache, which
//! holds one sender per timeout bucket.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use courier_core::traits::{ChannelType, Sender};
use courier_core::CourierError;
use tracing::{debug, warn};

/// Sender timeouts are rounded up to one of these, so an entry caches at most
/// this many senders. Callers enforce their exact deadline themselves.
pub const SENDER_TIMEOUT_BUCKETS: [Duration; 8] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(5),
    Duration::from_secs(10),
    Duration::from_secs(30),
    Duration::from_secs(60),
    Duration::from_secs(120),
    Duration::from_secs(300),
];

/// The smallest bucket not below `timeout`, or the largest bucket.
pub fn timeout_bucket(timeout: Duration) -> Duration {
    SENDER_TIMEOUT_BUCKETS
        .iter()
        .copied()
        .find(|b| *b >= timeout)
        .unwrap_or(SENDER_TIMEOUT_BUCKETS[SENDER_TIMEOUT_BUCKETS.len() - 1])
}

/// A registered channel type plus its sender cache.
pub struct ChannelTypeEntry {
    channel_type: Arc<dyn ChannelType>,
    senders: Mutex<HashMap<Duration, Arc<dyn Sender>>>,
}

impl std::fmt::Debug for ChannelTypeEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelTypeEntry")
            .field("name", &self.channel_type.name())
            .field("cached_senders", &self.cached_senders())
            .finish()
    }
}

impl ChannelTypeEntry {
    fn new(channel_type: Arc<dyn ChannelType>) -> Self {
        Self {
            channel_type,
            senders: Mutex::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        self.channel_type.name()
    }

    pub fn channel_type(&self) -> &Arc<dyn ChannelType> {
        &self.channel_type
    }

    /// Returns the cached sender for the bucket of `timeout`, creating it on
    /// first use.
    ///
    /// `create_sender` runs under the cache lock, so it is called at most once
    /// per bucket.
    pub fn sender(&self, timeout: Duration) -> Result<Arc<dyn Sender>, CourierError> {
        let timeout = timeout_bucket(timeout);
        let mut cache = self.senders.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(sender) = cache.get(&timeout) {
            return Ok(Arc::clone(sender));
        }
        let sender = self.channel_type.create_sender(timeout)?;
        debug!(
            channel_type = self.name(),
            timeout_ms = timeout.as_millis() as u64,
            "created sender"
        );
        cache.insert(timeout, Arc::clone(&sender));
        Ok(sender)
    }

    /// Number of senders currently cached.
    pub fn cached_senders(&self) -> usize {
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn drain(&self) -> Vec<Arc<dyn Sender>> {
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, sender)| sender)
            .collect()
    }
}

/// Registry of channel types available to the service.
pub struct ChannelTypeRegistry {
    entries: HashMap<String, Arc<ChannelTypeEntry>>,
}

impl std::fmt::Debug for ChannelTypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelTypeRegistry")
            .field("entries", &self.list_all())
            .finish()
    }
}

impl ChannelTypeRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Registers a channel type. A second type with the same name is rejected.
    pub fn register(&mut self, channel_type: Arc<dyn ChannelType>) -> Result<(), CourierError> {
        let name = channel_type.name().to_string();
        if name.trim().is_empty() {
            return Err(CourierError::validation(
                "channel_type.name",
                "must not be empty",
            ));
        }
        if self.entries.contains_key(&name) {
            return Err(CourierError::AlreadyRegistered {
                kind: "channel_type".to_string(),
                name,
            });
        }
        debug!(channel_type = %name, "registered channel type");
        self.entries
            .insert(name, Arc::new(ChannelTypeEntry::new(channel_type)));
        Ok(())
    }

    /// Looks up an entry by name.
    pub fn get(&self, name: &str) -> Result<Arc<ChannelTypeEntry>, CourierError> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| CourierError::not_found("channel_type", name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// List all entries, sorted by name.
    pub fn list_all(&self) -> Vec<Arc<ChannelTypeEntry>> {
        let mut entries: Vec<Arc<ChannelTypeEntry>> = self.entries.values().cloned().collect();
        entries.sort_by(|a, b| a.name().cmp(b.name()));
        entries
    }

    /// Sorted channel-type names.
    pub fn names(&self) -> Vec<String> {
        self.list_all()
            .iter()
            .map(|e| e.name().to_string())
            .collect()
    }

    /// Shuts down every cached sender and clears the caches.
    ///
    /// Shutdown failures are logged; cleanup always visits every sender.
    pub async fn cleanup(&self) {
        for entry in self.list_all() {
            for sender in entry.drain() {
                if let Err(e) = sender.shutdown().await {
                    warn!(channel_type = entry.name(), error = %e, "sender shutdown failed");
                }
            }
        }
    }

    /// Returns the number of registered channel types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no channel types are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ChannelTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use courier_core::{Channel, Context, Recipient, RenderedContent, SendReceipt, SenderError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSender {
        shutdowns: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Sender for CountingSender {
        async fn send(
            &self,
            _ctx: &Context,
            _channel: &Channel,
            _content: &RenderedContent,
            _recipients: &[Recipient],
        ) -> Result<SendReceipt, SenderError> {
            Ok(SendReceipt::new("ok"))
        }

        async fn shutdown(&self) -> Result<(), CourierError> {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct StubType {
        name: &'static str,
        created: Arc<AtomicUsize>,
        shutdowns: Arc<AtomicUsize>,
    }

    impl StubType {
        fn new(name: &'static str) -> Self {
            Self {
                name,
                created: Arc::new(AtomicUsize::new(0)),
                shutdowns: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl ChannelType for StubType {
        fn name(&self) -> &str {
            self.name
        }

        fn display_name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "stub channel type"
        }

        fn config_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object"})
        }

        fn create_sender(&self, _timeout: Duration) -> Result<Arc<dyn Sender>, CourierError> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(CountingSender {
                shutdowns: Arc::clone(&self.shutdowns),
            }))
        }
    }

    #[test]
    fn register_and_get_roundtrip() {
        let mut registry = ChannelTypeRegistry::new();
        registry.register(Arc::new(StubType::new("email"))).unwrap();

        let entry = registry.get("email").unwrap();
        assert_eq!(entry.name(), "email");
        assert!(registry.contains("email"));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = ChannelTypeRegistry::new();
        registry.register(Arc::new(StubType::new("sms"))).unwrap();
        let err = registry.register(Arc::new(StubType::new("sms"))).unwrap_err();
        assert!(matches!(err, CourierError::AlreadyRegistered { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unknown_type_is_not_found() {
        let registry = ChannelTypeRegistry::new();
        match registry.get("pager") {
            Err(CourierError::NotFound { kind, id }) => {
                assert_eq!(kind, "channel_type");
                assert_eq!(id, "pager");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn sender_created_once_per_timeout() {
        let stub = StubType::new("email");
        let created = Arc::clone(&stub.created);
        let mut registry = ChannelTypeRegistry::new();
        registry.register(Arc::new(stub)).unwrap();
        let entry = registry.get("email").unwrap();

        let a = entry.sender(Duration::from_secs(5)).unwrap();
        let b = entry.sender(Duration::from_secs(5)).unwrap();
        let _c = entry.sender(Duration::from_secs(10)).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(created.load(Ordering::SeqCst), 2);
        assert_eq!(entry.cached_senders(), 2);
    }

    #[test]
    fn caller_timeouts_share_bounded_buckets() {
        let stub = StubType::new("email");
        let created = Arc::clone(&stub.created);
        let mut registry = ChannelTypeRegistry::new();
        registry.register(Arc::new(stub)).unwrap();
        let entry = registry.get("email").unwrap();

        for ms in 1_000..1_200 {
            entry.sender(Duration::from_millis(ms)).unwrap();
        }
        entry.sender(Duration::from_secs(3_600)).unwrap();

        // 1000 ms, the 2 s bucket and the 300 s cap
        assert_eq!(entry.cached_senders(), 3);
        assert_eq!(created.load(Ordering::SeqCst), 3);
        assert!(entry.cached_senders() <= SENDER_TIMEOUT_BUCKETS.len());
    }

    #[test]
    fn timeout_rounds_up_to_bucket() {
        assert_eq!(timeout_bucket(Duration::from_millis(1)), Duration::from_secs(1));
        assert_eq!(timeout_bucket(Duration::from_millis(5_001)), Duration::from_secs(10));
        assert_eq!(timeout_bucket(Duration::from_secs(30)), Duration::from_secs(30));
        assert_eq!(timeout_bucket(Duration::from_secs(900)), Duration::from_secs(300));
    }

    #[tokio::test]
    async fn cleanup_shuts_down_and_clears() {
        let stub = StubType::new("slack");
        let shutdowns = Arc::clone(&stub.shutdowns);
        let mut registry = ChannelTypeRegistry::new();
        registry.register(Arc::new(stub)).unwrap();
        let entry = registry.get("slack").unwrap();
        entry.sender(Duration::from_secs(1)).unwrap();
        entry.sender(Duration::from_secs(2)).unwrap();

        registry.cleanup().await;

        assert_eq!(shutdowns.load(Ordering::SeqCst), 2);
        assert_eq!(entry.cached_senders(), 0);
    }

    #[test]
    fn list_all_returns_sorted() {
        let mut registry = ChannelTypeRegistry::new();
        registry.register(Arc::new(StubType::new("sms"))).unwrap();
        registry.register(Arc::new(StubType::new("email"))).unwrap();
        registry.register(Arc::new(StubType::new("slack"))).unwrap();

        assert_eq!(registry.names(), ["email", "slack", "sms"]);
    }

    #[test]
    fn len_and_is_empty() {
        let mut registry = ChannelTypeRegistry::new();
        assert!(registry.is_empty());
        registry.register(Arc::new(StubType::new("email"))).unwrap();
        assert!(!registry.is_empty());
        assert_eq!(registry.len(), 1);
    }
}
