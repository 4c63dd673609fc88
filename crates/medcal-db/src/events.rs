//! In-memory event repository.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use medcal_core::{
    CalendarEvent, CategoryRules, Error, EventKey, EventRepository, FinalizedRecord,
    ReclassifyFilter, Result,
};

/// Events keyed by event key; iteration order is key order.
#[derive(Default)]
pub struct MemoryEventRepository {
    events: RwLock<BTreeMap<EventKey, CalendarEvent>>,
}

impl MemoryEventRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventRepository for MemoryEventRepository {
    async fn upsert(&self, event: CalendarEvent) -> Result<()> {
        let key = EventKey::checked(&event.calendar_id, &event.event_id)?;
        self.events.write().await.insert(key, event);
        Ok(())
    }

    async fn get(&self, key: &EventKey) -> Result<Option<CalendarEvent>> {
        Ok(self.events.read().await.get(key).cloned())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.events.read().await.len() as u64)
    }

    async fn count_eligible(
        &self,
        filter: &ReclassifyFilter,
        rules: &CategoryRules,
    ) -> Result<u64> {
        let events = self.events.read().await;
        Ok(events.values().filter(|e| filter.matches(e, rules)).count() as u64)
    }

    async fn list_eligible(
        &self,
        filter: &ReclassifyFilter,
        rules: &CategoryRules,
        limit: usize,
    ) -> Result<Vec<CalendarEvent>> {
        let events = self.events.read().await;
        Ok(events
            .values()
            .filter(|e| filter.matches(e, rules))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn apply_classification(&self, key: &EventKey, record: &FinalizedRecord) -> Result<()> {
        let mut events = self.events.write().await;
        let event = events
            .get_mut(key)
            .ok_or_else(|| Error::EventNotFound(key.to_string()))?;
        event.apply_record(record);
        debug!(event_key = %key, "Persisted classification");
        Ok(())
    }
}
