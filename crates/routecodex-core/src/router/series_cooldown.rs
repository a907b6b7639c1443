//! Per-(providerId, series) cooldown registry: credential-agnostic, unlike
//! `routecodex_provider_core::credential::UnavailableQueue` which tracks one
//! credential at a time. Adapted from the same min-heap + background-sweep
//! shape as `UnavailableQueue`, re-keyed to `(providerId, series)` per
//! spec.md §3's `SeriesCooldownDetail`.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use routecodex_common::ModelSeries;
use routecodex_provider_core::events::{Event, OperationalEvent, SeriesCooldownEndEvent, SeriesCooldownStartEvent};
use routecodex_provider_core::{EventHub, UnavailableReason};
use tokio::sync::{Mutex, Notify, RwLock};
use tokio::time::Instant;

pub type SeriesKey = (String, ModelSeries);

#[derive(Debug, Clone, Copy)]
pub struct CooldownDetail {
    pub until: Instant,
    pub reason: UnavailableReason,
}

/// Tracks active series cooldowns and recovers them in the background, the
/// way `UnavailableQueue` recovers individual credentials.
pub struct SeriesCooldownRegistry {
    active: Arc<RwLock<HashMap<SeriesKey, CooldownDetail>>>,
    heap: Mutex<BinaryHeap<Reverse<(Instant, SeriesKey)>>>,
    notify: Notify,
    events: EventHub,
}

impl SeriesCooldownRegistry {
    pub fn new(events: EventHub) -> Arc<Self> {
        let registry = Arc::new(Self {
            active: Arc::new(RwLock::new(HashMap::new())),
            heap: Mutex::new(BinaryHeap::new()),
            notify: Notify::new(),
            events,
        });
        registry.clone().spawn_recover_task();
        registry
    }

    /// `None` means no cooldown is in effect for this `(providerId, series)`.
    pub async fn cooldown_until(&self, provider_id: &str, series: ModelSeries) -> Option<Instant> {
        let key = (provider_id.to_string(), series);
        self.active.read().await.get(&key).map(|d| d.until)
    }

    pub async fn is_cooled_down(&self, provider_id: &str, series: ModelSeries) -> bool {
        self.cooldown_until(provider_id, series).await.is_some()
    }

    pub async fn start_cooldown(
        &self,
        provider_id: &str,
        series: ModelSeries,
        duration: Duration,
        reason: UnavailableReason,
    ) {
        let until = Instant::now() + duration;
        let key = (provider_id.to_string(), series);
        self.active
            .write()
            .await
            .insert(key.clone(), CooldownDetail { until, reason });
        {
            let mut heap = self.heap.lock().await;
            heap.push(Reverse((until, key)));
        }
        self.notify.notify_one();

        let until_wall = SystemTime::now().checked_add(duration).unwrap_or_else(SystemTime::now);
        self.events
            .emit(Event::Operational(OperationalEvent::SeriesCooldownStart(
                SeriesCooldownStartEvent {
                    at: SystemTime::now(),
                    provider_id: provider_id.to_string(),
                    series: series_label(series).to_string(),
                    reason,
                    until: until_wall,
                },
            )))
            .await;
    }

    fn spawn_recover_task(self: Arc<Self>) {
        tokio::spawn(async move {
            loop {
                let next = {
                    let heap = self.heap.lock().await;
                    heap.peek().map(|Reverse((t, key))| (*t, key.clone()))
                };

                match next {
                    None => {
                        self.notify.notified().await;
                        continue;
                    }
                    Some((deadline, _)) => {
                        tokio::time::sleep_until(deadline).await;
                    }
                }

                let now = Instant::now();
                let mut due = Vec::new();
                {
                    let mut heap = self.heap.lock().await;
                    while let Some(Reverse((t, _))) = heap.peek()
                        && *t <= now
                    {
                        if let Some(Reverse((t, key))) = heap.pop() {
                            due.push((t, key));
                        }
                    }
                }
                if due.is_empty() {
                    continue;
                }

                let mut guard = self.active.write().await;
                for (_t, key) in due {
                    let should_clear = match guard.get(&key) {
                        Some(detail) => detail.until <= now,
                        None => false,
                    };
                    if should_clear {
                        guard.remove(&key);
                        let (provider_id, series) = key;
                        self.events
                            .emit(Event::Operational(OperationalEvent::SeriesCooldownEnd(
                                SeriesCooldownEndEvent {
                                    at: SystemTime::now(),
                                    provider_id,
                                    series: series_label(series).to_string(),
                                },
                            )))
                            .await;
                    }
                }
            }
        });
    }
}

fn series_label(series: ModelSeries) -> &'static str {
    match series {
        ModelSeries::Claude => "claude",
        ModelSeries::GeminiPro => "gemini-pro",
        ModelSeries::GeminiFlash => "gemini-flash",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cooldown_blocks_the_whole_series_until_expiry() {
        let hub = EventHub::new(8);
        let registry = SeriesCooldownRegistry::new(hub);

        registry
            .start_cooldown(
                "antigravity",
                ModelSeries::GeminiPro,
                Duration::from_millis(50),
                UnavailableReason::RateLimit,
            )
            .await;

        assert!(registry.is_cooled_down("antigravity", ModelSeries::GeminiPro).await);
        assert!(!registry.is_cooled_down("antigravity", ModelSeries::GeminiFlash).await);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!registry.is_cooled_down("antigravity", ModelSeries::GeminiPro).await);
    }
}
