use crate::modules::{ModuleInstance, Segment};
use log::{trace, warn};
use std::collections::HashMap;
use std::time::Instant;

struct CacheEntry {
    timestamp: Instant,
    segment: Segment,
}

/// Last rendered segment per instance name.
///
/// Owned by the scheduler and only touched from the tick loop.
#[derive(Default)]
pub struct RenderCache {
    entries: HashMap<String, CacheEntry>,
}

impl RenderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce the segments for one frame, in instance order.
    ///
    /// An instance is rendered again only when it has no entry or its entry is
    /// at least `refresh_interval` old at `now`. A successful render replaces
    /// the entry stamped with `now`. A failed or empty render leaves the entry
    /// as it was and contributes nothing to this frame.
    pub fn render_frame(
        &mut self,
        instances: &mut [Box<dyn ModuleInstance>],
        now: Instant,
    ) -> Vec<Segment> {
        let mut frame = Vec::with_capacity(instances.len());
        for instance in instances.iter_mut() {
            if let Some(segment) = self.segment_for(instance.as_mut(), now) {
                frame.push(segment);
            }
        }
        frame
    }

    fn segment_for(&mut self, instance: &mut dyn ModuleInstance, now: Instant) -> Option<Segment> {
        let name = instance.name().to_string();

        if let Some(entry) = self.entries.get(&name) {
            let age = now.saturating_duration_since(entry.timestamp);
            if age < instance.refresh_interval() {
                trace!("{}: cached ({:?} old)", name, age);
                return Some(entry.segment.clone());
            }
        }

        match instance.render() {
            Ok(Some(segment)) => {
                trace!("{}: rendered", name);
                self.entries.insert(
                    name,
                    CacheEntry {
                        timestamp: now,
                        segment: segment.clone(),
                    },
                );
                Some(segment)
            }
            Ok(None) => {
                warn!("{} did not return a valid item", name);
                None
            }
            Err(e) => {
                warn!("{} failed to render: {}", name, e);
                None
            }
        }
    }

    /// When the entry for `name` was last rendered.
    #[cfg(test)]
    pub fn timestamp(&self, name: &str) -> Option<Instant> {
        self.entries.get(name).map(|entry| entry.timestamp)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
