use serde::{Deserialize, Serialize};

use crate::event::WATCHED_EVENTS;

/// Per-layer settings.
///
/// `watched` lists the events forwarded through a watcher, i.e. only while
/// no external handler is attached for them on the wrapped stream. Any other
/// event reaches the layer through the unhandled-event fallback alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerConfig {
    pub watched: Vec<String>,
}

impl Default for LayerConfig {
    fn default() -> Self {
        LayerConfig {
            watched: WATCHED_EVENTS
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

impl LayerConfig {
    pub fn with_watched<I, S>(events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut config = LayerConfig { watched: Vec::new() };
        for event in events {
            config = config.watch(event);
        }
        config
    }

    pub fn watch<S>(mut self, event: S) -> Self
    where
        S: Into<String>,
    {
        let event = event.into();
        if !self.watched.contains(&event) {
            self.watched.push(event);
        }
        self
    }

    pub fn is_watched(&self, event: &str) -> bool {
        self.watched.iter().any(|e| e == event)
    }
}
