//! Abstraction over the external playback engine.
//!
//! The session never talks to mpv directly. It issues commands and property
//! writes through [`MediaEngine`] and consumes typed property changes from a
//! [`PropertySubscription`].

#[cfg(unix)]
pub mod mpv_ipc;

use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;

/// Declared payload type of an observed property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyFormat {
    Flag,
    Int64,
    Double,
    String,
    Node,
}

/// A property the session subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservedProperty {
    pub name: &'static str,
    pub format: PropertyFormat,
    /// Whether "no value" is a meaningful payload (e.g. `sid` when subtitles
    /// are off).
    pub nullable: bool,
}

impl ObservedProperty {
    pub const fn new(name: &'static str, format: PropertyFormat) -> Self {
        Self {
            name,
            format,
            nullable: false,
        }
    }

    pub const fn nullable(name: &'static str, format: PropertyFormat) -> Self {
        Self {
            name,
            format,
            nullable: true,
        }
    }
}

/// Value carried by a property change or written to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    None,
    Flag(bool),
    Int(i64),
    Double(f64),
    Str(String),
    Node(serde_json::Value),
}

impl PropertyValue {
    /// Whether this payload is acceptable for the declared property.
    ///
    /// Integers widen to doubles; the engine reports whole numbers without a
    /// fractional part.
    pub fn matches(&self, property: &ObservedProperty) -> bool {
        match (self, property.format) {
            (PropertyValue::None, _) => property.nullable,
            (PropertyValue::Flag(_), PropertyFormat::Flag) => true,
            (PropertyValue::Int(_), PropertyFormat::Int64) => true,
            (PropertyValue::Int(_), PropertyFormat::Double) => true,
            (PropertyValue::Double(_), PropertyFormat::Double) => true,
            (PropertyValue::Str(_), PropertyFormat::String) => true,
            (PropertyValue::Node(_), PropertyFormat::Node) => true,
            _ => false,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Flag(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Double(d) => Some(*d),
            PropertyValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            PropertyValue::None => serde_json::Value::Null,
            PropertyValue::Flag(b) => serde_json::Value::Bool(*b),
            PropertyValue::Int(i) => serde_json::Value::from(*i),
            PropertyValue::Double(d) => serde_json::Value::from(*d),
            PropertyValue::Str(s) => serde_json::Value::String(s.clone()),
            PropertyValue::Node(node) => node.clone(),
        }
    }
}

/// A single property change emitted by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyEvent {
    pub name: String,
    pub value: PropertyValue,
}

impl PropertyEvent {
    pub fn new(name: impl Into<String>, value: PropertyValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

type UnsubscribeFn = Box<dyn FnOnce() + Send + Sync>;

/// Live stream of property changes.
///
/// Unsubscribing is idempotent and also happens on drop, so a session torn
/// down on any path stops receiving events.
pub struct PropertySubscription {
    events: mpsc::UnboundedReceiver<PropertyEvent>,
    on_unsubscribe: Option<UnsubscribeFn>,
}

impl PropertySubscription {
    pub fn new(
        events: mpsc::UnboundedReceiver<PropertyEvent>,
        on_unsubscribe: impl FnOnce() + Send + Sync + 'static,
    ) -> Self {
        Self {
            events,
            on_unsubscribe: Some(Box::new(on_unsubscribe)),
        }
    }

    /// Next change, or `None` once the subscription is closed.
    pub async fn next(&mut self) -> Option<PropertyEvent> {
        if self.on_unsubscribe.is_none() {
            return None;
        }
        self.events.recv().await
    }

    /// Next already-buffered change without waiting.
    pub fn try_next(&mut self) -> Option<PropertyEvent> {
        if self.on_unsubscribe.is_none() {
            return None;
        }
        self.events.try_recv().ok()
    }

    pub fn is_active(&self) -> bool {
        self.on_unsubscribe.is_some()
    }

    pub fn unsubscribe(&mut self) {
        if let Some(on_unsubscribe) = self.on_unsubscribe.take() {
            on_unsubscribe();
            self.events.close();
        }
    }
}

impl Drop for PropertySubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for PropertySubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertySubscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Options passed to the engine at start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    pub options: Vec<(String, String)>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            options: vec![
                ("vo".to_string(), "gpu-next".to_string()),
                ("hwdec".to_string(), "auto-safe".to_string()),
                ("keep-open".to_string(), "yes".to_string()),
                ("force-window".to_string(), "yes".to_string()),
            ],
        }
    }
}

impl EngineOptions {
    pub fn with_option(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let value = value.into();
        if let Some(existing) =
            self.options.iter_mut().find(|(key, _)| *key == name)
        {
            existing.1 = value;
        } else {
            self.options.push((name, value));
        }
        self
    }
}

/// Remote-controllable playback engine.
#[async_trait]
pub trait MediaEngine: Send + Sync + fmt::Debug {
    async fn initialize(&self, options: &EngineOptions) -> Result<()>;

    async fn observe(
        &self,
        properties: &[ObservedProperty],
    ) -> Result<PropertySubscription>;

    async fn command(&self, name: &str, args: &[String]) -> Result<()>;

    async fn set_property(&self, name: &str, value: PropertyValue)
    -> Result<()>;

    async fn shutdown(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn integers_widen_to_double_properties() {
        let duration = ObservedProperty::new("duration", PropertyFormat::Double);
        assert!(PropertyValue::Int(120).matches(&duration));
        assert!(!PropertyValue::Str("120".into()).matches(&duration));
        assert!(!PropertyValue::None.matches(&duration));

        let sid = ObservedProperty::nullable("sid", PropertyFormat::Int64);
        assert!(PropertyValue::None.matches(&sid));
        assert!(!PropertyValue::Double(1.0).matches(&sid));
    }

    #[test]
    fn unsubscribe_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (_tx, rx) = mpsc::unbounded_channel();
        let counter = Arc::clone(&calls);
        let mut subscription = PropertySubscription::new(rx, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        subscription.unsubscribe();
        subscription.unsubscribe();
        drop(subscription);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_unsubscribes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (_tx, rx) = mpsc::unbounded_channel();
        let counter = Arc::clone(&calls);
        let subscription = PropertySubscription::new(rx, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        drop(subscription);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn closed_subscription_yields_nothing() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut subscription = PropertySubscription::new(rx, || {});
        tx.send(PropertyEvent::new("pause", PropertyValue::Flag(true)))
            .unwrap();
        subscription.unsubscribe();
        assert!(subscription.try_next().is_none());
    }

    #[test]
    fn engine_option_override_replaces_existing() {
        let options = EngineOptions::default().with_option("vo", "null");
        assert!(
            options
                .options
                .iter()
                .any(|(k, v)| k == "vo" && v == "null")
        );
        assert_eq!(
            options.options.iter().filter(|(k, _)| k == "vo").count(),
            1
        );
    }
}
