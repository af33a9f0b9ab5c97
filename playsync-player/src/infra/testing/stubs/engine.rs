use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::{PlayerError, Result};
use crate::infra::engine::{
    EngineOptions, MediaEngine, ObservedProperty, PropertyEvent,
    PropertySubscription, PropertyValue,
};

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Initialize,
    Observe(Vec<&'static str>),
    Command { name: String, args: Vec<String> },
    SetProperty { name: String, value: PropertyValue },
    Shutdown,
}

/// Engine that records every call and lets tests push property changes.
#[derive(Debug, Default)]
pub struct RecordingEngine {
    calls: Mutex<Vec<EngineCall>>,
    events: Mutex<Option<mpsc::UnboundedSender<PropertyEvent>>>,
    fail_initialize: AtomicBool,
    failing: Mutex<HashSet<String>>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_initialize(&self, fail: bool) {
        self.fail_initialize.store(fail, Ordering::SeqCst);
    }

    /// Make a command or property name fail until cleared.
    pub fn fail_on(&self, name: &str) {
        self.failing.lock().insert(name.to_string());
    }

    pub fn clear_failures(&self) {
        self.failing.lock().clear();
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn commands(&self) -> Vec<(String, Vec<String>)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                EngineCall::Command { name, args } => {
                    Some((name.clone(), args.clone()))
                }
                _ => None,
            })
            .collect()
    }

    /// Every value written to `name`, oldest first.
    pub fn property_writes(&self, name: &str) -> Vec<PropertyValue> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                EngineCall::SetProperty { name: n, value } if n == name => {
                    Some(value.clone())
                }
                _ => None,
            })
            .collect()
    }

    pub fn is_observed(&self) -> bool {
        self.events
            .lock()
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Push a property change to the active subscription.
    pub fn emit(&self, name: &str, value: PropertyValue) -> bool {
        match self.events.lock().as_ref() {
            Some(tx) => tx.send(PropertyEvent::new(name, value)).is_ok(),
            None => false,
        }
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().push(call);
    }

    fn check(&self, name: &str) -> Result<()> {
        if self.failing.lock().contains(name) {
            Err(PlayerError::engine_command(name, "injected failure"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl MediaEngine for RecordingEngine {
    async fn initialize(&self, _options: &EngineOptions) -> Result<()> {
        self.record(EngineCall::Initialize);
        if self.fail_initialize.load(Ordering::SeqCst) {
            return Err(PlayerError::EngineInit("injected failure".to_string()));
        }
        Ok(())
    }

    async fn observe(
        &self,
        properties: &[ObservedProperty],
    ) -> Result<PropertySubscription> {
        self.record(EngineCall::Observe(
            properties.iter().map(|p| p.name).collect(),
        ));
        let (tx, rx) = mpsc::unbounded_channel();
        *self.events.lock() = Some(tx);
        Ok(PropertySubscription::new(rx, || {}))
    }

    async fn command(&self, name: &str, args: &[String]) -> Result<()> {
        self.record(EngineCall::Command {
            name: name.to_string(),
            args: args.to_vec(),
        });
        self.check(name)
    }

    async fn set_property(
        &self,
        name: &str,
        value: PropertyValue,
    ) -> Result<()> {
        self.record(EngineCall::SetProperty {
            name: name.to_string(),
            value,
        });
        self.check(name)
    }

    async fn shutdown(&self) -> Result<()> {
        self.record(EngineCall::Shutdown);
        self.events.lock().take();
        Ok(())
    }
}
