//! Support alerts.
//!
//! Anything that needs human follow-up (e.g. a charged payment without an
//! order record) is emitted as a `tracing` event on [`ALERT_TARGET`].
//! [`AlertRecorder`] is a subscriber layer that keeps those events around so
//! they can be forwarded or inspected.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

/// Target for events that require support follow-up.
pub const ALERT_TARGET: &str = "storefront::alert";

/// A captured support alert.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SupportAlert {
    /// The event message.
    pub message: String,
    /// Structured fields, rendered as strings.
    pub fields: BTreeMap<String, String>,
    /// When the alert was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl SupportAlert {
    /// Get a field by name.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Layer that records every event emitted on [`ALERT_TARGET`].
///
/// Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct AlertRecorder {
    alerts: Arc<Mutex<Vec<SupportAlert>>>,
}

impl AlertRecorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All alerts recorded so far.
    pub fn alerts(&self) -> Vec<SupportAlert> {
        self.lock().clone()
    }

    /// Take all recorded alerts, leaving the buffer empty.
    pub fn drain(&self) -> Vec<SupportAlert> {
        std::mem::take(&mut *self.lock())
    }

    /// Number of recorded alerts.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<SupportAlert>> {
        self.alerts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<S: Subscriber> Layer<S> for AlertRecorder {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if event.metadata().target() != ALERT_TARGET {
            return;
        }

        let mut visitor = FieldCollector::default();
        event.record(&mut visitor);

        self.lock().push(SupportAlert {
            message: visitor.message.unwrap_or_default(),
            fields: visitor.fields,
            recorded_at: Utc::now(),
        });
    }
}

#[derive(Default)]
struct FieldCollector {
    message: Option<String>,
    fields: BTreeMap<String, String>,
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.insert(field.name().to_string(), value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let rendered = format!("{:?}", value);
        if field.name() == "message" {
            self.message = Some(rendered);
        } else {
            self.fields.insert(field.name().to_string(), rendered);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_records_alert_target_only() {
        let recorder = AlertRecorder::new();
        let subscriber = tracing_subscriber::registry().with(recorder.clone());

        tracing::subscriber::with_default(subscriber, || {
            tracing::error!("not an alert");
            tracing::error!(
                target: ALERT_TARGET,
                payment_reference = "pi_123",
                attempts = 2,
                "order record failed"
            );
        });

        let alerts = recorder.alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].message, "order record failed");
        assert_eq!(alerts[0].field("payment_reference"), Some("pi_123"));
        assert_eq!(alerts[0].field("attempts"), Some("2"));
    }

    #[test]
    fn test_drain_empties_buffer() {
        let recorder = AlertRecorder::new();
        let subscriber = tracing_subscriber::registry().with(recorder.clone());

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(target: ALERT_TARGET, "first");
            tracing::warn!(target: ALERT_TARGET, "second");
        });

        assert_eq!(recorder.len(), 2);
        let drained = recorder.drain();
        assert_eq!(drained.len(), 2);
        assert!(recorder.is_empty());
    }
}
