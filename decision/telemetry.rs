use std::{fmt, path::PathBuf, sync::Arc};

use anyhow::Result;
use serde_json::Value;
use shared_event_bus::{BusEvent, EventPublisher};
use shared_logging::{JsonLogger, LogLevel, LogRecord};
use tokio::runtime::{Builder as RuntimeBuilder, Handle};

/// Builder for decision-cycle telemetry sinks.
pub struct DecisionTelemetryBuilder {
    component: String,
    log_path: Option<PathBuf>,
    event_publisher: Option<Arc<dyn EventPublisher>>,
}

impl DecisionTelemetryBuilder {
    /// Creates the builder.
    #[must_use]
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            log_path: None,
            event_publisher: None,
        }
    }

    /// Sets the log path.
    #[must_use]
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Sets the event publisher.
    #[must_use]
    pub fn event_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.event_publisher = Some(publisher);
        self
    }

    /// Builds the telemetry handle.
    pub fn build(self) -> Result<DecisionTelemetry> {
        DecisionTelemetry::new(self.component, self.log_path, self.event_publisher)
    }
}

/// Telemetry handle shared across the decision pipeline.
#[derive(Clone)]
pub struct DecisionTelemetry {
    inner: Arc<TelemetryInner>,
}

impl fmt::Debug for DecisionTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecisionTelemetry")
            .field("component", &self.inner.component)
            .finish()
    }
}

struct TelemetryInner {
    component: String,
    logger: Option<JsonLogger>,
    event: Option<EventHandle>,
}

struct EventHandle {
    publisher: Arc<dyn EventPublisher>,
}

impl EventHandle {
    const fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self { publisher }
    }

    fn publish(&self, event: BusEvent) -> Result<()> {
        if let Ok(handle) = Handle::try_current() {
            let publisher = Arc::clone(&self.publisher);
            handle.spawn(async move {
                if let Err(err) = publisher.publish(event).await {
                    eprintln!("telemetry event publish failed: {err:?}");
                }
            });
            Ok(())
        } else {
            // Outside a runtime: drive the publish on a transient one.
            let runtime = RuntimeBuilder::new_current_thread().enable_all().build()?;
            runtime.block_on(self.publisher.publish(event))
        }
    }
}

impl DecisionTelemetry {
    fn new(
        component: impl Into<String>,
        log_path: Option<PathBuf>,
        event_publisher: Option<Arc<dyn EventPublisher>>,
    ) -> Result<Self> {
        let logger = if let Some(path) = log_path {
            Some(JsonLogger::new(path)?)
        } else {
            None
        };
        let event = event_publisher.map(EventHandle::new);
        Ok(Self {
            inner: Arc::new(TelemetryInner {
                component: component.into(),
                logger,
                event,
            }),
        })
    }

    /// Returns a builder.
    #[must_use]
    pub fn builder(component: impl Into<String>) -> DecisionTelemetryBuilder {
        DecisionTelemetryBuilder::new(component)
    }

    /// Logs structured fields to the JSON log, when configured.
    pub fn log(&self, level: LogLevel, message: &str, fields: Value) -> Result<()> {
        if let Some(logger) = &self.inner.logger {
            let record =
                LogRecord::new(&self.inner.component, level, message).with_fields(fields);
            logger.log(&record)?;
        }
        Ok(())
    }

    /// Emits an event on the bus, when configured.
    pub fn event(&self, event_type: &str, payload: Value) -> Result<()> {
        if let Some(handle) = &self.inner.event {
            handle.publish(BusEvent::new(
                self.inner.component.clone(),
                event_type,
                payload,
            ))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn logs_flow_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("decision.log");
        let telemetry = DecisionTelemetry::builder("decision_engine")
            .log_path(&path)
            .build()
            .unwrap();
        telemetry
            .log(
                LogLevel::Info,
                "cycle complete",
                serde_json::json!({"confidence": 0.9}),
            )
            .unwrap();
        let records = shared_logging::read_tail(&path, 10).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message, "cycle complete");
    }

    #[test]
    fn unconfigured_sinks_are_noops() {
        let telemetry = DecisionTelemetry::builder("decision_engine")
            .build()
            .unwrap();
        telemetry
            .log(LogLevel::Debug, "nothing", serde_json::json!({}))
            .unwrap();
        telemetry.event("noop", serde_json::json!({})).unwrap();
    }
}
