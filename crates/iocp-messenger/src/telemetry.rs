//! Metric definitions for the messenger.
//!
//! Every metric the messenger emits is declared here as a [`Metric`] constant
//! so names stay in one place. Call [`describe_metrics`] once at startup,
//! after installing a recorder, to attach descriptions and units.
//!
//! ```rust,ignore
//! iocp_messenger::telemetry::describe_metrics();
//! metrics::counter!(metric_defs::LINES_RECEIVED.name).increment(1);
//! ```

use metrics::{describe_counter, Unit};

/// A counter declaration with its metadata.
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name (e.g., "iocp.rx.lines").
    pub name: &'static str,
    /// Human-readable description of the metric.
    pub description: &'static str,
    /// The unit of measurement.
    pub unit: Unit,
}

impl Metric {
    /// Creates a new counter metric with the given name.
    pub const fn counter(name: &'static str) -> Self {
        Self {
            name,
            description: "",
            unit: Unit::Count,
        }
    }

    /// Sets the description.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Registers the description with the installed recorder.
    pub fn describe(&self) {
        describe_counter!(self.name, self.unit, self.description);
    }
}

/// All metrics emitted by the messenger.
pub mod metric_defs {
    use super::Metric;

    /// Complete lines produced by the framer.
    pub const LINES_RECEIVED: Metric = Metric::counter("iocp.rx.lines")
        .with_description("Complete command lines received");

    /// Partial lines discarded because the receive buffer filled up.
    pub const BUFFER_OVERFLOWS: Metric = Metric::counter("iocp.rx.overflows")
        .with_description("Partial lines dropped on receive buffer overflow");

    /// Lines discarded because they lack the identifier prefix.
    pub const INVALID_PREFIX: Metric = Metric::counter("iocp.rx.invalid_prefix")
        .with_description("Lines dropped for a missing identifier prefix");

    /// Commands that matched at least one registered handler.
    pub const COMMANDS_DISPATCHED: Metric = Metric::counter("iocp.dispatch.matched")
        .with_description("Commands dispatched to registered handlers");

    /// Commands routed to the default handler.
    pub const COMMANDS_DEFAULTED: Metric = Metric::counter("iocp.dispatch.default")
        .with_description("Commands handled by the default handler");

    /// Commands with no handler and no default handler.
    pub const COMMANDS_UNHANDLED: Metric = Metric::counter("iocp.dispatch.unhandled")
        .with_description("Commands with no matching or default handler");

    /// Outgoing commands completed.
    pub const COMMANDS_SENT: Metric = Metric::counter("iocp.tx.commands")
        .with_description("Outgoing commands written to the transport");

    /// Every metric, for bulk registration.
    pub const ALL: &[Metric] = &[
        LINES_RECEIVED,
        BUFFER_OVERFLOWS,
        INVALID_PREFIX,
        COMMANDS_DISPATCHED,
        COMMANDS_DEFAULTED,
        COMMANDS_UNHANDLED,
        COMMANDS_SENT,
    ];
}

/// Describe every messenger metric to the installed recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}
