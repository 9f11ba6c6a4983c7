//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Session and swap subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters and gauges through the `metrics` facade)
//!
//! Consumers:
//!     → stderr via tracing-subscriber
//!     → whichever metrics recorder the embedding binary installs
//! ```

pub mod logging;
pub mod metrics;
