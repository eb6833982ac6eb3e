//! API constants

use std::time::Duration;

/// Service name reported to the tracing subscriber.
pub const SERVICE_NAME: &str = "courier";

/// Path the messaging platform posts webhook events to.
pub const WEBHOOK_PATH: &str = "/webhook";

pub const HEALTH_LIVE_PATH: &str = "/health/live";
pub const HEALTH_READY_PATH: &str = "/health/ready";

/// Upper bound for a single readiness probe against the metadata store.
pub const READINESS_TIMEOUT: Duration = Duration::from_secs(5);
