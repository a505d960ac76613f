//! Shared constants for end-to-end tests

/// Timeout for individual HTTP requests
pub const REQUEST_TIMEOUT_SECS: u64 = 5;

/// Maximum time to wait for a spawned server to become ready
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Interval between readiness polls
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 20;

/// Poll interval for test scheduler instances (fast, for poller tests)
pub const TEST_POLL_INTERVAL_MS: u64 = 50;

/// Simulated work duration for test scheduler instances
pub const TEST_WORK_DURATION_MS: u64 = 10;
