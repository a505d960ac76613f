//! Strategy selection from configuration. Pure construction, no I/O.

use super::{CommError, CommunicationStrategy, HttpStrategy, RedisStrategy, SocketStrategy};
use crate::config::{CommunicationConfig, CommunicationMode};

/// Build the strategy for the selected mode, validating that the mode's
/// endpoint parameters are present.
pub fn create(
    mode: CommunicationMode,
    config: &CommunicationConfig,
) -> Result<Box<dyn CommunicationStrategy>, CommError> {
    match mode {
        CommunicationMode::Http => {
            let url = config.scheduler_url.as_ref().ok_or_else(|| {
                CommError::Configuration(
                    "scheduler URL is required for http communication mode".to_string(),
                )
            })?;
            Ok(Box::new(HttpStrategy::new(url)))
        }
        CommunicationMode::Redis => {
            let url = config.redis_url().ok_or_else(|| {
                CommError::Configuration(
                    "redis host and port are required for redis communication mode".to_string(),
                )
            })?;
            Ok(Box::new(RedisStrategy::new(url)))
        }
        CommunicationMode::Socketio => {
            let url = config.socket_url.as_ref().ok_or_else(|| {
                CommError::Configuration(
                    "socket URL is required for socketio communication mode".to_string(),
                )
            })?;
            Ok(Box::new(SocketStrategy::new(url)))
        }
    }
}
