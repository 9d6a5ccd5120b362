//! Change stream connection status

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status notification reported by the change stream channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    Subscribed,
    ChannelError,
    Closed,
}

/// Connection status shown on the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    #[default]
    Initializing,
    Active,
    Error,
    Closed,
}

impl ConnectionStatus {
    /// Status after a channel notification; the latest notification wins
    pub fn from_channel(channel: ChannelStatus) -> Self {
        match channel {
            ChannelStatus::Subscribed => ConnectionStatus::Active,
            ChannelStatus::ChannelError => ConnectionStatus::Error,
            ChannelStatus::Closed => ConnectionStatus::Closed,
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Initializing => write!(f, "Initializing"),
            ConnectionStatus::Active => write!(f, "Active"),
            ConnectionStatus::Error => write!(f, "Error"),
            ConnectionStatus::Closed => write!(f, "Closed"),
        }
    }
}
