use crate::notify::Channel;
use std::fmt;

#[derive(Debug, Clone)]
pub struct NotifyError {
    pub channel: Channel,
    pub stage: &'static str,
    pub detail: String,
}

impl NotifyError {
    pub fn new(channel: Channel, stage: &'static str, detail: impl Into<String>) -> Self {
        Self {
            channel,
            stage,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "notification error (channel={}, stage={}): {}",
            self.channel, self.stage, self.detail
        )
    }
}

impl std::error::Error for NotifyError {}
