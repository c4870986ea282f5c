pub mod email;
pub mod error;
pub mod news;
pub mod sms;

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    News,
    Email,
    Sms,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Channel::News => "news",
            Channel::Email => "email",
            Channel::Sms => "sms",
        })
    }
}
