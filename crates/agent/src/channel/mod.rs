//! Control channel plumbing.
//!
//! The connection task ([`connection::ControlChannel`]) only turns socket
//! activity into [`ChannelEvent`]s. The [`dispatcher::Dispatcher`] is the
//! single consumer of those events: data messages go to the
//! [`listener::ThresholdListener`], connection-health statuses go to the
//! status handler. The two kinds of event never share a callback.

pub mod connection;
pub mod dispatcher;
pub mod listener;

pub use connection::{ControlChannel, ReconnectConfig};
pub use dispatcher::Dispatcher;
pub use listener::{ThresholdListener, ThresholdUpdateError, UpdateOutcome};

/// Capacity of the event queue between connection and dispatcher.
pub const EVENT_QUEUE_CAPACITY: usize = 64;

/// Connection-health signal from the control channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelStatus {
    Connected,
    Disconnected,
    /// The backend refused the subscription credential. `token` is the
    /// credential the refused handshake presented.
    AccessDenied { status: u16, token: String },
}

/// Everything the connection task reports to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Raw text payload received on the channel.
    Message(String),
    Status(ChannelStatus),
}
