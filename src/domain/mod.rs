//! Domain types: channels, webhook targets, observations and persisted state.

mod channel;
mod observation;
mod state;

pub use channel::{Channel, ChannelId, WebhookTarget};
pub use observation::StreamObservation;
pub use state::ChannelState;
