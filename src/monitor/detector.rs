//! Stream state-change detection.
//!
//! Pure classification of a (previous state, current observation) pair.
//! Per-channel state machine: `Offline -> Live` on a detected start
//! (re-entrant to `Live` when the stream id changes, covering back-to-back
//! streams without an intervening offline poll), `Live -> Offline` on a
//! detected end. Continuing-live and continuing-offline polls fire no
//! transition.

use crate::domain::{ChannelState, StreamObservation};

/// Whether a stream start should be notified for this poll.
///
/// A missing previous state counts as a start: the very first successful poll
/// of an already-live channel always notifies. This is deliberate, and it
/// means a restart with a lost state file re-notifies for every channel that
/// is live at that moment.
pub fn is_stream_started(
    previous: Option<&ChannelState>,
    observation: Option<&StreamObservation>,
) -> bool {
    let Some(observation) = observation else {
        // Not live now, cannot be a start.
        return false;
    };

    let Some(previous) = previous else {
        // First poll ever for this channel.
        return true;
    };

    if !previous.is_live {
        return true;
    }

    // Both live: a different stream id is a new broadcast.
    previous.stream_id.as_deref() != Some(observation.stream_id.as_str())
}

/// Whether a live stream has ended: previously live, nothing live now.
pub fn is_stream_ended(
    previous: Option<&ChannelState>,
    observation: Option<&StreamObservation>,
) -> bool {
    observation.is_none() && previous.is_some_and(|p| p.is_live)
}
