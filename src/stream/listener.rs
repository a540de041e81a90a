//! Channel-backed stream subscription.

use crate::types::Event;
use crossbeam_channel::Receiver;
use std::time::Duration;

use super::push::Subscription;

/// Receives a stream's values through a channel.
///
/// The underlying subscription is released when the listener is dropped.
pub struct Listener {
    subscription: Subscription,
    receiver: Receiver<Event>,
}

impl Listener {
    pub(crate) fn new(subscription: Subscription, receiver: Receiver<Event>) -> Self {
        Self {
            subscription,
            receiver,
        }
    }

    /// Receive the next value (blocking).
    pub fn recv(&self) -> Result<Event, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a value (non-blocking).
    pub fn try_recv(&self) -> Result<Event, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> Result<Event, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Everything received so far, without blocking.
    pub fn drain(&self) -> Vec<Event> {
        self.receiver.try_iter().collect()
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
    }
}
