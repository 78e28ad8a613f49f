// Copyright 2019 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Server-side bookkeeping of CoAP observers ([IETF-RFC7641]).
//!
//! [IETF-RFC7641]: https://tools.ietf.org/html/rfc7641

use super::*;
use crate::message::InboundRequest;
use std::net::SocketAddr;

/// Identifies one observer: the peer and the token it registered with.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ObserverKey {
    /// Address of the observing peer.
    pub remote: SocketAddr,

    /// Token of the registering request, echoed in every notification.
    pub token: MsgToken,
}

impl ObserverKey {
    /// Returns the key identifying the sender of `request`.
    pub fn of(request: &dyn InboundRequest) -> ObserverKey {
        ObserverKey {
            remote: request.remote_socket_addr(),
            token: request.message().msg_token(),
        }
    }
}

/// Selects which observers a trigger applies to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TriggerKey {
    /// Every registered observer.
    Broadcast,

    /// Only the given observer.
    Observer(ObserverKey),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct Observer {
    key: ObserverKey,
    pending: bool,
}

/// The set of observers of one resource.
///
/// The protocol engine registers and removes observers. The resource itself only reads the
/// count, stamps its responses with [`ObservableSet::update`] and calls
/// [`ObservableSet::trigger`] when its value changed. One trigger is a single logical
/// notification. [`ObservableSet::take_pending`] hands the engine everyone who still needs
/// to receive it.
#[derive(Debug, Clone, Default)]
pub struct ObservableSet {
    observers: Vec<Observer>,
    seq: u32,
    trigger_count: u32,
}

impl ObservableSet {
    /// Creates an empty observer set.
    pub fn new() -> ObservableSet {
        ObservableSet::default()
    }

    /// Registers an observer. Registering the same key again only renews it.
    pub fn subscribe(&mut self, key: ObserverKey) {
        if !self.observers.iter().any(|o| o.key == key) {
            debug!("observer {} registered from {}", key.token, key.remote);
            self.observers.push(Observer {
                key,
                pending: false,
            });
        }
    }

    /// Removes an observer. Returns true if it was registered.
    pub fn unsubscribe(&mut self, key: &ObserverKey) -> bool {
        let before = self.observers.len();
        self.observers.retain(|o| o.key != *key);
        before != self.observers.len()
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Returns true if `key` is registered.
    pub fn contains(&self, key: &ObserverKey) -> bool {
        self.observers.iter().any(|o| o.key == *key)
    }

    /// Current notification sequence number, as carried in the Observe option.
    pub fn sequence(&self) -> u32 {
        self.seq & OBSERVE_SEQ_MASK
    }

    /// Number of triggers since creation.
    pub fn trigger_count(&self) -> u32 {
        self.trigger_count
    }

    /// Stamps a response to `request` for observation.
    ///
    /// If the sender of `request` is a registered observer, an Observe option carrying the
    /// current sequence number is added to `response` and the observer is renewed, clearing
    /// any notification still pending for it. Returns true if the option was added.
    ///
    /// Must be called after options numbered below Observe and before the payload.
    pub fn update(
        &mut self,
        request: &dyn InboundRequest,
        response: &mut dyn MessageWrite,
    ) -> Result<bool, Error> {
        let key = ObserverKey::of(request);
        let seq = self.sequence();
        match self.observers.iter_mut().find(|o| o.key == key) {
            Some(observer) => {
                response.insert_option_with_u32(OptionNumber::OBSERVE, seq)?;
                observer.pending = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Marks the observers selected by `key` as needing a notification and advances the
    /// sequence number. Returns the number of observers that were marked.
    pub fn trigger(&mut self, key: TriggerKey) -> usize {
        self.seq = self.seq.wrapping_add(1) & OBSERVE_SEQ_MASK;
        self.trigger_count = self.trigger_count.wrapping_add(1);

        let mut marked = 0;
        for observer in self.observers.iter_mut() {
            let selected = match key {
                TriggerKey::Broadcast => true,
                TriggerKey::Observer(k) => observer.key == k,
            };
            if selected {
                observer.pending = true;
                marked += 1;
            }
        }
        debug!("trigger {:?}: {} observers marked", key, marked);
        marked
    }

    /// Returns the observers still waiting for a notification. They stay pending until a
    /// response to them goes through [`ObservableSet::update`].
    pub fn take_pending(&self) -> Vec<ObserverKey> {
        self.observers
            .iter()
            .filter(|o| o.pending)
            .map(|o| o.key)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{OwnedInboundRequest, OwnedMessage};

    fn request_from(remote: &str, token: u32) -> OwnedInboundRequest {
        let mut msg = OwnedMessage::request(MsgCode::MethodGet);
        msg.set_msg_token(MsgToken::from(token));
        OwnedInboundRequest::new(msg, remote.parse().unwrap())
    }

    #[test]
    fn subscribe_is_idempotent() {
        let mut set = ObservableSet::new();
        let req = request_from("[::1]:1234", 7);
        set.subscribe(ObserverKey::of(&req));
        set.subscribe(ObserverKey::of(&req));
        assert_eq!(set.observer_count(), 1);
        assert!(set.unsubscribe(&ObserverKey::of(&req)));
        assert!(!set.unsubscribe(&ObserverKey::of(&req)));
        assert_eq!(set.observer_count(), 0);
    }

    #[test]
    fn broadcast_then_update() {
        let mut set = ObservableSet::new();
        let a = request_from("[::1]:1000", 1);
        let b = request_from("[::1]:2000", 2);
        set.subscribe(ObserverKey::of(&a));
        set.subscribe(ObserverKey::of(&b));

        assert_eq!(set.trigger(TriggerKey::Broadcast), 2);
        assert_eq!(set.trigger_count(), 1);
        assert_eq!(set.take_pending().len(), 2);

        let mut response = OwnedMessage::default();
        assert_eq!(set.update(&a, &mut response), Ok(true));
        assert_eq!(
            response.option_values(OptionNumber::OBSERVE),
            vec![&[1u8][..]]
        );
        assert_eq!(set.take_pending(), vec![ObserverKey::of(&b)]);
    }

    #[test]
    fn update_ignores_strangers() {
        let mut set = ObservableSet::new();
        let mut response = OwnedMessage::default();
        let stranger = request_from("127.0.0.1:5683", 9);
        assert_eq!(set.update(&stranger, &mut response), Ok(false));
        assert!(response.option_values(OptionNumber::OBSERVE).is_empty());
    }

    #[test]
    fn sequence_wraps_at_24_bits() {
        let mut set = ObservableSet::new();
        set.seq = OBSERVE_SEQ_MASK;
        set.trigger(TriggerKey::Broadcast);
        assert_eq!(set.sequence(), 0);
    }
}
