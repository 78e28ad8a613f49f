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

//! An observable CoAP resource whose value is the content of an external store.
//!
//! The node answers `GET` and `PUT` with the current content, tagged with an [`ETag`]
//! fingerprint. While anyone observes it, [`VarNode::process`] re-reads the store every
//! poll period and notifies observers when the fingerprint changes. It also notifies them
//! at least once every refresh period even if nothing changed.

use super::*;
use crate::message::InboundRequest;
use crate::observable::{ObservableSet, TriggerKey};
use crate::readiness::{Descriptor, Interest, WaitSet};

mod params;
pub use params::VarNodeParams;

mod store;
pub use store::MemoryVarStore;
pub use store::VarStore;

/// Body prefix of a form-urlencoded representation.
const FORM_VALUE_PREFIX: &str = "v=";

/// What became of a request handed to [`VarNode::handle_request`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RequestOutcome {
    /// A response with the given code was written and should be sent.
    Responded(MsgCode),

    /// The request was a duplicate. Nothing was written and nothing should be sent.
    Dropped,
}

/// An observable resource backed by a [`VarStore`].
#[derive(Debug)]
pub struct VarNode<S, C> {
    store: S,
    clock: C,
    params: VarNodeParams,
    path: String,
    observable: ObservableSet,
    buffer: Vec<u8>,
    content_len: usize,
    last_etag: ETag,
    next_refresh: Timestamp,
    next_poll: Timestamp,
}

impl<S: VarStore, C: Clock> VarNode<S, C> {
    /// Creates a node serving `store`.
    ///
    /// The store is read once so that the first poll only reports real changes. Both
    /// deadlines start one full period from now.
    pub fn new(store: S, clock: C, params: VarNodeParams) -> Result<VarNode<S, C>, Error> {
        if store.location().is_empty() || params.max_content_len == 0 {
            return Err(Error::InvalidArgument);
        }

        let path = store.location().to_string();
        let next_refresh = clock.to_timestamp(params.refresh_cms());
        let next_poll = clock.to_timestamp(params.poll_cms());

        let mut ret = VarNode {
            store,
            clock,
            params,
            path,
            observable: ObservableSet::new(),
            buffer: vec![0; params.max_content_len],
            content_len: 0,
            last_etag: ETag::EMPTY,
            next_refresh,
            next_poll,
        };

        ret.last_etag = ret.load()?;
        Ok(ret)
    }

    /// The location of the backing store.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Fingerprint of the content seen by the most recent poll.
    pub fn last_etag(&self) -> ETag {
        self.last_etag
    }

    /// The node's parameters.
    pub fn params(&self) -> &VarNodeParams {
        &self.params
    }

    /// The observers of this node.
    pub fn observable(&self) -> &ObservableSet {
        &self.observable
    }

    /// The observers of this node, for the protocol engine to register and remove them.
    pub fn observable_mut(&mut self) -> &mut ObservableSet {
        &mut self.observable
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reads the store into the content buffer and returns its fingerprint.
    fn load(&mut self) -> Result<ETag, Error> {
        let len = self.store.read_content(&mut self.buffer)?;
        self.content_len = len.min(self.buffer.len());
        Ok(ETag::fingerprint(self.content()))
    }

    fn content(&self) -> &[u8] {
        &self.buffer[..self.content_len]
    }

    /// Handles a request addressed to this node, writing the response into `response`.
    ///
    /// Protocol-level failures (bad option, nested path, unsupported format or method, an
    /// oversized body) are turned into an error response here and reported as
    /// [`RequestOutcome::Responded`]. Only store failures are returned as errors, in which
    /// case `response` is cleared back to an empty code with no options or payload.
    ///
    /// `POST` must be resolved before a request reaches this node: a duplicate `POST` is
    /// dropped and a fresh one is refused with 4.05.
    pub fn handle_request(
        &mut self,
        request: &dyn InboundRequest,
        response: &mut dyn MessageWrite,
    ) -> Result<RequestOutcome, Error> {
        match self.respond(request, response) {
            Ok(()) => Ok(RequestOutcome::Responded(MsgCode::SuccessContent)),
            Err(Error::Duplicate) => {
                debug!("{}: dropping duplicate", self.path);
                response.clear();
                Ok(RequestOutcome::Dropped)
            }
            Err(err) if err.is_protocol_outcome() => {
                let code = err.response_code().unwrap_or(MsgCode::ClientErrorBadRequest);
                debug!("{}: rejecting request: {}", self.path, err);
                response.clear();
                response.set_msg_code(code);
                if err == Error::UnsupportedMediaType {
                    response.append_payload_string("Unsupported Media Type")?;
                }
                Ok(RequestOutcome::Responded(code))
            }
            Err(err) => {
                response.clear();
                Err(err)
            }
        }
    }

    fn respond(
        &mut self,
        request: &dyn InboundRequest,
        response: &mut dyn MessageWrite,
    ) -> Result<(), Error> {
        let msg = request.message();
        let mut etag = self.load()?;

        let mut accept = Some(ContentFormat::TEXT_PLAIN_UTF8);
        for (number, value) in msg.options() {
            match number {
                OptionNumber::ACCEPT | OptionNumber::CONTENT_FORMAT => {
                    accept = try_decode_u16(value).map(ContentFormat);
                }
                OptionNumber::URI_PATH => return Err(Error::NotFound),
                number if number.is_critical() => return Err(Error::BadOption),
                _ => (),
            }
        }

        match msg.msg_code() {
            MsgCode::MethodGet | MsgCode::MethodPut => (),
            MsgCode::MethodPost if request.is_dupe() => return Err(Error::Duplicate),
            MsgCode::MethodPost => {
                warn!("{}: POST was not resolved before reaching the node", self.path);
                return Err(Error::NotAllowed);
            }
            _ => return Err(Error::UnsupportedMethod),
        }

        let accept = match accept {
            Some(format) if format.is_variable_format() => format,
            _ => return Err(Error::UnsupportedMediaType),
        };

        if msg.msg_code() == MsgCode::MethodPut {
            if msg.payload().len() > self.params.max_content_len {
                return Err(Error::EntityTooLarge);
            }
            self.store.write_content(msg.payload())?;
            etag = self.load()?;
        }

        response.set_msg_code(MsgCode::SuccessContent);
        response.insert_etag(etag)?;

        if let Err(err) = self.observable.update(request, response) {
            warn!("{}: observe update failed: {}", self.path, err);
        }

        response.insert_option_with_u32(OptionNumber::MAX_AGE, self.params.max_age_secs())?;
        response.insert_content_format(OptionNumber::CONTENT_FORMAT, accept)?;

        if accept == ContentFormat::APPLICATION_FORM_URLENCODED {
            response.append_payload_string(FORM_VALUE_PREFIX)?;
        }

        response.append_payload_bytes(&self.buffer[..self.content_len])?;
        Ok(())
    }

    /// Periodic step, run by the owner after every wait.
    ///
    /// Does nothing at all while the node has no observers. Otherwise triggers one broadcast
    /// notification if the refresh deadline passed, the store raised an urgent condition or
    /// the poll found a new fingerprint. Returns true if it triggered.
    pub fn process(&mut self) -> bool {
        let observers = self.observable.observer_count();
        debug!("{}: process, {} observers", self.path, observers);

        if observers == 0 {
            return false;
        }

        let refresh_period = self.params.refresh_cms();
        let poll_period = self.params.poll_cms();
        let next_refresh = self.clock.to_cms(self.next_refresh);
        let next_poll = self.clock.to_cms(self.next_poll);
        let mut trigger = false;

        if next_refresh <= 0 || next_refresh > refresh_period {
            self.next_refresh = self.clock.to_timestamp(refresh_period);
            trigger = true;
        }

        match self.store.poll_urgent() {
            Ok(true) => trigger = true,
            Ok(false) => (),
            Err(err) => warn!("{}: urgent poll failed: {}", self.path, err),
        }

        if next_poll <= 0 || next_poll > poll_period {
            self.next_poll = self.clock.to_timestamp(poll_period);

            match self.load() {
                Ok(etag) if etag != self.last_etag => {
                    debug!("{}: content changed, etag {}", self.path, etag);
                    self.last_etag = etag;
                    trigger = true;
                }
                Ok(_) => (),
                Err(err) => warn!("{}: poll read failed: {}", self.path, err),
            }
        }

        if trigger {
            self.observable.trigger(TriggerKey::Broadcast);
        }

        trigger
    }

    /// Adds this node's interests to `set`: the store's error descriptor and the nearer of
    /// the two deadlines. Adds nothing while the node has no observers.
    pub fn update_wait_set(&mut self, set: &mut WaitSet) {
        let observers = self.observable.observer_count();
        debug!("{}: update_wait_set, {} observers", self.path, observers);

        if observers == 0 {
            return;
        }

        if let Some(fd) = self.store.error_descriptor() {
            set.add(fd, Interest::Urgent);
        }

        let refresh_period = self.params.refresh_cms();
        let poll_period = self.params.poll_cms();
        let mut next_refresh = self.clock.to_cms(self.next_refresh);
        let mut next_poll = self.clock.to_cms(self.next_poll);

        if next_refresh > refresh_period {
            next_refresh = refresh_period;
            self.next_refresh = self.clock.to_timestamp(next_refresh);
        }

        if next_poll > poll_period {
            next_poll = poll_period;
            self.next_poll = self.clock.to_timestamp(next_poll);
        }

        set.clamp_timeout(next_refresh.min(next_poll));
    }

    /// The descriptor [`VarNode::update_wait_set`] would contribute, if any.
    pub fn error_descriptor(&self) -> Option<Descriptor> {
        self.store.error_descriptor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{OwnedInboundRequest, OwnedMessage};
    use crate::observable::ObserverKey;
    use std::time::Duration;

    type TestNode = VarNode<MemoryVarStore, ManualClock>;

    fn node_with(content: &[u8]) -> (TestNode, MemoryVarStore, ManualClock) {
        let store = MemoryVarStore::new("mem:test", content);
        let clock = ManualClock::default();
        let node = VarNode::new(store.clone(), clock.clone(), VarNodeParams::default()).unwrap();
        (node, store, clock)
    }

    fn request(code: MsgCode) -> OwnedInboundRequest {
        let mut msg = OwnedMessage::request(code);
        msg.set_msg_token(MsgToken::from(0x42u32));
        OwnedInboundRequest::new(msg, "[::1]:61616".parse().unwrap())
    }

    fn get(node: &mut TestNode) -> OwnedMessage {
        let mut response = OwnedMessage::default();
        let outcome = node.handle_request(&request(MsgCode::MethodGet), &mut response);
        assert_eq!(outcome, Ok(RequestOutcome::Responded(MsgCode::SuccessContent)));
        response
    }

    fn etag_of(msg: &OwnedMessage) -> Vec<u8> {
        msg.option_values(OptionNumber::ETAG)[0].to_vec()
    }

    fn observe(node: &mut TestNode) {
        let key = ObserverKey::of(&request(MsgCode::MethodGet));
        node.observable_mut().subscribe(key);
    }

    #[test]
    fn get_is_stable() {
        let (mut node, _, _) = node_with(b"23.5");
        let first = get(&mut node);
        let second = get(&mut node);
        assert_eq!(first.payload(), b"23.5");
        assert_eq!(etag_of(&first).len(), 4);
        assert_eq!(etag_of(&first), etag_of(&second));
        assert_eq!(first.payload(), second.payload());
        assert_eq!(first.option_u32(OptionNumber::MAX_AGE), Some(31));
        assert_eq!(first.content_format(), Some(ContentFormat::TEXT_PLAIN_UTF8));
    }

    #[test]
    fn form_urlencoded_prefix() {
        let (mut node, _, _) = node_with(b"on");
        let mut req = request(MsgCode::MethodGet);
        req.message
            .insert_content_format(OptionNumber::ACCEPT, ContentFormat::APPLICATION_FORM_URLENCODED)
            .unwrap();
        let mut response = OwnedMessage::default();
        node.handle_request(&req, &mut response).unwrap();
        assert_eq!(response.payload(), b"v=on");
        assert_eq!(
            response.content_format(),
            Some(ContentFormat::APPLICATION_FORM_URLENCODED)
        );
    }

    #[test]
    fn put_then_get() {
        let (mut node, store, _) = node_with(b"0");
        let before = etag_of(&get(&mut node));

        let mut put = request(MsgCode::MethodPut);
        put.message.append_payload_bytes(b"1").unwrap();
        let mut response = OwnedMessage::default();
        node.handle_request(&put, &mut response).unwrap();
        assert_eq!(response.payload(), b"1");
        assert_eq!(store.content(), b"1".to_vec());

        let after = get(&mut node);
        assert_eq!(after.payload(), b"1");
        assert_ne!(etag_of(&after), before);

        let mut same = request(MsgCode::MethodPut);
        same.message.append_payload_bytes(b"1").unwrap();
        node.handle_request(&same, &mut OwnedMessage::default())
            .unwrap();
        assert_eq!(etag_of(&get(&mut node)), etag_of(&after));
    }

    #[test]
    fn put_with_unsupported_format_leaves_store() {
        let (mut node, store, _) = node_with(b"keep");
        let mut put = request(MsgCode::MethodPut);
        put.message
            .insert_content_format(OptionNumber::CONTENT_FORMAT, ContentFormat::APPLICATION_JSON)
            .unwrap();
        put.message.append_payload_bytes(b"{}").unwrap();

        let mut response = OwnedMessage::default();
        let outcome = node.handle_request(&put, &mut response);
        assert_eq!(
            outcome,
            Ok(RequestOutcome::Responded(
                MsgCode::ClientErrorUnsupportedMediaType
            ))
        );
        assert_eq!(response.msg_code(), MsgCode::ClientErrorUnsupportedMediaType);
        assert_eq!(store.content(), b"keep".to_vec());
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn option_scan() {
        let (mut node, _, _) = node_with(b"x");

        let mut nested = request(MsgCode::MethodGet);
        nested
            .message
            .insert_option_with_bytes(OptionNumber::URI_PATH, b"child")
            .unwrap();
        let mut response = OwnedMessage::default();
        assert_eq!(
            node.handle_request(&nested, &mut response),
            Ok(RequestOutcome::Responded(MsgCode::ClientErrorNotFound))
        );

        let mut unknown = request(MsgCode::MethodGet);
        unknown
            .message
            .insert_option_with_bytes(OptionNumber(2049), b"?")
            .unwrap();
        assert_eq!(
            node.handle_request(&unknown, &mut OwnedMessage::default()),
            Ok(RequestOutcome::Responded(MsgCode::ClientErrorBadOption))
        );

        let mut elective = request(MsgCode::MethodGet);
        elective
            .message
            .insert_option_with_bytes(OptionNumber(2048), b"?")
            .unwrap();
        assert_eq!(
            node.handle_request(&elective, &mut OwnedMessage::default()),
            Ok(RequestOutcome::Responded(MsgCode::SuccessContent))
        );
    }

    #[test]
    fn method_dispatch() {
        let (mut node, _, _) = node_with(b"x");

        let mut dupe = request(MsgCode::MethodPost);
        dupe.is_dupe = true;
        let mut response = OwnedMessage::default();
        assert_eq!(
            node.handle_request(&dupe, &mut response),
            Ok(RequestOutcome::Dropped)
        );
        assert!(response.is_blank());

        assert_eq!(
            node.handle_request(&request(MsgCode::MethodPost), &mut OwnedMessage::default()),
            Ok(RequestOutcome::Responded(MsgCode::ClientErrorMethodNotAllowed))
        );
        assert_eq!(
            node.handle_request(&request(MsgCode::MethodDelete), &mut OwnedMessage::default()),
            Ok(RequestOutcome::Responded(MsgCode::ServerErrorNotImplemented))
        );
    }

    #[test]
    fn failed_write_leaves_nothing_behind() {
        let (mut node, store, _) = node_with(b"old");
        let etag = node.last_etag();
        store.refuse_writes(true);

        let mut put = request(MsgCode::MethodPut);
        put.message.append_payload_bytes(b"new").unwrap();
        let mut response = OwnedMessage::default();
        response.set_msg_code(MsgCode::SuccessContent);
        response.insert_etag(etag).unwrap();

        let outcome = node.handle_request(&put, &mut response);
        assert_eq!(
            outcome,
            Err(Error::IoError("mem:test: write refused".to_string()))
        );
        assert!(response.is_blank());
        assert_eq!(response.msg_code(), MsgCode::Empty);
        assert_eq!(node.last_etag(), etag);
        assert_eq!(store.content(), b"old".to_vec());

        store.refuse_writes(false);
        assert_eq!(get(&mut node).payload(), b"old");
    }

    #[test]
    fn oversized_put_is_refused() {
        let store = MemoryVarStore::new("mem:test", b"0");
        let params = VarNodeParams {
            max_content_len: 4,
            ..VarNodeParams::default()
        };
        let mut node = VarNode::new(store.clone(), ManualClock::default(), params).unwrap();

        let mut put = request(MsgCode::MethodPut);
        put.message.append_payload_bytes(b"12345").unwrap();
        let mut response = OwnedMessage::default();
        assert_eq!(
            node.handle_request(&put, &mut response),
            Ok(RequestOutcome::Responded(
                MsgCode::ClientErrorRequestEntityTooLarge
            ))
        );
        assert_eq!(store.write_count(), 0);
        assert_eq!(store.content(), b"0".to_vec());

        let mut fits = request(MsgCode::MethodPut);
        fits.message.append_payload_bytes(b"1234").unwrap();
        node.handle_request(&fits, &mut OwnedMessage::default())
            .unwrap();
        assert_eq!(store.content(), b"1234".to_vec());
    }

    #[test]
    fn observer_response_carries_sequence() {
        let (mut node, _, _) = node_with(b"x");
        observe(&mut node);
        let response = get(&mut node);
        assert_eq!(response.option_u32(OptionNumber::OBSERVE), Some(0));
    }

    #[test]
    fn unobserved_node_is_idle() {
        let (mut node, store, clock) = node_with(b"x");
        let reads = store.read_count();
        clock.advance(60_000);
        store.set_content(b"y");

        assert!(!node.process());
        let mut set = WaitSet::new();
        node.update_wait_set(&mut set);

        assert!(set.is_empty());
        assert_eq!(store.read_count(), reads);
        assert_eq!(node.observable().trigger_count(), 0);
    }

    #[test]
    fn poll_detects_change() {
        let (mut node, store, clock) = node_with(b"1");
        observe(&mut node);

        clock.advance(999);
        store.set_content(b"2");
        assert!(!node.process());
        assert_eq!(node.observable().trigger_count(), 0);

        clock.advance(1);
        assert!(node.process());
        assert_eq!(node.observable().trigger_count(), 1);
        assert_eq!(node.last_etag(), ETag::fingerprint(b"2"));

        assert!(!node.process());
        assert_eq!(node.observable().trigger_count(), 1);
    }

    #[test]
    fn refresh_is_a_liveness_signal() {
        let (mut node, _, clock) = node_with(b"same");
        observe(&mut node);

        for _ in 0..29 {
            clock.advance(1000);
            node.process();
        }
        assert_eq!(node.observable().trigger_count(), 0);

        clock.advance(1000);
        assert!(node.process());
        assert_eq!(node.observable().trigger_count(), 1);
        assert_eq!(node.observable().take_pending().len(), 1);
    }

    #[test]
    fn urgent_condition_triggers() {
        let (mut node, store, _) = node_with(b"same");
        observe(&mut node);
        store.raise_urgent();
        assert!(node.process());
        assert!(!node.process());
    }

    #[test]
    fn wait_set_contribution() {
        let store = MemoryVarStore::new("mem:test", b"x");
        let clock = ManualClock::default();
        let params = VarNodeParams {
            poll_period: Duration::from_millis(250),
            ..VarNodeParams::default()
        };
        let mut node = VarNode::new(store, clock.clone(), params).unwrap();
        observe(&mut node);

        clock.advance(100);
        let mut set = WaitSet::new();
        set.clamp_timeout(10_000);
        node.update_wait_set(&mut set);
        assert_eq!(set.timeout(), Some(150));
        assert!(set.entries().is_empty());
    }

    #[test]
    fn empty_location_rejected() {
        let store = MemoryVarStore::new("", b"x");
        let result = VarNode::new(store, ManualClock::default(), VarNodeParams::default());
        assert_eq!(result.err(), Some(Error::InvalidArgument));
    }
}
