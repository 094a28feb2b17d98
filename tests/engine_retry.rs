// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Exercise bounded retry and reject handling of the request engine.
// Author: Lukas Bower
#![forbid(unsafe_code)]

mod support;

use std::time::Duration;

use fcgs::codec::{command, ACCEPT};
use fcgs::engine::{CtRequest, RetryPolicy};
use fcgs::error::CtError;
use fcgs::tables::reason;

use support::{accept, reject, response, scripted_client, Reply};

fn gdid_request() -> ([u8; 8], usize) {
    ([0x10, 0, 0, 0x05, 0x1e, 0x35, 0x8e, 0x01], 20)
}

#[test]
fn silent_transport_is_tried_three_times() {
    let mut client = scripted_client(vec![Reply::Fail, Reply::Fail, Reply::Fail, Reply::Fail]);
    let (key, size) = gdid_request();
    let request = CtRequest::fabric_config(command::GDID, &key, size);
    assert_eq!(client.send_ct(&request), None);
    assert_eq!(client.transport().passthru().calls(), 3);
    assert_eq!(client.sleeper().calls(), 2);
    assert_eq!(
        client.sleeper().durations(),
        vec![Duration::from_secs(1), Duration::from_secs(1)]
    );
}

#[test]
fn failure_then_accept_returns_payload() {
    let mut client = scripted_client(vec![Reply::Fail, Reply::Bytes(accept(&[0, 0, 0, 0x65]))]);
    let (key, size) = gdid_request();
    let request = CtRequest::fabric_config(command::GDID, &key, size);
    assert_eq!(client.send_ct(&request), Some(vec![0, 0, 0, 0x65]));
    assert_eq!(client.transport().passthru().calls(), 2);
    assert_eq!(client.sleeper().calls(), 1);
}

#[test]
fn reject_ends_the_query_without_retry() {
    let mut client = scripted_client(vec![
        Reply::Bytes(reject(reason::UNABLE_TO_PERFORM, 0x2a)),
        Reply::Bytes(accept(&[0, 0, 0, 1])),
    ]);
    let (key, size) = gdid_request();
    let request = CtRequest::fabric_config(command::GDID, &key, size);
    assert_eq!(client.send_ct(&request), None);
    assert_eq!(client.transport().passthru().calls(), 1);
    assert_eq!(client.sleeper().calls(), 0);
}

#[test]
fn persistent_non_conforming_gives_up_after_policy_attempts() {
    let echoed = || Reply::Bytes(response(command::GDID, 0, 0, &[]));
    let mut client = scripted_client(vec![echoed(), echoed(), echoed(), echoed(), echoed()])
        .with_policy(RetryPolicy {
            max_attempts: 5,
            delay: Duration::from_millis(10),
        });
    let (key, size) = gdid_request();
    let request = CtRequest::fabric_config(command::GDID, &key, size);
    assert_eq!(client.send_ct(&request), None);
    assert_eq!(client.transport().passthru().calls(), 5);
    assert_eq!(client.sleeper().calls(), 4);
}

#[test]
fn zero_attempt_policy_still_sends_once() {
    let mut client = scripted_client(vec![Reply::Fail]).with_policy(RetryPolicy {
        max_attempts: 0,
        delay: Duration::ZERO,
    });
    assert_eq!(client.policy().max_attempts, 1);
    let (key, size) = gdid_request();
    let request = CtRequest::fabric_config(command::GDID, &key, size);
    assert_eq!(client.send_ct(&request), None);
    assert_eq!(client.transport().passthru().calls(), 1);
}

#[test]
fn unframeable_request_never_reaches_the_adapter() {
    let mut client = scripted_client(vec![Reply::Bytes(accept(&[]))]);
    let request = CtRequest::fabric_config(command::GIEL, &[], 15);
    assert_eq!(client.send_ct(&request), None);
    assert_eq!(client.transport().passthru().calls(), 0);
}

#[test]
fn request_frame_addresses_the_fabric_configuration_server() {
    let mut client = scripted_client(vec![Reply::Bytes(accept(&[0, 0, 0, 1]))]);
    let (key, size) = gdid_request();
    let request = CtRequest::fabric_config(command::GDID, &key, size);
    client.send_ct(&request);
    let frame = &client.transport().passthru().requests()[0];
    assert_eq!(
        &frame[..16],
        &[0x03, 0, 0, 0, 0xfa, 0x01, 0, 0, 0x01, 0x12, 0x00, 0x01, 0, 0, 0, 0]
    );
    assert_eq!(&frame[16..], &key);
}

#[test]
fn exchange_reports_each_outcome_once() {
    let mut client = scripted_client(vec![
        Reply::Bytes(reject(reason::LOGICAL_BUSY, 0)),
        Reply::Fail,
        Reply::Bytes(response(0x1234, 0, 0, &[])),
        Reply::Bytes(response(ACCEPT, 0, 0, &[0, 0, 0, 9])),
    ]);
    let (key, size) = gdid_request();
    let request = CtRequest::fabric_config(command::GDID, &key, size);
    assert!(matches!(client.exchange(&request), Err(CtError::Reject(r)) if r.code == reason::LOGICAL_BUSY));
    assert!(matches!(client.exchange(&request), Err(CtError::Transport(_))));
    assert!(matches!(client.exchange(&request), Err(CtError::NonConforming(0x1234))));
    let accepted = client.exchange(&request).expect("accept");
    assert_eq!(accepted.payload, vec![0, 0, 0, 9]);
    assert_eq!(client.sleeper().calls(), 0);
}
