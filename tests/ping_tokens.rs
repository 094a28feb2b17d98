// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Exercise FPNG token renegotiation, no-response retries and ping pacing.
// Author: Lukas Bower
#![forbid(unsafe_code)]

mod support;

use std::ops::ControlFlow;
use std::time::Duration;

use fcgs::codec::command;
use fcgs::error::PingError;
use fcgs::ping::{PingEvent, PingOptions, Pinger};
use fcgs::tables::{explanation, reason};
use fcgs::types::{PortAddress, PortId, Wwn};

use support::{accept, command_of, reject, response, scripted_client, Reply};

const TARGET: u64 = 0x5005_0763_0300_c562;

fn options(count: u32, token: u32) -> PingOptions {
    PingOptions {
        count,
        token,
        interval: Duration::from_millis(250),
        no_response_retries: 2,
    }
}

fn sent_token(request: &[u8]) -> u32 {
    let tail = &request[request.len() - 4..];
    u32::from_be_bytes([tail[0], tail[1], tail[2], tail[3]])
}

fn busy() -> Reply {
    Reply::Bytes(reject(reason::LOGICAL_ERROR, explanation::PROCESSING_REQUEST))
}

#[test]
fn busy_token_is_bumped_and_resubmitted() {
    let mut client = scripted_client(vec![busy(), Reply::Bytes(accept(&[0; 4]))]);
    let mut pinger = Pinger::new(PortAddress::Name(Wwn::new(TARGET)), options(1, 41));
    let mut events = Vec::new();
    let received = pinger
        .run(&mut client, |event| {
            events.push(*event);
            ControlFlow::Continue(())
        })
        .expect("ping");

    assert_eq!(received, 1);
    let requests = client.transport().passthru().requests();
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|request| command_of(request) == command::FPNG));
    assert_eq!(sent_token(&requests[0]), 41);
    assert_eq!(sent_token(&requests[1]), 42);
    assert!(events.contains(&PingEvent::TokenInUse { token: 41 }));
    match events.last() {
        Some(PingEvent::Echo(echo)) => assert_eq!(echo.token, 42),
        other => panic!("unexpected last event {other:?}"),
    }
    assert_eq!(pinger.token(), 43);
    assert_eq!(pinger.stats().count(), 1);
}

#[test]
fn echoes_advance_the_token_and_pause_between_them() {
    let replies = (0..3).map(|_| Reply::Bytes(accept(&[0; 4]))).collect();
    let mut client = scripted_client(replies);
    let mut pinger = Pinger::new(PortAddress::Id(PortId::new(0x656d00)), options(3, 7));
    let received = pinger
        .run(&mut client, |_| ControlFlow::Continue(()))
        .expect("ping");

    assert_eq!(received, 3);
    let tokens: Vec<u32> = client
        .transport()
        .passthru()
        .requests()
        .iter()
        .map(|request| sent_token(request))
        .collect();
    assert_eq!(tokens, vec![7, 8, 9]);
    assert_eq!(
        client.sleeper().durations(),
        vec![Duration::from_millis(250), Duration::from_millis(250)]
    );
}

#[test]
fn other_rejects_abort_the_session() {
    let mut client = scripted_client(vec![Reply::Bytes(reject(reason::UNABLE_TO_PERFORM, 0x01))]);
    let mut pinger = Pinger::new(PortAddress::Name(Wwn::new(TARGET)), options(3, 0));
    let outcome = pinger.run(&mut client, |_| ControlFlow::Continue(()));
    match outcome {
        Err(PingError::Rejected(reason)) => {
            assert_eq!(
                reason.to_string(),
                "Error: Unable to perform command request-> Port Identifier not registered."
            );
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(client.transport().passthru().calls(), 1);
}

#[test]
fn missing_responses_exhaust_the_retry_budget() {
    let mut client = scripted_client(vec![Reply::Fail, Reply::Fail, Reply::Fail, Reply::Fail]);
    let mut pinger = Pinger::new(PortAddress::Name(Wwn::new(TARGET)), options(3, 0));
    let outcome = pinger.run(&mut client, |_| ControlFlow::Continue(()));
    assert!(matches!(outcome, Err(PingError::NoResponse(_))));
    assert_eq!(client.transport().passthru().calls(), 3);
    assert_eq!(client.sleeper().calls(), 0);
}

#[test]
fn a_response_refills_the_retry_budget() {
    let mut client = scripted_client(vec![
        Reply::Fail,
        Reply::Fail,
        Reply::Bytes(accept(&[0; 4])),
        Reply::Fail,
        Reply::Fail,
        Reply::Bytes(accept(&[0; 4])),
    ]);
    let mut pinger = Pinger::new(PortAddress::Name(Wwn::new(TARGET)), options(2, 0));
    let received = pinger
        .run(&mut client, |_| ControlFlow::Continue(()))
        .expect("ping");
    assert_eq!(received, 2);
    assert_eq!(client.transport().passthru().calls(), 6);
}

#[test]
fn non_conforming_answer_aborts() {
    let mut client = scripted_client(vec![Reply::Bytes(response(command::FPNG, 0, 0, &[]))]);
    let mut pinger = Pinger::new(PortAddress::Name(Wwn::new(TARGET)), options(3, 0));
    let outcome = pinger.run(&mut client, |_| ControlFlow::Continue(()));
    assert!(matches!(outcome, Err(PingError::NonConforming(code)) if code == command::FPNG));
}

#[test]
fn observer_can_stop_before_sending() {
    let mut client = scripted_client(vec![Reply::Bytes(accept(&[0; 4]))]);
    let mut pinger = Pinger::new(PortAddress::Name(Wwn::new(TARGET)), options(3, 0));
    let received = pinger
        .run(&mut client, |event| match event {
            PingEvent::Sending { .. } => ControlFlow::Break(()),
            _ => ControlFlow::Continue(()),
        })
        .expect("ping");
    assert_eq!(received, 0);
    assert_eq!(client.transport().passthru().calls(), 0);
}
