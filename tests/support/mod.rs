// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Scripted pass-through, fabric responder and frame builders for integration tests.
// Author: Lukas Bower
#![forbid(unsafe_code)]
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::time::Duration;

use fcgs::codec::{ACCEPT, PREAMBLE_LEN, REJECT};
use fcgs::engine::{CtClient, Sleeper};
use fcgs::error::TransportError;
use fcgs::transport::CtPassThru;

/// Status returned once a script runs dry.
pub const EXHAUSTED: u32 = 0xdead;

/// One scripted answer.
pub enum Reply {
    /// Bytes copied into the response buffer.
    Bytes(Vec<u8>),
    /// Pass-through failure.
    Fail,
}

/// Replays queued answers in order and records every request.
#[derive(Default)]
pub struct ScriptedPassThru {
    replies: VecDeque<Reply>,
    requests: Vec<Vec<u8>>,
}

impl ScriptedPassThru {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: replies.into(),
            requests: Vec::new(),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.len()
    }

    pub fn requests(&self) -> &[Vec<u8>] {
        &self.requests
    }
}

fn copy_reply(bytes: &[u8], response: &mut [u8]) {
    let len = bytes.len().min(response.len());
    response[..len].copy_from_slice(&bytes[..len]);
}

impl CtPassThru for ScriptedPassThru {
    fn pass_thru(&mut self, request: &[u8], response: &mut [u8]) -> Result<(), TransportError> {
        self.requests.push(request.to_vec());
        match self.replies.pop_front() {
            Some(Reply::Bytes(bytes)) => {
                copy_reply(&bytes, response);
                Ok(())
            }
            Some(Reply::Fail) => Err(TransportError::Status(1)),
            None => Err(TransportError::Status(EXHAUSTED)),
        }
    }
}

/// Answers each request from a handler keyed on command code and payload.
pub struct FabricPassThru<F> {
    handler: F,
    requests: Vec<Vec<u8>>,
}

impl<F> FabricPassThru<F>
where
    F: FnMut(u16, &[u8]) -> Option<Vec<u8>>,
{
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            requests: Vec::new(),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.len()
    }

    pub fn commands(&self) -> Vec<u16> {
        self.requests.iter().map(|request| command_of(request)).collect()
    }
}

impl<F> CtPassThru for FabricPassThru<F>
where
    F: FnMut(u16, &[u8]) -> Option<Vec<u8>>,
{
    fn pass_thru(&mut self, request: &[u8], response: &mut [u8]) -> Result<(), TransportError> {
        self.requests.push(request.to_vec());
        match (self.handler)(command_of(request), &request[PREAMBLE_LEN..]) {
            Some(bytes) => {
                copy_reply(&bytes, response);
                Ok(())
            }
            None => Err(TransportError::Status(1)),
        }
    }
}

/// Counts pauses instead of sleeping.
#[derive(Default)]
pub struct CountingSleeper {
    calls: Cell<u32>,
    slept: RefCell<Vec<Duration>>,
}

impl CountingSleeper {
    pub fn calls(&self) -> u32 {
        self.calls.get()
    }

    pub fn durations(&self) -> Vec<Duration> {
        self.slept.borrow().clone()
    }
}

impl Sleeper for CountingSleeper {
    fn sleep(&self, duration: Duration) {
        self.calls.set(self.calls.get() + 1);
        self.slept.borrow_mut().push(duration);
    }
}

pub fn scripted_client(replies: Vec<Reply>) -> CtClient<ScriptedPassThru, CountingSleeper> {
    CtClient::with_sleeper(ScriptedPassThru::new(replies), CountingSleeper::default())
}

pub fn fabric_client<F>(handler: F) -> CtClient<FabricPassThru<F>, CountingSleeper>
where
    F: FnMut(u16, &[u8]) -> Option<Vec<u8>>,
{
    CtClient::with_sleeper(FabricPassThru::new(handler), CountingSleeper::default())
}

/// Command code of an encoded request.
pub fn command_of(request: &[u8]) -> u16 {
    u16::from_be_bytes([request[8], request[9]])
}

/// Big-endian u64 key at the start of a request payload.
pub fn wwn_key(payload: &[u8]) -> u64 {
    let mut key = [0u8; 8];
    key.copy_from_slice(&payload[..8]);
    u64::from_be_bytes(key)
}

/// Response frame with `code`, reject reason bytes and `payload`.
pub fn response(code: u16, reason: u8, explanation: u8, payload: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0x03, 0, 0, 0, 0xfa, 0x01, 0, 0];
    bytes.extend_from_slice(&code.to_be_bytes());
    bytes.extend_from_slice(&[0, 0, 0, reason, explanation, 0]);
    bytes.extend_from_slice(payload);
    bytes
}

pub fn accept(payload: &[u8]) -> Vec<u8> {
    response(ACCEPT, 0, 0, payload)
}

pub fn reject(reason: u8, explanation: u8) -> Vec<u8> {
    response(REJECT, reason, explanation, &[])
}

pub fn accept_u32(value: u32) -> Vec<u8> {
    accept(&value.to_be_bytes())
}

/// GPS accept carrying `state` at payload byte 7.
pub fn accept_state(state: u8) -> Vec<u8> {
    accept(&[0, 0, 0, 0, 0, 0, 0, state])
}

/// Counted list of 12 byte entries.
pub fn accept_list(entries: &[[u8; 12]]) -> Vec<u8> {
    let mut payload = (entries.len() as u32).to_be_bytes().to_vec();
    for entry in entries {
        payload.extend_from_slice(entry);
    }
    accept(&payload)
}

fn entry(name: u64, tail: [u8; 4]) -> [u8; 12] {
    let mut bytes = [0u8; 12];
    bytes[..8].copy_from_slice(&name.to_be_bytes());
    bytes[8..].copy_from_slice(&tail);
    bytes
}

pub fn ice_entry(name: u64, element_type: u8) -> [u8; 12] {
    entry(name, [0, 0, 0, element_type])
}

pub fn port_entry(name: u64, module: u8, tx: u8, port_type: u8) -> [u8; 12] {
    entry(name, [0, module, tx, port_type])
}

pub fn attached_entry(name: u64, flags: u8, port_type: u8) -> [u8; 12] {
    entry(name, [0, 0, flags, port_type])
}
