//! Channel between the agent (VM execution thread) and the transport thread.
//!
//! The transport only enqueues decoded requests and drains outgoing messages,
//! all agent state is touched by the execution thread alone.

use crate::protocol::events::Notification;
use crate::protocol::{DispatchRequest, Response};
use anyhow::anyhow;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

/// Outcome of a blocking receive.
#[derive(Debug)]
pub enum Received {
    Message(DispatchRequest),
    Timeout,
    Disconnected,
}

/// Agent side of the protocol channel.
pub trait ProtocolChannel {
    /// Push an event to the frontend.
    fn send_notification(&self, notification: Notification) -> anyhow::Result<()>;

    /// Answer a request.
    fn send_response(&self, response: Response) -> anyhow::Result<()>;

    /// Block until the next request, channel close or timeout. `None` timeout blocks forever.
    fn receive(&self, timeout: Option<Duration>) -> Received;

    /// Take the next request if one is already queued.
    fn try_receive(&self) -> Option<DispatchRequest>;
}

/// Message from the agent to the frontend.
#[derive(Debug, Clone, PartialEq)]
pub enum Outgoing {
    Response(Response),
    Notification(Notification),
}

impl Outgoing {
    pub fn to_json(&self) -> anyhow::Result<serde_json::Value> {
        Ok(match self {
            Outgoing::Response(r) => serde_json::to_value(r)?,
            Outgoing::Notification(n) => serde_json::to_value(n)?,
        })
    }
}

/// [`ProtocolChannel`] implementation over a pair of mpsc queues.
pub struct QueueChannel {
    requests: Receiver<DispatchRequest>,
    outgoing: Sender<Outgoing>,
}

/// Transport side of a [`QueueChannel`], may be moved to another thread.
pub struct TransportHandle {
    requests: Sender<DispatchRequest>,
    outgoing: Receiver<Outgoing>,
}

/// Create a connected channel pair.
pub fn queue_channel() -> (QueueChannel, TransportHandle) {
    let (req_tx, req_rx) = mpsc::channel();
    let (out_tx, out_rx) = mpsc::channel();
    (
        QueueChannel {
            requests: req_rx,
            outgoing: out_tx,
        },
        TransportHandle {
            requests: req_tx,
            outgoing: out_rx,
        },
    )
}

impl ProtocolChannel for QueueChannel {
    fn send_notification(&self, notification: Notification) -> anyhow::Result<()> {
        self.outgoing
            .send(Outgoing::Notification(notification))
            .map_err(|_| anyhow!("transport disconnected"))
    }

    fn send_response(&self, response: Response) -> anyhow::Result<()> {
        self.outgoing
            .send(Outgoing::Response(response))
            .map_err(|_| anyhow!("transport disconnected"))
    }

    fn receive(&self, timeout: Option<Duration>) -> Received {
        match timeout {
            None => match self.requests.recv() {
                Ok(req) => Received::Message(req),
                Err(_) => Received::Disconnected,
            },
            Some(timeout) => match self.requests.recv_timeout(timeout) {
                Ok(req) => Received::Message(req),
                Err(RecvTimeoutError::Timeout) => Received::Timeout,
                Err(RecvTimeoutError::Disconnected) => Received::Disconnected,
            },
        }
    }

    fn try_receive(&self) -> Option<DispatchRequest> {
        self.requests.try_recv().ok()
    }
}

impl TransportHandle {
    /// Enqueue a request for the agent.
    pub fn send(&self, request: DispatchRequest) -> anyhow::Result<()> {
        self.requests
            .send(request)
            .map_err(|_| anyhow!("agent disconnected"))
    }

    /// Decode a raw json request and enqueue it.
    pub fn send_json(&self, message: &str) -> anyhow::Result<()> {
        self.send(DispatchRequest::from_json(message)?)
    }

    /// Wait for the next outgoing message.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Outgoing> {
        self.outgoing.recv_timeout(timeout).ok()
    }

    /// Take every message the agent produced so far.
    pub fn drain(&self) -> Vec<Outgoing> {
        let mut messages = vec![];
        loop {
            match self.outgoing.try_recv() {
                Ok(msg) => messages.push(msg),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        messages
    }
}
