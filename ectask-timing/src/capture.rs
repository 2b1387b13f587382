//! Response capture: races qualifying input events against a deadline.
//!
//! Every capture owns its own subscription to the [`InputBus`] and its own
//! deadline timer. Both live inside the pending value, so whichever way the
//! race ends (token, timeout, or the caller dropping the future) the
//! subscription is removed and the timer cleared exactly once.

use std::pin::Pin;
use std::time::Duration;

use ectask_core::{Response, Token, TokenSet};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{Instant, Sleep};
use tracing::{debug, warn};

/// One raw input event, as delivered by the input source.
#[derive(Debug, Clone, PartialEq)]
pub struct InputEvent {
    pub token: Token,
    pub repeat: bool,
    pub timestamp: Instant,
}

impl InputEvent {
    /// A fresh (non-repeat) key press stamped now.
    pub fn press(raw: &str) -> Self {
        Self {
            token: Token::new(raw),
            repeat: false,
            timestamp: Instant::now(),
        }
    }

    pub fn repeated(raw: &str) -> Self {
        Self {
            repeat: true,
            ..Self::press(raw)
        }
    }
}

/// Terminal outcome of one capture.
#[derive(Debug, Clone, PartialEq)]
pub enum Captured {
    Response { token: Token, at: Instant },
    Timeout,
}

impl Captured {
    pub fn into_response(self) -> Response {
        match self {
            Captured::Response { token, .. } => Response::Token(token),
            Captured::Timeout => Response::Timeout,
        }
    }

    /// Milliseconds from `onset` to the response event; `None` on timeout.
    pub fn latency_ms(&self, onset: Instant) -> Option<f64> {
        match self {
            Captured::Response { at, .. } => {
                Some(at.saturating_duration_since(onset).as_nanos() as f64 / 1_000_000.0)
            }
            Captured::Timeout => None,
        }
    }
}

/// Single input-event channel. Events published while nobody is capturing
/// are dropped, the way a key press with no listener attached is lost.
#[derive(Debug, Clone)]
pub struct InputBus {
    tx: broadcast::Sender<InputEvent>,
}

impl Default for InputBus {
    fn default() -> Self {
        Self::new(64)
    }
}

impl InputBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publishes `event`; returns whether any capture was listening.
    pub fn publish(&self, event: InputEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    /// Number of captures currently subscribed.
    pub fn listeners(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Subscribes and starts the deadline now. Arm before the stimulus that
    /// invites the response goes up, so an immediate press is not missed.
    pub fn arm(&self, valid: TokenSet, timeout: Duration) -> PendingResponse {
        PendingResponse {
            armed: Armed::new(self.tx.subscribe(), timeout),
            valid,
        }
    }

    /// Arms a typed-entry capture: digits accumulate (at most `max_len`),
    /// `backspace` removes the last one and `enter` submits.
    pub fn arm_entry(&self, max_len: usize, timeout: Duration) -> PendingEntry {
        PendingEntry {
            armed: Armed::new(self.tx.subscribe(), timeout),
            max_len,
        }
    }

    pub async fn await_response(&self, valid: TokenSet, timeout: Duration) -> Captured {
        self.arm(valid, timeout).resolve().await
    }
}

struct Armed {
    rx: broadcast::Receiver<InputEvent>,
    deadline_at: Instant,
    deadline: Pin<Box<Sleep>>,
}

impl Armed {
    fn new(rx: broadcast::Receiver<InputEvent>, timeout: Duration) -> Self {
        let deadline_at = Instant::now() + timeout;
        Self {
            rx,
            deadline_at,
            deadline: Box::pin(tokio::time::sleep_until(deadline_at)),
        }
    }

    /// Next non-repeat event stamped before the deadline, or `None` once the
    /// deadline fires.
    async fn next_event(&mut self) -> Option<InputEvent> {
        loop {
            tokio::select! {
                biased;
                received = self.rx.recv() => match received {
                    Ok(event) if event.repeat => continue,
                    Ok(event) if event.timestamp > self.deadline_at => return None,
                    Ok(event) => return Some(event),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "input capture lagged; oldest events dropped");
                        continue;
                    }
                    Err(RecvError::Closed) => {
                        // Input source is gone: only the timer can end this.
                        (&mut self.deadline).await;
                        return None;
                    }
                },
                () = &mut self.deadline => return None,
            }
        }
    }
}

#[must_use = "a pending response does nothing until resolved"]
pub struct PendingResponse {
    armed: Armed,
    valid: TokenSet,
}

impl PendingResponse {
    pub async fn resolve(mut self) -> Captured {
        while let Some(event) = self.armed.next_event().await {
            if self.valid.contains(&event.token) {
                debug!(token = %event.token, "response captured");
                return Captured::Response {
                    token: event.token,
                    at: event.timestamp,
                };
            }
        }
        debug!("response window timed out");
        Captured::Timeout
    }
}

#[must_use = "a pending entry does nothing until resolved"]
pub struct PendingEntry {
    armed: Armed,
    max_len: usize,
}

impl PendingEntry {
    pub async fn resolve(mut self) -> Captured {
        let mut typed = String::with_capacity(self.max_len);
        while let Some(event) = self.armed.next_event().await {
            match event.token.as_str() {
                "enter" => {
                    debug!(entry = %typed, "entry submitted");
                    return Captured::Response {
                        token: Token::new(&typed),
                        at: event.timestamp,
                    };
                }
                "backspace" => {
                    typed.pop();
                }
                _ => {
                    if let Some(digit) = event.token.digit() {
                        if typed.len() < self.max_len {
                            typed.push(digit);
                        }
                    }
                }
            }
        }
        debug!(partial = %typed, "entry timed out");
        Captured::Timeout
    }
}
