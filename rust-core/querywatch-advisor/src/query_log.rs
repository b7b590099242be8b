// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//!
//! Bounded query log.
//!
//! Every raw observation can be forwarded to a [`QueryLog`] owned by the
//! caller. The log is a bounded channel: producers never block, entries that
//! do not fit are dropped and counted, and the owner drains at its own pace.
//! Lifecycle is explicit: [`QueryLog::start`], [`QueryLog::drain`],
//! [`QueryLog::stop`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};
use uuid::Uuid;

use crate::error::AdvisorError;

/// One raw observation as it was recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedQuery {
    /// Session that recorded the query.
    pub session_id: Uuid,
    /// Query text before normalization.
    pub query: String,
    pub execution_time_ms: i64,
    pub row_count: u64,
    pub recorded_at: DateTime<Utc>,
}

/// Producer half of a [`QueryLog`]. Cheap to clone.
#[derive(Debug, Clone)]
pub struct QueryLogSink {
    sender: mpsc::Sender<LoggedQuery>,
    dropped: Arc<AtomicU64>,
}

impl QueryLogSink {
    /// Offer an entry without blocking.
    ///
    /// Returns `false` when the entry was not accepted, either because the log
    /// is full (the drop counter is incremented) or because it was stopped.
    pub fn submit(&self, entry: LoggedQuery) -> bool {
        match self.sender.try_send(entry) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Whether the owning log has been stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Caller-owned bounded log of recorded queries.
#[derive(Debug)]
pub struct QueryLog {
    receiver: mpsc::Receiver<LoggedQuery>,
    sender: mpsc::Sender<LoggedQuery>,
    dropped: Arc<AtomicU64>,
    capacity: usize,
}

impl QueryLog {
    /// Open a log holding at most `capacity` undrained entries.
    pub fn start(capacity: usize) -> Result<Self, AdvisorError> {
        if capacity == 0 {
            return Err(AdvisorError::InvalidConfiguration(
                "query log capacity must be greater than 0".to_string(),
            ));
        }
        let (sender, receiver) = mpsc::channel(capacity);
        Ok(Self {
            receiver,
            sender,
            dropped: Arc::new(AtomicU64::new(0)),
            capacity,
        })
    }

    /// A producer handle for collectors.
    pub fn sink(&self) -> QueryLogSink {
        QueryLogSink {
            sender: self.sender.clone(),
            dropped: Arc::clone(&self.dropped),
        }
    }

    /// Take every entry currently buffered, oldest first.
    pub fn drain(&mut self) -> Vec<LoggedQuery> {
        let mut entries = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(entry) => entries.push(entry),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        entries
    }

    /// Number of entries rejected because the log was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Close the log to new entries and return whatever was still buffered.
    pub fn stop(mut self) -> Vec<LoggedQuery> {
        self.receiver.close();
        self.drain()
    }
}
