// Copyright (c) 2024-present the levk contributors
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Process-wide logger. Every "warn and degrade" path named in the error table
//! (VFS misses, serializer failures, asset load failures, bad node ids, ...) goes
//! through here rather than `eprintln!`, so a host application can redirect, filter
//! or collect engine diagnostics by subscribing to [`Log::subscribe`].

use lazy_static::lazy_static;
use parking_lot::Mutex;
use std::fmt::Display;
use std::sync::mpsc::Sender;
use std::time::Instant;

/// Severity of a logged message.
#[derive(Debug, Copy, Clone, Eq, PartialEq, PartialOrd, Ord)]
pub enum MessageKind {
    Information,
    Warning,
    Error,
}

/// A single log record.
#[derive(Debug, Clone)]
pub struct LogMessage {
    pub kind: MessageKind,
    pub content: String,
    pub elapsed: std::time::Duration,
}

lazy_static! {
    static ref LOG: Mutex<Log> = Mutex::new(Log {
        start: Instant::now(),
        verbosity: MessageKind::Information,
        listeners: Vec::new(),
    });
}

struct Log {
    start: Instant,
    verbosity: MessageKind,
    listeners: Vec<Sender<LogMessage>>,
}

impl Log {
    fn write(&mut self, kind: MessageKind, content: String) {
        if kind < self.verbosity {
            return;
        }
        let prefix = match kind {
            MessageKind::Information => "[INFO]",
            MessageKind::Warning => "[WARN]",
            MessageKind::Error => "[ERR ]",
        };
        eprintln!("{prefix} {content}");
        let message = LogMessage {
            kind,
            content,
            elapsed: self.start.elapsed(),
        };
        self.listeners
            .retain(|listener| listener.send(message.clone()).is_ok());
    }
}

/// Static facade over the process-wide logger.
pub struct LevkLog;

impl LevkLog {
    pub fn info(msg: impl Display) {
        LOG.lock().write(MessageKind::Information, msg.to_string());
    }

    pub fn warn(msg: impl Display) {
        LOG.lock().write(MessageKind::Warning, msg.to_string());
    }

    pub fn err(msg: impl Display) {
        LOG.lock().write(MessageKind::Error, msg.to_string());
    }

    /// Sets the minimum severity that reaches stderr and subscribers.
    pub fn set_verbosity(kind: MessageKind) {
        LOG.lock().verbosity = kind;
    }

    /// Registers a channel that receives every future message at or above the
    /// current verbosity.
    pub fn subscribe(sender: Sender<LogMessage>) {
        LOG.lock().listeners.push(sender);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::mpsc::channel;

    #[test]
    fn subscriber_receives_messages_above_verbosity() {
        let (tx, rx) = channel();
        LevkLog::set_verbosity(MessageKind::Information);
        LevkLog::subscribe(tx);
        LevkLog::warn("disk is on fire");
        let received = rx.recv().expect("message should be delivered");
        assert_eq!(received.kind, MessageKind::Warning);
        assert_eq!(received.content, "disk is on fire");
    }
}
