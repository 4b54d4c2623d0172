
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::TransportError;
use crate::scpi::Transport;

enum Reply {
    Text(String),
    ChannelError,
}

/// Scripted stand-in for an instrument. Queued replies answer queries in
/// order; every command sent is recorded for inspection. Shared handles to
/// the sent log and the close counter stay valid after the transport has
/// been moved into a controller.
pub struct ScriptedTransport {
    replies: VecDeque<Reply>,
    default_reply: Option<String>,
    fail_writes: bool,
    sent: Arc<Mutex<Vec<String>>>,
    closes: Arc<AtomicUsize>,
    closed: bool,
}

impl ScriptedTransport {

    pub fn new() -> Self {
        Self {
            replies: VecDeque::new(),
            default_reply: None,
            fail_writes: false,
            sent: Arc::new(Mutex::new(vec![])),
            closes: Arc::new(AtomicUsize::new(0)),
            closed: false,
        }
    }

    /// Queue a reply for the next unanswered query.
    pub fn reply(mut self, text:&str) -> Self {
        self.replies.push_back(Reply::Text(text.to_owned()));
        self
    }

    /// Queue a transport failure for the next unanswered query.
    pub fn reply_error(mut self) -> Self {
        self.replies.push_back(Reply::ChannelError);
        self
    }

    /// Answer every query past the end of the queue with `text`.
    pub fn reply_forever(mut self, text:&str) -> Self {
        self.default_reply = Some(text.to_owned());
        self
    }

    /// Make every plain write fail at the channel level.
    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn sent_log(&self) -> Arc<Mutex<Vec<String>>> {
        self.sent.clone()
    }

    pub fn close_count(&self) -> Arc<AtomicUsize> {
        self.closes.clone()
    }

}

impl Default for ScriptedTransport {
    fn default() -> Self { Self::new() }
}

impl Transport for ScriptedTransport {

    fn write(&mut self, cmd:&str) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }

        self.sent.lock().unwrap().push(cmd.to_owned());

        if self.fail_writes {
            return Err(TransportError::Timeout);
        }
        Ok(())
    }

    fn query(&mut self, cmd:&str) -> Result<String, TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }

        self.sent.lock().unwrap().push(cmd.to_owned());

        match self.replies.pop_front() {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::ChannelError) => Err(TransportError::Timeout),
            None => match &self.default_reply {
                Some(text) => Ok(text.clone()),
                None => Err(TransportError::Timeout),
            },
        }
    }

    fn set_timeout(&mut self, _timeout:Duration) -> Result<(), TransportError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }

        self.closed = true;
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn replies_answer_queries_in_order() {
        let mut t = ScriptedTransport::new()
            .reply("first")
            .reply_error()
            .reply("third");

        assert_eq!(t.query("A?").unwrap(), "first");
        assert!(t.query("B?").is_err());
        assert_eq!(t.query("C?").unwrap(), "third");
        assert!(t.query("D?").is_err());

        let sent = t.sent_log();
        assert_eq!(*sent.lock().unwrap(), vec!["A?", "B?", "C?", "D?"]);
    }

    #[test]
    fn default_reply_answers_past_the_queue() {
        let mut t = ScriptedTransport::new().reply("once").reply_forever("RUN");

        assert_eq!(t.query("S?").unwrap(), "once");
        assert_eq!(t.query("S?").unwrap(), "RUN");
        assert_eq!(t.query("S?").unwrap(), "RUN");
    }

}
