use crossbeam_channel::{bounded, Receiver, Sender};
use std::time::Duration;

/// Depth of the control mailbox every task owns
pub const BASE_MAILBOX_CAPACITY: usize = 10;

/// Unsolicited control messages every task understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseCommand {
    /// The global configuration changed; re-read it
    ConfigUpdated,
}

/// Small bounded command queue.
///
/// Sending never blocks and never allocates, so it is safe from
/// interrupt-like contexts. A full mailbox drops the command.
pub struct Mailbox<C> {
    tx: Sender<C>,
    rx: Receiver<C>,
}

impl<C> Mailbox<C> {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity);
        Self { tx, rx }
    }

    pub fn sender(&self) -> MailboxSender<C> {
        MailboxSender {
            tx: self.tx.clone(),
        }
    }

    pub fn send(&self, command: C) -> bool {
        self.tx.try_send(command).is_ok()
    }

    pub fn try_recv(&self) -> Option<C> {
        self.rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<C> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Pending commands, without waiting
    pub fn drain(&self) -> impl Iterator<Item = C> + '_ {
        self.rx.try_iter()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl<C> Clone for Mailbox<C> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
        }
    }
}

/// Sending half of a mailbox, handed to whoever issues commands
pub struct MailboxSender<C> {
    tx: Sender<C>,
}

impl<C> MailboxSender<C> {
    /// Best-effort, non-blocking delivery
    pub fn send(&self, command: C) -> bool {
        self.tx.try_send(command).is_ok()
    }
}

impl<C> Clone for MailboxSender<C> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}
