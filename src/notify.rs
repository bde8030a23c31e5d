// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{
    fmt,
    ops::BitOr,
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

/// How often a waiting subscription looks for changes recorded without a
/// wake-up.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A set of things that changed.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Changes(u8);

impl Changes {
    pub const NONE: Changes = Changes(0);
    /// A trigger slot was written or cleared.
    pub const TRIGGERS: Changes = Changes(1);
    /// The selected action (mute state or bus) changed.
    pub const SELECTION: Changes = Changes(1 << 1);
    /// Learn mode was entered or left.
    pub const LEARN: Changes = Changes(1 << 2);

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: Changes) -> bool {
        !other.is_empty() && self.0 & other.0 == other.0
    }
}

impl BitOr for Changes {
    type Output = Changes;

    fn bitor(self, rhs: Changes) -> Changes {
        Changes(self.0 | rhs.0)
    }
}

impl fmt::Debug for Changes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Changes")
            .field("triggers", &self.contains(Changes::TRIGGERS))
            .field("selection", &self.contains(Changes::SELECTION))
            .field("learn", &self.contains(Changes::LEARN))
            .finish()
    }
}

/// The sending side.
///
/// Changes are ORed into a pending mask and the union is handed over on the next
/// take. The audio thread only touches the mask through `mark`. Waking a blocked
/// subscriber can lock and make a system call, so `notify` is for the control
/// thread.
#[derive(Debug)]
pub struct Notifier {
    pending: Arc<AtomicU8>,
    wake_tx: Sender<()>,
    wake_rx: Receiver<()>,
}

impl Notifier {
    pub fn new() -> Notifier {
        let (wake_tx, wake_rx) = crossbeam_channel::bounded(1);
        Notifier {
            pending: Arc::new(AtomicU8::new(0)),
            wake_tx,
            wake_rx,
        }
    }

    /// Records the changes without waking anyone. Safe on the audio thread.
    #[inline]
    pub fn mark(&self, changes: Changes) {
        if !changes.is_empty() {
            self.pending.fetch_or(changes.0, Ordering::Relaxed);
        }
    }

    /// Records the changes and wakes the subscriber if it is not already due.
    pub fn notify(&self, changes: Changes) {
        if changes.is_empty() {
            return;
        }
        self.mark(changes);
        // A full channel means a wake-up is already pending.
        let _ = self.wake_tx.try_send(());
    }

    /// Creates the receiving side. Subscriptions share one pending mask, so a
    /// single control surface is expected to hold one.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            pending: self.pending.clone(),
            wake_rx: self.wake_rx.clone(),
        }
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Notifier::new()
    }
}

/// The receiving side, held by a control surface.
#[derive(Debug, Clone)]
pub struct Subscription {
    pending: Arc<AtomicU8>,
    wake_rx: Receiver<()>,
}

impl Subscription {
    /// Takes whatever changed since the last call without waiting.
    pub fn try_take(&self) -> Option<Changes> {
        let _ = self.wake_rx.try_recv();
        self.take()
    }

    /// Waits up to `timeout` for changes. Returns None on timeout or when the
    /// notifier is gone and nothing is pending.
    ///
    /// Changes marked by the audio thread come with no wake-up, so the mask is
    /// polled every few milliseconds while waiting.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Changes> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(changes) = self.take() {
                return Some(changes);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            if let Err(RecvTimeoutError::Disconnected) =
                self.wake_rx.recv_timeout(remaining.min(POLL_INTERVAL))
            {
                return self.take();
            }
        }
    }

    fn take(&self) -> Option<Changes> {
        let changes = Changes(self.pending.swap(0, Ordering::Relaxed));
        (!changes.is_empty()).then_some(changes)
    }
}
