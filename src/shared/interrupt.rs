use anyhow::{Context, Result};
use signal_hook::consts::signal::SIGINT;
use signal_hook::iterator::{Handle, Signals};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

// Outcome of one bounded wait on an interrupt subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptWait {
    Received,
    TimedOut,
    Closed,
}

// Process-interrupt notification source.
// Injectable so the runner can be exercised in tests without raising real signals.
pub trait InterruptSource {
    fn subscribe(&self) -> Result<Box<dyn InterruptSubscription>>;
}

// One scoped registration. Dropping the subscription deregisters the
// underlying handler, so later interrupts fall back to whatever the rest of
// the process does with them.
pub trait InterruptSubscription: Send {
    fn wait_timeout(&self, timeout: Duration) -> InterruptWait;
}

// SIGINT-backed production source.
// Registration must not assume exclusivity: signal-hook chains handlers, so
// unrelated subscribers elsewhere in the process keep working.
pub struct SignalInterruptSource;

impl InterruptSource for SignalInterruptSource {
    fn subscribe(&self) -> Result<Box<dyn InterruptSubscription>> {
        let mut signals = Signals::new([SIGINT]).context("registering SIGINT handler failed")?;
        let handle = signals.handle();

        // Bounded to one pending notification: a signal arriving before the
        // waiter is scheduled stays queued instead of being lost, and extra
        // signals beyond the queued one are dropped.
        let (tx, rx) = mpsc::sync_channel::<()>(1);
        let forwarder = thread::spawn(move || {
            for _ in signals.forever() {
                let _ = tx.try_send(());
            }
        });

        Ok(Box::new(SignalSubscription {
            rx,
            handle,
            forwarder: Some(forwarder),
        }))
    }
}

struct SignalSubscription {
    rx: Receiver<()>,
    handle: Handle,
    forwarder: Option<JoinHandle<()>>,
}

impl InterruptSubscription for SignalSubscription {
    fn wait_timeout(&self, timeout: Duration) -> InterruptWait {
        match self.rx.recv_timeout(timeout) {
            Ok(()) => InterruptWait::Received,
            Err(RecvTimeoutError::Timeout) => InterruptWait::TimedOut,
            Err(RecvTimeoutError::Disconnected) => InterruptWait::Closed,
        }
    }
}

impl Drop for SignalSubscription {
    // Deregister on every exit path. Closing the handle ends the forwarder's
    // signal iteration, which also drops its channel sender.
    fn drop(&mut self) {
        self.handle.close();
        if let Some(forwarder) = self.forwarder.take() {
            let _ = forwarder.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test so a raised SIGINT can never leak into an unrelated
    // subscription running in a parallel test thread.
    #[test]
    fn subscription_times_out_then_delivers_buffered_signal() {
        let subscription = SignalInterruptSource
            .subscribe()
            .unwrap_or_else(|err| panic!("subscribe failed: {err:#}"));

        assert_eq!(
            subscription.wait_timeout(Duration::from_millis(20)),
            InterruptWait::TimedOut
        );

        // Raise before waiting; the notification must not be lost.
        signal_hook::low_level::raise(SIGINT)
            .unwrap_or_else(|err| panic!("raising SIGINT failed: {err}"));

        assert_eq!(
            subscription.wait_timeout(Duration::from_secs(2)),
            InterruptWait::Received
        );
    }
}
