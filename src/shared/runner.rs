use crate::shared::cancel::CancelToken;
use crate::shared::interrupt::{InterruptSource, InterruptSubscription, InterruptWait};
use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const WATCH_POLL_INTERVAL: Duration = Duration::from_millis(50);

// Run `operation` to completion while a watcher thread converts a process
// interrupt into cooperative cancellation of a token derived from `parent`.
//
// The interrupt subscription lives exactly as long as this call: taken out on
// entry, dropped (deregistered) before control returns, whether the operation
// succeeds, fails, or gets cancelled. The operation's result passes through
// unmodified; the runner never synthesizes errors of its own.
//
// Cancellation is cooperative: the operation must poll its token. An
// interrupt arriving before the operation's first check is still observed
// because the subscription buffers one pending notification.
pub fn run_cancellable<T>(
    operation: impl FnOnce(&CancelToken) -> Result<T>,
    parent: &CancelToken,
    interrupts: &dyn InterruptSource,
) -> Result<T> {
    let token = parent.child();
    let subscription = interrupts.subscribe()?;

    let done = Arc::new(AtomicBool::new(false));
    let watcher = spawn_watcher(token.clone(), parent.clone(), subscription, Arc::clone(&done));

    let result = operation(&token);

    // Stop the watcher (which deregisters the subscription) before the
    // unconditional cancel, so an interrupt arriving after completion can no
    // longer be attributed to this invocation.
    done.store(true, Ordering::SeqCst);
    if watcher.join().is_err() {
        eprintln!("Interrupt watcher panicked");
    }
    token.cancel();

    result
}

// Race the interrupt channel against parent cancellation and completion.
// Same recv_timeout polling shape as the conversion worker loop. The
// subscription is owned here and stays registered until the operation
// finishes, so a second interrupt during a long operation is swallowed
// instead of hitting default signal handling; it is dropped exactly once, in
// this thread, when the loop ends.
fn spawn_watcher(
    token: CancelToken,
    parent: CancelToken,
    subscription: Box<dyn InterruptSubscription>,
    done: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut announced = false;
        while !done.load(Ordering::SeqCst) {
            match subscription.wait_timeout(WATCH_POLL_INTERVAL) {
                InterruptWait::Received => {
                    if !announced {
                        println!("Cancellation requested");
                        token.cancel();
                        announced = true;
                    }
                }
                InterruptWait::TimedOut => {
                    if !announced && parent.is_cancelled() {
                        // Informational only; the child already observes the
                        // parent's cancellation through derivation.
                        println!("context error: parent handle cancelled");
                        announced = true;
                    }
                }
                InterruptWait::Closed => break,
            }
        }
    })
}
