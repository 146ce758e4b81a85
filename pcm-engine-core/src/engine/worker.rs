use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crossbeam_channel::Sender;

use crate::models::error::EngineError;

/// Run/stop flags shared between an engine handle and its worker.
///
/// `running` is the cancellation signal the worker polls at every chunk
/// boundary. `active` stays set until the worker has actually finished the
/// pass, which may be up to one chunk after `running` was cleared.
#[derive(Debug, Default)]
pub(crate) struct PassControl {
    running: AtomicBool,
    active: AtomicBool,
}

impl PassControl {
    /// Claim the engine for a new pass. Fails if a pass is still in flight.
    pub fn begin(&self, what: &str) -> Result<(), EngineError> {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(if self.running.load(Ordering::SeqCst) {
                EngineError::InvalidState(format!("already {}", what))
            } else {
                EngineError::Busy("previous pass is still finishing".into())
            });
        }
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub fn should_continue(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn request_stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Called by the worker once the pass is over.
    pub fn end_pass(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.active.store(false, Ordering::SeqCst);
    }
}

enum Command<C> {
    Run(C),
    Shutdown,
}

/// A long-lived, channel-driven worker thread.
///
/// The worker builds its state (usually a device) on its own thread, reports
/// whether that succeeded, then handles `Run` commands one at a time until it
/// is shut down. The state is dropped on the worker thread, which releases
/// any device it holds.
pub(crate) struct Worker<C> {
    name: String,
    commands: Sender<Command<C>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl<C: Send + 'static> Worker<C> {
    pub fn spawn<S, I, H>(name: &str, init: I, mut handle: H) -> Result<Self, EngineError>
    where
        S: 'static,
        I: FnOnce() -> Result<S, EngineError> + Send + 'static,
        H: FnMut(&mut S, C) + Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::unbounded::<Command<C>>();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), EngineError>>(1);
        let thread_name = name.to_string();

        let join = thread::Builder::new()
            .name(name.into())
            .spawn(move || {
                let mut state = match init() {
                    Ok(state) => {
                        let _ = ready_tx.send(Ok(()));
                        state
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                for command in rx.iter() {
                    match command {
                        Command::Run(job) => handle(&mut state, job),
                        Command::Shutdown => break,
                    }
                }

                drop(state);
                log::debug!("{} worker exited", thread_name);
            })
            .map_err(|e| EngineError::DeviceInit(format!("failed to spawn {} worker: {}", name, e)))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                name: name.into(),
                commands: tx,
                handle: Some(join),
            }),
            Ok(Err(e)) => {
                let _ = join.join();
                Err(e)
            }
            Err(_) => {
                let _ = join.join();
                Err(EngineError::DeviceInit(format!("{} worker died during initialization", name)))
            }
        }
    }

    pub fn submit(&self, job: C) -> Result<(), EngineError> {
        self.commands
            .send(Command::Run(job))
            .map_err(|_| EngineError::InvalidState(format!("{} worker has exited", self.name)))
    }
}

impl<C> Worker<C> {
    /// Ask the worker to exit after its current pass and wait for it.
    pub fn shutdown(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        let Some(handle) = self.handle.take() else {
            return;
        };
        // A listener running on the worker itself cannot wait for the worker.
        if handle.thread().id() == thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            log::error!("{} worker panicked", self.name);
        }
    }
}

impl<C> Drop for Worker<C> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
