//! Single dispatch point for state changes.
//!
//! The state tree lives inside one task. Actions reach it through a channel
//! and are reduced strictly in arrival order, so two changes to the same set
//! can never interleave. Readers run a closure against the current state on
//! the same task.

use crate::error::{Result, RuntimeError};
use crate::state::{Action, AppState};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

type Reader = Box<dyn FnOnce(&AppState) + Send>;

enum Command {
    Dispatch {
        action: Action,
        done: oneshot::Sender<()>,
    },
    Read(Reader),
}

/// Handle to the state task. Cloning it shares the same state.
#[derive(Clone)]
pub struct Store {
    tx: mpsc::UnboundedSender<Command>,
}

impl Store {
    /// Spawn the state task with an initial state.
    pub fn spawn(initial: AppState) -> (Self, JoinHandle<AppState>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run(initial, rx));
        (Self { tx }, handle)
    }

    /// Apply an action and wait until it has been reduced.
    pub async fn dispatch(&self, action: Action) -> Result<()> {
        let (done, ack) = oneshot::channel();
        self.tx
            .send(Command::Dispatch { action, done })
            .map_err(|_| RuntimeError::StoreClosed)?;
        ack.await.map_err(|_| RuntimeError::StoreClosed)
    }

    /// Apply several actions back to back.
    pub async fn dispatch_all<I>(&self, actions: I) -> Result<()>
    where
        I: IntoIterator<Item = Action>,
    {
        for action in actions {
            self.dispatch(action).await?;
        }
        Ok(())
    }

    /// Run `f` against the current state and return its result.
    pub async fn select<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&AppState) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply, answer) = oneshot::channel();
        let reader: Reader = Box::new(move |state| {
            let _ = reply.send(f(state));
        });
        self.tx
            .send(Command::Read(reader))
            .map_err(|_| RuntimeError::StoreClosed)?;
        answer.await.map_err(|_| RuntimeError::StoreClosed)
    }

    /// Clone of the whole state tree.
    pub async fn snapshot(&self) -> Result<AppState> {
        self.select(AppState::clone).await
    }
}

async fn run(mut state: AppState, mut rx: mpsc::UnboundedReceiver<Command>) -> AppState {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Dispatch { action, done } => {
                tracing::debug!(set_id = action.set_id(), action = action.kind(), "dispatch");
                state = state.reduce(action);
                let _ = done.send(());
            }
            Command::Read(reader) => reader(&state),
        }
    }
    tracing::debug!("store closed");
    state
}
