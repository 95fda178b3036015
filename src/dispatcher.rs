use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use tracing::debug;

use crate::backend::ImportBackend;
use crate::workflow::{Command, Event};

/// Runs workflow commands off the UI thread.
///
/// Each dispatched command gets its own worker thread and produces exactly one
/// event on `sender`. `T` is the channel's message type, so results can share a
/// channel with terminal input and arrive in a single ordered stream.
pub struct CommandDispatcher<T> {
    backend: Arc<dyn ImportBackend>,
    sender: mpsc::Sender<T>,
}

impl<T> CommandDispatcher<T>
where
    T: From<Event> + Send + 'static,
{
    pub fn new(backend: Arc<dyn ImportBackend>, sender: mpsc::Sender<T>) -> Self {
        Self { backend, sender }
    }

    pub fn dispatch(&self, command: Command) {
        let backend = Arc::clone(&self.backend);
        let sender = self.sender.clone();
        let ticket = command.ticket();
        thread::spawn(move || {
            let event = command.execute(backend.as_ref());
            // The receiver is gone only when the app is shutting down.
            if sender.send(T::from(event)).is_err() {
                debug!(ticket, "Result dropped, receiver closed");
            }
        });
    }
}
