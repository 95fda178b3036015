//! The statement import state machine.
//!
//! `ImportWorkflow::update` consumes one `Event` at a time and runs the
//! transition to completion. Slow work (extraction, persistence) is never
//! done here; instead the transition returns `Effect::Issue` with a
//! `Command`, and the command's single result comes back later as another
//! `Event`. Each command carries a ticket so that a result arriving after
//! the user abandoned the batch is recognised and dropped.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::backend::ImportBackend;
use crate::error::{MoniError, Result};
use crate::fmt::{truncate, STATUS_MAX_LEN};
use crate::models::Transaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Idle,
    FilePicking,
    Extracting,
    Categorizing,
    Confirming,
    Persisting,
}

impl Mode {
    /// Modes with an outstanding command.
    pub fn is_waiting(&self) -> bool {
        matches!(self, Mode::Extracting | Mode::Persisting)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    AddStatement,
    Up,
    Down,
    /// Enter: pick the highlighted file, accept the highlighted category,
    /// or confirm the batch, depending on mode.
    Select,
    /// Explicit "yes" on the confirmation prompt.
    Confirm,
    Cancel,
    Quit,
}

#[derive(Debug)]
pub enum Event {
    UserInput(Input),
    ExtractionResult {
        ticket: u64,
        result: Result<Vec<Transaction>>,
    },
    InsertResult {
        ticket: u64,
        result: Result<Vec<i64>>,
    },
    Tick,
}

/// A deferred unit of work; everything it needs is bound at issue time.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Extract {
        ticket: u64,
        file: String,
        known_categories: Vec<String>,
    },
    InsertBatch {
        ticket: u64,
        transactions: Vec<Transaction>,
    },
}

impl Command {
    pub fn ticket(&self) -> u64 {
        match self {
            Command::Extract { ticket, .. } | Command::InsertBatch { ticket, .. } => *ticket,
        }
    }

    /// Run the command and produce its one result event.
    pub fn execute(self, backend: &dyn ImportBackend) -> Event {
        match self {
            Command::Extract {
                ticket,
                file,
                known_categories,
            } => {
                debug!(ticket, file = %file, "Running extraction");
                Event::ExtractionResult {
                    ticket,
                    result: backend.extract(&file, &known_categories),
                }
            }
            Command::InsertBatch {
                ticket,
                transactions,
            } => {
                debug!(ticket, count = transactions.len(), "Running batch insert");
                Event::InsertResult {
                    ticket,
                    result: backend.insert_batch(&transactions),
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    None,
    Issue(Command),
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Busy,
    Warning,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub kind: StatusKind,
    pub message: String,
}

impl Status {
    fn new(kind: StatusKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

pub struct ImportWorkflow {
    backend: Arc<dyn ImportBackend>,
    mode: Mode,
    status: Status,
    files: Vec<String>,
    file_cursor: usize,
    /// Category names as known when extraction completed; also the
    /// selection list while categorizing.
    categories: Vec<String>,
    batch: Vec<Transaction>,
    /// Indices into `batch` that need a manual category. Fixed once computed.
    queue: Vec<usize>,
    queue_cursor: usize,
    choice: usize,
    next_ticket: u64,
    awaiting: Option<u64>,
    pending_count: usize,
    discarded: usize,
    spinner: usize,
}

impl ImportWorkflow {
    pub fn new(backend: Arc<dyn ImportBackend>) -> Self {
        Self {
            backend,
            mode: Mode::Idle,
            status: Status::new(StatusKind::Info, "Ready"),
            files: Vec::new(),
            file_cursor: 0,
            categories: Vec::new(),
            batch: Vec::new(),
            queue: Vec::new(),
            queue_cursor: 0,
            choice: 0,
            next_ticket: 1,
            awaiting: None,
            pending_count: 0,
            discarded: 0,
            spinner: 0,
        }
    }

    pub fn update(&mut self, event: Event) -> Effect {
        match event {
            Event::UserInput(Input::Quit) => {
                if self.mode != Mode::Idle {
                    self.abandon();
                }
                Effect::Exit
            }
            Event::UserInput(input) => match self.mode {
                Mode::Idle => self.on_idle(input),
                Mode::FilePicking => self.on_file_picking(input),
                Mode::Extracting | Mode::Persisting => self.on_waiting(input),
                Mode::Categorizing => self.on_categorizing(input),
                Mode::Confirming => self.on_confirming(input),
            },
            Event::ExtractionResult { ticket, result } => {
                if !self.accepts(Mode::Extracting, ticket) {
                    self.discard("extraction", ticket, result.is_ok());
                    return Effect::None;
                }
                self.awaiting = None;
                self.on_extracted(result)
            }
            Event::InsertResult { ticket, result } => {
                if !self.accepts(Mode::Persisting, ticket) {
                    self.discard("insert", ticket, result.is_ok());
                    return Effect::None;
                }
                self.awaiting = None;
                self.on_inserted(result)
            }
            Event::Tick => {
                if self.mode.is_waiting() {
                    self.spinner = self.spinner.wrapping_add(1);
                }
                Effect::None
            }
        }
    }

    fn on_idle(&mut self, input: Input) -> Effect {
        if input != Input::AddStatement {
            return Effect::None;
        }
        match self.backend.list_files() {
            Err(e) => {
                warn!(error = %e, "Could not list statements");
                self.status = Status::new(StatusKind::Error, "Error reading statements folder");
            }
            Ok(files) if files.is_empty() => {
                self.status = Status::new(StatusKind::Warning, MoniError::EmptyFileListing.to_string());
            }
            Ok(files) => {
                self.files = files;
                self.file_cursor = 0;
                self.set_mode(Mode::FilePicking);
                self.status = Status::new(StatusKind::Info, "Pick a financial statement to add");
            }
        }
        Effect::None
    }

    fn on_file_picking(&mut self, input: Input) -> Effect {
        match input {
            Input::Up => self.file_cursor = self.file_cursor.saturating_sub(1),
            Input::Down => {
                if self.file_cursor + 1 < self.files.len() {
                    self.file_cursor += 1;
                }
            }
            Input::Select => {
                let known_categories = match self.backend.category_names() {
                    Ok(names) => names,
                    Err(e) => {
                        self.fail(&e.to_string());
                        return Effect::None;
                    }
                };
                let file = self.files[self.file_cursor].clone();
                let ticket = self.issue_ticket();
                self.files.clear();
                self.set_mode(Mode::Extracting);
                self.status = Status::new(StatusKind::Busy, "Parsing statement...");
                info!(ticket, file = %file, "Extraction requested");
                return Effect::Issue(Command::Extract {
                    ticket,
                    file,
                    known_categories,
                });
            }
            Input::Cancel => {
                self.abandon();
                self.status = Status::new(StatusKind::Info, "Cancelled");
            }
            Input::AddStatement | Input::Confirm | Input::Quit => {}
        }
        Effect::None
    }

    fn on_waiting(&mut self, input: Input) -> Effect {
        if input == Input::Cancel {
            let was = self.mode;
            self.abandon();
            self.status = match was {
                Mode::Persisting => Status::new(
                    StatusKind::Warning,
                    "Stopped waiting; the save may still complete",
                ),
                _ => Status::new(StatusKind::Info, "Import cancelled"),
            };
        }
        Effect::None
    }

    fn on_extracted(&mut self, result: Result<Vec<Transaction>>) -> Effect {
        let transactions = match result {
            Ok(t) => t,
            Err(e) => {
                self.fail(&e.to_string());
                return Effect::None;
            }
        };
        let known = match self.backend.category_names() {
            Ok(names) => names,
            Err(e) => {
                self.fail(&e.to_string());
                return Effect::None;
            }
        };

        self.queue = transactions
            .iter()
            .enumerate()
            .filter(|(_, t)| !known.contains(&t.category_name))
            .map(|(i, _)| i)
            .collect();
        self.batch = transactions;
        self.categories = known;
        info!(
            count = self.batch.len(),
            uncategorized = self.queue.len(),
            "Extraction complete"
        );

        if self.queue.is_empty() {
            self.enter_confirming();
        } else {
            self.queue_cursor = 0;
            self.choice = 0;
            self.set_mode(Mode::Categorizing);
            self.status = Status::new(StatusKind::Info, "Categorize these transactions");
        }
        Effect::None
    }

    fn on_categorizing(&mut self, input: Input) -> Effect {
        match input {
            Input::Up => self.choice = self.choice.saturating_sub(1),
            Input::Down => {
                if self.choice + 1 < self.categories.len() {
                    self.choice += 1;
                }
            }
            Input::Select => {
                let Some(category) = self.categories.get(self.choice).cloned() else {
                    self.status = Status::new(StatusKind::Error, "No categories defined");
                    return Effect::None;
                };
                let idx = self.queue[self.queue_cursor];
                self.batch[idx].category_name = category;
                if self.queue_cursor + 1 < self.queue.len() {
                    self.queue_cursor += 1;
                    self.choice = 0;
                } else {
                    self.enter_confirming();
                }
            }
            Input::Cancel => {
                self.abandon();
                self.status = Status::new(StatusKind::Info, "Import cancelled");
            }
            Input::AddStatement | Input::Confirm | Input::Quit => {}
        }
        Effect::None
    }

    fn on_confirming(&mut self, input: Input) -> Effect {
        match input {
            Input::Select | Input::Confirm => {
                let transactions = std::mem::take(&mut self.batch);
                let ticket = self.issue_ticket();
                self.pending_count = transactions.len();
                self.queue.clear();
                self.set_mode(Mode::Persisting);
                self.status = Status::new(StatusKind::Busy, "Saving...");
                info!(ticket, count = transactions.len(), "Batch insert requested");
                Effect::Issue(Command::InsertBatch {
                    ticket,
                    transactions,
                })
            }
            Input::Cancel => {
                self.abandon();
                self.status = Status::new(StatusKind::Info, "Import cancelled");
                Effect::None
            }
            _ => Effect::None,
        }
    }

    fn on_inserted(&mut self, result: Result<Vec<i64>>) -> Effect {
        match result {
            Ok(ids) => {
                self.abandon();
                self.status = Status::new(
                    StatusKind::Success,
                    format!("Successfully added {} transactions!", ids.len()),
                );
            }
            Err(e) => self.fail(&e.to_string()),
        }
        Effect::None
    }

    fn enter_confirming(&mut self) {
        debug_assert!(self
            .batch
            .iter()
            .all(|t| self.categories.contains(&t.category_name)));
        self.set_mode(Mode::Confirming);
        self.status = Status::new(StatusKind::Info, "Confirm to add these transactions?");
    }

    fn accepts(&self, mode: Mode, ticket: u64) -> bool {
        self.mode == mode && self.awaiting == Some(ticket)
    }

    fn discard(&mut self, kind: &str, ticket: u64, succeeded: bool) {
        self.discarded += 1;
        warn!(
            kind,
            ticket,
            succeeded,
            mode = ?self.mode,
            "Discarding result for abandoned command"
        );
    }

    fn issue_ticket(&mut self) -> u64 {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.awaiting = Some(ticket);
        ticket
    }

    /// Terminal failure for the current batch: back to idle with the error shown.
    fn fail(&mut self, message: &str) {
        warn!(error = message, mode = ?self.mode, "Import failed");
        self.abandon();
        self.status = Status::new(StatusKind::Error, truncate(message, STATUS_MAX_LEN));
    }

    /// Drop every piece of in-flight state and return to idle.
    fn abandon(&mut self) {
        self.files.clear();
        self.file_cursor = 0;
        self.batch.clear();
        self.queue.clear();
        self.queue_cursor = 0;
        self.choice = 0;
        self.awaiting = None;
        self.pending_count = 0;
        self.set_mode(Mode::Idle);
    }

    fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            debug!(from = ?self.mode, to = ?mode, "Mode change");
            self.mode = mode;
        }
    }

    pub fn set_status(&mut self, kind: StatusKind, message: impl Into<String>) {
        self.status = Status::new(kind, message);
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn file_cursor(&self) -> usize {
        self.file_cursor
    }

    pub fn batch(&self) -> &[Transaction] {
        &self.batch
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Positions in `batch()` that needed a manual category.
    pub fn uncategorized(&self) -> &[usize] {
        &self.queue
    }

    pub fn queue_cursor(&self) -> usize {
        self.queue_cursor
    }

    /// The transaction currently being categorized.
    pub fn current_item(&self) -> Option<&Transaction> {
        if self.mode != Mode::Categorizing {
            return None;
        }
        self.queue
            .get(self.queue_cursor)
            .and_then(|&i| self.batch.get(i))
    }

    pub fn choice(&self) -> usize {
        self.choice
    }

    pub fn pending_count(&self) -> usize {
        self.pending_count
    }

    pub fn spinner(&self) -> usize {
        self.spinner
    }

    pub fn discarded_results(&self) -> usize {
        self.discarded
    }
}
