use std::sync::{mpsc, Arc, Mutex};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::backend::{lock, ImportBackend, LiveBackend};
use crate::cli::dashboard::{DashboardAction, DashboardView};
use crate::cli::open_db;
use crate::dispatcher::CommandDispatcher;
use crate::error::Result;
use crate::extractor::LlmExtractor;
use crate::fmt::{money, truncate, STATUS_MAX_LEN};
use crate::settings::Settings;
use crate::tui::{
    money_span, spawn_input_thread, spinner_frame, status_style, wrap_text, AppEvent, FOOTER_STYLE,
    HEADER_STYLE, SELECTED_STYLE, TICK_RATE,
};
use crate::workflow::{Effect, Event, ImportWorkflow, Input, Mode, StatusKind};

const MENU_ITEMS: &[&str] = &["View Dashboard", "Add Statement", "Add Category"];

enum Screen {
    Home,
    Dashboard(DashboardView),
    AddCategory { input: String },
}

struct App {
    workflow: ImportWorkflow,
    backend: Arc<dyn ImportBackend>,
    conn: Arc<Mutex<Connection>>,
    screen: Screen,
    menu_selection: usize,
    statements_dir: String,
}

/// Translate a key into a workflow input while an import is in progress.
fn workflow_input(mode: Mode, key: &KeyEvent) -> Option<Input> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Input::Quit);
    }
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => Some(Input::Up),
        KeyCode::Down | KeyCode::Char('j') => Some(Input::Down),
        KeyCode::Enter => Some(Input::Select),
        KeyCode::Char('y') if mode == Mode::Confirming => Some(Input::Confirm),
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('n') => Some(Input::Cancel),
        _ => None,
    }
}

/// First and one-past-last index of a scrolled list window that keeps
/// `selected` visible in `height` rows.
fn visible_window(len: usize, selected: usize, height: usize) -> (usize, usize) {
    if height == 0 || len <= height {
        return (0, len);
    }
    let start = selected.saturating_sub(height / 2).min(len - height);
    (start, start + height)
}

impl App {
    fn new(
        backend: Arc<dyn ImportBackend>,
        conn: Arc<Mutex<Connection>>,
        statements_dir: String,
    ) -> Self {
        Self {
            workflow: ImportWorkflow::new(Arc::clone(&backend)),
            backend,
            conn,
            screen: Screen::Home,
            menu_selection: 0,
            statements_dir,
        }
    }

    fn handle(&mut self, event: AppEvent) -> Effect {
        match event {
            AppEvent::Tick => self.workflow.update(Event::Tick),
            AppEvent::Command(event) => self.workflow.update(event),
            AppEvent::Key(key) => self.handle_key(key),
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Effect {
        let ctrl_c = key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c');
        if ctrl_c {
            return self.workflow.update(Event::UserInput(Input::Quit));
        }

        if matches!(self.screen, Screen::Home) {
            if self.workflow.mode() == Mode::Idle {
                return self.handle_menu_key(key.code);
            }
            return match workflow_input(self.workflow.mode(), &key) {
                Some(input) => self.workflow.update(Event::UserInput(input)),
                None => Effect::None,
            };
        }

        match &mut self.screen {
            Screen::Home => Effect::None,
            Screen::Dashboard(view) => {
                match view.handle_key(key.code) {
                    DashboardAction::Close => self.screen = Screen::Home,
                    DashboardAction::Reload => self.reload_dashboard(),
                    DashboardAction::Continue => {}
                }
                Effect::None
            }
            Screen::AddCategory { input } => {
                match key.code {
                    KeyCode::Esc => self.screen = Screen::Home,
                    KeyCode::Backspace => {
                        input.pop();
                    }
                    KeyCode::Char(c) => input.push(c),
                    KeyCode::Enter => {
                        let name = std::mem::take(input);
                        self.add_category(&name);
                    }
                    _ => {}
                }
                Effect::None
            }
        }
    }

    fn handle_menu_key(&mut self, code: KeyCode) -> Effect {
        match code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.menu_selection = self.menu_selection.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.menu_selection = (self.menu_selection + 1).min(MENU_ITEMS.len() - 1);
            }
            KeyCode::Char('q') | KeyCode::Esc => {
                return self.workflow.update(Event::UserInput(Input::Quit));
            }
            KeyCode::Enter => match self.menu_selection {
                0 => {
                    let today = chrono::Local::now().date_naive();
                    self.screen = Screen::Dashboard(DashboardView::new(today));
                    self.reload_dashboard();
                }
                1 => return self.workflow.update(Event::UserInput(Input::AddStatement)),
                2 => {
                    self.workflow
                        .set_status(StatusKind::Info, "Type a category name, Enter to add");
                    self.screen = Screen::AddCategory {
                        input: String::new(),
                    };
                }
                _ => {}
            },
            _ => {}
        }
        Effect::None
    }

    fn add_category(&mut self, name: &str) {
        match self.backend.add_category(name) {
            Ok(id) => {
                info!(id, name = name.trim(), "Category added");
                self.workflow
                    .set_status(StatusKind::Success, format!("Added category {}", name.trim()));
                self.screen = Screen::Home;
            }
            Err(e) => {
                self.workflow
                    .set_status(StatusKind::Error, truncate(&e.to_string(), STATUS_MAX_LEN));
                self.screen = Screen::AddCategory {
                    input: name.to_string(),
                };
            }
        }
    }

    fn reload_dashboard(&mut self) {
        let Screen::Dashboard(view) = &mut self.screen else {
            return;
        };
        let loaded = lock(&self.conn).and_then(|conn| view.reload(&conn));
        if let Err(e) = loaded {
            warn!(error = %e, "Dashboard load failed");
            self.workflow
                .set_status(StatusKind::Error, truncate(&e.to_string(), STATUS_MAX_LEN));
            self.screen = Screen::Home;
        }
    }

    fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let [header_area, sep, body_area, status_area, hints_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(area);

        frame.render_widget(Paragraph::new(" moni").style(HEADER_STYLE), header_area);
        let sep_line = "━".repeat(area.width as usize);
        frame.render_widget(
            Paragraph::new(sep_line.as_str()).style(Style::default().fg(Color::DarkGray)),
            sep,
        );

        match &self.screen {
            Screen::Dashboard(view) => view.draw(frame, body_area),
            Screen::AddCategory { input } => self.draw_add_category(frame, body_area, input),
            Screen::Home => {
                let [menu_area, detail_area] =
                    Layout::horizontal([Constraint::Length(22), Constraint::Fill(1)])
                        .areas(body_area);
                self.draw_menu(frame, menu_area);
                self.draw_workflow(frame, detail_area);
            }
        }

        self.draw_status(frame, status_area);
        frame.render_widget(Paragraph::new(self.hints()).style(FOOTER_STYLE), hints_area);
    }

    fn draw_menu(&self, frame: &mut Frame, area: Rect) {
        let idle = self.workflow.mode() == Mode::Idle;
        let mut lines = vec![Line::from("")];
        for (i, item) in MENU_ITEMS.iter().enumerate() {
            let selected = idle && i == self.menu_selection;
            let marker = if selected { ">" } else { " " };
            let style = if selected {
                Style::default().add_modifier(Modifier::BOLD)
            } else if idle {
                Style::default()
            } else {
                FOOTER_STYLE
            };
            lines.push(Line::from(Span::styled(format!(" {marker} {item}"), style)));
        }
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn draw_workflow(&self, frame: &mut Frame, area: Rect) {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let height = area.height.saturating_sub(3) as usize;
        let mut lines = vec![Line::from("")];

        match self.workflow.mode() {
            Mode::Idle => {
                lines.push(Line::from(format!(" Statements folder: {}", self.statements_dir)));
            }
            Mode::FilePicking => {
                lines.push(Line::from(Span::styled(" Statements", bold)));
                let files = self.workflow.files();
                let cursor = self.workflow.file_cursor();
                let (start, end) = visible_window(files.len(), cursor, height);
                for (i, file) in files.iter().enumerate().take(end).skip(start) {
                    lines.push(list_line(file, i == cursor));
                }
            }
            Mode::Extracting => {
                lines.push(Line::from(format!(
                    " {} {}",
                    spinner_frame(self.workflow.spinner()),
                    self.workflow.status().message
                )));
            }
            Mode::Persisting => {
                lines.push(Line::from(format!(
                    " {} Writing {} transactions",
                    spinner_frame(self.workflow.spinner()),
                    self.workflow.pending_count()
                )));
            }
            Mode::Categorizing => self.categorizing_lines(&mut lines, area, height),
            Mode::Confirming => self.confirming_lines(&mut lines, height),
        }

        frame.render_widget(Paragraph::new(lines), area);
    }

    fn categorizing_lines(&self, lines: &mut Vec<Line<'static>>, area: Rect, height: usize) {
        let Some(item) = self.workflow.current_item() else {
            return;
        };
        let total = self.workflow.uncategorized().len();
        let position = self.workflow.queue_cursor() + 1;
        lines.push(Line::from(Span::styled(
            format!(" Transaction {position} of {total}"),
            Style::default().add_modifier(Modifier::BOLD),
        )));

        let (wrapped, used) = wrap_text(&item.description, area.width.saturating_sub(2) as usize);
        for part in wrapped.lines() {
            lines.push(Line::from(format!(" {part}")));
        }
        lines.push(Line::from(vec![
            Span::raw(format!(" {}   ", item.date)),
            money_span(item.amount),
        ]));
        let proposed = if item.category_name.is_empty() {
            "(none)".to_string()
        } else {
            item.category_name.clone()
        };
        lines.push(Line::from(Span::styled(
            format!(" Suggested: {proposed}"),
            FOOTER_STYLE,
        )));
        lines.push(Line::from(""));

        let categories = self.workflow.categories();
        let choice = self.workflow.choice();
        let rows = height.saturating_sub(used as usize + 4);
        let (start, end) = visible_window(categories.len(), choice, rows);
        for (i, name) in categories.iter().enumerate().take(end).skip(start) {
            lines.push(list_line(name, i == choice));
        }
    }

    fn confirming_lines(&self, lines: &mut Vec<Line<'static>>, height: usize) {
        let batch = self.workflow.batch();
        let width = batch
            .iter()
            .map(|t| t.description.chars().count())
            .max()
            .unwrap_or(10)
            .min(40);
        let shown = height.saturating_sub(2);
        for t in batch.iter().take(shown) {
            lines.push(Line::from(vec![
                Span::raw(format!(
                    " {}  {:<width$}  {:<14} ",
                    t.date,
                    truncate(&t.description, width),
                    t.category_name,
                    width = width + 3
                )),
                money_span(t.amount),
            ]));
        }
        if batch.len() > shown {
            lines.push(Line::from(Span::styled(
                format!(" ...and {} more", batch.len() - shown),
                FOOTER_STYLE,
            )));
        }
        let net: f64 = batch.iter().map(|t| t.amount).sum();
        lines.push(Line::from(Span::styled(
            format!(" {} transactions, net {}", batch.len(), money(net)),
            Style::default().add_modifier(Modifier::BOLD),
        )));
    }

    fn draw_add_category(&self, frame: &mut Frame, area: Rect, input: &str) {
        let lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                " New category name",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(vec![
                Span::raw(" > "),
                Span::styled(format!("{input}_"), SELECTED_STYLE),
            ]),
        ];
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn draw_status(&self, frame: &mut Frame, area: Rect) {
        let status = self.workflow.status();
        let text = if self.workflow.mode().is_waiting() {
            format!(" {} {}", spinner_frame(self.workflow.spinner()), status.message)
        } else {
            format!(" {}", status.message)
        };
        frame.render_widget(Paragraph::new(text).style(status_style(status.kind)), area);
    }

    fn hints(&self) -> &'static str {
        match &self.screen {
            Screen::Dashboard(_) => " Left/Right=month  Esc=back",
            Screen::AddCategory { .. } => " Enter=add  Esc=back",
            Screen::Home => match self.workflow.mode() {
                Mode::Idle => " Up/Down=navigate  Enter=select  q=quit",
                Mode::FilePicking => " Up/Down=navigate  Enter=parse  Esc=back",
                Mode::Extracting | Mode::Persisting => " Esc=stop waiting  Ctrl+C=quit",
                Mode::Categorizing => " Up/Down=category  Enter=assign  Esc=discard",
                Mode::Confirming => " Enter/y=save  Esc/n=discard",
            },
        }
    }
}

fn list_line(text: &str, selected: bool) -> Line<'static> {
    let marker = if selected { ">" } else { " " };
    let style = if selected {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    Line::from(Span::styled(format!(" {marker} {text}"), style))
}

pub fn run(settings: &Settings) -> Result<()> {
    let conn = open_db(settings)?;
    std::fs::create_dir_all(settings.statements_path())?;

    let live = LiveBackend::new(
        Arc::new(Mutex::new(conn)),
        Box::new(LlmExtractor::from_settings(settings)),
        settings.statements_path(),
    );
    let conn = live.shared_connection();
    let backend: Arc<dyn ImportBackend> = Arc::new(live);

    let (sender, receiver) = mpsc::channel::<AppEvent>();
    let dispatcher = CommandDispatcher::new(Arc::clone(&backend), sender.clone());
    let mut app = App::new(
        backend,
        conn,
        settings.statements_path().display().to_string(),
    );

    let hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        ratatui::restore();
        hook(info);
    }));

    let mut terminal = ratatui::init();
    let _input = spawn_input_thread(sender, TICK_RATE);
    info!("Interactive session started");

    let result: Result<()> = loop {
        if let Err(e) = terminal.draw(|frame| app.draw(frame)) {
            break Err(e.into());
        }

        let Ok(event) = receiver.recv() else {
            break Ok(());
        };
        match app.handle(event) {
            Effect::None => {}
            Effect::Issue(command) => {
                debug!(ticket = command.ticket(), "Dispatching command");
                dispatcher.dispatch(command);
            }
            Effect::Exit => break Ok(()),
        }
    };

    drop(terminal);
    ratatui::restore();
    info!(
        discarded = app.workflow.discarded_results(),
        "Interactive session ended"
    );
    result
}
