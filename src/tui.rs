use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as TermEvent, KeyEvent, KeyEventKind};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;

use crate::fmt::money;
use crate::workflow::{Event, StatusKind};

pub const HEADER_STYLE: Style = Style::new()
    .fg(Color::Yellow)
    .add_modifier(Modifier::BOLD);

pub const FOOTER_STYLE: Style = Style::new().fg(Color::DarkGray);

pub const AMOUNT_POS_STYLE: Style = Style::new().fg(Color::Rgb(80, 220, 100));
pub const AMOUNT_NEG_STYLE: Style = Style::new().fg(Color::Red);

pub const SELECTED_STYLE: Style = Style::new()
    .bg(Color::Rgb(40, 40, 60))
    .add_modifier(Modifier::BOLD);

pub const TICK_RATE: Duration = Duration::from_millis(100);

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Format an amount as a colored Span (green for income, red for expense).
/// Shows absolute value; color conveys the sign.
pub fn money_span(amount: f64) -> Span<'static> {
    let style = if amount < 0.0 {
        AMOUNT_NEG_STYLE
    } else {
        AMOUNT_POS_STYLE
    };
    Span::styled(money(amount.abs()), style)
}

/// Wrap text to a given width. Returns (wrapped_string, line_count).
pub fn wrap_text(text: &str, width: usize) -> (String, u16) {
    if width == 0 {
        return (text.to_string(), 1);
    }
    let wrapped = textwrap::fill(text, width);
    let lines = wrapped.lines().count().max(1) as u16;
    (wrapped, lines)
}

pub fn status_style(kind: StatusKind) -> Style {
    match kind {
        StatusKind::Info => Style::new().fg(Color::Blue),
        StatusKind::Busy | StatusKind::Warning => Style::new().fg(Color::Yellow),
        StatusKind::Success => Style::new().fg(Color::Green),
        StatusKind::Error => Style::new().fg(Color::Red).add_modifier(Modifier::BOLD),
    }
}

pub fn spinner_frame(step: usize) -> &'static str {
    SPINNER_FRAMES[step % SPINNER_FRAMES.len()]
}

/// Everything the interactive loop reacts to, in arrival order.
#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Tick,
    Command(Event),
}

impl From<Event> for AppEvent {
    fn from(event: Event) -> Self {
        AppEvent::Command(event)
    }
}

/// Spawn the terminal input thread. Key presses and ticks go to `sender`
/// alongside command results, so the loop sees one ordered stream.
pub fn spawn_input_thread(sender: mpsc::Sender<AppEvent>, tick_rate: Duration) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut last_tick = Instant::now();
        loop {
            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or(Duration::ZERO);

            match event::poll(timeout) {
                Ok(true) => match event::read() {
                    Ok(TermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                        if sender.send(AppEvent::Key(key)).is_err() {
                            return;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!(error = %e, "Terminal read failed");
                        return;
                    }
                },
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(error = %e, "Terminal poll failed");
                    return;
                }
            }

            if last_tick.elapsed() >= tick_rate {
                if sender.send(AppEvent::Tick).is_err() {
                    return;
                }
                last_tick = Instant::now();
            }
        }
    })
}
