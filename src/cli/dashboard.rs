use chrono::{Datelike, NaiveDate};
use crossterm::event::KeyCode;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Paragraph},
    Frame,
};
use rusqlite::Connection;

use crate::dashboard::{monthly_income_expense, total_income_expense, IncomeExpense};
use crate::error::Result;
use crate::tui::{money_span, AMOUNT_NEG_STYLE, AMOUNT_POS_STYLE, FOOTER_STYLE};

pub enum DashboardAction {
    Continue,
    Close,
    /// The selected month changed; the caller should call `reload`.
    Reload,
}

/// Totals plus one month's income and expense. The month can be moved
/// back freely but never past `today`.
pub struct DashboardView {
    year: i32,
    month: u32,
    today: NaiveDate,
    totals: IncomeExpense,
    monthly: IncomeExpense,
}

impl DashboardView {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            year: today.year(),
            month: today.month(),
            today,
            totals: IncomeExpense::default(),
            monthly: IncomeExpense::default(),
        }
    }

    pub fn reload(&mut self, conn: &Connection) -> Result<()> {
        self.totals = total_income_expense(conn)?;
        self.monthly = monthly_income_expense(conn, self.year, self.month)?;
        Ok(())
    }

    pub fn period(&self) -> (i32, u32) {
        (self.year, self.month)
    }

    pub fn prev_month(&mut self) {
        if self.month == 1 {
            self.month = 12;
            self.year -= 1;
        } else {
            self.month -= 1;
        }
    }

    /// Returns false when already at the current month.
    pub fn next_month(&mut self) -> bool {
        if (self.year, self.month) >= (self.today.year(), self.today.month()) {
            return false;
        }
        if self.month == 12 {
            self.month = 1;
            self.year += 1;
        } else {
            self.month += 1;
        }
        true
    }

    pub fn handle_key(&mut self, code: KeyCode) -> DashboardAction {
        match code {
            KeyCode::Esc | KeyCode::Char('q') => DashboardAction::Close,
            KeyCode::Left | KeyCode::Char('h') => {
                self.prev_month();
                DashboardAction::Reload
            }
            KeyCode::Right | KeyCode::Char('l') => {
                if self.next_month() {
                    DashboardAction::Reload
                } else {
                    DashboardAction::Continue
                }
            }
            _ => DashboardAction::Continue,
        }
    }

    pub fn month_label(&self) -> String {
        let (year, month) = self.period();
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(|d| d.format("%B %Y").to_string())
            .unwrap_or_else(|| format!("{year}-{month:02}"))
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        let [totals_area, monthly_area, chart_area, hints_area] = Layout::vertical([
            Constraint::Length(5),
            Constraint::Length(5),
            Constraint::Fill(1),
            Constraint::Length(1),
        ])
        .areas(area);

        let bold = Style::default().add_modifier(Modifier::BOLD);
        frame.render_widget(
            Paragraph::new(summary_lines(" All time", bold, &self.totals)),
            totals_area,
        );
        frame.render_widget(
            Paragraph::new(summary_lines(&format!(" {}", self.month_label()), bold, &self.monthly)),
            monthly_area,
        );

        let income = self.monthly.income.max(0.0) as u64;
        let expense = self.monthly.expense.abs() as u64;
        let bars = [
            Bar::default()
                .value(income)
                .label(Line::from("Income"))
                .style(AMOUNT_POS_STYLE),
            Bar::default()
                .value(expense)
                .label(Line::from("Expense"))
                .style(AMOUNT_NEG_STYLE),
        ];
        let chart = BarChart::default()
            .block(Block::default().borders(Borders::NONE))
            .bar_width(9)
            .bar_gap(2)
            .data(BarGroup::default().bars(&bars));
        frame.render_widget(chart, chart_area);

        frame.render_widget(
            Paragraph::new(" Left/Right=month  Esc=back").style(FOOTER_STYLE),
            hints_area,
        );
    }
}

fn summary_lines(title: &str, title_style: Style, values: &IncomeExpense) -> Vec<Line<'static>> {
    vec![
        Line::from(Span::styled(title.to_string(), title_style)),
        Line::from(vec![Span::raw(" Income     "), money_span(values.income)]),
        Line::from(vec![Span::raw(" Expenses   "), money_span(values.expense)]),
        Line::from(vec![Span::raw(" Net        "), money_span(values.net())]),
    ]
}
