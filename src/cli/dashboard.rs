use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use crate::aggregate::{CategoryTotal, CategoryTotals};
use crate::debounce::Debouncer;
use crate::detail::{build_detail_rows, drill_down, DetailRow};
use crate::error::{Result, RunwayError};
use crate::filter::{FilterAction, FilterState};
use crate::fmt::{months as months_label, share};
use crate::models::{MonthKey, TransactionKind};
use crate::reports::{build_report, filtered, DashboardReport};
use crate::settings::{load_settings, Settings};
use crate::source::{load_records, open_source, LoadedRecords};
use crate::tui::{
    expense_span, money_span, share_bar, wrap_text, FOOTER_STYLE, HEADER_STYLE, SELECTED_STYLE,
};

/// Poll interval while no filter change is waiting.
const IDLE_POLL: Duration = Duration::from_millis(250);

const CATEGORY_BAR_WIDTH: usize = 20;

enum Screen {
    Overview,
    Detail {
        title: String,
        rows: Vec<DetailRow>,
        offset: usize,
    },
}

struct Dashboard {
    settings: Settings,
    data: LoadedRecords,
    /// State the report was built from.
    applied: FilterState,
    /// Latest requested state, waiting out the debounce window.
    requested: FilterState,
    debouncer: Debouncer<FilterState>,
    report: DashboardReport,
    accounts: Vec<String>,
    months: Vec<MonthKey>,
    month_cursor: usize,
    kind: TransactionKind,
    category_selection: usize,
    screen: Screen,
    status_message: Option<String>,
}

impl Dashboard {
    fn new(settings: Settings, data: LoadedRecords) -> Self {
        let applied = FilterState::default();
        let report = build_report(&data, &applied, settings.revenue);
        let debouncer = Debouncer::new(Duration::from_millis(settings.debounce_ms));
        let mut dashboard = Self {
            settings,
            data,
            requested: applied.clone(),
            applied,
            debouncer,
            report,
            accounts: Vec::new(),
            months: Vec::new(),
            month_cursor: 0,
            kind: TransactionKind::Expense,
            category_selection: 0,
            screen: Screen::Overview,
            status_message: None,
        };
        dashboard.refresh_lookups();
        dashboard
    }

    fn refresh_lookups(&mut self) {
        self.accounts = self.data.accounts();
        self.months = self.data.months();
        self.month_cursor = self.months.len().saturating_sub(1);
    }

    fn reload(&mut self) -> Result<()> {
        let source = open_source(&self.settings);
        self.data = load_records(source.as_ref())?;
        self.refresh_lookups();
        self.recompute();
        Ok(())
    }

    fn recompute(&mut self) {
        self.report = build_report(&self.data, &self.applied, self.settings.revenue);
        let len = self.totals().len();
        self.category_selection = self.category_selection.min(len.saturating_sub(1));
    }

    fn totals(&self) -> &CategoryTotals {
        match self.kind {
            TransactionKind::Expense => &self.report.expense_totals,
            TransactionKind::Earning => &self.report.earning_totals,
        }
    }

    // -----------------------------------------------------------------------
    // Filter transitions
    // -----------------------------------------------------------------------

    fn commit(&mut self, next: Result<FilterState>) {
        match next {
            Ok(state) => {
                self.requested = state.clone();
                self.debouncer.push(state, Instant::now());
                self.status_message = None;
            }
            Err(e) => self.status_message = Some(e.to_string()),
        }
    }

    fn dispatch(&mut self, action: FilterAction) {
        let next = self.requested.apply(action);
        self.commit(next);
    }

    /// Date shifts start from the span of the loaded data when no range is set.
    fn shift(&mut self, start: bool, delta: i32) {
        let base = if self.requested.date_range.is_some() {
            Ok(self.requested.clone())
        } else {
            match self.data.date_span() {
                Some((min, max)) => self.requested.apply(FilterAction::SetDateRange {
                    start: Some(min),
                    end: Some(max),
                }),
                None => Err(RunwayError::InvalidFilter("no records to range over".into())),
            }
        };
        let action = if start {
            FilterAction::ShiftStart(delta)
        } else {
            FilterAction::ShiftEnd(delta)
        };
        let next = base.and_then(|b| b.apply(action));
        self.commit(next);
    }

    fn cycle_account(&mut self) {
        let next = match &self.requested.account_id {
            None => self.accounts.first().cloned(),
            Some(current) => self
                .accounts
                .iter()
                .position(|a| a == current)
                .and_then(|i| self.accounts.get(i + 1))
                .cloned(),
        };
        self.dispatch(FilterAction::SetAccount(next));
    }

    /// Apply a pending filter once its debounce window has elapsed.
    fn tick(&mut self, now: Instant) {
        if let Some(state) = self.debouncer.poll(now) {
            log::debug!("applying filter after debounce: {state:?}");
            self.applied = state;
            self.recompute();
        }
    }

    fn open_detail(&mut self) {
        // Drill into what the user last asked for, not the stale report
        if let Some(state) = self.debouncer.flush() {
            self.applied = state;
            self.recompute();
        }
        let Some(category) = self
            .totals()
            .sorted_desc()
            .get(self.category_selection)
            .map(|t| t.name.clone())
        else {
            return;
        };
        let (expenses, earnings) = filtered(&self.data, &self.applied);
        let records = match self.kind {
            TransactionKind::Expense => expenses,
            TransactionKind::Earning => earnings,
        };
        let rows = build_detail_rows(
            drill_down(records, Some(category.as_str())),
            &self.settings.date_format,
        );
        self.screen = Screen::Detail {
            title: format!("{} \u{2014} {}", self.kind.label(), category),
            rows,
            offset: 0,
        };
    }

    /// Returns true when the dashboard should quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        if let Screen::Detail { rows, offset, .. } = &mut self.screen {
            match code {
                KeyCode::Esc | KeyCode::Backspace => self.screen = Screen::Overview,
                KeyCode::Up => *offset = offset.saturating_sub(1),
                KeyCode::Down => *offset = (*offset + 1).min(rows.len().saturating_sub(1)),
                KeyCode::Char('q') => return true,
                _ => {}
            }
            return false;
        }

        match code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('[') => self.shift(true, -1),
            KeyCode::Char(']') => self.shift(true, 1),
            KeyCode::Char('{') => self.shift(false, -1),
            KeyCode::Char('}') => self.shift(false, 1),
            KeyCode::Char('a') => self.cycle_account(),
            KeyCode::Char('c') => self.dispatch(FilterAction::Reset),
            KeyCode::Char('d') => self.dispatch(FilterAction::ClearDateRange),
            KeyCode::Char('m') => self.dispatch(FilterAction::ClearMonths),
            KeyCode::Char(' ') => {
                if let Some(month) = self.months.get(self.month_cursor).copied() {
                    self.dispatch(FilterAction::ToggleMonth(month));
                }
            }
            KeyCode::Left => self.month_cursor = self.month_cursor.saturating_sub(1),
            KeyCode::Right => {
                self.month_cursor = (self.month_cursor + 1).min(self.months.len().saturating_sub(1))
            }
            KeyCode::Up => self.category_selection = self.category_selection.saturating_sub(1),
            KeyCode::Down => {
                let max = self.totals().len().saturating_sub(1);
                self.category_selection = (self.category_selection + 1).min(max);
            }
            KeyCode::Tab => {
                self.kind = match self.kind {
                    TransactionKind::Expense => TransactionKind::Earning,
                    TransactionKind::Earning => TransactionKind::Expense,
                };
                self.category_selection = 0;
            }
            KeyCode::Enter => self.open_detail(),
            KeyCode::Char('r') => {
                if let Err(e) = self.reload() {
                    self.status_message = Some(e.to_string());
                }
            }
            _ => {}
        }
        false
    }

    // -----------------------------------------------------------------------
    // Drawing
    // -----------------------------------------------------------------------

    fn draw(&self, frame: &mut Frame) {
        match &self.screen {
            Screen::Overview => self.draw_overview(frame),
            Screen::Detail { title, rows, offset } => self.draw_detail(frame, title, rows, *offset),
        }
    }

    fn filter_lines(&self) -> Vec<Line<'static>> {
        let f = &self.requested;
        let range = match &f.date_range {
            Some(r) => format!(
                "{} \u{2192} {}",
                r.start().format("%Y-%m-%d"),
                r.end().format("%Y-%m-%d")
            ),
            None => "all dates".to_string(),
        };
        let months = if f.selected_months.is_empty() {
            "none (all records, 12-month average)".to_string()
        } else {
            f.selected_months
                .iter()
                .map(|m| m.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        let mut lines = vec![
            Line::from(Span::styled(" Filters", Style::default().add_modifier(Modifier::BOLD))),
            Line::from(format!(" Range     {range}")),
            Line::from(format!(
                " Account   {}",
                f.account_id.as_deref().unwrap_or("all accounts")
            )),
            Line::from(format!(" Months    {months}")),
        ];
        if self.debouncer.is_pending() {
            lines.push(Line::from(Span::styled(" updating\u{2026}", FOOTER_STYLE)));
        }
        lines
    }

    fn draw_overview(&self, frame: &mut Frame) {
        let area = frame.area();
        let border_style = Style::default().fg(Color::DarkGray);

        let [header_area, sep1, stats_area, sep2, charts_area, sep3, months_area, hints_area] =
            Layout::vertical([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(6),
                Constraint::Length(1),
                Constraint::Fill(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .areas(area);

        frame.render_widget(
            Paragraph::new(format!(
                " Runway \u{2014} {} of {} records",
                self.report.matched,
                self.data.len()
            ))
            .style(HEADER_STYLE),
            header_area,
        );

        let sep_line = "\u{2501}".repeat(area.width as usize);
        let sep_widget = Paragraph::new(sep_line.as_str()).style(border_style);
        frame.render_widget(sep_widget.clone(), sep1);
        frame.render_widget(sep_widget.clone(), sep2);
        frame.render_widget(sep_widget, sep3);

        // Summary + filters
        let [left_area, right_area] =
            Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
                .areas(stats_area);

        let s = &self.report.summary;
        let runway = &self.report.runway;
        let runway_style = if runway.months >= 0 {
            Style::default().fg(Color::Rgb(80, 220, 100))
        } else {
            Style::default().fg(Color::Red)
        };
        let stats_lines = vec![
            Line::from(vec![Span::raw(" Earnings       "), money_span(s.total_earnings)]),
            Line::from(vec![Span::raw(" Expenses       "), expense_span(s.total_expenses)]),
            Line::from(vec![Span::raw(" Profit / Loss  "), money_span(s.profit_loss)]),
            Line::from(format!(" Expense ratio  {}%", s.expense_to_revenue_ratio)),
            Line::from(vec![
                Span::raw(" Runway         "),
                Span::styled(months_label(runway.months), runway_style),
                Span::styled(format!("  (over {} mo)", runway.month_count), FOOTER_STYLE),
            ]),
        ];
        frame.render_widget(Paragraph::new(stats_lines), left_area);
        frame.render_widget(Paragraph::new(self.filter_lines()), right_area);

        // Category shares + monthly chart
        let [chart_left, chart_right] =
            Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
                .areas(charts_area);
        self.draw_categories(frame, chart_left);
        self.draw_monthly(frame, chart_right);

        // Month selector
        let mut spans = vec![Span::raw(" ")];
        for (i, month) in self.months.iter().enumerate() {
            let selected = self.requested.selected_months.contains(month);
            let label = if selected {
                format!("[{}{:02}]", month.abbr(), month.year % 100)
            } else {
                format!(" {}{:02} ", month.abbr(), month.year % 100)
            };
            let mut style = if selected {
                Style::default().fg(Color::Yellow)
            } else {
                FOOTER_STYLE
            };
            if i == self.month_cursor {
                style = style.add_modifier(Modifier::REVERSED);
            }
            spans.push(Span::styled(label, style));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), months_area);

        if let Some(msg) = &self.status_message {
            frame.render_widget(
                Paragraph::new(format!(" {msg}")).style(Style::default().fg(Color::Yellow)),
                hints_area,
            );
        } else {
            frame.render_widget(
                Paragraph::new(
                    " [ ]=start  { }=end  a=account  \u{2190}\u{2192} space=months  \
                     m=clear months  d=clear dates  c=clear all  Tab=kind  Enter=detail  r=reload  q=quit",
                )
                .style(FOOTER_STYLE),
                hints_area,
            );
        }
    }

    fn draw_categories(&self, frame: &mut Frame, area: ratatui::layout::Rect) {
        let totals = self.totals();
        let sorted = totals.sorted_desc();
        let grand_total = totals.total();
        let max = sorted.first().map(|t| t.total).unwrap_or(0.0);
        let name_width = name_column_width(&sorted);

        let mut lines = vec![Line::from(Span::styled(
            format!(" {} by Category", self.kind.label()),
            Style::default().add_modifier(Modifier::BOLD),
        ))];
        if sorted.is_empty() {
            lines.push(Line::from(Span::styled(" (no records)", FOOTER_STYLE)));
        }
        for (i, item) in sorted.iter().enumerate() {
            let style = if i == self.category_selection {
                SELECTED_STYLE
            } else {
                Style::default()
            };
            let amount = match self.kind {
                TransactionKind::Expense => expense_span(item.total),
                TransactionKind::Earning => money_span(item.total),
            };
            lines.push(Line::from(vec![
                Span::styled(padded_name(&item.name, name_width), style),
                amount,
                Span::raw(format!(" {:>6} ", share(item.total, grand_total))),
                Span::styled(share_bar(item.total, max, CATEGORY_BAR_WIDTH), FOOTER_STYLE),
            ]));
        }
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn draw_monthly(&self, frame: &mut Frame, area: ratatui::layout::Rect) {
        let chart = &self.report.monthly_chart;
        if chart.labels.is_empty() {
            return;
        }
        let expense_style = Style::default().fg(Color::Red);
        let earning_style = Style::default().fg(Color::Rgb(80, 220, 100));
        let series = |name: &str| {
            chart
                .series
                .iter()
                .find(|s| s.name == name)
                .map(|s| s.values.clone())
                .unwrap_or_default()
        };
        let expenses = series("Expenses");
        let earnings = series("Earnings");

        let groups: Vec<BarGroup> = chart
            .labels
            .iter()
            .enumerate()
            .map(|(i, label)| {
                let earn = earnings.get(i).copied().unwrap_or(0.0).max(0.0) as u64;
                let exp = expenses.get(i).copied().unwrap_or(0.0).max(0.0) as u64;
                let bars = vec![
                    Bar::default().value(earn).style(earning_style),
                    Bar::default().value(exp).style(expense_style),
                ];
                let short = label.split_whitespace().next().unwrap_or(label.as_str()).to_string();
                BarGroup::default().label(Line::from(short)).bars(&bars)
            })
            .collect();

        let block = Block::default()
            .title("Monthly Earnings / Expenses")
            .title_style(Style::default().add_modifier(Modifier::BOLD))
            .borders(Borders::NONE);

        let mut widget = BarChart::default()
            .block(block)
            .bar_width(2)
            .bar_gap(0)
            .group_gap(1);
        for group in groups {
            widget = widget.data(group);
        }
        frame.render_widget(widget, area);
    }

    fn draw_detail(&self, frame: &mut Frame, title: &str, rows: &[DetailRow], offset: usize) {
        let area = frame.area();
        let [header_area, table_area, hints_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(1),
        ])
        .areas(area);

        let total: f64 = rows.iter().map(|r| r.amount).sum();
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(format!(" {title}  "), HEADER_STYLE),
                Span::raw(format!("{} record(s)  ", rows.len())),
                money_span(total),
            ])),
            header_area,
        );

        let desc_width = (area.width as usize).saturating_sub(12 + 12 + 14 + 8).max(10);
        let table_rows: Vec<Row> = rows
            .iter()
            .skip(offset)
            .map(|r| {
                let (desc, height) = wrap_text(&r.description, desc_width);
                Row::new(vec![
                    Cell::from(r.date.clone()),
                    Cell::from(r.account_id.clone()),
                    Cell::from(money_span(r.amount)),
                    Cell::from(desc),
                ])
                .height(height)
            })
            .collect();
        let header = Row::new(vec!["Date", "Account", "Amount", "Description"])
            .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD));
        let table = Table::new(
            table_rows,
            [
                Constraint::Length(12),
                Constraint::Length(12),
                Constraint::Length(14),
                Constraint::Fill(1),
            ],
        )
        .header(header);
        frame.render_widget(table, table_area);

        frame.render_widget(
            Paragraph::new(" Up/Down=scroll  Esc=back  q=quit").style(FOOTER_STYLE),
            hints_area,
        );
    }
}

/// Widest category name in characters; `{:<width$}` pads by chars, not bytes.
fn name_column_width(totals: &[&CategoryTotal]) -> usize {
    totals
        .iter()
        .map(|t| t.name.chars().count())
        .max()
        .unwrap_or(10)
}

fn padded_name(name: &str, width: usize) -> String {
    format!(" {name:<width$} ")
}

pub fn run() -> Result<()> {
    let settings = load_settings();
    let source = open_source(&settings);
    let data = load_records(source.as_ref())?;
    let mut dashboard = Dashboard::new(settings, data);

    let hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        ratatui::restore();
        hook(info);
    }));

    let mut terminal = ratatui::init();

    let result: Result<()> = loop {
        if let Err(e) = terminal.draw(|frame| dashboard.draw(frame)) {
            break Err(e.into());
        }

        let timeout = dashboard
            .debouncer
            .time_remaining(Instant::now())
            .unwrap_or(IDLE_POLL);
        match event::poll(timeout) {
            Ok(true) => {}
            Ok(false) => {
                dashboard.tick(Instant::now());
                continue;
            }
            Err(e) => break Err(e.into()),
        }

        match event::read() {
            Err(e) => break Err(e.into()),
            Ok(Event::Key(key)) => {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
                    break Ok(());
                }
                if dashboard.handle_key(key.code) {
                    break Ok(());
                }
                dashboard.tick(Instant::now());
            }
            _ => {}
        }
    };

    drop(terminal);
    ratatui::restore();
    result
}
