use crate::client::{CurrencyFeed, FetchError};
use crate::dataset::CurrencyRecord;
use crate::query::SortSpec;
use crate::sort::{SortKey, SortOrder};
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use std::io;

pub const SORT_FAILED: &str = "Failed to sort data. Please try again.";

// ============================================================================
// SORT STATE
// ============================================================================

/// Mirrors the last sort the server applied. Both fields are set together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortState {
    pub sort_by: Option<SortKey>,
    pub order: Option<SortOrder>,
}

impl SortState {
    /// Same column while ascending flips to desc; anything else starts at asc.
    pub fn next_for(&self, column: SortKey) -> SortSpec {
        let order = if self.sort_by == Some(column) && self.order == Some(SortOrder::Asc) {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        };
        SortSpec::new(column, order)
    }

    pub fn indicator(&self, column: SortKey) -> &'static str {
        if self.sort_by != Some(column) {
            return "↕";
        }
        match self.order {
            Some(SortOrder::Desc) => "▼",
            _ => "▲",
        }
    }

    pub fn label(&self, column: SortKey) -> &'static str {
        if self.sort_by != Some(column) {
            return "Not sorted";
        }
        match self.order {
            Some(SortOrder::Desc) => "Sorted descending",
            _ => "Sorted ascending",
        }
    }
}

impl From<SortSpec> for SortState {
    fn from(spec: SortSpec) -> Self {
        Self {
            sort_by: Some(spec.key),
            order: Some(spec.order),
        }
    }
}

// ============================================================================
// APP
// ============================================================================

pub struct App<F: CurrencyFeed> {
    feed: F,
    pub records: Vec<CurrencyRecord>,
    pub state: TableState,
    pub sort: SortState,
    pub focused: SortKey,
    pub error: Option<String>,
}

impl<F: CurrencyFeed> App<F> {
    pub fn new(feed: F) -> Self {
        Self {
            feed,
            records: Vec::new(),
            state: TableState::default(),
            sort: SortState::default(),
            focused: SortKey::Currency,
            error: None,
        }
    }

    pub fn source(&self) -> String {
        self.feed.describe()
    }

    /// Default (unsorted) query. Also the retry action.
    pub fn reload(&mut self) {
        match self.feed.fetch(None) {
            Ok(records) => {
                self.set_records(records);
                self.sort = SortState::default();
                self.error = None;
            }
            Err(err) => {
                self.error = Some(load_error_message(&err));
            }
        }
    }

    /// Ask the feed for `column` in the next order; state changes only on success.
    pub fn sort_by_column(&mut self, column: SortKey) {
        let spec = self.sort.next_for(column);
        self.focused = column;

        match self.feed.fetch(Some(spec)) {
            Ok(records) => {
                self.set_records(records);
                self.sort = spec.into();
                self.error = None;
            }
            Err(_) => {
                self.error = Some(SORT_FAILED.to_string());
            }
        }
    }

    pub fn sort_focused(&mut self) {
        self.sort_by_column(self.focused);
    }

    pub fn focus_next_column(&mut self) {
        self.focused = match self.focused {
            SortKey::Currency => SortKey::Amount,
            SortKey::Amount => SortKey::Currency,
        };
    }

    pub fn selected_record(&self) -> Option<&CurrencyRecord> {
        self.state.selected().and_then(|i| self.records.get(i))
    }

    pub fn next(&mut self) {
        let len = self.records.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.records.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    fn set_records(&mut self, records: Vec<CurrencyRecord>) {
        self.records = records;
        if self.records.is_empty() {
            self.state.select(None);
        } else {
            self.state.select(Some(0));
        }
    }
}

fn load_error_message(err: &FetchError) -> String {
    if err.is_unreachable() {
        err.to_string()
    } else {
        format!("Failed to fetch currency data from server ({err})")
    }
}

// ============================================================================
// EVENT LOOP
// ============================================================================

pub fn run_ui<F: CurrencyFeed>(app: &mut App<F>) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res?;
    Ok(())
}

fn run_app<B: ratatui::backend::Backend, F: CurrencyFeed>(
    terminal: &mut Terminal<B>,
    app: &mut App<F>,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Char('r') => app.reload(),
                KeyCode::Char('c') => app.sort_by_column(SortKey::Currency),
                KeyCode::Char('a') => app.sort_by_column(SortKey::Amount),
                KeyCode::Left | KeyCode::Right | KeyCode::Tab => app.focus_next_column(),
                KeyCode::Enter | KeyCode::Char(' ') => app.sort_focused(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                _ => {}
            }
        }
    }
}

// ============================================================================
// RENDERING
// ============================================================================

fn ui<F: CurrencyFeed>(f: &mut Frame, app: &mut App<F>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Branding
            Constraint::Min(0),    // Table or error
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    if app.error.is_some() {
        render_error(f, chunks[1], app);
    } else {
        render_table(f, chunks[1], app);
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header<F: CurrencyFeed>(f: &mut Frame, area: Rect, app: &App<F>) {
    let line = Line::from(vec![
        Span::styled(
            " 💱 Currency Grid ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("│ "),
        Span::styled(app.source(), Style::default().fg(Color::DarkGray)),
    ]);

    let header = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn header_cell<F: CurrencyFeed>(app: &App<F>, column: SortKey) -> Cell<'static> {
    let active = app.sort.sort_by == Some(column);
    let mut style = Style::default().add_modifier(Modifier::BOLD);
    style = if active {
        style.fg(Color::Green)
    } else {
        style.fg(Color::Yellow)
    };
    if app.focused == column {
        style = style.add_modifier(Modifier::UNDERLINED);
    }

    Cell::from(format!("{} {}", column.label(), app.sort.indicator(column))).style(style)
}

fn render_table<F: CurrencyFeed>(f: &mut Frame, area: Rect, app: &mut App<F>) {
    let header = Row::new(vec![
        header_cell(app, SortKey::Currency),
        header_cell(app, SortKey::Amount),
        Cell::from("Locality").style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
    ])
    .style(Style::default().bg(Color::DarkGray))
    .height(1);

    // rows are rendered in the order the feed returned them
    let rows = app.records.iter().map(|record| {
        Row::new(vec![
            Cell::from(record.currency.clone()),
            Cell::from(record.display_amount.clone()).style(Style::default().fg(Color::Green)),
            Cell::from(record.locality.clone()),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(14),
            Constraint::Length(16),
            Constraint::Min(20),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Currency Records "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_error<F: CurrencyFeed>(f: &mut Frame, area: Rect, app: &App<F>) {
    let message = app.error.as_deref().unwrap_or_default();

    let content = vec![
        Line::from(""),
        Line::from(Span::styled(
            "Error Loading Data",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(message.to_string()),
        Line::from(""),
        Line::from(vec![
            Span::raw("Press "),
            Span::styled("r", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            Span::raw(" to try again"),
        ]),
    ];

    let panel = Paragraph::new(content)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red)),
        );

    f.render_widget(panel, area);
}

fn render_status_bar<F: CurrencyFeed>(f: &mut Frame, area: Rect, app: &App<F>) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);

    let sort_text = match (app.sort.sort_by, app.sort.order) {
        (Some(key), Some(_)) => format!("{}: {}", key.label(), app.sort.label(key)),
        _ => "Default order".to_string(),
    };

    let spans = vec![
        Span::styled(
            format!(" Row: {}/{} ", selected, app.records.len()),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw(" | "),
        Span::styled(sort_text, Style::default().fg(Color::Green)),
        Span::raw(" | "),
        Span::styled("c/a", Style::default().fg(Color::Yellow)),
        Span::raw(" Sort | "),
        Span::styled("←/→ Enter", Style::default().fg(Color::Yellow)),
        Span::raw(" Sort focused | "),
        Span::styled("r", Style::default().fg(Color::Yellow)),
        Span::raw(" Reload | "),
        Span::styled("q", Style::default().fg(Color::Yellow)),
        Span::raw(" Quit"),
    ];

    let status = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(status, area);
}

// ============================================================================
// TESTS
// ============================================================================
