use std::collections::VecDeque;
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crossterm::ExecutableCommand;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use miette::IntoDiagnostic;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::app::{App, PageResult, SearchResult, SearchStatus};
use crate::catalog::RecordSink;
use crate::domain::NormalizedRecord;
use crate::pokeapi::CatalogClient;
use crate::render::{CardView, DetailView, DisplayLimits, type_color};

const LOGS_MAX: usize = 200;
const CARD_WIDTH: u16 = 30;
const CARD_HEIGHT: u16 = 8;
const SPINNER: &[&str] = &["|", "/", "-", "\\"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Grid,
    Logs,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    Browse,
    Search,
}

#[derive(Debug, Clone)]
enum Job {
    LoadMore,
    Reset,
    Search(String),
}

enum JobResult {
    Page {
        generation: u64,
        reset: bool,
        result: PageResult,
    },
    Search {
        generation: u64,
        result: SearchResult,
    },
}

enum Action {
    None,
    Quit,
    Run(Job),
}

#[derive(Debug)]
struct AppState {
    status: String,
    notice: Option<String>,
    view: View,
    input_mode: InputMode,
    cards: Vec<NormalizedRecord>,
    selected: usize,
    detail: Option<NormalizedRecord>,
    logs: VecDeque<String>,
    // Bumped whenever the grid is cleared; stale batches stop appending.
    generation: u64,
    pending: usize,
}

/// Grid sink for one background job.
struct TuiSink {
    state: Arc<Mutex<AppState>>,
    generation: u64,
}

impl RecordSink for TuiSink {
    fn record(&self, record: &NormalizedRecord) {
        if let Ok(mut state) = self.state.lock() {
            if state.generation != self.generation {
                return;
            }
            if state.cards.iter().any(|card| card.id == record.id) {
                return;
            }
            state.cards.push(record.clone());
        }
    }
}

pub struct Tui {
    state: Arc<Mutex<AppState>>,
    input: String,
    history: Vec<String>,
    history_index: Option<usize>,
    log_scroll: u16,
    columns: usize,
    compact_width: u16,
}

impl Tui {
    pub fn new(compact_width: u16) -> Self {
        Self {
            state: Arc::new(Mutex::new(AppState {
                status: "ready".to_string(),
                notice: None,
                view: View::Grid,
                input_mode: InputMode::Browse,
                cards: Vec::new(),
                selected: 0,
                detail: None,
                logs: VecDeque::new(),
                generation: 0,
                pending: 0,
            })),
            input: String::new(),
            history: Vec::new(),
            history_index: None,
            log_scroll: 0,
            columns: 1,
            compact_width,
        }
    }

    /// Runs the interactive grid until the user quits. Loads happen on worker
    /// threads, so drawing never waits for the network.
    pub fn run<C: CatalogClient + 'static>(&mut self, app: Arc<App<C>>) -> miette::Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode().into_diagnostic()?;
        stdout.execute(EnterAlternateScreen).into_diagnostic()?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).into_diagnostic()?;
        terminal.clear().into_diagnostic()?;

        let (tx, rx) = mpsc::channel();
        self.spawn(&app, &tx, Job::LoadMore);
        let result = self.event_loop(&mut terminal, &app, &tx, &rx);

        disable_raw_mode().into_diagnostic()?;
        let mut stdout = io::stdout();
        stdout.execute(LeaveAlternateScreen).into_diagnostic()?;
        result
    }

    fn event_loop<C: CatalogClient + 'static>(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        app: &Arc<App<C>>,
        tx: &Sender<JobResult>,
        rx: &Receiver<JobResult>,
    ) -> miette::Result<()> {
        let mut tick = 0usize;
        loop {
            while let Ok(done) = rx.try_recv() {
                self.apply(done);
            }

            let size = terminal.size().into_diagnostic()?;
            self.columns = grid_columns(size.width);
            let limits = DisplayLimits::for_width(size.width, self.compact_width);
            if let Ok(state) = self.state.lock() {
                let header = HeaderInfo {
                    entries: app.catalog().index().len(),
                    cached: app.catalog().cache_len(),
                    cursor: app.catalog().cursor().get(),
                };
                terminal
                    .draw(|frame| draw_ui(frame, self, &state, &header, limits, tick))
                    .into_diagnostic()?;
            }

            if event::poll(Duration::from_millis(120)).into_diagnostic()? {
                if let Event::Key(key) = event::read().into_diagnostic()? {
                    match self.handle_key(key) {
                        Action::Quit => return Ok(()),
                        Action::Run(job) => self.spawn(app, tx, job),
                        Action::None => {}
                    }
                }
            }

            tick = tick.wrapping_add(1);
        }
    }

    fn spawn<C: CatalogClient + 'static>(
        &self,
        app: &Arc<App<C>>,
        tx: &Sender<JobResult>,
        job: Job,
    ) {
        let generation = self.begin(&job);
        let app = Arc::clone(app);
        let tx = tx.clone();
        let sink = TuiSink {
            state: Arc::clone(&self.state),
            generation,
        };
        thread::spawn(move || {
            let done = match job {
                Job::LoadMore => JobResult::Page {
                    generation,
                    reset: false,
                    result: app.page(None, None, &sink),
                },
                Job::Reset => JobResult::Page {
                    generation,
                    reset: true,
                    result: app.reset(&sink),
                },
                Job::Search(query) => JobResult::Search {
                    generation,
                    result: app.search(&query, &sink),
                },
            };
            let _ = tx.send(done);
        });
    }

    fn begin(&self, job: &Job) -> u64 {
        let Ok(mut state) = self.state.lock() else {
            return 0;
        };
        if matches!(job, Job::Reset | Job::Search(_)) {
            state.generation = state.generation.wrapping_add(1);
            state.cards.clear();
            state.selected = 0;
            state.detail = None;
        }
        state.notice = None;
        state.pending += 1;
        state.status = match job {
            Job::LoadMore => "loading more...".to_string(),
            Job::Reset => "loading...".to_string(),
            Job::Search(query) => format!("searching {query:?}..."),
        };
        let message = state.status.clone();
        push_log(&mut state.logs, message);
        state.generation
    }

    fn apply(&self, done: JobResult) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        state.pending = state.pending.saturating_sub(1);
        match done {
            JobResult::Page {
                generation,
                reset,
                result,
            } => {
                let label = if reset { "reset" } else { "page" };
                let message = format!(
                    "{label} from #{}: {} shown ({} cached, {} fetched, {} skipped), next #{}",
                    result.start,
                    result.records.len(),
                    result.cache_hits,
                    result.fetched,
                    result.skipped.len(),
                    result.next_cursor
                );
                push_log(&mut state.logs, message.clone());
                if generation == state.generation {
                    state.status = message;
                }
            }
            JobResult::Search { generation, result } => {
                let message = match result.status {
                    SearchStatus::NoMatches => format!("no matches for {:?}", result.query),
                    SearchStatus::Reset => "search cleared".to_string(),
                    SearchStatus::Matched => format!(
                        "{} result(s) for {:?}, {} skipped",
                        result.records.len(),
                        result.query,
                        result.skipped.len()
                    ),
                };
                push_log(&mut state.logs, message.clone());
                if generation == state.generation {
                    state.status = message;
                    state.notice = match result.status {
                        SearchStatus::NoMatches => Some("No creature found.".to_string()),
                        SearchStatus::Matched if result.records.is_empty() => {
                            Some("Matches found, but none could be loaded.".to_string())
                        }
                        _ => None,
                    };
                }
            }
        }
        if state.pending == 0 && state.status.ends_with("...") {
            state.status = "ready".to_string();
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Action {
        if key.kind != KeyEventKind::Press {
            return Action::None;
        }
        if self.input_mode() == InputMode::Search {
            return self.handle_search_key(key);
        }

        match key.code {
            KeyCode::F(1) | KeyCode::Char('?') => self.toggle_view(View::Help),
            KeyCode::F(4) => self.toggle_view(View::Logs),
            KeyCode::Char('q') => return Action::Quit,
            KeyCode::Esc => {
                if !self.close_overlay() {
                    return Action::Quit;
                }
            }
            KeyCode::Char('/') => {
                self.input.clear();
                self.history_index = None;
                self.set_input_mode(InputMode::Search);
            }
            KeyCode::Char('m') => return Action::Run(Job::LoadMore),
            KeyCode::Char('r') => return Action::Run(Job::Reset),
            KeyCode::Enter => self.open_detail(),
            KeyCode::Left | KeyCode::Char('h') => self.move_selection(-1),
            KeyCode::Right | KeyCode::Char('l') => self.move_selection(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-(self.columns as isize)),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(self.columns as isize),
            KeyCode::PageUp => self.scroll_logs(-5),
            KeyCode::PageDown => self.scroll_logs(5),
            _ => {}
        }
        Action::None
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Esc => {
                self.input.clear();
                self.set_input_mode(InputMode::Browse);
            }
            KeyCode::Enter => {
                let query = std::mem::take(&mut self.input);
                if !query.trim().is_empty() {
                    self.history.push(query.trim().to_string());
                }
                self.history_index = None;
                self.set_input_mode(InputMode::Browse);
                return Action::Run(Job::Search(query));
            }
            KeyCode::Up => self.history_up(),
            KeyCode::Down => self.history_down(),
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(ch) => self.input.push(ch),
            _ => {}
        }
        Action::None
    }

    fn input_mode(&self) -> InputMode {
        self.state
            .lock()
            .map(|state| state.input_mode)
            .unwrap_or(InputMode::Browse)
    }

    fn set_input_mode(&self, mode: InputMode) {
        if let Ok(mut state) = self.state.lock() {
            state.input_mode = mode;
        }
    }

    fn toggle_view(&self, view: View) {
        if let Ok(mut state) = self.state.lock() {
            state.view = if state.view == view { View::Grid } else { view };
        }
    }

    // Returns false when there was nothing to close.
    fn close_overlay(&self) -> bool {
        let Ok(mut state) = self.state.lock() else {
            return false;
        };
        if state.detail.take().is_some() {
            return true;
        }
        if state.view != View::Grid {
            state.view = View::Grid;
            return true;
        }
        false
    }

    fn open_detail(&self) {
        if let Ok(mut state) = self.state.lock() {
            if state.view == View::Grid {
                state.detail = state.cards.get(state.selected).cloned();
            }
        }
    }

    fn move_selection(&self, delta: isize) {
        if let Ok(mut state) = self.state.lock() {
            if state.cards.is_empty() || state.detail.is_some() {
                return;
            }
            let last = state.cards.len() - 1;
            let next = state.selected as isize + delta;
            state.selected = next.clamp(0, last as isize) as usize;
        }
    }

    fn history_up(&mut self) {
        if self.history.is_empty() {
            return;
        }
        let next = match self.history_index {
            Some(index) if index > 0 => index - 1,
            Some(_) => 0,
            None => self.history.len().saturating_sub(1),
        };
        self.history_index = Some(next);
        if let Some(value) = self.history.get(next).cloned() {
            self.input = value;
        }
    }

    fn history_down(&mut self) {
        let next = match self.history_index {
            Some(index) if index + 1 < self.history.len() => index + 1,
            _ => {
                self.history_index = None;
                self.input.clear();
                return;
            }
        };
        self.history_index = Some(next);
        if let Some(value) = self.history.get(next).cloned() {
            self.input = value;
        }
    }

    fn scroll_logs(&mut self, delta: i16) {
        let max = self.state.lock().map(|state| state.logs.len()).unwrap_or(0);
        let max_scroll = max.saturating_sub(1) as i16;
        let next = (self.log_scroll as i16 + delta).clamp(0, max_scroll);
        self.log_scroll = next as u16;
    }
}

struct HeaderInfo {
    entries: usize,
    cached: usize,
    cursor: u32,
}

fn draw_ui(
    frame: &mut ratatui::Frame,
    tui: &Tui,
    state: &AppState,
    header: &HeaderInfo,
    limits: DisplayLimits,
    tick: usize,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(CARD_HEIGHT),
            Constraint::Length(3),
        ])
        .split(frame.area());

    frame.render_widget(draw_header(state, header, tick), chunks[0]);
    match state.view {
        View::Grid => {
            draw_grid(frame, state, limits, tui.columns, chunks[1]);
            if let Some(record) = &state.detail {
                draw_detail(frame, record, chunks[1]);
            }
        }
        View::Logs => frame.render_widget(draw_logs(state, tui.log_scroll, chunks[1]), chunks[1]),
        View::Help => frame.render_widget(draw_help(), chunks[1]),
    }
    draw_command_line(frame, tui, state, chunks[2]);
}

fn draw_header(state: &AppState, header: &HeaderInfo, tick: usize) -> Paragraph<'static> {
    let activity = if state.pending > 0 {
        Span::styled(
            format!("{} loading", SPINNER[tick % SPINNER.len()]),
            Style::default().fg(Color::Yellow),
        )
    } else {
        Span::styled("idle", Style::default().fg(Color::Green))
    };
    let title = Line::from(vec![
        Span::styled(
            "DEXCAT",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(env!("CARGO_PKG_VERSION"), Style::default().fg(Color::Gray)),
        Span::raw("   "),
        activity,
    ]);
    let counters = Line::from(vec![Span::styled(
        format!(
            "Entries: {} · Cached: {} · Next: #{:03} · Shown: {}",
            header.entries,
            header.cached,
            header.cursor,
            state.cards.len()
        ),
        Style::default().fg(Color::Gray),
    )]);
    Paragraph::new(vec![title, counters])
        .alignment(Alignment::Left)
        .block(Block::default().borders(Borders::BOTTOM))
}

fn draw_grid(
    frame: &mut ratatui::Frame,
    state: &AppState,
    limits: DisplayLimits,
    columns: usize,
    area: Rect,
) {
    if state.cards.is_empty() {
        let message = match (&state.notice, state.pending) {
            (Some(notice), _) => notice.clone(),
            (None, 0) => "Nothing loaded. Press m to load a page.".to_string(),
            (None, _) => "Loading...".to_string(),
        };
        let empty = Paragraph::new(message)
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Gray));
        frame.render_widget(empty, area);
        return;
    }

    let columns = columns.max(1);
    let visible_rows = ((area.height / CARD_HEIGHT) as usize).max(1);
    let selected_row = state.selected / columns;
    let first_row = selected_row.saturating_sub(visible_rows - 1);

    for (index, record) in state.cards.iter().enumerate() {
        let row = index / columns;
        if row < first_row || row >= first_row + visible_rows {
            continue;
        }
        let col = (index % columns) as u16;
        let x = area.x + col * CARD_WIDTH;
        let y = area.y + (row - first_row) as u16 * CARD_HEIGHT;
        let rect = Rect {
            x,
            y,
            width: CARD_WIDTH.min(area.x + area.width - x),
            height: CARD_HEIGHT.min(area.y + area.height - y),
        };
        let card = CardView::from_record(record, limits);
        frame.render_widget(draw_card(&card, index == state.selected), rect);
    }
}

fn draw_card(card: &CardView, selected: bool) -> Paragraph<'static> {
    let accent = color_for(&card.primary_type);
    let mut title_style = Style::default().fg(accent).add_modifier(Modifier::BOLD);
    if selected {
        title_style = title_style.add_modifier(Modifier::REVERSED);
    }
    let border_style = if selected {
        Style::default().fg(accent).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let mut lines = vec![type_line(&card.types)];
    if !card.flavor.is_empty() {
        lines.push(Line::from(Span::styled(
            card.flavor.clone(),
            Style::default().fg(Color::Gray),
        )));
    }
    for pair in card.stats.chunks(2) {
        let text = pair
            .iter()
            .map(|stat| format!("{}: {}", stat.name, stat.value))
            .collect::<Vec<_>>()
            .join("  ");
        lines.push(Line::from(text));
    }

    Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(Span::styled(
                    format!("{} {}", card.id_label, card.name),
                    title_style,
                )),
        )
}

fn draw_detail(frame: &mut ratatui::Frame, record: &NormalizedRecord, area: Rect) {
    let detail = DetailView::from_record(record);
    let popup = centered_rect(80, 90, area);
    let accent = color_for(record.primary_type().unwrap_or("normal"));

    let mut lines = vec![
        Line::from(vec![
            Span::styled(
                detail.title.clone(),
                Style::default().fg(accent).add_modifier(Modifier::BOLD),
            ),
            Span::raw(" "),
            Span::styled(detail.id_label.clone(), Style::default().fg(Color::Gray)),
        ]),
        type_line(&detail.types),
        Line::from(""),
        Line::from(detail.flavor.clone()),
        Line::from(""),
        Line::from(vec![
            Span::styled("Height: ", Style::default().fg(Color::Gray)),
            Span::raw(detail.height.clone()),
            Span::styled("   Weight: ", Style::default().fg(Color::Gray)),
            Span::raw(detail.weight.clone()),
        ]),
        Line::from(vec![
            Span::styled("Abilities: ", Style::default().fg(Color::Gray)),
            Span::raw(detail.abilities.clone()),
        ]),
        Line::from(""),
    ];
    for stat in &detail.stats {
        lines.push(Line::from(vec![
            Span::styled(format!("{:<16}", stat.name), Style::default().fg(Color::Gray)),
            Span::raw(format!("{:>4} ", stat.value)),
            Span::styled(stat_bar(stat.value), Style::default().fg(accent)),
        ]));
    }
    if let Some(url) = &detail.sprite_url {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("Artwork: ", Style::default().fg(Color::Gray)),
            Span::raw(url.clone()),
        ]));
    }

    let view = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(accent))
            .title("Details (Esc to close)"),
    );
    frame.render_widget(Clear, popup);
    frame.render_widget(view, popup);
}

fn draw_logs(state: &AppState, scroll: u16, area: Rect) -> Paragraph<'static> {
    let total = state.logs.len();
    let visible = area.height.saturating_sub(1).max(1) as usize;
    let start = total.saturating_sub(scroll as usize + visible);
    let mut lines = Vec::with_capacity(visible + 1);
    lines.push(Line::from(Span::styled(
        "LOGS (PgUp/PgDown to scroll)",
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )));
    for line in state.logs.iter().skip(start).take(visible) {
        lines.push(Line::from(line.clone()));
    }
    Paragraph::new(lines).wrap(Wrap { trim: true })
}

fn draw_help() -> Paragraph<'static> {
    let lines = vec![
        Line::from("/ search   m load more   r reset   Enter details   Esc close/quit   q quit"),
        Line::from("Arrows or h/j/k/l move the selection"),
        Line::from("F1 help   F4 logs"),
        Line::from("Search: #25 or 25 (id), pikachu (exact name), chu (name fragment)"),
    ];
    Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Help"))
        .wrap(Wrap { trim: true })
}

fn draw_command_line(frame: &mut ratatui::Frame, tui: &Tui, state: &AppState, area: Rect) {
    let first = match state.input_mode {
        InputMode::Search => Line::from(vec![
            Span::styled(
                "/ ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(tui.input.clone(), Style::default().fg(Color::White)),
        ]),
        InputMode::Browse => Line::from(Span::styled(
            "/ search  m more  r reset  Enter details  ? help  q quit",
            Style::default().fg(Color::DarkGray),
        )),
    };
    let second = Line::from(vec![
        Span::styled("= ", Style::default().fg(Color::DarkGray)),
        Span::styled(state.status.clone(), Style::default().fg(Color::DarkGray)),
    ]);
    let para = Paragraph::new(vec![first, second]).block(Block::default().borders(Borders::TOP));
    frame.render_widget(para, area);

    if state.input_mode == InputMode::Search {
        let x = area
            .x
            .saturating_add(2 + tui.input.chars().count() as u16)
            .min(area.x + area.width.saturating_sub(1));
        frame.set_cursor_position((x, area.y.saturating_add(1)));
    }
}

fn type_line(types: &[String]) -> Line<'static> {
    let mut spans = Vec::with_capacity(types.len() * 2);
    for name in types {
        spans.push(Span::styled(
            name.clone(),
            Style::default()
                .fg(color_for(name))
                .add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::raw(" "));
    }
    Line::from(spans)
}

fn color_for(type_name: &str) -> Color {
    type_color(type_name)
        .map(|(r, g, b)| Color::Rgb(r, g, b))
        .unwrap_or(Color::White)
}

fn stat_bar(value: u32) -> String {
    let filled = (value.min(255) as usize * 20) / 255;
    let mut out = String::with_capacity(20);
    for i in 0..20 {
        out.push(if i < filled { '#' } else { '.' });
    }
    out
}

fn grid_columns(width: u16) -> usize {
    ((width / CARD_WIDTH) as usize).max(1)
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn push_log(buffer: &mut VecDeque<String>, item: String) {
    buffer.push_back(format!("[{}] {item}", chrono::Local::now().format("%H:%M:%S")));
    while buffer.len() > LOGS_MAX {
        buffer.pop_front();
    }
}
