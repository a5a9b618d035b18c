use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Padding, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use reqwest::blocking::Client;
use textwrap::wrap;
use unicode_width::UnicodeWidthStr;
use url::Url;

use crate::catalog::{Catalog, GiftEntry, MediaKind};
use crate::resolver::{self, Phase, Resolution, ResolverEvent};

const GRID_COLS: usize = 3;
const CARD_HEIGHT: u16 = 7;
const INTRO_TICKS_PER_FRAME: u8 = 4;

const COLOR_BG: Color = Color::Rgb(7, 17, 13);
const COLOR_PANEL_BG: Color = Color::Rgb(12, 26, 20);
const COLOR_BORDER_IDLE: Color = Color::Rgb(42, 68, 54);
const COLOR_BORDER_FOCUSED: Color = Color::Rgb(212, 175, 55);
const COLOR_TEXT_PRIMARY: Color = Color::Rgb(235, 238, 230);
const COLOR_TEXT_SECONDARY: Color = Color::Rgb(150, 168, 152);
const COLOR_ACCENT: Color = Color::Rgb(212, 175, 55);
const COLOR_SUCCESS: Color = Color::Rgb(146, 216, 148);
const COLOR_ERROR: Color = Color::Rgb(222, 108, 108);

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

const ENVELOPE_FRAMES: [&str; 4] = [
    "\
┌───────────────────────┐\n\
│\\                     /│\n\
│  \\                 /  │\n\
│    \\             /    │\n\
│      \\         /      │\n\
│        \\     /        │\n\
│          \\ /          │\n\
└───────────────────────┘",
    "\
      _____________\n\
    /               \\\n\
┌───────────────────────┐\n\
│                       │\n\
│          ✉            │\n\
│                       │\n\
│                       │\n\
└───────────────────────┘",
    "\
   ________________\n\
  /   * for you *   \\\n\
 /___________________\\\n\
┌───────────────────────┐\n\
│                       │\n\
│      ✦  ✧  ✦          │\n\
│                       │\n\
└───────────────────────┘",
    "\
        ✦ ✧ ✦\n\
   *  merry everything  *\n\
┌───────────────────────┐\n\
│   press any key to    │\n\
│    open your gifts    │\n\
│          🎁           │\n\
│                       │\n\
└───────────────────────┘",
];

struct Spinner {
    index: usize,
    last_tick: Instant,
}

impl Spinner {
    fn new() -> Self {
        Self {
            index: 0,
            last_tick: Instant::now(),
        }
    }

    fn frame(&self) -> &'static str {
        SPINNER_FRAMES[self.index % SPINNER_FRAMES.len()]
    }

    fn advance(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.last_tick) >= Duration::from_millis(120) {
            self.index = (self.index + 1) % SPINNER_FRAMES.len();
            self.last_tick = now;
            true
        } else {
            false
        }
    }

    fn reset(&mut self) {
        self.index = 0;
        self.last_tick = Instant::now();
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Screen {
    Intro,
    Grid,
    Reveal,
}

pub struct Options {
    pub status_message: String,
    pub catalog: Catalog,
    pub resolver_handle: Option<resolver::Handle>,
    pub origin: Option<Url>,
    pub overall_timeout: Duration,
    pub user_agent: String,
    pub search_url_base: String,
    pub external_client: Client,
    pub config_path: String,
    pub skip_intro: bool,
}

pub struct Model {
    catalog: Catalog,
    screen: Screen,
    selected: usize,
    intro_frame: usize,
    intro_tick: u8,
    status_message: String,
    spinner: Spinner,
    needs_redraw: bool,
    resolution: Option<Resolution>,
    next_request_id: u64,
    events_tx: Sender<ResolverEvent>,
    events_rx: Receiver<ResolverEvent>,
    resolver_handle: Option<resolver::Handle>,
    origin: Option<Url>,
    overall_timeout: Duration,
    timeout_notified: bool,
    user_agent: String,
    search_url_base: String,
    external_client: Client,
    config_path: String,
}

impl Model {
    pub fn new(opts: Options) -> Self {
        let (events_tx, events_rx) = unbounded();
        let screen = if opts.skip_intro {
            Screen::Grid
        } else {
            Screen::Intro
        };
        Self {
            catalog: opts.catalog,
            screen,
            selected: 0,
            intro_frame: 0,
            intro_tick: 0,
            status_message: opts.status_message,
            spinner: Spinner::new(),
            needs_redraw: true,
            resolution: None,
            next_request_id: 1,
            events_tx,
            events_rx,
            resolver_handle: opts.resolver_handle,
            origin: opts.origin,
            overall_timeout: opts.overall_timeout,
            timeout_notified: false,
            user_agent: opts.user_agent,
            search_url_base: opts.search_url_base,
            external_client: opts.external_client,
            config_path: opts.config_path,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        let tick_rate = Duration::from_millis(120);

        loop {
            if self.poll_async() {
                self.mark_dirty();
            }

            if self.needs_redraw {
                terminal.draw(|frame| self.draw(frame))?;
                self.needs_redraw = false;
            }

            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(16));

            if event::poll(timeout)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        match self.handle_key(key.code) {
                            Ok(true) => break,
                            Ok(false) => {}
                            Err(err) => {
                                self.status_message = format!("Error: {}", err);
                                self.mark_dirty();
                            }
                        }
                    }
                }
            }

            if self.poll_async() {
                self.mark_dirty();
            }

            if last_tick.elapsed() >= tick_rate {
                last_tick = Instant::now();
                self.on_tick();
            }
        }

        Ok(())
    }

    fn on_tick(&mut self) {
        let mut ticked = false;

        if self.screen == Screen::Intro {
            self.intro_tick = self.intro_tick.saturating_add(1);
            if self.intro_tick >= INTRO_TICKS_PER_FRAME
                && self.intro_frame + 1 < ENVELOPE_FRAMES.len()
            {
                self.intro_tick = 0;
                self.intro_frame += 1;
            }
            ticked = true;
        }

        if self.is_loading() {
            if self.spinner.advance() {
                ticked = true;
            }
        } else {
            self.spinner.reset();
        }

        if let Some(resolution) = self.resolution.as_mut() {
            if resolution.tick(self.overall_timeout) {
                if !self.timeout_notified {
                    self.timeout_notified = true;
                    self.status_message =
                        "This is taking longer than expected. Press r to retry or o to open externally.".to_string();
                }
                ticked = true;
            }
        }

        if ticked {
            self.mark_dirty();
        }
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    fn is_loading(&self) -> bool {
        self.resolution
            .as_ref()
            .map(|resolution| resolution.loading)
            .unwrap_or(false)
    }

    fn poll_async(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.events_rx.try_recv() {
            changed |= self.handle_resolver_event(event);
        }
        changed
    }

    fn handle_resolver_event(&mut self, event: ResolverEvent) -> bool {
        let Some(resolution) = self.resolution.as_mut() else {
            return false;
        };
        if !resolution.apply(&event) {
            return false;
        }

        match resolution.phase {
            Phase::Resolved => {
                let src = resolution.current_src.clone().unwrap_or_default();
                self.status_message = format!("Ready to play: {}", src);
            }
            Phase::Exhausted => {
                self.status_message =
                    "Couldn't load this gift's media. Press r to retry or o to open it externally."
                        .to_string();
            }
            _ => {}
        }
        true
    }

    fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        match self.screen {
            Screen::Intro => {
                self.finish_intro();
                Ok(false)
            }
            Screen::Grid => self.handle_grid_key(code),
            Screen::Reveal => self.handle_reveal_key(code),
        }
    }

    fn finish_intro(&mut self) {
        self.screen = Screen::Grid;
        self.status_message = format!(
            "{} gifts under the tree. Move with h/j/k/l, Enter to unwrap, q to quit.",
            self.catalog.gifts.len()
        );
        self.mark_dirty();
    }

    fn handle_grid_key(&mut self, code: KeyCode) -> Result<bool> {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(true),
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(0, 1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(0, -1),
            KeyCode::Char('h') | KeyCode::Left => self.move_selection(-1, 0),
            KeyCode::Char('l') | KeyCode::Right => self.move_selection(1, 0),
            KeyCode::Char(ch) if ch.is_ascii_digit() && ch != '0' => {
                // Digits beyond the catalog are ignored, matching the
                // clamp-not-wrap discipline of arrow movement.
                let index = ch as usize - '1' as usize;
                if index < self.catalog.gifts.len() {
                    self.selected = index;
                    self.mark_dirty();
                }
            }
            KeyCode::Enter => self.open_selected_gift(),
            _ => {}
        }
        Ok(false)
    }

    fn move_selection(&mut self, dx: isize, dy: isize) {
        let count = self.catalog.gifts.len();
        if count == 0 {
            return;
        }
        self.selected = shifted_index(self.selected, count, GRID_COLS, dx, dy);
        self.mark_dirty();
    }

    fn open_selected_gift(&mut self) {
        let Some(gift) = self.catalog.gifts.get(self.selected).cloned() else {
            return;
        };

        // A previous selection's probes must never touch the new state.
        if let Some(previous) = self.resolution.take() {
            previous.cancel();
        }

        let request_id = self.allocate_request_id();
        let mut resolution = Resolution::new(gift, self.origin.as_ref(), request_id);
        self.timeout_notified = false;

        if let Some(request) = resolution.start(self.events_tx.clone()) {
            if let Some(handle) = &self.resolver_handle {
                self.status_message = format!(
                    "{} Unwrapping {}…",
                    self.spinner.frame(),
                    resolution.gift.display_title()
                );
                handle.enqueue(request);
            } else {
                // No probe runner: adopt the first candidate untested.
                resolution.resolve_without_probe();
                self.status_message =
                    "Media probing is unavailable; showing the reference as-is.".to_string();
            }
        } else {
            self.status_message = format!("Unwrapped {}.", resolution.gift.display_title());
        }

        self.resolution = Some(resolution);
        self.screen = Screen::Reveal;
        self.mark_dirty();
    }

    fn allocate_request_id(&mut self) -> u64 {
        let id = self.next_request_id;
        self.next_request_id += 1;
        id
    }

    fn handle_reveal_key(&mut self, code: KeyCode) -> Result<bool> {
        match code {
            KeyCode::Esc | KeyCode::Char('b') | KeyCode::Char('q') => self.close_reveal(),
            KeyCode::Char('r') => self.retry_resolution(),
            KeyCode::Char('o') => self.open_externally()?,
            _ => {}
        }
        Ok(false)
    }

    fn close_reveal(&mut self) {
        if let Some(resolution) = self.resolution.take() {
            resolution.cancel();
        }
        self.screen = Screen::Grid;
        self.status_message = "Back under the tree.".to_string();
        self.mark_dirty();
    }

    fn retry_resolution(&mut self) {
        let request_id = self.allocate_request_id();
        let Some(resolution) = self.resolution.as_mut() else {
            return;
        };
        if !resolution.failed {
            return;
        }
        self.timeout_notified = false;
        if let Some(request) = resolution.retry(self.origin.as_ref(), request_id, self.events_tx.clone())
        {
            if let Some(handle) = &self.resolver_handle {
                handle.enqueue(request);
            }
        }
        self.status_message = format!(
            "{} Retrying {}…",
            self.spinner.frame(),
            resolution.gift.display_title()
        );
        self.mark_dirty();
    }

    fn open_externally(&mut self) -> Result<()> {
        let next_request_id = self.allocate_request_id();
        let Some(resolution) = self.resolution.as_mut() else {
            return Ok(());
        };

        if resolution.phase == Phase::Resolved {
            let src = resolution.current_src.clone().unwrap_or_default();
            match webbrowser::open(&src) {
                Ok(_) => {
                    self.status_message = format!("Opened {} in your browser.", src);
                }
                Err(err) => {
                    // Treat a failed launch of the resolved source like a
                    // playback error: move on to the next candidate.
                    resolver::debug_log(format!("external open failed for {src}: {err}"));
                    if let Some(request) =
                        resolution.playback_error(next_request_id, self.events_tx.clone())
                    {
                        if let Some(handle) = &self.resolver_handle {
                            handle.enqueue(request);
                        }
                        self.status_message =
                            format!("Failed to open {}: {}. Trying the next source…", src, err);
                    } else {
                        self.status_message = format!("Failed to open {}: {}", src, err);
                    }
                }
            }
            self.mark_dirty();
            return Ok(());
        }

        let reference = resolution.gift.media.clone();
        let (target, fetch_error) = resolver::external_open_url(
            &self.external_client,
            &self.user_agent,
            &reference,
            self.origin.as_ref(),
            &self.search_url_base,
        );

        match webbrowser::open(&target) {
            Ok(_) => {
                self.status_message = match fetch_error {
                    Some(err) => {
                        resolver::debug_log(format!("external fetch fallback: {err}"));
                        format!("Couldn't reach the media directly ({err}); opened a web search instead.")
                    }
                    None => format!("Opened {} in your browser.", target),
                };
            }
            Err(err) => {
                self.status_message = format!("Failed to open {}: {} (URL: {})", reference, err, target);
            }
        }
        self.mark_dirty();
        Ok(())
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.size();
        frame.render_widget(
            Block::default().style(Style::default().bg(COLOR_BG)),
            area,
        );

        match self.screen {
            Screen::Intro => self.draw_intro(frame, area),
            Screen::Grid => self.draw_grid(frame, area),
            Screen::Reveal => {
                self.draw_grid(frame, area);
                self.draw_reveal(frame, area);
            }
        }
    }

    fn draw_intro(&self, frame: &mut Frame, area: Rect) {
        let art = ENVELOPE_FRAMES[self.intro_frame.min(ENVELOPE_FRAMES.len() - 1)];
        let mut lines: Vec<Line> = art
            .lines()
            .map(|line| {
                Line::from(Span::styled(
                    line.to_string(),
                    Style::default().fg(COLOR_ACCENT),
                ))
            })
            .collect();
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "a little something, wrapped up for you",
            Style::default()
                .fg(COLOR_TEXT_SECONDARY)
                .add_modifier(Modifier::ITALIC),
        )));

        let height = lines.len() as u16;
        let target = centered_rect(area, 44, height.saturating_add(2));
        let paragraph = Paragraph::new(Text::from(lines))
            .alignment(Alignment::Center)
            .style(Style::default().fg(COLOR_TEXT_PRIMARY));
        frame.render_widget(paragraph, target);
    }

    fn draw_grid(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Min(CARD_HEIGHT),
                Constraint::Length(1),
            ])
            .split(area);

        let header = Paragraph::new(Line::from(vec![
            Span::styled("❄ ", Style::default().fg(COLOR_TEXT_SECONDARY)),
            Span::styled(
                "Giftwrap",
                Style::default()
                    .fg(COLOR_ACCENT)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                " — pick a gift to unwrap ❄",
                Style::default().fg(COLOR_TEXT_SECONDARY),
            ),
        ]))
        .alignment(Alignment::Center);
        frame.render_widget(header, chunks[0]);

        self.draw_cards(frame, chunks[1]);

        let status = Paragraph::new(Line::from(vec![
            Span::styled(
                self.status_line(),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            ),
        ]))
        .alignment(Alignment::Left);
        frame.render_widget(status, chunks[2]);
    }

    fn status_line(&self) -> String {
        if self.status_message.is_empty() {
            format!("config: {}", self.config_path)
        } else {
            self.status_message.clone()
        }
    }

    fn draw_cards(&self, frame: &mut Frame, area: Rect) {
        let gifts = &self.catalog.gifts;
        if gifts.is_empty() {
            let empty = Paragraph::new("The catalog is empty — nothing to unwrap.")
                .alignment(Alignment::Center)
                .style(Style::default().fg(COLOR_TEXT_SECONDARY));
            frame.render_widget(empty, area);
            return;
        }

        let rows = gifts.len().div_ceil(GRID_COLS);
        let row_constraints: Vec<Constraint> =
            (0..rows).map(|_| Constraint::Length(CARD_HEIGHT)).collect();
        let row_areas = Layout::default()
            .direction(Direction::Vertical)
            .constraints(row_constraints)
            .split(area);

        for (row, row_area) in row_areas.iter().enumerate() {
            let col_constraints: Vec<Constraint> = (0..GRID_COLS)
                .map(|_| Constraint::Percentage(100 / GRID_COLS as u16))
                .collect();
            let col_areas = Layout::default()
                .direction(Direction::Horizontal)
                .constraints(col_constraints)
                .split(*row_area);

            for (col, col_area) in col_areas.iter().enumerate() {
                let index = row * GRID_COLS + col;
                let Some(gift) = gifts.get(index) else {
                    continue;
                };
                self.draw_card(frame, *col_area, index, gift);
            }
        }
    }

    fn draw_card(&self, frame: &mut Frame, area: Rect, index: usize, gift: &GiftEntry) {
        let focused = index == self.selected && self.screen == Screen::Grid;
        let border = if focused {
            Style::default().fg(COLOR_BORDER_FOCUSED)
        } else {
            Style::default().fg(COLOR_BORDER_IDLE)
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(format!(" {} ", index + 1))
            .style(Style::default().bg(COLOR_PANEL_BG));

        let ribbon = if focused { "🎁 ✨" } else { "🎁" };
        let lines = vec![
            Line::from(Span::styled(
                ribbon.to_string(),
                Style::default().fg(COLOR_ACCENT),
            )),
            Line::from(Span::styled(
                gift.display_title().to_string(),
                Style::default()
                    .fg(COLOR_TEXT_PRIMARY)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                gift.media_hint().to_string(),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            )),
        ];

        let card = Paragraph::new(Text::from(lines))
            .alignment(Alignment::Center)
            .block(block);
        frame.render_widget(card, area);
    }

    fn draw_reveal(&self, frame: &mut Frame, area: Rect) {
        let Some(resolution) = self.resolution.as_ref() else {
            return;
        };

        let modal = centered_rect(area, 68, 16);
        frame.render_widget(Clear, modal);

        let title = format!(" {} ", resolution.gift.display_title());
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(COLOR_BORDER_FOCUSED))
            .title(title)
            .padding(Padding::new(2, 2, 1, 1))
            .style(Style::default().bg(COLOR_PANEL_BG));
        let inner_width = modal.width.saturating_sub(6) as usize;

        let mut lines: Vec<Line> = Vec::new();
        match resolution.phase {
            Phase::Idle | Phase::Probing => {
                let label = if resolution.loading {
                    format!("{} Unwrapping…", self.spinner.frame())
                } else {
                    "Still looking for a playable source…".to_string()
                };
                lines.push(Line::from(Span::styled(
                    label,
                    Style::default().fg(COLOR_ACCENT),
                )));
                if let Some(candidate) = resolution.candidates.get(resolution.active_index) {
                    lines.push(Line::from(Span::styled(
                        format!(
                            "trying {} ({}/{})",
                            candidate,
                            resolution.active_index + 1,
                            resolution.candidates.len()
                        ),
                        Style::default().fg(COLOR_TEXT_SECONDARY),
                    )));
                }
            }
            Phase::Resolved => {
                let src = resolution.current_src.as_deref().unwrap_or_default();
                lines.extend(media_panel_lines(&resolution.gift, src, inner_width));
                lines.push(Line::default());
                lines.push(Line::from(Span::styled(
                    "o open · Esc back",
                    Style::default().fg(COLOR_TEXT_SECONDARY),
                )));
            }
            Phase::Exhausted => {
                match resolution.poster() {
                    Some(poster) => {
                        lines.extend(placeholder_lines("poster", poster, inner_width));
                    }
                    None => {
                        lines.push(Line::from(Span::styled(
                            "The media for this gift could not be loaded.",
                            Style::default().fg(COLOR_ERROR),
                        )));
                    }
                }
                if let Some(err) = &resolution.last_error {
                    lines.push(Line::from(Span::styled(
                        err.to_string(),
                        Style::default().fg(COLOR_TEXT_SECONDARY),
                    )));
                }
                lines.push(Line::default());
                lines.push(Line::from(Span::styled(
                    "r retry · o open externally · Esc back",
                    Style::default().fg(COLOR_TEXT_SECONDARY),
                )));
            }
        }

        let note = resolution.gift.note.trim();
        if !note.is_empty() {
            lines.push(Line::default());
            for wrapped in wrap(note, inner_width.max(16)) {
                lines.push(Line::from(Span::styled(
                    wrapped.into_owned(),
                    Style::default()
                        .fg(COLOR_TEXT_PRIMARY)
                        .add_modifier(Modifier::ITALIC),
                )));
            }
        }

        let body = Paragraph::new(Text::from(lines))
            .block(block)
            .wrap(Wrap { trim: false });
        frame.render_widget(body, modal);
    }
}

/// Stand-in for actual media output: a framed box naming what would play
/// there, sized to the modal.
fn media_panel_lines(gift: &GiftEntry, src: &str, width: usize) -> Vec<Line<'static>> {
    match gift.kind {
        MediaKind::Image => placeholder_lines("image", src, width),
        MediaKind::Embed => {
            let mut lines = placeholder_lines("embedded player", src, width);
            lines.push(Line::from(Span::styled(
                "Press o to open the embedded player in your browser.",
                Style::default().fg(COLOR_TEXT_SECONDARY),
            )));
            lines
        }
        MediaKind::Video => {
            let mut lines = vec![Line::from(Span::styled(
                format!("▶ {}", src),
                Style::default().fg(COLOR_SUCCESS),
            ))];
            lines.push(Line::from(Span::styled(
                format!("{} resolved and ready", gift.media_hint()),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            )));
            lines
        }
    }
}

fn placeholder_lines(label: &str, source: &str, width: usize) -> Vec<Line<'static>> {
    let label_line = format!("[{}: {}]", label, source);
    let width = width.max(UnicodeWidthStr::width(label_line.as_str()) + 2);
    let border: String = "·".repeat(width);
    let padding = width.saturating_sub(UnicodeWidthStr::width(label_line.as_str()));
    let left = padding / 2;
    let right = padding - left;
    let middle = format!("{}{}{}", " ".repeat(left), label_line, " ".repeat(right));
    vec![
        Line::from(Span::styled(
            border.clone(),
            Style::default().fg(COLOR_BORDER_IDLE),
        )),
        Line::from(Span::styled(
            middle,
            Style::default().fg(COLOR_TEXT_PRIMARY),
        )),
        Line::from(Span::styled(
            border,
            Style::default().fg(COLOR_BORDER_IDLE),
        )),
    ]
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

/// Grid movement with wrap-free clamping: horizontal moves stay on the row,
/// vertical moves stay in the column, both clamped to the last card.
fn shifted_index(current: usize, count: usize, cols: usize, dx: isize, dy: isize) -> usize {
    let cols = cols.max(1);
    let last = count.saturating_sub(1);
    let row = current / cols;
    let col = current % cols;

    if dx != 0 {
        let new_col = col.saturating_add_signed(dx).min(cols - 1);
        let candidate = row * cols + new_col;
        return candidate.min(last);
    }

    if dy != 0 {
        let rows = count.div_ceil(cols);
        let new_row = row.saturating_add_signed(dy).min(rows.saturating_sub(1));
        let candidate = new_row * cols + col;
        return candidate.min(last);
    }

    current.min(last)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video_gift(id: &str) -> GiftEntry {
        GiftEntry {
            id: id.into(),
            kind: MediaKind::Video,
            media: format!("clips/{id}.mp4"),
            poster: String::new(),
            title: id.into(),
            note: String::new(),
        }
    }

    fn grid_model(gifts: Vec<GiftEntry>) -> Model {
        Model::new(Options {
            status_message: String::new(),
            catalog: Catalog { gifts },
            resolver_handle: None,
            origin: None,
            overall_timeout: Duration::from_secs(12),
            user_agent: "test".into(),
            search_url_base: "https://duckduckgo.com/?q=".into(),
            external_client: Client::new(),
            config_path: String::new(),
            skip_intro: true,
        })
    }

    #[test]
    fn missing_probe_runner_still_resolves_the_first_candidate() {
        let mut model = grid_model(vec![video_gift("a")]);
        model.open_selected_gift();

        assert!(matches!(model.screen, Screen::Reveal));
        let resolution = model.resolution.as_ref().unwrap();
        assert_eq!(resolution.phase, Phase::Resolved);
        assert_eq!(resolution.current_src.as_deref(), Some("clips/a.mp4"));
        assert!(!resolution.loading);
        assert!(!resolution.failed);
        assert!(model.status_message.contains("as-is"));
    }

    #[test]
    fn out_of_range_digit_keys_are_ignored() {
        let mut model = grid_model(vec![video_gift("a"), video_gift("b"), video_gift("c")]);
        model.handle_grid_key(KeyCode::Char('2')).unwrap();
        assert_eq!(model.selected, 1);

        model.handle_grid_key(KeyCode::Char('9')).unwrap();
        assert_eq!(model.selected, 1);
    }

    #[test]
    fn shifted_index_clamps_at_grid_edges() {
        // 5 cards in a 3-wide grid: rows [0 1 2] / [3 4].
        assert_eq!(shifted_index(0, 5, 3, -1, 0), 0);
        assert_eq!(shifted_index(2, 5, 3, 1, 0), 2);
        assert_eq!(shifted_index(0, 5, 3, 1, 0), 1);
        assert_eq!(shifted_index(1, 5, 3, 0, 1), 4);
        assert_eq!(shifted_index(2, 5, 3, 0, 1), 4);
        assert_eq!(shifted_index(4, 5, 3, 0, -1), 1);
        assert_eq!(shifted_index(4, 5, 3, 0, 1), 4);
    }

    #[test]
    fn centered_rect_never_exceeds_area() {
        let area = Rect::new(0, 0, 20, 10);
        let rect = centered_rect(area, 40, 40);
        assert_eq!(rect.width, 20);
        assert_eq!(rect.height, 10);

        let rect = centered_rect(area, 10, 4);
        assert_eq!(rect.x, 5);
        assert_eq!(rect.y, 3);
    }

    #[test]
    fn placeholder_lines_center_the_label() {
        let lines = placeholder_lines("poster", "/posters/a.png", 30);
        assert_eq!(lines.len(), 3);
        let middle = lines[1].spans[0].content.as_ref().trim().to_string();
        assert_eq!(middle, "[poster: /posters/a.png]");
        assert_eq!(
            UnicodeWidthStr::width(lines[0].spans[0].content.as_ref()),
            30
        );
    }

    #[test]
    fn media_panel_respects_declared_kind() {
        let gift = GiftEntry {
            id: "g".into(),
            kind: MediaKind::Image,
            media: "/clips/fools-you.mp4".into(),
            poster: String::new(),
            title: String::new(),
            note: String::new(),
        };
        let lines = media_panel_lines(&gift, "/clips/fools-you.mp4", 40);
        let rendered = lines[1].spans[0].content.to_string();
        assert!(rendered.contains("[image:"));
    }
}
