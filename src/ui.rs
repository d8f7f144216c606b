use std::io::{self, Stdout};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{Datelike, Local, TimeZone};
use crossbeam_channel::Receiver;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use percent_encoding::percent_decode_str;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{
    Block, Borders, Clear, List, ListItem, ListState, Padding, Paragraph, Wrap,
};
use ratatui::{Frame, Terminal};
use textwrap::{wrap, Options as WrapOptions};
use unicode_width::UnicodeWidthStr;
use url::Url;

use crate::feed::{self, SortKey};
use crate::form::{CommentBox, EditField, EditForm, FormField, PostForm};
use crate::post::{self, Post};
use crate::router::{History, Route};
use crate::store::{PostStore, StoreEvent};
use crate::tasks::{Completion, TaskRunner};
use crate::upload;

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const CURSOR: &str = "▏";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const EMPTY_FEED: &str = "No posts yet. Create one above!";
const NOT_FOUND: &str = "Post not found";

#[derive(Clone, Copy, Debug)]
pub struct Palette {
    bg: Color,
    panel_bg: Color,
    panel_focused_bg: Color,
    panel_selected_bg: Color,
    border_idle: Color,
    border_focused: Color,
    text_primary: Color,
    text_secondary: Color,
    accent: Color,
    success: Color,
    error: Color,
}

impl Palette {
    pub fn from_theme(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "light" => Self {
                bg: Color::Rgb(239, 241, 245),
                panel_bg: Color::Rgb(230, 233, 239),
                panel_focused_bg: Color::Rgb(204, 208, 218),
                panel_selected_bg: Color::Rgb(188, 192, 204),
                border_idle: Color::Rgb(172, 176, 190),
                border_focused: Color::Rgb(30, 102, 245),
                text_primary: Color::Rgb(76, 79, 105),
                text_secondary: Color::Rgb(108, 111, 133),
                accent: Color::Rgb(30, 102, 245),
                success: Color::Rgb(64, 160, 43),
                error: Color::Rgb(210, 15, 57),
            },
            _ => Self {
                bg: Color::Rgb(30, 30, 46),
                panel_bg: Color::Rgb(24, 24, 36),
                panel_focused_bg: Color::Rgb(49, 50, 68),
                panel_selected_bg: Color::Rgb(69, 71, 90),
                border_idle: Color::Rgb(49, 50, 68),
                border_focused: Color::Rgb(137, 180, 250),
                text_primary: Color::Rgb(205, 214, 244),
                text_secondary: Color::Rgb(166, 173, 200),
                accent: Color::Rgb(137, 180, 250),
                success: Color::Rgb(166, 227, 161),
                error: Color::Rgb(243, 139, 168),
            },
        }
    }
}

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

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum FeedFocus {
    Form,
    Search,
    List,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum DetailFocus {
    Actions,
    Comment,
}

enum DetailMode {
    View,
    Edit(EditForm),
}

/// Per-visit state of the post page; rebuilt whenever the route changes.
struct DetailState {
    mode: DetailMode,
    focus: DetailFocus,
    comment: CommentBox,
}

impl Default for DetailState {
    fn default() -> Self {
        Self {
            mode: DetailMode::View,
            focus: DetailFocus::Actions,
            comment: CommentBox::default(),
        }
    }
}

#[derive(Clone)]
enum ImageSummary {
    Inline { mime: String, size: usize },
    Linked { label: String, url: String },
}

fn summarize_image(url: &str) -> Option<ImageSummary> {
    if url.is_empty() {
        return None;
    }
    if let Some((mime, size)) = post::describe_data_url(url) {
        return Some(ImageSummary::Inline { mime, size });
    }
    Some(ImageSummary::Linked {
        label: image_label(url),
        url: url.to_string(),
    })
}

fn image_label(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .map(|segment| percent_decode_str(segment).decode_utf8_lossy().to_string())
        })
        .filter(|label| !label.is_empty())
        .unwrap_or_else(|| "image".to_string())
}

fn image_line_text(url: &str) -> Option<String> {
    summarize_image(url).map(|summary| match summary {
        ImageSummary::Inline { mime, size } => format!("Image: inline image ({mime}, {size} bytes)"),
        ImageSummary::Linked { label, url } => format!("Image: {label} <{url}>"),
    })
}

pub fn format_timestamp(millis: i64) -> String {
    Local
        .timestamp_millis_opt(millis)
        .single()
        .map(|time| time.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_else(|| "unknown time".to_string())
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

fn wrap_plain(text: &str, width: usize, style: Style) -> Vec<Line<'static>> {
    if text.trim().is_empty() {
        return vec![Line::from(Span::styled(String::new(), style))];
    }
    let options = WrapOptions::new(width.max(1)).break_words(true);
    text.split('\n')
        .flat_map(|paragraph| {
            if paragraph.is_empty() {
                return vec![Line::from(Span::styled(String::new(), style))];
            }
            wrap(paragraph, &options)
                .into_iter()
                .map(|cow| Line::from(Span::styled(cow.into_owned(), style)))
                .collect()
        })
        .collect()
}

fn pad_lines_to_width(lines: &mut [Line<'static>], width: u16) {
    let width = width as usize;
    if width == 0 {
        return;
    }

    for line in lines {
        let current_width: usize = line
            .spans
            .iter()
            .map(|span| UnicodeWidthStr::width(span.content.as_ref()))
            .sum();
        if current_width >= width {
            continue;
        }
        let pad_style = line.spans.last().map(|span| span.style).unwrap_or_default();
        let padding = " ".repeat(width - current_width);
        line.spans.push(Span::styled(padding, pad_style));
    }
}

#[derive(Clone, Debug)]
pub struct Options {
    pub status_message: String,
    pub default_sort: SortKey,
    pub submit_delay: Duration,
    pub max_upload_bytes: u64,
    pub palette: Palette,
}

pub struct Model {
    store: PostStore,
    store_events: Receiver<StoreEvent>,
    history: History,
    tasks: TaskRunner,
    form: PostForm,
    search: String,
    sort: SortKey,
    feed_focus: FeedFocus,
    selected: usize,
    detail: DetailState,
    address_prompt: Option<String>,
    status_message: String,
    spinner: Spinner,
    palette: Palette,
    submit_delay: Duration,
    max_upload_bytes: u64,
    needs_redraw: bool,
}

impl Model {
    pub fn new(mut store: PostStore, opts: Options) -> Self {
        let store_events = store.subscribe();
        Self {
            store,
            store_events,
            history: History::default(),
            tasks: TaskRunner::new(),
            form: PostForm::default(),
            search: String::new(),
            sort: opts.default_sort,
            feed_focus: FeedFocus::List,
            selected: 0,
            detail: DetailState::default(),
            address_prompt: None,
            status_message: opts.status_message,
            spinner: Spinner::new(),
            palette: opts.palette,
            submit_delay: opts.submit_delay,
            max_upload_bytes: opts.max_upload_bytes,
            needs_redraw: true,
        }
    }

    pub fn store(&self) -> &PostStore {
        &self.store
    }

    pub fn route(&self) -> &Route {
        self.history.current()
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
                            }
                        }
                        self.mark_dirty();
                    }
                }
            }

            if last_tick.elapsed() >= tick_rate {
                last_tick = Instant::now();
                if self.is_loading() {
                    if self.spinner.advance() {
                        self.mark_dirty();
                    }
                } else {
                    self.spinner.reset();
                }
            }
        }

        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    fn is_loading(&self) -> bool {
        self.tasks.is_submitting() || self.form.upload_pending()
    }

    fn poll_async(&mut self) -> bool {
        let mut changed = false;
        for completion in self.tasks.poll() {
            self.handle_completion(completion);
            changed = true;
        }
        changed | self.drain_store_events()
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Submission { draft } => {
                let title = draft.title.clone();
                match self.store.create(draft) {
                    Some(_) => self.status_message = format!("Created \"{}\".", title.trim()),
                    None => tracing::debug!("queued draft without a title was dropped"),
                }
            }
            Completion::Upload {
                request_id,
                path,
                result,
            } => match result {
                Ok(image) => {
                    let message = format!(
                        "Attached {} ({}, {} bytes).",
                        image.source, image.mime, image.size_bytes
                    );
                    if self.form.complete_upload(request_id, Some(image)) {
                        self.status_message = message;
                    }
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "upload failed");
                    if self.form.complete_upload(request_id, None) {
                        self.status_message = format!("Upload failed: {err}");
                    }
                }
            },
        }
    }

    fn drain_store_events(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.store_events.try_recv() {
            if let StoreEvent::Created { .. } = event {
                if matches!(self.route(), Route::Feed) {
                    self.selected = 0;
                }
            }
            changed = true;
        }
        self.clamp_selection();
        changed
    }

    fn visible_posts(&self) -> Vec<&Post> {
        feed::derive(self.store.posts(), &self.search, self.sort)
    }

    fn clamp_selection(&mut self) {
        let len = self.visible_posts().len();
        self.selected = if len == 0 {
            0
        } else {
            self.selected.min(len - 1)
        };
    }

    fn navigate(&mut self, route: Route) {
        tracing::debug!(address = %route, "navigate");
        self.history.push(route);
        self.enter_route();
    }

    fn go_back(&mut self) {
        if self.history.back() {
            self.enter_route();
        } else {
            self.status_message = "Already at the first page.".to_string();
        }
    }

    fn go_forward(&mut self) {
        if self.history.forward() {
            self.enter_route();
        }
    }

    fn enter_route(&mut self) {
        self.detail = DetailState::default();
        self.address_prompt = None;
        self.clamp_selection();
    }

    #[cfg(test)]
    fn current_post_id(&self) -> Option<String> {
        match self.route() {
            Route::Post { id } => Some(id.clone()),
            Route::Feed => None,
        }
    }

    fn in_text_input(&self) -> bool {
        match self.route() {
            Route::Feed => {
                matches!(self.feed_focus, FeedFocus::Search)
                    || (self.feed_focus == FeedFocus::Form && self.form.active != FormField::Submit)
            }
            Route::Post { .. } => match &self.detail.mode {
                DetailMode::Edit(_) => true,
                DetailMode::View => self.detail.focus == DetailFocus::Comment,
            },
        }
    }

    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        if self.address_prompt.is_some() {
            self.handle_address_key(code);
            return Ok(false);
        }

        if !self.in_text_input() {
            match code {
                KeyCode::Char('q') => return Ok(true),
                KeyCode::Char('g') => {
                    self.address_prompt = Some(self.route().path());
                    return Ok(false);
                }
                KeyCode::Char('F') => {
                    self.go_forward();
                    return Ok(false);
                }
                _ => {}
            }
        }

        match self.route().clone() {
            Route::Feed => self.handle_feed_key(code),
            Route::Post { id } => self.handle_detail_key(&id, code),
        }
        Ok(false)
    }

    fn handle_address_key(&mut self, code: KeyCode) {
        let Some(address) = self.address_prompt.as_mut() else {
            return;
        };
        match code {
            KeyCode::Esc => self.address_prompt = None,
            KeyCode::Backspace => {
                address.pop();
            }
            KeyCode::Char(ch) => address.push(ch),
            KeyCode::Enter => {
                let typed = address.trim().to_string();
                match Route::parse(&typed) {
                    Some(route) => self.navigate(route),
                    None => {
                        self.status_message = format!("No page at {typed}.");
                        self.address_prompt = None;
                    }
                }
            }
            _ => {}
        }
    }

    fn handle_feed_key(&mut self, code: KeyCode) {
        match self.feed_focus {
            FeedFocus::Form => self.handle_form_key(code),
            FeedFocus::Search => match code {
                KeyCode::Esc | KeyCode::Enter | KeyCode::Tab => self.feed_focus = FeedFocus::List,
                KeyCode::BackTab => self.feed_focus = FeedFocus::Form,
                KeyCode::Backspace => {
                    self.search.pop();
                    self.selected = 0;
                }
                KeyCode::Char(ch) => {
                    self.search.push(ch);
                    self.selected = 0;
                }
                _ => {}
            },
            FeedFocus::List => self.handle_list_key(code),
        }
    }

    fn handle_list_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('j') | KeyCode::Down => {
                let len = self.visible_posts().len();
                if self.selected + 1 < len {
                    self.selected += 1;
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Enter => {
                let target = self
                    .visible_posts()
                    .get(self.selected)
                    .map(|post| post.id.clone());
                if let Some(id) = target {
                    self.navigate(Route::post(id));
                }
            }
            KeyCode::Char('/') => self.feed_focus = FeedFocus::Search,
            KeyCode::Char('t') => self.set_sort(SortKey::CreatedAt),
            KeyCode::Char('v') => self.set_sort(SortKey::Upvotes),
            KeyCode::Char('n') | KeyCode::BackTab => {
                self.feed_focus = FeedFocus::Form;
                self.form.focus(FormField::Title);
            }
            KeyCode::Tab => self.feed_focus = FeedFocus::Form,
            KeyCode::Char('b') | KeyCode::Esc => self.go_back(),
            _ => {}
        }
    }

    fn set_sort(&mut self, sort: SortKey) {
        self.sort = sort;
        self.selected = 0;
        self.status_message = format!("{} selected.", sort.label());
    }

    fn handle_form_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => self.feed_focus = FeedFocus::List,
            KeyCode::Tab => {
                if self.form.active == FormField::Submit {
                    self.feed_focus = FeedFocus::Search;
                }
                self.form.next();
            }
            KeyCode::BackTab => self.form.previous(),
            KeyCode::Backspace => self.form.backspace(),
            KeyCode::Enter => match self.form.active {
                FormField::Content => self.form.insert_char('\n'),
                FormField::ImageFile => self.start_upload(),
                FormField::Submit => self.submit_form(),
                FormField::Title | FormField::ImageUrl => self.form.next(),
            },
            KeyCode::Char(ch) => {
                if self.form.active == FormField::Submit {
                    if ch == ' ' {
                        self.submit_form();
                    }
                } else {
                    self.form.insert_char(ch);
                }
            }
            _ => {}
        }
    }

    fn start_upload(&mut self) {
        if self.form.image_path.trim().is_empty() {
            self.form.next();
            return;
        }
        let path: PathBuf = upload::expand_path(&self.form.image_path);
        let request_id = self.tasks.start_upload(path.clone(), self.max_upload_bytes);
        self.form.begin_upload(request_id);
        self.status_message = format!("Reading {}…", path.display());
    }

    fn submit_form(&mut self) {
        match self.form.submit() {
            Some(draft) => {
                self.tasks.schedule_submission(self.submit_delay, draft);
                self.status_message = "Creating post…".to_string();
                self.feed_focus = FeedFocus::List;
            }
            None => {
                self.status_message = "Title is required.".to_string();
                self.form.focus(FormField::Title);
            }
        }
    }

    fn handle_detail_key(&mut self, id: &str, code: KeyCode) {
        if self.store.get(id).is_none() {
            if matches!(code, KeyCode::Char('b') | KeyCode::Esc | KeyCode::Backspace) {
                self.go_back();
            }
            return;
        }

        if let DetailMode::Edit(form) = &mut self.detail.mode {
            match code {
                KeyCode::Esc => {
                    self.detail.mode = DetailMode::View;
                    self.status_message = "Edit cancelled.".to_string();
                }
                KeyCode::Tab => form.next(),
                KeyCode::BackTab => form.previous(),
                KeyCode::Backspace => form.backspace(),
                KeyCode::Enter => match form.active {
                    EditField::Save => self.save_edit(id),
                    EditField::Cancel => {
                        self.detail.mode = DetailMode::View;
                        self.status_message = "Edit cancelled.".to_string();
                    }
                    EditField::Content => form.insert_char('\n'),
                    EditField::Title | EditField::ImageUrl => form.next(),
                },
                KeyCode::Char(ch) => form.insert_char(ch),
                _ => {}
            }
            return;
        }

        match self.detail.focus {
            DetailFocus::Comment => match code {
                KeyCode::Esc | KeyCode::Tab | KeyCode::BackTab => {
                    self.detail.focus = DetailFocus::Actions
                }
                KeyCode::Backspace => self.detail.comment.backspace(),
                KeyCode::Enter => {
                    let text = self.detail.comment.take();
                    self.store.add_comment(id, text);
                }
                KeyCode::Char(ch) => self.detail.comment.insert_char(ch),
                _ => {}
            },
            DetailFocus::Actions => match code {
                KeyCode::Char('u') => {
                    self.store.upvote(id);
                }
                KeyCode::Char('e') => {
                    if let Some(post) = self.store.get(id) {
                        self.detail.mode = DetailMode::Edit(EditForm::seeded_from(post));
                    }
                }
                KeyCode::Char('D') => {
                    self.store.delete(id);
                    self.status_message = "Post deleted.".to_string();
                    self.navigate(Route::Feed);
                }
                KeyCode::Char('c') | KeyCode::Tab | KeyCode::BackTab => {
                    self.detail.focus = DetailFocus::Comment
                }
                KeyCode::Char('b') | KeyCode::Esc | KeyCode::Backspace => self.go_back(),
                _ => {}
            },
        }
    }

    fn save_edit(&mut self, id: &str) {
        let mode = std::mem::replace(&mut self.detail.mode, DetailMode::View);
        if let DetailMode::Edit(form) = mode {
            self.store.edit(id, form.into_edit());
            self.status_message = "Changes saved.".to_string();
        }
    }

    pub fn draw(&mut self, frame: &mut Frame<'_>) {
        let palette = self.palette;
        let full = frame.size();
        frame.render_widget(Block::default().style(Style::default().bg(palette.bg)), full);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(full);

        let header = Line::from(vec![
            Span::styled(
                " HobbyHub ",
                Style::default()
                    .fg(palette.bg)
                    .bg(palette.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  {}", self.route().path()),
                Style::default().fg(palette.text_secondary),
            ),
        ]);
        frame.render_widget(
            Paragraph::new(header).style(Style::default().bg(palette.panel_focused_bg)),
            layout[0],
        );

        match self.route().clone() {
            Route::Feed => self.draw_feed_page(frame, layout[1]),
            Route::Post { id } => self.draw_post_page(frame, layout[1], &id),
        }

        let status_text = if self.is_loading() {
            format!("{} {}", self.spinner.frame(), self.status_message)
                .trim()
                .to_string()
        } else {
            self.status_message.clone()
        };
        frame.render_widget(
            Paragraph::new(status_text).style(
                Style::default()
                    .fg(palette.text_primary)
                    .bg(palette.panel_focused_bg)
                    .add_modifier(Modifier::BOLD),
            ),
            layout[2],
        );

        let footer = Paragraph::new(self.footer_text())
            .style(
                Style::default()
                    .fg(palette.text_secondary)
                    .bg(palette.panel_bg)
                    .add_modifier(Modifier::ITALIC),
            )
            .alignment(Alignment::Center);
        frame.render_widget(footer, layout[3]);

        if self.address_prompt.is_some() {
            self.draw_address_prompt(frame, layout[1]);
        }
    }

    fn pane_block(&self, title: &str, focused: bool) -> Block<'static> {
        let palette = self.palette;
        let border_style = if focused {
            Style::default().fg(palette.border_focused)
        } else {
            Style::default().fg(palette.border_idle)
        };
        let title_style = if focused {
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(palette.text_secondary)
        };
        Block::default()
            .title(Span::styled(title.to_string(), title_style))
            .borders(Borders::ALL)
            .border_style(border_style)
            .style(Style::default().bg(palette.panel_bg))
            .padding(Padding::horizontal(1))
    }

    fn input_lines(&self, label: &str, value: &str, active: bool) -> Vec<Line<'static>> {
        let palette = self.palette;
        let label_style = if active {
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(palette.text_secondary)
        };
        let value_style = if active {
            Style::default()
                .fg(palette.text_primary)
                .bg(palette.panel_selected_bg)
        } else {
            Style::default().fg(palette.text_primary)
        };
        let mut lines = vec![Line::from(Span::styled(label.to_string(), label_style))];
        let mut value_lines: Vec<Line<'static>> = value
            .split('\n')
            .map(|part| Line::from(Span::styled(format!("  {part}"), value_style)))
            .collect();
        if active {
            if let Some(last) = value_lines.last_mut() {
                last.spans.push(Span::styled(CURSOR, value_style));
            }
        }
        lines.extend(value_lines);
        lines
    }

    fn button_line(&self, label: &str, active: bool) -> Line<'static> {
        let palette = self.palette;
        let style = if active {
            Style::default()
                .fg(palette.bg)
                .bg(palette.accent)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(palette.accent)
        };
        Line::from(Span::styled(format!("[ {label} ]"), style))
    }

    fn draw_feed_page(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(area);
        self.draw_form(frame, chunks[0]);
        self.draw_feed(frame, chunks[1]);
    }

    fn draw_form(&self, frame: &mut Frame<'_>, area: Rect) {
        let palette = self.palette;
        let focused = self.feed_focus == FeedFocus::Form;
        let block = self.pane_block("Create a New Post", focused);

        let mut lines: Vec<Line<'static>> = Vec::new();
        for field in [
            FormField::Title,
            FormField::Content,
            FormField::ImageUrl,
            FormField::ImageFile,
        ] {
            let active = focused && self.form.active == field;
            lines.extend(self.input_lines(field.title(), self.form.value(field), active));
            lines.push(Line::default());
        }

        if self.form.upload_pending() {
            lines.push(Line::from(Span::styled(
                format!("{} Reading image…", self.spinner.frame()),
                Style::default().fg(palette.accent),
            )));
        } else if let Some(image) = self.form.upload() {
            lines.push(Line::from(Span::styled(
                format!(
                    "Preview: {} ({}, {} bytes)",
                    image.source, image.mime, image.size_bytes
                ),
                Style::default().fg(palette.success),
            )));
        }
        lines.push(Line::default());
        lines.push(self.button_line(
            FormField::Submit.title(),
            focused && self.form.active == FormField::Submit,
        ));

        let form = Paragraph::new(Text::from(lines))
            .block(block)
            .wrap(Wrap { trim: false });
        frame.render_widget(form, area);
    }

    fn draw_feed(&self, frame: &mut Frame<'_>, area: Rect) {
        let palette = self.palette;
        let focused = matches!(self.feed_focus, FeedFocus::List | FeedFocus::Search);
        let block = self.pane_block("Posts Feed", focused);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Length(2),
                Constraint::Min(0),
            ])
            .split(inner);

        let searching = self.feed_focus == FeedFocus::Search;
        let search_value = if self.search.is_empty() && !searching {
            "Search by title (/)".to_string()
        } else {
            self.search.clone()
        };
        let search_lines = self.input_lines("Search", &search_value, searching);
        frame.render_widget(Paragraph::new(search_lines), chunks[0]);

        let mut sort_spans = Vec::new();
        for key in [SortKey::CreatedAt, SortKey::Upvotes] {
            let style = if key == self.sort {
                Style::default()
                    .fg(palette.bg)
                    .bg(palette.accent)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(palette.text_secondary)
            };
            let hotkey = match key {
                SortKey::CreatedAt => 't',
                SortKey::Upvotes => 'v',
            };
            sort_spans.push(Span::styled(format!(" {} ({hotkey}) ", key.label()), style));
            sort_spans.push(Span::raw(" "));
        }
        frame.render_widget(Paragraph::new(Line::from(sort_spans)), chunks[1]);

        if self.tasks.is_submitting() {
            let loading = Paragraph::new(format!("{} Creating post…", self.spinner.frame()))
                .style(
                    Style::default()
                        .fg(palette.accent)
                        .add_modifier(Modifier::BOLD),
                )
                .alignment(Alignment::Center);
            frame.render_widget(loading, chunks[2]);
            return;
        }

        let posts = self.visible_posts();
        if posts.is_empty() {
            let empty = Paragraph::new(EMPTY_FEED)
                .style(Style::default().fg(palette.text_secondary))
                .alignment(Alignment::Center);
            frame.render_widget(empty, chunks[2]);
            return;
        }

        let width = chunks[2].width;
        let items: Vec<ListItem> = posts
            .iter()
            .enumerate()
            .map(|(idx, post)| {
                let selected = idx == self.selected && self.feed_focus == FeedFocus::List;
                let background = if selected {
                    palette.panel_selected_bg
                } else {
                    palette.panel_bg
                };
                let mut lines = wrap_plain(
                    &post.title,
                    width as usize,
                    Style::default()
                        .fg(palette.text_primary)
                        .bg(background)
                        .add_modifier(Modifier::BOLD),
                );
                lines.push(Line::from(Span::styled(
                    format!(
                        "{}  |  Upvotes: {}",
                        format_timestamp(post.created_at),
                        post.upvotes
                    ),
                    Style::default().fg(palette.text_secondary).bg(background),
                )));
                lines.push(Line::from(Span::styled(
                    String::new(),
                    Style::default().bg(background),
                )));
                pad_lines_to_width(&mut lines, width);
                ListItem::new(lines)
            })
            .collect();

        let mut state = ListState::default();
        state.select(Some(self.selected));
        frame.render_stateful_widget(List::new(items), chunks[2], &mut state);
    }

    fn draw_post_page(&self, frame: &mut Frame<'_>, area: Rect, id: &str) {
        let palette = self.palette;
        let Some(post) = self.store.get(id) else {
            let block = self.pane_block("Post", true);
            let missing = Paragraph::new(vec![
                Line::from(Span::styled(
                    NOT_FOUND,
                    Style::default()
                        .fg(palette.error)
                        .add_modifier(Modifier::BOLD),
                )),
                Line::default(),
                Line::from(Span::styled(
                    "Press b to go back or g to open another address.",
                    Style::default().fg(palette.text_secondary),
                )),
            ])
            .block(block);
            frame.render_widget(missing, area);
            return;
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(area);

        match &self.detail.mode {
            DetailMode::View => self.draw_post_view(frame, chunks[0], post),
            DetailMode::Edit(form) => self.draw_post_edit(frame, chunks[0], form),
        }
        self.draw_comments(frame, chunks[1], post);
    }

    fn draw_post_view(&self, frame: &mut Frame<'_>, area: Rect, post: &Post) {
        let palette = self.palette;
        let focused = self.detail.focus == DetailFocus::Actions;
        let block = self.pane_block("Post", focused);
        let width = block.inner(area).width as usize;

        let mut lines = wrap_plain(
            &post.title,
            width,
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD),
        );
        lines.push(Line::default());
        if !post.content.is_empty() {
            lines.extend(wrap_plain(
                &post.content,
                width,
                Style::default().fg(palette.text_primary),
            ));
            lines.push(Line::default());
        }
        if let Some(image) = image_line_text(&post.image_url) {
            lines.extend(wrap_plain(
                &image,
                width,
                Style::default().fg(palette.text_secondary),
            ));
            lines.push(Line::default());
        }
        lines.push(Line::from(Span::styled(
            format!(
                "{}  |  Upvotes: {}",
                format_timestamp(post.created_at),
                post.upvotes
            ),
            Style::default().fg(palette.text_secondary),
        )));
        lines.push(Line::default());
        lines.push(Line::from(vec![
            Span::styled("[u] Upvote  ", Style::default().fg(palette.success)),
            Span::styled("[e] Edit  ", Style::default().fg(palette.accent)),
            Span::styled("[D] Delete  ", Style::default().fg(palette.error)),
            Span::styled("[b] ← Back", Style::default().fg(palette.text_secondary)),
        ]));

        let view = Paragraph::new(Text::from(lines))
            .block(block)
            .wrap(Wrap { trim: false });
        frame.render_widget(view, area);
    }

    fn draw_post_edit(&self, frame: &mut Frame<'_>, area: Rect, form: &EditForm) {
        let block = self.pane_block("Edit Post", true);
        let mut lines: Vec<Line<'static>> = Vec::new();
        for field in [EditField::Title, EditField::Content, EditField::ImageUrl] {
            lines.extend(self.input_lines(field.title(), form.value(field), form.active == field));
            lines.push(Line::default());
        }
        let mut buttons = self.button_line(EditField::Save.title(), form.active == EditField::Save);
        buttons.spans.push(Span::raw("  "));
        buttons.spans.extend(
            self.button_line(EditField::Cancel.title(), form.active == EditField::Cancel)
                .spans,
        );
        lines.push(buttons);

        let edit = Paragraph::new(Text::from(lines))
            .block(block)
            .wrap(Wrap { trim: false });
        frame.render_widget(edit, area);
    }

    fn draw_comments(&self, frame: &mut Frame<'_>, area: Rect, post: &Post) {
        let palette = self.palette;
        let commenting = matches!(self.detail.mode, DetailMode::View)
            && self.detail.focus == DetailFocus::Comment;
        let block = self.pane_block("Comments", commenting);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(2)])
            .split(inner);

        let width = chunks[0].width as usize;
        let mut lines: Vec<Line<'static>> = Vec::new();
        if post.comments.is_empty() {
            lines.push(Line::from(Span::styled(
                "No comments yet.",
                Style::default().fg(palette.text_secondary),
            )));
        }
        for (index, comment) in post.comments.iter().enumerate() {
            let prefix = format!("{}. ", index + 1);
            let mut wrapped = wrap_plain(
                comment,
                width.saturating_sub(prefix.len()).max(1),
                Style::default().fg(palette.text_primary),
            );
            if let Some(first) = wrapped.first_mut() {
                first.spans.insert(
                    0,
                    Span::styled(prefix.clone(), Style::default().fg(palette.accent)),
                );
            }
            lines.extend(wrapped);
        }
        let visible = chunks[0].height as usize;
        let scroll = lines.len().saturating_sub(visible) as u16;
        frame.render_widget(
            Paragraph::new(Text::from(lines)).scroll((scroll, 0)),
            chunks[0],
        );

        let input = self.input_lines(
            "Add comment (c), Enter to post",
            &self.detail.comment.text,
            commenting,
        );
        frame.render_widget(Paragraph::new(input), chunks[1]);
    }

    fn draw_address_prompt(&self, frame: &mut Frame<'_>, area: Rect) {
        let palette = self.palette;
        let popup = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup);
        let value = self.address_prompt.clone().unwrap_or_default();
        let mut lines = self.input_lines("Address (/ or /post/<id>)", &value, true);
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "Enter to go · Esc to close",
            Style::default().fg(palette.text_secondary),
        )));
        let prompt = Paragraph::new(Text::from(lines)).block(
            Block::default()
                .title(Span::styled(
                    "Go to",
                    Style::default()
                        .fg(palette.accent)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.accent))
                .style(Style::default().bg(palette.panel_bg)),
        );
        frame.render_widget(prompt, popup);
    }

    fn footer_text(&self) -> String {
        let mut parts: Vec<String> = Vec::new();

        if self.address_prompt.is_some() {
            parts.push("Type an address · Enter go · Esc close".to_string());
        } else {
            match self.route() {
                Route::Feed => match self.feed_focus {
                    FeedFocus::Form => {
                        parts.push("Form: Tab/Shift-Tab field, Enter next/upload/create".to_string());
                        parts.push("Esc leave".to_string());
                    }
                    FeedFocus::Search => parts.push("Search: type to filter, Enter/Esc done".to_string()),
                    FeedFocus::List => {
                        parts.push("j/k move, Enter open".to_string());
                        parts.push("/ search · t time · v upvotes".to_string());
                        parts.push("n new post".to_string());
                    }
                },
                Route::Post { .. } => match &self.detail.mode {
                    DetailMode::Edit(_) => {
                        parts.push("Edit: Tab field, Enter on Save/Cancel, Esc cancel".to_string())
                    }
                    DetailMode::View if self.detail.focus == DetailFocus::Comment => {
                        parts.push("Comment: Enter post, Esc done".to_string())
                    }
                    DetailMode::View => {
                        parts.push("u upvote · e edit · D delete · c comment · b back".to_string())
                    }
                },
            }
            if !self.in_text_input() {
                parts.push("g go to · F forward · q quit".to_string());
            }
        }

        parts.push(format!("HobbyHub © {}", Local::now().year()));
        parts.join(" · ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::PostDraft;
    use crate::store::tests::ticking_store;
    use crate::upload::tests::PNG_HEADER;
    use ratatui::backend::TestBackend;
    use std::fs;
    use tempfile::tempdir;

    const WAIT: Duration = Duration::from_secs(5);

    fn model() -> Model {
        Model::new(
            ticking_store(),
            Options {
                status_message: String::new(),
                default_sort: SortKey::CreatedAt,
                submit_delay: Duration::ZERO,
                max_upload_bytes: 1024,
                palette: Palette::from_theme("default"),
            },
        )
    }

    fn press(model: &mut Model, codes: &[KeyCode]) {
        for code in codes {
            model.handle_key(*code).unwrap();
        }
    }

    fn type_text(model: &mut Model, text: &str) {
        for ch in text.chars() {
            model.handle_key(KeyCode::Char(ch)).unwrap();
        }
    }

    /// Waits for one background completion and applies it.
    fn settle(model: &mut Model) {
        let completion = model.tasks.wait(WAIT).expect("task completion");
        model.handle_completion(completion);
        model.drain_store_events();
    }

    fn create_post(model: &mut Model, title: &str) {
        press(model, &[KeyCode::Char('n')]);
        type_text(model, title);
        press(
            model,
            &[KeyCode::Tab, KeyCode::Tab, KeyCode::Tab, KeyCode::Tab, KeyCode::Enter],
        );
        settle(model);
    }

    fn feed_titles(model: &Model) -> Vec<String> {
        model
            .visible_posts()
            .iter()
            .map(|post| post.title.clone())
            .collect()
    }

    fn render(model: &mut Model) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|frame| model.draw(frame)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        let width = buffer.area.width as usize;
        buffer
            .content
            .chunks(width)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn open(model: &mut Model, title: &str) {
        let index = feed_titles(model)
            .iter()
            .position(|t| t == title)
            .expect("post in feed");
        model.selected = index;
        press(model, &[KeyCode::Enter]);
    }

    #[test]
    fn end_to_end_feed_flow() {
        let mut model = model();
        create_post(&mut model, "A");
        create_post(&mut model, "B");
        assert_eq!(feed_titles(&model), ["B", "A"]);

        open(&mut model, "A");
        let a_id = model.current_post_id().unwrap();
        press(&mut model, &[KeyCode::Char('u'), KeyCode::Char('b')]);
        assert_eq!(model.route(), &Route::Feed);

        press(&mut model, &[KeyCode::Char('v')]);
        assert_eq!(feed_titles(&model), ["A", "B"]);

        open(&mut model, "B");
        press(&mut model, &[KeyCode::Char('D')]);
        assert_eq!(model.route(), &Route::Feed);
        assert_eq!(feed_titles(&model), ["A"]);

        press(&mut model, &[KeyCode::Char('g')]);
        for _ in 0..4 {
            press(&mut model, &[KeyCode::Backspace]);
        }
        type_text(&mut model, &format!("/post/{a_id}"));
        press(&mut model, &[KeyCode::Enter]);
        assert_eq!(model.route(), &Route::post(a_id.clone()));
        let screen = render(&mut model);
        assert!(screen.contains("Upvotes: 1"), "{screen}");

        press(&mut model, &[KeyCode::Char('g')]);
        for _ in 0..(a_id.len() + 6) {
            press(&mut model, &[KeyCode::Backspace]);
        }
        type_text(&mut model, "/post/does-not-exist");
        press(&mut model, &[KeyCode::Enter]);
        let screen = render(&mut model);
        assert!(screen.contains(NOT_FOUND), "{screen}");
    }

    #[test]
    fn blank_title_is_not_submitted() {
        let mut model = model();
        press(&mut model, &[KeyCode::Char('n')]);
        type_text(&mut model, "   ");
        press(
            &mut model,
            &[KeyCode::Tab, KeyCode::Tab, KeyCode::Tab, KeyCode::Tab, KeyCode::Enter],
        );
        assert!(!model.tasks.is_submitting());
        assert_eq!(model.status_message, "Title is required.");
        assert!(model.store().is_empty());
    }

    #[test]
    fn submission_lands_after_navigating_away() {
        let mut model = model();
        model.submit_delay = Duration::from_millis(30);
        press(&mut model, &[KeyCode::Char('n')]);
        type_text(&mut model, "Gardening");
        press(
            &mut model,
            &[KeyCode::Tab, KeyCode::Tab, KeyCode::Tab, KeyCode::Tab, KeyCode::Enter],
        );
        assert!(model.is_loading());
        assert!(render(&mut model).contains("Creating post"));

        model.navigate(Route::post("elsewhere"));
        settle(&mut model);
        assert_eq!(model.store().len(), 1);
        assert!(!model.is_loading());
    }

    #[test]
    fn search_filters_and_empty_state_shows() {
        let mut model = model();
        create_post(&mut model, "Knitting Basics");
        create_post(&mut model, "Chess Openings");
        press(&mut model, &[KeyCode::Char('/')]);
        type_text(&mut model, "KNIT");
        assert_eq!(feed_titles(&model), ["Knitting Basics"]);
        type_text(&mut model, "purl");
        assert!(feed_titles(&model).is_empty());
        press(&mut model, &[KeyCode::Esc]);
        assert!(render(&mut model).contains(EMPTY_FEED));
    }

    #[test]
    fn comments_append_even_when_blank() {
        let mut model = model();
        create_post(&mut model, "Baking");
        open(&mut model, "Baking");
        let id = model.current_post_id().unwrap();
        press(&mut model, &[KeyCode::Char('c')]);
        type_text(&mut model, "Looks tasty");
        press(&mut model, &[KeyCode::Enter, KeyCode::Enter]);
        assert_eq!(model.store().get(&id).unwrap().comments, ["Looks tasty", ""]);
        assert!(model.detail.comment.text.is_empty());
        assert!(render(&mut model).contains("1. Looks tasty"));
    }

    #[test]
    fn edit_save_and_cancel() {
        let mut model = model();
        create_post(&mut model, "Old");
        open(&mut model, "Old");
        let id = model.current_post_id().unwrap();

        press(&mut model, &[KeyCode::Char('e')]);
        type_text(&mut model, "er");
        press(&mut model, &[KeyCode::Esc]);
        assert_eq!(model.store().get(&id).unwrap().title, "Old");

        press(&mut model, &[KeyCode::Char('e')]);
        type_text(&mut model, "er");
        press(
            &mut model,
            &[KeyCode::Tab, KeyCode::Tab, KeyCode::Tab, KeyCode::Enter],
        );
        let post = model.store().get(&id).unwrap();
        assert_eq!(post.title, "Older");
        assert!(matches!(model.detail.mode, DetailMode::View));
    }

    #[test]
    fn upload_attaches_inline_image() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("loom.png");
        fs::write(&path, PNG_HEADER).unwrap();

        let mut model = model();
        press(&mut model, &[KeyCode::Char('n')]);
        type_text(&mut model, "Weaving");
        press(&mut model, &[KeyCode::Tab, KeyCode::Tab, KeyCode::Tab]);
        type_text(&mut model, path.to_str().unwrap());
        press(&mut model, &[KeyCode::Enter]);
        settle(&mut model);
        assert!(model.form.upload().is_some());

        press(&mut model, &[KeyCode::Tab, KeyCode::Enter]);
        settle(&mut model);
        let post = &model.store().posts()[0];
        assert!(post.has_inline_image());
        open(&mut model, "Weaving");
        assert!(render(&mut model).contains("inline image (image/png, 16 bytes)"));
    }

    #[test]
    fn titleless_completion_keeps_the_status_line() {
        let mut model = model();
        model.status_message = "Creating post…".to_string();
        model.handle_completion(Completion::Submission {
            draft: PostDraft::new("  ", "body", ""),
        });
        assert!(model.store().is_empty());
        assert_eq!(model.status_message, "Creating post…");
    }

    #[test]
    fn back_at_first_page_is_a_no_op() {
        let mut model = model();
        press(&mut model, &[KeyCode::Char('b')]);
        assert_eq!(model.route(), &Route::Feed);
        assert_eq!(model.status_message, "Already at the first page.");
    }

    #[test]
    fn unknown_address_is_refused() {
        let mut model = model();
        press(&mut model, &[KeyCode::Char('g')]);
        type_text(&mut model, "about");
        press(&mut model, &[KeyCode::Enter]);
        assert_eq!(model.route(), &Route::Feed);
        assert!(model.address_prompt.is_none());
    }

    #[test]
    fn image_labels() {
        assert_eq!(image_label("https://example.com/a/yarn%20ball.png"), "yarn ball.png");
        assert_eq!(image_label("not a url"), "image");
        assert!(image_line_text("").is_none());
    }

    #[test]
    fn pad_lines_extends_to_width() {
        let mut lines = vec![Line::from(vec![Span::raw("abc")])];
        pad_lines_to_width(&mut lines, 6);
        assert_eq!(lines[0].spans.len(), 2);
        assert_eq!(lines[0].spans[1].content.as_ref(), "   ");
    }
}
