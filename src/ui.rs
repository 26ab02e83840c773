use std::io::{self, Stdout};
use std::sync::Arc;
use std::thread;
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
use ratatui::widgets::{
    Block, Borders, Clear, List, ListItem, ListState, Padding, Paragraph, Wrap,
};
use ratatui::{Frame, Terminal};
use textwrap::{wrap, Options as WrapOptions};
use tracing::{debug, warn};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::api::ApiError;
use crate::catalog::Catalog;
use crate::data::{AccountService, FeedService, InteractionService};
use crate::feed::ChannelFeed;
use crate::home;
use crate::interactions::{
    CommentRequest, DeleteRequest, InteractionError, LikeAction, LikeRequest, PostDetail,
};
use crate::model::{Channel, Comment, Like, Post, User};
use crate::profile::ProfileView;
use crate::session::{self, FavoriteChange, SessionError};
use crate::signup::{Field, SignupError, SignupErrors, SignupForm};
use crate::title::PostTitle;

const COLOR_BG: Color = Color::Rgb(30, 30, 46);
const COLOR_PANEL_BG: Color = Color::Rgb(24, 24, 36);
const COLOR_PANEL_FOCUSED_BG: Color = Color::Rgb(49, 50, 68);
const COLOR_PANEL_SELECTED_BG: Color = Color::Rgb(69, 71, 90);
const COLOR_BORDER_IDLE: Color = Color::Rgb(49, 50, 68);
const COLOR_BORDER_FOCUSED: Color = Color::Rgb(137, 180, 250);
const COLOR_TEXT_PRIMARY: Color = Color::Rgb(205, 214, 244);
const COLOR_TEXT_SECONDARY: Color = Color::Rgb(166, 173, 200);
const COLOR_ACCENT: Color = Color::Rgb(137, 180, 250);
const COLOR_SUCCESS: Color = Color::Rgb(166, 227, 161);
const COLOR_ERROR: Color = Color::Rgb(243, 139, 168);
const COLOR_LIKE: Color = Color::Rgb(245, 194, 231);

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const POST_PRELOAD_THRESHOLD: usize = 2;
const ICON_LIKES: &str = "♥";
const ICON_COMMENTS: &str = "💬";
const ICON_FAVORITE: &str = "★";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Home,
    Channel,
    Post,
    Profile,
    Login,
    Signup,
    Compose,
}

impl Screen {
    fn title(self) -> &'static str {
        match self {
            Screen::Home => "Home",
            Screen::Channel => "Channel",
            Screen::Post => "Post",
            Screen::Profile => "Profile",
            Screen::Login => "Sign in",
            Screen::Signup => "Create account",
            Screen::Compose => "New post",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pane {
    Channels,
    Posts,
}

impl Pane {
    fn title(self) -> &'static str {
        match self {
            Pane::Channels => "Channels",
            Pane::Posts => "Latest posts",
        }
    }

    fn other(self) -> Self {
        match self {
            Pane::Channels => Pane::Posts,
            Pane::Posts => Pane::Channels,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromptKind {
    Comment,
    Rename,
}

impl PromptKind {
    fn title(self) -> &'static str {
        match self {
            PromptKind::Comment => "Write a comment",
            PromptKind::Rename => "Change display name",
        }
    }
}

struct Prompt {
    kind: PromptKind,
    value: String,
}

#[derive(Default)]
struct LoginForm {
    email: String,
    password: String,
    active: usize,
}

impl LoginForm {
    const LABELS: [&'static str; 2] = ["Email", "Password"];

    fn active_value_mut(&mut self) -> &mut String {
        if self.active == 0 {
            &mut self.email
        } else {
            &mut self.password
        }
    }
}

#[derive(Default)]
struct ComposeForm {
    channel_id: String,
    /// Set when the form edits an existing post.
    post_id: Option<String>,
    title: String,
    tag: String,
    body: String,
    active: usize,
}

impl ComposeForm {
    const LABELS: [&'static str; 3] = ["Title", "Tag", "Body"];

    fn value(&self, index: usize) -> &str {
        match index {
            0 => &self.title,
            1 => &self.tag,
            _ => &self.body,
        }
    }

    fn active_value_mut(&mut self) -> &mut String {
        match self.active {
            0 => &mut self.title,
            1 => &mut self.tag,
            _ => &mut self.body,
        }
    }

    fn editing(post: &Post) -> Self {
        let decoded = post.decoded_title();
        Self {
            channel_id: post.channel.id().to_string(),
            post_id: Some(post.id.clone()),
            title: decoded.headline().to_string(),
            tag: decoded.tag().to_string(),
            body: decoded.body().to_string(),
            active: 0,
        }
    }

    fn encoded_title(&self) -> String {
        PostTitle::new(self.title.trim(), self.tag.trim(), self.body.trim()).encode()
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

enum AsyncResponse {
    Home {
        request_id: u64,
        result: Result<Vec<Post>, ApiError>,
    },
    Channels {
        result: Result<Vec<Channel>, ApiError>,
    },
    FeedPage {
        request_id: u64,
        channel_id: String,
        result: Result<Vec<Post>, ApiError>,
    },
    Post {
        request_id: u64,
        result: Result<Post, ApiError>,
    },
    Like {
        request_id: u64,
        request: LikeRequest,
        result: Result<Like, ApiError>,
    },
    Comment {
        request: CommentRequest,
        result: Result<Comment, ApiError>,
    },
    DeleteComment {
        request: DeleteRequest,
        result: Result<Comment, ApiError>,
    },
    Profile {
        request_id: u64,
        result: Result<User, ApiError>,
    },
    Favorite {
        channel_id: String,
        result: Result<FavoriteChange, SessionError>,
    },
    Rename {
        result: Result<User, SessionError>,
    },
    Login {
        result: Result<User, SessionError>,
    },
    Logout {
        result: Result<(), SessionError>,
    },
    Signup {
        result: Result<User, SignupError>,
    },
    Compose {
        channel_id: String,
        post_id: Option<String>,
        result: Result<Post, ApiError>,
    },
}

fn succeeded(action: &str) -> String {
    format!("{action} succeeded")
}

fn failed(action: &str, err: &dyn std::fmt::Display) -> String {
    format!("{action} failed: {err}")
}

fn step_index(current: usize, delta: i32, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let next = current as i64 + delta as i64;
    next.clamp(0, len as i64 - 1) as usize
}

fn should_load_more(total: usize, selected: usize, has_more: bool, pending: bool) -> bool {
    if pending || !has_more {
        return false;
    }
    total.saturating_sub(selected.saturating_add(1)) <= POST_PRELOAD_THRESHOLD
}

fn truncate_to_width(text: &str, width: usize) -> String {
    if UnicodeWidthStr::width(text) <= width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        used += w;
        out.push(ch);
    }
    out.push('…');
    out
}

fn mask(value: &str) -> String {
    "•".repeat(value.chars().count())
}

fn wrap_plain(text: &str, width: usize, style: Style) -> Vec<Line<'static>> {
    let width = width.max(8);
    wrap(text, WrapOptions::new(width))
        .into_iter()
        .map(|segment| Line::from(Span::styled(segment.into_owned(), style)))
        .collect()
}

fn comment_lines(comment: &Comment, width: usize, deletable: bool, deleting: bool) -> Vec<Line<'static>> {
    let mut header = vec![Span::styled(
        comment.author_name().to_string(),
        Style::default()
            .fg(COLOR_ACCENT)
            .add_modifier(Modifier::BOLD),
    )];
    header.push(Span::styled(
        format!("  {}", comment.created_at.format("%Y-%m-%d %H:%M")),
        Style::default().fg(COLOR_TEXT_SECONDARY),
    ));
    if deleting {
        header.push(Span::styled("  deleting…", Style::default().fg(COLOR_ERROR)));
    } else if deletable {
        header.push(Span::styled("  [d] delete", Style::default().fg(COLOR_TEXT_SECONDARY)));
    }
    let mut lines = vec![Line::from(header)];
    lines.extend(wrap_plain(
        &comment.comment,
        width.saturating_sub(2),
        Style::default().fg(COLOR_TEXT_PRIMARY),
    ));
    lines.push(Line::default());
    lines
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let percent_x = percent_x.min(100);
    let percent_y = percent_y.min(100);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage(100 - percent_x - (100 - percent_x) / 2),
        ])
        .split(area);
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage(100 - percent_y - (100 - percent_y) / 2),
        ])
        .split(horizontal[1]);
    vertical[1]
}

fn panel_block(title: String, focused: bool) -> Block<'static> {
    let border_style = if focused {
        Style::default().fg(COLOR_BORDER_FOCUSED)
    } else {
        Style::default().fg(COLOR_BORDER_IDLE)
    };
    let title_style = if focused {
        Style::default()
            .fg(COLOR_ACCENT)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(COLOR_TEXT_SECONDARY)
    };
    Block::default()
        .title(Span::styled(title, title_style))
        .borders(Borders::ALL)
        .border_style(border_style)
        .style(Style::default().bg(COLOR_PANEL_BG))
        .padding(Padding::horizontal(1))
}

fn highlight_style() -> Style {
    Style::default()
        .fg(COLOR_TEXT_PRIMARY)
        .bg(COLOR_PANEL_SELECTED_BG)
        .add_modifier(Modifier::BOLD)
}

fn list_state(selected: usize, len: usize) -> ListState {
    let mut state = ListState::default();
    if len > 0 {
        state.select(Some(selected.min(len - 1)));
    }
    state
}

fn post_row(post: &Post, width: usize) -> ListItem<'static> {
    let title = post.decoded_title();
    let mut headline = String::new();
    if !title.tag().is_empty() {
        headline.push_str(&format!("#{} ", title.tag()));
    }
    headline.push_str(title.headline());
    let meta = format!(
        "{}  {ICON_LIKES} {}  {ICON_COMMENTS} {}  {}",
        post.author.display_name(),
        post.likes.len(),
        post.comments.len(),
        post.updated_at.format("%Y-%m-%d %H:%M"),
    );
    ListItem::new(vec![
        Line::from(Span::styled(
            truncate_to_width(&headline, width),
            Style::default().fg(COLOR_TEXT_PRIMARY),
        )),
        Line::from(Span::styled(
            truncate_to_width(&meta, width),
            Style::default().fg(COLOR_TEXT_SECONDARY),
        )),
    ])
}

pub struct Options {
    pub status_message: String,
    pub catalog: Catalog,
    pub home_channels: Vec<String>,
    pub page_size: usize,
    pub profile_recent_posts: usize,
    pub feed_service: Arc<dyn FeedService>,
    pub interaction_service: Arc<dyn InteractionService>,
    pub account_service: Arc<dyn AccountService>,
    pub session: Arc<session::Manager>,
    pub config_path: String,
    pub fetch_on_start: bool,
}

pub struct Model {
    status_message: String,
    screen: Screen,
    history: Vec<Screen>,
    focused_pane: Pane,
    catalog: Catalog,
    home_channels: Vec<String>,
    page_size: usize,
    profile_recent_posts: usize,
    home_posts: Vec<Post>,
    selected_channel: usize,
    selected_home_post: usize,
    feed: Option<ChannelFeed>,
    selected_feed_post: usize,
    detail: Option<PostDetail>,
    selected_comment: usize,
    profile: Option<ProfileView>,
    selected_profile_post: usize,
    prompt: Option<Prompt>,
    login_form: LoginForm,
    signup_form: SignupForm,
    signup_field: usize,
    signup_errors: SignupErrors,
    compose_form: ComposeForm,
    favorite_pending: Option<(String, bool)>,
    feed_service: Arc<dyn FeedService>,
    interaction_service: Arc<dyn InteractionService>,
    account_service: Arc<dyn AccountService>,
    session: Arc<session::Manager>,
    config_path: String,
    spinner: Spinner,
    needs_redraw: bool,
    response_tx: Sender<AsyncResponse>,
    response_rx: Receiver<AsyncResponse>,
    next_request_id: u64,
    pending_home: Option<u64>,
    pending_feed: Option<u64>,
    pending_post: Option<u64>,
    pending_profile: Option<u64>,
    pending_like: Option<u64>,
    auth_in_progress: bool,
    compose_in_progress: bool,
}

impl Model {
    pub fn new(opts: Options) -> Self {
        let (response_tx, response_rx) = unbounded();
        let mut model = Self {
            status_message: opts.status_message,
            screen: Screen::Home,
            history: Vec::new(),
            focused_pane: Pane::Posts,
            catalog: opts.catalog,
            home_channels: opts.home_channels,
            page_size: opts.page_size,
            profile_recent_posts: opts.profile_recent_posts,
            home_posts: Vec::new(),
            selected_channel: 0,
            selected_home_post: 0,
            feed: None,
            selected_feed_post: 0,
            detail: None,
            selected_comment: 0,
            profile: None,
            selected_profile_post: 0,
            prompt: None,
            login_form: LoginForm::default(),
            signup_form: SignupForm::default(),
            signup_field: 0,
            signup_errors: SignupErrors::default(),
            compose_form: ComposeForm::default(),
            favorite_pending: None,
            feed_service: opts.feed_service,
            interaction_service: opts.interaction_service,
            account_service: opts.account_service,
            session: opts.session,
            config_path: opts.config_path,
            spinner: Spinner::new(),
            needs_redraw: true,
            response_tx,
            response_rx,
            next_request_id: 1,
            pending_home: None,
            pending_feed: None,
            pending_post: None,
            pending_profile: None,
            pending_like: None,
            auth_in_progress: false,
            compose_in_progress: false,
        };
        if opts.fetch_on_start {
            model.reload_channels();
            model.reload_home();
        }
        model
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
                                self.status_message = format!("Error: {err}");
                            }
                        }
                        self.mark_dirty();
                    }
                } else {
                    self.mark_dirty();
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
        self.pending_home.is_some()
            || self.pending_feed.is_some()
            || self.pending_post.is_some()
            || self.pending_profile.is_some()
            || self.auth_in_progress
            || self.compose_in_progress
            || self.favorite_pending.is_some()
    }

    fn next_request(&mut self) -> u64 {
        let id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1);
        id
    }

    fn open(&mut self, screen: Screen) {
        if self.screen != screen {
            self.history.push(self.screen);
            self.screen = screen;
        }
    }

    fn back(&mut self) {
        self.prompt = None;
        self.screen = self.history.pop().unwrap_or(Screen::Home);
    }

    /// Sends signed-out users to the sign-in screen instead of letting the
    /// request go out.
    fn require_login(&mut self, action: &str) -> Option<User> {
        if let Some(user) = self.session.current_user() {
            return Some(user);
        }
        self.status_message = format!("Sign in to {action}.");
        self.login_form.active = 0;
        self.open(Screen::Login);
        None
    }

    fn poll_async(&mut self) -> bool {
        let mut changed = false;
        while let Ok(message) = self.response_rx.try_recv() {
            self.handle_async_response(message);
            changed = true;
        }
        changed
    }

    fn reload_home(&mut self) {
        let request_id = self.next_request();
        self.pending_home = Some(request_id);
        self.spinner.reset();
        let tx = self.response_tx.clone();
        let service = self.feed_service.clone();
        let channels = self.home_channels.clone();
        thread::spawn(move || {
            let result = home::load(service.as_ref(), &channels);
            let _ = tx.send(AsyncResponse::Home { request_id, result });
        });
    }

    fn reload_channels(&mut self) {
        let tx = self.response_tx.clone();
        let service = self.feed_service.clone();
        thread::spawn(move || {
            let result = service.channels();
            let _ = tx.send(AsyncResponse::Channels { result });
        });
    }

    fn open_channel(&mut self, channel_id: String) {
        self.status_message = format!("Loading {}…", self.catalog.name(&channel_id));
        self.feed = Some(ChannelFeed::new(channel_id, self.page_size));
        self.selected_feed_post = 0;
        self.pending_feed = None;
        self.open(Screen::Channel);
        self.request_feed_page();
    }

    fn request_feed_page(&mut self) {
        if self.pending_feed.is_some() {
            return;
        }
        let Some(feed) = self.feed.as_ref() else {
            return;
        };
        let Some(page) = feed.next_page() else {
            return;
        };
        let channel_id = feed.channel_id().to_string();
        let request_id = self.next_request();
        self.pending_feed = Some(request_id);
        self.spinner.reset();
        debug!(channel = %channel_id, offset = page.offset, limit = page.limit, "requesting feed page");

        let tx = self.response_tx.clone();
        let service = self.feed_service.clone();
        thread::spawn(move || {
            let result = service.channel_posts(&channel_id, Some(page));
            let _ = tx.send(AsyncResponse::FeedPage {
                request_id,
                channel_id,
                result,
            });
        });
    }

    fn maybe_request_more_posts(&mut self) {
        let Some(feed) = self.feed.as_ref() else {
            return;
        };
        if should_load_more(
            feed.posts().len(),
            self.selected_feed_post,
            feed.has_more(),
            self.pending_feed.is_some(),
        ) {
            self.request_feed_page();
        }
    }

    fn open_post(&mut self, post: Post) {
        let post_id = post.id.clone();
        self.detail = Some(PostDetail::new(post));
        self.selected_comment = 0;
        self.open(Screen::Post);
        self.refresh_post(post_id);
    }

    fn refresh_post(&mut self, post_id: String) {
        let request_id = self.next_request();
        self.pending_post = Some(request_id);
        let tx = self.response_tx.clone();
        let service = self.feed_service.clone();
        thread::spawn(move || {
            let result = service.post(&post_id);
            let _ = tx.send(AsyncResponse::Post { request_id, result });
        });
    }

    fn open_profile(&mut self, user_id: String) {
        let request_id = self.next_request();
        self.pending_profile = Some(request_id);
        self.profile = None;
        self.selected_profile_post = 0;
        self.open(Screen::Profile);
        let tx = self.response_tx.clone();
        let service = self.account_service.clone();
        thread::spawn(move || {
            let result = service.user(&user_id);
            let _ = tx.send(AsyncResponse::Profile { request_id, result });
        });
    }

    fn toggle_like(&mut self) {
        let Some(user) = self.require_login("like posts") else {
            return;
        };
        let Some(detail) = self.detail.as_mut() else {
            return;
        };
        let request = match detail.begin_like_toggle(Some(&user)) {
            Ok(request) => request,
            Err(err) => {
                self.status_message = err.to_string();
                return;
            }
        };
        let request_id = self.next_request();
        self.pending_like = Some(request_id);
        let tx = self.response_tx.clone();
        let service = self.interaction_service.clone();
        thread::spawn(move || {
            let result = request.send(service.as_ref());
            let _ = tx.send(AsyncResponse::Like {
                request_id,
                request,
                result,
            });
        });
    }

    fn begin_prompt(&mut self, kind: PromptKind) {
        let action = match kind {
            PromptKind::Comment => "comment",
            PromptKind::Rename => "change your name",
        };
        let Some(user) = self.require_login(action) else {
            return;
        };
        let value = match kind {
            PromptKind::Comment => String::new(),
            PromptKind::Rename => user.full_name,
        };
        self.prompt = Some(Prompt { kind, value });
    }

    fn submit_prompt(&mut self) {
        let Some(prompt) = self.prompt.take() else {
            return;
        };
        match prompt.kind {
            PromptKind::Comment => self.submit_comment(prompt),
            PromptKind::Rename => self.submit_rename(prompt),
        }
    }

    fn submit_comment(&mut self, prompt: Prompt) {
        let user = self.session.current_user();
        let Some(detail) = self.detail.as_ref() else {
            return;
        };
        let request = match detail.prepare_comment(user.as_ref(), &prompt.value) {
            Ok(request) => request,
            Err(err) => {
                self.status_message = err.to_string();
                if matches!(err, InteractionError::EmptyComment) {
                    self.prompt = Some(prompt);
                }
                return;
            }
        };
        let tx = self.response_tx.clone();
        let service = self.interaction_service.clone();
        self.status_message = "Posting comment…".into();
        thread::spawn(move || {
            let result = request.send(service.as_ref());
            let _ = tx.send(AsyncResponse::Comment { request, result });
        });
    }

    fn submit_rename(&mut self, prompt: Prompt) {
        let name = prompt.value.trim().to_string();
        if name.is_empty() {
            self.status_message = "A name needs at least one character.".into();
            self.prompt = Some(prompt);
            return;
        }
        let tx = self.response_tx.clone();
        let session = self.session.clone();
        thread::spawn(move || {
            let result = session.rename(&name);
            let _ = tx.send(AsyncResponse::Rename { result });
        });
    }

    fn selected_comment_id(&self) -> Option<String> {
        let detail = self.detail.as_ref()?;
        detail
            .post()
            .comment_records()
            .nth(self.selected_comment)
            .map(|comment| comment.id.clone())
    }

    fn delete_selected_comment(&mut self) {
        let Some(user) = self.require_login("delete comments") else {
            return;
        };
        let Some(comment_id) = self.selected_comment_id() else {
            return;
        };
        let Some(detail) = self.detail.as_mut() else {
            return;
        };
        let request = match detail.begin_delete_comment(Some(&user), &comment_id) {
            Ok(request) => request,
            Err(err) => {
                self.status_message = err.to_string();
                return;
            }
        };
        let tx = self.response_tx.clone();
        let service = self.interaction_service.clone();
        thread::spawn(move || {
            let result = request.send(service.as_ref());
            let _ = tx.send(AsyncResponse::DeleteComment { request, result });
        });
    }

    fn favorite_displayed(&self, channel_id: &str) -> bool {
        match &self.favorite_pending {
            Some((pending, favorited)) if pending == channel_id => *favorited,
            _ => self.session.is_favorite(channel_id),
        }
    }

    /// Flips the star right away; the response either keeps it or puts it
    /// back.
    fn toggle_favorite(&mut self, channel_id: String) {
        if self.require_login("follow channels").is_none() {
            return;
        }
        if self.favorite_pending.is_some() {
            self.status_message = "A favorite change is still running.".into();
            return;
        }
        let next = !self.session.is_favorite(&channel_id);
        self.favorite_pending = Some((channel_id.clone(), next));
        let tx = self.response_tx.clone();
        let session = self.session.clone();
        thread::spawn(move || {
            let result = session.toggle_favorite(&channel_id);
            let _ = tx.send(AsyncResponse::Favorite { channel_id, result });
        });
    }

    fn submit_login(&mut self) {
        if self.auth_in_progress {
            return;
        }
        let email = self.login_form.email.trim().to_string();
        let password = self.login_form.password.clone();
        if email.is_empty() || password.is_empty() {
            self.status_message = "Enter your email and password.".into();
            return;
        }
        self.auth_in_progress = true;
        self.status_message = "Signing in…".into();
        let tx = self.response_tx.clone();
        let session = self.session.clone();
        thread::spawn(move || {
            let result = session.login(&email, &password);
            let _ = tx.send(AsyncResponse::Login { result });
        });
    }

    fn logout(&mut self) {
        if self.auth_in_progress {
            return;
        }
        self.auth_in_progress = true;
        let tx = self.response_tx.clone();
        let session = self.session.clone();
        thread::spawn(move || {
            let result = session.logout();
            let _ = tx.send(AsyncResponse::Logout { result });
        });
    }

    fn submit_signup(&mut self) {
        if self.auth_in_progress {
            return;
        }
        let errors = self.signup_form.validate();
        if !errors.is_empty() {
            self.signup_errors = errors;
            self.status_message = "Please fix the highlighted fields.".into();
            return;
        }
        self.signup_errors = SignupErrors::default();
        self.auth_in_progress = true;
        self.status_message = "Creating account…".into();
        let form = self.signup_form.clone();
        let tx = self.response_tx.clone();
        let accounts = self.account_service.clone();
        thread::spawn(move || {
            let result = form.submit(accounts.as_ref());
            let _ = tx.send(AsyncResponse::Signup { result });
        });
    }

    fn start_compose(&mut self) {
        if self.require_login("write posts").is_none() {
            return;
        }
        let Some(feed) = self.feed.as_ref() else {
            return;
        };
        self.compose_form = ComposeForm {
            channel_id: feed.channel_id().to_string(),
            ..ComposeForm::default()
        };
        self.open(Screen::Compose);
    }

    fn start_edit(&mut self) {
        let Some(user) = self.require_login("edit posts") else {
            return;
        };
        let Some(detail) = self.detail.as_ref() else {
            return;
        };
        if !detail.is_own_post(Some(&user)) {
            self.status_message = "Only the author can edit this post.".into();
            return;
        }
        self.compose_form = ComposeForm::editing(detail.post());
        self.open(Screen::Compose);
    }

    fn submit_compose(&mut self) {
        if self.compose_in_progress {
            return;
        }
        if self.require_login("write posts").is_none() {
            return;
        }
        if self.compose_form.title.trim().is_empty() {
            self.status_message = "A post needs a title.".into();
            self.compose_form.active = 0;
            return;
        }
        self.compose_in_progress = true;
        let channel_id = self.compose_form.channel_id.clone();
        let post_id = self.compose_form.post_id.clone();
        let title = self.compose_form.encoded_title();
        let tx = self.response_tx.clone();
        let service = self.feed_service.clone();
        thread::spawn(move || {
            let result = match &post_id {
                Some(post_id) => service.update_post(post_id, &channel_id, &title),
                None => service.create_post(&channel_id, &title),
            };
            let _ = tx.send(AsyncResponse::Compose {
                channel_id,
                post_id,
                result,
            });
        });
    }

    fn handle_async_response(&mut self, message: AsyncResponse) {
        match message {
            AsyncResponse::Home { request_id, result } => {
                if self.pending_home != Some(request_id) {
                    return;
                }
                self.pending_home = None;
                match result {
                    Ok(posts) => {
                        self.home_posts = posts;
                        self.selected_home_post = self
                            .selected_home_post
                            .min(self.home_posts.len().saturating_sub(1));
                    }
                    Err(err) => self.status_message = failed("Loading home", &err),
                }
            }
            AsyncResponse::Channels { result } => match result {
                Ok(channels) => self.catalog.merge_remote(&channels),
                Err(err) => warn!(error = %err, "channel list unavailable"),
            },
            AsyncResponse::FeedPage {
                request_id,
                channel_id,
                result,
            } => {
                if self.pending_feed != Some(request_id) {
                    return;
                }
                self.pending_feed = None;
                let Some(feed) = self.feed.as_mut() else {
                    return;
                };
                if feed.channel_id() != channel_id {
                    return;
                }
                match result {
                    Ok(posts) => {
                        let received = posts.len();
                        feed.apply_page(posts);
                        self.status_message = if feed.has_more() {
                            format!("{} · {} posts", self.catalog.name(&channel_id), feed.posts().len())
                        } else {
                            format!("{} · all {} posts loaded", self.catalog.name(&channel_id), feed.posts().len())
                        };
                        debug!(channel = %channel_id, received, "feed page applied");
                    }
                    Err(err) => self.status_message = failed("Loading posts", &err),
                }
            }
            AsyncResponse::Post { request_id, result } => {
                if self.pending_post != Some(request_id) {
                    return;
                }
                self.pending_post = None;
                match result {
                    Ok(post) => {
                        match self.detail.as_mut() {
                            // A refresh must not clobber an in-flight toggle.
                            Some(detail) if detail.post().id == post.id => {
                                if !detail.is_busy() {
                                    detail.replace_post(post.clone());
                                }
                            }
                            Some(_) => {}
                            None => self.detail = Some(PostDetail::new(post.clone())),
                        }
                        if let Some(feed) = self.feed.as_mut() {
                            feed.replace_post(&post);
                        }
                    }
                    Err(err) => self.status_message = failed("Loading post", &err),
                }
            }
            AsyncResponse::Like {
                request_id,
                request,
                result,
            } => self.apply_like_result(request_id, request, result),
            AsyncResponse::Comment { request, result } => match result {
                Ok(comment) => {
                    if let Some(detail) = self.detail.as_mut().filter(|d| d.post().id == request.post_id) {
                        detail.apply_comment(comment);
                        if let Some(feed) = self.feed.as_mut() {
                            feed.replace_post(detail.post());
                        }
                    }
                    self.status_message = succeeded("Comment");
                }
                Err(err) => self.status_message = failed("Comment", &err),
            },
            AsyncResponse::DeleteComment { request, result } => {
                let detail = self.detail.as_mut().filter(|d| d.post().id == request.post_id);
                match (detail, result) {
                    (Some(detail), Ok(_)) => {
                        detail.confirm_delete_comment(&request.comment_id);
                        let remaining = detail.post().comment_records().count();
                        self.selected_comment = self.selected_comment.min(remaining.saturating_sub(1));
                        if let Some(feed) = self.feed.as_mut() {
                            feed.replace_post(detail.post());
                        }
                        self.status_message = succeeded("Delete comment");
                    }
                    (None, Ok(_)) => self.status_message = succeeded("Delete comment"),
                    (detail, Err(err)) => {
                        if let Some(detail) = detail {
                            detail.fail_delete_comment(&request.comment_id);
                        }
                        self.status_message = failed("Delete comment", &err);
                    }
                }
            }
            AsyncResponse::Profile { request_id, result } => {
                if self.pending_profile != Some(request_id) {
                    return;
                }
                self.pending_profile = None;
                match result {
                    Ok(user) => {
                        let viewer = self.session.current_user();
                        self.profile = Some(ProfileView::build(
                            &user,
                            viewer.as_ref(),
                            &self.catalog,
                            self.profile_recent_posts,
                        ));
                    }
                    Err(err) => self.status_message = failed("Loading profile", &err),
                }
            }
            AsyncResponse::Favorite { channel_id, result } => {
                self.favorite_pending = None;
                let name = self.catalog.name(&channel_id).to_string();
                match result {
                    Ok(change) if change.favorited => {
                        self.status_message = succeeded(&format!("Adding {name} to favorites"));
                    }
                    Ok(_) => {
                        self.status_message = succeeded(&format!("Removing {name} from favorites"));
                    }
                    Err(err) => self.status_message = failed("Favorite", &err),
                }
            }
            AsyncResponse::Rename { result } => match result {
                Ok(user) => {
                    if self.profile.as_ref().is_some_and(|view| view.is_me) {
                        self.profile = Some(ProfileView::build(
                            &user,
                            Some(&user),
                            &self.catalog,
                            self.profile_recent_posts,
                        ));
                    }
                    self.status_message = succeeded("Rename");
                }
                Err(err) => self.status_message = failed("Rename", &err),
            },
            AsyncResponse::Login { result } => {
                self.auth_in_progress = false;
                match result {
                    Ok(user) => {
                        self.login_form.password.clear();
                        self.status_message =
                            format!("{} Welcome, {}.", succeeded("Login"), user.display_name());
                        if self.screen == Screen::Login {
                            self.back();
                        }
                    }
                    Err(err) => self.status_message = failed("Login", &err),
                }
            }
            AsyncResponse::Logout { result } => {
                self.auth_in_progress = false;
                match result {
                    Ok(()) => {
                        self.status_message = succeeded("Logout");
                        if self.screen == Screen::Profile
                            && self.profile.as_ref().is_some_and(|view| view.is_me)
                        {
                            self.back();
                        }
                    }
                    Err(err) => self.status_message = failed("Logout", &err),
                }
            }
            AsyncResponse::Signup { result } => {
                self.auth_in_progress = false;
                match result {
                    Ok(user) => {
                        self.login_form = LoginForm {
                            email: user.email.clone(),
                            password: String::new(),
                            active: 1,
                        };
                        self.signup_form = SignupForm::default();
                        self.status_message = format!("{} Sign in to continue.", succeeded("Signup"));
                        self.screen = Screen::Login;
                    }
                    Err(SignupError::Invalid(errors)) => {
                        self.signup_errors = errors;
                        self.status_message = "Please fix the highlighted fields.".into();
                    }
                    Err(err) => self.status_message = failed("Signup", &err),
                }
            }
            AsyncResponse::Compose {
                channel_id,
                post_id: Some(post_id),
                result,
            } => {
                self.compose_in_progress = false;
                match result {
                    Ok(_) => {
                        self.status_message = succeeded("Edit");
                        if self.screen == Screen::Compose {
                            self.back();
                        }
                        self.compose_form = ComposeForm::default();
                        debug!(post = %post_id, channel = %channel_id, "post updated");
                        self.refresh_post(post_id);
                    }
                    Err(err) => self.status_message = failed("Edit", &err),
                }
            }
            AsyncResponse::Compose {
                channel_id,
                post_id: None,
                result,
            } => {
                self.compose_in_progress = false;
                match result {
                    Ok(post) => {
                        self.status_message = succeeded("Post");
                        if self.screen == Screen::Compose {
                            self.back();
                        }
                        let reload = self
                            .feed
                            .as_ref()
                            .is_some_and(|feed| feed.channel_id() == channel_id);
                        if reload {
                            self.feed = Some(ChannelFeed::new(channel_id, self.page_size));
                            self.selected_feed_post = 0;
                            self.pending_feed = None;
                            self.request_feed_page();
                        }
                        debug!(post = %post.id, "post created");
                    }
                    Err(err) => self.status_message = failed("Post", &err),
                }
            }
        }
    }

    /// Settles a like request. The detail that started it may have been
    /// rebuilt in the meantime (the post was closed and reopened); then the
    /// backend's answer is merged into whatever copy is on screen.
    fn apply_like_result(&mut self, request_id: u64, request: LikeRequest, result: Result<Like, ApiError>) {
        let label = request.label();
        let started_here = self.pending_like == Some(request_id);
        if started_here {
            self.pending_like = None;
        }
        let detail = self
            .detail
            .as_mut()
            .filter(|d| d.post().id == request.post_id);
        match (detail, result) {
            (Some(detail), Ok(like)) if started_here && detail.has_pending_like() => {
                if let Err(err) = detail.confirm_like_toggle(like) {
                    self.status_message = failed(label, &err);
                    return;
                }
                if let Some(feed) = self.feed.as_mut() {
                    feed.replace_post(detail.post());
                }
                self.status_message = succeeded(label);
            }
            (Some(detail), Err(err)) if started_here && detail.has_pending_like() => {
                detail.fail_like_toggle();
                self.status_message = failed(label, &err);
            }
            (detail, Ok(like)) => {
                match &request.action {
                    LikeAction::Like => {
                        if let Some(detail) = detail {
                            detail.merge_like(like.clone());
                        }
                        if let Some(feed) = self.feed.as_mut() {
                            feed.record_like(&request.post_id, like);
                        }
                    }
                    LikeAction::Unlike { like_id } => {
                        if let Some(detail) = detail {
                            detail.forget_like(like_id);
                        }
                        if let Some(feed) = self.feed.as_mut() {
                            feed.drop_like(&request.post_id, &request.actor_id);
                        }
                    }
                }
                debug!(post = %request.post_id, "like settled after the view changed");
                self.status_message = succeeded(label);
            }
            (_, Err(err)) => self.status_message = failed(label, &err),
        }
    }

    fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        if self.prompt.is_some() {
            self.handle_prompt_key(code);
            return Ok(false);
        }
        match self.screen {
            Screen::Login => {
                self.handle_login_key(code);
                return Ok(false);
            }
            Screen::Signup => {
                self.handle_signup_key(code);
                return Ok(false);
            }
            Screen::Compose => {
                self.handle_compose_key(code);
                return Ok(false);
            }
            _ => {}
        }

        match code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Esc | KeyCode::Backspace => self.back(),
            KeyCode::Char('j') | KeyCode::Down => self.navigate(1),
            KeyCode::Char('k') | KeyCode::Up => self.navigate(-1),
            KeyCode::Enter => self.activate(),
            KeyCode::Char('r') => self.refresh(),
            KeyCode::Char('p') => {
                if let Some(user) = self.require_login("view your profile") {
                    self.open_profile(user.id);
                }
            }
            KeyCode::Char('L') => {
                if self.session.is_logged_in() {
                    self.logout();
                } else {
                    self.open(Screen::Login);
                }
            }
            KeyCode::Char('S') => {
                self.signup_field = 0;
                self.signup_errors = SignupErrors::default();
                self.open(Screen::Signup);
            }
            other => self.handle_screen_key(other),
        }
        Ok(false)
    }

    fn handle_screen_key(&mut self, code: KeyCode) {
        match (self.screen, code) {
            (Screen::Home, KeyCode::Tab | KeyCode::Char('h' | 'l') | KeyCode::Left | KeyCode::Right) => {
                self.focused_pane = self.focused_pane.other();
            }
            (Screen::Channel, KeyCode::Char('s')) => {
                if let Some(feed) = self.feed.as_mut() {
                    let mode = feed.sort().toggled();
                    feed.set_sort(mode);
                    self.selected_feed_post = 0;
                    self.status_message = format!("Sorted by {}", mode.label());
                }
            }
            (Screen::Channel, KeyCode::Char('f')) => {
                if let Some(channel_id) = self.feed.as_ref().map(|feed| feed.channel_id().to_string()) {
                    self.toggle_favorite(channel_id);
                }
            }
            (Screen::Home, KeyCode::Char('f')) => {
                if let Some(entry) = self.catalog.entries().get(self.selected_channel) {
                    let channel_id = entry.id.clone();
                    self.toggle_favorite(channel_id);
                }
            }
            (Screen::Channel, KeyCode::Char('n')) => self.start_compose(),
            (Screen::Post, KeyCode::Char('l')) => self.toggle_like(),
            (Screen::Post, KeyCode::Char('c')) => self.begin_prompt(PromptKind::Comment),
            (Screen::Post, KeyCode::Char('d')) => self.delete_selected_comment(),
            (Screen::Post, KeyCode::Char('e')) => self.start_edit(),
            (Screen::Post, KeyCode::Char('a')) => {
                if let Some(author) = self.detail.as_ref().map(|d| d.post().author.id.clone()) {
                    self.open_profile(author);
                }
            }
            (Screen::Profile, KeyCode::Char('e')) => {
                if self.profile.as_ref().is_some_and(|view| view.is_me) {
                    self.begin_prompt(PromptKind::Rename);
                }
            }
            _ => {}
        }
    }

    fn navigate(&mut self, delta: i32) {
        match self.screen {
            Screen::Home => match self.focused_pane {
                Pane::Channels => {
                    let len = self.catalog.entries().len();
                    self.selected_channel = step_index(self.selected_channel, delta, len);
                }
                Pane::Posts => {
                    let len = self.home_posts.len();
                    self.selected_home_post = step_index(self.selected_home_post, delta, len);
                }
            },
            Screen::Channel => {
                let len = self.feed.as_ref().map_or(0, |feed| feed.posts().len());
                self.selected_feed_post = step_index(self.selected_feed_post, delta, len);
                self.maybe_request_more_posts();
            }
            Screen::Post => {
                let len = self
                    .detail
                    .as_ref()
                    .map_or(0, |detail| detail.post().comment_records().count());
                self.selected_comment = step_index(self.selected_comment, delta, len);
            }
            Screen::Profile => {
                let len = self.profile.as_ref().map_or(0, |view| view.recent_posts.len());
                self.selected_profile_post = step_index(self.selected_profile_post, delta, len);
            }
            _ => {}
        }
    }

    fn activate(&mut self) {
        match self.screen {
            Screen::Home => match self.focused_pane {
                Pane::Channels => {
                    if let Some(entry) = self.catalog.entries().get(self.selected_channel) {
                        let channel_id = entry.id.clone();
                        self.open_channel(channel_id);
                    }
                }
                Pane::Posts => {
                    if let Some(post) = self.home_posts.get(self.selected_home_post).cloned() {
                        self.open_post(post);
                    }
                }
            },
            Screen::Channel => {
                let post = self
                    .feed
                    .as_ref()
                    .and_then(|feed| feed.posts().get(self.selected_feed_post).cloned());
                if let Some(post) = post {
                    self.open_post(post);
                }
            }
            Screen::Profile => {
                let post_id = self
                    .profile
                    .as_ref()
                    .and_then(|view| view.recent_posts.get(self.selected_profile_post))
                    .map(|row| row.post_id.clone());
                if let Some(post_id) = post_id {
                    self.detail = None;
                    self.selected_comment = 0;
                    self.open(Screen::Post);
                    self.refresh_post(post_id.clone());
                    self.status_message = format!("Loading post {post_id}…");
                }
            }
            _ => {}
        }
    }

    fn refresh(&mut self) {
        match self.screen {
            Screen::Home => {
                self.reload_channels();
                self.reload_home();
            }
            Screen::Channel => {
                if let Some(channel_id) = self.feed.as_ref().map(|feed| feed.channel_id().to_string()) {
                    self.feed = Some(ChannelFeed::new(channel_id, self.page_size));
                    self.selected_feed_post = 0;
                    self.pending_feed = None;
                    self.request_feed_page();
                }
            }
            Screen::Post => {
                if let Some(post_id) = self.detail.as_ref().map(|d| d.post().id.clone()) {
                    self.refresh_post(post_id);
                }
            }
            Screen::Profile => {
                if let Some(user_id) = self.profile.as_ref().map(|view| view.user_id.clone()) {
                    self.open_profile(user_id);
                }
            }
            _ => {}
        }
    }

    fn handle_prompt_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => self.prompt = None,
            KeyCode::Enter => self.submit_prompt(),
            KeyCode::Backspace => {
                if let Some(prompt) = self.prompt.as_mut() {
                    prompt.value.pop();
                }
            }
            KeyCode::Char(ch) => {
                if let Some(prompt) = self.prompt.as_mut() {
                    prompt.value.push(ch);
                }
            }
            _ => {}
        }
    }

    fn handle_login_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => self.back(),
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Down | KeyCode::Up => {
                self.login_form.active = (self.login_form.active + 1) % 2;
            }
            KeyCode::Enter if self.login_form.active == 0 => self.login_form.active = 1,
            KeyCode::Enter => self.submit_login(),
            KeyCode::Backspace => {
                self.login_form.active_value_mut().pop();
            }
            KeyCode::Char(ch) => self.login_form.active_value_mut().push(ch),
            _ => {}
        }
    }

    fn handle_signup_key(&mut self, code: KeyCode) {
        let last = Field::ALL.len() - 1;
        let field = Field::ALL[self.signup_field.min(last)];
        match code {
            KeyCode::Esc => self.back(),
            KeyCode::Tab | KeyCode::Down => self.signup_field = (self.signup_field + 1) % Field::ALL.len(),
            KeyCode::BackTab | KeyCode::Up => {
                self.signup_field = (self.signup_field + last) % Field::ALL.len();
            }
            KeyCode::Enter if self.signup_field < last => self.signup_field += 1,
            KeyCode::Enter => self.submit_signup(),
            KeyCode::Backspace => self.signup_form.pop(field),
            KeyCode::Char(ch) => self.signup_form.push(field, ch),
            _ => {}
        }
    }

    fn handle_compose_key(&mut self, code: KeyCode) {
        let count = ComposeForm::LABELS.len();
        match code {
            KeyCode::Esc => self.back(),
            KeyCode::Tab | KeyCode::Down => self.compose_form.active = (self.compose_form.active + 1) % count,
            KeyCode::BackTab | KeyCode::Up => {
                self.compose_form.active = (self.compose_form.active + count - 1) % count;
            }
            KeyCode::Enter if self.compose_form.active + 1 < count => self.compose_form.active += 1,
            KeyCode::Enter => self.submit_compose(),
            KeyCode::Backspace => {
                self.compose_form.active_value_mut().pop();
            }
            KeyCode::Char(ch) => self.compose_form.active_value_mut().push(ch),
            _ => {}
        }
    }

    fn footer_text(&self) -> String {
        if self.prompt.is_some() {
            return "Enter submit · Esc cancel".into();
        }
        let account = if self.session.is_logged_in() {
            "L sign out"
        } else {
            "L sign in · S sign up"
        };
        let keys = match self.screen {
            Screen::Home => "j/k move · Tab switch pane · Enter open · f favorite · r refresh",
            Screen::Channel => "j/k move · Enter open · s sort · f favorite · n new post · r refresh · Esc back",
            Screen::Post => "j/k comments · l like · c comment · d delete · e edit · a author · Esc back",
            Screen::Profile => "j/k move · Enter open · e rename · Esc back",
            Screen::Login | Screen::Signup | Screen::Compose => {
                return "Tab next field · Enter continue · Esc back".into();
            }
        };
        format!("{keys} · p profile · {account} · q quit  ({})", self.config_path)
    }

    fn draw(&mut self, frame: &mut Frame<'_>) {
        let full = frame.size();
        frame.render_widget(Block::default().style(Style::default().bg(COLOR_BG)), full);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(full);

        let user = self
            .session
            .current_user()
            .map(|user| format!("  [{}]", user.display_name()))
            .unwrap_or_default();
        let status_text = if self.is_loading() {
            format!("{} {}{}", self.spinner.frame(), self.status_message, user)
        } else {
            format!("{}{}", self.status_message, user)
        };
        let status_color = if self.status_message.contains(" failed") {
            COLOR_ERROR
        } else if self.status_message.contains(" succeeded") {
            COLOR_SUCCESS
        } else {
            COLOR_TEXT_PRIMARY
        };
        let status_line = Paragraph::new(status_text.trim().to_string()).style(
            Style::default()
                .fg(status_color)
                .bg(COLOR_PANEL_FOCUSED_BG)
                .add_modifier(Modifier::BOLD),
        );
        frame.render_widget(status_line, layout[0]);

        match self.screen {
            Screen::Home => self.draw_home(frame, layout[1]),
            Screen::Channel => self.draw_channel(frame, layout[1]),
            Screen::Post => self.draw_post(frame, layout[1]),
            Screen::Profile => self.draw_profile(frame, layout[1]),
            Screen::Login => self.draw_login(frame, layout[1]),
            Screen::Signup => self.draw_signup(frame, layout[1]),
            Screen::Compose => self.draw_compose(frame, layout[1]),
        }

        let footer = Paragraph::new(self.footer_text())
            .style(
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .bg(COLOR_PANEL_BG)
                    .add_modifier(Modifier::ITALIC),
            )
            .alignment(Alignment::Center);
        frame.render_widget(footer, layout[2]);

        if let Some(prompt) = &self.prompt {
            draw_prompt(frame, layout[1], prompt);
        }
    }

    fn draw_home(&self, frame: &mut Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
            .split(area);

        let channels: Vec<ListItem> = self
            .catalog
            .entries()
            .iter()
            .map(|entry| {
                let star = if self.favorite_displayed(&entry.id) {
                    Span::styled(format!("{ICON_FAVORITE} "), Style::default().fg(COLOR_LIKE))
                } else {
                    Span::raw("  ")
                };
                ListItem::new(Line::from(vec![
                    star,
                    Span::styled(
                        format!("[{}] ", self.catalog.badge(&entry.id)),
                        Style::default().fg(COLOR_ACCENT),
                    ),
                    Span::styled(entry.name.clone(), Style::default().fg(COLOR_TEXT_PRIMARY)),
                ]))
            })
            .collect();
        let len = channels.len();
        let list = List::new(channels)
            .block(panel_block(
                Pane::Channels.title().to_string(),
                self.focused_pane == Pane::Channels,
            ))
            .highlight_style(highlight_style())
            .highlight_symbol("▶ ");
        let mut state = list_state(self.selected_channel, len);
        frame.render_stateful_widget(list, chunks[0], &mut state);

        let block = panel_block(Pane::Posts.title().to_string(), self.focused_pane == Pane::Posts);
        let width = block.inner(chunks[1]).width.saturating_sub(2) as usize;
        if self.home_posts.is_empty() {
            let text = if self.pending_home.is_some() {
                "Loading latest posts…"
            } else {
                "No posts yet."
            };
            let empty = Paragraph::new(text)
                .style(Style::default().fg(COLOR_TEXT_SECONDARY))
                .block(block);
            frame.render_widget(empty, chunks[1]);
            return;
        }
        let rows = home::rows(&self.home_posts, &self.catalog);
        let items: Vec<ListItem> = rows
            .iter()
            .map(|row| {
                ListItem::new(vec![
                    Line::from(vec![
                        Span::styled(
                            format!("{} · ", row.channel_name),
                            Style::default().fg(COLOR_ACCENT),
                        ),
                        Span::styled(
                            truncate_to_width(&row.headline, width.saturating_sub(row.channel_name.width() + 3)),
                            Style::default().fg(COLOR_TEXT_PRIMARY),
                        ),
                    ]),
                    Line::from(Span::styled(
                        format!(
                            "{ICON_COMMENTS} {}  {}",
                            row.comment_count,
                            row.updated_at.format("%Y-%m-%d %H:%M")
                        ),
                        Style::default().fg(COLOR_TEXT_SECONDARY),
                    )),
                ])
            })
            .collect();
        let list = List::new(items)
            .block(block)
            .highlight_style(highlight_style())
            .highlight_symbol("▶ ");
        let mut state = list_state(self.selected_home_post, rows.len());
        frame.render_stateful_widget(list, chunks[1], &mut state);
    }

    fn draw_channel(&self, frame: &mut Frame<'_>, area: Rect) {
        let Some(feed) = self.feed.as_ref() else {
            return;
        };
        let channel_id = feed.channel_id();
        let star = if self.favorite_displayed(channel_id) {
            format!(" {ICON_FAVORITE}")
        } else {
            String::new()
        };
        let title = format!(
            "{}{} · {}{}",
            self.catalog.name(channel_id),
            star,
            feed.sort().label(),
            if feed.has_more() { "" } else { " · end" }
        );
        let block = panel_block(title, true);
        let width = block.inner(area).width.saturating_sub(2) as usize;
        let items: Vec<ListItem> = feed
            .posts()
            .iter()
            .map(|post| post_row(post, width))
            .collect();
        if items.is_empty() {
            let text = if self.pending_feed.is_some() {
                "Loading posts…"
            } else {
                "No posts in this channel yet. Press n to write one."
            };
            frame.render_widget(
                Paragraph::new(text)
                    .style(Style::default().fg(COLOR_TEXT_SECONDARY))
                    .block(block),
                area,
            );
            return;
        }
        let len = items.len();
        let list = List::new(items)
            .block(block)
            .highlight_style(highlight_style())
            .highlight_symbol("▶ ");
        let mut state = list_state(self.selected_feed_post, len);
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_post(&self, frame: &mut Frame<'_>, area: Rect) {
        let Some(detail) = self.detail.as_ref() else {
            frame.render_widget(
                Paragraph::new("Loading post…")
                    .style(Style::default().fg(COLOR_TEXT_SECONDARY))
                    .block(panel_block(Screen::Post.title().to_string(), true)),
                area,
            );
            return;
        };
        let post = detail.post();
        let title = post.decoded_title();
        let actor = self.session.current_user();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(area);

        let block = panel_block(self.catalog.name(post.channel.id()).to_string(), false);
        let width = block.inner(chunks[0]).width as usize;
        let mut lines = vec![Line::from(Span::styled(
            title.headline().to_string(),
            Style::default()
                .fg(COLOR_TEXT_PRIMARY)
                .add_modifier(Modifier::BOLD),
        ))];
        let liked = detail.liked_by(actor.as_ref());
        let like_style = if liked {
            Style::default().fg(COLOR_LIKE).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(COLOR_TEXT_SECONDARY)
        };
        let mut meta = vec![
            Span::styled(
                post.author.display_name().to_string(),
                Style::default().fg(COLOR_ACCENT),
            ),
            Span::raw("  "),
            Span::styled(format!("{ICON_LIKES} {}", post.likes.len()), like_style),
            Span::styled(
                format!("  {ICON_COMMENTS} {}", post.comments.len()),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            ),
        ];
        if !title.tag().is_empty() {
            meta.push(Span::styled(
                format!("  #{}", title.tag()),
                Style::default().fg(COLOR_ACCENT),
            ));
        }
        if detail.is_busy() {
            meta.push(Span::styled("  saving…", Style::default().fg(COLOR_TEXT_SECONDARY)));
        }
        lines.push(Line::from(meta));
        lines.push(Line::default());
        lines.extend(wrap_plain(
            title.body(),
            width,
            Style::default().fg(COLOR_TEXT_PRIMARY),
        ));
        frame.render_widget(
            Paragraph::new(Text::from(lines))
                .block(block)
                .wrap(Wrap { trim: false }),
            chunks[0],
        );

        let comments_block = panel_block(format!("Comments ({})", post.comments.len()), true);
        let width = comments_block.inner(chunks[1]).width as usize;
        let items: Vec<ListItem> = post
            .comment_records()
            .map(|comment| {
                let deleting = detail.is_deleting(&comment.id);
                ListItem::new(comment_lines(
                    comment,
                    width,
                    detail.can_delete(actor.as_ref(), comment),
                    deleting,
                ))
            })
            .collect();
        let len = items.len();
        let list = List::new(items)
            .block(comments_block)
            .highlight_style(Style::default().bg(COLOR_PANEL_SELECTED_BG))
            .highlight_symbol("▌");
        let mut state = list_state(self.selected_comment, len);
        frame.render_stateful_widget(list, chunks[1], &mut state);
    }

    fn draw_profile(&self, frame: &mut Frame<'_>, area: Rect) {
        let Some(view) = self.profile.as_ref() else {
            frame.render_widget(
                Paragraph::new("Loading profile…")
                    .style(Style::default().fg(COLOR_TEXT_SECONDARY))
                    .block(panel_block(Screen::Profile.title().to_string(), true)),
                area,
            );
            return;
        };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(7), Constraint::Min(0)])
            .split(area);

        let online = if view.is_online {
            Span::styled("● online", Style::default().fg(COLOR_SUCCESS))
        } else {
            Span::styled("○ offline", Style::default().fg(COLOR_TEXT_SECONDARY))
        };
        let favorites = if view.favorites.is_empty() {
            "none".to_string()
        } else {
            view.favorites
                .iter()
                .map(|row| format!("[{}] {}", row.badge, row.name))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let lines = vec![
            Line::from(vec![
                Span::styled(
                    view.display_name.clone(),
                    Style::default()
                        .fg(COLOR_TEXT_PRIMARY)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw("  "),
                online,
            ]),
            Line::from(Span::styled(
                format!(
                    "{} posts · {} comments · {} likes",
                    view.post_count, view.comment_count, view.like_count
                ),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            )),
            Line::from(vec![
                Span::styled(format!("{ICON_FAVORITE} "), Style::default().fg(COLOR_LIKE)),
                Span::styled(favorites, Style::default().fg(COLOR_TEXT_PRIMARY)),
            ]),
        ];
        let title = if view.is_me { "My profile" } else { "Profile" };
        frame.render_widget(
            Paragraph::new(Text::from(lines))
                .block(panel_block(title.to_string(), false))
                .wrap(Wrap { trim: true }),
            chunks[0],
        );

        let block = panel_block("Recent posts".to_string(), true);
        let width = block.inner(chunks[1]).width.saturating_sub(2) as usize;
        let items: Vec<ListItem> = view
            .recent_posts
            .iter()
            .map(|row| {
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{} · ", row.channel_name), Style::default().fg(COLOR_ACCENT)),
                    Span::styled(
                        truncate_to_width(&row.headline, width.saturating_sub(row.channel_name.width() + 10)),
                        Style::default().fg(COLOR_TEXT_PRIMARY),
                    ),
                    Span::styled(
                        format!("  {ICON_COMMENTS} {}", row.comment_count),
                        Style::default().fg(COLOR_TEXT_SECONDARY),
                    ),
                ]))
            })
            .collect();
        let len = items.len();
        let list = List::new(items)
            .block(block)
            .highlight_style(highlight_style())
            .highlight_symbol("▶ ");
        let mut state = list_state(self.selected_profile_post, len);
        frame.render_stateful_widget(list, chunks[1], &mut state);
    }

    fn draw_login(&self, frame: &mut Frame<'_>, area: Rect) {
        let fields = [
            (LoginForm::LABELS[0], self.login_form.email.clone(), None),
            (LoginForm::LABELS[1], mask(&self.login_form.password), None),
        ];
        draw_form(frame, area, Screen::Login.title(), &fields, self.login_form.active);
    }

    fn draw_signup(&self, frame: &mut Frame<'_>, area: Rect) {
        let fields: Vec<(&str, String, Option<&str>)> = Field::ALL
            .iter()
            .map(|&field| {
                let value = self.signup_form.value(field);
                let shown = if field.is_secret() {
                    mask(value)
                } else {
                    value.to_string()
                };
                (field.label(), shown, self.signup_errors.get(field))
            })
            .collect();
        draw_form(frame, area, Screen::Signup.title(), &fields, self.signup_field);
    }

    fn draw_compose(&self, frame: &mut Frame<'_>, area: Rect) {
        let fields: Vec<(&str, String, Option<&str>)> = ComposeForm::LABELS
            .iter()
            .enumerate()
            .map(|(index, label)| (*label, self.compose_form.value(index).to_string(), None))
            .collect();
        let heading = if self.compose_form.post_id.is_some() {
            "Edit post"
        } else {
            Screen::Compose.title()
        };
        let title = format!(
            "{} · {}",
            heading,
            self.catalog.name(&self.compose_form.channel_id)
        );
        draw_form(frame, area, &title, &fields, self.compose_form.active);
    }
}

fn draw_form(
    frame: &mut Frame<'_>,
    area: Rect,
    title: &str,
    fields: &[(&str, String, Option<&str>)],
    active: usize,
) {
    let popup = centered_rect(60, 70, area);
    frame.render_widget(Clear, popup);
    let mut lines = Vec::new();
    for (index, (label, value, error)) in fields.iter().enumerate() {
        let is_active = index == active;
        let label_style = if is_active {
            Style::default()
                .fg(COLOR_ACCENT)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(COLOR_TEXT_SECONDARY)
        };
        lines.push(Line::from(vec![
            Span::styled(if is_active { "> " } else { "  " }, label_style),
            Span::styled(format!("{label}: "), label_style),
            Span::styled(
                format!("{value}{}", if is_active { "▏" } else { "" }),
                Style::default().fg(COLOR_TEXT_PRIMARY),
            ),
        ]));
        if let Some(error) = error {
            lines.push(Line::from(Span::styled(
                format!("    {error}"),
                Style::default().fg(COLOR_ERROR),
            )));
        }
        lines.push(Line::default());
    }
    let form = Paragraph::new(Text::from(lines))
        .block(
            Block::default()
                .title(Span::styled(
                    title.to_string(),
                    Style::default()
                        .fg(COLOR_ACCENT)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(COLOR_ACCENT))
                .style(Style::default().bg(COLOR_PANEL_BG))
                .padding(Padding::uniform(1)),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(form, popup);
}

fn draw_prompt(frame: &mut Frame<'_>, area: Rect, prompt: &Prompt) {
    let popup = centered_rect(70, 30, area);
    frame.render_widget(Clear, popup);
    let input = Paragraph::new(format!("{}▏", prompt.value))
        .style(Style::default().fg(COLOR_TEXT_PRIMARY))
        .block(
            Block::default()
                .title(Span::styled(
                    prompt.kind.title(),
                    Style::default()
                        .fg(COLOR_ACCENT)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(COLOR_ACCENT))
                .style(Style::default().bg(COLOR_PANEL_BG))
                .padding(Padding::uniform(1)),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(input, popup);
}
