//! Terminal chat client.
//!
//! Run with: cargo run -p chat-tui -- --nick Ana
//!
//! Type a message and press Enter to send it. Commands: `/connect [nick]`,
//! `/disconnect`, `/join <room>`, `/nick <name>`, `/ping`, `/quit`.
//! F1-F5 join the quick rooms.

use std::{
    fs::File,
    io,
    path::PathBuf,
    sync::Mutex,
    time::{Duration, Instant},
};

use anyhow::Context;
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use tracing_subscriber::EnvFilter;
use wschat_core::{ConnectionStatus, EntryKind, TranscriptEntry, UiAction};
use wschat_session::{ChatConfig, WebSocketSession, storage::FileIdentityStore};
use wschat_transport::{Scheme, WebSocketConnector, tui::ChatInput};

type Session = WebSocketSession<FileIdentityStore>;

#[derive(Debug, Parser)]
#[command(name = "chat-tui", about = "Terminal client for a room-based WebSocket chat")]
struct Args {
    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server host
    #[arg(long)]
    host: Option<String>,

    /// Server port
    #[arg(long)]
    port: Option<u16>,

    /// Use wss://
    #[arg(long)]
    tls: bool,

    /// Nickname to connect with
    #[arg(short, long)]
    nick: Option<String>,

    /// Room to join on connect
    #[arg(short, long)]
    room: Option<String>,

    /// Seconds between keepalive pings (0 disables)
    #[arg(long)]
    keepalive: Option<u64>,

    /// Where the identity is remembered between runs
    #[arg(long)]
    identity_file: Option<PathBuf>,

    /// Log file
    #[arg(long, default_value = "chat-tui.log")]
    log_file: PathBuf,
}

impl Args {
    fn config(&self) -> anyhow::Result<ChatConfig> {
        let mut config = match &self.config {
            Some(path) => ChatConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ChatConfig::default(),
        };
        if let Some(host) = &self.host {
            config.endpoint.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.endpoint.port = port;
        }
        if self.tls {
            config.endpoint.scheme = Scheme::Wss;
        }
        if let Some(secs) = self.keepalive {
            config.keepalive_secs = Some(secs);
        }
        Ok(config)
    }

    fn identity_store(&self) -> anyhow::Result<FileIdentityStore> {
        match &self.identity_file {
            Some(path) => Ok(FileIdentityStore::new(path)),
            None => FileIdentityStore::default_location()
                .context("no config directory; pass --identity-file"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log = File::create(&args.log_file)
        .with_context(|| format!("creating {}", args.log_file.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(log))
        .with_ansi(false)
        .init();

    let config = args.config()?;
    let keepalive = config.keepalive();
    let store = args.identity_store()?;
    let mut session = Session::new(config, WebSocketConnector::new(), store);

    session.restore_identity().await;
    if let Some(room) = &args.room {
        session.prefer_room(room).await;
    }

    let nick = args.nick.clone().unwrap_or_default();
    session.start_session(&nick).await;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, App::new(session, keepalive)).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

struct App {
    session: Session,
    input: ChatInput,
    /// Lines scrolled up from the bottom.
    scroll: u16,
    keepalive: Option<Duration>,
    last_ping: Instant,
}

impl App {
    fn new(session: Session, keepalive: Option<Duration>) -> Self {
        Self {
            session,
            input: ChatInput::new(),
            scroll: 0,
            keepalive,
            last_ping: Instant::now(),
        }
    }

    /// Returns `false` once the user asked to quit.
    async fn handle_action(&mut self, action: UiAction) -> bool {
        match action {
            UiAction::Quit => {
                if self.session.status() != ConnectionStatus::Closed {
                    self.session.end_session();
                }
                false
            }
            UiAction::Send { text } => {
                if self.session.send_message(&text).is_sent() {
                    self.input.clear();
                    self.scroll = 0;
                }
                true
            }
            action => {
                self.session.apply(action).await;
                true
            }
        }
    }

    fn tick_keepalive(&mut self) {
        let Some(every) = self.keepalive else {
            return;
        };
        if self.last_ping.elapsed() >= every {
            self.session.ping();
            self.last_ping = Instant::now();
        }
    }
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut app: App,
) -> anyhow::Result<()> {
    loop {
        app.session.pump();
        app.tick_keepalive();

        terminal.draw(|f| ui(f, &app))?;

        if !event::poll(Duration::from_millis(50))? {
            continue;
        }
        let event = event::read()?;

        if let Event::Key(key) = &event {
            let pressed = key.kind != KeyEventKind::Release;
            match key.code {
                KeyCode::F(n @ 1..=5) if pressed => {
                    let room = app.session.quick_rooms().get(usize::from(n - 1)).cloned();
                    if let Some(room) = room {
                        app.session.request_join(&room).await;
                    }
                    continue;
                }
                KeyCode::PageUp if pressed => {
                    app.scroll = app.scroll.saturating_add(10);
                    continue;
                }
                KeyCode::PageDown if pressed => {
                    app.scroll = app.scroll.saturating_sub(10);
                    continue;
                }
                _ => {}
            }
        }

        if let Some(action) = app.input.handle_event(&event) {
            if !app.handle_action(action).await {
                return Ok(());
            }
        }
    }
}

fn entry_line<'a>(entry: &'a TranscriptEntry, nickname: &str) -> Line<'a> {
    let time = entry.display_time();
    let mut spans = Vec::with_capacity(3);
    if !time.is_empty() {
        spans.push(Span::styled(
            format!("{time} "),
            Style::default().fg(Color::DarkGray),
        ));
    }

    match entry.kind {
        EntryKind::Message => {
            let from = entry.from.as_deref().unwrap_or("?");
            let color = if entry.is_mine(nickname) {
                Color::Cyan
            } else {
                Color::Magenta
            };
            spans.push(Span::styled(
                format!("{from}: "),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ));
            spans.push(Span::raw(entry.text.as_str()));
        }
        EntryKind::Presence => spans.push(Span::styled(
            entry.text.as_str(),
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )),
        EntryKind::System => spans.push(Span::styled(
            entry.text.as_str(),
            Style::default().fg(Color::Gray),
        )),
        EntryKind::Error => spans.push(Span::styled(
            entry.text.as_str(),
            Style::default().fg(Color::Red),
        )),
    }
    Line::from(spans)
}

fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Transcript
            Constraint::Length(3), // Input
            Constraint::Length(1), // Status
        ])
        .split(f.area());

    let session = &app.session;
    let identity = session.identity();

    // Transcript, pinned to the bottom unless scrolled
    let lines: Vec<Line> = session
        .transcript()
        .iter()
        .map(|entry| entry_line(entry, &identity.nickname))
        .collect();
    let visible = chunks[0].height.saturating_sub(2);
    let total = u16::try_from(lines.len()).unwrap_or(u16::MAX);
    let offset = total.saturating_sub(visible).saturating_sub(app.scroll);

    let title = format!(" #{} ", identity.room);
    let transcript = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false })
        .scroll((offset, 0));
    f.render_widget(transcript, chunks[0]);

    // Input area
    let draft = app.input.draft();
    let input = Paragraph::new(draft)
        .style(Style::default().fg(Color::Yellow))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", identity.nickname)),
        );
    f.render_widget(input, chunks[1]);

    let cursor = u16::try_from(draft.chars().count()).unwrap_or(u16::MAX);
    f.set_cursor_position((
        chunks[1].x.saturating_add(cursor).saturating_add(1),
        chunks[1].y + 1,
    ));

    // Status bar
    let status = session.status();
    let status_style = match status {
        ConnectionStatus::Open => Style::default().fg(Color::Green),
        ConnectionStatus::Connecting => Style::default().fg(Color::Yellow),
        ConnectionStatus::Closed => Style::default().fg(Color::Red),
    };
    let mut spans = vec![
        Span::raw(" "),
        Span::styled(status.as_str(), status_style),
        Span::raw(format!(" {} | ", session.endpoint_url())),
    ];
    for (i, room) in session.quick_rooms().iter().take(5).enumerate() {
        spans.push(Span::styled(
            format!("F{}", i + 1),
            Style::default().fg(Color::Yellow),
        ));
        spans.push(Span::raw(format!(" {room} ")));
    }
    spans.push(Span::raw("| "));
    spans.push(Span::styled("Ctrl+C", Style::default().fg(Color::Yellow)));
    spans.push(Span::raw(" quit"));
    f.render_widget(Paragraph::new(Line::from(spans)), chunks[2]);
}
