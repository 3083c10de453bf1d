// Live dashboard for the system check. Logging is file-only (logs/) so the
// terminal stays intact; control via RUST_LOG or --log-level.
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Sparkline},
    Frame, Terminal,
};
use readycheck_app::probes::{
    CameraCheck, CheckContext, CheckError, CheckReport, MicrophoneCheck, NetworkCheck, SystemCheck,
};
use readycheck_app::session::{CheckKind, ReadinessSession};
use readycheck_audio::LevelMeter;
use readycheck_foundation::CheckStatus;
use std::collections::VecDeque;
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "check_dashboard")]
#[command(version)]
#[command(about = "Live system-check dashboard with a real-time mic level meter")]
struct Cli {
    /// Microphone device name
    #[arg(short = 'D', long)]
    device: Option<String>,

    /// Camera device index
    #[arg(long, default_value = "0")]
    camera_index: u32,

    /// Microphone metering window in seconds
    #[arg(short = 'd', long, default_value = "8")]
    duration: u64,

    /// Speed endpoint base URL
    #[arg(short = 'e', long, default_value = "http://127.0.0.1:3000")]
    endpoint: String,

    /// Thresholds TOML file
    #[arg(short = 't', long)]
    thresholds: Option<PathBuf>,

    /// Log level filter (overrides RUST_LOG)
    #[arg(long = "log-level", default_value = "info")]
    log_level: String,
}

fn init_logging(cli_level: &str) -> anyhow::Result<()> {
    std::fs::create_dir_all("logs")?;
    let file_appender = RollingFileAppender::new(Rotation::DAILY, "logs", "readycheck.log");
    let (non_blocking_file, _guard) = tracing_appender::non_blocking(file_appender);
    let effective_level = if !cli_level.is_empty() {
        cli_level.to_string()
    } else {
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string())
    };
    let env_filter = EnvFilter::try_new(effective_level).unwrap_or_else(|_| EnvFilter::new("info"));

    // File-only: a stdout layer would fight the alternate screen
    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();
    std::mem::forget(_guard);
    Ok(())
}

type CheckOutcome = (CheckKind, Result<CheckReport, CheckError>);

struct LogEntry {
    at: Instant,
    message: String,
}

struct DashboardState {
    session: ReadinessSession,
    ctx: CheckContext,
    live_meter: Option<LevelMeter>,
    level_history: VecDeque<u64>,
    logs: VecDeque<LogEntry>,
    start_time: Instant,
    banner: Option<String>,
}

impl DashboardState {
    fn new(ctx: CheckContext) -> Self {
        let mut level_history = VecDeque::with_capacity(60);
        for _ in 0..60 {
            level_history.push_back(0);
        }
        let mut logs = VecDeque::new();
        logs.push_back(LogEntry {
            at: Instant::now(),
            message:
                "Dashboard started. c/m/n run a single check, a runs all, s starts, q quits."
                    .to_string(),
        });
        Self {
            session: ReadinessSession::new(),
            ctx,
            live_meter: None,
            level_history,
            logs,
            start_time: Instant::now(),
            banner: None,
        }
    }

    fn push_log(&mut self, message: impl Into<String>) {
        self.logs.push_back(LogEntry {
            at: Instant::now(),
            message: message.into(),
        });
        while self.logs.len() > 100 {
            self.logs.pop_front();
        }
    }

    fn push_level_sample(&mut self) {
        let level = self
            .live_meter
            .as_ref()
            .map(|m| m.level_percent().round() as u64)
            .unwrap_or(0);
        self.level_history.push_back(level.min(100));
        while self.level_history.len() > 60 {
            self.level_history.pop_front();
        }
    }
}

fn spawn_check(
    kind: CheckKind,
    state: &mut DashboardState,
    tx: &mpsc::UnboundedSender<CheckOutcome>,
) {
    // A check already in Testing stays untouched; re-runs from terminal
    // states are allowed.
    if state.session.begin(kind).is_err() {
        return;
    }
    state.push_log(format!("Running {} check...", kind));

    let ctx = state.ctx.clone();
    let tx = tx.clone();
    match kind {
        CheckKind::Camera => {
            tokio::spawn(async move {
                let result = CameraCheck::new().run(&ctx).await;
                let _ = tx.send((kind, result));
            });
        }
        CheckKind::Microphone => {
            let mut check = MicrophoneCheck::new();
            state.live_meter = Some(check.meter());
            tokio::spawn(async move {
                let result = check.run(&ctx).await;
                let _ = tx.send((kind, result));
            });
        }
        CheckKind::Network => {
            tokio::spawn(async move {
                let result = NetworkCheck::new().run(&ctx).await;
                let _ = tx.send((kind, result));
            });
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let thresholds = match &cli.thresholds {
        Some(path) => readycheck_app::probes::thresholds::load_from_file(path)?,
        None => Default::default(),
    };
    let ctx = CheckContext {
        device: cli.device.clone(),
        camera_index: cli.camera_index,
        duration: Duration::from_secs(cli.duration),
        endpoint_base: cli.endpoint.clone(),
        thresholds,
        output_dir: None,
    };

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_dashboard(&mut terminal, ctx).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run_dashboard(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ctx: CheckContext,
) -> anyhow::Result<()> {
    let mut state = DashboardState::new(ctx);
    let (tx, mut rx) = mpsc::unbounded_channel::<CheckOutcome>();

    loop {
        terminal.draw(|f| ui(f, &state))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => break,
                    KeyCode::Char('c') => spawn_check(CheckKind::Camera, &mut state, &tx),
                    KeyCode::Char('m') => spawn_check(CheckKind::Microphone, &mut state, &tx),
                    KeyCode::Char('n') => spawn_check(CheckKind::Network, &mut state, &tx),
                    KeyCode::Char('a') => {
                        for kind in CheckKind::ALL {
                            spawn_check(kind, &mut state, &tx);
                        }
                    }
                    KeyCode::Char('s') => match state.session.launch_interview() {
                        Ok(()) => {
                            state.banner = Some("Interview starting...".to_string());
                            state.push_log("Interview starting...");
                        }
                        Err(_) => {
                            let message = state.session.status_message();
                            state.banner = Some(message.clone());
                            state.push_log(message);
                        }
                    },
                    _ => {}
                }
            }
        }

        while let Ok((kind, result)) = rx.try_recv() {
            match result {
                Ok(report) => {
                    let verdict = if report.pass { "PASS" } else { "FAIL" };
                    state.push_log(format!(
                        "{}: {}{}",
                        kind,
                        verdict,
                        report
                            .notes
                            .as_deref()
                            .map(|n| format!(" - {}", n))
                            .unwrap_or_default()
                    ));
                    if state.session.complete(kind, &report).is_err() {
                        tracing::warn!("Dropped stale {} report", kind);
                    }
                }
                Err(e) => {
                    state.push_log(format!("{}: FAIL - {}", kind, e.message));
                    if state.session.fail(kind, &e).is_err() {
                        tracing::warn!("Dropped stale {} failure", kind);
                    }
                }
            }
            if kind == CheckKind::Microphone {
                state.live_meter = None;
            }
        }

        state.push_level_sample();
    }

    Ok(())
}

fn status_style(status: CheckStatus) -> Style {
    match status {
        CheckStatus::Passed => Style::default().fg(Color::Green),
        CheckStatus::Failed => Style::default().fg(Color::Red),
        CheckStatus::Testing => Style::default().fg(Color::Yellow),
        CheckStatus::Idle => Style::default().fg(Color::DarkGray),
    }
}

fn status_symbol(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Passed => "[pass]",
        CheckStatus::Failed => "[fail]",
        CheckStatus::Testing => "[....]",
        CheckStatus::Idle => "[    ]",
    }
}

fn ui(f: &mut Frame, state: &DashboardState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(5),
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(f.area());

    draw_header(f, chunks[0], state);
    draw_checks(f, chunks[1], state);
    draw_meter(f, chunks[2], state);
    draw_readings(f, chunks[3], state);
    draw_logs(f, chunks[4], state);
    draw_footer(f, chunks[5]);
}

fn draw_header(f: &mut Frame, area: Rect, state: &DashboardState) {
    let ready = state.session.is_ready();
    let verdict = if ready {
        Span::styled(
            "READY",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled("NOT READY", Style::default().fg(Color::Red))
    };
    let message = state
        .banner
        .clone()
        .unwrap_or_else(|| state.session.status_message());
    let line = Line::from(vec![
        Span::raw("System Check  "),
        verdict,
        Span::raw("  "),
        Span::styled(message, Style::default().fg(Color::Gray)),
    ]);
    let header = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn draw_checks(f: &mut Frame, area: Rect, state: &DashboardState) {
    let mut lines = Vec::with_capacity(3);
    for kind in CheckKind::ALL {
        let status = state.session.status(kind);
        let detail = state.session.message(kind).unwrap_or("");
        lines.push(Line::from(vec![
            Span::styled(status_symbol(status), status_style(status)),
            Span::raw(format!(" {:<11}", kind.as_str())),
            Span::styled(format!("{:<8}", status.to_string()), status_style(status)),
            Span::styled(detail.to_string(), Style::default().fg(Color::Gray)),
        ]));
    }
    let widget =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Checks"));
    f.render_widget(widget, area);
}

fn draw_meter(f: &mut Frame, area: Rect, state: &DashboardState) {
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let level = state
        .live_meter
        .as_ref()
        .map(|m| m.level_percent())
        .unwrap_or(0.0);
    let color = if level > 66.0 {
        Color::Red
    } else if level > 33.0 {
        Color::Yellow
    } else {
        Color::Green
    };
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Mic Level"))
        .gauge_style(Style::default().fg(color))
        .percent(level.clamp(0.0, 100.0) as u16);
    f.render_widget(gauge, halves[0]);

    let history: Vec<u64> = state.level_history.iter().copied().collect();
    let sparkline = Sparkline::default()
        .block(Block::default().borders(Borders::ALL).title("History"))
        .style(Style::default().fg(Color::Cyan))
        .data(&history);
    f.render_widget(sparkline, halves[1]);
}

fn metric_text(report: Option<&CheckReport>, key: &str) -> String {
    report
        .and_then(|r| r.metrics.get(key))
        .map(|v| v.to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn draw_readings(f: &mut Frame, area: Rect, state: &DashboardState) {
    let camera = state.session.report(CheckKind::Camera);
    let network = state.session.report(CheckKind::Network);
    let lines = vec![
        Line::from(format!(
            "Camera:  {}x{} @ {} fps (measured {})",
            metric_text(camera, "width"),
            metric_text(camera, "height"),
            metric_text(camera, "frame_rate"),
            metric_text(camera, "measured_fps"),
        )),
        Line::from(format!(
            "Network: down {} Mbps, up {} Mbps, ping {} ms",
            metric_text(network, "download_mbps"),
            metric_text(network, "upload_mbps"),
            metric_text(network, "ping_ms"),
        )),
    ];
    let widget =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Readings"));
    f.render_widget(widget, area);
}

fn draw_logs(f: &mut Frame, area: Rect, state: &DashboardState) {
    let visible = area.height.saturating_sub(2) as usize;
    let lines: Vec<Line> = state
        .logs
        .iter()
        .rev()
        .take(visible.max(1))
        .rev()
        .map(|entry| {
            let t = entry.at.duration_since(state.start_time).as_secs();
            Line::from(vec![
                Span::styled(format!("{:>4}s ", t), Style::default().fg(Color::DarkGray)),
                Span::raw(entry.message.clone()),
            ])
        })
        .collect();
    let widget = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Log"));
    f.render_widget(widget, area);
}

fn draw_footer(f: &mut Frame, area: Rect) {
    let footer = Paragraph::new(Line::from(
        " c camera   m mic   n network   a all   s start interview   q quit",
    ))
    .style(Style::default().fg(Color::DarkGray));
    f.render_widget(footer, area);
}
