mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser, ValueEnum};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, KeyCode, KeyEvent, KeyModifiers, MouseEvent},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use plink::{
    clock::{Clock, SystemClock},
    config::{Config, ConfigStore, FileConfigStore},
    decipher::Decipher,
    level::Level,
    matcher::{Matcher, Policy},
    note::Note,
    runtime::{CrosstermEventSource, FixedTicker, GameEvent, Runner},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::Rect,
    Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    time::Duration,
};

const TICK_RATE_MS: u64 = 100;
/// How long a pressed key stays highlighted
const ACTIVE_FLASH_MS: u64 = 200;

/// terminal piano lock — play the melody to unlock
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A terminal piano lock. Each level binds keyboard keys (and mouse presses) to piano notes; reproduce the level's melody, in order and without long pauses, to unlock the gate."
)]
pub struct Cli {
    /// level to play
    #[clap(short = 'l', long, value_enum)]
    level: Option<SupportedLevel>,

    /// wrong notes clear the attempt immediately instead of flashing red first
    #[clap(long)]
    strict: bool,

    /// max gap between presses before the attempt restarts, in milliseconds
    #[clap(short = 't', long)]
    attempt_timeout_ms: Option<u64>,

    /// how long a wrong note stays visible, in milliseconds (ignored with --strict)
    #[clap(long)]
    error_display_ms: Option<u64>,

    /// hide the melody hint
    #[clap(long)]
    no_hint: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, ValueEnum, strum_macros::Display)]
pub enum SupportedLevel {
    Gate,
    Grand,
}

impl SupportedLevel {
    fn as_name(&self) -> String {
        self.to_string().to_lowercase()
    }

    fn next(&self) -> Self {
        match self {
            SupportedLevel::Gate => SupportedLevel::Grand,
            SupportedLevel::Grand => SupportedLevel::Gate,
        }
    }

    fn prev(&self) -> Self {
        // Two levels; cycling is symmetric
        self.next()
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "gate" => Some(SupportedLevel::Gate),
            "grand" => Some(SupportedLevel::Grand),
            _ => None,
        }
    }
}

impl Cli {
    /// CLI flags override whatever the config file carries
    fn apply_to(&self, cfg: &mut Config) {
        if let Some(level) = self.level {
            cfg.level = level.as_name();
        }
        if self.strict {
            cfg.strict = true;
        }
        if let Some(t) = self.attempt_timeout_ms {
            cfg.attempt_timeout_ms = t;
        }
        if let Some(t) = self.error_display_ms {
            cfg.error_display_ms = t;
        }
        if self.no_hint {
            cfg.show_hint = false;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppState {
    Locked,
    Unlocked,
}

#[derive(Debug)]
pub struct App {
    pub config: Config,
    pub level: Level,
    pub matcher: Matcher,
    pub state: AppState,
    /// Key currently flashing from a press, with its expiry time
    pub active_note: Option<(Note, u64)>,
    pub decipher: Option<Decipher>,
    pub show_hint: bool,
    clock: SystemClock,
}

impl App {
    pub fn new(config: Config) -> Result<Self, Box<dyn Error>> {
        let (level, matcher) = Self::build_session(&config)?;
        Ok(Self {
            show_hint: config.show_hint,
            config,
            level,
            matcher,
            state: AppState::Locked,
            active_note: None,
            decipher: None,
            clock: SystemClock,
        })
    }

    /// All configuration problems surface here, before any input runs.
    fn build_session(config: &Config) -> Result<(Level, Matcher), Box<dyn Error>> {
        let level = Level::new(&config.level)?;
        let policy = if config.strict {
            Policy::Strict
        } else {
            Policy::Lenient
        };
        let matcher = Matcher::new(level.melody().to_vec(), policy)?
            .with_timing(config.attempt_timeout_ms, config.error_display_ms);
        Ok((level, matcher))
    }

    pub fn play(&mut self, note: Note) {
        let now = self.clock.now_ms();
        self.active_note = Some((note.clone(), now + ACTIVE_FLASH_MS));
        self.matcher.process(note, now);
    }

    pub fn on_tick(&mut self) {
        let now = self.clock.now_ms();
        self.matcher.on_tick(now);
        if let Some((_, expires_at)) = self.active_note {
            if now >= expires_at {
                self.active_note = None;
            }
        }
        if let Some(decipher) = self.decipher.as_mut() {
            decipher.update();
        }
    }

    /// Deferred success drain; called once per loop turn, never from
    /// inside an input update.
    pub fn poll_success(&mut self) -> bool {
        if self.matcher.take_success() {
            self.state = AppState::Unlocked;
            self.decipher = Some(Decipher::new("ACCESS GRANTED"));
            self.active_note = None;
            true
        } else {
            false
        }
    }

    pub fn relock(&mut self) {
        self.matcher.reset();
        self.state = AppState::Locked;
        self.decipher = None;
        self.active_note = None;
    }

    /// The matcher is reset before the new level's configuration is
    /// accepted, so nothing from the old session can leak across.
    pub fn switch_level(&mut self, level: SupportedLevel) -> Result<(), Box<dyn Error>> {
        self.matcher.reset();
        self.config.level = level.as_name();
        let (level, matcher) = Self::build_session(&self.config)?;
        self.level = level;
        self.matcher = matcher;
        self.state = AppState::Locked;
        self.decipher = None;
        self.active_note = None;
        Ok(())
    }

    /// Whether a tick should trigger a redraw
    fn is_animating(&self) -> bool {
        self.active_note.is_some()
            || self.matcher.is_error()
            || self.decipher.as_ref().is_some_and(|d| !d.is_done())
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let store = FileConfigStore::new();
    let mut config = store.load();
    cli.apply_to(&mut config);
    let _ = store.save(&config);

    let mut app = App::new(config)?;

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<(), Box<dyn Error>> {
    let event_source = CrosstermEventSource::new();
    let ticker = FixedTicker::new(Duration::from_millis(TICK_RATE_MS));
    let runner = Runner::new(event_source, ticker);

    terminal.draw(|f| f.render_widget(&*app, f.area()))?;

    loop {
        // Success queued by the previous turn's input unlocks now, on a
        // fresh turn, after that update has fully completed.
        if app.poll_success() {
            terminal.draw(|f| f.render_widget(&*app, f.area()))?;
        }

        match runner.step() {
            GameEvent::Tick => {
                let was_animating = app.is_animating();
                app.on_tick();
                if was_animating || app.is_animating() {
                    terminal.draw(|f| f.render_widget(&*app, f.area()))?;
                }
            }
            GameEvent::Resize => {
                terminal.draw(|f| f.render_widget(&*app, f.area()))?;
            }
            GameEvent::Key(key) => {
                if handle_key(app, key)? {
                    break;
                }
                terminal.draw(|f| f.render_widget(&*app, f.area()))?;
            }
            GameEvent::Mouse(mouse) => {
                let size = terminal.size()?;
                handle_mouse(app, mouse, Rect::new(0, 0, size.width, size.height));
                terminal.draw(|f| f.render_widget(&*app, f.area()))?;
            }
        }
    }

    Ok(())
}

/// Returns true when the app should exit
fn handle_key(app: &mut App, key: KeyEvent) -> Result<bool, Box<dyn Error>> {
    // ctrl+c quits from anywhere
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Ok(true);
    }

    match app.state {
        AppState::Locked => match key.code {
            KeyCode::Esc => return Ok(true),
            KeyCode::Backspace => app.matcher.reset(),
            KeyCode::Left => {
                let current = SupportedLevel::from_name(&app.config.level)
                    .unwrap_or(SupportedLevel::Gate);
                app.switch_level(current.prev())?;
            }
            KeyCode::Right => {
                let current = SupportedLevel::from_name(&app.config.level)
                    .unwrap_or(SupportedLevel::Gate);
                app.switch_level(current.next())?;
            }
            KeyCode::Enter => {
                if let Some(note) = app.level.layout().resolve("ENTER").cloned() {
                    app.play(note);
                }
            }
            KeyCode::Char(c) => {
                // A space character resolves against the SPACE binding
                if let Some(note) = app.level.layout().resolve(&c.to_string()).cloned() {
                    app.play(note);
                }
            }
            _ => {}
        },
        AppState::Unlocked => match key.code {
            KeyCode::Esc => return Ok(true),
            KeyCode::Char('r') | KeyCode::Char('R') | KeyCode::Backspace => app.relock(),
            _ => {}
        },
    }

    Ok(false)
}

fn handle_mouse(app: &mut App, mouse: MouseEvent, screen: Rect) {
    if app.state != AppState::Locked {
        return;
    }
    let piano = ui::piano_area(screen);
    if let Some(note) =
        ui::hit_test(app.level.layout(), piano, mouse.column, mouse.row).cloned()
    {
        app.play(note);
    }
}
