use anyhow::Result;
use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use crossterm::{
    event::{KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::fs::{self, OpenOptions};
use std::io::{self, stdin};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{info, warn};

use coinop::{
    config::{Config, ConfigStore, FileConfigStore},
    limiter,
    moves::Move,
    pad::{decode, NoPad, PadSource},
    runtime::{CrosstermEventSource, KioskEvent, KioskEventSource, Runner},
    session::{Phase, Session, SessionEnd},
    store::{load_sequence, CodeStore, FileCodeStore},
    TICK_RATE_MS,
};

/// arcade kiosk gatekeeper: secret-code entry screen and game time limiter
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Coin-op kiosk utilities: a full-screen secret-code entry screen that gates \
game launch behind a joystick sequence, and a time limiter that stops a game \
process once its paid minutes run out."
)]
struct Cli {
    /// alternate config file (defaults to the platform config dir)
    #[clap(short, long)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Watch a running game and stop it when the paid time runs out
    Track {
        /// pid of the game process
        pid: i32,
        /// game label, used only for log lines
        label: String,
        /// paid minutes before termination
        minutes: u64,
    },
    /// Present the secret-code entry screen for a game; exits 0 when the
    /// code is entered correctly, 1 otherwise
    Validate {
        /// game label to look up in the code database
        label: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cfg = match &cli.config {
        Some(path) => FileConfigStore::with_path(path).load(),
        None => FileConfigStore::new().load(),
    };
    init_logging(&cfg);

    match cli.command {
        Command::Track {
            pid,
            label,
            minutes,
        } => run_track(pid, &label, minutes, &cfg),
        Command::Validate { label } => run_validate(label, cfg),
    }
}

/// Timestamped line log under the configured log directory. Goes to a file
/// rather than stderr since the validate screen owns the terminal.
fn init_logging(cfg: &Config) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let file = fs::create_dir_all(&cfg.log_dir).and_then(|_| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(cfg.log_dir.join("coinop.log"))
    });

    match file {
        Ok(file) => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
                .with(filter())
                .init();
        }
        Err(err) => {
            // keep running without a log file; the kiosk screen matters more
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter())
                .init();
            warn!(%err, log_dir = %cfg.log_dir.display(), "log file unavailable, using stderr");
        }
    }
}

#[cfg(unix)]
fn run_track(pid: i32, label: &str, minutes: u64, cfg: &Config) -> Result<()> {
    let handle = limiter::PidHandle::new(pid);
    // fire and forget: the outcome lives in the log file only
    let _ = limiter::track(&handle, label, minutes, cfg);
    Ok(())
}

#[cfg(not(unix))]
fn run_track(_pid: i32, _label: &str, _minutes: u64, _cfg: &Config) -> Result<()> {
    anyhow::bail!("track requires unix signal delivery")
}

fn run_validate(label: String, cfg: Config) -> Result<()> {
    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let store = FileCodeStore::new(&cfg.database);
    let expected = load_sequence(&store, &label);
    let mut session = Session::new(label, expected, &cfg);
    session.start();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let runner = Runner::new(
        CrosstermEventSource::new(),
        Duration::from_millis(TICK_RATE_MS),
    );
    // no HID layer on the kiosk image yet; the cabinet controls are wired
    // through the keyboard driver and arrive as key events
    let mut pad = NoPad;
    let end = run_screen(&mut terminal, &mut session, &runner, &mut pad, &store, &cfg);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    match end? {
        SessionEnd::Unlocked => Ok(()),
        SessionEnd::Rejected => std::process::exit(1),
    }
}

/// Drive the session until it reaches a terminal outcome: ticks advance the
/// countdown and poll the pad, keys feed the keyboard fallback bindings,
/// Esc (or ctrl-c) cancels with a failure exit.
fn run_screen<B, E, P, S>(
    terminal: &mut Terminal<B>,
    session: &mut Session,
    runner: &Runner<E>,
    pad: &mut P,
    store: &S,
    cfg: &Config,
) -> Result<SessionEnd>
where
    B: Backend,
    E: KioskEventSource,
    P: PadSource,
    S: CodeStore,
{
    terminal.draw(|f| f.render_widget(&*session, f.area()))?;

    loop {
        match runner.step() {
            KioskEvent::Tick => {
                if session.polling_active() {
                    if let Some(state) = pad.poll() {
                        if let Some(mv) = decode(state, cfg.dead_zone) {
                            offer_move(session, store, mv);
                        }
                    }
                }
                if let Some(end) = session.on_tick() {
                    return Ok(end);
                }
                terminal.draw(|f| f.render_widget(&*session, f.area()))?;
            }
            KioskEvent::Resize => {
                terminal.draw(|f| f.render_widget(&*session, f.area()))?;
            }
            KioskEvent::Key(key) => {
                match key.code {
                    KeyCode::Esc => {
                        info!(game = %session.game, "entry cancelled");
                        return Ok(SessionEnd::Rejected);
                    }
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        info!(game = %session.game, "entry cancelled");
                        return Ok(SessionEnd::Rejected);
                    }
                    code => {
                        if session.polling_active() {
                            if let Some(mv) = Move::from_key(code) {
                                offer_move(session, store, mv);
                            }
                        }
                    }
                }
                terminal.draw(|f| f.render_widget(&*session, f.area()))?;
            }
        }
    }
}

/// Feed one move to the session; on a winning comparison, redeem the record.
/// A failed redemption is logged and swallowed: the player already earned
/// the launch.
fn offer_move<S: CodeStore>(session: &mut Session, store: &S, mv: Move) {
    if !session.accept(mv) {
        return;
    }
    if session.phase == (Phase::Verdict { valid: true }) {
        if let Err(err) = store.mark_used(&session.game, &session.expected) {
            warn!(game = %session.game, %err, "failed to mark code used");
        } else {
            info!(game = %session.game, "code redeemed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinop::pad::{PadState, ScriptedPad};
    use coinop::runtime::TestEventSource;
    use crossterm::event::KeyEvent;
    use ratatui::backend::TestBackend;
    use std::sync::mpsc;
    use tempfile::tempdir;

    #[test]
    fn test_cli_track_parsing() {
        let cli = Cli::parse_from(["coinop", "track", "4242", "galaga", "30"]);
        match cli.command {
            Command::Track {
                pid,
                label,
                minutes,
            } => {
                assert_eq!(pid, 4242);
                assert_eq!(label, "galaga");
                assert_eq!(minutes, 30);
            }
            _ => panic!("expected track subcommand"),
        }
    }

    #[test]
    fn test_cli_validate_parsing() {
        let cli = Cli::parse_from(["coinop", "validate", "galaga"]);
        match cli.command {
            Command::Validate { label } => assert_eq!(label, "galaga"),
            _ => panic!("expected validate subcommand"),
        }
        assert_eq!(cli.config, None);
    }

    #[test]
    fn test_cli_config_override() {
        let cli = Cli::parse_from(["coinop", "-c", "/tmp/kiosk.json", "validate", "galaga"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/kiosk.json")));
    }

    #[test]
    fn test_cli_rejects_missing_subcommand() {
        assert!(Cli::try_parse_from(["coinop"]).is_err());
    }

    fn no_debounce_cfg() -> Config {
        Config {
            debounce_ms: 0,
            verdict_delay_ms: 50,
            ..Config::default()
        }
    }

    fn key(code: KeyCode) -> KioskEvent {
        KioskEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn headless_screen(
        cfg: &Config,
        expected: Vec<Move>,
        events: Vec<KioskEvent>,
    ) -> Result<SessionEnd> {
        let dir = tempdir().unwrap();
        let store = FileCodeStore::new(dir.path().join("codes.json"));
        let mut session = Session::new("galaga".to_string(), expected, cfg);
        session.start();

        let (tx, rx) = mpsc::channel();
        for ev in events {
            tx.send(ev).unwrap();
        }
        drop(tx); // after the script, every step degrades to a tick
        let runner = Runner::new(TestEventSource::new(rx), Duration::from_millis(1));

        let backend = TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend)?;
        let mut pad = NoPad;
        run_screen(&mut terminal, &mut session, &runner, &mut pad, &store, cfg)
    }

    #[test]
    fn test_screen_correct_keyboard_entry_unlocks() {
        let cfg = no_debounce_cfg();
        let end = headless_screen(
            &cfg,
            vec![Move::Up, Move::A],
            vec![key(KeyCode::Up), key(KeyCode::Char('a'))],
        )
        .unwrap();
        assert_eq!(end, SessionEnd::Unlocked);
    }

    #[test]
    fn test_screen_escape_cancels() {
        let cfg = no_debounce_cfg();
        let end = headless_screen(
            &cfg,
            vec![Move::Up, Move::A],
            vec![key(KeyCode::Up), key(KeyCode::Esc)],
        )
        .unwrap();
        assert_eq!(end, SessionEnd::Rejected);
    }

    #[test]
    fn test_screen_pad_input_unlocks() {
        let cfg = no_debounce_cfg();
        let dir = tempdir().unwrap();
        let store = FileCodeStore::new(dir.path().join("codes.json"));
        let mut session = Session::new("galaga".to_string(), vec![Move::Up, Move::A], &cfg);
        session.start();

        // stick up past the dead zone, then the A button, one frame per tick
        let up = PadState {
            y_axis: -1.0,
            ..Default::default()
        };
        let mut a = PadState::default();
        a.buttons[0] = true;
        let mut pad = ScriptedPad::new(vec![Some(up), None, Some(a)]);

        let (_tx, rx) = mpsc::channel();
        let runner = Runner::new(TestEventSource::new(rx), Duration::from_millis(1));
        let backend = TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend).unwrap();

        let end =
            run_screen(&mut terminal, &mut session, &runner, &mut pad, &store, &cfg).unwrap();
        assert_eq!(end, SessionEnd::Unlocked);
    }

    #[test]
    fn test_screen_times_out_without_input() {
        let cfg = Config {
            entry_timeout_secs: 1,
            verdict_delay_ms: 50,
            ..Config::default()
        };
        let end = headless_screen(&cfg, vec![Move::Up], vec![]).unwrap();
        assert_eq!(end, SessionEnd::Rejected);
    }

    #[test]
    fn test_screen_unbound_keys_are_ignored() {
        let cfg = no_debounce_cfg();
        let end = headless_screen(
            &cfg,
            vec![Move::B],
            vec![key(KeyCode::Char('q')), key(KeyCode::Enter), key(KeyCode::Char('b'))],
        )
        .unwrap();
        assert_eq!(end, SessionEnd::Unlocked);
    }
}
