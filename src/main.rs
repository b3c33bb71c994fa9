mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use log::LevelFilter;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::OpenOptions,
    io::{self, stdin},
    path::PathBuf,
    sync::{mpsc, Arc, Mutex},
    time::Duration,
};

use wordpace::{
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    engine::{CompletionReport, TypingTestEngine},
    runtime::{self, ChannelEventSource, Runner, TestEvent, ThreadTicker, TICK_INTERVAL},
    sample::DEFAULT_SAMPLE_TEXT,
    session::Status,
};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// typing speed test: type a fixed sample against the clock
#[derive(Parser, Debug, Clone)]
#[clap(version, about)]
pub struct Cli {
    /// number of seconds to run the test
    #[clap(short = 's', long)]
    secs: Option<u32>,

    /// custom sample text to type
    #[clap(short = 'p', long)]
    prompt: Option<String>,

    /// config file to read (and write with --save-config)
    #[clap(long)]
    config: Option<PathBuf>,

    /// persist the effective duration and sample to the config file
    #[clap(long)]
    save_config: bool,

    /// log verbosity, written to the state directory
    #[clap(long, default_value_t = LevelFilter::Warn)]
    log_level: LevelFilter,

    /// print the results of the last completed test as json on exit
    #[clap(long)]
    json: bool,
}

impl Cli {
    fn apply_to(&self, mut config: Config) -> Config {
        if let Some(secs) = self.secs {
            config.duration_secs = secs;
        }
        if let Some(ref prompt) = self.prompt {
            config.sample_text = Some(prompt.clone());
        }
        config
    }
}

pub struct App {
    pub engine: TypingTestEngine<ThreadTicker>,
    pub last_report: Arc<Mutex<Option<CompletionReport>>>,
}

impl App {
    pub fn new(config: &Config, tx: mpsc::Sender<TestEvent>) -> Self {
        let source = config.sample_text.as_deref().unwrap_or(DEFAULT_SAMPLE_TEXT);
        let mut engine = TypingTestEngine::with_scheduler(
            source,
            config.duration_secs,
            ThreadTicker::new(tx, TICK_INTERVAL),
        );

        let last_report = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&last_report);
        engine.on_complete(move |report| {
            log::info!(
                "test complete: {} wpm, {}% accuracy, {} words",
                report.stats.wpm,
                report.stats.accuracy,
                report.words_committed
            );
            if let Ok(mut slot) = sink.lock() {
                *slot = Some(report.clone());
            }
        });

        Self {
            engine,
            last_report,
        }
    }

    /// Returns false when the app should quit.
    fn on_key(&mut self, key: KeyEvent) -> bool {
        if key.kind == KeyEventKind::Release {
            return true;
        }

        match key.code {
            KeyCode::Esc => return false,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return false,
            KeyCode::Enter => {
                if self.engine.status() == Status::Idle {
                    self.engine.start();
                }
            }
            KeyCode::Tab => self.engine.reset(),
            KeyCode::Backspace => {
                let mut value = self.engine.session().current_input.clone();
                if value.pop().is_some() {
                    self.engine.submit_input(&value);
                }
            }
            KeyCode::Char(c)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                let mut value = self.engine.session().current_input.clone();
                value.push(c);
                self.engine.submit_input(&value);
            }
            // arrows and the rest would move a caret the engine doesn't track
            _ => {}
        }
        true
    }
}

fn init_logging(level: LevelFilter) {
    if level == LevelFilter::Off {
        return;
    }

    let path = AppDirs::log_path();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    // stderr would draw over the alternate screen
    match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => env_logger::Builder::new()
            .filter_level(level)
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init(),
        Err(e) => eprintln!("logging disabled, cannot open {}: {e}", path.display()),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    let store = cli
        .config
        .as_ref()
        .map(FileConfigStore::with_path)
        .unwrap_or_default();
    let config = cli.apply_to(store.load());

    if cli.save_config {
        store.save(&config)?;
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel();
    runtime::spawn_terminal_reader(tx.clone());
    let mut app = App::new(&config, tx);
    let runner = Runner::new(ChannelEventSource::new(rx), POLL_INTERVAL);

    let result = start_tui(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result?;

    if cli.json {
        if let Some(report) = app.last_report.lock().ok().and_then(|r| r.clone()) {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<ChannelEventSource>,
) -> Result<(), Box<dyn Error>> {
    terminal.draw(|f| f.render_widget(&*app, f.area()))?;

    loop {
        match runner.step() {
            Some(TestEvent::Tick(schedule)) => app.engine.scheduled_tick(schedule),
            Some(TestEvent::Resize) => {}
            Some(TestEvent::Key(key)) => {
                if !app.on_key(key) {
                    break;
                }
            }
            None => continue,
        }
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running_app(prompt: &str) -> App {
        let (tx, _rx) = mpsc::channel();
        let config = Config {
            duration_secs: 60,
            sample_text: Some(prompt.to_string()),
        };
        let mut app = App::new(&config, tx);
        app.on_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        app
    }

    #[test]
    fn enter_starts_and_chars_type() {
        let mut app = running_app("cat dog");
        assert_eq!(app.engine.status(), Status::Running);

        app.on_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE));
        app.on_key(KeyEvent::new(KeyCode::Char('A'), KeyModifiers::SHIFT));
        assert_eq!(app.engine.session().current_input, "cA");

        app.on_key(KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE));
        assert_eq!(app.engine.session().current_input, "c");
    }

    #[test]
    fn control_and_alt_chords_do_not_type() {
        let mut app = running_app("cat dog");

        assert!(app.on_key(KeyEvent::new(KeyCode::Char('w'), KeyModifiers::CONTROL)));
        assert!(app.on_key(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::ALT)));

        assert!(app.engine.session().current_input.is_empty());
        assert_eq!(app.engine.stats().total_chars, 0);
    }

    #[test]
    fn ctrl_c_and_esc_quit() {
        let mut app = running_app("cat dog");

        assert!(!app.on_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(!app.on_key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)));
    }
}
