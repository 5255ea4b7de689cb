use std::{
    fs::File,
    io::{self, Stdout},
    time::{Duration, Instant},
};

use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{error, info, LevelFilter};
use ratatui::{backend::CrosstermBackend, Terminal};

use vote_atlas::{
    args::Args,
    config::MapConfig,
    controller::MapController,
    data::{self, Dataset},
    error::{AtlasError, Result},
    state::AppState,
    ui,
};

const ANIMATION_TICK: Duration = Duration::from_millis(50);
const IDLE_TICK: Duration = Duration::from_millis(250);

fn init_logging(args: &Args) -> Result<()> {
    let file = File::create(&args.log_file).map_err(|source| AtlasError::Io {
        path: args.log_file.clone(),
        source,
    })?;
    let level = if args.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init()
        .map_err(|e| AtlasError::Logger(e.to_string()))
}

fn run(terminal: &mut Terminal<CrosstermBackend<Stdout>>, state: &mut AppState<'_>) -> Result<()> {
    loop {
        let now = Instant::now();
        terminal.draw(|f| ui::draw(f, state, now))?;

        let tick = if state.map.scene().is_animating(Instant::now()) { ANIMATION_TICK } else { IDLE_TICK };
        if event::poll(tick)? {
            match event::read()? {
                Event::Key(KeyEvent { code, kind: KeyEventKind::Press, .. }) => {
                    if state.handle_key(code, Instant::now()) {
                        return Ok(());
                    }
                }
                Event::Mouse(mouse) => state.handle_mouse(mouse, Instant::now()),
                // a resize needs nothing here: the next draw refits the map
                _ => {}
            }
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;
    let config = MapConfig::load(args.config.as_deref())?;
    let dataset = Dataset::load(&args.rows, &args.votes)?;
    let world = data::load_world(&args.world)?;
    let mut state = AppState::new(MapController::new(&dataset, world, config, Instant::now()));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let outcome = run(&mut terminal, &mut state);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    match &outcome {
        Ok(()) => info!("bye"),
        Err(e) => error!("{e}"),
    }
    outcome
}
