// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

use anyhow::{anyhow, bail, Context, Result};
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::terminal;
use keydrum::actuator::{self, LogActuator, SharedActuator};
use keydrum::config::AppConfig;
use keydrum::control::{ControlAction, Controller, KeyboardController};
use keydrum::score::file::SCORE_EXTENSIONS;
use keydrum::score::midi::{self, MIDI_EXTENSIONS};
use keydrum::score::{self, Score};
use keydrum::sequencer::{plan, Player};
use keydrum::timing::ManualClock;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_SCORE_DIR: &str = "scores";

fn print_usage() {
    println!("KEYDRUM - Keyboard Drum Player");
    println!();
    println!("Usage: keydrum <COMMAND> [OPTIONS]");
    println!();
    println!("Commands:");
    println!("  play <SCORE>              Play one score and wait for it to finish");
    println!("  run <SCORE|DIR>...        Interactive player with hotkeys");
    println!("  check <SCORE>...          Validate scores against the key mapping");
    println!("  convert <MIDI|DIR>...     Convert MIDI drum tracks to JSON scores");
    println!();
    println!("Options:");
    println!("  --config <FILE>           Load key mapping and settings (YAML or JSON)");
    println!("  --loop                    Start with loop mode on");
    println!("  --variation               Start with variation mode on");
    println!("  --dry-run                 Print the key timeline instantly, press nothing");
    println!("  --out <DIR>               Output directory for convert (default: scores)");
    println!("  --force                   Overwrite scores that already exist");
    println!("  --verbose                 Debug logging");
    println!("  --help                    Show this help message");
}

/// Parsed command line flags
#[derive(Debug, Default)]
struct Options {
    config: Option<PathBuf>,
    looping: bool,
    variation: bool,
    dry_run: bool,
    out: Option<PathBuf>,
    force: bool,
    verbose: bool,
    inputs: Vec<PathBuf>,
}

fn parse_options(args: &[String]) -> Result<Options> {
    let mut options = Options::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config = Some(PathBuf::from(path));
            }
            "--loop" => options.looping = true,
            "--variation" => options.variation = true,
            "--dry-run" => options.dry_run = true,
            "--out" | "-o" => {
                let path = iter
                    .next()
                    .ok_or_else(|| anyhow!("--out requires a directory path"))?;
                options.out = Some(PathBuf::from(path));
            }
            "--force" => options.force = true,
            "--verbose" | "-v" => options.verbose = true,
            flag if flag.starts_with('-') => bail!("Unknown option: {}", flag),
            input => options.inputs.push(PathBuf::from(input)),
        }
    }

    Ok(options)
}

fn init_logging(verbose: bool) {
    let default = if verbose { "keydrum=debug" } else { "keydrum=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(options: &Options) -> Result<AppConfig> {
    match &options.config {
        Some(path) => AppConfig::load(path),
        None => Ok(AppConfig::default()),
    }
}

/// Expand directories into the score files they contain
fn collect_scores(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            paths.extend(score::list_dir(input)?);
        } else {
            paths.push(input.clone());
        }
    }
    Ok(paths)
}

fn load_score(path: &Path, config: &AppConfig) -> Result<Score> {
    let score = score::load(path)?;
    let unmapped = config.key_mapping.unmapped(&score);
    if !unmapped.is_empty() {
        warn!(score = score.title(), keys = ?unmapped, "Score uses keys with no mapping");
    }
    Ok(score)
}

#[cfg(feature = "os-input")]
fn os_actuator() -> SharedActuator {
    actuator::shared(actuator::RdevActuator::new())
}

#[cfg(not(feature = "os-input"))]
fn os_actuator() -> SharedActuator {
    warn!("Built without the os-input feature, key events are only logged");
    actuator::shared(LogActuator::new())
}

fn play(options: &Options) -> Result<()> {
    let [path] = options.inputs.as_slice() else {
        bail!("play requires exactly one score file");
    };
    let config = load_config(options)?;
    let score = load_score(path, &config)?;

    let player = Arc::new(
        if options.dry_run {
            let clock = Arc::new(ManualClock::new());
            Player::with_shared_actuator(
                config.key_mapping.clone(),
                actuator::shared(LogActuator::with_clock(clock.clone())),
            )
            .with_clock(clock)
        } else {
            Player::with_shared_actuator(config.key_mapping.clone(), os_actuator())
        }
        .with_settings(config.player),
    );

    if options.looping {
        if options.dry_run {
            warn!("Loop mode ignored for a dry run");
        } else {
            player.toggle_loop();
        }
    }
    if options.variation {
        player.toggle_variation();
    }

    // Stopping releases any held key before the session ends
    let handler_player = Arc::clone(&player);
    ctrlc::set_handler(move || {
        info!("Interrupted, stopping playback");
        handler_player.stop();
    })
    .context("Failed to install Ctrl+C handler")?;

    player.start(score)?;
    if let Some(report) = player.wait() {
        info!(
            outcome = ?report.outcome,
            cycles = report.cycles,
            dispatched = report.dispatched,
            "Session finished"
        );
    }
    Ok(())
}

fn check(options: &Options) -> Result<()> {
    if options.inputs.is_empty() {
        bail!("check requires at least one score file or directory");
    }
    let config = load_config(options)?;
    let paths = collect_scores(&options.inputs)?;

    let mut failures = 0;
    for path in &paths {
        match score::load(path) {
            Ok(score) => {
                let timeline = plan(&score);
                let unmapped = config.key_mapping.unmapped(&score);
                println!(
                    "{}: \"{}\" {} bpm, {} note groups, loop {:.3}s{}",
                    path.display(),
                    score.title(),
                    score.bpm(),
                    score.notes().len(),
                    timeline.cycle_seconds(),
                    if timeline.fallback { " (empty score)" } else { "" }
                );
                if !unmapped.is_empty() {
                    let keys: Vec<&str> = unmapped.iter().map(String::as_str).collect();
                    println!("  unmapped keys: {}", keys.join(", "));
                }
            }
            Err(e) => {
                failures += 1;
                println!("{}: {:#}", path.display(), e);
            }
        }
    }

    if failures > 0 {
        bail!("{} of {} scores failed to load", failures, paths.len());
    }
    Ok(())
}

fn convert(options: &Options) -> Result<()> {
    if options.inputs.is_empty() {
        bail!("convert requires at least one MIDI file or directory");
    }
    let out_dir = options
        .out
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SCORE_DIR));

    let mut failures = 0;
    for input in &options.inputs {
        if input.is_dir() {
            let summary = midi::convert_dir(input, &out_dir, options.force)?;
            for path in &summary.converted {
                println!("wrote {}", path.display());
            }
            for path in &summary.skipped {
                println!("{}: score exists, skipped", path.display());
            }
            for path in &summary.failed {
                println!("{}: failed", path.display());
            }
            failures += summary.failed.len();
            continue;
        }

        let target = out_dir.join(input.with_extension("json").file_name().unwrap_or_default());
        if target.exists() && !options.force {
            println!("{}: score exists, skipped", input.display());
            continue;
        }
        let written = midi::read(input).and_then(|file| {
            fs::create_dir_all(&out_dir)
                .with_context(|| format!("Failed to create score directory: {:?}", out_dir))?;
            fs::write(&target, file.to_json()?)
                .with_context(|| format!("Failed to write score file: {:?}", target))
        });
        match written {
            Ok(()) => println!("wrote {}", target.display()),
            Err(e) => {
                failures += 1;
                println!("{}: {:#}", input.display(), e);
            }
        }
    }

    if failures > 0 {
        bail!("{} MIDI files failed to convert ({})", failures, MIDI_EXTENSIONS.join(", "));
    }
    Ok(())
}

fn run(options: &Options) -> Result<()> {
    let config = load_config(options)?;
    let keyboard = KeyboardController::from_config(&config.keyboard)?;

    let mut playlist = Vec::new();
    for path in collect_scores(&options.inputs)? {
        match load_score(&path, &config) {
            Ok(score) => playlist.push(Arc::new(score)),
            Err(e) => warn!("Skipping {}: {:#}", path.display(), e),
        }
    }
    if playlist.is_empty() {
        bail!("No playable scores in {:?} ({})", options.inputs, SCORE_EXTENSIONS.join(", "));
    }

    let player = Player::with_shared_actuator(config.key_mapping.clone(), os_actuator())
        .with_settings(config.player);
    if options.looping {
        player.toggle_loop();
    }
    if options.variation {
        player.toggle_variation();
    }
    let mut controller = Controller::new(player, playlist);

    for line in keyboard.help_lines() {
        println!("{}", line);
    }
    if let Some(score) = controller.current() {
        println!("Selected: {}", score.title());
    }

    terminal::enable_raw_mode().context("Failed to enable raw terminal mode")?;
    let result = event_loop(&mut controller, &keyboard);
    terminal::disable_raw_mode().context("Failed to restore terminal mode")?;
    result
}

fn event_loop(controller: &mut Controller, keyboard: &KeyboardController) -> Result<()> {
    loop {
        if !event::poll(Duration::from_millis(100))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        let Some(action) = keyboard.get_action(key.code, key.modifiers) else {
            continue;
        };

        if !controller.handle(action)? {
            return Ok(());
        }

        match action {
            ControlAction::Next | ControlAction::Previous => {
                if let Some(score) = controller.current() {
                    print!("Selected: {}\r\n", score.title());
                }
            }
            ControlAction::ToggleLoop => {
                print!("Loop: {}\r\n", on_off(controller.player().loop_enabled()));
            }
            ControlAction::ToggleVariation => {
                print!("Variation: {}\r\n", on_off(controller.player().variation_enabled()));
            }
            _ => {}
        }
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        println!("KEYDRUM - Keyboard Drum Player");
        println!("Run with --help for usage information");
        return Ok(());
    }

    let command = args[1].as_str();
    if matches!(command, "--help" | "-h" | "help") {
        print_usage();
        return Ok(());
    }

    let options = parse_options(&args[2..])?;
    init_logging(options.verbose);

    match command {
        "play" => play(&options)?,
        "run" => run(&options)?,
        "check" => check(&options)?,
        "convert" => convert(&options)?,
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            std::process::exit(1);
        }
    }

    Ok(())
}
