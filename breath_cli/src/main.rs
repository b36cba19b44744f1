mod host;

use breath_core::*;
use clap::{Parser, Subcommand};
use host::TerminalHost;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "breathe")]
#[command(about = "Guided breathing exercises", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON catalog replacing the built-in exercises
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List available exercises
    List,

    /// Print the offline cue schedule of an exercise
    Schedule {
        /// Exercise id or index
        exercise: String,

        /// Passes over the sequence (default from config)
        #[arg(long)]
        loops: Option<u32>,

        /// Leading silence in seconds (default from config)
        #[arg(long)]
        delay: Option<f64>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print the total length of an exercise
    Duration {
        /// Exercise id or index
        exercise: String,

        #[arg(long)]
        loops: Option<u32>,
    },

    /// Run an exercise live in the terminal
    Run {
        /// Exercise id or index (default: last selected)
        exercise: Option<String>,

        /// Stop after this many passes over the sequence
        #[arg(long, default_value_t = 1)]
        loops: u32,

        /// Real-time multiplier; 0 runs without sleeping
        #[arg(long, default_value_t = 1.0)]
        speed: f64,

        /// Advance open-ended steps after this many seconds
        #[arg(long, default_value_t = 5.0)]
        tap_after: f64,
    },

    /// Move the persisted selection to another exercise
    Next {
        /// Offset in the exercise list, may be negative
        #[arg(long, default_value_t = 1, allow_hyphen_values = true)]
        delta: i32,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    breath_core::logging::init_with_level(if cli.verbose { "debug" } else { "warn" });

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(path) = cli.catalog {
        config.exercises.file = Some(path);
    }
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let catalog = Catalog::from_config(&config)?;

    match cli.command {
        Commands::List => cmd_list(&catalog, &config),
        Commands::Schedule {
            exercise,
            loops,
            delay,
            json,
        } => cmd_schedule(
            &catalog,
            &exercise,
            loops.unwrap_or(config.render.loops),
            delay.unwrap_or(config.render.delay_seconds),
            json,
        ),
        Commands::Duration { exercise, loops } => {
            cmd_duration(&catalog, &exercise, loops.unwrap_or(config.render.loops))
        }
        Commands::Run {
            exercise,
            loops,
            speed,
            tap_after,
        } => {
            let host = TerminalHost::new(SelectionState::path_in(&data_dir), &config)?;
            cmd_run(catalog, host, &config, exercise, loops, speed, tap_after)
        }
        Commands::Next { delta } => {
            let host = TerminalHost::new(SelectionState::path_in(&data_dir), &config)?;
            cmd_next(catalog, host, delta)
        }
    }
}

fn format_secs(secs: f64) -> String {
    let whole = secs.round() as u64;
    format!("{}:{:02}", whole / 60, whole % 60)
}

fn cmd_list(catalog: &Catalog, config: &Config) -> Result<()> {
    for (index, exercise) in catalog.exercises.iter().enumerate() {
        let length = if is_offline_eligible(exercise) {
            format_secs(calculate_exercise_duration(exercise, config.render.loops))
        } else {
            "open".to_string()
        };
        println!(
            "{:>3}  {:<12} {:<28} {:>6}{}",
            index,
            exercise.id,
            exercise.name,
            length,
            if exercise.loopable { "  (loops)" } else { "" }
        );
    }
    Ok(())
}

fn cmd_schedule(
    catalog: &Catalog,
    query: &str,
    loops: u32,
    delay: f64,
    json: bool,
) -> Result<()> {
    let (_, exercise) = catalog.find(query)?;
    if !is_offline_eligible(exercise) {
        return Err(Error::NotRenderable(exercise.id.clone()));
    }
    let schedule = build_playback_schedule(exercise, loops, delay);

    if json {
        println!("{}", serde_json::to_string_pretty(&schedule)?);
        return Ok(());
    }
    for event in &schedule.events {
        println!(
            "{:>8.1}s  {:<7} {:.1}s",
            event.time, event.cue, event.duration
        );
    }
    println!(
        "total {:.1}s ({}), {} cues",
        schedule.total_duration,
        format_secs(schedule.total_duration),
        schedule.events.len()
    );
    Ok(())
}

fn cmd_duration(catalog: &Catalog, query: &str, loops: u32) -> Result<()> {
    let (_, exercise) = catalog.find(query)?;
    let total = calculate_exercise_duration(exercise, loops);
    println!(
        "{}: {:.1}s ({}) for {} loop(s)",
        exercise.name,
        total,
        format_secs(total),
        loops
    );
    if !is_offline_eligible(exercise) {
        println!("note: open-ended steps are counted once");
    }
    Ok(())
}

fn print_lines(engine: &mut Engine<TerminalHost>) {
    let secs = engine.clock_ms() as f64 / 1000.0;
    for line in engine.port_mut().take_lines() {
        println!("{:>7.1}s  {}", secs, line);
    }
}

fn cmd_run(
    catalog: Catalog,
    host: TerminalHost,
    config: &Config,
    query: Option<String>,
    loops: u32,
    speed: f64,
    tap_after: f64,
) -> Result<()> {
    let target = match &query {
        Some(q) => Some(catalog.find(q)?.0),
        None => None,
    };
    let tick_ms = config.playback.tick_interval_ms;
    let tap_after_ms = (tap_after.max(0.0) * 1000.0).round() as u64;

    let mut engine = Engine::new(catalog.exercises, host);
    match target {
        Some(index) => engine.set_exercise(index)?,
        None => engine.start(),
    }
    println!("{} ({} loop(s))", engine.exercise_name(), loops);
    print_lines(&mut engine);

    let mut open_since: Option<u64> = None;
    loop {
        if !engine.is_started() || !engine.is_active() {
            eprintln!("Exercise stopped: nothing left to time");
            break;
        }
        if speed > 0.0 {
            std::thread::sleep(Duration::from_secs_f64(tick_ms as f64 / 1000.0 / speed));
        }
        engine.tick(tick_ms);
        if engine.sequence_loop() >= loops {
            break;
        }

        if engine.can_advance() {
            let since = *open_since.get_or_insert(engine.clock_ms());
            if engine.clock_ms() - since >= tap_after_ms {
                print_lines(&mut engine);
                println!("{:>7.1}s  (tap)", engine.clock_ms() as f64 / 1000.0);
                engine.advance();
                open_since = None;
            }
        } else {
            open_since = None;
        }
        print_lines(&mut engine);
    }

    println!("done after {:.1}s", engine.clock_ms() as f64 / 1000.0);
    engine.destroy();
    Ok(())
}

fn cmd_next(catalog: Catalog, host: TerminalHost, delta: i32) -> Result<()> {
    if catalog.exercises.is_empty() {
        return Err(Error::UnknownExercise("catalog is empty".into()));
    }
    let mut engine = Engine::new(catalog.exercises, host);
    engine.next_exercise(delta);
    println!(
        "Selected {}: {}",
        engine.exercise_index(),
        engine.exercise_name()
    );
    Ok(())
}
