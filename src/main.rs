use clap::Parser;
use dialoguer::Select;
use lookaheadrs::{
    cli::{validate_device, Args},
    clock::shared_clock_factory,
    create_scheduler, demo, handle_device_list,
    instrument::LogLoader,
    logging,
    midi_output::MidiLoader,
    ui::PositionDisplay,
    ClockSource, InstrumentLoader, Session, Settings, SystemClock,
};
use simplelog::LevelFilter;
use std::sync::Arc;
use std::time::{Duration, Instant};
use std::{process, thread};

const DISPLAY_REFRESH: Duration = Duration::from_millis(50);

fn main() {
    let args = parse_command_line_arguments();
    initialize_logging(&args);

    if args.list_devices {
        list_available_devices(&handle_device_list());
        return;
    }

    let settings = load_settings(&args);
    let clock: Arc<dyn ClockSource> = Arc::new(SystemClock::new());
    let loader = create_loader(&args, &settings, clock.clone());

    let mut session = create_session(&settings, clock, loader);
    load_demo_phrase(&mut session);

    session.start();
    run_position_display(&session, args.duration.map(Duration::from_secs));
    session.stop();
    log::info!("Application exiting");
}

fn parse_command_line_arguments() -> Args {
    Args::parse()
}

fn initialize_logging(args: &Args) {
    let terminal_level = if args.verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };
    if let Err(e) = logging::init_logger(terminal_level) {
        eprintln!("Logger initialization failed: {}", e);
    }
    log::info!("Application starting");
}

fn exit_with_error(message: &str) -> ! {
    log::error!("{}", message);
    eprintln!("{}", message);
    process::exit(1);
}

fn list_available_devices(devices: &[String]) {
    println!("Available MIDI output devices:");
    for device in devices {
        println!("  - {}", device);
    }
}

fn load_settings(args: &Args) -> Settings {
    let mut settings = match Settings::load(args.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => exit_with_error(&format!("Error loading settings: {}", e)),
    };
    args.apply_to(&mut settings);
    if let Err(e) = settings.validate() {
        exit_with_error(&format!("Invalid settings: {}", e));
    }
    settings
}

fn select_output_device(devices: &[String]) -> Option<String> {
    if devices.is_empty() {
        return None;
    }
    Select::new()
        .with_prompt("MIDI output device")
        .items(devices)
        .default(0)
        .interact_opt()
        .ok()
        .flatten()
        .map(|index| devices[index].clone())
}

fn create_loader(
    args: &Args,
    settings: &Settings,
    clock: Arc<dyn ClockSource>,
) -> Arc<dyn InstrumentLoader> {
    if args.dry_run {
        log::info!("Dry run, dispatches are logged only");
        return Arc::new(LogLoader);
    }

    let devices = handle_device_list();
    let device = if args.select_output {
        select_output_device(&devices)
    } else {
        settings.midi_output.clone()
    };

    if let Some(device_name) = &device {
        if let Err(error_msg) = validate_device(device_name, &devices) {
            exit_with_error(&error_msg);
        }
    }

    match MidiLoader::connect(device.as_deref(), clock) {
        Ok(loader) => Arc::new(loader),
        Err(e) => exit_with_error(&format!("Error connecting to MIDI output: {}", e)),
    }
}

fn create_session(
    settings: &Settings,
    clock: Arc<dyn ClockSource>,
    loader: Arc<dyn InstrumentLoader>,
) -> Session {
    let result = Session::builder("demo", settings.tempo)
        .lookahead(settings.lookahead)
        .instruments(settings.instruments.iter().cloned())
        .clock_factory(shared_clock_factory(clock))
        .build(loader, &create_scheduler());
    match result {
        Ok(session) => session,
        Err(e) => exit_with_error(&format!("Error creating session: {}", e)),
    }
}

fn load_demo_phrase(session: &mut Session) {
    for track_index in 0..session.track_count() {
        let notes = match demo::demo_phrase(track_index) {
            Ok(notes) => notes,
            Err(e) => exit_with_error(&format!("Invalid demo phrase: {}", e)),
        };
        for note in notes {
            if let Err(e) = session.add_note(track_index, note) {
                log::warn!("Skipping demo note: {}", e);
            }
        }
    }
}

fn run_position_display(session: &Session, duration: Option<Duration>) {
    let display = PositionDisplay::new();
    let started = Instant::now();
    match duration {
        Some(limit) => log::info!("Application running for {}s", limit.as_secs()),
        None => log::warn!(
            "Running until interrupted; pass --duration to stop cleanly and release held notes"
        ),
    }
    while duration.map_or(true, |limit| started.elapsed() < limit) {
        display.update(session);
        thread::sleep(DISPLAY_REFRESH);
    }
    display.finish();
}
