use std::io::{BufRead, Write};

use clap::Subcommand;
use focusloop_core::{
    Config, Database, DispatchReport, Event, OutcomeDispatcher, Phase, ProgressBackend,
    SessionMachine, SessionState, TokenSelector, UniformSelector,
};

/// Key under which the serialized session machine lives in the kv table.
const MACHINE_KEY: &str = "session_machine";

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start the countdown (resumes if paused)
    Start {
        /// Book the next focus interval against this task id
        #[arg(long)]
        task: Option<String>,
    },
    /// Start and drive the countdown in the foreground until the phase ends
    Run {
        /// Book the next focus interval against this task id
        #[arg(long)]
        task: Option<String>,
    },
    /// Freeze the countdown
    Pause,
    /// Continue a paused countdown
    Resume,
    /// Abandon the current focus attempt, recording elapsed whole minutes
    Interrupt,
    /// Acknowledge a pending reward and move on to the break
    Ack,
    /// Print the current session state as JSON
    Status,
    /// Discard the session and return to a fresh focus interval
    Reset,
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    // The remote backend blocks on this runtime from synchronous code.
    let rt = tokio::runtime::Runtime::new()?;
    let _guard = rt.enter();

    let config = Config::load_or_default();
    let db = Database::open()?;
    let mut machine = load_machine(&db, &config);

    match action {
        TimerAction::Start { task } => {
            if task.is_some() {
                machine.select_task(task);
            }
            match machine.start()? {
                Some(event) => print_event(&event)?,
                None => print_event(&machine.snapshot())?,
            }
            save_machine(&db, &machine)
        }
        TimerAction::Run { task } => {
            if task.is_some() {
                machine.select_task(task);
            }
            run_foreground(&db, &config, &mut machine)
        }
        TimerAction::Pause => {
            match machine.pause() {
                Some(event) => print_event(&event)?,
                None => print_event(&machine.snapshot())?,
            }
            save_machine(&db, &machine)
        }
        TimerAction::Resume => {
            match machine.resume() {
                Some(event) => print_event(&event)?,
                None => print_event(&machine.snapshot())?,
            }
            save_machine(&db, &machine)
        }
        TimerAction::Interrupt => {
            let mut dispatcher = build_dispatcher(&config)?;
            match dispatcher.handle_interrupt(&mut machine) {
                Some(report) => print_report(&report)?,
                None => eprintln!("warning: no focus attempt to interrupt"),
            }
            save_machine(&db, &machine)
        }
        TimerAction::Ack => {
            let dispatcher = build_dispatcher(&config)?;
            match dispatcher.acknowledge(&mut machine) {
                Some(event) => print_event(&event)?,
                None => eprintln!("warning: no outcome waiting for acknowledgment"),
            }
            save_machine(&db, &machine)
        }
        TimerAction::Status => print_event(&machine.snapshot()),
        TimerAction::Reset => {
            if let Some(event) = machine.reset() {
                print_event(&event)?;
            }
            save_machine(&db, &machine)
        }
    }
}

/// Drive the machine at one tick per wall-clock second until the phase
/// completes, then walk the outcome flow inline: dispatch, show the drawn
/// token, wait for Enter, acknowledge.
fn run_foreground(
    db: &Database,
    config: &Config,
    machine: &mut SessionMachine,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(event) = machine.start()? {
        print_event(&event)?;
    }
    save_machine(db, machine)?;
    if machine.state() != SessionState::Running {
        eprintln!("warning: session is not runnable right now");
        return print_event(&machine.snapshot());
    }
    let phase = machine.phase();
    let token = machine.tick_token();

    loop {
        std::thread::sleep(std::time::Duration::from_secs(1));
        let completed = machine.tick(token);
        print!("\r{:>4}s remaining ", machine.remaining_secs());
        std::io::stdout().flush()?;
        if let Some(event) = completed {
            println!();
            print_event(&event)?;
            save_machine(db, machine)?;
            break;
        }
    }

    if phase == Phase::Focus {
        let mut dispatcher = build_dispatcher(config)?;
        if let Some(report) = dispatcher.handle_focus_complete(machine) {
            print_report(&report)?;
            save_machine(db, machine)?;
            if report.needs_ack {
                println!("press Enter to acknowledge and start the break");
                let mut line = String::new();
                std::io::stdin().lock().read_line(&mut line)?;
                if let Some(event) = dispatcher.acknowledge(machine) {
                    print_event(&event)?;
                }
            }
        }
        save_machine(db, machine)?;
    }
    Ok(())
}

fn build_dispatcher(
    config: &Config,
) -> Result<OutcomeDispatcher<Box<dyn ProgressBackend>, impl TokenSelector>, Box<dyn std::error::Error>>
{
    Ok(OutcomeDispatcher::new(
        super::open_backend(config)?,
        UniformSelector::from_entropy(),
        config.incentives.clone(),
    ))
}

fn load_machine(db: &Database, config: &Config) -> SessionMachine {
    if let Ok(Some(json)) = db.kv_get(MACHINE_KEY) {
        match serde_json::from_str(&json) {
            Ok(machine) => return machine,
            Err(e) => eprintln!("warning: discarding saved session state: {e}"),
        }
    }
    SessionMachine::new(config.session_settings())
}

fn save_machine(db: &Database, machine: &SessionMachine) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string(machine)?;
    db.kv_set(MACHINE_KEY, &json)?;
    Ok(())
}

fn print_event(event: &Event) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(event)?);
    Ok(())
}

fn print_report(report: &DispatchReport) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}
