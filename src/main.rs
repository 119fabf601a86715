//! Trustgate CLI
//!
//! Usage:
//!   trustgate --simulate ticks.jsonl          # Deterministic replay
//!   trustgate --simulate - < ticks.jsonl      # Replay from stdin
//!   trustgate --interactive                   # Type readings by hand
//!   trustgate --serve                         # HTTP API server
//!   trustgate --print-config                  # Default config as TOML

use clap::Parser;
use colored::Colorize;
use serde::Deserialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use trustgate::core::{run_server, TrustEngine};
use trustgate::types::{
    AccessState, ReasonCode, SignalReading, SignalSource, TrustConfig, TrustDecision,
};
use trustgate::VERSION;

#[derive(Parser, Debug)]
#[command(
    name = "trustgate",
    version = VERSION,
    about = "Trustgate - continuous authentication trust engine",
    long_about = "Trustgate fuses face match, liveness and behavioral biometrics into one\n\
                  smoothed trust value and maps it to an access state.\n\n\
                  Modes:\n  \
                  --simulate     Replay JSON-lines ticks on a virtual clock\n  \
                  --interactive  Enter readings by hand (default)\n  \
                  --serve        HTTP API server mode\n\n\
                  States:\n  \
                  NORMAL   - Full access\n  \
                  WATCH    - Trust slipping, passive warning\n  \
                  RESTRICT - Sensitive actions blocked\n  \
                  REAUTH   - Session locked until re-authentication"
)]
struct Args {
    /// Config file (.toml or .json); defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Replay ticks from a JSON-lines file ("-" for stdin)
    #[arg(long)]
    simulate: Option<String>,

    /// Interactive mode - one tick per line from stdin
    #[arg(short, long)]
    interactive: bool,

    /// Run as HTTP API server
    #[arg(short, long)]
    serve: bool,

    /// Server address (default: 127.0.0.1:3000)
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: String,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Disable colors in output
    #[arg(long)]
    no_color: bool,

    /// Show per-source contributions
    #[arg(long)]
    verbose: bool,

    /// Print the effective config as TOML and exit
    #[arg(long)]
    print_config: bool,
}

/// One replay line. Missing sources are absent for that tick.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SimLine {
    face: Option<f64>,
    liveness: Option<f64>,
    behavior: Option<f64>,
    #[serde(default)]
    reauth: bool,
}

impl SimLine {
    fn value(&self, source: SignalSource) -> Option<f64> {
        match source {
            SignalSource::Face => self.face,
            SignalSource::Liveness => self.liveness,
            SignalSource::Behavior => self.behavior,
        }
    }
}

/// What one line of input asks for
#[derive(Debug, PartialEq)]
enum Command {
    Tick(Vec<SignalReading>),
    Reauth,
    Quit,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_tracing(if args.serve { "info" } else { "warn" });
    if args.no_color {
        colored::control::set_override(false);
    }

    let config = match &args.config {
        Some(path) => match TrustConfig::load(path) {
            Ok(config) => config,
            Err(e) => fail(&format!("Failed to load config: {}", e)),
        },
        None => TrustConfig::default(),
    };

    if args.print_config {
        match config.to_toml() {
            Ok(text) => print!("{}", text),
            Err(e) => fail(&e.to_string()),
        }
        return;
    }

    if args.serve {
        run_serve(&args, config).await;
    } else if let Some(ref input) = args.simulate {
        run_simulate(input, &args, &config);
    } else {
        // Default to interactive if no mode specified
        run_interactive(&args, &config);
    }
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn fail(message: &str) -> ! {
    eprintln!("{}", message);
    std::process::exit(1);
}

/// Replay ticks on a virtual clock: every tick line advances time by one tick period
fn run_simulate(input: &str, args: &Args, config: &TrustConfig) {
    let reader: Box<dyn BufRead> = if input == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        match File::open(input) {
            Ok(file) => Box::new(BufReader::new(file)),
            Err(e) => fail(&format!("Failed to open {}: {}", input, e)),
        }
    };

    let start = Instant::now();
    let mut now = start;
    let mut engine = match TrustEngine::new(config, start) {
        Ok(engine) => engine,
        Err(e) => fail(&e.to_string()),
    };
    let sources: Vec<SignalSource> = config.sources.keys().copied().collect();

    for (index, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => fail(&format!("Read error: {}", e)),
        };
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let sim: SimLine = match serde_json::from_str(line) {
            Ok(sim) => sim,
            Err(e) => fail(&format!("Line {}: {}", index + 1, e)),
        };

        let decision = if sim.reauth {
            engine.reauth_success(now)
        } else {
            let readings: Vec<SignalReading> = sources
                .iter()
                .map(|&source| SignalReading {
                    source,
                    value: sim.value(source),
                })
                .collect();
            let decision = engine.tick(&readings, now);
            now += config.tick_interval();
            decision
        };

        print_decision(&decision, args);
    }

    if !args.json {
        println!();
        println!(
            "Replay finished. Ticks: {} | Final state: {}",
            engine.tick_count(),
            engine.state()
        );
    }
}

/// Interactive mode: each line is one tick on the wall clock
fn run_interactive(args: &Args, config: &TrustConfig) {
    let mut engine = match TrustEngine::new(config, Instant::now()) {
        Ok(engine) => engine,
        Err(e) => fail(&e.to_string()),
    };
    let sources: Vec<SignalSource> = config.sources.keys().copied().collect();

    print_header("Interactive", args.no_color);
    println!("Enter readings like 'face=0.9 liveness=0.8 behavior=0.7' and press Enter.");
    println!("Omitted sources are absent for that tick. An empty line is a tick with no readings.");
    println!("Type 'reauth' after a successful re-authentication, 'quit' to exit.");
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{}", format_prompt(engine.state(), args.no_color));
        let _ = stdout.flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(_) => break,
        }

        let decision = match parse_command(&line, &sources) {
            Ok(Command::Quit) => {
                println!("\nSession ended. Ticks: {}", engine.tick_count());
                break;
            }
            Ok(Command::Reauth) => engine.reauth_success(Instant::now()),
            Ok(Command::Tick(readings)) => engine.tick(&readings, Instant::now()),
            Err(message) => {
                println!("{}", format!("⚠ {}", message).yellow());
                continue;
            }
        };

        print_decision(&decision, args);
    }
}

/// Parse one interactive line into a tick, a re-auth or quit
fn parse_command(line: &str, sources: &[SignalSource]) -> Result<Command, String> {
    let line = line.trim();
    if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
        return Ok(Command::Quit);
    }
    if line.eq_ignore_ascii_case("reauth") {
        return Ok(Command::Reauth);
    }

    let mut readings: Vec<SignalReading> =
        sources.iter().map(|&s| SignalReading::absent(s)).collect();

    for token in line.split_whitespace() {
        let (name, value) = token
            .split_once('=')
            .ok_or_else(|| format!("Expected source=value, got '{}'", token))?;
        let source = SignalSource::from_name(name)
            .ok_or_else(|| format!("Unknown source '{}'", name))?;
        let value = if value == "-" || value.eq_ignore_ascii_case("absent") {
            None
        } else {
            Some(
                value
                    .parse::<f64>()
                    .map_err(|_| format!("Invalid value '{}' for {}", value, name))?,
            )
        };

        match readings.iter_mut().find(|r| r.source == source) {
            Some(reading) => reading.value = value,
            None => readings.push(SignalReading { source, value }),
        }
    }

    Ok(Command::Tick(readings))
}

fn print_decision(decision: &TrustDecision, args: &Args) {
    if args.json {
        match serde_json::to_string(decision) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to encode decision: {}", e),
        }
    } else if args.verbose {
        print_verbose(decision, args.no_color);
    } else if args.no_color {
        println!("{}", decision.to_parseable_string());
    } else {
        println!("{}", decision.to_terminal_string());
        print_state_message(decision);
    }
}

/// Print header
fn print_header(mode: &str, no_color: bool) {
    let title = format!("Trustgate v{} - {}", VERSION, mode);
    if no_color {
        println!("========================================");
        println!("  {}", title);
        println!("========================================");
    } else {
        println!("{}", "╔══════════════════════════════════════╗".bold());
        println!("{}", format!("║  {:<36}║", title).bold());
        println!("{}", "╚══════════════════════════════════════╝".bold());
    }
    println!();
}

fn format_prompt(state: AccessState, no_color: bool) -> String {
    if no_color {
        format!("[{}] > ", state)
    } else {
        format!(
            "{}{} [{}]{} > ",
            state.color_code(),
            state.emoji(),
            state,
            AccessState::color_reset()
        )
    }
}

/// Print state transition messages
fn print_state_message(decision: &TrustDecision) {
    if !decision.reason.is_transition() {
        return;
    }
    match decision.reason {
        ReasonCode::R201_ENTERED_REAUTH => {
            println!("{}", "  ⚠ Re-authentication required".red());
        }
        ReasonCode::R200_DEGRADED if decision.state == AccessState::Restrict => {
            println!("{}", "  ⚠ Sensitive actions blocked".yellow());
        }
        ReasonCode::R400_REAUTH_OVERRIDE => {
            println!("{}", "  ✓ Re-authenticated, strict thresholds for the recovery window".green());
        }
        _ => {}
    }
}

fn print_verbose(decision: &TrustDecision, no_color: bool) {
    let color = if no_color { "" } else { decision.state.color_code() };
    let reset = if no_color { "" } else { AccessState::color_reset() };

    println!("{}┌─────────────────────────────────────┐{}", color, reset);
    println!(
        "{}│ #{} trust = {:.4}  (raw {:.4}){}",
        color, decision.tick, decision.trust, decision.raw_trust, reset
    );
    println!("{}├─────────────────────────────────────┤{}", color, reset);
    println!("{}│ Sources:{}", color, reset);
    for (source, value) in &decision.contributions {
        println!("{}│   {:<9} {:.4}{}", color, source.name(), value, reset);
    }
    println!("{}├─────────────────────────────────────┤{}", color, reset);
    println!(
        "{}│ State: {} (was {}) | Recovery: {}{}",
        color, decision.state, decision.previous_state, decision.recovery_active, reset
    );
    println!(
        "{}│ Reason: {} - {}{}",
        color,
        decision.reason.code(),
        decision.reason.description(),
        reset
    );
    println!("{}└─────────────────────────────────────┘{}", color, reset);
}

/// Run HTTP API server
async fn run_serve(args: &Args, config: TrustConfig) {
    println!();
    println!("{}", "Trustgate API Server".bold());
    println!("Version: {}", VERSION);
    println!();

    if let Err(e) = run_server(&args.addr, config).await {
        fail(&format!("Server error: {}", e));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quit_and_reauth() {
        let sources = SignalSource::ALL;
        assert_eq!(parse_command("quit", &sources), Ok(Command::Quit));
        assert_eq!(parse_command("  REAUTH ", &sources), Ok(Command::Reauth));
    }

    #[test]
    fn test_parse_tick_fills_absent() {
        let Ok(Command::Tick(readings)) = parse_command("face=0.9 behavior=0.7", &SignalSource::ALL)
        else {
            panic!("expected tick");
        };
        assert_eq!(readings.len(), 3);
        assert_eq!(readings[0], SignalReading::present(SignalSource::Face, 0.9));
        assert_eq!(readings[1], SignalReading::absent(SignalSource::Liveness));
        assert_eq!(readings[2], SignalReading::present(SignalSource::Behavior, 0.7));
    }

    #[test]
    fn test_parse_explicit_absent() {
        let Ok(Command::Tick(readings)) = parse_command("face=-", &SignalSource::ALL) else {
            panic!("expected tick");
        };
        assert!(readings.iter().all(|r| !r.is_present()));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_command("face", &SignalSource::ALL).is_err());
        assert!(parse_command("nose=0.5", &SignalSource::ALL).is_err());
        assert!(parse_command("face=high", &SignalSource::ALL).is_err());
    }

    #[test]
    fn test_sim_line_missing_keys_are_absent() {
        let sim: SimLine = serde_json::from_str(r#"{"face":0.9,"liveness":null}"#).unwrap();
        assert_eq!(sim.value(SignalSource::Face), Some(0.9));
        assert_eq!(sim.value(SignalSource::Liveness), None);
        assert_eq!(sim.value(SignalSource::Behavior), None);
        assert!(!sim.reauth);

        let sim: SimLine = serde_json::from_str(r#"{"reauth":true}"#).unwrap();
        assert!(sim.reauth);
    }
}
