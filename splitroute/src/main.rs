use exitcode::ExitCode;

use std::path::{Path, PathBuf};
use std::process;

use splitroute_lib::cidr;
use splitroute_lib::engine::{Engine, RemovalOutcome, RuleOutcome};
use splitroute_lib::logging;
use splitroute_lib::netsh::NetshSystem;
use splitroute_lib::routes;
use splitroute_lib::rule;
use splitroute_lib::state::{self, DesiredState, MetricPolicy};
use splitroute_lib::system::RoutingSystem;

mod cli;

#[tokio::main]
async fn main() {
    logging::setup_stdout();
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting {}",
        env!("CARGO_PKG_NAME")
    );

    let args = cli::parse();
    let code = match run(args).await {
        Ok(()) => exitcode::OK,
        Err(code) => code,
    };
    process::exit(code);
}

async fn run(args: cli::Cli) -> Result<(), ExitCode> {
    let state_file = resolve_state_file(args.state_file)?;
    let system = NetshSystem;
    match args.command {
        cli::Command::List => list(&system).await,
        cli::Command::Status => status(&system, &state_file).await,
        cli::Command::Apply { user, campus, rules } => {
            apply(&system, &state_file, user.zip(campus), rules).await
        }
        cli::Command::Reset => reset(&system, &state_file).await,
    }
}

fn resolve_state_file(overridden: Option<PathBuf>) -> Result<PathBuf, ExitCode> {
    match overridden {
        Some(path) => Ok(path),
        None => state::default_path().map_err(|e| {
            tracing::error!(error = %e, "cannot determine desired-state file location");
            exitcode::IOERR
        }),
    }
}

async fn list(system: &impl RoutingSystem) -> Result<(), ExitCode> {
    let interfaces = system.list_interfaces().await;
    if interfaces.is_empty() {
        eprintln!("No network interfaces found - check system settings");
        return Err(exitcode::UNAVAILABLE);
    }
    println!("Available interfaces:");
    for interface in &interfaces {
        // gateways are only worth resolving for selectable interfaces
        if interface.is_candidate() {
            let gateway = system.resolve_gateway(&interface.name).await;
            println!("  - {interface}, gateway {gateway}");
        } else {
            println!("  - {interface}, not selectable");
        }
    }
    Ok(())
}

async fn status(system: &impl RoutingSystem, state_file: &Path) -> Result<(), ExitCode> {
    match state::read(state_file) {
        Ok(state) => {
            println!("User interface:   {} (gateway {})", state.user_interface, state.user_gateway);
            println!("Campus interface: {} (gateway {})", state.campus_interface, state.campus_gateway);
            let live = match system.list_routes().await {
                Ok(entries) => Some(entries),
                Err(e) => {
                    tracing::warn!(error = %e, "cannot read live routing table");
                    None
                }
            };
            println!("Rules:");
            for rule in &state.rules {
                match &live {
                    Some(entries) => {
                        let installed = cidr::netmask(rule.prefix)
                            .is_ok_and(|netmask| routes::route_matches(entries, rule.network, netmask));
                        let marker = if installed { "installed" } else { "missing" };
                        println!("  - {rule} ({marker})");
                    }
                    None => println!("  - {rule}"),
                }
            }
            Ok(())
        }
        Err(state::Error::NoFile) => {
            println!("No desired state persisted");
            Ok(())
        }
        Err(e) => {
            eprintln!("Error reading desired state: {e}");
            Err(exitcode::IOERR)
        }
    }
}

async fn apply(
    system: &impl RoutingSystem,
    state_file: &Path,
    selection: Option<(String, String)>,
    rules_path: Option<PathBuf>,
) -> Result<(), ExitCode> {
    let state = match selection {
        Some((user, campus)) => fresh_selection(system, user, campus, rules_path).await?,
        None => persisted_selection(state_file, rules_path)?,
    };

    let report = match Engine::new(system).apply(&state).await {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Cannot apply: {e}");
            return Err(exitcode::UNAVAILABLE);
        }
    };

    for (rule, outcome) in &report.rules {
        match outcome {
            RuleOutcome::Added => println!("added      {rule}"),
            RuleOutcome::AlreadyPresent => println!("present    {rule}"),
            RuleOutcome::Failed(reason) => println!("FAILED     {rule}: {reason}"),
        }
    }

    if report.fully_applied() {
        state::write(&state, state_file).map_err(|e| {
            tracing::error!(error = %e, "failed persisting desired state");
            exitcode::IOERR
        })?;
        println!("Desired state applied and persisted");
        Ok(())
    } else {
        eprintln!("Apply finished with failures - desired state not persisted");
        Err(exitcode::TEMPFAIL)
    }
}

async fn fresh_selection(
    system: &impl RoutingSystem,
    user: String,
    campus: String,
    rules_path: Option<PathBuf>,
) -> Result<DesiredState, ExitCode> {
    let user_gateway = system.resolve_gateway(&user).await;
    let campus_gateway = system.resolve_gateway(&campus).await;
    for (name, gateway) in [(&user, user_gateway), (&campus, campus_gateway)] {
        if !gateway.is_resolved() {
            eprintln!("No default gateway found for interface '{name}' - check the connection configuration");
            return Err(exitcode::UNAVAILABLE);
        }
    }

    let rules = match rules_path {
        Some(path) => load_rules(&path)?,
        None => rule::default_rules(),
    };

    Ok(DesiredState {
        user_interface: user,
        campus_interface: campus,
        user_gateway,
        campus_gateway,
        rules,
        metric_policy: MetricPolicy::default(),
    })
}

fn persisted_selection(state_file: &Path, rules_path: Option<PathBuf>) -> Result<DesiredState, ExitCode> {
    let mut state = match state::read(state_file) {
        Ok(state) => state,
        Err(state::Error::NoFile) => {
            eprintln!("No persisted desired state - pass --user and --campus to make a selection");
            return Err(exitcode::USAGE);
        }
        Err(e) => {
            eprintln!("Error reading desired state: {e}");
            return Err(exitcode::IOERR);
        }
    };
    if let Some(path) = rules_path {
        state.rules = load_rules(&path)?;
    }
    Ok(state)
}

fn load_rules(path: &Path) -> Result<Vec<rule::Rule>, ExitCode> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        eprintln!("Cannot read rules file {}: {e}", path.display());
        exitcode::NOINPUT
    })?;
    let validated = rule::parse_rule_lines(&text);
    if !validated.all_valid() {
        eprintln!("Rules file contains invalid entries:");
        for error in &validated.errors {
            eprintln!("  - {error}");
        }
        return Err(exitcode::DATAERR);
    }
    Ok(validated.rules)
}

async fn reset(system: &impl RoutingSystem, state_file: &Path) -> Result<(), ExitCode> {
    let state = match state::read(state_file) {
        Ok(state) => state,
        Err(state::Error::NoFile) => {
            println!("No persisted desired state - nothing to reset");
            return Ok(());
        }
        Err(e) => {
            eprintln!("Error reading desired state: {e}");
            return Err(exitcode::IOERR);
        }
    };

    let report = Engine::new(system).reset(&state).await;
    for (rule, outcome) in &report.routes {
        match outcome {
            RemovalOutcome::Deleted => println!("deleted    {rule}"),
            RemovalOutcome::NotFound => println!("not found  {rule}"),
            RemovalOutcome::Failed(reason) => println!("FAILED     {rule}: {reason}"),
        }
    }

    if report.completed() {
        match state::remove(state_file) {
            Ok(()) | Err(state::Error::NoFile) => (),
            Err(e) => {
                tracing::error!(error = %e, "failed removing desired-state file");
                return Err(exitcode::IOERR);
            }
        }
        println!("Reset complete");
        Ok(())
    } else {
        eprintln!("Reset finished with failures - desired state kept for another attempt");
        Err(exitcode::TEMPFAIL)
    }
}
