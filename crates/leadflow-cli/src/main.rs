use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Duration, TimeZone, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use leadflow_core::app::{LeadMachineBuilder, TimerSweeper, TransitionRequest};
use leadflow_core::domain::{
    Lead, LeadEventType, LeadId, LeadState, TeamId, allowed_next_states, describe_allowed,
    is_valid_transition, valid_transitions,
};
use leadflow_core::impls::{BroadcastEventSink, InMemoryLeadStore};
use leadflow_core::ports::FixedClock;
use leadflow_core::{LeadError, LeadMachineConfig};

#[derive(Debug, Parser)]
#[command(name = "leadflow", about = "Canonical lead state machine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the transition table.
    Table,

    /// Check whether one transition is allowed.
    Check { from: LeadState, to: LeadState },

    /// Walk a lead through its lifecycle on a manual clock, with the timers firing.
    Simulate {
        /// TOML config; defaults apply when the file is missing.
        #[arg(long, default_value = "leadflow.toml")]
        config: PathBuf,

        /// Print the audit trail as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Table => print_table(),
        Command::Check { from, to } => check(from, to),
        Command::Simulate { config, json } => simulate(config, json).await?,
    }
    Ok(())
}

fn print_table() {
    for state in LeadState::ALL {
        println!(
            "{:<20} -> {}",
            state.as_str(),
            describe_allowed(allowed_next_states(state))
        );
    }
}

fn check(from: LeadState, to: LeadState) {
    if is_valid_transition(from, to) {
        println!("ok: {from} -> {to}");
    } else {
        let err = LeadError::InvalidTransition {
            from,
            to,
            allowed: valid_transitions(from),
        };
        println!("rejected: {err}");
    }
}

async fn simulate(config_path: PathBuf, json: bool) -> Result<()> {
    let config = LeadMachineConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    tracing::info!(path = %config_path.display(), ?config, "simulation config");

    let start = Utc
        .with_ymd_and_hms(2024, 1, 1, 9, 0, 0)
        .single()
        .context("invalid simulation start time")?;
    let clock = FixedClock::new(start);
    let store = InMemoryLeadStore::new();
    let sink = BroadcastEventSink::new(32);
    let mut updates = sink.subscribe();

    let machine = LeadMachineBuilder::new()
        .store(store.clone())
        .clock(clock.clone())
        .event_sink(sink)
        .config(config.clone())
        .build()?;
    let sweeper = TimerSweeper::new(machine.clone());

    let lead = Lead::new(LeadId::random(), TeamId::random(), start);
    let (lead_id, team_id) = (lead.id, lead.team_id);
    store.insert_lead(lead).await;

    machine
        .transition(
            TransitionRequest::new(lead_id, team_id, LeadState::Touched)
                .source("outbound-sms")
                .event_type(LeadEventType::SmsSent),
        )
        .await?;
    println!("timers: {:?}", machine.timer_stats().await?);

    clock.advance(Duration::days(i64::from(config.retarget_after_days)));
    println!("day {}: {:?}", config.retarget_after_days, sweeper.run_once().await?);

    let escalate_gap = config.escalate_after_days - config.retarget_after_days;
    clock.advance(Duration::days(i64::from(escalate_gap)));
    println!("day {}: {:?}", config.escalate_after_days, sweeper.run_once().await?);

    machine
        .transition(
            TransitionRequest::new(lead_id, team_id, LeadState::Responded)
                .source("inbound-sms")
                .event_type(LeadEventType::SmsReceived),
        )
        .await?;
    machine
        .transition(
            TransitionRequest::new(lead_id, team_id, LeadState::Closed)
                .triggered_by("operator")
                .event_type(LeadEventType::DealClosed),
        )
        .await?;

    if let Err(e) = machine
        .transition(TransitionRequest::new(lead_id, team_id, LeadState::Touched))
        .await
    {
        println!("reopen attempt: {e}");
    }

    let trail = machine.audit_trail(lead_id).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&trail)?);
    } else {
        for entry in trail.iter().rev() {
            println!(
                "{}  {:<16} {:<14} {}",
                entry.timestamp.format("%Y-%m-%d %H:%M"),
                entry.event_type,
                entry.source,
                entry.state_change.as_deref().unwrap_or("-")
            );
        }
    }

    let verification = machine.verify_lead_state(lead_id, team_id).await?;
    println!(
        "final state: {} (log agrees: {})",
        verification.stored_state, verification.is_valid
    );
    println!("timers: {:?}", machine.timer_stats().await?);

    let mut published = 0;
    while updates.try_recv().is_ok() {
        published += 1;
    }
    println!("notifications published: {published}");
    Ok(())
}
