use anyhow::{bail, Context, Result};
use std::time::Duration;

use smartip_session::{DeviceEvent, SessionEngine};

use crate::report::{self, Report};
use crate::{Args, Command};

pub fn run(session: &SessionEngine, args: &Args) -> Result<()> {
    let timeout = args.timeout_duration();

    match &args.command {
        Command::Info => {
            accepted(session.poll_device_info(), "device info poll")?;
            drain(session, timeout)?;
            let info = session
                .device_info()
                .context("Device did not return its identity")?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Command::Status { json } => {
            accepted(session.poll_power_and_audio(), "status poll")?;
            drain(session, timeout)?;
            // Audio follow-up is queued behind the first marker
            drain(session, timeout)?;
            let report = Report::from_snapshot(&session.snapshot());
            if *json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report);
            }
        }
        Command::Volume { level, percent } => {
            let queued = if *percent {
                session.set_volume_percent(*level)
            } else {
                session.set_volume_db(*level)
            };
            accepted(queued, "volume change")?;
            drain(session, timeout)?;
            confirm(session, "volume")?;
        }
        Command::Mute => {
            accepted(session.set_mute(true), "mute")?;
            drain(session, timeout)?;
            confirm(session, "mute")?;
        }
        Command::Unmute => {
            accepted(session.set_mute(false), "unmute")?;
            drain(session, timeout)?;
            confirm(session, "unmute")?;
        }
        Command::ToggleMute => {
            // Learn the current flag first so the toggle has a reference
            accepted(session.poll_power_and_audio(), "status poll")?;
            drain(session, timeout)?;
            drain(session, timeout)?;
            accepted(session.toggle_mute(), "mute toggle")?;
            drain(session, timeout)?;
            confirm(session, "mute toggle")?;
            println!("muted: {}", session.mute());
        }
        Command::Power { state } => {
            accepted(session.set_power(*state), "power change")?;
            drain(session, timeout)?;
            confirm(session, "power change")?;
            println!("power: {}", session.power_state());
        }
        Command::Profile { id, startup } => {
            let events = session.subscribe();
            accepted(session.restore_profile(*id, *startup), "profile restore")?;
            drain(session, timeout)?;
            if !events
                .try_iter()
                .any(|event| event == DeviceEvent::ProfileRestored(*id))
            {
                bail!("Device did not accept profile {}", id);
            }
            println!("profile {} restored", id);
        }
        Command::Get { path } => {
            let body = session.custom_get(path.as_str())?.wait_timeout(timeout)?;
            println!("{}", body);
        }
        Command::Put { path, body } => {
            session
                .custom_put(path.as_str(), body.as_str())?
                .wait_timeout(timeout)?;
            println!("ok");
        }
        Command::Watch { interval_ms, count } => watch(session, *interval_ms, *count)?,
    }

    Ok(())
}

fn watch(session: &SessionEngine, interval_ms: u64, count: Option<usize>) -> Result<()> {
    let events = session.subscribe();
    session.poll_device_info();
    session.start_polling_every(Duration::from_millis(interval_ms))?;

    let limit = count.unwrap_or(usize::MAX);
    for event in events.take(limit) {
        println!("{}", report::describe_event(&event));
    }

    session.stop_polling();
    Ok(())
}

fn accepted(queued: bool, what: &str) -> Result<()> {
    if !queued {
        bail!("The session refused the {}", what);
    }
    Ok(())
}

/// Wait until every command queued so far has run
fn drain(session: &SessionEngine, timeout: Duration) -> Result<()> {
    session
        .flush()?
        .wait_timeout(timeout)
        .context("Timed out waiting for the device")
}

fn confirm(session: &SessionEngine, what: &str) -> Result<()> {
    if !session.is_responding() {
        bail!("Device did not answer the {}", what);
    }
    Ok(())
}
