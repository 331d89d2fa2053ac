//! Human and machine readable output
//!
//! Control panels consume integers, so the report also carries the
//! fixed-point forms: level in tenths of a dB, level fraction scaled to the
//! full `u16` range, and PoE allocation in tenths of a watt.

use serde::Serialize;
use std::fmt;

use smartip_api::model::deciwatts;
use smartip_session::{DeviceEvent, DeviceSnapshot};

/// Snapshot plus derived values; the snapshot fields serialize inline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    #[serde(flatten)]
    pub snapshot: DeviceSnapshot,
    pub level_percent: Option<f64>,
    pub panel: PanelValues,
}

/// Fixed-point values for integer-only control surfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PanelValues {
    pub level_db_tenths: Option<i16>,
    pub level_u16: Option<u16>,
    pub allocated_power_deciwatts: u16,
}

impl Report {
    pub fn from_snapshot(snapshot: &DeviceSnapshot) -> Self {
        let level_percent = snapshot.level_percent();
        Self {
            snapshot: snapshot.clone(),
            level_percent,
            panel: PanelValues {
                level_db_tenths: snapshot.level_db.map(db_tenths),
                level_u16: level_percent.map(fraction_to_u16),
                allocated_power_deciwatts: deciwatts(snapshot.allocated_power),
            },
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = &self.snapshot;
        writeln!(f, "responding: {}", snapshot.responding)?;
        writeln!(f, "power:      {}", snapshot.power_state)?;
        match (snapshot.level_db, self.level_percent) {
            (Some(db), Some(percent)) => {
                writeln!(f, "level:      {:.1} dB ({:.0}%)", db, percent * 100.0)?
            }
            _ => writeln!(f, "level:      unknown")?,
        }
        writeln!(f, "muted:      {}", snapshot.mute)?;
        writeln!(
            f,
            "poe:        {:.1} W allocated, {} class",
            snapshot.allocated_power,
            if snapshot.poe_15w { "15W" } else { "30W" }
        )
    }
}

fn db_tenths(db: f64) -> i16 {
    (db * 10.0).round().clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
}

fn fraction_to_u16(fraction: f64) -> u16 {
    (fraction * f64::from(u16::MAX))
        .round()
        .clamp(0.0, f64::from(u16::MAX)) as u16
}

/// One line per event for `watch`
pub fn describe_event(event: &DeviceEvent) -> String {
    match event {
        DeviceEvent::Responding(true) => "device is responding".to_string(),
        DeviceEvent::Responding(false) => "device stopped responding".to_string(),
        DeviceEvent::LevelDb(db) => format!("level {:.1} dB", db),
        DeviceEvent::LevelPercent(percent) => format!("level {:.0}%", percent * 100.0),
        DeviceEvent::Mute(mute) => format!("muted: {}", mute),
        DeviceEvent::DeviceInfo(info) => format!(
            "device {} ({}), firmware {}",
            info.model, info.category, info.firmware_id
        ),
        DeviceEvent::PowerState(state) => format!("power {}", state),
        DeviceEvent::Poe15W(limited) => format!("PoE 15W mode: {}", limited),
        DeviceEvent::AllocatedPower(watts) => format!("PoE allocation {:.1} W", watts),
        DeviceEvent::ProfileRestored(id) => format!("profile {} restored", id),
    }
}
