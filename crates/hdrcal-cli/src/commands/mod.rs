//! Subcommand implementations.

pub mod calibrate;
pub mod profile;
pub mod verify;

use crate::InstrumentArgs;
use anyhow::Result;
use hdrcal_instrument::process::{ProcessColorimeter, ProcessPatternGenerator};
use hdrcal_instrument::sim::{SimProfileHandle, SimulatedPanel, SimulatedRig};
use hdrcal_instrument::{Colorimeter, PatternGenerator, PatternMode};
use std::io::Write;

/// The instrument pair plus, in simulate mode, the pipeline hook.
pub struct Instruments {
    pub pattern: Box<dyn PatternGenerator>,
    pub meter: Box<dyn Colorimeter>,
    pub sim_handle: Option<SimProfileHandle>,
}

/// Spawns real process-backed instruments or the simulated rig.
pub fn open_instruments(args: &InstrumentArgs) -> Result<Instruments> {
    if args.simulate {
        let rig = SimulatedRig::new(SimulatedPanel::default());
        let (pattern, meter) = rig.split();
        return Ok(Instruments {
            pattern: Box::new(pattern),
            meter: Box::new(meter),
            sim_handle: Some(rig.profile_handle()),
        });
    }
    let pattern = ProcessPatternGenerator::spawn(&args.pattern_cmd, PatternMode::Hdr10)?;
    let meter = ProcessColorimeter::spawn(&args.meter_cmd, &args.meter_args)?;
    Ok(Instruments {
        pattern: Box::new(pattern),
        meter: Box::new(meter),
        sim_handle: None,
    })
}

/// Interactive yes/no prompt on stdin; anything but `q` confirms.
pub fn confirm_on_stdin(message: &str) -> bool {
    print!("{message} [Enter to continue, q to abort] ");
    let _ = std::io::stdout().flush();
    let mut line = String::new();
    if std::io::stdin().read_line(&mut line).is_err() {
        return false;
    }
    !line.trim().eq_ignore_ascii_case("q")
}
