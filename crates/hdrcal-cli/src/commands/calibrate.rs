//! Full calibration run.

use crate::CalibrateArgs;
use anyhow::{Result, bail};
use hdrcal_session::config::{CalibrationConfig, TargetColorSpace};
use hdrcal_session::display::{DisplayInfo, NullColorDirectory, SimulatedColorDirectory};
use hdrcal_session::session::{CalibrationSession, SessionPrompt};
use hdrcal_profile::YamlProfileStore;
use tracing::info;

pub fn run(args: CalibrateArgs) -> Result<()> {
    let color_space = match args.color_space.as_str() {
        "srgb" => TargetColorSpace::Srgb,
        "srgb-p3" => TargetColorSpace::SrgbAndDisplayP3,
        other => bail!("unknown color space {other:?} (expected srgb or srgb-p3)"),
    };

    let display = DisplayInfo {
        id: args.display_id.clone(),
        name: args.display_id.clone(),
        // The platform layer reports HDR state; the simulated panel is
        // always in HDR mode, a real run trusts the caller's display
        // selection
        hdr_active: true,
    };
    let mut config = CalibrationConfig::new(display);
    config.pq_points = args.pq_points;
    config.color_space = color_space;
    config.bright_mode = args.bright;

    let instruments = super::open_instruments(&args.instrument)?;
    let store = YamlProfileStore::open_or_seed(&args.profile, config.lut_entries)?;

    let directory: Box<dyn hdrcal_session::display::ColorDirectory> =
        match &instruments.sim_handle {
            Some(handle) => Box::new(SimulatedColorDirectory::new(handle.clone())),
            None => Box::new(NullColorDirectory),
        };

    let mut session = CalibrationSession::new(
        config,
        instruments.pattern,
        instruments.meter,
        Box::new(store),
        directory,
    )?;
    if !args.yes && !args.instrument.simulate {
        session = session.with_prompt(Box::new(|prompt| match prompt {
            SessionPrompt::PlaceInstrument => super::confirm_on_stdin(
                "Move the white window onto the display being calibrated, \
                 size it to fully cover the meter, then place the meter on it.",
            ),
            SessionPrompt::CalibrateInstrument => super::confirm_on_stdin(
                "The instrument needs a white-reference calibration. \
                 Place it on its calibration tile.",
            ),
        }));
    }

    let outcome = session.run()?;
    info!(path = %args.profile.display(), "profile written");
    println!("Calibration complete.");
    println!(
        "  Peak luminance: {:.1} cd/m2, black: {:.4} cd/m2",
        outcome.profile.peak_luminance, outcome.profile.min_luminance
    );
    println!("  Profile record: {}", args.profile.display());
    Ok(())
}
