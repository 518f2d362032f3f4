//! Response/accuracy verification sweep.

use crate::VerifyArgs;
use anyhow::{Context, Result};
use hdrcal_profile::CorrectionProfile;
use hdrcal_session::config::CalibrationConfig;
use hdrcal_session::display::DisplayInfo;
use hdrcal_session::session::CancelToken;
use hdrcal_session::verify::run_verification;
use std::time::Duration;
use tracing::error;

pub fn run(args: VerifyArgs) -> Result<()> {
    let mut instruments = super::open_instruments(&args.instrument)?;

    // In simulate mode an explicit profile is applied to the pipeline,
    // mirroring "verify what I just calibrated"
    if let (Some(handle), Some(path)) = (&instruments.sim_handle, &args.profile) {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading profile {}", path.display()))?;
        let profile: CorrectionProfile = serde_yaml::from_str(&text)?;
        profile.validate()?;
        handle.set_active(Some(profile));
    }

    if !args.yes && !args.instrument.simulate {
        let ok = super::confirm_on_stdin(
            "To verify unsaved calibration data, enable its preview first. \
             Size the white window over the meter and place the meter on it.",
        );
        if !ok {
            let _ = instruments.pattern.shutdown();
            let _ = instruments.meter.shutdown();
            println!("Aborted.");
            return Ok(());
        }
    }

    let mut config = CalibrationConfig::new(DisplayInfo {
        id: "verify".into(),
        name: "verify".into(),
        hdr_active: true,
    });
    if args.instrument.simulate {
        config.patch_settle = Duration::ZERO;
    }

    let result = run_verification(
        instruments.pattern.as_mut(),
        instruments.meter.as_mut(),
        &config,
        &CancelToken::new(),
    );
    // The sweep borrows the instruments; shut them down regardless of
    // how it went
    if let Err(e) = instruments.pattern.shutdown() {
        error!("pattern generator cleanup failed: {e}");
    }
    if let Err(e) = instruments.meter.shutdown() {
        error!("meter reader cleanup failed: {e}");
    }
    let report = result?;

    println!(
        "Care range: {:.2} - {:.2} cd/m2",
        report.min_care_nits, report.max_care_nits
    );
    println!(
        "Grayscale ΔE_ITP ({} samples): avg {:.2}, max {:.2}",
        report.gray.len(),
        report.gray_avg,
        report.gray_max
    );
    println!(
        "Color ΔE_ITP ({} samples): avg {:.2}, max {:.2}",
        report.colored.len(),
        report.colored_avg,
        report.colored_max
    );
    Ok(())
}
