//! Profile record inspection and creation.

use crate::{ProfileArgs, ProfileAction};
use anyhow::{Context, Result, bail};
use hdrcal_profile::CorrectionProfile;

pub fn run(args: ProfileArgs) -> Result<()> {
    match args.action {
        ProfileAction::Show { path } => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let profile: CorrectionProfile = serde_yaml::from_str(&text)?;
            profile.validate()?;

            println!("Profile: {}", path.display());
            println!("  LUT entries:    {}", profile.entry_count);
            println!("  Peak luminance: {:.2} cd/m2", profile.peak_luminance);
            println!("  Min luminance:  {:.4} cd/m2", profile.min_luminance);
            println!("  Matrix:");
            let m = profile.matrix();
            for row in 0..3 {
                println!(
                    "    [{:>10.6} {:>10.6} {:>10.6}]",
                    m[row][0], m[row][1], m[row][2]
                );
            }
            for (name, lut) in [
                ("red", &profile.red_lut),
                ("green", &profile.green_lut),
                ("blue", &profile.blue_lut),
            ] {
                let decreases = lut.windows(2).filter(|w| w[1] < w[0]).count();
                println!(
                    "  {name:5} LUT: [{:.4} .. {:.4}]{}",
                    lut.first().copied().unwrap_or(0.0),
                    lut.last().copied().unwrap_or(0.0),
                    if decreases > 0 {
                        format!(" ({decreases} non-monotonic steps)")
                    } else {
                        String::new()
                    }
                );
            }
            Ok(())
        }
        ProfileAction::Init { path, entries } => {
            if entries < 2 {
                bail!("entries must be >= 2");
            }
            if path.exists() {
                bail!("{} already exists", path.display());
            }
            let profile = CorrectionProfile::identity(entries);
            std::fs::write(&path, serde_yaml::to_string(&profile)?)?;
            println!("Wrote identity profile to {}", path.display());
            Ok(())
        }
    }
}
