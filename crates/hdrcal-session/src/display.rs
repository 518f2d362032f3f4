//! The OS color-directory boundary.
//!
//! Enumerating displays, installing profiles, and associating them
//! with a display are platform API calls; the session only needs the
//! two operations of [`ColorDirectory`]. Implementations live outside
//! this crate (or in [`SimulatedColorDirectory`] for the simulated
//! rig).

use hdrcal_instrument::sim::SimProfileHandle;
use hdrcal_profile::CorrectionProfile;
use std::io;
use std::path::Path;
use tracing::{debug, info};

/// A connected display, as reported by the platform layer.
#[derive(Debug, Clone)]
pub struct DisplayInfo {
    /// Stable per-display identity key.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Whether the display is currently in HDR (advanced color) mode.
    pub hdr_active: bool,
}

/// The two color-management operations the session needs.
pub trait ColorDirectory {
    /// Installs the profile file and associates it with the display.
    fn install_and_associate(
        &mut self,
        profile_path: &Path,
        display_id: &str,
        as_default: bool,
        as_hdr: bool,
    ) -> io::Result<()>;

    /// Removes a previously associated profile by name.
    fn remove_association(
        &mut self,
        profile_name: &str,
        display_id: &str,
        as_hdr: bool,
    ) -> io::Result<()>;
}

/// Logs the calls without touching the system.
///
/// Stand-in when the platform integration is handled by an external
/// tool, and for dry runs.
#[derive(Debug, Default)]
pub struct NullColorDirectory;

impl ColorDirectory for NullColorDirectory {
    fn install_and_associate(
        &mut self,
        profile_path: &Path,
        display_id: &str,
        _as_default: bool,
        _as_hdr: bool,
    ) -> io::Result<()> {
        info!(path = %profile_path.display(), display_id, "would install profile");
        Ok(())
    }

    fn remove_association(
        &mut self,
        profile_name: &str,
        display_id: &str,
        _as_hdr: bool,
    ) -> io::Result<()> {
        info!(profile_name, display_id, "would remove profile association");
        Ok(())
    }
}

/// Feeds installed profiles into a [`SimProfileHandle`], closing the
/// preview loop of the simulated rig.
pub struct SimulatedColorDirectory {
    handle: SimProfileHandle,
}

impl SimulatedColorDirectory {
    /// Wraps the rig's profile handle.
    pub fn new(handle: SimProfileHandle) -> Self {
        Self { handle }
    }
}

impl ColorDirectory for SimulatedColorDirectory {
    fn install_and_associate(
        &mut self,
        profile_path: &Path,
        _display_id: &str,
        _as_default: bool,
        _as_hdr: bool,
    ) -> io::Result<()> {
        let text = std::fs::read_to_string(profile_path)?;
        let profile: CorrectionProfile = serde_yaml::from_str(&text)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        debug!("simulated pipeline loaded profile");
        self.handle.set_active(Some(profile));
        Ok(())
    }

    fn remove_association(
        &mut self,
        _profile_name: &str,
        _display_id: &str,
        _as_hdr: bool,
    ) -> io::Result<()> {
        self.handle.set_active(None);
        Ok(())
    }
}
