//! # hdrcal-profile
//!
//! The correction-profile record and its store abstraction.
//!
//! A [`CorrectionProfile`] is the aggregate calibration result: a 3x3
//! XYZ correction matrix plus three per-channel PQ correction LUTs,
//! together with the luminance metadata a display pipeline needs. The
//! byte-level ICC container that ships this record to the OS is an
//! external collaborator; this crate only defines the record and the
//! `read`/`write`/`save` contract ([`ProfileStore`]) the calibration
//! session drives.
//!
//! The session uses a read-modify-write pattern: every sub-stage reads
//! the current profile, updates one field, and immediately persists it
//! so the live preview stays in sync with measurement.
//!
//! # Usage
//!
//! ```rust
//! use hdrcal_profile::{CorrectionProfile, MemoryProfileStore, ProfileStore};
//!
//! let mut store = MemoryProfileStore::new(CorrectionProfile::identity(4096));
//! let mut profile = store.read().unwrap();
//! profile.peak_luminance = 780.0;
//! store.write(&profile).unwrap();
//! assert_eq!(store.read().unwrap().peak_luminance, 780.0);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

use hdrcal_math::Mat3;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for profile operations.
pub type ProfileResult<T> = Result<T, ProfileError>;

/// Errors from profile validation and persistence.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// Structural validation failed.
    #[error("invalid profile: {0}")]
    Invalid(String),

    /// I/O error from the backing store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error from the backing store.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_yaml::Error),
}

/// The aggregate calibration result (MHC2 record).
///
/// Matrix entries are row-major; LUT entries map an intended PQ code
/// (index `i / (entry_count - 1)`) to the corrected PQ code to send to
/// the device. Luminances are absolute cd/m².
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionProfile {
    /// Entries per LUT channel.
    pub entry_count: usize,
    /// Minimum (black) luminance, cd/m².
    pub min_luminance: f64,
    /// Peak luminance, cd/m².
    pub peak_luminance: f64,
    /// Row-major 3x3 XYZ correction matrix.
    pub matrix: [f64; 9],
    /// Red channel PQ correction LUT.
    pub red_lut: Vec<f64>,
    /// Green channel PQ correction LUT.
    pub green_lut: Vec<f64>,
    /// Blue channel PQ correction LUT.
    pub blue_lut: Vec<f64>,
}

impl CorrectionProfile {
    /// A do-nothing profile: identity matrix, identity ramps.
    ///
    /// Fresh calibrations start here so the first measurement pass
    /// sees the uncorrected panel.
    pub fn identity(entries: usize) -> Self {
        let ramp: Vec<f64> = (0..entries)
            .map(|i| i as f64 / (entries - 1) as f64)
            .collect();
        Self {
            entry_count: entries,
            min_luminance: 0.0,
            peak_luminance: 0.0,
            matrix: Mat3::IDENTITY.to_flat(),
            red_lut: ramp.clone(),
            green_lut: ramp.clone(),
            blue_lut: ramp,
        }
    }

    /// The correction matrix as a [`Mat3`].
    #[inline]
    pub fn matrix(&self) -> Mat3 {
        Mat3::from_flat(self.matrix)
    }

    /// Replaces the correction matrix.
    #[inline]
    pub fn set_matrix(&mut self, m: Mat3) {
        self.matrix = m.to_flat();
    }

    /// Replaces all three LUT channels and the entry count.
    pub fn set_luts(&mut self, red: Vec<f64>, green: Vec<f64>, blue: Vec<f64>) {
        self.entry_count = red.len();
        self.red_lut = red;
        self.green_lut = green;
        self.blue_lut = blue;
    }

    /// Structural validation.
    ///
    /// Checks channel lengths against `entry_count` (>= 2), matrix
    /// finiteness, and LUT entry ranges; run before persisting so a
    /// malformed record never reaches the display pipeline.
    pub fn validate(&self) -> ProfileResult<()> {
        if self.entry_count < 2 {
            return Err(ProfileError::Invalid(format!(
                "entry_count must be >= 2, got {}",
                self.entry_count
            )));
        }
        for (name, lut) in [
            ("red_lut", &self.red_lut),
            ("green_lut", &self.green_lut),
            ("blue_lut", &self.blue_lut),
        ] {
            if lut.len() != self.entry_count {
                return Err(ProfileError::Invalid(format!(
                    "{name} has {} entries, expected {}",
                    lut.len(),
                    self.entry_count
                )));
            }
            if lut.iter().any(|v| !v.is_finite() || *v < 0.0 || *v > 1.0) {
                return Err(ProfileError::Invalid(format!(
                    "{name} contains an out-of-range entry"
                )));
            }
        }
        if self.matrix.iter().any(|v| !v.is_finite()) {
            return Err(ProfileError::Invalid("matrix contains a non-finite entry".into()));
        }
        Ok(())
    }
}

/// Read/write/save contract against the profile container collaborator.
///
/// `write` updates the working record the live preview is built from;
/// `save` exports the current record to an explicit path (the final
/// deliverable, or a temp file for preview installs).
pub trait ProfileStore {
    /// Reads the current profile record.
    fn read(&self) -> ProfileResult<CorrectionProfile>;

    /// Replaces the current profile record.
    fn write(&mut self, profile: &CorrectionProfile) -> ProfileResult<()>;

    /// Exports the current record to `path`.
    fn save(&self, path: &Path) -> ProfileResult<()>;
}

/// In-memory store for tests and simulation.
#[derive(Debug, Clone)]
pub struct MemoryProfileStore {
    current: CorrectionProfile,
}

impl MemoryProfileStore {
    /// Creates a store seeded with `initial`.
    pub fn new(initial: CorrectionProfile) -> Self {
        Self { current: initial }
    }
}

impl ProfileStore for MemoryProfileStore {
    fn read(&self) -> ProfileResult<CorrectionProfile> {
        Ok(self.current.clone())
    }

    fn write(&mut self, profile: &CorrectionProfile) -> ProfileResult<()> {
        profile.validate()?;
        self.current = profile.clone();
        Ok(())
    }

    fn save(&self, path: &Path) -> ProfileResult<()> {
        let yaml = serde_yaml::to_string(&self.current)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }
}

/// File-backed YAML store.
///
/// Keeps the working record in memory and mirrors every write to its
/// backing path, so the record on disk always reflects the last
/// completed sub-stage.
#[derive(Debug)]
pub struct YamlProfileStore {
    path: PathBuf,
    current: CorrectionProfile,
}

impl YamlProfileStore {
    /// Opens the store at `path`, reading an existing record or
    /// seeding a fresh identity profile of `entries` entries.
    pub fn open_or_seed(path: impl Into<PathBuf>, entries: usize) -> ProfileResult<Self> {
        let path = path.into();
        let current = if path.exists() {
            let text = std::fs::read_to_string(&path)?;
            let profile: CorrectionProfile = serde_yaml::from_str(&text)?;
            profile.validate()?;
            profile
        } else {
            let profile = CorrectionProfile::identity(entries);
            std::fs::write(&path, serde_yaml::to_string(&profile)?)?;
            profile
        };
        Ok(Self { path, current })
    }

    /// The backing path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProfileStore for YamlProfileStore {
    fn read(&self) -> ProfileResult<CorrectionProfile> {
        Ok(self.current.clone())
    }

    fn write(&mut self, profile: &CorrectionProfile) -> ProfileResult<()> {
        profile.validate()?;
        std::fs::write(&self.path, serde_yaml::to_string(profile)?)?;
        self.current = profile.clone();
        Ok(())
    }

    fn save(&self, path: &Path) -> ProfileResult<()> {
        std::fs::write(path, serde_yaml::to_string(&self.current)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_profile() {
        let p = CorrectionProfile::identity(4096);
        assert_eq!(p.entry_count, 4096);
        assert_eq!(p.red_lut[0], 0.0);
        assert_eq!(p.red_lut[4095], 1.0);
        assert_eq!(p.matrix(), Mat3::IDENTITY);
        p.validate().unwrap();
    }

    #[test]
    fn test_validation_catches_mismatch() {
        let mut p = CorrectionProfile::identity(16);
        p.red_lut.pop();
        assert!(matches!(p.validate(), Err(ProfileError::Invalid(_))));

        let mut p = CorrectionProfile::identity(16);
        p.green_lut[3] = 1.5;
        assert!(p.validate().is_err());

        let mut p = CorrectionProfile::identity(16);
        p.matrix[4] = f64::NAN;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_memory_store_rejects_invalid() {
        let mut store = MemoryProfileStore::new(CorrectionProfile::identity(16));
        let mut bad = store.read().unwrap();
        bad.entry_count = 1;
        bad.red_lut = vec![0.0];
        bad.green_lut = vec![0.0];
        bad.blue_lut = vec![0.0];
        assert!(store.write(&bad).is_err());
        // Store still holds the last good record
        assert_eq!(store.read().unwrap().entry_count, 16);
    }

    #[test]
    fn test_yaml_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("panel.yaml");
        let mut store = YamlProfileStore::open_or_seed(&path, 64).unwrap();

        let mut profile = store.read().unwrap();
        profile.peak_luminance = 812.5;
        profile.set_matrix(Mat3::diagonal(1.1, 1.0, 0.9));
        store.write(&profile).unwrap();

        // Reopening sees the persisted record
        let reopened = YamlProfileStore::open_or_seed(&path, 64).unwrap();
        let back = reopened.read().unwrap();
        assert_eq!(back.peak_luminance, 812.5);
        assert_eq!(back.matrix()[0][0], 1.1);
    }

    #[test]
    fn test_save_exports_copy() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryProfileStore::new(CorrectionProfile::identity(32));
        let out = dir.path().join("export.yaml");
        store.save(&out).unwrap();
        let text = std::fs::read_to_string(&out).unwrap();
        let parsed: CorrectionProfile = serde_yaml::from_str(&text).unwrap();
        assert_eq!(parsed.entry_count, 32);
    }
}
