use crate::error::{PlayerError, Result};
use crate::infra::constants::player::{DEFAULT_UNMUTE_VOLUME, MAX_VOLUME};
use crate::infra::settings::{PlayerSettings, keys};

/// Persisted volume level and the pre-mute level used by unmute.
#[derive(Debug, Clone)]
pub struct VolumeMemory {
    settings: PlayerSettings,
}

impl VolumeMemory {
    pub fn new(settings: PlayerSettings) -> Self {
        Self { settings }
    }

    /// Level to apply when the engine starts.
    pub fn initial_volume(&self) -> f64 {
        clamp_volume(self.settings.volume())
    }

    /// Validate and persist an explicit volume change.
    pub fn remember(&self, volume: f64) -> Result<f64> {
        let volume = validate_volume(volume)?;
        self.settings.set(keys::VOLUME, &volume)?;
        Ok(volume)
    }

    /// Level to switch to when toggling mute from the persisted level.
    ///
    /// Muting remembers the current level; unmuting restores it, or full
    /// volume when nothing was remembered.
    pub fn toggle(&self) -> Result<f64> {
        let current = clamp_volume(self.settings.volume());
        let target = if current > 0.0 {
            self.settings.set(keys::PREVIOUS_VOLUME, &current)?;
            0.0
        } else {
            self.settings
                .previous_volume()
                .filter(|v| *v > 0.0)
                .map(clamp_volume)
                .unwrap_or(DEFAULT_UNMUTE_VOLUME)
        };
        self.settings.set(keys::VOLUME, &target)?;
        Ok(target)
    }
}

pub fn validate_volume(volume: f64) -> Result<f64> {
    if !volume.is_finite() {
        return Err(PlayerError::InvalidArgument(format!(
            "volume must be finite, got {volume}"
        )));
    }
    Ok(clamp_volume(volume))
}

fn clamp_volume(volume: f64) -> f64 {
    volume.clamp(0.0, MAX_VOLUME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::settings::MemorySettingsStore;
    use std::sync::Arc;

    #[test]
    fn mute_round_trip_survives_reload() {
        let store = Arc::new(MemorySettingsStore::new());
        let first = VolumeMemory::new(PlayerSettings::new(store.clone()));
        first.remember(40.0).unwrap();

        assert_eq!(first.toggle().unwrap(), 0.0);

        let reloaded = VolumeMemory::new(PlayerSettings::new(store));
        assert_eq!(reloaded.initial_volume(), 0.0);
        assert_eq!(reloaded.toggle().unwrap(), 40.0);
        assert_eq!(reloaded.initial_volume(), 40.0);
    }

    #[test]
    fn unmute_without_memory_goes_full() {
        let memory = VolumeMemory::new(PlayerSettings::in_memory());
        memory.remember(0.0).unwrap();
        assert_eq!(memory.toggle().unwrap(), DEFAULT_UNMUTE_VOLUME);
    }

    #[test]
    fn explicit_changes_are_clamped_and_persisted() {
        let settings = PlayerSettings::in_memory();
        let memory = VolumeMemory::new(settings.clone());

        assert_eq!(memory.remember(140.0).unwrap(), 100.0);
        assert_eq!(memory.remember(-3.0).unwrap(), 0.0);
        assert_eq!(settings.volume(), 0.0);
        assert!(memory.remember(f64::NAN).is_err());
    }
}
