//! Wake word gating
//!
//! A gate looks at one frame at a time and reports whether the trigger
//! phrase was just heard. The gate also dictates the sample rate and frame
//! length every frame source of the session must produce.

pub mod energy;
#[cfg(feature = "porcupine")]
pub mod porcupine;

pub use energy::EnergyGate;
#[cfg(feature = "porcupine")]
pub use self::porcupine::PorcupineGate;

use crate::audio::AudioFrame;
use crate::config::{WakeConfig, WakeEngine};
use crate::Result;

/// Per-frame trigger classifier
pub trait WakeGate: Send {
    /// Returns true on the frame that completes the trigger phrase
    fn process(&mut self, frame: &AudioFrame) -> bool;

    /// Forget partial detection state before a new wait
    ///
    /// Frames consumed while recording and speaking never reach the gate,
    /// so whatever it saw before the last trigger is stale.
    fn reset(&mut self) {}

    /// Sample rate the gate was built for
    fn sample_rate(&self) -> u32;

    /// Samples per frame the gate expects
    fn frame_length(&self) -> usize;

    /// Release engine resources; later calls are no-ops
    fn cleanup(&mut self);

    /// Engine name for logging
    fn name(&self) -> &str;
}

/// Build the gate selected in the configuration
pub fn create_gate(config: &WakeConfig) -> Result<Box<dyn WakeGate>> {
    match config.engine {
        WakeEngine::Energy => Ok(Box::new(EnergyGate::new(
            config.energy_level,
            config.energy_frames,
        ))),
        #[cfg(feature = "porcupine")]
        WakeEngine::Porcupine => Ok(Box::new(PorcupineGate::from_config(config)?)),
        #[cfg(not(feature = "porcupine"))]
        WakeEngine::Porcupine => Err(crate::Error::Config(
            "the porcupine wake engine requires building with --features porcupine".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_energy_engine_geometry() {
        let config = WakeConfig {
            engine: WakeEngine::Energy,
            ..WakeConfig::default()
        };
        let gate = create_gate(&config).unwrap();
        assert_eq!(gate.name(), "energy");
        assert_eq!((gate.sample_rate(), gate.frame_length()), (16000, 512));
    }

    #[cfg(not(feature = "porcupine"))]
    #[test]
    fn test_porcupine_needs_feature() {
        let result = create_gate(&WakeConfig::default());
        assert!(matches!(result, Err(crate::Error::Config(_))));
    }
}
