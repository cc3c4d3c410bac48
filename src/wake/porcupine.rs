use porcupine::{Porcupine, PorcupineBuilder};
use tracing::{info, warn};

use super::WakeGate;
use crate::audio::AudioFrame;
use crate::config::WakeConfig;
use crate::{Error, Result};

/// Picovoice Porcupine keyword spotter
pub struct PorcupineGate {
    engine: Option<Porcupine>,
    sample_rate: u32,
    frame_length: usize,
}

impl PorcupineGate {
    pub fn from_config(config: &WakeConfig) -> Result<Self> {
        let access_key = config
            .access_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| Error::Config("wake.access_key is required for porcupine".to_string()))?;

        if config.keyword_paths.is_empty() {
            return Err(Error::Config(
                "wake.keyword_paths must list at least one .ppn file".to_string(),
            ));
        }

        let sensitivities = vec![config.sensitivity; config.keyword_paths.len()];
        let engine = PorcupineBuilder::new_with_keyword_paths(access_key, &config.keyword_paths)
            .sensitivities(&sensitivities)
            .init()
            .map_err(|e| Error::WakeWord(e.to_string()))?;

        let sample_rate = engine.sample_rate();
        let frame_length = engine.frame_length() as usize;

        info!(
            keywords = config.keyword_paths.len(),
            sample_rate, frame_length, "Porcupine initialized"
        );

        Ok(Self {
            engine: Some(engine),
            sample_rate,
            frame_length,
        })
    }
}

impl WakeGate for PorcupineGate {
    fn process(&mut self, frame: &AudioFrame) -> bool {
        let Some(engine) = self.engine.as_ref() else {
            return false;
        };

        match engine.process(frame.samples()) {
            Ok(index) => index >= 0,
            Err(e) => {
                warn!(error = %e, "Porcupine failed to process frame");
                false
            }
        }
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn frame_length(&self) -> usize {
        self.frame_length
    }

    fn cleanup(&mut self) {
        if self.engine.take().is_some() {
            info!("Porcupine released");
        }
    }

    fn name(&self) -> &str {
        "porcupine"
    }
}
