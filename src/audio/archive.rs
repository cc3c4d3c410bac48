use std::fs;
use std::path::PathBuf;

use tracing::info;

use super::file::write_wav;
use super::frame::Utterance;
use crate::Result;

/// Metadata for one archived utterance
#[derive(Debug, Clone)]
pub struct ArchivedUtterance {
    /// Utterance number within the session (0-indexed)
    pub index: usize,
    /// File path of the WAV file
    pub file_path: PathBuf,
    pub sample_rate: u32,
    pub sample_count: usize,
    pub duration_secs: f64,
}

/// Saves every captured utterance of a session as its own WAV file
pub struct UtteranceArchive {
    output_dir: PathBuf,
    next_index: usize,
}

impl UtteranceArchive {
    pub fn new(output_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&output_dir)?;

        info!("Utterance archive: {}", output_dir.display());

        Ok(Self {
            output_dir,
            next_index: 0,
        })
    }

    /// Write `utterance` to `utterance-NNN.wav`
    pub fn save(&mut self, utterance: &Utterance) -> Result<ArchivedUtterance> {
        let file_path = self
            .output_dir
            .join(format!("utterance-{:03}.wav", self.next_index));

        let samples: Vec<i16> = utterance.samples().collect();
        write_wav(&file_path, &samples, utterance.sample_rate())?;

        let archived = ArchivedUtterance {
            index: self.next_index,
            file_path,
            sample_rate: utterance.sample_rate(),
            sample_count: samples.len(),
            duration_secs: utterance.duration().as_secs_f64(),
        };
        self.next_index += 1;

        info!(
            "Utterance {} saved: {:.1}s ({} samples) -> {}",
            archived.index,
            archived.duration_secs,
            archived.sample_count,
            archived.file_path.display()
        );

        Ok(archived)
    }
}
