pub mod archive;
pub mod cue;
pub mod endpoint;
pub mod file;
pub mod frame;
pub mod microphone;
pub mod playback;
pub mod source;

pub use archive::{ArchivedUtterance, UtteranceArchive};
pub use cue::{sine_tone, ToneCue, WakeCue};
pub use endpoint::{silence_frame_threshold, SilenceEndpointer, SilenceState};
pub use file::{encode_wav, write_wav, AudioFile, WavFileSource};
pub use frame::{AudioFrame, Utterance};
pub use microphone::MicrophoneSource;
pub use playback::{play_samples, PlaybackStream};
pub use source::{AudioSource, FrameSource, FrameSourceConfig, FrameSourceFactory};
