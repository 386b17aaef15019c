//! Single-track media steps: fetch, transcode, tag

pub mod fetcher;
pub mod tagger;
pub mod transcoder;

pub use fetcher::{AudioFetcher, FetchedAudio};
pub use tagger::Tagger;
pub use transcoder::Transcoder;
