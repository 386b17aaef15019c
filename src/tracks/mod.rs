//! Track records, the ranked source resolver and track list persistence

pub mod list;
pub mod record;
pub mod resolver;

pub use list::{load_tracks, save_tracks};
pub use record::Track;
pub use resolver::{TrackResolver, TrackSource};
