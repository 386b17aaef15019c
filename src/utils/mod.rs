//! Utility functions

pub mod cover_art;
mod sanitize;
mod url_check;

#[cfg(test)]
pub mod test_audio;
#[cfg(test)]
pub mod test_server;

pub use sanitize::{sanitize_filename, track_file_stem};
pub use url_check::is_valid_url;
