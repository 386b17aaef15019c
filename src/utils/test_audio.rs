//! Audio fixtures for tests

use std::path::Path;

/// MPEG-1 Layer III, 128 kbps, 44.1 kHz, joint stereo
const FRAME_HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0x64];

/// 144 * 128000 / 44100, no padding
const FRAME_LEN: usize = 417;

/// Bytes of a silent, untagged MP3 made of `frames` frames
pub fn silent_mp3(frames: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(frames * FRAME_LEN);
    for _ in 0..frames {
        data.extend_from_slice(&FRAME_HEADER);
        data.extend(std::iter::repeat_n(0u8, FRAME_LEN - FRAME_HEADER.len()));
    }
    data
}

/// Write a silent MP3 to `path`
pub fn write_silent_mp3(path: &Path) {
    std::fs::write(path, silent_mp3(40)).unwrap();
}
