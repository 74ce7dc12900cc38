//! Tag header codecs for the supported audio containers.
//!
//! `flac` parses and re-serializes the metadata block chain of a FLAC
//! stream, including padding-block sizing and audio-offset detection.
//! `vorbis` handles the field layout inside a comment block. MP3 has no
//! header synthesis in this version: virtual files pass through with a
//! zero boundary.

pub mod flac;
pub mod vorbis;
