//! Acoustic alignment between two feature sequences.

pub mod dtw;

pub use dtw::{align, align_frames, cost_matrix};
