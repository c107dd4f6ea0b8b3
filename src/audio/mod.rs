pub mod capture;
pub mod recorder;
pub mod vad;
