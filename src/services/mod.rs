pub mod adlib;
pub mod stt;
