pub mod capture;
pub mod playback;
pub mod reversal;
pub(crate) mod worker;
