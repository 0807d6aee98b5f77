pub mod asr;
pub mod broadcast;
#[cfg(feature = "mic")]
pub mod capture;
pub mod config;
pub mod decode;
pub mod emotion;
pub mod features;
pub mod journal;
pub mod lexical;
pub mod pipeline;
pub mod util;
