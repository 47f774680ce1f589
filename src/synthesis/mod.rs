//! VOICEVOX speech synthesis: the two-step `audio_query` → `synthesis` exchange.

pub mod client;
pub mod retry;
