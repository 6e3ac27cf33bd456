// Re-export from sub-crates
pub use earshot_audio::{AudioError, AudioSource, PcmAudio};
pub use earshot_core::{
    APP_NAME, Config, ConfigManager, DEFAULT_LANGUAGE, DEFAULT_LOG_LEVEL, normalize_language,
};
pub use earshot_stt::{Backends, ProviderId, SttFactory, TranscribeError, Transcriber};

// Version from this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
