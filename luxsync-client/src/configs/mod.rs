pub mod settings;
pub mod storage;

pub use settings::Settings;
pub use storage::{FileStorage, LocalStorage, MemoryStorage};
