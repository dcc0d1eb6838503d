pub mod toml_loader;

pub use toml_loader::{load_essay, load_topic_bank, TopicBankFile};
