//! Configuration loading and validation.

mod loader;

pub use loader::{
    ApiSection, ClassifierSection, Config, ConfigError, LoggingSection, ManualSection,
    SchedulerSection, TierBoundEntry, WorldEntry, load_config,
};
