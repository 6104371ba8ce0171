//! Background notifier for watched projects

mod config;
mod notifier;

pub use config::NotifierConfig;
pub use notifier::Notifier;
