pub mod access;
pub mod intake;
pub mod keyring;
pub mod notifier;
pub mod pdf;
