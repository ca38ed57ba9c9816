mod intake;

pub use intake::{DocumentHandler, IgnoreHandler};
