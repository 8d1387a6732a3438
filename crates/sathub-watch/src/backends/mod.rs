//! File watching backends.

mod notify_backend;

pub use notify_backend::NotifyWatcher;
