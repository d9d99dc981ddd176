pub mod backup;
pub mod catalog_io;
pub mod config_io;
pub mod lock;
pub mod paths;
pub mod watcher;
