pub mod collect;
pub mod export;
pub mod report;
pub mod status;

use std::path::PathBuf;

pub use collect::collect;
pub use export::export;
pub use report::report;
pub use status::{reset, status};

pub fn default_db_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("crashweather.sqlite")
}
