pub mod apps;
pub mod challenge;
pub mod settings;
pub mod simulate;
pub mod stats;
pub mod utils;

pub use utils::init_logging;
