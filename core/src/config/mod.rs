mod load;
mod types;

pub use load::{get_jobwatch_data_dir, load_default, load_from_path, resolve_config_path};
pub use types::*;
