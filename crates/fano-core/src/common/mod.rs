pub mod config;

pub use config::{
    ConfigDocument, DEFAULT_CONFIG_FILE_NAME, RunConfig, load_config, parse_config, parse_flag,
};
