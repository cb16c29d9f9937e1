// Bundler configuration assembly
pub mod define;
pub mod rspack;
pub mod rules;
pub mod split_chunks;

pub use define::get_define_vars;
pub use rspack::{get_config, GetConfigOptions, ASSET_MANIFEST_FILE};
pub use split_chunks::get_split_chunks;
