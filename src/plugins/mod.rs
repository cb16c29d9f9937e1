// Framework plugins injected into the bundler configurations

pub mod asset_manifest;
pub mod data_loader;
pub mod recompile;
pub mod server_compiler;
pub mod spinner;

pub use asset_manifest::{AssetManifest, AssetManifestPlugin};
pub use data_loader::DataLoaderPlugin;
pub use recompile::ReCompilePlugin;
pub use server_compiler::{
    get_server_compiler_plugin, EnsureRoutesConfig, ServerCompilerPlugin,
    ServerCompilerPluginOptions,
};
pub use spinner::SpinnerPlugin;
