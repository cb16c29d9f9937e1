pub const IMPORT_META_TARGET: &str = "import.meta.target";
pub const IMPORT_META_RENDERER: &str = "import.meta.renderer";

/// Default build target
pub const WEB: &str = "web";

/// Directory of generated runtime files, relative to the project root
pub const RUNTIME_TMP_DIR: &str = ".ice";

pub const SERVER_ENTRY: &str = "entry.server.ts";
pub const SERVER_OUTPUT_DIR: &str = "server";
pub const DATA_LOADER_ENTRY: &str = "data-loader.ts";
pub const ROUTES_CONFIG_ENTRY: &str = "routes-config.ts";

/// Data cache key of the serialized route manifest
pub const ROUTES_CACHE_KEY: &str = "routes";
