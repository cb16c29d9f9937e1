use crate::config::{get_config, GetConfigOptions};
use crate::core::models::Mode;
use crate::service::constants::RUNTIME_TMP_DIR;
use crate::transform::{ImportStyleOptions, ImportStylePlugin, TransformContext, TransformPipeline};
use crate::utils::config_loader::CONFIG_FILE;
use crate::utils::{CliOverrides, ConfigLoader, IceError, Logger, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "ice-bundle")]
#[command(about = "Bundler configuration and source transforms for ice apps")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the assembled bundler configuration as JSON
    Config {
        /// Root directory
        #[arg(short, long, default_value = ".")]
        root: String,
        /// Build mode
        #[arg(short, long, value_parser = ["development", "production"])]
        mode: Option<String>,
        /// Output directory
        #[arg(short, long)]
        outdir: Option<String>,
        /// Public path of emitted assets
        #[arg(long)]
        public_path: Option<String>,
    },
    /// Add library style imports to a source file
    StyleImport {
        /// Source file to transform
        file: PathBuf,
        /// Root directory holding ice.config.json
        #[arg(short, long, default_value = ".")]
        root: String,
        /// Component library to add styles for, in addition to the config
        #[arg(short, long = "library")]
        libraries: Vec<String>,
        /// Disable kebab-casing of binding names for flag-given libraries
        #[arg(long)]
        no_kebab_case: bool,
        /// Print the source map after the code
        #[arg(long)]
        source_map: bool,
    },
    /// Write an example ice.config.json
    Init {
        /// Root directory
        #[arg(short, long, default_value = ".")]
        root: String,
    },
}

pub struct CliHandler;

impl CliHandler {
    pub fn new() -> Self {
        Self
    }

    pub async fn run(&self) -> Result<()> {
        Logger::init();

        let cli = Cli::parse();

        match cli.command {
            Commands::Config {
                root,
                mode,
                outdir,
                public_path,
            } => self.handle_config_command(&root, mode.as_deref(), outdir, public_path),
            Commands::StyleImport {
                file,
                root,
                libraries,
                no_kebab_case,
                source_map,
            } => {
                self.handle_style_import_command(&file, &root, libraries, !no_kebab_case, source_map)
                    .await
            }
            Commands::Init { root } => self.handle_init_command(&root),
        }
    }

    fn handle_config_command(
        &self,
        root: &str,
        mode: Option<&str>,
        outdir: Option<String>,
        public_path: Option<String>,
    ) -> Result<()> {
        let root = PathBuf::from(root);
        let file_config = ConfigLoader::load_from_file(&root)?;
        let user_config = ConfigLoader::merge_with_cli(
            file_config,
            CliOverrides {
                mode: mode.map(|m| if m == "production" { Mode::Production } else { Mode::Development }),
                public_path,
                output_dir: outdir,
                ..Default::default()
            },
        );

        let config = get_config(GetConfigOptions::new(&root, &user_config, RUNTIME_TMP_DIR));
        println!("{}", serde_json::to_string_pretty(&config)?);
        Ok(())
    }

    async fn handle_style_import_command(
        &self,
        file: &Path,
        root: &str,
        libraries: Vec<String>,
        kebab_case: bool,
        source_map: bool,
    ) -> Result<()> {
        let file_config = ConfigLoader::load_from_file(Path::new(root))?.unwrap_or_default();

        let mut pipeline = TransformPipeline::new();
        for config in &file_config.import_style {
            let options = ImportStyleOptions::from(config).with_source_map(source_map);
            pipeline.add_plugin(Arc::new(ImportStylePlugin::new(options)));
        }
        for library in libraries {
            let options = ImportStyleOptions::new(library)
                .with_kebab_case(kebab_case)
                .with_source_map(source_map);
            pipeline.add_plugin(Arc::new(ImportStylePlugin::new(options)));
        }

        if pipeline.is_empty() {
            return Err(IceError::config(format!(
                "no style import libraries given; pass --library or add importStyle to {}",
                CONFIG_FILE
            )));
        }

        let code = tokio::fs::read_to_string(file).await?;
        let id = file.to_string_lossy();
        let output = pipeline
            .transform(&code, &id, &TransformContext::default())
            .await?;

        println!("{}", output.code);
        if let Some(map) = output.map {
            println!("{}", map);
        }
        Ok(())
    }

    fn handle_init_command(&self, root: &str) -> Result<()> {
        let path = Path::new(root).join(CONFIG_FILE);
        if path.exists() {
            return Err(IceError::config(format!("{} already exists", path.display())));
        }
        std::fs::write(&path, ConfigLoader::generate_example())?;
        Logger::info(&format!("Created {}", path.display()));
        Ok(())
    }
}

impl Default for CliHandler {
    fn default() -> Self {
        Self::new()
    }
}
