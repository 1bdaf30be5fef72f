use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use ozc_core::config::{self, CONFIG_FILE_NAME, GenerationConfig, ResponseValidation};
use ozc_core::diagnostics::{Diagnostics, Severity};
use ozc_core::load::FsLoader;
use ozc_core::{CodeGenerator, Compilation, CompiledApi, GeneratedFile, compile_location};
use ozc_typescript::TypeScriptGenerator;

#[derive(Parser)]
#[command(
    name = "ozc",
    about = "OpenAPI 2.0/3.x to TypeScript + Zod compiler",
    version
)]
struct Cli {
    /// Configuration file; missing files mean defaults
    #[arg(long, global = true, default_value = CONFIG_FILE_NAME)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate validators, types, and client/server code
    Generate(GenerateArgs),

    /// Compile a document and report diagnostics without writing anything
    Validate {
        /// Path or URL of the API description (YAML or JSON)
        #[arg(short, long)]
        input: Option<String>,
    },

    /// Print what a document compiles to
    Inspect {
        /// Path or URL of the API description (YAML or JSON)
        #[arg(short, long)]
        input: Option<String>,

        /// Output format
        #[arg(long, default_value = "yaml")]
        format: InspectFormat,
    },

    /// Initialize a new ozc configuration
    Init {
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Flags override the config file; absent flags leave it alone.
#[derive(Args, Default)]
struct GenerateArgs {
    /// Path or URL of the API description (YAML or JSON)
    #[arg(short, long)]
    input: Option<String>,

    /// Directory to write the generated tree to
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Emit request validators for server handlers
    #[arg(long)]
    server: bool,

    /// Do not emit client functions
    #[arg(long)]
    no_client: bool,

    /// Reject unknown keys on objects without `additionalProperties`
    #[arg(long)]
    strict_objects: bool,

    /// When clients parse response bodies
    #[arg(long, value_enum)]
    response_validation: Option<ResponseMode>,

    /// Base URL for the generated client config
    #[arg(long)]
    base_url: Option<String>,

    /// Run biome over the generated tree
    #[arg(long)]
    format: bool,

    /// Leave out JSDoc comments
    #[arg(long)]
    no_jsdoc: bool,
}

impl GenerateArgs {
    fn apply(self, cfg: &mut GenerationConfig) {
        if let Some(input) = self.input {
            cfg.input = input;
        }
        if let Some(output) = self.output {
            cfg.output = output.display().to_string();
        }
        if let Some(mode) = self.response_validation {
            cfg.response_validation = mode.into();
        }
        if self.base_url.is_some() {
            cfg.base_url = self.base_url;
        }
        cfg.server |= self.server;
        cfg.client &= !self.no_client;
        cfg.strict_objects |= self.strict_objects;
        cfg.format |= self.format;
        cfg.no_jsdoc |= self.no_jsdoc;
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ResponseMode {
    Lazy,
    Eager,
}

impl From<ResponseMode> for ResponseValidation {
    fn from(mode: ResponseMode) -> Self {
        match mode {
            ResponseMode::Lazy => ResponseValidation::Lazy,
            ResponseMode::Eager => ResponseValidation::Eager,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum InspectFormat {
    Yaml,
    Json,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate(args) => cmd_generate(&cli.config, args),

        Commands::Validate { input } => cmd_validate(&cli.config, input),

        Commands::Inspect { input, format } => cmd_inspect(&cli.config, input, format),

        Commands::Init { force } => cmd_init(&cli.config, force),

        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            clap_complete::generate(shell, &mut cmd, "ozc", &mut std::io::stdout());
            Ok(())
        }
    }
}

fn load_config(path: &Path) -> Result<GenerationConfig> {
    let cfg = config::load_config(path)?;
    if cfg.is_some() {
        log::debug!("loaded config from {}", path.display());
    }
    Ok(cfg.unwrap_or_default())
}

fn compile(cfg: &GenerationConfig) -> Result<Compilation> {
    let compilation = compile_location(&cfg.input, &FsLoader, cfg)
        .with_context(|| format!("failed to compile {}", cfg.input))?;
    report(&compilation.diagnostics);
    Ok(compilation)
}

/// Print diagnostics to stderr.
fn report(diagnostics: &Diagnostics) {
    for diagnostic in diagnostics.iter() {
        eprintln!("  {diagnostic}");
    }
}

fn error_count(diagnostics: &Diagnostics) -> usize {
    diagnostics
        .iter()
        .filter(|d| d.severity() == Severity::Error)
        .count()
}

/// Write generated files to disk under the given base directory.
fn write_files(base: &Path, files: &[GeneratedFile]) -> Result<()> {
    for file in files {
        let path = base.join(&file.path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        fs::write(&path, &file.content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        log::debug!("wrote {}", path.display());
    }
    Ok(())
}

/// Write everything into a staging directory beside `output`, then swap it
/// into place. Until the swap, an existing `output` is left untouched.
fn write_output(output: &Path, files: &[GeneratedFile], format: bool) -> Result<()> {
    let parent = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)
        .with_context(|| format!("failed to create directory {}", parent.display()))?;
    let staging = tempfile::Builder::new()
        .prefix(".ozc-")
        .tempdir_in(&parent)
        .with_context(|| format!("failed to create a staging directory in {}", parent.display()))?;

    write_files(staging.path(), files)?;
    let readme_path = staging.path().join("README.md");
    fs::write(&readme_path, readme_content())
        .with_context(|| format!("failed to write {}", readme_path.display()))?;
    if format {
        try_run_biome(staging.path());
    }

    if output.exists() {
        fs::remove_dir_all(output)
            .with_context(|| format!("failed to remove {}", output.display()))?;
    }
    fs::rename(staging.path(), output)
        .with_context(|| format!("failed to move generated files to {}", output.display()))?;
    Ok(())
}

/// Try to run Biome formatter on the output directory.
fn try_run_biome(output_dir: &Path) {
    match Command::new("npx")
        .args(["@biomejs/biome", "format", "--write", "."])
        .current_dir(output_dir)
        .output()
    {
        Ok(result) if result.status.success() => {
            eprintln!("  formatted with biome");
        }
        Ok(_result) => {
            eprintln!(
                "  warning: biome formatting had issues (non-zero exit), output may need manual formatting"
            );
        }
        Err(_) => {
            eprintln!("  note: biome not found, run `npx @biomejs/biome format --write .` in the output directory to format");
        }
    }
}

/// Generate the "do not edit" README.
fn readme_content() -> &'static str {
    r#"# Generated Code: Do Not Edit

This directory is generated by ozc from an OpenAPI description.
Any manual changes will be overwritten the next time `ozc generate` is run.

To regenerate, run:
```
ozc generate
```

To customize the generated output, edit your `.ozc.yaml` configuration file.
"#
}

fn cmd_generate(config_path: &Path, args: GenerateArgs) -> Result<()> {
    let mut cfg = load_config(config_path)?;
    args.apply(&mut cfg);
    if !cfg.client && !cfg.server {
        eprintln!("Neither client nor server output is enabled; emitting validators and types only.");
    }

    let compilation = compile(&cfg)?;
    let files = TypeScriptGenerator
        .generate(&compilation.api, &cfg)
        .context("failed to render TypeScript")?;

    let output = PathBuf::from(&cfg.output);
    eprintln!("Generating {} → {}", cfg.input, output.display());
    write_output(&output, &files, cfg.format)?;

    eprintln!(
        "Generated {} files in {}",
        files.len() + 1, // +1 for README
        output.display()
    );
    let errors = error_count(&compilation.diagnostics);
    if errors > 0 {
        eprintln!("{errors} type(s) or operation(s) were skipped, see the errors above.");
    }
    Ok(())
}

fn cmd_validate(config_path: &Path, input: Option<String>) -> Result<()> {
    let mut cfg = load_config(config_path)?;
    if let Some(input) = input {
        cfg.input = input;
    }
    let compilation = compile(&cfg)?;
    let api = &compilation.api;

    eprintln!("{} document: {}", api.dialect, api.title);
    eprintln!("  Version: {}", api.version);
    eprintln!("  Named types: {}", api.types.len());
    eprintln!("  Operations: {}", api.operations.len());

    let errors = error_count(&compilation.diagnostics);
    if errors > 0 {
        anyhow::bail!("{errors} error(s) in {}", cfg.input);
    }
    eprintln!(
        "Validation successful ({} warning(s)).",
        compilation.diagnostics.len()
    );
    Ok(())
}

fn cmd_inspect(config_path: &Path, input: Option<String>, format: InspectFormat) -> Result<()> {
    let mut cfg = load_config(config_path)?;
    if let Some(input) = input {
        cfg.input = input;
    }
    let compilation = compile(&cfg)?;
    let summary = build_inspect_summary(&compilation);

    match format {
        InspectFormat::Yaml => {
            let yaml = serde_yaml_ng::to_string(&summary)?;
            print!("{}", yaml);
        }
        InspectFormat::Json => {
            let json = serde_json::to_string_pretty(&summary)?;
            println!("{}", json);
        }
    }

    Ok(())
}

fn build_inspect_summary(compilation: &Compilation) -> serde_json::Value {
    let api: &CompiledApi = &compilation.api;
    let types: Vec<serde_json::Value> = api
        .types
        .iter()
        .map(|t| {
            serde_json::json!({
                "name": t.name,
                "cyclic": t.cyclic,
                "dependencies": t.validator.dependencies,
                "validator": t.validator.code,
            })
        })
        .collect();

    let operations: Vec<serde_json::Value> = api
        .operations
        .iter()
        .map(|op| {
            let d = &op.descriptor;
            serde_json::json!({
                "name": d.id.camel_case,
                "method": d.method.as_str(),
                "path": d.path_template,
                "statuses": op.responses.iter().map(|r| &r.status).collect::<Vec<_>>(),
                "security": d.security.alternatives,
                "tags": d.tags,
            })
        })
        .collect();

    serde_json::json!({
        "info": {
            "title": api.title,
            "version": api.version,
            "dialect": api.dialect.to_string(),
            "servers": api.servers,
        },
        "types": types,
        "operations": operations,
        "diagnostics": compilation.diagnostics.iter().collect::<Vec<_>>(),
    })
}

fn cmd_init(config_path: &Path, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite.",
            config_path.display()
        );
    }

    fs::write(config_path, config::default_config_content())
        .with_context(|| format!("failed to write {}", config_path.display()))?;
    eprintln!("Created {}", config_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, content: &str) -> GeneratedFile {
        GeneratedFile {
            path: path.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "ozc",
            "generate",
            "-i",
            "api.json",
            "--server",
            "--no-client",
            "--response-validation",
            "eager",
        ])
        .unwrap();
        let Commands::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        let mut cfg = GenerationConfig {
            strict_objects: true,
            ..GenerationConfig::default()
        };
        args.apply(&mut cfg);
        assert_eq!(cfg.input, "api.json");
        assert_eq!(cfg.output, "src/generated");
        assert!(cfg.server);
        assert!(!cfg.client);
        assert!(cfg.strict_objects, "absent flags keep the config value");
        assert_eq!(cfg.response_validation, ResponseValidation::Eager);
        assert_eq!(cli.config, PathBuf::from(CONFIG_FILE_NAME));
    }

    #[test]
    fn test_write_output_replaces_previous_tree() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("generated");
        fs::create_dir_all(output.join("types")).unwrap();
        fs::write(output.join("types/Stale.ts"), "stale").unwrap();

        let files = [
            file("index.ts", "export {};\n"),
            file("types/Pet.ts", "export const Pet = 1;\n"),
        ];
        write_output(&output, &files, false).unwrap();

        assert!(!output.join("types/Stale.ts").exists());
        assert_eq!(
            fs::read_to_string(output.join("types/Pet.ts")).unwrap(),
            "export const Pet = 1;\n"
        );
        assert!(output.join("README.md").exists());
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".ozc-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_failed_write_keeps_previous_tree() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("generated");
        fs::create_dir_all(&output).unwrap();
        fs::write(output.join("index.ts"), "previous").unwrap();

        // a file and a directory cannot share a path
        let files = [file("types", "x"), file("types/Pet.ts", "y")];
        assert!(write_output(&output, &files, false).is_err());
        assert_eq!(fs::read_to_string(output.join("index.ts")).unwrap(), "previous");
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        cmd_init(&path, false).unwrap();
        let written: GenerationConfig =
            serde_yaml_ng::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, GenerationConfig::default());
        assert!(cmd_init(&path, false).is_err());
        assert!(cmd_init(&path, true).is_ok());
    }

    #[test]
    fn test_generate_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let spec = dir.path().join("api.yaml");
        fs::write(
            &spec,
            r##"
openapi: 3.0.3
info: { title: Ping, version: "1" }
paths:
  /ping:
    get:
      operationId: ping
      responses:
        "200":
          description: pong
          content:
            application/json:
              schema: { $ref: "#/components/schemas/Pong" }
components:
  schemas:
    Pong:
      type: object
      properties:
        at: { type: string, format: date-time }
"##,
        )
        .unwrap();
        let output = dir.path().join("out");
        let args = GenerateArgs {
            input: Some(spec.display().to_string()),
            output: Some(output.clone()),
            server: true,
            ..GenerateArgs::default()
        };
        cmd_generate(&dir.path().join(CONFIG_FILE_NAME), args).unwrap();

        for path in ["index.ts", "support.ts", "types/Pong.ts", "operations/ping.ts", "README.md"] {
            assert!(output.join(path).exists(), "{path}");
        }
        let ping = fs::read_to_string(output.join("operations/ping.ts")).unwrap();
        assert!(ping.contains("export async function ping("));
        assert!(ping.contains("export function validatePingRequest("));
    }
}
