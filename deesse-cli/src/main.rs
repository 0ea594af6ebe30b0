use clap::{Parser, Subcommand, ValueEnum};
use deesse::artifact::{ArtifactLoader, LoadedSchema};
use deesse::schema::load_collections;
use deesse::{Collection, Regenerator};
use deesse_codegen::TypesGenerator;
use std::path::PathBuf;
use std::process;

/// deesse CLI: compile collection declarations and keep artifacts in sync
#[derive(Parser)]
#[command(name = "deesse", version, about)]
struct Cli {
    /// Output format
    #[arg(long, global = true, default_value = "yaml")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Regenerate schema.sql, schema.json and types.rs once
    Compile {
        /// Declaration file or directory of *.yaml files
        #[arg(long, default_value = "collections")]
        schema: PathBuf,
        /// Artifact output directory
        #[arg(long, default_value = "generated")]
        out: PathBuf,
        /// Skip types.rs
        #[arg(long)]
        no_types: bool,
    },

    /// Regenerate, then regenerate again whenever a declaration changes
    Watch {
        /// Declaration file or directory of *.yaml files
        #[arg(long, default_value = "collections")]
        schema: PathBuf,
        /// Artifact output directory
        #[arg(long, default_value = "generated")]
        out: PathBuf,
        /// Skip types.rs
        #[arg(long)]
        no_types: bool,
    },

    /// Parse and validate declarations, printing the resulting collections
    Check {
        /// Declaration file or directory of *.yaml files
        #[arg(long, default_value = "collections")]
        schema: PathBuf,
    },

    /// Show the compiled tables from an artifact directory
    Tables {
        /// Artifact directory
        #[arg(long, default_value = "generated")]
        out: PathBuf,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("ERROR:{e}");
        process::exit(1);
    }
}

fn regenerator(schema: PathBuf, out: PathBuf, no_types: bool) -> Regenerator {
    let regen = Regenerator::new(schema, out);
    if no_types {
        regen
    } else {
        regen.with_generator(TypesGenerator)
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Compile {
            schema,
            out,
            no_types,
        } => {
            let summary = compile(schema, out, no_types)?;
            print_output(&summary, &cli.format)?;
        }

        Command::Watch {
            schema,
            out,
            no_types,
        } => {
            log::info!("Starting watch on {}", schema.display());
            let session = regenerator(schema, out, no_types).start()?;
            session.run();
            log::info!("Watcher stopped");
        }

        Command::Check { schema } => {
            let collections = load_collections(&schema)?;
            log::debug!("Loaded {} collections from {}", collections.len(), schema.display());
            let summary: Vec<_> = collections.iter().map(describe_collection).collect();
            print_output(&serde_json::Value::Array(summary), &cli.format)?;
        }

        Command::Tables { out } => match ArtifactLoader::new(&out).load()? {
            LoadedSchema::Generated(tables) => {
                print_output(&serde_json::to_value(&tables)?, &cli.format)?;
            }
            LoadedSchema::NotGenerated => {
                print_output(
                    &serde_json::json!({
                        "generated": false,
                        "out_dir": out.display().to_string(),
                    }),
                    &cli.format,
                )?;
            }
        },
    }

    Ok(())
}

/// Regenerate every artifact once and summarise what changed.
fn compile(
    schema: PathBuf,
    out: PathBuf,
    no_types: bool,
) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    log::info!("Compiling {} into {}", schema.display(), out.display());
    let regen = regenerator(schema, out, no_types);
    let changed = regen.regenerate()?;
    log::info!("Compile finished, {} artifacts changed", changed.len());

    let changed: Vec<_> = changed.iter().map(|p| p.display().to_string()).collect();
    Ok(serde_json::json!({
        "out_dir": regen.out_dir().display().to_string(),
        "changed": changed,
    }))
}

fn describe_collection(collection: &Collection) -> serde_json::Value {
    let fields: Vec<_> = collection
        .fields()
        .iter()
        .map(|(name, field)| {
            serde_json::json!({
                "name": name,
                "type": field.kind().as_str(),
                "params": field.params(),
                "constraints": field.constraints(),
            })
        })
        .collect();

    serde_json::json!({
        "slug": collection.slug(),
        "name": collection.name(),
        "admin": collection.admin(),
        "fields": fields,
    })
}

fn print_output(
    value: &serde_json::Value,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_compile_args() {
        let cli = Cli::try_parse_from([
            "deesse", "compile", "--schema", "decl", "--out", "gen", "--format", "json",
        ])
        .unwrap();
        assert!(matches!(cli.format, OutputFormat::Json));
        match cli.command {
            Command::Compile { schema, out, no_types } => {
                assert_eq!(schema, PathBuf::from("decl"));
                assert_eq!(out, PathBuf::from("gen"));
                assert!(!no_types);
            }
            _ => panic!("expected compile"),
        }
    }

    #[test]
    fn test_compile_writes_artifacts_once() {
        let tmp = tempfile::TempDir::new().unwrap();
        let decl = tmp.path().join("collections.yaml");
        std::fs::write(
            &decl,
            "collections:\n  - slug: posts\n    fields:\n      title: { type: text }\n",
        )
        .unwrap();
        let out = tmp.path().join("generated");

        let summary = compile(decl.clone(), out.clone(), false).unwrap();
        assert_eq!(summary["changed"].as_array().unwrap().len(), 3);
        assert!(out.join("types.rs").exists());

        let summary = compile(decl, out, true).unwrap();
        assert!(summary["changed"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_compile_reports_unusable_slug() {
        let tmp = tempfile::TempDir::new().unwrap();
        let decl = tmp.path().join("collections.yaml");
        std::fs::write(&decl, "collections:\n  - slug: s\n").unwrap();

        let err = compile(decl, tmp.path().join("generated"), false).unwrap_err();
        assert!(err.to_string().contains("types generator failed"));
    }
}
