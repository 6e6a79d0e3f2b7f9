use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use scroll_compiler::{
    bindings_from_toml_str, commands_from_toml_str, Artifact, Compiler, CompilerOptions, Input,
    InstructionMap, MemoryIdProvider, SourceFile, TriggerCatalog,
};

/// Batch compiler for ScrollScript sources and configs.
#[derive(Parser)]
#[command(name = "scrollc", version, about)]
struct Args {
    /// Instruction map TOML mapping core opcodes to runtime opcodes.
    #[arg(long)]
    instructions: Option<PathBuf>,

    /// Trigger catalog TOML.
    #[arg(long)]
    triggers: PathBuf,

    /// Command catalog TOML.
    #[arg(long)]
    commands: Option<PathBuf>,

    /// Binding schema TOML for config extensions.
    #[arg(long)]
    bindings: Option<PathBuf>,

    /// File extension treated as the script dialect.
    #[arg(long, default_value = "scroll")]
    script_extension: String,

    /// Check only: skip id generation and code generation.
    #[arg(long)]
    analyze_only: bool,

    /// Directory binary artifacts are written into.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Print a disassembly of every generated script.
    #[arg(long)]
    dump: bool,

    /// Later declarations silently replace earlier ones.
    #[arg(long)]
    allow_override: bool,

    /// Source files to compile, in order.
    sources: Vec<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let instruction_map = match &args.instructions {
        Some(path) => InstructionMap::from_toml_str(&read(path)?)
            .with_context(|| format!("loading {}", path.display()))?,
        None => InstructionMap::sequential(),
    };
    let triggers = TriggerCatalog::from_toml_str(&read(&args.triggers)?)
        .with_context(|| format!("loading {}", args.triggers.display()))?;
    let commands = match &args.commands {
        Some(path) => commands_from_toml_str(&read(path)?)
            .with_context(|| format!("loading {}", path.display()))?,
        None => Vec::new(),
    };

    let mut compiler = Compiler::new(CompilerOptions {
        instruction_map,
        triggers,
        commands,
        constants: Vec::new(),
        graphics: Vec::new(),
        scripts: Vec::new(),
        script_extension: args.script_extension.clone(),
        allow_override: args.allow_override,
        id_provider: Box::new(MemoryIdProvider::new()),
    })?;

    if let Some(path) = &args.bindings {
        let bindings = bindings_from_toml_str(&read(path)?)
            .with_context(|| format!("loading {}", path.display()))?;
        for (extension, binding) in bindings {
            compiler.register_binding(&extension, binding)?;
        }
    }

    if args.sources.is_empty() {
        bail!("no source files given");
    }
    let mut source_files = Vec::new();
    for path in &args.sources {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or(&args.script_extension)
            .to_owned();
        let content =
            fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        source_files.push(SourceFile::new(path.clone(), &extension, content));
    }

    let input = Input {
        source_files,
        run_id_generation: !args.analyze_only,
        run_code_generation: !args.analyze_only,
    };
    let mut cache = Compiler::diagnostic_cache(&input);
    let output = compiler.compile(input)?;

    let mut errors = 0usize;
    for file in &output.compiled_files {
        for diagnostic in &file.errors {
            errors += 1;
            let mut rendered = Vec::new();
            diagnostic.write_report(&mut rendered, &mut cache, true)?;
            eprint!("{}", String::from_utf8_lossy(&rendered));
        }
    }

    let mut written = 0usize;
    for file in &output.compiled_files {
        for unit in &file.units {
            let Some(artifact) = &unit.artifact else {
                continue;
            };
            let (encoded, kind) = match artifact {
                Artifact::Script { binary, encoded } => {
                    if args.dump {
                        println!("{binary}");
                    }
                    (encoded, "script")
                }
                Artifact::Config { encoded, .. } => (encoded, &*unit.group),
            };
            if let Some(out) = &args.out {
                let target = out.join(format!(
                    "{}.{kind}.bin",
                    sanitize(&unit.name),
                ));
                fs::create_dir_all(out)?;
                fs::write(&target, encoded)
                    .with_context(|| format!("writing {}", target.display()))?;
                written += 1;
            }
        }
    }

    info!(
        "{} files, {} errors, {} artifacts written",
        output.compiled_files.len(),
        errors,
        written
    );
    if output.has_errors() {
        std::process::exit(1);
    }
    Ok(())
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}
