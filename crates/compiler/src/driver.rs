use std::collections::HashMap;
use std::path::PathBuf;

use log::debug;

use crate::ast::{ConfigNode, ScriptNode};
use crate::binding::Binding;
use crate::catalog::{InstructionMap, TriggerCatalog};
use crate::codegen::{BinaryConfig, BinaryScript, ConfigGenerator, ScriptGenerator};
use crate::error::CompilerError;
use crate::idmap::IdProvider;
use crate::lexer::{Lexer, LexicalTable, Tokenizer};
use crate::optimiser;
use crate::parser::{ConfigParser, ScriptParser};
use crate::reporting::{Diagnostic, DiagnosticCache, Diagnostics};
use crate::semantic::SemanticChecker;
use crate::symbol::{CommandInfo, ConfigInfo, ConstantInfo, ScriptInfo, SymbolTable};
use crate::tokens::FileId;
use crate::writer::{write_config, BytecodeWriter};

/// One source file handed to the driver. The extension decides the dialect:
/// the driver's script extension compiles as scripts, anything else must
/// have a registered binding.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub extension: String,
    pub content: Vec<u8>,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, extension: &str, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            extension: extension.to_owned(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Input {
    pub source_files: Vec<SourceFile>,
    pub run_id_generation: bool,
    pub run_code_generation: bool,
}

/// Everything produced for one source file, in input order on the output.
#[derive(Debug)]
pub struct CompiledFile {
    pub path: PathBuf,
    pub extension: String,
    pub units: Vec<CompiledUnit>,
    pub errors: Vec<Diagnostic>,
    pub erroneous: bool,
}

/// One script or config declared by a file.
#[derive(Debug)]
pub struct CompiledUnit {
    pub name: String,
    pub group: String,
    pub id: Option<i32>,
    pub artifact: Option<Artifact>,
}

#[derive(Debug)]
pub enum Artifact {
    Script {
        binary: BinaryScript,
        encoded: Vec<u8>,
    },
    Config {
        binary: BinaryConfig,
        encoded: Vec<u8>,
    },
}

#[derive(Debug, Default)]
pub struct Output {
    pub compiled_files: Vec<CompiledFile>,
}

impl Output {
    pub fn file(&self, path: &std::path::Path) -> Option<&CompiledFile> {
        self.compiled_files.iter().find(|file| file.path == path)
    }

    pub fn has_errors(&self) -> bool {
        self.compiled_files.iter().any(|file| file.erroneous)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.compiled_files.iter().flat_map(|file| &file.errors)
    }
}

/// Construction-time configuration for [`Compiler`].
pub struct CompilerOptions {
    pub instruction_map: InstructionMap,
    pub triggers: TriggerCatalog,
    pub commands: Vec<CommandInfo>,
    pub constants: Vec<ConstantInfo>,
    pub graphics: Vec<(String, i32)>,
    /// Scripts declared by the engine, visible to every batch.
    pub scripts: Vec<ScriptInfo>,
    pub script_extension: String,
    pub allow_override: bool,
    pub id_provider: Box<dyn IdProvider>,
}

/// The compilation driver. Owns the root symbol table and the collaborators;
/// each [`Compiler::compile`] call runs one batch against a fresh child
/// table, so a failed batch cannot pollute the root.
pub struct Compiler {
    lexical_table: LexicalTable,
    instruction_map: InstructionMap,
    triggers: TriggerCatalog,
    root: SymbolTable<'static>,
    bindings: HashMap<String, Binding>,
    script_extension: String,
    allow_override: bool,
    id_provider: Box<dyn IdProvider>,
}

impl Compiler {
    /// Validating constructor: the instruction map must be ready before any
    /// code-generation work is accepted.
    pub fn new(options: CompilerOptions) -> Result<Self, CompilerError> {
        if let Some(unmapped) = options.instruction_map.first_unmapped() {
            return Err(CompilerError::UnmappedOpcode(unmapped.name()));
        }
        let mut root = SymbolTable::new();
        for command in options.commands {
            root.define_command(command);
        }
        for constant in options.constants {
            root.define_constant(constant);
        }
        for (name, id) in options.graphics {
            root.define_graphic(&name, id);
        }
        for script in options.scripts {
            root.define_script(script);
        }
        Ok(Self {
            lexical_table: LexicalTable::scroll(),
            instruction_map: options.instruction_map,
            triggers: options.triggers,
            root,
            bindings: HashMap::new(),
            script_extension: options.script_extension,
            allow_override: options.allow_override,
            id_provider: options.id_provider,
        })
    }

    /// Registers the config schema for a file extension. Registering the
    /// same extension twice is a programmer error.
    pub fn register_binding(
        &mut self,
        extension: &str,
        binding: Binding,
    ) -> Result<(), CompilerError> {
        if self.bindings.contains_key(extension) {
            return Err(CompilerError::DuplicateBinding(extension.to_owned()));
        }
        self.bindings.insert(extension.to_owned(), binding);
        Ok(())
    }

    /// Pre-registers a config entry in the root table, e.g. engine-defined
    /// varps the scripts may reference.
    pub fn register_config(&mut self, group: &str, name: &str) {
        self.root.define_config(ConfigInfo {
            group: group.to_owned(),
            name: name.to_owned(),
            id: None,
        });
    }

    /// A diagnostic cache over an input, for rendering errors.
    pub fn diagnostic_cache(input: &Input) -> DiagnosticCache {
        DiagnosticCache::new(input.source_files.iter().enumerate().map(|(index, file)| {
            (
                FileId::new(index),
                (
                    file.path.display().to_string(),
                    String::from_utf8_lossy(&file.content).into_owned(),
                ),
            )
        }))
    }

    /// Runs one batch: parse every file, declare then check every unit,
    /// assign ids, generate and serialize artifacts for the clean files.
    pub fn compile(&mut self, input: Input) -> Result<Output, CompilerError> {
        let Compiler {
            lexical_table,
            instruction_map,
            triggers,
            root,
            bindings,
            script_extension,
            allow_override,
            id_provider,
        } = self;
        let mut batch = root.child();
        let mut batch_files = Vec::new();

        // Parse.
        for (index, source) in input.source_files.iter().enumerate() {
            let file_id = FileId::new(index);
            let content = String::from_utf8_lossy(&source.content).into_owned();
            let mut diagnostics = Diagnostics::new();
            let units = if source.extension == *script_extension {
                let tokenizer = Tokenizer::new(lexical_table, &content, file_id);
                let parser =
                    ScriptParser::new(lexical_table, Lexer::new(tokenizer), &mut diagnostics);
                ParsedUnits::Scripts(parser.parse_file())
            } else {
                let binding = bindings
                    .get(&source.extension)
                    .ok_or_else(|| CompilerError::MissingBinding(source.extension.clone()))?;
                let tokenizer = Tokenizer::new(lexical_table, &content, file_id);
                let parser = ConfigParser::new(Lexer::new(tokenizer), &mut diagnostics);
                ParsedUnits::Configs(parser.parse_file(), binding.group().to_owned())
            };
            batch_files.push(FileState {
                path: source.path.clone(),
                extension: source.extension.clone(),
                units,
                diagnostics,
            });
        }
        debug!(
            "parsed {} files into {} units",
            batch_files.len(),
            batch_files.iter().map(FileState::unit_count).sum::<usize>()
        );

        // Declare, then check: the pre-pass makes forward references work.
        {
            let mut checker = SemanticChecker::new(&mut batch, triggers, *allow_override);
            for file in &mut batch_files {
                match &file.units {
                    ParsedUnits::Scripts(scripts) => {
                        for script in scripts {
                            checker.declare_script(script, &mut file.diagnostics);
                        }
                    }
                    ParsedUnits::Configs(configs, group) => {
                        for config in configs {
                            checker.declare_config(config, group, &mut file.diagnostics);
                        }
                    }
                }
            }
            for file in &mut batch_files {
                match &file.units {
                    ParsedUnits::Scripts(scripts) => {
                        for script in scripts {
                            checker.check_script(script, &mut file.diagnostics);
                        }
                    }
                    ParsedUnits::Configs(configs, _) => {
                        let binding = &bindings[&file.extension];
                        for config in configs {
                            checker.check_config(config, binding, &mut file.diagnostics);
                        }
                    }
                }
            }
        }

        // Id generation runs for every unit — erroneous ones included, since
        // other files may reference them by name — and must finish before
        // any code generation so cross-file references resolve.
        let mut ids: Vec<Vec<Option<i32>>> = batch_files
            .iter()
            .map(|file| vec![None; file.unit_count()])
            .collect();
        if input.run_id_generation {
            for (file_index, file) in batch_files.iter().enumerate() {
                match &file.units {
                    ParsedUnits::Scripts(scripts) => {
                        for (unit_index, script) in scripts.iter().enumerate() {
                            let id = id_provider
                                .find_or_create_config("script", &script.full_name());
                            ids[file_index][unit_index] = Some(id);
                        }
                    }
                    ParsedUnits::Configs(configs, group) => {
                        for (unit_index, config) in configs.iter().enumerate() {
                            let id = id_provider.find_or_create_config(group, &config.name.text);
                            batch.set_config_id(group, &config.name.text, id);
                            ids[file_index][unit_index] = Some(id);
                        }
                    }
                }
            }
        }

        // Code generation, for the clean files only.
        let mut output = Output::default();
        for (file, file_ids) in batch_files.into_iter().zip(ids) {
            let erroneous = file.diagnostics.has_any();
            let mut units = Vec::new();
            match &file.units {
                ParsedUnits::Scripts(scripts) => {
                    for (script, id) in scripts.iter().zip(file_ids) {
                        let artifact = if input.run_code_generation && !erroneous {
                            let mut binary =
                                ScriptGenerator::new(&batch).generate(script, &file.extension);
                            optimiser::optimise(&mut binary);
                            let writer =
                                BytecodeWriter::new(instruction_map, id_provider.as_ref());
                            let encoded = writer.write(&binary)?;
                            Some(Artifact::Script { binary, encoded })
                        } else {
                            None
                        };
                        units.push(CompiledUnit {
                            name: script.full_name(),
                            group: "script".to_owned(),
                            id,
                            artifact,
                        });
                    }
                }
                ParsedUnits::Configs(configs, group) => {
                    for (config, id) in configs.iter().zip(file_ids) {
                        let artifact = if input.run_code_generation && !erroneous {
                            let binding = &bindings[&file.extension];
                            let generator =
                                ConfigGenerator::new(&batch, binding, id_provider.as_ref());
                            let binary = generator.generate(config)?;
                            let encoded = write_config(&binary);
                            Some(Artifact::Config { binary, encoded })
                        } else {
                            None
                        };
                        units.push(CompiledUnit {
                            name: config.name.text.clone(),
                            group: group.clone(),
                            id,
                            artifact,
                        });
                    }
                }
            }
            output.compiled_files.push(CompiledFile {
                path: file.path,
                extension: file.extension,
                units,
                errors: file.diagnostics.into_vec(),
                erroneous,
            });
        }
        debug!(
            "batch complete: {} files, {} erroneous",
            output.compiled_files.len(),
            output
                .compiled_files
                .iter()
                .filter(|f| f.erroneous)
                .count()
        );
        Ok(output)
    }
}

enum ParsedUnits {
    Scripts(Vec<ScriptNode>),
    Configs(Vec<ConfigNode>, String),
}

struct FileState {
    path: PathBuf,
    extension: String,
    units: ParsedUnits,
    diagnostics: Diagnostics,
}

impl FileState {
    fn unit_count(&self) -> usize {
        match &self.units {
            ParsedUnits::Scripts(scripts) => scripts.len(),
            ParsedUnits::Configs(configs, _) => configs.len(),
        }
    }
}
