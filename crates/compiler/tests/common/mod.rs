//! Shared harness: a compiler wired up the way a host would do it, with a
//! small command/trigger universe and an in-memory id provider.
#![allow(dead_code)]

use scroll_compiler::codegen::{BinaryConfig, BinaryScript};
use scroll_compiler::{
    Artifact, Binding, CommandInfo, Compiler, CompilerOptions, ConfigRule, ConstantInfo,
    ConstantValue, Input, InstructionMap, MemoryIdProvider, Output, PrimitiveType,
    PropertyBinding, PropertyDescriptor, SourceFile, TriggerCatalog, TriggerInfo, Type,
};

pub const SCRIPT_EXT: &str = "scroll";

pub fn triggers() -> TriggerCatalog {
    let mut catalog = TriggerCatalog::new();
    catalog.insert(TriggerInfo {
        name: "proc".to_owned(),
        opcode: None,
        sigil: Some('~'),
        support_arguments: true,
        support_returns: true,
        argument_types: vec![],
        return_types: vec![],
    });
    catalog.insert(TriggerInfo {
        name: "login".to_owned(),
        opcode: Some(10),
        sigil: None,
        support_arguments: false,
        support_returns: false,
        argument_types: vec![],
        return_types: vec![],
    });
    catalog
}

pub fn commands() -> Vec<CommandInfo> {
    vec![
        CommandInfo {
            opcode: 3100,
            name: "mes".to_owned(),
            return_type: Type::VOID,
            argument_types: vec![PrimitiveType::String],
            hook: false,
            hook_type: None,
            alternative: false,
            tag: None,
        },
        CommandInfo {
            opcode: 3120,
            name: "random".to_owned(),
            return_type: Type::of(PrimitiveType::Int),
            argument_types: vec![PrimitiveType::Int],
            hook: false,
            hook_type: None,
            alternative: false,
            tag: None,
        },
        CommandInfo {
            opcode: 1102,
            name: "cc_settext".to_owned(),
            return_type: Type::VOID,
            argument_types: vec![PrimitiveType::String],
            hook: false,
            hook_type: None,
            alternative: true,
            tag: None,
        },
        CommandInfo {
            opcode: 4000,
            name: "on_click".to_owned(),
            return_type: Type::VOID,
            argument_types: vec![],
            hook: true,
            hook_type: Some(PrimitiveType::Int),
            alternative: false,
            tag: Some("ui".to_owned()),
        },
    ]
}

pub fn provider() -> MemoryIdProvider {
    let mut provider = MemoryIdProvider::new();
    provider.seed("varp", "energy", 12);
    provider.seed("varpbit", "flag_3", 3);
    provider.seed("varcstring", "nickname", 2);
    provider.seed("param", "attack_bonus", 7);
    provider.seed("param", "speed", 8);
    provider
}

pub fn compiler() -> Compiler {
    compiler_with(false)
}

pub fn compiler_with(allow_override: bool) -> Compiler {
    let mut compiler = Compiler::new(CompilerOptions {
        instruction_map: InstructionMap::sequential(),
        triggers: triggers(),
        commands: commands(),
        constants: vec![
            ConstantInfo {
                name: "max_level".to_owned(),
                value: ConstantValue::Int(99),
            },
            ConstantInfo {
                name: "greeting".to_owned(),
                value: ConstantValue::Str("hello".to_owned()),
            },
        ],
        graphics: vec![("icon_star".to_owned(), 5)],
        scripts: vec![],
        script_extension: SCRIPT_EXT.to_owned(),
        allow_override,
        id_provider: Box::new(provider()),
    })
    .expect("harness options are valid");
    compiler.register_config("varp", "energy");
    compiler.register_config("varpbit", "flag_3");
    compiler.register_config("varcstring", "nickname");
    compiler.register_config("param", "attack_bonus");
    compiler.register_config("param", "speed");
    compiler
}

/// The obj binding exercising every descriptor kind.
pub fn obj_binding() -> Binding {
    let mut binding = Binding::new("obj");
    binding.put(PropertyBinding {
        name: "members".to_owned(),
        descriptor: PropertyDescriptor::Basic {
            opcode: 0x0a,
            components: vec![PrimitiveType::Bool],
        },
        rules: vec![ConfigRule::EmitEmptyIfTrue],
    });
    binding.put(PropertyBinding {
        name: "cost".to_owned(),
        descriptor: PropertyDescriptor::Basic {
            opcode: 0x0b,
            components: vec![PrimitiveType::Int],
        },
        rules: vec![ConfigRule::Range {
            min: 0,
            max: 10000,
        }],
    });
    binding.put(PropertyBinding {
        name: "name".to_owned(),
        descriptor: PropertyDescriptor::Basic {
            opcode: 0x0c,
            components: vec![PrimitiveType::String],
        },
        rules: vec![],
    });
    binding.put(PropertyBinding {
        name: "icon".to_owned(),
        descriptor: PropertyDescriptor::Basic {
            opcode: 0x0d,
            components: vec![PrimitiveType::Graphic],
        },
        rules: vec![],
    });
    binding.put(PropertyBinding {
        name: "certificate".to_owned(),
        descriptor: PropertyDescriptor::Basic {
            opcode: 0x0e,
            components: vec![PrimitiveType::Int],
        },
        rules: vec![ConfigRule::Require("members".to_owned())],
    });
    binding.put(PropertyBinding {
        name: "link".to_owned(),
        descriptor: PropertyDescriptor::Basic {
            opcode: 0x0f,
            components: vec![PrimitiveType::Obj],
        },
        rules: vec![],
    });
    binding.put(PropertyBinding {
        name: "spawn".to_owned(),
        descriptor: PropertyDescriptor::Basic {
            opcode: 0x10,
            components: vec![PrimitiveType::CoordGrid],
        },
        rules: vec![],
    });
    binding.put(PropertyBinding {
        name: "val".to_owned(),
        descriptor: PropertyDescriptor::TypeDispatched {
            opcodes: [0x12, 0x13],
            type_property: "type".to_owned(),
        },
        rules: vec![],
    });
    for (name, element, component, ty) in [
        ("count_obj1", 0usize, 0usize, PrimitiveType::Obj),
        ("count_n1", 0, 1, PrimitiveType::Int),
        ("count_obj2", 1, 0, PrimitiveType::Obj),
        ("count_n2", 1, 1, PrimitiveType::Int),
    ] {
        binding.put(PropertyBinding {
            name: name.to_owned(),
            descriptor: PropertyDescriptor::SplitArray {
                opcode: 100,
                size_type: PrimitiveType::Int,
                max_size: 10,
                element,
                component,
                component_count: 2,
                ty,
            },
            rules: vec![],
        });
    }
    binding.put(PropertyBinding {
        name: "param".to_owned(),
        descriptor: PropertyDescriptor::Param { opcode: 249 },
        rules: vec![],
    });
    binding.put(PropertyBinding {
        name: "entry".to_owned(),
        descriptor: PropertyDescriptor::Map {
            opcodes: [0x1e, 0x1f],
            type_property: "valtype".to_owned(),
            key_type: PrimitiveType::Int,
        },
        rules: vec![],
    });
    binding
}

pub fn compile(compiler: &mut Compiler, files: &[(&str, &str, &str)]) -> Output {
    run(compiler, files, true, true)
}

pub fn analyze(compiler: &mut Compiler, files: &[(&str, &str, &str)]) -> Output {
    run(compiler, files, false, false)
}

pub fn run(
    compiler: &mut Compiler,
    files: &[(&str, &str, &str)],
    run_id_generation: bool,
    run_code_generation: bool,
) -> Output {
    let input = Input {
        source_files: files
            .iter()
            .map(|(path, extension, content)| SourceFile::new(*path, extension, *content))
            .collect(),
        run_id_generation,
        run_code_generation,
    };
    compiler.compile(input).expect("no hard failure expected")
}

pub fn script_binary<'a>(output: &'a Output, path: &str, unit: usize) -> &'a BinaryScript {
    match output
        .file(std::path::Path::new(path))
        .expect("file in output")
        .units[unit]
        .artifact
        .as_ref()
        .expect("artifact generated")
    {
        Artifact::Script { binary, .. } => binary,
        Artifact::Config { .. } => panic!("expected a script artifact"),
    }
}

pub fn config_binary<'a>(output: &'a Output, path: &str, unit: usize) -> &'a BinaryConfig {
    match output
        .file(std::path::Path::new(path))
        .expect("file in output")
        .units[unit]
        .artifact
        .as_ref()
        .expect("artifact generated")
    {
        Artifact::Config { binary, .. } => binary,
        Artifact::Script { .. } => panic!("expected a config artifact"),
    }
}

pub fn config_encoded<'a>(output: &'a Output, path: &str, unit: usize) -> &'a [u8] {
    match output
        .file(std::path::Path::new(path))
        .expect("file in output")
        .units[unit]
        .artifact
        .as_ref()
        .expect("artifact generated")
    {
        Artifact::Config { encoded, .. } => encoded,
        Artifact::Script { .. } => panic!("expected a config artifact"),
    }
}
