mod common;

use common::{
    compile, compiler, config_binary, config_encoded, obj_binding, SCRIPT_EXT,
};
use scroll_compiler::codegen::{BinaryProperty, BinaryValue};
use scroll_compiler::reporting::{DiagnosticKind, SemanticError};
use scroll_compiler::writer::read_config;
use scroll_compiler::PrimitiveType;

fn obj_compiler() -> scroll_compiler::Compiler {
    let mut compiler = compiler();
    compiler
        .register_binding("obj", obj_binding())
        .expect("first registration");
    compiler
}

#[test]
fn duplicate_binding_registration_is_a_hard_error() {
    let mut compiler = obj_compiler();
    assert!(matches!(
        compiler.register_binding("obj", obj_binding()),
        Err(scroll_compiler::CompilerError::DuplicateBinding(ext)) if ext == "obj"
    ));
}

#[test]
fn missing_binding_aborts_the_batch() {
    let mut compiler = compiler();
    let input = scroll_compiler::Input {
        source_files: vec![scroll_compiler::SourceFile::new(
            "a.npc",
            "npc",
            "[npc_a]\nname = \"x\"",
        )],
        run_id_generation: false,
        run_code_generation: false,
    };
    assert!(matches!(
        compiler.compile(input),
        Err(scroll_compiler::CompilerError::MissingBinding(ext)) if ext == "npc"
    ));
}

#[test]
fn emit_empty_if_true_writes_an_empty_payload() {
    let mut compiler = obj_compiler();
    let output = compile(&mut compiler, &[("a.obj", "obj", "[obj_a]\nmembers = yes")]);

    assert!(!output.has_errors());
    let binary = config_binary(&output, "a.obj", 0);
    assert_eq!(
        binary.properties,
        vec![BinaryProperty::Basic {
            opcode: 0x0a,
            types: vec![PrimitiveType::Bool],
            values: None,
        }]
    );
    assert_eq!(config_encoded(&output, "a.obj", 0), &[0x0a, 0x00]);
}

#[test]
fn emit_empty_if_true_omits_the_false_case() {
    let mut compiler = obj_compiler();
    let output = compile(&mut compiler, &[("a.obj", "obj", "[obj_a]\nmembers = no")]);

    assert!(!output.has_errors());
    let binary = config_binary(&output, "a.obj", 0);
    assert!(binary.properties.is_empty());
    // Rule-suppressed config: terminator only.
    assert_eq!(config_encoded(&output, "a.obj", 0), &[0x00]);
}

#[test]
fn type_dispatch_picks_the_long_opcode() {
    let mut compiler = obj_compiler();
    let output = compile(
        &mut compiler,
        &[("a.obj", "obj", "[obj_a]\ntype = long\nval = 99")],
    );

    assert!(!output.has_errors());
    let binary = config_binary(&output, "a.obj", 0);
    assert_eq!(
        binary.properties,
        vec![BinaryProperty::Basic {
            opcode: 0x13,
            types: vec![PrimitiveType::Long],
            values: Some(vec![BinaryValue::Long(99)]),
        }]
    );
}

#[test]
fn type_dispatch_picks_the_int_opcode() {
    let mut compiler = obj_compiler();
    let output = compile(
        &mut compiler,
        &[("a.obj", "obj", "[obj_a]\nval = 7\ntype = int")],
    );

    assert!(!output.has_errors());
    let binary = config_binary(&output, "a.obj", 0);
    assert_eq!(binary.properties[0].opcode(), 0x12);
}

#[test]
fn missing_companion_type_is_diagnosed() {
    let mut compiler = obj_compiler();
    let output = compile(&mut compiler, &[("a.obj", "obj", "[obj_a]\nval = 99")]);
    let file = &output.compiled_files[0];
    assert!(file.erroneous);
    assert!(file.errors.iter().any(|d| matches!(
        &d.kind,
        DiagnosticKind::Semantic(SemanticError::MissingTypeProperty { companion, .. })
            if companion == "type"
    )));
}

#[test]
fn opcode_set_matches_the_source_properties() {
    let mut compiler = obj_compiler();
    let output = compile(
        &mut compiler,
        &[("a.obj", "obj", "[obj_a]\ncost = 100\nname = \"Thing\"")],
    );

    assert!(!output.has_errors());
    let binary = config_binary(&output, "a.obj", 0);
    let opcodes: Vec<u8> = binary.properties.iter().map(|p| p.opcode()).collect();
    assert_eq!(opcodes, vec![0x0b, 0x0c]);
}

#[test]
fn range_rule_bounds_integer_values() {
    let mut compiler = obj_compiler();
    let output = compile(&mut compiler, &[("a.obj", "obj", "[obj_a]\ncost = 20000")]);
    let file = &output.compiled_files[0];
    assert!(file.erroneous);
    assert!(file.errors.iter().any(|d| matches!(
        d.kind,
        DiagnosticKind::Semantic(SemanticError::ValueOutOfRange {
            value: 20000,
            min: 0,
            max: 10000
        })
    )));
}

#[test]
fn require_rule_needs_its_companion() {
    let mut compiler = obj_compiler();
    let output = compile(
        &mut compiler,
        &[
            ("bad.obj", "obj", "[obj_a]\ncertificate = 1"),
            ("good.obj", "obj", "[obj_b]\nmembers = yes\ncertificate = 1"),
        ],
    );

    let bad = output.file(std::path::Path::new("bad.obj")).unwrap();
    assert!(bad.errors.iter().any(|d| matches!(
        &d.kind,
        DiagnosticKind::Semantic(SemanticError::MissingRequiredProperty { required, .. })
            if required == "members"
    )));
    let good = output.file(std::path::Path::new("good.obj")).unwrap();
    assert!(!good.erroneous);
}

#[test]
fn unknown_property_is_diagnosed() {
    let mut compiler = obj_compiler();
    let output = compile(&mut compiler, &[("a.obj", "obj", "[obj_a]\nbogus = 1")]);
    assert!(output.compiled_files[0].errors.iter().any(|d| matches!(
        &d.kind,
        DiagnosticKind::Semantic(SemanticError::UnknownProperty { key }) if key == "bogus"
    )));
}

#[test]
fn split_array_accumulates_in_first_component_order() {
    let mut compiler = obj_compiler();
    let output = compile(
        &mut compiler,
        &[(
            "pack.obj",
            "obj",
            "[item_a]\ncost = 1\n[item_b]\ncost = 2\n[pack]\nname = \"Pack\"\ncount_obj1 = item_a\ncount_n1 = 5\ncount_obj2 = item_b\ncount_n2 = 2",
        )],
    );

    assert!(!output.has_errors());
    let binary = config_binary(&output, "pack.obj", 2);
    assert_eq!(binary.name, "pack");
    assert_eq!(binary.properties.len(), 2);
    assert_eq!(binary.properties[0].opcode(), 0x0c, "name came first");
    let BinaryProperty::SplitArray {
        opcode, elements, ..
    } = &binary.properties[1]
    else {
        panic!("expected the aggregate record");
    };
    assert_eq!(*opcode, 100);
    let item_a = output.file(std::path::Path::new("pack.obj")).unwrap().units[0]
        .id
        .expect("id generated");
    let item_b = output.file(std::path::Path::new("pack.obj")).unwrap().units[1]
        .id
        .expect("id generated");
    assert_eq!(
        elements,
        &vec![
            vec![BinaryValue::ConfigId(item_a), BinaryValue::Int(5)],
            vec![BinaryValue::ConfigId(item_b), BinaryValue::Int(2)],
        ]
    );
}

#[test]
fn params_pair_ids_with_self_describing_values() {
    let mut compiler = obj_compiler();
    let output = compile(
        &mut compiler,
        &[(
            "a.obj",
            "obj",
            "[obj_a]\nparam = attack_bonus, 5\nparam = speed, \"fast\"",
        )],
    );

    assert!(!output.has_errors());
    let binary = config_binary(&output, "a.obj", 0);
    assert_eq!(
        binary.properties,
        vec![BinaryProperty::ParamMap {
            opcode: 249,
            entries: vec![
                (7, BinaryValue::Int(5)),
                (8, BinaryValue::Str("fast".to_owned())),
            ],
        }]
    );
}

#[test]
fn map_entries_dispatch_on_the_value_type() {
    let mut compiler = obj_compiler();
    let output = compile(
        &mut compiler,
        &[(
            "a.obj",
            "obj",
            "[lookup]\nvaltype = string\nentry = 1, \"one\"\nentry = 2, \"two\"",
        )],
    );

    assert!(!output.has_errors());
    let binary = config_binary(&output, "a.obj", 0);
    assert_eq!(
        binary.properties,
        vec![BinaryProperty::Map {
            opcode: 0x1f,
            key_type: PrimitiveType::Int,
            value_type: PrimitiveType::String,
            entries: vec![
                (BinaryValue::Int(1), BinaryValue::Str("one".to_owned())),
                (BinaryValue::Int(2), BinaryValue::Str("two".to_owned())),
            ],
        }]
    );
}

#[test]
fn graphics_lower_to_their_ids() {
    let mut compiler = obj_compiler();
    let output = compile(
        &mut compiler,
        &[("a.obj", "obj", "[obj_a]\nicon = \"icon_star\"")],
    );

    assert!(!output.has_errors());
    let binary = config_binary(&output, "a.obj", 0);
    assert_eq!(
        binary.properties,
        vec![BinaryProperty::Basic {
            opcode: 0x0d,
            types: vec![PrimitiveType::Graphic],
            values: Some(vec![BinaryValue::Graphic(5)]),
        }]
    );
}

#[test]
fn constants_substitute_their_values() {
    let mut compiler = obj_compiler();
    let output = compile(
        &mut compiler,
        &[("a.obj", "obj", "[obj_a]\ncost = ^max_level")],
    );

    assert!(!output.has_errors());
    let binary = config_binary(&output, "a.obj", 0);
    assert_eq!(
        binary.properties,
        vec![BinaryProperty::Basic {
            opcode: 0x0b,
            types: vec![PrimitiveType::Int],
            values: Some(vec![BinaryValue::Int(99)]),
        }]
    );
}

#[test]
fn binary_configs_round_trip_through_the_reader() {
    let mut compiler = obj_compiler();
    let output = compile(
        &mut compiler,
        &[(
            "rich.obj",
            "obj",
            "[item_a]\ncost = 1\n[rich]\nname = \"Rich\"\ncost = 650\nicon = \"icon_star\"\nspawn = `0_50_50_11_31\nlink = item_a\ntype = long\nval = 99\ncount_obj1 = item_a\ncount_n1 = 3\nparam = attack_bonus, 5\nvaltype = string\nentry = 1, \"one\"",
        )],
    );

    assert!(!output.has_errors(), "{:?}", output.errors().collect::<Vec<_>>());
    let binary = config_binary(&output, "rich.obj", 1);
    let encoded = config_encoded(&output, "rich.obj", 1);
    let reread = read_config("obj", "rich", encoded, &obj_binding()).expect("readable");
    assert_eq!(&reread, binary);
}

#[test]
fn config_references_resolve_forward_within_the_batch() {
    let mut compiler = obj_compiler();
    let output = compile(
        &mut compiler,
        &[
            ("first.obj", "obj", "[obj_a]\nlink = obj_b"),
            ("second.obj", "obj", "[obj_b]\ncost = 1"),
        ],
    );

    assert!(!output.has_errors());
    let a = config_binary(&output, "first.obj", 0);
    let b_id = output.file(std::path::Path::new("second.obj")).unwrap().units[0]
        .id
        .expect("id generated");
    assert_eq!(
        a.properties,
        vec![BinaryProperty::Basic {
            opcode: 0x0f,
            types: vec![PrimitiveType::Obj],
            values: Some(vec![BinaryValue::ConfigId(b_id)]),
        }]
    );
}

#[test]
fn duplicate_config_names_are_diagnosed() {
    let mut compiler = obj_compiler();
    let output = compile(
        &mut compiler,
        &[
            ("a.obj", "obj", "[obj_a]\ncost = 1"),
            ("b.obj", "obj", "[obj_a]\ncost = 2"),
        ],
    );

    let second = output.file(std::path::Path::new("b.obj")).unwrap();
    assert!(second.erroneous);
    assert!(second.errors.iter().any(|d| matches!(
        &d.kind,
        DiagnosticKind::Semantic(SemanticError::DuplicateDeclaration { name }) if name == "obj_a"
    )));
}

#[test]
fn scripts_and_configs_share_a_batch() {
    let mut compiler = obj_compiler();
    let output = compile(
        &mut compiler,
        &[
            ("items.obj", "obj", "[ruby_ring]\ncost = 400"),
            (
                "use.scroll",
                SCRIPT_EXT,
                "[proc,wear] def_obj $ring = ruby_ring; mes(\"ok\");",
            ),
        ],
    );

    assert!(!output.has_errors(), "{:?}", output.errors().collect::<Vec<_>>());
    for file in &output.compiled_files {
        assert!(file.units.iter().all(|u| u.artifact.is_some()));
    }
}
