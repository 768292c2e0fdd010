use apigen_common::ErrorKind;
use apigen_model::{Access, ApiArena, NodeIndex, NodeKind, ParamFlags};
use apigen_parser::{ExternalDefines, ParseOptions, parse_header};

fn parse(source: &str) -> (ApiArena, NodeIndex) {
    let options = ParseOptions::default();
    parse_header(source, "Test.h", &options).expect("parse failed")
}

fn parse_err(source: &str) -> apigen_common::Error {
    let options = ParseOptions::default();
    parse_header(source, "Test.h", &options).expect_err("parse should fail")
}

fn single_class(arena: &ApiArena, file: NodeIndex) -> NodeIndex {
    let children = &arena.get(file).children;
    assert_eq!(children.len(), 1, "expected one top-level type");
    children[0]
}

#[test]
fn scripting_class_with_function() {
    let source = r#"
API_CLASS() class FLAX_API Foo : public ScriptingObject
{
public:
    API_FUNCTION() int Bar(float x);
};
"#;
    let (arena, file) = parse(source);
    let class = single_class(&arena, file);
    let node = arena.get(class);
    assert_eq!(node.name, "Foo");
    let info = node.as_class().unwrap();
    assert_eq!(info.base.as_ref().unwrap().type_name, "ScriptingObject");
    assert_eq!(info.functions.len(), 1);
    let bar = &info.functions[0];
    assert_eq!(bar.name, "Bar");
    assert_eq!(bar.unique_name, "Bar");
    assert_eq!(bar.return_type.type_name, "int32");
    assert_eq!(bar.parameters.len(), 1);
    assert_eq!(bar.parameters[0].name, "x");
    assert_eq!(bar.parameters[0].type_ref.type_name, "float");
    assert_eq!(bar.access, Access::Public);
}

#[test]
fn struct_with_string_field() {
    let source = r#"
API_STRUCT() struct FLAX_API V
{
    API_FIELD() float X;
    API_FIELD() String Name;
};
"#;
    let (arena, file) = parse(source);
    let node = arena.get(single_class(&arena, file));
    let info = node.as_struct().unwrap();
    assert_eq!(info.fields.len(), 2);
    assert_eq!(info.fields[0].name, "X");
    assert_eq!(info.fields[1].type_ref.type_name, "String");
    // struct members default to public access
    assert_eq!(info.fields[0].access, Access::Public);
}

#[test]
fn enum_with_underlying_type_and_max_comment() {
    let source = r#"
API_ENUM() enum class E : uint8
{
    A,
    B = 1 << 2,
    MAX
};
"#;
    let (arena, file) = parse(source);
    let node = arena.get(single_class(&arena, file));
    let info = node.as_enum().unwrap();
    assert_eq!(info.underlying.as_ref().unwrap().type_name, "uint8");
    assert_eq!(info.entries.len(), 3);
    assert_eq!(info.entries[0].name, "A");
    assert_eq!(info.entries[1].value.as_deref(), Some("1 << 2"));
    assert_eq!(info.entries[2].name, "MAX");
    assert_eq!(
        info.entries[2].comment,
        vec!["/// <summary>The count of items in the E enum.</summary>"]
    );
}

#[test]
fn enum_rejects_nested_api_types() {
    let source = r#"
API_ENUM() enum class E
{
    API_CLASS() A,
};
"#;
    let err = parse_err(source);
    assert_eq!(err.kind, ErrorKind::Semantic);
    assert!(err.message.contains("sub-types"), "{err}");
}

#[test]
fn property_accessors_merge_by_name() {
    let source = r#"
API_CLASS() class FLAX_API Widget : public ScriptingObject
{
public:
    /// Gets count.
    API_PROPERTY() int32 GetCount() const;
    API_PROPERTY() void SetCount(int32 value);
};
"#;
    let (arena, file) = parse(source);
    let node = arena.get(single_class(&arena, file));
    let info = node.as_class().unwrap();
    assert_eq!(info.properties.len(), 1);
    let property = &info.properties[0];
    assert_eq!(property.name, "Count");
    assert_eq!(property.type_ref.type_name, "int32");
    assert!(property.getter.as_ref().unwrap().is_const);
    assert_eq!(
        property.setter.as_ref().unwrap().parameters[0].name,
        "value"
    );
}

#[test]
fn second_getter_for_a_property_is_rejected() {
    let source = r#"
API_CLASS() class FLAX_API Widget : public ScriptingObject
{
public:
    API_PROPERTY() int32 GetCount() const;
    API_PROPERTY() int32 GetCount() const;
};
"#;
    let err = parse_err(source);
    assert_eq!(err.kind, ErrorKind::Semantic);
    assert!(err.message.contains("already has a getter"), "{err}");
}

#[test]
fn event_declarations_accept_only_the_delegate_sum() {
    let source = r#"
API_CLASS() class FLAX_API Emitter : public ScriptingObject
{
public:
    API_EVENT() Action Started;
    API_EVENT() Delegate<float, int32> Progress;
};
"#;
    let (arena, file) = parse(source);
    let node = arena.get(single_class(&arena, file));
    let info = node.as_class().unwrap();
    assert_eq!(info.events.len(), 2);
    assert!(info.events[0].signature.is_empty());
    assert_eq!(info.events[1].signature.len(), 2);

    let bad = r#"
API_CLASS() class FLAX_API Emitter : public ScriptingObject
{
public:
    API_EVENT() Function<void(float)> Broken;
};
"#;
    let err = parse_err(bad);
    assert_eq!(err.kind, ErrorKind::Semantic);
    assert!(err.message.contains("Action or Delegate"), "{err}");
}

#[test]
fn bit_field_wider_than_one_is_rejected_with_location() {
    let source = r#"
API_STRUCT() struct FLAX_API Flags
{
    API_FIELD() uint32 Mode : 2;
};
"#;
    let err = parse_err(source);
    assert_eq!(err.kind, ErrorKind::Semantic);
    let location = err.location.unwrap();
    assert_eq!(location.file.as_ref(), "Test.h");
    assert_eq!(location.line, 4);
}

#[test]
fn one_bit_field_is_accepted() {
    let source = r#"
API_STRUCT() struct FLAX_API Flags
{
    API_FIELD() uint32 Visible : 1;
};
"#;
    let (arena, file) = parse(source);
    let node = arena.get(single_class(&arena, file));
    let info = node.as_struct().unwrap();
    assert!(info.fields[0].type_ref.is_bit_field);
    assert_eq!(info.fields[0].type_ref.bit_size, Some(1));
}

#[test]
fn fixed_array_field_records_its_extent() {
    let source = r#"
API_STRUCT() struct FLAX_API Bones
{
    API_FIELD() float Weights[8];
    API_FIELD(NoArray) float Fixed[4];
};
"#;
    let (arena, file) = parse(source);
    let node = arena.get(single_class(&arena, file));
    let info = node.as_struct().unwrap();
    assert!(info.fields[0].type_ref.is_array);
    assert_eq!(info.fields[0].type_ref.array_size.as_deref(), Some("8"));
    assert!(!info.fields[0].no_array);
    assert!(info.fields[1].no_array);
}

#[test]
fn mismatched_closing_brace_reports_file_and_line() {
    let err = parse_err("}\n");
    assert_eq!(err.kind, ErrorKind::Syntax);
    let location = err.location.clone().unwrap();
    assert_eq!(location.line, 1);
    assert!(err.message.contains("mismatched"), "{err}");
}

#[test]
fn inactive_preprocessor_branches_hide_api_tags() {
    let source = r#"
#if PLATFORM_UNKNOWN
API_CLASS() class FLAX_API Hidden : public ScriptingObject
{
};
#endif
API_CLASS() class FLAX_API Visible : public ScriptingObject
{
};
"#;
    let (arena, file) = parse(source);
    let names: Vec<_> = arena
        .get(file)
        .children
        .iter()
        .map(|&c| arena.get(c).name.clone())
        .collect();
    assert_eq!(names, vec!["Visible"]);
}

#[test]
fn defines_gate_branches_and_nested_ifs_balance() {
    let source = r#"
#define WITH_WIDGETS 1
#if WITH_WIDGETS
API_CLASS() class FLAX_API Widget : public ScriptingObject
{
};
#endif
#if MISSING
#if ALSO_MISSING
#endif
API_CLASS() class FLAX_API Skipped : public ScriptingObject
{
};
#endif
"#;
    let (arena, file) = parse(source);
    let names: Vec<_> = arena
        .get(file)
        .children
        .iter()
        .map(|&c| arena.get(c).name.clone())
        .collect();
    assert_eq!(names, vec!["Widget"]);
}

#[test]
fn external_defines_activate_branches() {
    let source = r#"
#if USE_EDITOR
API_CLASS() class FLAX_API EditorOnly : public ScriptingObject
{
};
#endif
"#;
    let options = ParseOptions {
        external_defines: ExternalDefines::from_lists(
            &["USE_EDITOR".to_string()],
            &[],
            &[],
        ),
        ..ParseOptions::default()
    };
    let (arena, file) = parse_header(source, "Test.h", &options).unwrap();
    assert_eq!(arena.get(file).children.len(), 1);
}

#[test]
fn include_guards_do_not_hide_content() {
    let source = r#"
#pragma once
#ifndef GUARD_H
#define GUARD_H
API_CLASS() class FLAX_API Guarded : public ScriptingObject
{
};
#endif
"#;
    let (arena, file) = parse(source);
    assert_eq!(arena.get(file).children.len(), 1);
}

#[test]
fn tag_parameters_shape_the_node() {
    let source = r#"
API_CLASS(Sealed, Attributes="HideInEditor", Name=Sprite, Namespace="Game.UI", Tag=Category=Render)
class FLAX_API SpriteImpl : public ScriptingObject
{
};
"#;
    let (arena, file) = parse(source);
    let node = arena.get(single_class(&arena, file));
    assert_eq!(node.name, "Sprite");
    assert_eq!(node.native_name.as_deref(), Some("SpriteImpl"));
    assert_eq!(node.namespace.as_deref(), Some("Game.UI"));
    assert_eq!(node.attributes.as_deref(), Some("HideInEditor"));
    assert_eq!(node.tags.get("Category").map(String::as_str), Some("Render"));
    assert!(node.as_class().unwrap().is_sealed);
}

#[test]
fn doc_comment_block_is_attached_and_normalized() {
    let source = r#"
/// The root of the scene tree.
API_CLASS() class FLAX_API Scene : public ScriptingObject
{
};
"#;
    let (arena, file) = parse(source);
    let node = arena.get(single_class(&arena, file));
    assert_eq!(
        node.comment,
        vec![
            "/// <summary>",
            "/// The root of the scene tree.",
            "/// </summary>"
        ]
    );
}

#[test]
fn parameters_carry_defaults_and_decorations() {
    let source = r#"
API_CLASS() class FLAX_API Caster : public ScriptingObject
{
public:
    API_FUNCTION() bool RayCast(const Vector3& origin, API_PARAM(Out) RayHit& hit, float maxDistance = MAX_Distance, bool solid = true);
};
"#;
    let (arena, file) = parse(source);
    let node = arena.get(single_class(&arena, file));
    let function = &node.as_class().unwrap().functions[0];
    assert_eq!(function.parameters.len(), 4);
    assert!(function.parameters[1].flags.contains(ParamFlags::OUT));
    assert_eq!(
        function.parameters[2].default_value.as_deref(),
        Some("MAX_Distance")
    );
    assert_eq!(function.parameters[3].default_value.as_deref(), Some("true"));
}

#[test]
fn virtual_functions_with_inline_bodies_are_consumed() {
    let source = r#"
API_CLASS() class FLAX_API Actor : public ScriptingObject
{
public:
    API_FUNCTION() virtual void OnUpdate() { int x = 0; { x++; } }
    API_FUNCTION() virtual void OnDestroy() = 0;
};
"#;
    let (arena, file) = parse(source);
    let node = arena.get(single_class(&arena, file));
    let info = node.as_class().unwrap();
    assert_eq!(info.functions.len(), 2);
    assert!(info.functions[0].is_virtual);
    assert!(info.functions[1].is_virtual);
}

#[test]
fn typedef_instantiates_a_template_spelling() {
    let source = r#"
API_TYPEDEF() typedef Vector3Base<float> Float3;
API_TYPEDEF(Alias) using Real = float;
"#;
    let (arena, file) = parse(source);
    let children = &arena.get(file).children;
    assert_eq!(children.len(), 2);

    let float3 = arena.get(children[0]);
    let info = float3.as_typedef().unwrap();
    assert_eq!(float3.name, "Float3");
    assert_eq!(info.target.to_string(), "Vector3Base<float>");
    assert!(!info.is_alias);

    let real = arena.get(children[1]);
    assert!(real.as_typedef().unwrap().is_alias);
}

#[test]
fn inject_code_payload_is_unescaped() {
    let source = "API_INJECT_CODE(cpp, \"#include \\\"Engine/Core/Math.h\\\"\")\n";
    let (arena, file) = parse(source);
    let node = arena.get(arena.get(file).children[0]);
    let NodeKind::InjectCode(info) = &node.kind else {
        panic!("expected inject code");
    };
    assert_eq!(info.language, "cpp");
    assert_eq!(info.code, "#include \"Engine/Core/Math.h\"");
}

#[test]
fn auto_serialization_marks_the_current_type() {
    let source = r#"
API_STRUCT() struct FLAX_API Settings
{
    API_AUTO_SERIALIZATION();
    API_FIELD() int32 Quality;
};
"#;
    let (arena, file) = parse(source);
    let node = arena.get(single_class(&arena, file));
    assert!(node.as_struct().unwrap().is_auto_serialization);
}

#[test]
fn interfaces_cannot_have_base_classes() {
    let source = r#"
API_INTERFACE() class FLAX_API ISerializable : public ScriptingObject
{
};
"#;
    let err = parse_err(source);
    assert_eq!(err.kind, ErrorKind::Semantic);
    assert!(err.message.contains("cannot have base classes"), "{err}");
}

#[test]
fn nested_classes_are_rejected() {
    let source = r#"
API_CLASS() class FLAX_API Outer : public ScriptingObject
{
    API_CLASS() class FLAX_API Inner : public ScriptingObject
    {
    };
};
"#;
    let err = parse_err(source);
    assert_eq!(err.kind, ErrorKind::Semantic);
    assert!(err.message.contains("nested classes"), "{err}");
}

#[test]
fn nested_enums_are_allowed_and_namespaced() {
    let source = r#"
API_CLASS() class FLAX_API Light : public ScriptingObject
{
public:
    API_ENUM() enum class Mode
    {
        Static,
        Dynamic,
    };
};
"#;
    let options = ParseOptions {
        namespace: Some("Engine".to_string()),
        ..ParseOptions::default()
    };
    let (arena, file) = parse_header(source, "Test.h", &options).unwrap();
    let class = arena.get(file).children[0];
    let nested = arena.get(class).children[0];
    assert!(matches!(arena.get(nested).kind, NodeKind::Enum(_)));
    assert_eq!(arena.full_name_managed(nested), "Engine.Light+Mode");
}

#[test]
fn interface_list_splits_from_base_class() {
    let source = r#"
API_CLASS() class FLAX_API Model : public Asset, public ISerializable
{
};
"#;
    let (arena, file) = parse(source);
    let node = arena.get(single_class(&arena, file));
    let info = node.as_class().unwrap();
    assert_eq!(info.base.as_ref().unwrap().type_name, "Asset");
    assert_eq!(info.interfaces.len(), 1);
    assert_eq!(info.interfaces[0].type_ref.type_name, "ISerializable");
    assert_eq!(info.interfaces[0].access, Access::Public);
}

#[test]
fn access_sections_apply_to_members() {
    let source = r#"
API_CLASS() class FLAX_API Hidden : public ScriptingObject
{
    API_FIELD() int32 SecretDefaultPrivate;
public:
    API_FIELD() int32 Shown;
protected:
    API_FIELD() int32 Guarded;
};
"#;
    let (arena, file) = parse(source);
    let node = arena.get(single_class(&arena, file));
    let fields = &node.as_class().unwrap().fields;
    assert_eq!(fields[0].access, Access::Private);
    assert_eq!(fields[1].access, Access::Public);
    assert_eq!(fields[2].access, Access::Protected);
}

#[test]
fn static_fields_with_defaults() {
    let source = r#"
API_CLASS() class FLAX_API Config : public ScriptingObject
{
public:
    API_FIELD(ReadOnly) static int32 Version = 10 * 2;
};
"#;
    let (arena, file) = parse(source);
    let node = arena.get(single_class(&arena, file));
    let field = &node.as_class().unwrap().fields[0];
    assert!(field.is_static);
    assert!(field.is_read_only);
    assert_eq!(field.default_value.as_deref(), Some("10 * 2"));
}
