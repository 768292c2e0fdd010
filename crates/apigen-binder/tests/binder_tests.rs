use apigen_binder::{Analyzer, BuildContext};
use apigen_common::ErrorKind;
use apigen_model::{ModuleInfo, Node, NodeIndex, NodeKind, TypeRef};
use apigen_parser::{ParseOptions, parse_header};

fn build_module(build: &mut BuildContext, name: &str, sources: &[&str]) -> NodeIndex {
    let module = build.arena.alloc(Node::new(
        name,
        NodeKind::Module(ModuleInfo::default()),
    ));
    build.add_module(module);
    let options = ParseOptions::default();
    for (i, source) in sources.iter().enumerate() {
        let path = format!("{name}_{i}.h");
        let (scratch, file) = parse_header(source, &path, &options).expect("parse failed");
        build.arena.graft(&scratch, file, module);
    }
    module
}

fn build_from(source: &str) -> (BuildContext, NodeIndex) {
    let mut build = BuildContext::new();
    let module = build_module(&mut build, "Core", &[source]);
    let mut analyzer = Analyzer::new();
    analyzer
        .initialize_module(&mut build, module)
        .expect("init failed");
    (build, module)
}

fn build_err(source: &str) -> apigen_common::Error {
    let mut build = BuildContext::new();
    let module = build_module(&mut build, "Core", &[source]);
    let mut analyzer = Analyzer::new();
    analyzer
        .initialize_module(&mut build, module)
        .expect_err("init should fail")
}

fn find_type(build: &BuildContext, module: NodeIndex, name: &str) -> NodeIndex {
    build
        .arena
        .find_type(module, name)
        .unwrap_or_else(|| panic!("type '{name}' not found"))
}

// =============================================================================
// Scripting-object ancestry
// =============================================================================

#[test]
fn scripting_object_flag_propagates_through_bases() {
    let source = r#"
API_CLASS() class FLAX_API Foo : public ScriptingObject
{
};
API_CLASS() class FLAX_API Derived : public Foo
{
};
API_CLASS() class FLAX_API Loose
{
};
"#;
    let (build, module) = build_from(source);
    let foo = find_type(&build, module, "Foo");
    let derived = find_type(&build, module, "Derived");
    let loose = find_type(&build, module, "Loose");

    assert!(build.arena.get(foo).as_class().unwrap().is_scripting_object);
    assert!(build.arena.get(derived).as_class().unwrap().is_scripting_object);
    assert!(!build.arena.get(loose).as_class().unwrap().is_scripting_object);
}

#[test]
fn unresolved_scripting_root_base_still_counts() {
    // ScriptingObject itself is not parsed here; the root-name set carries.
    let source = r#"
API_CLASS() class FLAX_API Mesh : public Asset
{
};
"#;
    let (build, module) = build_from(source);
    let mesh = find_type(&build, module, "Mesh");
    let info = build.arena.get(mesh).as_class().unwrap();
    assert!(info.is_scripting_object);
    assert!(info.is_base_type_hidden);
}

// =============================================================================
// Script-vtable layout
// =============================================================================

#[test]
fn vtable_size_is_offset_plus_own_virtuals() {
    let source = r#"
API_CLASS() class FLAX_API Base : public ScriptingObject
{
public:
    API_FUNCTION() virtual void OnUpdate();
    API_FUNCTION() virtual void OnDestroy();
};
API_CLASS() class FLAX_API Child : public Base
{
public:
    API_FUNCTION() virtual void OnExtra();
};
"#;
    let (build, module) = build_from(source);
    let base = build.arena.get(find_type(&build, module, "Base"));
    let child = build.arena.get(find_type(&build, module, "Child"));

    let base_info = base.as_class().unwrap();
    assert_eq!(base_info.script_vtable_offset, 0);
    assert_eq!(base_info.script_vtable_size, 2);

    let child_info = child.as_class().unwrap();
    assert_eq!(child_info.script_vtable_offset, 2);
    assert_eq!(child_info.script_vtable_size, 3);
}

#[test]
fn public_interfaces_shift_the_vtable_offset() {
    let source = r#"
API_INTERFACE() class FLAX_API IUpdatable
{
public:
    API_FUNCTION() virtual void Tick() = 0;
    API_FUNCTION() virtual void FixedTick() = 0;
};
API_CLASS() class FLAX_API Widget : public ScriptingObject, public IUpdatable
{
public:
    API_FUNCTION() virtual void Draw();
};
"#;
    let (build, module) = build_from(source);
    let interface = build.arena.get(find_type(&build, module, "IUpdatable"));
    assert_eq!(interface.as_interface().unwrap().vtable_size, 2);

    let widget = build.arena.get(find_type(&build, module, "Widget"));
    let info = widget.as_class().unwrap();
    assert_eq!(info.script_vtable_offset, 2);
    assert_eq!(info.script_vtable_size, 3);
}

#[test]
fn sealed_classes_collapse_their_vtable() {
    let source = r#"
API_CLASS(Sealed) class FLAX_API Leaf : public ScriptingObject
{
public:
    API_FUNCTION() virtual void OnUpdate();
};
"#;
    let (build, module) = build_from(source);
    let leaf = build.arena.get(find_type(&build, module, "Leaf"));
    let info = leaf.as_class().unwrap();
    assert_eq!(info.script_vtable_offset, 0);
    assert_eq!(info.script_vtable_size, 0);
}

#[test]
fn inheritance_cycles_are_reported() {
    let source = r#"
API_CLASS() class FLAX_API A : public B
{
};
API_CLASS() class FLAX_API B : public A
{
};
"#;
    let err = build_err(source);
    assert_eq!(err.kind, ErrorKind::Semantic);
    assert!(err.message.contains("cycle"), "{err}");
}

// =============================================================================
// POD
// =============================================================================

#[test]
fn struct_with_string_field_is_not_pod() {
    let source = r#"
API_STRUCT() struct FLAX_API V
{
    API_FIELD() float X;
    API_FIELD() String Name;
};
API_STRUCT() struct FLAX_API P
{
    API_FIELD() float X;
    API_FIELD() float Y;
};
"#;
    let (build, module) = build_from(source);
    let v = build.arena.get(find_type(&build, module, "V"));
    assert_eq!(v.as_struct().unwrap().is_pod, Some(false));
    let p = build.arena.get(find_type(&build, module, "P"));
    assert_eq!(p.as_struct().unwrap().is_pod, Some(true));
}

#[test]
fn pod_considers_base_fields_arrays_and_force_tag() {
    let source = r#"
API_STRUCT() struct FLAX_API NonPodBase
{
    API_FIELD() Array<int32> Items;
};
API_STRUCT() struct FLAX_API ChildOfNonPod : public NonPodBase
{
    API_FIELD() float X;
};
API_STRUCT() struct FLAX_API WithManagedArray
{
    API_FIELD() float Weights[4];
};
API_STRUCT() struct FLAX_API WithFixedArray
{
    API_FIELD(NoArray) float Weights[4];
};
API_STRUCT(ForceNoPod) struct FLAX_API Forced
{
    API_FIELD() float X;
};
"#;
    let (build, module) = build_from(source);
    let pod_of = |name: &str| {
        build
            .arena
            .get(find_type(&build, module, name))
            .as_struct()
            .unwrap()
            .is_pod
    };
    assert_eq!(pod_of("NonPodBase"), Some(false));
    assert_eq!(pod_of("ChildOfNonPod"), Some(false));
    assert_eq!(pod_of("WithManagedArray"), Some(false));
    assert_eq!(pod_of("WithFixedArray"), Some(true));
    assert_eq!(pod_of("Forced"), Some(false));
}

#[test]
fn pointers_and_unknown_types_default_to_pod() {
    let source = r#"
API_STRUCT() struct FLAX_API Holder
{
    API_FIELD() Actor* Target;
    API_FIELD() SomeOpaqueHandle Handle;
};
"#;
    let (build, module) = build_from(source);
    let holder = build.arena.get(find_type(&build, module, "Holder"));
    assert_eq!(holder.as_struct().unwrap().is_pod, Some(true));
}

// =============================================================================
// Accessor synthesis and unique names
// =============================================================================

#[test]
fn field_accessors_are_synthesized_unless_private_or_readonly() {
    let source = r#"
API_CLASS() class FLAX_API Config : public ScriptingObject
{
public:
    API_FIELD() int32 Quality;
    API_FIELD(ReadOnly) int32 Version;
private:
    API_FIELD() int32 Secret;
};
"#;
    let (build, module) = build_from(source);
    let config = build.arena.get(find_type(&build, module, "Config"));
    let fields = &config.as_class().unwrap().fields;

    assert!(fields[0].getter.is_some() && fields[0].setter.is_some());
    assert!(fields[1].getter.is_some() && fields[1].setter.is_none());
    assert!(fields[2].getter.is_none() && fields[2].setter.is_none());

    // Getter and setter share the field name, disambiguated by suffix.
    assert_eq!(fields[0].getter.as_ref().unwrap().unique_name, "Quality");
    assert_eq!(fields[0].setter.as_ref().unwrap().unique_name, "Quality1");
}

#[test]
fn overloads_get_suffixed_unique_names() {
    let source = r#"
API_CLASS() class FLAX_API Socket : public ScriptingObject
{
public:
    API_FUNCTION() void Send(int32 data);
    API_FUNCTION() void Send(float data);
    API_FUNCTION() void Send(bool data);
};
"#;
    let (build, module) = build_from(source);
    let socket = build.arena.get(find_type(&build, module, "Socket"));
    let names: Vec<_> = socket
        .as_class()
        .unwrap()
        .functions
        .iter()
        .map(|f| f.unique_name.clone())
        .collect();
    assert_eq!(names, vec!["Send", "Send1", "Send2"]);
    for (name, unique) in [("Send", "Send"), ("Send", "Send1"), ("Send", "Send2")] {
        assert!(unique.starts_with(name));
    }
}

// =============================================================================
// Properties
// =============================================================================

#[test]
fn property_comment_gains_or_sets_once_merged() {
    let source = r#"
API_CLASS() class FLAX_API Widget : public ScriptingObject
{
public:
    /// Gets count.
    API_PROPERTY() int32 GetCount() const;
    API_PROPERTY() void SetCount(int32 value);
};
"#;
    let (build, module) = build_from(source);
    let widget = build.arena.get(find_type(&build, module, "Widget"));
    let property = &widget.as_class().unwrap().properties[0];
    assert!(property
        .comment
        .iter()
        .any(|line| line.contains("Gets or sets count.")));
}

#[test]
fn compatible_pairs_allow_string_view_accessors() {
    let source = r#"
API_CLASS() class FLAX_API Label : public ScriptingObject
{
public:
    API_PROPERTY() String GetText() const;
    API_PROPERTY() void SetText(const StringView& value);
};
"#;
    // No error: String <-> StringView is whitelisted.
    build_from(source);
}

#[test]
fn mismatched_property_types_are_rejected() {
    let source = r#"
API_CLASS() class FLAX_API Label : public ScriptingObject
{
public:
    API_PROPERTY() int32 GetCount() const;
    API_PROPERTY() void SetCount(float value);
};
"#;
    let err = build_err(source);
    assert_eq!(err.kind, ErrorKind::Semantic);
    assert!(err.message.contains("getter returns"), "{err}");
}

#[test]
fn static_disagreement_between_accessors_is_rejected() {
    let source = r#"
API_CLASS() class FLAX_API Label : public ScriptingObject
{
public:
    API_PROPERTY() static int32 GetCount();
    API_PROPERTY() void SetCount(int32 value);
};
"#;
    let err = build_err(source);
    assert!(err.message.contains("static"), "{err}");
}

// =============================================================================
// Typedefs and templates
// =============================================================================

#[test]
fn typedef_inflates_template_with_substituted_members() {
    let source = r#"
API_CLASS(Template) template<typename T> class FLAX_API Vector3Base
{
public:
    API_FIELD() T X;
    API_FIELD() T Y;
    API_FUNCTION() T Dot(const Vector3Base& other) const;
};
API_TYPEDEF() typedef Vector3Base<float> Float3;
"#;
    let (mut build, module) = build_from(source);
    let typedef = find_type(&build, module, "Float3");
    let backing = build
        .typedef_backing(typedef)
        .expect("typedef should be resolved");

    let node = build.arena.get(backing);
    assert_eq!(node.name, "Float3");
    assert_eq!(node.native_name.as_deref(), Some("Vector3Base<float>"));
    let info = node.as_class().unwrap();
    assert!(!info.is_template);
    assert_eq!(info.fields[0].type_ref.type_name, "float");
    assert_eq!(info.functions[0].return_type.type_name, "float");

    // The typedef is what generic lookups find.
    let mut query = TypeRef::named("Vector3Base");
    query.generic_args.push(TypeRef::named("float"));
    let found = build.resolve(&query, module).expect("resolve failed");
    assert_eq!(found, typedef);
}

#[test]
fn alias_typedef_links_to_the_existing_node() {
    let source = r#"
API_STRUCT() struct FLAX_API Color32
{
    API_FIELD() uint32 Packed;
};
API_TYPEDEF(Alias) using ColorAlias = Color32;
"#;
    let (mut build, module) = build_from(source);
    let alias = find_type(&build, module, "ColorAlias");
    let color = find_type(&build, module, "Color32");
    assert_eq!(build.typedef_backing(alias), Some(color));
    assert_eq!(build.dealias(alias), color);
}

// =============================================================================
// Resolver behavior
// =============================================================================

#[test]
fn primitives_resolve_in_build() {
    let (mut build, module) = build_from("API_CLASS() class FLAX_API Foo : public ScriptingObject {\n};\n");
    for name in ["void", "bool", "int32", "uint64", "float", "Char"] {
        assert!(
            build.resolve(&TypeRef::named(name), module).is_some(),
            "{name} should resolve"
        );
    }
    let mut void_ptr = TypeRef::named("void");
    void_ptr.is_ptr = true;
    let pointer = build.resolve(&void_ptr, module).unwrap();
    assert_eq!(build.arena.get(pointer).name, "IntPtr");
}

#[test]
fn resolution_crosses_modules_and_memoizes() {
    let mut build = BuildContext::new();
    let core = build_module(
        &mut build,
        "Core",
        &["API_CLASS() class FLAX_API Actor : public ScriptingObject {\n};\n"],
    );
    let game = build_module(
        &mut build,
        "Game",
        &["API_CLASS() class FLAX_API Player : public Actor {\n};\n"],
    );
    let mut analyzer = Analyzer::new();
    analyzer.initialize_module(&mut build, core).unwrap();
    analyzer.initialize_module(&mut build, game).unwrap();

    let player = find_type(&build, game, "Player");
    assert!(build.arena.get(player).as_class().unwrap().is_scripting_object);

    let actor = build.resolve(&TypeRef::named("Actor"), game).unwrap();
    let again = build.resolve(&TypeRef::named("Actor"), game).unwrap();
    assert_eq!(actor, again);
}

#[test]
fn nested_names_resolve_segment_by_segment() {
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
    let (mut build, module) = build_from(source);
    let found = build
        .resolve(&TypeRef::named("Light::Mode"), module)
        .expect("nested name should resolve");
    assert!(matches!(build.arena.get(found).kind, NodeKind::Enum(_)));
}

#[test]
fn reference_flag_is_retried_away() {
    let source = r#"
API_STRUCT() struct FLAX_API Vector3
{
    API_FIELD() float X;
};
"#;
    let (mut build, module) = build_from(source);
    let mut by_ref = TypeRef::named("Vector3");
    by_ref.is_const = true;
    by_ref.is_ref = true;
    assert!(build.resolve(&by_ref, module).is_some());
}

// =============================================================================
// Auto-serialization
// =============================================================================

#[test]
fn serialization_list_follows_visibility_and_attributes() {
    let source = r#"
API_CLASS() class FLAX_API Doc : public ScriptingObject
{
    API_AUTO_SERIALIZATION();
public:
    API_FIELD() int32 Kept;
    API_FIELD(Attributes="NoSerialize") int32 Dropped;
    API_FIELD() static int32 Static;
private:
    API_FIELD(Attributes="Serialize") int32 Forced;
    API_FIELD() int32 Hidden;
};
"#;
    let (build, module) = build_from(source);
    let doc = build.arena.get(find_type(&build, module, "Doc"));
    let names: Vec<_> = doc
        .as_class()
        .unwrap()
        .serialization
        .iter()
        .map(|m| m.name.clone())
        .collect();
    assert_eq!(names, vec!["Kept", "Forced"]);
}
