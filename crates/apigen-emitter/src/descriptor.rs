//! Binary-module descriptor emission.
//!
//! Each binary module gets a small `{Name}.Gen.h`/`.cpp` pair declaring and
//! defining its module singleton and scripting entry point. These live in
//! the project source tree, next to the module's own code.

use crate::abi;

/// The generated descriptor header.
pub fn emit_binary_module_descriptor(module_name: &str) -> (String, String) {
    let header = format!(
        "// This code was auto-generated by the scripting bindings generator. Do not modify it manually.\n\
         \n\
         #pragma once\n\
         \n\
         #include \"{glue}\"\n\
         \n\
         /// <summary>\n\
         /// The {name} binary module.\n\
         /// </summary>\n\
         extern \"C\" BinaryModule* GetBinaryModule{name}();\n",
        glue = abi::GLUE_HEADER,
        name = module_name,
    );

    let source = format!(
        "// This code was auto-generated by the scripting bindings generator. Do not modify it manually.\n\
         \n\
         #include \"{name}.Gen.h\"\n\
         \n\
         extern \"C\" BinaryModule* GetBinaryModule{name}()\n\
         {{\n\
         \x20\x20\x20\x20static NativeBinaryModule module(\"{name}\");\n\
         \x20\x20\x20\x20return &module;\n\
         }}\n",
        name = module_name,
    );

    (header, source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_pair_names_the_module() {
        let (header, source) = emit_binary_module_descriptor("Core");
        assert!(header.contains("GetBinaryModuleCore()"));
        assert!(header.contains("#pragma once"));
        assert!(source.contains("#include \"Core.Gen.h\""));
        assert!(source.contains("NativeBinaryModule module(\"Core\")"));
    }

    #[test]
    fn descriptor_is_deterministic() {
        assert_eq!(
            emit_binary_module_descriptor("Game"),
            emit_binary_module_descriptor("Game")
        );
    }
}
