//! Minimal preprocessor evaluation.
//!
//! Only `#define`, `#if`, `#ifdef`, and `#endif` are interpreted, with a
//! deliberately small condition language: a disjunction of terms where each
//! term is a literal `1`/`0`, `true`/`false`, or an identifier substituted
//! from the local define map or the externally supplied definition sets.
//! Anything more complex evaluates to false rather than raising.

use rustc_hash::{FxHashMap, FxHashSet};

/// Definition sets supplied by the build environment, in addition to the
/// per-file `#define` map.
#[derive(Clone, Debug, Default)]
pub struct ExternalDefines {
    pub public_defines: FxHashSet<String>,
    pub private_defines: FxHashSet<String>,
    pub env_defines: FxHashSet<String>,
}

impl ExternalDefines {
    pub fn from_lists(public: &[String], private: &[String], env: &[String]) -> Self {
        ExternalDefines {
            public_defines: public.iter().cloned().collect(),
            private_defines: private.iter().cloned().collect(),
            env_defines: env.iter().cloned().collect(),
        }
    }

    /// Whether any set defines `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.public_defines.contains(name)
            || self.private_defines.contains(name)
            || self.env_defines.contains(name)
    }
}

/// Evaluate a `#if` condition.
pub fn evaluate(
    condition: &str,
    local: &FxHashMap<String, String>,
    external: &ExternalDefines,
) -> bool {
    // Collapse `||` to `|` and evaluate each disjunct on its own.
    let collapsed = condition.replace("||", "|");
    collapsed
        .split('|')
        .any(|term| evaluate_term(term.trim(), local, external))
}

fn evaluate_term(term: &str, local: &FxHashMap<String, String>, external: &ExternalDefines) -> bool {
    if term.is_empty() {
        return false;
    }
    // Complex expressions degrade to false instead of raising.
    if !term
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return false;
    }

    let substituted = if let Some(value) = local.get(term) {
        value.as_str()
    } else if external.contains(term) {
        "1"
    } else {
        term
    };

    match substituted {
        "true" => return true,
        "false" => return false,
        _ => {}
    }
    substituted.parse::<i64>().is_ok_and(|value| value != 0)
}

/// Whether `name` is defined locally or externally (`#ifdef`).
pub fn is_defined(
    name: &str,
    local: &FxHashMap<String, String>,
    external: &ExternalDefines,
) -> bool {
    local.contains_key(name) || external.contains(name)
}
