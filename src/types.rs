//! The type-code registry: a central, process-wide map from
//! 8-bit type codes to display names. Codes are assigned at first use and
//! stable for the remainder of the process, the same string-interning
//! pattern applied to type names instead of identifier text.
//!
//! Core variants (`Const`, `Str`, `Seq`, `Closure`) get fixed, pre-registered
//! codes so their ordering is deterministic across runs even though the
//! registry itself is a runtime-populated, `once_cell`-backed static.

use once_cell::sync::Lazy;
use std::sync::Mutex;

pub const TYPE_CONST: u8 = 0;
pub const TYPE_STR: u8 = 1;
pub const TYPE_SEQ: u8 = 2;
pub const TYPE_CLOSURE: u8 = 3;
const FIRST_DYNAMIC_CODE: u8 = 4;

struct Registry {
    names: Vec<&'static str>,
}

static REGISTRY: Lazy<Mutex<Registry>> = Lazy::new(|| {
    Mutex::new(Registry { names: vec!["const", "string", "sequence", "closure"] })
});

/// Returns the stable type code for `name`, registering it on first use.
/// Vocabulary value types call this once (typically cached in a
/// `once_cell::sync::OnceCell` local to the type) to obtain their code.
pub fn code_for(name: &'static str) -> u8 {
    let mut reg = REGISTRY.lock().expect("type registry poisoned");
    if let Some(pos) = reg.names.iter().position(|n| *n == name) {
        return pos as u8;
    }
    let code = reg.names.len();
    assert!(code < 256, "type code space exhausted");
    reg.names.push(name);
    let _ = FIRST_DYNAMIC_CODE;
    code as u8
}

/// Looks up the display name for a previously-registered type code.
pub fn name_for(code: u8) -> &'static str {
    let reg = REGISTRY.lock().expect("type registry poisoned");
    reg.names.get(code as usize).copied().unwrap_or("<unknown>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_codes_are_fixed() {
        assert_eq!(code_for("const"), TYPE_CONST);
        assert_eq!(code_for("string"), TYPE_STR);
        assert_eq!(code_for("sequence"), TYPE_SEQ);
        assert_eq!(code_for("closure"), TYPE_CLOSURE);
    }

    #[test]
    fn dynamic_codes_are_stable_once_assigned() {
        let a = code_for("dwarf-die-test-only");
        let b = code_for("dwarf-die-test-only");
        assert_eq!(a, b);
    }
}
