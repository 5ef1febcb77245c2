//! Constant domains: metadata attached to an integer constant governing its
//! formatting, equality, and arithmetic legality.
//!
//! A domain is a small, usually stateless object with a stable identity: a
//! `'static` interned handle rather than owned, heap-allocated metadata.
//! Domains are compared by pointer identity via [`DomainRef`], which is just
//! `&'static dyn Domain`.

use std::fmt;

use crate::constant::Value64;

/// A reference to a domain. Domains are never owned; they live for the
/// program's duration (built-ins as `'static` singletons, vocabulary-supplied
/// domains as leaked or arena-allocated statics set up at vocabulary init).
pub type DomainRef = &'static dyn Domain;

/// Controls how a [`Value64`] paired with this domain is displayed, compared,
/// and whether it participates in arithmetic.
pub trait Domain: fmt::Debug + Sync {
    /// Full display form (used by `%s`'s non-brief counterpart and the
    /// standalone `Value` accessor).
    fn show_full(&self, v: Value64, f: &mut fmt::Formatter<'_>) -> fmt::Result;

    /// Brief display form, used by format-string interpolation.
    /// Domains that have no shorter form simply delegate to `show_full`.
    fn show_brief(&self, v: Value64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.show_full(v, f)
    }

    /// Stable domain name, e.g. `"decimal"`, `"hex"`, or a vocabulary-defined
    /// family such as `"DW_TAG"`.
    fn name(&self) -> &'static str;

    /// Whether arithmetic on values of this domain is meaningful. Named
    /// constants (`DW_TAG_*`-like domains) are not: adding two tag values
    /// produces nonsense.
    fn safe_arith(&self) -> bool {
        false
    }

    /// Whether this domain should yield to the other operand's domain when
    /// mixed in arithmetic. Plain numeric domains (decimal) are `plain`;
    /// domains that carry meaningful formatting (hex, a named enum) are not,
    /// so that `0x10 1 add` still displays in hex.
    fn plain(&self) -> bool {
        false
    }

    /// Returns a domain that contains both this domain and `v`'s value as a
    /// shared superset, if one exists. Used so architecture-specific
    /// constant families (e.g. `DW_TAG_GNU_*` vs `DW_TAG_*`) compare equal
    /// to their common superset rather than being incomparable.
    fn most_enclosing(&self, v: Value64) -> Option<DomainRef> {
        let _ = v;
        None
    }
}

macro_rules! numeric_domain {
    ($struct_name:ident, $name:literal, $show:expr) => {
        #[derive(Debug)]
        pub struct $struct_name;

        impl Domain for $struct_name {
            fn name(&self) -> &'static str {
                $name
            }

            fn safe_arith(&self) -> bool {
                true
            }

            fn plain(&self) -> bool {
                true
            }

            fn show_full(&self, v: Value64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                $show(v, f)
            }
        }
    };
}

numeric_domain!(DecimalDomainImpl, "decimal", |v: Value64, f: &mut fmt::Formatter<'_>| {
    write!(f, "{}", v.to_i128())
});

numeric_domain!(OctalDomainImpl, "octal", |v: Value64, f: &mut fmt::Formatter<'_>| {
    write!(f, "0{:o}", v.bits())
});

numeric_domain!(BinaryDomainImpl, "binary", |v: Value64, f: &mut fmt::Formatter<'_>| {
    write!(f, "0b{:b}", v.bits())
});

/// The hex domain is numeric but not "plain": once a value is displayed in
/// hex (e.g. the output of `bit`, `<<`, `>>`) it keeps that presentation
/// through further plain-domain arithmetic.
#[derive(Debug)]
pub struct HexDomainImpl;

impl Domain for HexDomainImpl {
    fn name(&self) -> &'static str {
        "hex"
    }

    fn safe_arith(&self) -> bool {
        true
    }

    fn show_full(&self, v: Value64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", v.bits())
    }
}

/// A domain showing `0`/`1` bits as `false`/`true`. Not arithmetic-safe: a
/// boolean isn't meant to be added to another boolean.
#[derive(Debug)]
pub struct BooleanDomainImpl;

impl Domain for BooleanDomainImpl {
    fn name(&self) -> &'static str {
        "boolean"
    }

    fn show_full(&self, v: Value64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", v.bits() != 0)
    }
}

static DECIMAL: DecimalDomainImpl = DecimalDomainImpl;
static HEX: HexDomainImpl = HexDomainImpl;
static OCTAL: OctalDomainImpl = OctalDomainImpl;
static BINARY: BinaryDomainImpl = BinaryDomainImpl;
static BOOLEAN: BooleanDomainImpl = BooleanDomainImpl;

pub fn decimal() -> DomainRef {
    &DECIMAL
}

pub fn hex() -> DomainRef {
    &HEX
}

pub fn octal() -> DomainRef {
    &OCTAL
}

pub fn binary() -> DomainRef {
    &BINARY
}

pub fn boolean() -> DomainRef {
    &BOOLEAN
}

/// A named-constant domain, e.g. one a DWARF/ELF vocabulary would register
/// for `DW_TAG_*`/`DW_AT_*` families: values display as a name looked up
/// from a static table instead of a number, and arithmetic is never safe.
///
/// Vocabularies construct these once at initialisation (typically as a
/// `'static` via `Box::leak`, matching how the core registers its own
/// built-in domains) and hand out `DomainRef`s from then on.
#[derive(Debug)]
pub struct NamedDomain {
    domain_name: &'static str,
    entries: &'static [(i64, &'static str)],
    enclosing: Option<DomainRef>,
}

impl NamedDomain {
    pub const fn new(domain_name: &'static str, entries: &'static [(i64, &'static str)]) -> Self {
        Self { domain_name, entries, enclosing: None }
    }

    /// Builds a named domain that reports `enclosing` as its
    /// [`Domain::most_enclosing`] superset for every value, modeling an
    /// architecture-specific family (e.g. a vendor's `DW_TAG_GNU_*` additions)
    /// that should still compare equal against the common `DW_TAG` superset.
    pub const fn with_enclosing(
        domain_name: &'static str,
        entries: &'static [(i64, &'static str)],
        enclosing: DomainRef,
    ) -> Self {
        Self { domain_name, entries, enclosing: Some(enclosing) }
    }
}

impl Domain for NamedDomain {
    fn name(&self) -> &'static str {
        self.domain_name
    }

    fn show_full(&self, v: Value64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let raw = v.to_i128();
        for &(val, name) in self.entries {
            if val as i128 == raw {
                return write!(f, "{name}");
            }
        }
        write!(f, "{}({})", self.domain_name, raw)
    }

    fn most_enclosing(&self, _v: Value64) -> Option<DomainRef> {
        self.enclosing
    }
}

/// Domain identity: two domains are the same domain iff they are the same
/// `'static` object. Pointer (fat-pointer data address) comparison is cheap
/// and doesn't require domains to carry their own ids.
pub fn domain_eq(a: DomainRef, b: DomainRef) -> bool {
    std::ptr::eq(a as *const dyn Domain as *const (), b as *const dyn Domain as *const ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_domains_are_stable_identity() {
        assert!(domain_eq(decimal(), decimal()));
        assert!(!domain_eq(decimal(), hex()));
    }

    #[test]
    fn decimal_is_plain_and_arith_safe() {
        assert!(decimal().plain());
        assert!(decimal().safe_arith());
        assert!(!hex().plain());
        assert!(hex().safe_arith());
    }
}
