//! Vocabularies and builtins.
//!
//! A [`Vocabulary`] is a name→builtin(s) map. A name with exactly one
//! non-overloaded builtin compiles straight through; a name with more than
//! one registered builtin (or a single one that still declares a [`Selector`]
//! profile) compiles to an `op_overload` node instead.

pub mod core_voc;
pub mod demo;

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::NameError;
use crate::layout::Layout;
use crate::op::{Op, Pred};
use crate::selector::Selector;

/// A named factory for an operator or a predicate.
pub trait Builtin: fmt::Debug {
    fn name(&self) -> &'static str;

    fn docstring(&self) -> &'static str;

    /// Declared input type codes, top-of-stack first. `None` means this is
    /// the sole, non-overloaded implementation of its name.
    fn profile(&self) -> Option<&'static [u8]> {
        None
    }

    /// Builds the operator implementing this builtin, chained onto
    /// `upstream`. Builtins that are exec-only implement this; predicate-only
    /// builtins (e.g. `match`, usable only as `?match`/`!match`) panic here.
    fn build_exec(&self, layout: &mut Layout, upstream: Rc<dyn Op>) -> Rc<dyn Op> {
        let _ = (layout, upstream);
        panic!("{} has no operator form", self.name())
    }

    /// Builds this builtin's predicate form, used for `?NAME`/`!NAME`.
    fn build_pred(&self, layout: &mut Layout) -> Rc<dyn Pred> {
        let _ = layout;
        panic!("{} has no predicate form", self.name())
    }
}

/// A name→builtin(s) map.
#[derive(Default)]
pub struct Vocabulary {
    entries: IndexMap<String, Vec<Rc<dyn Builtin>>, ahash::RandomState>,
}

impl fmt::Debug for Vocabulary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vocabulary").field("names", &self.entries.keys().collect::<Vec<_>>()).finish()
    }
}

impl Vocabulary {
    pub fn new() -> Self {
        Self { entries: IndexMap::with_hasher(ahash::RandomState::new()) }
    }

    pub fn register(&mut self, builtin: Rc<dyn Builtin>) {
        self.entries.entry(builtin.name().to_string()).or_default().push(builtin);
    }

    pub fn lookup(&self, name: &str) -> Option<&[Rc<dyn Builtin>]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Merges `other` into `self`. A name present in both must be overloaded
    /// on both sides (every builtin under that name declares a `profile`)
    /// with no colliding selectors.
    pub fn merge(&mut self, other: Vocabulary) -> Result<(), NameError> {
        for (name, incoming) in other.entries {
            match self.entries.get_mut(&name) {
                None => {
                    self.entries.insert(name, incoming);
                }
                Some(existing) => {
                    for builtin in &incoming {
                        let Some(profile) = builtin.profile() else {
                            return Err(NameError {
                                name: name.clone(),
                                message: "conflicting non-overloaded builtin on merge".to_string(),
                            });
                        };
                        let incoming_selector = Selector::from_codes(profile);
                        for present in existing.iter() {
                            let Some(present_profile) = present.profile() else {
                                return Err(NameError {
                                    name: name.clone(),
                                    message: "conflicting non-overloaded builtin on merge".to_string(),
                                });
                            };
                            if Selector::from_codes(present_profile).imprint() == incoming_selector.imprint() {
                                return Err(NameError {
                                    name: name.clone(),
                                    message: "duplicate overload selector on merge".to_string(),
                                });
                            }
                        }
                    }
                    existing.extend(incoming);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::Stack;
    use std::rc::Rc;

    #[derive(Debug)]
    struct Dummy(&'static str, Option<&'static [u8]>);

    impl Builtin for Dummy {
        fn name(&self) -> &'static str {
            self.0
        }
        fn docstring(&self) -> &'static str {
            "dummy"
        }
        fn profile(&self) -> Option<&'static [u8]> {
            self.1
        }
        fn build_exec(&self, _layout: &mut Layout, upstream: Rc<dyn Op>) -> Rc<dyn Op> {
            #[derive(Debug)]
            struct Pass(Rc<dyn Op>);
            impl Op for Pass {
                fn name(&self) -> &'static str {
                    "pass"
                }
                fn next(&self, ctx: &mut crate::op::EvalCtx) -> Option<Stack> {
                    self.0.next(ctx)
                }
            }
            Rc::new(Pass(upstream))
        }
    }

    #[test]
    fn merge_rejects_duplicate_selectors() {
        let mut a = Vocabulary::new();
        a.register(Rc::new(Dummy("add", Some(&[0, 0]))));
        let mut b = Vocabulary::new();
        b.register(Rc::new(Dummy("add", Some(&[0, 0]))));
        assert!(a.merge(b).is_err());
    }

    #[test]
    fn merge_unions_distinct_selectors() {
        let mut a = Vocabulary::new();
        a.register(Rc::new(Dummy("add", Some(&[0, 0]))));
        let mut b = Vocabulary::new();
        b.register(Rc::new(Dummy("add", Some(&[1, 1]))));
        assert!(a.merge(b).is_ok());
        assert_eq!(a.lookup("add").unwrap().len(), 2);
    }

    #[test]
    fn merge_rejects_non_overloaded_conflict() {
        let mut a = Vocabulary::new();
        a.register(Rc::new(Dummy("length", None)));
        let mut b = Vocabulary::new();
        b.register(Rc::new(Dummy("length", None)));
        assert!(a.merge(b).is_err());
    }
}
