//! Per-execution state layout.
//!
//! The original dwgrep hands each operator a byte offset into a shared
//! buffer and reinterpret-casts it to the operator's state type
//! (`examples/original_source/libzwerg/{layout,scon}.hh`). This
//! reimplementation keeps the shape — one accumulator built while compiling
//! the operator graph, one buffer allocated once per `Result` — but swaps
//! the unsafe pointer arithmetic for a `Vec<Option<Box<dyn Any>>>` slot
//! table, which gets the same "no per-operator heap allocation during
//! compilation, one arena per execution" property without `unsafe`
//! (only the *contract* matters: a single per-execution buffer with
//! LIFO construction/destruction).

use std::any::Any;

/// A location within a [`Scon`]: an opaque slot index assigned by
/// [`Layout::reserve`]. Operators store their own `Loc`s and use them to
/// access their state without knowing about any other operator's slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Loc(usize);

/// Accumulates slot reservations while the compiler lowers the tree into an
/// operator graph. One `Layout` is built per `Query` and then shared (via
/// its resulting `size`) by every `Scon` created to run that query.
#[derive(Debug, Default)]
pub struct Layout {
    next: usize,
}

impl Layout {
    pub fn new() -> Self {
        Self { next: 0 }
    }

    /// Reserves one slot for an operator's per-execution state. Each call
    /// returns a distinct `Loc`; a compound operator reserves one slot per
    /// logical piece of state it needs (e.g. `op_merge` reserves one slot
    /// for its shared tine file).
    pub fn reserve(&mut self) -> Loc {
        let loc = Loc(self.next);
        self.next += 1;
        loc
    }

    /// Reserves a slot shared by mutually-exclusive alternatives (e.g. an
    /// if/else's `then`/`else` branches, which never execute concurrently
    /// against the same upstream stack's "union
    /// layout" note). Since slots here are just indices rather than raw
    /// bytes, "sharing space" simply means handing out the *same* `Loc` to
    /// both alternatives; each alternative still must `des` its own state
    /// before the other `con`s onto the same slot.
    pub fn reserve_shared(&mut self) -> Loc {
        self.reserve()
    }

    pub fn size(&self) -> usize {
        self.next
    }
}

/// The state container: a single per-execution arena holding every
/// operator's transient state, indexed by `Loc`. Constructed fresh for each
/// `QueryResult` and torn down (in whatever order the operator graph chooses
/// to call `state_des`, which must be LIFO relative to construction) when
/// that `QueryResult` is dropped.
#[derive(Debug, Default)]
pub struct Scon {
    slots: Vec<Option<Box<dyn Any>>>,
}

impl Scon {
    pub fn new(layout: &Layout) -> Self {
        let mut slots = Vec::with_capacity(layout.size());
        slots.resize_with(layout.size(), || None);
        Self { slots }
    }

    /// Constructs `state` into `loc`. Panics if the slot is already
    /// occupied — that would indicate a `state_con` bug (double
    /// construction without an intervening `des`).
    pub fn con<T: 'static>(&mut self, loc: Loc, state: T) {
        let slot = &mut self.slots[loc.0];
        assert!(slot.is_none(), "state slot {} constructed twice without destruction", loc.0);
        *slot = Some(Box::new(state));
    }

    /// Destroys whatever is in `loc`, running `T`'s `Drop` impl as the
    /// `Box` is freed. No-op if the slot is already empty, so callers can
    /// tear down defensively on an error path.
    pub fn des(&mut self, loc: Loc) {
        self.slots[loc.0] = None;
    }

    pub fn get<T: 'static>(&self, loc: Loc) -> &T {
        self.slots[loc.0]
            .as_ref()
            .unwrap_or_else(|| panic!("state slot {} read before construction", loc.0))
            .downcast_ref()
            .expect("state slot type mismatch")
    }

    pub fn get_mut<T: 'static>(&mut self, loc: Loc) -> &mut T {
        self.slots[loc.0]
            .as_mut()
            .unwrap_or_else(|| panic!("state slot {} read before construction", loc.0))
            .downcast_mut()
            .expect("state slot type mismatch")
    }

    pub fn is_constructed(&self, loc: Loc) -> bool {
        self.slots[loc.0].is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_yields_distinct_locations() {
        let mut l = Layout::new();
        let a = l.reserve();
        let b = l.reserve();
        assert_ne!(a, b);
        assert_eq!(l.size(), 2);
    }

    #[test]
    fn con_get_des_roundtrip() {
        let mut l = Layout::new();
        let loc = l.reserve();
        let mut sc = Scon::new(&l);
        sc.con(loc, 42i32);
        assert_eq!(*sc.get::<i32>(loc), 42);
        sc.des(loc);
        assert!(!sc.is_constructed(loc));
    }

    #[test]
    #[should_panic]
    fn double_construction_panics() {
        let mut l = Layout::new();
        let loc = l.reserve();
        let mut sc = Scon::new(&l);
        sc.con(loc, 1i32);
        sc.con(loc, 2i32);
    }
}
