//! The lexical scope stack used while building the AST (§4.1).
//!
//! Grounded on `examples/original_source/src/decaf_scope.py`'s `Scope`
//! class, translated from a doubly-static class (`Scope.current`) into an
//! explicit stack owned by the parser, per §9's design note preferring an
//! injected context over process-wide mutable state.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use decaf_core::VariableHandle;

type SymbolTable = Rc<RefCell<HashMap<String, VariableHandle>>>;
type VariableTable = Rc<RefCell<Vec<VariableHandle>>>;

struct ScopeFrame {
    symbol_table: SymbolTable,
    /// Shared by every frame within one member's nesting — `add_symbol`
    /// assigns ids from this table's length regardless of which nested
    /// block declares the variable (§4.1, §3's variable table).
    variable_table: VariableTable,
    /// Whether a *child* of this frame reuses `symbol_table` instead of
    /// starting a fresh one (§4.1's `share_table_with_child`).
    share_table_with_child: bool,
    /// Whether lookups from descendants may not continue past this frame
    /// into its ancestors (§4.1's `block_child`).
    block_child: bool,
    class_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnterOptions {
    pub share_table_with_child: bool,
    pub block_child: bool,
}

impl EnterOptions {
    pub const PLAIN: Self = EnterOptions {
        share_table_with_child: false,
        block_child: false,
    };

    /// Used for a method's formal-parameter scope, so its child (the
    /// top-level block of the body) sees the same symbol table — a local
    /// re-declaring a formal's name is then a same-table collision.
    pub fn shared() -> Self {
        EnterOptions {
            share_table_with_child: true,
            block_child: false,
        }
    }

    /// Used at a class boundary, so method bodies do not resolve bare
    /// identifiers against outer class-level names.
    pub fn blocking() -> Self {
        EnterOptions {
            share_table_with_child: false,
            block_child: true,
        }
    }
}

/// A push-down stack of lexical scopes, one per class/method/block nesting
/// level currently open while the parser walks the source.
pub struct ScopeStack {
    frames: Vec<ScopeFrame>,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeStack {
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    /// Enters a scope. `class_name` is only given at a class declaration's
    /// entry point; every other entry inherits the enclosing class name
    /// from its parent frame, exactly like the original's `Scope.__init__`.
    pub fn enter(&mut self, opts: EnterOptions, class_name: Option<String>) {
        let parent = self.frames.last();

        let symbol_table = match parent {
            Some(p) if p.share_table_with_child => p.symbol_table.clone(),
            _ => Rc::new(RefCell::new(HashMap::new())),
        };
        let variable_table = match parent {
            Some(p) => p.variable_table.clone(),
            None => Rc::new(RefCell::new(Vec::new())),
        };
        let class_name = class_name.or_else(|| parent.and_then(|p| p.class_name.clone()));

        self.frames.push(ScopeFrame {
            symbol_table,
            variable_table,
            share_table_with_child: opts.share_table_with_child,
            block_child: opts.block_child,
            class_name,
        });
    }

    pub fn exit(&mut self) {
        self.frames.pop();
    }

    pub fn current_class_name(&self) -> Option<String> {
        self.frames.last().and_then(|f| f.class_name.clone())
    }

    pub fn current_variable_table(&self) -> Vec<VariableHandle> {
        self.frames
            .last()
            .map(|f| f.variable_table.borrow().clone())
            .unwrap_or_default()
    }

    /// Adds `var` to the current frame's symbol table, assigning its
    /// 1-based id from the (possibly shared) variable table's length.
    /// Returns `false` — mirroring `Scope.add_symbol`'s boolean result —
    /// if the name already exists in this frame's symbol table.
    pub fn add_symbol(&mut self, var: VariableHandle) -> bool {
        let frame = self.frames.last().expect("add_symbol with no open scope");
        let name = var.borrow().name.clone();
        if frame.symbol_table.borrow().contains_key(&name) {
            return false;
        }
        let mut table = frame.variable_table.borrow_mut();
        let id = table.len() as u32 + 1;
        var.borrow_mut().id = id;
        table.push(var.clone());
        frame.symbol_table.borrow_mut().insert(name, var);
        true
    }

    /// Walks up the frame stack from the innermost frame, stopping *before*
    /// the first `block_child` frame: that frame's own table is never
    /// searched, only the frames nested inside it.
    pub fn lookup_symbol(&self, name: &str) -> Option<VariableHandle> {
        for i in (0..self.frames.len()).rev() {
            if let Some(v) = self.frames[i].symbol_table.borrow().get(name) {
                return Some(v.clone());
            }
            if i == 0 || self.frames[i - 1].block_child {
                return None;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use decaf_core::{Type, VariableKind, VariableRecord};

    fn var(name: &str) -> VariableHandle {
        VariableRecord::new_handle(name, VariableKind::Local, Type::Int)
    }

    #[test]
    fn duplicate_in_same_frame_rejected() {
        let mut scopes = ScopeStack::new();
        scopes.enter(EnterOptions::PLAIN, Some("A".into()));
        assert!(scopes.add_symbol(var("x")));
        assert!(!scopes.add_symbol(var("x")));
    }

    #[test]
    fn shared_table_makes_formal_and_local_collide() {
        let mut scopes = ScopeStack::new();
        scopes.enter(EnterOptions::shared(), Some("A".into()));
        assert!(scopes.add_symbol(var("x")));
        scopes.enter(EnterOptions::PLAIN, None);
        // body block shares the method-scope table, so re-declaring `x` as
        // a local collides with the formal of the same name.
        assert!(!scopes.add_symbol(var("x")));
    }

    #[test]
    fn block_child_hides_outer_class_scope_names() {
        let mut scopes = ScopeStack::new();
        scopes.enter(EnterOptions::blocking(), Some("A".into()));
        scopes.enter(EnterOptions::PLAIN, None);
        assert_eq!(scopes.lookup_symbol("missing"), None);
    }

    #[test]
    fn block_child_frames_own_table_is_never_searched_from_inside() {
        let mut scopes = ScopeStack::new();
        scopes.enter(EnterOptions::blocking(), Some("A".into()));
        scopes.add_symbol(var("x"));
        scopes.enter(EnterOptions::PLAIN, None);
        // `x` lives in the barrier frame's own table; a child frame must
        // never see past the barrier, even to that frame's own symbols.
        assert_eq!(scopes.lookup_symbol("x"), None);
    }

    #[test]
    fn class_name_inherited_by_nested_scopes() {
        let mut scopes = ScopeStack::new();
        scopes.enter(EnterOptions::blocking(), Some("A".into()));
        scopes.enter(EnterOptions::PLAIN, None);
        assert_eq!(scopes.current_class_name(), Some("A".to_string()));
    }

    #[test]
    fn sequential_ids_assigned_across_frames_sharing_a_table() {
        let mut scopes = ScopeStack::new();
        scopes.enter(EnterOptions::shared(), Some("A".into()));
        let a = var("a");
        let b = var("b");
        scopes.add_symbol(a.clone());
        scopes.add_symbol(b.clone());
        assert_eq!(a.borrow().id, 1);
        assert_eq!(b.borrow().id, 2);
    }

    #[test]
    fn ids_continue_across_nested_blocks_in_same_member() {
        let mut scopes = ScopeStack::new();
        scopes.enter(EnterOptions::shared(), Some("A".into()));
        let formal = var("p");
        scopes.add_symbol(formal.clone());
        scopes.enter(EnterOptions::PLAIN, None);
        scopes.enter(EnterOptions::PLAIN, None);
        let nested_local = var("q");
        scopes.add_symbol(nested_local.clone());
        assert_eq!(formal.borrow().id, 1);
        assert_eq!(nested_local.borrow().id, 2);
    }
}
