//! Class/member/variable records (§3).
//!
//! Every record that can be shared — referenced by the dependency tree,
//! by a resolved field/method access, and later mutated by the layout and
//! code-gen passes — is held behind an `Rc<RefCell<_>>` handle rather than
//! owned uniquely. This mirrors the reference semantics the original
//! implementation gets for free (every record is just an object) without
//! needing an arena: parent/child links in the dependency tree go through
//! class *names*, never through an owned handle, so there is no cycle to
//! break.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::Stmt;
use crate::registers::ValueReg;
use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Visibility {
    Public,
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Public => write!(f, "public"),
            Visibility::Private => write!(f, "private"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Applicability {
    Static,
    Instance,
}

impl Applicability {
    /// The prefix used in a class's per-visibility lookup map key (§3).
    pub fn key_prefix(self) -> &'static str {
        match self {
            Applicability::Static => "static",
            Applicability::Instance => "instance",
        }
    }
}

impl fmt::Display for Applicability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key_prefix())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum VariableKind {
    Formal,
    Local,
}

/// A formal parameter or a local variable (§3).
#[derive(Debug)]
pub struct VariableRecord {
    pub name: String,
    pub kind: VariableKind,
    pub ty: Type,
    /// 1-based id within the owning member's variable table, assigned by
    /// [`crate::dependency_tree`]-independent scope bookkeeping (§4.1).
    pub id: u32,
    /// Set during code generation: the register that currently holds this
    /// variable's value. `None` until the variable's declaration point (for
    /// locals) or the enclosing member's preamble (for formals).
    pub value_reg: Option<ValueReg>,
}

pub type VariableHandle = Rc<RefCell<VariableRecord>>;

impl VariableRecord {
    pub fn new_handle(name: impl Into<String>, kind: VariableKind, ty: Type) -> VariableHandle {
        Rc::new(RefCell::new(VariableRecord {
            name: name.into(),
            kind,
            ty,
            id: 0,
            value_reg: None,
        }))
    }
}

/// A field declaration (§3).
#[derive(Debug)]
pub struct FieldRecord {
    pub id: u32,
    pub name: String,
    pub visibility: Visibility,
    pub applicability: Applicability,
    pub ty: Type,
    pub containing_class: String,
    /// Assigned by the layout pass (§4.4): a static-area offset for static
    /// fields, an instance offset (relative to the object base) otherwise.
    pub offset: Option<u32>,
}

pub type FieldHandle = Rc<RefCell<FieldRecord>>;

impl FieldRecord {
    /// The key this field is stored under in its class's `field_map`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.applicability.key_prefix(), self.name)
    }
}

/// A constructor declaration (§3). A class has at most one.
#[derive(Debug)]
pub struct ConstructorRecord {
    pub id: u32,
    pub visibility: Visibility,
    pub parameters: Vec<VariableHandle>,
    pub body: Stmt,
    pub variable_table: Vec<VariableHandle>,
    pub containing_class: String,
}

pub type ConstructorHandle = Rc<RefCell<ConstructorRecord>>;

impl ConstructorRecord {
    pub fn label(&self) -> String {
        format!("C_{}", self.id)
    }
}

/// A method declaration (§3).
#[derive(Debug)]
pub struct MethodRecord {
    pub id: u32,
    pub name: String,
    pub visibility: Visibility,
    pub applicability: Applicability,
    pub parameters: Vec<VariableHandle>,
    pub return_type: Type,
    pub body: Stmt,
    pub variable_table: Vec<VariableHandle>,
    pub containing_class: String,
}

pub type MethodHandle = Rc<RefCell<MethodRecord>>;

impl MethodRecord {
    pub fn label(&self) -> String {
        format!("M_{}_{}", self.name, self.id)
    }

    /// The key this method is stored under in its class's `method_map`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.applicability.key_prefix(), self.name)
    }
}

/// A class declaration (§3).
#[derive(Debug)]
pub struct ClassRecord {
    pub name: String,
    pub super_class_name: Option<String>,
    pub constructor: Option<ConstructorHandle>,
    pub methods: Vec<MethodHandle>,
    pub fields: Vec<FieldHandle>,
    pub method_map: IndexMap<String, MethodHandle>,
    pub field_map: IndexMap<String, FieldHandle>,
    /// Total instance-slot count, including inherited slots. Assigned
    /// exactly once, by the layout pass (§4.4), after the super-class's
    /// size is known.
    pub size: Option<u32>,
}

pub type ClassHandle = Rc<RefCell<ClassRecord>>;

/// Error building a [`ClassRecord`] from its parsed members: a duplicate
/// method or field key within the same class (§3's class invariants).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("class `{class_name}` declares `{key}` more than once")]
pub struct DuplicateMemberError {
    pub class_name: String,
    pub key: String,
}

impl ClassRecord {
    /// Builds a class record from its parsed constructor/methods/fields,
    /// rejecting duplicate method or field keys (§3 invariants). Mirrors
    /// the original's `ClassRecord.__init__`, which performs this check
    /// immediately when the class body is assembled.
    pub fn try_new(
        name: impl Into<String>,
        super_class_name: Option<String>,
        constructor: Option<ConstructorHandle>,
        methods: Vec<MethodHandle>,
        fields: Vec<FieldHandle>,
    ) -> Result<ClassRecord, DuplicateMemberError> {
        let name = name.into();

        let mut method_map = IndexMap::new();
        for m in &methods {
            let key = m.borrow().key();
            if method_map.insert(key.clone(), Rc::clone(m)).is_some() {
                return Err(DuplicateMemberError {
                    class_name: name,
                    key,
                });
            }
        }

        let mut field_map = IndexMap::new();
        for field in &fields {
            let key = field.borrow().key();
            if field_map.insert(key.clone(), Rc::clone(field)).is_some() {
                return Err(DuplicateMemberError {
                    class_name: name,
                    key,
                });
            }
        }

        Ok(ClassRecord {
            name,
            super_class_name,
            constructor,
            methods,
            fields,
            method_map,
            field_map,
            size: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, app: Applicability) -> FieldHandle {
        Rc::new(RefCell::new(FieldRecord {
            id: 1,
            name: name.to_string(),
            visibility: Visibility::Public,
            applicability: app,
            ty: Type::Int,
            containing_class: "A".to_string(),
            offset: None,
        }))
    }

    #[test]
    fn duplicate_field_key_rejected() {
        let fields = vec![
            field("x", Applicability::Instance),
            field("x", Applicability::Instance),
        ];
        let err = ClassRecord::try_new("A", None, None, vec![], fields).unwrap_err();
        assert_eq!(err.key, "instance:x");
    }

    #[test]
    fn same_name_static_and_instance_field_is_fine() {
        let fields = vec![
            field("x", Applicability::Instance),
            field("x", Applicability::Static),
        ];
        let rec = ClassRecord::try_new("A", None, None, vec![], fields).unwrap();
        assert_eq!(rec.field_map.len(), 2);
    }
}
