//! The class hierarchy and subtyping/member-resolution rules built on it
//! (§4, §9's design note).
//!
//! Classes are keyed by name in an [`IndexMap`], not linked through owned
//! parent/child pointers: looking up a superclass is a name lookup against
//! this map, repeated up the chain. This avoids the reference cycle a
//! `Rc` parent pointer paired with `Rc` children would create, at the
//! cost of one extra map lookup per hop — cheap next to a class
//! hierarchy's depth in practice.

use indexmap::IndexMap;

use crate::record::{Applicability, ClassHandle, FieldHandle, MethodHandle};
use crate::types::Type;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DependencyError {
    #[error("duplicate class name: {0}")]
    DuplicateClass(String),
    #[error("class {class} cannot extend unknown class: {super_class}")]
    UnknownSuperclass { class: String, super_class: String },
}

/// Insertion order tracks declaration order, which the layout pass and
/// code generator both rely on for deterministic output (Testable
/// Property 5).
#[derive(Debug, Default)]
pub struct DependencyTree {
    classes: IndexMap<String, ClassHandle>,
}

impl DependencyTree {
    pub fn new() -> Self {
        Self {
            classes: IndexMap::new(),
        }
    }

    pub fn register_class(&mut self, class: ClassHandle) -> Result<(), DependencyError> {
        let name = class.borrow().name.clone();
        if self.classes.contains_key(&name) {
            return Err(DependencyError::DuplicateClass(name));
        }

        if let Some(super_name) = class.borrow().super_class_name.clone() {
            if !self.classes.contains_key(&super_name) {
                return Err(DependencyError::UnknownSuperclass {
                    class: name,
                    super_class: super_name,
                });
            }
        }

        self.classes.insert(name, class);
        Ok(())
    }

    pub fn get_class_record(&self, name: &str) -> Option<ClassHandle> {
        self.classes.get(name).cloned()
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassHandle> {
        self.classes.values()
    }

    fn builtin_is_subtype(a: &Type, b: &Type) -> bool {
        if a == b {
            return true;
        }
        matches!((a, b), (Type::Int, Type::Float))
    }

    fn classname_is_subtype(&self, a: &str, b: &str) -> bool {
        let mut curr = Some(a.to_string());
        while let Some(name) = curr {
            if name == b {
                return true;
            }
            curr = self
                .classes
                .get(&name)
                .and_then(|c| c.borrow().super_class_name.clone());
        }
        false
    }

    /// Is `a` a subtype of `b`? (§4.2)
    pub fn is_subtype(&self, a: &Type, b: &Type) -> bool {
        if a.is_error() || b.is_error() {
            return false;
        }

        match (a, b) {
            (Type::User(a_name), Type::User(b_name)) => self.classname_is_subtype(a_name, b_name),
            (Type::ClassLit(a_name), Type::ClassLit(b_name)) => {
                self.classname_is_subtype(a_name, b_name)
            }
            (_, Type::User(_)) if !matches!(a, Type::User(_) | Type::ClassLit(_)) => {
                matches!(a, Type::Null)
            }
            (Type::User(_) | Type::ClassLit(_), _) => false,
            (_, Type::ClassLit(_)) => false,
            _ => Self::builtin_is_subtype(a, b),
        }
    }

    fn resolve_field_from(&self, class_name: &str, key: &str) -> Option<FieldHandle> {
        let mut curr = Some(class_name.to_string());
        while let Some(name) = curr {
            let class = self.classes.get(&name)?;
            let class_ref = class.borrow();
            if let Some(field) = class_ref.field_map.get(key) {
                return Some(field.clone());
            }
            curr = class_ref.super_class_name.clone();
        }
        None
    }

    /// Resolve a field by name, walking from `class_name` up through its
    /// superclasses (§4.2).
    pub fn resolve_field(
        &self,
        class_name: &str,
        field_name: &str,
        is_static: bool,
    ) -> Option<FieldHandle> {
        let app = if is_static {
            Applicability::Static
        } else {
            Applicability::Instance
        };
        let key = format!("{}:{}", app.key_prefix(), field_name);
        self.resolve_field_from(class_name, &key)
    }

    fn resolve_method_from(&self, class_name: &str, key: &str) -> Option<MethodHandle> {
        let mut curr = Some(class_name.to_string());
        while let Some(name) = curr {
            let class = self.classes.get(&name)?;
            let class_ref = class.borrow();
            if let Some(method) = class_ref.method_map.get(key) {
                return Some(method.clone());
            }
            curr = class_ref.super_class_name.clone();
        }
        None
    }

    /// Resolve a method by name, walking from `class_name` up through its
    /// superclasses (§4.2).
    pub fn resolve_method(
        &self,
        class_name: &str,
        method_name: &str,
        is_static: bool,
    ) -> Option<MethodHandle> {
        let app = if is_static {
            Applicability::Static
        } else {
            Applicability::Instance
        };
        let key = format!("{}:{}", app.key_prefix(), method_name);
        self.resolve_method_from(class_name, &key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ClassRecord;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn class(name: &str, super_name: Option<&str>) -> ClassHandle {
        let rec =
            ClassRecord::try_new(name, super_name.map(String::from), None, vec![], vec![])
                .unwrap();
        Rc::new(RefCell::new(rec))
    }

    #[test]
    fn unknown_superclass_rejected() {
        let mut tree = DependencyTree::new();
        let err = tree.register_class(class("B", Some("A"))).unwrap_err();
        assert_eq!(
            err,
            DependencyError::UnknownSuperclass {
                class: "B".to_string(),
                super_class: "A".to_string(),
            }
        );
    }

    #[test]
    fn duplicate_class_rejected() {
        let mut tree = DependencyTree::new();
        tree.register_class(class("A", None)).unwrap();
        let err = tree.register_class(class("A", None)).unwrap_err();
        assert_eq!(err, DependencyError::DuplicateClass("A".to_string()));
    }

    #[test]
    fn subtype_chain_through_superclasses() {
        let mut tree = DependencyTree::new();
        tree.register_class(class("A", None)).unwrap();
        tree.register_class(class("B", Some("A"))).unwrap();
        tree.register_class(class("C", Some("B"))).unwrap();

        assert!(tree.is_subtype(&Type::User("C".into()), &Type::User("A".into())));
        assert!(!tree.is_subtype(&Type::User("A".into()), &Type::User("C".into())));
    }

    #[test]
    fn int_is_subtype_of_float_but_not_reverse() {
        let tree = DependencyTree::new();
        assert!(tree.is_subtype(&Type::Int, &Type::Float));
        assert!(!tree.is_subtype(&Type::Float, &Type::Int));
    }

    #[test]
    fn null_is_subtype_of_any_user_class() {
        let mut tree = DependencyTree::new();
        tree.register_class(class("A", None)).unwrap();
        assert!(tree.is_subtype(&Type::Null, &Type::User("A".into())));
    }

    #[test]
    fn error_type_is_never_a_subtype_in_either_direction() {
        let tree = DependencyTree::new();
        assert!(!tree.is_subtype(&Type::Error, &Type::Int));
        assert!(!tree.is_subtype(&Type::Int, &Type::Error));
    }
}
