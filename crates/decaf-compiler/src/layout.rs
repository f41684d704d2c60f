//! Field-offset and class-size layout pass (§4.4).
//!
//! One static counter threaded across every class in declaration order;
//! one instance counter per class, seeded from the super class's already
//! computed `size`. Must run after type-checking has registered every
//! class and verified the super-class chain, since a subclass's instance
//! counter reads its super's `size` directly off the `ClassHandle`.

use decaf_core::{Applicability, ClassHandle};

/// Assigns every field's offset and every class's size, in the order the
/// classes are given. Returns the total static-slot count.
///
/// Classes must already be ordered so that a super class precedes its
/// subclasses — the order `decaf-frontend` parses them in, matching a
/// single-pass-friendly Decaf program (`decaf_codegen.py`'s
/// `resolve_sizes_and_offsets` assumes the same).
pub fn resolve_sizes_and_offsets(classes: &[ClassHandle]) -> u32 {
    let mut static_offset = 0u32;

    for class in classes {
        let super_size = class
            .borrow()
            .super_class_name
            .as_ref()
            .and_then(|super_name| {
                classes
                    .iter()
                    .find(|c| c.borrow().name == *super_name)
                    .map(|c| c.borrow().size.expect("super class laid out first"))
            })
            .unwrap_or(0);

        let mut instance_offset = super_size;
        let class_ref = class.borrow();
        for field in &class_ref.fields {
            let mut field_mut = field.borrow_mut();
            match field_mut.applicability {
                Applicability::Static => {
                    field_mut.offset = Some(static_offset);
                    static_offset += 1;
                }
                Applicability::Instance => {
                    field_mut.offset = Some(instance_offset);
                    instance_offset += 1;
                }
            }
        }
        drop(class_ref);
        class.borrow_mut().size = Some(instance_offset);
    }

    static_offset
}

#[cfg(test)]
mod tests {
    use super::*;
    use decaf_core::{Applicability, ClassRecord, FieldRecord, Type, Visibility};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn field(name: &str, app: Applicability, class: &str) -> decaf_core::FieldHandle {
        Rc::new(RefCell::new(FieldRecord {
            id: 1,
            name: name.to_string(),
            visibility: Visibility::Public,
            applicability: app,
            ty: Type::Int,
            containing_class: class.to_string(),
            offset: None,
        }))
    }

    fn class(
        name: &str,
        super_name: Option<&str>,
        fields: Vec<decaf_core::FieldHandle>,
    ) -> ClassHandle {
        Rc::new(RefCell::new(
            ClassRecord::try_new(name, super_name.map(String::from), None, vec![], fields)
                .unwrap(),
        ))
    }

    #[test]
    fn instance_offsets_accumulate_from_super_size() {
        let a = class(
            "A",
            None,
            vec![field("x", Applicability::Instance, "A")],
        );
        let b = class(
            "B",
            Some("A"),
            vec![field("y", Applicability::Instance, "B")],
        );
        resolve_sizes_and_offsets(&[a.clone(), b.clone()]);

        assert_eq!(a.borrow().size, Some(1));
        assert_eq!(
            a.borrow().fields[0].borrow().offset,
            Some(0)
        );
        assert_eq!(b.borrow().size, Some(2));
        assert_eq!(
            b.borrow().fields[0].borrow().offset,
            Some(1)
        );
    }

    #[test]
    fn static_offsets_are_one_counter_across_all_classes() {
        let a = class(
            "A",
            None,
            vec![field("s1", Applicability::Static, "A")],
        );
        let b = class(
            "B",
            None,
            vec![field("s2", Applicability::Static, "B")],
        );
        let total = resolve_sizes_and_offsets(&[a.clone(), b.clone()]);

        assert_eq!(a.borrow().fields[0].borrow().offset, Some(0));
        assert_eq!(b.borrow().fields[0].borrow().offset, Some(1));
        assert_eq!(total, 2);
    }

    #[test]
    fn class_with_no_fields_has_super_size() {
        let a = class(
            "A",
            None,
            vec![field("x", Applicability::Instance, "A")],
        );
        let b = class("B", Some("A"), vec![]);
        resolve_sizes_and_offsets(&[a.clone(), b.clone()]);
        assert_eq!(b.borrow().size, Some(1));
    }
}
