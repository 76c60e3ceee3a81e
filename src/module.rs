//! The top-level module: its code object, its class table, and the shared globals.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::class::ClassDescriptor;
use crate::code::CodeObject;
use crate::value::Value;

/// The running program's single module: the compiled top-level code, the
/// classes built from it so far, and the global namespace every frame shares.
///
/// Functions are bound directly into globals by `MAKE_FUNCTION`, so there is
/// no separate per-module functions table to carry.
#[derive(Debug)]
pub struct VmModule {
    /// The module's name, for diagnostics.
    pub name: String,
    /// The top-level code object.
    pub code: Rc<CodeObject>,
    /// Classes installed by `LOAD_BUILD_CLASS`/`CALL_FUNCTION` once their body finishes executing.
    classes: RefCell<HashMap<String, Rc<ClassDescriptor>>>,
    /// The single global namespace, shared by every frame in the program.
    globals: Rc<RefCell<HashMap<String, Value>>>,
}

impl VmModule {
    /// Creates a module around its compiled top-level code.
    #[must_use]
    pub fn new(name: impl Into<String>, code: Rc<CodeObject>) -> Self {
        Self {
            name: name.into(),
            code,
            classes: RefCell::new(HashMap::new()),
            globals: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    /// Installs a freshly-built class.
    pub fn add_class(&self, class: Rc<ClassDescriptor>) {
        self.classes.borrow_mut().insert(class.name.clone(), class);
    }

    /// Looks up a class by name.
    #[must_use]
    pub fn find_class(&self, name: &str) -> Option<Rc<ClassDescriptor>> {
        self.classes.borrow().get(name).cloned()
    }

    /// A handle to the shared global namespace, to hand to a new frame.
    #[must_use]
    pub fn globals(&self) -> Rc<RefCell<HashMap<String, Value>>> {
        Rc::clone(&self.globals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{LineMap, LineTableEntry};
    use std::cell::RefCell as StdRefCell;

    fn sample_code() -> Rc<CodeObject> {
        Rc::new(CodeObject::new(
            vec![],
            vec![],
            vec![],
            vec![],
            0,
            1,
            LineMap::new(1, vec![LineTableEntry { byte_delta: 0, line_delta: 0 }], vec!["pass".into()]),
            None,
        ))
    }

    #[test]
    fn classes_round_trip() {
        let module = VmModule::new("main_module", sample_code());
        let class = Rc::new(ClassDescriptor {
            name: "Point".into(),
            special_methods: HashMap::new(),
            methods: HashMap::new(),
            attributes: StdRefCell::new(HashMap::new()),
            body_code: sample_code(),
        });
        module.add_class(Rc::clone(&class));
        assert!(module.find_class("Point").is_some());
        assert!(module.find_class("Missing").is_none());
    }
}
