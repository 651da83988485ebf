//! Class registry.
//!
//! Classes are registered by the host before programs are compiled. The
//! compiler looks classes up by name, asks whether a class already declares
//! a call signature, and copies instance templates into method scopes; the
//! runtime allocates instances from the templates and takes the class guard
//! of synchronized methods.

use rustc_hash::FxHashMap;
use thiserror::Error;

use botscript_core::{ClassHierarchy, ContextId, DataType, Variable};

use crate::guard::{DEFAULT_MAX_WAITERS, SyncGuard};

/// Errors raised while registering classes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("duplicate class: {0}")]
    DuplicateClass(String),

    #[error("class '{class}' extends unknown class '{parent}'")]
    UnknownParent { class: String, parent: String },
}

/// A member variable of a class.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub data_type: DataType,
    pub private: bool,
}

/// A call signature a class declares outside of any script, e.g. a method
/// bound by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub name: String,
    pub params: Vec<DataType>,
    pub return_type: DataType,
}

impl MethodDecl {
    pub fn new(name: impl Into<String>, params: Vec<DataType>, return_type: DataType) -> Self {
        Self {
            name: name.into(),
            params,
            return_type,
        }
    }
}

/// A registered class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassEntry {
    pub name: String,
    pub parent: Option<String>,
    /// Own members, in declaration order.
    pub fields: Vec<FieldDef>,
    pub methods: Vec<MethodDecl>,
}

impl ClassEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            data_type,
            private: false,
        });
        self
    }

    pub fn with_private_field(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            data_type,
            private: true,
        });
        self
    }

    pub fn with_method(mut self, method: MethodDecl) -> Self {
        self.methods.push(method);
        self
    }
}

/// Registry of the classes known to an engine.
#[derive(Debug)]
pub struct ClassRegistry {
    classes: FxHashMap<String, ClassEntry>,
    guards: FxHashMap<String, SyncGuard>,
    max_waiters: usize,
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self {
            classes: FxHashMap::default(),
            guards: FxHashMap::default(),
            max_waiters: DEFAULT_MAX_WAITERS,
        }
    }
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class. Its parent, if any, must be registered first.
    pub fn register(&mut self, entry: ClassEntry) -> Result<(), RegistryError> {
        if self.classes.contains_key(&entry.name) {
            return Err(RegistryError::DuplicateClass(entry.name));
        }
        if let Some(parent) = &entry.parent
            && !self.classes.contains_key(parent)
        {
            return Err(RegistryError::UnknownParent {
                class: entry.name.clone(),
                parent: parent.clone(),
            });
        }
        self.classes.insert(entry.name.clone(), entry);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ClassEntry> {
        self.classes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn parent(&self, name: &str) -> Option<&str> {
        self.classes.get(name)?.parent.as_deref()
    }

    /// The class and its ancestors, most derived first.
    pub fn chain<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a ClassEntry> + use<'a> {
        let first = self.classes.get(name);
        std::iter::successors(first, move |class| {
            class
                .parent
                .as_deref()
                .and_then(|parent| self.classes.get(parent))
        })
    }

    /// Fresh member variables for an instance of `name`, inherited members
    /// first.
    pub fn instance_template(&self, name: &str) -> Option<Vec<Variable>> {
        if !self.contains(name) {
            return None;
        }
        let mut chain: Vec<&ClassEntry> = self.chain(name).collect();
        chain.reverse();
        let fields = chain
            .into_iter()
            .flat_map(|class| class.fields.iter())
            .map(|field| {
                let mut var = Variable::new(field.name.clone(), field.data_type.clone());
                var.set_private(field.private);
                var
            })
            .collect();
        Some(fields)
    }

    /// Whether `class` itself declares `name` with exactly these parameter
    /// types. Ancestors are not consulted, so a subclass may override.
    pub fn declares_call(&self, class: &str, name: &str, params: &[DataType]) -> bool {
        self.classes.get(class).is_some_and(|entry| {
            entry
                .methods
                .iter()
                .any(|m| m.name == name && m.params.as_slice() == params)
        })
    }

    // =========================================
    // Synchronized-method guards
    // =========================================

    pub fn set_max_waiters(&mut self, max_waiters: usize) {
        self.max_waiters = max_waiters;
    }

    /// Try to take the guard of `class` for the root context `token`.
    pub fn try_lock(&mut self, class: &str, token: ContextId) -> bool {
        let max_waiters = self.max_waiters;
        self.guards
            .entry(class.to_string())
            .or_default()
            .try_acquire(token, max_waiters)
    }

    /// Release one acquisition of the guard of `class`.
    pub fn unlock(&mut self, class: &str, token: ContextId) -> bool {
        self.guards
            .get_mut(class)
            .is_some_and(|guard| guard.release(token))
    }

    /// Take `token` out of every guard queue it waits in.
    pub fn withdraw(&mut self, token: ContextId) {
        for guard in self.guards.values_mut() {
            guard.withdraw(token);
        }
    }

    pub fn guard(&self, class: &str) -> Option<&SyncGuard> {
        self.guards.get(class)
    }
}

impl ClassHierarchy for ClassRegistry {
    fn derives_from(&self, class: &str, base: &str) -> bool {
        self.chain(class).any(|entry| entry.name == base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ClassRegistry {
        let mut classes = ClassRegistry::new();
        classes
            .register(
                ClassEntry::new("Base")
                    .with_field("id", DataType::int())
                    .with_method(MethodDecl::new(
                        "ping",
                        vec![DataType::int()],
                        DataType::void(),
                    )),
            )
            .unwrap();
        classes
            .register(
                ClassEntry::new("Robot")
                    .with_parent("Base")
                    .with_field("energy", DataType::float())
                    .with_private_field("secret", DataType::int()),
            )
            .unwrap();
        classes
    }

    #[test]
    fn duplicate_and_unknown_parent() {
        let mut classes = registry();
        assert_eq!(
            classes.register(ClassEntry::new("Robot")),
            Err(RegistryError::DuplicateClass("Robot".into()))
        );
        assert!(matches!(
            classes.register(ClassEntry::new("Drone").with_parent("Ghost")),
            Err(RegistryError::UnknownParent { .. })
        ));
    }

    #[test]
    fn template_lists_inherited_members_first() {
        let classes = registry();
        let fields = classes.instance_template("Robot").unwrap();
        let names: Vec<_> = fields.iter().map(Variable::name).collect();
        assert_eq!(names, vec!["id", "energy", "secret"]);
        assert!(fields[2].is_private());
        assert!(classes.instance_template("Ghost").is_none());
    }

    #[test]
    fn hierarchy() {
        let classes = registry();
        assert!(classes.derives_from("Robot", "Base"));
        assert!(classes.derives_from("Robot", "Robot"));
        assert!(!classes.derives_from("Base", "Robot"));
        assert_eq!(classes.parent("Robot"), Some("Base"));
    }

    #[test]
    fn declared_calls_are_per_class() {
        let classes = registry();
        assert!(classes.declares_call("Base", "ping", &[DataType::int()]));
        assert!(!classes.declares_call("Base", "ping", &[DataType::float()]));
        assert!(!classes.declares_call("Robot", "ping", &[DataType::int()]));
        assert!(!classes.declares_call("Base", "pong", &[]));
    }

    #[test]
    fn class_guards() {
        let mut classes = registry();
        let a = ContextId::new(1);
        let b = ContextId::new(2);
        assert!(classes.try_lock("Robot", a));
        assert!(!classes.try_lock("Robot", b));
        assert!(classes.try_lock("Base", b));
        assert!(classes.unlock("Robot", a));
        assert_eq!(classes.guard("Robot").and_then(SyncGuard::holder), Some(b));
        assert!(!classes.unlock("Ghost", a));
    }
}
