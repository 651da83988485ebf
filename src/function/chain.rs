//! Ordered function chains.

use std::rc::Rc;

use botscript_core::FunctionId;

use crate::function::FunctionEntity;

/// The functions compiled together, in declaration order.
///
/// A chain owns its functions. Chains compiled separately can be
/// concatenated into one lookup scope with [`add_next`](Self::add_next).
#[derive(Debug, Clone, Default)]
pub struct FunctionChain {
    functions: Vec<Rc<FunctionEntity>>,
}

impl FunctionChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, function: Rc<FunctionEntity>) {
        self.functions.push(function);
    }

    /// Append every function of `other` after the functions of `self`.
    pub fn add_next(&mut self, other: &FunctionChain) {
        self.functions.extend(other.functions.iter().cloned());
    }

    /// The functions of the chain, in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Rc<FunctionEntity>> {
        self.functions.iter()
    }

    pub fn get(&self, id: FunctionId) -> Option<&Rc<FunctionEntity>> {
        self.functions.iter().find(|f| f.id() == id)
    }

    pub fn by_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Rc<FunctionEntity>> {
        self.functions.iter().filter(move |f| f.name() == name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl<'a> IntoIterator for &'a FunctionChain {
    type Item = &'a Rc<FunctionEntity>;
    type IntoIter = std::slice::Iter<'a, Rc<FunctionEntity>>;

    fn into_iter(self) -> Self::IntoIter {
        self.functions.iter()
    }
}
