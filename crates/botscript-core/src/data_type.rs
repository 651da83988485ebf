//! Script data types.
//!
//! Every type has a *rank* used by overload resolution: the numeric kinds are
//! ranked from narrowest to widest, so the difference between an expected and
//! a provided rank tells the resolver whether a conversion widens or narrows.

use std::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

/// The kind of a script type.
///
/// The discriminant is the rank used by overload scoring.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    IntoPrimitive,
    TryFromPrimitive,
)]
#[repr(u8)]
pub enum TypeKind {
    Void = 0,
    Byte = 1,
    Short = 2,
    Char = 3,
    Int = 4,
    Long = 5,
    Float = 6,
    Double = 7,
    Bool = 8,
    String = 9,
    Array = 10,
    Class = 11,
    /// The type of the `null` literal.
    Null = 12,
}

impl TypeKind {
    /// Source name of the kind.
    pub const fn name(self) -> &'static str {
        match self {
            TypeKind::Void => "void",
            TypeKind::Byte => "byte",
            TypeKind::Short => "short",
            TypeKind::Char => "char",
            TypeKind::Int => "int",
            TypeKind::Long => "long",
            TypeKind::Float => "float",
            TypeKind::Double => "double",
            TypeKind::Bool => "bool",
            TypeKind::String => "string",
            TypeKind::Array => "array",
            TypeKind::Class => "class",
            TypeKind::Null => "null",
        }
    }

    /// Integral and floating point kinds.
    pub const fn is_numeric(self) -> bool {
        matches!(
            self,
            TypeKind::Byte
                | TypeKind::Short
                | TypeKind::Char
                | TypeKind::Int
                | TypeKind::Long
                | TypeKind::Float
                | TypeKind::Double
        )
    }

    pub const fn is_integral(self) -> bool {
        matches!(
            self,
            TypeKind::Byte | TypeKind::Short | TypeKind::Char | TypeKind::Int | TypeKind::Long
        )
    }

    /// Kinds whose values are references (may hold `null`).
    pub const fn is_reference(self) -> bool {
        matches!(self, TypeKind::Array | TypeKind::Class | TypeKind::Null)
    }
}

/// Answers inheritance questions for class compatibility checks.
///
/// Implemented by the class registry; [`ExactClasses`] is the fallback when
/// no registry is at hand.
pub trait ClassHierarchy {
    /// Whether `class` is `base` or derives from it.
    fn derives_from(&self, class: &str, base: &str) -> bool;
}

/// A hierarchy without inheritance: classes only match themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactClasses;

impl ClassHierarchy for ExactClasses {
    fn derives_from(&self, class: &str, base: &str) -> bool {
        class == base
    }
}

/// A complete script type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataType {
    kind: TypeKind,
    /// Class name, for `Class` types.
    class: Option<String>,
    /// Element type, for `Array` types.
    element: Option<Box<DataType>>,
}

impl DataType {
    /// A primitive type (anything but class and array).
    pub const fn primitive(kind: TypeKind) -> Self {
        Self {
            kind,
            class: None,
            element: None,
        }
    }

    pub const fn void() -> Self {
        Self::primitive(TypeKind::Void)
    }

    pub const fn int() -> Self {
        Self::primitive(TypeKind::Int)
    }

    pub const fn long() -> Self {
        Self::primitive(TypeKind::Long)
    }

    pub const fn float() -> Self {
        Self::primitive(TypeKind::Float)
    }

    pub const fn double() -> Self {
        Self::primitive(TypeKind::Double)
    }

    pub const fn bool() -> Self {
        Self::primitive(TypeKind::Bool)
    }

    pub const fn string() -> Self {
        Self::primitive(TypeKind::String)
    }

    pub const fn null() -> Self {
        Self::primitive(TypeKind::Null)
    }

    /// A reference to an instance of `name`.
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            kind: TypeKind::Class,
            class: Some(name.into()),
            element: None,
        }
    }

    pub fn array(element: DataType) -> Self {
        Self {
            kind: TypeKind::Array,
            class: None,
            element: Some(Box::new(element)),
        }
    }

    #[inline]
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn class_name(&self) -> Option<&str> {
        self.class.as_deref()
    }

    pub fn element(&self) -> Option<&DataType> {
        self.element.as_deref()
    }

    pub fn is_void(&self) -> bool {
        self.kind == TypeKind::Void
    }

    /// Overload rank of this type.
    ///
    /// `null` ranks like a class reference so that passing `null` to a class
    /// parameter is an exact match.
    pub fn rank(&self) -> i32 {
        let kind = if self.kind == TypeKind::Null {
            TypeKind::Class
        } else {
            self.kind
        };
        i32::from(u8::from(kind))
    }

    /// Whether a value of type `provided` may be passed where `self` is expected.
    ///
    /// Numeric kinds convert freely among each other; `bool` and `string` only
    /// match themselves; arrays need identical element types; class references
    /// accept the same class, a derived class, or `null`.
    pub fn accepts(&self, provided: &DataType, hierarchy: &dyn ClassHierarchy) -> bool {
        let expected = self.kind;
        let given = provided.kind;

        if expected == TypeKind::Void || given == TypeKind::Void {
            return false;
        }
        if expected.is_numeric() && given.is_numeric() {
            return true;
        }
        if given == TypeKind::Null {
            return expected.is_reference();
        }
        if expected != given {
            return false;
        }
        match expected {
            TypeKind::Array => self.element == provided.element,
            TypeKind::Class => match (&self.class, &provided.class) {
                (Some(base), Some(class)) => hierarchy.derives_from(class, base),
                _ => false,
            },
            _ => true,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TypeKind::Class => write!(f, "{}", self.class.as_deref().unwrap_or("class")),
            TypeKind::Array => match &self.element {
                Some(element) => write!(f, "{element}[]"),
                None => write!(f, "array"),
            },
            kind => write!(f, "{}", kind.name()),
        }
    }
}
