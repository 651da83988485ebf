//! Runtime values and typed variables.

use serde::{Deserialize, Serialize};

use crate::{Binding, DataType, ObjectHandle, TypeKind};

/// A runtime value.
///
/// Integral kinds are all stored as `i64` and floating kinds as `f64`; the
/// static [`DataType`] of the variable holding the value decides the width.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Void,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Reference to an instance on the object heap.
    Object(ObjectHandle),
    Null,
}

impl Value {
    /// Get a human-readable name for this value's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Void => "void",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Object(_) => "object",
            Value::Null => "null",
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Value::Void)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<ObjectHandle> {
        match self {
            Value::Object(handle) => Some(*handle),
            _ => None,
        }
    }

    /// The zero value of a type.
    pub fn default_for(ty: &DataType) -> Value {
        match ty.kind() {
            TypeKind::Void => Value::Void,
            TypeKind::Bool => Value::Bool(false),
            kind if kind.is_integral() => Value::Int(0),
            TypeKind::Float | TypeKind::Double => Value::Float(0.0),
            TypeKind::String => Value::String(String::new()),
            _ => Value::Null,
        }
    }

    /// Convert this value for storage in a variable of type `ty`.
    ///
    /// Integral targets truncate floats and wrap to the target width; float
    /// targets round to single precision. Returns `None` when the value cannot
    /// be stored in `ty` at all.
    pub fn convert_to(&self, ty: &DataType) -> Option<Value> {
        let kind = ty.kind();
        match (self, kind) {
            (Value::Int(v), k) if k.is_integral() => Some(Value::Int(wrap_integral(*v, k))),
            (Value::Float(v), k) if k.is_integral() => {
                Some(Value::Int(wrap_integral(v.trunc() as i64, k)))
            }
            (Value::Int(v), TypeKind::Float) => Some(Value::Float(*v as f32 as f64)),
            (Value::Float(v), TypeKind::Float) => Some(Value::Float(*v as f32 as f64)),
            (Value::Int(v), TypeKind::Double) => Some(Value::Float(*v as f64)),
            (Value::Float(v), TypeKind::Double) => Some(Value::Float(*v)),
            (Value::Bool(v), TypeKind::Bool) => Some(Value::Bool(*v)),
            (Value::String(s), TypeKind::String) => Some(Value::String(s.clone())),
            (Value::Object(h), TypeKind::Class) => Some(Value::Object(*h)),
            (Value::Null, k) if k.is_reference() => Some(Value::Null),
            (Value::Void, TypeKind::Void) => Some(Value::Void),
            _ => None,
        }
    }
}

fn wrap_integral(v: i64, kind: TypeKind) -> i64 {
    match kind {
        TypeKind::Byte => v as i8 as i64,
        TypeKind::Short => v as i16 as i64,
        TypeKind::Char => v as u16 as i64,
        TypeKind::Int => v as i32 as i64,
        _ => v,
    }
}

/// Initialization state of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InitState {
    #[default]
    Undefined,
    Defined,
    /// Defined and holding `null`.
    Null,
    /// Holds a reference to an instance rather than a value.
    IsPointer,
}

/// A named, typed variable.
///
/// Arguments passed to calls are variables too: the resolver reads their
/// [`DataType`] to score overloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    name: String,
    data_type: DataType,
    value: Value,
    init: InitState,
    private: bool,
    #[serde(skip)]
    binding: Binding,
}

impl Variable {
    /// Create an undefined variable holding the zero value of its type.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        let value = Value::default_for(&data_type);
        Self {
            name: name.into(),
            data_type,
            value,
            init: InitState::Undefined,
            private: false,
            binding: Binding::Unbound,
        }
    }

    /// Create a defined variable.
    pub fn with_value(name: impl Into<String>, data_type: DataType, value: Value) -> Self {
        let init = if value.is_null() {
            InitState::Null
        } else {
            InitState::Defined
        };
        Self {
            name: name.into(),
            data_type,
            value,
            init,
            private: false,
            binding: Binding::Unbound,
        }
    }

    /// An anonymous `int` argument.
    pub fn int(v: i64) -> Self {
        Self::with_value("", DataType::int(), Value::Int(v))
    }

    /// An anonymous `long` argument.
    pub fn long(v: i64) -> Self {
        Self::with_value("", DataType::long(), Value::Int(v))
    }

    /// An anonymous `float` argument.
    pub fn float(v: f64) -> Self {
        Self::with_value("", DataType::float(), Value::Float(v as f32 as f64))
    }

    /// An anonymous `double` argument.
    pub fn double(v: f64) -> Self {
        Self::with_value("", DataType::double(), Value::Float(v))
    }

    /// An anonymous `bool` argument.
    pub fn bool(v: bool) -> Self {
        Self::with_value("", DataType::bool(), Value::Bool(v))
    }

    /// An anonymous `string` argument.
    pub fn string(v: impl Into<String>) -> Self {
        Self::with_value("", DataType::string(), Value::String(v.into()))
    }

    /// An anonymous reference to an instance of `class`.
    pub fn object(class: impl Into<String>, handle: ObjectHandle) -> Self {
        let mut var = Self::with_value("", DataType::class(class), Value::Object(handle));
        var.init = InitState::IsPointer;
        var
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn set_value(&mut self, value: Value) {
        self.init = if value.is_null() {
            InitState::Null
        } else if self.init == InitState::IsPointer {
            InitState::IsPointer
        } else {
            InitState::Defined
        };
        self.value = value;
    }

    pub fn init(&self) -> InitState {
        self.init
    }

    pub fn set_init(&mut self, init: InitState) {
        self.init = init;
    }

    pub fn is_private(&self) -> bool {
        self.private
    }

    pub fn set_private(&mut self, private: bool) {
        self.private = private;
    }

    pub fn binding(&self) -> Binding {
        self.binding
    }

    pub fn set_binding(&mut self, binding: Binding) {
        self.binding = binding;
    }

    /// Copy the value and initialization state of `other`, keeping name,
    /// type and binding.
    pub fn copy_from(&mut self, other: &Variable) {
        self.value = other.value.clone();
        self.init = other.init;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ReservedBinding, VarId};

    #[test]
    fn default_values_follow_type() {
        assert_eq!(Value::default_for(&DataType::int()), Value::Int(0));
        assert_eq!(Value::default_for(&DataType::float()), Value::Float(0.0));
        assert_eq!(Value::default_for(&DataType::class("A")), Value::Null);
    }

    #[test]
    fn integral_conversion_truncates_and_wraps() {
        let byte = DataType::primitive(TypeKind::Byte);
        assert_eq!(Value::Int(300).convert_to(&byte), Some(Value::Int(44)));
        assert_eq!(
            Value::Float(2.9).convert_to(&DataType::int()),
            Some(Value::Int(2))
        );
    }

    #[test]
    fn float_conversion_uses_single_precision() {
        let converted = Value::Float(0.1).convert_to(&DataType::float()).unwrap();
        assert_eq!(converted, Value::Float(0.1f32 as f64));
        assert_eq!(
            Value::Int(3).convert_to(&DataType::double()),
            Some(Value::Float(3.0))
        );
    }

    #[test]
    fn incompatible_conversion_fails() {
        assert_eq!(Value::Bool(true).convert_to(&DataType::int()), None);
        assert_eq!(Value::Null.convert_to(&DataType::int()), None);
        assert_eq!(
            Value::Null.convert_to(&DataType::class("A")),
            Some(Value::Null)
        );
    }

    #[test]
    fn binding_is_not_serialized() {
        let mut var = Variable::int(5);
        var.set_binding(Binding::Var(VarId::new(2)));
        let json = serde_json::to_string(&var).unwrap();
        let back: Variable = serde_json::from_str(&json).unwrap();
        assert_eq!(back.value(), &Value::Int(5));
        assert_eq!(back.binding(), Binding::Unbound);
    }

    #[test]
    fn copy_keeps_identity() {
        let mut this = Variable::new("this", DataType::class("A"));
        this.set_binding(Binding::Reserved(ReservedBinding::CurrentInstance));
        this.copy_from(&Variable::with_value("", DataType::class("A"), Value::Null));
        assert_eq!(this.name(), "this");
        assert_eq!(
            this.binding(),
            Binding::Reserved(ReservedBinding::CurrentInstance)
        );
        assert_eq!(this.init(), InitState::Null);
    }
}
