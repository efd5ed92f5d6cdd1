//! The dynamic value model that eventual operations act on.
//!
//! [`Value`] is a single-threaded, reference-counted dynamic value. Plain
//! objects carry an ordered property map and a prototype; reads walk the
//! prototype chain and hand the original receiver to any intercepting
//! prototype they reach. Values that intercept their own operations
//! (proxies, presences, pipelining cells) implement [`Interceptable`].

use crate::deferred::{Deferred, WeakDeferred};
use crate::handler::Handler;
use eventide_core::prelude::{Key, TaggedError, WellKnownSymbol};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Result of anything that can throw: `Err` carries the thrown value.
pub type Outcome = Result<Value, Value>;

/// A value that intercepts the synchronous object operations.
pub trait Interceptable {
    fn get(&self, key: &Key, receiver: &Value) -> Value;

    fn set(&self, key: &Key, value: Value, receiver: &Value) -> bool;

    fn delete(&self, key: &Key) -> bool;

    fn apply(&self, this: &Value, args: Vec<Value>) -> Outcome;

    fn own_keys(&self) -> Vec<Key>;

    /// Handler that eventual operations aimed at this value are routed to.
    fn eventual_handler(&self) -> Option<Handler> {
        None
    }

    /// Tag used when the value is rendered, as in `[object Tag]`.
    fn string_tag(&self) -> String {
        "Object".to_string()
    }
}

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Object(ObjectRef),
    Function(FunctionRef),
    Error(Rc<TaggedError>),
    Deferred(Deferred),
    Exotic(Rc<dyn Interceptable>),
}

struct ObjectData {
    proto: Value,
    props: IndexMap<Key, Value>,
}

/// Shared handle to a plain object.
#[derive(Clone)]
pub struct ObjectRef(Rc<RefCell<ObjectData>>);

impl ObjectRef {
    pub fn new() -> Self {
        Self::with_proto(Value::Null)
    }

    pub fn with_proto(proto: Value) -> Self {
        Self(Rc::new(RefCell::new(ObjectData {
            proto,
            props: IndexMap::new(),
        })))
    }

    pub fn proto(&self) -> Value {
        self.0.borrow().proto.clone()
    }

    pub fn set_proto(&self, proto: Value) {
        self.0.borrow_mut().proto = proto;
    }

    pub fn get_own(&self, key: &Key) -> Option<Value> {
        self.0.borrow().props.get(key).cloned()
    }

    pub fn has_own(&self, key: &Key) -> bool {
        self.0.borrow().props.contains_key(key)
    }

    /// Define or overwrite an own property.
    pub fn define(&self, key: impl Into<Key>, value: impl Into<Value>) {
        self.0.borrow_mut().props.insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &Key) -> bool {
        self.0.borrow_mut().props.shift_remove(key).is_some()
    }

    /// Own keys in insertion order.
    pub fn keys(&self) -> Vec<Key> {
        self.0.borrow().props.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn lookup(&self, key: &Key, receiver: &Value) -> Outcome {
        // The borrow ends before the prototype is consulted.
        if let Some(found) = self.get_own(key) {
            return Ok(found);
        }
        match self.proto() {
            Value::Undefined | Value::Null => Ok(Value::Undefined),
            proto => proto.get_with_receiver(key, receiver),
        }
    }

    fn assign(&self, key: &Key, value: Value, receiver: &Value) -> Result<bool, Value> {
        if self.has_own(key) {
            return Ok(define_on(receiver, key, value));
        }
        match self.proto() {
            proto @ (Value::Object(_) | Value::Function(_) | Value::Exotic(_)) => {
                proto.set_with_receiver(key, value, receiver)
            }
            _ => Ok(define_on(receiver, key, value)),
        }
    }

    /// Own `Symbol.toStringTag`, following plain prototypes only.
    pub(crate) fn plain_tag(&self) -> Option<String> {
        let tag = Key::Symbol(WellKnownSymbol::ToStringTag);
        let mut current = self.clone();
        loop {
            if let Some(Value::String(s)) = current.get_own(&tag) {
                return Some(s.to_string());
            }
            match current.proto() {
                Value::Object(next) => current = next,
                _ => return None,
            }
        }
    }
}

impl Default for ObjectRef {
    fn default() -> Self {
        Self::new()
    }
}

fn define_on(receiver: &Value, key: &Key, value: Value) -> bool {
    match receiver {
        Value::Object(o) => {
            o.define(key.clone(), value);
            true
        }
        Value::Function(f) => {
            f.props().define(key.clone(), value);
            true
        }
        _ => false,
    }
}

type NativeBody = dyn Fn(&Value, Vec<Value>) -> Outcome;

struct NativeFunction {
    name: String,
    props: ObjectRef,
    body: Box<NativeBody>,
}

/// A callable value backed by a Rust closure.
#[derive(Clone)]
pub struct FunctionRef(Rc<NativeFunction>);

impl FunctionRef {
    pub fn new(
        name: impl Into<String>,
        body: impl Fn(&Value, Vec<Value>) -> Outcome + 'static,
    ) -> Self {
        Self(Rc::new(NativeFunction {
            name: name.into(),
            props: ObjectRef::new(),
            body: Box::new(body),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Own properties of the function object.
    pub fn props(&self) -> &ObjectRef {
        &self.0.props
    }

    pub fn call(&self, this: &Value, args: Vec<Value>) -> Outcome {
        (self.0.body)(this, args)
    }

    pub fn ptr_eq(&self, other: &FunctionRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Argument `index`, or `undefined` when absent.
pub fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}

pub(crate) fn type_error(message: impl Into<String>) -> Value {
    Value::from(TaggedError::type_error(message))
}

fn thin(ptr: *const dyn Interceptable) -> *const () {
    ptr as *const ()
}

impl Value {
    /// A plain object with a null prototype.
    pub fn object<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Value
    where
        K: Into<Key>,
        V: Into<Value>,
    {
        let obj = ObjectRef::new();
        for (key, value) in entries {
            obj.define(key, value);
        }
        Value::Object(obj)
    }

    pub fn empty_object() -> Value {
        Value::Object(ObjectRef::new())
    }

    pub fn function(
        name: impl Into<String>,
        body: impl Fn(&Value, Vec<Value>) -> Outcome + 'static,
    ) -> Value {
        Value::Function(FunctionRef::new(name, body))
    }

    pub fn exotic(inner: impl Interceptable + 'static) -> Value {
        Value::Exotic(Rc::new(inner))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_) | Value::Exotic(_))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_deferred(&self) -> Option<&Deferred> {
        match self {
            Value::Deferred(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&TaggedError> {
        match self {
            Value::Error(e) => Some(e.as_ref()),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) | Value::Exotic(_) => "function",
            Value::Object(_) | Value::Error(_) | Value::Deferred(_) => "object",
        }
    }

    /// Identity comparison. Primitives compare by value, everything else
    /// by reference.
    pub fn is(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Error(a), Value::Error(b)) => Rc::ptr_eq(a, b),
            (Value::Deferred(a), Value::Deferred(b)) => a.ptr_eq(b),
            (Value::Exotic(a), Value::Exotic(b)) => thin(Rc::as_ptr(a)) == thin(Rc::as_ptr(b)),
            _ => false,
        }
    }

    pub fn downgrade(&self) -> WeakValue {
        WeakValue(match self {
            Value::Object(o) => WeakRepr::Object(Rc::downgrade(&o.0)),
            Value::Function(f) => WeakRepr::Function(Rc::downgrade(&f.0)),
            Value::Error(e) => WeakRepr::Error(Rc::downgrade(e)),
            Value::Deferred(d) => WeakRepr::Deferred(d.downgrade()),
            Value::Exotic(e) => WeakRepr::Exotic(Rc::downgrade(e)),
            primitive => WeakRepr::Primitive(primitive.clone()),
        })
    }

    pub fn get(&self, key: impl Into<Key>) -> Outcome {
        self.get_with_receiver(&key.into(), self)
    }

    /// Property read where accessors and intercepting prototypes see
    /// `receiver` rather than the value the read started on.
    pub fn get_with_receiver(&self, key: &Key, receiver: &Value) -> Outcome {
        match self {
            Value::Undefined | Value::Null => Err(type_error(format!(
                "Cannot read property {} of {}",
                key, self
            ))),
            Value::Bool(_) | Value::Number(_) => Ok(Value::Undefined),
            Value::String(s) => Ok(match key.name() {
                Some("length") => Value::from(s.chars().count()),
                _ => Value::Undefined,
            }),
            Value::Object(o) => o.lookup(key, receiver),
            Value::Function(f) => {
                if !f.props().has_own(key) && key.name() == Some("name") {
                    return Ok(Value::from(f.name()));
                }
                f.props().lookup(key, receiver)
            }
            Value::Error(e) => Ok(match key.name() {
                Some("name") => Value::from(e.kind().name()),
                Some("message") => Value::from(e.message()),
                Some("cause") => e.cause().map(Value::from).unwrap_or_default(),
                _ => Value::Undefined,
            }),
            Value::Deferred(d) => Ok(key.name().and_then(|n| d.method(n)).unwrap_or_default()),
            Value::Exotic(e) => Ok(e.get(key, receiver)),
        }
    }

    pub fn set(&self, key: impl Into<Key>, value: impl Into<Value>) -> Result<bool, Value> {
        self.set_with_receiver(&key.into(), value.into(), self)
    }

    pub fn set_with_receiver(
        &self,
        key: &Key,
        value: Value,
        receiver: &Value,
    ) -> Result<bool, Value> {
        match self {
            Value::Undefined | Value::Null => Err(type_error(format!(
                "Cannot set property {} of {}",
                key, self
            ))),
            Value::Object(o) => o.assign(key, value, receiver),
            Value::Function(f) => f.props().assign(key, value, receiver),
            Value::Exotic(e) => Ok(e.set(key, value, receiver)),
            _ => Ok(false),
        }
    }

    pub fn delete(&self, key: impl Into<Key>) -> Result<bool, Value> {
        let key = key.into();
        match self {
            Value::Undefined | Value::Null => Err(type_error(format!(
                "Cannot delete property {} of {}",
                key, self
            ))),
            Value::Object(o) => {
                o.remove(&key);
                Ok(true)
            }
            Value::Function(f) => {
                f.props().remove(&key);
                Ok(true)
            }
            Value::Exotic(e) => Ok(e.delete(&key)),
            _ => Ok(true),
        }
    }

    pub fn call(&self, this: &Value, args: Vec<Value>) -> Outcome {
        match self {
            Value::Function(f) => f.call(this, args),
            Value::Exotic(e) => e.apply(this, args),
            other => Err(type_error(format!("{} is not a function", other))),
        }
    }

    /// Read `key` and call it with this value as `this`.
    pub fn invoke(&self, key: impl Into<Key>, args: Vec<Value>) -> Outcome {
        let key = key.into();
        let method = self.get_with_receiver(&key, self)?;
        if !method.is_callable() {
            return Err(type_error(format!("{} is not a function", key)));
        }
        method.call(self, args)
    }

    pub fn own_keys(&self) -> Vec<Key> {
        match self {
            Value::Object(o) => o.keys(),
            Value::Function(f) => f.props().keys(),
            Value::Exotic(e) => e.own_keys(),
            _ => Vec::new(),
        }
    }

    /// Convert JSON data. Arrays become objects with index keys and a
    /// `length`.
    pub fn from_json(json: &serde_json::Value) -> Value {
        use serde_json::Value as Json;
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Value::from(s.as_str()),
            Json::Array(items) => {
                let obj = ObjectRef::new();
                for (index, item) in items.iter().enumerate() {
                    obj.define(index, Value::from_json(item));
                }
                obj.define("length", items.len());
                Value::Object(obj)
            }
            Json::Object(map) => {
                Value::object(map.iter().map(|(k, v)| (k.as_str(), Value::from_json(v))))
            }
        }
    }
}

fn fmt_number(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.is_nan() {
        write!(f, "NaN")
    } else if n.is_infinite() {
        write!(f, "{}", if n > 0.0 { "Infinity" } else { "-Infinity" })
    } else if n == n.trunc() && n.abs() < 2f64.powi(53) {
        write!(f, "{}", n as i64)
    } else {
        let text = n.to_string();
        f.write_str(text.strip_suffix(".0").unwrap_or(&text))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => fmt_number(*n, f),
            Value::String(s) => write!(f, "{}", s),
            Value::Object(o) => {
                let tag = o.plain_tag().unwrap_or_else(|| "Object".to_string());
                write!(f, "[object {}]", tag)
            }
            Value::Function(func) => write!(f, "[Function: {}]", func.name()),
            Value::Error(e) => write!(f, "{}", e),
            Value::Deferred(_) => write!(f, "[object Deferred]"),
            Value::Exotic(e) => write!(f, "[object {}]", e.string_tag()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            Value::Deferred(d) => write!(f, "{:?}", d),
            other => write!(f, "{}", other),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.is(other)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<ObjectRef> for Value {
    fn from(o: ObjectRef) -> Self {
        Value::Object(o)
    }
}

impl From<FunctionRef> for Value {
    fn from(f: FunctionRef) -> Self {
        Value::Function(f)
    }
}

impl From<TaggedError> for Value {
    fn from(e: TaggedError) -> Self {
        Value::Error(Rc::new(e))
    }
}

impl From<Deferred> for Value {
    fn from(d: Deferred) -> Self {
        Value::Deferred(d)
    }
}

enum WeakRepr {
    Primitive(Value),
    Object(Weak<RefCell<ObjectData>>),
    Function(Weak<NativeFunction>),
    Error(Weak<TaggedError>),
    Deferred(WeakDeferred),
    Exotic(Weak<dyn Interceptable>),
}

/// Non-owning reference to a value, usable for identity checks.
///
/// The allocation stays reserved while the weak half exists, so an
/// address can never be reused by an unrelated value.
pub struct WeakValue(WeakRepr);

impl WeakValue {
    pub fn is(&self, value: &Value) -> bool {
        match (&self.0, value) {
            (WeakRepr::Primitive(p), v) => p.is(v),
            (WeakRepr::Object(w), Value::Object(o)) => std::ptr::eq(w.as_ptr(), Rc::as_ptr(&o.0)),
            (WeakRepr::Function(w), Value::Function(func)) => {
                std::ptr::eq(w.as_ptr(), Rc::as_ptr(&func.0))
            }
            (WeakRepr::Error(w), Value::Error(e)) => std::ptr::eq(w.as_ptr(), Rc::as_ptr(e)),
            (WeakRepr::Deferred(w), Value::Deferred(d)) => w.is(d),
            (WeakRepr::Exotic(w), Value::Exotic(e)) => thin(w.as_ptr()) == thin(Rc::as_ptr(e)),
            _ => false,
        }
    }

    pub fn upgrade(&self) -> Option<Value> {
        match &self.0 {
            WeakRepr::Primitive(p) => Some(p.clone()),
            WeakRepr::Object(w) => w.upgrade().map(|rc| Value::Object(ObjectRef(rc))),
            WeakRepr::Function(w) => w.upgrade().map(|rc| Value::Function(FunctionRef(rc))),
            WeakRepr::Error(w) => w.upgrade().map(Value::Error),
            WeakRepr::Deferred(w) => w.upgrade().map(Value::Deferred),
            WeakRepr::Exotic(w) => w.upgrade().map(Value::Exotic),
        }
    }
}

impl Clone for WeakValue {
    fn clone(&self) -> Self {
        WeakValue(match &self.0 {
            WeakRepr::Primitive(p) => WeakRepr::Primitive(p.clone()),
            WeakRepr::Object(w) => WeakRepr::Object(w.clone()),
            WeakRepr::Function(w) => WeakRepr::Function(w.clone()),
            WeakRepr::Error(w) => WeakRepr::Error(w.clone()),
            WeakRepr::Deferred(w) => WeakRepr::Deferred(w.clone()),
            WeakRepr::Exotic(w) => WeakRepr::Exotic(w.clone()),
        })
    }
}

impl fmt::Debug for WeakValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(v) => write!(f, "WeakValue({:?})", v),
            None => write!(f, "WeakValue(<dropped>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventide_core::prelude::ErrorKind;
    use std::cell::Cell;

    /// Exotic prototype that records the receiver it was handed.
    struct RecordingProto {
        seen: RefCell<Vec<Value>>,
    }

    impl Interceptable for RecordingProto {
        fn get(&self, key: &Key, receiver: &Value) -> Value {
            self.seen.borrow_mut().push(receiver.clone());
            Value::from(format!("via proto: {}", key))
        }

        fn set(&self, _key: &Key, _value: Value, receiver: &Value) -> bool {
            self.seen.borrow_mut().push(receiver.clone());
            true
        }

        fn delete(&self, _key: &Key) -> bool {
            false
        }

        fn apply(&self, _this: &Value, _args: Vec<Value>) -> Outcome {
            Ok(Value::Undefined)
        }

        fn own_keys(&self) -> Vec<Key> {
            Vec::new()
        }
    }

    #[test]
    fn test_own_and_inherited_reads() {
        let base = Value::object([("greeting", "hi")]);
        let child = ObjectRef::with_proto(base);
        child.define("own", 1);
        let child = Value::Object(child);

        assert_eq!(child.get("own").unwrap(), Value::from(1));
        assert_eq!(child.get("greeting").unwrap(), Value::from("hi"));
        assert!(child.get("missing").unwrap().is_undefined());
    }

    #[test]
    fn test_exotic_proto_sees_original_receiver() {
        let proto = Rc::new(RecordingProto {
            seen: RefCell::new(Vec::new()),
        });
        let obj = Value::Object(ObjectRef::with_proto(Value::Exotic(proto.clone())));

        let read = obj.get("anything").unwrap();
        assert_eq!(read, Value::from("via proto: anything"));
        assert!(obj.set("x", 1).unwrap());

        let seen = proto.seen.borrow();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|r| r.is(&obj)));
    }

    #[test]
    fn test_set_defines_on_receiver() {
        let base = Value::object([("shared", 1)]);
        let child = Value::Object(ObjectRef::with_proto(base.clone()));

        assert!(child.set("shared", 2).unwrap());
        assert_eq!(child.get("shared").unwrap(), Value::from(2));
        assert_eq!(base.get("shared").unwrap(), Value::from(1));
    }

    #[test]
    fn test_nullish_access_throws() {
        let err = Value::Undefined.get("a").unwrap_err();
        assert_eq!(
            err.as_error().map(|e| e.kind().clone()),
            Some(ErrorKind::TypeError)
        );
        assert!(Value::Null.set("a", 1).is_err());
        assert!(Value::Null.delete("a").is_err());
    }

    #[test]
    fn test_call_and_invoke() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let obj = Value::object([(
            "add",
            Value::function("add", move |_, args| {
                counter.set(counter.get() + 1);
                let a = arg(&args, 0).as_number().unwrap_or(0.0);
                let b = arg(&args, 1).as_number().unwrap_or(0.0);
                Ok(Value::from(a + b))
            }),
        )]);

        let sum = obj.invoke("add", vec![Value::from(2), Value::from(3)]).unwrap();
        assert_eq!(sum, Value::from(5));
        assert_eq!(calls.get(), 1);

        assert!(obj.invoke("missing", vec![]).is_err());
        assert!(Value::from(3).call(&Value::Undefined, vec![]).is_err());
    }

    #[test]
    fn test_invoke_passes_this() {
        let obj = Value::object([(
            "me",
            Value::function("me", |this, _| Ok(this.clone())),
        )]);
        assert!(obj.invoke("me", vec![]).unwrap().is(&obj));
    }

    #[test]
    fn test_identity() {
        let a = Value::empty_object();
        let b = Value::empty_object();
        assert!(a.is(&a.clone()));
        assert!(!a.is(&b));
        assert!(Value::from("x").is(&Value::from("x")));
        assert!(Value::Number(f64::NAN).is(&Value::Number(f64::NAN)));
        assert!(!Value::Undefined.is(&Value::Null));
    }

    #[test]
    fn test_weak_identity() {
        let a = Value::empty_object();
        let weak = a.downgrade();
        assert!(weak.is(&a));
        assert!(!weak.is(&Value::empty_object()));
        assert!(weak.upgrade().is_some());
        drop(a);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_delete_removes_property() {
        let obj = Value::object([("a", 1), ("b", 2)]);
        assert!(obj.delete("a").unwrap());
        assert!(obj.get("a").unwrap().is_undefined());
        assert_eq!(obj.own_keys(), vec![Key::from("b")]);
    }

    #[test]
    fn test_function_name_and_props() {
        let f = Value::function("answer", |_, _| Ok(Value::from(42)));
        assert_eq!(f.get("name").unwrap(), Value::from("answer"));
        f.set("extra", true).unwrap();
        assert_eq!(f.get("extra").unwrap(), Value::from(true));
        assert_eq!(f.call(&Value::Undefined, vec![]).unwrap(), Value::from(42));
    }

    #[test]
    fn test_from_json() {
        let json = serde_json::json!({ "a": { "b": [1, "two", null] }, "ok": true });
        let value = Value::from_json(&json);

        let list = value.get("a").unwrap().get("b").unwrap();
        assert_eq!(list.get("length").unwrap(), Value::from(3));
        assert_eq!(list.get(1usize).unwrap(), Value::from("two"));
        assert_eq!(list.get(2usize).unwrap(), Value::Null);
        assert_eq!(value.get("ok").unwrap(), Value::from(true));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from(42).to_string(), "42");
        assert_eq!(Value::from(1.5).to_string(), "1.5");
        assert_eq!(Value::from(1e20).to_string(), "100000000000000000000");
        assert_eq!(Value::from(-1e20).to_string(), "-100000000000000000000");
        assert_eq!(Value::Undefined.to_string(), "undefined");
        assert_eq!(Value::empty_object().to_string(), "[object Object]");

        let tagged = ObjectRef::new();
        tagged.define(WellKnownSymbol::ToStringTag, "Thing");
        assert_eq!(Value::Object(tagged).to_string(), "[object Thing]");

        let err = Value::from(TaggedError::type_error("nope"));
        assert_eq!(err.to_string(), "TypeError: nope");
        assert_eq!(err.get("message").unwrap(), Value::from("nope"));
    }
}
