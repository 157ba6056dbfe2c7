//! 环境与绑定中携带的不透明值，以及查询/列举的结果类型。

use std::{any::Any, borrow::Cow, fmt, sync::Arc};

use crate::context::Context;

/// 环境项或绑定对象的值。
///
/// # 契约说明（What）
/// - `Clone` 为浅拷贝：`Text`/`Bytes`/`Opaque` 共享同一 `Arc`，复杂对象在环境克隆后保持同一身份；
/// - `Opaque` 的相等性为指针同一性，其余变体按值比较。
#[derive(Clone)]
#[non_exhaustive]
pub enum Value {
    Text(Arc<str>),
    Bool(bool),
    Integer(i64),
    Bytes(Arc<[u8]>),
    Opaque(Arc<dyn Any + Send + Sync>),
}

impl Value {
    pub fn text(text: impl Into<Arc<str>>) -> Self {
        Self::Text(text.into())
    }

    /// 包装任意共享对象。
    pub fn opaque<T: Any + Send + Sync>(object: T) -> Self {
        Self::Opaque(Arc::new(object))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.as_ref()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    /// 以文本形式读取标量值：`Text` 借用，`Integer`/`Bool` 格式化；其余返回 `None`。
    pub fn to_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::Text(text) => Some(Cow::Borrowed(text.as_ref())),
            Self::Integer(number) => Some(Cow::Owned(number.to_string())),
            Self::Bool(flag) => Some(Cow::Owned(flag.to_string())),
            Self::Bytes(_) | Self::Opaque(_) => None,
        }
    }

    /// 尝试将 `Opaque` 值向下转型。
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Opaque(object) => object.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::Opaque(a), Self::Opaque(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Bool(flag) => f.debug_tuple("Bool").field(flag).finish(),
            Self::Integer(number) => f.debug_tuple("Integer").field(number).finish(),
            Self::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            Self::Opaque(_) => f.write_str("Opaque(..)"),
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Self::text(text)
    }
}

impl From<bool> for Value {
    fn from(flag: bool) -> Self {
        Self::Bool(flag)
    }
}

impl From<i64> for Value {
    fn from(number: i64) -> Self {
        Self::Integer(number)
    }
}

/// 查询结果：子上下文或普通对象。
#[derive(Clone)]
pub enum Bound {
    Context(Arc<dyn Context>),
    Object(Value),
}

impl Bound {
    pub fn into_context(self) -> Option<Arc<dyn Context>> {
        match self {
            Self::Context(context) => Some(context),
            Self::Object(_) => None,
        }
    }

    pub fn as_object(&self) -> Option<&Value> {
        match self {
            Self::Object(value) => Some(value),
            Self::Context(_) => None,
        }
    }

    pub fn is_context(&self) -> bool {
        matches!(self, Self::Context(_))
    }
}

impl fmt::Debug for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Context(context) => match context.name_in_namespace() {
                Ok(namespace) => f.debug_tuple("Context").field(&namespace).finish(),
                Err(_) => f.write_str("Context(..)"),
            },
            Self::Object(value) => f.debug_tuple("Object").field(value).finish(),
        }
    }
}

/// `list` 的条目：绑定名与对象类型名。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NameClassPair {
    pub name: String,
    pub class_name: String,
}

impl NameClassPair {
    pub fn new(name: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class_name: class_name.into(),
        }
    }
}

/// `list_bindings` 的条目：在 [`NameClassPair`] 之上附带已解析的对象。
#[derive(Clone, Debug)]
pub struct Binding {
    pub name: String,
    pub class_name: String,
    pub object: Bound,
}

impl Binding {
    pub fn new(name: impl Into<String>, class_name: impl Into<String>, object: Bound) -> Self {
        Self {
            name: name.into(),
            class_name: class_name.into(),
            object,
        }
    }
}
