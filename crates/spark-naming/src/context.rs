//! # Context：统一的命名操作面
//!
//! ## 角色定位（Why）
//! - 根分发器、空上下文、相对视图与远程上下文都通过同一组操作对外服务，
//!   调用方无需关心名称最终由哪个提供者处理；
//! - 以对象安全 trait 表达，上下文以 `Arc<dyn Context>` 在各层之间传递。
//!
//! ## 契约说明（What）
//! - 所有操作同步执行于调用线程，可能阻塞；
//! - 调用方传入的 [`Name`] 只读借用，实现不得修改；
//! - 每个上下文拥有自己的 [`Environment`]，[`environment`](Context::environment) 返回快照；
//! - 字符串形式的便捷方法见 [`ContextExt`]，解析失败属于用法错误，在任何 I/O 之前返回。

use std::sync::Arc;

use crate::{
    environment::Environment,
    error::Result,
    name::Name,
    value::{Binding, Bound, NameClassPair, Value},
};

/// 命名上下文。
pub trait Context: Send + Sync {
    /// 解析名称；空名称返回指代当前命名空间的新上下文。
    fn lookup(&self, name: &Name) -> Result<Bound>;

    /// 同 [`lookup`](Self::lookup)，但不跟随末端链接。
    fn lookup_link(&self, name: &Name) -> Result<Bound>;

    fn bind(&self, name: &Name, object: Value) -> Result<()>;

    fn rebind(&self, name: &Name, object: Value) -> Result<()>;

    fn unbind(&self, name: &Name) -> Result<()>;

    fn rename(&self, old_name: &Name, new_name: &Name) -> Result<()>;

    fn list(&self, name: &Name) -> Result<Vec<NameClassPair>>;

    fn list_bindings(&self, name: &Name) -> Result<Vec<Binding>>;

    fn create_subcontext(&self, name: &Name) -> Result<Arc<dyn Context>>;

    fn destroy_subcontext(&self, name: &Name) -> Result<()>;

    /// 当前上下文在其所属命名空间中的全名，不触发远程调用。
    fn name_in_namespace(&self) -> Result<String>;

    /// 环境快照。
    fn environment(&self) -> Environment;

    /// 写入环境项并返回旧值，仅影响当前实例。
    fn add_to_environment(&self, key: &str, value: Value) -> Result<Option<Value>>;

    fn remove_from_environment(&self, key: &str) -> Result<Option<Value>>;

    /// 组合 `prefix + name`，两者均不被修改。
    fn compose_name(&self, name: &Name, prefix: &Name) -> Result<Name> {
        Ok(prefix.join(name))
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// 以字符串名称调用 [`Context`] 操作。
pub trait ContextExt: Context {
    fn lookup_str(&self, name: &str) -> Result<Bound> {
        self.lookup(&Name::parse(name)?)
    }

    fn lookup_link_str(&self, name: &str) -> Result<Bound> {
        self.lookup_link(&Name::parse(name)?)
    }

    fn bind_str(&self, name: &str, object: impl Into<Value>) -> Result<()> {
        self.bind(&Name::parse(name)?, object.into())
    }

    fn rebind_str(&self, name: &str, object: impl Into<Value>) -> Result<()> {
        self.rebind(&Name::parse(name)?, object.into())
    }

    fn unbind_str(&self, name: &str) -> Result<()> {
        self.unbind(&Name::parse(name)?)
    }

    fn rename_str(&self, old_name: &str, new_name: &str) -> Result<()> {
        let old_name = Name::parse(old_name)?;
        let new_name = Name::parse(new_name)?;
        self.rename(&old_name, &new_name)
    }

    fn list_str(&self, name: &str) -> Result<Vec<NameClassPair>> {
        self.list(&Name::parse(name)?)
    }

    fn list_bindings_str(&self, name: &str) -> Result<Vec<Binding>> {
        self.list_bindings(&Name::parse(name)?)
    }

    fn create_subcontext_str(&self, name: &str) -> Result<Arc<dyn Context>> {
        self.create_subcontext(&Name::parse(name)?)
    }

    fn destroy_subcontext_str(&self, name: &str) -> Result<()> {
        self.destroy_subcontext(&Name::parse(name)?)
    }

    /// 字符串形式的 [`Context::compose_name`]。
    fn compose_name_str(&self, name: &str, prefix: &str) -> Result<String> {
        let composed = self.compose_name(&Name::parse(name)?, &Name::parse(prefix)?)?;
        Ok(composed.to_string())
    }
}

impl<C: Context + ?Sized> ContextExt for C {}
