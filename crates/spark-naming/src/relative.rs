//! # 相对视图
//!
//! 把父上下文中某个前缀之下的子树呈现为独立上下文：所有操作在名称前补上前缀后交给父上下文。
//! 远程上下文用它包装新建的子上下文，使后续相对名称落在正确位置。

use std::{fmt, sync::Arc};

use parking_lot::RwLock;

use crate::{
    context::Context,
    environment::Environment,
    error::Result,
    name::Name,
    value::{Binding, Bound, NameClassPair, Value},
};

/// 父上下文在 `prefix` 处的相对视图。
pub struct RelativeContext {
    parent: Arc<dyn Context>,
    prefix: Name,
    environment: RwLock<Environment>,
}

impl RelativeContext {
    pub fn new(parent: Arc<dyn Context>, prefix: Name, environment: Environment) -> Self {
        Self {
            parent,
            prefix,
            environment: RwLock::new(environment),
        }
    }

    pub fn prefix(&self) -> &Name {
        &self.prefix
    }

    fn absolute(&self, name: &Name) -> Name {
        self.prefix.join(name)
    }
}

impl Context for RelativeContext {
    fn lookup(&self, name: &Name) -> Result<Bound> {
        if name.is_empty() {
            return Ok(Bound::Context(Arc::new(Self::new(
                Arc::clone(&self.parent),
                self.prefix.clone(),
                self.environment(),
            ))));
        }
        self.parent.lookup(&self.absolute(name))
    }

    fn lookup_link(&self, name: &Name) -> Result<Bound> {
        if name.is_empty() {
            return self.lookup(name);
        }
        self.parent.lookup_link(&self.absolute(name))
    }

    fn bind(&self, name: &Name, object: Value) -> Result<()> {
        self.parent.bind(&self.absolute(name), object)
    }

    fn rebind(&self, name: &Name, object: Value) -> Result<()> {
        self.parent.rebind(&self.absolute(name), object)
    }

    fn unbind(&self, name: &Name) -> Result<()> {
        self.parent.unbind(&self.absolute(name))
    }

    fn rename(&self, old_name: &Name, new_name: &Name) -> Result<()> {
        self.parent
            .rename(&self.absolute(old_name), &self.absolute(new_name))
    }

    fn list(&self, name: &Name) -> Result<Vec<NameClassPair>> {
        self.parent.list(&self.absolute(name))
    }

    fn list_bindings(&self, name: &Name) -> Result<Vec<Binding>> {
        self.parent.list_bindings(&self.absolute(name))
    }

    /// 在父上下文中创建，返回以新前缀嵌套的视图。
    fn create_subcontext(&self, name: &Name) -> Result<Arc<dyn Context>> {
        let absolute = self.absolute(name);
        self.parent.create_subcontext(&absolute)?;
        Ok(Arc::new(Self::new(
            Arc::clone(&self.parent),
            absolute,
            self.environment(),
        )))
    }

    fn destroy_subcontext(&self, name: &Name) -> Result<()> {
        self.parent.destroy_subcontext(&self.absolute(name))
    }

    fn name_in_namespace(&self) -> Result<String> {
        let base = self.parent.name_in_namespace()?;
        Ok(format!("{base}{}", self.prefix))
    }

    fn environment(&self) -> Environment {
        self.environment.read().clone()
    }

    fn add_to_environment(&self, key: &str, value: Value) -> Result<Option<Value>> {
        Ok(self.environment.write().insert(key, value))
    }

    fn remove_from_environment(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.environment.write().remove(key))
    }
}

impl fmt::Debug for RelativeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelativeContext")
            .field("prefix", &self.prefix.to_string())
            .finish_non_exhaustive()
    }
}
