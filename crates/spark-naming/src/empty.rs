//! 不含任何绑定的只读命名空间，作为无提供者、无 scheme 时的默认上下文。

use std::sync::Arc;

use parking_lot::RwLock;

use crate::{
    context::Context,
    environment::Environment,
    error::{NamingError, Result},
    name::Name,
    value::{Binding, Bound, NameClassPair, Value},
};

/// 空上下文。
///
/// - 空名称的 `lookup` 返回新的空上下文，其余名称均为 [`NamingError::NameNotFound`]；
/// - 空名称的 `list` 返回空列表；
/// - 所有写操作返回 [`NamingError::ReadOnly`]。
#[derive(Debug, Default)]
pub struct EmptyContext {
    environment: RwLock<Environment>,
}

impl EmptyContext {
    pub fn new(environment: Environment) -> Self {
        Self {
            environment: RwLock::new(environment),
        }
    }

    fn read_only<T>(operation: &'static str) -> Result<T> {
        Err(NamingError::ReadOnly { operation })
    }

    fn require_self(name: &Name) -> Result<()> {
        if name.is_empty() {
            Ok(())
        } else {
            Err(NamingError::name_not_found(name))
        }
    }
}

impl Context for EmptyContext {
    fn lookup(&self, name: &Name) -> Result<Bound> {
        Self::require_self(name)?;
        Ok(Bound::Context(Arc::new(Self::new(self.environment()))))
    }

    fn lookup_link(&self, name: &Name) -> Result<Bound> {
        self.lookup(name)
    }

    fn bind(&self, _name: &Name, _object: Value) -> Result<()> {
        Self::read_only("bind")
    }

    fn rebind(&self, _name: &Name, _object: Value) -> Result<()> {
        Self::read_only("rebind")
    }

    fn unbind(&self, _name: &Name) -> Result<()> {
        Self::read_only("unbind")
    }

    fn rename(&self, _old_name: &Name, _new_name: &Name) -> Result<()> {
        Self::read_only("rename")
    }

    fn list(&self, name: &Name) -> Result<Vec<NameClassPair>> {
        Self::require_self(name)?;
        Ok(Vec::new())
    }

    fn list_bindings(&self, name: &Name) -> Result<Vec<Binding>> {
        Self::require_self(name)?;
        Ok(Vec::new())
    }

    fn create_subcontext(&self, _name: &Name) -> Result<Arc<dyn Context>> {
        Self::read_only("create_subcontext")
    }

    fn destroy_subcontext(&self, _name: &Name) -> Result<()> {
        Self::read_only("destroy_subcontext")
    }

    fn name_in_namespace(&self) -> Result<String> {
        Ok(String::new())
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{context::ContextExt, error::codes};

    #[test]
    fn lookup_and_list_only_know_the_empty_name() {
        let ctx = EmptyContext::default();
        assert!(ctx.lookup_str("").unwrap().is_context());
        assert!(ctx.list_str("").unwrap().is_empty());
        assert!(ctx.list_bindings_str("").unwrap().is_empty());
        assert_eq!(ctx.lookup_str("a/b").unwrap_err().code(), codes::NAME_NOT_FOUND);
        assert_eq!(ctx.list_str("a").unwrap_err().code(), codes::NAME_NOT_FOUND);
    }

    #[test]
    fn every_mutation_is_rejected() {
        let ctx = EmptyContext::default();
        let failures = [
            ctx.bind_str("a", "v").unwrap_err(),
            ctx.rebind_str("a", "v").unwrap_err(),
            ctx.unbind_str("a").unwrap_err(),
            ctx.rename_str("a", "b").unwrap_err(),
            ctx.create_subcontext_str("a").err().unwrap(),
            ctx.destroy_subcontext_str("a").unwrap_err(),
        ];
        assert!(failures.iter().all(|err| err.code() == codes::READ_ONLY));
    }
}
