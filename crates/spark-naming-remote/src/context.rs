//! # 远程上下文
//!
//! ## 角色定位（Why）
//! - 把命名操作委托给远端：每次调用先经提供者拿到当前端点上的连接，再取得（或等待）
//!   该连接上共享的命名服务会话，最后在会话上发起一次请求；
//! - 会话在同一连接派生的全部上下文间共享，首个调用者触发协商，其余调用者等待同一结果。
//!
//! ## 错误语义（What）
//! - 无端点：[`NamingError::NoRemotingEndpoint`]；
//! - 建连或协商失败：[`NamingError::ConnectFailed`]，协商被他方取消同样归入此类；
//! - 等待会话时被中断：取消仍在进行的协商，恢复线程中断标记，返回 [`NamingError::Interrupted`]；
//! - 远程调用失败：内嵌命名层错误原样返回，其余映射为 [`NamingError::Communication`]。
//!
//! ## 本地操作（How）
//! - 空名称的 `lookup` / `lookup_link` 返回新的远程上下文，不发起远程调用；
//! - `name_in_namespace` 只由 scheme 推导；
//! - `create_subcontext` 成功后返回以新名称为前缀的 [`RelativeContext`]。

use std::{
    fmt,
    sync::{Arc, Weak},
};

use parking_lot::RwLock;
use spark_naming::{
    Binding, Bound, Context, DiscoveryError, Environment, Name, NameClassPair,
    NamingContextFactory, NamingError, NamingProvider, RelativeContext, Result, Value,
    interrupt::InterruptHandle,
};

use crate::{
    provider::{RemoteNamingProvider, is_remote_scheme},
    session::ServiceDescriptor,
    transport::{RemoteTransport, TransportError},
};

/// 委托给远端的命名上下文。
pub struct RemoteContext {
    provider: Arc<RemoteNamingProvider>,
    scheme: Option<String>,
    environment: RwLock<Environment>,
    descriptor: ServiceDescriptor,
    this: Weak<RemoteContext>,
}

impl RemoteContext {
    pub fn new(
        provider: Arc<RemoteNamingProvider>,
        scheme: Option<String>,
        environment: Environment,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            provider,
            scheme,
            environment: RwLock::new(environment),
            descriptor: ServiceDescriptor::naming(),
            this: this.clone(),
        })
    }

    pub fn provider(&self) -> &Arc<RemoteNamingProvider> {
        &self.provider
    }

    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    fn owner(&self) -> Result<Arc<dyn Context>> {
        match self.this.upgrade() {
            Some(this) => Ok(this as Arc<dyn Context>),
            None => Err(NamingError::Communication {
                detail: "remote context was released during the call".into(),
                source: None,
            }),
        }
    }

    fn sibling(&self) -> Bound {
        Bound::Context(Self::new(
            Arc::clone(&self.provider),
            self.scheme.clone(),
            self.environment(),
        ))
    }

    /// 取得共享会话；见模块文档中的错误语义。
    fn remote_transport(&self) -> Result<Arc<dyn RemoteTransport>> {
        let endpoint = self.provider.endpoint()?;
        let connection = self
            .provider
            .connection(&endpoint)
            .map_err(TransportError::into_connect_failure)?;
        let pending = endpoint
            .sessions()
            .client_service(&connection, &self.descriptor);
        match pending.get_interruptibly() {
            Ok(transport) => Ok(transport),
            Err(TransportError::Interrupted) => {
                // 等待方已消费中断标记；取消协商后把标记还给调用线程。
                let cancelled = pending.cancel();
                InterruptHandle::current().interrupt();
                tracing::debug!(
                    connection = %connection.id(),
                    cancelled,
                    "interrupted while waiting for remote naming session"
                );
                Err(NamingError::Interrupted {
                    operation: "acquire remote session",
                })
            }
            Err(other) => Err(other.into_connect_failure()),
        }
    }

    fn call<T>(
        &self,
        invoke: impl FnOnce(&dyn RemoteTransport) -> std::result::Result<T, TransportError>,
    ) -> Result<T> {
        let transport = self.remote_transport()?;
        invoke(transport.as_ref()).map_err(TransportError::into_call_failure)
    }
}

impl Context for RemoteContext {
    fn lookup(&self, name: &Name) -> Result<Bound> {
        if name.is_empty() {
            return Ok(self.sibling());
        }
        let owner = self.owner()?;
        self.call(|transport| transport.lookup(&owner, name, false))
    }

    fn lookup_link(&self, name: &Name) -> Result<Bound> {
        if name.is_empty() {
            return Ok(self.sibling());
        }
        let owner = self.owner()?;
        self.call(|transport| transport.lookup(&owner, name, true))
    }

    fn bind(&self, name: &Name, object: Value) -> Result<()> {
        self.call(|transport| transport.bind(name, object, false))
    }

    fn rebind(&self, name: &Name, object: Value) -> Result<()> {
        self.call(|transport| transport.bind(name, object, true))
    }

    fn unbind(&self, name: &Name) -> Result<()> {
        self.call(|transport| transport.unbind(name))
    }

    fn rename(&self, old_name: &Name, new_name: &Name) -> Result<()> {
        self.call(|transport| transport.rename(old_name, new_name))
    }

    fn list(&self, name: &Name) -> Result<Vec<NameClassPair>> {
        self.call(|transport| transport.list(name))
    }

    fn list_bindings(&self, name: &Name) -> Result<Vec<Binding>> {
        let owner = self.owner()?;
        self.call(|transport| transport.list_bindings(name, &owner))
    }

    fn create_subcontext(&self, name: &Name) -> Result<Arc<dyn Context>> {
        let owner = self.owner()?;
        self.call(|transport| transport.create_subcontext(name))?;
        Ok(Arc::new(RelativeContext::new(
            owner,
            name.clone(),
            self.environment(),
        )))
    }

    fn destroy_subcontext(&self, name: &Name) -> Result<()> {
        self.call(|transport| transport.destroy_subcontext(name))
    }

    fn name_in_namespace(&self) -> Result<String> {
        Ok(match self.scheme.as_deref() {
            None | Some("") => String::new(),
            Some(scheme) => format!("{scheme}:"),
        })
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

impl fmt::Debug for RemoteContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteContext")
            .field("provider", &self.provider)
            .field("scheme", &self.scheme)
            .field("service", &self.descriptor)
            .finish()
    }
}

/// 远程上下文工厂：认领远程提供者，且名称不带 scheme 或带远程 scheme。
#[derive(Clone, Copy, Debug, Default)]
pub struct RemoteContextFactory;

impl NamingContextFactory for RemoteContextFactory {
    fn supports_uri_scheme(
        &self,
        provider: Option<&Arc<dyn NamingProvider>>,
        name_scheme: Option<&str>,
    ) -> Result<bool, DiscoveryError> {
        let remote_provider = provider
            .is_some_and(|provider| provider.downcast_ref::<RemoteNamingProvider>().is_some());
        Ok(remote_provider && name_scheme.is_none_or(is_remote_scheme))
    }

    fn create_root_context(
        &self,
        provider: Option<Arc<dyn NamingProvider>>,
        name_scheme: Option<&str>,
        environment: &Environment,
    ) -> Result<Arc<dyn Context>> {
        let provider = provider
            .and_then(|provider| provider.downcast_arc::<RemoteNamingProvider>())
            .ok_or_else(|| NamingError::no_provider(name_scheme))?;
        let context: Arc<dyn Context> = RemoteContext::new(
            provider,
            name_scheme.map(str::to_owned),
            environment.clone(),
        );
        Ok(context)
    }
}
