//! # 远程端点
//!
//! ## 角色定位（Why）
//! - 端点拥有建连器、按 URI 缓存的连接与会话注册表，是同一进程内全部远程上下文的共享基础设施；
//! - 端点可以在运行期安装或卸载：未安装时远程上下文返回 [`NamingError::NoRemotingEndpoint`]，
//!   提供者在每次获取会话时重新读取当前端点。
//!
//! ## 并发模型（How）
//! - 连接缓存使用 `DashMap`，建连在分片锁之外进行，慢速或挂起的远端不会阻塞其它 URI；
//!   并发建连同一 URI 时先写入者胜出，其余结果被丢弃；
//! - 缓存未命中时顺带清理已关闭的连接与其会话；
//! - [`EndpointSlot`] 使用 `ArcSwapOption`，读路径无锁，替换端点不影响正在使用旧端点的调用。
//!
//! [`NamingError::NoRemotingEndpoint`]: spark_naming::NamingError::NoRemotingEndpoint

use std::{fmt, sync::Arc};

use arc_swap::ArcSwapOption;
use dashmap::{DashMap, mapref::entry::Entry};
use spark_naming::Environment;
use url::Url;

use crate::{
    connection::Connection,
    session::SessionRegistry,
    transport::TransportError,
};

/// 建连器：为 URI 建立新的连接。
pub trait Connector: Send + Sync + 'static {
    fn connect(&self, uri: &Url, environment: &Environment) -> Result<Arc<dyn Connection>, TransportError>;
}

/// 远程端点。
pub struct Endpoint {
    name: String,
    connector: Arc<dyn Connector>,
    connections: DashMap<String, Arc<dyn Connection>>,
    sessions: SessionRegistry,
}

impl Endpoint {
    pub fn new(name: impl Into<String>, connector: Arc<dyn Connector>) -> Self {
        Self {
            name: name.into(),
            connector,
            connections: DashMap::new(),
            sessions: SessionRegistry::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// 获取 `uri` 的连接：缓存中仍打开的连接被复用，否则重新建连并写入缓存。
    ///
    /// # 执行逻辑（How）
    /// 1. 只读命中且连接仍打开时直接返回；
    /// 2. 未命中时先清理已关闭的连接及其会话，再在不持有任何分片锁的情况下建连；
    /// 3. 写回缓存时若其它线程已写入打开的连接，采用对方的连接并丢弃本次结果。
    pub fn connection(
        &self,
        uri: &Url,
        environment: &Environment,
    ) -> Result<Arc<dyn Connection>, TransportError> {
        let key = uri.as_str();
        let cached = self
            .connections
            .get(key)
            .map(|entry| Arc::clone(entry.value()));
        if let Some(connection) = cached.filter(|connection| connection.is_open()) {
            return Ok(connection);
        }

        self.evict_closed();
        let connection = self.connect(uri, environment)?;
        let adopted = match self.connections.entry(key.to_owned()) {
            Entry::Occupied(entry) if entry.get().is_open() => {
                tracing::debug!(
                    endpoint = %self.name,
                    %uri,
                    discarded = %connection.id(),
                    "adopting connection established concurrently"
                );
                Arc::clone(entry.get())
            }
            Entry::Occupied(mut entry) => {
                let stale = entry.insert(Arc::clone(&connection));
                self.sessions.forget_connection(stale.id());
                connection
            }
            Entry::Vacant(entry) => {
                entry.insert(Arc::clone(&connection));
                connection
            }
        };
        Ok(adopted)
    }

    /// 移除已关闭的连接及其会话，返回移除的连接数。
    ///
    /// 仍然打开的连接在端点存续期间一直保留在缓存中。
    pub fn evict_closed(&self) -> usize {
        let mut closed = Vec::new();
        self.connections.retain(|_, connection| {
            let open = connection.is_open();
            if !open {
                closed.push(connection.id());
            }
            open
        });
        for id in &closed {
            let dropped = self.sessions.forget_connection(*id);
            tracing::debug!(endpoint = %self.name, connection = %id, dropped, "evicted closed connection");
        }
        closed.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn connect(&self, uri: &Url, environment: &Environment) -> Result<Arc<dyn Connection>, TransportError> {
        let connection = self.connector.connect(uri, environment)?;
        tracing::debug!(endpoint = %self.name, %uri, connection = %connection.id(), "connected");
        Ok(connection)
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("name", &self.name)
            .field("connections", &self.connections.len())
            .field("sessions", &self.sessions)
            .finish()
    }
}

/// 当前端点的可替换槽位。
#[derive(Default)]
pub struct EndpointSlot {
    current: ArcSwapOption<Endpoint>,
}

impl EndpointSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以 `endpoint` 初始化的槽位。
    pub fn with_endpoint(endpoint: Arc<Endpoint>) -> Self {
        Self {
            current: ArcSwapOption::new(Some(endpoint)),
        }
    }

    /// 安装端点，返回被替换的旧端点。
    pub fn install(&self, endpoint: Arc<Endpoint>) -> Option<Arc<Endpoint>> {
        tracing::info!(endpoint = %endpoint.name(), "remoting endpoint installed");
        self.current.swap(Some(endpoint))
    }

    pub fn uninstall(&self) -> Option<Arc<Endpoint>> {
        let previous = self.current.swap(None);
        if let Some(endpoint) = &previous {
            tracing::info!(endpoint = %endpoint.name(), "remoting endpoint uninstalled");
        }
        previous
    }

    pub fn current(&self) -> Option<Arc<Endpoint>> {
        self.current.load_full()
    }
}

impl fmt::Debug for EndpointSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let current = self.current.load();
        f.debug_struct("EndpointSlot")
            .field("endpoint", &current.as_ref().map(|endpoint| endpoint.name().to_owned()))
            .finish()
    }
}
