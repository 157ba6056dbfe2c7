//! # 远程传输会话
//!
//! ## 角色定位（Why）
//! - 同一连接上的命名服务会话只协商一次，被该连接派生的全部上下文共享；
//! - 协商可能耗时，等待方需要能被中断，中断后还要能取消仍在进行的协商。
//!
//! ## 结构（How）
//! - [`PendingSession`]：可等待、可取消的协商结果句柄，克隆后共享同一状态；
//! - [`SessionCompleter`]：交给连接的完成端，只能完成一次；未完成即被丢弃视为协商失败；
//! - [`SessionRegistry`]：以 `(ConnectionId, ServiceDescriptor)` 为键缓存会话，
//!   进行中与已就绪的会话被复用，失败或已取消的会话在下次获取时重新协商。
//!
//! ## 风险提示（Trade-offs）
//! - 取消作用于共享的协商：其它仍在等待同一会话的线程会观察到取消，并以建连失败返回。

use std::{fmt, sync::Arc};

use dashmap::{DashMap, mapref::entry::Entry};
use parking_lot::{Condvar, Mutex};
use spark_naming::interrupt::{self, InterruptHandle};

use crate::{
    connection::{Connection, ConnectionId},
    transport::{RemoteTransport, TransportError},
};

/// 服务描述：服务名与协议版本。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ServiceDescriptor {
    name: Arc<str>,
    version: u32,
}

impl ServiceDescriptor {
    pub fn new(name: impl Into<Arc<str>>, version: u32) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    /// 远程命名服务。
    pub fn naming() -> Self {
        Self::new("naming", 2)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> u32 {
        self.version
    }
}

impl fmt::Display for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/v{}", self.name, self.version)
    }
}

/// 协商状态的只读视图。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    Pending,
    Ready,
    Failed,
    Cancelled,
}

enum SessionState {
    Pending,
    Ready(Arc<dyn RemoteTransport>),
    Failed(TransportError),
    Cancelled,
}

impl SessionState {
    fn status(&self) -> SessionStatus {
        match self {
            Self::Pending => SessionStatus::Pending,
            Self::Ready(_) => SessionStatus::Ready,
            Self::Failed(_) => SessionStatus::Failed,
            Self::Cancelled => SessionStatus::Cancelled,
        }
    }
}

type CancelHook = Box<dyn FnOnce() + Send>;

struct Shared {
    state: Mutex<SessionState>,
    settled: Condvar,
    cancel_hooks: Mutex<Vec<CancelHook>>,
}

impl Shared {
    /// 仅当仍处于 `Pending` 时写入终态，返回是否写入成功。
    fn settle(&self, outcome: SessionState) -> bool {
        let mut state = self.state.lock();
        if !matches!(*state, SessionState::Pending) {
            return false;
        }
        *state = outcome;
        self.settled.notify_all();
        true
    }

    fn wake_waiters(&self) {
        let _state = self.state.lock();
        self.settled.notify_all();
    }
}

/// 协商结果句柄。
#[derive(Clone)]
pub struct PendingSession {
    shared: Arc<Shared>,
}

impl PendingSession {
    /// 创建尚未完成的协商及其完成端。
    pub fn new() -> (Self, SessionCompleter) {
        let shared = Arc::new(Shared {
            state: Mutex::new(SessionState::Pending),
            settled: Condvar::new(),
            cancel_hooks: Mutex::new(Vec::new()),
        });
        (
            Self {
                shared: Arc::clone(&shared),
            },
            SessionCompleter { shared },
        )
    }

    pub fn status(&self) -> SessionStatus {
        self.shared.state.lock().status()
    }

    /// 阻塞等待协商结束。
    ///
    /// # 契约说明（What）
    /// - 就绪返回会话；失败返回协商错误；被取消返回 [`TransportError::Cancelled`]；
    /// - 调用线程在进入时或等待期间被中断，返回 [`TransportError::Interrupted`]，
    ///   中断标记已被消费，恢复标记与取消协商由调用方决定。
    pub fn get_interruptibly(&self) -> Result<Arc<dyn RemoteTransport>, TransportError> {
        if interrupt::take_interrupt() {
            return Err(TransportError::Interrupted);
        }
        let _registration = InterruptHandle::current().on_interrupt({
            let shared = Arc::clone(&self.shared);
            move || shared.wake_waiters()
        });

        let mut state = self.shared.state.lock();
        loop {
            match &*state {
                SessionState::Ready(transport) => return Ok(Arc::clone(transport)),
                SessionState::Failed(error) => return Err(error.clone()),
                SessionState::Cancelled => return Err(TransportError::Cancelled),
                SessionState::Pending => {}
            }
            if interrupt::take_interrupt() {
                return Err(TransportError::Interrupted);
            }
            self.shared.settled.wait(&mut state);
        }
    }

    /// 取消仍在进行的协商，返回本次调用是否生效；已结束的协商不受影响。
    pub fn cancel(&self) -> bool {
        if !self.shared.settle(SessionState::Cancelled) {
            return false;
        }
        let hooks = std::mem::take(&mut *self.shared.cancel_hooks.lock());
        for hook in hooks {
            hook();
        }
        true
    }

    fn is_reusable(&self) -> bool {
        matches!(self.status(), SessionStatus::Pending | SessionStatus::Ready)
    }
}

impl fmt::Debug for PendingSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingSession")
            .field("status", &self.status())
            .finish()
    }
}

/// 协商的完成端。
pub struct SessionCompleter {
    shared: Arc<Shared>,
}

impl SessionCompleter {
    /// 以就绪会话完成协商；协商已被取消时返回 `false`。
    pub fn complete(self, transport: Arc<dyn RemoteTransport>) -> bool {
        self.shared.settle(SessionState::Ready(transport))
    }

    /// 以失败完成协商。
    pub fn fail(self, error: TransportError) -> bool {
        self.shared.settle(SessionState::Failed(error))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(*self.shared.state.lock(), SessionState::Cancelled)
    }

    /// 登记取消回调；若已被取消则立即执行。
    pub fn on_cancel(&self, hook: impl FnOnce() + Send + 'static) {
        {
            // 先登记再检查，取消方在登记之后取走回调列表，二者不会同时错过。
            let mut hooks = self.shared.cancel_hooks.lock();
            if !self.is_cancelled() {
                hooks.push(Box::new(hook));
                return;
            }
        }
        hook();
    }
}

impl Drop for SessionCompleter {
    fn drop(&mut self) {
        if self
            .shared
            .settle(SessionState::Failed(TransportError::Negotiation(
                "negotiation abandoned before completion".into(),
            )))
        {
            tracing::debug!("session completer dropped while negotiation was pending");
        }
    }
}

impl fmt::Debug for SessionCompleter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCompleter")
            .field("status", &self.shared.state.lock().status())
            .finish()
    }
}

/// 以 `(ConnectionId, ServiceDescriptor)` 为键的会话缓存。
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<(ConnectionId, ServiceDescriptor), PendingSession>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取 `connection` 上 `descriptor` 服务的会话。
    ///
    /// # 执行逻辑（How）
    /// 1. 已有进行中或就绪的会话则直接复用；
    /// 2. 否则登记新的协商，在释放分片锁之后调用 [`Connection::open_service`] 启动它。
    pub fn client_service(
        &self,
        connection: &Arc<dyn Connection>,
        descriptor: &ServiceDescriptor,
    ) -> PendingSession {
        let key = (connection.id(), descriptor.clone());
        let (pending, completer) = match self.sessions.entry(key) {
            Entry::Occupied(entry) if entry.get().is_reusable() => {
                tracing::trace!(connection = %connection.id(), service = %descriptor, "reusing session");
                return entry.get().clone();
            }
            Entry::Occupied(mut entry) => {
                let (pending, completer) = PendingSession::new();
                entry.insert(pending.clone());
                (pending, completer)
            }
            Entry::Vacant(entry) => {
                let (pending, completer) = PendingSession::new();
                entry.insert(pending.clone());
                (pending, completer)
            }
        };
        tracing::debug!(connection = %connection.id(), service = %descriptor, "negotiating session");
        connection.open_service(descriptor, completer);
        pending
    }

    /// 丢弃某个连接上的全部会话，返回被移除的数量。
    pub fn forget_connection(&self, id: ConnectionId) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|(connection, _), _| *connection != id);
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.sessions.len())
            .finish()
    }
}
