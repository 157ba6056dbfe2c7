//! 与远端建立的连接，以及连接之上的服务协商入口。

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use crate::session::{ServiceDescriptor, SessionCompleter};

/// 连接标识，进程内唯一。
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// 分配一个新的标识。
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// 已建立的连接。
///
/// # 契约说明（What）
/// - `id` 在连接生命周期内保持不变，会话注册表以它为键；
/// - 连接关闭后 `is_open` 返回 `false`，端点会在下次获取时重新建连；
/// - `open_service` 启动一次服务协商并立即返回；协商结果通过 `completer` 交付，
///   可以在调用线程上同步完成，也可以稍后在其它线程上完成；
///   实现应通过 [`SessionCompleter::on_cancel`] 响应取消。
pub trait Connection: Send + Sync + fmt::Debug + 'static {
    fn id(&self) -> ConnectionId;

    fn is_open(&self) -> bool;

    fn open_service(&self, descriptor: &ServiceDescriptor, completer: SessionCompleter);
}
