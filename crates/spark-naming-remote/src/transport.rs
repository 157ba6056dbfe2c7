//! # 远程协议面
//!
//! ## 角色定位（Why）
//! - [`RemoteTransport`] 是共享会话对外暴露的逻辑操作集合，每个操作是一次请求/响应，
//!   各自可能失败；编码与线协议不在本层范围内；
//! - [`TransportError`] 统一描述建连、协商与远程调用阶段的失败，并负责映射为命名层错误。
//!
//! ## 错误映射（What）
//! - 内嵌命名层错误（[`TransportError::Naming`]）原样解包，"名称未找到"不会被掩盖为通信失败；
//! - 会话获取阶段的其余失败映射为 [`NamingError::ConnectFailed`]；
//! - 远程调用阶段的其余失败映射为 [`NamingError::Communication`]；
//! - 原始传输错误保留为 `source`，便于诊断。

use std::{io, sync::Arc};

use spark_naming::{Binding, Bound, Context, Name, NameClassPair, NamingError, Value};
use thiserror::Error;

/// 共享会话上的远程命名操作。
///
/// # 契约说明（What）
/// - 名称参数已去除 scheme，按相对名称原样传递；
/// - `owner` 为发起调用的上下文，实现可据此构造相对子上下文；
/// - `link` 为 `true` 时按 `lookup_link` 语义，不跟随末端链接；
/// - 实现需支持多个线程并发调用，本层不做额外串行化，也不施加超时。
pub trait RemoteTransport: Send + Sync + 'static {
    fn lookup(&self, owner: &Arc<dyn Context>, name: &Name, link: bool) -> Result<Bound, TransportError>;

    fn bind(&self, name: &Name, object: Value, rebind: bool) -> Result<(), TransportError>;

    fn unbind(&self, name: &Name) -> Result<(), TransportError>;

    fn rename(&self, old_name: &Name, new_name: &Name) -> Result<(), TransportError>;

    fn list(&self, name: &Name) -> Result<Vec<NameClassPair>, TransportError>;

    fn list_bindings(&self, name: &Name, owner: &Arc<dyn Context>) -> Result<Vec<Binding>, TransportError>;

    fn create_subcontext(&self, name: &Name) -> Result<(), TransportError>;

    fn destroy_subcontext(&self, name: &Name) -> Result<(), TransportError>;
}

/// 传输层错误。
///
/// `Clone` 以便同一次协商失败交付给全部等待者。
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// 对端返回的命名层错误。
    #[error(transparent)]
    Naming(#[from] NamingError),

    #[error("failed to connect to `{uri}`: {detail}")]
    Connect { uri: String, detail: String },

    #[error("transport I/O failure: {0}")]
    Io(Arc<io::Error>),

    #[error("service negotiation failed: {0}")]
    Negotiation(String),

    #[error("connection closed")]
    Closed,

    #[error("session negotiation was cancelled")]
    Cancelled,

    /// 等待会话时调用线程被中断；中断标记已被消费。
    #[error("wait for session was interrupted")]
    Interrupted,
}

impl From<io::Error> for TransportError {
    fn from(error: io::Error) -> Self {
        Self::Io(Arc::new(error))
    }
}

impl TransportError {
    /// 会话获取阶段的映射。
    pub fn into_connect_failure(self) -> NamingError {
        match self {
            Self::Naming(inner) => inner,
            Self::Interrupted => NamingError::Interrupted {
                operation: "acquire remote session",
            },
            other => NamingError::connect_failed(other),
        }
    }

    /// 远程调用阶段的映射。
    pub fn into_call_failure(self) -> NamingError {
        match self {
            Self::Naming(inner) => inner,
            other => NamingError::communication(other),
        }
    }
}
