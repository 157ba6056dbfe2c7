//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 为命名联邦层的全部公开操作提供统一的失败语义：用法错误、配置错误、解析错误、
//!   传输错误与中断；
//! - 每个变体绑定稳定错误码（见 [`codes`]），日志与告警按错误码聚合，而非解析消息文本。
//!
//! ## 设计要求（What）
//! - [`NamingError`] 必须 `Clone + Send + Sync`：同一次会话协商失败会被交付给多个等待者；
//! - 发现阶段的单个候选失败使用独立的 [`DiscoveryError`]，只进入诊断通道，
//!   永远不会作为操作结果返回给调用方。

use std::{error::Error as StdError, fmt, sync::Arc};

use thiserror::Error;

/// 可跨线程共享的底层原因。
pub type SharedCause = Arc<dyn StdError + Send + Sync + 'static>;

/// 命名层统一结果别名。
pub type Result<T, E = NamingError> = core::result::Result<T, E>;

/// 命名层错误码常量集合，遵循 `naming.<领域>.<语义>` 约定。
pub mod codes {
    /// 名称语法非法（用法错误）。
    pub const INVALID_NAME: &str = "naming.usage.invalid_name";
    /// 配置内容无法解析。
    pub const INVALID_CONFIGURATION: &str = "naming.config.invalid";
    /// 提供者 URL 不是合法 URI。
    pub const INVALID_PROVIDER_URI: &str = "naming.config.invalid_provider_uri";
    /// 没有任何工厂认领该 scheme。
    pub const NO_PROVIDER: &str = "naming.resolve.no_provider";
    /// 名称未绑定。
    pub const NAME_NOT_FOUND: &str = "naming.name.not_found";
    /// 名称已绑定。
    pub const NAME_ALREADY_BOUND: &str = "naming.name.already_bound";
    /// 目标不是上下文。
    pub const NOT_CONTEXT: &str = "naming.name.not_context";
    /// 子上下文非空，无法销毁。
    pub const CONTEXT_NOT_EMPTY: &str = "naming.name.context_not_empty";
    /// 只读上下文拒绝写操作。
    pub const READ_ONLY: &str = "naming.context.read_only";
    /// 重命名的新旧名称指向不同 scheme。
    pub const CROSS_SCHEME_RENAME: &str = "naming.rename.cross_scheme";
    /// 当前没有可用的远程端点。
    pub const NO_REMOTING_ENDPOINT: &str = "naming.transport.no_endpoint";
    /// 建连或会话协商失败。
    pub const CONNECT_FAILED: &str = "naming.transport.connect_failed";
    /// 远程调用过程中的通信失败。
    pub const COMMUNICATION: &str = "naming.transport.communication";
    /// 等待被中断。
    pub const INTERRUPTED: &str = "naming.interrupted";
}

/// 命名联邦层错误域。
///
/// # 教案式说明
/// - **契约 (What)**：
///   - 用法错误（[`InvalidName`](Self::InvalidName)）在任何 I/O 之前同步返回；
///   - 配置错误（[`InvalidProviderUri`](Self::InvalidProviderUri)）携带出错的原始值；
///   - 解析错误（[`NoProvider`](Self::NoProvider)）对本次调用是终态，不会自动重试；
///   - 传输错误若内嵌命名层错误，必须先解包再返回，"名称未找到"不得被掩盖为通信失败。
/// - **执行 (How)**：[`code`](Self::code) 将每个变体映射为 [`codes`] 中的稳定错误码。
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum NamingError {
    /// 名称字符串无法按复合名称语法解析。
    #[error("invalid name `{name}`: {reason}")]
    InvalidName { name: String, reason: String },

    /// 配置源（如 TOML 文本）无法解析。
    #[error("invalid naming configuration: {detail}")]
    InvalidConfiguration { detail: String },

    /// 环境中的提供者 URL 不是合法 URI。
    #[error("invalid provider URI `{value}`: {detail}")]
    InvalidProviderUri { value: String, detail: String },

    /// 没有连接提供者或上下文工厂认领该 scheme，且回退解析也未命中。
    #[error("no naming provider available for {}", display_scheme(.scheme))]
    NoProvider { scheme: Option<String> },

    #[error("name `{name}` not found")]
    NameNotFound { name: String },

    #[error("name `{name}` is already bound")]
    NameAlreadyBound { name: String },

    #[error("name `{name}` is not a context")]
    NotContext { name: String },

    #[error("context `{name}` is not empty")]
    ContextNotEmpty { name: String },

    /// 上下文只读，拒绝 `operation`。
    #[error("`{operation}` is not permitted on a read-only context")]
    ReadOnly { operation: &'static str },

    /// 重命名的两个名称携带了不同的 scheme。
    #[error(
        "cannot rename across naming schemes: {} -> {}",
        display_scheme(.old_scheme),
        display_scheme(.new_scheme)
    )]
    CrossSchemeRename {
        old_scheme: Option<String>,
        new_scheme: Option<String>,
    },

    /// 当前没有安装远程端点，无法获取连接。
    #[error("no remoting endpoint is available")]
    NoRemotingEndpoint,

    /// 建连或会话协商失败。
    #[error("failed to connect to naming peer: {detail}")]
    ConnectFailed {
        detail: String,
        #[source]
        source: Option<SharedCause>,
    },

    /// 远程调用阶段的通信失败。
    #[error("communication with naming peer failed: {detail}")]
    Communication {
        detail: String,
        #[source]
        source: Option<SharedCause>,
    },

    /// 阻塞等待被中断；调用线程的中断标记在返回时保持置位。
    #[error("naming operation `{operation}` was interrupted")]
    Interrupted { operation: &'static str },
}

fn display_scheme(scheme: &Option<String>) -> DisplayScheme<'_> {
    DisplayScheme(scheme.as_deref())
}

struct DisplayScheme<'a>(Option<&'a str>);

impl fmt::Display for DisplayScheme<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(scheme) => write!(f, "scheme `{scheme}`"),
            None => f.write_str("the default (scheme-less) namespace"),
        }
    }
}

impl NamingError {
    /// 构造名称语法错误。
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn name_not_found(name: impl fmt::Display) -> Self {
        Self::NameNotFound {
            name: name.to_string(),
        }
    }

    pub fn no_provider(scheme: Option<&str>) -> Self {
        Self::NoProvider {
            scheme: scheme.map(str::to_owned),
        }
    }

    /// 将任意底层错误包装为建连失败。
    pub fn connect_failed(cause: impl StdError + Send + Sync + 'static) -> Self {
        Self::ConnectFailed {
            detail: cause.to_string(),
            source: Some(Arc::new(cause)),
        }
    }

    /// 将任意底层错误包装为远程调用阶段的通信失败。
    pub fn communication(cause: impl StdError + Send + Sync + 'static) -> Self {
        Self::Communication {
            detail: cause.to_string(),
            source: Some(Arc::new(cause)),
        }
    }

    /// 返回稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidName { .. } => codes::INVALID_NAME,
            Self::InvalidConfiguration { .. } => codes::INVALID_CONFIGURATION,
            Self::InvalidProviderUri { .. } => codes::INVALID_PROVIDER_URI,
            Self::NoProvider { .. } => codes::NO_PROVIDER,
            Self::NameNotFound { .. } => codes::NAME_NOT_FOUND,
            Self::NameAlreadyBound { .. } => codes::NAME_ALREADY_BOUND,
            Self::NotContext { .. } => codes::NOT_CONTEXT,
            Self::ContextNotEmpty { .. } => codes::CONTEXT_NOT_EMPTY,
            Self::ReadOnly { .. } => codes::READ_ONLY,
            Self::CrossSchemeRename { .. } => codes::CROSS_SCHEME_RENAME,
            Self::NoRemotingEndpoint => codes::NO_REMOTING_ENDPOINT,
            Self::ConnectFailed { .. } => codes::CONNECT_FAILED,
            Self::Communication { .. } => codes::COMMUNICATION,
            Self::Interrupted { .. } => codes::INTERRUPTED,
        }
    }

    /// 是否属于通信类失败（端点缺失、建连失败、远程调用失败）。
    pub fn is_communication(&self) -> bool {
        matches!(
            self,
            Self::NoRemotingEndpoint | Self::ConnectFailed { .. } | Self::Communication { .. }
        )
    }
}

/// 发现阶段单个候选工厂的失败。
///
/// - **契约 (What)**：`candidate` 为候选的注册名，`detail` 为人类可读原因；
/// - 该错误只会被交给 [`DiagnosticSink`](crate::registry::DiagnosticSink)，随后迭代继续。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("naming factory `{candidate}` failed during discovery: {detail}")]
pub struct DiscoveryError {
    candidate: String,
    detail: String,
}

impl DiscoveryError {
    pub fn new(candidate: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            detail: detail.into(),
        }
    }

    /// 出错的候选名称。
    pub fn candidate(&self) -> &str {
        &self.candidate
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}
