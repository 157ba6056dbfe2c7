//! # spark-naming
//!
//! ## 定位与职责（Why）
//! - 命名联邦层：给定首段可带 `scheme:` 前缀的层级名称，判断由哪个命名提供者处理，
//!   把操作（查询、绑定、重命名、列举、子上下文管理）转交过去，并通过统一的 [`Context`]
//!   接口返回结果；
//! - 提供者与上下文工厂以显式注册表承载，远程实现位于 `spark-naming-remote`。
//!
//! ## 架构嵌入（Where）
//! - [`name`] / [`reparse`](mod@reparse)：名称模型与 scheme 拆分；
//! - [`environment`] / [`normalize`]：配置面与旧式连接属性改写；
//! - [`provider`] / [`registry`]：工厂契约、注册表与发现隔离；
//! - [`dispatcher`]：根分发器；[`empty`] 与 [`relative`] 为通用上下文实现；
//! - [`interrupt`]：线程中断标记，供阻塞等待放弃；
//! - [`error`]：错误域与稳定错误码。
//!
//! ## 并发模型（Trade-offs）
//! - 全部操作同步执行于调用线程，没有内部调度器；
//! - 每个注册表以各自的可重入闸门串行化发现迭代。

pub mod context;
pub mod dispatcher;
pub mod empty;
pub mod environment;
pub mod error;
pub mod interrupt;
pub mod name;
pub mod normalize;
pub mod provider;
pub mod registry;
pub mod relative;
pub mod reparse;
pub mod value;

pub use context::{Context, ContextExt};
pub use dispatcher::RootContext;
pub use empty::EmptyContext;
pub use environment::{Environment, is_secret_key, keys};
pub use error::{DiscoveryError, NamingError, Result, codes};
pub use interrupt::InterruptHandle;
pub use name::Name;
pub use normalize::normalize_environment;
pub use provider::{
    NamingContextFactory, NamingProvider, NamingProviderFactory, NoUrlContexts,
    UrlContextResolver, UrlContextTable,
};
pub use registry::{
    DiagnosticSink, ProviderRegistries, ProviderRegistriesBuilder, Registry, TracingDiagnostics,
    find_first_matching, matching,
};
pub use relative::RelativeContext;
pub use reparse::{ReparsedName, reparse};
pub use value::{Binding, Bound, NameClassPair, Value};
