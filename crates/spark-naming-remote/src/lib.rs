//! # spark-naming-remote
//!
//! ## 定位与职责（Why）
//! - 为 `spark-naming` 提供远程后端：认领 `remote`、`remote+http` 等提供者 URL，
//!   把命名操作委托给远端的命名服务；
//! - 同一连接上的命名服务会话只协商一次，被该连接派生的全部上下文共享。
//!
//! ## 架构嵌入（Where）
//! - [`provider`]：远程提供者与提供者工厂；
//! - [`context`]：远程上下文与上下文工厂；
//! - [`endpoint`] / [`connection`]：端点、建连器与连接抽象，线协议由实现方提供；
//! - [`session`]：可中断等待、可取消的共享会话；
//! - [`transport`]：会话上的逻辑操作集合与错误映射。
//!
//! ## 接入方式（How）
//! ```ignore
//! let endpoints = Arc::new(EndpointSlot::with_endpoint(Arc::new(Endpoint::new("default", connector))));
//! let registries = ProviderRegistries::builder()
//!     .provider("remote", Arc::new(RemoteNamingProviderFactory::new(endpoints)))
//!     .context("remote", Arc::new(RemoteContextFactory))
//!     .build();
//! ```

pub mod connection;
pub mod context;
pub mod endpoint;
pub mod provider;
pub mod session;
pub mod transport;

pub use connection::{Connection, ConnectionId};
pub use context::{RemoteContext, RemoteContextFactory};
pub use endpoint::{Connector, Endpoint, EndpointSlot};
pub use provider::{REMOTE_SCHEMES, RemoteNamingProvider, RemoteNamingProviderFactory, is_remote_scheme};
pub use session::{PendingSession, ServiceDescriptor, SessionCompleter, SessionRegistry, SessionStatus};
pub use transport::{RemoteTransport, TransportError};
