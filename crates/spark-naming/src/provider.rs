//! # 提供者与上下文工厂
//!
//! ## 角色定位（Why）
//! - 分发器按提供者 URL 的 scheme 与名称 scheme 选择后端；选择逻辑不写死任何具体实现，
//!   而是询问注册表中的工厂"你是否支持这个 scheme"；
//! - 工厂在进程启动时显式注册（见 [`crate::registry`]），取代运行期的类路径扫描。
//!
//! ## 契约说明（What）
//! - [`NamingProviderFactory`]：按提供者 URL 的 scheme 认领并创建 [`NamingProvider`]；
//! - [`NamingContextFactory`]：按 `(提供者, 名称 scheme)` 认领并创建根上下文；
//! - [`UrlContextResolver`]：无任何工厂认领名称 scheme 时的外部回退；
//! - 谓词（`supports_uri_scheme`）失败以 [`DiscoveryError`] 表达，只会被记录并跳过；
//!   创建阶段的失败以 [`NamingError`](crate::NamingError) 表达，直接返回给调用方。

use std::{any::Any, fmt, sync::Arc};

use dashmap::DashMap;
use url::Url;

use crate::{
    context::Context,
    environment::Environment,
    error::{DiscoveryError, Result},
};

/// 绑定到某个远端的活动提供者（连接所有者），被同一端点解析出的全部上下文共享。
pub trait NamingProvider: Send + Sync + fmt::Debug + 'static {
    /// 创建该提供者时使用的 URL。
    fn provider_uri(&self) -> &Url;

    /// 供上下文工厂识别具体提供者类型。
    fn as_any(&self) -> &dyn Any;

    /// 同 [`as_any`](Self::as_any)，保留共享所有权。
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl dyn NamingProvider {
    /// 向下转型为具体提供者。
    pub fn downcast_ref<T: NamingProvider>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// 向下转型为具体提供者的共享句柄；类型不符时返回 `None`。
    pub fn downcast_arc<T: NamingProvider>(self: Arc<Self>) -> Option<Arc<T>> {
        self.into_any_arc().downcast::<T>().ok()
    }
}

/// 连接提供者工厂。
pub trait NamingProviderFactory: Send + Sync + 'static {
    /// 是否支持提供者 URL 的 `scheme`。
    fn supports_uri_scheme(
        &self,
        scheme: &str,
        environment: &Environment,
    ) -> Result<bool, DiscoveryError>;

    /// 为 `uri` 创建提供者。
    fn create_provider(
        &self,
        uri: &Url,
        environment: &Environment,
    ) -> Result<Arc<dyn NamingProvider>>;
}

/// 根上下文工厂。
///
/// # 契约说明（What）
/// - `provider` 为 `None` 表示环境中未配置提供者 URL；
/// - `name_scheme` 为重解析出的名称 scheme，`None` 表示名称不带 scheme。
pub trait NamingContextFactory: Send + Sync + 'static {
    fn supports_uri_scheme(
        &self,
        provider: Option<&Arc<dyn NamingProvider>>,
        name_scheme: Option<&str>,
    ) -> Result<bool, DiscoveryError>;

    fn create_root_context(
        &self,
        provider: Option<Arc<dyn NamingProvider>>,
        name_scheme: Option<&str>,
        environment: &Environment,
    ) -> Result<Arc<dyn Context>>;
}

/// 外部 URL 上下文回退解析器。
pub trait UrlContextResolver: Send + Sync + 'static {
    /// 为 `scheme` 提供上下文；`Ok(None)` 表示不认领。
    fn resolve(&self, scheme: &str, environment: &Environment) -> Result<Option<Arc<dyn Context>>>;
}

/// 从不认领任何 scheme 的回退解析器，作为默认值。
#[derive(Clone, Copy, Debug, Default)]
pub struct NoUrlContexts;

impl UrlContextResolver for NoUrlContexts {
    fn resolve(&self, _scheme: &str, _environment: &Environment) -> Result<Option<Arc<dyn Context>>> {
        Ok(None)
    }
}

/// 为某个 scheme 构造 URL 上下文的函数。
pub type UrlContextConstructor =
    Arc<dyn Fn(&Environment) -> Result<Arc<dyn Context>> + Send + Sync + 'static>;

/// 以 scheme 为键的并发回退表。
///
/// # 契约说明（What）
/// - 运行期可随时 [`register`](Self::register) / [`unregister`](Self::unregister)，读写互不阻塞整表；
/// - 每次 `resolve` 都调用构造函数，返回新的上下文实例。
#[derive(Default)]
pub struct UrlContextTable {
    constructors: DashMap<String, UrlContextConstructor>,
}

impl UrlContextTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册 `scheme` 的构造函数，返回是否替换了已有条目。
    pub fn register<F>(&self, scheme: impl Into<String>, constructor: F) -> bool
    where
        F: Fn(&Environment) -> Result<Arc<dyn Context>> + Send + Sync + 'static,
    {
        self.constructors
            .insert(scheme.into(), Arc::new(constructor))
            .is_some()
    }

    pub fn unregister(&self, scheme: &str) -> bool {
        self.constructors.remove(scheme).is_some()
    }

    pub fn contains(&self, scheme: &str) -> bool {
        self.constructors.contains_key(scheme)
    }
}

impl UrlContextResolver for UrlContextTable {
    fn resolve(&self, scheme: &str, environment: &Environment) -> Result<Option<Arc<dyn Context>>> {
        // 先克隆出构造函数再调用，避免在持有分片锁时执行外部代码。
        let constructor = self
            .constructors
            .get(scheme)
            .map(|entry| Arc::clone(entry.value()));
        constructor
            .map(|construct| construct(environment))
            .transpose()
    }
}

impl fmt::Debug for UrlContextTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut schemes: Vec<String> = self
            .constructors
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        schemes.sort();
        f.debug_struct("UrlContextTable")
            .field("schemes", &schemes)
            .finish()
    }
}
