//! # 根分发器
//!
//! ## 角色定位（Why）
//! - 命名联邦层的入口：每个公开操作先重解析名称，再向注册表询问该 `(提供者 URL, 名称 scheme)`
//!   应由哪个上下文处理，最后把剩余名称转交过去；
//! - 构造后除环境外无状态，同一实例可被多个线程并发调用。
//!
//! ## 解析顺序（How）
//! 1. 读取 [`keys::PROVIDER_URL`]：缺失、空白或没有 scheme 视为"无提供者"；非文本或其它语法错误
//!    返回 [`NamingError::InvalidProviderUri`]；
//! 2. 无提供者：第一个认领 `(None, 名称 scheme)` 的上下文工厂；否则若名称带 scheme，询问 URL
//!    回退解析器；否则返回 [`EmptyContext`]；
//! 3. 有提供者：依次尝试每个认领该 scheme 的提供者工厂，创建提供者后寻找认领
//!    `(提供者, 名称 scheme)` 的上下文工厂，首个命中者胜出；随后是 URL 回退；仍未命中则
//!    返回携带名称 scheme 的 [`NamingError::NoProvider`]，本次调用不会重试。
//!
//! ## 契约说明（What）
//! - 上下文工厂一律经 [`ProviderRegistries::scan_contexts`] 扫描，两个闸门的加锁顺序在各路径上一致；
//! - 发现阶段的单个候选失败只进入诊断通道；`create_provider` / `create_root_context` 的失败原样返回；
//! - 空名称（重解析后无 scheme 且零段）的 `lookup` / `lookup_link` 返回新的分发器实例：
//!   共享注册表，持有环境副本；
//! - `rename` 的两个名称独立重解析；两者都带 scheme 且不同则返回
//!   [`NamingError::CrossSchemeRename`]，不带 scheme 的新名称按旧名称的 scheme 解释。

use std::{fmt, sync::Arc};

use parking_lot::RwLock;
use url::Url;

use crate::{
    context::Context,
    empty::EmptyContext,
    environment::{Environment, keys},
    error::{NamingError, Result},
    name::Name,
    normalize::normalize_environment,
    registry::{ProviderRegistries, find_first_matching, matching},
    reparse::reparse,
    value::{Binding, Bound, NameClassPair, Value},
};

/// 根分发器。
pub struct RootContext {
    environment: RwLock<Environment>,
    registries: ProviderRegistries,
}

impl RootContext {
    /// 以规范化后的环境构造分发器。
    pub fn new(environment: Environment, registries: ProviderRegistries) -> Self {
        Self {
            environment: RwLock::new(normalize_environment(environment)),
            registries,
        }
    }

    /// 从 TOML 配置构造，见 [`Environment::from_toml_str`]。
    pub fn from_toml_str(source: &str, registries: ProviderRegistries) -> Result<Self> {
        Ok(Self::new(Environment::from_toml_str(source)?, registries))
    }

    pub fn registries(&self) -> &ProviderRegistries {
        &self.registries
    }

    /// 指代同一命名空间的新实例：共享注册表，持有环境副本。
    pub fn new_self_reference(&self) -> Self {
        Self {
            environment: RwLock::new(self.environment()),
            registries: self.registries.clone(),
        }
    }

    /// 为名称 scheme 解析目标上下文，解析顺序见模块文档。
    pub fn resolve_context(&self, name_scheme: Option<&str>) -> Result<Arc<dyn Context>> {
        let environment = self.environment();
        match provider_uri(&environment)? {
            None => self.resolve_without_provider(name_scheme, environment),
            Some(uri) => self.resolve_with_provider(&uri, name_scheme, &environment),
        }
    }

    fn resolve_without_provider(
        &self,
        name_scheme: Option<&str>,
        environment: Environment,
    ) -> Result<Arc<dyn Context>> {
        let contexts = self.registries.contexts();
        let factory = find_first_matching(
            contexts.label(),
            self.registries.scan_contexts(),
            self.registries.diagnostics(),
            |factory| factory.supports_uri_scheme(None, name_scheme),
        );
        if let Some(factory) = factory {
            tracing::debug!(name_scheme, "resolved context factory without provider");
            return factory.create_root_context(None, name_scheme, &environment);
        }
        if let Some(context) = self.resolve_url_context(name_scheme, &environment)? {
            return Ok(context);
        }
        tracing::debug!("no provider configured; using the empty namespace");
        Ok(Arc::new(EmptyContext::new(environment)))
    }

    fn resolve_with_provider(
        &self,
        uri: &Url,
        name_scheme: Option<&str>,
        environment: &Environment,
    ) -> Result<Arc<dyn Context>> {
        let scheme = uri.scheme();
        let providers = self.registries.providers();
        let contexts = self.registries.contexts();
        let sink = self.registries.diagnostics();

        let provider_factories = matching(providers.label(), providers.scan(), sink, |factory| {
            factory.supports_uri_scheme(scheme, environment)
        });
        for provider_factory in provider_factories {
            let provider = provider_factory.create_provider(uri, environment)?;
            let context_factory = find_first_matching(
                contexts.label(),
                self.registries.scan_contexts(),
                sink,
                |factory| factory.supports_uri_scheme(Some(&provider), name_scheme),
            );
            if let Some(context_factory) = context_factory {
                tracing::debug!(
                    provider_scheme = scheme,
                    name_scheme,
                    "resolved context factory for provider"
                );
                return context_factory.create_root_context(Some(provider), name_scheme, environment);
            }
        }

        if let Some(context) = self.resolve_url_context(name_scheme, environment)? {
            return Ok(context);
        }
        Err(NamingError::no_provider(name_scheme))
    }

    fn resolve_url_context(
        &self,
        name_scheme: Option<&str>,
        environment: &Environment,
    ) -> Result<Option<Arc<dyn Context>>> {
        let Some(scheme) = name_scheme else {
            return Ok(None);
        };
        let context = self.registries.url_contexts().resolve(scheme, environment)?;
        if context.is_some() {
            tracing::debug!(name_scheme = scheme, "resolved URL context fallback");
        }
        Ok(context)
    }

    /// 重解析并解析目标上下文，返回上下文与剩余名称。
    fn target(&self, name: &Name) -> Result<(Arc<dyn Context>, Name)> {
        let reparsed = reparse(name);
        let context = self.resolve_context(reparsed.url_scheme())?;
        Ok((context, reparsed.name))
    }

    fn self_reference(&self) -> Bound {
        Bound::Context(Arc::new(self.new_self_reference()))
    }
}

/// 读取提供者 URL；`Ok(None)` 表示未配置提供者。
fn provider_uri(environment: &Environment) -> Result<Option<Url>> {
    let Some(value) = environment.get(keys::PROVIDER_URL) else {
        return Ok(None);
    };
    let Some(text) = value.as_str() else {
        return Err(NamingError::InvalidProviderUri {
            value: format!("{value:?}"),
            detail: "provider URL must be text".into(),
        });
    };
    match Url::parse(text) {
        Ok(uri) => Ok(Some(uri)),
        // 空文本与不带 scheme 的相对引用都等价于没有配置提供者。
        Err(url::ParseError::RelativeUrlWithoutBase) => Ok(None),
        Err(err) => Err(NamingError::InvalidProviderUri {
            value: text.to_owned(),
            detail: err.to_string(),
        }),
    }
}

impl Context for RootContext {
    fn lookup(&self, name: &Name) -> Result<Bound> {
        let reparsed = reparse(name);
        if reparsed.is_empty() {
            return Ok(self.self_reference());
        }
        self.resolve_context(reparsed.url_scheme())?
            .lookup(&reparsed.name)
    }

    fn lookup_link(&self, name: &Name) -> Result<Bound> {
        let reparsed = reparse(name);
        if reparsed.is_empty() {
            return Ok(self.self_reference());
        }
        self.resolve_context(reparsed.url_scheme())?
            .lookup_link(&reparsed.name)
    }

    fn bind(&self, name: &Name, object: Value) -> Result<()> {
        let (context, remainder) = self.target(name)?;
        context.bind(&remainder, object)
    }

    fn rebind(&self, name: &Name, object: Value) -> Result<()> {
        let (context, remainder) = self.target(name)?;
        context.rebind(&remainder, object)
    }

    fn unbind(&self, name: &Name) -> Result<()> {
        let (context, remainder) = self.target(name)?;
        context.unbind(&remainder)
    }

    fn rename(&self, old_name: &Name, new_name: &Name) -> Result<()> {
        let old = reparse(old_name);
        let new = reparse(new_name);
        let crosses_schemes = matches!(
            (old.url_scheme(), new.url_scheme()),
            (Some(old_scheme), Some(new_scheme)) if old_scheme != new_scheme
        );
        if crosses_schemes {
            return Err(NamingError::CrossSchemeRename {
                old_scheme: old.url_scheme,
                new_scheme: new.url_scheme,
            });
        }
        self.resolve_context(old.url_scheme())?
            .rename(&old.name, &new.name)
    }

    fn list(&self, name: &Name) -> Result<Vec<NameClassPair>> {
        let (context, remainder) = self.target(name)?;
        context.list(&remainder)
    }

    fn list_bindings(&self, name: &Name) -> Result<Vec<Binding>> {
        let (context, remainder) = self.target(name)?;
        context.list_bindings(&remainder)
    }

    fn create_subcontext(&self, name: &Name) -> Result<Arc<dyn Context>> {
        let (context, remainder) = self.target(name)?;
        context.create_subcontext(&remainder)
    }

    fn destroy_subcontext(&self, name: &Name) -> Result<()> {
        let (context, remainder) = self.target(name)?;
        context.destroy_subcontext(&remainder)
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

impl fmt::Debug for RootContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootContext")
            .field("environment", &*self.environment.read())
            .field("registries", &self.registries)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::codes;

    fn env_with(url: impl Into<Value>) -> Environment {
        let mut env = Environment::new();
        env.insert(keys::PROVIDER_URL, url);
        env
    }

    #[test]
    fn provider_uri_classification() {
        assert!(provider_uri(&Environment::new()).unwrap().is_none());
        assert!(provider_uri(&env_with("")).unwrap().is_none());
        assert!(provider_uri(&env_with("   ")).unwrap().is_none());
        assert!(provider_uri(&env_with("/relative/path")).unwrap().is_none());
        assert_eq!(
            provider_uri(&env_with("remote+http://h:9999"))
                .unwrap()
                .map(|uri| uri.scheme().to_owned()),
            Some("remote+http".to_owned())
        );

        let err = provider_uri(&env_with("remote+http://[bad")).unwrap_err();
        assert_eq!(err.code(), codes::INVALID_PROVIDER_URI);
        assert!(err.to_string().contains("remote+http://[bad"));

        // 报错保留配置的原文。
        let err = provider_uri(&env_with(" remote+http://[bad ")).unwrap_err();
        assert!(err.to_string().contains(" remote+http://[bad "));

        let err = provider_uri(&env_with(42_i64)).unwrap_err();
        assert_eq!(err.code(), codes::INVALID_PROVIDER_URI);
    }

    #[test]
    fn construction_normalizes_legacy_connection_keys() {
        let env: Environment = [
            ("remote.connections", "a"),
            ("remote.connection.a.host", "h"),
            ("remote.connection.a.port", "1"),
        ]
        .into_iter()
        .collect();
        let root = RootContext::new(env, ProviderRegistries::default());
        assert_eq!(
            root.environment().get_text(keys::PROVIDER_URL),
            Some("remote+http://h:1")
        );
    }
}
