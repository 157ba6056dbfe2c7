//! 远程提供者与其工厂。
//!
//! 提供者只记录提供者 URL、创建时的环境与端点槽位；连接与会话在首次远程调用时才获取。

use std::{any::Any, fmt, sync::Arc};

use spark_naming::{
    DiscoveryError, Environment, NamingError, NamingProvider, NamingProviderFactory, Result,
};
use url::Url;

use crate::{
    connection::Connection,
    endpoint::{Endpoint, EndpointSlot},
    transport::TransportError,
};

/// 远程提供者认领的 scheme。
pub const REMOTE_SCHEMES: &[&str] = &[
    "remote",
    "remote+tls",
    "remote+http",
    "remote+https",
    "http-remoting",
    "https-remoting",
];

pub fn is_remote_scheme(scheme: &str) -> bool {
    REMOTE_SCHEMES.contains(&scheme)
}

/// 绑定到单个远程 URL 的提供者。
pub struct RemoteNamingProvider {
    uri: Url,
    environment: Environment,
    endpoints: Arc<EndpointSlot>,
}

impl RemoteNamingProvider {
    pub fn new(uri: Url, environment: Environment, endpoints: Arc<EndpointSlot>) -> Self {
        Self {
            uri,
            environment,
            endpoints,
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// 当前安装的端点。
    pub fn endpoint(&self) -> Result<Arc<Endpoint>> {
        self.endpoints
            .current()
            .ok_or(NamingError::NoRemotingEndpoint)
    }

    /// 通过 `endpoint` 获取到提供者 URL 的连接。
    pub fn connection(&self, endpoint: &Endpoint) -> Result<Arc<dyn Connection>, TransportError> {
        endpoint.connection(&self.uri, &self.environment)
    }
}

impl NamingProvider for RemoteNamingProvider {
    fn provider_uri(&self) -> &Url {
        &self.uri
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl fmt::Debug for RemoteNamingProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteNamingProvider")
            .field("uri", &self.uri.as_str())
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

/// 远程提供者工厂，所有提供者共享同一端点槽位。
#[derive(Clone, Debug)]
pub struct RemoteNamingProviderFactory {
    endpoints: Arc<EndpointSlot>,
}

impl RemoteNamingProviderFactory {
    pub fn new(endpoints: Arc<EndpointSlot>) -> Self {
        Self { endpoints }
    }

    pub fn endpoints(&self) -> &Arc<EndpointSlot> {
        &self.endpoints
    }
}

impl NamingProviderFactory for RemoteNamingProviderFactory {
    fn supports_uri_scheme(
        &self,
        scheme: &str,
        _environment: &Environment,
    ) -> Result<bool, DiscoveryError> {
        Ok(is_remote_scheme(scheme))
    }

    fn create_provider(
        &self,
        uri: &Url,
        environment: &Environment,
    ) -> Result<Arc<dyn NamingProvider>> {
        tracing::debug!(%uri, "creating remote naming provider");
        Ok(Arc::new(RemoteNamingProvider::new(
            uri.clone(),
            environment.clone(),
            Arc::clone(&self.endpoints),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_remote_schemes_only() {
        let factory = RemoteNamingProviderFactory::new(Arc::new(EndpointSlot::new()));
        let env = Environment::new();
        for scheme in REMOTE_SCHEMES {
            assert!(factory.supports_uri_scheme(scheme, &env).unwrap());
        }
        assert!(!factory.supports_uri_scheme("http", &env).unwrap());
        assert!(!factory.supports_uri_scheme("ldap", &env).unwrap());
    }

    #[test]
    fn missing_endpoint_is_reported_on_use() {
        let factory = RemoteNamingProviderFactory::new(Arc::new(EndpointSlot::new()));
        let uri = Url::parse("remote+http://h:9999").unwrap();
        let provider = factory.create_provider(&uri, &Environment::new()).unwrap();
        assert_eq!(provider.provider_uri(), &uri);

        let remote = provider.downcast_ref::<RemoteNamingProvider>().unwrap();
        assert_eq!(
            remote.endpoint().unwrap_err().code(),
            spark_naming::codes::NO_REMOTING_ENDPOINT
        );
    }
}
