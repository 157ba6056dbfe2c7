//! 远程上下文测试共用的内存远端：内存传输、可编程连接与计数建连器。

#![allow(dead_code)]

use std::{
    collections::{BTreeMap, BTreeSet},
    io,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use parking_lot::Mutex;
use spark_naming::{
    Binding, Bound, Context, Environment, Name, NameClassPair, NamingError,
    ProviderRegistries, RelativeContext, RootContext, Value, keys,
};
use spark_naming_remote::{
    Connection, ConnectionId, Connector, Endpoint, EndpointSlot, RemoteContextFactory,
    RemoteNamingProviderFactory, RemoteTransport, ServiceDescriptor, SessionCompleter,
    TransportError,
};
use url::Url;

/// 内存中的远端命名空间。
#[derive(Default)]
pub struct InMemoryTransport {
    objects: Mutex<BTreeMap<String, Value>>,
    contexts: Mutex<BTreeSet<String>>,
    broken: AtomicBool,
    calls: AtomicUsize,
}

impl InMemoryTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 之后的调用都以 I/O 错误失败。
    pub fn break_wire(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn object(&self, name: &str) -> Option<Value> {
        self.objects.lock().get(name).cloned()
    }

    pub fn has_context(&self, name: &str) -> bool {
        self.contexts.lock().contains(name)
    }

    fn enter(&self) -> Result<(), TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.broken.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "wire reset").into());
        }
        Ok(())
    }

    fn children(&self, name: &Name) -> Vec<(String, bool)> {
        let prefix = if name.is_empty() {
            String::new()
        } else {
            format!("{name}/")
        };
        let direct = |key: &String| {
            key.strip_prefix(&prefix)
                .filter(|rest| !rest.is_empty() && !rest.contains('/'))
                .map(str::to_owned)
        };
        let mut children: Vec<(String, bool)> = self
            .objects
            .lock()
            .keys()
            .filter_map(|key| direct(key).map(|child| (child, false)))
            .collect();
        children.extend(
            self.contexts
                .lock()
                .iter()
                .filter_map(|key| direct(key).map(|child| (child, true))),
        );
        children
    }
}

impl RemoteTransport for InMemoryTransport {
    fn lookup(&self, owner: &Arc<dyn Context>, name: &Name, _link: bool) -> Result<Bound, TransportError> {
        self.enter()?;
        let key = name.to_string();
        if self.contexts.lock().contains(&key) {
            return Ok(Bound::Context(Arc::new(RelativeContext::new(
                Arc::clone(owner),
                name.clone(),
                owner.environment(),
            ))));
        }
        self.objects
            .lock()
            .get(&key)
            .cloned()
            .map(Bound::Object)
            .ok_or_else(|| NamingError::name_not_found(name).into())
    }

    fn bind(&self, name: &Name, object: Value, rebind: bool) -> Result<(), TransportError> {
        self.enter()?;
        let mut objects = self.objects.lock();
        let key = name.to_string();
        if !rebind && objects.contains_key(&key) {
            return Err(NamingError::NameAlreadyBound { name: key }.into());
        }
        objects.insert(key, object);
        Ok(())
    }

    fn unbind(&self, name: &Name) -> Result<(), TransportError> {
        self.enter()?;
        self.objects.lock().remove(&name.to_string());
        Ok(())
    }

    fn rename(&self, old_name: &Name, new_name: &Name) -> Result<(), TransportError> {
        self.enter()?;
        let mut objects = self.objects.lock();
        let object = objects
            .remove(&old_name.to_string())
            .ok_or_else(|| NamingError::name_not_found(old_name))?;
        objects.insert(new_name.to_string(), object);
        Ok(())
    }

    fn list(&self, name: &Name) -> Result<Vec<NameClassPair>, TransportError> {
        self.enter()?;
        Ok(self
            .children(name)
            .into_iter()
            .map(|(child, is_context)| {
                NameClassPair::new(child, if is_context { "context" } else { "object" })
            })
            .collect())
    }

    fn list_bindings(&self, name: &Name, owner: &Arc<dyn Context>) -> Result<Vec<Binding>, TransportError> {
        self.enter()?;
        let objects = self.objects.lock().clone();
        Ok(self
            .children(name)
            .into_iter()
            .map(|(child, is_context)| {
                let full = name.join(&Name::from_segments([child.as_str()]));
                let object = if is_context {
                    Bound::Context(Arc::new(RelativeContext::new(
                        Arc::clone(owner),
                        full,
                        owner.environment(),
                    )))
                } else {
                    Bound::Object(objects[&full.to_string()].clone())
                };
                Binding::new(child, if is_context { "context" } else { "object" }, object)
            })
            .collect())
    }

    fn create_subcontext(&self, name: &Name) -> Result<(), TransportError> {
        self.enter()?;
        if !self.contexts.lock().insert(name.to_string()) {
            return Err(NamingError::NameAlreadyBound {
                name: name.to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn destroy_subcontext(&self, name: &Name) -> Result<(), TransportError> {
        self.enter()?;
        self.contexts.lock().remove(&name.to_string());
        Ok(())
    }
}

/// 连接对服务协商的响应方式。
#[derive(Clone)]
pub enum Negotiation {
    /// 立即以内存传输完成。
    Immediate(Arc<InMemoryTransport>),
    /// 立即失败。
    Reject,
    /// 挂起，由测试稍后决定结果。
    Hold,
}

#[derive(Debug, Default)]
pub struct HeldNegotiation {
    pub completer: Mutex<Option<SessionCompleter>>,
    pub cancelled: AtomicBool,
}

pub struct MockConnection {
    id: ConnectionId,
    open: AtomicBool,
    negotiation: Negotiation,
    negotiations: Arc<AtomicUsize>,
    held: Arc<HeldNegotiation>,
}

impl MockConnection {
    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for MockConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockConnection").field("id", &self.id).finish()
    }
}

impl Connection for MockConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn open_service(&self, descriptor: &ServiceDescriptor, completer: SessionCompleter) {
        assert_eq!(descriptor, &ServiceDescriptor::naming());
        self.negotiations.fetch_add(1, Ordering::SeqCst);
        match &self.negotiation {
            Negotiation::Immediate(transport) => {
                completer.complete(Arc::clone(transport) as Arc<dyn RemoteTransport>);
            }
            Negotiation::Reject => {
                completer.fail(TransportError::Negotiation("service refused".into()));
            }
            Negotiation::Hold => {
                let held = Arc::clone(&self.held);
                completer.on_cancel(move || held.cancelled.store(true, Ordering::SeqCst));
                *self.held.completer.lock() = Some(completer);
            }
        }
    }
}

/// 记录建连次数的建连器。
pub struct MockConnector {
    negotiation: Negotiation,
    refuse: AtomicBool,
    pub connects: AtomicUsize,
    pub negotiations: Arc<AtomicUsize>,
    pub held: Arc<HeldNegotiation>,
    pub last: Mutex<Option<Arc<MockConnection>>>,
}

impl MockConnector {
    pub fn new(negotiation: Negotiation) -> Arc<Self> {
        Arc::new(Self {
            negotiation,
            refuse: AtomicBool::new(false),
            connects: AtomicUsize::new(0),
            negotiations: Arc::new(AtomicUsize::new(0)),
            held: Arc::new(HeldNegotiation::default()),
            last: Mutex::new(None),
        })
    }

    pub fn refusing() -> Arc<Self> {
        let connector = Self::new(Negotiation::Reject);
        connector.refuse.store(true, Ordering::SeqCst);
        connector
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn negotiations(&self) -> usize {
        self.negotiations.load(Ordering::SeqCst)
    }

    pub fn close_last(&self) {
        if let Some(connection) = self.last.lock().as_ref() {
            connection.close();
        }
    }
}

impl Connector for MockConnector {
    fn connect(&self, uri: &Url, _environment: &Environment) -> Result<Arc<dyn Connection>, TransportError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.refuse.load(Ordering::SeqCst) {
            return Err(TransportError::Connect {
                uri: uri.to_string(),
                detail: "connection refused".into(),
            });
        }
        let connection = Arc::new(MockConnection {
            id: ConnectionId::next(),
            open: AtomicBool::new(true),
            negotiation: self.negotiation.clone(),
            negotiations: Arc::clone(&self.negotiations),
            held: Arc::clone(&self.held),
        });
        *self.last.lock() = Some(Arc::clone(&connection));
        Ok(connection)
    }
}

pub const PROVIDER_URL: &str = "remote+http://h:9999";

/// 远程工厂注册在分发器中的完整装配。
pub struct Harness {
    pub root: RootContext,
    pub endpoints: Arc<EndpointSlot>,
}

pub fn harness(connector: Arc<MockConnector>) -> Harness {
    let endpoints = Arc::new(EndpointSlot::with_endpoint(Arc::new(Endpoint::new(
        "test",
        connector,
    ))));
    let registries = ProviderRegistries::builder()
        .provider(
            "remote",
            Arc::new(RemoteNamingProviderFactory::new(Arc::clone(&endpoints))),
        )
        .context("remote", Arc::new(RemoteContextFactory))
        .build();
    let mut environment = Environment::new();
    environment.insert(keys::PROVIDER_URL, PROVIDER_URL);
    Harness {
        root: RootContext::new(environment, registries),
        endpoints,
    }
}
