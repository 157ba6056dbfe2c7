//! # 工厂注册表与发现
//!
//! ## 角色定位（Why）
//! - 以显式、强类型的注册表承载连接提供者工厂与上下文工厂，在进程启动时由静态注册
//!   或配置驱动构造填充；
//! - 保留"单个候选失败不终止迭代"的隔离语义：失败交给 [`DiagnosticSink`]，迭代继续。
//!
//! ## 契约说明（What）
//! - 候选可以是现成实例，也可以是延迟加载函数：加载成功后记忆结果，失败则下次重试；
//! - [`Registry::scan`] 在整个迭代期间持有本注册表的互斥闸门，同一注册表同一时刻只允许
//!   一个线程执行发现；闸门可重入，工厂在发现期间再次触发解析不会自锁；
//! - 迭代基于候选列表快照，扫描期间的并发注册对本轮不可见；
//! - 两个注册表的闸门按固定顺序获取：先提供者，后上下文。上下文注册表只经
//!   [`ProviderRegistries::scan_contexts`] 扫描，持有上下文闸门的线程必然已持有提供者闸门，
//!   跨注册表的重入解析不会形成等待环。
//!
//! ## 风险提示（Trade-offs）
//! - 闸门覆盖调用方在迭代期间执行的全部逻辑（包括工厂构造），慢工厂会串行化同一注册表的并发解析。

use std::{
    fmt,
    sync::{Arc, OnceLock},
};

use parking_lot::{ReentrantMutex, ReentrantMutexGuard, RwLock};

use crate::{
    error::DiscoveryError,
    provider::{NamingContextFactory, NamingProviderFactory, NoUrlContexts, UrlContextResolver},
};

/// 发现阶段诊断信息的接收方。
pub trait DiagnosticSink: Send + Sync + 'static {
    /// 报告一个被跳过的候选。
    fn report(&self, registry: &str, error: &DiscoveryError);
}

/// 以 `tracing::warn!` 记录诊断信息，作为默认实现。
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn report(&self, registry: &str, error: &DiscoveryError) {
        tracing::warn!(
            registry,
            candidate = error.candidate(),
            detail = error.detail(),
            "skipping naming factory that failed during discovery"
        );
    }
}

type Loader<F> = Box<dyn Fn() -> Result<Arc<F>, DiscoveryError> + Send + Sync>;

enum CandidateSource<F: ?Sized> {
    Ready(Arc<F>),
    Deferred {
        loader: Loader<F>,
        loaded: OnceLock<Arc<F>>,
    },
}

/// 注册表中的一个候选。
struct Candidate<F: ?Sized> {
    label: String,
    source: CandidateSource<F>,
}

impl<F: ?Sized> Candidate<F> {
    fn resolve(&self) -> Result<Arc<F>, DiscoveryError> {
        match &self.source {
            CandidateSource::Ready(factory) => Ok(Arc::clone(factory)),
            CandidateSource::Deferred { loader, loaded } => {
                if let Some(factory) = loaded.get() {
                    return Ok(Arc::clone(factory));
                }
                // 闸门保证同一时刻只有一个线程执行加载。
                let factory = loader()?;
                Ok(Arc::clone(loaded.get_or_init(|| factory)))
            }
        }
    }
}

/// 某一类工厂的注册表。
pub struct Registry<F: ?Sized> {
    label: &'static str,
    gate: ReentrantMutex<()>,
    candidates: RwLock<Vec<Arc<Candidate<F>>>>,
}

impl<F: ?Sized + Send + Sync + 'static> Registry<F> {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            gate: ReentrantMutex::new(()),
            candidates: RwLock::new(Vec::new()),
        }
    }

    /// 注册表名称，出现在诊断信息中。
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// 追加一个现成的工厂。
    pub fn register(&self, label: impl Into<String>, factory: Arc<F>) {
        self.push(label.into(), CandidateSource::Ready(factory));
    }

    /// 追加一个延迟加载的工厂。
    pub fn register_deferred<L>(&self, label: impl Into<String>, loader: L)
    where
        L: Fn() -> Result<Arc<F>, DiscoveryError> + Send + Sync + 'static,
    {
        self.push(
            label.into(),
            CandidateSource::Deferred {
                loader: Box::new(loader),
                loaded: OnceLock::new(),
            },
        );
    }

    fn push(&self, label: String, source: CandidateSource<F>) {
        self.candidates
            .write()
            .push(Arc::new(Candidate { label, source }));
    }

    pub fn len(&self) -> usize {
        self.candidates.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.read().is_empty()
    }

    /// 持有闸门，按注册顺序遍历候选。
    pub fn scan(&self) -> Scan<'_, F> {
        self.scan_within(None)
    }

    fn scan_within<'a>(&'a self, outer: Option<ReentrantMutexGuard<'a, ()>>) -> Scan<'a, F> {
        let guard = self.gate.lock();
        let snapshot = self.candidates.read().clone();
        Scan {
            _guard: guard,
            _outer: outer,
            candidates: snapshot.into_iter(),
        }
    }
}

impl<F: ?Sized> fmt::Debug for Registry<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<String> = self
            .candidates
            .read()
            .iter()
            .map(|candidate| candidate.label.clone())
            .collect();
        f.debug_struct("Registry")
            .field("label", &self.label)
            .field("candidates", &labels)
            .finish()
    }
}

/// [`Registry::scan`] 返回的迭代器；释放时归还闸门。
pub struct Scan<'a, F: ?Sized> {
    // 字段按声明顺序释放：先归还本注册表的闸门，再归还外层闸门。
    _guard: ReentrantMutexGuard<'a, ()>,
    _outer: Option<ReentrantMutexGuard<'a, ()>>,
    candidates: std::vec::IntoIter<Arc<Candidate<F>>>,
}

impl<F: ?Sized> Iterator for Scan<'_, F> {
    type Item = Result<Arc<F>, DiscoveryError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.candidates.next().map(|candidate| candidate.resolve())
    }
}

/// 过滤出满足谓词的候选，失败的候选报告给 `sink` 后跳过。
///
/// 惰性求值：调用方可以在取得一个匹配后处理它，再决定是否继续。
pub fn matching<'a, F, I, P>(
    registry: &'a str,
    candidates: I,
    sink: &'a dyn DiagnosticSink,
    mut predicate: P,
) -> impl Iterator<Item = Arc<F>> + 'a
where
    F: ?Sized + 'a,
    I: IntoIterator<Item = Result<Arc<F>, DiscoveryError>> + 'a,
    P: FnMut(&F) -> Result<bool, DiscoveryError> + 'a,
{
    candidates
        .into_iter()
        .filter_map(move |candidate| check(registry, sink, candidate, &mut predicate))
}

/// 返回第一个满足谓词的候选。
pub fn find_first_matching<F, I, P>(
    registry: &str,
    candidates: I,
    sink: &dyn DiagnosticSink,
    mut predicate: P,
) -> Option<Arc<F>>
where
    F: ?Sized,
    I: IntoIterator<Item = Result<Arc<F>, DiscoveryError>>,
    P: FnMut(&F) -> Result<bool, DiscoveryError>,
{
    candidates
        .into_iter()
        .find_map(|candidate| check(registry, sink, candidate, &mut predicate))
}

fn check<F, P>(
    registry: &str,
    sink: &dyn DiagnosticSink,
    candidate: Result<Arc<F>, DiscoveryError>,
    predicate: &mut P,
) -> Option<Arc<F>>
where
    F: ?Sized,
    P: FnMut(&F) -> Result<bool, DiscoveryError>,
{
    let verdict = candidate.and_then(|factory| {
        let accepted = predicate(&*factory)?;
        Ok(accepted.then_some(factory))
    });
    match verdict {
        Ok(found) => found,
        Err(error) => {
            sink.report(registry, &error);
            None
        }
    }
}

/// 分发器使用的注册表集合，克隆后共享同一组注册表。
#[derive(Clone)]
pub struct ProviderRegistries {
    inner: Arc<RegistriesInner>,
}

struct RegistriesInner {
    providers: Registry<dyn NamingProviderFactory>,
    contexts: Registry<dyn NamingContextFactory>,
    url_contexts: Arc<dyn UrlContextResolver>,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl ProviderRegistries {
    pub fn builder() -> ProviderRegistriesBuilder {
        ProviderRegistriesBuilder::default()
    }

    /// 连接提供者工厂注册表。
    pub fn providers(&self) -> &Registry<dyn NamingProviderFactory> {
        &self.inner.providers
    }

    /// 上下文工厂注册表。
    pub fn contexts(&self) -> &Registry<dyn NamingContextFactory> {
        &self.inner.contexts
    }

    /// 扫描上下文工厂：先取提供者闸门，再取上下文闸门。
    pub fn scan_contexts(&self) -> Scan<'_, dyn NamingContextFactory> {
        let providers = self.inner.providers.gate.lock();
        self.inner.contexts.scan_within(Some(providers))
    }

    pub fn url_contexts(&self) -> &dyn UrlContextResolver {
        self.inner.url_contexts.as_ref()
    }

    pub fn diagnostics(&self) -> &dyn DiagnosticSink {
        self.inner.diagnostics.as_ref()
    }

    /// 两个句柄是否指向同一组注册表。
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for ProviderRegistries {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for ProviderRegistries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistries")
            .field("providers", &self.inner.providers)
            .field("contexts", &self.inner.contexts)
            .finish_non_exhaustive()
    }
}

/// [`ProviderRegistries`] 构建器。
pub struct ProviderRegistriesBuilder {
    providers: Registry<dyn NamingProviderFactory>,
    contexts: Registry<dyn NamingContextFactory>,
    url_contexts: Arc<dyn UrlContextResolver>,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl Default for ProviderRegistriesBuilder {
    fn default() -> Self {
        Self {
            providers: Registry::new("naming-provider"),
            contexts: Registry::new("naming-context"),
            url_contexts: Arc::new(NoUrlContexts),
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }
}

impl ProviderRegistriesBuilder {
    pub fn provider(self, label: impl Into<String>, factory: Arc<dyn NamingProviderFactory>) -> Self {
        self.providers.register(label, factory);
        self
    }

    pub fn provider_deferred<L>(self, label: impl Into<String>, loader: L) -> Self
    where
        L: Fn() -> Result<Arc<dyn NamingProviderFactory>, DiscoveryError> + Send + Sync + 'static,
    {
        self.providers.register_deferred(label, loader);
        self
    }

    pub fn context(self, label: impl Into<String>, factory: Arc<dyn NamingContextFactory>) -> Self {
        self.contexts.register(label, factory);
        self
    }

    pub fn context_deferred<L>(self, label: impl Into<String>, loader: L) -> Self
    where
        L: Fn() -> Result<Arc<dyn NamingContextFactory>, DiscoveryError> + Send + Sync + 'static,
    {
        self.contexts.register_deferred(label, loader);
        self
    }

    pub fn url_contexts(mut self, resolver: Arc<dyn UrlContextResolver>) -> Self {
        self.url_contexts = resolver;
        self
    }

    pub fn diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = sink;
        self
    }

    pub fn build(self) -> ProviderRegistries {
        ProviderRegistries {
            inner: Arc::new(RegistriesInner {
                providers: self.providers,
                contexts: self.contexts,
                url_contexts: self.url_contexts,
                diagnostics: self.diagnostics,
            }),
        }
    }
}
