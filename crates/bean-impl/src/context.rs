//! 作用域上下文管理
//!
//! 按作用域类型持有上下文实例存储。同一 (组件, 上下文标识) 的构造
//! 至多发生一次：并发调用方要么等待构造完成，要么共同收到同一个
//! 构造失败；失败不缓存实例，后续获取会重新构造

use bean_abstractions::{
    BeanInstance, ContextualConstructor, InstanceDisposer, ScopeContext, ScopeHandle,
};
use container_common::{
    ComponentDescriptor, ConstructionError, ContainerError, ContainerResult, ContextError,
    ContextResult, ScopeKind, TypeKey,
};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, warn};
use uuid::Uuid;

/// 单次构造尝试的结果，广播给同一槽位上的全部等待方
type AttemptResult = Result<BeanInstance, ConstructionError>;

/// 上下文实例槽位状态
enum SlotState {
    /// 尚未构造
    Absent,
    /// 构造进行中，等待方通过接收端取得本次尝试的结果
    UnderConstruction {
        rx: watch::Receiver<Option<AttemptResult>>,
    },
    /// 构造完成，记录创建序号用于逆序销毁
    Ready { instance: BeanInstance, seq: u64 },
}

struct Slot {
    state: Mutex<SlotState>,
}

impl Slot {
    fn new() -> Self {
        Self {
            state: Mutex::new(SlotState::Absent),
        }
    }
}

/// 单个上下文的实例存储
///
/// 以组件身份为键的槽位集合；销毁时整体清空。
/// 已就绪实例另存一份只读视图，读取热路径不经过槽位互斥锁
struct ContextStore {
    slots: DashMap<TypeKey, Arc<Slot>>,
    ready: DashMap<TypeKey, BeanInstance>,
    seq: AtomicU64,
}

impl ContextStore {
    fn new() -> Self {
        Self {
            slots: DashMap::new(),
            ready: DashMap::new(),
            seq: AtomicU64::new(0),
        }
    }

    /// 获取或构造上下文实例
    async fn obtain(
        &self,
        descriptor: &ComponentDescriptor,
        constructor: &dyn ContextualConstructor,
    ) -> ContainerResult<BeanInstance> {
        if let Some(instance) = self.ready.get(&descriptor.id) {
            return Ok(instance.clone());
        }

        loop {
            let slot = self
                .slots
                .entry(descriptor.id.clone())
                .or_insert_with(|| Arc::new(Slot::new()))
                .clone();

            let mut guard = slot.state.lock().await;
            match &*guard {
                SlotState::Ready { instance, .. } => return Ok(instance.clone()),

                SlotState::UnderConstruction { rx } => {
                    let mut rx = rx.clone();
                    drop(guard);

                    if rx.changed().await.is_err() {
                        // 发送端在产出结果前被丢弃，重置槽位后重试
                        let mut guard = slot.state.lock().await;
                        if let SlotState::UnderConstruction { rx } = &*guard {
                            if rx.has_changed().is_err() {
                                *guard = SlotState::Absent;
                            }
                        }
                        continue;
                    }

                    let latest = rx.borrow().clone();
                    match latest {
                        Some(Ok(instance)) => return Ok(instance),
                        Some(Err(e)) => return Err(e.into()),
                        None => continue,
                    }
                }

                SlotState::Absent => {
                    let (tx, rx) = watch::channel(None);
                    *guard = SlotState::UnderConstruction { rx };
                    drop(guard);

                    let result = constructor.construct(descriptor).await;

                    let mut guard = slot.state.lock().await;
                    match result {
                        Ok(instance) => {
                            let seq = self.seq.fetch_add(1, Ordering::Relaxed);
                            *guard = SlotState::Ready {
                                instance: instance.clone(),
                                seq,
                            };
                            drop(guard);
                            self.ready.insert(descriptor.id.clone(), instance.clone());
                            let _ = tx.send(Some(Ok(instance.clone())));
                            return Ok(instance);
                        }
                        Err(e) => {
                            *guard = SlotState::Absent;
                            drop(guard);
                            let _ = tx.send(Some(Err(e.clone())));
                            return Err(e.into());
                        }
                    }
                }
            }
        }
    }

    /// 取出全部已就绪实例并清空存储，按创建顺序的逆序排列
    async fn drain_ready(&self) -> Vec<(TypeKey, BeanInstance)> {
        self.ready.clear();
        let mut drained = Vec::new();
        let keys: Vec<TypeKey> = self.slots.iter().map(|e| e.key().clone()).collect();
        for key in keys {
            if let Some((_, slot)) = self.slots.remove(&key) {
                let guard = slot.state.lock().await;
                if let SlotState::Ready { instance, seq } = &*guard {
                    drained.push((*seq, key, instance.clone()));
                }
            }
        }
        drained.sort_by(|a, b| b.0.cmp(&a.0));
        drained
            .into_iter()
            .map(|(_, key, instance)| (key, instance))
            .collect()
    }
}

/// 应用作用域上下文
///
/// 容器生命周期内唯一的上下文，关闭容器时销毁
pub struct ApplicationContext {
    store: ContextStore,
    active: AtomicBool,
}

impl ApplicationContext {
    /// 创建新的应用上下文
    pub fn new() -> Self {
        Self {
            store: ContextStore::new(),
            active: AtomicBool::new(true),
        }
    }
}

impl Default for ApplicationContext {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ScopeContext for ApplicationContext {
    fn kind(&self) -> ScopeKind {
        ScopeKind::Application
    }

    fn is_active(&self, _owner: Option<Uuid>) -> bool {
        self.active.load(Ordering::Acquire)
    }

    async fn obtain(
        &self,
        descriptor: &ComponentDescriptor,
        _owner: Option<Uuid>,
        constructor: &dyn ContextualConstructor,
    ) -> ContainerResult<BeanInstance> {
        if !self.active.load(Ordering::Acquire) {
            return Err(ContainerError::from(ContextError::ContextNotActive {
                scope: ScopeKind::Application.to_string(),
            }));
        }
        self.store.obtain(descriptor, constructor).await
    }

    async fn destroy(
        &self,
        _owner: Option<Uuid>,
        disposer: &dyn InstanceDisposer,
    ) -> ContextResult<()> {
        self.active.store(false, Ordering::Release);
        for (id, instance) in self.store.drain_ready().await {
            disposer.dispose(&id, instance).await;
        }
        Ok(())
    }
}

/// 按上下文标识分键的作用域上下文
///
/// 请求与会话作用域共用此实现：每个 begin 产生独立的实例存储，
/// end 时销毁；重复销毁是幂等的
pub struct KeyedScopeContext {
    kind: ScopeKind,
    stores: DashMap<Uuid, Arc<ContextStore>>,
}

impl KeyedScopeContext {
    /// 创建指定作用域类型的上下文
    pub fn new(kind: ScopeKind) -> Self {
        Self {
            kind,
            stores: DashMap::new(),
        }
    }

    /// 开启新的上下文
    pub fn begin(&self) -> ScopeHandle {
        let handle = ScopeHandle::new(self.kind);
        self.stores.insert(handle.id, Arc::new(ContextStore::new()));
        debug!("开启 {} 上下文: {}", self.kind, handle.id);
        handle
    }

    /// 销毁全部上下文
    pub async fn destroy_all(&self, disposer: &dyn InstanceDisposer) {
        let owners: Vec<Uuid> = self.stores.iter().map(|e| *e.key()).collect();
        for owner in owners {
            let _ = self.destroy(Some(owner), disposer).await;
        }
    }
}

#[async_trait::async_trait]
impl ScopeContext for KeyedScopeContext {
    fn kind(&self) -> ScopeKind {
        self.kind
    }

    fn is_active(&self, owner: Option<Uuid>) -> bool {
        owner.is_some_and(|o| self.stores.contains_key(&o))
    }

    async fn obtain(
        &self,
        descriptor: &ComponentDescriptor,
        owner: Option<Uuid>,
        constructor: &dyn ContextualConstructor,
    ) -> ContainerResult<BeanInstance> {
        let owner = owner.ok_or_else(|| ContextError::OwnerRequired {
            scope: self.kind.to_string(),
        })?;
        let store = self
            .stores
            .get(&owner)
            .map(|e| e.value().clone())
            .ok_or_else(|| ContextError::UnknownOwner {
                owner: owner.to_string(),
            })?;
        store.obtain(descriptor, constructor).await
    }

    async fn destroy(
        &self,
        owner: Option<Uuid>,
        disposer: &dyn InstanceDisposer,
    ) -> ContextResult<()> {
        let owner = owner.ok_or_else(|| ContextError::OwnerRequired {
            scope: self.kind.to_string(),
        })?;
        if let Some((_, store)) = self.stores.remove(&owner) {
            debug!("销毁 {} 上下文: {}", self.kind, owner);
            for (id, instance) in store.drain_ready().await {
                disposer.dispose(&id, instance).await;
            }
        }
        Ok(())
    }
}

/// 作用域上下文管理器
///
/// 按描述符的作用域类型分发获取与销毁；依赖作用域不存储实例，
/// 每次获取都构造全新实例
pub struct ScopeContextManager {
    application: ApplicationContext,
    request: KeyedScopeContext,
    session: KeyedScopeContext,
}

impl ScopeContextManager {
    /// 创建新的管理器
    pub fn new() -> Self {
        Self {
            application: ApplicationContext::new(),
            request: KeyedScopeContext::new(ScopeKind::Request),
            session: KeyedScopeContext::new(ScopeKind::Session),
        }
    }

    /// 获取或构造上下文实例
    pub async fn obtain(
        &self,
        descriptor: &ComponentDescriptor,
        owner: Option<Uuid>,
        constructor: &dyn ContextualConstructor,
    ) -> ContainerResult<BeanInstance> {
        match descriptor.scope {
            ScopeKind::Application => self.application.obtain(descriptor, owner, constructor).await,
            ScopeKind::Request => self.request.obtain(descriptor, owner, constructor).await,
            ScopeKind::Session => self.session.obtain(descriptor, owner, constructor).await,
            ScopeKind::Dependent => Ok(constructor.construct(descriptor).await?),
        }
    }

    /// 开启请求上下文
    pub fn begin_request(&self) -> ScopeHandle {
        self.request.begin()
    }

    /// 开启会话上下文
    pub fn begin_session(&self) -> ScopeHandle {
        self.session.begin()
    }

    /// 结束指定上下文并销毁其实例
    pub async fn end(
        &self,
        handle: &ScopeHandle,
        disposer: &dyn InstanceDisposer,
    ) -> ContextResult<()> {
        match handle.kind {
            ScopeKind::Request => self.request.destroy(Some(handle.id), disposer).await,
            ScopeKind::Session => self.session.destroy(Some(handle.id), disposer).await,
            other => {
                warn!("试图结束不支持的上下文类型: {other}");
                Err(ContextError::ContextNotActive {
                    scope: other.to_string(),
                })
            }
        }
    }

    /// 检查指定作用域上下文是否激活
    pub fn is_active(&self, kind: ScopeKind, owner: Option<Uuid>) -> bool {
        match kind {
            ScopeKind::Application => self.application.is_active(owner),
            ScopeKind::Request => self.request.is_active(owner),
            ScopeKind::Session => self.session.is_active(owner),
            ScopeKind::Dependent => true,
        }
    }

    /// 关闭全部上下文
    ///
    /// 先销毁请求与会话上下文，最后销毁应用上下文；重复关闭是幂等的
    pub async fn shutdown(&self, disposer: &dyn InstanceDisposer) {
        self.request.destroy_all(disposer).await;
        self.session.destroy_all(disposer).await;
        let _ = self.application.destroy(None, disposer).await;
    }
}

impl Default for ScopeContextManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex as PlMutex;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// 计数构造器：可配置前若干次构造失败
    struct CountingConstructor {
        created: AtomicUsize,
        fail_first: usize,
        delay: Duration,
    }

    impl CountingConstructor {
        fn new(fail_first: usize, delay: Duration) -> Self {
            Self {
                created: AtomicUsize::new(0),
                fail_first,
                delay,
            }
        }
    }

    #[async_trait]
    impl ContextualConstructor for CountingConstructor {
        async fn construct(
            &self,
            descriptor: &ComponentDescriptor,
        ) -> Result<BeanInstance, ConstructionError> {
            tokio::time::sleep(self.delay).await;
            let attempt = self.created.fetch_add(1, Ordering::SeqCst);
            if attempt < self.fail_first {
                return Err(ConstructionError::creation_failed(
                    descriptor.id.path(),
                    anyhow::anyhow!("构造注定失败"),
                ));
            }
            Ok(Arc::new(attempt) as BeanInstance)
        }
    }

    /// 记录销毁顺序的销毁器
    #[derive(Default)]
    struct RecordingDisposer {
        order: PlMutex<Vec<String>>,
    }

    #[async_trait]
    impl InstanceDisposer for RecordingDisposer {
        async fn dispose(&self, descriptor_id: &TypeKey, _instance: BeanInstance) {
            self.order.lock().push(descriptor_id.path().to_string());
        }
    }

    fn app_component(id: &str) -> ComponentDescriptor {
        ComponentDescriptor::new(id, ScopeKind::Application)
    }

    #[tokio::test]
    async fn test_concurrent_obtain_constructs_exactly_once() {
        let ctx = Arc::new(ApplicationContext::new());
        let ctor = Arc::new(CountingConstructor::new(0, Duration::from_millis(20)));
        let descriptor = Arc::new(app_component("a::Service"));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let ctx = ctx.clone();
            let ctor = ctor.clone();
            let descriptor = descriptor.clone();
            handles.push(tokio::spawn(async move {
                ctx.obtain(&descriptor, None, ctor.as_ref()).await.unwrap()
            }));
        }

        let mut instances = Vec::new();
        for handle in handles {
            instances.push(handle.await.unwrap());
        }

        assert_eq!(ctor.created.load(Ordering::SeqCst), 1);
        let first = instances[0].clone();
        assert!(instances.iter().all(|i| Arc::ptr_eq(i, &first)));
    }

    #[tokio::test]
    async fn test_failure_leaves_slot_absent_and_retries() {
        let ctx = ApplicationContext::new();
        let ctor = CountingConstructor::new(1, Duration::ZERO);
        let descriptor = app_component("a::Flaky");

        let first = ctx.obtain(&descriptor, None, &ctor).await;
        assert!(matches!(first, Err(ContainerError::Construction { .. })));

        let second = ctx.obtain(&descriptor, None, &ctor).await.unwrap();
        assert_eq!(*second.downcast::<usize>().unwrap(), 1);
        assert_eq!(ctor.created.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_callers_fail_together() {
        let ctx = Arc::new(ApplicationContext::new());
        let ctor = Arc::new(CountingConstructor::new(usize::MAX, Duration::from_millis(20)));
        let descriptor = Arc::new(app_component("a::Broken"));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let ctx = ctx.clone();
            let ctor = ctor.clone();
            let descriptor = descriptor.clone();
            handles.push(tokio::spawn(async move {
                ctx.obtain(&descriptor, None, ctor.as_ref()).await
            }));
        }

        for handle in handles {
            assert!(handle.await.unwrap().is_err());
        }
        assert_eq!(ctor.created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_destroy_disposes_in_reverse_creation_order() {
        let ctx = ApplicationContext::new();
        let ctor = CountingConstructor::new(0, Duration::ZERO);

        for id in ["a::First", "b::Second", "c::Third"] {
            ctx.obtain(&app_component(id), None, &ctor).await.unwrap();
        }

        let disposer = RecordingDisposer::default();
        ctx.destroy(None, &disposer).await.unwrap();
        assert_eq!(
            *disposer.order.lock(),
            vec!["c::Third", "b::Second", "a::First"]
        );

        // 幂等：再次销毁不重复调用销毁器
        ctx.destroy(None, &disposer).await.unwrap();
        assert_eq!(disposer.order.lock().len(), 3);
    }

    #[tokio::test]
    async fn test_obtain_after_destroy_is_rejected() {
        let ctx = ApplicationContext::new();
        let ctor = CountingConstructor::new(0, Duration::ZERO);
        ctx.destroy(None, &RecordingDisposer::default()).await.unwrap();

        let result = ctx.obtain(&app_component("a::Late"), None, &ctor).await;
        assert!(matches!(
            result,
            Err(ContainerError::Context {
                source: ContextError::ContextNotActive { .. }
            })
        ));
    }

    #[tokio::test]
    async fn test_keyed_context_isolated_per_owner() {
        let ctx = KeyedScopeContext::new(ScopeKind::Request);
        let ctor = CountingConstructor::new(0, Duration::ZERO);
        let descriptor = ComponentDescriptor::new("a::PerRequest", ScopeKind::Request);

        let first = ctx.begin();
        let second = ctx.begin();

        let a = ctx.obtain(&descriptor, Some(first.id), &ctor).await.unwrap();
        let b = ctx.obtain(&descriptor, Some(second.id), &ctor).await.unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(ctor.created.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_keyed_context_unknown_owner() {
        let ctx = KeyedScopeContext::new(ScopeKind::Request);
        let ctor = CountingConstructor::new(0, Duration::ZERO);
        let descriptor = ComponentDescriptor::new("a::PerRequest", ScopeKind::Request);

        let result = ctx.obtain(&descriptor, Some(Uuid::new_v4()), &ctor).await;
        assert!(matches!(
            result,
            Err(ContainerError::Context {
                source: ContextError::UnknownOwner { .. }
            })
        ));
    }

    #[tokio::test]
    async fn test_dependent_scope_constructs_fresh_each_time() {
        let manager = ScopeContextManager::new();
        let ctor = CountingConstructor::new(0, Duration::ZERO);
        let descriptor = ComponentDescriptor::new("a::Transient", ScopeKind::Dependent);

        let a = manager.obtain(&descriptor, None, &ctor).await.unwrap();
        let b = manager.obtain(&descriptor, None, &ctor).await.unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(ctor.created.load(Ordering::SeqCst), 2);
    }
}
