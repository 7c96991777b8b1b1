//! 容器启动与解析入口
//!
//! 容器是显式对象：启动流程构建不可变注册表与上下文管理器，
//! 解析与获取调用都通过容器实例进行，不存在环境全局状态

use crate::context::ScopeContextManager;
use crate::dispatcher::LifecycleEventDispatcher;
use crate::graph::{validate_producers, DependencyGraph};
use crate::interceptor::{ChainBuilder, WrapFn};
use crate::proxy::{ContextualSource, ProxyFactory};
use crate::registry::BeanRegistry;
use crate::resolver::TypesafeResolver;
use crate::veto::filter_vetoed;
use async_trait::async_trait;
use bean_abstractions::{
    BeanHandle, BeanInstance, BeanProducer, BeanResolver, ContainerExtension,
    ContextualConstructor, CreationContext, InstanceDisposer, ResolutionOutcome,
    ResolvedDependency, ScopeHandle,
};
use container_common::{
    Cardinality, ComponentDescriptor, ConstructionError, ConstructionResult, ContainerResult,
    ContextResult, DeploymentResult, PackagePath, Qualifier, ResolutionError, TypeKey,
};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::{info, warn};
use uuid::Uuid;

/// 引擎核心
///
/// 启动完成后注册表与解析器均不可变，可被并发只读访问；
/// 代理通过弱引用回到引擎，实例图不反向拥有引擎
struct EngineCore {
    registry: Arc<BeanRegistry>,
    resolver: TypesafeResolver,
    chain: ChainBuilder,
    producers: HashMap<TypeKey, Arc<dyn BeanProducer>>,
    contexts: ScopeContextManager,
    weak_self: Weak<EngineCore>,
}

impl EngineCore {
    /// 构造指定组件的实例：解析依赖、调用生产者并套上拦截器链
    fn build_instance<'a>(
        &'a self,
        descriptor: &'a ComponentDescriptor,
        owner: Option<Uuid>,
    ) -> BoxFuture<'a, ConstructionResult<BeanInstance>> {
        Box::pin(async move {
            let dependencies = self.resolve_dependencies(descriptor, owner).await?;
            let ctx = CreationContext::new(dependencies);

            let producer = self.producers.get(&descriptor.id).ok_or_else(|| {
                ConstructionError::creation_failed(
                    descriptor.id.path(),
                    anyhow::anyhow!("生产者缺失"),
                )
            })?;

            let raw = producer
                .create(&ctx)
                .await
                .map_err(|e| ConstructionError::creation_failed(descriptor.id.path(), e))?;

            Ok(self.chain.wrap(raw, descriptor))
        })
    }

    /// 按注入点声明顺序解析依赖
    ///
    /// 普通作用域依赖交付延迟代理；依赖作用域依赖在注入点立即构造
    async fn resolve_dependencies(
        &self,
        descriptor: &ComponentDescriptor,
        owner: Option<Uuid>,
    ) -> ConstructionResult<Vec<ResolvedDependency>> {
        let mut resolved = Vec::with_capacity(descriptor.injection_points.len());

        for point in &descriptor.injection_points {
            match point.cardinality {
                Cardinality::Single => {
                    let target = self
                        .resolver
                        .resolve(&point.required_type, &point.qualifiers)
                        .into_result(&point.required_type, &point.qualifiers)
                        .map_err(|e| {
                            ConstructionError::creation_failed(
                                descriptor.id.path(),
                                anyhow::Error::new(e),
                            )
                        })?;
                    let handle = self.handle_for(&target, owner).await?;
                    resolved.push(ResolvedDependency::Single(handle));
                }
                Cardinality::Optional => {
                    match self.resolver.resolve(&point.required_type, &point.qualifiers) {
                        ResolutionOutcome::Unique(target) => {
                            let handle = self.handle_for(&target, owner).await?;
                            resolved.push(ResolvedDependency::Optional(Some(handle)));
                        }
                        ResolutionOutcome::Unsatisfied => {
                            resolved.push(ResolvedDependency::Optional(None));
                        }
                        outcome @ ResolutionOutcome::Ambiguous(_) => {
                            let err = outcome
                                .into_result(&point.required_type, &point.qualifiers)
                                .unwrap_err();
                            return Err(ConstructionError::creation_failed(
                                descriptor.id.path(),
                                anyhow::Error::new(err),
                            ));
                        }
                    }
                }
                Cardinality::Collection => {
                    let targets = self
                        .resolver
                        .resolve_all(&point.required_type, &point.qualifiers);
                    let mut handles = Vec::with_capacity(targets.len());
                    for target in &targets {
                        handles.push(self.handle_for(target, owner).await?);
                    }
                    resolved.push(ResolvedDependency::Collection(handles));
                }
            }
        }

        Ok(resolved)
    }

    /// 为解析出的目标组件生成依赖句柄
    async fn handle_for(
        &self,
        target: &Arc<ComponentDescriptor>,
        owner: Option<Uuid>,
    ) -> ConstructionResult<BeanHandle> {
        if target.scope.is_normal() {
            let source = self.weak_self.clone() as Weak<dyn ContextualSource>;
            Ok(ProxyFactory::create(target, owner, source))
        } else {
            let instance = self.build_instance(target, owner).await?;
            Ok(BeanHandle::Ready(instance))
        }
    }
}

/// 携带上下文标识的构造适配器
struct EngineConstructor<'a> {
    engine: &'a EngineCore,
    owner: Option<Uuid>,
}

#[async_trait]
impl ContextualConstructor for EngineConstructor<'_> {
    async fn construct(
        &self,
        descriptor: &ComponentDescriptor,
    ) -> ConstructionResult<BeanInstance> {
        self.engine.build_instance(descriptor, self.owner).await
    }
}

#[async_trait]
impl ContextualSource for EngineCore {
    async fn obtain_contextual(
        &self,
        descriptor_id: &TypeKey,
        owner: Option<Uuid>,
    ) -> ContainerResult<BeanInstance> {
        let descriptor = self
            .registry
            .descriptor(descriptor_id)
            .ok_or_else(|| ResolutionError::NoSuchBean {
                type_key: descriptor_id.path().to_string(),
            })?
            .clone();
        let constructor = EngineConstructor {
            engine: self,
            owner,
        };
        self.contexts.obtain(&descriptor, owner, &constructor).await
    }
}

#[async_trait]
impl InstanceDisposer for EngineCore {
    async fn dispose(&self, descriptor_id: &TypeKey, instance: BeanInstance) {
        if let Some(producer) = self.producers.get(descriptor_id) {
            if let Err(e) = producer.dispose(instance).await {
                warn!("组件销毁失败: {descriptor_id}, 原因: {e}");
            }
        }
    }
}

/// 组件容器
///
/// 外部注入点消费方只使用两个入口：[`BeanContainer::resolve`] 与
/// [`BeanContainer::obtain`]；上下文边界通过 begin/end 显式划定
pub struct BeanContainer {
    engine: Arc<EngineCore>,
}

impl std::fmt::Debug for BeanContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeanContainer").finish_non_exhaustive()
    }
}

impl BeanContainer {
    /// 创建容器构建器
    pub fn builder() -> BeanContainerBuilder {
        BeanContainerBuilder::new()
    }

    /// 解析要求的类型与限定符
    pub fn resolve(&self, required: &TypeKey, qualifiers: &[Qualifier]) -> ResolutionOutcome {
        self.engine.resolver.resolve(required, qualifiers)
    }

    /// 解析全部匹配候选
    pub fn resolve_all(
        &self,
        required: &TypeKey,
        qualifiers: &[Qualifier],
    ) -> Vec<Arc<ComponentDescriptor>> {
        self.engine.resolver.resolve_all(required, qualifiers)
    }

    /// 获取指定组件的实例句柄
    ///
    /// 普通作用域组件返回延迟代理，首次使用时才触发构造；
    /// 依赖作用域组件立即构造全新实例
    pub async fn obtain(
        &self,
        descriptor_id: &TypeKey,
        owner: Option<&ScopeHandle>,
    ) -> ContainerResult<BeanHandle> {
        let descriptor = self
            .engine
            .registry
            .descriptor(descriptor_id)
            .ok_or_else(|| ResolutionError::NoSuchBean {
                type_key: descriptor_id.path().to_string(),
            })?
            .clone();
        let owner = owner.map(|h| h.id);

        if descriptor.scope.is_normal() {
            let source = self.engine.weak_self.clone() as Weak<dyn ContextualSource>;
            Ok(ProxyFactory::create(&descriptor, owner, source))
        } else {
            let instance = self.engine.build_instance(&descriptor, owner).await?;
            Ok(BeanHandle::Ready(instance))
        }
    }

    /// 解析唯一候选并获取其实例句柄
    pub async fn obtain_unique(
        &self,
        required: &TypeKey,
        qualifiers: &[Qualifier],
        owner: Option<&ScopeHandle>,
    ) -> ContainerResult<BeanHandle> {
        let descriptor = self
            .resolve(required, qualifiers)
            .into_result(required, qualifiers)?;
        self.obtain(&descriptor.id, owner).await
    }

    /// 开启请求上下文
    pub fn begin_request(&self) -> ScopeHandle {
        self.engine.contexts.begin_request()
    }

    /// 开启会话上下文
    pub fn begin_session(&self) -> ScopeHandle {
        self.engine.contexts.begin_session()
    }

    /// 结束指定上下文并销毁其实例
    pub async fn end_scope(&self, handle: &ScopeHandle) -> ContextResult<()> {
        self.engine
            .contexts
            .end(handle, self.engine.as_ref())
            .await
    }

    /// 关闭容器
    ///
    /// 销毁全部上下文实例；重复关闭是幂等的
    pub async fn shutdown(&self) {
        info!("关闭容器");
        self.engine.contexts.shutdown(self.engine.as_ref()).await;
    }

    /// 只读访问组件注册表
    pub fn registry(&self) -> &BeanRegistry {
        &self.engine.registry
    }
}

/// 容器构建器
///
/// 收集描述符、包排除标记、生产者、扩展与拦截器注册，
/// `boot` 执行完整的启动流程并返回不可变容器
#[derive(Default)]
pub struct BeanContainerBuilder {
    descriptors: Vec<ComponentDescriptor>,
    markers: Vec<PackagePath>,
    producers: HashMap<TypeKey, Arc<dyn BeanProducer>>,
    extensions: Vec<Box<dyn ContainerExtension>>,
    chain: ChainBuilder,
}

impl BeanContainerBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册组件描述符及其生产者
    pub fn register_component(
        mut self,
        descriptor: ComponentDescriptor,
        producer: Arc<dyn BeanProducer>,
    ) -> Self {
        self.producers.insert(descriptor.id.clone(), producer);
        self.descriptors.push(descriptor);
        self
    }

    /// 注册生产者
    ///
    /// 供扩展在发现阶段新增的描述符使用
    pub fn register_producer(
        mut self,
        descriptor_id: impl Into<TypeKey>,
        producer: Arc<dyn BeanProducer>,
    ) -> Self {
        self.producers.insert(descriptor_id.into(), producer);
        self
    }

    /// 登记包级排除标记
    pub fn veto_package(mut self, package: impl Into<PackagePath>) -> Self {
        self.markers.push(package.into());
        self
    }

    /// 注册容器扩展
    pub fn register_extension(mut self, extension: Box<dyn ContainerExtension>) -> Self {
        self.extensions.push(extension);
        self
    }

    /// 注册拦截器
    pub fn register_interceptor(
        mut self,
        name: impl Into<String>,
        bindings: Vec<Qualifier>,
        priority: i32,
        wrap: WrapFn,
    ) -> Self {
        self.chain.register_interceptor(name, bindings, priority, wrap);
        self
    }

    /// 注册装饰器
    pub fn register_decorator(
        mut self,
        name: impl Into<String>,
        delegate_type: impl Into<TypeKey>,
        wrap: WrapFn,
    ) -> Self {
        self.chain.register_decorator(name, delegate_type, wrap);
        self
    }

    /// 启动容器
    ///
    /// 单线程执行：排除过滤、阶段事件、注册表构建与全部校验；
    /// 所有致命问题聚合为一份部署错误报告
    pub fn boot(self) -> DeploymentResult<BeanContainer> {
        info!("开始启动容器, 共 {} 个候选组件", self.descriptors.len());
        let mut dispatcher = LifecycleEventDispatcher::new(self.extensions);

        dispatcher.before_discovery()?;

        // 被排除的类型不触发任何后续发现事件
        let (kept, vetoed) = filter_vetoed(self.descriptors, &self.markers);
        if !vetoed.is_empty() {
            info!("排除 {} 个组件", vetoed.len());
        }

        let processed = dispatcher.process_types(kept)?;
        let additions = dispatcher.after_discovery()?;

        // 扩展新增的描述符同样经过排除过滤
        let (additions, _) = filter_vetoed(additions, &self.markers);
        let mut candidates = processed;
        candidates.extend(additions);

        let (registry, registry_errors) = BeanRegistry::build(candidates);
        let registry = Arc::new(registry);
        dispatcher.report_definition_errors(registry_errors);

        let resolver = TypesafeResolver::new(registry.clone());
        dispatcher.report_definition_errors(validate_producers(&registry, |id| {
            self.producers.contains_key(id)
        }));

        let (graph, graph_errors) = DependencyGraph::build(&registry, &resolver);
        dispatcher.report_definition_errors(graph_errors);
        dispatcher.report_definition_errors(graph.validate_cycles());

        dispatcher.validate()?;
        dispatcher.after_validation(registry.len());

        let producers = self.producers;
        let chain = self.chain;
        let engine = Arc::new_cyclic(|weak| EngineCore {
            registry,
            resolver,
            chain,
            producers,
            contexts: ScopeContextManager::new(),
            weak_self: weak.clone(),
        });

        info!("容器启动完成, 注册了 {} 个组件", engine.registry.len());
        Ok(BeanContainer { engine })
    }
}
