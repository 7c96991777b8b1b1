//! 组件发现与解析引擎的集成测试

use async_trait::async_trait;
use bean_abstractions::{
    AfterDiscoveryContext, BeanHandle, BeanInstance, BeanProducer, ContainerExtension,
    CreationContext, FnProducer, ProcessTypeContext, ResolutionOutcome,
};
use bean_impl::{BeanContainer, WrapFn};
use container_common::{
    Cardinality, ComponentDescriptor, ContainerError, DefinitionError, DeploymentProblem,
    InjectionPoint, Qualifier, ScopeKind, TypeKey, VetoOverride,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const GATEWAY: &str = "billing::api::PaymentGateway";

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// 返回固定字符串实例的生产者
fn string_producer(value: &str) -> Arc<dyn BeanProducer> {
    let value = value.to_string();
    Arc::new(FnProducer::new(move |_ctx| {
        Ok(Arc::new(value.clone()) as BeanInstance)
    }))
}

fn gateway_component(id: &str) -> ComponentDescriptor {
    ComponentDescriptor::new(id, ScopeKind::Application).with_bean_type(GATEWAY)
}

#[tokio::test]
async fn test_vetoed_package_components_are_absent() {
    init_tracing();
    let container = BeanContainer::builder()
        .veto_package("legacy")
        .register_component(
            ComponentDescriptor::new("legacy::OldGateway", ScopeKind::Application),
            string_producer("old"),
        )
        .register_component(
            ComponentDescriptor::new("legacy::deep::Helper", ScopeKind::Application),
            string_producer("helper"),
        )
        .register_component(
            ComponentDescriptor::new("billing::Active", ScopeKind::Application),
            string_producer("active"),
        )
        .boot()
        .unwrap();

    assert!(container.registry().descriptor(&TypeKey::new("legacy::OldGateway")).is_none());
    assert!(container
        .registry()
        .descriptor(&TypeKey::new("legacy::deep::Helper"))
        .is_none());
    assert!(container.registry().descriptor(&TypeKey::new("billing::Active")).is_some());
}

#[tokio::test]
async fn test_explicit_non_veto_override_survives_vetoed_package() {
    let container = BeanContainer::builder()
        .veto_package("legacy")
        .register_component(
            ComponentDescriptor::new("legacy::StillNeeded", ScopeKind::Application)
                .with_veto(VetoOverride::NotVetoed),
            string_producer("kept"),
        )
        .register_component(
            ComponentDescriptor::new("legacy::Dropped", ScopeKind::Application),
            string_producer("dropped"),
        )
        .boot()
        .unwrap();

    assert!(container
        .registry()
        .descriptor(&TypeKey::new("legacy::StillNeeded"))
        .is_some());
    assert!(container.registry().descriptor(&TypeKey::new("legacy::Dropped")).is_none());
}

#[tokio::test]
async fn test_unsatisfied_resolution() {
    let container = BeanContainer::builder()
        .register_component(gateway_component("billing::CardProcessor"), string_producer("card"))
        .boot()
        .unwrap();

    let outcome = container.resolve(&TypeKey::new("billing::api::RefundGateway"), &[]);
    assert!(matches!(outcome, ResolutionOutcome::Unsatisfied));
}

#[tokio::test]
async fn test_equal_priority_alternatives_are_ambiguous() {
    let container = BeanContainer::builder()
        .register_component(
            gateway_component("billing::MockA").with_alternative(true).with_priority(7),
            string_producer("a"),
        )
        .register_component(
            gateway_component("billing::MockB").with_alternative(true).with_priority(7),
            string_producer("b"),
        )
        .boot()
        .unwrap();

    match container.resolve(&TypeKey::new(GATEWAY), &[]) {
        ResolutionOutcome::Ambiguous(candidates) => {
            let ids: Vec<_> = candidates.iter().map(|d| d.id.path()).collect();
            assert_eq!(ids, vec!["billing::MockA", "billing::MockB"]);
        }
        other => panic!("期望歧义结果, 实际: {other:?}"),
    }
}

#[tokio::test]
async fn test_higher_priority_candidate_wins() {
    let container = BeanContainer::builder()
        .register_component(gateway_component("billing::Slow").with_priority(1), string_producer("slow"))
        .register_component(gateway_component("billing::Fast").with_priority(9), string_producer("fast"))
        .boot()
        .unwrap();

    let outcome = container.resolve(&TypeKey::new(GATEWAY), &[]);
    assert_eq!(outcome.unique().unwrap().id.path(), "billing::Fast");
}

/// 互相依赖的普通作用域组件，通过延迟句柄持有对方
#[derive(Clone)]
struct LinkedService {
    label: String,
    peer: BeanHandle,
}

fn linked_producer(label: &str) -> Arc<dyn BeanProducer> {
    let label = label.to_string();
    Arc::new(FnProducer::new(move |ctx: &CreationContext| {
        Ok(Arc::new(LinkedService {
            label: label.clone(),
            peer: ctx.dependency(0)?.clone(),
        }) as BeanInstance)
    }))
}

#[tokio::test]
async fn test_normal_scope_cycle_boots_and_materializes() {
    init_tracing();
    let container = BeanContainer::builder()
        .register_component(
            ComponentDescriptor::new("cycle::Alpha", ScopeKind::Application)
                .with_injection_point(InjectionPoint::new("cycle::Beta")),
            linked_producer("alpha"),
        )
        .register_component(
            ComponentDescriptor::new("cycle::Beta", ScopeKind::Application)
                .with_injection_point(InjectionPoint::new("cycle::Alpha")),
            linked_producer("beta"),
        )
        .boot()
        .unwrap();

    let alpha_handle = container.obtain(&TypeKey::new("cycle::Alpha"), None).await.unwrap();
    let alpha = alpha_handle.get_as::<LinkedService>().await.unwrap();
    assert_eq!(alpha.label, "alpha");

    // 构造函数全部返回之后，循环边在首次使用时物化
    let beta = alpha.peer.get_as::<LinkedService>().await.unwrap();
    assert_eq!(beta.label, "beta");

    let alpha_again = beta.peer.get_as::<LinkedService>().await.unwrap();
    assert!(Arc::ptr_eq(&alpha, &alpha_again));
}

#[tokio::test]
async fn test_cycle_through_dependent_component_fails_boot() {
    let err = BeanContainer::builder()
        .register_component(
            ComponentDescriptor::new("cycle::Alpha", ScopeKind::Application)
                .with_injection_point(InjectionPoint::new("cycle::Fresh")),
            linked_producer("alpha"),
        )
        .register_component(
            ComponentDescriptor::new("cycle::Fresh", ScopeKind::Dependent)
                .with_injection_point(InjectionPoint::new("cycle::Alpha")),
            linked_producer("fresh"),
        )
        .boot()
        .unwrap_err();

    let cycle_members: Vec<String> = err
        .problems
        .iter()
        .find_map(|p| match p {
            DeploymentProblem::Definition(DefinitionError::IllegalCycle { members, .. }) => {
                Some(members.clone())
            }
            _ => None,
        })
        .expect("应报告非法循环");

    assert!(cycle_members.contains(&"cycle::Alpha".to_string()));
    assert!(cycle_members.contains(&"cycle::Fresh".to_string()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_obtain_constructs_once() {
    let created = Arc::new(AtomicUsize::new(0));
    let counter = created.clone();
    let producer = Arc::new(FnProducer::new(move |_ctx| {
        counter.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(10));
        Ok(Arc::new("singleton".to_string()) as BeanInstance)
    }));

    let container = Arc::new(
        BeanContainer::builder()
            .register_component(
                ComponentDescriptor::new("app::Shared", ScopeKind::Application),
                producer,
            )
            .boot()
            .unwrap(),
    );

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let container = container.clone();
        tasks.push(tokio::spawn(async move {
            let handle = container.obtain(&TypeKey::new("app::Shared"), None).await.unwrap();
            handle.get_as::<String>().await.unwrap()
        }));
    }

    let mut instances = Vec::new();
    for task in tasks {
        instances.push(task.await.unwrap());
    }

    assert_eq!(created.load(Ordering::SeqCst), 1);
    let first = instances[0].clone();
    assert!(instances.iter().all(|i| Arc::ptr_eq(i, &first)));
}

#[tokio::test]
async fn test_construction_failure_is_not_cached() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    let producer = Arc::new(FnProducer::new(move |_ctx| {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            anyhow::bail!("首次构造注定失败");
        }
        Ok(Arc::new("recovered".to_string()) as BeanInstance)
    }));

    let container = BeanContainer::builder()
        .register_component(
            ComponentDescriptor::new("app::Flaky", ScopeKind::Application),
            producer,
        )
        .boot()
        .unwrap();

    let handle = container.obtain(&TypeKey::new("app::Flaky"), None).await.unwrap();
    assert!(matches!(
        handle.get().await,
        Err(ContainerError::Construction { .. })
    ));

    // 失败不缓存，重新获取会再次构造
    let retry = container.obtain(&TypeKey::new("app::Flaky"), None).await.unwrap();
    let value = retry.get_as::<String>().await.unwrap();
    assert_eq!(*value, "recovered");
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

/// 记录包裹层次的测试实例，外层在前
struct Layered {
    layers: Vec<String>,
}

fn layer_wrap(label: &str) -> WrapFn {
    let label = label.to_string();
    Arc::new(move |inner: BeanInstance| {
        let inner = inner.downcast::<Layered>().expect("测试实例类型固定");
        let mut layers = vec![label.clone()];
        layers.extend(inner.layers.iter().cloned());
        Arc::new(Layered { layers }) as BeanInstance
    })
}

#[tokio::test]
async fn test_interceptor_and_decorator_chain_order() {
    let container = BeanContainer::builder()
        .register_component(
            gateway_component("billing::Gateway")
                .with_interceptor_binding(Qualifier::new("audited")),
            Arc::new(FnProducer::new(|_ctx| {
                Ok(Arc::new(Layered {
                    layers: vec!["raw".to_string()],
                }) as BeanInstance)
            })),
        )
        .register_interceptor("metrics", vec![Qualifier::new("audited")], 200, layer_wrap("metrics"))
        .register_interceptor("security", vec![Qualifier::new("audited")], 100, layer_wrap("security"))
        .register_decorator("cache", GATEWAY, layer_wrap("cache"))
        .boot()
        .unwrap();

    let handle = container.obtain(&TypeKey::new("billing::Gateway"), None).await.unwrap();
    let instance = handle.get_as::<Layered>().await.unwrap();
    assert_eq!(instance.layers, vec!["security", "metrics", "cache", "raw"]);
}

/// 记录销毁顺序的生产者
struct DisposalTracker {
    label: String,
    disposed: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl BeanProducer for DisposalTracker {
    async fn create(&self, _ctx: &CreationContext) -> anyhow::Result<BeanInstance> {
        Ok(Arc::new(self.label.clone()) as BeanInstance)
    }

    async fn dispose(&self, _instance: BeanInstance) -> anyhow::Result<()> {
        self.disposed.lock().push(self.label.clone());
        Ok(())
    }
}

#[tokio::test]
async fn test_request_scope_isolation_and_disposal() {
    let disposed = Arc::new(Mutex::new(Vec::new()));
    let container = BeanContainer::builder()
        .register_component(
            ComponentDescriptor::new("web::RequestState", ScopeKind::Request),
            Arc::new(DisposalTracker {
                label: "request-state".to_string(),
                disposed: disposed.clone(),
            }),
        )
        .boot()
        .unwrap();

    let first = container.begin_request();
    let second = container.begin_request();

    let a = container
        .obtain(&TypeKey::new("web::RequestState"), Some(&first))
        .await
        .unwrap()
        .get()
        .await
        .unwrap();
    let b = container
        .obtain(&TypeKey::new("web::RequestState"), Some(&second))
        .await
        .unwrap()
        .get()
        .await
        .unwrap();
    assert!(!Arc::ptr_eq(&a, &b));

    container.end_scope(&first).await.unwrap();
    assert_eq!(*disposed.lock(), vec!["request-state".to_string()]);

    // 重复结束是幂等的
    container.end_scope(&first).await.unwrap();
    assert_eq!(disposed.lock().len(), 1);

    // 已结束的上下文拒绝再次获取
    let late = container
        .obtain(&TypeKey::new("web::RequestState"), Some(&first))
        .await
        .unwrap()
        .get()
        .await;
    assert!(late.is_err());
}

#[tokio::test]
async fn test_optional_and_collection_injection() {
    let container = BeanContainer::builder()
        .register_component(gateway_component("billing::CardProcessor"), string_producer("card"))
        .register_component(gateway_component("billing::WalletProcessor"), string_producer("wallet"))
        .register_component(
            ComponentDescriptor::new("billing::Router", ScopeKind::Application)
                .with_injection_point(
                    InjectionPoint::new("billing::api::Missing")
                        .with_cardinality(Cardinality::Optional),
                )
                .with_injection_point(
                    InjectionPoint::new(GATEWAY).with_cardinality(Cardinality::Collection),
                ),
            Arc::new(FnProducer::new(|ctx: &CreationContext| {
                assert!(ctx.optional_dependency(0)?.is_none());
                let gateways = ctx.collection(1)?;
                Ok(Arc::new(gateways.len()) as BeanInstance)
            })),
        )
        .boot()
        .unwrap();

    let handle = container.obtain(&TypeKey::new("billing::Router"), None).await.unwrap();
    let count = handle.get_as::<usize>().await.unwrap();
    assert_eq!(*count, 2);
}

/// 在发现阶段排除与新增组件的测试扩展
struct ReshapingExtension;

impl ContainerExtension for ReshapingExtension {
    fn name(&self) -> &str {
        "reshaping"
    }

    fn process_type(&mut self, ctx: &mut ProcessTypeContext) {
        if ctx.descriptor().id.path() == "billing::Deprecated" {
            ctx.veto();
        }
    }

    fn after_discovery(&mut self, ctx: &mut AfterDiscoveryContext) {
        ctx.add_component(gateway_component("ext::Contributed"));
    }
}

#[tokio::test]
async fn test_extension_can_veto_and_contribute_components() {
    let container = BeanContainer::builder()
        .register_component(
            ComponentDescriptor::new("billing::Deprecated", ScopeKind::Application),
            string_producer("deprecated"),
        )
        .register_component(gateway_component("billing::CardProcessor"), string_producer("card"))
        .register_producer("ext::Contributed", string_producer("contributed"))
        .register_extension(Box::new(ReshapingExtension))
        .boot()
        .unwrap();

    assert!(container
        .registry()
        .descriptor(&TypeKey::new("billing::Deprecated"))
        .is_none());
    assert!(container.registry().descriptor(&TypeKey::new("ext::Contributed")).is_some());

    let handle = container
        .obtain(&TypeKey::new("ext::Contributed"), None)
        .await
        .unwrap();
    assert_eq!(*handle.get_as::<String>().await.unwrap(), "contributed");
}

#[tokio::test]
async fn test_boot_aggregates_all_definition_errors() {
    let err = BeanContainer::builder()
        .register_component(
            ComponentDescriptor::new("app::Twice", ScopeKind::Application),
            string_producer("first"),
        )
        .register_component(
            ComponentDescriptor::new("app::Twice", ScopeKind::Application),
            string_producer("second"),
        )
        .register_component(
            ComponentDescriptor::new("app::Hungry", ScopeKind::Application)
                .with_injection_point(InjectionPoint::new("app::Nowhere")),
            string_producer("hungry"),
        )
        .boot()
        .unwrap_err();

    // 重复定义与无法满足的注入点一次性报告
    assert_eq!(err.problems.len(), 2);
    let report = err.report();
    assert!(report.contains("app::Twice"));
    assert!(report.contains("app::Nowhere"));
}

#[tokio::test]
async fn test_obtain_after_shutdown_is_rejected() {
    let container = BeanContainer::builder()
        .register_component(
            ComponentDescriptor::new("app::Shared", ScopeKind::Application),
            string_producer("shared"),
        )
        .boot()
        .unwrap();

    container.shutdown().await;

    let handle = container.obtain(&TypeKey::new("app::Shared"), None).await.unwrap();
    assert!(handle.get().await.is_err());
}
