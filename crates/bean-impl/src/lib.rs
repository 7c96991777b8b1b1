//! # 组件发现与类型安全解析引擎
//!
//! 这个 crate 是 Silo 容器的具体实现：消费外部扫描器产出的组件
//! 描述符与包排除标记，构建可解析、可查询的组件注册表，并管理
//! 各作用域的实例生命周期。
//!
//! ## 主要功能
//!
//! - **排除过滤**: 类型级与包级排除标记，类型级覆盖优先
//! - **组件注册表**: 启动期单遍构建，之后无锁并发只读
//! - **类型安全解析**: 可赋值性与限定符精确匹配，备选优先、
//!   其次声明优先级的歧义收窄
//! - **作用域上下文**: 同一 (组件, 上下文) 至多构造一次，失败不缓存
//! - **客户端代理**: 普通作用域的延迟物化，打破构造期循环依赖
//! - **拦截器与装饰器链**: 按优先级与声明顺序包裹实例
//! - **生命周期事件**: 固定顺序的启动阶段，问题聚合后一次性报告
//!
//! ## 基本使用
//!
//! ```rust,no_run
//! use bean_abstractions::{BeanInstance, FnProducer};
//! use bean_impl::BeanContainer;
//! use container_common::{ComponentDescriptor, ScopeKind, TypeKey};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let container = BeanContainer::builder()
//!         .register_component(
//!             ComponentDescriptor::new("billing::CardProcessor", ScopeKind::Application)
//!                 .with_bean_type("billing::api::PaymentGateway"),
//!             Arc::new(FnProducer::new(|_ctx| {
//!                 Ok(Arc::new("gateway".to_string()) as BeanInstance)
//!             })),
//!         )
//!         .boot()?;
//!
//!     let handle = container
//!         .obtain_unique(&TypeKey::new("billing::api::PaymentGateway"), &[], None)
//!         .await?;
//!     let gateway = handle.get_as::<String>().await?;
//!     println!("已解析: {gateway}");
//!
//!     container.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod container;
pub mod context;
pub mod dispatcher;
pub mod graph;
pub mod interceptor;
pub mod proxy;
pub mod registry;
pub mod resolver;
pub mod veto;

pub use container::{BeanContainer, BeanContainerBuilder};
pub use context::{ApplicationContext, KeyedScopeContext, ScopeContextManager};
pub use dispatcher::LifecycleEventDispatcher;
pub use graph::DependencyGraph;
pub use interceptor::{ChainBuilder, DecoratorRegistration, InterceptorRegistration, WrapFn};
pub use proxy::{ClientProxy, ContextualSource, ProxyFactory};
pub use registry::BeanRegistry;
pub use resolver::TypesafeResolver;
pub use veto::{effective_veto, filter_vetoed};
