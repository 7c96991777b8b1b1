//! 客户端代理
//!
//! 普通作用域组件的引用在目标实例存在之前即可交付；代理在首次
//! 使用时通过作用域上下文管理器解析目标并缓存。代理持有的引擎
//! 引用是弱引用，实例图不会反向拥有引擎

use async_trait::async_trait;
use bean_abstractions::{BeanHandle, BeanInstance, DeferredInstance};
use container_common::{ComponentDescriptor, ContainerResult, ContextError, TypeKey};
use std::sync::{Arc, Weak};
use tokio::sync::OnceCell;
use tracing::trace;
use uuid::Uuid;

/// 上下文实例来源
///
/// 代理物化时回调的引擎侧接口；物化遵循与上下文获取相同的
/// 至多一次构造保证
#[async_trait]
pub trait ContextualSource: Send + Sync {
    /// 获取指定组件的上下文实例
    async fn obtain_contextual(
        &self,
        descriptor_id: &TypeKey,
        owner: Option<Uuid>,
    ) -> ContainerResult<BeanInstance>;
}

/// 客户端代理
///
/// 包装组件身份与延迟解析回调，自身永不持有业务状态
pub struct ClientProxy {
    descriptor_id: TypeKey,
    owner: Option<Uuid>,
    source: Weak<dyn ContextualSource>,
    target: OnceCell<BeanInstance>,
}

impl ClientProxy {
    /// 创建新的客户端代理
    pub fn new(
        descriptor_id: TypeKey,
        owner: Option<Uuid>,
        source: Weak<dyn ContextualSource>,
    ) -> Self {
        Self {
            descriptor_id,
            owner,
            source,
            target: OnceCell::new(),
        }
    }
}

#[async_trait]
impl DeferredInstance for ClientProxy {
    async fn materialize(&self) -> ContainerResult<BeanInstance> {
        let instance = self
            .target
            .get_or_try_init(|| async {
                trace!("物化代理目标: {}", self.descriptor_id);
                let source = self
                    .source
                    .upgrade()
                    .ok_or(ContextError::ContainerShutdown)?;
                source
                    .obtain_contextual(&self.descriptor_id, self.owner)
                    .await
            })
            .await?;
        Ok(instance.clone())
    }

    fn descriptor_id(&self) -> &TypeKey {
        &self.descriptor_id
    }
}

/// 代理工厂
///
/// 仅普通作用域组件会被代理；依赖作用域组件在注入点立即构造
#[derive(Debug, Default)]
pub struct ProxyFactory;

impl ProxyFactory {
    /// 为普通作用域组件创建延迟句柄
    pub fn create(
        descriptor: &ComponentDescriptor,
        owner: Option<Uuid>,
        source: Weak<dyn ContextualSource>,
    ) -> BeanHandle {
        debug_assert!(descriptor.scope.is_normal(), "依赖作用域组件不可代理");
        BeanHandle::Deferred(Arc::new(ClientProxy::new(
            descriptor.id.clone(),
            owner,
            source,
        )))
    }
}
