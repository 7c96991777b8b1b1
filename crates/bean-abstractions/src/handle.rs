//! 实例句柄与延迟物化抽象
//!
//! 普通作用域组件的引用可能在目标实例存在之前就被交付，
//! 句柄对调用方屏蔽直接实例与延迟代理之间的差别

use async_trait::async_trait;
use container_common::{ContainerError, ContainerResult, ResolutionError, TypeKey};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 类型擦除的组件实例
pub type BeanInstance = Arc<dyn Any + Send + Sync>;

/// 延迟物化实例
///
/// 间接抽象：真实实例与延迟解析包装器都满足同一套访问接口，
/// 包装器在首次使用时才解析目标，自身永不持有业务状态
#[async_trait]
pub trait DeferredInstance: Send + Sync {
    /// 物化目标实例
    ///
    /// 首次调用触发上下文实例的获取或构造，之后返回缓存的目标
    async fn materialize(&self) -> ContainerResult<BeanInstance>;

    /// 目标组件身份
    fn descriptor_id(&self) -> &TypeKey;
}

/// 组件实例句柄
///
/// 调用方无法观测到自己拿到的是直接实例还是延迟代理
#[derive(Clone)]
pub enum BeanHandle {
    /// 已物化的实例
    Ready(BeanInstance),
    /// 延迟物化的实例
    Deferred(Arc<dyn DeferredInstance>),
}

impl BeanHandle {
    /// 获取实例
    pub async fn get(&self) -> ContainerResult<BeanInstance> {
        match self {
            Self::Ready(instance) => Ok(instance.clone()),
            Self::Deferred(proxy) => proxy.materialize().await,
        }
    }

    /// 获取实例并转换为具体类型
    pub async fn get_as<T>(&self) -> ContainerResult<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let instance = self.get().await?;
        instance.downcast::<T>().map_err(|_| {
            ContainerError::from(ResolutionError::TypeMismatch {
                expected: std::any::type_name::<T>().to_string(),
            })
        })
    }
}

impl fmt::Debug for BeanHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(_) => f.write_str("BeanHandle::Ready"),
            Self::Deferred(proxy) => f
                .debug_tuple("BeanHandle::Deferred")
                .field(&proxy.descriptor_id().path())
                .finish(),
        }
    }
}
