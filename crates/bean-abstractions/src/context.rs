//! 作用域上下文抽象接口

use crate::handle::BeanInstance;
use async_trait::async_trait;
use container_common::{
    ComponentDescriptor, ConstructionResult, ContainerResult, ContextResult, ScopeKind, TypeKey,
};
use uuid::Uuid;

/// 作用域句柄
///
/// 标识一次请求或会话上下文的生命周期边界
#[derive(Debug, Clone)]
pub struct ScopeHandle {
    /// 上下文标识
    pub id: Uuid,
    /// 作用域类型
    pub kind: ScopeKind,
    /// 创建时间
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl ScopeHandle {
    /// 创建新的作用域句柄
    pub fn new(kind: ScopeKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            created_at: chrono::Utc::now(),
        }
    }
}

/// 上下文实例构造器
///
/// 上下文对实例的具体构造方式保持无知：构造器负责解析依赖、
/// 调用生产者并套上拦截器链，上下文只负责状态机与存储
#[async_trait]
pub trait ContextualConstructor: Send + Sync {
    /// 构造组件实例
    async fn construct(&self, descriptor: &ComponentDescriptor) -> ConstructionResult<BeanInstance>;
}

/// 实例销毁器
///
/// 上下文销毁时逐个实例回调，失败不阻断其余实例的销毁
#[async_trait]
pub trait InstanceDisposer: Send + Sync {
    /// 销毁组件实例
    async fn dispose(&self, descriptor_id: &TypeKey, instance: BeanInstance);
}

/// 作用域上下文 trait
///
/// 持有某一作用域类型的实例存储；同一 (组件, 上下文标识) 的上下文实例
/// 在作用域生命周期内唯一
#[async_trait]
pub trait ScopeContext: Send + Sync {
    /// 上下文对应的作用域类型
    fn kind(&self) -> ScopeKind;

    /// 检查指定上下文是否处于激活状态
    fn is_active(&self, owner: Option<Uuid>) -> bool;

    /// 获取或构造上下文实例
    ///
    /// 同一 (组件, 上下文标识) 的构造至多发生一次；并发调用方
    /// 要么等待构造完成，要么共同收到同一个构造失败
    async fn obtain(
        &self,
        descriptor: &ComponentDescriptor,
        owner: Option<Uuid>,
        constructor: &dyn ContextualConstructor,
    ) -> ContainerResult<BeanInstance>;

    /// 销毁指定上下文及其全部实例
    ///
    /// 按创建顺序的逆序逐个调用销毁器；重复销毁是幂等的
    async fn destroy(&self, owner: Option<Uuid>, disposer: &dyn InstanceDisposer)
        -> ContextResult<()>;
}
