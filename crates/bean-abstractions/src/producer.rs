//! 组件生产者抽象接口
//!
//! 生产者是外部协作方，负责实际的实例构造与销毁；
//! 引擎只透传其成功或失败，不改变状态机保证

use crate::handle::{BeanHandle, BeanInstance};
use async_trait::async_trait;
use container_common::Cardinality;

/// 已解析的依赖
///
/// 按注入点基数区分的依赖句柄：普通作用域依赖为延迟代理，
/// 依赖作用域依赖在构造前已被立即实例化
#[derive(Debug, Clone)]
pub enum ResolvedDependency {
    /// 单值依赖
    Single(BeanHandle),
    /// 可选依赖
    Optional(Option<BeanHandle>),
    /// 集合依赖
    Collection(Vec<BeanHandle>),
}

impl ResolvedDependency {
    /// 依赖对应的基数
    pub fn cardinality(&self) -> Cardinality {
        match self {
            Self::Single(_) => Cardinality::Single,
            Self::Optional(_) => Cardinality::Optional,
            Self::Collection(_) => Cardinality::Collection,
        }
    }
}

/// 创建上下文
///
/// 向生产者提供按注入点声明顺序排列的已解析依赖
#[derive(Debug, Default)]
pub struct CreationContext {
    dependencies: Vec<ResolvedDependency>,
}

impl CreationContext {
    /// 创建新的创建上下文
    pub fn new(dependencies: Vec<ResolvedDependency>) -> Self {
        Self { dependencies }
    }

    /// 获取指定注入点的单值依赖句柄
    pub fn dependency(&self, index: usize) -> anyhow::Result<&BeanHandle> {
        match self.dependencies.get(index) {
            Some(ResolvedDependency::Single(handle)) => Ok(handle),
            Some(ResolvedDependency::Optional(Some(handle))) => Ok(handle),
            Some(ResolvedDependency::Optional(None)) => {
                anyhow::bail!("注入点 {index} 的可选依赖不存在")
            }
            Some(ResolvedDependency::Collection(_)) => {
                anyhow::bail!("注入点 {index} 是集合依赖, 应使用 collection 访问")
            }
            None => anyhow::bail!("注入点 {index} 不存在"),
        }
    }

    /// 获取指定注入点的可选依赖句柄
    pub fn optional_dependency(&self, index: usize) -> anyhow::Result<Option<&BeanHandle>> {
        match self.dependencies.get(index) {
            Some(ResolvedDependency::Optional(handle)) => Ok(handle.as_ref()),
            Some(ResolvedDependency::Single(handle)) => Ok(Some(handle)),
            Some(ResolvedDependency::Collection(_)) => {
                anyhow::bail!("注入点 {index} 是集合依赖, 应使用 collection 访问")
            }
            None => anyhow::bail!("注入点 {index} 不存在"),
        }
    }

    /// 获取指定注入点的集合依赖句柄
    pub fn collection(&self, index: usize) -> anyhow::Result<&[BeanHandle]> {
        match self.dependencies.get(index) {
            Some(ResolvedDependency::Collection(handles)) => Ok(handles),
            Some(_) => anyhow::bail!("注入点 {index} 不是集合依赖"),
            None => anyhow::bail!("注入点 {index} 不存在"),
        }
    }

    /// 获取全部已解析依赖
    pub fn dependencies(&self) -> &[ResolvedDependency] {
        &self.dependencies
    }
}

/// 组件生产者 trait
///
/// 构造一旦开始就运行至成功或失败，引擎不提供取消路径
#[async_trait]
pub trait BeanProducer: Send + Sync {
    /// 创建组件实例
    async fn create(&self, ctx: &CreationContext) -> anyhow::Result<BeanInstance>;

    /// 销毁组件实例
    async fn dispose(&self, _instance: BeanInstance) -> anyhow::Result<()> {
        Ok(())
    }
}

/// 闭包生产者包装器
///
/// 将同步构造闭包适配为生产者；需要等待依赖物化的生产者应自行实现
/// [`BeanProducer`]
pub struct FnProducer<F>
where
    F: Fn(&CreationContext) -> anyhow::Result<BeanInstance> + Send + Sync,
{
    create_fn: F,
}

impl<F> FnProducer<F>
where
    F: Fn(&CreationContext) -> anyhow::Result<BeanInstance> + Send + Sync,
{
    /// 创建新的闭包生产者
    pub fn new(create_fn: F) -> Self {
        Self { create_fn }
    }
}

#[async_trait]
impl<F> BeanProducer for FnProducer<F>
where
    F: Fn(&CreationContext) -> anyhow::Result<BeanInstance> + Send + Sync,
{
    async fn create(&self, ctx: &CreationContext) -> anyhow::Result<BeanInstance> {
        (self.create_fn)(ctx)
    }
}
