//! 拦截器与装饰器链构建
//!
//! 拦截器按声明优先级升序排序（同优先级按注册顺序），最低优先级
//! 位于最外层调用边界；装饰器按声明顺序包裹在拦截器之内，最内层
//! 委托到原始实例

use bean_abstractions::BeanInstance;
use container_common::{qualifier::matches_all, ComponentDescriptor, Qualifier, TypeKey};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// 类型擦除的包裹函数
///
/// 接收内层实例并返回包裹后的实例；包裹层自身不持有业务状态
pub type WrapFn = Arc<dyn Fn(BeanInstance) -> BeanInstance + Send + Sync>;

/// 拦截器注册信息
#[derive(Clone)]
pub struct InterceptorRegistration {
    /// 拦截器名称
    pub name: String,
    /// 拦截器绑定，全部命中目标组件声明的绑定时适用
    pub bindings: Vec<Qualifier>,
    /// 声明优先级
    pub priority: i32,
    /// 包裹函数
    pub wrap: WrapFn,
    order: usize,
}

impl fmt::Debug for InterceptorRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorRegistration")
            .field("name", &self.name)
            .field("bindings", &self.bindings)
            .field("priority", &self.priority)
            .field("order", &self.order)
            .finish()
    }
}

/// 装饰器注册信息
#[derive(Clone)]
pub struct DecoratorRegistration {
    /// 装饰器名称
    pub name: String,
    /// 委托类型，目标组件暴露该类型时适用
    pub delegate_type: TypeKey,
    /// 包裹函数
    pub wrap: WrapFn,
    order: usize,
}

impl fmt::Debug for DecoratorRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoratorRegistration")
            .field("name", &self.name)
            .field("delegate_type", &self.delegate_type)
            .field("order", &self.order)
            .finish()
    }
}

/// 拦截器与装饰器链构建器
///
/// 所有解析路径返回的都是包裹后的实例；只要有任一拦截器或装饰器
/// 适用，调用方就不会直接看到原始实例
#[derive(Debug, Default)]
pub struct ChainBuilder {
    interceptors: Vec<InterceptorRegistration>,
    decorators: Vec<DecoratorRegistration>,
}

impl ChainBuilder {
    /// 创建新的链构建器
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册拦截器
    pub fn register_interceptor(
        &mut self,
        name: impl Into<String>,
        bindings: Vec<Qualifier>,
        priority: i32,
        wrap: WrapFn,
    ) {
        let order = self.interceptors.len();
        self.interceptors.push(InterceptorRegistration {
            name: name.into(),
            bindings,
            priority,
            wrap,
            order,
        });
    }

    /// 注册装饰器
    pub fn register_decorator(
        &mut self,
        name: impl Into<String>,
        delegate_type: impl Into<TypeKey>,
        wrap: WrapFn,
    ) {
        let order = self.decorators.len();
        self.decorators.push(DecoratorRegistration {
            name: name.into(),
            delegate_type: delegate_type.into(),
            wrap,
            order,
        });
    }

    /// 筛选适用于目标组件的拦截器，升序排序
    fn applicable_interceptors(
        &self,
        descriptor: &ComponentDescriptor,
    ) -> Vec<&InterceptorRegistration> {
        let mut applicable: Vec<_> = self
            .interceptors
            .iter()
            .filter(|i| {
                !i.bindings.is_empty()
                    && matches_all(&descriptor.interceptor_bindings, &i.bindings)
            })
            .collect();
        applicable.sort_by_key(|i| (i.priority, i.order));
        applicable
    }

    /// 筛选适用于目标组件的装饰器，声明顺序
    fn applicable_decorators(
        &self,
        descriptor: &ComponentDescriptor,
    ) -> Vec<&DecoratorRegistration> {
        let mut applicable: Vec<_> = self
            .decorators
            .iter()
            .filter(|d| descriptor.bean_types.contains(&d.delegate_type))
            .collect();
        applicable.sort_by_key(|d| d.order);
        applicable
    }

    /// 将原始实例包裹进适用的拦截器与装饰器链
    ///
    /// 先由内向外套装饰器（首个声明者最终位于装饰器层最外），
    /// 再由内向外套拦截器（最低优先级最终位于整条链最外）
    pub fn wrap(&self, raw: BeanInstance, descriptor: &ComponentDescriptor) -> BeanInstance {
        let decorators = self.applicable_decorators(descriptor);
        let interceptors = self.applicable_interceptors(descriptor);

        if decorators.is_empty() && interceptors.is_empty() {
            return raw;
        }

        debug!(
            "包裹组件 {}: {} 个拦截器, {} 个装饰器",
            descriptor.id,
            interceptors.len(),
            decorators.len()
        );

        let mut instance = raw;
        for decorator in decorators.iter().rev() {
            instance = (decorator.wrap)(instance);
        }
        for interceptor in interceptors.iter().rev() {
            instance = (interceptor.wrap)(instance);
        }
        instance
    }
}
