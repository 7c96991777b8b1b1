//! # Bean Abstractions
//!
//! 容器抽象层，定义组件生产、作用域上下文、解析与扩展的核心接口。
//!
//! ## 核心接口
//!
//! - [`BeanProducer`] - 组件生产者接口
//! - [`BeanHandle`] / [`DeferredInstance`] - 实例句柄与延迟物化抽象
//! - [`ScopeContext`] - 作用域上下文接口
//! - [`BeanResolver`] - 类型安全解析接口
//! - [`ContainerExtension`] - 启动阶段扩展接口

pub mod context;
pub mod extension;
pub mod handle;
pub mod producer;
pub mod resolution;

pub use context::*;
pub use extension::*;
pub use handle::*;
pub use producer::*;
pub use resolution::*;
