//! # Container Common
//!
//! 这个 crate 提供 Silo 容器各层共享的值类型与错误定义。
//!
//! ## 核心类型
//!
//! - [`TypeKey`] / [`PackagePath`] - 类型与包路径标识
//! - [`Qualifier`] - 限定符
//! - [`ComponentDescriptor`] - 组件描述符
//! - [`DefinitionError`] / [`DeploymentError`] - 启动期错误
//! - [`ResolutionError`] / [`ConstructionError`] - 运行期错误
//!
//! ## 设计原则
//!
//! - 元数据全部为显式静态值，由外部扫描器填充，引擎不做运行时反射
//! - 描述符启动后不可变，注册表可被并发只读访问
//! - 启动期错误整体收集、一次性报告

pub mod descriptor;
pub mod errors;
pub mod qualifier;
pub mod types;

pub use descriptor::*;
pub use errors::*;
pub use qualifier::*;
pub use types::*;
