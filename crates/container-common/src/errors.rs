//! 错误类型定义

use std::sync::Arc;
use thiserror::Error;

/// 组件定义错误类型
///
/// 定义错误是致命的，启动过程会收集全部定义错误后统一中止
#[derive(Error, Debug, Clone)]
pub enum DefinitionError {
    #[error("重复的组件定义: {type_key}")]
    DuplicateComponent { type_key: String },

    #[error("组件描述符无效: {type_key}, 原因: {message}")]
    MalformedDescriptor { type_key: String, message: String },

    #[error("组件缺少生产者: {type_key}")]
    MissingProducer { type_key: String },

    #[error("检测到非法循环依赖: {cycle}")]
    IllegalCycle {
        cycle: String,
        members: Vec<String>,
    },

    #[error("注入点无法满足: {injection_point}, 所属组件: {owner}")]
    UnsatisfiedInjection {
        owner: String,
        injection_point: String,
    },

    #[error("注入点存在歧义: {injection_point}, 所属组件: {owner}, 候选: {candidates:?}")]
    AmbiguousInjection {
        owner: String,
        injection_point: String,
        candidates: Vec<String>,
    },
}

/// 部署问题
///
/// 启动期间收集的单个问题，来源于引擎校验或扩展观察者
#[derive(Error, Debug, Clone)]
pub enum DeploymentProblem {
    #[error("{0}")]
    Definition(#[from] DefinitionError),

    #[error("扩展 {observer} 报告问题: {message}")]
    Extension { observer: String, message: String },
}

/// 部署错误类型
///
/// 聚合启动期间收集到的全部问题，一次性报告
#[derive(Error, Debug)]
#[error("部署验证失败, 共 {} 个问题", .problems.len())]
pub struct DeploymentError {
    /// 收集到的全部问题
    pub problems: Vec<DeploymentProblem>,
}

impl DeploymentError {
    /// 创建新的部署错误
    pub fn new(problems: Vec<DeploymentProblem>) -> Self {
        Self { problems }
    }

    /// 生成逐条列出全部问题的诊断报告
    pub fn report(&self) -> String {
        let mut out = format!("部署验证失败, 共 {} 个问题:\n", self.problems.len());
        for (idx, problem) in self.problems.iter().enumerate() {
            out.push_str(&format!("  {}. {problem}\n", idx + 1));
        }
        out
    }
}

/// 解析错误类型
///
/// 解析错误仅影响发起请求的调用方，不会使整个容器失效
#[derive(Error, Debug, Clone)]
pub enum ResolutionError {
    #[error("未找到匹配的组件: {required_type}")]
    Unsatisfied {
        required_type: String,
        qualifiers: Vec<String>,
    },

    #[error("组件解析存在歧义: {required_type}, 候选: {candidates:?}")]
    Ambiguous {
        required_type: String,
        candidates: Vec<String>,
    },

    #[error("组件未注册: {type_key}")]
    NoSuchBean { type_key: String },

    #[error("实例类型转换失败, 期望: {expected}")]
    TypeMismatch { expected: String },
}

/// 组件构造错误类型
///
/// 包装生产者或销毁器协作方的失败；失败的实例永远不会被缓存
#[derive(Error, Debug, Clone)]
pub enum ConstructionError {
    #[error("组件构造失败: {type_key}, 原因: {source}")]
    CreationFailed {
        type_key: String,
        source: Arc<anyhow::Error>,
    },

    #[error("组件销毁失败: {type_key}, 原因: {source}")]
    DisposalFailed {
        type_key: String,
        source: Arc<anyhow::Error>,
    },
}

impl ConstructionError {
    /// 创建构造失败错误
    pub fn creation_failed(type_key: impl Into<String>, source: anyhow::Error) -> Self {
        Self::CreationFailed {
            type_key: type_key.into(),
            source: Arc::new(source),
        }
    }

    /// 创建销毁失败错误
    pub fn disposal_failed(type_key: impl Into<String>, source: anyhow::Error) -> Self {
        Self::DisposalFailed {
            type_key: type_key.into(),
            source: Arc::new(source),
        }
    }
}

/// 上下文错误类型
#[derive(Error, Debug, Clone)]
pub enum ContextError {
    #[error("上下文未激活: {scope}")]
    ContextNotActive { scope: String },

    #[error("上下文不存在: {owner}")]
    UnknownOwner { owner: String },

    #[error("作用域需要上下文标识: {scope}")]
    OwnerRequired { scope: String },

    #[error("容器已关闭")]
    ContainerShutdown,
}

/// 容器错误类型
#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("部署错误: {source}")]
    Deployment {
        #[from]
        source: DeploymentError,
    },

    #[error("解析错误: {source}")]
    Resolution {
        #[from]
        source: ResolutionError,
    },

    #[error("构造错误: {source}")]
    Construction {
        #[from]
        source: ConstructionError,
    },

    #[error("上下文错误: {source}")]
    Context {
        #[from]
        source: ContextError,
    },
}

/// 结果类型别名
pub type DefinitionResult<T> = Result<T, DefinitionError>;
pub type DeploymentResult<T> = Result<T, DeploymentError>;
pub type ResolveResult<T> = Result<T, ResolutionError>;
pub type ConstructionResult<T> = Result<T, ConstructionError>;
pub type ContextResult<T> = Result<T, ContextError>;
pub type ContainerResult<T> = Result<T, ContainerError>;
