//! 容器扩展抽象接口
//!
//! 扩展观察者订阅启动阶段事件，可在发现阶段新增、排除或修改组件描述符

use container_common::ComponentDescriptor;
use std::fmt;

/// 启动阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootPhase {
    /// 发现开始前
    BeforeDiscovery,
    /// 逐个处理组件描述符
    ProcessType,
    /// 发现结束后
    AfterDiscovery,
    /// 校验
    Validate,
    /// 校验结束后
    AfterValidation,
}

impl fmt::Display for BootPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BeforeDiscovery => "before-discovery",
            Self::ProcessType => "process-type",
            Self::AfterDiscovery => "after-discovery",
            Self::Validate => "validate",
            Self::AfterValidation => "after-validation",
        };
        f.write_str(name)
    }
}

/// 发现开始前的阶段上下文
#[derive(Debug, Default)]
pub struct BeforeDiscoveryContext {
    problems: Vec<String>,
}

impl BeforeDiscoveryContext {
    /// 创建新的阶段上下文
    pub fn new() -> Self {
        Self::default()
    }

    /// 报告定义或部署问题，当前阶段结束后中止启动
    pub fn add_problem(&mut self, message: impl Into<String>) {
        self.problems.push(message.into());
    }

    /// 取出收集到的问题
    pub fn take_problems(&mut self) -> Vec<String> {
        std::mem::take(&mut self.problems)
    }
}

/// 逐类型处理阶段上下文
///
/// 扩展可在此修改描述符或将其排除；被排除的类型不会进入注册表
#[derive(Debug)]
pub struct ProcessTypeContext {
    descriptor: ComponentDescriptor,
    vetoed: bool,
    problems: Vec<String>,
}

impl ProcessTypeContext {
    /// 创建新的阶段上下文
    pub fn new(descriptor: ComponentDescriptor) -> Self {
        Self {
            descriptor,
            vetoed: false,
            problems: Vec::new(),
        }
    }

    /// 读取当前描述符
    pub fn descriptor(&self) -> &ComponentDescriptor {
        &self.descriptor
    }

    /// 修改当前描述符
    pub fn descriptor_mut(&mut self) -> &mut ComponentDescriptor {
        &mut self.descriptor
    }

    /// 排除当前类型
    pub fn veto(&mut self) {
        self.vetoed = true;
    }

    /// 当前类型是否已被排除
    pub fn is_vetoed(&self) -> bool {
        self.vetoed
    }

    /// 报告问题
    pub fn add_problem(&mut self, message: impl Into<String>) {
        self.problems.push(message.into());
    }

    /// 取出当前已收集的问题
    pub fn take_problems(&mut self) -> Vec<String> {
        std::mem::take(&mut self.problems)
    }

    /// 拆解为描述符与排除标记
    pub fn into_parts(self) -> (ComponentDescriptor, bool) {
        (self.descriptor, self.vetoed)
    }
}

/// 发现结束阶段上下文
///
/// 扩展新增的描述符仍会经过排除过滤，之后才参与校验
#[derive(Debug, Default)]
pub struct AfterDiscoveryContext {
    additions: Vec<ComponentDescriptor>,
    problems: Vec<String>,
}

impl AfterDiscoveryContext {
    /// 创建新的阶段上下文
    pub fn new() -> Self {
        Self::default()
    }

    /// 新增组件描述符
    pub fn add_component(&mut self, descriptor: ComponentDescriptor) {
        self.additions.push(descriptor);
    }

    /// 报告问题
    pub fn add_problem(&mut self, message: impl Into<String>) {
        self.problems.push(message.into());
    }

    /// 取出当前已收集的问题
    pub fn take_problems(&mut self) -> Vec<String> {
        std::mem::take(&mut self.problems)
    }

    /// 拆解为新增的描述符列表
    pub fn into_additions(self) -> Vec<ComponentDescriptor> {
        self.additions
    }
}

/// 校验阶段上下文
#[derive(Debug, Default)]
pub struct ValidationContext {
    problems: Vec<String>,
}

impl ValidationContext {
    /// 创建新的阶段上下文
    pub fn new() -> Self {
        Self::default()
    }

    /// 报告部署问题
    pub fn add_problem(&mut self, message: impl Into<String>) {
        self.problems.push(message.into());
    }

    /// 取出收集到的问题
    pub fn take_problems(&mut self) -> Vec<String> {
        std::mem::take(&mut self.problems)
    }
}

/// 校验结束阶段上下文
#[derive(Debug)]
pub struct AfterValidationContext {
    /// 最终进入注册表的组件数量
    pub component_count: usize,
}

/// 容器扩展 trait
///
/// 所有回调都在单线程的启动流程中按阶段顺序触发
pub trait ContainerExtension: Send + Sync {
    /// 扩展名称，用于问题归属
    fn name(&self) -> &str;

    /// 发现开始前回调
    fn before_discovery(&mut self, _ctx: &mut BeforeDiscoveryContext) {}

    /// 逐个描述符回调
    fn process_type(&mut self, _ctx: &mut ProcessTypeContext) {}

    /// 发现结束回调
    fn after_discovery(&mut self, _ctx: &mut AfterDiscoveryContext) {}

    /// 校验回调
    fn validate(&mut self, _ctx: &mut ValidationContext) {}

    /// 校验结束回调
    fn after_validation(&mut self, _ctx: &AfterValidationContext) {}
}
