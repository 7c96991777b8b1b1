//! 组件描述符定义
//!
//! 描述符由外部扫描器或注册 API 填充，启动完成后不可变

use crate::qualifier::{matches_all, Qualifier};
use crate::types::{PackagePath, TypeKey};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 组件作用域类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScopeKind {
    /// 应用作用域，在容器生命周期内为单例
    Application,
    /// 请求作用域，在同一请求上下文内共享实例
    Request,
    /// 会话作用域，在同一会话上下文内共享实例
    Session,
    /// 依赖作用域，每个注入点创建全新实例，无共享身份
    Dependent,
}

impl ScopeKind {
    /// 是否为普通作用域
    ///
    /// 普通作用域的实例可能在引用交付时尚未存在，必须通过代理间接访问；
    /// 依赖作用域在注入点立即构造，永不代理
    pub fn is_normal(self) -> bool {
        !matches!(self, Self::Dependent)
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Application => "application",
            Self::Request => "request",
            Self::Session => "session",
            Self::Dependent => "dependent",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for ScopeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "application" => Ok(Self::Application),
            "request" => Ok(Self::Request),
            "session" => Ok(Self::Session),
            "dependent" => Ok(Self::Dependent),
            _ => Err(format!("未知的作用域类型: {s}")),
        }
    }
}

/// 类型级排除标记
///
/// 显式的类型级标记总是优先于包级标记
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VetoOverride {
    /// 显式排除该类型
    Vetoed,
    /// 显式保留该类型，覆盖包级排除
    NotVetoed,
}

/// 注入点基数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cardinality {
    /// 必须解析出唯一候选
    Single,
    /// 允许零个候选
    Optional,
    /// 解析出全部匹配候选
    Collection,
}

/// 注入点
///
/// 描述一个组件对其依赖的类型与限定符要求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectionPoint {
    /// 要求的类型
    pub required_type: TypeKey,
    /// 要求的限定符集合
    pub qualifiers: Vec<Qualifier>,
    /// 注入基数
    pub cardinality: Cardinality,
}

impl InjectionPoint {
    /// 创建单值注入点
    pub fn new(required_type: impl Into<TypeKey>) -> Self {
        Self {
            required_type: required_type.into(),
            qualifiers: Vec::new(),
            cardinality: Cardinality::Single,
        }
    }

    /// 添加限定符要求
    pub fn with_qualifier(mut self, qualifier: Qualifier) -> Self {
        self.qualifiers.push(qualifier);
        self
    }

    /// 设置注入基数
    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }
}

impl fmt::Display for InjectionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.required_type)?;
        for q in &self.qualifiers {
            write!(f, " @{q}")?;
        }
        Ok(())
    }
}

/// 组件描述符
///
/// 一个被发现类型的完整不可变描述：暴露的类型集合、限定符、作用域、
/// 排除标记与注入点。启动完成后注册表中的描述符只读
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    /// 组件身份（声明类型）
    pub id: TypeKey,
    /// 暴露的组件类型集合，总是包含声明类型自身
    pub bean_types: Vec<TypeKey>,
    /// 限定符集合
    pub qualifiers: Vec<Qualifier>,
    /// 作用域
    pub scope: ScopeKind,
    /// 组件名称
    pub name: Option<String>,
    /// 是否为备选组件
    pub alternative: bool,
    /// 备选组件是否启用
    pub enabled: bool,
    /// 声明优先级，未声明视为最低
    pub priority: Option<i32>,
    /// 类型级排除标记
    pub veto: Option<VetoOverride>,
    /// 声明类型所在的包
    pub package: PackagePath,
    /// 注入点列表
    pub injection_points: Vec<InjectionPoint>,
    /// 拦截器绑定
    pub interceptor_bindings: Vec<Qualifier>,
}

impl ComponentDescriptor {
    /// 创建新的组件描述符
    pub fn new(id: impl Into<TypeKey>, scope: ScopeKind) -> Self {
        let id = id.into();
        let package = id.package();
        Self {
            bean_types: vec![id.clone()],
            qualifiers: Vec::new(),
            scope,
            name: None,
            alternative: false,
            enabled: true,
            priority: None,
            veto: None,
            package,
            injection_points: Vec::new(),
            interceptor_bindings: Vec::new(),
            id,
        }
    }

    /// 添加暴露的组件类型
    pub fn with_bean_type(mut self, bean_type: impl Into<TypeKey>) -> Self {
        let bean_type = bean_type.into();
        if !self.bean_types.contains(&bean_type) {
            self.bean_types.push(bean_type);
        }
        self
    }

    /// 添加限定符
    pub fn with_qualifier(mut self, qualifier: Qualifier) -> Self {
        self.qualifiers.push(qualifier);
        self
    }

    /// 设置组件名称
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// 标记为备选组件
    pub fn with_alternative(mut self, enabled: bool) -> Self {
        self.alternative = true;
        self.enabled = enabled;
        self
    }

    /// 设置声明优先级
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// 设置类型级排除标记
    pub fn with_veto(mut self, veto: VetoOverride) -> Self {
        self.veto = Some(veto);
        self
    }

    /// 添加注入点
    pub fn with_injection_point(mut self, point: InjectionPoint) -> Self {
        self.injection_points.push(point);
        self
    }

    /// 添加拦截器绑定
    pub fn with_interceptor_binding(mut self, binding: Qualifier) -> Self {
        self.interceptor_bindings.push(binding);
        self
    }

    /// 检查组件是否可赋值给要求的类型
    pub fn is_assignable_to(&self, required: &TypeKey) -> bool {
        self.bean_types.contains(required)
    }

    /// 检查组件是否满足全部要求的限定符
    pub fn satisfies_qualifiers(&self, required: &[Qualifier]) -> bool {
        matches_all(&self.qualifiers, required)
    }

    /// 是否为启用的备选组件
    pub fn is_enabled_alternative(&self) -> bool {
        self.alternative && self.enabled
    }
}
