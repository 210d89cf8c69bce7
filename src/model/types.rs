use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Maximum inline parameters before a candidate's parameter list spills to the heap.
///
/// A valid handler has at most two parameters; four leaves room for the invalid
/// shapes the validator has to look at.
pub const MAX_INLINE_PARAMETERS: usize = 4;

/// Stack-allocated parameter storage for candidate declarations
pub type ParameterVec = SmallVec<[Parameter; MAX_INLINE_PARAMETERS]>;

/// The kind of handler a tag declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerKind {
    /// Request/response handler, exactly one winner per call
    Request,
    /// Notification subscriber, every subscriber is invoked
    Notification,
    /// Pipeline behavior (middleware) wrapping other handlers
    Pipeline,
    /// Request handler producing a lazy asynchronous sequence
    Stream,
}

impl HandlerKind {
    /// The capability a payload type must satisfy for this kind
    #[must_use]
    pub fn payload_capability(self) -> Capability {
        match self {
            HandlerKind::Request => Capability::Request,
            HandlerKind::Notification => Capability::Notification,
            HandlerKind::Pipeline => Capability::PipelineContext,
            HandlerKind::Stream => Capability::StreamRequest,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HandlerKind::Request => "request",
            HandlerKind::Notification => "notification",
            HandlerKind::Pipeline => "pipeline",
            HandlerKind::Stream => "stream",
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A capability a host type may satisfy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Request,
    Notification,
    PipelineContext,
    StreamRequest,
    CancellationToken,
}

/// Parameter passing modifier as declared in the host language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterModifier {
    #[default]
    None,
    Ref,
    Out,
    Params,
}

/// One declared parameter of a candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    /// Fully qualified type path as the host spells it
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub modifier: ParameterModifier,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Parameter {
            name: name.into(),
            ty: ty.into(),
            modifier: ParameterModifier::None,
        }
    }

    pub fn with_modifier(mut self, modifier: ParameterModifier) -> Self {
        self.modifier = modifier;
        self
    }
}

/// Shape of a candidate's declared return type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ReturnType {
    /// Fire-and-forget (`()`)
    Unit,
    /// A single wrapped asynchronous value; `output: None` is the non-generic form
    Future {
        #[serde(default)]
        output: Option<String>,
    },
    /// Lazy asynchronous sequence
    Stream { item: String },
    /// A bare synchronous value
    Value {
        #[serde(rename = "type")]
        ty: String,
    },
}

impl ReturnType {
    /// `true` when a call completes without producing a value
    #[must_use]
    pub fn is_void(&self) -> bool {
        matches!(self, ReturnType::Unit | ReturnType::Future { output: None })
    }

    /// The type the generated dispatch procedure yields for this return shape
    #[must_use]
    pub fn output_type(&self) -> String {
        match self {
            ReturnType::Unit | ReturnType::Future { output: None } => "()".to_string(),
            ReturnType::Future { output: Some(ty) } => ty.clone(),
            ReturnType::Stream { item } => {
                format!("::futures::stream::BoxStream<'static, {item}>")
            }
            ReturnType::Value { ty } => ty.clone(),
        }
    }
}

/// Source location of a declaration
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceRef {
    pub file: String,
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

impl SourceRef {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        SourceRef {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// A literal value of a tag's named argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiteralValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl LiteralValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            LiteralValue::Bool(_) => "bool",
            LiteralValue::Int(_) => "int",
            LiteralValue::Float(_) => "float",
            LiteralValue::Str(_) => "string",
        }
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Bool(b) => write!(f, "{b}"),
            LiteralValue::Int(i) => write!(f, "{i}"),
            LiteralValue::Float(x) => write!(f, "{x}"),
            LiteralValue::Str(s) => write!(f, "{s:?}"),
        }
    }
}

/// `Name = value` as written on the tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedArgument {
    pub name: String,
    pub value: LiteralValue,
}

impl NamedArgument {
    pub fn new(name: impl Into<String>, value: LiteralValue) -> Self {
        NamedArgument {
            name: name.into(),
            value,
        }
    }
}

/// A recognized handler annotation attached to a declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub kind: HandlerKind,
    #[serde(default)]
    pub arguments: Vec<NamedArgument>,
}

impl Tag {
    pub fn new(kind: HandlerKind) -> Self {
        Tag {
            kind,
            arguments: Vec::new(),
        }
    }

    /// Append a named argument
    pub fn arg(mut self, name: impl Into<String>, value: LiteralValue) -> Self {
        self.arguments.push(NamedArgument::new(name, value));
        self
    }
}

/// A function-like declaration in the host program bearing zero or more handler tags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateDeclaration {
    pub containing_type: String,
    pub method_name: String,
    #[serde(default)]
    pub parameters: ParameterVec,
    pub returns: ReturnType,
    #[serde(default)]
    pub is_async: bool,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub type_parameters: Vec<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub location: SourceRef,
}

impl CandidateDeclaration {
    pub fn new(
        containing_type: impl Into<String>,
        method_name: impl Into<String>,
        returns: ReturnType,
    ) -> Self {
        CandidateDeclaration {
            containing_type: containing_type.into(),
            method_name: method_name.into(),
            parameters: ParameterVec::new(),
            returns,
            is_async: false,
            is_static: false,
            type_parameters: Vec::new(),
            tags: Vec::new(),
            location: SourceRef::default(),
        }
    }

    pub fn param(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn tag(mut self, tag: Tag) -> Self {
        self.tags.push(tag);
        self
    }

    pub fn asynchronous(mut self) -> Self {
        self.is_async = true;
        self
    }

    pub fn static_method(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn at(mut self, location: SourceRef) -> Self {
        self.location = location;
        self
    }

    /// `Type::method` display form
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}::{}", self.containing_type, self.method_name)
    }
}

/// Type-capability queries answered by the host program model
pub trait TypeCapabilities: Sync {
    /// Does `ty` satisfy `capability`?
    fn satisfies(&self, ty: &str, capability: Capability) -> bool;
}
