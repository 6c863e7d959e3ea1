//! Declarations produced by the parser and accepted by [`SchemaTree::add`].
//!
//! These are plain owned values: the parser builds them from source text,
//! and hosts or extensions can build them in code to insert nodes
//! programmatically.
//!
//! [`SchemaTree::add`]: crate::SchemaTree::add

use std::collections::BTreeMap;

use serde_json::Value;

/// Declaration options keyed by their full option name (e.g. `java_package`
/// or `(my.ext).flag`). Sorted so serialization is deterministic.
pub type Options = BTreeMap<String, OptionValue>;

/// Highest valid field number, the value of the `max` keyword in ranges.
pub const MAX_FIELD_NUMBER: i64 = 0x1FFF_FFFF;

/// A constant appearing on the right-hand side of an option.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    /// `true` / `false`.
    Bool(bool),
    /// An integer that fits in `i64`.
    Int(i64),
    /// A positive integer above `i64::MAX`.
    UInt(u64),
    /// A floating point literal, including `inf` and `nan`.
    Float(f64),
    /// A quoted string.
    Str(String),
    /// A bare (possibly dotted) identifier such as an enum value.
    Ident(String),
    /// A `{ ... }` message literal, kept as its token text.
    Aggregate(String),
}

impl OptionValue {
    /// Converts the constant to its JSON form.
    ///
    /// Non-finite floats have no JSON number form and become strings.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::from(*i),
            Self::UInt(u) => Value::from(*u),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map_or_else(|| Value::String(f.to_string()), Value::Number),
            Self::Str(s) | Self::Ident(s) | Self::Aggregate(s) => Value::String(s.clone()),
        }
    }
}

/// Field cardinality label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldRule {
    /// `optional`
    Optional,
    /// `required` (proto2)
    Required,
    /// `repeated`
    Repeated,
}

impl FieldRule {
    /// Returns the keyword spelling of this rule.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Optional => "optional",
            Self::Required => "required",
            Self::Repeated => "repeated",
        }
    }
}

/// A single message field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    /// Field name as written, or camel-cased on insertion unless `keepCase`.
    pub name: String,
    /// Field number.
    pub number: u32,
    /// Value type name as written (scalar or type reference).
    pub type_name: String,
    /// Key type for `map<K, V>` fields.
    pub key_type: Option<String>,
    /// Cardinality label, if any.
    pub rule: Option<FieldRule>,
    /// Inline `[...]` options.
    pub options: Options,
}

impl FieldDecl {
    /// Creates an unlabeled field.
    #[must_use]
    pub fn new(name: impl Into<String>, number: u32, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            number,
            type_name: type_name.into(),
            key_type: None,
            rule: None,
            options: Options::new(),
        }
    }

    /// Sets the cardinality label.
    #[must_use]
    pub fn with_rule(mut self, rule: FieldRule) -> Self {
        self.rule = Some(rule);
        self
    }
}

/// A `oneof` group: its name and the names of its member fields.
#[derive(Debug, Clone, PartialEq)]
pub struct OneofDecl {
    /// Group name.
    pub name: String,
    /// Member field names, in declaration order.
    pub fields: Vec<String>,
    /// Options declared inside the group.
    pub options: Options,
}

/// A `reserved` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reserved {
    /// An inclusive number range (`5`, `9 to 11`, `20 to max`).
    Range(i64, i64),
    /// A reserved name.
    Name(String),
}

/// A `message` declaration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MessageDecl {
    /// Local name.
    pub name: String,
    /// Fields in declaration order, including oneof members.
    pub fields: Vec<FieldDecl>,
    /// Oneof groups.
    pub oneofs: Vec<OneofDecl>,
    /// Nested messages and enums.
    pub nested: Vec<Declaration>,
    /// Reserved numbers and names.
    pub reserved: Vec<Reserved>,
    /// Extension ranges.
    pub extensions: Vec<(i64, i64)>,
    /// Message-level options.
    pub options: Options,
}

impl MessageDecl {
    /// Creates an empty message.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Appends a field.
    #[must_use]
    pub fn with_field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }

    /// Appends a nested declaration.
    #[must_use]
    pub fn with_nested(mut self, decl: impl Into<Declaration>) -> Self {
        self.nested.push(decl.into());
        self
    }
}

/// A single enum value.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumValueDecl {
    /// Value name.
    pub name: String,
    /// Numeric value.
    pub number: i32,
    /// Inline `[...]` options.
    pub options: Options,
}

/// An `enum` declaration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnumDecl {
    /// Local name.
    pub name: String,
    /// Values in declaration order.
    pub values: Vec<EnumValueDecl>,
    /// Reserved numbers and names.
    pub reserved: Vec<Reserved>,
    /// Enum-level options.
    pub options: Options,
}

impl EnumDecl {
    /// Creates an empty enum.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Appends a value.
    #[must_use]
    pub fn with_value(mut self, name: impl Into<String>, number: i32) -> Self {
        self.values.push(EnumValueDecl {
            name: name.into(),
            number,
            options: Options::new(),
        });
        self
    }
}

/// An `rpc` inside a service.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    /// Method name.
    pub name: String,
    /// Request message type.
    pub request_type: String,
    /// Whether the request is a stream.
    pub request_stream: bool,
    /// Response message type.
    pub response_type: String,
    /// Whether the response is a stream.
    pub response_stream: bool,
    /// Method options.
    pub options: Options,
}

/// A `service` declaration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ServiceDecl {
    /// Local name.
    pub name: String,
    /// Methods in declaration order.
    pub methods: Vec<MethodDecl>,
    /// Service-level options.
    pub options: Options,
}

/// A bare namespace, used for programmatic insertion.
///
/// Definition files never produce these; their namespaces come from
/// `package` statements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NamespaceDecl {
    /// Local name.
    pub name: String,
    /// Nested declarations.
    pub nested: Vec<Declaration>,
    /// Namespace options.
    pub options: Options,
}

impl NamespaceDecl {
    /// Creates an empty namespace.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Appends a nested declaration.
    #[must_use]
    pub fn with_nested(mut self, decl: impl Into<Declaration>) -> Self {
        self.nested.push(decl.into());
        self
    }
}

/// Any declaration that becomes a namespace node.
#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    /// A message type.
    Message(MessageDecl),
    /// An enum type.
    Enum(EnumDecl),
    /// A service.
    Service(ServiceDecl),
    /// A bare namespace.
    Namespace(NamespaceDecl),
}

impl Declaration {
    /// Returns the local name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Message(m) => &m.name,
            Self::Enum(e) => &e.name,
            Self::Service(s) => &s.name,
            Self::Namespace(n) => &n.name,
        }
    }

    /// Returns the nested declarations (empty for enums and services).
    #[must_use]
    pub fn nested(&self) -> &[Declaration] {
        match self {
            Self::Message(m) => &m.nested,
            Self::Namespace(n) => &n.nested,
            Self::Enum(_) | Self::Service(_) => &[],
        }
    }
}

impl From<MessageDecl> for Declaration {
    fn from(decl: MessageDecl) -> Self {
        Self::Message(decl)
    }
}

impl From<EnumDecl> for Declaration {
    fn from(decl: EnumDecl) -> Self {
        Self::Enum(decl)
    }
}

impl From<ServiceDecl> for Declaration {
    fn from(decl: ServiceDecl) -> Self {
        Self::Service(decl)
    }
}

impl From<NamespaceDecl> for Declaration {
    fn from(decl: NamespaceDecl) -> Self {
        Self::Namespace(decl)
    }
}

/// An import statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Imported path as written.
    pub path: String,
    /// `import public`.
    pub public: bool,
    /// `import weak`.
    pub weak: bool,
}

/// A parsed definition file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProtoFile {
    /// `syntax = "..."`, if present.
    pub syntax: Option<String>,
    /// `edition = "..."`, if present.
    pub edition: Option<String>,
    /// Dotted package name, if present.
    pub package: Option<String>,
    /// Imports in declaration order.
    pub imports: Vec<Import>,
    /// File-level options, applied to the package namespace.
    pub options: Options,
    /// Top-level declarations.
    pub declarations: Vec<Declaration>,
}
