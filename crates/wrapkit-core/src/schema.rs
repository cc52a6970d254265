//! Schema data model - the interface description of a wrapper
//!
//! These types serialize to the JSON document consumed by form-rendering
//! front ends (`wrappers.json`). Key order is significant everywhere: the
//! order of a `Parameters` map is the positional order of the call.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Ordered field/parameter name → descriptor
pub type Parameters = IndexMap<String, ParamInfo>;

/// Operation name → parameters
pub type Functions = IndexMap<String, Parameters>;

/// Type name → resolved shape, in first-reference order
pub type DefinedTypes = IndexMap<String, DefinedType>;

/// Class name → wrapper description; the full schema artifact
pub type WrappersData = IndexMap<String, WrapperInfo>;

/// Wire tag for record-typed parameters
pub const NESTED_TAG: &str = "nested";
/// Wire tag for union-typed parameters
pub const UNION_TAG: &str = "union";

// ── Parameter descriptors ─────────────────────────────────

/// Shape of one parameter or record field
#[derive(Debug, Clone, PartialEq)]
pub enum ParamType {
    /// Primitive or opaque type, kept as rendered source text
    Primitive(String),
    /// Record declared in the same source unit, resolved to its fields
    Nested(Parameters),
    /// One entry per union member
    Union(Vec<UnionMember>),
}

/// A union member: rendered type text, or a resolved record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UnionMember {
    Primitive(String),
    Record(Parameters),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawParamInfo", into = "RawParamInfo")]
pub struct ParamInfo {
    pub ty: ParamType,
    pub optional: bool,
    /// Unevaluated default expression, verbatim
    pub default_value: Option<String>,
}

impl ParamInfo {
    pub fn new(ty: ParamType) -> Self {
        ParamInfo {
            ty,
            optional: false,
            default_value: None,
        }
    }

    pub fn primitive(name: impl Into<String>) -> Self {
        Self::new(ParamType::Primitive(name.into()))
    }

    pub fn nested(fields: Parameters) -> Self {
        Self::new(ParamType::Nested(fields))
    }

    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn with_default(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = Some(default_value.into());
        self
    }

    /// The `type` string as it appears on the wire
    pub fn type_tag(&self) -> &str {
        match &self.ty {
            ParamType::Primitive(name) => name,
            ParamType::Nested(_) => NESTED_TAG,
            ParamType::Union(_) => UNION_TAG,
        }
    }
}

/// Flat wire form: `{type, optional, defaultValue?, fields?, types?}`
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawParamInfo {
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fields: Option<Parameters>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    types: Option<Vec<UnionMember>>,
}

impl TryFrom<RawParamInfo> for ParamInfo {
    type Error = String;

    fn try_from(raw: RawParamInfo) -> Result<Self, Self::Error> {
        let ty = match (raw.ty.as_str(), raw.fields, raw.types) {
            (NESTED_TAG, Some(fields), None) => ParamType::Nested(fields),
            (UNION_TAG, None, Some(types)) => ParamType::Union(types),
            (NESTED_TAG, _, _) => return Err("'nested' parameter requires 'fields' only".into()),
            (UNION_TAG, _, _) => return Err("'union' parameter requires 'types' only".into()),
            (name, None, None) => ParamType::Primitive(name.to_string()),
            (name, _, _) => {
                return Err(format!("plain parameter of type '{}' cannot carry fields or types", name))
            }
        };
        Ok(ParamInfo {
            ty,
            optional: raw.optional,
            default_value: raw.default_value,
        })
    }
}

impl From<ParamInfo> for RawParamInfo {
    fn from(info: ParamInfo) -> Self {
        let (ty, fields, types) = match info.ty {
            ParamType::Primitive(name) => (name, None, None),
            ParamType::Nested(fields) => (NESTED_TAG.to_string(), Some(fields), None),
            ParamType::Union(types) => (UNION_TAG.to_string(), None, Some(types)),
        };
        RawParamInfo {
            ty,
            optional: info.optional,
            default_value: info.default_value,
            fields,
            types,
        }
    }
}

// ── Defined types ─────────────────────────────────────────

/// A named type from the wrapper's source unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefinedType {
    /// Record or interface, resolved to fields
    Record(Parameters),
    /// Anything else, kept as the rendered alias body
    Alias(String),
}

impl DefinedType {
    pub fn as_record(&self) -> Option<&Parameters> {
        match self {
            DefinedType::Record(fields) => Some(fields),
            DefinedType::Alias(_) => None,
        }
    }
}

// ── Wrapper description ───────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployData {
    pub can_be_created_from_config: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_type: Option<Parameters>,
    /// Hex-encoded compiled bytecode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_hex: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrapperInfo {
    pub send_functions: Functions,
    pub get_functions: Functions,
    /// Wrapper source path relative to the project root, `./`-prefixed
    pub path: String,
    pub deploy: DeployData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defined_types: Option<DefinedTypes>,
}
