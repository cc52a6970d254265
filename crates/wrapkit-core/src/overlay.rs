//! Display overlay - human-authored presentation settings
//!
//! `config.json` sits next to the schema artifact and carries display
//! names, field titles and output names. It is optional: every field has
//! a default, and a missing or partial file never blocks schema generation.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::schema::{DefinedType, Parameters, WrapperInfo, WrappersData};

pub type WrappersConfig = IndexMap<String, WrapperConfig>;
pub type ParamsConfig = IndexMap<String, ParamConfig>;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParamConfig {
    pub field_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_with_default: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MethodConfig {
    pub tab_name: String,
    pub params: ParamsConfig,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GetMethodConfig {
    pub tab_name: String,
    pub params: ParamsConfig,
    /// Labels for the returned values
    pub out_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TypeConfig {
    pub shown_name: String,
    pub properties: ParamsConfig,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WrapperConfig {
    pub default_address: String,
    pub tab_name: String,
    pub send_functions: IndexMap<String, MethodConfig>,
    pub get_functions: IndexMap<String, GetMethodConfig>,
    pub defined_types: IndexMap<String, TypeConfig>,
}

/// Overlay for the current schema.
///
/// Entries already present in `existing` are kept verbatim; wrappers,
/// operations, parameters and record types new to the schema get defaults
/// (titles equal to names); entries the schema no longer has are dropped.
pub fn merge_overlay(existing: Option<&WrappersConfig>, schema: &WrappersData) -> WrappersConfig {
    schema
        .iter()
        .map(|(name, info)| {
            let previous = existing.and_then(|config| config.get(name));
            (name.clone(), merge_wrapper(name, previous, info))
        })
        .collect()
}

fn merge_wrapper(name: &str, previous: Option<&WrapperConfig>, info: &WrapperInfo) -> WrapperConfig {
    let send_functions = info
        .send_functions
        .iter()
        .map(|(op, params)| {
            let old = previous.and_then(|p| p.send_functions.get(op));
            let merged = MethodConfig {
                tab_name: old.map_or_else(|| op.clone(), |o| o.tab_name.clone()),
                params: merge_params(old.map(|o| &o.params), params),
            };
            (op.clone(), merged)
        })
        .collect();

    let get_functions = info
        .get_functions
        .iter()
        .map(|(op, params)| {
            let old = previous.and_then(|p| p.get_functions.get(op));
            let merged = GetMethodConfig {
                tab_name: old.map_or_else(|| op.clone(), |o| o.tab_name.clone()),
                params: merge_params(old.map(|o| &o.params), params),
                out_names: old.map(|o| o.out_names.clone()).unwrap_or_default(),
            };
            (op.clone(), merged)
        })
        .collect();

    let defined_types = info
        .defined_types
        .iter()
        .flatten()
        .filter_map(|(type_name, shape)| match shape {
            DefinedType::Record(fields) => Some((type_name, fields)),
            DefinedType::Alias(_) => None,
        })
        .map(|(type_name, fields)| {
            let old = previous.and_then(|p| p.defined_types.get(type_name));
            let merged = TypeConfig {
                shown_name: old.map_or_else(|| type_name.clone(), |o| o.shown_name.clone()),
                properties: merge_params(old.map(|o| &o.properties), fields),
            };
            (type_name.clone(), merged)
        })
        .collect();

    WrapperConfig {
        default_address: previous.map(|p| p.default_address.clone()).unwrap_or_default(),
        tab_name: previous.map_or_else(|| name.to_string(), |p| p.tab_name.clone()),
        send_functions,
        get_functions,
        defined_types,
    }
}

fn merge_params(previous: Option<&ParamsConfig>, params: &Parameters) -> ParamsConfig {
    params
        .keys()
        .map(|param| {
            let config = previous
                .and_then(|p| p.get(param))
                .cloned()
                .unwrap_or_else(|| ParamConfig {
                    field_title: param.clone(),
                    override_with_default: None,
                });
            (param.clone(), config)
        })
        .collect()
}
