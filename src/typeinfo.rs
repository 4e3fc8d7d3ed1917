//! Type-info projection for diagnostics and introspection tools.
//!
//! Lists the enumerable own members of a live object: functions with their
//! parameter names, everything else as data. Two members whose names differ
//! only by letter case cannot be told apart by case-insensitive hosts, so
//! the projection reports them instead of picking one.

use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;

use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::object::{EnumMode, FunctionData, get_member, property_names};
use crate::value::{JsObjectRef, JsValue};

/// One projected member
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MemberInfo {
    Function { name: String, params: Vec<String> },
    Data { name: String },
}

impl MemberInfo {
    pub fn name(&self) -> &str {
        match self {
            MemberInfo::Function { name, .. } | MemberInfo::Data { name } => name,
        }
    }
}

/// Projection of one object, members in enumeration order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TypeInfo {
    pub class: String,
    pub members: Vec<MemberInfo>,
}

impl TypeInfo {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[derive(Debug, Error)]
pub enum TypeInfoError {
    #[error("ambiguous member names '{first}' and '{second}'")]
    Ambiguous { first: String, second: String },

    #[error(transparent)]
    Engine(#[from] JsError),
}

/// Project the enumerable own members of `obj`
pub fn project(interp: &mut Interpreter, obj: &JsObjectRef) -> Result<TypeInfo, TypeInfoError> {
    let class = obj.borrow().class_name().to_string();
    let mut seen: IndexMap<String, String> = IndexMap::new();
    let mut members = Vec::new();

    for name in property_names(obj, EnumMode::EnumOnly)? {
        let folded = name.as_str().to_lowercase();
        if let Some(first) = seen.get(&folded) {
            return Err(TypeInfoError::Ambiguous {
                first: first.clone(),
                second: name.to_string(),
            });
        }
        seen.insert(folded, name.to_string());

        let value = get_member(interp, obj, name.as_str())?;
        members.push(match function_params(&value) {
            Some(params) => MemberInfo::Function {
                name: name.to_string(),
                params,
            },
            None => MemberInfo::Data { name: name.to_string() },
        });
    }

    Ok(TypeInfo { class, members })
}

/// Parameter names of a function value; native functions report none
fn function_params(value: &JsValue) -> Option<Vec<String>> {
    let JsValue::Object(obj) = value else {
        return None;
    };
    let o = obj.borrow();
    match o.as_function()? {
        FunctionData::Native(_) => Some(Vec::new()),
        FunctionData::Source(f) => Some(
            f.code
                .function(f.func_id)
                .map(|code| code.params.iter().map(|p| p.to_string()).collect())
                .unwrap_or_default(),
        ),
    }
}
