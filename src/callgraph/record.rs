use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Composite identity of a function: `name@filePath`.
///
/// `name` alone is not unique across files, so every lookup in the crate goes
/// through this key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionKey(String);

impl FunctionKey {
    pub fn new(name: &str, file_path: &str) -> Self {
        Self(format!("{name}@{file_path}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FunctionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A reference to a callee as listed in a caller's call list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRef {
    pub name: String,
    #[serde(default)]
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl CallRef {
    pub fn new(name: impl Into<String>, file_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file_path: file_path.into(),
            line: None,
        }
    }

    pub fn key(&self) -> FunctionKey {
        FunctionKey::new(&self.name, &self.file_path)
    }
}

/// One function of the dataset with its outgoing calls in declaration order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionRecord {
    pub name: String,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub file_path: String,
    #[serde(
        default,
        rename = "called",
        alias = "calls",
        deserialize_with = "null_as_empty"
    )]
    pub calls: Vec<CallRef>,
}

impl FunctionRecord {
    pub fn new(name: impl Into<String>, file_path: impl Into<String>, line: u32) -> Self {
        Self {
            name: name.into(),
            line,
            file_path: file_path.into(),
            calls: Vec::new(),
        }
    }

    pub fn with_call(mut self, call: CallRef) -> Self {
        self.calls.push(call);
        self
    }

    pub fn key(&self) -> FunctionKey {
        FunctionKey::new(&self.name, &self.file_path)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<CallRef>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<CallRef>>::deserialize(deserializer)?.unwrap_or_default())
}
