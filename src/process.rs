//! Process AST
//!
//! Contract bodies are trees of actions over named channels: receives with a
//! continuation, asynchronous sends, parallel composition, join-pattern
//! selects, fresh channel scopes and recursive contract calls.
//!
//! The serde representation is the structured input format produced by an
//! external front end (see `parser::document`).

use serde::{Deserialize, Serialize};

/// A contract definition: `contract Name(params) = body`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    /// Contract name (e.g., "TokenBank")
    pub name: String,
    /// Formal channel parameters
    #[serde(default)]
    pub params: Vec<String>,
    /// Process body
    pub body: Action,
    /// Declared behavioral type, by type declaration name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior: Option<String>,
}

impl Contract {
    pub fn new(name: &str, params: &[&str], body: Action) -> Self {
        Contract {
            name: name.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
            body,
            behavior: None,
        }
    }

    /// Attach a declared behavioral type
    pub fn with_behavior(mut self, behavior: &str) -> Self {
        self.behavior = Some(behavior.to_string());
        self
    }
}

/// A payload element of a send
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Bool(bool),
    /// String literal, written `{ "text": "..." }`
    Text { text: String },
    /// A channel or a received name; must be in scope
    Name(String),
}

impl Value {
    pub fn name(&self) -> Option<&str> {
        match self {
            Value::Name(name) => Some(name),
            _ => None,
        }
    }
}

/// One receive inside a join pattern: `bind <- channel`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bind {
    pub channel: String,
    #[serde(default)]
    pub bind: Vec<String>,
}

/// A select branch: fires once every receive of its join pattern is
/// satisfiable, then runs its continuation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    /// Ordered join pattern
    pub join: Vec<Bind>,
    #[serde(default)]
    pub then: Action,
}

/// Process action tree
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// The inert process
    #[default]
    Nil,
    /// Receive on `channel`, binding `bind`, then continue with `then`
    Receive {
        channel: String,
        #[serde(default)]
        bind: Vec<String>,
        #[serde(default)]
        then: Box<Action>,
    },
    /// Asynchronous send; has no continuation
    Send {
        channel: String,
        #[serde(default)]
        payload: Vec<Value>,
    },
    /// Parallel composition
    #[serde(rename = "par")]
    Parallel(Vec<Action>),
    /// Non-deterministic choice between join-pattern branches
    Select(Vec<Branch>),
    /// Call a contract with channel arguments
    Recurse {
        contract: String,
        #[serde(default)]
        args: Vec<String>,
    },
    /// Fresh channels, visible only inside `body`
    New { channels: Vec<String>, body: Box<Action> },
}

impl Action {
    pub fn receive(channel: &str, bind: &[&str], then: Action) -> Self {
        Action::Receive {
            channel: channel.to_string(),
            bind: bind.iter().map(|b| b.to_string()).collect(),
            then: Box::new(then),
        }
    }

    pub fn send(channel: &str, payload: Vec<Value>) -> Self {
        Action::Send {
            channel: channel.to_string(),
            payload,
        }
    }

    pub fn par(children: Vec<Action>) -> Self {
        Action::Parallel(children)
    }

    pub fn select(branches: Vec<Branch>) -> Self {
        Action::Select(branches)
    }

    pub fn recurse(contract: &str, args: &[&str]) -> Self {
        Action::Recurse {
            contract: contract.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn fresh(channels: &[&str], body: Action) -> Self {
        Action::New {
            channels: channels.iter().map(|c| c.to_string()).collect(),
            body: Box::new(body),
        }
    }

    /// Whether `name` is sent as a payload somewhere in this tree, stopping at
    /// scopes that shadow it.
    pub fn sends_name(&self, name: &str) -> bool {
        match self {
            Action::Nil | Action::Recurse { .. } => false,
            Action::Send { payload, .. } => payload.iter().any(|v| v.name() == Some(name)),
            Action::Receive { bind, then, .. } => {
                !bind.iter().any(|b| b == name) && then.sends_name(name)
            }
            Action::Parallel(children) => children.iter().any(|c| c.sends_name(name)),
            Action::Select(branches) => branches.iter().any(|branch| {
                let shadowed = branch
                    .join
                    .iter()
                    .any(|b| b.bind.iter().any(|n| n == name));
                !shadowed && branch.then.sends_name(name)
            }),
            Action::New { channels, body } => {
                !channels.iter().any(|c| c == name) && body.sends_name(name)
            }
        }
    }
}

impl Branch {
    pub fn new(join: Vec<Bind>, then: Action) -> Self {
        Branch { join, then }
    }
}

impl Bind {
    pub fn new(channel: &str, bind: &[&str]) -> Self {
        Bind {
            channel: channel.to_string(),
            bind: bind.iter().map(|b| b.to_string()).collect(),
        }
    }
}
