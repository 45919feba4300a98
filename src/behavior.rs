//! Behavioral type AST
//!
//! A behavioral type bounds the communication orderings a contract may
//! exhibit:
//! - `After(ch, T)`: communicate on `ch`, then behave as `T`
//! - `Choice(T1, .., Tn)`: behave as any one branch
//! - `Fix(X, T)`: recursive type, `X` bound in `T`
//! - `Ref(X)`: occurrence of a bound recursion variable
//!
//! Rendered form (used in diagnostics): `rec X.((get.rtn.X) + (set.X))`.
//! The empty choice renders as `0` and accepts nothing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};

/// A behavioral type term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehavioralType {
    After {
        channel: String,
        then: Box<BehavioralType>,
    },
    Choice(Vec<BehavioralType>),
    Fix {
        name: String,
        body: Box<BehavioralType>,
    },
    Ref(String),
}

/// A named type declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: String,
    pub body: BehavioralType,
}

impl TypeDecl {
    pub fn new(name: &str, body: BehavioralType) -> Self {
        TypeDecl {
            name: name.to_string(),
            body,
        }
    }
}

impl BehavioralType {
    pub fn after(channel: &str, then: BehavioralType) -> Self {
        BehavioralType::After {
            channel: channel.to_string(),
            then: Box::new(then),
        }
    }

    pub fn choice(alternatives: Vec<BehavioralType>) -> Self {
        BehavioralType::Choice(alternatives)
    }

    pub fn fix(name: &str, body: BehavioralType) -> Self {
        BehavioralType::Fix {
            name: name.to_string(),
            body: Box::new(body),
        }
    }

    pub fn var(name: &str) -> Self {
        BehavioralType::Ref(name.to_string())
    }

    /// Channel names this type mentions (its alphabet)
    pub fn channels(&self) -> BTreeSet<String> {
        let mut channels = BTreeSet::new();
        self.collect_channels(&mut channels);
        channels
    }

    fn collect_channels(&self, out: &mut BTreeSet<String>) {
        match self {
            BehavioralType::After { channel, then } => {
                out.insert(channel.clone());
                then.collect_channels(out);
            }
            BehavioralType::Choice(alternatives) => {
                for alt in alternatives {
                    alt.collect_channels(out);
                }
            }
            BehavioralType::Fix { body, .. } => body.collect_channels(out),
            BehavioralType::Ref(_) => {}
        }
    }
}

impl Display for BehavioralType {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            BehavioralType::After { channel, then } => write!(f, "{}.{}", channel, then),
            BehavioralType::Choice(alternatives) if alternatives.is_empty() => write!(f, "0"),
            BehavioralType::Choice(alternatives) if alternatives.len() == 1 => {
                write!(f, "{}", alternatives[0])
            }
            BehavioralType::Choice(alternatives) => {
                write!(f, "(")?;
                for (i, alt) in alternatives.iter().enumerate() {
                    if i > 0 {
                        write!(f, " + ")?;
                    }
                    write!(f, "({})", alt)?;
                }
                write!(f, ")")
            }
            BehavioralType::Fix { name, body } => write!(f, "rec {}.{}", name, body),
            BehavioralType::Ref(name) => write!(f, "{}", name),
        }
    }
}
