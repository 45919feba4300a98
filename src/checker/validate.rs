//! Definition validation
//!
//! Runs before any trace extraction. Rejects:
//! - calls to undefined contracts and arity mismatches
//! - channel or payload names that are not in scope
//! - duplicate formal parameters
//! - recursion variables that are unbound or unguarded in a type

use std::collections::BTreeSet;

use crate::behavior::{BehavioralType, TypeDecl};
use crate::checker::Module;
use crate::error::DefinitionError;
use crate::process::{Action, Contract};

/// Validate `name` and every contract reachable from it through calls
pub fn validate_contract(module: &Module, name: &str) -> Result<(), DefinitionError> {
    if module.contract(name).is_none() {
        return Err(DefinitionError::NoSuchContract(name.to_string()));
    }
    for contract in module.reachable(name) {
        validate_body(module, contract)?;
    }
    Ok(())
}

/// Validate a contract's parameters and body in isolation from its callees
pub fn validate_body(module: &Module, contract: &Contract) -> Result<(), DefinitionError> {
    let mut seen = BTreeSet::new();
    for param in &contract.params {
        if !seen.insert(param.as_str()) {
            return Err(DefinitionError::DuplicateParameter {
                contract: contract.name.clone(),
                param: param.clone(),
            });
        }
    }

    if let Some(behavior) = &contract.behavior {
        if module.type_decl(behavior).is_none() {
            return Err(DefinitionError::UnknownType {
                contract: contract.name.clone(),
                behavior: behavior.clone(),
            });
        }
    }

    let mut scope: Vec<&str> = contract.params.iter().map(String::as_str).collect();
    check_action(module, contract, &contract.body, &mut scope)
}

fn check_action<'a>(
    module: &Module,
    contract: &Contract,
    action: &'a Action,
    scope: &mut Vec<&'a str>,
) -> Result<(), DefinitionError> {
    match action {
        Action::Nil => Ok(()),
        Action::Send { channel, payload } => {
            in_scope(contract, scope, channel)?;
            for name in payload.iter().filter_map(|v| v.name()) {
                in_scope(contract, scope, name)?;
            }
            Ok(())
        }
        Action::Receive { channel, bind, then } => {
            in_scope(contract, scope, channel)?;
            let mark = scope.len();
            scope.extend(bind.iter().map(String::as_str));
            let result = check_action(module, contract, then, scope);
            scope.truncate(mark);
            result
        }
        Action::Parallel(children) => {
            for child in children {
                check_action(module, contract, child, scope)?;
            }
            Ok(())
        }
        Action::Select(branches) => {
            for branch in branches {
                for bind in &branch.join {
                    in_scope(contract, scope, &bind.channel)?;
                }
                let mark = scope.len();
                for bind in &branch.join {
                    scope.extend(bind.bind.iter().map(String::as_str));
                }
                let result = check_action(module, contract, &branch.then, scope);
                scope.truncate(mark);
                result?;
            }
            Ok(())
        }
        Action::New { channels, body } => {
            let mark = scope.len();
            scope.extend(channels.iter().map(String::as_str));
            let result = check_action(module, contract, body, scope);
            scope.truncate(mark);
            result
        }
        Action::Recurse { contract: callee, args } => {
            let target = module
                .contract(callee)
                .ok_or_else(|| DefinitionError::UnknownContract {
                    contract: contract.name.clone(),
                    callee: callee.clone(),
                })?;
            if target.params.len() != args.len() {
                return Err(DefinitionError::ArityMismatch {
                    contract: contract.name.clone(),
                    callee: callee.clone(),
                    expected: target.params.len(),
                    found: args.len(),
                });
            }
            for arg in args {
                in_scope(contract, scope, arg)?;
            }
            Ok(())
        }
    }
}

fn in_scope(contract: &Contract, scope: &[&str], name: &str) -> Result<(), DefinitionError> {
    if scope.iter().any(|s| *s == name) {
        Ok(())
    } else {
        Err(DefinitionError::UnboundName {
            contract: contract.name.clone(),
            name: name.to_string(),
        })
    }
}

/// Validate a type declaration: every recursion variable is bound by an
/// enclosing `Fix` and guarded by at least one `After` below that `Fix`.
pub fn validate_type(decl: &TypeDecl) -> Result<(), DefinitionError> {
    let mut env: Vec<(&str, bool)> = Vec::new();
    check_type(decl, &decl.body, &mut env)
}

fn check_type<'a>(
    decl: &TypeDecl,
    ty: &'a BehavioralType,
    env: &mut Vec<(&'a str, bool)>,
) -> Result<(), DefinitionError> {
    match ty {
        BehavioralType::After { then, .. } => {
            // Everything bound so far is guarded below this point
            let mut guarded: Vec<(&str, bool)> = env.iter().map(|(n, _)| (*n, true)).collect();
            check_type(decl, then, &mut guarded)
        }
        BehavioralType::Choice(alternatives) => {
            for alt in alternatives {
                check_type(decl, alt, env)?;
            }
            Ok(())
        }
        BehavioralType::Fix { name, body } => {
            env.push((name.as_str(), false));
            let result = check_type(decl, body, env);
            env.pop();
            result
        }
        BehavioralType::Ref(var) => match env.iter().rev().find(|(n, _)| *n == var.as_str()) {
            None => Err(DefinitionError::UnboundTypeVariable {
                ty: decl.name.clone(),
                var: var.clone(),
            }),
            Some((_, false)) => Err(DefinitionError::UnguardedRecursion {
                ty: decl.name.clone(),
                var: var.clone(),
            }),
            Some((_, true)) => Ok(()),
        },
    }
}
