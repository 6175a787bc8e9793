// SPDX-FileCopyrightText: 2023 Marshall Wace <opensource@mwam.com>
// SPDX-License-Identifier: Apache-2.0
// SPDX-FileContributor: Tim Kendrick <t.kendrick@mwam.com> https://github.com/timkendrickmw
use serde::{Deserialize, Serialize};

#[derive(Eq, PartialEq, Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum SpecializeError {
    /// A syntactic construct outside the supported subset
    UnsupportedNode(String),
    /// A free identifier that resolves neither statically nor in the runtime environment
    UnboundSymbol(String),
    /// A write that would mutate a binding outside the closure being specialized
    PurityViolation(String),
    /// A call whose callee is neither a function value nor a whitelisted builtin
    UnsupportedCall(String),
    /// A loop that does not match the unrollable shape
    UnsupportedLoop(String),
    /// A list operation applied to something other than a concrete list
    NonConcreteList(String),
    /// A value that cannot appear in specialized output
    UnsupportedValue(String),
    /// Nested inlining exceeded the configured depth
    RecursionLimit(String),
    /// A pass produced output that violates the guarantees of a later pass
    InternalConsistency(String),
    /// The evaluator failed to run the input program
    Evaluation(String),
}
impl std::error::Error for SpecializeError {}
impl std::fmt::Display for SpecializeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedNode(message) => write!(f, "Unsupported syntax: {}", message),
            Self::UnboundSymbol(name) => write!(f, "Unbound symbol: {}", name),
            Self::PurityViolation(name) => write!(
                f,
                "Purity violation: assignment to {} escapes the specialized closure",
                name
            ),
            Self::UnsupportedCall(callee) => write!(f, "Unsupported call: {}", callee),
            Self::UnsupportedLoop(message) => write!(f, "Unsupported loop: {}", message),
            Self::NonConcreteList(value) => {
                write!(f, "Expected a concrete list, received {}", value)
            }
            Self::UnsupportedValue(message) => write!(f, "Unsupported value: {}", message),
            Self::RecursionLimit(message) => write!(f, "Recursion limit exceeded: {}", message),
            Self::InternalConsistency(message) => {
                write!(f, "Internal consistency error: {}", message)
            }
            Self::Evaluation(message) => write!(f, "Evaluation failed: {}", message),
        }
    }
}
