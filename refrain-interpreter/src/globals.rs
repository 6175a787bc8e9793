// SPDX-FileCopyrightText: 2023 Marshall Wace <opensource@mwam.com>
// SPDX-License-Identifier: Apache-2.0
// SPDX-FileContributor: Tim Kendrick <t.kendrick@mwam.com> https://github.com/timkendrickmw
use refrain::{
    builtin::{math_constants, Builtin},
    runtime::{Environment, Value},
};

/// Populates a global frame with the builtins available to every program
pub fn builtin_globals(environment: &Environment) {
    for builtin in Builtin::entries() {
        environment.define(builtin.global_name(), Value::Builtin(builtin));
    }
    for (name, value) in math_constants() {
        environment.define(format!("math_{}", name), Value::Number(value));
    }
    environment.define("NaN", Value::Number(f64::NAN));
    environment.define("Infinity", Value::Number(f64::INFINITY));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defines_math_and_list_helpers() {
        let environment = Environment::global();
        builtin_globals(&environment);
        assert!(matches!(
            environment.lookup("math_sin"),
            Some(Value::Builtin(Builtin::Sin))
        ));
        assert!(matches!(
            environment.lookup("length"),
            Some(Value::Builtin(Builtin::Length))
        ));
        assert!(matches!(
            environment.lookup("list"),
            Some(Value::Builtin(Builtin::List))
        ));
        assert!(matches!(
            environment.lookup("math_PI"),
            Some(Value::Number(value)) if value == std::f64::consts::PI
        ));
        assert!(environment.lookup("math_nonexistent").is_none());
    }
}
