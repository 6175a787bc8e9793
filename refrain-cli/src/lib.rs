// SPDX-FileCopyrightText: 2023 Marshall Wace <opensource@mwam.com>
// SPDX-License-Identifier: Apache-2.0
// SPDX-FileContributor: Tim Kendrick <t.kendrick@mwam.com> https://github.com/timkendrickmw
use std::{path::Path, str::FromStr};

use anyhow::{anyhow, Result};
use refrain::{specialize, Specialization, SpecializerOptions};
use refrain_interpreter::Interpreter;
use refrain_js::{parse_file, with_prelude};

#[derive(Eq, PartialEq, Clone, Copy, Debug)]
pub enum Format {
    JavaScript,
    Json,
}
impl FromStr for Format {
    type Err = anyhow::Error;
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.to_lowercase().as_str() {
            "javascript" | "js" => Ok(Self::JavaScript),
            "json" => Ok(Self::Json),
            _ => Err(anyhow!("Unknown format: {}", input)),
        }
    }
}

pub fn render(result: &Specialization, format: Format) -> Result<String> {
    match format {
        Format::JavaScript => Ok(format!("{}", result)),
        Format::Json => Ok(serde_json::to_string_pretty(result)?),
    }
}

/// Parses and evaluates a program, then specializes one of its top-level bindings
pub fn specialize_source(
    source: &str,
    path: Option<&Path>,
    target: &str,
    prelude: bool,
    interpreter: &Interpreter,
    options: &SpecializerOptions,
) -> Result<Specialization> {
    let source = if prelude {
        with_prelude(source)
    } else {
        String::from(source)
    };
    let program =
        parse_file(&source, path).map_err(|err| anyhow!("Failed to parse source: {}", err))?;
    specialize(target, &program, interpreter, options)
        .map_err(|err| anyhow!("Failed to specialize {}: {}", target, err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_formats() {
        assert_eq!(Format::from_str("JS").unwrap(), Format::JavaScript);
        assert_eq!(Format::from_str("json").unwrap(), Format::Json);
        assert!(Format::from_str("lisp").is_err());
    }

    #[test]
    fn specializes_with_prelude() {
        let result = specialize_source(
            "const sound = silence_sound(1); const wave = get_wave(sound);",
            None,
            "wave",
            true,
            &Interpreter::default(),
            &SpecializerOptions::default(),
        )
        .unwrap();
        assert_eq!(
            render(&result, Format::JavaScript).unwrap(),
            "function wave(t) {\n  return 0;\n}"
        );
        let json = render(&result, Format::Json).unwrap();
        assert!(json.contains("\"type\": \"Function\""));
    }

    #[test]
    fn reports_missing_targets() {
        let err = specialize_source(
            "const x = 1;",
            None,
            "wave",
            false,
            &Interpreter::default(),
            &SpecializerOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Failed to specialize wave: Unbound symbol: wave");
    }
}
