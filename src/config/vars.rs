//! Environment variable interpolation for config files.
//!
//! Supported forms:
//! - `$VAR` or `${VAR}`: substitute, error if unset
//! - `${VAR:-default}`: default when VAR is unset or empty
//! - `${VAR-default}`: default only when VAR is unset
//! - `$$`: literal `$`

use regex::{Captures, Regex};
use std::env;
use std::sync::LazyLock;

static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        \$\$
        |
        \$\{
            (?P<braced>[A-Za-z_][A-Za-z0-9_]*)
            (?: (?P<op>:?-) (?P<default>[^}]*) )?
        \}
        |
        \$(?P<bare>[A-Za-z_][A-Za-z0-9_]*)
        ",
    )
    .expect("env var pattern is valid")
});

/// Interpolated text plus every problem found along the way.
#[derive(Debug)]
pub struct Interpolated {
    pub text: String,
    pub errors: Vec<String>,
}

impl Interpolated {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Substitute environment variables in `input`.
///
/// Errors are collected rather than returned early so a config with several
/// missing variables reports all of them at once.
pub fn interpolate(input: &str) -> Interpolated {
    let mut errors = Vec::new();

    let text = ENV_VAR_PATTERN
        .replace_all(input, |caps: &Captures| substitute(caps, &mut errors))
        .into_owned();

    Interpolated { text, errors }
}

fn substitute(caps: &Captures, errors: &mut Vec<String>) -> String {
    let whole = &caps[0];
    if whole == "$$" {
        return "$".to_string();
    }

    let name = caps
        .name("braced")
        .or_else(|| caps.name("bare"))
        .map(|m| m.as_str())
        .unwrap_or_default();
    let empty_uses_default = caps.name("op").is_some_and(|op| op.as_str() == ":-");
    let default = caps.name("default").map(|m| m.as_str());

    match env::var(name) {
        Ok(value) if value.contains(['\n', '\r']) => {
            errors.push(format!(
                "environment variable '{name}' contains newlines, which is not allowed"
            ));
            whole.to_string()
        }
        Ok(value) if value.is_empty() && empty_uses_default => {
            default.unwrap_or_default().to_string()
        }
        Ok(value) => value,
        Err(_) => match default {
            Some(default) => default.to_string(),
            None => {
                errors.push(format!("environment variable '{name}' is not set"));
                whole.to_string()
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_env_vars<F, R>(vars: &[(&str, Option<&str>)], f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let saved: Vec<_> = vars.iter().map(|(k, _)| (*k, env::var(k).ok())).collect();

        // SAFETY: every test uses its own variable names.
        for (key, value) in vars {
            match value {
                Some(v) => unsafe { env::set_var(key, v) },
                None => unsafe { env::remove_var(key) },
            }
        }

        let result = f();

        // SAFETY: restores the values captured above.
        for (key, value) in saved {
            match value {
                Some(v) => unsafe { env::set_var(key, v) },
                None => unsafe { env::remove_var(key) },
            }
        }

        result
    }

    #[test]
    fn test_bare_and_braced() {
        with_env_vars(
            &[
                ("SILVERIZE_TEST_BARE", Some("acme")),
                ("SILVERIZE_TEST_BRACED", Some("bronze")),
            ],
            || {
                let out = interpolate("a: $SILVERIZE_TEST_BARE b: ${SILVERIZE_TEST_BRACED}");
                assert!(out.is_ok());
                assert_eq!(out.text, "a: acme b: bronze");
            },
        );
    }

    #[test]
    fn test_missing_variables_all_reported() {
        with_env_vars(
            &[("SILVERIZE_TEST_MISS1", None), ("SILVERIZE_TEST_MISS2", None)],
            || {
                let out = interpolate("$SILVERIZE_TEST_MISS1 ${SILVERIZE_TEST_MISS2}");
                assert_eq!(out.errors.len(), 2);
                assert!(out.errors[0].contains("SILVERIZE_TEST_MISS1"));
                assert!(out.errors[1].contains("not set"));
            },
        );
    }

    #[test]
    fn test_colon_default_covers_empty() {
        with_env_vars(&[("SILVERIZE_TEST_EMPTY", Some(""))], || {
            assert_eq!(interpolate("${SILVERIZE_TEST_EMPTY:-x}").text, "x");
            assert_eq!(interpolate("${SILVERIZE_TEST_EMPTY-x}").text, "");
        });
    }

    #[test]
    fn test_default_when_unset() {
        with_env_vars(&[("SILVERIZE_TEST_UNSET", None)], || {
            assert_eq!(interpolate("${SILVERIZE_TEST_UNSET-x}").text, "x");
            assert_eq!(interpolate("${SILVERIZE_TEST_UNSET:-}").text, "");
        });
    }

    #[test]
    fn test_set_variable_beats_default() {
        with_env_vars(&[("SILVERIZE_TEST_SET", Some("real"))], || {
            assert_eq!(interpolate("${SILVERIZE_TEST_SET:-x}").text, "real");
        });
    }

    #[test]
    fn test_dollar_escape() {
        let out = interpolate("cost: $$5");
        assert!(out.is_ok());
        assert_eq!(out.text, "cost: $5");
    }

    #[test]
    fn test_newlines_rejected() {
        with_env_vars(&[("SILVERIZE_TEST_NL", Some("a\r\nb"))], || {
            let out = interpolate("$SILVERIZE_TEST_NL");
            assert!(!out.is_ok());
            assert!(out.errors[0].contains("newlines"));
        });
    }

    #[test]
    fn test_config_document() {
        with_env_vars(
            &[
                ("SILVERIZE_TEST_HOOK", Some("https://hooks.example.com/x")),
                ("SILVERIZE_TEST_REGION", None),
            ],
            || {
                let yaml = r#"
storage:
  options:
    aws_region: ${SILVERIZE_TEST_REGION:-us-east-1}
notifier:
  kind: webhook
  url: ${SILVERIZE_TEST_HOOK}
"#;
                let out = interpolate(yaml);
                assert!(out.is_ok());
                assert!(out.text.contains("aws_region: us-east-1"));
                assert!(out.text.contains("url: https://hooks.example.com/x"));
            },
        );
    }
}
