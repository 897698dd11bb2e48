//! Masks words matching a regular expression.
//!
//! Options:
//! - `pattern`: regular expression matched against each word
//!   (default: words made only of digits)
//! - `mask`: masking character (default `*`)
//!
//! Redacted words keep their length and are marked with `data.redacted`.

use regex::Regex;
use serde_json::Value;

use crate::{errors::RetextError, model::WORD_NODE, plugin::Plugin};

use super::{rewrite_words, string_option, Options};

pub const NAME: &str = "redact";

const DEFAULT_PATTERN: &str = r"^\d+$";
const DEFAULT_MASK: char = '*';

pub fn plugin(options: &Options) -> Result<Plugin, RetextError> {
    let pattern = string_option(NAME, options, "pattern")?.unwrap_or(DEFAULT_PATTERN);
    let regex = Regex::new(pattern).map_err(|e| {
        RetextError::config(format!("{NAME}: invalid pattern `{pattern}`: {e}"))
    })?;
    let mask = match string_option(NAME, options, "mask")? {
        None => DEFAULT_MASK,
        Some(mask) => {
            let mut chars = mask.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => c,
                _ => {
                    return Err(RetextError::config(format!(
                        "{NAME}: mask must be a single character, got `{mask}`"
                    )))
                }
            }
        }
    };

    Ok(Plugin::build(NAME)
        .on_attach(|processor| {
            if processor.model().contains(WORD_NODE) {
                Ok(())
            } else {
                Err(RetextError::InvalidPlugin {
                    reason: format!("{NAME} needs a model with `{WORD_NODE}`"),
                })
            }
        })
        .sync(move |tree, _| {
            let redacted = rewrite_words(tree, |word| {
                regex
                    .is_match(word)
                    .then(|| std::iter::repeat(mask).take(word.chars().count()).collect())
            })?;
            for word in &redacted {
                word.borrow_mut()
                    .data_mut()
                    .insert("redacted".into(), Value::Bool(true));
            }
            Ok(())
        }))
}
