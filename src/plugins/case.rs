//! Upper- and lower-casing of words.

use crate::{errors::RetextError, plugin::Plugin};

use super::{rewrite_words, Options};

pub const UPPERCASE: &str = "uppercase";
pub const LOWERCASE: &str = "lowercase";

pub fn uppercase(_options: &Options) -> Result<Plugin, RetextError> {
    Ok(Plugin::sync(UPPERCASE, |tree, _| {
        rewrite_words(tree, |word| Some(word.to_uppercase())).map(|_| ())
    }))
}

pub fn lowercase(_options: &Options) -> Result<Plugin, RetextError> {
    Ok(Plugin::sync(LOWERCASE, |tree, _| {
        rewrite_words(tree, |word| Some(word.to_lowercase())).map(|_| ())
    }))
}
