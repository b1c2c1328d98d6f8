//! Human-readable `title_url` generation for plaques.
//!
//! Titles are transliterated (Chinese via `pinyin`) and slugified with the
//! `slug` crate, so "Site of the Globe Theatre" becomes
//! `site-of-the-globe-theatre`. Uniqueness is decided by a caller-supplied
//! async predicate, keeping the derivation itself pure.

use std::future::Future;

use pinyin::{Pinyin, ToPinyin};
use slug::slugify;
use thiserror::Error;

const MAX_SUFFIX_ATTEMPTS: usize = 32;

/// Longest base slug kept before suffixing. Titles may be 1500 characters.
const MAX_TITLE_URL_LEN: usize = 120;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("title is empty")]
    EmptyInput,
    #[error("failed to derive a title url from `{input}`")]
    Unrepresentable { input: String },
    #[error("exhausted attempts to find a unique title url for `{base}`")]
    Exhausted { base: String },
}

#[derive(Debug, Error)]
pub enum SlugAsyncError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error(transparent)]
    Predicate(E),
}

/// Derive the base `title_url` for a plaque title.
pub fn derive_title_url(title: &str) -> Result<String, SlugError> {
    if title.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let candidate = slugify(transliterate_to_ascii(title));
    let candidate = shorten(&candidate);

    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: title.to_string(),
        });
    }

    Ok(candidate)
}

/// Produce a `title_url` the predicate reports as free, suffixing `-2`, `-3`, …
/// on collision.
pub async fn unique_title_url<F, Fut, E>(
    title: &str,
    mut is_free: F,
) -> Result<String, SlugAsyncError<E>>
where
    F: FnMut(&str) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    let base = derive_title_url(title)?;

    if is_free(&base).await.map_err(SlugAsyncError::Predicate)? {
        return Ok(base);
    }

    for attempt in 2..=MAX_SUFFIX_ATTEMPTS + 1 {
        let candidate = format!("{base}-{attempt}");
        if is_free(&candidate).await.map_err(SlugAsyncError::Predicate)? {
            return Ok(candidate);
        }
    }

    Err(SlugAsyncError::Slug(SlugError::Exhausted { base }))
}

fn shorten(slug: &str) -> String {
    if slug.len() <= MAX_TITLE_URL_LEN {
        return slug.to_string();
    }
    // slugify output is ASCII, so byte slicing stays on char boundaries.
    slug[..MAX_TITLE_URL_LEN].trim_end_matches('-').to_string()
}

fn transliterate_to_ascii(input: &str) -> String {
    let mut output = String::with_capacity(input.len());

    for ch in input.chars() {
        if ch.is_ascii() {
            output.push(ch);
            continue;
        }

        match ch.to_pinyin() {
            Some(py) => append_pinyin(&mut output, py),
            None if ch.is_whitespace() => output.push(' '),
            None => output.push(ch),
        }
    }

    output
}

fn append_pinyin(buffer: &mut String, pinyin: Pinyin) {
    if !buffer.is_empty() && !buffer.ends_with(' ') {
        buffer.push(' ');
    }
    buffer.push_str(pinyin.plain());
}
