//! Short codes: compact, deterministic candidate identifiers.
//!
//! A short code is derived from candidate text by transliterating it to ASCII,
//! keeping the first three words, and collapsing every run of non-word
//! characters into a single underscore. Codes key vote records and are embedded
//! in action payloads, so they are capped at [`ShortCode::MAX_LEN`] bytes.
//!
//! Cyrillic follows the Wikipedia romanization of Russian:
//!
//! ```
//! use tally_types::ShortCode;
//!
//! assert_eq!(ShortCode::derive("Мастер и Маргарита").as_str(), "Master_i_Margarita");
//! assert_eq!(ShortCode::derive("Щегол").as_str(), "Shchegol");
//! ```

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9A-Za-z_]+").expect("static regex is valid"));

/// Words of the transliterated text that make it into the code.
const WORDS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShortCode(String);

impl ShortCode {
    /// Payload budget is 64 bytes; the longest command prefix is `unvote_select `.
    pub const MAX_LEN: usize = 48;

    #[must_use]
    pub fn derive(text: &str) -> Self {
        let ascii = transliterate(text);
        let head = ascii.split_whitespace().take(WORDS).collect::<Vec<_>>().join(" ");
        let mut code = NON_WORD.replace_all(&head, "_").into_owned();
        // ASCII only at this point, so any byte offset is a char boundary.
        code.truncate(Self::MAX_LEN);
        Self(code)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShortCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for ShortCode {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ShortCode {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

fn is_cyrillic_vowel(c: char) -> bool {
    matches!(
        c,
        'а' | 'е' | 'ё' | 'и' | 'о' | 'у' | 'ы' | 'э' | 'ю' | 'я'
    )
}

fn base_mapping(c: char) -> Option<&'static str> {
    let mapped = match c {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'е' => "e",
        'ё' => "yo",
        'ж' => "zh",
        'з' => "z",
        'и' => "i",
        'й' => "y",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "kh",
        'ц' => "ts",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "shch",
        'ъ' | 'ь' => "",
        'ы' => "y",
        'э' => "e",
        'ю' => "yu",
        'я' => "ya",
        _ => return None,
    };
    Some(mapped)
}

fn lower(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Romanize Cyrillic and strip diacritics from everything else.
///
/// Characters with no ASCII decomposition are kept as-is; [`ShortCode::derive`]
/// turns them into separators afterwards.
#[must_use]
pub fn transliterate(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        let original = chars[i];
        let c = lower(original);
        let Some(base) = base_mapping(c) else {
            for d in original.to_string().nfkd() {
                if !is_combining_mark(d) {
                    out.push(d);
                }
            }
            i += 1;
            continue;
        };

        let prev = i.checked_sub(1).map(|p| lower(chars[p]));
        let next = chars.get(i + 1).copied().map(lower);
        let after_next = chars.get(i + 2).copied();
        let word_start = prev.is_none_or(|p| !p.is_alphabetic());

        let mut consumed = 1;
        let mapped = match c {
            'е' if word_start
                || prev.is_some_and(|p| is_cyrillic_vowel(p) || p == 'ъ' || p == 'ь') =>
            {
                "ye"
            }
            'и' | 'ы'
                if next == Some('й') && after_next.is_none_or(|a| !a.is_alphabetic()) =>
            {
                consumed = 2;
                "y"
            }
            'ъ' | 'ь'
                if next.is_some_and(|n| {
                    is_cyrillic_vowel(n) && !matches!(n, 'е' | 'ё' | 'ю' | 'я')
                }) =>
            {
                "y"
            }
            _ => base,
        };

        if original.is_uppercase() {
            let shout = chars.get(i + 1).is_some_and(|n| n.is_uppercase());
            let mut letters = mapped.chars();
            if let Some(first) = letters.next() {
                out.push(first.to_ascii_uppercase());
                for rest in letters {
                    out.push(if shout { rest.to_ascii_uppercase() } else { rest });
                }
            }
        } else {
            out.push_str(mapped);
        }
        i += consumed;
    }

    out
}
