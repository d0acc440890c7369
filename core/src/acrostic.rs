//! Acrostic poems: one line per letter, each line opening with a word that
//! starts with that letter.

use rand::seq::IndexedRandom;
use rand::Rng;

use crate::error::ToolError;

/// Longest word an acrostic accepts.
pub const MAX_WORD_LEN: usize = 15;

// A..=Z
const LETTER_WORDS: [&[&str]; 26] = [
    &["Always", "Amber", "Awake"],
    &["Beneath", "Bright", "Boundless"],
    &["Carry", "Calm", "Courage"],
    &["Dawn", "Dreams", "Deep"],
    &["Every", "Echoes", "Evening"],
    &["Forever", "Free", "Fields"],
    &["Gentle", "Golden", "Grace"],
    &["Hope", "Horizons", "Hearts"],
    &["In", "Infinite", "Inside"],
    &["Journeys", "Joy", "Jasmine"],
    &["Kindness", "Keep", "Kindled"],
    &["Light", "Love", "Lingering"],
    &["Morning", "Moments", "Memory"],
    &["Never", "New", "Night"],
    &["Open", "Onward", "Ocean"],
    &["Patience", "Peace", "Promise"],
    &["Quiet", "Quest", "Quickening"],
    &["Rising", "Rivers", "Rest"],
    &["Softly", "Stars", "Still"],
    &["Together", "Time", "Tender"],
    &["Under", "Unfolding", "Until"],
    &["Voices", "Vast", "Velvet"],
    &["Wonder", "Whispers", "Wings"],
    &["Xanadu", "Xenial", "Xylem"],
    &["Yearning", "Yesterday", "Yet"],
    &["Zephyrs", "Zeal", "Zenith"],
];

const THEMED_TAILS: &[&str] = &[
    "of {theme} and quiet hope",
    "where {theme} finds its voice",
    "carried on the breath of {theme}",
    "in the long light of {theme}",
    "and {theme} answers back",
];

const PLAIN_TAILS: &[&str] = &[
    "as the day begins",
    "that no one can erase",
    "held in open hands",
    "beneath a patient sky",
    "like a song half remembered",
];

/// Upper-cases `word` and drops its whitespace, which never gets a line.
pub fn normalize_word(word: &str) -> String {
    word.chars()
        .filter(|ch| !ch.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Normalizes `word`, rejecting anything longer than [`MAX_WORD_LEN`]
/// characters once whitespace is gone.
pub fn validate_word(word: &str) -> Result<String, ToolError> {
    let word = normalize_word(word);
    let len = word.chars().count();
    if len > MAX_WORD_LEN {
        return Err(ToolError::WordTooLong {
            word,
            len,
            max: MAX_WORD_LEN,
        });
    }
    Ok(word)
}

/// Words available for the line that starts with `letter`.
pub fn letter_words(letter: char) -> Option<&'static [&'static str]> {
    let upper = letter.to_ascii_uppercase();
    upper
        .is_ascii_uppercase()
        .then(|| LETTER_WORDS[(upper as u8 - b'A') as usize])
}

/// One line per character of the normalized `word`. Letters open with a
/// word from the per-letter table; any other character opens its own line.
pub fn generate_acrostic<R: Rng + ?Sized>(word: &str, theme: Option<&str>, rng: &mut R) -> String {
    let word = normalize_word(word);
    let theme = theme.map(str::trim).filter(|t| !t.is_empty());

    word.chars()
        .map(|ch| {
            let opener = letter_words(ch)
                .and_then(|words| words.choose(rng).copied())
                .map(str::to_string)
                .unwrap_or_else(|| ch.to_string());
            let tail = match theme {
                Some(theme) => THEMED_TAILS
                    .choose(rng)
                    .copied()
                    .unwrap_or_default()
                    .replace("{theme}", theme),
                None => PLAIN_TAILS.choose(rng).copied().unwrap_or_default().to_string(),
            };
            format!("{opener} {tail}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
