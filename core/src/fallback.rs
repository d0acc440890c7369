//! Template poems for when the upstream provider has nothing for us.
//!
//! Vocabulary is looked up by `(theme, mood)`, then `(theme, "inspiring")`,
//! then a neutral set. The random source is injectable: seed it for
//! reproducible output.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::{Rng, SeedableRng};

use crate::acrostic::{self, MAX_WORD_LEN};
use crate::prompt::defaults;

/// Word pools a template draws from.
#[derive(Debug)]
pub struct Palette {
    pub images: &'static [&'static str],
    pub verbs: &'static [&'static str],
    pub qualities: &'static [&'static str],
}

struct VocabEntry {
    theme: &'static str,
    mood: &'static str,
    palette: Palette,
}

static VOCABULARY: &[VocabEntry] = &[
    VocabEntry {
        theme: "nature",
        mood: "inspiring",
        palette: Palette {
            images: &["green hills", "tall cedars", "morning dew", "wild rivers"],
            verbs: &["rises", "unfolds", "awakens", "reaches"],
            qualities: &["ancient", "unbroken", "alive"],
        },
    },
    VocabEntry {
        theme: "nature",
        mood: "peaceful",
        palette: Palette {
            images: &["still ponds", "soft moss", "drifting leaves", "a sleeping meadow"],
            verbs: &["rests", "settles", "breathes", "lingers"],
            qualities: &["quiet", "gentle", "unhurried"],
        },
    },
    VocabEntry {
        theme: "love",
        mood: "inspiring",
        palette: Palette {
            images: &["two candles", "an open door", "a shared umbrella", "held hands"],
            verbs: &["grows", "shelters", "kindles", "remains"],
            qualities: &["brave", "steady", "boundless"],
        },
    },
    VocabEntry {
        theme: "love",
        mood: "romantic",
        palette: Palette {
            images: &["roses at dusk", "a whispered name", "moonlit streets", "your letters"],
            verbs: &["blooms", "lingers", "glows", "dances"],
            qualities: &["tender", "sweet", "radiant"],
        },
    },
    VocabEntry {
        theme: "love",
        mood: "melancholic",
        palette: Palette {
            images: &["an empty chair", "faded photographs", "a closing door", "cold tea"],
            verbs: &["fades", "waits", "aches", "echoes"],
            qualities: &["distant", "wistful", "hollow"],
        },
    },
    VocabEntry {
        theme: "life",
        mood: "inspiring",
        palette: Palette {
            images: &["a winding road", "first steps", "open windows", "new seasons"],
            verbs: &["begins", "carries on", "climbs", "shines"],
            qualities: &["bold", "hopeful", "unfinished"],
        },
    },
    VocabEntry {
        theme: "life",
        mood: "joyful",
        palette: Palette {
            images: &["laughing children", "summer kites", "bright kitchens", "birthday lights"],
            verbs: &["sparkles", "sings", "bursts", "spins"],
            qualities: &["glad", "golden", "bright"],
        },
    },
    VocabEntry {
        theme: "ocean",
        mood: "inspiring",
        palette: Palette {
            images: &["rolling waves", "salt wind", "a far horizon", "white sails"],
            verbs: &["surges", "calls", "returns", "carries"],
            qualities: &["endless", "restless", "deep"],
        },
    },
    VocabEntry {
        theme: "ocean",
        mood: "peaceful",
        palette: Palette {
            images: &["low tide", "smooth stones", "a silver shore", "drifting foam"],
            verbs: &["hushes", "sways", "rests", "murmurs"],
            qualities: &["calm", "patient", "soft"],
        },
    },
    VocabEntry {
        theme: "friendship",
        mood: "inspiring",
        palette: Palette {
            images: &["shared bread", "long walks", "an old joke", "a lantern"],
            verbs: &["holds", "stays", "answers", "lifts"],
            qualities: &["loyal", "warm", "true"],
        },
    },
    VocabEntry {
        theme: "hope",
        mood: "inspiring",
        palette: Palette {
            images: &["a first light", "green shoots", "a lit window", "morning birds"],
            verbs: &["rises", "persists", "flickers", "endures"],
            qualities: &["small", "stubborn", "shining"],
        },
    },
    VocabEntry {
        theme: "time",
        mood: "inspiring",
        palette: Palette {
            images: &["turning clocks", "worn steps", "an hourglass", "old letters"],
            verbs: &["passes", "teaches", "gathers", "flows"],
            qualities: &["patient", "quiet", "relentless"],
        },
    },
    VocabEntry {
        theme: "time",
        mood: "melancholic",
        palette: Palette {
            images: &["yellowed pages", "a stopped clock", "empty stations", "fading footprints"],
            verbs: &["slips", "fades", "wanes", "forgets"],
            qualities: &["lost", "grey", "brief"],
        },
    },
];

static GENERIC: Palette = Palette {
    images: &["a quiet light", "open sky", "the road ahead", "a small flame"],
    verbs: &["moves", "waits", "turns", "shines"],
    qualities: &["simple", "true", "clear"],
};

/// The palette for `(theme, mood)`, falling back to the theme's inspiring
/// palette and then to a neutral one. A multi-word theme such as
/// "winter ocean" also tries its last word before going neutral.
pub fn palette_for(theme: &str, mood: &str) -> &'static Palette {
    let theme = theme.trim().to_lowercase();
    let mood = mood.trim().to_lowercase();
    let find = |theme: &str, mood: &str| {
        VOCABULARY
            .iter()
            .find(|entry| entry.theme == theme && entry.mood == mood)
            .map(|entry| &entry.palette)
    };
    let subject = theme.split_whitespace().last().unwrap_or_default();

    find(&theme, &mood)
        .or_else(|| find(&theme, defaults::MOOD))
        .or_else(|| find(subject, &mood))
        .or_else(|| find(subject, defaults::MOOD))
        .unwrap_or(&GENERIC)
}

const SHORT: &[&str] = &[
    "The {theme} {verb} like {image},\n{quality} and unafraid,\nit carries {image2} home,\na light that will not fade.",
    "In the hush of {theme},\n{image} {verb} slowly,\nand something {quality}\nlearns to breathe again.",
];

// The shuffled-lines poem, always four lines about the theme.
const SHUFFLED: [&str; 4] = [
    "The {theme} whispers softly through the night,",
    "In {theme}'s arms, the world feels right,",
    "Under the {theme} sky, dreams take flight,",
    "The {theme} sings in silver light.",
];

const MEDIUM: &[&str] = &[
    "Where {theme} begins, {image} {verb},\n{quality} as a promise kept.\nI walk beside {image2}\nand count the hours we slept.\n\nThe {theme} does not ask for much,\nonly that we stay, that we see,\nhow {quality} the world becomes\nwhen it is allowed to be.",
    "I found {theme} in {image},\nin the way the evening {verb},\n{quality}, patient, certain,\nlike a word that everyone believes.\n\nSo let {image2} hold us,\nlet the {theme} have its say:\nwhatever is {quality} in us\nwill find its way to day.",
];

const LONG: &[&str] = &[
    "Listen: the {theme} {verb} again,\nthrough {image} and through rain,\n{quality} the way old songs are,\nfamiliar as a window's stain.\n\nWe were not made to hurry past\nthe places where it grows;\nwe were made to kneel by {image2}\nand learn the things it knows.\n\nSo here is my small offering,\nthese lines I cannot keep:\nmay {theme} stay {quality} in you\nlong after you're asleep.",
    "Before the words, there was {theme},\nand {image} that {verb} slow,\na {quality} country of the heart\nwhere only the patient go.\n\nI have carried it through cities,\nthrough {image2} and through frost,\nand every time I set it down\nI learned what I had lost.\n\nNow I hand it on to you,\nthis {quality}, stubborn flame:\nwhen the world forgets its {theme},\nremember it by name.",
];

const HAIKU: &[&str] = &[
    "{theme} at first light\n{image} {verb} without sound\na {quality} silence",
    "quiet {theme}\n{image} and {image2}\neverything {quality}",
    "over the {theme}\n{image} {verb} and is gone\n{quality} afternoon",
];

const LIMERICK: &[&str] = &[
    "There once was a {theme} so {quality},\nWhose {image} would {verb} on a whim,\nIt danced through the day,\nIn its {quality} way,\nTill {image} sang the {theme} a hymn.",
    "A {quality} little {theme} by the sea\nKept {image} as calm as could be,\nWhen the tide came to play,\nIt {verb} away,\nAnd {image} swam home {quality} and free.",
];

/// Deterministic when seeded; otherwise seeded from the OS.
pub struct FallbackGenerator {
    rng: Mutex<StdRng>,
}

impl FallbackGenerator {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(Some(seed))
    }

    /// Always returns a non-empty poem.
    pub fn generate(&self, theme: &str, style: &str, length: &str, mood: &str) -> String {
        let mut rng = self.rng.lock();
        compose(&mut *rng, theme, style, length, mood)
    }

    pub fn generate_acrostic(&self, word: &str, theme: Option<&str>) -> String {
        let mut rng = self.rng.lock();
        acrostic::generate_acrostic(word, theme, &mut *rng)
    }
}

impl Default for FallbackGenerator {
    fn default() -> Self {
        Self::new(None)
    }
}

fn compose<R: Rng + ?Sized>(rng: &mut R, theme: &str, style: &str, length: &str, mood: &str) -> String {
    let theme = match theme.trim() {
        "" => defaults::THEME,
        t => t,
    };
    let palette = palette_for(theme, mood);

    match style.trim().to_lowercase().as_str() {
        "haiku" => fill(pick(rng, HAIKU), theme, palette, rng),
        "limerick" => fill(pick(rng, LIMERICK), theme, palette, rng),
        "acrostic" => {
            let word: String = theme
                .chars()
                .filter(|c| c.is_alphanumeric())
                .take(MAX_WORD_LEN)
                .collect();
            let word = if word.is_empty() { defaults::WORD.to_string() } else { word };
            acrostic::generate_acrostic(&word, Some(theme), rng)
        }
        _ => match length.trim().to_lowercase().as_str() {
            "medium" => fill(pick(rng, MEDIUM), theme, palette, rng),
            "long" => fill(pick(rng, LONG), theme, palette, rng),
            _ => {
                if rng.random_range(0..=SHORT.len()) == SHORT.len() {
                    shuffled(theme, rng)
                } else {
                    fill(pick(rng, SHORT), theme, palette, rng)
                }
            }
        },
    }
}

fn pick<R: Rng + ?Sized>(rng: &mut R, items: &[&'static str]) -> &'static str {
    items.choose(rng).copied().unwrap_or_default()
}

fn fill<R: Rng + ?Sized>(template: &str, theme: &str, palette: &Palette, rng: &mut R) -> String {
    let image = pick(rng, palette.images);
    // A second, different image where the palette allows it.
    let image2 = palette
        .images
        .iter()
        .copied()
        .filter(|i| *i != image)
        .collect::<Vec<_>>()
        .choose(rng)
        .copied()
        .unwrap_or(image);
    let verb = pick(rng, palette.verbs);
    let quality = pick(rng, palette.qualities);

    template
        .replace("{theme}", theme)
        .replace("{image2}", image2)
        .replace("{image}", image)
        .replace("{verb}", verb)
        .replace("{quality}", quality)
}

fn shuffled<R: Rng + ?Sized>(theme: &str, rng: &mut R) -> String {
    let mut lines: Vec<String> = SHUFFLED
        .iter()
        .map(|line| line.replace("{theme}", theme))
        .collect();
    lines.shuffle(rng);
    lines.join("\n")
}
