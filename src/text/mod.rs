//! Text normalization helpers shared by the tokenizer and the listing layer.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Chord annotations embedded in song text, e.g. `Text[Ami] to be [Fmaj]continued`.
    static ref CHORD_RE: Regex = Regex::new(r"\[[^\]\n]*\]").unwrap();
    /// Markup tags left over from formatted song sources.
    static ref TAG_RE: Regex = Regex::new(r"<[^>\n]*>").unwrap();
}

/// Remove `[chord]` annotations from song text.
pub fn remove_chords(text: &str) -> String {
    CHORD_RE.replace_all(text, "").into_owned()
}

/// Remove markup tags from song text.
pub fn remove_markup_tags(text: &str) -> String {
    TAG_RE.replace_all(text, "").into_owned()
}

/// Fold accented Latin characters to their ASCII base letter.
///
/// Covers the Latin-1 Supplement and Latin Extended-A ranges, which is what
/// the songbook sources actually contain. Characters outside those ranges
/// pass through unchanged.
pub fn remove_diacritics(text: &str) -> String {
    text.chars().map(fold_char).collect()
}

fn fold_char(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' | 'ā' | 'ă' | 'ą' => 'a',
        'Á' | 'À' | 'Â' | 'Ä' | 'Ã' | 'Å' | 'Ā' | 'Ă' | 'Ą' => 'A',
        'č' | 'ç' | 'ć' | 'ĉ' | 'ċ' => 'c',
        'Č' | 'Ç' | 'Ć' | 'Ĉ' | 'Ċ' => 'C',
        'ď' | 'đ' => 'd',
        'Ď' | 'Đ' => 'D',
        'é' | 'è' | 'ê' | 'ë' | 'ě' | 'ē' | 'ĕ' | 'ė' | 'ę' => 'e',
        'É' | 'È' | 'Ê' | 'Ë' | 'Ě' | 'Ē' | 'Ĕ' | 'Ė' | 'Ę' => 'E',
        'ĝ' | 'ğ' | 'ġ' | 'ģ' => 'g',
        'Ĝ' | 'Ğ' | 'Ġ' | 'Ģ' => 'G',
        'ĥ' | 'ħ' => 'h',
        'Ĥ' | 'Ħ' => 'H',
        'í' | 'ì' | 'î' | 'ï' | 'ī' | 'ĭ' | 'į' | 'ı' => 'i',
        'Í' | 'Ì' | 'Î' | 'Ï' | 'Ī' | 'Ĭ' | 'Į' | 'İ' => 'I',
        'ĵ' => 'j',
        'Ĵ' => 'J',
        'ķ' => 'k',
        'Ķ' => 'K',
        'ĺ' | 'ļ' | 'ľ' | 'ŀ' | 'ł' => 'l',
        'Ĺ' | 'Ļ' | 'Ľ' | 'Ŀ' | 'Ł' => 'L',
        'ñ' | 'ń' | 'ņ' | 'ň' => 'n',
        'Ñ' | 'Ń' | 'Ņ' | 'Ň' => 'N',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' | 'ø' | 'ō' | 'ŏ' | 'ő' => 'o',
        'Ó' | 'Ò' | 'Ô' | 'Ö' | 'Õ' | 'Ø' | 'Ō' | 'Ŏ' | 'Ő' => 'O',
        'ŕ' | 'ŗ' | 'ř' => 'r',
        'Ŕ' | 'Ŗ' | 'Ř' => 'R',
        'ś' | 'ŝ' | 'ş' | 'š' => 's',
        'Ś' | 'Ŝ' | 'Ş' | 'Š' => 'S',
        'ţ' | 'ť' | 'ŧ' => 't',
        'Ţ' | 'Ť' | 'Ŧ' => 'T',
        'ú' | 'ù' | 'û' | 'ü' | 'ů' | 'ū' | 'ŭ' | 'ű' | 'ų' => 'u',
        'Ú' | 'Ù' | 'Û' | 'Ü' | 'Ů' | 'Ū' | 'Ŭ' | 'Ű' | 'Ų' => 'U',
        'ŵ' => 'w',
        'Ŵ' => 'W',
        'ý' | 'ÿ' | 'ŷ' => 'y',
        'Ý' | 'Ÿ' | 'Ŷ' => 'Y',
        'ź' | 'ż' | 'ž' => 'z',
        'Ź' | 'Ż' | 'Ž' => 'Z',
        other => other,
    }
}

/// Key used for ordering user-visible lists: accent-insensitive, case-insensitive.
pub fn sort_key(text: &str) -> String {
    remove_diacritics(text).to_lowercase()
}

/// Sort a list by a string key the way the listing layer presents it.
///
/// The underlying sort is stable, so entries with equal keys keep their
/// insertion order.
pub fn locale_sort_by_key<T, F>(items: &mut [T], key_of: F)
where
    F: Fn(&T) -> &str,
{
    items.sort_by_cached_key(|item| sort_key(key_of(item)));
}
