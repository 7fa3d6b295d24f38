//! Whole-word acceptance rules shared by the dictionary search and the
//! renderer.

/// Suffixes a bare dictionary word may carry and still count as a match.
const INFLECTION_SUFFIXES: [&str; 3] = ["s", "ed", "ing"];

fn is_word_char(ch: Option<char>) -> bool {
    matches!(ch, Some(ch) if ch.is_ascii_alphabetic())
}

fn is_all_caps(term: &str) -> bool {
    term.chars().any(char::is_alphabetic) && term.to_uppercase() == term
}

fn starts_with_digit(term: &str) -> bool {
    term.chars().next().is_some_and(|ch| ch.is_ascii_digit())
}

fn ends_with_digit(term: &str) -> bool {
    term.chars().next_back().is_some_and(|ch| ch.is_ascii_digit())
}

/// `rest` begins with one of the inflection suffixes followed by a non-word
/// character or the end of the text.
fn has_inflection_suffix(rest: &str) -> bool {
    INFLECTION_SUFFIXES.iter().any(|suffix| {
        rest.get(..suffix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(suffix))
            && !is_word_char(rest[suffix.len()..].chars().next())
    })
}

/// Decide whether `text[start..end]` is an acceptable occurrence of `term`.
///
/// - An all-caps term only matches its exact spelling.
/// - A term starting with a digit must not follow a digit or `.`; a term
///   ending with a digit must not precede a digit.
/// - Otherwise the span must sit on `[A-Za-z]` word boundaries, except that a
///   digit-free term may be followed by `s`, `ed` or `ing` and then a
///   boundary.
///
/// Offsets are byte offsets; spans that do not fall on char boundaries are
/// rejected.
pub fn should_include_match(text: &str, start: usize, end: usize, term: &str) -> bool {
    let Some(slice) = text.get(start..end) else {
        return false;
    };

    if is_all_caps(term) && slice != term {
        return false;
    }

    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();

    if starts_with_digit(term) && matches!(before, Some(ch) if ch.is_ascii_digit() || ch == '.') {
        return false;
    }
    if ends_with_digit(term) && matches!(after, Some(ch) if ch.is_ascii_digit()) {
        return false;
    }

    let start_boundary = !is_word_char(before);
    let end_boundary = !is_word_char(after);

    if start_boundary && end_boundary {
        return true;
    }

    start_boundary
        && !term.chars().any(|ch| ch.is_ascii_digit())
        && has_inflection_suffix(&text[end..])
}
