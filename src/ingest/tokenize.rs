//! Path tokenization for automatic tags.

/// Split `text` into lower-cased runs of word characters.
///
/// A word character is any Unicode alphanumeric or `_`; everything else
/// separates tokens.
///
/// ```
/// use mediavault::ingest::tokenize;
///
/// assert_eq!(tokenize("2024 trip/beach.jpg"), ["2024", "trip", "beach", "jpg"]);
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_tokens() {
        assert_eq!(
            tokenize("2024 trip/beach.jpg"),
            vec!["2024", "trip", "beach", "jpg"]
        );
    }

    #[test]
    fn test_lowercases_and_keeps_underscores() {
        assert_eq!(tokenize("./Photos/IMG_0042.JPG"), vec!["photos", "img_0042", "jpg"]);
    }

    #[test]
    fn test_unicode_words() {
        assert_eq!(tokenize("Été à Kyōto/東京.png"), vec!["été", "à", "kyōto", "東京", "png"]);
    }

    #[test]
    fn test_no_words() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("/.-/ ").is_empty());
    }
}
