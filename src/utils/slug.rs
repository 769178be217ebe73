/// Derives a URL-safe slug from a human-readable name: lowercase, accents
/// folded to their base letter, everything but `[a-z0-9 -]` dropped, runs of
/// whitespace collapsed into single hyphens.
pub fn slugify(name: &str) -> String {
    let lowered = name.to_lowercase();

    let folded: String = lowered.chars().map(fold_accent).collect();

    let cleaned: String = folded
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_ascii_whitespace() || *c == '-')
        .collect();

    cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_hyphenates() {
        assert_eq!(slugify("Bermuda Cargo"), "bermuda-cargo");
    }

    #[test]
    fn strips_diacritics() {
        assert_eq!(slugify("Calça Jeans Médio"), "calca-jeans-medio");
    }

    #[test]
    fn drops_punctuation() {
        assert_eq!(slugify("Tênis Nike, Air Max! (2024)"), "tenis-nike-air-max-2024");
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(slugify("  Camiseta   Polo  "), "camiseta-polo");
    }

    #[test]
    fn keeps_existing_hyphens() {
        assert_eq!(slugify("pre-order item"), "pre-order-item");
    }
}
