use std::collections::HashSet;

/// Construit un slug URL à partir d'un titre : minuscules, accents retirés,
/// tout caractère non alphanumérique remplacé par un tiret unique.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut prev_hyphen = true; // évite un tiret en tête

    for c in title.chars().flat_map(char::to_lowercase) {
        if let Some(folded) = fold_accent(c) {
            slug.push_str(folded);
            prev_hyphen = false;
        } else if c.is_ascii_alphanumeric() {
            slug.push(c);
            prev_hyphen = false;
        } else if !prev_hyphen {
            slug.push('-');
            prev_hyphen = true;
        }
    }

    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Premier slug libre parmi `base`, `base-2`, `base-3`, ...
pub fn unique_slug(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{}-{}", base, n))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

fn fold_accent(c: char) -> Option<&'static str> {
    let folded = match c {
        'à' | 'á' | 'â' | 'ä' | 'ã' | 'å' => "a",
        'ç' => "c",
        'è' | 'é' | 'ê' | 'ë' => "e",
        'ì' | 'í' | 'î' | 'ï' => "i",
        'ñ' => "n",
        'ò' | 'ó' | 'ô' | 'ö' | 'õ' => "o",
        'ù' | 'ú' | 'û' | 'ü' => "u",
        'ý' | 'ÿ' => "y",
        'œ' => "oe",
        'æ' => "ae",
        'ß' => "ss",
        _ => return None,
    };
    Some(folded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("  Rust -- pour   débutants !"), "rust-pour-debutants");
    }

    #[test]
    fn test_slugify_folds_french_accents() {
        assert_eq!(slugify("Les bases de l'économie"), "les-bases-de-l-economie");
        assert_eq!(slugify("Cœur à l'ouvrage"), "coeur-a-l-ouvrage");
        assert_eq!(slugify("ÉTÉ 2024"), "ete-2024");
    }

    #[test]
    fn test_slugify_only_symbols() {
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_unique_slug_appends_counter() {
        let mut taken = HashSet::new();
        assert_eq!(unique_slug("intro", &taken), "intro");

        taken.insert("intro".to_string());
        taken.insert("intro-2".to_string());
        assert_eq!(unique_slug("intro", &taken), "intro-3");
    }
}
