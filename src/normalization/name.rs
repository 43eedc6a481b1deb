/// Contract for the comparison-name function used to group devices that
/// likely represent the same product.
///
/// Implementations must be deterministic, total and side-effect free: the
/// scanner persists the output and later reruns must converge on the same
/// value for an unchanged display name.
pub trait NameNormalizer: Send + Sync {
    fn normalize(&self, raw: &str) -> String;
}

/// Default normalizer used by the scanner and the similarity lookup.
///
/// Normalization steps:
/// - trim whitespace
/// - lowercase
/// - drop everything that is not alphanumeric
///
/// "iPhone 15 Pro" and "iphone-15-pro" both collapse to "iphone15pro";
/// a name made entirely of punctuation collapses to the empty string,
/// which the scanner treats as "still missing".
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultNormalizer;

impl NameNormalizer for DefaultNormalizer {
    fn normalize(&self, raw: &str) -> String {
        raw.trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_spacing_and_case() {
        let n = DefaultNormalizer;
        assert_eq!(n.normalize("iPhone 15 Pro"), "iphone15pro");
        assert_eq!(n.normalize("  iphone-15-pro "), "iphone15pro");
        assert_eq!(n.normalize("IPHONE_15_PRO"), "iphone15pro");
    }

    #[test]
    fn keeps_digits_significant() {
        let n = DefaultNormalizer;
        assert_ne!(n.normalize("Pixel 8"), n.normalize("Pixel 9"));
    }

    #[test]
    fn punctuation_only_yields_empty() {
        let n = DefaultNormalizer;
        assert_eq!(n.normalize("-- // --"), "");
        assert_eq!(n.normalize(""), "");
    }

    #[test]
    fn deterministic() {
        let n = DefaultNormalizer;
        assert_eq!(n.normalize("Galaxy S24 Ultra"), n.normalize("Galaxy S24 Ultra"));
    }
}
