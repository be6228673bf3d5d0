//! Text helpers for catalog slugs and profile user codes.

use rand::Rng;

use crate::constants::{USER_CODE_MAX, USER_CODE_MIN};

/// Derive a URL-safe slug from a display name.
///
/// The name is lowercased, every run of characters outside `[a-z0-9]`
/// becomes a single `-`, and leading/trailing hyphens are dropped.
/// Applying it to its own output returns the output unchanged.
pub fn generate_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for c in name.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Return `base`, or `base-2`, `base-3`... whichever `taken` rejects first.
pub fn unique_slug(base: &str, mut taken: impl FnMut(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    let mut n = 2u32;
    loop {
        let candidate = format!("{base}-{n}");
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Random two-digit user code shown next to usernames in the admin console.
pub fn generate_user_code() -> String {
    rand::thread_rng()
        .gen_range(USER_CODE_MIN..=USER_CODE_MAX)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_collapses_and_trims() {
        assert_eq!(generate_slug("Café  Spice-Mix!!"), "caf-spice-mix");
        assert_eq!(generate_slug("  Basmati Rice (1121) "), "basmati-rice-1121");
        assert_eq!(generate_slug("---"), "");
        assert_eq!(generate_slug("Hand-Woven   Silk"), "hand-woven-silk");
    }

    #[test]
    fn slug_is_idempotent() {
        for name in ["Café  Spice-Mix!!", "Organic TURMERIC powder", "a--b", "-x-"] {
            let once = generate_slug(name);
            assert_eq!(generate_slug(&once), once);
            assert_eq!(generate_slug(name), once);
            assert!(!once.starts_with('-') && !once.ends_with('-'));
            assert!(!once.contains("--"));
        }
    }

    #[test]
    fn unique_slug_appends_counter() {
        let existing = ["jute-bags", "jute-bags-2"];
        let slug = unique_slug("jute-bags", |s| existing.contains(&s));
        assert_eq!(slug, "jute-bags-3");
        assert_eq!(unique_slug("coir-mats", |s| existing.contains(&s)), "coir-mats");
    }

    #[test]
    fn user_code_has_two_digits() {
        for _ in 0..200 {
            let code = generate_user_code();
            assert_eq!(code.len(), 2);
            let n: u8 = code.parse().unwrap();
            assert!((USER_CODE_MIN..=USER_CODE_MAX).contains(&n));
        }
    }
}
