//! Image path resolution.
//!
//! The backend returns image references in many shapes: fully qualified URLs,
//! root-relative paths, bare filenames, `uploads/`-prefixed paths, Windows
//! filesystem paths from the upload host, and the literal strings
//! `"undefined"` / `"null"` when a product has no image. [`ImagePathResolver`]
//! turns any of them into something the rendering layer can fetch.

/// Returned whenever a path cannot be resolved.
pub const PLACEHOLDER_IMAGE: &str = "/images/placeholder.png";

const UPLOADS_SEGMENT: &str = "/uploads/";
const UNDEFINED: &str = "undefined";

/// Normalizes raw image paths against the configured asset origin.
///
/// Holds no state beyond the origin; [`resolve`](Self::resolve) is a pure
/// function of its input.
///
/// # Example
///
/// ```
/// use kicks_storefront::client::{ImagePathResolver, PLACEHOLDER_IMAGE};
///
/// let resolver = ImagePathResolver::new("https://assets.example.com/");
/// assert_eq!(
///     resolver.resolve(r"C:\uploads\shoe1.png"),
///     "https://assets.example.com/uploads/shoe1.png"
/// );
/// assert_eq!(resolver.resolve("/uploads/undefined"), PLACEHOLDER_IMAGE);
/// ```
#[derive(Debug, Clone)]
pub struct ImagePathResolver {
    base: String,
}

impl ImagePathResolver {
    /// Create a resolver for the given asset origin. Trailing slashes are
    /// dropped.
    #[must_use]
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    /// The asset origin uploads are served from.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Resolve `raw` into a fetchable URL, or [`PLACEHOLDER_IMAGE`].
    ///
    /// Never fails, and never returns a value containing `"undefined"`.
    #[must_use]
    pub fn resolve(&self, raw: &str) -> String {
        let resolved = self.resolve_candidate(raw.trim());
        if resolved.contains(UNDEFINED) {
            return PLACEHOLDER_IMAGE.to_string();
        }
        resolved
    }

    fn resolve_candidate(&self, path: &str) -> String {
        if path.is_empty()
            || path == UNDEFINED
            || path == "null"
            || path.contains("/uploads/undefined")
        {
            return PLACEHOLDER_IMAGE.to_string();
        }

        // Filesystem path from the upload host: keep only the filename.
        if path.contains('\\') {
            let filename = path.rsplit(['/', '\\']).next().unwrap_or_default();
            return self.upload_url(filename);
        }

        if is_absolute_url(path) && !path.contains(UNDEFINED) {
            return path.to_string();
        }

        if path.starts_with('/') && !path.contains(UNDEFINED) {
            return path.to_string();
        }

        let relative = path.trim_start_matches('/');
        let relative = relative.strip_prefix("uploads/").unwrap_or(relative);
        self.upload_url(relative)
    }

    fn upload_url(&self, filename: &str) -> String {
        if filename.is_empty() || filename == UNDEFINED {
            return PLACEHOLDER_IMAGE.to_string();
        }
        format!("{}{UPLOADS_SEGMENT}{filename}", self.base)
    }
}

fn is_absolute_url(path: &str) -> bool {
    let lower = path.get(..8).unwrap_or(path).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://api.kicks.test";

    fn resolver() -> ImagePathResolver {
        ImagePathResolver::new(BASE)
    }

    #[test]
    fn test_windows_path_keeps_filename() {
        assert_eq!(
            resolver().resolve("C:\\uploads\\shoe1.png"),
            format!("{BASE}/uploads/shoe1.png")
        );
    }

    #[test]
    fn test_mixed_separators_take_last_segment() {
        assert_eq!(
            resolver().resolve("D:\\data/uploads\\nested/boot.jpg"),
            format!("{BASE}/uploads/boot.jpg")
        );
    }

    #[test]
    fn test_windows_path_with_empty_filename_is_placeholder() {
        assert_eq!(resolver().resolve("C:\\uploads\\"), PLACEHOLDER_IMAGE);
    }

    #[test]
    fn test_missing_values_are_placeholder() {
        for raw in ["", "   ", "undefined", "null", "/uploads/undefined"] {
            assert_eq!(resolver().resolve(raw), PLACEHOLDER_IMAGE, "input {raw:?}");
        }
    }

    #[test]
    fn test_absolute_url_is_unchanged() {
        assert_eq!(
            resolver().resolve("https://cdn/img/a.png"),
            "https://cdn/img/a.png"
        );
        assert_eq!(
            resolver().resolve("HTTP://cdn/img/a.png"),
            "HTTP://cdn/img/a.png"
        );
    }

    #[test]
    fn test_absolute_url_with_undefined_is_placeholder() {
        assert_eq!(
            resolver().resolve("https://cdn/undefined.png"),
            PLACEHOLDER_IMAGE
        );
    }

    #[test]
    fn test_root_relative_is_unchanged() {
        assert_eq!(
            resolver().resolve("/uploads/shoe.png"),
            "/uploads/shoe.png"
        );
        assert_eq!(resolver().resolve("/images/logo.svg"), "/images/logo.svg");
    }

    #[test]
    fn test_bare_and_prefixed_filenames_join_base() {
        assert_eq!(
            resolver().resolve("shoe.png"),
            format!("{BASE}/uploads/shoe.png")
        );
        assert_eq!(
            resolver().resolve("uploads/shoe.png"),
            format!("{BASE}/uploads/shoe.png")
        );
    }

    #[test]
    fn test_uploads_prefix_without_filename_is_placeholder() {
        assert_eq!(resolver().resolve("uploads/"), PLACEHOLDER_IMAGE);
        assert_eq!(resolver().resolve("uploads/undefined"), PLACEHOLDER_IMAGE);
    }

    #[test]
    fn test_trailing_slash_on_base_is_dropped() {
        let resolver = ImagePathResolver::new(format!("{BASE}//"));
        assert_eq!(resolver.base(), BASE);
        assert_eq!(resolver.resolve("a.png"), format!("{BASE}/uploads/a.png"));
    }

    #[test]
    fn test_output_shape_for_assorted_inputs() {
        let inputs = [
            "shoe.png",
            "undefined",
            "uploads/undefined.png",
            "C:\\tmp\\undefined",
            "C:\\tmp\\undefined.jpg",
            "//cdn/x.png",
            "/uploads/x/undefined/y.png",
            "http://h/undefined",
            "ftp://h/x.png",
            "null",
            "\\",
        ];

        for raw in inputs {
            let out = resolver().resolve(raw);
            assert!(!out.contains("undefined"), "{raw:?} -> {out}");
            assert!(
                out == PLACEHOLDER_IMAGE
                    || out.starts_with(BASE)
                    || out.starts_with("http")
                    || out.starts_with('/'),
                "{raw:?} -> {out}"
            );
            assert_eq!(out, resolver().resolve(raw), "resolve must be pure");
        }
    }
}
