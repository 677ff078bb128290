//! Header clean-up shared by interceptors that replace a response

use http::header::{
    CACHE_CONTROL, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, ETAG, LAST_MODIFIED,
};
use http::HeaderMap;

/// Drop headers describing a representation that will not be sent.
///
/// Used for 304 responses. Validators stay, except that `Last-Modified` is
/// dropped when an entity tag is present.
pub(crate) fn strip_for_not_modified(h: &mut HeaderMap) {
    h.remove(CONTENT_TYPE);
    h.remove(CONTENT_LENGTH);
    h.remove(CONTENT_ENCODING);
    h.remove(CACHE_CONTROL);
    if h.contains_key(ETAG) {
        h.remove(LAST_MODIFIED);
    }
}

/// Drop cache-shaping headers left by the handler whose response is being
/// replaced
pub(crate) fn strip_cache_headers(h: &mut HeaderMap) {
    h.remove(CACHE_CONTROL);
    h.remove(ETAG);
    h.remove(LAST_MODIFIED);
    h.remove(CONTENT_ENCODING);
}

/// Like [`strip_cache_headers`], also dropping the headers a substitute
/// handler determines itself
pub(crate) fn strip_for_substitute(h: &mut HeaderMap) {
    strip_cache_headers(h);
    h.remove(CONTENT_LENGTH);
    h.remove(CONTENT_TYPE);
}
