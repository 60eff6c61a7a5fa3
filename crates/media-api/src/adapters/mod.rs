//! Fetch-and-parse adapters, one per external content type.
//!
//! Each adapter builds a fixed-template URL, fetches it through the shared
//! [`PageClient`](crate::upstream::PageClient), and projects the matched
//! nodes into the typed records from `shared::models`. The selector chains
//! mirror the sites' current markup and break when it drifts; nothing here
//! pretends otherwise. Parsing is kept in pure functions over HTML strings
//! so it can be tested against fixture markup.

mod anime;
mod movies;

pub use anime::AnimeSite;
pub use movies::{HomeSection, MovieSite};

/// Declare lazily-parsed CSS selector statics.
///
/// The selectors are compile-time constants, so a parse failure is a
/// programming error, not a runtime condition.
macro_rules! selectors {
    ($($name:ident => $css:literal;)+) => {
        $(
            static $name: once_cell::sync::Lazy<scraper::Selector> =
                once_cell::sync::Lazy::new(|| {
                    scraper::Selector::parse($css).expect("static selector must parse")
                });
        )+
    };
}

pub(crate) use selectors;
