/// Directory prefixes under which sites commonly publish feeds.
const PREFIXES: [&str; 5] = ["", "feed/", "feeds/", "rss/", "blog/"];

/// Feed document names.
const MIDDLES: [&str; 12] = [
    "",
    "all",
    "atom",
    "feed",
    "index",
    "posts",
    "posts/default",
    "rss",
    "en",
    "default",
    "rssfeed",
    "blog",
];

/// Format suffixes appended to the document name.
const SUFFIXES: [&str; 4] = ["", ".rss", ".atom", ".rss2"];

/// File extensions and query strings used by common blog engines.
const EXTENSIONS: [&str; 4] = ["", ".xml", "?feed=rss2", "?format=atom"];

/// Number of candidates produced by [`candidate_paths`].
pub const CANDIDATE_COUNT: usize =
    PREFIXES.len() * MIDDLES.len() * SUFFIXES.len() * EXTENSIONS.len();

/// Returns every relative path worth probing for a feed.
///
/// The list is the cartesian product prefix × middle × suffix × extension,
/// in that nesting order, and always includes the empty path (the site root).
pub fn candidate_paths() -> Vec<String> {
    let mut paths = Vec::with_capacity(CANDIDATE_COUNT);
    for prefix in PREFIXES {
        for middle in MIDDLES {
            for suffix in SUFFIXES {
                for ext in EXTENSIONS {
                    paths.push(format!("{prefix}{middle}{suffix}{ext}"));
                }
            }
        }
    }
    paths
}
