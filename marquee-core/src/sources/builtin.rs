use super::{SourceDefinition, Tier};

fn source(
    name: &str,
    base_url: &str,
    path: &str,
    movie: Option<Tier>,
    tv: Option<Tier>,
) -> SourceDefinition {
    SourceDefinition {
        name: name.to_string(),
        base_url: base_url.to_string(),
        path: path.to_string(),
        movie,
        tv,
    }
}

/// Source catalog used when configuration does not provide one.
pub fn builtin_definitions() -> Vec<SourceDefinition> {
    use Tier::{Fallback, Primary};

    vec![
        source(
            "sonix",
            "https://sonix-movies.vercel.app",
            "{kind}/{id}",
            Some(Primary),
            Some(Primary),
        ),
        source(
            "vidsrc",
            "https://vidsrc.to",
            "embed/{kind}/{id}",
            Some(Primary),
            None,
        ),
        source(
            "asiaflix",
            "https://asiaflix.net/home",
            "embed/{id}",
            None,
            Some(Primary),
        ),
        source("goojara", "https://goojara.to", "embed/{id}", Some(Fallback), None),
        source(
            "flixhq",
            "https://flixhq.to",
            "embed/{kind}/{id}",
            Some(Fallback),
            None,
        ),
        source("dramacool", "https://dramacool.pa", "embed/{id}", None, Some(Fallback)),
        source("zoro", "https://zoro.to", "embed/{id}", None, Some(Fallback)),
    ]
}
