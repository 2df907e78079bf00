//! Container representation preferences
//!
//! Clients choose how a container describes its members with `Prefer`
//! include tokens (RFC 7240, W3C Web Annotation Protocol §4.2):
//! - `http://www.w3.org/ns/oa#PreferContainedDescriptions` - embed full annotations (default)
//! - `http://www.w3.org/ns/oa#PreferContainedIRIs` - embed annotation IRIs only
//! - `http://www.w3.org/ns/ldp#PreferMinimalContainer` - no embedded page at all

const PREFER_MINIMAL_CONTAINER: &str = "PreferMinimalContainer";
const PREFER_CONTAINED_IRIS: &str = "PreferContainedIRIs";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContainerPreference {
    #[default]
    FullDescriptions,
    ContainedIris,
    MinimalContainer { with_iris: bool },
}

impl ContainerPreference {
    /// Whether identifiers carry the `iris=1` flag.
    pub fn iri_mode(&self) -> bool {
        matches!(
            self,
            Self::ContainedIris | Self::MinimalContainer { with_iris: true }
        )
    }

    pub fn is_minimal(&self) -> bool {
        matches!(self, Self::MinimalContainer { .. })
    }

    /// Apply the `iris=1` query flag, equivalent to `PreferContainedIRIs`.
    pub fn with_iris_flag(self, iris: bool) -> Self {
        if !iris {
            return self;
        }
        match self {
            Self::FullDescriptions | Self::ContainedIris => Self::ContainedIris,
            Self::MinimalContainer { .. } => Self::MinimalContainer { with_iris: true },
        }
    }
}

/// Map include tokens to a representation.
///
/// Tokens match by their local name, so both the full IRI and the bare name
/// are accepted. Unknown tokens are ignored.
pub fn select_representation<S: AsRef<str>>(tokens: &[S]) -> ContainerPreference {
    let names: Vec<&str> = tokens.iter().map(|t| local_name(t.as_ref())).collect();
    let has = |name: &str| names.iter().any(|n| *n == name);

    let iris = has(PREFER_CONTAINED_IRIS);
    if has(PREFER_MINIMAL_CONTAINER) {
        ContainerPreference::MinimalContainer { with_iris: iris }
    } else if iris {
        ContainerPreference::ContainedIris
    } else {
        // PreferContainedDescriptions and no preference are the same thing.
        ContainerPreference::FullDescriptions
    }
}

/// Extract the `include` token list from a `Prefer` header value.
///
/// `return=representation;include="http://www.w3.org/ns/ldp#PreferMinimalContainer http://www.w3.org/ns/oa#PreferContainedIRIs"`
/// yields both IRIs. Several comma-separated preferences may appear; every
/// `include` contributes.
pub fn parse_prefer_header(value: &str) -> Vec<String> {
    value
        .split([',', ';'])
        .filter_map(|part| {
            let (key, raw) = part.split_once('=')?;
            if !key.trim().eq_ignore_ascii_case("include") {
                return None;
            }
            Some(raw.trim().trim_matches('"').to_string())
        })
        .flat_map(|list| {
            list.split_whitespace()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Preference from an optional `Prefer` header value and the `iris` query flag.
pub fn preference_from_request(prefer: Option<&str>, iris: bool) -> ContainerPreference {
    let tokens = prefer.map(parse_prefer_header).unwrap_or_default();
    select_representation(&tokens).with_iris_flag(iris)
}

fn local_name(token: &str) -> &str {
    token.rsplit(['#', '/']).next().unwrap_or(token)
}
