//! Which listing is on screen, and which in-flight fetch is allowed to replace it.
//!
//! Fetches cannot be cancelled, so a slow response to an old request can arrive after a
//! newer one. Every fetch is tagged with a [`RequestToken`] when it is issued; only the
//! response carrying the latest token may replace what is displayed.

use std::fmt;

/// Default region for trending listings.
pub const DEFAULT_REGION: &str = "US";

/// A source of result cards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    Trending { region: String },
    Search { query: String },
}

impl Listing {
    /// The home page: trending in the default region.
    pub fn home() -> Self {
        Self::Trending {
            region: DEFAULT_REGION.to_string(),
        }
    }

    /// Message shown when every API key failed for this listing.
    pub fn failure_message(&self) -> &'static str {
        match self {
            Self::Trending { .. } => "Failed to load videos. Please try again later.",
            Self::Search { .. } => "Failed to search videos. Please try again.",
        }
    }
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trending { region } => write!(f, "trending in {region}"),
            Self::Search { query } => write!(f, "search for \"{query}\""),
        }
    }
}

/// Identifies one issued fetch. Tokens only ever increase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

/// Hands out request tokens and remembers which one is current.
#[derive(Debug, Default)]
pub struct FeedGuard {
    latest: u64,
    pending: Option<Listing>,
}

impl FeedGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new fetch for `listing`, superseding any fetch still in flight.
    pub fn begin(&mut self, listing: Listing) -> RequestToken {
        self.latest += 1;
        tracing::debug!(token = self.latest, %listing, "issuing fetch");
        self.pending = Some(listing);
        RequestToken(self.latest)
    }

    /// Whether a response carrying `token` may still be applied.
    pub fn is_current(&self, token: RequestToken) -> bool {
        token.0 == self.latest
    }

    /// Claims the response for `token`.
    ///
    /// Returns the listing it was issued for if the token is still the latest, or `None`
    /// if a newer fetch has been issued since (the response should be dropped). A token
    /// can only be completed once.
    pub fn complete(&mut self, token: RequestToken) -> Option<Listing> {
        if !self.is_current(token) {
            tracing::debug!(
                token = token.0,
                latest = self.latest,
                "discarding superseded response"
            );
            return None;
        }
        self.pending.take()
    }

    /// The listing whose fetch is still outstanding, if any.
    pub fn pending(&self) -> Option<&Listing> {
        self.pending.as_ref()
    }
}
