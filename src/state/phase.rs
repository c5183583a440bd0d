/// Crawl phase definitions for the orchestrator state machine
///
/// A crawl moves strictly forward through
/// `Idle -> PartitioningOrLoaded -> Crawling -> Draining -> Done`.
use std::fmt;

/// Represents the current phase of a crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// Nothing has happened yet
    Idle,

    /// Partitions were loaded from persisted state or computed fresh
    PartitioningOrLoaded,

    /// Workers are running and partitions are being paged
    Crawling,

    /// All partitions paged; workers drain what is left in the queue
    Draining,

    /// Workers joined and state persisted; results are readable
    Done,
}

impl CrawlPhase {
    /// Returns true if `next` is the phase that directly follows this one
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::PartitioningOrLoaded)
                | (Self::PartitioningOrLoaded, Self::Crawling)
                | (Self::Crawling, Self::Draining)
                | (Self::Draining, Self::Done)
        )
    }

    /// Returns true if this is the terminal phase
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::PartitioningOrLoaded => "partitioning_or_loaded",
            Self::Crawling => "crawling",
            Self::Draining => "draining",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
