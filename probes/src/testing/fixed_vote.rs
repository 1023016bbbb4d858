use crate::{
    Context, Name, Probe,
    extension::{Strategy, StrategyFactory},
};

/// Votes `vote` for every probe under the dotted `prefix`, and abstains (0)
/// for everything else.
#[derive(Debug, Clone)]
pub struct FixedVote {
    prefix: String,
    vote: i32,
}

impl FixedVote {
    pub fn new(prefix: &str, vote: i32) -> Self {
        Self {
            prefix: prefix.to_string(),
            vote,
        }
    }
}

struct Vote {
    prefix: Name,
    vote: i32,
}

impl Strategy for Vote {
    fn vote(&mut self, probe: &Probe) -> i32 {
        if probe.name().starts_with(&self.prefix) {
            self.vote
        } else {
            0
        }
    }
}

impl StrategyFactory for FixedVote {
    fn create(&self, context: &Context) -> Box<dyn Strategy> {
        Box::new(Vote {
            prefix: context.runtime().parse(&self.prefix),
            vote: self.vote,
        })
    }
}
