//! Patch state line recognition.

use std::sync::OnceLock;

use regex::Regex;
use valtext_protocol::Transition;

static TRANSITION_REGEX: OnceLock<Regex> = OnceLock::new();

fn transition_regex() -> &'static Regex {
    TRANSITION_REGEX.get_or_init(|| {
        Regex::new(
            r"^\d+\.\d+\|\s+ALWAYS\|\s+rnet-product-registry: TransitionToCombinedPatchState: install 'valorant\.live' switching states '(.*?)' -> '(.*?)' because 'statusPatchPlugin'",
        )
        .expect("static regex pattern is valid")
    })
}

/// Parses a combined patch state transition for `valorant.live`.
///
/// Every other line, which is nearly all client log traffic, returns `None`.
pub fn match_transition(line: &str) -> Option<Transition> {
    let caps = transition_regex().captures(line)?;
    let previous = caps.get(1)?.as_str().trim_matches('\'');
    let next = caps.get(2)?.as_str().trim_matches('\'');
    Some(Transition::new(previous, next))
}
