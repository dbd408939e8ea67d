//! Explicit finite-state-machine tables.
//!
//! Each workflow entity declares one `TransitionTable`: the complete list of
//! `(from, action, to)` rows it accepts. Commands consult the table once on
//! entry; anything not listed is rejected with `DomainError::InvalidState`.

use crate::error::{DomainError, DomainResult};

#[derive(Debug)]
pub struct TransitionTable<S: 'static, A: 'static> {
    entity: &'static str,
    rows: &'static [(S, A, S)],
}

impl<S, A> TransitionTable<S, A>
where
    S: Copy + Eq + core::fmt::Debug,
    A: Copy + Eq + core::fmt::Debug,
{
    pub const fn new(entity: &'static str, rows: &'static [(S, A, S)]) -> Self {
        Self { entity, rows }
    }

    /// Next status for `action` taken in status `from`.
    pub fn next(&self, from: S, action: A) -> DomainResult<S> {
        self.rows
            .iter()
            .find(|(f, a, _)| *f == from && *a == action)
            .map(|(_, _, to)| *to)
            .ok_or_else(|| {
                DomainError::invalid_state(format!(
                    "{} in status {from:?} does not allow {action:?}",
                    self.entity
                ))
            })
    }

    pub fn allows(&self, from: S, action: A) -> bool {
        self.rows.iter().any(|(f, a, _)| *f == from && *a == action)
    }

    /// Every status from which `action` may be taken.
    pub fn sources(&self, action: A) -> Vec<S> {
        let mut out: Vec<S> = Vec::new();
        for (from, a, _) in self.rows {
            if *a == action && !out.contains(from) {
                out.push(*from);
            }
        }
        out
    }

    pub fn entity(&self) -> &'static str {
        self.entity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Light {
        Red,
        Green,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Switch {
        Go,
        Stop,
    }

    const TABLE: TransitionTable<Light, Switch> = TransitionTable::new(
        "light",
        &[(Light::Red, Switch::Go, Light::Green), (Light::Green, Switch::Stop, Light::Red)],
    );

    #[test]
    fn listed_rows_resolve_next_state() {
        assert_eq!(TABLE.next(Light::Red, Switch::Go).unwrap(), Light::Green);
        assert!(TABLE.allows(Light::Green, Switch::Stop));
        assert_eq!(TABLE.sources(Switch::Go), vec![Light::Red]);
    }

    #[test]
    fn unlisted_rows_are_invalid_state() {
        let err = TABLE.next(Light::Red, Switch::Stop).unwrap_err();
        match err {
            DomainError::InvalidState(msg) => assert!(msg.contains("light in status Red")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
