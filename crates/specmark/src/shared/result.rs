//! Backtracking result protocol.
//!
//! Every recognizer takes a start offset and returns either
//! `Parsed::Ok(value, end)` with `end >= start`, or `Parsed::Fail(start)`:
//! "nothing here, try the next alternative at the same position". A failed
//! result never consumes input.

#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub enum Parsed<T> {
    Ok(T, usize),
    Fail(usize),
}

impl<T> Parsed<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, Parsed::Ok(..))
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, Parsed::Fail(_))
    }

    /// Offset after the consumed input, or the attempt position on failure.
    pub fn index(&self) -> usize {
        match self {
            Parsed::Ok(_, i) | Parsed::Fail(i) => *i,
        }
    }

    pub fn value(self) -> Option<T> {
        match self {
            Parsed::Ok(value, _) => Some(value),
            Parsed::Fail(_) => None,
        }
    }

    pub fn ok(self) -> Option<(T, usize)> {
        match self {
            Parsed::Ok(value, i) => Some((value, i)),
            Parsed::Fail(_) => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Parsed<U> {
        match self {
            Parsed::Ok(value, i) => Parsed::Ok(f(value), i),
            Parsed::Fail(i) => Parsed::Fail(i),
        }
    }

    /// Tries `other` at the same position when `self` failed.
    pub fn or_else(self, other: impl FnOnce() -> Parsed<T>) -> Parsed<T> {
        match self {
            Parsed::Ok(..) => self,
            Parsed::Fail(_) => other(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_reports_attempt_position() {
        let res: Parsed<&str> = Parsed::Fail(7);
        assert!(res.is_fail());
        assert_eq!(res.index(), 7);
        assert_eq!(res.value(), None);
    }

    #[test]
    fn map_keeps_cursor() {
        let res = Parsed::Ok(2, 10).map(|v| v * 3);
        assert_eq!(res, Parsed::Ok(6, 10));
    }

    #[test]
    fn or_else_only_runs_on_failure() {
        let first = Parsed::Ok("a", 1).or_else(|| panic!("should not run"));
        assert_eq!(first.ok(), Some(("a", 1)));
        let second = Parsed::Fail(0).or_else(|| Parsed::Ok("b", 2));
        assert_eq!(second.ok(), Some(("b", 2)));
    }
}
