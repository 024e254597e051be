//! Format detection from raw bytes.
//!
//! A sniffer answers "is this buffer an instance of format F?" without
//! mutating anything and without ever failing: malformed input is simply a
//! negative answer. Callers that must pick between several formats pass their
//! candidates to [`detect`] in priority order.

/// A structural classifier for one format.
pub trait Sniff {
    fn name(&self) -> &str;

    fn sniff(&self, data: &[u8]) -> bool;
}

/// A sniffer backed by a plain function.
#[derive(Clone, Copy)]
pub struct Probe {
    pub name: &'static str,
    pub check: fn(&[u8]) -> bool,
}

impl Sniff for Probe {
    fn name(&self) -> &str {
        self.name
    }

    fn sniff(&self, data: &[u8]) -> bool {
        (self.check)(data)
    }
}

/// First candidate whose sniffer accepts `data`.
pub fn detect<'p>(data: &[u8], candidates: &[&'p dyn Sniff]) -> Option<&'p dyn Sniff> {
    let found = candidates.iter().copied().find(|c| c.sniff(data));
    match found {
        Some(c) => log::debug!("detected format `{}` ({} bytes)", c.name(), data.len()),
        None => log::debug!("no candidate format matched ({} bytes)", data.len()),
    }
    found
}

/// Turn a check with a rejection reason into a sniff verdict.
pub(crate) fn verdict<T>(format: &str, check: Result<T, &'static str>) -> bool {
    match check {
        Ok(_) => true,
        Err(reason) => {
            log::trace!("`{}` rejected: {}", format, reason);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn starts_with_a(data: &[u8]) -> bool {
        data.first() == Some(&b'A')
    }

    fn non_empty(data: &[u8]) -> bool {
        !data.is_empty()
    }

    #[test]
    fn first_match_wins() {
        let a = Probe {
            name: "a",
            check: starts_with_a,
        };
        let any = Probe {
            name: "any",
            check: non_empty,
        };
        let candidates: [&dyn Sniff; 2] = [&a, &any];

        assert_eq!(detect(b"ABC", &candidates).map(|c| c.name()), Some("a"));
        assert_eq!(detect(b"xyz", &candidates).map(|c| c.name()), Some("any"));
        assert!(detect(b"", &candidates).is_none());
    }
}
