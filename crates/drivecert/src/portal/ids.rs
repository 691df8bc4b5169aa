use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        /// Shorter ids sort first, so sequence ids keep numeric order past the padding width.
        impl Ord for $name {
            fn cmp(&self, other: &Self) -> std::cmp::Ordering {
                self.0
                    .len()
                    .cmp(&other.0.len())
                    .then_with(|| self.0.cmp(&other.0))
            }
        }

        impl PartialOrd for $name {
            fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
                Some(self.cmp(other))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Account identifier of a center, student, or reviewer.
    UserId
);
string_id!(
    /// Training-center or testing-center accreditation application.
    ApplicationId
);
string_id!(
    /// Certificate matching request.
    MatchingId
);
string_id!(CourseId);
string_id!(EnrollmentId);
string_id!(ExamId);
string_id!(
    /// A student's seat on an exam.
    RegistrationId
);
string_id!(CertificateId);

/// Monotonic identifier source producing `<prefix>-000001` style ids.
#[derive(Debug)]
pub(crate) struct Sequence {
    prefix: &'static str,
    next: AtomicU64,
}

impl Sequence {
    pub(crate) const fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            next: AtomicU64::new(1),
        }
    }

    pub(crate) fn next_value(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn next_id<T: From<String>>(&self) -> T {
        T::from(format!("{}-{:06}", self.prefix, self.next_value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_formats_padded_ids() {
        let sequence = Sequence::new("crs");
        let first: CourseId = sequence.next_id();
        let second: CourseId = sequence.next_id();
        assert_eq!(first.as_str(), "crs-000001");
        assert_eq!(second.as_str(), "crs-000002");
    }

    #[test]
    fn ids_order_numerically_beyond_six_digits() {
        let sequence = Sequence {
            prefix: "crs",
            next: AtomicU64::new(999_999),
        };
        let last_padded: CourseId = sequence.next_id();
        let first_wide: CourseId = sequence.next_id();
        assert_eq!(first_wide.as_str(), "crs-1000000");
        assert!(last_padded < first_wide);

        let mut ids = vec![first_wide.clone(), last_padded.clone(), CourseId::from("crs-000002")];
        ids.sort();
        assert_eq!(
            ids,
            vec![CourseId::from("crs-000002"), last_padded, first_wide]
        );
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = ExamId::from("exm-000042");
        assert_eq!(
            serde_json::to_value(&id).expect("serializes"),
            serde_json::json!("exm-000042")
        );
    }
}
